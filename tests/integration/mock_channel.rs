//! Mock actuator bus and event sink for integration tests.
//!
//! Records every publish so tests can assert on the full command history
//! without a broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use valvecontrol::app::events::ZoneEvent;
use valvecontrol::app::ports::{CommandChannel, EventSink, ValveCommand};
use valvecontrol::config::PolicyConfig;
use valvecontrol::error::ChannelError;
use valvecontrol::zones::ZoneDefinition;

// ── MockChannel ───────────────────────────────────────────────

/// Shared-history channel.  Clones observe the same log, so a test can
/// keep one clone while the engine owns another.
#[derive(Clone)]
pub struct MockChannel {
    sent: Arc<Mutex<Vec<ValveCommand>>>,
    connected: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn set_connected(&self, on: bool) {
        self.connected.store(on, Ordering::SeqCst);
    }

    /// Publishes so far as `(zone, on)` pairs.
    pub fn sent(&self) -> Vec<(u8, bool)> {
        self.sent.lock().unwrap().iter().map(|c| (c.zone, c.on)).collect()
    }

    /// Return and clear the publish history.
    pub fn take(&self) -> Vec<(u8, bool)> {
        let out = self.sent();
        self.sent.lock().unwrap().clear();
        out
    }
}

impl CommandChannel for MockChannel {
    fn publish(&mut self, command: ValveCommand) -> Result<(), ChannelError> {
        if !self.is_connected() {
            return Err(ChannelError::Unavailable);
        }
        self.sent.lock().unwrap().push(command);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ZoneEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(zone, active)` for every state change, in emission order.
    pub fn transitions(&self) -> Vec<(u8, bool)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                ZoneEvent::StateChanged { zone, active } => Some((zone, active)),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ZoneEvent) {
        self.events.push(event.clone());
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// Pump (master) and Lawn (depends on the pump).
pub fn pump_and_lawn() -> Vec<ZoneDefinition> {
    vec![ZoneDefinition::master("Pump"), ZoneDefinition::dependent("Lawn", 0)]
}

/// Pump master with two dependents and one free-standing zone.
#[allow(dead_code)]
pub fn pump_with_two() -> Vec<ZoneDefinition> {
    vec![
        ZoneDefinition::master("Pump"),
        ZoneDefinition::dependent("Lawn", 0),
        ZoneDefinition::dependent("Beds", 0),
        ZoneDefinition::new("Drip"),
    ]
}

#[allow(dead_code)]
pub fn all_policies() -> PolicyConfig {
    PolicyConfig::default()
}
