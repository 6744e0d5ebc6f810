//! Shared engine handle — the critical section around [`ZoneService`].
//!
//! Two producers feed the engine: the operator console (Local intents) and
//! the report pump draining the actuator bus subscription (Remote intents).
//! Every entry point takes one mutex that guards the service, the command
//! channel, and the observers together, so a cascade, including every flag
//! mutation and every publish, finishes before the next intent starts.
//!
//! ```text
//!  console ──┐                      ┌──▶ CommandChannel::publish
//!            ├──▶ Mutex<Core> ──────┤
//!  pump ─────┘   (ZoneService)      └──▶ observers (log, hooks)
//! ```
//!
//! Observer hooks run inside the critical section.  They receive the new
//! state directly and must not call back into the engine.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use log::{info, warn};

use crate::adapters::log_sink::LogEventSink;
use crate::config::PolicyConfig;
use crate::error::EngineError;
use crate::zones::{ZoneDefinition, ZoneId};

use super::commands::{AppCommand, Intent};
use super::events::ZoneEvent;
use super::ports::{CommandChannel, EventSink, StateReport};
use super::service::ZoneService;

/// Callback invoked on every zone state change.
pub type StateHook = Box<dyn FnMut(ZoneId, bool) + Send>;

/// Point-in-time view of one zone for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStatus {
    pub id: ZoneId,
    pub name: String,
    pub enabled: bool,
    pub is_master: bool,
    /// Effective master after reference resolution.
    pub master: Option<ZoneId>,
    pub active: bool,
}

/// Fans engine events out to the log and to registered hooks.
struct Observers {
    log: LogEventSink,
    hooks: Vec<StateHook>,
}

impl EventSink for Observers {
    fn emit(&mut self, event: &ZoneEvent) {
        self.log.emit(event);
        if let ZoneEvent::StateChanged { zone, active } = *event {
            for hook in &mut self.hooks {
                hook(zone, active);
            }
        }
    }
}

struct Core<C> {
    service: ZoneService,
    channel: C,
    observers: Observers,
}

/// Cloneable, thread-safe handle to the zone dependency engine.
pub struct ZoneEngine<C> {
    core: Arc<Mutex<Core<C>>>,
}

impl<C> Clone for ZoneEngine<C> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<C: CommandChannel> ZoneEngine<C> {
    /// An engine with no zones installed.  Call
    /// [`install_config`](Self::install_config) before sending intents.
    pub fn new(channel: C) -> Self {
        Self {
            core: Arc::new(Mutex::new(Core {
                service: ZoneService::new(),
                channel,
                observers: Observers {
                    log: LogEventSink::new(),
                    hooks: Vec::new(),
                },
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Core<C>> {
        // A panicking observer must not wedge the controller; the service
        // keeps its invariants between calls.
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Configuration ─────────────────────────────────────────

    /// Validate and install zones and policies.  Runtime state resets to
    /// all-inactive; on error the previous table stays in place.
    pub fn install_config(
        &self,
        zones: &[ZoneDefinition],
        policy: PolicyConfig,
    ) -> Result<(), EngineError> {
        let mut core = self.lock();
        let Core {
            service, observers, ..
        } = &mut *core;
        service.install_config(zones, policy, observers)
    }

    /// Like [`install_config`](Self::install_config), but only while every
    /// zone is inactive.  Returns `Ok(false)` without touching anything when
    /// a zone is active.  Check and install share one critical section.
    pub fn install_config_if_idle(
        &self,
        zones: &[ZoneDefinition],
        policy: PolicyConfig,
    ) -> Result<bool, EngineError> {
        let mut core = self.lock();
        let Core {
            service, observers, ..
        } = &mut *core;
        if service.table().iter().any(|(id, _)| service.is_active(id)) {
            return Ok(false);
        }
        service.install_config(zones, policy, observers)?;
        Ok(true)
    }

    pub fn set_policy(&self, policy: PolicyConfig) {
        let mut core = self.lock();
        let Core {
            service, observers, ..
        } = &mut *core;
        service.set_policy(policy, observers);
    }

    pub fn policy(&self) -> PolicyConfig {
        self.lock().service.policy()
    }

    // ── Intents ───────────────────────────────────────────────

    /// Run one intent to completion under the engine lock.
    pub fn handle_intent(&self, intent: Intent) -> Result<(), EngineError> {
        let mut core = self.lock();
        let Core {
            service,
            channel,
            observers,
        } = &mut *core;
        service.handle_intent(intent, channel, observers)
    }

    /// Flip a zone as one Local intent.  Returns the new state.
    pub fn toggle(&self, zone: ZoneId) -> Result<bool, EngineError> {
        let mut core = self.lock();
        let Core {
            service,
            channel,
            observers,
        } = &mut *core;
        service.toggle(zone, channel, observers)
    }

    pub fn handle_command(&self, cmd: AppCommand) -> Result<(), EngineError> {
        let mut core = self.lock();
        let Core {
            service,
            channel,
            observers,
        } = &mut *core;
        service.handle_command(cmd, channel, observers)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Whether `zone` is active.  Unknown zones read as inactive.
    pub fn is_active(&self, zone: ZoneId) -> bool {
        self.lock().service.is_active(zone)
    }

    /// Whether the command channel currently reaches the bus.
    pub fn is_connected(&self) -> bool {
        self.lock().channel.is_connected()
    }

    /// Status of every installed zone, in id order.
    pub fn snapshot(&self) -> Vec<ZoneStatus> {
        let core = self.lock();
        let table = core.service.table();
        table
            .iter()
            .map(|(id, zone)| ZoneStatus {
                id,
                name: zone.name.clone(),
                enabled: zone.enabled,
                is_master: zone.is_master,
                master: table.master_of(id),
                active: table.is_active(id),
            })
            .collect()
    }

    /// Register a state-change observer.
    pub fn on_state_changed(&self, hook: impl FnMut(ZoneId, bool) + Send + 'static) {
        self.lock().observers.hooks.push(Box::new(hook));
    }
}

impl<C: CommandChannel + Send + 'static> ZoneEngine<C> {
    /// Feed a report subscription into the engine as Remote intents.
    ///
    /// The pump thread exits when the subscription ends (source shutdown).
    pub fn spawn_report_pump(&self, reports: Receiver<StateReport>) -> std::io::Result<JoinHandle<()>> {
        let engine = self.clone();
        thread::Builder::new()
            .name("report-pump".into())
            .spawn(move || {
                for report in reports {
                    if let Err(e) = engine.handle_intent(Intent::remote(report.zone, report.on)) {
                        warn!("Dropping state report for zone {}: {}", report.zone, e);
                    }
                }
                info!("Report subscription closed");
            })
    }
}
