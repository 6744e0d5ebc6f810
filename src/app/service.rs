//! Zone service — the hexagonal core.
//!
//! [`ZoneService`] owns the zone table and the cascade policies.  It
//! exposes the dependency state machine as plain `&mut self` methods; the
//! command channel and the event sink are injected at every call, so the
//! whole cascade is testable with mock adapters.
//!
//! ```text
//!  Intent ──▶ ┌────────────────────────┐ ──▶ CommandChannel
//!             │      ZoneService       │
//!             │  ZoneTable · Policies  │ ──▶ EventSink
//!             └────────────────────────┘
//! ```
//!
//! ## Echo suppression
//!
//! A Remote intent reports a transition the actuator has already made, so
//! the reported zone's own command is never republished.  Cascaded
//! transitions (a master opened for a dependent, dependents closed with a
//! master, an idle master closed) are new decisions and always publish.

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::PolicyConfig;
use crate::error::{ChannelError, EngineError};
use crate::zones::table::ZoneTable;
use crate::zones::{MAX_ZONES, ZoneDefinition, ZoneId};

use super::commands::{AppCommand, Intent, Origin};
use super::events::ZoneEvent;
use super::ports::{CommandChannel, EventSink, ValveCommand};

/// The zone dependency state machine.
#[derive(Debug, Clone, Default)]
pub struct ZoneService {
    table: ZoneTable,
    policy: PolicyConfig,
}

impl ZoneService {
    /// A service with no zones installed and default policies.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Configuration ─────────────────────────────────────────

    /// Validate and install a zone table together with its policies.
    ///
    /// Every zone starts inactive.  On error nothing changes.
    pub fn install_config(
        &mut self,
        zones: &[ZoneDefinition],
        policy: PolicyConfig,
        sink: &mut impl EventSink,
    ) -> Result<(), EngineError> {
        self.table.install(zones)?;
        self.policy = policy;
        info!("Installed {} zones ({:?})", zones.len(), policy);
        sink.emit(&ZoneEvent::ConfigInstalled { zones: zones.len() });
        Ok(())
    }

    /// Replace the cascade policies.  Takes effect on the next intent.
    pub fn set_policy(&mut self, policy: PolicyConfig, sink: &mut impl EventSink) {
        if policy != self.policy {
            self.policy = policy;
            sink.emit(&ZoneEvent::PolicyChanged(policy));
        }
    }

    // ── Intent handling ───────────────────────────────────────

    /// Drive `intent.zone` towards `intent.active`, cascading per policy.
    ///
    /// Fails with `NotFound` before any mutation when the zone does not
    /// exist.  Disabled zones and requests for the current state are
    /// silent no-ops.
    pub fn handle_intent(
        &mut self,
        intent: Intent,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> Result<(), EngineError> {
        let zone = self.table.get(intent.zone)?;
        let (enabled, is_master) = (zone.enabled, zone.is_master);

        if !enabled {
            debug!("Zone {} is disabled, ignoring {:?} intent", intent.zone, intent.origin);
            sink.emit(&ZoneEvent::IntentIgnored {
                zone: intent.zone,
                origin: intent.origin,
            });
            return Ok(());
        }
        if self.table.is_active(intent.zone) == intent.active {
            return Ok(());
        }

        if intent.active {
            self.open(intent, channel, sink);
        } else {
            self.close(intent, is_master, channel, sink);
        }
        Ok(())
    }

    /// Flip a zone as a Local intent.  Returns the zone's new state.
    pub fn toggle(
        &mut self,
        zone: ZoneId,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> Result<bool, EngineError> {
        self.table.get(zone)?;
        let target = !self.table.is_active(zone);
        self.handle_intent(Intent::local(zone, target), channel, sink)?;
        Ok(self.table.is_active(zone))
    }

    /// Process an operator command from the console.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) -> Result<(), EngineError> {
        match cmd {
            AppCommand::SetZone { zone, active } => {
                self.handle_intent(Intent::local(zone, active), channel, sink)
            }
            AppCommand::Toggle(zone) => self.toggle(zone, channel, sink).map(|_| ()),
            AppCommand::SetPolicy { policy, on } => {
                self.set_policy(self.policy.with(policy, on), sink);
                Ok(())
            }
            AppCommand::ReplacePolicies(policy) => {
                self.set_policy(policy, sink);
                Ok(())
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn is_active(&self, zone: ZoneId) -> bool {
        self.table.is_active(zone)
    }

    pub fn policy(&self) -> PolicyConfig {
        self.policy
    }

    pub fn table(&self) -> &ZoneTable {
        &self.table
    }

    // ── Cascades ──────────────────────────────────────────────

    /// Activation: master first, then the zone itself.
    fn open(&mut self, intent: Intent, channel: &mut impl CommandChannel, sink: &mut impl EventSink) {
        if self.policy.auto_open_master {
            if let Some(master) = self.table.master_of(intent.zone) {
                if !self.table.is_active(master) {
                    self.transition(master, true, true, channel, sink);
                }
            }
        }
        let publish = intent.origin == Origin::Local;
        self.transition(intent.zone, true, publish, channel, sink);
    }

    /// Deactivation: dependents first, then the zone itself, then any
    /// master left idle.
    fn close(
        &mut self,
        intent: Intent,
        is_master: bool,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) {
        if is_master && self.policy.auto_close_dependents {
            let dependents: Vec<ZoneId, MAX_ZONES> = self
                .table
                .dependents_of(intent.zone)
                .filter(|&d| self.table.is_active(d))
                .collect();
            for dependent in dependents {
                self.transition(dependent, false, true, channel, sink);
            }
        }

        let publish = intent.origin == Origin::Local;
        self.transition(intent.zone, false, publish, channel, sink);

        if !is_master && self.policy.auto_close_master {
            let idle: Vec<ZoneId, MAX_ZONES> = self
                .table
                .active_masters()
                .filter(|&m| !self.table.has_active_dependent(m))
                .collect();
            for master in idle {
                self.transition(master, false, true, channel, sink);
            }
        }
    }

    /// Flip one runtime flag, announce it, and optionally publish it.
    fn transition(
        &mut self,
        zone: ZoneId,
        active: bool,
        publish: bool,
        channel: &mut impl CommandChannel,
        sink: &mut impl EventSink,
    ) {
        self.table.set_active(zone, active);
        sink.emit(&ZoneEvent::StateChanged { zone, active });
        if publish {
            send(channel, ValveCommand { zone, on: active });
        }
    }
}

/// Fire-and-forget publish.  Failures are logged and dropped.
fn send(channel: &mut impl CommandChannel, command: ValveCommand) {
    match channel.publish(command) {
        Ok(()) => {}
        Err(ChannelError::Unavailable) => {
            warn!("Cannot publish zone {} {}: channel unavailable", command.zone, on_off(command.on));
        }
        Err(e) => {
            warn!("Publish of zone {} {} dropped: {}", command.zone, on_off(command.on), e);
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
