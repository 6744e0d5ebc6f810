//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing engine events through the `log`
//! facade (stderr via `env_logger` in the console binary).  A display
//! front-end would implement the same trait.

use log::{debug, info};

use crate::app::events::ZoneEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ZoneEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ZoneEvent) {
        match event {
            ZoneEvent::StateChanged { zone, active } => {
                info!("ZONE  | {} -> {}", zone, if *active { "ON" } else { "OFF" });
            }
            ZoneEvent::IntentIgnored { zone, origin } => {
                debug!("ZONE  | {} disabled, {:?} intent ignored", zone, origin);
            }
            ZoneEvent::ConfigInstalled { zones } => {
                info!("CONFIG| installed {} zones, all inactive", zones);
            }
            ZoneEvent::PolicyChanged(p) => {
                info!(
                    "POLICY| open_master={} close_master={} close_dependents={}",
                    p.auto_open_master, p.auto_close_master, p.auto_close_dependents,
                );
            }
        }
    }
}
