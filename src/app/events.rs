//! Outbound engine events.
//!
//! The engine emits these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them: log them,
//! refresh a display, forward them to an observer hook.

use crate::config::PolicyConfig;
use crate::zones::ZoneId;

use super::commands::Origin;

/// Structured events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneEvent {
    /// A zone's runtime flag changed.
    StateChanged { zone: ZoneId, active: bool },

    /// An intent targeted a disabled zone and was dropped.
    IntentIgnored { zone: ZoneId, origin: Origin },

    /// A new zone table was installed; every zone is now inactive.
    ConfigInstalled { zones: usize },

    /// The cascade policies were replaced.
    PolicyChanged(PolicyConfig),
}
