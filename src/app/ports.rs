//! Port traits — the hexagonal boundary between the engine and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ZoneService (domain)
//! ```
//!
//! Driven adapters (actuator bus, event sinks, config storage) implement
//! these traits.  The [`ZoneService`](super::service::ZoneService) consumes
//! them via generics, so the domain core never touches the network or disk.

use std::sync::mpsc::Receiver;

use crate::config::ZoneConfig;
use crate::error::ChannelError;
use crate::zones::ZoneId;

// ───────────────────────────────────────────────────────────────
// Actuator bus (driven adapter: domain ↔ pub/sub broker)
// ───────────────────────────────────────────────────────────────

/// Desired state for one valve, sent to its actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveCommand {
    pub zone: ZoneId,
    pub on: bool,
}

/// State reported by an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateReport {
    pub zone: ZoneId,
    pub on: bool,
}

/// Write-side port: the engine publishes valve commands through this.
///
/// Delivery is at-most-once and best-effort.  Implementations must return
/// promptly: when disconnected, fail with [`ChannelError::Unavailable`]
/// instead of waiting.  Callers never retry.
pub trait CommandChannel {
    fn publish(&mut self, command: ValveCommand) -> Result<(), ChannelError>;

    /// Whether a publish right now would reach the bus.
    fn is_connected(&self) -> bool;
}

/// Read-side port: the inbound stream of actuator state reports.
pub trait ReportSource {
    /// A new, unbounded subscription.  Reports keep flowing across
    /// reconnects; the receiver ends only when the source shuts down.
    fn subscribe(&self) -> Receiver<StateReport>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / display)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`ZoneEvent`](super::events::ZoneEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ZoneEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: front-end ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the zone configuration document.
///
/// Implementations MUST validate before persisting, so a document that
/// would be rejected at install time is never written.
pub trait ConfigPort {
    fn load(&self) -> Result<ZoneConfig, ConfigError>;

    fn save(&self, config: &ZoneConfig) -> Result<(), ConfigError>;
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No document at the configured location.
    NotFound,
    /// The document is not valid JSON or has mistyped fields.
    Corrupted(String),
    /// The document parsed but failed structural validation.
    ValidationFailed(&'static str),
    /// Underlying filesystem error.
    Io(std::io::Error),
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
