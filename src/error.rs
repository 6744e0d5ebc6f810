//! Error types for the zone dependency engine and the command channel.
//!
//! Engine errors are reported synchronously to the caller of the operation
//! that raised them.  Channel errors never reach an engine caller: the
//! engine logs them and carries on, since publishing is fire-and-forget.
//! All variants are `Copy` so they can be passed around without allocation.

use core::fmt;

use crate::zones::ZoneId;

// ---------------------------------------------------------------------------
// Engine errors
// ---------------------------------------------------------------------------

/// Errors surfaced by [`ZoneTable`](crate::zones::table::ZoneTable) and the
/// engine entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The zone id does not exist in the installed table.  Caller bug,
    /// fatal to the single call that raised it.
    NotFound(ZoneId),
    /// A configuration failed structural validation.  The whole config is
    /// rejected and the previously installed table stays in place.
    /// The `&'static str` names the first violated constraint.
    ConfigInvalid(&'static str),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(zone) => write!(f, "zone {zone} not found"),
            Self::ConfigInvalid(reason) => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for EngineError {}

// ---------------------------------------------------------------------------
// Channel errors
// ---------------------------------------------------------------------------

/// Errors from [`CommandChannel`](crate::app::ports::CommandChannel)
/// operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    /// The channel is disconnected; the command was dropped.
    Unavailable,
    /// The underlying client refused the request (queue full, closed).
    PublishFailed,
    /// Connection options could not be built (e.g. unreadable CA file).
    Setup(&'static str),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "channel unavailable"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::Setup(msg) => write!(f, "channel setup failed: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}
