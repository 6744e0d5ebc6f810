//! Command channel used when the actuator bus is disabled.
//!
//! Every publish fails with [`ChannelError::Unavailable`]; the engine logs
//! the drop and keeps tracking state locally.

use crate::app::ports::{CommandChannel, ValveCommand};
use crate::error::ChannelError;

/// A channel that is never connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineChannel;

impl CommandChannel for OfflineChannel {
    fn publish(&mut self, _command: ValveCommand) -> Result<(), ChannelError> {
        Err(ChannelError::Unavailable)
    }

    fn is_connected(&self) -> bool {
        false
    }
}
