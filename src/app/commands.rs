//! Inbound requests to the engine.
//!
//! An [`Intent`] is a request to move one zone to a state, tagged with where
//! it came from.  [`AppCommand`] is the wider set of operator actions the
//! console front-end can issue.

use crate::config::{Policy, PolicyConfig};
use crate::zones::ZoneId;

/// Where a requested state change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Operator action on this controller.
    Local,
    /// A state report from the actuator bus.  The reported zone's own
    /// transition is never republished.
    Remote,
}

/// Request to put `zone` into `active` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub origin: Origin,
    pub zone: ZoneId,
    pub active: bool,
}

impl Intent {
    pub fn local(zone: ZoneId, active: bool) -> Self {
        Self {
            origin: Origin::Local,
            zone,
            active,
        }
    }

    pub fn remote(zone: ZoneId, active: bool) -> Self {
        Self {
            origin: Origin::Remote,
            zone,
            active,
        }
    }
}

/// Operator commands accepted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    /// Open (`true`) or close (`false`) a zone.
    SetZone { zone: ZoneId, active: bool },

    /// Flip a zone's current state.
    Toggle(ZoneId),

    /// Replace one cascade policy flag.
    SetPolicy { policy: Policy, on: bool },

    /// Replace all cascade policies at once.
    ReplacePolicies(PolicyConfig),
}
