//! Zone model: static definitions, the runtime table, and validation.
//!
//! ```text
//!   ZoneConfig (JSON) ──▶ validator ──▶ ZoneTable ──▶ ZoneService
//!                                       defs + active flags
//! ```
//!
//! A zone is one irrigation valve.  A *master* zone (pump, main line) must be
//! open whenever a zone depending on it is open.  Dependency chains are one
//! level deep: a master never depends on another master.

pub mod table;
pub mod validator;

use serde::{Deserialize, Serialize};

/// Index of a zone in the installed table.
pub type ZoneId = u8;

/// Hard ceiling on the number of zones.  Matches the number of actuator
/// state topics the MQTT adapter subscribes to.
pub const MAX_ZONES: usize = 8;

/// Encoding of "no master" in [`ZoneDefinition::master_zone`].
pub const NO_MASTER: i8 = -1;

/// Static description of one zone, as loaded from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    /// Display name (non-empty).
    pub name: String,
    /// Disabled zones never activate and are skipped by every cascade.
    pub enabled: bool,
    /// Id of the master this zone depends on, or [`NO_MASTER`].
    /// Ignored when `is_master` is set.
    pub master_zone: i8,
    pub is_master: bool,
}

impl ZoneDefinition {
    /// A plain zone with no master.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            master_zone: NO_MASTER,
            is_master: false,
        }
    }

    /// A master zone.
    pub fn master(name: impl Into<String>) -> Self {
        Self {
            is_master: true,
            ..Self::new(name)
        }
    }

    /// A zone depending on `master`.
    pub fn dependent(name: impl Into<String>, master: ZoneId) -> Self {
        Self {
            master_zone: master as i8,
            ..Self::new(name)
        }
    }

    /// Builder-style toggle for `enabled`.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The raw master reference as declared, before the table resolves it.
    /// `None` for masters and for [`NO_MASTER`].
    pub fn declared_master(&self) -> Option<ZoneId> {
        if self.is_master || self.master_zone < 0 {
            None
        } else {
            Some(self.master_zone as ZoneId)
        }
    }
}
