//! The zone table: installed definitions plus one runtime flag per zone.
//!
//! This is the single source of truth the engine mutates.  Runtime flags
//! are only writable from inside the crate so that every state change flows
//! through the cascade logic in [`ZoneService`](crate::app::service::ZoneService).

use heapless::Vec;

use crate::error::EngineError;

use super::validator::validate_zones;
use super::{MAX_ZONES, ZoneDefinition, ZoneId};

/// Installed zone definitions and their activation flags.
#[derive(Debug, Clone, Default)]
pub struct ZoneTable {
    zones: Vec<ZoneDefinition, MAX_ZONES>,
    active: [bool; MAX_ZONES],
}

impl ZoneTable {
    /// An empty table.  Every lookup fails with `NotFound` until a
    /// configuration is installed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and install a new set of definitions.
    ///
    /// On success all runtime flags are reset to inactive; prior activation
    /// state is not carried over.  On failure the current table is left
    /// untouched.
    pub fn install(&mut self, definitions: &[ZoneDefinition]) -> Result<(), EngineError> {
        validate_zones(definitions)?;
        let mut zones = Vec::new();
        for def in definitions {
            zones
                .push(def.clone())
                .map_err(|_| EngineError::ConfigInvalid("zone count must be 1-8"))?;
        }
        self.zones = zones;
        self.active = [false; MAX_ZONES];
        Ok(())
    }

    /// Definition of zone `id`.
    pub fn get(&self, id: ZoneId) -> Result<&ZoneDefinition, EngineError> {
        self.zones.get(id as usize).ok_or(EngineError::NotFound(id))
    }

    /// Whether zone `id` is currently active.  Unknown ids read as inactive.
    pub fn is_active(&self, id: ZoneId) -> bool {
        (id as usize) < self.zones.len() && self.active[id as usize]
    }

    pub(crate) fn set_active(&mut self, id: ZoneId, active: bool) {
        if let Some(flag) = self.active.get_mut(id as usize) {
            *flag = active;
        }
    }

    /// Number of installed zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Iterate over `(id, definition)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ZoneId, &ZoneDefinition)> {
        self.zones.iter().enumerate().map(|(i, z)| (i as ZoneId, z))
    }

    /// The master zone `id` effectively depends on.
    ///
    /// `None` when `id` is itself a master, declares no master, or declares
    /// one that is missing, disabled, or not flagged as a master.
    pub fn master_of(&self, id: ZoneId) -> Option<ZoneId> {
        let master = self.zones.get(id as usize)?.declared_master()?;
        match self.zones.get(master as usize) {
            Some(m) if m.is_master && m.enabled => Some(master),
            _ => None,
        }
    }

    /// Zones whose effective master is `master`.
    pub fn dependents_of(&self, master: ZoneId) -> impl Iterator<Item = ZoneId> + '_ {
        (0..self.zones.len() as ZoneId).filter(move |&id| self.master_of(id) == Some(master))
    }

    /// Whether any dependent of `master` is still active.
    pub fn has_active_dependent(&self, master: ZoneId) -> bool {
        self.dependents_of(master).any(|id| self.is_active(id))
    }

    /// Ids of master zones that are currently active.
    pub fn active_masters(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.iter()
            .filter(|&(id, z)| z.is_master && self.is_active(id))
            .map(|(id, _)| id)
    }
}
