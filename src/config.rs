//! Zone configuration document.
//!
//! The document the operator edits and saves as JSON:
//!
//! ```json
//! { "zones": [...], "general": { ...policies... }, "mqtt": { ... } }
//! ```
//!
//! The engine only consumes `zones` and `general`; the `mqtt` section
//! configures the actuator bus adapter.

use serde::{Deserialize, Serialize};

use crate::zones::{MAX_ZONES, NO_MASTER, ZoneDefinition, ZoneId};

// ───────────────────────────────────────────────────────────────
// Cascade policies
// ───────────────────────────────────────────────────────────────

/// The three independent cascade policies.  Read fresh on every
/// transition, so a change applies to the next intent only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Opening a dependent opens its master first.
    #[serde(rename = "open_master_automatically")]
    pub auto_open_master: bool,
    /// Closing a dependent closes any master left without active dependents.
    #[serde(rename = "close_master_automatically", default = "enabled")]
    pub auto_close_master: bool,
    /// Closing a master closes its active dependents first.
    #[serde(rename = "close_dependent_automatically", default = "enabled")]
    pub auto_close_dependents: bool,
}

fn enabled() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            auto_open_master: true,
            auto_close_master: true,
            auto_close_dependents: true,
        }
    }
}

/// Names of the individual policies, for console and RPC-style updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    AutoOpenMaster,
    AutoCloseMaster,
    AutoCloseDependents,
}

impl PolicyConfig {
    /// Copy of `self` with one flag replaced.
    pub fn with(mut self, policy: Policy, on: bool) -> Self {
        match policy {
            Policy::AutoOpenMaster => self.auto_open_master = on,
            Policy::AutoCloseMaster => self.auto_close_master = on,
            Policy::AutoCloseDependents => self.auto_close_dependents = on,
        }
        self
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT settings
// ───────────────────────────────────────────────────────────────

/// Connection settings for the MQTT actuator bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttSettings {
    pub enabled: bool,
    pub broker: String,
    pub port: u16,
    /// Credentials are only sent when both username and password are set.
    pub username: String,
    pub password: String,
    pub client_id: String,
    /// First topic level, e.g. `irrigation` → `irrigation/zone/3/command`.
    pub topic_prefix: String,
    pub use_tls: bool,
    /// PEM CA bundle.  Empty means the platform trust store.
    pub ca_cert_path: String,
    /// Seconds between status refreshes shown by the front-end.
    pub status_update_interval: u32,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: "localhost".into(),
            port: 1883,
            username: String::new(),
            password: String::new(),
            client_id: "valvecontrol2000".into(),
            topic_prefix: "irrigation".into(),
            use_tls: false,
            ca_cert_path: String::new(),
            status_update_interval: 30,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Document
// ───────────────────────────────────────────────────────────────

/// The full zone configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub zones: Vec<ZoneDefinition>,
    #[serde(rename = "general")]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub mqtt: MqttSettings,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            zones: vec![
                ZoneDefinition::master("Water pump"),
                ZoneDefinition::dependent("Lawn", 0),
            ],
            policy: PolicyConfig::default(),
            mqtt: MqttSettings::default(),
        }
    }
}

impl ZoneConfig {
    /// Append a zone named `Zone {n}`.  Returns the new id, or `None` when
    /// the table is already full.
    pub fn add_zone(&mut self) -> Option<ZoneId> {
        if self.zones.len() >= MAX_ZONES {
            return None;
        }
        let id = self.zones.len() as ZoneId;
        self.zones.push(ZoneDefinition::new(format!("Zone {id}")));
        Some(id)
    }

    /// Remove the last zone.  Refuses to remove the only remaining zone.
    /// Zones that referenced the removed one drop their master reference.
    pub fn remove_zone(&mut self) -> Option<ZoneDefinition> {
        if self.zones.len() <= 1 {
            return None;
        }
        let removed = self.zones.pop()?;
        let removed_id = self.zones.len() as i8;
        if removed.is_master {
            self.detach_dependents(removed_id);
        }
        Some(removed)
    }

    /// Flag or un-flag `zone` as a master.  Un-flagging detaches every zone
    /// that referenced it.  Returns `false` for an unknown id.
    pub fn set_master_flag(&mut self, zone: ZoneId, is_master: bool) -> bool {
        if zone as usize >= self.zones.len() {
            return false;
        }
        if !is_master {
            self.detach_dependents(zone as i8);
        }
        self.zones[zone as usize].is_master = is_master;
        true
    }

    /// Point `zone` at `master`, or at nothing with `None`.  Only master
    /// zones are valid targets, and masters themselves never get one.
    pub fn set_master_zone(&mut self, zone: ZoneId, master: Option<ZoneId>) -> bool {
        let Some(def) = self.zones.get(zone as usize) else {
            return false;
        };
        if def.is_master {
            return false;
        }
        let reference = match master {
            None => NO_MASTER,
            Some(m) if m != zone && self.zones.get(m as usize).is_some_and(|z| z.is_master) => {
                m as i8
            }
            Some(_) => return false,
        };
        self.zones[zone as usize].master_zone = reference;
        true
    }

    /// Enable or disable `zone`.  Disabling also clears its master
    /// reference and master flag, detaching any zone that depended on it.
    pub fn set_enabled(&mut self, zone: ZoneId, enabled: bool) -> bool {
        if zone as usize >= self.zones.len() {
            return false;
        }
        if !enabled {
            if self.zones[zone as usize].is_master {
                self.detach_dependents(zone as i8);
            }
            let def = &mut self.zones[zone as usize];
            def.master_zone = NO_MASTER;
            def.is_master = false;
        }
        self.zones[zone as usize].enabled = enabled;
        true
    }

    /// Rename `zone`.  Blank names are refused.
    pub fn rename(&mut self, zone: ZoneId, name: &str) -> bool {
        let name = name.trim();
        match self.zones.get_mut(zone as usize) {
            Some(def) if !name.is_empty() => {
                def.name = name.to_string();
                true
            }
            _ => false,
        }
    }

    /// SHA-256 over the canonical JSON form.  Used to detect unsaved edits.
    pub fn fingerprint(&self) -> [u8; 32] {
        // Struct fields serialise in declaration order, so the encoding is
        // stable for equal documents.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hmac_sha256::Hash::hash(&bytes)
    }

    fn detach_dependents(&mut self, master: i8) {
        for zone in &mut self.zones {
            if zone.master_zone == master {
                zone.master_zone = NO_MASTER;
            }
        }
    }
}
