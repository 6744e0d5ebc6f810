//! Structural validation run before a zone table or document is accepted.
//!
//! Type consistency (booleans are booleans, `master_zone` is an integer) is
//! already enforced by the serde model; what remains are the range and
//! cross-field checks below.  Validation stops at the first violation and
//! never accepts part of a config.

use crate::config::{MqttSettings, ZoneConfig};
use crate::error::EngineError;

use super::{MAX_ZONES, NO_MASTER, ZoneDefinition};

/// Check a zone list before it replaces the installed table.
pub fn validate_zones(zones: &[ZoneDefinition]) -> Result<(), EngineError> {
    if zones.is_empty() || zones.len() > MAX_ZONES {
        return Err(EngineError::ConfigInvalid("zone count must be 1-8"));
    }
    for zone in zones {
        if zone.name.trim().is_empty() {
            return Err(EngineError::ConfigInvalid("zone name must not be empty"));
        }
        if !(NO_MASTER..MAX_ZONES as i8).contains(&zone.master_zone) {
            return Err(EngineError::ConfigInvalid("master_zone must be -1..=7"));
        }
    }
    Ok(())
}

/// Check the MQTT section.  Fields are only inspected when the channel is
/// enabled; a disabled section may hold anything.
pub fn validate_mqtt(mqtt: &MqttSettings) -> Result<(), EngineError> {
    if !mqtt.enabled {
        return Ok(());
    }
    if mqtt.broker.trim().is_empty() {
        return Err(EngineError::ConfigInvalid("mqtt broker must not be empty"));
    }
    if mqtt.port == 0 {
        return Err(EngineError::ConfigInvalid("mqtt port must be 1-65535"));
    }
    if mqtt.client_id.trim().is_empty() {
        return Err(EngineError::ConfigInvalid("mqtt client_id must not be empty"));
    }
    let prefix = mqtt.topic_prefix.as_str();
    if prefix.is_empty() || prefix.contains(['/', '+', '#']) {
        return Err(EngineError::ConfigInvalid(
            "mqtt topic_prefix must be one topic level without wildcards",
        ));
    }
    if !mqtt.password.is_empty() && mqtt.username.is_empty() {
        return Err(EngineError::ConfigInvalid("mqtt password requires a username"));
    }
    if mqtt.status_update_interval == 0 {
        return Err(EngineError::ConfigInvalid(
            "mqtt status_update_interval must be positive",
        ));
    }
    Ok(())
}

/// Validate a whole document: zones first, then MQTT.
pub fn validate_config(config: &ZoneConfig) -> Result<(), EngineError> {
    validate_zones(&config.zones)?;
    validate_mqtt(&config.mqtt)
}
