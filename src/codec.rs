//! MQTT topic and payload codec.
//!
//! ```text
//!   {prefix}/zone/{id}/command   "on" | "off"   controller → actuator
//!   {prefix}/zone/{id}/state     "on" | "off"   actuator → controller
//! ```
//!
//! Decoding is strict: anything that is not a well-formed state report is
//! rejected here and never reaches the engine.

use core::fmt;

use crate::app::ports::{StateReport, ValveCommand};
use crate::zones::{MAX_ZONES, ZoneId};

const ON: &str = "on";
const OFF: &str = "off";

/// Why an inbound message was not turned into a [`StateReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Topic is not shaped `{prefix}/zone/{id}/state`.  Not an error on the
    /// wire (other traffic may share the broker), so callers drop it quietly.
    NotAStateTopic,
    /// The id segment is not an integer in `0..8`.
    BadZoneId(String),
    /// The payload is not `on` or `off`.
    BadPayload(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAStateTopic => write!(f, "not a zone state topic"),
            Self::BadZoneId(raw) => write!(f, "invalid zone id in topic: {raw}"),
            Self::BadPayload(raw) => write!(f, "invalid state payload: {raw}"),
        }
    }
}

impl std::error::Error for ReportError {}

/// Topic a command for `zone` is published on.
pub fn command_topic(prefix: &str, zone: ZoneId) -> String {
    format!("{prefix}/zone/{zone}/command")
}

/// Topic `zone`'s actuator reports its state on.
pub fn state_topic(prefix: &str, zone: ZoneId) -> String {
    format!("{prefix}/zone/{zone}/state")
}

/// State topics for every zone id the controller tracks.
pub fn state_topics(prefix: &str) -> impl Iterator<Item = String> + '_ {
    (0..MAX_ZONES as ZoneId).map(move |zone| state_topic(prefix, zone))
}

/// Topic and payload for an outbound command.
pub fn encode_command(prefix: &str, command: ValveCommand) -> (String, &'static str) {
    let payload = if command.on { ON } else { OFF };
    (command_topic(prefix, command.zone), payload)
}

/// Parse an inbound message into a state report.  Topics under any prefix
/// other than `prefix` are not ours.
pub fn decode_report(prefix: &str, topic: &str, payload: &[u8]) -> Result<StateReport, ReportError> {
    let parts: Vec<&str> = topic.split('/').collect();
    let [first, "zone", raw_id, "state"] = parts.as_slice() else {
        return Err(ReportError::NotAStateTopic);
    };
    if *first != prefix {
        return Err(ReportError::NotAStateTopic);
    }

    let zone = raw_id
        .parse::<ZoneId>()
        .ok()
        .filter(|&z| (z as usize) < MAX_ZONES)
        .ok_or_else(|| ReportError::BadZoneId((*raw_id).to_string()))?;

    let text = String::from_utf8_lossy(payload).trim().to_ascii_lowercase();
    let on = match text.as_str() {
        ON => true,
        OFF => false,
        _ => return Err(ReportError::BadPayload(text)),
    };
    Ok(StateReport { zone, on })
}
