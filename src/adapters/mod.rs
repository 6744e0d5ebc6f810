//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                     | Connects to             |
//! |--------------|--------------------------------|-------------------------|
//! | `json_store` | ConfigPort                     | JSON document on disk   |
//! | `log_sink`   | EventSink                      | `log` facade            |
//! | `mqtt`       | CommandChannel, ReportSource   | MQTT broker (rumqttc)   |
//! | `offline`    | CommandChannel                 | nothing (bus disabled)  |

pub mod json_store;
pub mod log_sink;
#[cfg(feature = "mqtt")]
pub mod mqtt;
pub mod offline;
