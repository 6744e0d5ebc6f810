//! Application core — the zone dependency engine.
//!
//! [`service::ZoneService`] holds the cascade rules as pure logic with no
//! locking and no I/O.  [`engine::ZoneEngine`] wraps it in the critical
//! section shared by the local console and the remote report pump.  All
//! interaction with the actuator bus goes through the **port traits** in
//! [`ports`], keeping this layer testable without a broker.

pub mod commands;
pub mod engine;
pub mod events;
pub mod ports;
pub mod service;
