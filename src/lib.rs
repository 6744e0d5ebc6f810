//! ValveControl irrigation controller library.
//!
//! Exposes the zone dependency engine, its configuration document, and the
//! adapters that connect it to an MQTT actuator bus.  The MQTT adapter is
//! guarded by the `mqtt` feature; everything else builds without it.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod codec;
pub mod config;
pub mod console;
pub mod error;
pub mod zones;
