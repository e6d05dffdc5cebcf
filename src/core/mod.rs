//! Core module - wires the store, alert engine, actuator and recorder together

mod monitor;

pub use monitor::Monitor;
