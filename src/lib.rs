// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! ShelfWatch - warehouse shelf monitoring over MQTT
//!
//! Weight, distance, motion (PIR) and tag-scan (RFID) sensors publish under a
//! single topic namespace. ShelfWatch keeps the live reading of every shelf,
//! raises stock and security alerts, and sounds a buzzer/light alarm when
//! motion is detected.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │   MQTT  warehouse/#                                          │
//! │     │                                                        │
//! │     ▼                                                        │
//! │  ┌──────────┐  weight/distance  ┌────────────┐               │
//! │  │ Ingestor │──────────────────▶│ ShelfStore │──┐            │
//! │  └──────────┘                   └────────────┘  │ reading    │
//! │     │ motion/tag scan                 │         ▼            │
//! │     └──────────────────────────▶┌─────────────┐ ┌──────────┐ │
//! │                                 │ AlertEngine │▶│  Alarm   │ │
//! │                                 └─────────────┘ │Controller│ │
//! │                                    │      │     └──────────┘ │
//! │                      ┌─────────────┘      ▼                  │
//! │                      ▼              ┌──────────┐             │
//! │               ┌───────────┐         │ Recorder │──▶ SQLite   │
//! │               │ Dashboard │         └──────────┘             │
//! │               └───────────┘                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod actuator;
pub mod alerts;
pub mod api;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod ingest;
pub mod state;

// Re-exports for convenience
pub use actuator::{AlarmController, AlarmOutputs, AlarmPattern};
pub use alerts::{Alert, AlertEngine, AlertKind, AlertLog};
pub use api::{Dashboard, DashboardState};
pub use config::Config;
pub use crate::core::Monitor;
pub use db::{Database, PersistenceSink, Recorder};
pub use error::{ActuatorError, IngestError, PersistenceError};
pub use ingest::{Handled, Ingestor, MqttSubscriber, SensorEvent, TopicKind, TopicRouter};
pub use state::{ShelfReading, ShelfStore};

/// ShelfWatch version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// ShelfWatch name
pub const NAME: &str = "ShelfWatch";
