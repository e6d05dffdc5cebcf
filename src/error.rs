// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Error types for the event path
//!
//! None of these ever escape the ingestion worker. They exist so each
//! failure can be logged with enough context and tested in isolation.

use thiserror::Error;

/// Failure to turn a bus message into a sensor event
#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    /// Payload was not valid UTF-8
    #[error("payload on '{topic}' is not valid UTF-8")]
    Decode { topic: String },

    /// Weight payload was not a finite, non-negative number
    #[error("invalid weight payload '{payload}'")]
    InvalidWeight { payload: String },

    /// Distance payload was not a non-negative integer
    #[error("invalid distance payload '{payload}'")]
    InvalidDistance { payload: String },

    /// Topic carries none of the known sensor keywords
    #[error("unknown topic '{0}'")]
    UnknownTopic(String),
}

impl IngestError {
    /// Unknown topics are expected noise on a wildcard subscription
    pub fn is_unknown_topic(&self) -> bool {
        matches!(self, IngestError::UnknownTopic(_))
    }
}

/// Failure to durably record a reading, alert or scan
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("persistence queue full, record dropped")]
    QueueFull,

    #[error("persistence worker has stopped")]
    Closed,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to drive an alarm output
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("gpio pin {pin}: {message}")]
    Gpio { pin: u32, message: String },
}
