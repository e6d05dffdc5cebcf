// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Database module for persistent storage
//!
//! The event path never talks to SQLite directly. It hands records to a
//! [`Recorder`], whose worker thread feeds them to a [`PersistenceSink`].

mod memory;
mod recorder;

pub use memory::{MemorySink, StoredReading};
pub use recorder::{Record, Recorder, RecorderWorker};

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::info;

use crate::alerts::Alert;
use crate::config::DatabaseConfig;
use crate::error::PersistenceError;

/// Durable append-only log of readings, alerts and tag scans
pub trait PersistenceSink: Send + Sync {
    fn record_reading(
        &self,
        shelf_id: &str,
        weight: f64,
        distance: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;

    fn record_alert(&self, alert: &Alert) -> Result<(), PersistenceError>;

    fn record_tag_scan(&self, token: &str, timestamp: DateTime<Utc>) -> Result<(), PersistenceError>;

    /// Most recent readings for a shelf, newest first
    fn history(&self, shelf_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, PersistenceError>;
}

/// One stored reading as returned by a history query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub weight: f64,
    pub distance: u32,
    pub timestamp: DateTime<Utc>,
}

/// SQLite-backed sink
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        "#,
        )?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {:?}", config.path);
        Ok(db)
    }

    /// In-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sensor_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                shelf_id TEXT NOT NULL,
                weight REAL NOT NULL,
                distance INTEGER NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sensor_data_shelf ON sensor_data(shelf_id, timestamp);

            CREATE TABLE IF NOT EXISTS alerts (
                id TEXT PRIMARY KEY,
                type TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);

            CREATE TABLE IF NOT EXISTS tag_scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );
        "#,
        )?;

        Ok(())
    }

    pub fn alert_count(&self) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn tag_scan_count(&self) -> Result<usize, PersistenceError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tag_scans", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl PersistenceSink for Database {
    fn record_reading(
        &self,
        shelf_id: &str,
        weight: f64,
        distance: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sensor_data (shelf_id, weight, distance, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![shelf_id, weight, distance, stamp(timestamp)],
        )?;
        Ok(())
    }

    fn record_alert(&self, alert: &Alert) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO alerts (id, type, message, timestamp) VALUES (?1, ?2, ?3, ?4)",
            params![
                alert.id().to_string(),
                alert.kind().as_str(),
                alert.message(),
                stamp(alert.timestamp())
            ],
        )?;
        Ok(())
    }

    fn record_tag_scan(&self, token: &str, timestamp: DateTime<Utc>) -> Result<(), PersistenceError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO tag_scans (token, timestamp) VALUES (?1, ?2)",
            params![token, stamp(timestamp)],
        )?;
        Ok(())
    }

    fn history(&self, shelf_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, PersistenceError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT weight, distance, timestamp FROM sensor_data
             WHERE shelf_id = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
        )?;

        let rows = stmt.query_map(params![shelf_id, limit as i64], |row| {
            let raw: String = row.get(2)?;
            let timestamp = DateTime::parse_from_rfc3339(&raw)
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
                })?
                .with_timezone(&Utc);

            Ok(HistoryEntry {
                weight: row.get(0)?,
                distance: row.get(1)?,
                timestamp,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn stamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}
