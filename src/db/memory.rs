//! In-memory sink for tests, with switches to fail or stall writes

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Condvar, Mutex};

use super::{HistoryEntry, PersistenceSink};
use crate::alerts::Alert;
use crate::error::PersistenceError;

/// Stored reading with its shelf
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReading {
    pub shelf_id: String,
    pub entry: HistoryEntry,
}

#[derive(Default)]
pub struct MemorySink {
    readings: Mutex<Vec<StoredReading>>,
    alerts: Mutex<Vec<Alert>>,
    tag_scans: Mutex<Vec<String>>,
    failing: AtomicBool,
    blocked: Mutex<bool>,
    unblocked: Condvar,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write return an error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make every write wait until unblocked, like a stalled database
    pub fn set_blocked(&self, blocked: bool) {
        *self.blocked.lock() = blocked;
        if !blocked {
            self.unblocked.notify_all();
        }
    }

    pub fn readings(&self) -> Vec<StoredReading> {
        self.readings.lock().clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().clone()
    }

    pub fn tag_scans(&self) -> Vec<String> {
        self.tag_scans.lock().clone()
    }

    fn gate(&self) -> Result<(), PersistenceError> {
        let mut blocked = self.blocked.lock();
        while *blocked {
            self.unblocked.wait(&mut blocked);
        }
        drop(blocked);

        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistenceError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "sink unavailable",
            )));
        }
        Ok(())
    }
}

impl PersistenceSink for MemorySink {
    fn record_reading(
        &self,
        shelf_id: &str,
        weight: f64,
        distance: u32,
        timestamp: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        self.gate()?;
        self.readings.lock().push(StoredReading {
            shelf_id: shelf_id.to_string(),
            entry: HistoryEntry {
                weight,
                distance,
                timestamp,
            },
        });
        Ok(())
    }

    fn record_alert(&self, alert: &Alert) -> Result<(), PersistenceError> {
        self.gate()?;
        self.alerts.lock().push(alert.clone());
        Ok(())
    }

    fn record_tag_scan(&self, token: &str, _timestamp: DateTime<Utc>) -> Result<(), PersistenceError> {
        self.gate()?;
        self.tag_scans.lock().push(token.to_string());
        Ok(())
    }

    fn history(&self, shelf_id: &str, limit: usize) -> Result<Vec<HistoryEntry>, PersistenceError> {
        Ok(self
            .readings
            .lock()
            .iter()
            .rev()
            .filter(|r| r.shelf_id == shelf_id)
            .take(limit)
            .map(|r| r.entry.clone())
            .collect())
    }
}
