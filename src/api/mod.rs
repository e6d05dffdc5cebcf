//! Read-only query surface for the dashboard

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::{router, serve};

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::alerts::{Alert, AlertEngine};
use crate::db::{HistoryEntry, PersistenceSink};
use crate::error::PersistenceError;
use crate::ingest::{IngestCounts, IngestStats};
use crate::state::{ShelfReading, ShelfStore};

/// Everything the dashboard polls for
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState {
    pub sensor_data: BTreeMap<String, ShelfReading>,
    pub alerts: Vec<Alert>,
    pub system_status: &'static str,
    pub alarm_active: bool,
    pub ingest: IngestCounts,
}

/// Concurrent reader of shelf state and alert history
#[derive(Clone)]
pub struct Dashboard {
    store: Arc<ShelfStore>,
    engine: Arc<AlertEngine>,
    stats: Arc<IngestStats>,
    sink: Option<Arc<dyn PersistenceSink>>,
    recent_alerts: usize,
    history_limit: usize,
}

impl Dashboard {
    pub fn new(
        store: Arc<ShelfStore>,
        engine: Arc<AlertEngine>,
        stats: Arc<IngestStats>,
        sink: Option<Arc<dyn PersistenceSink>>,
    ) -> Self {
        Self {
            store,
            engine,
            stats,
            sink,
            recent_alerts: 10,
            history_limit: 50,
        }
    }

    pub fn with_limits(mut self, recent_alerts: usize, history_limit: usize) -> Self {
        self.recent_alerts = recent_alerts;
        self.history_limit = history_limit;
        self
    }

    /// Best available in-memory snapshot; never fails
    pub fn current_state(&self) -> DashboardState {
        DashboardState {
            sensor_data: self.store.snapshot(),
            alerts: self.engine.recent(self.recent_alerts),
            system_status: "online",
            alarm_active: self.engine.alarm_active(),
            ingest: self.stats.snapshot(),
        }
    }

    /// Stored readings for a shelf, newest first; empty without a sink
    pub fn history(&self, shelf_id: &str) -> Result<Vec<HistoryEntry>, PersistenceError> {
        match &self.sink {
            Some(sink) => sink.history(shelf_id, self.history_limit),
            None => Ok(Vec::new()),
        }
    }
}
