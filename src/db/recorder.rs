// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Fire-and-forget hand-off from the event path to a persistence sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::PersistenceSink;
use crate::alerts::Alert;
use crate::error::PersistenceError;

/// Something the event path wants stored
#[derive(Debug, Clone)]
pub enum Record {
    Reading {
        shelf_id: String,
        weight: f64,
        distance: u32,
        timestamp: DateTime<Utc>,
    },
    Alert(Alert),
    TagScan {
        token: String,
        timestamp: DateTime<Utc>,
    },
}

/// Non-blocking handle to the persistence worker
///
/// Cloned into every component that records. The worker exits once every
/// clone is dropped and the queue has drained.
#[derive(Clone)]
pub struct Recorder {
    tx: Option<mpsc::Sender<Record>>,
    dropped: Arc<AtomicU64>,
}

impl Recorder {
    /// Start a worker thread that writes queued records to `sink`
    pub fn spawn(
        sink: Arc<dyn PersistenceSink>,
        capacity: usize,
    ) -> std::io::Result<(Self, RecorderWorker)> {
        let (tx, mut rx) = mpsc::channel::<Record>(capacity.max(1));
        let (done_tx, done) = oneshot::channel();

        // Detached: a stalled sink must not keep the process alive
        std::thread::Builder::new()
            .name("shelfwatch-recorder".to_string())
            .spawn(move || {
                let mut written = 0u64;
                while let Some(record) = rx.blocking_recv() {
                    match write(sink.as_ref(), &record) {
                        Ok(()) => written += 1,
                        Err(e) => warn!("Persistence failed for {}: {}", describe(&record), e),
                    }
                }
                debug!("Recorder worker stopped after {} records", written);
                let _ = done_tx.send(written);
            })?;

        let recorder = Self {
            tx: Some(tx),
            dropped: Arc::new(AtomicU64::new(0)),
        };
        Ok((recorder, RecorderWorker { done }))
    }

    /// Recorder that discards everything
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a record without waiting
    pub fn try_record(&self, record: Record) -> Result<(), PersistenceError> {
        let Some(tx) = &self.tx else {
            return Ok(());
        };

        tx.try_send(record).map_err(|e| {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(_) => PersistenceError::QueueFull,
                TrySendError::Closed(_) => PersistenceError::Closed,
            }
        })
    }

    /// Queue a record, logging instead of failing
    pub fn record(&self, record: Record) {
        let what = describe(&record);
        if let Err(e) = self.try_record(record) {
            warn!("Dropping {}: {}", what, e);
        }
    }

    /// Records that never reached the queue
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Completion signal of the worker thread
pub struct RecorderWorker {
    done: oneshot::Receiver<u64>,
}

impl RecorderWorker {
    /// Block until the queue drains; returns records written
    ///
    /// Every [`Recorder`] clone must be dropped first or this never returns.
    /// Must not be called from inside the runtime.
    pub fn join(self) -> u64 {
        match self.done.blocking_recv() {
            Ok(written) => written,
            Err(_) => {
                warn!("Recorder worker panicked");
                0
            }
        }
    }

    /// Wait up to `limit` for the queue to drain
    ///
    /// Returns `None` on timeout. The worker keeps running in the background
    /// and dies with the process.
    pub async fn drain(self, limit: Duration) -> Option<u64> {
        match tokio::time::timeout(limit, self.done).await {
            Ok(Ok(written)) => Some(written),
            Ok(Err(_)) => {
                warn!("Recorder worker panicked");
                Some(0)
            }
            Err(_) => None,
        }
    }
}

fn write(sink: &dyn PersistenceSink, record: &Record) -> Result<(), PersistenceError> {
    match record {
        Record::Reading {
            shelf_id,
            weight,
            distance,
            timestamp,
        } => sink.record_reading(shelf_id, *weight, *distance, *timestamp),
        Record::Alert(alert) => sink.record_alert(alert),
        Record::TagScan { token, timestamp } => sink.record_tag_scan(token, *timestamp),
    }
}

fn describe(record: &Record) -> String {
    match record {
        Record::Reading { shelf_id, .. } => format!("reading for {}", shelf_id),
        Record::Alert(alert) => format!("{} alert", alert.kind().as_str()),
        Record::TagScan { token, .. } => format!("tag scan {}", token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;
    use crate::db::MemorySink;

    #[test]
    fn test_worker_drains_queue_on_shutdown() {
        let sink = Arc::new(MemorySink::new());
        let (recorder, worker) = Recorder::spawn(sink.clone(), 16).unwrap();

        recorder.record(Record::Reading {
            shelf_id: "shelf1".to_string(),
            weight: 1.5,
            distance: 100,
            timestamp: Utc::now(),
        });
        recorder.record(Record::Alert(Alert::new(AlertKind::Stock, "low")));
        recorder.record(Record::TagScan {
            token: "CAFE".to_string(),
            timestamp: Utc::now(),
        });

        drop(recorder);
        assert_eq!(worker.join(), 3);
        assert_eq!(sink.readings().len(), 1);
        assert_eq!(sink.alerts().len(), 1);
        assert_eq!(sink.tag_scans(), vec!["CAFE".to_string()]);
    }

    #[test]
    fn test_sink_failure_is_not_fatal() {
        let sink = Arc::new(MemorySink::new());
        sink.set_failing(true);
        let (recorder, worker) = Recorder::spawn(sink.clone(), 16).unwrap();

        recorder.record(Record::Alert(Alert::new(AlertKind::Security, "first")));
        recorder.record(Record::Alert(Alert::new(AlertKind::Security, "second")));

        drop(recorder);
        assert_eq!(worker.join(), 0);
        assert!(sink.alerts().is_empty());
    }

    #[test]
    fn test_full_queue_drops_instead_of_blocking() {
        let sink = Arc::new(MemorySink::new());
        sink.set_blocked(true);
        let (recorder, worker) = Recorder::spawn(sink.clone(), 1).unwrap();

        for i in 0..10 {
            recorder.record(Record::TagScan {
                token: format!("tag-{}", i),
                timestamp: Utc::now(),
            });
        }
        assert!(recorder.dropped() > 0);

        sink.set_blocked(false);
        drop(recorder);
        worker.join();
    }

    #[tokio::test]
    async fn test_drain_gives_up_on_stalled_sink() {
        let sink = Arc::new(MemorySink::new());
        sink.set_blocked(true);
        let (recorder, worker) = Recorder::spawn(sink.clone(), 4).unwrap();
        recorder.record(Record::TagScan {
            token: "stuck".to_string(),
            timestamp: Utc::now(),
        });
        drop(recorder);

        assert_eq!(worker.drain(Duration::from_millis(50)).await, None);
        sink.set_blocked(false);
    }

    #[tokio::test]
    async fn test_drain_reports_written() {
        let sink = Arc::new(MemorySink::new());
        let (recorder, worker) = Recorder::spawn(sink.clone(), 4).unwrap();
        recorder.record(Record::TagScan {
            token: "ok".to_string(),
            timestamp: Utc::now(),
        });
        drop(recorder);

        assert_eq!(worker.drain(Duration::from_secs(5)).await, Some(1));
    }

    #[test]
    fn test_disabled_recorder_accepts_everything() {
        let recorder = Recorder::disabled();
        assert!(!recorder.is_enabled());
        assert!(recorder
            .try_record(Record::Alert(Alert::new(AlertKind::Stock, "x")))
            .is_ok());
        assert_eq!(recorder.dropped(), 0);
    }
}
