// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Alert engine - stock and security alerts, bounded in-memory history

mod history;

pub use history::AlertLog;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::actuator::AlarmController;
use crate::config::AlertConfig;
use crate::db::{Record, Recorder};
use crate::state::ShelfReading;

/// Alert category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Stock,
    Security,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Stock => "stock",
            AlertKind::Security => "security",
        }
    }
}

/// Immutable alert record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    id: Uuid,
    #[serde(rename = "type")]
    kind: AlertKind,
    message: String,
    timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(kind: AlertKind, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> AlertKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Evaluates sensor updates and raises alerts
///
/// Every qualifying update produces a new alert. Repeated low-stock readings
/// and repeated motion are deliberately not debounced.
pub struct AlertEngine {
    log: AlertLog,
    low_stock_threshold: f64,
    recorder: Recorder,
    alarm: Arc<AlarmController>,
}

impl AlertEngine {
    pub fn new(config: &AlertConfig, recorder: Recorder, alarm: Arc<AlarmController>) -> Self {
        Self {
            log: AlertLog::new(config.log_capacity),
            low_stock_threshold: config.low_stock_threshold,
            recorder,
            alarm,
        }
    }

    /// Raise a stock alert if the shelf weight is below threshold
    pub fn evaluate_weight(&self, shelf_id: &str, reading: &ShelfReading) -> Option<Alert> {
        if reading.weight >= self.low_stock_threshold {
            return None;
        }

        let message = format!(
            "Shelf {} is low on stock! Current weight: {}kg",
            shelf_id, reading.weight
        );
        info!("{}", message);
        Some(self.raise(AlertKind::Stock, message))
    }

    /// Raise a security alert and start the alarm when motion is detected
    pub fn on_motion(&self, detected: bool) -> Option<Alert> {
        if !detected {
            return None;
        }

        warn!("Unauthorized motion detected in warehouse!");
        let alert = self.raise(AlertKind::Security, "Unauthorized motion detected in warehouse!");
        self.alarm.trigger();
        Some(alert)
    }

    /// Record a tag scan; scans never raise alerts or touch the alarm
    pub fn on_tag_scan(&self, token: &str) {
        info!("RFID scan: {}", token);
        self.recorder.record(Record::TagScan {
            token: token.to_string(),
            timestamp: Utc::now(),
        });
    }

    /// Last `n` alerts, oldest first
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        self.log.recent(n)
    }

    pub fn log(&self) -> &AlertLog {
        &self.log
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm.is_running()
    }

    fn raise(&self, kind: AlertKind, message: impl Into<String>) -> Alert {
        let alert = Alert::new(kind, message);
        self.log.append(alert.clone());
        self.recorder.record(Record::Alert(alert.clone()));
        alert
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{AlarmPattern, RecordingOutputs};
    use crate::db::MemorySink;
    use tokio::runtime::Handle;

    fn reading(weight: f64) -> ShelfReading {
        ShelfReading {
            weight,
            distance: 100,
            item_count: (weight / 0.5).floor() as u32,
            last_update: Some(Utc::now()),
        }
    }

    fn engine(recorder: Recorder) -> (Arc<RecordingOutputs>, Arc<AlarmController>, AlertEngine) {
        let outputs = Arc::new(RecordingOutputs::new());
        let alarm = Arc::new(AlarmController::new(
            outputs.clone(),
            AlarmPattern::default(),
            Handle::current(),
        ));
        let engine = AlertEngine::new(&AlertConfig::default(), recorder, alarm.clone());
        (outputs, alarm, engine)
    }

    #[tokio::test]
    async fn test_low_weight_raises_stock_alert() {
        let (_, _, engine) = engine(Recorder::disabled());

        let alert = engine.evaluate_weight("shelf1", &reading(1.5)).unwrap();
        assert_eq!(alert.kind(), AlertKind::Stock);
        assert!(alert.message().contains("1.5kg"));
        assert!(alert.message().contains("shelf1"));
        assert_eq!(engine.recent(10), vec![alert]);
    }

    #[tokio::test]
    async fn test_weight_at_threshold_is_fine() {
        let (_, _, engine) = engine(Recorder::disabled());

        assert!(engine.evaluate_weight("shelf1", &reading(2.0)).is_none());
        assert!(engine.evaluate_weight("shelf1", &reading(7.25)).is_none());
        assert!(engine.log().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_low_stock_not_suppressed() {
        let (_, _, engine) = engine(Recorder::disabled());

        for _ in 0..3 {
            engine.evaluate_weight("shelf1", &reading(0.5));
        }
        assert_eq!(engine.log().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_motion_alerts_every_time_but_alarms_once() {
        let (outputs, alarm, engine) = engine(Recorder::disabled());

        let first = engine.on_motion(true).unwrap();
        assert_eq!(first.kind(), AlertKind::Security);
        assert!(alarm.is_running());

        let second = engine.on_motion(true).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(engine.log().len(), 2);
        assert_eq!(alarm.sequences_started(), 1);

        alarm.wait_idle().await;
        assert_eq!(outputs.on_count(), 10);
    }

    #[tokio::test]
    async fn test_no_motion_is_ignored() {
        let (outputs, alarm, engine) = engine(Recorder::disabled());

        assert!(engine.on_motion(false).is_none());
        assert!(engine.log().is_empty());
        assert!(!alarm.is_running());
        assert_eq!(outputs.on_count(), 0);
    }

    #[tokio::test]
    async fn test_tag_scan_is_recorded_without_alert() {
        let sink = Arc::new(MemorySink::new());
        let (recorder, worker) = Recorder::spawn(sink.clone(), 8).unwrap();
        let (_, alarm, engine) = engine(recorder);

        engine.on_tag_scan("04A3B2C1");
        assert!(engine.log().is_empty());
        assert!(!alarm.is_running());

        drop(engine);
        tokio::task::spawn_blocking(move || worker.join()).await.unwrap();
        assert_eq!(sink.tag_scans(), vec!["04A3B2C1".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistence_failure_keeps_alert_and_alarm() {
        let sink = Arc::new(MemorySink::new());
        sink.set_failing(true);
        let (recorder, worker) = Recorder::spawn(sink.clone(), 8).unwrap();
        let (_, alarm, engine) = engine(recorder);

        engine.on_motion(true);
        assert_eq!(engine.log().len(), 1);
        assert!(alarm.is_running());

        drop(engine);
        tokio::task::spawn_blocking(move || worker.join()).await.unwrap();
        assert!(sink.alerts().is_empty());
        alarm.wait_idle().await;
    }

    #[test]
    fn test_alert_serializes_dashboard_fields() {
        let alert = Alert::new(AlertKind::Security, "motion");
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "security");
        assert_eq!(json["message"], "motion");
        assert!(json["timestamp"].is_string());
    }
}
