// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Monitor - owns every component and hands out handles

use std::sync::Arc;

use anyhow::Result;
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::actuator::{AlarmController, AlarmOutputs, AlarmPattern};
use crate::alerts::AlertEngine;
use crate::api::Dashboard;
use crate::config::Config;
use crate::db::{PersistenceSink, Recorder, RecorderWorker};
use crate::ingest::{Ingestor, TopicRouter};
use crate::state::ShelfStore;

/// The running shelf monitor
pub struct Monitor {
    pub config: Arc<Config>,
    store: Arc<ShelfStore>,
    engine: Arc<AlertEngine>,
    alarm: Arc<AlarmController>,
    ingestor: Arc<Ingestor>,
    sink: Option<Arc<dyn PersistenceSink>>,
    worker: Option<RecorderWorker>,
}

impl Monitor {
    /// Build all components; alarm outputs are forced off here
    pub fn new(
        config: Config,
        sink: Option<Arc<dyn PersistenceSink>>,
        outputs: Arc<dyn AlarmOutputs>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let (recorder, worker) = match &sink {
            Some(sink) => {
                let (recorder, worker) = Recorder::spawn(sink.clone(), config.database.queue_capacity)?;
                (recorder, Some(worker))
            }
            None => (Recorder::disabled(), None),
        };

        let alarm = Arc::new(AlarmController::new(
            outputs,
            AlarmPattern::from_config(&config.actuator),
            runtime,
        ));
        let store = Arc::new(ShelfStore::new(&config.shelves, recorder.clone()));
        let engine = Arc::new(AlertEngine::new(&config.alerts, recorder, alarm.clone()));
        let router = TopicRouter::from_config(&config.mqtt, &config.shelves);
        let ingestor = Arc::new(Ingestor::new(router, store.clone(), engine.clone()));

        info!(
            "Monitor ready: {} shelves, low stock below {}kg, persistence {}",
            store.len(),
            config.alerts.low_stock_threshold,
            if worker.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            config,
            store,
            engine,
            alarm,
            ingestor,
            sink,
            worker,
        })
    }

    pub fn ingestor(&self) -> Arc<Ingestor> {
        self.ingestor.clone()
    }

    pub fn store(&self) -> Arc<ShelfStore> {
        self.store.clone()
    }

    pub fn engine(&self) -> Arc<AlertEngine> {
        self.engine.clone()
    }

    pub fn alarm(&self) -> Arc<AlarmController> {
        self.alarm.clone()
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(
            self.store.clone(),
            self.engine.clone(),
            self.ingestor.stats(),
            self.sink.clone(),
        )
        .with_limits(self.config.alerts.dashboard_recent, self.config.database.history_limit)
    }

    /// Let a running alarm finish, then drain the persistence queue
    ///
    /// Handles given out earlier (ingestor, dashboard) should be dropped
    /// first; otherwise the drain gives up after a timeout.
    pub async fn shutdown(mut self) -> u64 {
        info!("Stopping monitor...");
        self.alarm.wait_idle().await;

        let drain_timeout = self.config.database.drain_timeout();
        let worker = self.worker.take();
        drop(self);

        let Some(worker) = worker else {
            return 0;
        };

        match worker.drain(drain_timeout).await {
            Some(written) => {
                info!("Persisted {} records", written);
                written
            }
            None => {
                warn!("Persistence drain timed out; pending records may be lost");
                0
            }
        }
    }
}
