// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Shelf state store - canonical current reading per shelf

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ShelfConfig;
use crate::db::{Record, Recorder};

/// Current reading of one shelf
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfReading {
    /// Kilograms
    pub weight: f64,
    pub distance: u32,
    /// floor(weight / item unit weight)
    #[serde(rename = "items")]
    pub item_count: u32,
    pub last_update: Option<DateTime<Utc>>,
}

impl ShelfReading {
    fn empty(initial_distance: u32) -> Self {
        Self {
            weight: 0.0,
            distance: initial_distance,
            item_count: 0,
            last_update: None,
        }
    }
}

/// Holds every shelf's reading behind one lock
///
/// Each update runs entirely under the write lock, so readers see either the
/// previous reading or the new one, never a weight without its item count.
pub struct ShelfStore {
    shelves: RwLock<HashMap<String, ShelfReading>>,
    item_unit_weight: f64,
    initial_distance: u32,
    recorder: Recorder,
}

impl ShelfStore {
    pub fn new(config: &ShelfConfig, recorder: Recorder) -> Self {
        let shelves = config
            .known
            .iter()
            .map(|id| (id.clone(), ShelfReading::empty(config.initial_distance)))
            .collect();

        Self {
            shelves: RwLock::new(shelves),
            item_unit_weight: config.item_unit_weight,
            initial_distance: config.initial_distance,
            recorder,
        }
    }

    /// Set weight, recompute item count and stamp the update
    ///
    /// Returns the post-update reading for threshold evaluation. The reading
    /// is handed to the recorder after the lock is released.
    pub fn update_weight(&self, shelf_id: &str, weight: f64) -> ShelfReading {
        let now = Utc::now();
        let snapshot = {
            let mut shelves = self.shelves.write();
            let reading = shelves
                .entry(shelf_id.to_string())
                .or_insert_with(|| ShelfReading::empty(self.initial_distance));

            reading.weight = weight;
            reading.item_count = item_count(weight, self.item_unit_weight);
            reading.last_update = Some(now);
            reading.clone()
        };

        debug!(
            "Shelf {} weight {}kg ({} items)",
            shelf_id, snapshot.weight, snapshot.item_count
        );

        self.recorder.record(Record::Reading {
            shelf_id: shelf_id.to_string(),
            weight: snapshot.weight,
            distance: snapshot.distance,
            timestamp: now,
        });

        snapshot
    }

    /// Set distance and stamp the update; weight and item count are untouched
    pub fn update_distance(&self, shelf_id: &str, distance: u32) -> ShelfReading {
        let mut shelves = self.shelves.write();
        let reading = shelves
            .entry(shelf_id.to_string())
            .or_insert_with(|| ShelfReading::empty(self.initial_distance));

        reading.distance = distance;
        reading.last_update = Some(Utc::now());

        debug!("Shelf {} distance {}", shelf_id, distance);
        reading.clone()
    }

    pub fn get(&self, shelf_id: &str) -> Option<ShelfReading> {
        self.shelves.read().get(shelf_id).cloned()
    }

    /// Consistent copy of all shelves, ordered by id
    pub fn snapshot(&self) -> BTreeMap<String, ShelfReading> {
        self.shelves
            .read()
            .iter()
            .map(|(id, reading)| (id.clone(), reading.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shelves.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.read().is_empty()
    }
}

fn item_count(weight: f64, unit: f64) -> u32 {
    // `as` saturates, and ingestion already rejects negative weights
    (weight / unit).floor() as u32
}
