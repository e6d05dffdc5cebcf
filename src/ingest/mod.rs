// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Event ingestion - topic classification, payload parsing and dispatch
//!
//! Topics are matched by substring, checked in this order:
//!
//! | keyword    | kind       | payload                      |
//! |------------|------------|------------------------------|
//! | `weight`   | Weight     | decimal kilograms            |
//! | `distance` | Distance   | unsigned integer             |
//! | `pir`      | Motion     | `"1"` detected, else nothing |
//! | `rfid`     | TagScan    | opaque token                 |

mod mqtt;

pub use mqtt::MqttSubscriber;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::alerts::AlertEngine;
use crate::config::{MqttConfig, ShelfConfig};
use crate::error::IngestError;
use crate::state::ShelfStore;

/// Sensor kind a topic carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Weight,
    Distance,
    Motion,
    TagScan,
    Unknown,
}

impl TopicKind {
    const KEYWORDS: [(&'static str, TopicKind); 4] = [
        ("weight", TopicKind::Weight),
        ("distance", TopicKind::Distance),
        ("pir", TopicKind::Motion),
        ("rfid", TopicKind::TagScan),
    ];

    pub fn classify(topic: &str) -> Self {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| topic.contains(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(TopicKind::Unknown)
    }

    pub fn keyword(&self) -> Option<&'static str> {
        Self::KEYWORDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(keyword, _)| *keyword)
    }
}

/// A successfully parsed sensor message
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Weight { shelf_id: String, kg: f64 },
    Distance { shelf_id: String, distance: u32 },
    Motion { detected: bool },
    TagScan { token: String },
}

/// Turns `(topic, payload)` into a [`SensorEvent`]
#[derive(Debug, Clone)]
pub struct TopicRouter {
    prefix: String,
    default_shelf: String,
}

impl TopicRouter {
    pub fn new(prefix: impl Into<String>, default_shelf: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            default_shelf: default_shelf.into(),
        }
    }

    pub fn from_config(mqtt: &MqttConfig, shelves: &ShelfConfig) -> Self {
        Self::new(mqtt.topic_prefix.clone(), shelves.default_shelf.clone())
    }

    pub fn parse(&self, topic: &str, payload: &[u8]) -> Result<SensorEvent, IngestError> {
        let decode = || {
            std::str::from_utf8(payload).map_err(|_| IngestError::Decode {
                topic: topic.to_string(),
            })
        };

        match TopicKind::classify(topic) {
            TopicKind::Weight => Ok(SensorEvent::Weight {
                shelf_id: self.shelf_for(topic, TopicKind::Weight),
                kg: parse_weight(decode()?)?,
            }),
            TopicKind::Distance => {
                let text = decode()?;
                Ok(SensorEvent::Distance {
                    shelf_id: self.shelf_for(topic, TopicKind::Distance),
                    distance: text.trim().parse().map_err(|_| IngestError::InvalidDistance {
                        payload: text.to_string(),
                    })?,
                })
            }
            TopicKind::Motion => Ok(SensorEvent::Motion {
                detected: decode()? == "1",
            }),
            TopicKind::TagScan => Ok(SensorEvent::TagScan {
                token: decode()?.to_string(),
            }),
            TopicKind::Unknown => Err(IngestError::UnknownTopic(topic.to_string())),
        }
    }

    /// Segment just before the keyword segment, e.g. `warehouse/shelf2/weight`
    fn shelf_for(&self, topic: &str, kind: TopicKind) -> String {
        let rest = topic
            .strip_prefix(self.prefix.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or(topic);

        let segments: Vec<&str> = rest.split('/').collect();
        let shelf = kind
            .keyword()
            .and_then(|keyword| segments.iter().position(|s| s.contains(keyword)))
            .filter(|&pos| pos > 0)
            .map(|pos| segments[pos - 1])
            .filter(|s| !s.is_empty());

        shelf.unwrap_or(self.default_shelf.as_str()).to_string()
    }
}

fn parse_weight(text: &str) -> Result<f64, IngestError> {
    let invalid = || IngestError::InvalidWeight {
        payload: text.to_string(),
    };
    let kg: f64 = text.trim().parse().map_err(|_| invalid())?;
    if !kg.is_finite() || kg < 0.0 {
        return Err(invalid());
    }
    Ok(kg)
}

/// Counters for what ingestion did with each message
#[derive(Default)]
pub struct IngestStats {
    accepted: AtomicU64,
    discarded: AtomicU64,
    ignored: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    pub accepted: u64,
    pub discarded: u64,
    pub ignored: u64,
}

impl IngestStats {
    pub fn snapshot(&self) -> IngestCounts {
        IngestCounts {
            accepted: self.accepted.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
        }
    }
}

/// What happened to one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Accepted,
    /// Unknown topic
    Ignored,
    /// Malformed payload
    Discarded,
}

/// Routes parsed events into the state store and alert engine
///
/// Called by the single bus consumer. Never fails: every per-message error is
/// logged and counted, and the next message is processed as normal.
pub struct Ingestor {
    router: TopicRouter,
    store: Arc<ShelfStore>,
    engine: Arc<AlertEngine>,
    stats: Arc<IngestStats>,
}

impl Ingestor {
    pub fn new(router: TopicRouter, store: Arc<ShelfStore>, engine: Arc<AlertEngine>) -> Self {
        Self {
            router,
            store,
            engine,
            stats: Arc::new(IngestStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<IngestStats> {
        self.stats.clone()
    }

    pub fn handle(&self, topic: &str, payload: &[u8]) -> Handled {
        match self.router.parse(topic, payload) {
            Ok(event) => {
                self.dispatch(event);
                self.stats.accepted.fetch_add(1, Ordering::Relaxed);
                Handled::Accepted
            }
            Err(e) if e.is_unknown_topic() => {
                debug!("Ignoring message: {}", e);
                self.stats.ignored.fetch_add(1, Ordering::Relaxed);
                Handled::Ignored
            }
            Err(e) => {
                warn!("Discarding message on '{}': {}", topic, e);
                self.stats.discarded.fetch_add(1, Ordering::Relaxed);
                Handled::Discarded
            }
        }
    }

    fn dispatch(&self, event: SensorEvent) {
        match event {
            SensorEvent::Weight { shelf_id, kg } => {
                let reading = self.store.update_weight(&shelf_id, kg);
                self.engine.evaluate_weight(&shelf_id, &reading);
            }
            SensorEvent::Distance { shelf_id, distance } => {
                self.store.update_distance(&shelf_id, distance);
            }
            SensorEvent::Motion { detected } => {
                self.engine.on_motion(detected);
            }
            SensorEvent::TagScan { token } => {
                self.engine.on_tag_scan(&token);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> TopicRouter {
        TopicRouter::new("warehouse", "shelf1")
    }

    #[test]
    fn test_classify_by_substring() {
        assert_eq!(TopicKind::classify("warehouse/shelf1/weight"), TopicKind::Weight);
        assert_eq!(TopicKind::classify("warehouse/weight_kg"), TopicKind::Weight);
        assert_eq!(TopicKind::classify("warehouse/distance"), TopicKind::Distance);
        assert_eq!(TopicKind::classify("warehouse/door/pir"), TopicKind::Motion);
        assert_eq!(TopicKind::classify("warehouse/gate/rfid"), TopicKind::TagScan);
        assert_eq!(TopicKind::classify("warehouse/humidity"), TopicKind::Unknown);
    }

    #[test]
    fn test_parse_weight_and_distance() {
        let router = router();
        assert_eq!(
            router.parse("warehouse/weight", b"1.5").unwrap(),
            SensorEvent::Weight {
                shelf_id: "shelf1".to_string(),
                kg: 1.5
            }
        );
        assert_eq!(
            router.parse("warehouse/shelf3/distance", b" 42\n").unwrap(),
            SensorEvent::Distance {
                shelf_id: "shelf3".to_string(),
                distance: 42
            }
        );
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        let router = router();
        assert!(matches!(
            router.parse("warehouse/weight", b"heavy"),
            Err(IngestError::InvalidWeight { .. })
        ));
        assert!(matches!(
            router.parse("warehouse/weight", b"-3"),
            Err(IngestError::InvalidWeight { .. })
        ));
        assert!(matches!(
            router.parse("warehouse/weight", b"NaN"),
            Err(IngestError::InvalidWeight { .. })
        ));
        assert!(matches!(
            router.parse("warehouse/distance", b"12.5"),
            Err(IngestError::InvalidDistance { .. })
        ));
        assert!(matches!(
            router.parse("warehouse/distance", &[0xff, 0xfe]),
            Err(IngestError::Decode { .. })
        ));
    }

    #[test]
    fn test_motion_only_on_literal_one() {
        let router = router();
        assert_eq!(
            router.parse("warehouse/pir", b"1").unwrap(),
            SensorEvent::Motion { detected: true }
        );
        for payload in [&b"0"[..], &b"true"[..], &b""[..], &b"11"[..]] {
            assert_eq!(
                router.parse("warehouse/pir", payload).unwrap(),
                SensorEvent::Motion { detected: false }
            );
        }
    }

    #[test]
    fn test_tag_token_is_opaque() {
        assert_eq!(
            router().parse("warehouse/rfid", b"04:A3 B2").unwrap(),
            SensorEvent::TagScan {
                token: "04:A3 B2".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_topic() {
        let err = router().parse("warehouse/temperature", b"21").unwrap_err();
        assert!(err.is_unknown_topic());
    }

    #[test]
    fn test_unknown_topic_wins_over_bad_payload() {
        let err = router().parse("warehouse/humidity", &[0xff, 0xfe]).unwrap_err();
        assert!(err.is_unknown_topic());
    }

    #[test]
    fn test_shelf_derived_from_topic() {
        let router = router();
        let shelf = |topic: &str| match router.parse(topic, b"3").unwrap() {
            SensorEvent::Weight { shelf_id, .. } => shelf_id,
            SensorEvent::Distance { shelf_id, .. } => shelf_id,
            other => panic!("unexpected {:?}", other),
        };

        assert_eq!(shelf("warehouse/weight"), "shelf1");
        assert_eq!(shelf("warehouse/shelf2/weight"), "shelf2");
        assert_eq!(shelf("warehouse/aisle4/shelf7/distance"), "shelf7");
        assert_eq!(shelf("weight"), "shelf1");
        assert_eq!(shelf("warehouse//weight"), "shelf1");
    }
}
