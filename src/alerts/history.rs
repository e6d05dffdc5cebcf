//! Bounded, append-only alert history

use std::collections::VecDeque;

use parking_lot::RwLock;

use super::Alert;

/// Oldest-first alert sequence capped at a fixed length
///
/// Appending past the cap evicts the oldest entry, regardless of kind.
pub struct AlertLog {
    entries: RwLock<VecDeque<Alert>>,
    capacity: usize,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
        }
    }

    pub fn append(&self, alert: Alert) {
        let mut entries = self.entries.write();
        entries.push_back(alert);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Last `n` alerts in insertion order, most recent last
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        let entries = self.entries.read();
        let skip = entries.len().saturating_sub(n);
        entries.iter().skip(skip).cloned().collect()
    }

    pub fn all(&self) -> Vec<Alert> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertKind;

    fn numbered(i: usize) -> Alert {
        let kind = if i % 2 == 0 { AlertKind::Stock } else { AlertKind::Security };
        Alert::new(kind, format!("alert {}", i))
    }

    fn messages(alerts: &[Alert]) -> Vec<String> {
        alerts.iter().map(|a| a.message().to_string()).collect()
    }

    #[test]
    fn test_fifty_first_append_evicts_first() {
        let log = AlertLog::new(50);
        for i in 1..=51 {
            log.append(numbered(i));
        }

        assert_eq!(log.len(), 50);
        let all = log.all();
        assert_eq!(all[0].message(), "alert 2");
        assert_eq!(all[49].message(), "alert 51");
        let expected: Vec<String> = (2..=51).map(|i| format!("alert {}", i)).collect();
        assert_eq!(messages(&all), expected);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let log = AlertLog::new(50);
        for i in 0..500 {
            log.append(numbered(i));
            assert!(log.len() <= 50);
        }
    }

    #[test]
    fn test_recent_returns_tail_in_order() {
        let log = AlertLog::new(50);
        for i in 1..=15 {
            log.append(numbered(i));
        }

        let recent = log.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().unwrap().message(), "alert 6");
        assert_eq!(recent.last().unwrap().message(), "alert 15");

        assert_eq!(log.recent(100).len(), 15);
        assert!(log.recent(0).is_empty());
    }

    #[test]
    fn test_eviction_ignores_kind() {
        let log = AlertLog::new(2);
        log.append(Alert::new(AlertKind::Security, "first"));
        log.append(Alert::new(AlertKind::Stock, "second"));
        log.append(Alert::new(AlertKind::Stock, "third"));

        assert_eq!(messages(&log.all()), vec!["second", "third"]);
    }
}
