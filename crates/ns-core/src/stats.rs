//! Statistics aggregator
//!
//! All counters live behind one mutex so a snapshot always sees whole
//! `record` calls: a blocked decision bumps `blocked_count`, `bytes_saved`,
//! `by_domain`, `bytes_by_domain` and the recent-events log together or not
//! at all.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::metrics::unix_time_ms;
use crate::types::{Action, Decision};

/// Recent events kept by [`StatisticsAggregator::new`].
pub const DEFAULT_MAX_RECENT_EVENTS: usize = 1000;

/// One classified request, as kept in the recent-events log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestEvent {
    /// Milliseconds since the Unix epoch (0 without a wall clock)
    pub timestamp_ms: u64,
    pub domain: String,
    pub action: Action,
    pub bytes: u64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub blocked_count: u64,
    pub allowed_count: u64,
    pub bytes_saved: u64,
    /// Blocked requests per request host
    pub by_domain: HashMap<String, u64>,
    /// Estimated bytes saved per request host
    pub bytes_by_domain: HashMap<String, u64>,
    /// Latest requests, oldest first
    pub recent_events: VecDeque<RequestEvent>,
}

impl Statistics {
    pub fn total(&self) -> u64 {
        self.blocked_count.saturating_add(self.allowed_count)
    }

    /// Fraction of classified requests that were blocked, 0.0 when none were.
    pub fn block_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.blocked_count as f64 / total as f64,
        }
    }

    /// Most-blocked hosts, highest count first, ties by name.
    pub fn top_blocked_domains(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut domains: Vec<(&str, u64)> = self
            .by_domain
            .iter()
            .map(|(domain, &count)| (domain.as_str(), count))
            .collect();
        domains.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        domains.truncate(limit);
        domains
    }

    /// Up to `limit` most recent events, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &RequestEvent> {
        self.recent_events.iter().rev().take(limit)
    }
}

fn bump(map: &mut HashMap<String, u64>, domain: &str, amount: u64) {
    match map.get_mut(domain) {
        Some(value) => *value = value.saturating_add(amount),
        None => {
            map.insert(domain.to_string(), amount);
        }
    }
}

/// Process-scoped counters fed by classification decisions.
///
/// Construct one and share it by `Arc`; there is no global instance.
#[derive(Debug)]
pub struct StatisticsAggregator {
    inner: Mutex<Statistics>,
    max_recent_events: usize,
}

impl Default for StatisticsAggregator {
    fn default() -> Self {
        Self::with_max_recent_events(DEFAULT_MAX_RECENT_EVENTS)
    }
}

impl StatisticsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator keeping at most `max_recent_events` events (0 keeps none).
    pub fn with_max_recent_events(max_recent_events: usize) -> Self {
        Self {
            inner: Mutex::new(Statistics::default()),
            max_recent_events,
        }
    }

    pub fn max_recent_events(&self) -> usize {
        self.max_recent_events
    }

    fn lock(&self) -> MutexGuard<'_, Statistics> {
        // Counters are updated in full under the lock, so a poisoned guard
        // still holds consistent data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, decision: &Decision) {
        let timestamp_ms = if self.max_recent_events > 0 {
            unix_time_ms()
        } else {
            0
        };

        let mut stats = self.lock();
        let bytes = match decision.action {
            Action::Allow => {
                stats.allowed_count = stats.allowed_count.saturating_add(1);
                0
            }
            Action::Block => {
                let bytes = decision.bytes_estimate;
                stats.blocked_count = stats.blocked_count.saturating_add(1);
                stats.bytes_saved = stats.bytes_saved.saturating_add(bytes);
                if !decision.domain.is_empty() {
                    bump(&mut stats.by_domain, &decision.domain, 1);
                    bump(&mut stats.bytes_by_domain, &decision.domain, bytes);
                }
                bytes
            }
        };

        if self.max_recent_events == 0 {
            return;
        }
        if stats.recent_events.len() >= self.max_recent_events {
            stats.recent_events.pop_front();
        }
        stats.recent_events.push_back(RequestEvent {
            timestamp_ms,
            domain: decision.domain.clone(),
            action: decision.action,
            bytes,
        });
    }

    pub fn snapshot(&self) -> Statistics {
        self.lock().clone()
    }

    pub fn reset(&self) {
        *self.lock() = Statistics::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn blocked(domain: &str, bytes: u64) -> Decision {
        Decision {
            action: Action::Block,
            matched_rule: None,
            bytes_estimate: bytes,
            domain: domain.to_string(),
        }
    }

    #[test]
    fn test_record_and_snapshot() {
        let stats = StatisticsAggregator::new();
        stats.record(&blocked("ads.com", 100));
        stats.record(&blocked("ads.com", 50));
        stats.record(&blocked("track.net", 10));
        stats.record(&Decision::allow("example.com"));

        let snap = stats.snapshot();
        assert_eq!(snap.blocked_count, 3);
        assert_eq!(snap.allowed_count, 1);
        assert_eq!(snap.bytes_saved, 160);
        assert_eq!(snap.by_domain.get("ads.com"), Some(&2));
        assert_eq!(snap.bytes_by_domain.get("ads.com"), Some(&150));
        assert_eq!(snap.bytes_by_domain.get("track.net"), Some(&10));
        assert!(!snap.by_domain.contains_key("example.com"));
        assert!(!snap.bytes_by_domain.contains_key("example.com"));
        assert_eq!(snap.block_rate(), 0.75);
    }

    #[test]
    fn test_recent_events_are_bounded() {
        let stats = StatisticsAggregator::with_max_recent_events(3);
        stats.record(&blocked("a.com", 1));
        stats.record(&Decision::allow("b.com"));
        stats.record(&blocked("c.com", 3));
        stats.record(&blocked("d.com", 4));

        let snap = stats.snapshot();
        assert_eq!(snap.recent_events.len(), 3);
        let newest: Vec<&str> = snap.recent(2).map(|event| event.domain.as_str()).collect();
        assert_eq!(newest, vec!["d.com", "c.com"]);

        let oldest = &snap.recent_events[0];
        assert_eq!(oldest.domain, "b.com");
        assert_eq!(oldest.action, Action::Allow);
        assert_eq!(oldest.bytes, 0);
        assert!(oldest.timestamp_ms > 0);
        // Counters are not bounded by the event log
        assert_eq!(snap.blocked_count, 3);
    }

    #[test]
    fn test_recent_events_disabled() {
        let stats = StatisticsAggregator::with_max_recent_events(0);
        stats.record(&blocked("a.com", 1));
        let snap = stats.snapshot();
        assert!(snap.recent_events.is_empty());
        assert_eq!(snap.blocked_count, 1);
    }

    #[test]
    fn test_huge_byte_estimates_saturate() {
        let stats = StatisticsAggregator::new();
        stats.record(&blocked("ads.com", u64::MAX));
        stats.record(&blocked("ads.com", u64::MAX));

        let snap = stats.snapshot();
        assert_eq!(snap.bytes_saved, u64::MAX);
        assert_eq!(snap.bytes_by_domain.get("ads.com"), Some(&u64::MAX));
        assert_eq!(snap.blocked_count, 2);
    }

    #[test]
    fn test_top_blocked_domains() {
        let stats = StatisticsAggregator::new();
        for domain in ["b.com", "a.com", "c.com", "c.com"] {
            stats.record(&blocked(domain, 1));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.top_blocked_domains(2), vec![("c.com", 2), ("a.com", 1)]);
    }

    #[test]
    fn test_reset() {
        let stats = StatisticsAggregator::new();
        stats.record(&blocked("ads.com", 5));
        let before = stats.snapshot();
        stats.reset();

        assert_eq!(stats.snapshot(), Statistics::default());
        assert_eq!(stats.max_recent_events(), DEFAULT_MAX_RECENT_EVENTS);
        // Earlier snapshots are independent copies
        assert_eq!(before.blocked_count, 1);
        assert_eq!(Statistics::default().block_rate(), 0.0);
    }

    #[test]
    fn test_concurrent_record() {
        let stats = Arc::new(StatisticsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let stats = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if i % 2 == 0 {
                            stats.record(&blocked("ads.com", 2));
                        } else {
                            stats.record(&Decision::allow("example.com"));
                        }
                    }
                })
            })
            .collect();

        // Snapshots taken mid-flight must be internally consistent
        for _ in 0..100 {
            let snap = stats.snapshot();
            assert_eq!(snap.bytes_saved, snap.blocked_count * 2);
            assert_eq!(snap.by_domain.get("ads.com").copied().unwrap_or(0), snap.blocked_count);
            assert_eq!(snap.bytes_by_domain.get("ads.com").copied().unwrap_or(0), snap.bytes_saved);
            assert!(snap.recent_events.len() <= DEFAULT_MAX_RECENT_EVENTS);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.blocked_count, 4000);
        assert_eq!(snap.allowed_count, 4000);
    }
}
