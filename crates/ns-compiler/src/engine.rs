//! Engine facade
//!
//! Wires the list manager, the shared index, the matcher and the statistics
//! aggregator together. List updates are serialized behind a mutex; request
//! classification only touches the shared index and the statistics.

use std::sync::{Arc, Mutex, MutexGuard};

use ns_core::config::EngineConfig;
use ns_core::index::{RuleIndex, SharedIndex};
use ns_core::matcher::Matcher;
use ns_core::metrics::{EngineMetrics, MetricsSnapshot, Stopwatch};
use ns_core::stats::{Statistics, StatisticsAggregator};
use ns_core::types::{Decision, Request, RequestType};

use crate::defaults::{DEFAULT_LIST, DEFAULT_LIST_NAME};
use crate::lists::{FilterListManager, ListError, ListInfo};
use crate::parser::ParseReport;

pub struct Engine {
    lists: Mutex<FilterListManager>,
    index: SharedIndex,
    stats: Arc<StatisticsAggregator>,
    metrics: EngineMetrics,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let stats = StatisticsAggregator::with_max_recent_events(config.max_recent_events);
        Self::with_stats(config, Arc::new(stats))
    }

    /// Engine recording into an aggregator owned by the caller.
    pub fn with_stats(config: EngineConfig, stats: Arc<StatisticsAggregator>) -> Self {
        let index = SharedIndex::default();
        Self {
            lists: Mutex::new(FilterListManager::with_handle(index.clone())),
            index,
            stats,
            metrics: EngineMetrics::new(),
            config,
        }
    }

    /// Engine with the built-in baseline list registered and compiled.
    pub fn with_default_lists(config: EngineConfig) -> Result<Self, ListError> {
        let engine = Self::new(config);
        engine.add_list(DEFAULT_LIST_NAME, DEFAULT_LIST)?;
        engine.rebuild();
        Ok(engine)
    }

    fn manager(&self) -> MutexGuard<'_, FilterListManager> {
        // The manager is only mutated through whole operations
        self.lists.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn add_list(&self, name: &str, text: &str) -> Result<ParseReport, ListError> {
        let report = self.manager().add_list(name, text)?;
        self.metrics.record_parse_errors(report.rejected() as u64);
        if report.rejected() > 0 {
            log::debug!(
                "List {}: {} of {} lines rejected",
                name,
                report.rejected(),
                report.lines
            );
        }
        Ok(report)
    }

    pub fn remove_list(&self, name: &str) -> Result<(), ListError> {
        self.manager().remove_list(name)
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), ListError> {
        self.manager().set_enabled(name, enabled)
    }

    pub fn lists(&self) -> Vec<ListInfo> {
        self.manager().lists()
    }

    /// Recompile enabled lists and swap the new index in.
    pub fn rebuild(&self) -> Arc<RuleIndex> {
        let index = self.manager().rebuild();

        let usage = index.memory_usage();
        let ceiling = self.config.max_memory_bytes();
        if usage > ceiling {
            log::warn!(
                "Rule index uses ~{} KiB, above the {} MB ceiling",
                usage / 1024,
                self.config.max_memory_mb
            );
        }
        index
    }

    /// Current index.
    pub fn index(&self) -> Arc<RuleIndex> {
        self.index.load()
    }

    /// Classify a request and record the decision.
    pub fn classify(&self, url: &str, source_domain: &str, resource_type: RequestType) -> Decision {
        self.classify_request(&Request::new(url, source_domain, resource_type))
    }

    pub fn classify_request(&self, request: &Request<'_>) -> Decision {
        let started = Stopwatch::start();
        let index = self.index.load();
        let decision = Matcher::with_estimates(&index, &self.config.byte_estimates).classify(request);
        self.metrics.record_classify(started.elapsed());
        self.stats.record(&decision);

        if self.config.debug {
            log::debug!(
                "{:?} {} (source {:?}, type {}) rule {:?}",
                decision.action,
                request.url,
                request.source_domain,
                request.resource_type.name(),
                decision.matched_rule.as_ref().map(|rule| &*rule.text)
            );
        }
        decision
    }

    pub fn cosmetic_selectors(&self, host: &str) -> Vec<Arc<str>> {
        let host = ns_core::url::normalize_host(host);
        self.index.load().cosmetic_selectors(&host)
    }

    pub fn statistics(&self) -> Statistics {
        self.stats.snapshot()
    }

    pub fn reset_statistics(&self) {
        self.stats.reset();
    }

    /// Classification latency and parse-error counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Aggregator this engine records into.
    pub fn stats_handle(&self) -> Arc<StatisticsAggregator> {
        Arc::clone(&self.stats)
    }

    /// Index handle for readers that classify on their own.
    pub fn index_handle(&self) -> SharedIndex {
        self.index.clone()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
