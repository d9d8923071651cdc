//! NetSieve Core Library
//!
//! This crate provides the request-matching engine for NetSieve: the data
//! model for compiled filter rules, the compiled [`RuleIndex`], the
//! [`Matcher`] that classifies requests against it, and the
//! [`StatisticsAggregator`] fed by its decisions.
//!
//! # Architecture
//!
//! Rules are compiled into an immutable index partitioned by rule shape
//! (domain tree, literal automaton, residual patterns, cosmetic selectors).
//! Readers obtain the current index from a [`SharedIndex`] and keep the
//! `Arc` they loaded for the whole request, so a concurrent rebuild never
//! changes the rules a request is being matched against.
//!
//! # Modules
//!
//! - `config`: Engine configuration (memory ceiling, byte estimates)
//! - `hash`: Murmur3 hash functions for domain hashing, CRC-32 for list checksums
//! - `index`: Compiled rule index and its atomically swappable handle
//! - `matcher`: Core request matching engine
//! - `metrics`: Classification latency and parse-error counters
//! - `pattern`: URL pattern tokens and their evaluation
//! - `psl`: Registrable-domain heuristic for first/third-party checks
//! - `rule`: Compiled rule types
//! - `stats`: Statistics aggregator
//! - `types`: Shared type definitions
//! - `url`: Fast URL parsing without allocations

pub mod config;
pub mod hash;
pub mod index;
pub mod matcher;
pub mod metrics;
pub mod pattern;
pub mod psl;
pub mod rule;
pub mod stats;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use config::{ByteEstimates, ConfigError, EngineConfig};
pub use hash::{crc32, hash_domain, Hash64};
pub use index::{IndexStats, RuleIndex, SharedIndex};
pub use matcher::{classify, Matcher};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use rule::{CosmeticFilter, DomainConstraint, ListId, NetworkFilter, Rule, RuleKind};
pub use stats::{RequestEvent, Statistics, StatisticsAggregator};
pub use types::{Action, Decision, MatchedRule, PartyMask, Request, RequestType, RuleShape};
