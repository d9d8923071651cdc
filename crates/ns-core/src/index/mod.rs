//! Compiled rule index
//!
//! Rules are partitioned by shape at build time:
//!
//! - `||domain^` rules go into a reverse-labeled [`DomainTree`]
//! - plain literals go into a multi-literal automaton
//! - everything else is a residual pattern, prefiltered by its first literal
//! - cosmetic rules go into a [`CosmeticIndex`] keyed by page domain
//!
//! An index is built from scratch and never modified afterwards. Readers
//! share it through [`SharedIndex`], which swaps in new builds atomically.

mod cosmetic;
mod domain_tree;
mod literal;

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::metrics::Stopwatch;
use crate::rule::{Rule, RuleKind};
use crate::types::RuleShape;

pub use cosmetic::{CosmeticIndex, CosmeticIndexBuilder};
pub use domain_tree::DomainTree;
pub use literal::{LiteralSet, LiteralSetBuilder};

/// A network rule plus the ranking data the matcher needs.
#[derive(Debug)]
pub struct IndexedRule {
    pub rule: Arc<Rule>,
    pub shape: RuleShape,
    pub specificity: u32,
}

/// Per-partition counts for a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub network_rules: usize,
    pub exception_rules: usize,
    pub domain_rules: usize,
    pub substring_rules: usize,
    pub pattern_rules: usize,
    /// Pattern rules with no literal to prefilter on
    pub unindexed_pattern_rules: usize,
    pub cosmetic_rules: usize,
    pub domain_tree_nodes: usize,
    pub domain_labels: usize,
}

#[derive(Debug)]
pub struct RuleIndex {
    pub(crate) rules: Vec<IndexedRule>,
    pub(crate) domains: DomainTree,
    pub(crate) substrings: LiteralSet,
    pub(crate) residual: LiteralSet,
    pub(crate) residual_always: Vec<u32>,
    pub(crate) cosmetic: CosmeticIndex,
    stats: IndexStats,
}

impl Default for RuleIndex {
    fn default() -> Self {
        Self::build(std::iter::empty())
    }
}

impl RuleIndex {
    /// Compile an index from rules in precedence order (first list first).
    pub fn build(rules: impl IntoIterator<Item = Arc<Rule>>) -> Self {
        let started = Stopwatch::start();

        let mut indexed = Vec::new();
        let mut domains = DomainTree::new();
        let mut substrings = LiteralSetBuilder::new();
        let mut residual = LiteralSetBuilder::new();
        let mut residual_always = Vec::new();
        let mut cosmetic = CosmeticIndexBuilder::new();
        let mut stats = IndexStats::default();

        for rule in rules {
            let filter = match &rule.kind {
                RuleKind::CosmeticHide(filter) => {
                    cosmetic.add(filter);
                    stats.cosmetic_rules += 1;
                    continue;
                }
                RuleKind::Block(filter) => filter,
                RuleKind::Exception(filter) => {
                    stats.exception_rules += 1;
                    filter
                }
            };
            stats.network_rules += 1;

            let id = indexed.len() as u32;
            let pattern = &filter.pattern;
            let shape = if let Some(domain) = pattern.plain_domain() {
                domains.insert(domain, id);
                stats.domain_rules += 1;
                RuleShape::DomainAnchored
            } else if let Some(literal) = pattern.plain_literal() {
                substrings.add(literal, id);
                stats.substring_rules += 1;
                RuleShape::Substring
            } else {
                match pattern.first_literal() {
                    Some(literal) => residual.add(literal, id),
                    None => {
                        residual_always.push(id);
                        stats.unindexed_pattern_rules += 1;
                    }
                }
                stats.pattern_rules += 1;
                RuleShape::Pattern
            };

            let specificity = pattern.specificity() as u32;
            indexed.push(IndexedRule {
                rule,
                shape,
                specificity,
            });
        }

        domains.finish();
        stats.domain_tree_nodes = domains.node_count();
        stats.domain_labels = domains.label_count();
        indexed.shrink_to_fit();

        let index = Self {
            rules: indexed,
            domains,
            substrings: substrings.build(),
            residual: residual.build(),
            residual_always,
            cosmetic: cosmetic.build(),
            stats,
        };

        log::debug!(
            "Built rule index: {} network ({} domain, {} substring, {} pattern), {} cosmetic in {:?}",
            stats.network_rules,
            stats.domain_rules,
            stats.substring_rules,
            stats.pattern_rules,
            stats.cosmetic_rules,
            started.elapsed()
        );

        index
    }

    pub fn stats(&self) -> IndexStats {
        self.stats
    }

    /// Number of block and exception rules.
    pub fn network_rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.cosmetic.rule_count() == 0
    }

    pub(crate) fn rule(&self, id: u32) -> &IndexedRule {
        &self.rules[id as usize]
    }

    /// Selectors the page layer should hide on `host`.
    pub fn cosmetic_selectors(&self, host: &str) -> Vec<Arc<str>> {
        self.cosmetic.selectors(host)
    }

    /// Approximate heap bytes held by the index, rule text included.
    pub fn memory_usage(&self) -> usize {
        let rules: usize = self
            .rules
            .iter()
            .map(|entry| std::mem::size_of::<IndexedRule>() + entry.rule.heap_size())
            .sum();
        rules
            + self.domains.memory_usage()
            + self.substrings.memory_usage()
            + self.residual.memory_usage()
            + self.residual_always.capacity() * std::mem::size_of::<u32>()
            + self.cosmetic.memory_usage()
    }
}

// =============================================================================
// Shared index
// =============================================================================

/// Atomically swappable handle to the current [`RuleIndex`].
///
/// Clones share the same cell. Readers take an `Arc` with [`load`](Self::load)
/// and keep using that build until they drop it, even if a newer one is
/// published in the meantime.
#[derive(Clone)]
pub struct SharedIndex {
    inner: Arc<ArcSwap<RuleIndex>>,
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new(RuleIndex::default())
    }
}

impl SharedIndex {
    pub fn new(index: RuleIndex) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(index)),
        }
    }

    /// Current index.
    pub fn load(&self) -> Arc<RuleIndex> {
        self.inner.load_full()
    }

    /// Replace the current index, returning the published `Arc`.
    pub fn publish(&self, index: RuleIndex) -> Arc<RuleIndex> {
        let index = Arc::new(index);
        self.inner.store(Arc::clone(&index));
        index
    }
}

impl std::fmt::Debug for SharedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedIndex")
            .field("stats", &self.inner.load().stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{AnchorType, Pattern, PatternToken};
    use crate::rule::{CosmeticFilter, NetworkFilter};

    fn lit(s: &str) -> PatternToken {
        PatternToken::Literal(s.into())
    }

    fn block(anchor: AnchorType, tokens: Vec<PatternToken>, text: &str) -> Arc<Rule> {
        let pattern = Pattern {
            anchor,
            right_anchor: false,
            tokens,
        };
        Arc::new(Rule::new(RuleKind::Block(NetworkFilter::new(pattern)), 0, text))
    }

    fn sample_rules() -> Vec<Arc<Rule>> {
        vec![
            block(AnchorType::Hostname, vec![lit("doubleclick.net"), PatternToken::Separator], "||doubleclick.net^"),
            block(AnchorType::None, vec![lit("/banner/")], "/banner/"),
            block(
                AnchorType::None,
                vec![lit("/ads/"), PatternToken::Wildcard, lit(".js")],
                "/ads/*.js",
            ),
            block(
                AnchorType::None,
                vec![PatternToken::Separator, PatternToken::Wildcard, PatternToken::Separator],
                "^*^$script",
            ),
            Arc::new(Rule::new(
                RuleKind::CosmeticHide(CosmeticFilter {
                    selector: Arc::from(".ad"),
                    include: Vec::new(),
                    exclude: Vec::new(),
                    unhide: false,
                }),
                0,
                "##.ad",
            )),
        ]
    }

    #[test]
    fn test_partitioning() {
        let index = RuleIndex::build(sample_rules());
        let stats = index.stats();
        assert_eq!(stats.network_rules, 4);
        assert_eq!(stats.domain_rules, 1);
        assert_eq!(stats.substring_rules, 1);
        assert_eq!(stats.pattern_rules, 2);
        assert_eq!(stats.unindexed_pattern_rules, 1);
        assert_eq!(stats.cosmetic_rules, 1);
        assert_eq!(index.rule(0).shape, RuleShape::DomainAnchored);
        assert_eq!(index.rule(1).shape, RuleShape::Substring);
        assert_eq!(index.rule(2).shape, RuleShape::Pattern);
    }

    #[test]
    fn test_empty_index() {
        let index = RuleIndex::default();
        assert!(index.is_empty());
        assert_eq!(index.network_rule_count(), 0);
        assert!(index.cosmetic_selectors("example.com").is_empty());
    }

    #[test]
    fn test_memory_usage_grows_with_rules() {
        let empty = RuleIndex::default().memory_usage();
        let full = RuleIndex::build(sample_rules()).memory_usage();
        assert!(full > empty);
    }

    #[test]
    fn test_shared_index_publish() {
        let shared = SharedIndex::default();
        let before = shared.load();
        assert!(before.is_empty());

        let reader = shared.clone();
        shared.publish(RuleIndex::build(sample_rules()));

        // The old Arc stays valid and unchanged
        assert!(before.is_empty());
        assert_eq!(reader.load().network_rule_count(), 4);
    }
}
