//! Element-hiding selectors grouped by page domain
//!
//! Cosmetic rules never see request URLs. The page layer asks for the
//! selectors that apply to a page host; specific selectors come from the
//! host and its ancestors, generic selectors apply everywhere unless a
//! negated domain or an unhide rule (`#@#`) switches them off.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::psl::walk_host_suffixes;
use crate::rule::CosmeticFilter;

#[derive(Debug, Default)]
pub struct CosmeticIndex {
    generic: Vec<Arc<str>>,
    specific: HashMap<Box<str>, Vec<Arc<str>>>,
    /// Selectors disabled on a domain (`~domain##sel`, `domain#@#sel`)
    suppressed: HashMap<Box<str>, Vec<Arc<str>>>,
    /// `#@#sel` with no domain
    generic_unhide: HashSet<Arc<str>>,
    rule_count: usize,
}

#[derive(Debug, Default)]
pub struct CosmeticIndexBuilder {
    index: CosmeticIndex,
    interned: HashSet<Arc<str>>,
}

impl CosmeticIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, selector: &Arc<str>) -> Arc<str> {
        if let Some(existing) = self.interned.get(selector) {
            return Arc::clone(existing);
        }
        self.interned.insert(Arc::clone(selector));
        Arc::clone(selector)
    }

    pub fn add(&mut self, filter: &CosmeticFilter) {
        let selector = self.intern(&filter.selector);
        let index = &mut self.index;
        index.rule_count += 1;

        if filter.unhide {
            if filter.include.is_empty() {
                index.generic_unhide.insert(selector);
            } else {
                for domain in &filter.include {
                    push_unique(index.suppressed.entry(domain.clone()).or_default(), &selector);
                }
            }
            return;
        }

        if filter.include.is_empty() {
            if !index.generic.contains(&selector) {
                index.generic.push(Arc::clone(&selector));
            }
        } else {
            for domain in &filter.include {
                push_unique(index.specific.entry(domain.clone()).or_default(), &selector);
            }
        }

        for domain in &filter.exclude {
            push_unique(index.suppressed.entry(domain.clone()).or_default(), &selector);
        }
    }

    pub fn build(self) -> CosmeticIndex {
        let mut index = self.index;
        index.generic.shrink_to_fit();
        index.specific.shrink_to_fit();
        index.suppressed.shrink_to_fit();
        index
    }
}

fn push_unique(list: &mut Vec<Arc<str>>, selector: &Arc<str>) {
    if !list.contains(selector) {
        list.push(Arc::clone(selector));
    }
}

impl CosmeticIndex {
    /// Selectors to hide on a page served from `host`.
    /// Specific selectors come first, then generic ones, without duplicates.
    pub fn selectors(&self, host: &str) -> Vec<Arc<str>> {
        let mut blocked: HashSet<&str> = self.generic_unhide.iter().map(|s| &**s).collect();
        for suffix in walk_host_suffixes(host) {
            if let Some(list) = self.suppressed.get(suffix) {
                blocked.extend(list.iter().map(|s| &**s));
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut out = Vec::new();

        let specific = walk_host_suffixes(host)
            .filter_map(|suffix| self.specific.get(suffix))
            .flatten();
        for selector in specific.chain(self.generic.iter()) {
            if blocked.contains(&**selector) || !seen.insert(&**selector) {
                continue;
            }
            out.push(Arc::clone(selector));
        }

        out
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Approximate heap bytes.
    pub fn memory_usage(&self) -> usize {
        let selectors: usize = self
            .generic
            .iter()
            .chain(self.generic_unhide.iter())
            .map(|s| s.len() + 16)
            .sum();
        let grouped: usize = self
            .specific
            .iter()
            .chain(self.suppressed.iter())
            .map(|(domain, list)| domain.len() + 48 + list.capacity() * 16)
            .sum();
        selectors + grouped
    }
}
