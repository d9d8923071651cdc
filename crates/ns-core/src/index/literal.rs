//! Multi-literal matcher
//!
//! One Aho-Corasick automaton over the distinct literals of a rule partition,
//! with a posting list of rule ids per literal. A scan over the URL finds
//! every literal occurrence in O(|URL|) independent of the rule count.

use std::collections::HashMap;

use aho_corasick::AhoCorasick;

#[derive(Debug, Default)]
pub struct LiteralSetBuilder {
    ids: HashMap<Box<str>, usize>,
    literals: Vec<Box<str>>,
    postings: Vec<Vec<u32>>,
}

impl LiteralSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, literal: &str, rule: u32) {
        let id = match self.ids.get(literal) {
            Some(&id) => id,
            None => {
                let id = self.literals.len();
                self.ids.insert(literal.into(), id);
                self.literals.push(literal.into());
                self.postings.push(Vec::new());
                id
            }
        };
        self.postings[id].push(rule);
    }

    pub fn build(self) -> LiteralSet {
        let rule_count = self.postings.iter().map(Vec::len).sum();
        if self.literals.is_empty() {
            return LiteralSet::default();
        }

        let automaton = match AhoCorasick::new(self.literals.iter().map(|lit| lit.as_bytes())) {
            Ok(automaton) => Some(automaton),
            Err(e) => {
                log::warn!(
                    "Failed to build literal automaton over {} literals, {} rules disabled: {}",
                    self.literals.len(),
                    rule_count,
                    e
                );
                None
            }
        };

        let mut postings = self.postings;
        for list in &mut postings {
            list.shrink_to_fit();
        }

        LiteralSet {
            automaton,
            postings,
            rule_count,
        }
    }
}

#[derive(Debug, Default)]
pub struct LiteralSet {
    automaton: Option<AhoCorasick>,
    postings: Vec<Vec<u32>>,
    rule_count: usize,
}

impl LiteralSet {
    /// Call `f` once for every rule whose literal occurs in `haystack`.
    pub fn for_each_match(&self, haystack: &[u8], mut f: impl FnMut(u32)) {
        let Some(automaton) = &self.automaton else {
            return;
        };

        let mut hits: Vec<usize> = automaton
            .find_overlapping_iter(haystack)
            .map(|m| m.pattern().as_usize())
            .collect();
        if hits.is_empty() {
            return;
        }
        hits.sort_unstable();
        hits.dedup();

        for id in hits {
            for &rule in &self.postings[id] {
                f(rule);
            }
        }
    }

    pub fn literal_count(&self) -> usize {
        self.postings.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Approximate heap bytes.
    pub fn memory_usage(&self) -> usize {
        let automaton = self.automaton.as_ref().map_or(0, AhoCorasick::memory_usage);
        let postings: usize = self
            .postings
            .iter()
            .map(|list| 24 + list.capacity() * std::mem::size_of::<u32>())
            .sum();
        automaton + postings
    }
}
