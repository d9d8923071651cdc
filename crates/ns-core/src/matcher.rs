//! Core Matching Engine
//!
//! This is the hot path - every request goes through here. Matching reads
//! an immutable [`RuleIndex`] and nothing else, so any number of threads
//! may classify against the same index at once.

use std::cmp::Reverse;

use crate::config::ByteEstimates;
use crate::index::{IndexedRule, RuleIndex};
use crate::psl::is_third_party;
use crate::types::{Action, Decision, MatchedRule, Request, RuleShape};
use crate::url::{get_host_position, is_matchable, normalize_host};

/// Ordering key for competing matches; smallest wins.
type RankKey = (u8, Reverse<u32>, u16, u32);

fn rank(entry: &IndexedRule, id: u32) -> RankKey {
    let shape = match entry.shape {
        RuleShape::DomainAnchored => 0,
        RuleShape::Substring | RuleShape::Pattern => 1,
    };
    (shape, Reverse(entry.specificity), entry.rule.list_id, id)
}

/// Best block and best exception seen so far.
#[derive(Default)]
struct Candidates {
    block: Option<(RankKey, u32)>,
    exception: Option<(RankKey, u32)>,
}

impl Candidates {
    fn offer(&mut self, entry: &IndexedRule, id: u32, is_exception: bool) {
        let key = rank(entry, id);
        let slot = if is_exception {
            &mut self.exception
        } else {
            &mut self.block
        };
        if slot.map_or(true, |(best, _)| key < best) {
            *slot = Some((key, id));
        }
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Classifies requests against one index build.
pub struct Matcher<'a> {
    index: &'a RuleIndex,
    estimates: ByteEstimates,
}

impl<'a> Matcher<'a> {
    /// Create a matcher with default byte estimates.
    pub fn new(index: &'a RuleIndex) -> Self {
        Self::with_estimates(index, &ByteEstimates::default())
    }

    pub fn with_estimates(index: &'a RuleIndex, estimates: &ByteEstimates) -> Self {
        Self {
            index,
            estimates: estimates.clone(),
        }
    }

    /// Classify a request.
    ///
    /// Exceptions always win over blocks. URLs the matcher cannot parse are
    /// allowed.
    pub fn classify(&self, request: &Request<'_>) -> Decision {
        if !is_matchable(request.url) {
            log::trace!("Unmatchable URL allowed: {:?}", request.url);
            return Decision::allow("");
        }

        let url = request.url.to_ascii_lowercase();
        let Some((host_start, host_end)) = get_host_position(&url) else {
            return Decision::allow("");
        };
        let host = url[host_start..host_end].trim_end_matches('.');
        let source = normalize_host(request.source_domain);
        let third_party = is_third_party(&source, host);
        let bytes = url.as_bytes();

        let index = self.index;
        let mut candidates = Candidates::default();

        let mut consider = |id: u32, verify: bool| {
            let entry = index.rule(id);
            let Some((filter, is_exception)) = entry.rule.network() else {
                return;
            };
            if !filter.applies_to(request.resource_type, third_party, &source) {
                return;
            }
            if verify && !filter.pattern.matches(bytes, host_start, host_end) {
                return;
            }
            candidates.offer(entry, id, is_exception);
        };

        // Step 1: domain tree, a hit on the host or an ancestor is a match
        index.domains.for_each_match(host, |id| consider(id, false));

        // Step 2: plain literals, an occurrence is a match
        index.substrings.for_each_match(bytes, |id| consider(id, false));

        // Step 3: residual patterns whose first literal occurs
        index.residual.for_each_match(bytes, |id| consider(id, true));
        for &id in &index.residual_always {
            consider(id, true);
        }

        self.decide(candidates, request, host)
    }

    fn decide(&self, candidates: Candidates, request: &Request<'_>, host: &str) -> Decision {
        let matched = |id: u32| {
            let entry = self.index.rule(id);
            MatchedRule {
                text: entry.rule.text.clone(),
                list_id: entry.rule.list_id,
                shape: entry.shape,
            }
        };

        if let Some((_, id)) = candidates.exception {
            let decision = Decision {
                matched_rule: Some(matched(id)),
                ..Decision::allow(host)
            };
            log::trace!("Allowed by exception {:?}: {}", decision.matched_rule, request.url);
            return decision;
        }

        match candidates.block {
            Some((_, id)) => {
                let decision = Decision {
                    action: Action::Block,
                    matched_rule: Some(matched(id)),
                    bytes_estimate: self.estimates.for_type(request.resource_type),
                    domain: host.to_string(),
                };
                log::trace!("Blocked by {:?}: {}", decision.matched_rule, request.url);
                decision
            }
            None => Decision::allow(host),
        }
    }
}

/// Classify with default byte estimates.
pub fn classify(request: &Request<'_>, index: &RuleIndex) -> Decision {
    Matcher::new(index).classify(request)
}
