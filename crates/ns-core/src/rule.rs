//! Compiled filter rules
//!
//! A [`Rule`] is immutable once built. Lists hold them behind `Arc` so the
//! same allocation is shared by the owning list and every index built from it.

use std::sync::Arc;

use crate::hash::{hash_domain, Hash64};
use crate::pattern::Pattern;
use crate::psl::walk_host_suffixes;
use crate::types::{PartyMask, RequestType};

/// Registration-order id of a filter list.
pub type ListId = u16;

/// `$domain=` restriction, stored as domain hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DomainConstraint {
    pub include: Vec<Hash64>,
    pub exclude: Vec<Hash64>,
}

impl DomainConstraint {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Evaluate against the initiating page host.
    ///
    /// The most specific listed ancestor of `source_host` decides, so
    /// `example.com|~shop.example.com` excludes `shop.example.com` and its
    /// subdomains while keeping the rest of `example.com`.
    pub fn matches(&self, source_host: &str) -> bool {
        for suffix in walk_host_suffixes(source_host) {
            let hash = hash_domain(suffix);
            if self.exclude.contains(&hash) {
                return false;
            }
            if self.include.contains(&hash) {
                return true;
            }
        }
        self.include.is_empty()
    }
}

/// URL-matching payload shared by block and exception rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkFilter {
    pub pattern: Pattern,
    /// Empty = all request types
    pub type_mask: RequestType,
    /// Empty = both parties
    pub party_mask: PartyMask,
    pub domains: Option<DomainConstraint>,
}

impl NetworkFilter {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            type_mask: RequestType::empty(),
            party_mask: PartyMask::empty(),
            domains: None,
        }
    }

    /// Check resource type, party and source-domain restrictions.
    #[inline]
    pub fn applies_to(&self, resource_type: RequestType, third_party: bool, source_host: &str) -> bool {
        if !self.type_mask.is_empty() && !self.type_mask.intersects(resource_type) {
            return false;
        }

        if !self.party_mask.is_empty() {
            let party = if third_party {
                PartyMask::THIRD_PARTY
            } else {
                PartyMask::FIRST_PARTY
            };
            if !self.party_mask.intersects(party) {
                return false;
            }
        }

        match &self.domains {
            Some(constraint) => constraint.matches(source_host),
            None => true,
        }
    }
}

/// Element-hiding rule (`##selector`, `#@#selector`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CosmeticFilter {
    pub selector: Arc<str>,
    /// Page hosts the rule is limited to; empty = generic
    pub include: Vec<Box<str>>,
    /// Page hosts the rule is disabled on (`~domain`)
    pub exclude: Vec<Box<str>>,
    /// `#@#` - cancels the selector instead of adding it
    pub unhide: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Block(NetworkFilter),
    /// `@@` rule; overrides any block match for the same request
    Exception(NetworkFilter),
    CosmeticHide(CosmeticFilter),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub kind: RuleKind,
    pub list_id: ListId,
    /// Original filter line
    pub text: Arc<str>,
}

impl Rule {
    pub fn new(kind: RuleKind, list_id: ListId, text: &str) -> Self {
        Self {
            kind,
            list_id,
            text: Arc::from(text),
        }
    }

    /// URL filter and whether it is an exception, for block/exception rules.
    pub fn network(&self) -> Option<(&NetworkFilter, bool)> {
        match &self.kind {
            RuleKind::Block(filter) => Some((filter, false)),
            RuleKind::Exception(filter) => Some((filter, true)),
            RuleKind::CosmeticHide(_) => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(self.kind, RuleKind::Exception(_))
    }

    /// Approximate heap bytes owned by this rule.
    pub fn heap_size(&self) -> usize {
        let payload = match &self.kind {
            RuleKind::Block(filter) | RuleKind::Exception(filter) => {
                filter.pattern.heap_size()
                    + filter
                        .domains
                        .as_ref()
                        .map_or(0, |d| (d.include.len() + d.exclude.len()) * std::mem::size_of::<Hash64>())
            }
            RuleKind::CosmeticHide(cosmetic) => {
                cosmetic.selector.len()
                    + cosmetic.include.iter().chain(&cosmetic.exclude).map(|d| d.len() + 16).sum::<usize>()
            }
        };
        std::mem::size_of::<Self>() + self.text.len() + payload
    }
}
