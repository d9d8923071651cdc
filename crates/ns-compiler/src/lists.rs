//! Filter list manager
//!
//! Owns the registered lists and publishes a freshly compiled
//! [`RuleIndex`] on every [`rebuild`](FilterListManager::rebuild).
//! Adding, removing or toggling lists never rebuilds by itself, so a batch
//! of changes costs one compilation.

use std::sync::Arc;

use serde::Serialize;

use ns_core::hash::crc32;
use ns_core::index::{RuleIndex, SharedIndex};
use ns_core::metrics::Stopwatch;
use ns_core::rule::{ListId, Rule};

use crate::parser::{parse_list, ParseReport};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListError {
    #[error("Unknown filter list: {0}")]
    UnknownList(String),
    #[error("Too many filter lists registered")]
    TooManyLists,
}

/// A registered list: raw text plus its compiled rules.
#[derive(Debug)]
pub struct FilterList {
    pub name: String,
    pub id: ListId,
    pub enabled: bool,
    /// Starts at 1, bumped each time the list text is replaced
    pub version: u32,
    /// CRC-32 of the list text
    pub checksum: u32,
    pub report: ParseReport,
    text: String,
    rules: Vec<Arc<Rule>>,
}

impl FilterList {
    fn compile(name: &str, id: ListId, text: &str) -> Self {
        let (rules, report) = parse_list(text, id);
        Self {
            name: name.to_string(),
            id,
            enabled: true,
            version: 1,
            checksum: crc32(text.as_bytes()),
            report,
            text: text.to_string(),
            rules: rules.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }
}

/// Summary of a registered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListInfo {
    pub name: String,
    pub id: ListId,
    pub enabled: bool,
    pub version: u32,
    pub checksum: u32,
    pub rule_count: usize,
    pub report: ParseReport,
}

#[derive(Debug, Default)]
pub struct FilterListManager {
    /// Registration order, which is also precedence order
    lists: Vec<FilterList>,
    next_id: u32,
    published: SharedIndex,
}

impl FilterListManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Manager publishing into an existing handle.
    pub fn with_handle(published: SharedIndex) -> Self {
        Self {
            lists: Vec::new(),
            next_id: 0,
            published,
        }
    }

    /// Register a list, or replace the text of the list with the same name.
    ///
    /// A replaced list keeps its id, position and enabled flag.
    pub fn add_list(&mut self, name: &str, text: &str) -> Result<ParseReport, ListError> {
        if let Some(existing) = self.lists.iter_mut().find(|list| list.name == name) {
            let mut replacement = FilterList::compile(name, existing.id, text);
            replacement.enabled = existing.enabled;
            replacement.version = existing.version.wrapping_add(1);
            *existing = replacement;
            log::debug!("Replaced list {} (version {})", name, existing.version);
            return Ok(existing.report.clone());
        }

        let id = ListId::try_from(self.next_id).map_err(|_| ListError::TooManyLists)?;
        self.next_id += 1;

        let list = FilterList::compile(name, id, text);
        let report = list.report.clone();
        log::debug!("Added list {} as id {} ({} rules)", name, id, list.rules.len());
        self.lists.push(list);
        Ok(report)
    }

    pub fn remove_list(&mut self, name: &str) -> Result<(), ListError> {
        let pos = self.position(name)?;
        self.lists.remove(pos);
        Ok(())
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> Result<(), ListError> {
        let pos = self.position(name)?;
        self.lists[pos].enabled = enabled;
        Ok(())
    }

    fn position(&self, name: &str) -> Result<usize, ListError> {
        self.lists
            .iter()
            .position(|list| list.name == name)
            .ok_or_else(|| ListError::UnknownList(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&FilterList> {
        self.lists.iter().find(|list| list.name == name)
    }

    /// Compile the enabled lists and publish the result.
    ///
    /// Readers holding the previous index keep it until they drop it.
    pub fn rebuild(&self) -> Arc<RuleIndex> {
        let started = Stopwatch::start();
        let rules = self
            .lists
            .iter()
            .filter(|list| list.enabled)
            .flat_map(|list| list.rules.iter().cloned());

        let index = RuleIndex::build(rules);
        let stats = index.stats();
        log::info!(
            "Rebuilt index from {} of {} lists: {} network rules ({} exceptions), {} cosmetic rules, ~{} KiB in {:?}",
            self.lists.iter().filter(|list| list.enabled).count(),
            self.lists.len(),
            stats.network_rules,
            stats.exception_rules,
            stats.cosmetic_rules,
            index.memory_usage() / 1024,
            started.elapsed()
        );

        self.published.publish(index)
    }

    pub fn lists(&self) -> Vec<ListInfo> {
        self.lists
            .iter()
            .map(|list| ListInfo {
                name: list.name.clone(),
                id: list.id,
                enabled: list.enabled,
                version: list.version,
                checksum: list.checksum,
                rule_count: list.rules.len(),
                report: list.report.clone(),
            })
            .collect()
    }

    /// Handle readers use to load the current index.
    pub fn handle(&self) -> SharedIndex {
        self.published.clone()
    }
}
