//! Reverse-labeled domain tree for `||domain^` rules
//!
//! Labels are interned to `u32` ids and the tree is walked from the TLD
//! inward, so a host and every one of its ancestors are checked in
//! O(labels) regardless of how many domains are indexed.

use std::collections::HashMap;

const ROOT: u32 = 0;

#[derive(Debug, Default)]
struct Node {
    /// (label id, child node), sorted by label id after `finish`
    children: Vec<(u32, u32)>,
    /// Rule ids attached to the domain ending at this node
    rules: Vec<u32>,
}

#[derive(Debug)]
pub struct DomainTree {
    labels: HashMap<Box<str>, u32>,
    nodes: Vec<Node>,
    /// Build-time edge lookup, dropped by `finish`
    edges: HashMap<(u32, u32), u32>,
}

impl Default for DomainTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomainTree {
    pub fn new() -> Self {
        Self {
            labels: HashMap::new(),
            nodes: vec![Node::default()],
            edges: HashMap::new(),
        }
    }

    fn intern(&mut self, label: &str) -> u32 {
        if let Some(&id) = self.labels.get(label) {
            return id;
        }
        let id = self.labels.len() as u32;
        self.labels.insert(label.into(), id);
        id
    }

    /// Attach `rule` to `domain` (lower-case, no leading/trailing dot).
    pub fn insert(&mut self, domain: &str, rule: u32) {
        let mut node = ROOT;
        for label in domain.rsplit('.') {
            let label_id = self.intern(label);
            node = match self.edges.get(&(node, label_id)) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len() as u32;
                    self.nodes.push(Node::default());
                    self.nodes[node as usize].children.push((label_id, child));
                    self.edges.insert((node, label_id), child);
                    child
                }
            };
        }
        self.nodes[node as usize].rules.push(rule);
    }

    /// Freeze the tree for lookups.
    pub fn finish(&mut self) {
        self.edges = HashMap::new();
        for node in &mut self.nodes {
            node.children.sort_unstable_by_key(|&(label, _)| label);
            node.children.shrink_to_fit();
            node.rules.shrink_to_fit();
        }
        self.nodes.shrink_to_fit();
        self.labels.shrink_to_fit();
    }

    /// Call `f` with every rule attached to `host` or one of its ancestors.
    pub fn for_each_match(&self, host: &str, mut f: impl FnMut(u32)) {
        let mut node = ROOT;
        for label in host.rsplit('.') {
            let Some(&label_id) = self.labels.get(label) else {
                return;
            };
            let children = &self.nodes[node as usize].children;
            node = match children.binary_search_by_key(&label_id, |&(label, _)| label) {
                Ok(pos) => children[pos].1,
                Err(_) => return,
            };
            for &rule in &self.nodes[node as usize].rules {
                f(rule);
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Approximate heap bytes.
    pub fn memory_usage(&self) -> usize {
        let nodes: usize = self
            .nodes
            .iter()
            .map(|node| {
                std::mem::size_of::<Node>()
                    + node.children.capacity() * std::mem::size_of::<(u32, u32)>()
                    + node.rules.capacity() * std::mem::size_of::<u32>()
            })
            .sum();
        let labels: usize = self.labels.keys().map(|label| label.len() + 24).sum();
        nodes + labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(tree: &DomainTree, host: &str) -> Vec<u32> {
        let mut out = Vec::new();
        tree.for_each_match(host, |rule| out.push(rule));
        out
    }

    fn build(entries: &[(&str, u32)]) -> DomainTree {
        let mut tree = DomainTree::new();
        for &(domain, rule) in entries {
            tree.insert(domain, rule);
        }
        tree.finish();
        tree
    }

    #[test]
    fn test_exact_and_subdomain() {
        let tree = build(&[("doubleclick.net", 1)]);
        assert_eq!(matches(&tree, "doubleclick.net"), vec![1]);
        assert_eq!(matches(&tree, "ad.sub.doubleclick.net"), vec![1]);
        assert!(matches(&tree, "notdoubleclick.net").is_empty());
        assert!(matches(&tree, "net").is_empty());
    }

    #[test]
    fn test_ancestor_order() {
        let tree = build(&[("ads.example.com", 2), ("example.com", 1), ("example.com", 3)]);
        assert_eq!(matches(&tree, "x.ads.example.com"), vec![1, 3, 2]);
        assert_eq!(matches(&tree, "www.example.com"), vec![1, 3]);
    }

    #[test]
    fn test_labels_are_shared() {
        let tree = build(&[("a.example.com", 1), ("b.example.com", 2), ("example.org", 3)]);
        // a, b, example, com, org
        assert_eq!(tree.label_count(), 5);
        // root, com, example.com, a, b, org, example.org
        assert_eq!(tree.node_count(), 7);
    }

    #[test]
    fn test_empty_tree() {
        let tree = build(&[]);
        assert!(matches(&tree, "example.com").is_empty());
    }
}
