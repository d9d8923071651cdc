//! Registrable-domain (eTLD+1) helpers
//!
//! A compact heuristic stands in for the full Public Suffix List: the last
//! two labels, or the last three when the host ends in a well-known two-part
//! suffix. That is enough to tell first-party from third-party requests.
//!
//! # Examples
//!
//! ```
//! use ns_core::psl::registrable_domain;
//!
//! assert_eq!(registrable_domain("sub.example.com"), "example.com");
//! assert_eq!(registrable_domain("sub.example.co.uk"), "example.co.uk");
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};

/// Common two-part public suffixes.
const COMMON_TWO_PART_TLDS: &[&str] = &[
    "co.uk", "co.jp", "co.nz", "co.za", "co.in", "co.kr",
    "com.au", "com.br", "com.cn", "com.mx", "com.tw", "com.hk",
    "net.au", "net.nz",
    "org.uk", "org.au",
    "gov.uk", "gov.au",
    "ac.uk", "ac.jp",
    "ne.jp", "or.jp",
];

/// IPv4 address, bare IPv6 address, or bracketed IPv6 literal.
pub fn is_ip_literal(host: &str) -> bool {
    host.starts_with('[')
        || host.parse::<Ipv4Addr>().is_ok()
        || host.parse::<Ipv6Addr>().is_ok()
}

/// Get the registrable domain for a lower-cased host, as a slice of it.
/// IP literals are returned whole.
pub fn registrable_domain(host: &str) -> &str {
    let host = host.trim_end_matches('.');
    if is_ip_literal(host) {
        return host;
    }
    let dots: Vec<usize> = host.match_indices('.').map(|(i, _)| i).collect();
    let n = dots.len();

    if n <= 1 {
        return host;
    }

    let last_two = &host[dots[n - 2] + 1..];
    if COMMON_TWO_PART_TLDS.contains(&last_two) {
        if n == 2 {
            return host;
        }
        return &host[dots[n - 3] + 1..];
    }

    last_two
}

/// Check if a request is third-party relative to its initiator.
/// An unknown initiator (empty host) counts as first-party.
pub fn is_third_party(source_host: &str, req_host: &str) -> bool {
    if source_host.is_empty() {
        return false;
    }
    registrable_domain(source_host) != registrable_domain(req_host)
}

/// Get the parent domain (strip leftmost label).
pub fn get_parent_domain(host: &str) -> Option<&str> {
    match host.find('.') {
        Some(idx) if idx < host.len() - 1 => Some(&host[idx + 1..]),
        _ => None,
    }
}

/// Iterator over a host and each of its ancestors, most specific first.
pub struct HostSuffixIter<'a> {
    current: Option<&'a str>,
    whole_only: bool,
}

impl<'a> Iterator for HostSuffixIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.current?;
        self.current = if self.whole_only {
            None
        } else {
            get_parent_domain(result)
        };
        Some(result)
    }
}

/// Walk host suffixes from most specific to least specific.
///
/// `a.b.example.com` yields `a.b.example.com`, `b.example.com`,
/// `example.com`, `com`. An IP literal yields only itself.
pub fn walk_host_suffixes(host: &str) -> HostSuffixIter<'_> {
    HostSuffixIter {
        current: if host.is_empty() { None } else { Some(host) },
        whole_only: is_ip_literal(host),
    }
}
