//! Fast URL parsing utilities for the hot path
//!
//! These functions avoid allocations and work directly on string slices.
//! Nothing here validates URLs beyond what matching needs: a scheme, a
//! non-empty host, and no whitespace.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 {
        return None;
    }

    // Scheme must be ASCII alphanumeric plus "+-."
    let scheme_ok = bytes[..colon_pos]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'-' || b == b'.');
    if !scheme_ok {
        return None;
    }

    if bytes.len() > colon_pos + 2 && bytes[colon_pos + 1] == b'/' && bytes[colon_pos + 2] == b'/' {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Authority ends at the first '/', '?' or '#'
    let authority_end = bytes[scheme_end..]
        .iter()
        .position(|&b| b == b'/' || b == b'?' || b == b'#')
        .map_or(bytes.len(), |i| scheme_end + i);

    // Skip userinfo
    let host_start = bytes[scheme_end..authority_end]
        .iter()
        .rposition(|&b| b == b'@')
        .map_or(scheme_end, |i| scheme_end + i + 1);

    // Bracketed IPv6 literal: the host runs through the closing bracket
    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..authority_end].iter().position(|&b| b == b']')?;
        return Some((host_start, host_start + close + 1));
    }

    let host_end = bytes[host_start..authority_end]
        .iter()
        .position(|&b| b == b':')
        .map_or(authority_end, |i| host_start + i);

    Some((host_start, host_end))
}

/// Fast host extraction without allocations.
#[inline]
pub fn extract_host(url: &str) -> Option<&str> {
    let (host_start, host_end) = get_host_position(url)?;
    Some(&url[host_start..host_end])
}

/// Check that a URL is something the matcher can reason about.
/// Anything else is allowed through untouched.
pub fn is_matchable(url: &str) -> bool {
    if url.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return false;
    }
    match get_host_position(url) {
        Some((start, end)) => end > start && !url[start..end].starts_with('.'),
        None => false,
    }
}

/// Normalize a source domain given as host or URL.
///
/// Returns the lower-cased host without a trailing root dot. An empty input
/// stays empty, meaning "unknown initiator".
pub fn normalize_host(source: &str) -> String {
    let source = source.trim();
    let host = if source.contains("://") {
        extract_host(source).unwrap_or("")
    } else if source.starts_with('[') {
        source.find(']').map_or("", |close| &source[..=close])
    } else {
        source
            .split(|c| c == '/' || c == ':' || c == '?' || c == '#')
            .next()
            .unwrap_or("")
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}

// =============================================================================
// ABP Separator Check
// =============================================================================

/// Check if a byte is an ABP separator.
///
/// `^` matches anything except a letter, a digit, or one of `_ - . %`.
#[inline]
pub fn is_separator_char(c: u8) -> bool {
    !(c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'.' || c == b'%')
}

/// Check if position in string is at a separator. The end of the string counts.
#[inline]
pub fn is_at_separator(s: &[u8], pos: usize) -> bool {
    if pos >= s.len() {
        return true;
    }
    is_separator_char(s[pos])
}
