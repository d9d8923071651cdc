//! Filter list line parser
//!
//! Turns one ABP-style filter line into a [`Rule`]. Parsing is pure, so
//! lines can be handled in any order or in parallel; [`parse_list`] is the
//! sequential batch form used by the list manager.

use std::net::IpAddr;
use std::sync::Arc;

use serde::Serialize;

use ns_core::hash::hash_domain;
use ns_core::pattern::{AnchorType, Pattern, PatternToken};
use ns_core::rule::{CosmeticFilter, DomainConstraint, ListId, NetworkFilter, Rule, RuleKind};
use ns_core::types::{PartyMask, RequestType};

/// Why a line did not produce a rule. None of these abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Blank line, comment or header; skipped silently
    #[error("Ignorable line")]
    Ignorable,
    #[error("Unsupported option: {0}")]
    UnsupportedOption(String),
    #[error("Unsupported syntax: {0}")]
    UnsupportedSyntax(String),
    #[error("Malformed pattern: {0}")]
    MalformedPattern(String),
}

fn malformed(reason: &str) -> ParseError {
    ParseError::MalformedPattern(reason.to_string())
}

/// Parse one filter line.
pub fn parse(line: &str, list_id: ListId) -> Result<Rule, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('!') || line.starts_with('[') {
        return Err(ParseError::Ignorable);
    }

    if let Some(kind) = parse_cosmetic(line)? {
        return Ok(Rule::new(kind, list_id, line));
    }

    // Hosts-file comment
    if line.starts_with('#') {
        return Err(ParseError::Ignorable);
    }

    if let Some(filter) = parse_hosts_file_line(line)? {
        return Ok(Rule::new(RuleKind::Block(filter), list_id, line));
    }

    let (is_exception, body) = match line.strip_prefix("@@") {
        Some(rest) => (true, rest.trim_start()),
        None => (false, line),
    };

    let (pattern_text, options_text) = split_rule_options(body);
    let options = match options_text {
        Some(text) => parse_options(text)?,
        None => ParsedOptions::default(),
    };

    if is_regex_pattern(pattern_text) {
        return Err(ParseError::UnsupportedSyntax("regular expression".to_string()));
    }

    let pattern = parse_pattern(pattern_text)?;
    if pattern.tokens.is_empty() && !options.narrows() {
        return Err(malformed("pattern matches every request"));
    }

    let filter = NetworkFilter {
        pattern,
        type_mask: options.type_mask,
        party_mask: options.party_mask,
        domains: options.domain_constraints,
    };

    let kind = if is_exception {
        RuleKind::Exception(filter)
    } else {
        RuleKind::Block(filter)
    };
    Ok(Rule::new(kind, list_id, line))
}

// =============================================================================
// Cosmetic rules
// =============================================================================

enum CosmeticSeparator {
    Hide,
    Unhide,
    Extended,
}

/// Locate the first cosmetic separator that follows a plausible domain list.
fn find_cosmetic_separator(line: &str) -> Option<(usize, usize, CosmeticSeparator)> {
    const EXTENDED: &[&str] = &["#?#", "#$#", "#%#", "#@?#", "#@$#", "#@%#"];

    for (pos, _) in line.match_indices('#') {
        let rest = &line[pos..];
        let found = if rest.starts_with("##") {
            Some((2, CosmeticSeparator::Hide))
        } else if rest.starts_with("#@#") {
            Some((3, CosmeticSeparator::Unhide))
        } else {
            EXTENDED
                .iter()
                .find(|sep| rest.starts_with(**sep))
                .map(|sep| (sep.len(), CosmeticSeparator::Extended))
        };

        if let Some((len, kind)) = found {
            if is_domain_list(&line[..pos]) {
                return Some((pos, len, kind));
            }
            return None;
        }
    }
    None
}

fn is_domain_list(text: &str) -> bool {
    text.bytes().all(|b| {
        b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b',' | b'~' | b'*' | b' ')
    })
}

fn parse_cosmetic(line: &str) -> Result<Option<RuleKind>, ParseError> {
    let Some((pos, len, separator)) = find_cosmetic_separator(line) else {
        return Ok(None);
    };

    let unhide = match separator {
        CosmeticSeparator::Hide => false,
        CosmeticSeparator::Unhide => true,
        CosmeticSeparator::Extended => {
            return Err(ParseError::UnsupportedSyntax("extended cosmetic rule".to_string()));
        }
    };

    let selector = line[pos + len..].trim();
    if selector.is_empty() {
        return Err(malformed("empty selector"));
    }

    let mut include = Vec::new();
    let mut exclude = Vec::new();
    for raw in line[..pos].split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let (negated, domain) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        if domain.contains('*') {
            return Err(ParseError::UnsupportedSyntax("wildcard cosmetic domain".to_string()));
        }
        let domain = normalize_domain(domain).ok_or_else(|| malformed("invalid cosmetic domain"))?;
        if negated {
            exclude.push(domain.into_boxed_str());
        } else {
            include.push(domain.into_boxed_str());
        }
    }

    Ok(Some(RuleKind::CosmeticHide(CosmeticFilter {
        selector: Arc::from(selector),
        include,
        exclude,
        unhide,
    })))
}

// =============================================================================
// Hosts-file lines
// =============================================================================

const LOCAL_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "local",
    "broadcasthost",
    "ip6-localhost",
    "ip6-loopback",
    "ip6-localnet",
    "ip6-mcastprefix",
    "ip6-allnodes",
    "ip6-allrouters",
    "0.0.0.0",
];

fn parse_hosts_file_line(line: &str) -> Result<Option<NetworkFilter>, ParseError> {
    let mut parts = line.split_whitespace();
    let (Some(first), Some(second)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };
    if first.parse::<IpAddr>().is_err() {
        return Ok(None);
    }

    if LOCAL_HOSTNAMES.contains(&second.to_ascii_lowercase().as_str()) {
        return Err(ParseError::Ignorable);
    }
    let domain = normalize_domain(second).ok_or_else(|| malformed("invalid hosts-file entry"))?;

    Ok(Some(NetworkFilter::new(Pattern {
        anchor: AnchorType::Hostname,
        right_anchor: false,
        tokens: vec![PatternToken::Literal(domain.into_boxed_str()), PatternToken::Separator],
    })))
}

// =============================================================================
// Options
// =============================================================================

#[derive(Debug, Clone)]
struct ParsedOptions {
    type_mask: RequestType,
    party_mask: PartyMask,
    domain_constraints: Option<DomainConstraint>,
}

impl Default for ParsedOptions {
    fn default() -> Self {
        Self {
            type_mask: RequestType::empty(),
            party_mask: PartyMask::empty(),
            domain_constraints: None,
        }
    }
}

impl ParsedOptions {
    fn narrows(&self) -> bool {
        !self.type_mask.is_empty() || !self.party_mask.is_empty() || self.domain_constraints.is_some()
    }
}

/// Split at the last `$` whose suffix contains no `/`.
fn split_rule_options(line: &str) -> (&str, Option<&str>) {
    match line.rfind('$') {
        Some(pos) if !line[pos + 1..].contains('/') => (&line[..pos], Some(&line[pos + 1..])),
        _ => (line, None),
    }
}

fn parse_options(text: &str) -> Result<ParsedOptions, ParseError> {
    let mut type_include = 0u32;
    let mut type_exclude = 0u32;
    let mut party_include = 0u8;
    let mut party_exclude = 0u8;
    let mut domain_constraints: Option<DomainConstraint> = None;

    for raw in text.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let raw_lower = raw.to_ascii_lowercase();
        let raw_lower = raw_lower.as_str();

        if let Some(domain_value) = raw_lower.strip_prefix("domain=") {
            let parsed = parse_domain_option(domain_value)?;
            domain_constraints = Some(merge_constraints(domain_constraints, parsed));
            continue;
        }

        let (negated, name) = match raw_lower.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw_lower),
        };

        if let Some(mask) = request_type_mask(name) {
            if negated {
                type_exclude |= mask;
            } else {
                type_include |= mask;
            }
            continue;
        }

        if let Some(mask) = party_mask(name) {
            if negated {
                party_exclude |= mask;
            } else {
                party_include |= mask;
            }
            continue;
        }

        return Err(ParseError::UnsupportedOption(raw.to_string()));
    }

    let type_bits = finalize_mask_u32(type_include, type_exclude, RequestType::ALL.bits())
        .ok_or_else(|| malformed("options exclude every request type"))?;
    let party_bits = finalize_mask_u8(party_include, party_exclude, PartyMask::ALL.bits())
        .ok_or_else(|| malformed("options exclude both parties"))?;

    Ok(ParsedOptions {
        type_mask: RequestType::from_bits_truncate(type_bits),
        party_mask: PartyMask::from_bits_truncate(party_bits),
        domain_constraints,
    })
}

fn merge_constraints(existing: Option<DomainConstraint>, incoming: DomainConstraint) -> DomainConstraint {
    match existing {
        Some(mut current) => {
            current.include.extend(incoming.include);
            current.exclude.extend(incoming.exclude);
            current
        }
        None => incoming,
    }
}

fn parse_domain_option(value: &str) -> Result<DomainConstraint, ParseError> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();

    for raw in value.split('|') {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let (is_exclude, domain_raw) = match raw.strip_prefix('~') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let domain = normalize_domain(domain_raw).ok_or_else(|| malformed("invalid domain= entry"))?;
        let hash = hash_domain(&domain);

        if is_exclude {
            exclude.push(hash);
        } else {
            include.push(hash);
        }
    }

    if include.is_empty() && exclude.is_empty() {
        return Err(malformed("empty domain= option"));
    }

    Ok(DomainConstraint { include, exclude })
}

/// Combine include/exclude bits. `None` when nothing is left; an all-bits
/// result collapses to 0 ("unrestricted").
fn finalize_mask_u32(include: u32, exclude: u32, all: u32) -> Option<u32> {
    let include = include & all;
    let exclude = exclude & all;
    let mut mask = if include != 0 { include & !exclude } else { all & !exclude };
    if mask == 0 {
        return None;
    }
    if mask == all {
        mask = 0;
    }
    Some(mask)
}

fn finalize_mask_u8(include: u8, exclude: u8, all: u8) -> Option<u8> {
    let include = include & all;
    let exclude = exclude & all;
    let mut mask = if include != 0 { include & !exclude } else { all & !exclude };
    if mask == 0 {
        return None;
    }
    if mask == all {
        mask = 0;
    }
    Some(mask)
}

fn request_type_mask(name: &str) -> Option<u32> {
    match name {
        "script" => Some(RequestType::SCRIPT.bits()),
        "image" => Some(RequestType::IMAGE.bits()),
        "stylesheet" => Some(RequestType::STYLESHEET.bits()),
        "object" => Some(RequestType::OBJECT.bits()),
        "subdocument" => Some(RequestType::SUBDOCUMENT.bits()),
        "document" => Some(RequestType::DOCUMENT.bits()),
        "xmlhttprequest" | "xhr" => Some(RequestType::XMLHTTPREQUEST.bits()),
        "media" => Some(RequestType::MEDIA.bits()),
        "font" => Some(RequestType::FONT.bits()),
        "ping" => Some(RequestType::PING.bits()),
        "websocket" => Some(RequestType::WEBSOCKET.bits()),
        "other" => Some(RequestType::OTHER.bits()),
        _ => None,
    }
}

fn party_mask(name: &str) -> Option<u8> {
    match name {
        "third-party" | "3p" => Some(PartyMask::THIRD_PARTY.bits()),
        "first-party" | "1p" => Some(PartyMask::FIRST_PARTY.bits()),
        _ => None,
    }
}

fn normalize_domain(host: &str) -> Option<String> {
    let trimmed = host.trim().trim_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
    {
        return None;
    }

    Some(trimmed.to_ascii_lowercase())
}

// =============================================================================
// Patterns
// =============================================================================

/// `/.../` with regex metacharacters inside. Slash-wrapped plain text is
/// kept as a path literal.
fn is_regex_pattern(text: &str) -> bool {
    text.len() > 2
        && text.starts_with('/')
        && text.ends_with('/')
        && text[1..text.len() - 1]
            .bytes()
            .any(|b| matches!(b, b'\\' | b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'+' | b'?' | b'$'))
}

fn parse_pattern(text: &str) -> Result<Pattern, ParseError> {
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        return Err(malformed("whitespace in pattern"));
    }

    let (anchor, rest) = if let Some(rest) = text.strip_prefix("||") {
        if rest.is_empty() {
            return Err(malformed("domain anchor without a domain"));
        }
        (AnchorType::Hostname, rest)
    } else if let Some(rest) = text.strip_prefix('|') {
        (AnchorType::Left, rest)
    } else {
        (AnchorType::None, text)
    };

    let (right_anchor, rest) = match rest.strip_suffix('|') {
        Some(rest) => (true, rest),
        None => (false, rest),
    };

    if rest.contains('|') {
        return Err(malformed("anchor marker inside pattern"));
    }

    let mut tokens = tokenize(rest);

    if anchor == AnchorType::None && tokens.first() == Some(&PatternToken::Wildcard) {
        tokens.remove(0);
    }
    if !right_anchor && tokens.last() == Some(&PatternToken::Wildcard) {
        tokens.pop();
    }
    tokens.shrink_to_fit();

    Ok(Pattern {
        anchor,
        right_anchor,
        tokens,
    })
}

/// Split into lower-cased literal runs, `*` and `^`. Consecutive `*` collapse.
fn tokenize(text: &str) -> Vec<PatternToken> {
    let mut tokens = Vec::new();
    let mut literal = String::new();

    for ch in text.chars() {
        match ch {
            '*' | '^' => {
                if !literal.is_empty() {
                    tokens.push(PatternToken::Literal(std::mem::take(&mut literal).into_boxed_str()));
                }
                if ch == '^' {
                    tokens.push(PatternToken::Separator);
                } else if tokens.last() != Some(&PatternToken::Wildcard) {
                    tokens.push(PatternToken::Wildcard);
                }
            }
            _ => literal.push(ch.to_ascii_lowercase()),
        }
    }
    if !literal.is_empty() {
        tokens.push(PatternToken::Literal(literal.into_boxed_str()));
    }

    tokens
}

// =============================================================================
// Batch parsing
// =============================================================================

/// Rejected lines kept in a report.
const MAX_REJECTED_SAMPLES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedLine {
    /// 1-based line number
    pub line: usize,
    pub text: String,
    pub error: String,
}

/// Outcome counts for a parsed list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub lines: usize,
    pub accepted: usize,
    pub ignored: usize,
    pub unsupported: usize,
    pub malformed: usize,
    pub rejected_samples: Vec<RejectedLine>,
}

impl ParseReport {
    pub fn rejected(&self) -> usize {
        self.unsupported + self.malformed
    }
}

/// Parse every line of a list. Rejected lines are counted and skipped.
pub fn parse_list(text: &str, list_id: ListId) -> (Vec<Rule>, ParseReport) {
    let mut rules = Vec::new();
    let mut report = ParseReport::default();

    for (number, raw_line) in text.lines().enumerate() {
        report.lines += 1;
        match parse(raw_line, list_id) {
            Ok(rule) => {
                report.accepted += 1;
                rules.push(rule);
            }
            Err(ParseError::Ignorable) => report.ignored += 1,
            Err(err) => {
                match err {
                    ParseError::UnsupportedOption(_) | ParseError::UnsupportedSyntax(_) => {
                        report.unsupported += 1;
                    }
                    _ => report.malformed += 1,
                }
                log::debug!("List {} line {}: {} ({})", list_id, number + 1, err, raw_line.trim());
                if report.rejected_samples.len() < MAX_REJECTED_SAMPLES {
                    report.rejected_samples.push(RejectedLine {
                        line: number + 1,
                        text: raw_line.trim().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    log::debug!(
        "Parsed list {}: {} lines, {} accepted, {} ignored, {} unsupported, {} malformed",
        list_id,
        report.lines,
        report.accepted,
        report.ignored,
        report.unsupported,
        report.malformed
    );

    (rules, report)
}
