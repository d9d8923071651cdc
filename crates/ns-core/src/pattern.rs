//! URL patterns
//!
//! A pattern is a short token program: literal runs, `*` wildcards and `^`
//! separators, plus an anchor at the start (`|` or `||`) and optionally at
//! the end (`|`). Literals are stored lower-cased and matched against a
//! lower-cased URL.

use crate::url::is_separator_char;

/// Where a pattern is anchored at its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AnchorType {
    /// Matches anywhere in the URL
    #[default]
    None,
    /// `|` - matches at the start of the URL
    Left,
    /// `||` - matches at the start of the host or after a `.` in the host
    Hostname,
}

/// One element of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternToken {
    Literal(Box<str>),
    /// `*` - any run of characters, possibly empty
    Wildcard,
    /// `^` - one separator character, or the end of the URL
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pattern {
    pub anchor: AnchorType,
    /// Pattern ends with `|`
    pub right_anchor: bool,
    pub tokens: Vec<PatternToken>,
}

impl Pattern {
    /// Host of a `||host^` rule, if this pattern is exactly that shape.
    pub fn plain_domain(&self) -> Option<&str> {
        if self.anchor != AnchorType::Hostname || self.right_anchor {
            return None;
        }
        match self.tokens.as_slice() {
            [PatternToken::Literal(host), PatternToken::Separator] if is_plain_host(host) => {
                Some(host)
            }
            _ => None,
        }
    }

    /// Literal of an unanchored, wildcard-free pattern.
    pub fn plain_literal(&self) -> Option<&str> {
        if self.anchor != AnchorType::None || self.right_anchor {
            return None;
        }
        match self.tokens.as_slice() {
            [PatternToken::Literal(lit)] => Some(lit),
            _ => None,
        }
    }

    /// First literal token, used to prefilter pattern rules.
    pub fn first_literal(&self) -> Option<&str> {
        self.tokens.iter().find_map(|token| match token {
            PatternToken::Literal(lit) => Some(&**lit),
            _ => None,
        })
    }

    /// Number of concrete characters the pattern pins down.
    pub fn specificity(&self) -> usize {
        self.tokens
            .iter()
            .map(|token| match token {
                PatternToken::Literal(lit) => lit.len(),
                PatternToken::Separator => 1,
                PatternToken::Wildcard => 0,
            })
            .sum()
    }

    /// Approximate heap bytes held by the token program.
    pub fn heap_size(&self) -> usize {
        self.tokens.capacity() * std::mem::size_of::<PatternToken>()
            + self
                .tokens
                .iter()
                .map(|token| match token {
                    PatternToken::Literal(lit) => lit.len(),
                    _ => 0,
                })
                .sum::<usize>()
    }

    /// Match against a lower-cased URL whose host spans `host_start..host_end`.
    ///
    /// Runs in O(url * tokens) per anchor position regardless of how many
    /// wildcards the pattern has.
    pub fn matches(&self, url: &[u8], host_start: usize, host_end: usize) -> bool {
        match self.anchor {
            AnchorType::Left => match_tokens(&self.tokens, url, 0, false, self.right_anchor),
            AnchorType::Hostname => (host_start..host_end)
                .filter(|&start| start == host_start || url[start - 1] == b'.')
                .any(|start| match_tokens(&self.tokens, url, start, false, self.right_anchor)),
            AnchorType::None => match_tokens(&self.tokens, url, 0, true, self.right_anchor),
        }
    }
}

fn is_plain_host(host: &str) -> bool {
    !host.is_empty()
        && !host.starts_with('.')
        && !host.ends_with('.')
        && host
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_')
}

/// Glob-style matcher with a single backtrack point.
///
/// Every token but `*` consumes a fixed number of bytes (`^` consumes none
/// only at the end of the URL), so retrying from the most recent `*` is
/// enough: earlier wildcards never need to be revisited. An unanchored
/// pattern behaves as if it started with `*`.
fn match_tokens(
    tokens: &[PatternToken],
    url: &[u8],
    start: usize,
    leading_wildcard: bool,
    right_anchor: bool,
) -> bool {
    let mut t = 0;
    let mut pos = start;
    // (token after the last `*`, URL offset that `*` currently stops at)
    let mut resume = leading_wildcard.then_some((0, start));

    loop {
        let advanced = match tokens.get(t) {
            None => {
                if !right_anchor || pos == url.len() {
                    return true;
                }
                false
            }
            Some(PatternToken::Wildcard) => {
                t += 1;
                resume = Some((t, pos));
                true
            }
            Some(PatternToken::Literal(lit)) => {
                let lit = lit.as_bytes();
                if url[pos..].starts_with(lit) {
                    pos += lit.len();
                    t += 1;
                    true
                } else {
                    false
                }
            }
            Some(PatternToken::Separator) => {
                if pos == url.len() {
                    // End of URL satisfies `^` without consuming anything
                    t += 1;
                    true
                } else if is_separator_char(url[pos]) {
                    pos += 1;
                    t += 1;
                    true
                } else {
                    false
                }
            }
        };

        if advanced {
            continue;
        }
        match resume {
            Some((resume_t, resume_pos)) if resume_pos < url.len() => {
                resume = Some((resume_t, resume_pos + 1));
                t = resume_t;
                pos = resume_pos + 1;
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::get_host_position;

    fn lit(s: &str) -> PatternToken {
        PatternToken::Literal(s.into())
    }

    fn check(pattern: &Pattern, url: &str) -> bool {
        let (hs, he) = get_host_position(url).unwrap_or((0, 0));
        pattern.matches(url.as_bytes(), hs, he)
    }

    fn host_anchored(tokens: Vec<PatternToken>) -> Pattern {
        Pattern {
            anchor: AnchorType::Hostname,
            right_anchor: false,
            tokens,
        }
    }

    #[test]
    fn test_hostname_anchor_boundaries() {
        let p = host_anchored(vec![lit("doubleclick.net"), PatternToken::Separator]);
        assert!(check(&p, "https://doubleclick.net/ads/banner.js"));
        assert!(check(&p, "https://sub.doubleclick.net/x"));
        assert!(check(&p, "https://doubleclick.net"));
        assert!(check(&p, "https://doubleclick.net:8443/x"));
        assert!(!check(&p, "https://notdoubleclick.net/x"));
        assert!(!check(&p, "https://doubleclick.network/x"));
        assert!(!check(&p, "https://example.com/?u=doubleclick.net"));
    }

    #[test]
    fn test_hostname_anchor_with_path() {
        let p = host_anchored(vec![lit("ads.example.com/safe"), PatternToken::Separator]);
        assert!(check(&p, "https://ads.example.com/safe/img.png"));
        assert!(check(&p, "https://ads.example.com/safe"));
        assert!(!check(&p, "https://ads.example.com/safety"));
        assert!(!check(&p, "https://ads.example.com/unsafe/x"));
    }

    #[test]
    fn test_wildcard_backtracking() {
        let p = Pattern {
            anchor: AnchorType::None,
            right_anchor: false,
            tokens: vec![lit("/ads/"), PatternToken::Wildcard, lit(".js"), PatternToken::Separator],
        };
        assert!(check(&p, "https://x.com/ads/a.jsx/b.js?v=1"));
        assert!(!check(&p, "https://x.com/ads/a.jsx"));
    }

    #[test]
    fn test_many_wildcards_on_long_url() {
        let p = Pattern {
            anchor: AnchorType::None,
            right_anchor: false,
            tokens: vec![
                lit("/ads/"),
                PatternToken::Wildcard,
                lit("/"),
                PatternToken::Wildcard,
                lit("/"),
                PatternToken::Wildcard,
                lit("/"),
                PatternToken::Wildcard,
                lit(".gif"),
            ],
        };

        let miss = format!("https://x.com/ads/{}x.png", "/".repeat(5000));
        let started = std::time::Instant::now();
        assert!(!check(&p, &miss));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        let hit = format!("https://x.com/ads/{}x.gif", "/".repeat(5000));
        assert!(check(&p, &hit));
        assert!(!check(&p, "https://x.com/ads/a/b.gif"));
        assert!(check(&p, "https://x.com/ads/a/b/c/d.gif"));
    }

    #[test]
    fn test_right_anchor_retries_last_wildcard() {
        let p = Pattern {
            anchor: AnchorType::None,
            right_anchor: true,
            tokens: vec![lit("/px"), PatternToken::Wildcard, lit(".gif")],
        };
        assert!(check(&p, "https://x.com/px/a.gif/b.gif"));
        assert!(!check(&p, "https://x.com/px/a.gif?b"));
    }

    #[test]
    fn test_trailing_separator_after_wildcard() {
        let p = Pattern {
            anchor: AnchorType::Hostname,
            right_anchor: false,
            tokens: vec![lit("cdn."), PatternToken::Wildcard, lit("/ad"), PatternToken::Separator],
        };
        assert!(check(&p, "https://cdn.example.com/x/ad"));
        assert!(check(&p, "https://cdn.example.com/adx/ad?z=1"));
        assert!(!check(&p, "https://cdn.example.com/adx"));
    }

    #[test]
    fn test_left_and_right_anchor() {
        let p = Pattern {
            anchor: AnchorType::Left,
            right_anchor: true,
            tokens: vec![lit("https://ads."), PatternToken::Wildcard, lit(".gif")],
        };
        assert!(check(&p, "https://ads.example.com/pixel.gif"));
        assert!(!check(&p, "https://ads.example.com/pixel.gif?x"));
        assert!(!check(&p, "http://ads.example.com/pixel.gif"));
    }

    #[test]
    fn test_separator_only_pattern() {
        let p = Pattern {
            anchor: AnchorType::None,
            right_anchor: false,
            tokens: vec![PatternToken::Separator, lit("banner"), PatternToken::Separator],
        };
        assert!(check(&p, "https://x.com/banner?id=1"));
        assert!(!check(&p, "https://x.com/superbanner"));
    }

    #[test]
    fn test_shape_helpers() {
        let domain = host_anchored(vec![lit("ads.com"), PatternToken::Separator]);
        assert_eq!(domain.plain_domain(), Some("ads.com"));
        assert_eq!(domain.plain_literal(), None);
        assert_eq!(domain.specificity(), 8);

        let path = host_anchored(vec![lit("ads.com/x"), PatternToken::Separator]);
        assert_eq!(path.plain_domain(), None);
        assert_eq!(path.first_literal(), Some("ads.com/x"));

        let substring = Pattern {
            anchor: AnchorType::None,
            right_anchor: false,
            tokens: vec![lit("/banner/")],
        };
        assert_eq!(substring.plain_literal(), Some("/banner/"));
    }

    #[test]
    fn test_non_ascii_url_does_not_panic() {
        let p = Pattern {
            anchor: AnchorType::None,
            right_anchor: false,
            tokens: vec![PatternToken::Separator, lit("ad"), PatternToken::Wildcard, lit("x")],
        };
        assert!(!check(&p, "https://example.com/\u{00e9}\u{00e9}ad"));
    }
}
