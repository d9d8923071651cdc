//! Core type definitions for NetSieve
//!
//! Request/decision values exchanged with the interception layer, plus the
//! bit masks rules use to restrict where they apply.

use std::sync::Arc;

use serde::Serialize;

// =============================================================================
// Actions
// =============================================================================

/// Final action for a classified request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Action {
    /// Request proceeds (no block rule matched, or an exception matched)
    Allow = 0,
    /// Request is cancelled
    Block = 1,
}

// =============================================================================
// Request Types (bit mask for type filtering)
// =============================================================================

bitflags::bitflags! {
    /// Request type bit mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RequestType: u32 {
        const OTHER = 1 << 0;
        const SCRIPT = 1 << 1;
        const IMAGE = 1 << 2;
        const STYLESHEET = 1 << 3;
        const OBJECT = 1 << 4;
        const SUBDOCUMENT = 1 << 5;  // iframe/frame
        const DOCUMENT = 1 << 6;     // main document
        const XMLHTTPREQUEST = 1 << 7;
        const WEBSOCKET = 1 << 8;
        const FONT = 1 << 9;
        const MEDIA = 1 << 10;
        const PING = 1 << 11;

        /// All request types
        const ALL = (1 << 12) - 1;
    }
}

impl RequestType {
    /// Parse from a browser/proxy request type name.
    ///
    /// Unknown names map to `OTHER` so that type-restricted rules never
    /// match a request the caller could not classify.
    pub fn from_request_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "script" => Self::SCRIPT,
            "image" | "imageset" => Self::IMAGE,
            "stylesheet" => Self::STYLESHEET,
            "object" => Self::OBJECT,
            "subdocument" | "sub_frame" => Self::SUBDOCUMENT,
            "document" | "main_frame" => Self::DOCUMENT,
            "xmlhttprequest" | "xhr" | "fetch" => Self::XMLHTTPREQUEST,
            "websocket" => Self::WEBSOCKET,
            "font" => Self::FONT,
            "media" => Self::MEDIA,
            "ping" | "beacon" => Self::PING,
            _ => Self::OTHER,
        }
    }

    /// Canonical name of a single-type mask.
    pub fn name(self) -> &'static str {
        if self == Self::SCRIPT {
            "script"
        } else if self == Self::IMAGE {
            "image"
        } else if self == Self::STYLESHEET {
            "stylesheet"
        } else if self == Self::OBJECT {
            "object"
        } else if self == Self::SUBDOCUMENT {
            "subdocument"
        } else if self == Self::DOCUMENT {
            "document"
        } else if self == Self::XMLHTTPREQUEST {
            "xmlhttprequest"
        } else if self == Self::WEBSOCKET {
            "websocket"
        } else if self == Self::FONT {
            "font"
        } else if self == Self::MEDIA {
            "media"
        } else if self == Self::PING {
            "ping"
        } else {
            "other"
        }
    }
}

// =============================================================================
// Party Masks
// =============================================================================

bitflags::bitflags! {
    /// Party (first-party / third-party) mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PartyMask: u8 {
        /// Matches first-party requests
        const FIRST_PARTY = 1 << 0;
        /// Matches third-party requests
        const THIRD_PARTY = 1 << 1;
        /// Matches both
        const ALL = Self::FIRST_PARTY.bits() | Self::THIRD_PARTY.bits();
    }
}

// =============================================================================
// Request
// =============================================================================

/// A request to classify. Borrowed from the caller and never stored.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Full request URL
    pub url: &'a str,
    /// Host (or URL) of the page that initiated the request; empty if unknown
    pub source_domain: &'a str,
    /// Request type
    pub resource_type: RequestType,
}

impl<'a> Request<'a> {
    pub fn new(url: &'a str, source_domain: &'a str, resource_type: RequestType) -> Self {
        Self {
            url,
            source_domain,
            resource_type,
        }
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Which index partition produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleShape {
    /// `||domain^` rule found through the domain tree
    DomainAnchored,
    /// Plain literal found by the substring automaton
    Substring,
    /// Wildcard/anchored pattern evaluated directly
    Pattern,
}

/// Rule that determined a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedRule {
    /// Original filter line
    pub text: Arc<str>,
    /// List the rule came from
    pub list_id: u16,
    pub shape: RuleShape,
}

/// Result of classifying a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub action: Action,
    pub matched_rule: Option<MatchedRule>,
    /// Nominal size of the blocked response, 0 when allowed
    pub bytes_estimate: u64,
    /// Lower-cased request host, empty when the URL could not be parsed
    pub domain: String,
}

impl Decision {
    /// Allow decision with no matched rule.
    pub fn allow(domain: impl Into<String>) -> Self {
        Self {
            action: Action::Allow,
            matched_rule: None,
            bytes_estimate: 0,
            domain: domain.into(),
        }
    }

    #[inline]
    pub fn is_blocked(&self) -> bool {
        self.action == Action::Block
    }
}
