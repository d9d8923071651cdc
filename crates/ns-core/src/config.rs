//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::types::RequestType;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Nominal response sizes, in bytes, credited as "saved" when a request of
/// that type is blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteEstimates {
    pub script: u64,
    pub image: u64,
    pub stylesheet: u64,
    pub xmlhttprequest: u64,
    pub document: u64,
    pub subdocument: u64,
    pub media: u64,
    pub font: u64,
    pub other: u64,
}

impl Default for ByteEstimates {
    fn default() -> Self {
        Self {
            script: 25 * 1024,
            image: 12 * 1024,
            stylesheet: 8 * 1024,
            xmlhttprequest: 2 * 1024,
            document: 40 * 1024,
            subdocument: 40 * 1024,
            media: 150 * 1024,
            font: 20 * 1024,
            other: 4 * 1024,
        }
    }
}

impl ByteEstimates {
    pub fn for_type(&self, request_type: RequestType) -> u64 {
        if request_type.contains(RequestType::SCRIPT) {
            self.script
        } else if request_type.contains(RequestType::IMAGE) {
            self.image
        } else if request_type.contains(RequestType::STYLESHEET) {
            self.stylesheet
        } else if request_type.intersects(RequestType::XMLHTTPREQUEST | RequestType::WEBSOCKET | RequestType::PING) {
            self.xmlhttprequest
        } else if request_type.contains(RequestType::DOCUMENT) {
            self.document
        } else if request_type.intersects(RequestType::SUBDOCUMENT | RequestType::OBJECT) {
            self.subdocument
        } else if request_type.contains(RequestType::MEDIA) {
            self.media
        } else if request_type.contains(RequestType::FONT) {
            self.font
        } else {
            self.other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Index size above which a rebuild logs a warning
    pub max_memory_mb: u64,
    pub byte_estimates: ByteEstimates,
    /// Log every classification decision
    pub debug: bool,
    /// Size of the statistics recent-events log (0 disables it)
    pub max_recent_events: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: 30,
            byte_estimates: ByteEstimates::default(),
            debug: false,
            max_recent_events: crate::stats::DEFAULT_MAX_RECENT_EVENTS,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.max_memory_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_memory_mb",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(config)
    }

    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_mb as usize).saturating_mul(1024 * 1024)
    }
}
