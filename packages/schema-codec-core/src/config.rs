//! Codec configuration.

use serde::Deserialize;

use crate::error::{CodecError, Result};

/// Whether codecs follow schema changes published at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTolerance {
    /// Only the primary schema is ever active
    Disabled,
    /// Codecs subscribe to schema changes and migrate
    #[default]
    Enabled,
}

/// Codec configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Schema evolution policy, read once per codec at construction
    pub version_tolerance: VersionTolerance,
    /// Type ids the validator refuses to build codecs for
    pub blocked_types: Vec<String>,
    /// Largest frame payload written or accepted
    pub max_frame_len: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            version_tolerance: VersionTolerance::Enabled,
            blocked_types: Vec::new(),
            max_frame_len: u32::MAX,
        }
    }
}

impl CodecConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CodecError::InvalidData(format!("codec config: {}", e)))
    }

    /// Returns `true` if codecs should subscribe to schema changes.
    pub fn tolerates_versions(&self) -> bool {
        self.version_tolerance == VersionTolerance::Enabled
    }

    /// Returns `true` if the type id is on the deny list.
    pub fn is_blocked(&self, type_id: &str) -> bool {
        self.blocked_types.iter().any(|t| t == type_id)
    }
}
