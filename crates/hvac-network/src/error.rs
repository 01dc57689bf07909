//! Error types for topology construction and device registration.

use std::path::PathBuf;

/// Result type alias
pub type Result<T> = std::result::Result<T, TopologyError>;

/// Errors raised by the topology registry and the device registrar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Segment already exists: network {number} ({name})")]
    DuplicateSegment { number: u16, name: String },

    #[error("AHU index {ahu_index} does not map to a valid network number")]
    SegmentNumberOverflow { ahu_index: usize },

    #[error("Network {0} is not part of this topology")]
    UnknownSegment(u16),

    #[error("Device creation declined for {device_name} on {segment}")]
    DeviceCreationFailed { device_name: String, segment: String },

    #[error("No networks created yet")]
    NoSegments,

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl TopologyError {
    /// Whether the caller can carry on with other equipment after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TopologyError::DeviceCreationFailed { .. })
    }
}

/// Errors raised while loading a building structure from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Building file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Unsupported building file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),
}
