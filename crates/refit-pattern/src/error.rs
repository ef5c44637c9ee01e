//! Error types for refit-pattern

use thiserror::Error;

/// Errors from template compilation, binding, and rendering
#[derive(Error, Debug)]
pub enum PatternError {
    /// Unrecognized or malformed placeholder tag in a template string
    #[error("Malformed template tag `{tag}` at byte {position}")]
    Format { tag: String, position: usize },

    /// Invalid floating version range inside a `{v...}` tag
    #[error("Invalid floating range: {range} (expected x, 1.x, 1.2.x, or an exact version)")]
    InvalidRange { range: String },

    /// Template has no `owner/name:` repository in its leading literal
    #[error("Template has no recognizable owner/name repository: {template}")]
    MissingRepository { template: String },

    /// An image carried the wrong number of concrete versions for a pattern
    #[error("Image carries {actual} version(s) but the pattern requires {expected}")]
    VersionCount { expected: usize, actual: usize },
}

impl PatternError {
    /// Create a malformed-tag error
    pub fn format(tag: impl Into<String>, position: usize) -> Self {
        Self::Format {
            tag: tag.into(),
            position,
        }
    }

    /// Create an invalid-range error
    pub fn invalid_range(range: impl Into<String>) -> Self {
        Self::InvalidRange {
            range: range.into(),
        }
    }

    /// Create a missing-repository error
    pub fn missing_repository(template: impl Into<String>) -> Self {
        Self::MissingRepository {
            template: template.into(),
        }
    }
}
