//! Error types for assetforge.
//!
//! Library crates use [`AssetForgeError`] via `thiserror`.
//! The CLI crate wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all assetforge operations.
#[derive(Debug, thiserror::Error)]
pub enum AssetForgeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed glob pattern handed to the resolver.
    #[error("pattern error: {message}")]
    Pattern { message: String },

    /// A transform failed to compile one source unit.
    #[error("transform error in {path}: {message}")]
    Transform { path: PathBuf, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// File-watcher setup or event-stream error.
    #[error("watch error: {0}")]
    Watch(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AssetForgeError>;

impl AssetForgeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a pattern error from any displayable message.
    pub fn pattern(msg: impl Into<String>) -> Self {
        Self::Pattern {
            message: msg.into(),
        }
    }

    /// Create a transform error for a given source path.
    pub fn transform(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Transform {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = AssetForgeError::config("missing output root");
        assert_eq!(err.to_string(), "config error: missing output root");

        let err = AssetForgeError::transform("app/index.ts", "unterminated import");
        assert!(err.to_string().contains("app/index.ts"));
        assert!(err.to_string().contains("unterminated import"));
    }
}
