//! Error types for the development tools.

use thiserror::Error;

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors surfaced by the tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The engine rejected something.
    #[error(transparent)]
    Engine(#[from] rts_command::error::CommandError),

    /// A scenario script failed to parse.
    #[error("Failed to parse scenario script: {0}")]
    ScriptParse(String),

    /// A scenario script is inconsistent.
    #[error("Invalid scenario script: {0}")]
    InvalidScript(String),

    /// Reading a file failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        /// Path that was accessed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}
