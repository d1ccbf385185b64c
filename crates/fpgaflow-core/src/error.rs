//! Error types for catalog, project and constraint operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unsupported board: {0}")]
    UnsupportedBoard(String),

    #[error("Board {board} has no {toolchain} device information")]
    MissingDeviceInfo { board: String, toolchain: String },

    #[error("Unknown constraint dialect: {0}")]
    UnknownDialect(String),

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
