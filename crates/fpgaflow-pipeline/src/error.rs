//! Errors raised before any stage runs.
//!
//! Once stages execute, failures travel as exit codes, never as `Err`.

use fpgaflow_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Toolchain path {0} is not a directory")]
    ToolchainNotFound(PathBuf),

    #[error("Invalid toolchain config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pipeline setup
pub type Result<T> = std::result::Result<T, PipelineError>;
