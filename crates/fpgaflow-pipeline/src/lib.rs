//! fpgaflow pipeline - stage execution for FPGA builds
//!
//! Provides the orchestrator that:
//! - Runs yosys, nextpnr, the bitstream packers and openFPGALoader in order
//! - Streams each tool's output into a raw log and a curated summary
//! - Halts on the first stage that does not exit `0`

pub mod classify;
pub mod context;
pub mod error;
pub mod lint;
pub mod logger;
pub mod pipeline;
pub mod plan;
pub mod runner;
pub mod stage;
pub mod stages;

// Re-export key types
pub use classify::OutputClassifier;
pub use context::{ToolchainConfig, ToolchainContext};
pub use error::{PipelineError, Result};
pub use lint::{lint_project, LintReport};
pub use logger::{ConsoleLogger, Logger, MemoryLogger};
pub use pipeline::{ArtifactRecord, Pipeline, PipelineResult, StageReport};
pub use plan::{stages_for, PipelinePlan};
pub use runner::{LineBuffer, ProcessRunner};
pub use stage::{Stage, StageKind};
pub use stages::GowinPnr;
