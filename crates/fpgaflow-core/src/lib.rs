//! fpgaflow core - the pure side of the FPGA build pipeline
//!
//! - Board catalog and toolchain selection
//! - Project description and operation validation
//! - Constraint-file dialects (CST, PCF, LPF)
//! - Port-list expansion for constraint coverage checks
//! - Lint diagnostics parsing

pub mod constraints;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod ports;
pub mod project;
pub mod telemetry;

// Re-export key types
pub use constraints::{
    ConstraintCodec, ConstraintDialect, ConstraintEntry, ConstraintFile, VerbatimLine,
};
pub use device::{resolve_device_info, resolve_toolchain, DeviceInfo, ToolchainKind, KNOWN_BOARDS};
pub use diagnostics::{parse_lint_output, Issue, IssueSeverity};
pub use error::{CoreError, Result};
pub use ports::{missing_ports, PortDecl, PortDirection};
pub use project::{Operation, ProgramMode, ProjectConfig};
pub use telemetry::init_tracing;
