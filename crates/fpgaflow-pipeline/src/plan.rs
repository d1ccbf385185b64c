//! Stage composition per operation, and plan identity.

use crate::stage::{Stage, StageKind};
use fpgaflow_core::{DeviceInfo, Operation, ProjectConfig, ToolchainKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Ordered stage kinds for one operation on one toolchain.
///
/// The constraint check runs ahead of synthesis unless `skip_check` is set.
pub fn stages_for(operation: Operation, toolchain: ToolchainKind, skip_check: bool) -> Vec<StageKind> {
    let build = || {
        let mut stages = Vec::with_capacity(4);
        if !skip_check {
            stages.push(StageKind::ConstraintCheck(toolchain));
        }
        stages.extend([
            StageKind::Synthesis(toolchain),
            StageKind::PlaceAndRoute(toolchain),
            StageKind::Pack(toolchain),
        ]);
        stages
    };

    match operation {
        Operation::BuildOnly => build(),
        Operation::BuildAndProgram => {
            let mut stages = build();
            stages.push(StageKind::Program(toolchain));
            stages
        }
        Operation::ProgramOnly => vec![StageKind::Program(toolchain)],
        Operation::ExternalFlash => vec![StageKind::ExternalFlash],
        Operation::RunTestbench => vec![StageKind::Testbench],
    }
}

/// What a run will execute, identified by a digest of its stage order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelinePlan {
    pub operation: Operation,
    pub toolchain: ToolchainKind,
    pub stages: Vec<StageKind>,

    /// SHA-256 digest of ordered stage names (deterministic).
    pub digest: String,
}

impl PipelinePlan {
    pub fn new(operation: Operation, toolchain: ToolchainKind, skip_check: bool) -> Self {
        Self::from_stages(operation, toolchain, stages_for(operation, toolchain, skip_check))
    }

    pub fn from_stages(operation: Operation, toolchain: ToolchainKind, stages: Vec<StageKind>) -> Self {
        let names: Vec<&str> = stages.iter().map(StageKind::name).collect();
        let digest = compute_stages_digest(&names);
        Self {
            operation,
            toolchain,
            stages,
            digest,
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(StageKind::name).collect()
    }

    /// Fresh stage instances for one run.
    pub fn instantiate(&self, project: &Arc<ProjectConfig>, device: DeviceInfo) -> Vec<Box<dyn Stage>> {
        let show_banner = !self
            .stages
            .iter()
            .any(|kind| matches!(kind, StageKind::ConstraintCheck(_)));
        self.stages
            .iter()
            .map(|kind| kind.build(project, device, show_banner))
            .collect()
    }
}

/// Compute deterministic digest of ordered stage names.
pub fn compute_stages_digest(stages: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for stage in stages {
        hasher.update(stage.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
