use super::path_arg;
use crate::classify::PackClassifier;
use crate::context::ToolchainContext;
use crate::stage::{input_artifact, run_classified, Stage};
use async_trait::async_trait;
use fpgaflow_core::{DeviceInfo, ProjectConfig, ToolchainKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Bitstream packer for the routed netlist.
pub struct PackStage {
    toolchain: ToolchainKind,
    project: Arc<ProjectConfig>,
    device: DeviceInfo,
    classifier: PackClassifier,
    artifacts: Vec<PathBuf>,
}

impl PackStage {
    pub fn new(toolchain: ToolchainKind, project: Arc<ProjectConfig>, device: DeviceInfo) -> Self {
        Self {
            toolchain,
            project,
            device,
            classifier: PackClassifier,
            artifacts: Vec::new(),
        }
    }

    pub fn argv(&self, ctx: &ToolchainContext, routed: &Path, bitstream: &Path) -> Vec<String> {
        let packer = path_arg(&ctx.tool(self.toolchain.packer()));
        match self.toolchain {
            ToolchainKind::Apicula => vec![
                packer,
                "-d".to_string(),
                self.device.family.to_string(),
                "-o".to_string(),
                path_arg(bitstream),
                path_arg(routed),
            ],
            ToolchainKind::IceStorm | ToolchainKind::Trellis => {
                vec![packer, path_arg(routed), path_arg(bitstream)]
            }
        }
    }
}

fn project_label(toolchain: ToolchainKind) -> &'static str {
    match toolchain {
        ToolchainKind::Apicula => "Apicula",
        ToolchainKind::IceStorm => "IceStorm",
        ToolchainKind::Trellis => "Trellis",
    }
}

#[async_trait]
impl Stage for PackStage {
    fn name(&self) -> &'static str {
        "pack"
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    async fn run(&mut self, previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let logger = ctx.logger();
        let Some(routed) = input_artifact(previous) else {
            logger.log_to_both("    Error: no routed netlist file");
            return None;
        };

        let bitstream = self
            .project
            .artifact_path(&format!(".{}", self.toolchain.bitstream_extension()));
        let argv = self.argv(ctx, &routed, &bitstream);
        self.artifacts.push(bitstream);

        logger.log_to_both(&format!(
            "Starting Bitstream Generation with {}",
            project_label(self.toolchain)
        ));
        let code = run_classified(ctx, &argv, &self.project.base_path, &mut self.classifier).await;
        logger.log_to_both("Finished Bitstream Generation");
        code
    }
}
