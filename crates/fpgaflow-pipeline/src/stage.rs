//! Stage contract and the set of stage kinds a plan can contain.

use crate::classify::{emit, OutputClassifier};
use crate::context::ToolchainContext;
use crate::runner::ProcessRunner;
use crate::stages::{
    ConstraintCheckStage, PackStage, PlaceAndRouteStage, ProgramStage, ProgramTarget,
    SynthesisStage, TestbenchStage,
};
use async_trait::async_trait;
use fpgaflow_core::{DeviceInfo, ProjectConfig, ToolchainKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One step of a pipeline run.
///
/// A stage is built for a single run. `run` returns the tool's exit code,
/// or `None` when the stage could not start (a missing input artifact, a
/// tool that failed to spawn). Output paths are registered before the tool
/// is launched, so they are visible even when the tool fails.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Paths this stage writes, first one being the main artifact.
    fn produced_artifacts(&self) -> &[PathBuf];

    async fn run(&mut self, previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32>;
}

/// Main artifact of the preceding stage.
pub fn input_artifact(previous: Option<&dyn Stage>) -> Option<PathBuf> {
    previous.and_then(|stage| stage.produced_artifacts().first().cloned())
}

/// Run one tool between the classifier's start and end events.
pub async fn run_classified(
    ctx: &ToolchainContext,
    argv: &[String],
    cwd: &Path,
    classifier: &mut dyn OutputClassifier,
) -> Option<i32> {
    let echo = classifier.echoes_to_raw();
    emit(ctx.logger(), echo, classifier.on_start());
    let code = ProcessRunner::new(ctx).run(argv, cwd, &mut *classifier).await;
    emit(ctx.logger(), echo, classifier.on_end());
    code
}

/// Kinds of stage, as composed by a plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// yosys `portlist` + constraint file coverage
    ConstraintCheck(ToolchainKind),

    /// yosys `synth_*` → `<name>.json`
    Synthesis(ToolchainKind),

    /// nextpnr → `<name>_pnr.<ext>`
    PlaceAndRoute(ToolchainKind),

    /// gowin_pack / icepack / ecppack → bitstream
    Pack(ToolchainKind),

    /// openFPGALoader to the board
    Program(ToolchainKind),

    /// openFPGALoader to the board's external flash
    ExternalFlash,

    /// iverilog + vvp
    Testbench,
}

impl StageKind {
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::ConstraintCheck(_) => "constraint_check",
            StageKind::Synthesis(_) => "synthesis",
            StageKind::PlaceAndRoute(_) => "place_and_route",
            StageKind::Pack(_) => "pack",
            StageKind::Program(_) => "program",
            StageKind::ExternalFlash => "external_flash",
            StageKind::Testbench => "testbench",
        }
    }

    /// Instantiate a fresh stage for one run.
    ///
    /// `show_banner` only affects synthesis; pass `false` when a
    /// constraint check already printed the yosys banner.
    pub fn build(
        self,
        project: &Arc<ProjectConfig>,
        device: DeviceInfo,
        show_banner: bool,
    ) -> Box<dyn Stage> {
        let project = Arc::clone(project);
        match self {
            StageKind::ConstraintCheck(toolchain) => {
                Box::new(ConstraintCheckStage::new(toolchain, project))
            }
            StageKind::Synthesis(toolchain) => {
                Box::new(SynthesisStage::new(toolchain, project, show_banner))
            }
            StageKind::PlaceAndRoute(toolchain) => {
                Box::new(PlaceAndRouteStage::new(toolchain, project, device))
            }
            StageKind::Pack(toolchain) => Box::new(PackStage::new(toolchain, project, device)),
            StageKind::Program(toolchain) => {
                Box::new(ProgramStage::new(ProgramTarget::Device(toolchain), project))
            }
            StageKind::ExternalFlash => {
                Box::new(ProgramStage::new(ProgramTarget::ExternalFlash, project))
            }
            StageKind::Testbench => Box::new(TestbenchStage::new(project)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Produced(Vec<PathBuf>);

    #[async_trait]
    impl Stage for Produced {
        fn name(&self) -> &'static str {
            "produced"
        }

        fn produced_artifacts(&self) -> &[PathBuf] {
            &self.0
        }

        async fn run(&mut self, _: Option<&dyn Stage>, _: &ToolchainContext) -> Option<i32> {
            Some(0)
        }
    }

    #[test]
    fn test_input_artifact_is_first_produced_path() {
        let previous = Produced(vec![PathBuf::from("/w/a.o"), PathBuf::from("/w/b.o")]);
        assert_eq!(input_artifact(Some(&previous)), Some(PathBuf::from("/w/a.o")));
        assert_eq!(input_artifact(Some(&Produced(Vec::new()))), None);
        assert_eq!(input_artifact(None), None);
    }

    #[test]
    fn test_stage_kind_names() {
        assert_eq!(StageKind::Synthesis(ToolchainKind::Trellis).name(), "synthesis");
        assert_eq!(StageKind::ExternalFlash.name(), "external_flash");
    }

    #[test]
    fn test_stage_kind_serde() {
        let json = serde_json::to_string(&StageKind::Pack(ToolchainKind::Apicula)).unwrap();
        assert_eq!(json, r#"{"pack":"apicula"}"#);
        let json = serde_json::to_string(&StageKind::Testbench).unwrap();
        assert_eq!(json, r#""testbench""#);
    }

    #[test]
    fn test_build_gives_matching_stage_names() {
        let project = Arc::new(ProjectConfig::from_json_str("{}", Path::new(".")).unwrap());
        let device = fpgaflow_core::resolve_device_info("tangnano9k").unwrap();
        for kind in [
            StageKind::ConstraintCheck(ToolchainKind::Apicula),
            StageKind::Synthesis(ToolchainKind::Apicula),
            StageKind::PlaceAndRoute(ToolchainKind::Apicula),
            StageKind::Pack(ToolchainKind::Apicula),
            StageKind::Program(ToolchainKind::Apicula),
            StageKind::ExternalFlash,
            StageKind::Testbench,
        ] {
            let stage = kind.build(&project, device, true);
            assert_eq!(stage.name(), kind.name());
            assert!(stage.produced_artifacts().is_empty());
        }
    }
}
