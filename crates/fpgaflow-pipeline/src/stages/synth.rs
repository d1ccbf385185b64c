use super::{path_arg, read_verilog};
use crate::classify::SynthClassifier;
use crate::context::ToolchainContext;
use crate::stage::{run_classified, Stage};
use async_trait::async_trait;
use fpgaflow_core::{ProjectConfig, ToolchainKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// yosys `synth_<family>` over the project sources, writing `<name>.json`.
pub struct SynthesisStage {
    toolchain: ToolchainKind,
    project: Arc<ProjectConfig>,
    classifier: SynthClassifier,
    artifacts: Vec<PathBuf>,
}

impl SynthesisStage {
    pub fn new(toolchain: ToolchainKind, project: Arc<ProjectConfig>, show_banner: bool) -> Self {
        Self {
            toolchain,
            project,
            classifier: SynthClassifier::new(show_banner),
            artifacts: Vec::new(),
        }
    }

    pub fn argv(&self, ctx: &ToolchainContext, netlist: &Path) -> Vec<String> {
        let mut script = format!(
            "{}; {} -top {} -json {}",
            read_verilog(&self.project.included_files),
            self.toolchain.synth_command(),
            self.project.top_module(),
            path_arg(netlist),
        );
        for option in self.project.synth_options(self.toolchain) {
            script.push(' ');
            script.push_str(option);
        }
        vec![path_arg(&ctx.tool("yosys")), "-p".to_string(), script]
    }
}

#[async_trait]
impl Stage for SynthesisStage {
    fn name(&self) -> &'static str {
        "synthesis"
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    async fn run(&mut self, _previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let netlist = self.project.artifact_path(".json");
        let argv = self.argv(ctx, &netlist);
        self.artifacts.push(netlist);

        let logger = ctx.logger();
        logger.log_to_both(&format!(
            "Starting Synthesis with Yosys ({})",
            self.toolchain.family_label()
        ));
        let code = run_classified(ctx, &argv, &self.project.base_path, &mut self.classifier).await;
        logger.log_to_both("Finished Synthesis");
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Logger, MemoryLogger};

    fn project(json: &str) -> Arc<ProjectConfig> {
        Arc::new(ProjectConfig::from_json_str(json, Path::new("/w")).unwrap())
    }

    #[test]
    fn test_argv_template() {
        let project = project(
            r#"{"name": "blink", "includedFiles": ["top.v", "uart.v"], "top": "blinky",
                "synthEcp5Options": ["-abc9", "-nowidelut"]}"#,
        );
        let ctx = ToolchainContext::new("/suite/bin", Arc::new(MemoryLogger::new()) as Arc<dyn Logger>);
        let stage = SynthesisStage::new(ToolchainKind::Trellis, project, true);
        let argv = stage.argv(&ctx, Path::new("/w/blink.json"));
        assert_eq!(argv[0], "/suite/bin/yosys");
        assert_eq!(argv[1], "-p");
        assert_eq!(
            argv[2],
            "read_verilog /w/top.v /w/uart.v; synth_ecp5 -top blinky -json /w/blink.json -abc9 -nowidelut"
        );
    }

    #[test]
    fn test_argv_without_options_has_no_trailing_space() {
        let project = project(r#"{"name": "blink", "includedFiles": ["top.v"]}"#);
        let ctx = ToolchainContext::new("/suite/bin", Arc::new(MemoryLogger::new()) as Arc<dyn Logger>);
        let stage = SynthesisStage::new(ToolchainKind::Apicula, project, true);
        let argv = stage.argv(&ctx, Path::new("/w/blink.json"));
        assert_eq!(argv[2], "read_verilog /w/top.v; synth_gowin -top top -json /w/blink.json");
    }
}
