use super::path_arg;
use crate::classify::{emit, IndentClassifier, OutputClassifier};
use crate::context::ToolchainContext;
use crate::runner::ProcessRunner;
use crate::stage::Stage;
use async_trait::async_trait;
use fpgaflow_core::ProjectConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Module iverilog elaborates as the simulation root.
const TESTBENCH_TOP: &str = "test";

/// iverilog compile then vvp run of the selected testbench.
pub struct TestbenchStage {
    project: Arc<ProjectConfig>,
    classifier: IndentClassifier,
    artifacts: Vec<PathBuf>,
}

impl TestbenchStage {
    pub fn new(project: Arc<ProjectConfig>) -> Self {
        Self {
            project,
            classifier: IndentClassifier,
            artifacts: Vec::new(),
        }
    }

    /// `<base>/<testbench stem>.o`
    pub fn compiled_path(&self, testbench: &Path) -> PathBuf {
        let stem = testbench
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "testbench".to_string());
        self.project.base_path.join(format!("{}.o", stem))
    }

    pub fn compile_argv(&self, ctx: &ToolchainContext, testbench: &Path, compiled: &Path) -> Vec<String> {
        let mut argv = vec![
            path_arg(&ctx.tool("iverilog")),
            "-o".to_string(),
            path_arg(compiled),
            "-s".to_string(),
            TESTBENCH_TOP.to_string(),
            path_arg(testbench),
        ];
        argv.extend(self.project.included_files.iter().map(|p| path_arg(p)));
        argv
    }
}

#[async_trait]
impl Stage for TestbenchStage {
    fn name(&self) -> &'static str {
        "testbench"
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    async fn run(&mut self, _previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let logger = ctx.logger();
        let Some(testbench) = self.project.testbench_path.clone() else {
            logger.log_to_both("    Error: no testbench selected");
            return None;
        };
        let compiled = self.compiled_path(&testbench);
        let compile = self.compile_argv(ctx, &testbench, &compiled);
        let simulate = vec![path_arg(&ctx.tool("vvp")), path_arg(&compiled)];
        self.artifacts.push(compiled);

        let cwd = &self.project.base_path;
        let runner = ProcessRunner::new(ctx);
        logger.log_to_both("Starting Testbench with iVerilog");
        let echo = self.classifier.echoes_to_raw();
        emit(logger, echo, self.classifier.on_start());
        let mut code = runner.run(&compile, cwd, &mut self.classifier).await;
        if code == Some(0) {
            code = runner.run(&simulate, cwd, &mut self.classifier).await;
        }
        emit(logger, echo, self.classifier.on_end());
        logger.log_to_both("Finished Testbench");
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Logger, MemoryLogger};

    #[test]
    fn test_compile_argv() {
        let project = Arc::new(
            ProjectConfig::from_json_str(
                r#"{"includedFiles": ["top.v", "uart.v"], "testBenches": ["tb/top_tb.v"]}"#,
                Path::new("/w"),
            )
            .unwrap(),
        );
        let ctx = ToolchainContext::new("/suite/bin", Arc::new(MemoryLogger::new()) as Arc<dyn Logger>);
        let stage = TestbenchStage::new(project);
        let compiled = stage.compiled_path(Path::new("/w/tb/top_tb.v"));
        assert_eq!(compiled, PathBuf::from("/w/top_tb.o"));
        assert_eq!(
            stage.compile_argv(&ctx, Path::new("/w/tb/top_tb.v"), &compiled),
            vec![
                "/suite/bin/iverilog", "-o", "/w/top_tb.o", "-s", "test", "/w/tb/top_tb.v",
                "/w/top.v", "/w/uart.v",
            ]
        );
    }

    #[tokio::test]
    async fn test_unselected_testbench_returns_none() {
        let logger = Arc::new(MemoryLogger::new());
        let ctx = ToolchainContext::new("/suite/bin", logger.clone() as Arc<dyn Logger>);
        let project = Arc::new(ProjectConfig::from_json_str("{}", Path::new("/w")).unwrap());
        let mut stage = TestbenchStage::new(project);
        assert_eq!(stage.run(None, &ctx).await, None);
        assert!(logger.has_summary_line("Error: no testbench selected"));
    }
}
