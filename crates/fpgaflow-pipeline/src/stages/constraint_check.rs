use super::{path_arg, read_verilog};
use crate::classify::PortListClassifier;
use crate::context::ToolchainContext;
use crate::stage::{run_classified, Stage};
use async_trait::async_trait;
use fpgaflow_core::{missing_ports, ProjectConfig, ToolchainKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Runs yosys `portlist` on the top module and fails when any of its
/// scalar ports has no entry in the constraints file.
pub struct ConstraintCheckStage {
    toolchain: ToolchainKind,
    project: Arc<ProjectConfig>,
    classifier: PortListClassifier,
    missing: Vec<String>,
}

impl ConstraintCheckStage {
    pub fn new(toolchain: ToolchainKind, project: Arc<ProjectConfig>) -> Self {
        Self {
            toolchain,
            project,
            classifier: PortListClassifier::new(),
            missing: Vec::new(),
        }
    }

    pub fn argv(&self, ctx: &ToolchainContext) -> Vec<String> {
        let script = format!(
            "{}; portlist {}",
            read_verilog(&self.project.included_files),
            self.project.top_module()
        );
        vec![path_arg(&ctx.tool("yosys")), "-p".to_string(), script]
    }

    /// Ports found without a constraint on the last run.
    pub fn missing_ports(&self) -> &[String] {
        &self.missing
    }

    async fn check_coverage(&mut self, ctx: &ToolchainContext) -> Option<i32> {
        let logger = ctx.logger();
        logger.log_to_both("    Checking if all ports are defined in constraints file");

        let Some(path) = self.project.constraints_file.as_ref() else {
            logger.log_to_both("    Error: no constraints file configured");
            return Some(1);
        };
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) => {
                logger.log_to_both(&format!(
                    "    Error: could not read constraints file {}: {}",
                    path.display(),
                    e
                ));
                return Some(1);
            }
        };

        let dialect = self.toolchain.constraint_dialect();
        let constrained = dialect.port_names(&text);
        self.missing = missing_ports(&self.classifier.port_names(), &constrained);
        debug!(dialect = %dialect, missing = self.missing.len(), "Checked constraint coverage");

        if self.missing.is_empty() {
            logger.log_to_both("    All Ports are defined");
            return Some(0);
        }
        let (noun, verb) = if self.missing.len() > 1 {
            ("Ports", "are")
        } else {
            ("Port", "is")
        };
        logger.log_to_both(&format!(
            "    Error: {} {} missing from {} file: {}",
            noun,
            verb,
            dialect,
            self.missing.join(", ")
        ));
        Some(1)
    }
}

#[async_trait]
impl Stage for ConstraintCheckStage {
    fn name(&self) -> &'static str {
        "constraint_check"
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &[]
    }

    async fn run(&mut self, _previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let argv = self.argv(ctx);
        ctx.logger().log_to_both("Starting Constraint Check");
        let mut code = run_classified(ctx, &argv, &self.project.base_path, &mut self.classifier).await;
        if code == Some(0) {
            code = self.check_coverage(ctx).await;
        }
        ctx.logger().log_to_both("Finished Constraint Check");
        code
    }
}
