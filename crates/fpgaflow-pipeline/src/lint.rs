//! Verilator lint of the project sources.

use crate::classify::OutputClassifier;
use crate::context::ToolchainContext;
use crate::error::Result;
use crate::runner::ProcessRunner;
use crate::stages::path_arg;
use fpgaflow_core::{parse_lint_output, resolve_toolchain, CoreError, Issue, ProjectConfig};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keeps verilator's stderr for parsing; shows nothing.
#[derive(Default)]
struct StderrCollector {
    text: String,
}

impl OutputClassifier for StderrCollector {
    fn on_stdout_line(&mut self, _line: &str) -> Vec<String> {
        Vec::new()
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        self.text.push_str(line);
        self.text.push('\n');
        Vec::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LintReport {
    pub exit_code: Option<i32>,
    pub issues: Vec<Issue>,
}

/// Yosys simulation models for the project's family, when the suite has them.
pub fn cell_library(ctx: &ToolchainContext, project: &ProjectConfig) -> Result<Option<PathBuf>> {
    let toolchain = resolve_toolchain(&project.board)?;
    Ok(ctx.root().map(|root| {
        root.join("share")
            .join("yosys")
            .join(toolchain.yosys_share_dir())
            .join("cells_sim.v")
    }))
}

/// Verilator config that silences warnings raised inside `cells`.
pub fn lint_off_config(cells: &Path) -> String {
    format!("`verilator_config\nlint_off -file \"{}\"\n", cells.display())
}

pub fn lint_argv(
    ctx: &ToolchainContext,
    project: &ProjectConfig,
    cells: Option<(&Path, &Path)>,
) -> Vec<String> {
    let mut argv = vec![
        path_arg(&ctx.tool("verilator")),
        "--top-module".to_string(),
        project.top_module().to_string(),
        "--lint-only".to_string(),
        "-Wall".to_string(),
    ];
    if let Some((library, config)) = cells {
        argv.extend([path_arg(library), path_arg(config)]);
    }
    argv.extend(project.included_files.iter().map(|p| path_arg(p)));
    argv
}

/// Lint every source file and return the parsed issues.
pub async fn lint_project(project: &ProjectConfig, ctx: &ToolchainContext) -> Result<LintReport> {
    if project.included_files.is_empty() {
        return Err(CoreError::InvalidProject("No files to lint".to_string()).into());
    }

    let library = cell_library(ctx, project)?.filter(|p| p.is_file());
    let config = match &library {
        Some(library) => {
            let mut file = tempfile::Builder::new()
                .prefix("fpgaflow-lint")
                .suffix(".vlt")
                .tempfile()?;
            file.write_all(lint_off_config(library).as_bytes())?;
            Some(file)
        }
        None => None,
    };
    let cells = library
        .as_deref()
        .zip(config.as_ref().map(|f| f.path()));
    let argv = lint_argv(ctx, project, cells);
    debug!(cell_library = ?library, "Linting sources");

    let mut collector = StderrCollector::default();
    let exit_code = ProcessRunner::new(ctx)
        .run(&argv, &project.base_path, &mut collector)
        .await;
    let issues = parse_lint_output(&collector.text);
    Ok(LintReport { exit_code, issues })
}
