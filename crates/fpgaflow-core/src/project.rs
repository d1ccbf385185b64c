//! Project description and the operations a pipeline can run against it.

use crate::device::ToolchainKind;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What the user asked the pipeline to do.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    BuildOnly,
    BuildAndProgram,
    ProgramOnly,
    ExternalFlash,
    RunTestbench,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::BuildOnly => "build_only",
            Operation::BuildAndProgram => "build_and_program",
            Operation::ProgramOnly => "program_only",
            Operation::ExternalFlash => "external_flash",
            Operation::RunTestbench => "run_testbench",
        }
    }

    /// Whether the operation synthesizes the design.
    pub fn builds(&self) -> bool {
        matches!(self, Operation::BuildOnly | Operation::BuildAndProgram)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where the programmer writes the bitstream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgramMode {
    #[default]
    Flash,
    Ram,
}

fn default_board() -> String {
    "tangnano9k".to_string()
}

fn default_baud_rate() -> u32 {
    115200
}

/// A project as loaded from its JSON project file.
///
/// Paths are absolute once loaded through [`ProjectConfig::from_json_file`]
/// or [`ProjectConfig::from_json_str`]. The pipeline never mutates a
/// project; selections such as the testbench to run are made beforehand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Base name for every artifact (`<name>.json`, `<name>_pnr.asc`, ...).
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_board")]
    pub board: String,

    /// Top module; `top` when unset.
    #[serde(default)]
    pub top: Option<String>,

    #[serde(default)]
    pub included_files: Vec<PathBuf>,

    #[serde(default)]
    pub test_benches: Vec<PathBuf>,

    #[serde(default)]
    pub external_flash_files: Vec<PathBuf>,

    #[serde(default, alias = "constraintsFilePath")]
    pub constraints_file: Option<PathBuf>,

    #[serde(default)]
    pub program_mode: ProgramMode,

    /// Serial terminal speed. Carried for the serial tooling; unused by builds.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default)]
    pub skip_cst_checking: bool,

    #[serde(default)]
    pub synth_gowin_options: Vec<String>,

    #[serde(default, rename = "nextPnrGowinOptions")]
    pub nextpnr_gowin_options: Vec<String>,

    #[serde(default)]
    pub synth_ice40_options: Vec<String>,

    #[serde(default, rename = "nextPnrIce40Options")]
    pub nextpnr_ice40_options: Vec<String>,

    #[serde(default)]
    pub synth_ecp5_options: Vec<String>,

    #[serde(default, rename = "nextPnrEcp5Options")]
    pub nextpnr_ecp5_options: Vec<String>,

    /// Directory holding the project file; working directory of every tool.
    #[serde(skip)]
    pub base_path: PathBuf,

    #[serde(skip)]
    pub testbench_path: Option<PathBuf>,

    #[serde(skip)]
    pub external_flash_file_path: Option<PathBuf>,
}

impl ProjectConfig {
    /// Load a project file, resolving its paths against the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let base_path = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut project = Self::from_json_str(&text, &base_path)?;
        if project.name.is_empty() {
            project.name = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split('.').next())
                .unwrap_or("project")
                .to_string();
        }
        Ok(project)
    }

    pub fn from_json_str(text: &str, base_path: &Path) -> Result<Self> {
        let mut project: ProjectConfig = serde_json::from_str(text)?;
        project.base_path = base_path.to_path_buf();

        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base_path.join(&*p);
            }
        };
        project.included_files.iter_mut().for_each(resolve);
        project.test_benches.iter_mut().for_each(resolve);
        project.external_flash_files.iter_mut().for_each(resolve);
        project.constraints_file.iter_mut().for_each(resolve);

        Ok(project)
    }

    pub fn top_module(&self) -> &str {
        self.top.as_deref().filter(|t| !t.is_empty()).unwrap_or("top")
    }

    /// Path of an artifact named after the project: `<base>/<name><suffix>`.
    pub fn artifact_path(&self, suffix: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", self.name, suffix))
    }

    pub fn synth_options(&self, toolchain: ToolchainKind) -> &[String] {
        match toolchain {
            ToolchainKind::Apicula => &self.synth_gowin_options,
            ToolchainKind::IceStorm => &self.synth_ice40_options,
            ToolchainKind::Trellis => &self.synth_ecp5_options,
        }
    }

    pub fn nextpnr_options(&self, toolchain: ToolchainKind) -> &[String] {
        match toolchain {
            ToolchainKind::Apicula => &self.nextpnr_gowin_options,
            ToolchainKind::IceStorm => &self.nextpnr_ice40_options,
            ToolchainKind::Trellis => &self.nextpnr_ecp5_options,
        }
    }

    /// Pick the testbench to simulate: an explicit choice, or the only one.
    pub fn select_testbench(&mut self, choice: Option<&Path>) -> Result<()> {
        let path = self.select(&self.test_benches, choice, "testbench")?;
        self.testbench_path = Some(path);
        Ok(())
    }

    /// Pick the image to write to external flash.
    pub fn select_external_flash_file(&mut self, choice: Option<&Path>) -> Result<()> {
        let path = self.select(&self.external_flash_files, choice, "external flash file")?;
        self.external_flash_file_path = Some(path);
        Ok(())
    }

    fn select(&self, candidates: &[PathBuf], choice: Option<&Path>, what: &str) -> Result<PathBuf> {
        if let Some(choice) = choice {
            return Ok(if choice.is_relative() {
                self.base_path.join(choice)
            } else {
                choice.to_path_buf()
            });
        }
        match candidates {
            [only] => Ok(only.clone()),
            [] => Err(CoreError::InvalidProject(format!("No {} selected", what))),
            _ => Err(CoreError::InvalidProject(format!(
                "{} {}s configured, choose one",
                candidates.len(),
                what
            ))),
        }
    }

    /// Check the project carries what `operation` needs.
    pub fn validate_for(&self, operation: Operation) -> Result<()> {
        if operation.builds() {
            if self.included_files.is_empty() {
                return Err(CoreError::InvalidProject("No files to synthesize".to_string()));
            }
            if self.constraints_file.is_none() {
                return Err(CoreError::InvalidProject(
                    "No constraints file configured".to_string(),
                ));
            }
        }
        let names_artifacts = operation.builds() || operation == Operation::ProgramOnly;
        if names_artifacts && self.name.trim().is_empty() {
            return Err(CoreError::InvalidProject(
                "No project name to derive artifact names from".to_string(),
            ));
        }
        match operation {
            Operation::ExternalFlash if self.external_flash_file_path.is_none() => Err(
                CoreError::InvalidProject("No external flash file selected".to_string()),
            ),
            Operation::RunTestbench if self.testbench_path.is_none() => {
                Err(CoreError::InvalidProject("No testbench selected".to_string()))
            }
            _ => Ok(()),
        }
    }
}
