use super::path_arg;
use crate::classify::ProgrammerClassifier;
use crate::context::ToolchainContext;
use crate::stage::{run_classified, Stage};
use async_trait::async_trait;
use fpgaflow_core::{ProgramMode, ProjectConfig, ToolchainKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const LOADER: &str = "openFPGALoader";

/// Where openFPGALoader writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramTarget {
    /// The FPGA itself, from the bitstream this toolchain produces.
    Device(ToolchainKind),
    /// The board's external flash, from the selected image.
    ExternalFlash,
}

/// openFPGALoader. Reads from disk only, so it produces no artifacts.
pub struct ProgramStage {
    target: ProgramTarget,
    project: Arc<ProjectConfig>,
    classifier: ProgrammerClassifier,
}

impl ProgramStage {
    pub fn new(target: ProgramTarget, project: Arc<ProjectConfig>) -> Self {
        Self {
            target,
            project,
            classifier: ProgrammerClassifier::new(),
        }
    }

    /// File handed to the loader.
    pub fn source(&self) -> Option<PathBuf> {
        match self.target {
            ProgramTarget::Device(toolchain) => Some(
                self.project
                    .artifact_path(&format!(".{}", toolchain.bitstream_extension())),
            ),
            ProgramTarget::ExternalFlash => self.project.external_flash_file_path.clone(),
        }
    }

    pub fn argv(&self, ctx: &ToolchainContext, source: &Path) -> Vec<String> {
        let mut argv = vec![
            path_arg(&ctx.tool(LOADER)),
            "-b".to_string(),
            self.project.board.clone(),
        ];
        match self.target {
            ProgramTarget::Device(_) => {
                argv.extend([path_arg(source), "-v".to_string()]);
                if self.project.program_mode == ProgramMode::Flash {
                    argv.push("-f".to_string());
                }
            }
            ProgramTarget::ExternalFlash => {
                argv.extend(["--external-flash".to_string(), path_arg(source)]);
            }
        }
        argv
    }
}

#[async_trait]
impl Stage for ProgramStage {
    fn name(&self) -> &'static str {
        match self.target {
            ProgramTarget::Device(_) => "program",
            ProgramTarget::ExternalFlash => "external_flash",
        }
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &[]
    }

    async fn run(&mut self, _previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let logger = ctx.logger();
        let Some(source) = self.source() else {
            logger.log_to_both("    Error: no external flash file selected");
            return None;
        };
        if !tokio::fs::try_exists(&source).await.unwrap_or(false) {
            let what = match self.target {
                ProgramTarget::Device(_) => "bitstream",
                ProgramTarget::ExternalFlash => "flash image",
            };
            logger.log_to_both(&format!("    Error: no {} file at {}", what, source.display()));
            return None;
        }

        let argv = self.argv(ctx, &source);
        logger.log_to_both("Starting FPGA Programming with OpenFPGALoader");
        let code = run_classified(ctx, &argv, &self.project.base_path, &mut self.classifier).await;
        logger.log_to_both("Finished FPGA Programming");
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Logger, MemoryLogger};

    fn project(json: &str, base: &Path) -> Arc<ProjectConfig> {
        Arc::new(ProjectConfig::from_json_str(json, base).unwrap())
    }

    fn ctx(logger: Arc<MemoryLogger>) -> ToolchainContext {
        ToolchainContext::new("/suite/bin", logger as Arc<dyn Logger>)
    }

    #[test]
    fn test_device_argv_flash_and_ram() {
        let ctx = ctx(Arc::new(MemoryLogger::new()));
        let flash = ProgramStage::new(
            ProgramTarget::Device(ToolchainKind::Apicula),
            project(r#"{"name": "blink"}"#, Path::new("/w")),
        );
        let source = flash.source().unwrap();
        assert_eq!(source, PathBuf::from("/w/blink.fs"));
        assert_eq!(
            flash.argv(&ctx, &source),
            vec!["/suite/bin/openFPGALoader", "-b", "tangnano9k", "/w/blink.fs", "-v", "-f"]
        );

        let ram = ProgramStage::new(
            ProgramTarget::Device(ToolchainKind::IceStorm),
            project(r#"{"name": "blink", "board": "icebreaker", "programMode": "ram"}"#, Path::new("/w")),
        );
        let source = ram.source().unwrap();
        assert_eq!(
            ram.argv(&ctx, &source),
            vec!["/suite/bin/openFPGALoader", "-b", "icebreaker", "/w/blink.bin", "-v"]
        );
    }

    #[test]
    fn test_external_flash_argv() {
        let ctx = ctx(Arc::new(MemoryLogger::new()));
        let mut config = ProjectConfig::from_json_str(
            r#"{"name": "blink", "externalFlashFiles": ["image.bin"]}"#,
            Path::new("/w"),
        )
        .unwrap();
        config.select_external_flash_file(None).unwrap();
        let stage = ProgramStage::new(ProgramTarget::ExternalFlash, Arc::new(config));
        assert_eq!(stage.name(), "external_flash");
        let source = stage.source().unwrap();
        assert_eq!(
            stage.argv(&ctx, &source),
            vec!["/suite/bin/openFPGALoader", "-b", "tangnano9k", "--external-flash", "/w/image.bin"]
        );
    }

    #[tokio::test]
    async fn test_missing_bitstream_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(MemoryLogger::new());
        let mut stage = ProgramStage::new(
            ProgramTarget::Device(ToolchainKind::Apicula),
            project(r#"{"name": "blink"}"#, dir.path()),
        );
        assert_eq!(stage.run(None, &ctx(logger.clone())).await, None);
        assert!(logger.summary()[0].starts_with("    Error: no bitstream file at"));
    }

    #[tokio::test]
    async fn test_unselected_flash_image_returns_none() {
        let logger = Arc::new(MemoryLogger::new());
        let mut stage = ProgramStage::new(
            ProgramTarget::ExternalFlash,
            project(r#"{"name": "blink"}"#, Path::new("/w")),
        );
        assert_eq!(stage.run(None, &ctx(logger.clone())).await, None);
        assert!(logger.has_summary_line("Error: no external flash file selected"));
    }
}
