//! Pipeline orchestration: fail-fast sequencing and run reporting.

use crate::context::ToolchainContext;
use crate::error::Result;
use crate::plan::{compute_stages_digest, PipelinePlan};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use fpgaflow_core::{resolve_device_info, resolve_toolchain, Operation, ProjectConfig};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// A file a stage left on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl ArtifactRecord {
    /// Hash the file at `path`; `None` if it can't be read.
    pub async fn capture(path: &Path) -> Option<Self> {
        let bytes = tokio::fs::read(path).await.ok()?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Some(Self {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            sha256: hex::encode(hasher.finalize()),
        })
    }
}

/// Result of one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage_name: String,

    /// Tool exit code; `None` when the stage could not start.
    pub exit_code: Option<i32>,

    pub duration_ms: u64,

    /// Produced artifacts found on disk after a successful exit.
    pub artifacts: Vec<ArtifactRecord>,
}

impl StageReport {
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Result of a complete pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub run_id: String,
    pub operation: Operation,
    pub started_at: DateTime<Utc>,

    /// Whether every stage exited `0`.
    pub success: bool,

    /// Exit code of the last stage that ran.
    pub exit_code: Option<i32>,

    /// Reports of the stages that ran, in order. Stages after a failure
    /// never run and have no report.
    pub stages: Vec<StageReport>,

    pub duration_ms: u64,

    /// Digest of the ordered stage names.
    pub plan_digest: String,
}

impl PipelineResult {
    /// Number of stages that passed.
    pub fn passed_count(&self) -> usize {
        self.stages.iter().filter(|s| s.passed()).count()
    }

    /// Number of stages that failed.
    pub fn failed_count(&self) -> usize {
        self.stages.iter().filter(|s| !s.passed()).count()
    }
}

/// Pipeline orchestrator.
pub struct Pipeline;

impl Pipeline {
    /// Resolve the board, validate the project for `operation`, plan the
    /// stages and run them.
    ///
    /// `Err` means nothing ran. Stage failures are reported through the
    /// returned [`PipelineResult`].
    pub async fn run(
        project: Arc<ProjectConfig>,
        operation: Operation,
        ctx: &ToolchainContext,
    ) -> Result<PipelineResult> {
        let toolchain = resolve_toolchain(&project.board)?;
        let device = resolve_device_info(&project.board)?;
        project.validate_for(operation)?;

        let plan = PipelinePlan::new(operation, toolchain, project.skip_cst_checking);
        info!(
            board = %project.board,
            toolchain = %toolchain,
            stages = ?plan.stage_names(),
            "Planned pipeline"
        );
        let stages = plan.instantiate(&project, device);
        Ok(Self::run_stages(operation, stages, ctx).await)
    }

    /// Run `stages` in order, halting at the first exit other than `0`.
    pub async fn run_stages(
        operation: Operation,
        stages: Vec<Box<dyn Stage>>,
        ctx: &ToolchainContext,
    ) -> PipelineResult {
        let start = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
        let plan_digest = compute_stages_digest(&names);
        let logger = ctx.logger();

        info!(run_id = %run_id, operation = %operation, "Starting pipeline");
        logger.log_to_both("Starting FPGA Toolchain");

        let mut reports = Vec::with_capacity(stages.len());
        let mut exit_code = Some(0);
        let mut previous: Option<Box<dyn Stage>> = None;

        for mut stage in stages {
            info!(stage = stage.name(), "Executing stage");
            let stage_start = Instant::now();
            let code = stage.run(previous.as_deref(), ctx).await;
            let duration_ms = stage_start.elapsed().as_millis() as u64;

            let mut artifacts = Vec::new();
            if code == Some(0) {
                for path in stage.produced_artifacts() {
                    if let Some(record) = ArtifactRecord::capture(path).await {
                        artifacts.push(record);
                    }
                }
            }
            reports.push(StageReport {
                stage_name: stage.name().to_string(),
                exit_code: code,
                duration_ms,
                artifacts,
            });

            exit_code = code;
            if code != Some(0) {
                warn!(stage = stage.name(), exit_code = ?code, "Stage failed, halting pipeline");
                break;
            }
            previous = Some(stage);
        }

        let success = exit_code == Some(0);
        if success {
            logger.log_to_both("Toolchain Completed");
            info!(run_id = %run_id, "Pipeline completed successfully");
        } else {
            logger.log_to_both("Toolchain finished with errors");
            info!(run_id = %run_id, exit_code = ?exit_code, "Pipeline failed");
        }

        PipelineResult {
            run_id,
            operation,
            started_at,
            success,
            exit_code,
            stages: reports,
            duration_ms: start.elapsed().as_millis() as u64,
            plan_digest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(name: &str, exit_code: Option<i32>) -> StageReport {
        StageReport {
            stage_name: name.to_string(),
            exit_code,
            duration_ms: 100,
            artifacts: Vec::new(),
        }
    }

    fn result(stages: Vec<StageReport>, exit_code: Option<i32>) -> PipelineResult {
        PipelineResult {
            run_id: "run123".to_string(),
            operation: Operation::BuildOnly,
            started_at: Utc::now(),
            success: exit_code == Some(0),
            exit_code,
            stages,
            duration_ms: 300,
            plan_digest: "abc123".to_string(),
        }
    }

    #[test]
    fn test_pipeline_result_counts() {
        let result = result(
            vec![report("synthesis", Some(0)), report("place_and_route", Some(0))],
            Some(0),
        );
        assert_eq!(result.passed_count(), 2);
        assert_eq!(result.failed_count(), 0);
        assert!(result.success);
    }

    #[test]
    fn test_pipeline_result_with_failures() {
        let result = result(
            vec![report("synthesis", Some(0)), report("place_and_route", None)],
            None,
        );
        assert_eq!(result.passed_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_artifact_record_hashes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.fs");
        tokio::fs::write(&path, b"abc").await.unwrap();

        let record = ArtifactRecord::capture(&path).await.unwrap();
        assert_eq!(record.size, 3);
        assert_eq!(
            record.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(ArtifactRecord::capture(&dir.path().join("missing")).await.is_none());
    }
}
