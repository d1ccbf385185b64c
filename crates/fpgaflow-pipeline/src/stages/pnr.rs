use super::path_arg;
use crate::classify::PnrClassifier;
use crate::context::ToolchainContext;
use crate::runner::ProcessRunner;
use crate::stage::{input_artifact, run_classified, Stage};
use async_trait::async_trait;
use fpgaflow_core::{DeviceInfo, ProjectConfig, ToolchainKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// nextpnr binary flavour.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PnrVariant {
    /// `nextpnr-gowin`
    Gowin,
    /// `nextpnr-himbaechel` with the Gowin uarch
    Himbaechel,
    Ice40,
    Ecp5,
}

impl PnrVariant {
    pub fn executable(&self) -> &'static str {
        match self {
            PnrVariant::Gowin => "nextpnr-gowin",
            PnrVariant::Himbaechel => "nextpnr-himbaechel",
            PnrVariant::Ice40 => "nextpnr-ice40",
            PnrVariant::Ecp5 => "nextpnr-ecp5",
        }
    }

    /// Pick the flavour for a toolchain. The Gowin choice is made once per
    /// context, from the config or by probing.
    pub async fn detect(toolchain: ToolchainKind, ctx: &ToolchainContext, cwd: &Path) -> Self {
        match toolchain {
            ToolchainKind::IceStorm => PnrVariant::Ice40,
            ToolchainKind::Trellis => PnrVariant::Ecp5,
            ToolchainKind::Apicula => {
                let choice = ctx.gowin_pnr().get_or_init(|| GowinPnr::probe(ctx, cwd)).await;
                PnrVariant::from(*choice)
            }
        }
    }

    pub fn argv(
        &self,
        ctx: &ToolchainContext,
        netlist: &Path,
        routed: &Path,
        device: &DeviceInfo,
        constraints: &Path,
        options: &[String],
    ) -> Vec<String> {
        let output_flag = match self {
            PnrVariant::Gowin | PnrVariant::Himbaechel => "--write",
            PnrVariant::Ice40 => "--asc",
            PnrVariant::Ecp5 => "--textcfg",
        };
        let mut argv = vec![
            path_arg(&ctx.tool(self.executable())),
            "--json".to_string(),
            path_arg(netlist),
            output_flag.to_string(),
            path_arg(routed),
            "--freq".to_string(),
            device.frequency_mhz.to_string(),
        ];
        let constraints = path_arg(constraints);
        match self {
            PnrVariant::Gowin => argv.extend([
                "--device".to_string(),
                device.device.to_string(),
                "--family".to_string(),
                device.family.to_string(),
                "--cst".to_string(),
                constraints,
            ]),
            PnrVariant::Himbaechel => argv.extend([
                "--device".to_string(),
                device.device.to_string(),
                "--vopt".to_string(),
                format!("family={}", device.family),
                "--vopt".to_string(),
                format!("cst={}", constraints),
            ]),
            PnrVariant::Ice40 => {
                if let Some(package) = device.package {
                    argv.extend(["--package".to_string(), package.to_string()]);
                }
                argv.extend(device.device_flag.map(str::to_string));
                argv.extend(["--pcf".to_string(), constraints]);
            }
            PnrVariant::Ecp5 => {
                argv.extend(device.device_flag.map(str::to_string));
                if let Some(package) = device.package {
                    argv.extend(["--package".to_string(), package.to_string()]);
                }
                argv.extend(["--lpf".to_string(), constraints]);
            }
        }
        argv.extend(options.iter().cloned());
        argv
    }
}

/// Which nextpnr places Gowin parts.
///
/// `gowin_pnr = "himbaechel"` or `"legacy"` in `fpgaflow.toml`; probed when unset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GowinPnr {
    Himbaechel,
    Legacy,
}

impl GowinPnr {
    /// Himbaechel when its `--help` lists the Gowin uarch, else the legacy binary.
    pub async fn probe(ctx: &ToolchainContext, cwd: &Path) -> Self {
        let executable = ctx.tool(PnrVariant::Himbaechel.executable());
        let argv = vec![path_arg(&executable), "--help".to_string()];
        match ProcessRunner::new(ctx).probe(&argv, cwd).await {
            Some(help) if help.to_lowercase().contains("gowin") => {
                debug!(tool = %executable.display(), "Using nextpnr-himbaechel for Gowin");
                GowinPnr::Himbaechel
            }
            Some(_) => {
                warn!(
                    tool = %executable.display(),
                    "nextpnr-himbaechel has no Gowin uarch, falling back to nextpnr-gowin"
                );
                GowinPnr::Legacy
            }
            None => {
                warn!(
                    tool = %executable.display(),
                    "nextpnr-himbaechel could not be run, falling back to nextpnr-gowin"
                );
                GowinPnr::Legacy
            }
        }
    }
}

impl From<GowinPnr> for PnrVariant {
    fn from(choice: GowinPnr) -> Self {
        match choice {
            GowinPnr::Himbaechel => PnrVariant::Himbaechel,
            GowinPnr::Legacy => PnrVariant::Gowin,
        }
    }
}

/// nextpnr over the synthesised netlist, writing `<name>_pnr.<ext>`.
pub struct PlaceAndRouteStage {
    toolchain: ToolchainKind,
    project: Arc<ProjectConfig>,
    device: DeviceInfo,
    classifier: PnrClassifier,
    artifacts: Vec<PathBuf>,
}

impl PlaceAndRouteStage {
    pub fn new(toolchain: ToolchainKind, project: Arc<ProjectConfig>, device: DeviceInfo) -> Self {
        Self {
            toolchain,
            project,
            device,
            classifier: PnrClassifier::new(),
            artifacts: Vec::new(),
        }
    }
}

#[async_trait]
impl Stage for PlaceAndRouteStage {
    fn name(&self) -> &'static str {
        "place_and_route"
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    async fn run(&mut self, previous: Option<&dyn Stage>, ctx: &ToolchainContext) -> Option<i32> {
        let logger = ctx.logger();
        let Some(netlist) = input_artifact(previous) else {
            logger.log_to_both("    Error: no synthesised netlist file");
            return None;
        };
        let Some(constraints) = self.project.constraints_file.clone() else {
            logger.log_to_both("    Error: no constraints file configured");
            return None;
        };

        let routed = self
            .project
            .artifact_path(&format!("_pnr.{}", self.toolchain.routed_extension()));
        let variant = PnrVariant::detect(self.toolchain, ctx, &self.project.base_path).await;
        let argv = variant.argv(
            ctx,
            &netlist,
            &routed,
            &self.device,
            &constraints,
            self.project.nextpnr_options(self.toolchain),
        );
        self.artifacts.push(routed);

        logger.log_to_both("Starting PnR with NextPnR");
        let code = run_classified(ctx, &argv, &self.project.base_path, &mut self.classifier).await;
        logger.log_to_both("Finished PnR");
        code
    }
}
