//! fpgaflow - open-source FPGA build pipeline CLI
//!
//! Drives the OSS CAD Suite tools for a project file.
//!
//! ## Commands
//!
//! - `build`: constraint check, synthesis, place-and-route, bitstream
//! - `program`: write the last built bitstream to the board
//! - `flash`: write an image to the board's external flash
//! - `test`: compile and simulate a testbench
//! - `lint`: verilator lint of the project sources
//! - `boards`: list supported boards
//! - `constraints fmt`: normalise a constraint file

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use fpgaflow_core::{
    resolve_device_info, resolve_toolchain, ConstraintDialect, IssueSeverity, Operation,
    ProjectConfig, KNOWN_BOARDS,
};
use fpgaflow_pipeline::{
    lint_project, ConsoleLogger, Logger, Pipeline, PipelineResult, ToolchainConfig,
    ToolchainContext,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};

/// Toolchain config picked up from the working directory.
const DEFAULT_CONFIG: &str = "fpgaflow.toml";

#[derive(Parser)]
#[command(name = "fpgaflow")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Open-source FPGA build pipeline", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    env: EnvArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the project and the toolchain live, and where logs go.
#[derive(Args)]
struct EnvArgs {
    /// Toolchain config file (default: ./fpgaflow.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// OSS CAD Suite root or its bin directory; overrides the config file
    #[arg(long, global = true, env = "FPGAFLOW_TOOLCHAIN_PATH")]
    toolchain_path: Option<PathBuf>,

    /// Write the raw tool output to this file
    #[arg(long, global = true)]
    raw_log: Option<PathBuf>,

    /// Write the run report (JSON) to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Project file
    #[arg(short, long, global = true, default_value = "fpgaflow.json")]
    project: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesise, place-and-route and pack the project
    Build {
        /// Program the board after a successful build
        #[arg(long)]
        program: bool,
    },

    /// Program the board with the last built bitstream
    Program,

    /// Write an image to the board's external flash
    Flash {
        /// Image to write (required when the project lists several)
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Compile and simulate a testbench
    Test {
        /// Testbench to run (required when the project lists several)
        #[arg(long)]
        testbench: Option<PathBuf>,
    },

    /// Lint the project sources with verilator
    Lint,

    /// List supported boards
    Boards,

    /// Constraint file utilities
    Constraints {
        #[command(subcommand)]
        action: ConstraintsAction,
    },
}

#[derive(Subcommand)]
enum ConstraintsAction {
    /// Re-emit a constraint file in canonical form
    Fmt {
        /// Constraint file (.cst, .pcf or .lpf)
        file: PathBuf,

        /// Dialect, when the extension doesn't say (cst, pcf, lpf)
        #[arg(long)]
        dialect: Option<String>,

        /// Rewrite the file instead of printing
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    fpgaflow_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Build { program } => {
            let operation = if program {
                Operation::BuildAndProgram
            } else {
                Operation::BuildOnly
            };
            cmd_pipeline(&cli.env, operation, None).await
        }
        Commands::Program => cmd_pipeline(&cli.env, Operation::ProgramOnly, None).await,
        Commands::Flash { file } => {
            cmd_pipeline(&cli.env, Operation::ExternalFlash, file.as_deref()).await
        }
        Commands::Test { testbench } => {
            cmd_pipeline(&cli.env, Operation::RunTestbench, testbench.as_deref()).await
        }
        Commands::Lint => cmd_lint(&cli.env).await,
        Commands::Boards => cmd_boards(),
        Commands::Constraints { action } => match action {
            ConstraintsAction::Fmt {
                file,
                dialect,
                write,
            } => cmd_constraints_fmt(&file, dialect.as_deref(), write),
        },
    }
}

/// Config file, then `--toolchain-path` on top.
fn load_toolchain_config(env: &EnvArgs) -> Result<ToolchainConfig> {
    let path = match &env.config {
        Some(path) => Some(path.clone()),
        None => Some(PathBuf::from(DEFAULT_CONFIG)).filter(|p| p.is_file()),
    };
    let mut config = match path {
        Some(path) => ToolchainConfig::load(&path)
            .with_context(|| format!("Failed to load toolchain config {}", path.display()))?,
        None => ToolchainConfig::default(),
    };
    if let Some(toolchain_path) = &env.toolchain_path {
        config.toolchain_path = Some(toolchain_path.clone());
    }
    Ok(config)
}

fn toolchain_context(env: &EnvArgs) -> Result<ToolchainContext> {
    let config = load_toolchain_config(env)?;
    let raw = match &env.raw_log {
        Some(path) => Some(
            File::create(path)
                .with_context(|| format!("Failed to create raw log {}", path.display()))?,
        ),
        None => None,
    };
    let logger: Arc<dyn Logger> = Arc::new(ConsoleLogger::new(raw));
    ToolchainContext::from_config(&config, logger).context("Failed to locate the toolchain")
}

fn load_project(env: &EnvArgs) -> Result<ProjectConfig> {
    ProjectConfig::from_json_file(&env.project)
        .with_context(|| format!("Failed to load project {}", env.project.display()))
}

async fn cmd_pipeline(env: &EnvArgs, operation: Operation, choice: Option<&Path>) -> Result<ExitCode> {
    let mut project = load_project(env)?;
    match operation {
        Operation::RunTestbench => project.select_testbench(choice)?,
        Operation::ExternalFlash => project.select_external_flash_file(choice)?,
        _ => {}
    }
    let ctx = toolchain_context(env)?;

    let result = Pipeline::run(Arc::new(project), operation, &ctx)
        .await
        .context("Pipeline could not start")?;
    info!(
        run_id = %result.run_id,
        exit_code = ?result.exit_code,
        duration_ms = result.duration_ms,
        "Run finished"
    );

    if let Some(path) = &env.report {
        write_report(path, &result)?;
    }
    Ok(ExitCode::from(exit_status(result.exit_code)))
}

fn write_report(path: &Path, result: &PipelineResult) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report {}", path.display()))
}

/// Process exit status for a run's final code. A run that never got an
/// exit code, or ended on one outside 0..=255, exits with 1.
fn exit_status(code: Option<i32>) -> u8 {
    code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1)
}

async fn cmd_lint(env: &EnvArgs) -> Result<ExitCode> {
    let project = load_project(env)?;
    let ctx = toolchain_context(env)?;
    let report = lint_project(&project, &ctx).await?;

    for issue in &report.issues {
        let severity = match issue.severity {
            IssueSeverity::Error => "error",
            IssueSeverity::Warning => "warning",
        };
        println!(
            "{}:{}:{}: {}: {}",
            issue.file, issue.line, issue.column, severity, issue.message
        );
    }

    let errors = report
        .issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .count();
    println!();
    println!(
        "{} error(s), {} warning(s)",
        errors,
        report.issues.len() - errors
    );

    if report.exit_code.is_none() || errors > 0 {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_boards() -> Result<ExitCode> {
    println!("{:<16} {:<10} {:<24} {}", "BOARD", "TOOLCHAIN", "DEVICE", "FAMILY");
    for board in KNOWN_BOARDS {
        let toolchain = resolve_toolchain(board)?;
        let device = resolve_device_info(board)?;
        println!(
            "{:<16} {:<10} {:<24} {}",
            board,
            toolchain.name(),
            device.device,
            device.family
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_constraints_fmt(file: &Path, dialect: Option<&str>, write: bool) -> Result<ExitCode> {
    let dialect = match dialect {
        Some(name) => ConstraintDialect::from_extension(name)?,
        None => ConstraintDialect::from_path(file)?,
    };
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let formatted = dialect.format(&text);

    if write {
        std::fs::write(file, formatted)
            .with_context(|| format!("Failed to write {}", file.display()))?;
        println!("Formatted {} ({})", file.display(), dialect);
    } else {
        print!("{}", formatted);
    }
    Ok(ExitCode::SUCCESS)
}
