//! End-to-end pipeline runs against fake tool scripts.
#![cfg(unix)]

use async_trait::async_trait;
use fpgaflow_core::{CoreError, Operation, ProjectConfig};
use fpgaflow_pipeline::stage::input_artifact;
use fpgaflow_pipeline::{
    GowinPnr, Logger, MemoryLogger, Pipeline, PipelineError, Stage, ToolchainContext,
};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const FAKE_NEXTPNR: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --write|--asc|--textcfg) out="$2"; shift ;;
  esac
  shift
done
echo "Info: Program finished normally."
echo routed > "$out"
"#;

const FAKE_GOWIN_PACK: &str = r#"
echo bits > "$4"
"#;

/// A fake OSS CAD Suite (`<root>/bin`) next to a project directory.
struct Workspace {
    _dir: TempDir,
    bin: PathBuf,
    work: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("bin");
        let work = dir.path().join("work");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::create_dir_all(&work).unwrap();
        Self { _dir: dir, bin, work }
    }

    fn install(&self, name: &str, body: &str) {
        let path = self.bin.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// yosys that prints `ports` for `portlist` and writes the netlist otherwise.
    fn install_yosys(&self, ports: &[&str]) {
        let echo_ports: String = ports.iter().map(|p| format!("    echo '{}'\n", p)).collect();
        self.install(
            "yosys",
            &format!(
                r#"
echo ' |  yosys -- Yosys Open SYnthesis Suite'
case "$2" in
  *portlist*)
    echo "Parsing Verilog input from \`top.v' to AST representation."
    echo "Generating RTLIL representation for module \`\\top'."
{}    ;;
  *)
    echo '2. Executing HIERARCHY pass (managing design hierarchy).'
    out=$(printf '%s' "$2" | sed -n 's/.*-json \([^ ]*\).*/\1/p')
    printf '{{}}' > "$out"
    ;;
esac
"#,
                echo_ports
            ),
        );
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.work.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn project(&self, json: &str) -> ProjectConfig {
        ProjectConfig::from_json_str(json, &self.work).unwrap()
    }

    fn context(&self) -> (Arc<MemoryLogger>, ToolchainContext) {
        let logger = Arc::new(MemoryLogger::new());
        let ctx = ToolchainContext::new(&self.bin, logger.clone() as Arc<dyn Logger>);
        (logger, ctx)
    }
}

const BLINK: &str = r#"{
    "name": "blink",
    "board": "tangnano9k",
    "includedFiles": ["top.v"],
    "constraintsFile": "blink.cst"
}"#;

fn index_of(summary: &[String], line: &str) -> Option<usize> {
    summary.iter().position(|l| l.trim() == line)
}

/// Test: all ports constrained, full Gowin build succeeds (scenario A)
#[tokio::test]
async fn test_build_with_all_ports_defined() {
    let ws = Workspace::new();
    ws.install_yosys(&["input [0:0] clk", "output [1:0] led"]);
    ws.install("nextpnr-gowin", FAKE_NEXTPNR);
    ws.install("gowin_pack", FAKE_GOWIN_PACK);
    ws.write(
        "blink.cst",
        "IO_LOC \"clk\" 52;\nIO_LOC \"led[0]\" 10;\nIO_LOC \"led[1]\" 11;\n",
    );
    let (logger, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::BuildOnly, &ctx)
        .await
        .expect("pre-flight failed");

    assert!(result.success);
    assert_eq!(result.exit_code, Some(0));
    let names: Vec<&str> = result.stages.iter().map(|s| s.stage_name.as_str()).collect();
    assert_eq!(names, vec!["constraint_check", "synthesis", "place_and_route", "pack"]);
    assert_eq!(result.plan_digest.len(), 64);

    assert!(logger.has_summary_line("All Ports are defined"));
    assert!(logger.has_summary_line("Parsing top.v"));
    assert!(logger.has_summary_line("Starting Synthesis with Yosys (Gowin)"));
    assert!(logger.has_summary_line("Info: Program finished normally."));
    assert_eq!(
        logger.summary().last().map(String::as_str),
        Some("Toolchain Completed")
    );

    // The banner is shown by the constraint check only.
    let banners = logger
        .summary()
        .iter()
        .filter(|l| l.contains("Yosys Open SYnthesis Suite"))
        .count();
    assert_eq!(banners, 1);

    let pack = &result.stages[3];
    assert_eq!(pack.artifacts.len(), 1);
    assert_eq!(pack.artifacts[0].path, ws.work.join("blink.fs"));
    assert_eq!(pack.artifacts[0].size, 5);
    assert!(ws.work.join("blink_pnr.json").exists());
    assert!(logger.raw_text().contains("2. Executing HIERARCHY pass"));
}

/// Test: unconstrained ports fail the check and stop the build (scenario B)
#[tokio::test]
async fn test_missing_ports_halt_build() {
    let ws = Workspace::new();
    ws.install_yosys(&["input [0:0] rst", "input [0:0] clk", "output [0:0] led"]);
    ws.write("blink.cst", "IO_LOC \"led\" 10;\n");
    let (logger, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::BuildOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, Some(1));
    assert!(!result.success);
    assert_eq!(result.stages.len(), 1);
    assert!(logger.has_summary_line("Error: Ports are missing from CST file: rst, clk"));
    assert!(!logger.has_summary_line("All Ports are defined"));
    assert!(!ws.work.join("blink.json").exists());
    assert_eq!(
        logger.summary().last().map(String::as_str),
        Some("Toolchain finished with errors")
    );
}

/// Test: a single missing port uses the singular message
#[tokio::test]
async fn test_single_missing_port_message() {
    let ws = Workspace::new();
    ws.install_yosys(&["input [0:0] clk", "output [0:0] led"]);
    ws.write("blink.cst", "IO_LOC \"led\" 10;\n");
    let (logger, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::BuildOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, Some(1));
    assert!(logger.has_summary_line("Error: Port is missing from CST file: clk"));
}

/// Stage with a fixed exit code that records how it was called.
struct Fixed {
    name: &'static str,
    code: Option<i32>,
    artifacts: Vec<PathBuf>,
    calls: Arc<AtomicUsize>,
    received: Arc<Mutex<Option<PathBuf>>>,
}

impl Fixed {
    fn new(name: &'static str, code: Option<i32>) -> Self {
        Self {
            name,
            code,
            artifacts: vec![PathBuf::from(format!("/nonexistent/{}.out", name))],
            calls: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl Stage for Fixed {
    fn name(&self) -> &'static str {
        self.name
    }

    fn produced_artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    async fn run(&mut self, previous: Option<&dyn Stage>, _ctx: &ToolchainContext) -> Option<i32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.received.lock().unwrap() = input_artifact(previous);
        self.code
    }
}

/// Test: a failing middle stage stops the run with its code (scenario C)
#[tokio::test]
async fn test_fail_fast_on_middle_stage() {
    let ws = Workspace::new();
    let (logger, ctx) = ws.context();

    let first = Fixed::new("first", Some(0));
    let second = Fixed::new("second", Some(2));
    let third = Fixed::new("third", Some(0));
    let second_received = second.received.clone();
    let third_calls = third.calls.clone();

    let stages: Vec<Box<dyn Stage>> = vec![Box::new(first), Box::new(second), Box::new(third)];
    let result = Pipeline::run_stages(Operation::BuildOnly, stages, &ctx).await;

    assert_eq!(result.exit_code, Some(2));
    assert_eq!(result.stages.len(), 2);
    assert_eq!(result.passed_count(), 1);
    assert_eq!(result.failed_count(), 1);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        *second_received.lock().unwrap(),
        Some(PathBuf::from("/nonexistent/first.out"))
    );
    // Missing artifacts are not recorded.
    assert!(result.stages[0].artifacts.is_empty());
    assert!(logger.has_summary_line("Toolchain finished with errors"));
}

/// Test: a stage that cannot start halts the run with no exit code
#[tokio::test]
async fn test_null_exit_halts_run() {
    let ws = Workspace::new();
    let (_, ctx) = ws.context();

    let last = Fixed::new("last", Some(0));
    let last_calls = last.calls.clone();
    let stages: Vec<Box<dyn Stage>> = vec![Box::new(Fixed::new("first", None)), Box::new(last)];
    let result = Pipeline::run_stages(Operation::BuildOnly, stages, &ctx).await;

    assert_eq!(result.exit_code, None);
    assert!(!result.success);
    assert_eq!(last_calls.load(Ordering::SeqCst), 0);
}

/// Test: synthesis syntax error is annotated with a line hint (scenario D)
#[tokio::test]
async fn test_synthesis_syntax_error_hint() {
    let ws = Workspace::new();
    ws.install(
        "yosys",
        "echo 'ERROR: syntax error, unexpected TOKEN foo.v:14:' >&2\nexit 1",
    );
    let (logger, ctx) = ws.context();
    let mut project = ws.project(BLINK);
    project.skip_cst_checking = true;

    let result = Pipeline::run(Arc::new(project), Operation::BuildOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, Some(1));
    assert_eq!(result.stages.len(), 1);
    assert_eq!(result.stages[0].stage_name, "synthesis");

    let summary = logger.summary();
    let error = index_of(&summary, "Error: ERROR: syntax error, unexpected TOKEN foo.v:14:")
        .expect("error line missing");
    assert_eq!(
        summary[error + 1],
        "    Check lines 13-14 of file foo.v you may be missing a semicolon or left a block open"
    );
}

/// Test: repeated device-not-found errors give one hint (scenario E)
#[tokio::test]
async fn test_device_not_found_hint() {
    let ws = Workspace::new();
    ws.install(
        "openFPGALoader",
        r#"
echo "args: $*"
echo "PATH=$PATH"
echo "unable to open ftdi device: -3 (device not found)" >&2
echo "JTAG init failed with: unable to open ftdi device (device not found)" >&2
exit 1
"#,
    );
    let bitstream = ws.write("blink.fs", "bits\n");
    let (logger, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::ProgramOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, Some(1));
    let summary = logger.summary();
    let hints = summary
        .iter()
        .filter(|l| l.contains("Device not found, verify the device is plugged in"))
        .count();
    assert_eq!(hints, 1);
    assert!(logger.has_summary_line(&format!(
        "args: -b tangnano9k {} -v -f",
        bitstream.display()
    )));
    let path_prefix = format!("PATH={}:", ws.bin.display());
    assert!(summary.iter().any(|l| l.trim().starts_with(&path_prefix)));
}

/// Test: programming without a bitstream fails before spawning
#[tokio::test]
async fn test_program_without_bitstream() {
    let ws = Workspace::new();
    let (logger, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::ProgramOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, None);
    assert!(logger
        .summary()
        .iter()
        .any(|l| l.starts_with("    Error: no bitstream file at")));
}

/// Test: a tool missing from the suite is reported, not raised
#[tokio::test]
async fn test_spawn_failure_halts_run() {
    let ws = Workspace::new();
    let (logger, ctx) = ws.context();
    let mut project = ws.project(BLINK);
    project.skip_cst_checking = true;

    let result = Pipeline::run(Arc::new(project), Operation::BuildOnly, &ctx)
        .await
        .unwrap();

    assert_eq!(result.exit_code, None);
    assert_eq!(result.stages.len(), 1);
    assert!(logger
        .summary()
        .iter()
        .any(|l| l.starts_with("Received Error: could not start")));
}

/// Test: testbench compiles, simulates, and flushes an unterminated last line
#[tokio::test]
async fn test_testbench_runs_compile_then_simulation() {
    let ws = Workspace::new();
    ws.install("iverilog", "echo compiled > \"$2\"");
    ws.install(
        "vvp",
        "echo 'VCD info: dumpfile test.vcd opened for output.'\nprintf 'PASS'",
    );
    let (logger, ctx) = ws.context();
    let mut project = ws.project(
        r#"{"name": "blink", "includedFiles": ["top.v"], "testBenches": ["top_tb.v"]}"#,
    );
    project.select_testbench(None).unwrap();

    let result = Pipeline::run(Arc::new(project), Operation::RunTestbench, &ctx)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stages[0].artifacts[0].path, ws.work.join("top_tb.o"));
    let summary = logger.summary();
    let start = index_of(&summary, "Starting Testbench with iVerilog").unwrap();
    assert_eq!(summary[start + 1], "    VCD info: dumpfile test.vcd opened for output.");
    assert_eq!(summary[start + 2], "    PASS");
    assert_eq!(summary[start + 3], "Finished Testbench");

    let raw = logger.raw_text();
    let marker = raw.find("Starting Testbench with iVerilog\n").unwrap();
    assert!(raw[marker..].contains("    VCD info: dumpfile test.vcd opened for output.\n"));
    assert!(raw[marker..].contains("    PASS\n"));
    assert!(raw.ends_with("Finished Testbench\nToolchain Completed\n"));
}

/// Test: a himbaechel without the Gowin uarch falls back to nextpnr-gowin
#[tokio::test]
async fn test_gowin_build_falls_back_to_legacy_nextpnr() {
    let ws = Workspace::new();
    ws.install_yosys(&["input [0:0] clk"]);
    ws.install(
        "nextpnr-himbaechel",
        "echo 'Architecture specific options:'\necho '  --uarch example'",
    );
    ws.install(
        "nextpnr-gowin",
        &format!("printf '%s\\n' \"$@\" > args.txt\n{}", FAKE_NEXTPNR),
    );
    ws.install("gowin_pack", FAKE_GOWIN_PACK);
    ws.write("blink.cst", "IO_LOC \"clk\" 52;\n");
    let (_, ctx) = ws.context();

    let result = Pipeline::run(Arc::new(ws.project(BLINK)), Operation::BuildOnly, &ctx)
        .await
        .unwrap();

    assert!(result.success);
    let args = std::fs::read_to_string(ws.work.join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    let cst = ws.work.join("blink.cst");
    assert_eq!(
        args,
        vec![
            "--json",
            ws.work.join("blink.json").to_str().unwrap(),
            "--write",
            ws.work.join("blink_pnr.json").to_str().unwrap(),
            "--freq",
            "27",
            "--device",
            "GW1NR-LV9QN88PC6/I5",
            "--family",
            "GW1N-9C",
            "--cst",
            cst.to_str().unwrap(),
        ]
    );
    assert_eq!(ctx.gowin_pnr().get(), Some(&GowinPnr::Legacy));
}

/// Test: unknown board is a pre-flight error
#[tokio::test]
async fn test_unknown_board_is_preflight_error() {
    let ws = Workspace::new();
    let (logger, ctx) = ws.context();
    let project = ws.project(r#"{"board": "mystery", "includedFiles": ["top.v"]}"#);

    let err = Pipeline::run(Arc::new(project), Operation::BuildOnly, &ctx)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Core(CoreError::UnsupportedBoard(ref board)) if board == "mystery"
    ));
    assert!(logger.summary().is_empty());
}

/// Test: a build with no sources is rejected before any stage runs
#[tokio::test]
async fn test_build_without_sources_is_rejected() {
    let ws = Workspace::new();
    let (_, ctx) = ws.context();
    let project = ws.project(r#"{"constraintsFile": "blink.cst"}"#);

    let err = Pipeline::run(Arc::new(project), Operation::BuildOnly, &ctx)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid project: No files to synthesize");
}

#[allow(dead_code)]
fn assert_send<T: Send>(_: T) {}

#[allow(dead_code)]
fn pipeline_future_is_send(project: Arc<ProjectConfig>, ctx: &ToolchainContext) {
    assert_send(Pipeline::run(project, Operation::BuildOnly, ctx));
}
