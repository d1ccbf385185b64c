//! External tool execution with streamed, line-classified output.

use crate::classify::{emit, OutputClassifier};
use crate::context::ToolchainContext;
use crate::logger::Logger;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Splits a byte stream into lines, holding back an unterminated tail.
///
/// Lines come out without their `\n`; any `\r` is left for the caller.
/// Everything pushed is either returned as a line or still buffered.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);
        complete[..complete.len() - 1]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// The held-back partial line.
    pub fn remainder(&self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }

    /// Take the partial line at end of stream, if there is one.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn name(&self) -> &'static str {
        match self {
            Stream::Stdout => "STDOUT",
            Stream::Stderr => "STDERR",
        }
    }
}

enum StreamEvent {
    Data(Stream, Vec<u8>),
    Failed(Stream, std::io::Error),
    Closed(Stream),
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, stream: Stream, tx: mpsc::Sender<StreamEvent>) {
    let mut buf = vec![0u8; 8192];
    loop {
        let event = match reader.read(&mut buf).await {
            Ok(0) => StreamEvent::Closed(stream),
            Ok(n) => StreamEvent::Data(stream, buf[..n].to_vec()),
            Err(e) => StreamEvent::Failed(stream, e),
        };
        let done = !matches!(event, StreamEvent::Data(..));
        if tx.send(event).await.is_err() || done {
            return;
        }
    }
}

fn dispatch(
    logger: &dyn Logger,
    classifier: &mut dyn OutputClassifier,
    stream: Stream,
    line: &str,
) {
    let line = line.replace('\r', "");
    let echo = classifier.echoes_to_raw();
    let out = match stream {
        Stream::Stdout => classifier.on_stdout_line(&line),
        Stream::Stderr => classifier.on_stderr_line(&line),
    };
    emit(logger, echo, out);
}

/// Runs one tool with the suite's search path, feeding its output to a
/// classifier and the raw sink.
pub struct ProcessRunner<'a> {
    ctx: &'a ToolchainContext,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(ctx: &'a ToolchainContext) -> Self {
        Self { ctx }
    }

    fn command(&self, argv: &[String], cwd: &Path) -> Option<Command> {
        let (program, args) = argv.split_first()?;
        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(path) = self.ctx.search_path(std::env::var_os("PATH").as_deref()) {
            command.env("PATH", path);
        }
        Some(command)
    }

    /// Run `argv` in `cwd` and return its exit code.
    ///
    /// `None` means the tool never ran or was killed by a signal. Spawn and
    /// stream failures are logged, never returned as errors. Each stream's
    /// lines reach the classifier in order, with `\r` removed; a final line
    /// without a newline is delivered when its stream closes.
    pub async fn run(
        &self,
        argv: &[String],
        cwd: &Path,
        classifier: &mut dyn OutputClassifier,
    ) -> Option<i32> {
        let logger = self.ctx.logger();
        let program = argv.first().map(String::as_str).unwrap_or("");

        let Some(mut command) = self.command(argv, cwd) else {
            warn!("Refusing to run an empty command");
            return None;
        };
        debug!(command = ?argv, cwd = %cwd.display(), "Spawning tool");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(program, error = %e, "Failed to spawn tool");
                logger.log_to_both(&format!("Received Error: could not start {}: {}", program, e));
                return None;
            }
        };

        let (tx, mut rx) = mpsc::channel(64);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(pump(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(pump(stderr, Stream::Stderr, tx));
        } else {
            drop(tx);
        }

        let mut stdout_lines = LineBuffer::new();
        let mut stderr_lines = LineBuffer::new();

        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Data(stream, bytes) => {
                    logger.log_to_raw(&bytes);
                    let buffer = match stream {
                        Stream::Stdout => &mut stdout_lines,
                        Stream::Stderr => &mut stderr_lines,
                    };
                    for line in buffer.push(&bytes) {
                        dispatch(logger, &mut *classifier, stream, &line);
                    }
                }
                StreamEvent::Failed(stream, e) => {
                    warn!(program, stream = stream.name(), error = %e, "Tool stream failed");
                    logger.log_to_both(&format!("Received {} Error: {}", stream.name(), e));
                }
                StreamEvent::Closed(stream) => {
                    let buffer = match stream {
                        Stream::Stdout => &mut stdout_lines,
                        Stream::Stderr => &mut stderr_lines,
                    };
                    if let Some(line) = buffer.finish() {
                        dispatch(logger, &mut *classifier, stream, &line);
                    }
                }
            }
        }

        match child.wait().await {
            Ok(status) => {
                debug!(program, code = ?status.code(), "Tool exited");
                status.code()
            }
            Err(e) => {
                warn!(program, error = %e, "Failed to wait for tool");
                logger.log_to_both(&format!("Received Error: {}", e));
                None
            }
        }
    }

    /// Run `argv` to completion and return stdout and stderr together.
    /// `None` when it can't be started. Nothing is logged.
    pub async fn probe(&self, argv: &[String], cwd: &Path) -> Option<String> {
        let mut command = self.command(argv, cwd)?;
        let output = command.output().await.ok()?;
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Some(text)
    }
}
