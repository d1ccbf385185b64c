//! Output sinks for a pipeline run.
//!
//! The raw sink receives subprocess bytes exactly as they arrive. The
//! summary sink receives curated lines built by the stage classifiers.

use std::fs::File;
use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// A sink stays usable after a panic in another writer.
fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub trait Logger: Send + Sync {
    /// Append bytes to the raw log verbatim.
    fn log_to_raw(&self, bytes: &[u8]);

    /// Append one line to the human summary.
    fn log_to_summary(&self, line: &str);

    fn log_to_both(&self, line: &str) {
        self.log_to_summary(line);
        self.log_to_raw(format!("{}\n", line).as_bytes());
    }
}

/// Summary to stdout; raw output to an optional file.
pub struct ConsoleLogger {
    raw: Option<Mutex<File>>,
}

impl ConsoleLogger {
    pub fn new(raw: Option<File>) -> Self {
        Self {
            raw: raw.map(Mutex::new),
        }
    }
}

impl Logger for ConsoleLogger {
    fn log_to_raw(&self, bytes: &[u8]) {
        let Some(raw) = &self.raw else {
            return;
        };
        if let Err(e) = locked(raw).write_all(bytes) {
            warn!(error = %e, "Failed to write raw log");
        }
    }

    fn log_to_summary(&self, line: &str) {
        println!("{}", line);
    }
}

/// Keeps everything in memory. Used by tests and embedders that render
/// the logs themselves.
#[derive(Default)]
pub struct MemoryLogger {
    raw: Mutex<Vec<u8>>,
    summary: Mutex<Vec<String>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self) -> Vec<u8> {
        locked(&self.raw).clone()
    }

    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw()).into_owned()
    }

    pub fn summary(&self) -> Vec<String> {
        locked(&self.summary).clone()
    }

    /// Whether any summary line, ignoring indentation, equals `line`.
    pub fn has_summary_line(&self, line: &str) -> bool {
        self.summary().iter().any(|l| l.trim() == line)
    }
}

impl Logger for MemoryLogger {
    fn log_to_raw(&self, bytes: &[u8]) {
        locked(&self.raw).extend_from_slice(bytes);
    }

    fn log_to_summary(&self, line: &str) {
        locked(&self.summary).push(line.to_string());
    }
}
