//! Output classifiers: raw tool lines in, curated summary lines out.
//!
//! A classifier sees one stage's output as four events. Each event
//! returns the summary lines it produces; an empty vector suppresses the
//! line. Classifiers may buffer (statistics tables, port lists) and render
//! at [`OutputClassifier::on_end`].

mod nextpnr;
mod passthrough;
mod programmer;
mod yosys;

pub use nextpnr::PnrClassifier;
pub use passthrough::{IndentClassifier, PackClassifier};
pub use programmer::ProgrammerClassifier;
pub use yosys::{yosys_error_lines, PortListClassifier, SynthClassifier};

use crate::logger::Logger;

pub trait OutputClassifier: Send + Sync {
    fn on_start(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn on_stdout_line(&mut self, line: &str) -> Vec<String>;

    fn on_stderr_line(&mut self, line: &str) -> Vec<String>;

    fn on_end(&mut self) -> Vec<String> {
        Vec::new()
    }

    /// Whether classified lines are also appended to the raw sink.
    fn echoes_to_raw(&self) -> bool {
        false
    }
}

/// Write classifier output to the summary sink, and to the raw sink as
/// well when `echo` is set.
pub fn emit(logger: &dyn Logger, echo: bool, lines: Vec<String>) {
    for line in lines {
        if echo {
            logger.log_to_both(&line);
        } else {
            logger.log_to_summary(&line);
        }
    }
}

/// Mentions of the numpy warning some Python-based tools print on import.
pub(crate) fn is_numpy_noise(line: &str) -> bool {
    line.to_ascii_lowercase().contains("numpy")
}
