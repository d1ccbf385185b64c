//! Classifiers that mostly forward lines.

use super::{is_numpy_noise, OutputClassifier};

/// Bitstream packers: everything except the numpy warning, verbatim.
#[derive(Default)]
pub struct PackClassifier;

impl PackClassifier {
    fn forward(line: &str) -> Vec<String> {
        if is_numpy_noise(line) {
            Vec::new()
        } else {
            vec![line.to_string()]
        }
    }
}

impl OutputClassifier for PackClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        Self::forward(line)
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        Self::forward(line)
    }
}

/// Simulation output: every line, indented, and echoed into the raw log
/// so the transcript sits next to the stage markers.
#[derive(Default)]
pub struct IndentClassifier;

impl OutputClassifier for IndentClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        vec![format!("    {}", line)]
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        vec![format!("    {}", line)]
    }

    fn echoes_to_raw(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_suppresses_numpy() {
        let mut c = PackClassifier;
        assert!(c
            .on_stderr_line("UserWarning: A NumPy version >=1.17.3 is required")
            .is_empty());
        assert_eq!(c.on_stdout_line("writing bitstream"), vec!["writing bitstream"]);
    }

    #[test]
    fn test_indent() {
        let mut c = IndentClassifier;
        assert_eq!(c.on_stdout_line("VCD info: dumpfile"), vec!["    VCD info: dumpfile"]);
        assert_eq!(c.on_stderr_line("tb.v:3: warning"), vec!["    tb.v:3: warning"]);
        assert!(c.echoes_to_raw());
        assert!(!PackClassifier.echoes_to_raw());
    }
}
