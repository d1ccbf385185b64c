//! openFPGALoader output, for both device and external-flash writes.

use super::OutputClassifier;

const DEVICE_NOT_FOUND: &str = "(device not found)";

#[derive(Default)]
pub struct ProgrammerClassifier {
    device_not_found: bool,
}

impl ProgrammerClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutputClassifier for ProgrammerClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        if line.contains("write Flash") || line.contains("Writing:") {
            vec!["    Flash Written".to_string()]
        } else if line.contains("Erasing:") {
            vec!["    Flash Erased".to_string()]
        } else if line.contains("pollFlag") {
            Vec::new()
        } else {
            vec![format!("    {}", line)]
        }
    }

    /// The line reporting the missing device is still shown as an error;
    /// only the stderr lines after it are dropped.
    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        let already_missing = self.device_not_found;
        if line.contains(DEVICE_NOT_FOUND) {
            self.device_not_found = true;
        }
        if !already_missing {
            vec![format!("    Error: {}", line)]
        } else {
            Vec::new()
        }
    }

    fn on_end(&mut self) -> Vec<String> {
        if !self.device_not_found {
            return Vec::new();
        }
        vec![
            "    There was an error programming the FPGA:".to_string(),
            "        Device not found, verify the device is plugged in".to_string(),
        ]
    }
}
