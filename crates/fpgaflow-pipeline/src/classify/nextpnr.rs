//! nextpnr output. nextpnr logs almost everything to stderr, so both
//! streams share one classification.

use super::{is_numpy_noise, OutputClassifier};

#[derive(Default)]
pub struct PnrClassifier {
    in_utilisation: bool,
    utilisation: Vec<String>,
}

impl PnrClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn classify(&mut self, line: &str) -> Vec<String> {
        let lower = line.to_ascii_lowercase();
        let data = if lower.starts_with("info: ") {
            &line["info: ".len()..]
        } else if lower.starts_with("error: ") {
            line
        } else {
            return Vec::new();
        };

        let mut out = Vec::new();
        if data.starts_with(|c: char| c.is_ascii_uppercase())
            && !data.trim().ends_with(':')
            && !is_numpy_noise(data)
        {
            out.push(format!("    {}", data));
        }

        if self.in_utilisation && !data.is_empty() {
            if data.starts_with([' ', '\t']) {
                self.utilisation.push(data.trim().to_string());
            } else {
                self.in_utilisation = false;
            }
        }
        if data.contains("Device utilisation") {
            self.in_utilisation = true;
        }

        out
    }
}

impl OutputClassifier for PnrClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        self.classify(line)
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        self.classify(line)
    }

    fn on_end(&mut self) -> Vec<String> {
        if self.utilisation.is_empty() {
            return Vec::new();
        }

        let rows: Vec<(&str, &str)> = self
            .utilisation
            .iter()
            .map(|row| row.split_once(':').unwrap_or((row.as_str(), "")))
            .collect();
        let width = rows.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0) + 5;

        let mut out = vec![String::new(), "    Device Utilisation:".to_string()];
        out.extend(
            rows.iter()
                .map(|(name, value)| format!("        {:<width$}{}", format!("{}:", name), value)),
        );
        out.push(String::new());
        out
    }
}
