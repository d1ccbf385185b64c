//! Yosys output: synthesis runs and `portlist` runs.

use super::OutputClassifier;
use fpgaflow_core::PortDecl;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static STEP_TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([0-9.]+)\. (.+)$").unwrap());

static STATS_HEADER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"=== .* ===").unwrap());

static SYNTAX_LOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^/\\\s]+\.s?v):([0-9]+):").unwrap());

static MISSING_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"ERROR: Module `\\?([^']+)' referenced in module `\\?([^']+)' in cell `\\?([^']+)'",
    )
    .unwrap()
});

static PARSING_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Parsing (?:System)?Verilog input from `([^']+)' to AST").unwrap()
});

static MODULE_PARSED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RTLIL representation for module `\\?([^']+)'").unwrap());

/// Yosys prints its copyright box with these glyphs.
fn is_banner(line: &str) -> bool {
    matches!(line.trim_start().chars().next(), Some('|' | '/' | '\\'))
}

/// Summary lines for one yosys stderr line, with hints for common mistakes.
pub fn yosys_error_lines(line: &str) -> Vec<String> {
    if line.trim().is_empty() {
        return Vec::new();
    }
    let mut out = vec![format!("    Error: {}", line.trim_end())];

    if line.contains("ERROR: syntax error, unexpected") {
        let location = SYNTAX_LOCATION
            .captures(line)
            .and_then(|c| Some((c[1].to_string(), c[2].parse::<u32>().ok()?)));
        if let Some((file, n)) = location.filter(|(_, n)| *n > 1) {
            out.push(format!(
                "    Check lines {}-{} of file {} you may be missing a semicolon or left a block open",
                n - 1,
                n,
                file
            ));
        }
    }

    if line.contains("ERROR: Module") && line.contains("is not part of the design") {
        if let Some(caps) = MISSING_MODULE.captures(line) {
            out.push(format!(
                "    Check if module instantiation `{} {}(...)` in module {} is a typo or maybe the module is not included in your project file",
                &caps[1], &caps[3], &caps[2]
            ));
        }
    }

    out
}

/// Synthesis: step titles, a statistics table, and annotated errors.
pub struct SynthClassifier {
    show_banner: bool,
    collecting_stats: bool,
    stats: Vec<String>,
}

impl SynthClassifier {
    /// `show_banner` is false when a port-list run already showed it.
    pub fn new(show_banner: bool) -> Self {
        Self {
            show_banner,
            collecting_stats: false,
            stats: Vec::new(),
        }
    }

    fn render_stats(&mut self) -> Vec<String> {
        let rows: Vec<(String, String)> = self
            .stats
            .drain(..)
            .map(|line| {
                if line.contains(':') {
                    let mut parts = line.split(':');
                    let name = format!("{}:", parts.next().unwrap_or("").trim());
                    let value = parts.next().unwrap_or("").trim().to_string();
                    (name, value)
                } else {
                    let words: Vec<&str> = line.split_whitespace().collect();
                    let name = format!("    {}", words.first().copied().unwrap_or(""));
                    let value = words.last().copied().unwrap_or("").to_string();
                    (name, value)
                }
            })
            .collect();

        let name_width = rows.iter().map(|(n, _)| n.chars().count()).max().unwrap_or(0) + 6;
        let value_width = rows.iter().map(|(_, v)| v.chars().count()).max().unwrap_or(0);

        let mut out = vec![String::new(), "    Summary".to_string()];
        out.extend(rows.iter().map(|(name, value)| {
            format!("        {:<nw$}{:>vw$}", name, value, nw = name_width, vw = value_width)
        }));
        out.push(String::new());
        out
    }
}

impl OutputClassifier for SynthClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        if is_banner(line) {
            return if self.show_banner {
                vec![format!("    {}", line)]
            } else {
                Vec::new()
            };
        }

        if let Some(caps) = STEP_TITLE.captures(line) {
            self.collecting_stats = false;
            if caps[1].contains('.') {
                return Vec::new();
            }
            return vec![format!("    Step {:<6} {}", format!("{}:", &caps[1]), &caps[2])];
        }

        if STATS_HEADER.is_match(line) {
            self.collecting_stats = true;
        } else if self.collecting_stats && !line.trim().is_empty() {
            self.stats.push(line.to_string());
        }
        Vec::new()
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        yosys_error_lines(line)
    }

    fn on_end(&mut self) -> Vec<String> {
        if self.stats.is_empty() {
            return Vec::new();
        }
        self.render_stats()
    }
}

/// `read_verilog ...; portlist top`: collects the top module's ports.
#[derive(Default)]
pub struct PortListClassifier {
    ports: Vec<PortDecl>,
}

impl PortListClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ports(&self) -> &[PortDecl] {
        &self.ports
    }

    /// Every port bit as the constraint file must name it.
    pub fn port_names(&self) -> Vec<String> {
        self.ports.iter().flat_map(PortDecl::scalar_names).collect()
    }
}

impl OutputClassifier for PortListClassifier {
    fn on_stdout_line(&mut self, line: &str) -> Vec<String> {
        if is_banner(line) {
            return vec![format!("    {}", line)];
        }
        if let Some(caps) = PARSING_INPUT.captures(line) {
            let path = Path::new(&caps[1]);
            let file = path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| caps[1].to_string());
            return vec![format!("    Parsing {}", file)];
        }
        if let Some(caps) = MODULE_PARSED.captures(line) {
            return vec![format!("        - Module {} parsed", &caps[1])];
        }
        if let Some(port) = PortDecl::parse(line) {
            self.ports.push(port);
        }
        Vec::new()
    }

    fn on_stderr_line(&mut self, line: &str) -> Vec<String> {
        yosys_error_lines(line)
    }
}
