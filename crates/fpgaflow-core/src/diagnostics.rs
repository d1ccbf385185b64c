//! Source diagnostics parsed from verilator lint output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static GROUP_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^%(error|warning)").unwrap());

static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^%[^ ]+: ([^:]+):([^:]+):([^:]+):(.*)$").unwrap());

static UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\| *\^(~+)").unwrap());

/// Noise emitted whenever a file holds more than one module.
const SUPPRESSED: &str = "does not match MODULE name";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A located problem in a source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,

    pub file: String,

    /// 1-indexed.
    pub line: u32,

    /// 1-indexed.
    pub column: u32,

    /// Span length: the underline width, or 0 when the tool printed none.
    pub length: u32,

    pub message: String,
}

/// Parse a full verilator stderr capture into issues.
///
/// A group starts at a `%Error`/`%Warning` line and takes every following
/// line that starts with a space (the source excerpt and underline).
pub fn parse_lint_output(output: &str) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut group: Vec<&str> = Vec::new();

    for line in output.lines() {
        if !group.is_empty() && line.starts_with(' ') {
            group.push(line);
            continue;
        }
        if !group.is_empty() {
            issues.extend(issue_from_group(&group));
            group.clear();
        }
        if GROUP_START.is_match(line) {
            group.push(line);
        }
    }
    if !group.is_empty() {
        issues.extend(issue_from_group(&group));
    }

    issues
}

/// Convert one message group. Returns `None` for unparseable or noise groups.
pub fn issue_from_group(lines: &[&str]) -> Option<Issue> {
    let first = lines.first()?;
    let severity = if first.to_ascii_lowercase().starts_with("%error") {
        IssueSeverity::Error
    } else {
        IssueSeverity::Warning
    };

    let caps = HEADER.captures(first)?;
    let message = caps[4].trim().to_string();
    if message.contains(SUPPRESSED) {
        return None;
    }

    let length = lines
        .iter()
        .find_map(|l| UNDERLINE.captures(l))
        .map(|c| c[1].len() as u32)
        .unwrap_or(0);

    Some(Issue {
        severity,
        file: caps[1].trim().to_string(),
        line: caps[2].trim().parse().ok()?,
        column: caps[3].trim().parse().ok()?,
        length,
        message,
    })
}
