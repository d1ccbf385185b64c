//! Constraint files: one codec per toolchain dialect.
//!
//! Every dialect parses into the same [`ConstraintEntry`] list, keyed by port
//! name in order of first appearance. Several directives about one port
//! (a location line and an attribute line, say) fold into a single entry.
//! Once a field is set, later directives don't overwrite it.
//!
//! A rewrite never drops content: attributes a codec does not model stay on
//! their entry in [`ConstraintEntry::extra`], and lines it does not model
//! (comments, `SYSCONFIG`, `CLOCK_LOC`, ...) are kept verbatim in
//! [`ConstraintFile::verbatim`], anchored to the entry they preceded.

mod cst;
mod lpf;
mod pcf;
pub mod vocab;

pub use cst::CstCodec;
pub use lpf::LpfCodec;
pub use pcf::PcfCodec;

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Pin binding and electrical attributes for one port.
///
/// Attribute values hold labels ("8ma", "Pull Up"), not tool codes. Each
/// codec translates through its vocabularies on the way in and out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintEntry {
    pub name: String,

    /// Physical pin(s). Multiple pins are comma-joined ("71,70").
    pub location: Option<String>,

    pub drive: Option<String>,

    pub pull_mode: Option<String>,

    pub io_standard: Option<String>,

    pub slew_rate: Option<String>,

    pub termination: Option<String>,

    pub diff_resistor: Option<String>,

    /// Clock frequency in MHz, as written.
    pub frequency: Option<String>,

    /// Unmodeled attributes in the dialect's own syntax (`BANK_VCCIO=3.3`,
    /// `-nowarn`), written back as-is.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<String>,
}

impl ConstraintEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn has_content(&self) -> bool {
        [
            &self.location,
            &self.drive,
            &self.pull_mode,
            &self.io_standard,
            &self.slew_rate,
            &self.termination,
            &self.diff_resistor,
            &self.frequency,
        ]
        .iter()
        .any(|field| field.is_some())
            || !self.extra.is_empty()
    }
}

/// A line a codec passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerbatimLine {
    /// Index of the entry this line is written before; `entries.len()`
    /// places it at the end.
    pub before_entry: usize,
    pub text: String,
}

/// Everything a constraint file says, modeled or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintFile {
    pub entries: Vec<ConstraintEntry>,
    pub verbatim: Vec<VerbatimLine>,
}

impl From<Vec<ConstraintEntry>> for ConstraintFile {
    fn from(entries: Vec<ConstraintEntry>) -> Self {
        Self {
            entries,
            verbatim: Vec::new(),
        }
    }
}

/// A parser/writer pair for one constraint dialect.
pub trait ConstraintCodec {
    /// Line comment marker.
    fn comment_marker(&self) -> &'static str;

    fn parse_file(&self, text: &str) -> ConstraintFile;

    /// Append the lines for one entry. Fields the dialect has no syntax for
    /// are left out.
    fn write_entry(&self, entry: &ConstraintEntry, lines: &mut Vec<String>);

    fn parse(&self, text: &str) -> Vec<ConstraintEntry> {
        self.parse_file(text).entries
    }

    fn serialize_file(&self, file: &ConstraintFile) -> String {
        let mut lines = vec![generated_header(self.comment_marker()), String::new()];
        let verbatim_before = |idx: usize| {
            file.verbatim
                .iter()
                .filter(move |v| v.before_entry == idx)
                .map(|v| v.text.clone())
        };

        for (idx, entry) in file.entries.iter().enumerate() {
            lines.extend(verbatim_before(idx));
            self.write_entry(entry, &mut lines);
            lines.push(String::new());
        }
        lines.extend(
            file.verbatim
                .iter()
                .filter(|v| v.before_entry >= file.entries.len())
                .map(|v| v.text.clone()),
        );
        if lines.last().is_some_and(|line| !line.is_empty()) {
            lines.push(String::new());
        }

        lines.join("\n")
    }

    fn serialize(&self, entries: &[ConstraintEntry]) -> String {
        self.serialize_file(&ConstraintFile::from(entries.to_vec()))
    }
}

fn generated_header(marker: &str) -> String {
    format!("{} Generated by fpgaflow", marker)
}

/// The three supported dialects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintDialect {
    /// Gowin `.cst`
    Cst,

    /// iCE40 `.pcf`
    Pcf,

    /// ECP5 `.lpf`
    Lpf,
}

impl ConstraintDialect {
    pub fn extension(&self) -> &'static str {
        match self {
            ConstraintDialect::Cst => "cst",
            ConstraintDialect::Pcf => "pcf",
            ConstraintDialect::Lpf => "lpf",
        }
    }

    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "cst" => Ok(ConstraintDialect::Cst),
            "pcf" => Ok(ConstraintDialect::Pcf),
            "lpf" => Ok(ConstraintDialect::Lpf),
            other => Err(CoreError::UnknownDialect(other.to_string())),
        }
    }

    /// Dialect implied by a file's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| CoreError::UnknownDialect(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    fn codec(&self) -> &'static dyn ConstraintCodec {
        match self {
            ConstraintDialect::Cst => &CstCodec,
            ConstraintDialect::Pcf => &PcfCodec,
            ConstraintDialect::Lpf => &LpfCodec,
        }
    }

    pub fn parse(&self, text: &str) -> Vec<ConstraintEntry> {
        self.codec().parse(text)
    }

    pub fn serialize(&self, entries: &[ConstraintEntry]) -> String {
        self.codec().serialize(entries)
    }

    pub fn parse_file(&self, text: &str) -> ConstraintFile {
        self.codec().parse_file(text)
    }

    pub fn serialize_file(&self, file: &ConstraintFile) -> String {
        self.codec().serialize_file(file)
    }

    /// Normalize a file of this dialect, keeping every line it can't model.
    pub fn format(&self, text: &str) -> String {
        self.serialize_file(&self.parse_file(text))
    }

    /// Names of every port the file mentions, in file order.
    pub fn port_names(&self, text: &str) -> Vec<String> {
        self.parse(text).into_iter().map(|e| e.name).collect()
    }
}

impl fmt::Display for ConstraintDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

/// Accumulates entries by port name while a codec walks its input.
pub(crate) struct EntryTable {
    marker: &'static str,
    entries: Vec<ConstraintEntry>,
    index: HashMap<String, usize>,
    verbatim: Vec<VerbatimLine>,
}

impl EntryTable {
    pub(crate) fn new(marker: &'static str) -> Self {
        Self {
            marker,
            entries: Vec::new(),
            index: HashMap::new(),
            verbatim: Vec::new(),
        }
    }

    pub(crate) fn entry(&mut self, name: &str) -> &mut ConstraintEntry {
        let idx = match self.index.get(name) {
            Some(idx) => *idx,
            None => {
                self.entries.push(ConstraintEntry::new(name));
                self.index.insert(name.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    pub(crate) fn set_location(&mut self, name: &str, location: String) {
        let entry = self.entry(name);
        match &entry.location {
            Some(existing) if *existing != location => {
                warn!(port = %name, %existing, ignored = %location, "Conflicting pin location");
            }
            Some(_) => {}
            None => entry.location = Some(location),
        }
    }

    /// Keep a line the codec doesn't model. Blank lines and our own
    /// header are layout, not content.
    pub(crate) fn keep_line(&mut self, line: &str) {
        let text = line.trim_end();
        if text.trim().is_empty() || text.trim() == generated_header(self.marker) {
            return;
        }
        self.verbatim.push(VerbatimLine {
            before_entry: self.entries.len(),
            text: text.to_string(),
        });
    }

    /// Keep the trailing comment of a modeled line, if it has one.
    pub(crate) fn keep_comment(&mut self, comment: Option<&str>) {
        if let Some(comment) = comment {
            self.keep_line(comment);
        }
    }

    /// Entries with nothing to write are dropped, and verbatim anchors
    /// follow the surviving entries.
    pub(crate) fn into_file(self) -> ConstraintFile {
        let mut kept_before = Vec::with_capacity(self.entries.len() + 1);
        let mut kept = 0;
        for entry in &self.entries {
            kept_before.push(kept);
            if entry.has_content() {
                kept += 1;
            }
        }
        kept_before.push(kept);

        let verbatim = self
            .verbatim
            .into_iter()
            .map(|line| VerbatimLine {
                before_entry: kept_before[line.before_entry],
                text: line.text,
            })
            .collect();
        let entries = self.entries.into_iter().filter(|e| e.has_content()).collect();
        ConstraintFile { entries, verbatim }
    }
}

/// Set a field unless an earlier directive already did.
pub(crate) fn fill(slot: &mut Option<String>, value: String) {
    if slot.is_none() && !value.is_empty() {
        *slot = Some(value);
    }
}

/// Split a line into its directive and trailing comment.
pub(crate) fn split_comment<'a>(line: &'a str, marker: &str) -> (&'a str, Option<&'a str>) {
    match line.find(marker) {
        Some(idx) => (&line[..idx], Some(line[idx..].trim())),
        None => (line, None),
    }
}
