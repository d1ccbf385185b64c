//! Attribute vocabularies: tool code ↔ human label.
//!
//! Lookups are case-insensitive. A value missing from a table passes
//! through unchanged in both directions, so hand-written files with
//! exotic settings survive a rewrite.

pub struct Vocabulary(&'static [(&'static str, &'static str)]);

impl Vocabulary {
    /// Label for a code as written in a constraint file.
    pub fn label(&self, code: &str) -> String {
        self.0
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(code))
            .map(|(_, label)| label.to_string())
            .unwrap_or_else(|| code.to_string())
    }

    /// Code to write back for a label.
    pub fn code(&self, label: &str) -> String {
        self.0
            .iter()
            .find(|(_, l)| l.eq_ignore_ascii_case(label))
            .map(|(code, _)| code.to_string())
            .unwrap_or_else(|| label.to_string())
    }
}

pub const DRIVE: Vocabulary = Vocabulary(&[
    ("4", "4ma"),
    ("8", "8ma"),
    ("12", "12ma"),
    ("16", "16ma"),
    ("24", "24ma"),
]);

/// `PULL_MODE` (CST) and `PULLMODE` (LPF).
pub const PULL_MODE: Vocabulary = Vocabulary(&[
    ("UP", "Pull Up"),
    ("DOWN", "Pull Down"),
    ("NONE", "No Pull"),
    ("KEEPER", "Keeper"),
]);

/// `-pullup yes|no` in PCF.
pub const PCF_PULLUP: Vocabulary = Vocabulary(&[("yes", "Pull Up"), ("no", "No Pull")]);

/// `-pullup_resistor` strengths, appended to the "Pull Up" label.
pub const PCF_PULLUP_RESISTOR: Vocabulary = Vocabulary(&[
    ("3P3K", "3.3K"),
    ("6P8K", "6.8K"),
    ("10K", "10K"),
    ("100K", "100K"),
]);

pub const SLEW_RATE: Vocabulary = Vocabulary(&[("FAST", "Fast"), ("SLOW", "Slow")]);

pub const TERMINATION: Vocabulary = Vocabulary(&[
    ("OFF", "Off"),
    ("50", "50 Ohm"),
    ("75", "75 Ohm"),
    ("150", "150 Ohm"),
]);

pub const DIFF_RESISTOR: Vocabulary = Vocabulary(&[("OFF", "Off"), ("100", "100 Ohm")]);
