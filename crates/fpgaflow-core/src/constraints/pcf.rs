//! iCE40 pin constraints (`.pcf`).
//!
//! ```text
//! set_io -nowarn -pullup yes -pullup_resistor 10K btn 10
//! set_frequency clk 12
//! ```

use super::vocab::{PCF_PULLUP, PCF_PULLUP_RESISTOR};
use super::{fill, split_comment, ConstraintCodec, ConstraintEntry, ConstraintFile, EntryTable};

pub struct PcfCodec;

impl PcfCodec {
    /// `set_io [flags...] <port> <pin>`. Returns false when the line
    /// doesn't have that shape.
    fn parse_set_io(table: &mut EntryTable, args: &[&str]) -> bool {
        let [flags @ .., name, pin] = args else {
            return false;
        };

        let mut pullup = None;
        let mut resistor = None;
        let mut extra = Vec::new();
        let mut flags = flags.iter();
        while let Some(flag) = flags.next() {
            match *flag {
                "-pullup" => pullup = flags.next().copied(),
                "-pullup_resistor" => resistor = flags.next().copied(),
                other => extra.push(other.to_string()),
            }
        }

        table.set_location(name, pin.to_string());
        let entry = table.entry(name);
        if let Some(code) = pullup {
            let mut label = PCF_PULLUP.label(code);
            if let (Some(r), "Pull Up") = (resistor, label.as_str()) {
                label = format!("Pull Up {}", PCF_PULLUP_RESISTOR.label(r));
            }
            fill(&mut entry.pull_mode, label);
        }
        entry.extra.extend(extra);
        true
    }
}

impl ConstraintCodec for PcfCodec {
    fn comment_marker(&self) -> &'static str {
        "#"
    }

    fn parse_file(&self, text: &str) -> ConstraintFile {
        let mut table = EntryTable::new(self.comment_marker());

        for raw in text.lines() {
            let (line, comment) = split_comment(raw, self.comment_marker());
            let tokens: Vec<&str> = line.trim().trim_end_matches(';').split_whitespace().collect();

            let modeled = match tokens.split_first() {
                Some((&"set_io", args)) => Self::parse_set_io(&mut table, args),
                Some((&"set_frequency", [name, mhz])) => {
                    fill(&mut table.entry(name).frequency, mhz.to_string());
                    true
                }
                _ => false,
            };

            if modeled {
                table.keep_comment(comment);
            } else {
                table.keep_line(raw);
            }
        }

        table.into_file()
    }

    fn write_entry(&self, entry: &ConstraintEntry, lines: &mut Vec<String>) {
        if let Some(pin) = &entry.location {
            let mut flags = entry.extra.clone();
            flags.extend(entry.pull_mode.as_deref().and_then(pull_flags));
            if flags.is_empty() {
                lines.push(format!("set_io {} {}", entry.name, pin));
            } else {
                lines.push(format!("set_io {} {} {}", flags.join(" "), entry.name, pin));
            }
        }
        if let Some(mhz) = &entry.frequency {
            lines.push(format!("set_frequency {} {}", entry.name, mhz));
        }
    }
}

/// `set_io` flags for a pull label, or `None` when PCF can't express it.
fn pull_flags(label: &str) -> Option<String> {
    if let Some(strength) = label.strip_prefix("Pull Up ") {
        return Some(format!(
            "-pullup yes -pullup_resistor {}",
            PCF_PULLUP_RESISTOR.code(strength)
        ));
    }
    let code = PCF_PULLUP.code(label);
    if code.contains(char::is_whitespace) {
        None
    } else {
        Some(format!("-pullup {}", code))
    }
}
