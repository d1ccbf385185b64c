//! ECP5 logical preference file (`.lpf`).
//!
//! ```text
//! LOCATE COMP "clk48" SITE "A9";
//! IOBUF PORT "clk48" IO_TYPE=LVCMOS33 PULLMODE=NONE;
//! FREQUENCY PORT "clk48" 48 MHZ;
//! ```

use super::vocab::{DIFF_RESISTOR, DRIVE, PULL_MODE, SLEW_RATE, TERMINATION};
use super::{fill, split_comment, ConstraintCodec, ConstraintEntry, ConstraintFile, EntryTable};
use regex::Regex;
use std::sync::LazyLock;

static LOCATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"LOCATE\s+(?:COMP\s+)?"([^"]+)"\s+SITE\s+"([^"]+)"\s*;"#).unwrap()
});

static IOBUF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"IOBUF\s+(?:PORT\s+)?"([^"]+)"\s*([^;]*);"#).unwrap());

static FREQUENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)FREQUENCY\s+(?:PORT|NET)\s+"([^"]+)"\s+([0-9.]+)\s*MHZ\s*;"#).unwrap()
});

pub struct LpfCodec;

impl ConstraintCodec for LpfCodec {
    fn comment_marker(&self) -> &'static str {
        "#"
    }

    fn parse_file(&self, text: &str) -> ConstraintFile {
        let mut table = EntryTable::new(self.comment_marker());

        for raw in text.lines() {
            let (line, comment) = split_comment(raw, self.comment_marker());

            if let Some(caps) = LOCATE.captures(line) {
                table.set_location(&caps[1], caps[2].to_string());
                table.keep_comment(comment);
            } else if let Some(caps) = IOBUF.captures(line) {
                let entry = table.entry(&caps[1]);
                for option in caps[2].split_whitespace() {
                    let Some((key, value)) = option.split_once('=') else {
                        entry.extra.push(option.to_string());
                        continue;
                    };
                    match key.to_ascii_uppercase().as_str() {
                        "IO_TYPE" => fill(&mut entry.io_standard, value.to_string()),
                        "PULLMODE" => fill(&mut entry.pull_mode, PULL_MODE.label(value)),
                        "DRIVE" => fill(&mut entry.drive, DRIVE.label(value)),
                        "SLEWRATE" => fill(&mut entry.slew_rate, SLEW_RATE.label(value)),
                        "TERMINATION" => fill(&mut entry.termination, TERMINATION.label(value)),
                        "DIFFRESISTOR" => {
                            fill(&mut entry.diff_resistor, DIFF_RESISTOR.label(value))
                        }
                        _ => entry.extra.push(option.to_string()),
                    }
                }
                table.keep_comment(comment);
            } else if let Some(caps) = FREQUENCY.captures(line) {
                fill(&mut table.entry(&caps[1]).frequency, caps[2].to_string());
                table.keep_comment(comment);
            } else {
                table.keep_line(raw);
            }
        }

        table.into_file()
    }

    fn write_entry(&self, entry: &ConstraintEntry, lines: &mut Vec<String>) {
        if let Some(site) = &entry.location {
            lines.push(format!("LOCATE COMP \"{}\" SITE \"{}\";", entry.name, site));
        }

        let options: Vec<String> = [
            ("IO_TYPE", entry.io_standard.clone()),
            ("PULLMODE", entry.pull_mode.as_deref().map(|l| PULL_MODE.code(l))),
            ("DRIVE", entry.drive.as_deref().map(|l| DRIVE.code(l))),
            ("SLEWRATE", entry.slew_rate.as_deref().map(|l| SLEW_RATE.code(l))),
            (
                "TERMINATION",
                entry.termination.as_deref().map(|l| TERMINATION.code(l)),
            ),
            (
                "DIFFRESISTOR",
                entry.diff_resistor.as_deref().map(|l| DIFF_RESISTOR.code(l)),
            ),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| format!("{}={}", key, v)))
        .chain(entry.extra.iter().cloned())
        .collect();
        if !options.is_empty() {
            lines.push(format!("IOBUF PORT \"{}\" {};", entry.name, options.join(" ")));
        }

        if let Some(mhz) = &entry.frequency {
            lines.push(format!("FREQUENCY PORT \"{}\" {} MHZ;", entry.name, mhz));
        }
    }
}
