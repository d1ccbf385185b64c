//! Gowin physical constraints (`.cst`).
//!
//! ```text
//! IO_LOC  "led[0]" 10;
//! IO_PORT "led[0]" DRIVE=8 IO_TYPE=LVCMOS33 PULL_MODE=UP;
//! ```

use super::vocab::{DRIVE, PULL_MODE};
use super::{fill, split_comment, ConstraintCodec, ConstraintEntry, ConstraintFile, EntryTable};
use regex::Regex;
use std::sync::LazyLock;

static IO_LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"IO_LOC\s+"([^"]+)"\s+([^;]+?)\s*;"#).unwrap());

static IO_PORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"IO_PORT\s+"([^"]+)"\s+([^;]+?)\s*;"#).unwrap());

pub struct CstCodec;

impl ConstraintCodec for CstCodec {
    fn comment_marker(&self) -> &'static str {
        "//"
    }

    fn parse_file(&self, text: &str) -> ConstraintFile {
        let mut table = EntryTable::new(self.comment_marker());

        for raw in text.lines() {
            let (line, comment) = split_comment(raw, self.comment_marker());

            if let Some(caps) = IO_LOC.captures(line) {
                let location: String = caps[2].split_whitespace().collect();
                table.set_location(&caps[1], location);
                table.keep_comment(comment);
            } else if let Some(caps) = IO_PORT.captures(line) {
                let entry = table.entry(&caps[1]);
                for option in caps[2].split_whitespace() {
                    let Some((key, value)) = option.split_once('=') else {
                        entry.extra.push(option.to_string());
                        continue;
                    };
                    match key.to_ascii_uppercase().as_str() {
                        "IO_TYPE" => fill(&mut entry.io_standard, value.to_string()),
                        "PULL_MODE" => fill(&mut entry.pull_mode, PULL_MODE.label(value)),
                        "DRIVE" => fill(&mut entry.drive, DRIVE.label(value)),
                        _ => entry.extra.push(option.to_string()),
                    }
                }
                table.keep_comment(comment);
            } else {
                table.keep_line(raw);
            }
        }

        table.into_file()
    }

    fn write_entry(&self, entry: &ConstraintEntry, lines: &mut Vec<String>) {
        if let Some(location) = &entry.location {
            lines.push(format!("IO_LOC  \"{}\" {};", entry.name, location));
        }

        let mut options = Vec::new();
        if let Some(drive) = &entry.drive {
            options.push(format!("DRIVE={}", DRIVE.code(drive)));
        }
        if let Some(standard) = &entry.io_standard {
            options.push(format!("IO_TYPE={}", standard));
        }
        if let Some(pull) = &entry.pull_mode {
            options.push(format!("PULL_MODE={}", PULL_MODE.code(pull)));
        }
        options.extend(entry.extra.iter().cloned());
        if !options.is_empty() {
            lines.push(format!("IO_PORT \"{}\" {};", entry.name, options.join(" ")));
        }
    }
}
