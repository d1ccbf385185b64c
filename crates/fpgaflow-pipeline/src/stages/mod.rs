//! Concrete stages, one per external tool.

mod constraint_check;
mod pack;
mod pnr;
mod program;
mod synth;
mod testbench;

pub use constraint_check::ConstraintCheckStage;
pub use pack::PackStage;
pub use pnr::{GowinPnr, PlaceAndRouteStage, PnrVariant};
pub use program::{ProgramStage, ProgramTarget};
pub use synth::SynthesisStage;
pub use testbench::TestbenchStage;

use std::path::{Path, PathBuf};

pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// `read_verilog` over every source file, quoting paths with whitespace.
pub(crate) fn read_verilog(files: &[PathBuf]) -> String {
    let files: Vec<String> = files
        .iter()
        .map(|p| {
            let p = path_arg(p);
            if p.contains(char::is_whitespace) {
                format!("\"{}\"", p)
            } else {
                p
            }
        })
        .collect();
    format!("read_verilog {}", files.join(" "))
}
