//! Board catalog: board id → toolchain kind and device information.
//!
//! Two tables are kept on purpose. [`resolve_toolchain`] maps a board to its
//! device-family ecosystem, and each family keeps its own device table. Adding
//! a board means touching both; `tests/device_catalog.rs` checks that every
//! entry of [`KNOWN_BOARDS`] resolves through both paths.

use crate::constraints::ConstraintDialect;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Device-family ecosystem a board belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ToolchainKind {
    /// Gowin parts via Project Apicula.
    Apicula,

    /// Lattice iCE40 via Project IceStorm.
    #[serde(rename = "icestorm")]
    IceStorm,

    /// Lattice ECP5 via Project Trellis.
    Trellis,
}

impl ToolchainKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "apicula",
            ToolchainKind::IceStorm => "icestorm",
            ToolchainKind::Trellis => "trellis",
        }
    }

    /// Label used in stage banners ("Synthesis with Yosys (ICE40)").
    pub fn family_label(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "Gowin",
            ToolchainKind::IceStorm => "ICE40",
            ToolchainKind::Trellis => "ECP5",
        }
    }

    /// Yosys synthesis sub-command.
    pub fn synth_command(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "synth_gowin",
            ToolchainKind::IceStorm => "synth_ice40",
            ToolchainKind::Trellis => "synth_ecp5",
        }
    }

    /// Directory under `share/yosys/` holding the family's simulation cells.
    pub fn yosys_share_dir(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "gowin",
            ToolchainKind::IceStorm => "ice40",
            ToolchainKind::Trellis => "ecp5",
        }
    }

    /// Extension of the routed design written by place-and-route.
    pub fn routed_extension(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "json",
            ToolchainKind::IceStorm => "asc",
            ToolchainKind::Trellis => "conf",
        }
    }

    pub fn packer(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "gowin_pack",
            ToolchainKind::IceStorm => "icepack",
            ToolchainKind::Trellis => "ecppack",
        }
    }

    /// Bitstream extension, shared by the packer and the programmer.
    pub fn bitstream_extension(&self) -> &'static str {
        match self {
            ToolchainKind::Apicula => "fs",
            ToolchainKind::IceStorm => "bin",
            ToolchainKind::Trellis => "bit",
        }
    }

    pub fn constraint_dialect(&self) -> ConstraintDialect {
        match self {
            ToolchainKind::Apicula => ConstraintDialect::Cst,
            ToolchainKind::IceStorm => ConstraintDialect::Pcf,
            ToolchainKind::Trellis => ConstraintDialect::Lpf,
        }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Silicon details a board contributes to place-and-route and packing.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Part number passed to nextpnr.
    pub device: &'static str,

    /// Family string (`--family` for Gowin, informational otherwise).
    pub family: &'static str,

    /// Default clock frequency in MHz.
    pub frequency_mhz: u32,

    /// Package (`--package`), when the toolchain wants one.
    pub package: Option<&'static str>,

    /// Device-selection flag such as `--up5k` or `--25k`.
    pub device_flag: Option<&'static str>,
}

/// Board ids accepted by [`resolve_toolchain`] and [`resolve_device_info`].
pub const KNOWN_BOARDS: &[&str] = &[
    "tangnano",
    "tangnano1k",
    "tangnano4k",
    "tangnano9k",
    "tangnano20k",
    "tangprimer20k",
    "icebreaker",
    "orangeCrab",
];

const BOARD_TOOLCHAINS: &[(&str, ToolchainKind)] = &[
    ("tangnano", ToolchainKind::Apicula),
    ("tangnano1k", ToolchainKind::Apicula),
    ("tangnano4k", ToolchainKind::Apicula),
    ("tangnano9k", ToolchainKind::Apicula),
    ("tangnano20k", ToolchainKind::Apicula),
    ("tangprimer20k", ToolchainKind::Apicula),
    ("icebreaker", ToolchainKind::IceStorm),
    ("orangeCrab", ToolchainKind::Trellis),
];

/// Resolve the toolchain for a board. Unknown boards are an error.
pub fn resolve_toolchain(board: &str) -> Result<ToolchainKind> {
    BOARD_TOOLCHAINS
        .iter()
        .find(|(id, _)| *id == board)
        .map(|(_, kind)| *kind)
        .ok_or_else(|| CoreError::UnsupportedBoard(board.to_string()))
}

/// Resolve device information for a board through its family's table.
pub fn resolve_device_info(board: &str) -> Result<DeviceInfo> {
    let toolchain = resolve_toolchain(board)?;
    let info = match toolchain {
        ToolchainKind::Apicula => gowin_device_info(board),
        ToolchainKind::IceStorm => ice40_device_info(board),
        ToolchainKind::Trellis => ecp5_device_info(board),
    };
    info.ok_or_else(|| CoreError::MissingDeviceInfo {
        board: board.to_string(),
        toolchain: toolchain.to_string(),
    })
}

fn gowin_device_info(board: &str) -> Option<DeviceInfo> {
    let (device, family, frequency_mhz) = match board {
        "tangnano9k" => ("GW1NR-LV9QN88PC6/I5", "GW1N-9C", 27),
        "tangnano4k" => ("GW1NSR-LV4CQN48PC7/I6", "GW1NS-4", 27),
        "tangnano1k" => ("GW1NZ-LV1QN48C6/I5", "GW1NZ-1", 27),
        "tangnano" => ("GW1N-LV1QN48C6/I5", "GW1N-1", 24),
        "tangnano20k" => ("GW2AR-LV18QN88C8/I7", "GW2A-18C", 27),
        "tangprimer20k" => ("GW2A-LV18PG256C8/I7", "GW2A-18", 27),
        _ => return None,
    };
    Some(DeviceInfo {
        device,
        family,
        frequency_mhz,
        package: None,
        device_flag: None,
    })
}

fn ice40_device_info(board: &str) -> Option<DeviceInfo> {
    match board {
        "icebreaker" => Some(DeviceInfo {
            device: "iCE40UP5K",
            family: "iCE40UP",
            frequency_mhz: 48,
            package: Some("sg48"),
            device_flag: Some("--up5k"),
        }),
        _ => None,
    }
}

fn ecp5_device_info(board: &str) -> Option<DeviceInfo> {
    match board {
        "orangeCrab" => Some(DeviceInfo {
            device: "LFE5U-25F",
            family: "ECP5",
            frequency_mhz: 48,
            package: Some("CSFBGA285"),
            device_flag: Some("--25k"),
        }),
        _ => None,
    }
}
