//! Catalog totality: every known board resolves through both tables.

use fpgaflow_core::{resolve_device_info, resolve_toolchain, CoreError, KNOWN_BOARDS};

/// Test: each known board has a toolchain and device information
#[test]
fn test_every_known_board_resolves_in_both_tables() {
    for board in KNOWN_BOARDS {
        let toolchain = resolve_toolchain(board);
        assert!(toolchain.is_ok(), "{} has no toolchain", board);

        let info = resolve_device_info(board);
        assert!(info.is_ok(), "{} has no device info: {:?}", board, info.err());

        let info = info.unwrap();
        assert!(!info.device.is_empty(), "{} has an empty device", board);
        assert!(info.frequency_mhz > 0, "{} has no default clock", board);
    }
}

/// Test: non-Gowin toolchains always carry a package and device flag
#[test]
fn test_lattice_boards_have_package_and_flag() {
    for board in KNOWN_BOARDS {
        let toolchain = resolve_toolchain(board).unwrap();
        let info = resolve_device_info(board).unwrap();
        if toolchain != fpgaflow_core::ToolchainKind::Apicula {
            assert!(info.package.is_some(), "{} needs --package", board);
            assert!(info.device_flag.is_some(), "{} needs a device flag", board);
        }
    }
}

/// Test: unknown boards are rejected by both lookups
#[test]
fn test_unknown_board_is_an_error_in_both_tables() {
    for board in ["", "tangnano9K", "arty-a7", "ulx3s"] {
        assert!(
            matches!(resolve_toolchain(board), Err(CoreError::UnsupportedBoard(_))),
            "{:?} should be unsupported",
            board
        );
        assert!(
            matches!(resolve_device_info(board), Err(CoreError::UnsupportedBoard(_))),
            "{:?} should be unsupported",
            board
        );
    }
}
