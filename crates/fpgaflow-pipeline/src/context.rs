//! Toolchain location and the per-run context shared by every stage.

use crate::error::{PipelineError, Result};
use crate::logger::Logger;
use crate::stages::GowinPnr;
use serde::Deserialize;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// `fpgaflow.toml`
///
/// ```toml
/// toolchain_path = "/opt/oss-cad-suite"
/// gowin_pnr = "himbaechel"
///
/// [overrides]
/// yosys = "/usr/local/bin/yosys"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolchainConfig {
    /// OSS CAD Suite root or its `bin/` directory.
    pub toolchain_path: Option<PathBuf>,

    /// Tool name → binary, bypassing the suite.
    #[serde(default)]
    pub overrides: HashMap<String, PathBuf>,

    /// nextpnr flavour for Gowin parts. Probed once per context when unset.
    pub gowin_pnr: Option<GowinPnr>,
}

impl ToolchainConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// `<suite>` and `<suite>/bin` both name the same bin directory.
pub fn normalize_bin_dir(path: &Path) -> PathBuf {
    if path.file_name() == Some(OsStr::new("bin")) {
        path.to_path_buf()
    } else {
        path.join("bin")
    }
}

/// Everything a stage reads from its environment. Built once per run and
/// never modified while stages execute.
#[derive(Clone)]
pub struct ToolchainContext {
    bin_dir: Option<PathBuf>,
    overrides: HashMap<String, PathBuf>,
    gowin_pnr: Arc<OnceCell<GowinPnr>>,
    logger: Arc<dyn Logger>,
}

impl ToolchainContext {
    /// Context for a suite installed at `bin_dir`. The directory isn't checked.
    pub fn new(bin_dir: impl Into<PathBuf>, logger: Arc<dyn Logger>) -> Self {
        Self {
            bin_dir: Some(bin_dir.into()),
            overrides: HashMap::new(),
            gowin_pnr: Arc::default(),
            logger,
        }
    }

    /// Context that finds every tool on the inherited `PATH`.
    pub fn system(logger: Arc<dyn Logger>) -> Self {
        Self {
            bin_dir: None,
            overrides: HashMap::new(),
            gowin_pnr: Arc::default(),
            logger,
        }
    }

    pub fn from_config(config: &ToolchainConfig, logger: Arc<dyn Logger>) -> Result<Self> {
        let mut ctx = match &config.toolchain_path {
            Some(path) => {
                let bin_dir = normalize_bin_dir(path);
                if !bin_dir.is_dir() {
                    return Err(PipelineError::ToolchainNotFound(bin_dir));
                }
                Self::new(bin_dir, logger)
            }
            None => Self::system(logger),
        };
        ctx.overrides = config.overrides.clone();
        if let Some(choice) = config.gowin_pnr {
            ctx = ctx.with_gowin_pnr(choice);
        }
        Ok(ctx)
    }

    pub fn with_override(mut self, tool: &str, path: impl Into<PathBuf>) -> Self {
        self.overrides.insert(tool.to_string(), path.into());
        self
    }

    /// Fix the Gowin nextpnr flavour instead of probing for it.
    pub fn with_gowin_pnr(mut self, choice: GowinPnr) -> Self {
        self.gowin_pnr = Arc::new(OnceCell::new_with(Some(choice)));
        self
    }

    /// Gowin nextpnr flavour, shared by every clone of this context.
    pub fn gowin_pnr(&self) -> &OnceCell<GowinPnr> {
        &self.gowin_pnr
    }

    /// Path to invoke for `name`.
    pub fn tool(&self, name: &str) -> PathBuf {
        if let Some(path) = self.overrides.get(name) {
            return path.clone();
        }
        match &self.bin_dir {
            Some(bin) => bin.join(name),
            None => PathBuf::from(name),
        }
    }

    /// Suite root (parent of the bin directory).
    pub fn root(&self) -> Option<&Path> {
        self.bin_dir.as_deref().and_then(Path::parent)
    }

    /// `PATH` for child processes: suite `bin`, `lib`, `py3bin`, then `inherited`.
    pub fn search_path(&self, inherited: Option<&OsStr>) -> Option<OsString> {
        let mut dirs: Vec<PathBuf> = match self.root() {
            Some(root) => ["bin", "lib", "py3bin"].iter().map(|d| root.join(d)).collect(),
            None => Vec::new(),
        };
        if let Some(inherited) = inherited {
            dirs.extend(std::env::split_paths(inherited));
        }
        std::env::join_paths(dirs).ok()
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::MemoryLogger;

    fn logger() -> Arc<dyn Logger> {
        Arc::new(MemoryLogger::new())
    }

    #[test]
    fn test_normalize_bin_dir() {
        assert_eq!(
            normalize_bin_dir(Path::new("/opt/oss-cad-suite")),
            PathBuf::from("/opt/oss-cad-suite/bin")
        );
        assert_eq!(
            normalize_bin_dir(Path::new("/opt/oss-cad-suite/bin")),
            PathBuf::from("/opt/oss-cad-suite/bin")
        );
    }

    #[test]
    fn test_tool_prefers_override() {
        let ctx = ToolchainContext::new("/suite/bin", logger())
            .with_override("yosys", "/usr/local/bin/yosys");
        assert_eq!(ctx.tool("yosys"), PathBuf::from("/usr/local/bin/yosys"));
        assert_eq!(ctx.tool("nextpnr-ice40"), PathBuf::from("/suite/bin/nextpnr-ice40"));
    }

    #[test]
    fn test_system_context_uses_bare_names() {
        let ctx = ToolchainContext::system(logger());
        assert_eq!(ctx.tool("iverilog"), PathBuf::from("iverilog"));
        assert_eq!(
            ctx.search_path(Some(OsStr::new("/usr/bin"))),
            Some(OsString::from("/usr/bin"))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_order() {
        let ctx = ToolchainContext::new("/suite/bin", logger());
        let path = ctx.search_path(Some(OsStr::new("/usr/bin:/bin"))).unwrap();
        assert_eq!(
            path,
            OsString::from("/suite/bin:/suite/lib:/suite/py3bin:/usr/bin:/bin")
        );
    }

    #[test]
    fn test_config_from_toml() {
        let config = ToolchainConfig::from_toml_str(
            "toolchain_path = \"/opt/oss\"\n[overrides]\nopenFPGALoader = \"/usr/bin/openFPGALoader\"\n",
        )
        .unwrap();
        assert_eq!(config.toolchain_path, Some(PathBuf::from("/opt/oss")));
        assert_eq!(
            config.overrides.get("openFPGALoader"),
            Some(&PathBuf::from("/usr/bin/openFPGALoader"))
        );
        assert_eq!(config.gowin_pnr, None);
    }

    #[test]
    fn test_config_gowin_pnr_reaches_context() {
        let config = ToolchainConfig::from_toml_str("gowin_pnr = \"legacy\"\n").unwrap();
        let ctx = ToolchainContext::from_config(&config, logger()).unwrap();
        assert_eq!(ctx.gowin_pnr().get(), Some(&GowinPnr::Legacy));
        assert_eq!(ToolchainContext::system(logger()).gowin_pnr().get(), None);
    }

    #[test]
    fn test_missing_toolchain_dir_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolchainConfig {
            toolchain_path: Some(dir.path().join("nope")),
            ..Default::default()
        };
        let err = ToolchainContext::from_config(&config, logger()).err().unwrap();
        assert!(matches!(err, PipelineError::ToolchainNotFound(_)));
    }
}
