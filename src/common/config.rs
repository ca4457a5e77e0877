//! Global flag parsing and resolution.
//!
//! [`GlobalFlags`] is the raw clap shape shared by every subcommand; [`load`]
//! resolves it into a [`NodeConfig`] with `~` expanded and the main chain
//! selected. Each flag also reads an `INTCHAIN_*` env var when unset.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;

use crate::bootstrap::lifecycle::LifecycleOptions;
use crate::error::AppError;

/// Client identifier; also the main chain's id.
pub const CLIENT_IDENTIFIER: &str = "intchain";
/// Chain id used instead of [`CLIENT_IDENTIFIER`] when `--testnet` is set.
pub const TESTNET_CHAIN_ID: &str = "testnet";

const DEFAULT_DATA_DIR: &str = "~/.intchain";
const DEFAULT_LOG_DIR: &str = "log";
const DEFAULT_VERBOSITY: u8 = 3;
const METRICS_INTERVAL: Duration = Duration::from_secs(3);

/// Global flags, accepted before or after the subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalFlags {
    /// Data directory for the databases and keystore
    #[arg(long = "datadir", global = true, env = "INTCHAIN_DATADIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: String,

    /// Log folder name under the data directory
    #[arg(long = "logDir", global = true, env = "INTCHAIN_LOG_DIR", default_value = DEFAULT_LOG_DIR)]
    pub log_dir: String,

    /// Logging verbosity: 0=silent, 1=error, 2=warn, 3=info, 4=debug, 5=trace
    #[arg(long, global = true, env = "INTCHAIN_VERBOSITY", default_value_t = DEFAULT_VERBOSITY)]
    pub verbosity: u8,

    /// Capture every log event as JSON in a debug trace file
    #[arg(long, global = true)]
    pub debug: bool,

    /// Per-module verbosity: comma-separated <target>=<level> (e.g. intchain_node::genesis=5)
    #[arg(long, global = true, default_value = "")]
    pub vmodule: String,

    /// Request a backtrace when logging at a specific line: <file>:<line>
    #[arg(long = "backtrace", global = true, default_value = "")]
    pub backtrace_at: String,

    /// Child chains to operate on, comma separated (e.g. child_0,child_1)
    #[arg(long = "childChain", global = true, default_value = "")]
    pub child_chain: String,

    /// Use the test network instead of the main network
    #[arg(long, global = true)]
    pub testnet: bool,
}

/// Fully-resolved node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory, already expanded (no `~`).
    pub data_dir: PathBuf,
    pub log_dir: String,
    pub verbosity: u8,
    pub debug: bool,
    pub vmodule: String,
    pub backtrace_at: String,
    /// Raw `--childChain` value; parsed on demand by `init_child_chain`.
    pub child_chain: String,
    /// `intchain` or `testnet`.
    pub main_chain_id: String,
}

impl NodeConfig {
    /// Directory holding one chain's genesis and validator files.
    pub fn chain_dir(&self, chain_id: &str) -> PathBuf {
        self.data_dir.join(chain_id)
    }

    pub fn lifecycle_options(&self) -> LifecycleOptions {
        LifecycleOptions {
            data_dir: self.data_dir.clone(),
            log_dir: self.log_dir.clone(),
            verbosity: self.verbosity,
            debug: self.debug,
            vmodule: self.vmodule.clone(),
            backtrace_at: self.backtrace_at.clone(),
            metrics_interval: METRICS_INTERVAL,
        }
    }
}

/// Resolve raw flags into a [`NodeConfig`].
pub fn load(flags: GlobalFlags) -> Result<NodeConfig, AppError> {
    if flags.data_dir.trim().is_empty() {
        return Err(AppError::Usage("--datadir must not be empty".into()));
    }
    if flags.log_dir.trim().is_empty() {
        return Err(AppError::Usage("--logDir must not be empty".into()));
    }
    if Path::new(&flags.log_dir).is_absolute() {
        return Err(AppError::Usage(format!(
            "--logDir must be a folder name under the data directory, got '{}'",
            flags.log_dir
        )));
    }

    let main_chain_id = if flags.testnet {
        TESTNET_CHAIN_ID
    } else {
        CLIENT_IDENTIFIER
    };

    Ok(NodeConfig {
        data_dir: expand_home(flags.data_dir.trim()),
        log_dir: flags.log_dir,
        verbosity: flags.verbosity,
        debug: flags.debug,
        vmodule: flags.vmodule,
        backtrace_at: flags.backtrace_at,
        child_chain: flags.child_chain,
        main_chain_id: main_chain_id.to_string(),
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

#[cfg(test)]
impl NodeConfig {
    pub fn test_default(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            log_dir: DEFAULT_LOG_DIR.into(),
            verbosity: DEFAULT_VERBOSITY,
            debug: false,
            vmodule: String::new(),
            backtrace_at: String::new(),
            child_chain: String::new(),
            main_chain_id: CLIENT_IDENTIFIER.into(),
        }
    }
}
