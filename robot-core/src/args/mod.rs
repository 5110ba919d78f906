//! Defines the standard command-line arguments shared by every node binary.
//!
//! This module uses `clap` to parse the node name, the system root directory
//! and the logging switches. Every robot and tool built on the runtime accepts
//! the same set, so a node can be started the same way whatever it runs.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Environment variable consulted when `--root-dir` is not given.
pub const ROOT_DIR_ENV: &str = "ROBOT_ROOT_DIR";

/// Holds the standard configuration parameters parsed from the command line.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
pub struct CommonArgs {
    /// Name of the node (registry key and config file name)
    #[arg(short, long, default_value = "robot")]
    name: String,

    /// Name of the system the node belongs to
    #[arg(long, default_value = "robot")]
    system: String,

    /// Root directory of the system (falls back to $ROBOT_ROOT_DIR, then ".")
    #[arg(long)]
    root_dir: Option<PathBuf>,

    /// Run outside of the system: no self start, stand-alone registry flag
    #[arg(long, default_value_t = false)]
    out_of_system: bool,

    /// Write logs to stdout instead of stderr
    #[arg(long, default_value_t = false)]
    stdout: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl CommonArgs {
    /// Parses command-line arguments into a `CommonArgs` struct.
    ///
    /// This function automatically handles `--help` and `--version` flags via `clap`.
    /// If required arguments are missing or invalid, it will print an error and exit.
    pub fn parse_args(args: Vec<String>) -> Self {
        CommonArgs::parse_from(args)
    }

    /// Returns the node name.
    pub fn get_name(&self) -> String {
        self.name.clone()
    }

    pub fn get_system(&self) -> String {
        self.system.clone()
    }

    /// Returns the root directory of the system.
    ///
    /// Resolution order: `--root-dir`, then `ROBOT_ROOT_DIR`, then the current directory.
    pub fn get_root_dir(&self) -> PathBuf {
        self.root_dir
            .clone()
            .or_else(|| env::var_os(ROOT_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn is_out_of_system(&self) -> bool {
        self.out_of_system
    }

    pub fn is_stdout(&self) -> bool {
        self.stdout
    }

    pub fn get_log_level(&self) -> &str {
        &self.log_level
    }
}
