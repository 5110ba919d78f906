//! Logger setup.
//!
//! The runtime logs through the `log` facade; the module path of the caller is
//! the logger name. `init` installs `env_logger` once per process.

use chrono::Local;
use log::LevelFilter;
use std::io::Write;
use std::str::FromStr;

/// Log levels with their numeric mask values, as used in node configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 4,
    Debug = 8,
    Trace = 16,
}

impl LogLevel {
    /// Picks the most verbose level present in a numeric mask.
    pub fn from_mask(mask: u32) -> Option<Self> {
        [
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
        ]
        .into_iter()
        .find(|level| mask & (*level as u32) != 0)
    }

    pub fn to_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Installs the process logger.
///
/// # Arguments
///
/// * `stdout` - Write to stdout instead of stderr.
/// * `level` - Default level; `RUST_LOG` overrides it.
///
/// # Returns
///
/// `true` if this call installed the logger, `false` if one was already set.
pub fn init(stdout: bool, level: LogLevel) -> bool {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level.to_filter())
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    if stdout {
        builder.target(env_logger::Target::Stdout);
    }
    builder.try_init().is_ok()
}
