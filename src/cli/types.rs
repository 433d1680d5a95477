use std::path::PathBuf;

use clap::{Args, ValueEnum};

use crate::config::constants::{DEFAULT_LOG_DIR, DEFAULT_LOG_MAX_FILES};
use crate::logging::LogConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    // Human-readable format with colors
    Pretty,

    // JSON format for log shippers
    Json,

    // Compact single-line format
    Compact,
}

/// Logging flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct LogArgs {
    #[arg(
        short,
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        value_enum,
        help = "Logging level"
    )]
    pub log_level: LogLevel,

    #[arg(
        long,
        env = "LOG_FORMAT",
        default_value = "pretty",
        value_enum,
        help = "Log output format"
    )]
    pub log_format: LogFormat,

    #[arg(
        long,
        env = "LOG_FILE",
        help = "Log file name prefix (if not specified, logs only go to stdout)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long,
        env = "LOG_DIR",
        default_value = DEFAULT_LOG_DIR,
        help = "Directory for rotated log files"
    )]
    pub log_dir: PathBuf,

    #[arg(
        long,
        env = "LOG_MAX_FILES",
        default_value_t = DEFAULT_LOG_MAX_FILES,
        help = "Maximum number of daily log files to retain"
    )]
    pub log_max_files: usize,
}

impl LogArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            format: self.log_format,
            file_prefix: self.log_file.clone(),
            directory: self.log_dir.clone(),
            max_log_files: self.log_max_files,
        }
    }
}
