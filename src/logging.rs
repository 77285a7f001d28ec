// src/logging.rs

//! Logging setup for `forrest` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `FORREST_LOG` environment variable (a level or full filter directives)
//! 3. `level` from the YAML logging config (`--logging-config`)
//! 4. `debug` with `--verbose`, otherwise `info`
//!
//! Extra `filter` directives from the YAML file are appended to whatever
//! level wins. Logs are sent to STDERR so that stdout belongs to the
//! pipeline.

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;
use crate::config::RunConfiguration;
use crate::errors::{ForrestError, Result};

pub const LOG_ENV_VAR: &str = "FORREST_LOG";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Schema of the YAML logging config.
///
/// ```yaml
/// level: info
/// filter: "forrest::watch=debug,notify=warn"
/// format: compact
/// target: true
/// ansi: false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filter: Option<String>,
    pub format: LogFormat,
    pub target: Option<bool>,
    pub ansi: Option<bool>,
}

/// Read and parse a YAML logging config.
pub fn load_logging_config(path: &Path) -> Result<LoggingConfig> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ForrestError::config(format!("failed to read logging config {:?}: {e}", path))
    })?;
    serde_yaml::from_str(&text).map_err(|e| {
        ForrestError::config(format!("invalid logging config {:?}: {e}", path))
    })
}

/// Initialise the global subscriber.
///
/// A logging config that is set but cannot be loaded is an error.
pub fn init_logging(cli_level: Option<LogLevel>, config: &RunConfiguration) -> Result<()> {
    let file = match config.logging_config() {
        Some(path) => load_logging_config(path)?,
        None => LoggingConfig::default(),
    };
    let env = std::env::var(LOG_ENV_VAR).ok();
    let directives = resolve_directives(cli_level, env.as_deref(), &file, config.verbose());

    let filter = EnvFilter::try_new(&directives).map_err(|e| {
        ForrestError::config(format!("invalid log filter '{directives}': {e}"))
    })?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(file.target.unwrap_or(true))
        .with_ansi(file.ansi.unwrap_or(true))
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let installed = match file.format {
        LogFormat::Full => builder.try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| ForrestError::Other(anyhow::anyhow!(e)))
}

/// Filter directives for the given inputs, highest priority first.
pub fn resolve_directives(
    cli_level: Option<LogLevel>,
    env: Option<&str>,
    file: &LoggingConfig,
    verbose: bool,
) -> String {
    let base = cli_level
        .map(|lvl| level_name(lvl).to_string())
        .or_else(|| {
            env.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .or_else(|| file.level.as_deref().and_then(parse_level_str).map(str::to_string))
        .unwrap_or_else(|| if verbose { "debug" } else { "info" }.to_string());

    match file.filter.as_deref().map(str::trim) {
        Some(extra) if !extra.is_empty() => format!("{base},{extra}"),
        _ => base,
    }
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

fn parse_level_str(s: &str) -> Option<&'static str> {
    match s.trim().to_lowercase().as_str() {
        "error" | "critical" => Some("error"),
        "warn" | "warning" => Some("warn"),
        "info" => Some("info"),
        "debug" => Some("debug"),
        "trace" => Some("trace"),
        _ => None,
    }
}
