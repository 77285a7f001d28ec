// src/config/validate.rs

use std::fs;

use globset::GlobBuilder;

use crate::config::model::{LIST_SEPARATOR, RawRunConfiguration, RunConfiguration};
use crate::errors::{ForrestError, Result};
use crate::mode::Mode;
use crate::types::InputSource;

impl TryFrom<RawRunConfiguration> for RunConfiguration {
    type Error = ForrestError;

    fn try_from(raw: RawRunConfiguration) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(RunConfiguration::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawRunConfiguration) -> Result<()> {
    validate_patterns("patterns", cfg.patterns.as_deref())?;
    validate_patterns("ignore_patterns", cfg.ignore_patterns.as_deref())?;
    validate_global_config(cfg)?;
    Ok(())
}

fn validate_patterns(field: &str, patterns: Option<&[String]>) -> Result<()> {
    let Some(patterns) = patterns else {
        return Ok(());
    };

    if patterns.is_empty() {
        return Err(ForrestError::config(format!(
            "`{field}` must contain at least one pattern when set"
        )));
    }

    for pat in patterns {
        if pat.trim().is_empty() {
            return Err(ForrestError::config(format!(
                "`{field}` contains an empty pattern"
            )));
        }
        if pat.contains(LIST_SEPARATOR) {
            return Err(ForrestError::config(format!(
                "pattern '{pat}' in `{field}` must not contain '{LIST_SEPARATOR}'"
            )));
        }
        GlobBuilder::new(pat).build().map_err(|e| {
            ForrestError::config(format!("invalid glob pattern '{pat}' in `{field}`: {e}"))
        })?;
    }
    Ok(())
}

fn validate_global_config(cfg: &RawRunConfiguration) -> Result<()> {
    if let Some(url) = &cfg.report_url {
        if url.trim().is_empty() {
            return Err(ForrestError::config("`report_url` must not be empty"));
        }
    }

    if cfg.poll_interval_ms == Some(0) {
        return Err(ForrestError::config(
            "`poll_interval_ms` must be >= 1 (got 0)",
        ));
    }

    if cfg.job_timeout_secs == Some(0) {
        return Err(ForrestError::config(
            "`job_timeout_secs` must be >= 1 (got 0)",
        ));
    }

    Ok(())
}

/// Checks that only matter once we know what the process is going to do.
///
/// A worker never looks at the watch root, and an idle process needs nothing
/// at all, so these are kept out of `TryFrom`.
pub fn validate_for_mode(cfg: &RunConfiguration, mode: Option<Mode>) -> Result<()> {
    let Some(mode) = mode else {
        return Ok(());
    };

    match mode {
        Mode::Watch => {
            ensure_readable_dir(cfg)?;
            if cfg.debug() {
                ensure_pipeline_cmd(cfg, "watch mode with --debug")?;
            }
        }
        Mode::Worker => ensure_pipeline_cmd(cfg, "worker mode")?,
        Mode::RunOnce => {
            if cfg.debug() {
                ensure_pipeline_cmd(cfg, "run-once mode with --debug")?;
            }
            if let Some(InputSource::Path(p)) = cfg.input_source() {
                if !p.is_file() {
                    return Err(ForrestError::config(format!(
                        "input file {:?} does not exist",
                        p
                    )));
                }
            }
        }
        Mode::Idle => {}
    }
    Ok(())
}

fn ensure_readable_dir(cfg: &RunConfiguration) -> Result<()> {
    let path = cfg.watch_path();
    if !path.is_dir() {
        return Err(ForrestError::config(format!(
            "watch path {:?} does not exist or is not a directory",
            path
        )));
    }
    fs::read_dir(path).map_err(|e| {
        ForrestError::config(format!("watch path {:?} is not readable: {e}", path))
    })?;
    Ok(())
}

fn ensure_pipeline_cmd(cfg: &RunConfiguration, what: &str) -> Result<()> {
    if cfg.pipeline_cmd().is_none() {
        return Err(ForrestError::config(format!(
            "{what} executes jobs in this process and requires --pipeline-cmd"
        )));
    }
    Ok(())
}
