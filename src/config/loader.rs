// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::cli::CliArgs;
use crate::config::model::{RawRunConfiguration, RunConfiguration};
use crate::config::validate::validate_for_mode;
use crate::errors::Result;

/// Load the optional TOML configuration file.
///
/// This only performs TOML deserialization; it does **not** validate. A
/// relative `path` in the file is resolved against the file's directory.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawRunConfiguration> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let mut raw: RawRunConfiguration = toml::from_str(&contents)?;

    if let (Some(watch), Some(parent)) = (raw.path.clone(), path.parent()) {
        if watch.is_relative() && !parent.as_os_str().is_empty() {
            raw.path = Some(parent.join(watch));
        }
    }

    Ok(raw)
}

/// Overlay CLI values on top of file values. CLI wins whenever it was given.
pub fn merge_cli(mut raw: RawRunConfiguration, args: &CliArgs) -> RawRunConfiguration {
    if let Some(p) = &args.path {
        raw.path = Some(p.clone());
    }
    if !args.patterns.is_empty() {
        raw.patterns = Some(args.patterns.clone());
    }
    if !args.ignore_patterns.is_empty() {
        raw.ignore_patterns = Some(args.ignore_patterns.clone());
    }
    raw.ignore_directories |= args.ignore_directories;
    raw.case_sensitive |= args.case_sensitive;
    raw.force |= args.force;
    raw.debug |= args.debug;
    raw.no_video |= args.no_video;
    raw.verbose |= args.verbose;

    if args.input.is_some() {
        raw.input = args.input.clone();
    }
    if args.report_url.is_some() {
        raw.report_url = args.report_url.clone();
    }
    if args.features_path.is_some() {
        raw.features_path = args.features_path.clone();
    }
    if args.logging_config.is_some() {
        raw.logging_config = args.logging_config.clone();
    }
    if args.pipeline_cmd.is_some() {
        raw.pipeline_cmd = args.pipeline_cmd.clone();
    }
    if args.queue_dir.is_some() {
        raw.queue_dir = args.queue_dir.clone();
    }
    if args.lock_dir.is_some() {
        raw.lock_dir = args.lock_dir.clone();
    }
    if let Some(w) = args.watcher {
        raw.watcher = w;
    }
    if args.poll_interval_ms.is_some() {
        raw.poll_interval_ms = args.poll_interval_ms;
    }
    if args.job_timeout_secs.is_some() {
        raw.job_timeout_secs = args.job_timeout_secs;
    }
    raw
}

/// Build the process-wide `RunConfiguration` from the CLI.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads the `--config` TOML file, if any.
/// - Overlays CLI flags.
/// - Applies defaults and validates globs and global sanity.
/// - Runs the checks specific to the selected mode.
///
/// Any error here is fatal; no mode has started yet.
pub fn load_and_validate(args: &CliArgs) -> Result<RunConfiguration> {
    let raw = match &args.config {
        Some(path) => load_from_path(path)?,
        None => RawRunConfiguration::default(),
    };
    let config = RunConfiguration::try_from(merge_cli(raw, args))?;
    validate_for_mode(&config, args.selected_mode())?;
    Ok(config)
}
