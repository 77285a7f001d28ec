// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::errors::{ForrestError, Result};
use crate::types::{InputSource, WatcherKind};

pub const DEFAULT_WATCH_PATH: &str = "/opt/dropzone";
pub const DEFAULT_REPORT_URL: &str = "http://reports:3000/";
pub const DEFAULT_FEATURES_PATH: &str = "/app/veripy/features/app";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Separator used when list options are flattened into the job payload.
pub const LIST_SEPARATOR: char = ';';

/// Unvalidated configuration as read from the optional TOML file and the CLI.
///
/// ```toml
/// path = "/opt/dropzone"
/// patterns = ["*.yml"]
/// ignore_patterns = ["*/.git/*"]
/// ignore_directories = true
/// pipeline_cmd = "veripy run"
/// watcher = "poll"
/// ```
///
/// Every field is optional; [`RunConfiguration::try_from`] applies defaults
/// and validates.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawRunConfiguration {
    pub path: Option<PathBuf>,
    pub patterns: Option<Vec<String>>,
    pub ignore_patterns: Option<Vec<String>>,
    pub ignore_directories: bool,
    pub case_sensitive: bool,
    pub force: bool,
    pub debug: bool,
    pub input: Option<InputSource>,
    pub report_url: Option<String>,
    pub features_path: Option<PathBuf>,
    pub logging_config: Option<PathBuf>,
    pub no_video: bool,
    pub verbose: bool,
    pub pipeline_cmd: Option<String>,
    pub queue_dir: Option<PathBuf>,
    pub lock_dir: Option<PathBuf>,
    pub watcher: WatcherKind,
    pub poll_interval_ms: Option<u64>,
    pub job_timeout_secs: Option<u64>,
}

/// Immutable snapshot of every operating parameter.
///
/// Built exactly once per process (see [`crate::config::loader`]) and shared
/// as `Arc<RunConfiguration>`. There are no setters.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfiguration {
    watch_path: PathBuf,
    patterns: Option<Vec<String>>,
    ignore_patterns: Option<Vec<String>>,
    ignore_directories: bool,
    case_sensitive: bool,
    force: bool,
    debug: bool,
    input_source: Option<InputSource>,
    report_url: String,
    features_path: PathBuf,
    logging_config: Option<PathBuf>,
    no_video: bool,
    verbose: bool,
    pipeline_cmd: Option<String>,
    queue_dir: PathBuf,
    lock_dir: PathBuf,
    watcher: WatcherKind,
    poll_interval: Duration,
    job_timeout: Option<Duration>,
}

impl RunConfiguration {
    /// Apply defaults without validating. Only reachable through `TryFrom`.
    pub(crate) fn new_unchecked(raw: RawRunConfiguration) -> Self {
        let runtime_dir = std::env::temp_dir().join("forrest");
        Self {
            watch_path: raw.path.unwrap_or_else(|| PathBuf::from(DEFAULT_WATCH_PATH)),
            patterns: raw.patterns,
            ignore_patterns: raw.ignore_patterns,
            ignore_directories: raw.ignore_directories,
            case_sensitive: raw.case_sensitive,
            force: raw.force,
            debug: raw.debug,
            input_source: raw.input,
            report_url: raw
                .report_url
                .unwrap_or_else(|| DEFAULT_REPORT_URL.to_string()),
            features_path: raw
                .features_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FEATURES_PATH)),
            logging_config: raw.logging_config,
            no_video: raw.no_video,
            verbose: raw.verbose,
            pipeline_cmd: raw.pipeline_cmd.filter(|c| !c.trim().is_empty()),
            queue_dir: raw.queue_dir.unwrap_or_else(|| runtime_dir.join("queue")),
            lock_dir: raw.lock_dir.unwrap_or_else(|| runtime_dir.join("locks")),
            watcher: raw.watcher,
            poll_interval: Duration::from_millis(
                raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            job_timeout: raw.job_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }

    pub fn patterns(&self) -> Option<&[String]> {
        self.patterns.as_deref()
    }

    pub fn ignore_patterns(&self) -> Option<&[String]> {
        self.ignore_patterns.as_deref()
    }

    pub fn ignore_directories(&self) -> bool {
        self.ignore_directories
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn input_source(&self) -> Option<&InputSource> {
        self.input_source.as_ref()
    }

    pub fn report_url(&self) -> &str {
        &self.report_url
    }

    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    pub fn logging_config(&self) -> Option<&Path> {
        self.logging_config.as_deref()
    }

    pub fn no_video(&self) -> bool {
        self.no_video
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn pipeline_cmd(&self) -> Option<&str> {
        self.pipeline_cmd.as_deref()
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue_dir
    }

    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    pub fn watcher(&self) -> WatcherKind {
        self.watcher
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout
    }

    /// Flatten into the string map that travels inside a job payload.
    ///
    /// Lists are joined with [`LIST_SEPARATOR`]; unset options are omitted.
    pub fn to_payload(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        let mut put = |k: &str, v: String| {
            map.insert(k.to_string(), v);
        };

        put("path", self.watch_path.display().to_string());
        if let Some(p) = &self.patterns {
            put("patterns", join_list(p));
        }
        if let Some(p) = &self.ignore_patterns {
            put("ignore_patterns", join_list(p));
        }
        put("ignore_directories", self.ignore_directories.to_string());
        put("case_sensitive", self.case_sensitive.to_string());
        put("force", self.force.to_string());
        put("debug", self.debug.to_string());
        if let Some(input) = &self.input_source {
            put("input", input.to_string());
        }
        put("report_url", self.report_url.clone());
        put("features_path", self.features_path.display().to_string());
        if let Some(p) = &self.logging_config {
            put("logging_config", p.display().to_string());
        }
        put("no_video", self.no_video.to_string());
        put("verbose", self.verbose.to_string());
        if let Some(cmd) = &self.pipeline_cmd {
            put("pipeline_cmd", cmd.clone());
        }
        put("queue_dir", self.queue_dir.display().to_string());
        put("lock_dir", self.lock_dir.display().to_string());
        put("watcher", self.watcher.to_string());
        put(
            "poll_interval_ms",
            self.poll_interval.as_millis().to_string(),
        );
        if let Some(t) = self.job_timeout {
            put("job_timeout_secs", t.as_secs().to_string());
        }

        map
    }

    /// Rebuild a configuration snapshot from a payload map.
    ///
    /// Unknown keys are ignored so newer submitters can talk to older workers.
    pub fn from_payload(map: &BTreeMap<String, String>) -> Result<Self> {
        let raw = RawRunConfiguration {
            path: map.get("path").map(PathBuf::from),
            patterns: map.get("patterns").map(|s| split_list(s)),
            ignore_patterns: map.get("ignore_patterns").map(|s| split_list(s)),
            ignore_directories: payload_bool(map, "ignore_directories")?,
            case_sensitive: payload_bool(map, "case_sensitive")?,
            force: payload_bool(map, "force")?,
            debug: payload_bool(map, "debug")?,
            input: map.get("input").cloned().map(InputSource::from),
            report_url: map.get("report_url").cloned(),
            features_path: map.get("features_path").map(PathBuf::from),
            logging_config: map.get("logging_config").map(PathBuf::from),
            no_video: payload_bool(map, "no_video")?,
            verbose: payload_bool(map, "verbose")?,
            pipeline_cmd: map.get("pipeline_cmd").cloned(),
            queue_dir: map.get("queue_dir").map(PathBuf::from),
            lock_dir: map.get("lock_dir").map(PathBuf::from),
            watcher: match map.get("watcher") {
                Some(s) => s.parse().map_err(ForrestError::Config)?,
                None => WatcherKind::default(),
            },
            poll_interval_ms: payload_u64(map, "poll_interval_ms")?,
            job_timeout_secs: payload_u64(map, "job_timeout_secs")?,
        };
        RunConfiguration::try_from(raw)
    }
}

fn join_list(items: &[String]) -> String {
    items.join(&LIST_SEPARATOR.to_string())
}

fn split_list(s: &str) -> Vec<String> {
    s.split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn payload_bool(map: &BTreeMap<String, String>, key: &str) -> Result<bool> {
    match map.get(key).map(|s| s.trim()) {
        None => Ok(false),
        Some("true") => Ok(true),
        Some("false") => Ok(false),
        Some(other) => Err(ForrestError::config(format!(
            "payload key '{key}' must be true or false (got '{other}')"
        ))),
    }
}

fn payload_u64(map: &BTreeMap<String, String>, key: &str) -> Result<Option<u64>> {
    map.get(key)
        .map(|s| {
            s.trim().parse::<u64>().map_err(|e| {
                ForrestError::config(format!("payload key '{key}' is not a number: {e}"))
            })
        })
        .transpose()
}
