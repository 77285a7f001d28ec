// src/types.rs

use std::convert::Infallible;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which `notify` backend observes the watch root.
///
/// - `Native`: OS events (inotify, FSEvents, ...). Default.
/// - `Poll`: periodic scans. Needed for bind mounts and network volumes
///   where native events never arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherKind {
    #[default]
    Native,
    Poll,
}

impl FromStr for WatcherKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "native" => Ok(WatcherKind::Native),
            "poll" | "polling" => Ok(WatcherKind::Poll),
            other => Err(format!(
                "invalid watcher: {other} (expected \"native\" or \"poll\")"
            )),
        }
    }
}

impl fmt::Display for WatcherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatcherKind::Native => f.write_str("native"),
            WatcherKind::Poll => f.write_str("poll"),
        }
    }
}

/// Where a run-once job reads its input from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum InputSource {
    /// `-` on the command line.
    Stdin,
    Path(PathBuf),
}

impl FromStr for InputSource {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(InputSource::from(s.to_string()))
    }
}

impl From<String> for InputSource {
    fn from(s: String) -> Self {
        if s.trim() == "-" {
            InputSource::Stdin
        } else {
            InputSource::Path(PathBuf::from(s))
        }
    }
}

impl From<InputSource> for String {
    fn from(src: InputSource) -> Self {
        src.to_string()
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => f.write_str("-"),
            InputSource::Path(p) => write!(f, "{}", p.display()),
        }
    }
}
