// src/watch/filter.rs

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::config::RunConfiguration;
use crate::errors::{ForrestError, Result};
use crate::watch::event::ChangeEvent;

/// Compiled include/exclude rules deciding which changes trigger a job.
///
/// Patterns are matched against the full event path. `*` also crosses `/`,
/// so `*.yml` matches `/opt/dropzone/nested/suite.yml`.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
    ignore_directories: bool,
}

impl ChangeFilter {
    pub fn from_config(config: &RunConfiguration) -> Result<Self> {
        let case_sensitive = config.case_sensitive();
        Ok(Self {
            include: compile(config.patterns(), case_sensitive)?,
            exclude: compile(config.ignore_patterns(), case_sensitive)?,
            ignore_directories: config.ignore_directories(),
        })
    }

    /// True when `event` should trigger a dispatch.
    ///
    /// Directory suppression wins over everything, and an ignore match wins
    /// over an include match.
    pub fn qualifies(&self, event: &ChangeEvent) -> bool {
        if self.ignore_directories && event.is_directory {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(&event.path) {
                return false;
            }
        }
        match &self.include {
            Some(include) => include.is_match(&event.path),
            None => true,
        }
    }
}

/// One-off check without keeping the compiled filter around.
pub fn qualifies(event: &ChangeEvent, config: &RunConfiguration) -> bool {
    match ChangeFilter::from_config(config) {
        Ok(filter) => filter.qualifies(event),
        Err(err) => {
            warn!(error = %err, "change filter could not be built; rejecting event");
            false
        }
    }
}

fn compile(patterns: Option<&[String]>, case_sensitive: bool) -> Result<Option<GlobSet>> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };

    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .case_insensitive(!case_sensitive)
            .build()
            .map_err(|e| ForrestError::config(format!("invalid glob pattern '{pat}': {e}")))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| ForrestError::config(format!("failed to build glob set: {e}")))?;
    Ok(Some(set))
}
