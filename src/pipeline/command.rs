// src/pipeline/command.rs

//! Shell-command pipeline.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::backend::{JobInput, JobPayload};
use crate::errors::{ForrestError, Result};
use crate::pipeline::Pipeline;

/// Prefix for environment variables exported to the pipeline process.
pub const ENV_PREFIX: &str = "FORREST_";

/// Runs the configured command through the platform shell.
///
/// The process sees:
/// - every payload config key as `FORREST_<KEY>` (e.g. `FORREST_REPORT_URL`),
/// - `FORREST_JOB_ID`,
/// - `FORREST_INPUT` when the input is a file,
/// - inline input (from the submitter's stdin) on its own stdin.
#[derive(Debug, Clone)]
pub struct CommandPipeline {
    cmd: String,
}

impl CommandPipeline {
    pub fn new(cmd: impl Into<String>) -> Self {
        Self { cmd: cmd.into() }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    async fn run_inner(&self, payload: &JobPayload) -> Result<()> {
        info!(job_id = %payload.id, cmd = %self.cmd, "starting pipeline process");

        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&self.cmd);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&self.cmd);
            c
        };

        for (key, value) in &payload.config {
            cmd.env(env_key(key), value);
        }
        cmd.env(format!("{ENV_PREFIX}JOB_ID"), payload.id.as_str());

        let inline = match &payload.input {
            JobInput::None => None,
            JobInput::Path(p) => {
                cmd.env(format!("{ENV_PREFIX}INPUT"), p);
                None
            }
            JobInput::Inline(text) => Some(text.clone()),
        };

        cmd.stdin(if inline.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning pipeline process `{}`", self.cmd))?;

        if let (Some(text), Some(mut stdin)) = (inline, child.stdin.take()) {
            let job_id = payload.id.clone();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(text.as_bytes()).await {
                    warn!(job_id = %job_id, error = %e, "failed to write input to pipeline stdin");
                }
                // Dropping `stdin` closes the pipe.
            });
        }

        if let Some(stdout) = child.stdout.take() {
            let job_id = payload.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    info!(job_id = %job_id, "stdout: {}", line);
                }
            });
        }

        // Always consume stderr so buffers don't fill; log at debug.
        if let Some(stderr) = child.stderr.take() {
            let job_id = payload.id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(job_id = %job_id, "stderr: {}", line);
                }
            });
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for pipeline process `{}`", self.cmd))?;

        let code = status.code().unwrap_or(-1);
        info!(
            job_id = %payload.id,
            exit_code = code,
            success = status.success(),
            "pipeline process exited"
        );

        if status.success() {
            Ok(())
        } else {
            Err(ForrestError::PipelineFailed { code })
        }
    }
}

impl Pipeline for CommandPipeline {
    fn run<'a>(
        &'a self,
        payload: &'a JobPayload,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(self.run_inner(payload))
    }
}

/// `report_url` -> `FORREST_REPORT_URL`.
pub fn env_key(key: &str) -> String {
    let mut out = String::with_capacity(ENV_PREFIX.len() + key.len());
    out.push_str(ENV_PREFIX);
    for c in key.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    out
}
