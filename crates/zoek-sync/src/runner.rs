use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use zoek_core::error::ZoekError;

/// One external process call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of an external process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Turn a non-zero exit into [`ZoekError::CommandFailed`].
    pub fn into_result(self, invocation: &Invocation) -> Result<String, ZoekError> {
        if self.success {
            return Ok(self.stdout);
        }
        let detail = self.stderr.trim();
        let message = match (self.code, detail.is_empty()) {
            (Some(code), true) => format!("exit code {code}"),
            (Some(code), false) => format!("exit code {code}: {detail}"),
            (None, true) => "terminated by signal".to_string(),
            (None, false) => format!("terminated by signal: {detail}"),
        };
        Err(ZoekError::CommandFailed {
            command: invocation.to_string(),
            message,
        })
    }
}

/// Seam between the sync engine and the processes it drives.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. A non-zero exit is a successful call with
    /// `success == false`; `Err` means the process could not be run at all.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ZoekError>;
}

/// Runs real child processes with a sanitized environment.
pub struct ProcessRunner {
    env_remove: Vec<String>,
    cancel: CancellationToken,
    grace: Duration,
}

impl ProcessRunner {
    pub fn new(env_remove: Vec<String>, cancel: CancellationToken, grace: Duration) -> Self {
        Self {
            env_remove,
            cancel,
            grace,
        }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ZoekError> {
        if self.cancel.is_cancelled() {
            return Err(ZoekError::Cancelled {
                message: format!("{invocation} not started"),
            });
        }

        let mut cmd = tokio::process::Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }
        for var in &self.env_remove {
            cmd.env_remove(var);
        }

        tracing::debug!("running {invocation}");
        let child = cmd.spawn().map_err(|e| ZoekError::CommandFailed {
            command: invocation.to_string(),
            message: format!("could not start {}: {e}", invocation.program),
        })?;

        // Dropping the future drops the child, which kills it.
        let wait = child.wait_with_output();
        tokio::pin!(wait);
        let output = tokio::select! {
            res = &mut wait => res?,
            _ = self.cancel.cancelled() => {
                tracing::warn!(
                    "cancellation requested, giving {invocation} {}s to finish",
                    self.grace.as_secs()
                );
                match tokio::time::timeout(self.grace, &mut wait).await {
                    Ok(res) => res?,
                    Err(_) => {
                        return Err(ZoekError::Cancelled {
                            message: format!("{invocation} killed after grace period"),
                        })
                    }
                }
            }
        };

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}
