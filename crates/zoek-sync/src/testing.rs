//! Scripted [`CommandRunner`] for exercising the engine without git or an indexer.

use std::sync::Mutex;

use async_trait::async_trait;

use zoek_core::error::ZoekError;

use crate::runner::{CommandOutput, CommandRunner, Invocation};

/// Records every invocation and fakes the side effects the engine relies on.
///
/// A `clone` creates its destination directory (with an empty `.git`)
/// relative to the invocation's working directory, and
/// `rev-parse --abbrev-ref HEAD` answers `main`. Any invocation whose
/// command line contains a registered pattern exits with status 1.
#[derive(Default)]
pub struct ScriptedRunner {
    failures: Vec<String>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every invocation whose command line contains `pattern`.
    pub fn fail_on(mut self, pattern: impl Into<String>) -> Self {
        self.failures.push(pattern.into());
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Invocations whose first argument (after any `-C <dir>`) is `subcommand`.
    pub fn count(&self, subcommand: &str) -> usize {
        self.invocations()
            .iter()
            .filter(|inv| subcommand_of(inv) == Some(subcommand))
            .count()
    }
}

fn subcommand_of(inv: &Invocation) -> Option<&str> {
    match inv.args.first().map(String::as_str) {
        Some("-C") => inv.args.get(2).map(String::as_str),
        other => other,
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ZoekError> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(invocation.clone());

        let line = invocation.to_string();
        if self.failures.iter().any(|p| line.contains(p.as_str())) {
            return Ok(CommandOutput {
                stderr: format!("scripted failure: {line}"),
                success: false,
                code: Some(1),
                ..Default::default()
            });
        }

        let mut stdout = String::new();
        match subcommand_of(invocation) {
            Some("clone") => {
                if let (Some(dest), Some(cwd)) = (invocation.args.last(), &invocation.cwd) {
                    std::fs::create_dir_all(cwd.join(dest).join(".git"))?;
                }
            }
            Some("rev-parse") => stdout.push_str("main\n"),
            _ => {}
        }

        Ok(CommandOutput {
            stdout,
            success: true,
            code: Some(0),
            ..Default::default()
        })
    }
}
