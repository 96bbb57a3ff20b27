use std::path::Path;

use zoek_core::error::ZoekError;
use zoek_core::models::sync_state::CloneMode;

use crate::runner::{CommandRunner, Invocation};

/// Shallow clone flags: newest commit of the default branch, blobs on demand.
pub const SHALLOW_CLONE_FLAGS: &[&str] = &["--single-branch", "--filter=blob:none", "--depth=1"];

/// git commands used by the executor, run through a [`CommandRunner`].
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    program: &'a str,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: &'a str) -> Self {
        Self { runner, program }
    }

    /// Run `git -C <dir> <args>`, returning stdout or an error on non-zero exit.
    async fn git_in(&self, dir: &Path, args: &[&str]) -> Result<String, ZoekError> {
        let dir_str = dir.to_string_lossy();
        let mut full: Vec<&str> = vec!["-C", &*dir_str];
        full.extend_from_slice(args);
        let invocation = Invocation::new(self.program, full);
        self.runner.run(&invocation).await?.into_result(&invocation)
    }

    /// Clone `url` into `dest`, relative to `cwd`.
    pub async fn clone(
        &self,
        url: &str,
        dest: &str,
        cwd: &Path,
        mode: CloneMode,
    ) -> Result<(), ZoekError> {
        let mut args = vec!["clone"];
        if mode == CloneMode::Shallow {
            args.extend_from_slice(SHALLOW_CLONE_FLAGS);
        }
        args.push(url);
        args.push(dest);
        let invocation = Invocation::new(self.program, args).in_dir(cwd);
        self.runner.run(&invocation).await?.into_result(&invocation)?;
        Ok(())
    }

    /// Fast-forward with full history.
    pub async fn pull(&self, dir: &Path) -> Result<(), ZoekError> {
        self.git_in(dir, &["pull"]).await?;
        Ok(())
    }

    /// Get the current branch name.
    pub async fn current_branch(&self, dir: &Path) -> Result<String, ZoekError> {
        let stdout = self.git_in(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let branch = stdout.trim();
        if branch.is_empty() || branch == "HEAD" {
            return Err(ZoekError::CommandFailed {
                command: format!("{} rev-parse", self.program),
                message: format!("{} is not on a branch", dir.display()),
            });
        }
        Ok(branch.to_string())
    }

    /// Update a shallow clone to the newest remote commit of its branch,
    /// discarding local history and untracked files.
    pub async fn update_shallow(&self, dir: &Path) -> Result<(), ZoekError> {
        let branch = self.current_branch(dir).await?;
        self.git_in(dir, &["fetch", "--depth", "1"]).await?;
        let remote_ref = format!("origin/{branch}");
        self.git_in(dir, &["reset", "--hard", &remote_ref]).await?;
        self.git_in(dir, &["clean", "-dfx"]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[tokio::test]
    async fn test_shallow_clone_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        Git::new(&runner, "git")
            .clone("git@x:a", ".a.zoek-partial", dir.path(), CloneMode::Shallow)
            .await
            .unwrap();
        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].to_string(),
            "git clone --single-branch --filter=blob:none --depth=1 git@x:a .a.zoek-partial"
        );
        assert_eq!(calls[0].cwd.as_deref(), Some(dir.path()));
    }

    #[tokio::test]
    async fn test_full_clone_has_no_depth() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        Git::new(&runner, "git")
            .clone("git@x:a", "a", dir.path(), CloneMode::Full)
            .await
            .unwrap();
        assert_eq!(runner.invocations()[0].to_string(), "git clone git@x:a a");
    }

    #[tokio::test]
    async fn test_shallow_update_sequence() {
        let runner = ScriptedRunner::new();
        Git::new(&runner, "git")
            .update_shallow(Path::new("/m/a"))
            .await
            .unwrap();
        let calls: Vec<String> = runner.invocations().iter().map(|i| i.to_string()).collect();
        assert_eq!(
            calls,
            vec![
                "git -C /m/a rev-parse --abbrev-ref HEAD",
                "git -C /m/a fetch --depth 1",
                "git -C /m/a reset --hard origin/main",
                "git -C /m/a clean -dfx",
            ]
        );
    }

    #[tokio::test]
    async fn test_shallow_update_stops_on_fetch_failure() {
        let runner = ScriptedRunner::new().fail_on("fetch");
        let err = Git::new(&runner, "git")
            .update_shallow(Path::new("/m/a"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("fetch"));
        assert_eq!(runner.invocations().len(), 2);
    }
}
