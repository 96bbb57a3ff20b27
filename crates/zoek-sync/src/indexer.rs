use std::path::{Path, PathBuf};
use std::sync::Arc;

use zoek_core::error::ZoekError;
use zoek_core::models::sync_state::ExecutionResult;
use zoek_mirror::{clone_path, MirroredRepo};

use crate::runner::{CommandRunner, Invocation};

/// Triggers the external search indexer for mirrored repositories.
pub struct Indexer {
    runner: Arc<dyn CommandRunner>,
    program: String,
    mirror_root: PathBuf,
}

impl Indexer {
    pub fn new(runner: Arc<dyn CommandRunner>, program: String, mirror_root: PathBuf) -> Self {
        Self {
            runner,
            program,
            mirror_root,
        }
    }

    /// Index the clone of `name` into `index_root`. Failures are reported, never raised.
    pub async fn reindex(&self, name: &str, index_root: &Path) -> ExecutionResult {
        let path = clone_path(&self.mirror_root, name);
        self.index_one(name, &path, index_root).await
    }

    async fn index_one(&self, name: &str, repo_path: &Path, index_root: &Path) -> ExecutionResult {
        let result = self.reindex_path(repo_path, index_root).await;
        if let Err(e) = &result {
            tracing::error!("error while indexing repo {name}: {e}");
        }
        result
            .map_err(|e| ZoekError::IndexFailed {
                name: name.to_string(),
                message: e.to_string(),
            })
            .into()
    }

    async fn reindex_path(&self, repo_path: &Path, index_root: &Path) -> Result<String, ZoekError> {
        tokio::fs::create_dir_all(index_root).await?;
        let index_arg = index_root.to_string_lossy().to_string();
        let repo_arg = repo_path.to_string_lossy().to_string();
        let invocation = Invocation::new(&self.program, ["-index".to_string(), index_arg, repo_arg]);

        tracing::info!("indexing {}", repo_path.display());
        self.runner.run(&invocation).await?.into_result(&invocation)?;
        Ok(format!("indexed into {}", index_root.display()))
    }

    /// Index every repository already in the mirror, one after another.
    pub async fn reindex_all(
        &self,
        repos: &[MirroredRepo],
        index_root: &Path,
    ) -> Vec<(String, ExecutionResult)> {
        let mut results = Vec::with_capacity(repos.len());
        for repo in repos {
            let result = self.index_one(&repo.name, &repo.path, index_root).await;
            results.push((repo.name.clone(), result));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[tokio::test]
    async fn test_reindex_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let index_root = dir.path().join("index");
        let mirror = dir.path().join("repos");
        let runner = Arc::new(ScriptedRunner::new());
        let indexer = Indexer::new(runner.clone(), "zoekt-index".into(), mirror.clone());

        let result = indexer.reindex("a", &index_root).await;
        assert!(result.ok, "{}", result.message);
        assert!(index_root.is_dir());

        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "zoekt-index");
        assert_eq!(
            calls[0].args,
            vec![
                "-index".to_string(),
                index_root.to_string_lossy().to_string(),
                mirror.join("a").to_string_lossy().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_index_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail_on("zoekt-index"));
        let indexer = Indexer::new(runner, "zoekt-index".into(), dir.path().join("repos"));
        let result = indexer.reindex("a", &dir.path().join("index")).await;
        assert!(!result.ok);
        assert!(result.message.starts_with("indexing of a failed"));
    }

    #[tokio::test]
    async fn test_reindex_all_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mirror = dir.path().join("repos");
        let runner = Arc::new(ScriptedRunner::new().fail_on("/repos/b"));
        let indexer = Indexer::new(runner.clone(), "zoekt-index".into(), mirror.clone());
        let repos: Vec<MirroredRepo> = ["a", "b", "c"]
            .iter()
            .map(|n| MirroredRepo {
                name: n.to_string(),
                path: mirror.join(n),
            })
            .collect();

        let results = indexer.reindex_all(&repos, &dir.path().join("index")).await;
        let oks: Vec<bool> = results.iter().map(|(_, r)| r.ok).collect();
        assert_eq!(oks, vec![true, false, true]);
        assert_eq!(runner.invocations().len(), 3);
    }
}
