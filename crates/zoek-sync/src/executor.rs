use std::path::{Path, PathBuf};
use std::sync::Arc;

use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;
use zoek_core::models::sync_state::{CloneMode, ExecutionResult, SyncDecision};
use zoek_mirror::{clone_path, stale_staging, staging_path};

use crate::git_ops::Git;
use crate::runner::CommandRunner;

/// Carries out a [`SyncDecision`] against the mirror root.
pub struct Executor {
    runner: Arc<dyn CommandRunner>,
    git_program: String,
    mirror_root: PathBuf,
    mode: CloneMode,
}

impl Executor {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        git_program: String,
        mirror_root: PathBuf,
        mode: CloneMode,
    ) -> Self {
        Self {
            runner,
            git_program,
            mirror_root,
            mode,
        }
    }

    pub fn mirror_root(&self) -> &Path {
        &self.mirror_root
    }

    fn git(&self) -> Git<'_> {
        Git::new(self.runner.as_ref(), &self.git_program)
    }

    /// Perform the decision. Failures are reported in the result, never raised.
    pub async fn execute(&self, decision: &SyncDecision) -> ExecutionResult {
        let record = decision.record();
        let result = match decision {
            SyncDecision::CloneNew(r) => self.clone_new(r).await.map_err(|e| ZoekError::CloneFailed {
                name: r.name.clone(),
                message: e.to_string(),
            }),
            SyncDecision::PullExisting(r) => self.pull_existing(r).await.map_err(|e| ZoekError::PullFailed {
                name: r.name.clone(),
                message: e.to_string(),
            }),
            SyncDecision::SkipTooBig(r) => {
                let size = r
                    .disk_usage
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "unknown".into());
                tracing::warn!("skipping repo {}, too big ({size})", r.name);
                Ok(format!("skipped, too big ({size})"))
            }
            SyncDecision::SkipNoUrl(r) => {
                tracing::warn!("could not clone/pull {:?}: no clone URL or unusable name", r.name);
                Ok("skipped, no clone URL or unusable name".to_string())
            }
        };

        if let Err(e) = &result {
            tracing::error!("{}: {e}", record.name);
        }
        result.into()
    }

    async fn clone_new(&self, record: &RepositoryRecord) -> Result<String, ZoekError> {
        let name = record.dir_name().ok_or_else(|| ZoekError::InvalidRecord {
            reason: format!("{:?} is not a usable directory name", record.name),
        })?;
        let url = record.clone_url().ok_or_else(|| ZoekError::InvalidRecord {
            reason: format!("{name} has no clone URL"),
        })?;

        tokio::fs::create_dir_all(&self.mirror_root).await?;
        let target = clone_path(&self.mirror_root, name);
        let staging = staging_path(&self.mirror_root, name);

        if tokio::fs::symlink_metadata(&target).await.is_ok() {
            return Err(ZoekError::CommandFailed {
                command: "clone".into(),
                message: format!("{} already exists", target.display()),
            });
        }
        if stale_staging(&self.mirror_root, name) {
            tracing::warn!("{name}: removing interrupted clone at {}", staging.display());
            remove_path(&staging).await?;
        }

        let staging_name = staging
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::info!("{name}: cloning {url} ({})", self.mode);
        if let Err(e) = self
            .git()
            .clone(url, &staging_name, &self.mirror_root, self.mode)
            .await
        {
            discard(&staging).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            discard(&staging).await;
            return Err(e.into());
        }
        Ok(format!("cloned {url} into {}", target.display()))
    }

    async fn pull_existing(&self, record: &RepositoryRecord) -> Result<String, ZoekError> {
        let name = record.dir_name().ok_or_else(|| ZoekError::InvalidRecord {
            reason: format!("{:?} is not a usable directory name", record.name),
        })?;
        let path = clone_path(&self.mirror_root, name);

        tracing::info!("{name}: updating {} ({})", path.display(), self.mode);
        match self.mode {
            CloneMode::Full => self.git().pull(&path).await?,
            CloneMode::Shallow => self.git().update_shallow(&path).await?,
        }
        Ok(format!("updated {}", path.display()))
    }
}

async fn remove_path(path: &Path) -> std::io::Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
        Ok(_) => tokio::fs::remove_file(path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn discard(path: &Path) {
    if let Err(e) = remove_path(path).await {
        tracing::warn!("could not remove {}: {e}", path.display());
    }
}
