use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use zoek_core::models::record::RepositoryRecord;
use zoek_core::models::sync_state::{
    DecisionKind, IndexStatus, LocalCloneState, OversizedExisting, Outcome, RepoReport,
    SyncDecision,
};
use zoek_mirror::probe;

use crate::executor::Executor;
use crate::indexer::Indexer;
use crate::planner::plan;

/// Everything a single repository pipeline needs, shared read-only by all workers.
pub struct PipelineContext {
    pub executor: Executor,
    pub indexer: Indexer,
    pub mirror_root: PathBuf,
    pub index_root: PathBuf,
    pub max_size: Option<u64>,
    pub oversized_existing: OversizedExisting,
    pub index: bool,
    pub cancel: CancellationToken,
}

impl PipelineContext {
    /// Probe the mirror and plan, without side effects.
    pub fn decide(&self, record: Arc<RepositoryRecord>) -> (LocalCloneState, SyncDecision) {
        let state = match record.dir_name() {
            Some(name) => probe(name, &self.mirror_root),
            None => LocalCloneState::Absent,
        };
        let decision = plan(record, state, self.max_size, self.oversized_existing);
        (state, decision)
    }
}

/// Whether the indexer runs after this decision and execution result.
///
/// Clones and pulls are indexed when they succeeded; an oversized
/// repository that is already on disk keeps being indexed.
fn wants_index(kind: DecisionKind, executed_ok: bool, state: LocalCloneState) -> bool {
    match kind {
        DecisionKind::CloneNew | DecisionKind::PullExisting => executed_ok,
        DecisionKind::SkipTooBig => state == LocalCloneState::PresentClean,
        DecisionKind::SkipNoUrl => false,
    }
}

/// Probe, plan, execute and index one repository.
///
/// Never fails: every problem ends up in the returned report.
pub async fn sync_repository(ctx: &PipelineContext, record: Arc<RepositoryRecord>) -> RepoReport {
    let mut report = RepoReport::new(record.name.clone());

    let (state, decision) = ctx.decide(record);
    let kind = decision.kind();
    report.decision = Some(kind);
    tracing::info!("{}: {state}, {kind}", report.name);

    let executed = ctx.executor.execute(&decision).await;
    report.messages.push(executed.message.clone());
    report.outcome = match (kind, executed.ok) {
        (_, false) if ctx.cancel.is_cancelled() => Outcome::Cancelled,
        (_, false) => Outcome::Failed,
        (DecisionKind::CloneNew, true) => Outcome::Cloned,
        (DecisionKind::PullExisting, true) => Outcome::Pulled,
        (DecisionKind::SkipTooBig, true) => Outcome::SkippedTooBig,
        (DecisionKind::SkipNoUrl, true) => Outcome::SkippedNoUrl,
    };

    if ctx.index && !ctx.cancel.is_cancelled() && wants_index(kind, executed.ok, state) {
        let indexed = ctx.indexer.reindex(&report.name, &ctx.index_root).await;
        report.messages.push(indexed.message.clone());
        report.index = Some(if indexed.ok {
            IndexStatus::Indexed
        } else {
            IndexStatus::IndexFailed
        });
    }

    report.finished_at = Utc::now();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use crate::runner::CommandRunner;
    use zoek_core::models::sync_state::CloneMode;

    fn context(runner: Arc<ScriptedRunner>, root: &std::path::Path, max_size: Option<u64>, policy: OversizedExisting) -> PipelineContext {
        let mirror_root = root.join("repos");
        let runner: Arc<dyn CommandRunner> = runner;
        PipelineContext {
            executor: Executor::new(runner.clone(), "git".into(), mirror_root.clone(), CloneMode::Shallow),
            indexer: Indexer::new(runner, "zoekt-index".into(), mirror_root.clone()),
            mirror_root,
            index_root: root.join("index"),
            max_size,
            oversized_existing: policy,
            index: true,
            cancel: CancellationToken::new(),
        }
    }

    fn rec(name: &str, size: Option<u64>) -> Arc<RepositoryRecord> {
        let mut r = RepositoryRecord::new(name, Some(format!("git@x:{name}")));
        r.disk_usage = size;
        Arc::new(r)
    }

    #[test]
    fn test_index_trigger_table() {
        use DecisionKind::*;
        use LocalCloneState::*;
        assert!(wants_index(CloneNew, true, Absent));
        assert!(!wants_index(CloneNew, false, Absent));
        assert!(wants_index(PullExisting, true, PresentClean));
        assert!(!wants_index(PullExisting, false, PresentClean));
        assert!(wants_index(SkipTooBig, true, PresentClean));
        assert!(!wants_index(SkipTooBig, true, Absent));
        assert!(!wants_index(SkipNoUrl, true, PresentClean));
    }

    #[tokio::test]
    async fn test_clone_then_index() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), dir.path(), None, OversizedExisting::Pull);

        let report = sync_repository(&ctx, rec("a", Some(1))).await;
        assert_eq!(report.decision, Some(DecisionKind::CloneNew));
        assert_eq!(report.outcome, Outcome::Cloned);
        assert_eq!(report.index, Some(IndexStatus::Indexed));
        assert_eq!(runner.count("-index"), 1);
    }

    #[tokio::test]
    async fn test_failed_clone_is_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail_on("clone"));
        let ctx = context(runner.clone(), dir.path(), None, OversizedExisting::Pull);

        let report = sync_repository(&ctx, rec("a", None)).await;
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.index, None);
        assert_eq!(runner.count("-index"), 0);
    }

    #[tokio::test]
    async fn test_index_failure_keeps_clone() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail_on("zoekt-index"));
        let ctx = context(runner, dir.path(), None, OversizedExisting::Pull);

        let report = sync_repository(&ctx, rec("a", None)).await;
        assert_eq!(report.outcome, Outcome::Cloned);
        assert_eq!(report.index, Some(IndexStatus::IndexFailed));
        assert!(dir.path().join("repos").join("a").is_dir());
        assert!(report.is_failure());
    }

    #[tokio::test]
    async fn test_frozen_oversized_clone_still_indexed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repos").join("big")).unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), dir.path(), Some(10), OversizedExisting::Skip);

        let report = sync_repository(&ctx, rec("big", Some(100))).await;
        assert_eq!(report.outcome, Outcome::SkippedTooBig);
        assert_eq!(report.index, Some(IndexStatus::Indexed));
        assert_eq!(runner.count("pull"), 0);
        assert_eq!(runner.count("fetch"), 0);
    }

    #[tokio::test]
    async fn test_new_oversized_repo_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(runner.clone(), dir.path(), Some(10), OversizedExisting::Pull);

        let report = sync_repository(&ctx, rec("big", Some(100))).await;
        assert_eq!(report.outcome, Outcome::SkippedTooBig);
        assert_eq!(report.index, None);
        assert!(runner.invocations().is_empty());
    }
}
