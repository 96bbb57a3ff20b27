use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use zoek_core::models::record::RepositoryRecord;
use zoek_core::models::sync_state::{
    CloneMode, DecisionKind, LocalCloneState, OversizedExisting, Outcome, RepoReport,
};

use crate::executor::Executor;
use crate::gate::RepoGate;
use crate::indexer::Indexer;
use crate::pipeline::{sync_repository, PipelineContext};
use crate::runner::CommandRunner;

/// Knobs for one synchronization run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub mirror_root: PathBuf,
    pub index_root: PathBuf,
    pub max_size: Option<u64>,
    pub oversized_existing: OversizedExisting,
    pub clone_mode: CloneMode,
    pub git_program: String,
    pub indexer_program: String,
    pub concurrency: usize,
    pub index: bool,
    pub show_progress: bool,
}

impl SyncOptions {
    pub fn new(mirror_root: impl Into<PathBuf>, index_root: impl Into<PathBuf>) -> Self {
        Self {
            mirror_root: mirror_root.into(),
            index_root: index_root.into(),
            max_size: None,
            oversized_existing: OversizedExisting::default(),
            clone_mode: CloneMode::default(),
            git_program: "git".into(),
            indexer_program: "zoekt-index".into(),
            concurrency: 4,
            index: true,
            show_progress: false,
        }
    }
}

/// What a run would do to one repository, as reported by a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedRepo {
    pub name: String,
    pub state: LocalCloneState,
    pub decision: DecisionKind,
}

/// Runs repository pipelines in parallel with a concurrency limit.
pub struct SyncEngine {
    ctx: Arc<PipelineContext>,
    gate: Arc<RepoGate>,
    concurrency: usize,
    show_progress: bool,
    cancel: CancellationToken,
}

impl SyncEngine {
    pub fn new(
        options: SyncOptions,
        runner: Arc<dyn CommandRunner>,
        cancel: CancellationToken,
    ) -> Self {
        let executor = Executor::new(
            runner.clone(),
            options.git_program,
            options.mirror_root.clone(),
            options.clone_mode,
        );
        let indexer = Indexer::new(runner, options.indexer_program, options.mirror_root.clone());
        let ctx = PipelineContext {
            executor,
            indexer,
            mirror_root: options.mirror_root,
            index_root: options.index_root,
            max_size: options.max_size,
            oversized_existing: options.oversized_existing,
            index: options.index,
            cancel: cancel.clone(),
        };
        Self {
            ctx: Arc::new(ctx),
            gate: RepoGate::new(),
            concurrency: options.concurrency.max(1),
            show_progress: options.show_progress,
            cancel,
        }
    }

    /// Probe and plan every record without touching the mirror.
    pub fn plan_all(&self, records: &[RepositoryRecord]) -> Vec<PlannedRepo> {
        records
            .iter()
            .map(|record| {
                let (state, decision) = self.ctx.decide(Arc::new(record.clone()));
                PlannedRepo {
                    name: record.name.clone(),
                    state,
                    decision: decision.kind(),
                }
            })
            .collect()
    }

    /// Synchronize every record. One report per record, in input order.
    ///
    /// Only the first entry for a name is synchronized; later ones are
    /// reported as [`Outcome::SkippedDuplicate`]. A cancelled run stops
    /// dispatching, and repositories that never started are reported as
    /// cancelled.
    pub async fn run(&self, records: Vec<RepositoryRecord>) -> Vec<RepoReport> {
        let run_id = Uuid::now_v7();
        let span = tracing::info_span!("sync", run = %run_id);
        self.run_all(records).instrument(span).await
    }

    async fn run_all(&self, records: Vec<RepositoryRecord>) -> Vec<RepoReport> {
        tracing::info!(
            "synchronizing {} repositories, {} at a time",
            records.len(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let multi = MultiProgress::with_draw_target(if self.show_progress {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        });
        let style = ProgressStyle::with_template("{spinner:.green} {msg}")
            .map(|s| s.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
        let mut reports: Vec<Option<RepoReport>> = names.iter().map(|_| None).collect();
        let mut dispatched = vec![false; names.len()];
        let mut seen = HashSet::new();
        let mut tasks = JoinSet::new();

        for (index, record) in records.into_iter().enumerate() {
            if !seen.insert(record.name.clone()) {
                tracing::warn!("{}: listed more than once, keeping the first entry", record.name);
                let mut report = RepoReport::new(record.name.clone());
                report.outcome = Outcome::SkippedDuplicate;
                report.messages.push("duplicate catalog entry".into());
                reports[index] = Some(report);
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                permit = semaphore.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                tracing::warn!("run cancelled, not starting remaining repositories");
                break;
            };

            // Another run on this engine may hold the name.
            let Some(guard) = self.gate.try_enter(&record.name) else {
                tracing::warn!("{}: already being synchronized by another run", record.name);
                let mut report = RepoReport::new(record.name.clone());
                report.outcome = Outcome::Failed;
                report.messages.push("already being synchronized".into());
                reports[index] = Some(report);
                continue;
            };

            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(style.clone());
            pb.set_message(format!("syncing {}", record.name));
            pb.enable_steady_tick(Duration::from_millis(120));

            let ctx = Arc::clone(&self.ctx);
            dispatched[index] = true;
            tasks.spawn(
                async move {
                    let _permit = permit;
                    let _guard = guard;
                    let report = sync_repository(&ctx, Arc::new(record)).await;
                    pb.finish_with_message(format!("{}: {}", report.name, report.outcome));
                    (index, report)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => reports[index] = Some(report),
                Err(e) => tracing::error!("sync task failed: {e}"),
            }
        }

        reports
            .into_iter()
            .zip(names)
            .zip(dispatched)
            .map(|((report, name), was_dispatched)| match report {
                Some(report) => report,
                None if was_dispatched => {
                    let mut report = RepoReport::new(name);
                    report.outcome = Outcome::Failed;
                    report.messages.push("sync task aborted".into());
                    report
                }
                None => RepoReport::cancelled(name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use zoek_core::error::ZoekError;
    use zoek_core::models::sync_state::{IndexStatus, SyncSummary};

    use crate::runner::{CommandOutput, Invocation};
    use crate::testing::ScriptedRunner;

    fn records(names: &[&str]) -> Vec<RepositoryRecord> {
        names
            .iter()
            .map(|n| RepositoryRecord::new(*n, Some(format!("git@x:{n}"))))
            .collect()
    }

    fn engine(runner: Arc<dyn CommandRunner>, root: &std::path::Path, cancel: CancellationToken) -> SyncEngine {
        let options = SyncOptions::new(root.join("repos"), root.join("index"));
        SyncEngine::new(options, runner, cancel)
    }

    #[tokio::test]
    async fn test_second_run_pulls_instead_of_cloning() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(runner.clone(), dir.path(), CancellationToken::new());

        let first = engine.run(records(&["a", "b"])).await;
        assert!(first.iter().all(|r| r.outcome == Outcome::Cloned));

        let second = engine.run(records(&["a", "b"])).await;
        assert!(second.iter().all(|r| r.outcome == Outcome::Pulled));
        assert_eq!(runner.count("clone"), 2);

        let entries = std::fs::read_dir(dir.path().join("repos")).unwrap().count();
        assert_eq!(entries, 2);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new().fail_on("git@x:b"));
        let engine = engine(runner, dir.path(), CancellationToken::new());

        let reports = engine.run(records(&["a", "b", "c"])).await;
        let outcomes: Vec<Outcome> = reports.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec![Outcome::Cloned, Outcome::Failed, Outcome::Cloned]);
        assert_eq!(reports[0].index, Some(IndexStatus::Indexed));
        assert_eq!(reports[1].index, None);

        let summary = SyncSummary::from_reports(&reports, 0);
        assert_eq!(summary.cloned, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let engine = engine(runner.clone(), dir.path(), cancel);

        let reports = engine.run(records(&["a", "b"])).await;
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.outcome == Outcome::Cancelled));
        assert!(runner.invocations().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_names_reported_alike_at_any_concurrency() {
        for concurrency in [1, 4] {
            let dir = tempfile::tempdir().unwrap();
            let runner = Arc::new(ScriptedRunner::new());
            let mut options = SyncOptions::new(dir.path().join("repos"), dir.path().join("index"));
            options.concurrency = concurrency;
            let engine = SyncEngine::new(options, runner.clone(), CancellationToken::new());

            let reports = engine.run(records(&["a", "b", "a"])).await;
            let outcomes: Vec<Outcome> = reports.iter().map(|r| r.outcome).collect();
            assert_eq!(
                outcomes,
                vec![Outcome::Cloned, Outcome::Cloned, Outcome::SkippedDuplicate],
                "concurrency {concurrency}"
            );
            assert_eq!(runner.count("clone"), 2);
            assert!(SyncSummary::from_reports(&reports, 0).is_success());
        }
    }

    #[tokio::test]
    async fn test_name_held_by_another_run_is_not_touched() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(runner.clone(), dir.path(), CancellationToken::new());

        let _held = engine.gate.try_enter("a").unwrap();
        let reports = engine.run(records(&["a", "b"])).await;
        assert_eq!(reports[0].outcome, Outcome::Failed);
        assert_eq!(reports[1].outcome, Outcome::Cloned);
        assert_eq!(runner.count("clone"), 1);
    }

    #[test]
    fn test_plan_all_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("repos").join("a")).unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        let engine = engine(runner.clone(), dir.path(), CancellationToken::new());

        let plans = engine.plan_all(&records(&["a", "b"]));
        assert_eq!(plans[0].state, LocalCloneState::PresentClean);
        assert_eq!(plans[0].decision, DecisionKind::PullExisting);
        assert_eq!(plans[1].decision, DecisionKind::CloneNew);
        assert!(runner.invocations().is_empty());
        assert!(!dir.path().join("repos").join("b").exists());
    }

    /// Sleeps on every call and remembers the highest number of overlapping calls.
    #[derive(Default)]
    struct SlowRunner {
        active: AtomicUsize,
        peak: AtomicUsize,
        inner: ScriptedRunner,
    }

    #[async_trait]
    impl CommandRunner for SlowRunner {
        async fn run(&self, invocation: &Invocation) -> Result<CommandOutput, ZoekError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let output = self.inner.run(invocation).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            output
        }
    }

    #[tokio::test]
    async fn test_concurrency_limit_is_respected() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Arc::new(SlowRunner::default());
        let mut options = SyncOptions::new(dir.path().join("repos"), dir.path().join("index"));
        options.concurrency = 2;
        options.index = false;
        let engine = SyncEngine::new(options, runner.clone(), CancellationToken::new());

        let reports = engine.run(records(&["a", "b", "c", "d", "e"])).await;
        assert!(reports.iter().all(|r| r.outcome == Outcome::Cloned));
        assert!(reports.iter().all(|r| r.index.is_none()));
        assert!(runner.peak.load(Ordering::SeqCst) <= 2);
        assert!(runner.peak.load(Ordering::SeqCst) >= 1);
    }
}
