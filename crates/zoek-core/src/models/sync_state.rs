use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::record::RepositoryRecord;

/// What the mirror root holds for one repository, derived at plan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocalCloneState {
    Absent,
    PresentClean,
    /// Something exists at the clone path but it is not a directory.
    PresentUnknown,
}

impl std::fmt::Display for LocalCloneState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalCloneState::Absent => write!(f, "absent"),
            LocalCloneState::PresentClean => write!(f, "present-clean"),
            LocalCloneState::PresentUnknown => write!(f, "present-unknown"),
        }
    }
}

/// How much history a clone or update fetches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneMode {
    /// Single branch, depth 1, no blobs until checkout.
    #[default]
    Shallow,
    /// Full history and all branches.
    Full,
}

impl std::fmt::Display for CloneMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloneMode::Shallow => write!(f, "shallow"),
            CloneMode::Full => write!(f, "full"),
        }
    }
}

impl std::str::FromStr for CloneMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shallow" => Ok(CloneMode::Shallow),
            "full" => Ok(CloneMode::Full),
            _ => Err(format!("unknown clone mode: {s}")),
        }
    }
}

/// Policy for clones already on disk whose size now exceeds the ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizedExisting {
    /// Keep existing clones current regardless of size.
    #[default]
    Pull,
    /// Leave them as they are; they are still re-indexed.
    Skip,
}

impl std::fmt::Display for OversizedExisting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OversizedExisting::Pull => write!(f, "pull"),
            OversizedExisting::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for OversizedExisting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(OversizedExisting::Pull),
            "skip" => Ok(OversizedExisting::Skip),
            _ => Err(format!("unknown oversized policy: {s}")),
        }
    }
}

/// The single action chosen for a repository in one run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDecision {
    CloneNew(Arc<RepositoryRecord>),
    PullExisting(Arc<RepositoryRecord>),
    SkipTooBig(Arc<RepositoryRecord>),
    SkipNoUrl(Arc<RepositoryRecord>),
}

impl SyncDecision {
    pub fn record(&self) -> &RepositoryRecord {
        match self {
            SyncDecision::CloneNew(r)
            | SyncDecision::PullExisting(r)
            | SyncDecision::SkipTooBig(r)
            | SyncDecision::SkipNoUrl(r) => r,
        }
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            SyncDecision::CloneNew(_) => DecisionKind::CloneNew,
            SyncDecision::PullExisting(_) => DecisionKind::PullExisting,
            SyncDecision::SkipTooBig(_) => DecisionKind::SkipTooBig,
            SyncDecision::SkipNoUrl(_) => DecisionKind::SkipNoUrl,
        }
    }
}

/// Tag of a [`SyncDecision`] without the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionKind {
    CloneNew,
    PullExisting,
    SkipTooBig,
    SkipNoUrl,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionKind::CloneNew => write!(f, "clone-new"),
            DecisionKind::PullExisting => write!(f, "pull-existing"),
            DecisionKind::SkipTooBig => write!(f, "skip-too-big"),
            DecisionKind::SkipNoUrl => write!(f, "skip-no-url"),
        }
    }
}

/// Result of one executor or indexer step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub ok: bool,
    pub message: String,
}

impl ExecutionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl From<Result<String, crate::error::ZoekError>> for ExecutionResult {
    fn from(result: Result<String, crate::error::ZoekError>) -> Self {
        match result {
            Ok(message) => Self::ok(message),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

/// Terminal state of the clone/pull/skip step for a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Cloned,
    Pulled,
    SkippedTooBig,
    SkippedNoUrl,
    /// A later catalog entry for a name already synchronized in this run.
    SkippedDuplicate,
    Failed,
    Cancelled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Cloned => write!(f, "cloned"),
            Outcome::Pulled => write!(f, "pulled"),
            Outcome::SkippedTooBig => write!(f, "skipped-too-big"),
            Outcome::SkippedNoUrl => write!(f, "skipped-no-url"),
            Outcome::SkippedDuplicate => write!(f, "skipped-duplicate"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexStatus {
    Indexed,
    IndexFailed,
}

/// Everything that happened to one repository during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoReport {
    pub name: String,
    pub decision: Option<DecisionKind>,
    pub outcome: Outcome,
    pub index: Option<IndexStatus>,
    pub messages: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RepoReport {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            decision: None,
            outcome: Outcome::Cancelled,
            index: None,
            messages: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// A repository that was never dispatched because the run was cancelled.
    pub fn cancelled(name: impl Into<String>) -> Self {
        let mut report = Self::new(name);
        report.messages.push("run cancelled before dispatch".into());
        report
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, Outcome::Failed | Outcome::Cancelled)
            || self.index == Some(IndexStatus::IndexFailed)
    }
}

/// Per-outcome counts for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub filtered_out: usize,
    pub cloned: usize,
    pub pulled: usize,
    pub skipped_too_big: usize,
    pub skipped_no_url: usize,
    pub skipped_duplicate: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub indexed: usize,
    pub index_failed: usize,
}

impl SyncSummary {
    pub fn from_reports(reports: &[RepoReport], filtered_out: usize) -> Self {
        let mut summary = Self {
            filtered_out,
            ..Default::default()
        };
        for report in reports {
            summary.record(report);
        }
        summary
    }

    pub fn record(&mut self, report: &RepoReport) {
        match report.outcome {
            Outcome::Cloned => self.cloned += 1,
            Outcome::Pulled => self.pulled += 1,
            Outcome::SkippedTooBig => self.skipped_too_big += 1,
            Outcome::SkippedNoUrl => self.skipped_no_url += 1,
            Outcome::SkippedDuplicate => self.skipped_duplicate += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
        match report.index {
            Some(IndexStatus::Indexed) => self.indexed += 1,
            Some(IndexStatus::IndexFailed) => self.index_failed += 1,
            None => {}
        }
    }

    /// Repositories whose pipeline did not finish cleanly.
    pub fn failures(&self) -> usize {
        self.failed + self.cancelled + self.index_failed
    }

    pub fn is_success(&self) -> bool {
        self.failures() == 0
    }
}
