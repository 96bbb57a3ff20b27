use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use comfy_table::{Cell, Color, Table};
use console::style;
use zoek_catalog::filter_with_report;
use zoek_core::config::ZoekConfig;
use zoek_core::models::sync_state::{
    CloneMode, DecisionKind, IndexStatus, OversizedExisting, RepoReport, SyncSummary,
};
use zoek_sync::{PlannedRepo, ProcessRunner, SyncEngine, SyncOptions};

use super::catalog::{save_catalog, CatalogArgs};
use super::{cancel_on_ctrl_c, EXIT_PARTIAL_FAILURE};

#[derive(Args)]
pub struct SyncArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Directory holding one clone per repository
    #[arg(long)]
    mirror_root: Option<PathBuf>,
    /// Directory the search index is written to
    #[arg(long)]
    index_root: Option<PathBuf>,
    /// Repositories processed at the same time
    #[arg(long)]
    concurrency: Option<NonZeroUsize>,
    /// Show what would be done without cloning, pulling or indexing
    #[arg(long)]
    dry_run: bool,
    /// Full clones and plain pulls instead of shallow ones
    #[arg(long)]
    full: bool,
    /// Do not run the indexer
    #[arg(long)]
    no_index: bool,
    /// Leave existing clones above --max-size untouched
    #[arg(long)]
    skip_oversized_existing: bool,
}

impl SyncArgs {
    fn options(&self, config: &ZoekConfig) -> anyhow::Result<SyncOptions> {
        let mirror_root = match &self.mirror_root {
            Some(p) => p.clone(),
            None => config.mirror_root()?,
        };
        let index_root = match &self.index_root {
            Some(p) => p.clone(),
            None => config.index_root()?,
        };
        Ok(SyncOptions {
            mirror_root,
            index_root,
            max_size: self.catalog.max_size(config),
            oversized_existing: if self.skip_oversized_existing {
                OversizedExisting::Skip
            } else {
                config.oversized_existing
            },
            clone_mode: if self.full { CloneMode::Full } else { config.clone_mode },
            git_program: config.git_program.clone(),
            indexer_program: config.indexer_program.clone(),
            concurrency: self
                .concurrency
                .map(NonZeroUsize::get)
                .unwrap_or(config.concurrency),
            index: !self.no_index,
            show_progress: console::Term::stderr().is_term(),
        })
    }
}

pub async fn run(args: SyncArgs, config: &ZoekConfig) -> anyhow::Result<ExitCode> {
    let options = args.options(config)?;

    let source = args.catalog.source(config)?;
    tracing::info!("loading catalog from {}", source.describe());
    let records = source.load().await?;

    if !args.catalog.reads_file() && !args.dry_run {
        let path = config.repolist_path()?;
        match save_catalog(&path, &records) {
            Ok(()) => tracing::info!(
                "cached {} catalog entries in {}",
                records.len(),
                path.display()
            ),
            Err(e) => tracing::warn!("could not cache catalog in {}: {e:#}", path.display()),
        }
    }

    // The planner applies the size ceiling so existing clones stay current.
    let blacklist = args.catalog.blacklist(config)?;
    let (working_set, excluded) = filter_with_report(records, &blacklist, None);

    let cancel = cancel_on_ctrl_c();
    let runner = Arc::new(ProcessRunner::new(
        config.env_remove.clone(),
        cancel.clone(),
        Duration::from_secs(config.grace_period_secs),
    ));
    let engine = SyncEngine::new(options, runner, cancel);

    if args.dry_run {
        print_plan(&engine.plan_all(&working_set));
        return Ok(ExitCode::SUCCESS);
    }

    let reports = engine.run(working_set).await;
    let summary = SyncSummary::from_reports(&reports, excluded.total());

    print_summary(&summary);
    print_failures(&reports);

    if summary.is_success() {
        println!("{}", style("Sync complete.").green());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            style(format!(
                "Sync finished with {} failed repositories.",
                summary.failures()
            ))
            .red()
        );
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    }
}

fn print_plan(plans: &[PlannedRepo]) {
    let mut table = Table::new();
    table.set_header(vec!["REPO", "LOCAL", "ACTION"]);
    for plan in plans {
        let color = match plan.decision {
            DecisionKind::CloneNew => Color::Green,
            DecisionKind::PullExisting => Color::Cyan,
            DecisionKind::SkipTooBig | DecisionKind::SkipNoUrl => Color::Yellow,
        };
        table.add_row(vec![
            Cell::new(&plan.name),
            Cell::new(plan.state.to_string()),
            Cell::new(plan.decision.to_string()).fg(color),
        ]);
    }
    println!("{table}");
    println!("[dry-run] {} repositories planned, nothing changed.", plans.len());
}

fn print_summary(summary: &SyncSummary) {
    let rows: [(&str, usize, Color); 10] = [
        ("filtered out", summary.filtered_out, Color::White),
        ("cloned", summary.cloned, Color::Green),
        ("pulled", summary.pulled, Color::Green),
        ("skipped (too big)", summary.skipped_too_big, Color::Yellow),
        ("skipped (no url)", summary.skipped_no_url, Color::Yellow),
        ("skipped (duplicate)", summary.skipped_duplicate, Color::Yellow),
        ("failed", summary.failed, Color::Red),
        ("cancelled", summary.cancelled, Color::Red),
        ("indexed", summary.indexed, Color::Green),
        ("index failed", summary.index_failed, Color::Red),
    ];

    let mut table = Table::new();
    table.set_header(vec!["RESULT", "COUNT"]);
    for (label, count, color) in rows {
        let cell = Cell::new(count);
        table.add_row(vec![
            Cell::new(label),
            if count > 0 { cell.fg(color) } else { cell },
        ]);
    }
    println!("\n{table}");
}

fn print_failures(reports: &[RepoReport]) {
    for report in reports.iter().filter(|r| r.is_failure()) {
        let index = match report.index {
            Some(IndexStatus::IndexFailed) => ", index failed",
            _ => "",
        };
        println!("\n{} ({}{index}):", style(&report.name).bold(), report.outcome);
        for message in &report.messages {
            println!("  {message}");
        }
    }
}
