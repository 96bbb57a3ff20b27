use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use zoek_core::config::ZoekConfig;
use zoek_mirror::scan_mirror;
use zoek_sync::{Indexer, ProcessRunner};

use super::catalog::merged_blacklist;
use super::{cancel_on_ctrl_c, EXIT_PARTIAL_FAILURE};

#[derive(Args)]
pub struct IndexArgs {
    /// Directory holding one clone per repository
    #[arg(long)]
    mirror_root: Option<PathBuf>,
    /// Directory the search index is written to
    #[arg(long)]
    index_root: Option<PathBuf>,
    /// File of repository names to leave out, one per line
    #[arg(long)]
    blacklist: Option<PathBuf>,
}

pub async fn run(args: IndexArgs, config: &ZoekConfig) -> anyhow::Result<ExitCode> {
    let mirror_root = match args.mirror_root {
        Some(p) => p,
        None => config.mirror_root()?,
    };
    let index_root = match args.index_root {
        Some(p) => p,
        None => config.index_root()?,
    };
    let blacklist = merged_blacklist(config, args.blacklist.as_deref())?;

    let repos = scan_mirror(&mirror_root, &blacklist);
    if repos.is_empty() {
        println!("No clones found in {}.", mirror_root.display());
        return Ok(ExitCode::SUCCESS);
    }
    println!("Indexing {} repositories...", repos.len());

    let runner = Arc::new(ProcessRunner::new(
        config.env_remove.clone(),
        cancel_on_ctrl_c(),
        Duration::from_secs(config.grace_period_secs),
    ));
    let indexer = Indexer::new(runner, config.indexer_program.clone(), mirror_root);
    let results = indexer.reindex_all(&repos, &index_root).await;

    let failed: Vec<_> = results.iter().filter(|(_, r)| !r.ok).collect();
    println!(
        "\nIndex complete: {} indexed | {} failed",
        results.len() - failed.len(),
        failed.len()
    );
    for (name, result) in &failed {
        println!("  {}: {}", style(name).red(), result.message);
    }

    if failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_PARTIAL_FAILURE))
    }
}
