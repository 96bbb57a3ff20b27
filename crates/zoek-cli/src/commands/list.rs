use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use zoek_catalog::{filter_with_report, write_ndjson};
use zoek_core::config::ZoekConfig;

use super::catalog::{save_catalog, CatalogArgs};

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    catalog: CatalogArgs,
    /// Write to a file instead of stdout (default: the configured repolist)
    #[arg(long)]
    output: Option<Option<PathBuf>>,
}

pub async fn run(args: ListArgs, config: &ZoekConfig) -> anyhow::Result<ExitCode> {
    let source = args.catalog.source(config)?;
    tracing::info!("loading catalog from {}", source.describe());
    let records = source.load().await?;

    let blacklist = args.catalog.blacklist(config)?;
    let (kept, excluded) = filter_with_report(records, &blacklist, args.catalog.max_size(config));

    match args.output {
        Some(path) => {
            let path = match path {
                Some(p) => p,
                None => config.repolist_path()?,
            };
            save_catalog(&path, &kept)?;
            eprintln!(
                "Wrote {} repositories to {} ({} excluded)",
                kept.len(),
                path.display(),
                excluded.total()
            );
        }
        None => {
            let stdout = std::io::stdout();
            write_ndjson(BufWriter::new(stdout.lock()), &kept)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
