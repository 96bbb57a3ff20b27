pub mod auth;
pub mod catalog;
pub mod config;
pub mod index;
pub mod list;
pub mod org;
pub mod sync;

use std::path::Path;
use std::process::ExitCode;

use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use zoek_core::config::ZoekConfig;

/// Exit status when the run finished but some repositories failed.
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

#[derive(Subcommand)]
pub enum Command {
    /// Print the filtered repository catalog as newline-delimited JSON
    List(list::ListArgs),
    /// Clone or update every catalog repository and index it
    Sync(sync::SyncArgs),
    /// Reindex every clone already in the mirror
    Index(index::IndexArgs),
    /// Initialize and inspect zoek configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigAction,
    },
    /// List GitHub organisations and pick the default one
    Org {
        #[command(subcommand)]
        action: org::OrgAction,
    },
    /// Manage the GitHub token used by --github-org
    Auth {
        #[command(subcommand)]
        action: auth::AuthAction,
    },
}

pub async fn run(cmd: Command, config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    match cmd {
        Command::Config { action } => config::run(action, config_path),
        Command::Auth { action } => auth::run(action),
        Command::Org { action } => org::run(action, config_path).await,
        Command::List(args) => list::run(args, &ZoekConfig::load(config_path)?).await,
        Command::Sync(args) => sync::run(args, &ZoekConfig::load(config_path)?).await,
        Command::Index(args) => index::run(args, &ZoekConfig::load(config_path)?).await,
    }
}

/// A token cancelled by the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing in-flight repositories");
            token.cancel();
        }
    });
    cancel
}
