use std::process::ExitCode;

use clap::Subcommand;
use zoek_auth::{CredentialStore, KeyringStore, GITHUB_TOKEN_ENV, GITHUB_TOKEN_KEY};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a GitHub token in the OS keychain
    Set {
        /// Personal access token with read access to the organisation
        token: String,
    },
    /// Remove the stored GitHub token
    Delete,
}

pub fn run(action: AuthAction) -> anyhow::Result<ExitCode> {
    let store = KeyringStore::new();
    match action {
        AuthAction::Set { token } => {
            let token = token.trim();
            if token.is_empty() {
                anyhow::bail!("token must not be empty");
            }
            store.store(GITHUB_TOKEN_KEY, token)?;
            println!("GitHub token stored in the OS keychain.");
            println!("  ${GITHUB_TOKEN_ENV} takes precedence when set.");
        }
        AuthAction::Delete => {
            store.delete(GITHUB_TOKEN_KEY)?;
            println!("GitHub token removed.");
        }
    }
    Ok(ExitCode::SUCCESS)
}
