use std::path::Path;
use std::process::ExitCode;

use clap::Subcommand;
use comfy_table::{Cell, Color, Table};
use zoek_auth::{resolve_github_token, KeyringStore};
use zoek_catalog::GitHubClient;
use zoek_core::config::ZoekConfig;

#[derive(Subcommand)]
pub enum OrgAction {
    /// List the GitHub organisations the token can see
    List,
    /// Set the organisation synchronized by default
    Set {
        /// Organisation login name
        login: String,
    },
}

pub async fn run(action: OrgAction, config_path: Option<&Path>) -> anyhow::Result<ExitCode> {
    match action {
        OrgAction::List => {
            let config = ZoekConfig::load(config_path)?;
            let token = resolve_github_token(&KeyringStore::new())?;
            let client = GitHubClient::new(config.github_api_url.clone(), &token)?;
            let orgs = client.list_organizations().await?;

            if orgs.is_empty() {
                println!("No organisations visible to this token.");
                return Ok(ExitCode::SUCCESS);
            }

            let mut table = Table::new();
            table.set_header(vec!["ORGANISATION", "REPOS", ""]);
            for org in &orgs {
                let current = config.github_org.as_deref() == Some(org.login.as_str());
                table.add_row(vec![
                    if current {
                        Cell::new(&org.login).fg(Color::Green)
                    } else {
                        Cell::new(&org.login)
                    },
                    Cell::new(org.repository_count),
                    Cell::new(if current { "current" } else { "" }),
                ]);
            }
            println!("{table}");
            Ok(ExitCode::SUCCESS)
        }
        OrgAction::Set { login } => {
            let path = match config_path {
                Some(p) => p.to_path_buf(),
                None => ZoekConfig::config_path()?,
            };
            let previous = set_org(&path, &login)?;
            if let Some(previous) = previous {
                println!("Previous organisation: {previous}");
            }
            println!("Organisation set to {login} in {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Store `login` as the default organisation in the config at `path`,
/// creating the file if needed. Returns the previous value.
fn set_org(path: &Path, login: &str) -> anyhow::Result<Option<String>> {
    let login = login.trim();
    if login.is_empty() {
        anyhow::bail!("organisation login must not be empty");
    }
    let mut config = if path.exists() {
        ZoekConfig::load_from(path)?
    } else {
        ZoekConfig::default()
    };
    let previous = config.github_org.replace(login.to_string());
    config.save_to(path)?;
    Ok(previous)
}
