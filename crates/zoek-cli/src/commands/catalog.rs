use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use clap::Args;
use zoek_auth::{resolve_github_token, KeyringStore};
use zoek_catalog::{
    load_blacklist, write_ndjson, CatalogSource, CommandSource, FileSource, GitHubOrgSource,
};
use zoek_core::config::ZoekConfig;
use zoek_core::models::record::RepositoryRecord;

/// Where the catalog comes from and what is excluded from it.
#[derive(Args)]
pub struct CatalogArgs {
    /// Read the catalog from an ndjson file (default: the configured repolist)
    #[arg(long, conflicts_with = "github_org")]
    pub from_file: Option<Option<PathBuf>>,
    /// List an organisation's repositories through the GitHub API
    #[arg(long)]
    pub github_org: Option<String>,
    /// File of repository names to exclude, one per line
    #[arg(long)]
    pub blacklist: Option<PathBuf>,
    /// Size ceiling, in the catalog's units
    #[arg(long)]
    pub max_size: Option<u64>,
    /// Skip malformed catalog lines instead of aborting
    #[arg(long)]
    pub lenient: bool,
}

impl CatalogArgs {
    /// Pick the catalog source: file, then GitHub, then the listing command.
    pub fn source(&self, config: &ZoekConfig) -> anyhow::Result<Box<dyn CatalogSource>> {
        if let Some(path) = &self.from_file {
            let path = match path {
                Some(p) => p.clone(),
                None => config.repolist_path()?,
            };
            let strict = config.strict_catalog && !self.lenient;
            return Ok(Box::new(FileSource::new(path, strict)));
        }

        if let Some(org) = self.github_org.as_ref().or(config.github_org.as_ref()) {
            let token = resolve_github_token(&KeyringStore::new())?;
            let source = GitHubOrgSource::new(config.github_api_url.clone(), &token, org.clone())?;
            return Ok(Box::new(source));
        }

        Ok(Box::new(CommandSource::new(
            config.catalog_command.clone(),
            config.env_remove.clone(),
        )))
    }

    /// Configured blacklist merged with the `--blacklist` file.
    pub fn blacklist(&self, config: &ZoekConfig) -> anyhow::Result<HashSet<String>> {
        merged_blacklist(config, self.blacklist.as_deref())
    }

    pub fn max_size(&self, config: &ZoekConfig) -> Option<u64> {
        self.max_size.or(config.max_size)
    }

    /// Whether the catalog is read back from an ndjson file.
    pub fn reads_file(&self) -> bool {
        self.from_file.is_some()
    }
}

/// Write `records` as ndjson to `path`, creating parent directories.
pub fn save_catalog(path: &Path, records: &[RepositoryRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_ndjson(BufWriter::new(File::create(path)?), records)?;
    Ok(())
}

pub fn merged_blacklist(
    config: &ZoekConfig,
    file: Option<&Path>,
) -> anyhow::Result<HashSet<String>> {
    let mut names: HashSet<String> = config.blacklist.iter().cloned().collect();
    if let Some(path) = file {
        names.extend(load_blacklist(path)?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_saved_catalog_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache").join("repos.ndjson");
        let mut off = RepositoryRecord::new("off", None);
        off.is_disabled = true;
        let records = vec![RepositoryRecord::new("a", Some("git@x:a".into())), off];

        save_catalog(&path, &records).unwrap();
        let loaded = FileSource::new(&path, true).load().await.unwrap();
        assert_eq!(loaded, records);
    }
}
