use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ZoekError;
use crate::models::sync_state::{CloneMode, OversizedExisting};

/// Environment variable that relocates the zoek home directory.
pub const HOME_ENV: &str = "ZOEK_HOME";

/// Top-level zoek configuration, stored at `~/.zoek/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoekConfig {
    /// Directory holding one clone per repository. Defaults to `<home>/repos`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_root: Option<PathBuf>,

    /// Search index storage. Defaults to `<home>/index`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_root: Option<PathBuf>,

    /// Where `zoek list --output` and live `zoek sync` runs cache the catalog. Defaults to `<home>/repos.ndjson`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repolist_path: Option<PathBuf>,

    /// Repository names that are never listed or synced.
    #[serde(default)]
    pub blacklist: Vec<String>,

    /// Size ceiling for new clones, in the catalog's own units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    /// Maximum concurrent repository pipelines.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// External command printing the catalog as JSON on stdout.
    #[serde(default = "default_catalog_command")]
    pub catalog_command: Vec<String>,

    #[serde(default = "default_git_program")]
    pub git_program: String,

    #[serde(default = "default_indexer_program")]
    pub indexer_program: String,

    /// Inherited variables stripped from every child process environment.
    #[serde(default = "default_env_remove")]
    pub env_remove: Vec<String>,

    #[serde(default)]
    pub clone_mode: CloneMode,

    /// What to do with an existing clone that exceeds `max_size`.
    #[serde(default)]
    pub oversized_existing: OversizedExisting,

    /// Abort on the first malformed catalog line instead of skipping it.
    #[serde(default = "default_strict_catalog")]
    pub strict_catalog: bool,

    #[serde(default = "default_github_api_url")]
    pub github_api_url: Url,

    /// Organisation listed by the GitHub catalog source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_org: Option<String>,

    /// Seconds an in-flight process may keep running after cancellation.
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

fn default_concurrency() -> usize {
    4
}

fn default_catalog_command() -> Vec<String> {
    vec!["az".into(), "repos".into(), "list".into()]
}

fn default_git_program() -> String {
    "git".into()
}

fn default_indexer_program() -> String {
    "zoekt-index".into()
}

fn default_env_remove() -> Vec<String> {
    vec!["__PYVENV_LAUNCHER__".into()]
}

fn default_strict_catalog() -> bool {
    true
}

fn default_github_api_url() -> Url {
    Url::parse("https://api.github.com").expect("static GitHub API URL is valid")
}

fn default_grace_period_secs() -> u64 {
    10
}

impl Default for ZoekConfig {
    fn default() -> Self {
        Self {
            mirror_root: None,
            index_root: None,
            repolist_path: None,
            blacklist: Vec::new(),
            max_size: None,
            concurrency: default_concurrency(),
            catalog_command: default_catalog_command(),
            git_program: default_git_program(),
            indexer_program: default_indexer_program(),
            env_remove: default_env_remove(),
            clone_mode: CloneMode::default(),
            oversized_existing: OversizedExisting::default(),
            strict_catalog: default_strict_catalog(),
            github_api_url: default_github_api_url(),
            github_org: None,
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

impl ZoekConfig {
    /// Returns the zoek home directory (`$ZOEK_HOME` or `~/.zoek/`).
    pub fn home_dir() -> Result<PathBuf, ZoekError> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(dir));
        }
        let base = dirs::home_dir().ok_or_else(|| ZoekError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".zoek"))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Result<PathBuf, ZoekError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    pub fn mirror_root(&self) -> Result<PathBuf, ZoekError> {
        match &self.mirror_root {
            Some(p) => Ok(expand_home(p)),
            None => Ok(Self::home_dir()?.join("repos")),
        }
    }

    pub fn index_root(&self) -> Result<PathBuf, ZoekError> {
        match &self.index_root {
            Some(p) => Ok(expand_home(p)),
            None => Ok(Self::home_dir()?.join("index")),
        }
    }

    pub fn repolist_path(&self) -> Result<PathBuf, ZoekError> {
        match &self.repolist_path {
            Some(p) => Ok(expand_home(p)),
            None => Ok(Self::home_dir()?.join("repos.ndjson")),
        }
    }

    /// Load config from the given path, the default location, or defaults if neither exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ZoekError> {
        let path = match path {
            Some(p) => return Self::load_from(p),
            None => Self::config_path()?,
        };
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("no config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ZoekError> {
        let content = std::fs::read_to_string(path).map_err(|e| ZoekError::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ZoekError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ZoekError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ZoekError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Initialize the zoek home directory with default config.
    pub fn init() -> Result<PathBuf, ZoekError> {
        let home = Self::home_dir()?;
        std::fs::create_dir_all(&home)?;

        let config_path = Self::config_path()?;
        if !config_path.exists() {
            Self::default().save_to(&config_path)?;
        }

        Ok(home)
    }

    pub fn validate(&self) -> Result<(), ZoekError> {
        if self.concurrency == 0 {
            return Err(ZoekError::Config {
                message: "concurrency must be at least 1".into(),
            });
        }
        if self.catalog_command.is_empty() {
            return Err(ZoekError::Config {
                message: "catalog_command must name a program".into(),
            });
        }
        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
