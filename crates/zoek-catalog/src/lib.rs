pub mod command;
pub mod file;
pub mod filter;
pub mod github;
pub mod ndjson;

use async_trait::async_trait;
use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

pub use command::CommandSource;
pub use file::FileSource;
pub use filter::{filter, filter_with_report, load_blacklist, FilterReport};
pub use github::{GitHubClient, GitHubOrgSource, OrgSummary};
pub use ndjson::{parse_document, parse_ndjson, write_ndjson};

/// Somewhere the authoritative repository listing comes from.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Load and normalize the full catalog. Any error aborts the run.
    async fn load(&self) -> Result<Vec<RepositoryRecord>, ZoekError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}
