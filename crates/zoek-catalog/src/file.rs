use std::path::PathBuf;

use async_trait::async_trait;
use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

use crate::ndjson::parse_ndjson;
use crate::CatalogSource;

/// A catalog previously written as newline-delimited JSON.
pub struct FileSource {
    path: PathBuf,
    strict: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, strict: bool) -> Self {
        Self {
            path: path.into(),
            strict,
        }
    }
}

#[async_trait]
impl CatalogSource for FileSource {
    async fn load(&self) -> Result<Vec<RepositoryRecord>, ZoekError> {
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|e| ZoekError::CatalogUnavailable {
                message: format!("cannot read {}: {e}", self.path.display()),
            })?;
        let records = parse_ndjson(content.as_slice(), self.strict)?;
        tracing::info!(
            "loaded {} repositories from {}",
            records.len(),
            self.path.display()
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileSource::new(dir.path().join("nope.ndjson"), true);
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, ZoekError::CatalogUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_loads_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repos.ndjson");
        std::fs::write(
            &path,
            "{\"name\":\"a\",\"sshUrl\":\"git@x:a\"}\n{\"name\":\"b\",\"sshUrl\":\"git@x:b\"}\n",
        )
        .unwrap();
        let records = FileSource::new(&path, true).load().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].clone_url(), Some("git@x:b"));
    }
}
