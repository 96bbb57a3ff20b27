use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

use crate::ndjson::parse_document;
use crate::CatalogSource;

/// Runs an external listing CLI that prints the catalog as JSON on stdout.
pub struct CommandSource {
    command: Vec<String>,
    env_remove: Vec<String>,
}

impl CommandSource {
    pub fn new(command: Vec<String>, env_remove: Vec<String>) -> Self {
        Self {
            command,
            env_remove,
        }
    }
}

#[async_trait]
impl CatalogSource for CommandSource {
    async fn load(&self) -> Result<Vec<RepositoryRecord>, ZoekError> {
        let (program, args) =
            self.command
                .split_first()
                .ok_or_else(|| ZoekError::CatalogUnavailable {
                    message: "no catalog command configured".into(),
                })?;

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for var in &self.env_remove {
            cmd.env_remove(var);
        }

        tracing::info!("running catalog command: {}", self.command.join(" "));
        let output = cmd
            .output()
            .await
            .map_err(|e| ZoekError::CatalogUnavailable {
                message: format!("failed to run {program}: {e}"),
            })?;

        if !output.status.success() {
            return Err(ZoekError::CatalogUnavailable {
                message: format!(
                    "{} exited with {}: {}",
                    self.command.join(" "),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let value: Value =
            serde_json::from_slice(&output.stdout).map_err(|e| ZoekError::CatalogUnavailable {
                message: format!("malformed JSON from {program}: {e}"),
            })?;
        let records = parse_document(value).map_err(|e| ZoekError::CatalogUnavailable {
            message: format!("unexpected catalog shape from {program}: {e}"),
        })?;

        tracing::info!("catalog command listed {} repositories", records.len());
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("command `{}`", self.command.join(" "))
    }
}
