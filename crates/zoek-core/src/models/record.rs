use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ZoekError;

/// Suffix of the directory a clone is written into before it is moved into place.
pub const STAGING_SUFFIX: &str = ".zoek-partial";

/// One repository from the catalog, normalized across listing sources.
///
/// Serializes to the newline-delimited output format: `name`, `sshUrl`,
/// `url`, `diskUsage`, `isDisabled`, followed by every other catalog field.
///
/// Deserializing goes through [`RepositoryRecord::from_json`], so the field
/// aliases are normalized however the record is read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct RepositoryRecord {
    pub name: String,
    pub ssh_url: Option<String>,
    pub url: Option<String>,
    pub disk_usage: Option<u64>,
    pub is_disabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RepositoryRecord {
    pub fn new(name: impl Into<String>, ssh_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            ssh_url,
            url: None,
            disk_usage: None,
            is_disabled: false,
            extra: Map::new(),
        }
    }

    /// Normalize a raw catalog object.
    ///
    /// `webUrl` is accepted for `url` and `size` for `diskUsage`; when both
    /// spellings are present the canonical one wins and the other is dropped.
    pub fn from_json(value: Value) -> Result<Self, ZoekError> {
        let mut obj = match value {
            Value::Object(obj) => obj,
            other => {
                return Err(ZoekError::InvalidRecord {
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                })
            }
        };

        let name = match obj.remove("name") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(ZoekError::InvalidRecord {
                    reason: format!("name must be a string, got {}", json_kind(&other)),
                })
            }
        };
        let ssh_url = take_string(&mut obj, "sshUrl")?;
        let url = take_string(&mut obj, "url")?;
        let web_url = take_string(&mut obj, "webUrl")?;
        let disk_usage = take_size(&mut obj, "diskUsage")?;
        let size = take_size(&mut obj, "size")?;
        let is_disabled = match obj.remove("isDisabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => b,
            Some(other) => {
                return Err(ZoekError::InvalidRecord {
                    reason: format!("isDisabled must be a boolean, got {}", json_kind(&other)),
                })
            }
        };

        Ok(Self {
            name,
            ssh_url,
            url: url.or(web_url),
            disk_usage: disk_usage.or(size),
            is_disabled,
            extra: obj,
        })
    }

    /// The name as a single safe path component, if it is one.
    pub fn dir_name(&self) -> Option<&str> {
        let name = self.name.as_str();
        let unsafe_name = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
            || name.ends_with(STAGING_SUFFIX);
        if unsafe_name {
            None
        } else {
            Some(name)
        }
    }

    /// The clone URL when one is present and non-blank.
    pub fn clone_url(&self) -> Option<&str> {
        self.ssh_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// Whether the known size exceeds `max_size`. Unknown sizes never do.
    pub fn exceeds(&self, max_size: Option<u64>) -> bool {
        match (self.disk_usage, max_size) {
            (Some(size), Some(max)) => size > max,
            _ => false,
        }
    }
}

impl TryFrom<Value> for RepositoryRecord {
    type Error = ZoekError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

fn take_string(obj: &mut Map<String, Value>, key: &str) -> Result<Option<String>, ZoekError> {
    match obj.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(ZoekError::InvalidRecord {
            reason: format!("{key} must be a string, got {}", json_kind(&other)),
        }),
    }
}

fn take_size(obj: &mut Map<String, Value>, key: &str) -> Result<Option<u64>, ZoekError> {
    match obj.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Ok(Some(v)),
            None => Err(ZoekError::InvalidRecord {
                reason: format!("{key} must be a non-negative integer, got {n}"),
            }),
        },
        Some(other) => Err(ZoekError::InvalidRecord {
            reason: format!("{key} must be an integer, got {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
