use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{json, Value};

use zoek_core::error::ZoekError;
use zoek_core::models::record::RepositoryRecord;

use crate::ndjson::parse_document;
use crate::CatalogSource;

const PAGE_SIZE: u32 = 80;
const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(3);

const REPOS_QUERY: &str = r#"query repos($orgLogin: String!, $after: String, $first: Int) {
  organization(login: $orgLogin) {
    name
    login
    repositories(after: $after, first: $first) {
      nodes {
        name
        createdAt
        diskUsage
        isDisabled
        isEmpty
        labels(first: 10) {
          nodes {
            name
          }
        }
        primaryLanguage {
          name
        }
        sshUrl
        url
      }
      pageInfo {
        endCursor
        hasNextPage
      }
      totalCount
    }
  }
}"#;

const ORGS_QUERY: &str = r#"query orgs {
  viewer {
    login
    organizations(first: 100) {
      nodes {
        login
        repositories {
          totalCount
        }
      }
    }
  }
}"#;

/// Authenticated GraphQL client for the GitHub API.
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: url::Url,
}

impl GitHubClient {
    pub fn new(api_url: url::Url, token: &str) -> Result<Self, ZoekError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let auth = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            ZoekError::Credential {
                message: "GitHub token contains invalid characters".into(),
            }
        })?;
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::USER_AGENT, HeaderValue::from_static("zoek/0.1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ZoekError::Api {
                status: 0,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { client, api_url })
    }

    fn graphql_url(&self) -> String {
        let base = self.api_url.as_str().trim_end_matches('/');
        format!("{base}/graphql")
    }

    /// Run a GraphQL query and return its `data` object.
    pub async fn query(&self, query: &str, variables: Value) -> Result<Value, ZoekError> {
        let body = json!({ "query": query, "variables": variables });

        let resp = self
            .client
            .post(self.graphql_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ZoekError::Api {
                status: 0,
                message: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ZoekError::Api {
                status,
                message: body,
            });
        }

        let payload: GraphQlResponse = resp.json().await.map_err(|e| ZoekError::Api {
            status: 0,
            message: format!("JSON parse error: {e}"),
        })?;
        payload.into_data()
    }

    /// Organisations the token's user belongs to.
    pub async fn list_organizations(&self) -> Result<Vec<OrgSummary>, ZoekError> {
        let data = self.query(ORGS_QUERY, json!({})).await?;
        parse_organizations(&data)
    }
}

/// One organisation visible to the authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgSummary {
    pub login: String,
    pub repository_count: u64,
}

fn parse_organizations(data: &Value) -> Result<Vec<OrgSummary>, ZoekError> {
    let nodes = data
        .pointer("/viewer/organizations/nodes")
        .and_then(Value::as_array)
        .ok_or_else(|| ZoekError::Api {
            status: 0,
            message: "response has no viewer.organizations.nodes".into(),
        })?;
    Ok(nodes
        .iter()
        .filter_map(|node| {
            let login = node.get("login")?.as_str()?.to_string();
            let repository_count = node
                .pointer("/repositories/totalCount")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Some(OrgSummary {
                login,
                repository_count,
            })
        })
        .collect())
}

/// Lists every repository of a GitHub organisation through the GraphQL API.
pub struct GitHubOrgSource {
    client: GitHubClient,
    org_login: String,
    page_delay: Duration,
}

impl GitHubOrgSource {
    pub fn new(api_url: url::Url, token: &str, org_login: String) -> Result<Self, ZoekError> {
        Ok(Self {
            client: GitHubClient::new(api_url, token)?,
            org_login,
            page_delay: DEFAULT_PAGE_DELAY,
        })
    }

    /// Pause between page requests to stay clear of secondary rate limits.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    async fn fetch_page(&self, after: Option<&str>) -> Result<Value, ZoekError> {
        let variables = json!({
            "orgLogin": self.org_login,
            "after": after,
            "first": PAGE_SIZE,
        });
        let data = self.client.query(REPOS_QUERY, variables).await?;
        if data.get("organization").is_some_and(|o| !o.is_null()) {
            Ok(data)
        } else {
            Err(ZoekError::CatalogUnavailable {
                message: format!("organisation {} not found or not visible to this token", self.org_login),
            })
        }
    }
}

#[derive(Deserialize)]
struct GraphQlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

impl GraphQlResponse {
    fn into_data(self) -> Result<Value, ZoekError> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(ZoekError::CatalogUnavailable {
                message: messages.join("; "),
            });
        }
        match self.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(ZoekError::CatalogUnavailable {
                message: "GitHub returned no data".into(),
            }),
        }
    }
}

/// `(hasNextPage, endCursor)` of an organisation page.
fn page_info(page: &Value) -> (bool, Option<String>) {
    let info = page.pointer("/organization/repositories/pageInfo");
    let has_next = info
        .and_then(|i| i.get("hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let cursor = info
        .and_then(|i| i.get("endCursor"))
        .and_then(Value::as_str)
        .map(str::to_string);
    (has_next, cursor)
}

#[async_trait]
impl CatalogSource for GitHubOrgSource {
    async fn load(&self) -> Result<Vec<RepositoryRecord>, ZoekError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.fetch_page(cursor.as_deref()).await?;
            let (has_next, end_cursor) = page_info(&page);
            let batch = parse_document(page).map_err(|e| ZoekError::CatalogUnavailable {
                message: format!("unexpected GitHub response: {e}"),
            })?;
            tracing::debug!("fetched {} repositories from {}", batch.len(), self.org_login);
            records.extend(batch);

            // hasNextPage without a cursor ends the listing.
            match (has_next, end_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
            tokio::time::sleep(self.page_delay).await;
        }

        tracing::info!(
            "listed {} repositories for organisation {}",
            records.len(),
            self.org_login
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("GitHub organisation {}", self.org_login)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(has_next: bool, cursor: Option<&str>) -> Value {
        json!({
            "organization": {
                "name": "Acme",
                "login": "acme",
                "repositories": {
                    "nodes": [
                        {"name": "a", "sshUrl": "git@github.com:acme/a.git", "url": "https://github.com/acme/a", "diskUsage": 12, "isDisabled": false, "isEmpty": false}
                    ],
                    "pageInfo": {"endCursor": cursor, "hasNextPage": has_next},
                    "totalCount": 1
                }
            }
        })
    }

    #[test]
    fn test_page_info() {
        assert_eq!(page_info(&page(true, Some("c1"))), (true, Some("c1".into())));
        assert_eq!(page_info(&page(false, None)), (false, None));
        assert_eq!(page_info(&json!({})), (false, None));
    }

    #[test]
    fn test_page_normalizes_like_file_lines() {
        let records = parse_document(page(false, None)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].disk_usage, Some(12));
        assert_eq!(records[0].extra.get("isEmpty"), Some(&json!(false)));
    }

    #[test]
    fn test_graphql_errors_surface() {
        let resp: GraphQlResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{"message": "Could not resolve to an Organization"}]
        }))
        .unwrap();
        let err = resp.into_data().unwrap_err();
        assert!(err.to_string().contains("Could not resolve"));
    }

    #[test]
    fn test_missing_data() {
        let resp: GraphQlResponse = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(resp.into_data().is_err());
    }

    #[test]
    fn test_graphql_url() {
        let client = GitHubClient::new(
            url::Url::parse("https://github.example.com/api/").unwrap(),
            "t0ken",
        )
        .unwrap();
        assert_eq!(client.graphql_url(), "https://github.example.com/api/graphql");
    }

    #[test]
    fn test_parse_organizations() {
        let data = json!({
            "viewer": {
                "login": "octo",
                "organizations": {
                    "nodes": [
                        {"login": "acme", "repositories": {"totalCount": 42}},
                        {"login": "empty-co", "repositories": {"totalCount": 0}},
                        {"repositories": {"totalCount": 3}}
                    ]
                }
            }
        });
        let orgs = parse_organizations(&data).unwrap();
        assert_eq!(
            orgs,
            vec![
                OrgSummary { login: "acme".into(), repository_count: 42 },
                OrgSummary { login: "empty-co".into(), repository_count: 0 },
            ]
        );
        assert!(parse_organizations(&json!({"viewer": null})).is_err());
    }
}
