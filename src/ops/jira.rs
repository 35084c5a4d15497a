#![allow(async_fn_in_trait)]

use std::collections::HashMap;

use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::instrument;

use super::jira_curl::JiraCurlClient;

/// Page size requested from a search; the server may return fewer.
pub const MAX_RESULTS: u32 = 1000;

// -----------------------------------------------------------------------------
// Types

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults {
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub status: Option<Named>,
    #[serde(default)]
    pub resolution: Option<Named>,
    #[serde(default)]
    pub issuetype: Option<Named>,
    /// Custom fields, keyed by field id (e.g. `customfield_10300`).
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Myself {
    display_name: Option<String>,
}

impl IssueFields {
    /// String value of a custom field, if present and non-null.
    pub fn text(&self, field_id: &str) -> Option<&str> {
        self.other.get(field_id).and_then(|v| v.as_str())
    }
}

// -----------------------------------------------------------------------------
// JiraOps trait

/// Operations for querying Jira
#[cfg_attr(test, automock)]
pub trait JiraOps {
    /// Check the credentials; returns the display name of the authenticated user
    async fn verify_login(&self) -> Result<String>;

    /// Run a JQL search returning one page of the requested fields, starting at
    /// result index `start_at`
    async fn search(&self, jql: &str, fields: &str, start_at: u64) -> Result<SearchResults>;
}

// -----------------------------------------------------------------------------
// RealJira

/// Real implementation that calls the Jira REST API (v2)
pub struct RealJira {
    base_url: String,
    http_client: JiraCurlClient,
}

impl RealJira {
    pub fn new(base_url: String, username: String, token: String) -> Self {
        Self {
            base_url,
            http_client: JiraCurlClient::new(username, token),
        }
    }
}

impl JiraOps for RealJira {
    #[instrument(skip_all)]
    async fn verify_login(&self) -> Result<String> {
        let url = format!("{}rest/api/2/myself", self.base_url);
        let response = self.http_client.get(&url).await?;
        let myself: Myself = serde_json::from_str(&response)?;
        Ok(myself
            .display_name
            .unwrap_or_else(|| self.http_client.username().to_string()))
    }

    #[instrument(skip(self))]
    async fn search(&self, jql: &str, fields: &str, start_at: u64) -> Result<SearchResults> {
        let url = format!(
            "{}rest/api/2/search?jql={}&startAt={}&maxResults={}&fields={}",
            self.base_url,
            urlencoding::encode(jql),
            start_at,
            MAX_RESULTS,
            urlencoding::encode(fields)
        );
        let response = self.http_client.get(&url).await?;
        Ok(serde_json::from_str(&response)?)
    }
}
