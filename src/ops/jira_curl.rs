use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use tokio::process::Command;

/// HTTP client using curl for making Jira API requests
pub struct JiraCurlClient {
    username: String,
    token: String,
}

/// Jira reports failures as a list of messages and/or a field -> message map.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraError {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

/// A non-success HTTP status returned by the Jira API.
#[derive(Debug)]
pub struct HttpStatusError {
    pub status: u16,
    pub message: String,
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Jira API request failed with status {}: {}", self.status, self.message)
    }
}

impl std::error::Error for HttpStatusError {}

impl JiraCurlClient {
    pub fn new(username: String, token: String) -> Self {
        Self { username, token }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Make a GET request
    pub async fn get(&self, url: &str) -> Result<String> {
        let credentials = format!("{}:{}", self.username, self.token);
        let output = Command::new("curl")
            .args([
                "-s",
                "-w",
                "\n%{http_code}",
                "-u",
                &credentials,
                "-H",
                "Accept: application/json",
                "-H",
                "User-Agent: relprep-cli",
                url,
            ])
            .output()
            .await
            .context("Failed to execute curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        parse_response(output.stdout)
    }
}

/// Parse curl response with status code appended
fn parse_response(stdout: Vec<u8>) -> Result<String> {
    let output_str = String::from_utf8(stdout)?;
    let (response, status_code) = match output_str.rsplit_once('\n') {
        Some((body, code)) => (body.to_string(), code.trim().parse::<u16>().unwrap_or(0)),
        None => (String::new(), output_str.trim().parse::<u16>().unwrap_or(0)),
    };

    if status_code >= 400 || status_code == 0 {
        let message = match serde_json::from_str::<JiraError>(&response) {
            Ok(error) if !error.error_messages.is_empty() || !error.errors.is_empty() => error
                .error_messages
                .into_iter()
                .chain(error.errors.into_iter().map(|(k, v)| format!("{k}: {v}")))
                .collect::<Vec<_>>()
                .join("; "),
            _ => response.trim().to_string(),
        };
        return Err(HttpStatusError {
            status: status_code,
            message,
        }
        .into());
    }

    Ok(response)
}
