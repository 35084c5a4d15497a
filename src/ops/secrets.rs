//! Token retrieval from Google Cloud Secret Manager via the gcloud CLI.

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tokio::process::Command;
use tracing::instrument;

/// Location of a secret in the secret manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRef {
    pub project: String,
    pub secret_id: String,
    pub version: String,
}

impl SecretRef {
    fn access_args(&self) -> Vec<String> {
        vec![
            "secrets".to_string(),
            "versions".to_string(),
            "access".to_string(),
            self.version.clone(),
            format!("--secret={}", self.secret_id),
            format!("--project={}", self.project),
        ]
    }
}

/// Fetch the payload of a secret version.
#[instrument]
pub async fn access_secret(secret: &SecretRef) -> Result<String> {
    let output = Command::new("gcloud")
        .args(secret.access_args())
        .output()
        .await
        .context("Failed to execute gcloud command (is the Google Cloud SDK installed?)")?;

    if !output.status.success() {
        bail!(
            "gcloud command failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();
    if token.is_empty() {
        bail!(
            "Secret {} (version {}) in project {} is empty",
            secret.secret_id,
            secret.version,
            secret.project
        );
    }
    Ok(token)
}
