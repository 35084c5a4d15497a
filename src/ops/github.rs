#![allow(async_fn_in_trait)]

use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;

// -----------------------------------------------------------------------------
// GithubOps trait

/// Pull request operations for the repository checked out at `dir`
#[cfg_attr(test, automock)]
pub trait GithubOps {
    /// Get the URL of the open PR whose head is `branch`, returns None if no open PR exists
    async fn open_pr_url(&self, dir: &Path, branch: &str) -> Result<Option<String>>;

    /// Open the PR for `branch` in the browser
    async fn pr_view_web(&self, dir: &Path, branch: &str) -> Result<()>;

    async fn pr_close(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Create a new PR and return the PR URL
    async fn pr_create(
        &self,
        dir: &Path,
        pr_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<String>;
}

// -----------------------------------------------------------------------------
// RealGithub

/// Real implementation that calls the gh CLI
pub struct RealGithub;

impl GithubOps for RealGithub {
    #[instrument(skip(self, dir))]
    async fn open_pr_url(&self, dir: &Path, branch: &str) -> Result<Option<String>> {
        let output = Command::new("gh")
            .current_dir(dir)
            .args([
                "pr",
                "view",
                branch,
                "--json",
                "url,state",
                "--jq",
                "[.state, .url] | join(\" \")",
            ])
            .output()
            .await
            .context("Failed to execute gh command")?;

        if !output.status.success() {
            // PR doesn't exist
            debug!("{}", String::from_utf8_lossy(&output.stderr).trim());
            return Ok(None);
        }

        let stdout = String::from_utf8(output.stdout)?;
        Ok(match stdout.trim().split_once(' ') {
            Some(("OPEN", url)) => Some(url.to_string()),
            _ => None,
        })
    }

    #[instrument(skip(self, dir))]
    async fn pr_view_web(&self, dir: &Path, branch: &str) -> Result<()> {
        let output = Command::new("gh")
            .current_dir(dir)
            .args(["pr", "view", "--web", branch])
            .output()
            .await
            .context("Failed to execute gh command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "gh command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    #[instrument(skip(self, dir))]
    async fn pr_close(&self, dir: &Path, branch: &str) -> Result<()> {
        let output = Command::new("gh")
            .current_dir(dir)
            .args(["pr", "close", branch])
            .output()
            .await
            .context("Failed to execute gh command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "gh command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    #[instrument(skip(self, dir, body))]
    async fn pr_create(
        &self,
        dir: &Path,
        pr_branch: &str,
        base_branch: &str,
        title: &str,
        body: &str,
        label: &str,
    ) -> Result<String> {
        let output = Command::new("gh")
            .current_dir(dir)
            .args([
                "pr",
                "create",
                "--head",
                pr_branch,
                "--base",
                base_branch,
                "--title",
                title,
                "--body",
                body,
                "--label",
                label,
            ])
            .output()
            .await
            .context("Failed to execute gh command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "gh command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        // gh pr create outputs the PR URL to stdout
        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}
