#![allow(async_fn_in_trait)]

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;
use tracing::instrument;
use tracing::warn;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations for interacting with Git checkouts
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Clone `url` into `dest`. The parent directory of `dest` must exist.
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Discard all local changes in the working tree.
    async fn reset_hard(&self, dir: &Path) -> Result<()>;

    /// Check out an existing branch and pull the latest from all remotes.
    async fn checkout(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Create a new local branch from HEAD and check it out.
    async fn create_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Names of all branches on `origin`.
    async fn remote_branches(&self, dir: &Path) -> Result<Vec<String>>;

    async fn delete_local_branch(&self, dir: &Path, branch: &str) -> Result<()>;
    async fn delete_remote_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Stage every change in the working tree and commit it.
    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()>;

    /// Force-push a local branch to `origin`.
    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Tag HEAD and push the tag to `origin`.
    async fn tag_and_push(&self, dir: &Path, tag: &str) -> Result<()>;

    /// Tracked files (relative to `dir`) whose file name is `file_name`.
    async fn tracked_files_named(&self, dir: &Path, file_name: &str) -> Result<Vec<PathBuf>>;

    /// Reset submodules to their recorded commits, then move them to the
    /// latest commit of their configured remote branch.
    async fn update_submodules(&self, dir: &Path) -> Result<()>;

    /// Human-readable `git status` output in the C locale.
    async fn status(&self, dir: &Path) -> Result<String>;
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit;

impl RealGit {
    #[instrument(skip_all, fields(args = ?args))]
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(dir)
            .env("LC_ALL", "C")
            .args(args)
            .output()
            .await
            .context("Failed to execute git command")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("stdout: {}", stdout.trim_end());
        debug!("stderr: {}", stderr.trim_end());

        if !output.status.success() {
            return Err(anyhow!(
                "git {} failed: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            ));
        }

        Ok(stdout.into_owned())
    }
}

impl GitOps for RealGit {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        let parent = dest
            .parent()
            .context("Clone destination has no parent directory")?;
        let dest = dest.to_string_lossy();
        self.run(parent, &["clone", url, &dest]).await?;
        Ok(())
    }

    async fn reset_hard(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["reset", "--hard"]).await?;
        Ok(())
    }

    async fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["checkout", branch]).await?;
        self.run(dir, &["pull", "--all"]).await?;
        Ok(())
    }

    async fn create_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["checkout", "-b", branch]).await?;
        Ok(())
    }

    async fn remote_branches(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self.run(dir, &["ls-remote", "--heads", "origin"]).await?;

        // Each line is "<sha>\trefs/heads/<branch>"
        let branches = output
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .map(|(_, reference)| {
                reference
                    .strip_prefix("refs/heads/")
                    .unwrap_or(reference)
                    .to_string()
            })
            .collect();

        Ok(branches)
    }

    async fn delete_local_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["branch", "-D", branch]).await?;
        Ok(())
    }

    async fn delete_remote_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["push", "origin", "--delete", branch]).await?;
        Ok(())
    }

    async fn commit_all(&self, dir: &Path, message: &str) -> Result<()> {
        self.run(dir, &["add", "-A"]).await?;
        self.run(dir, &["commit", "-m", message]).await?;
        Ok(())
    }

    async fn push_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["push", "-f", "origin", branch]).await?;
        Ok(())
    }

    async fn tag_and_push(&self, dir: &Path, tag: &str) -> Result<()> {
        self.run(dir, &["tag", tag]).await?;
        self.run(dir, &["push", "origin", tag]).await?;
        Ok(())
    }

    async fn tracked_files_named(&self, dir: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
        let pattern = format!("*{file_name}");
        let output = self.run(dir, &["ls-files", "--", &pattern]).await?;

        let files = output
            .lines()
            .map(PathBuf::from)
            .filter(|path| path.file_name().is_some_and(|name| name == file_name))
            .collect();

        Ok(files)
    }

    async fn update_submodules(&self, dir: &Path) -> Result<()> {
        // Drop modifications left behind by a previous attempt
        if let Err(e) = self.run(dir, &["submodule", "update"]).await {
            warn!("Failed to reset submodules: {:#}", e);
        }
        self.run(dir, &["submodule", "update", "--init", "--recursive", "--remote"])
            .await?;
        Ok(())
    }

    async fn status(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["status"]).await
    }
}
