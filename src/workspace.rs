use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use tracing::info;
use tracing::warn;

use crate::ops::git::GitOps;
use crate::repo::RepoId;

/// The directory holding one working checkout per repository.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    remote_base: String,
}

impl Workspace {
    pub fn new(root: PathBuf, remote_base: String) -> Self {
        Self { root, remote_base }
    }

    /// Where the checkout of `repo` lives.
    pub fn repo_path(&self, repo: &RepoId) -> PathBuf {
        self.root.join(repo.name())
    }

    pub fn clone_url(&self, repo: &RepoId) -> String {
        let id = repo.0.strip_suffix(".git").unwrap_or(&repo.0);
        format!("{}{}.git", self.remote_base, id)
    }

    /// Make sure a clean checkout of `repo` exists: clone it if absent,
    /// otherwise discard any local changes left by a previous run.
    pub async fn prepare(&self, git: &impl GitOps, repo: &RepoId) -> Result<PathBuf> {
        let path = self.repo_path(repo);
        if tokio::fs::try_exists(&path).await? {
            git.reset_hard(&path)
                .await
                .with_context(|| format!("Failed to reset checkout of {}", repo))?;
        } else {
            tokio::fs::create_dir_all(&self.root).await.with_context(|| {
                format!("Failed to create workspace {}", self.root.display())
            })?;
            info!("Cloning {}", repo);
            git.clone_repo(&self.clone_url(repo), &path)
                .await
                .with_context(|| format!("Failed to clone {}", repo))?;
        }
        Ok(path)
    }

    /// Delete the checkout of `repo` so the next run starts from a fresh clone.
    pub async fn destroy(&self, repo: &RepoId) -> Result<()> {
        let path = self.repo_path(repo);
        warn!("Reverting repo {}", repo);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()));
            }
        }
        warn!(
            "Revert of {} is complete, please resolve this issue and try again. \
             You may edit the repository list to only target this repo in future runs.",
            repo
        );
        Ok(())
    }
}
