use std::ops::ControlFlow;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use tokio::io::AsyncWriteExt as _;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::change::BranchOutcome;
use crate::change::ChangeKind;
use crate::change::RepoOutcome;
use crate::config::Config;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::PromptOps;
use crate::repo::RepoId;
use crate::resolver::ReleaseMap;
use crate::version::ReleaseVersion;
use crate::workspace::Workspace;

pub struct App<G: GitOps, H: GithubOps, P: PromptOps> {
    pub config: Config,
    pub workspace: Workspace,
    pub git: G,
    pub gh: H,
    pub prompt: P,
}

impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    pub fn new(config: Config, git: G, gh: H, prompt: P) -> Self {
        let workspace = Workspace::new(config.workspace.clone(), config.remote_base.clone());
        Self {
            config,
            workspace,
            git,
            gh,
            prompt,
        }
    }
}

/// A repository checked out on a fresh change branch.
#[derive(Debug, Clone)]
pub(crate) struct ChangeTarget {
    pub dir: PathBuf,
    pub repo: RepoId,
    pub kind: ChangeKind,
    pub version: ReleaseVersion,
    pub release_branch: String,
    pub change_branch: String,
}

/// Shared helper methods for App
impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    /// Create and check out a change branch, recovering from leftovers of an
    /// interrupted previous run.
    ///
    /// 1. Try to create the branch locally and check whether it exists on the remote.
    /// 2. If creation succeeded and the remote has no such branch, we are done.
    /// 3. Otherwise a previous run probably got part way. If it already opened a PR:
    ///    - ask the operator whether the PR is correct; if so the repo is done,
    ///    - if not, close the PR.
    /// 4. Delete the stale remote branch and/or local branch.
    /// 5. If local creation had failed, try again exactly once.
    pub(crate) async fn create_change_branch(
        &self,
        dir: &Path,
        repo: &RepoId,
        branch: &str,
    ) -> Result<BranchOutcome> {
        let mut retried = false;
        loop {
            let remote_branches = self.git.remote_branches(dir).await?;
            let created = self.git.create_branch(dir, branch).await.is_ok();
            let exists_in_remote = remote_branches.iter().any(|b| b == branch);

            if created && !exists_in_remote {
                return Ok(BranchOutcome::Created);
            }
            if retried {
                bail!(
                    "Failed to create branch '{}' in repo '{}' after deleting the existing one",
                    branch,
                    repo
                );
            }

            warn!(
                "Failed to create branch '{}' in repo '{}', a branch with that name already exists",
                branch, repo
            );

            if let Some(url) = self.gh.open_pr_url(dir, branch).await? {
                warn!(
                    "A PR for this branch has already been created (maybe this was already run for this release?): {}",
                    url
                );
                self.prompt
                    .pause("Please review the PR to determine if the correct changes are already present. Press Enter to view it in a browser")?;
                if let Err(e) = self.gh.pr_view_web(dir, branch).await {
                    warn!("Could not open the PR in a browser: {:#}", e);
                }
                self.record_pr(&url).await?;

                if self.prompt.confirm("Does the PR contain the correct changes?")? {
                    info!("Skipping re-processing {} since the correct PR already exists", repo);
                    return Ok(BranchOutcome::AlreadySatisfied);
                }

                info!("Closing incorrect PR {}", url);
                if let Err(e) = self.gh.pr_close(dir, branch).await {
                    warn!("Failed to close PR {}: {:#}", url, e);
                }
            }

            info!("Deleting existing branch '{}' and recreating it", branch);
            let mut deleted = true;
            if exists_in_remote && let Err(e) = self.git.delete_remote_branch(dir, branch).await {
                error!("{:#}", e);
                deleted = false;
            }
            if !created && let Err(e) = self.git.delete_local_branch(dir, branch).await {
                error!("{:#}", e);
                deleted = false;
            }
            if !deleted {
                error!(
                    "Failed to delete branch '{}' in repo '{}'. Please resolve this issue manually and rerun",
                    branch, repo
                );
                return Ok(BranchOutcome::Aborted);
            }

            if created {
                // Only the remote copy was stale; the new local branch is checked out
                return Ok(BranchOutcome::Created);
            }
            retried = true;
        }
    }

    /// Check out the release branch of `repo` and create the change branch for `kind`.
    ///
    /// Breaks with the repository's outcome when there is nothing left to change.
    pub(crate) async fn begin_change(
        &self,
        repo: &RepoId,
        kind: ChangeKind,
        version: &ReleaseVersion,
        map: &ReleaseMap,
    ) -> Result<ControlFlow<RepoOutcome, ChangeTarget>> {
        let dir = self.workspace.prepare(&self.git, repo).await?;
        let release_branch = map.branch_for(repo, version);
        self.git
            .checkout(&dir, &release_branch)
            .await
            .with_context(|| format!("Failed to check out {} in {}", release_branch, repo))?;

        let change_branch = kind.branch_name(version);
        match self.create_change_branch(&dir, repo, &change_branch).await? {
            BranchOutcome::Created => {}
            BranchOutcome::AlreadySatisfied => {
                return Ok(ControlFlow::Break(RepoOutcome::AlreadySatisfied));
            }
            BranchOutcome::Aborted => return Ok(ControlFlow::Break(RepoOutcome::Aborted)),
        }

        Ok(ControlFlow::Continue(ChangeTarget {
            dir,
            repo: repo.clone(),
            kind,
            version: version.clone(),
            release_branch,
            change_branch,
        }))
    }

    /// Commit everything, push the change branch and open a PR against the release branch.
    pub(crate) async fn open_pull_request(&self, target: &ChangeTarget) -> Result<String> {
        let dir = &target.dir;
        self.git.commit_all(dir, target.kind.commit_message()).await?;
        self.git.push_branch(dir, &target.change_branch).await?;
        let url = self
            .gh
            .pr_create(
                dir,
                &target.change_branch,
                &target.release_branch,
                &target.kind.pr_title(&target.version),
                target.kind.pr_body(),
                &self.config.pr_label,
            )
            .await?;
        info!(
            "Created PR {} -> {}: {}",
            target.change_branch, target.release_branch, url
        );
        Ok(url)
    }

    /// Open and record a PR for the change branch, or drop it when nothing changed.
    pub(crate) async fn conclude_change(
        &self,
        target: &ChangeTarget,
        changed: bool,
    ) -> Result<RepoOutcome> {
        if !changed {
            info!(
                "No changes in {}, deleting branch '{}'",
                target.repo, target.change_branch
            );
            self.git.checkout(&target.dir, &target.release_branch).await?;
            self.git
                .delete_local_branch(&target.dir, &target.change_branch)
                .await?;
            return Ok(RepoOutcome::NothingToRelease);
        }
        let url = self.open_pull_request(target).await?;
        self.record_pr(&url).await?;
        Ok(RepoOutcome::PrOpened { url })
    }

    /// Append a PR URL to the PR output file.
    pub(crate) async fn record_pr(&self, url: &str) -> Result<()> {
        let path = &self.config.pr_output;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(format!("{}\n", url.trim()).as_bytes())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }

    /// Replace the PR output file left by a previous run with an empty one.
    pub(crate) async fn reset_pr_output(&self) -> Result<()> {
        let path = &self.config.pr_output;
        match tokio::fs::remove_file(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to delete {}", path.display()));
            }
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(path, "")
            .await
            .with_context(|| format!("Failed to create {}", path.display()))
    }

    /// URLs recorded in the PR output file so far.
    pub(crate) async fn recorded_prs(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.config.pr_output).await {
            Ok(contents) => Ok(contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to read {}", self.config.pr_output.display())),
        }
    }
}
