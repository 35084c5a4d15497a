use anyhow::Result;
use colored::Colorize;
use tracing::error;
use tracing::info;

use crate::App;
use crate::change::ChangeKind;
use crate::change::RepoOutcome;
use crate::commands::RunReport;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::PromptOps;
use crate::repo::RepoList;
use crate::resolver::BranchResolver;
use crate::resolver::ReleaseMap;
use crate::version::ReleaseVersion;

impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    /// Apply `kind` to the repositories of a release.
    ///
    /// 1. Clear the PR output file of the previous run.
    /// 2. Resolve the release branch of every repository from the root repository's submodules.
    /// 3. Process the repository list (or the aggregators, for submodule refreshes) one at a time.
    ///    A failing repository is reported and the batch moves on.
    /// 4. Print the outcome of every repository and the PRs awaiting approval.
    pub async fn cmd_modify_versions(
        &self,
        version: &ReleaseVersion,
        kind: ChangeKind,
        repos: &RepoList,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        self.reset_pr_output().await?;

        info!(
            "Resolving release branches from {} for version {}",
            self.config.root_repo, version
        );
        let map = BranchResolver::new(&self.git, &self.workspace, repos)
            .resolve(version, &self.config.root_repo)
            .await?;

        let report = match kind {
            ChangeKind::RemoveSnapshot | ChangeKind::BumpToSnapshot => {
                self.modify_all(kind, version, repos, &map).await
            }
            ChangeKind::UpdateSubmodules => self.update_submodules(version, &map, stdout).await?,
        };

        self.write_summary(&report, stdout).await
    }

    async fn modify_all(
        &self,
        kind: ChangeKind,
        version: &ReleaseVersion,
        repos: &RepoList,
        map: &ReleaseMap,
    ) -> RunReport {
        let mut report = RunReport::new();
        for repo in repos.iter() {
            let result = match kind {
                ChangeKind::BumpToSnapshot => self.bump_to_snapshot(repo, version, map).await,
                _ => self.remove_snapshot(repo, version, map).await,
            };
            if let Err(e) = &result {
                error!("Failed to process {}: {:#}", repo, e);
            }
            report.push((repo.clone(), result));
        }
        report
    }

    async fn write_summary(
        &self,
        report: &RunReport,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(stdout, "{}", "Summary:".bold())?;
        for (repo, result) in report {
            let line = match result {
                Ok(outcome @ (RepoOutcome::PrOpened { .. } | RepoOutcome::AlreadySatisfied)) => {
                    format!("{} {}: {}", "✓".green(), repo, outcome)
                }
                Ok(outcome @ RepoOutcome::NothingToRelease) => {
                    format!("{} {}: {}", "-".dimmed(), repo, outcome)
                }
                Ok(outcome) => format!("{} {}: {}", "!".yellow(), repo, outcome),
                Err(e) => format!("{} {}: {:#}", "✗".red(), repo, e),
            };
            writeln!(stdout, "  {}", line)?;
        }

        let prs = self.recorded_prs().await?;
        writeln!(stdout, "{}", "PRs for approval:".bold())?;
        if prs.is_empty() {
            writeln!(stdout, "  (none)")?;
        }
        for pr in prs {
            writeln!(stdout, "  {}", pr.cyan())?;
        }
        Ok(())
    }
}
