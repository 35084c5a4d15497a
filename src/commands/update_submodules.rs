use std::ops::ControlFlow;

use anyhow::Result;
use colored::Colorize;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::change::ChangeKind;
use crate::change::RepoOutcome;
use crate::commands::RunReport;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::PromptOps;
use crate::ops::prompt::SubmoduleChoice;
use crate::repo::RepoId;
use crate::resolver::ReleaseMap;
use crate::version::ReleaseVersion;

const CLEAN_STATUS: &str = "nothing to commit, working tree clean";

impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    /// Point the submodules of every aggregator repository at the tip of their
    /// release branches, one PR per aggregator.
    ///
    /// Aggregators are processed in configured order and each PR must be merged
    /// before the next one starts, since later aggregators may include earlier
    /// ones as submodules. An aborted or failed aggregator stops the refresh.
    pub async fn update_submodules(
        &self,
        version: &ReleaseVersion,
        map: &ReleaseMap,
        stdout: &mut impl std::io::Write,
    ) -> Result<RunReport> {
        let mut report = RunReport::new();
        for repo in &self.config.aggregator_repos {
            let result = self.refresh_submodules(repo, version, map, stdout).await;
            let stop = matches!(result, Ok(RepoOutcome::Aborted) | Err(_));
            if let Err(e) = &result {
                error!("Failed to update submodules of {}: {:#}", repo, e);
            }
            report.push((repo.clone(), result));
            if stop {
                warn!("Stopping the submodule refresh at {}", repo);
                break;
            }
        }
        Ok(report)
    }

    #[instrument(skip_all, fields(repo = %repo))]
    async fn refresh_submodules(
        &self,
        repo: &RepoId,
        version: &ReleaseVersion,
        map: &ReleaseMap,
        stdout: &mut impl std::io::Write,
    ) -> Result<RepoOutcome> {
        let target = match self
            .begin_change(repo, ChangeKind::UpdateSubmodules, version, map)
            .await?
        {
            ControlFlow::Continue(target) => target,
            ControlFlow::Break(RepoOutcome::AlreadySatisfied) => {
                self.prompt
                    .pause("Press Enter once the existing PR is merged to continue")?;
                return Ok(RepoOutcome::AlreadySatisfied);
            }
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        loop {
            info!("Updating submodules of {}", repo);
            self.git.update_submodules(&target.dir).await?;
            let status = self.git.status(&target.dir).await?;

            if !status.contains(CLEAN_STATUS) {
                let url = self.open_pull_request(&target).await?;
                self.record_pr(&url).await?;
                writeln!(stdout, "Opened PR to update submodules of {}: {}", repo, url.cyan())?;
                self.prompt
                    .pause("Press Enter once the PR is reviewed and merged to continue")?;
                return Ok(RepoOutcome::PrOpened { url });
            }

            let submodules = map
                .submodules_of(repo)
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            warn!(
                "No submodule changes found in {}. Make sure the latest PRs of its submodules are merged: {}",
                repo,
                submodules.join(", ")
            );
            match self
                .prompt
                .retry_or_skip("Retry updating the submodules, or skip this repository?")?
            {
                SubmoduleChoice::Retry => continue,
                SubmoduleChoice::Skip => {
                    self.workspace.destroy(repo).await?;
                    return Ok(RepoOutcome::NothingToRelease);
                }
            }
        }
    }
}
