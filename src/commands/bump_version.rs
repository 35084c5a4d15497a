use std::ops::ControlFlow;

use anyhow::Context;
use anyhow::Result;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::App;
use crate::app::ChangeTarget;
use crate::change::ChangeKind;
use crate::change::RepoOutcome;
use crate::manifest;
use crate::manifest::MANIFEST_FILE_NAME;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::prompt::PromptOps;
use crate::repo::RepoId;
use crate::resolver::ReleaseMap;
use crate::version::ReleaseVersion;

impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    /// Move one repository on to the next SNAPSHOT after a release.
    ///
    /// Every tracked `pom.xml` has its first `<version>` incremented
    /// (`6.1.4` becomes `6.1.5-SNAPSHOT`). Once the PR is open the release
    /// branch is tagged with the released version of the first manifest.
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn bump_to_snapshot(
        &self,
        repo: &RepoId,
        version: &ReleaseVersion,
        map: &ReleaseMap,
    ) -> Result<RepoOutcome> {
        let target = match self
            .begin_change(repo, ChangeKind::BumpToSnapshot, version, map)
            .await?
        {
            ControlFlow::Continue(target) => target,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        let mut released_version: Option<String> = None;
        let manifests = self
            .git
            .tracked_files_named(&target.dir, MANIFEST_FILE_NAME)
            .await?;
        for relative in manifests {
            let path = target.dir.join(&relative);
            let original = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;

            let Some(current) = manifest::project_version(&original) else {
                warn!("POM file ('{}') declares no version, skipping", relative.display());
                continue;
            };
            if manifest::is_snapshot(current) {
                let expected = self.prompt.confirm(&format!(
                    "POM file ('{}') is already set to a SNAPSHOT version ({}), is this expected?",
                    relative.display(),
                    current
                ))?;
                if expected {
                    continue;
                }
                self.workspace.destroy(repo).await?;
                return Ok(RepoOutcome::Reverted);
            }

            let next = manifest::next_snapshot(current)
                .with_context(|| format!("Invalid version in {}", relative.display()))?;
            info!("Bumping {} from {} to {}", relative.display(), current, next);
            released_version.get_or_insert_with(|| current.to_string());

            let updated = manifest::set_project_version(&original, &next);
            tokio::fs::write(&path, &updated)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let outcome = self
            .conclude_change(&target, released_version.is_some())
            .await?;
        if let (RepoOutcome::PrOpened { .. }, Some(released)) = (&outcome, &released_version) {
            self.tag_release(&target, released).await;
        }
        Ok(outcome)
    }

    /// Tag the tip of the release branch as `v<released>`. Failures are only logged.
    async fn tag_release(&self, target: &ChangeTarget, released: &str) {
        let tag = format!("v{released}");
        let result = async {
            self.git
                .checkout(&target.dir, &target.release_branch)
                .await?;
            self.git.tag_and_push(&target.dir, &tag).await
        }
        .await;
        match result {
            Ok(()) => info!("Tagged {} as {}", target.repo, tag),
            Err(e) => warn!("Failed to tag {} as {}: {:#}", target.repo, tag, e),
        }
    }
}
