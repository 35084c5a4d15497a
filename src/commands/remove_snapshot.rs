use std::ops::ControlFlow;

use anyhow::Context;
use anyhow::Result;
use tracing::info;
use tracing::instrument;

use crate::App;
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
    /// Release the artifact versions of one repository.
    ///
    /// 1. Check out the release branch and create `release-remove-snapshot-<compact>`.
    /// 2. In every tracked `pom.xml`, strip `-SNAPSHOT` from the first snapshot
    ///    `<version>` and, with the operator's consent, from `<cdap.version>`.
    /// 3. Open a PR against the release branch, or drop the branch if nothing changed.
    ///
    /// Unexpected manifest state the operator does not accept reverts the
    /// repository (its checkout is deleted).
    #[instrument(skip_all, fields(repo = %repo))]
    pub async fn remove_snapshot(
        &self,
        repo: &RepoId,
        version: &ReleaseVersion,
        map: &ReleaseMap,
    ) -> Result<RepoOutcome> {
        let target = match self
            .begin_change(repo, ChangeKind::RemoveSnapshot, version, map)
            .await?
        {
            ControlFlow::Continue(target) => target,
            ControlFlow::Break(outcome) => return Ok(outcome),
        };

        let mut changed = false;
        let manifests = self
            .git
            .tracked_files_named(&target.dir, MANIFEST_FILE_NAME)
            .await?;
        for relative in manifests {
            let path = target.dir.join(&relative);
            let original = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;

            let mut updated = match manifest::strip_snapshot(&original) {
                Some(updated) => updated,
                None => {
                    let current = manifest::project_version(&original).unwrap_or("none");
                    let expected = self.prompt.confirm(&format!(
                        "POM file ('{}') is already set to a non-SNAPSHOT version ({}), is this expected?",
                        relative.display(),
                        current
                    ))?;
                    if expected {
                        continue;
                    }
                    self.workspace.destroy(repo).await?;
                    return Ok(RepoOutcome::Reverted);
                }
            };

            let dependency_snapshot = manifest::product_dependency_version(&updated)
                .filter(|v| manifest::is_snapshot(v))
                .map(str::to_string);
            if let Some(dependency) = dependency_snapshot {
                let strip = self.prompt.confirm(&format!(
                    "POM file ('{}') depends on a SNAPSHOT version of CDAP ({}), remove the SNAPSHOT from it too?",
                    relative.display(),
                    dependency
                ))?;
                if !strip {
                    self.workspace.destroy(repo).await?;
                    return Ok(RepoOutcome::Reverted);
                }
                updated = manifest::strip_product_dependency_snapshot(&updated);
            }

            if updated != original {
                tokio::fs::write(&path, &updated)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("Released version in {}", relative.display());
                changed = true;
            }
        }

        self.conclude_change(&target, changed).await
    }
}
