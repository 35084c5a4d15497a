use std::fmt::Display;

use clap::ValueEnum;

use crate::version::ReleaseVersion;

/// The automated mutation applied to a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChangeKind {
    /// 6.1.4-SNAPSHOT -> 6.1.4
    #[value(name = "remove_snapshot")]
    RemoveSnapshot,
    /// 6.1.4 -> 6.1.5-SNAPSHOT
    #[value(name = "bump_to_snapshot")]
    BumpToSnapshot,
    /// Move aggregator submodules to the tip of their release branches
    #[value(name = "update_submodules")]
    UpdateSubmodules,
}

impl ChangeKind {
    /// The change branch for this kind of change, e.g. `release-remove-snapshot-614`.
    pub fn branch_name(&self, version: &ReleaseVersion) -> String {
        let stem = match self {
            Self::RemoveSnapshot => "remove-snapshot",
            Self::BumpToSnapshot => "bump-versions",
            Self::UpdateSubmodules => "update-submodules",
        };
        format!("release-{}-{}", stem, version.compact())
    }

    pub fn commit_message(&self) -> &'static str {
        match self {
            Self::RemoveSnapshot => "Removed SNAPSHOT from pom files.",
            Self::BumpToSnapshot => "Bumped versions to next SNAPSHOT.",
            Self::UpdateSubmodules => "Updated submodules for release",
        }
    }

    pub fn pr_title(&self, version: &ReleaseVersion) -> String {
        let summary = match self {
            Self::RemoveSnapshot => "Remove SNAPSHOTs",
            Self::BumpToSnapshot => "Bump to SNAPSHOT",
            Self::UpdateSubmodules => "Update submodules",
        };
        format!("[RELEASE-{}] {}", version, summary)
    }

    pub fn pr_body(&self) -> &'static str {
        match self {
            Self::RemoveSnapshot => {
                "This is an automated PR to remove -SNAPSHOT from artifact versions to prepare for release."
            }
            Self::BumpToSnapshot => {
                "This is an automated PR to bump artifact versions to SNAPSHOT after a release is completed."
            }
            Self::UpdateSubmodules => {
                "This is an automated PR to update submodules in preparation for release."
            }
        }
    }
}

/// Result of creating a change branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The branch is checked out and ready for changes.
    Created,
    /// A previous run already opened a PR with the correct changes.
    AlreadySatisfied,
    /// A stale branch could not be deleted; the operator must fix it manually.
    Aborted,
}

/// Result of mutating one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    PrOpened { url: String },
    /// Every manifest was already in the target form.
    NothingToRelease,
    AlreadySatisfied,
    /// The operator declined to continue; the checkout was deleted.
    Reverted,
    Aborted,
}

impl Display for RepoOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PrOpened { url } => write!(f, "PR opened: {url}"),
            Self::NothingToRelease => f.write_str("no changes, nothing to release"),
            Self::AlreadySatisfied => f.write_str("existing PR already has the changes"),
            Self::Reverted => f.write_str("reverted, needs manual attention"),
            Self::Aborted => f.write_str("aborted, needs manual attention"),
        }
    }
}
