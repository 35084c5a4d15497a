use crate::change::RepoOutcome;
use crate::repo::RepoId;

pub mod bump_version;
pub mod modify_versions;
pub mod release_notes;
pub mod remove_snapshot;
pub mod update_submodules;

/// Outcome of every repository processed by a run, in processing order.
pub type RunReport = Vec<(RepoId, anyhow::Result<RepoOutcome>)>;
