use std::fmt::Display;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;

// -----------------------------------------------------------------------------
// Types

/// A remote repository identifier, e.g. `cdapio/cdap`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoId(pub String);

/// The allow-list of repositories processed by a run, in file order.
#[derive(Debug, Clone, Default)]
pub struct RepoList {
    repos: Vec<RepoId>,
}

// -----------------------------------------------------------------------------
// RepoId impl

impl RepoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The repository name without its owner, used as the checkout directory name.
    pub fn name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl Display for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// RepoList impl

impl RepoList {
    /// Parse a newline-separated list of `owner/name` entries.
    /// Blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        let repos = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(RepoId::new)
            .collect();
        Self { repos }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read repository list {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    /// Expand a partial repository path (e.g. `cdap`) to a known identifier
    /// (e.g. `cdapio/cdap`). Unknown names are returned verbatim.
    pub fn resolve(&self, partial: &str) -> RepoId {
        let partial = partial.trim().trim_end_matches('/');
        let partial = partial.strip_suffix(".git").unwrap_or(partial);
        let segment_suffix = format!("/{partial}");
        self.repos
            .iter()
            .find(|r| r.0 == partial || r.0.ends_with(&segment_suffix))
            .cloned()
            .unwrap_or_else(|| RepoId::new(partial))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RepoId> {
        self.repos.iter()
    }
}
