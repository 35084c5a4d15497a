//! Release branch discovery over the submodule graph.
//!
//! The version of the product (e.g. 6.1.4) is not the version of every
//! repository bundled with it: CDAP 6.1.4 lives on `release/6.1` of the root
//! repository, while its plugins may live on `release/2.3` of theirs. Each
//! repository's `.gitmodules` on its release branch declares the branch of
//! every submodule, so walking the submodules depth-first from the root yields
//! the release branch of every repository in the product.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use regex::Regex;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::ops::git::GitOps;
use crate::repo::RepoId;
use crate::repo::RepoList;
use crate::version::ReleaseVersion;
use crate::workspace::Workspace;

const GITMODULES_FILE: &str = ".gitmodules";

static SUBMODULE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)url = [./]*(.*)$\n^.*branch = [./]*(.*)$").unwrap()
});

/// A submodule declaration: where it lives and which branch it tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleDecl {
    pub path: String,
    pub branch: String,
}

/// Release branches and the submodule graph discovered for one run.
#[derive(Debug, Clone, Default)]
pub struct ReleaseMap {
    pub branches: BTreeMap<RepoId, String>,
    pub submodules: BTreeMap<RepoId, Vec<RepoId>>,
}

impl ReleaseMap {
    /// The release branch of `repo`: its discovered branch, or the version's default.
    pub fn branch_for(&self, repo: &RepoId, version: &ReleaseVersion) -> String {
        self.branches
            .get(repo)
            .cloned()
            .unwrap_or_else(|| version.release_branch())
    }

    pub fn submodules_of(&self, repo: &RepoId) -> &[RepoId] {
        self.submodules.get(repo).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Extract the submodules that declare a branch from a `.gitmodules` file.
pub fn parse_gitmodules(contents: &str) -> Vec<SubmoduleDecl> {
    SUBMODULE_RE
        .captures_iter(contents)
        .map(|c| SubmoduleDecl {
            path: submodule_path(&c[1]),
            branch: c[2].trim().to_string(),
        })
        .collect()
}

/// Reduce a submodule URL to a repository path that can be matched against the repo list.
fn submodule_path(url: &str) -> String {
    let url = url.trim();
    let url = url
        .strip_prefix("git@github.com:")
        .or_else(|| url.strip_prefix("https://github.com/"))
        .unwrap_or(url);
    url.strip_suffix(".git").unwrap_or(url).to_string()
}

// -----------------------------------------------------------------------------
// BranchResolver

/// Walks the submodule graph once per run.
pub struct BranchResolver<'a, G: GitOps> {
    git: &'a G,
    workspace: &'a Workspace,
    repos: &'a RepoList,
    map: ReleaseMap,
    /// Repositories on the current descent path, root first.
    path: Vec<RepoId>,
    visited: HashSet<RepoId>,
}

impl<'a, G: GitOps> BranchResolver<'a, G> {
    pub fn new(git: &'a G, workspace: &'a Workspace, repos: &'a RepoList) -> Self {
        Self {
            git,
            workspace,
            repos,
            map: ReleaseMap::default(),
            path: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Start from known branches. Seeded entries are never overwritten.
    pub fn with_branches(mut self, branches: BTreeMap<RepoId, String>) -> Self {
        self.map.branches = branches;
        self
    }

    /// Resolve the release branch of `root` and, transitively, of all its submodules.
    pub async fn resolve(mut self, version: &ReleaseVersion, root: &RepoId) -> Result<ReleaseMap> {
        let mut pending = vec![Step::Enter(root.clone())];

        // Explicit stack in place of recursion: Enter pushes the node onto the
        // descent path and schedules its children, Leave pops it again.
        while let Some(step) = pending.pop() {
            match step {
                Step::Enter(repo) => {
                    if self.path.contains(&repo) {
                        let cycle = self
                            .path
                            .iter()
                            .chain(std::iter::once(&repo))
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" -> ");
                        bail!("submodule cycle detected: {}", cycle);
                    }
                    if !self.visited.insert(repo.clone()) {
                        continue;
                    }
                    let children = self.scan(version, &repo).await?;
                    self.path.push(repo);
                    pending.push(Step::Leave);
                    pending.extend(children.into_iter().rev().map(Step::Enter));
                }
                Step::Leave => {
                    self.path.pop();
                }
            }
        }

        Ok(self.map)
    }

    /// Check out `repo` on its release branch and record its submodules.
    #[instrument(skip_all, fields(repo = %repo))]
    async fn scan(&mut self, version: &ReleaseVersion, repo: &RepoId) -> Result<Vec<RepoId>> {
        info!("Scanning repo '{}' for submodules", repo);
        let branch = self
            .map
            .branches
            .entry(repo.clone())
            .or_insert_with(|| version.release_branch())
            .clone();

        let dir = self.workspace.prepare(self.git, repo).await?;
        self.git
            .checkout(&dir, &branch)
            .await
            .with_context(|| format!("Failed to check out {} in {}", branch, repo))?;

        let gitmodules = dir.join(GITMODULES_FILE);
        let contents = match tokio::fs::read(&gitmodules).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                warn!("Failed to read {}, treating it as empty: {}", gitmodules.display(), e);
                return Ok(Vec::new());
            }
        };

        let mut children = Vec::new();
        for decl in parse_gitmodules(&contents) {
            let child = self.repos.resolve(&decl.path);
            self.map
                .branches
                .entry(child.clone())
                .or_insert(decl.branch);
            children.push(child);
        }

        info!("Found {} submodules", children.len());
        self.map.submodules.insert(repo.clone(), children.clone());
        Ok(children)
    }
}

enum Step {
    Enter(RepoId),
    Leave,
}
