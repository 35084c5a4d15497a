use std::path::PathBuf;

use anyhow::Result;

use crate::repo::RepoId;

/// Default Jira instance holding the release tickets
pub const DEFAULT_JIRA_URL: &str = "https://cdap.atlassian.net/";

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one checkout per repository.
    pub workspace: PathBuf,
    /// File collecting the URL of every automated PR of a run.
    pub pr_output: PathBuf,
    /// Prefix prepended to `owner/name.git` when cloning.
    pub remote_base: String,
    /// Repository whose submodules define the release branch of every other repository.
    pub root_repo: RepoId,
    /// Repositories whose submodule pointers are refreshed, in order.
    pub aggregator_repos: Vec<RepoId>,
    /// Label applied to every automated PR.
    pub pr_label: String,
    /// Base URL of the Jira instance, with trailing slash.
    pub jira_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("workspace"),
            pr_output: PathBuf::from("PRsToApprove.txt"),
            remote_base: "git@github.com:".to_string(),
            root_repo: RepoId::new("cdapio/cdap-build"),
            aggregator_repos: vec![
                RepoId::new("cdapio/hydrator-plugins"),
                RepoId::new("cdapio/cdap-build"),
            ],
            pr_label: "automated-release".to_string(),
            jira_url: DEFAULT_JIRA_URL.to_string(),
        }
    }
}

impl Config {
    /// Load config from git config (`relprep.*` keys), falling back to defaults
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(workspace) = read_git_config("relprep.workspace")? {
            config.workspace = PathBuf::from(workspace);
        }
        if let Some(pr_output) = read_git_config("relprep.prOutput")? {
            config.pr_output = PathBuf::from(pr_output);
        }
        if let Some(remote_base) = read_git_config("relprep.remoteBase")? {
            config.remote_base = remote_base;
        }
        if let Some(root_repo) = read_git_config("relprep.rootRepo")? {
            config.root_repo = RepoId::new(root_repo);
        }
        if let Some(aggregators) = read_git_config("relprep.aggregatorRepos")? {
            config.aggregator_repos = parse_repo_list(&aggregators);
        }
        if let Some(pr_label) = read_git_config("relprep.prLabel")? {
            config.pr_label = pr_label;
        }
        if let Some(jira_url) = read_git_config("relprep.jiraUrl")? {
            config.jira_url = normalize_base_url(&jira_url);
        }

        Ok(config)
    }

    /// Default config for tests
    pub fn default_for_tests(workspace: PathBuf) -> Self {
        Self {
            pr_output: workspace.join("PRsToApprove.txt"),
            workspace,
            remote_base: "file:///nonexistent/".to_string(),
            ..Self::default()
        }
    }
}

/// Read a single git config value. Unset keys yield `None`.
fn read_git_config(key: &str) -> Result<Option<String>> {
    let output = std::process::Command::new("git")
        .args(["config", "--get", key])
        .output()?;

    if !output.status.success() {
        return Ok(None);
    }

    let value = String::from_utf8(output.stdout)?.trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}

fn parse_repo_list(value: &str) -> Vec<RepoId> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(RepoId::new)
        .collect()
}

fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = Config::default();
        assert_eq!(config.root_repo, RepoId::new("cdapio/cdap-build"));
        assert_eq!(config.aggregator_repos.len(), 2);
        assert_eq!(config.pr_output, PathBuf::from("PRsToApprove.txt"));
        assert!(config.jira_url.ends_with('/'));
    }

    #[test]
    fn test_default_for_tests() {
        let config = Config::default_for_tests(PathBuf::from("/tmp/ws"));
        assert_eq!(config.workspace, PathBuf::from("/tmp/ws"));
        assert_eq!(config.pr_output, PathBuf::from("/tmp/ws/PRsToApprove.txt"));
    }

    #[test]
    fn test_parse_repo_list() {
        assert_eq!(
            parse_repo_list("cdapio/hydrator-plugins, cdapio/cdap-build,,"),
            vec![
                RepoId::new("cdapio/hydrator-plugins"),
                RepoId::new("cdapio/cdap-build")
            ]
        );
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://x.atlassian.net"), "https://x.atlassian.net/");
        assert_eq!(normalize_base_url("https://x.atlassian.net/"), "https://x.atlassian.net/");
    }
}
