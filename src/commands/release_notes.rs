use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
use colored::Colorize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::App;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::jira::JiraOps;
use crate::ops::jira::SearchResults;
use crate::ops::prompt::PromptOps;
use crate::release_notes;
use crate::release_notes::NOTES_FIELD;
use crate::release_notes::ReleaseNote;
use crate::release_notes::Section;
use crate::version::ReleaseVersion;

fn release_notes_query(version: &ReleaseVersion, with_notes: bool) -> String {
    format!(
        "project in (CDAP, \"CDAP Plugins\") AND fixVersion = {} AND \"Release Notes\" is {}EMPTY",
        version,
        if with_notes { "not " } else { "" }
    )
}

/// Fetch every page of a search, until `total` issues have been collected.
async fn search_all(jira: &impl JiraOps, jql: &str, fields: &str) -> Result<SearchResults> {
    let mut results = jira.search(jql, fields, 0).await?;
    while (results.issues.len() as u64) < results.total {
        let fetched = results.issues.len() as u64;
        debug!("Fetching issues from index {} of {}", fetched, results.total);
        let page = jira.search(jql, fields, fetched).await?;
        if page.issues.is_empty() {
            warn!(
                "JIRA returned only {} of {} issues, the release notes are incomplete",
                fetched, results.total
            );
            break;
        }
        results.issues.extend(page.issues);
    }
    Ok(results)
}

impl<G: GitOps, H: GithubOps, P: PromptOps> App<G, H, P> {
    /// Generate the release notes document for `version` from Jira.
    ///
    /// Tickets of the version that lack a release note are reported with a
    /// link to the Jira search listing them.
    pub async fn cmd_release_notes(
        &self,
        jira: &impl JiraOps,
        username: &str,
        version: &ReleaseVersion,
        output: &Path,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let display_name = jira.verify_login().await.map_err(|e| {
            anyhow!("Failed to login to JIRA using account '{}': {:#}", username, e)
        })?;
        info!("Logged in to JIRA as {}", display_name);

        info!("Searching for JIRA tickets with 'Fix Version = {}'", version);
        let fields = format!("status,resolution,issuetype,{NOTES_FIELD}");
        let with_notes = search_all(jira, &release_notes_query(version, true), &fields).await?;
        let empty_query = release_notes_query(version, false);
        let without_notes = jira.search(&empty_query, &fields, 0).await?;
        info!(
            "Found {} issues with release notes for version {}",
            with_notes.total, version
        );

        let mut notes = Vec::new();
        for issue in &with_notes.issues {
            let fields = &issue.fields;
            if fields.resolution.as_ref().is_none_or(|r| r.name != "Fixed") {
                warn!("Issue {} is not marked as Fixed!", issue.key);
            }
            if fields.status.as_ref().is_none_or(|s| s.name != "Closed") {
                warn!("Issue {} is not marked as Closed!", issue.key);
            }

            let issue_type = fields.issuetype.as_ref().map_or("", |t| t.name.as_str());
            let Some(section) = Section::for_issue_type(issue_type) else {
                debug!("Leaving out {} of type '{}'", issue.key, issue_type);
                continue;
            };
            let Some(text) = fields.text(NOTES_FIELD) else {
                warn!("Issue {} has no release note text", issue.key);
                continue;
            };
            notes.push(ReleaseNote::new(issue.key.clone(), section, text));
        }

        let document = release_notes::render(&notes, &self.config.jira_url);
        tokio::fs::write(output, document)
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;

        if let Some(first) = without_notes.issues.first() {
            let url = release_notes::search_url(&self.config.jira_url, &first.key, &empty_query);
            warn!(
                "Found {} tickets with Fix Version {} but no release notes!",
                without_notes.total, version
            );
            warn!("Go to this URL to see the issues without release notes: {}", url);
        }

        writeln!(
            stdout,
            "Generated release notes in file '{}'",
            output.display().to_string().green()
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;
    use crate::ops::git::MockGitOps;
    use crate::ops::github::MockGithubOps;
    use crate::ops::jira::MockJiraOps;
    use crate::ops::prompt::MockPromptOps;

    fn issue(key: &str, issue_type: &str, note: Option<&str>) -> serde_json::Value {
        serde_json::json!({
            "key": key,
            "fields": {
                "status": {"name": "Closed"},
                "resolution": {"name": "Fixed"},
                "issuetype": {"name": issue_type},
                "customfield_10300": note,
            }
        })
    }

    fn results(issues: Vec<serde_json::Value>) -> SearchResults {
        let total = issues.len();
        page(total, issues)
    }

    fn page(total: usize, issues: Vec<serde_json::Value>) -> SearchResults {
        serde_json::from_value(serde_json::json!({
            "total": total,
            "issues": issues,
        }))
        .unwrap()
    }

    fn app(workspace: &Path) -> crate::app::tests::TestApp {
        test_app(
            workspace.to_path_buf(),
            MockGitOps::new(),
            MockGithubOps::new(),
            MockPromptOps::new(),
        )
    }

    #[tokio::test]
    async fn test_cmd_release_notes_writes_document() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let output = temp.path().join("releaseNotes.rst");

        let mut jira = MockJiraOps::new();
        jira.expect_verify_login()
            .returning(|| Ok("Release Bot".to_string()));
        jira.expect_search()
            .withf(|jql, fields, start_at| {
                jql == "project in (CDAP, \"CDAP Plugins\") AND fixVersion = 6.1.4 AND \"Release Notes\" is not EMPTY"
                    && fields == "status,resolution,issuetype,customfield_10300"
                    && *start_at == 0
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(results(vec![
                    issue("CDAP-300", "Bug", Some("Fixed a crash")),
                    issue("CDAP-100", "New Feature", Some("Added replication.")),
                    issue("CDAP-200", "New Feature", Some(" Added a directive ")),
                    issue("CDAP-400", "Task", Some("Internal cleanup")),
                ]))
            });
        jira.expect_search()
            .withf(|jql, _, _| jql.ends_with("is EMPTY"))
            .times(1)
            .returning(|_, _, _| Ok(results(vec![])));

        let version: ReleaseVersion = "6.1.4".parse()?;
        let mut stdout = Vec::new();
        app(temp.path())
            .cmd_release_notes(&jira, "bot@example.com", &version, &output, &mut stdout)
            .await?;

        let document = std::fs::read_to_string(&output)?;
        insta::assert_snapshot!(document.trim(), @r"
        New Features
        ------------
        - `CDAP-100 <https://cdap.atlassian.net/browse/CDAP-100>`_ - Added replication.
        - `CDAP-200 <https://cdap.atlassian.net/browse/CDAP-200>`_ - Added a directive.

        Improvements
        ------------
        No changes.

        Bug Fixes
        ---------
        - `CDAP-300 <https://cdap.atlassian.net/browse/CDAP-300>`_ - Fixed a crash.
        ");
        assert!(String::from_utf8(stdout)?.contains("Generated release notes in file"));
        Ok(())
    }

    #[tokio::test]
    async fn test_cmd_release_notes_login_failure() {
        let temp = tempfile::tempdir().unwrap();
        let mut jira = MockJiraOps::new();
        jira.expect_verify_login()
            .returning(|| Err(anyhow::anyhow!("HTTP 401: Unauthorized")));
        jira.expect_search().times(0);

        let version: ReleaseVersion = "6.1.4".parse().unwrap();
        let err = app(temp.path())
            .cmd_release_notes(
                &jira,
                "bot@example.com",
                &version,
                &temp.path().join("out.rst"),
                &mut Vec::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to login to JIRA using account 'bot@example.com': HTTP 401: Unauthorized"
        );
        assert!(!temp.path().join("out.rst").exists());
    }

    #[tokio::test]
    async fn test_cmd_release_notes_fetches_every_page() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let output = temp.path().join("releaseNotes.rst");

        let mut jira = MockJiraOps::new();
        jira.expect_verify_login()
            .returning(|| Ok("Release Bot".to_string()));
        jira.expect_search()
            .withf(|jql, _, start_at| jql.ends_with("is not EMPTY") && *start_at == 0)
            .times(1)
            .returning(|_, _, _| {
                Ok(page(
                    3,
                    vec![
                        issue("CDAP-1", "Bug", Some("First page")),
                        issue("CDAP-2", "Bug", Some("First page again")),
                    ],
                ))
            });
        jira.expect_search()
            .withf(|jql, _, start_at| jql.ends_with("is not EMPTY") && *start_at == 2)
            .times(1)
            .returning(|_, _, _| Ok(page(3, vec![issue("CDAP-3", "Bug", Some("Last page"))])));
        jira.expect_search()
            .withf(|jql, _, _| jql.ends_with("is EMPTY"))
            .times(1)
            .returning(|_, _, _| Ok(results(vec![])));

        let version: ReleaseVersion = "6.1.4".parse()?;
        app(temp.path())
            .cmd_release_notes(&jira, "bot@example.com", &version, &output, &mut Vec::new())
            .await?;

        let document = std::fs::read_to_string(&output)?;
        assert!(document.contains("CDAP-1 "));
        assert!(document.contains("CDAP-3 "));
        Ok(())
    }

    #[tokio::test]
    async fn test_search_all_stops_on_short_page() -> anyhow::Result<()> {
        let mut jira = MockJiraOps::new();
        jira.expect_search()
            .withf(|_, _, start_at| *start_at == 0)
            .times(1)
            .returning(|_, _, _| Ok(page(150, vec![issue("CDAP-1", "Bug", Some("Only one"))])));
        jira.expect_search()
            .withf(|_, _, start_at| *start_at == 1)
            .times(1)
            .returning(|_, _, _| Ok(page(150, vec![])));

        let found = search_all(&jira, "fixVersion = 6.1.4", "status").await?;
        assert_eq!(found.total, 150);
        assert_eq!(found.issues.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cmd_release_notes_with_missing_notes() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let output = temp.path().join("releaseNotes.rst");

        let mut jira = MockJiraOps::new();
        jira.expect_verify_login()
            .returning(|| Ok("Release Bot".to_string()));
        jira.expect_search()
            .withf(|jql, _, _| jql.ends_with("is not EMPTY"))
            .times(1)
            .returning(|_, _, _| Ok(results(vec![issue("CDAP-5", "Improvement", Some("Faster"))])));
        jira.expect_search()
            .withf(|jql, _, start_at| jql.ends_with("is EMPTY") && *start_at == 0)
            .times(1)
            .returning(|_, _, _| {
                Ok(results(vec![
                    issue("CDAP-17", "Bug", None),
                    issue("CDAP-18", "Bug", None),
                ]))
            });

        let version: ReleaseVersion = "6.1.4".parse()?;
        let mut stdout = Vec::new();
        app(temp.path())
            .cmd_release_notes(&jira, "bot@example.com", &version, &output, &mut stdout)
            .await?;

        let document = std::fs::read_to_string(&output)?;
        assert!(document.contains("- `CDAP-5 <https://cdap.atlassian.net/browse/CDAP-5>`_ - Faster."));
        assert!(!document.contains("CDAP-17"));
        assert!(String::from_utf8(stdout)?.contains("Generated release notes in file"));
        assert_eq!(
            release_notes::search_url(
                "https://cdap.atlassian.net/",
                "CDAP-17",
                &release_notes_query(&version, false)
            ),
            "https://cdap.atlassian.net/browse/CDAP-17?jql=project%20in%20%28CDAP%2C%20%22CDAP%20Plugins%22%29%20AND%20fixVersion%20%3D%206.1.4%20AND%20%22Release%20Notes%22%20is%20EMPTY"
        );
        Ok(())
    }

    #[test]
    fn test_release_notes_query() {
        let version: ReleaseVersion = "6.2.0".parse().unwrap();
        assert_eq!(
            release_notes_query(&version, false),
            "project in (CDAP, \"CDAP Plugins\") AND fixVersion = 6.2.0 AND \"Release Notes\" is EMPTY"
        );
    }
}
