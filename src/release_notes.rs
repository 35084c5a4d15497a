//! Rendering of Jira release-note tickets into a reStructuredText document.

use std::path::PathBuf;

/// Jira custom field holding the release note of a ticket.
pub const NOTES_FIELD: &str = "customfield_10300";

pub const DEFAULT_OUTPUT_FILE: &str = "releaseNotes.rst";

const RST_EXTENSION: &str = ".rst";

/// Document sections, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    NewFeatures,
    Improvements,
    BugFixes,
}

impl Section {
    pub const ALL: [Section; 3] = [Self::NewFeatures, Self::Improvements, Self::BugFixes];

    /// The section for a Jira issue type. Other issue types are not rendered.
    pub fn for_issue_type(issue_type: &str) -> Option<Self> {
        match issue_type {
            "New Feature" => Some(Self::NewFeatures),
            "Improvement" => Some(Self::Improvements),
            "Bug" => Some(Self::BugFixes),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::NewFeatures => "New Features",
            Self::Improvements => "Improvements",
            Self::BugFixes => "Bug Fixes",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNote {
    pub key: String,
    pub section: Section,
    /// Trimmed note text ending in exactly one period.
    pub text: String,
}

impl ReleaseNote {
    pub fn new(key: impl Into<String>, section: Section, text: &str) -> Self {
        Self {
            key: key.into(),
            section,
            text: with_period(text.trim()),
        }
    }

    fn render(&self, jira_url: &str) -> String {
        format!(
            "- `{} <{}>`_ - {}",
            self.key,
            browse_url(jira_url, &self.key),
            self.text
        )
    }
}

pub fn browse_url(jira_url: &str, key: &str) -> String {
    format!("{jira_url}browse/{key}")
}

fn with_period(text: &str) -> String {
    if text.ends_with('.') {
        text.to_string()
    } else {
        format!("{text}.")
    }
}

/// Link to a Jira search for `jql`, rooted at the browse page of `first_key`.
pub fn search_url(jira_url: &str, first_key: &str, jql: &str) -> String {
    format!(
        "{}?jql={}",
        browse_url(jira_url, first_key),
        urlencoding::encode(jql)
    )
}

/// Render the release notes document.
///
/// Every section is preceded by an empty line and followed by its notes sorted
/// by ticket key, or by `No changes.` when it has none.
pub fn render(notes: &[ReleaseNote], jira_url: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for section in Section::ALL {
        let title = section.title();
        lines.push(String::new());
        lines.push(title.to_string());
        lines.push("-".repeat(title.len()));

        let mut in_section = notes
            .iter()
            .filter(|note| note.section == section)
            .collect::<Vec<_>>();
        if in_section.is_empty() {
            lines.push("No changes.".to_string());
            continue;
        }
        in_section.sort_by(|a, b| a.key.cmp(&b.key));
        lines.extend(in_section.iter().map(|note| note.render(jira_url)));
    }

    let mut document = lines.join("\n");
    document.push('\n');
    document
}

/// The output path for `-o <name>`: `.rst` is appended unless already present.
pub fn output_path(output: Option<&str>) -> PathBuf {
    match output {
        None => PathBuf::from(DEFAULT_OUTPUT_FILE),
        Some(name) if name.ends_with(RST_EXTENSION) => PathBuf::from(name),
        Some(name) => PathBuf::from(format!("{name}{RST_EXTENSION}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JIRA: &str = "https://cdap.atlassian.net/";

    #[test]
    fn test_render_orders_sections_and_tickets() {
        let notes = vec![
            ReleaseNote::new("CDAP-300", Section::BugFixes, "Fixed a crash"),
            ReleaseNote::new("CDAP-100", Section::NewFeatures, "Added replication"),
            ReleaseNote::new("CDAP-200", Section::NewFeatures, "Added a wrangler directive."),
        ];
        let document = render(&notes, JIRA);

        assert!(document.starts_with("\nNew Features\n------------\n"));
        insta::assert_snapshot!(document.trim(), @r"
        New Features
        ------------
        - `CDAP-100 <https://cdap.atlassian.net/browse/CDAP-100>`_ - Added replication.
        - `CDAP-200 <https://cdap.atlassian.net/browse/CDAP-200>`_ - Added a wrangler directive.

        Improvements
        ------------
        No changes.

        Bug Fixes
        ---------
        - `CDAP-300 <https://cdap.atlassian.net/browse/CDAP-300>`_ - Fixed a crash.
        ");
    }

    #[test]
    fn test_render_without_notes() {
        insta::assert_snapshot!(render(&[], JIRA).trim(), @r"
        New Features
        ------------
        No changes.

        Improvements
        ------------
        No changes.

        Bug Fixes
        ---------
        No changes.
        ");
    }

    #[test]
    fn test_note_gains_exactly_one_period() {
        assert_eq!(
            ReleaseNote::new("CDAP-1", Section::BugFixes, "  Fixed it \n").text,
            "Fixed it."
        );
        assert_eq!(
            ReleaseNote::new("CDAP-1", Section::BugFixes, "Fixed it.").text,
            "Fixed it."
        );
    }

    #[test]
    fn test_render_sorts_keys_as_text() {
        let notes = vec![
            ReleaseNote::new("PLUGIN-7", Section::BugFixes, "Fixed a plugin"),
            ReleaseNote::new("CDAP-99", Section::BugFixes, "Fixed a leak"),
            ReleaseNote::new("CDAP-100", Section::BugFixes, "Fixed a crash"),
        ];
        let document = render(&notes, "https://jira/");
        let position = |key: &str| document.find(&format!("`{key} ")).unwrap();
        assert!(position("CDAP-100") < position("CDAP-99"));
        assert!(position("CDAP-99") < position("PLUGIN-7"));
    }

    #[test]
    fn test_search_url_encodes_query() {
        assert_eq!(
            search_url(
                "https://cdap.atlassian.net/",
                "CDAP-17",
                "fixVersion = 6.1.4 AND \"Release Notes\" is EMPTY"
            ),
            "https://cdap.atlassian.net/browse/CDAP-17?jql=fixVersion%20%3D%206.1.4%20AND%20%22Release%20Notes%22%20is%20EMPTY"
        );
    }

    #[test]
    fn test_section_for_issue_type() {
        assert_eq!(Section::for_issue_type("Bug"), Some(Section::BugFixes));
        assert_eq!(Section::for_issue_type("Sub-task"), None);
    }

    #[test]
    fn test_output_path() {
        assert_eq!(output_path(None), PathBuf::from("releaseNotes.rst"));
        assert_eq!(output_path(Some("notes")), PathBuf::from("notes.rst"));
        assert_eq!(output_path(Some("notes.rst")), PathBuf::from("notes.rst"));
    }
}
