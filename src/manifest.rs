//! Text transforms over Maven `pom.xml` manifests.
//!
//! All edits are single first-match substitutions so that only the artifact's
//! own version field is touched, never the versions of its dependencies.

use std::sync::LazyLock;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use regex::NoExpand;
use regex::Regex;

use crate::version::SNAPSHOT_SUFFIX;

/// The manifest file name looked up in every checkout.
pub const MANIFEST_FILE_NAME: &str = "pom.xml";

static SNAPSHOT_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<version>([\d.]*)-SNAPSHOT</version>").unwrap());

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<version>([^<]*)</version>").unwrap());

static PRODUCT_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<cdap\.version>([^<]*)</cdap\.version>").unwrap());

/// Remove `-SNAPSHOT` from the first snapshot `<version>` field.
///
/// Returns `None` when the manifest has no snapshot version field.
pub fn strip_snapshot(pom: &str) -> Option<String> {
    if !SNAPSHOT_VERSION_RE.is_match(pom) {
        return None;
    }
    Some(
        SNAPSHOT_VERSION_RE
            .replacen(pom, 1, "<version>${1}</version>")
            .into_owned(),
    )
}

/// The value of the first `<version>` field.
pub fn project_version(pom: &str) -> Option<&str> {
    VERSION_RE
        .captures(pom)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Replace the first `<version>` field with `version`.
pub fn set_project_version(pom: &str, version: &str) -> String {
    let replacement = format!("<version>{version}</version>");
    VERSION_RE
        .replacen(pom, 1, NoExpand(&replacement))
        .into_owned()
}

/// The product version this manifest depends on, if declared.
pub fn product_dependency_version(pom: &str) -> Option<&str> {
    PRODUCT_VERSION_RE
        .captures(pom)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

/// Remove `-SNAPSHOT` from the product dependency version, keeping the tag.
pub fn strip_product_dependency_snapshot(pom: &str) -> String {
    let Some(current) = product_dependency_version(pom) else {
        return pom.to_string();
    };
    let released = current.trim_end_matches(SNAPSHOT_SUFFIX).to_string();
    let replacement = format!("<cdap.version>{released}</cdap.version>");
    PRODUCT_VERSION_RE
        .replacen(pom, 1, NoExpand(&replacement))
        .into_owned()
}

pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// The next snapshot after a released version: `6.1.4` becomes `6.1.5-SNAPSHOT`.
pub fn next_snapshot(version: &str) -> Result<String> {
    if is_snapshot(version) {
        bail!("Version {} is already a SNAPSHOT version", version);
    }
    let (prefix, last) = match version.rsplit_once('.') {
        Some((prefix, last)) => (Some(prefix), last),
        None => (None, version),
    };
    let next = last
        .parse::<u64>()
        .with_context(|| format!("Cannot bump version {}: '{}' is not numeric", version, last))?
        + 1;
    Ok(match prefix {
        Some(prefix) => format!("{prefix}.{next}{SNAPSHOT_SUFFIX}"),
        None => format!("{next}{SNAPSHOT_SUFFIX}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const POM: &str = r#"<project>
  <groupId>io.cdap.plugin</groupId>
  <artifactId>example</artifactId>
  <version>6.1.4-SNAPSHOT</version>
  <properties>
    <cdap.version>6.1.3</cdap.version>
  </properties>
  <dependencies>
    <dependency>
      <artifactId>guava</artifactId>
      <version>13.0.1</version>
    </dependency>
  </dependencies>
</project>
"#;

    #[test]
    fn test_strip_snapshot() {
        let stripped = strip_snapshot(POM).unwrap();
        assert!(stripped.contains("<version>6.1.4</version>"));
        assert!(!stripped.contains("SNAPSHOT"));
        // Dependencies untouched
        assert!(stripped.contains("<version>13.0.1</version>"));
        assert!(stripped.contains("<cdap.version>6.1.3</cdap.version>"));
    }

    #[test]
    fn test_strip_snapshot_is_idempotent() {
        let stripped = strip_snapshot(POM).unwrap();
        assert_eq!(strip_snapshot(&stripped), None);
    }

    #[test]
    fn test_strip_snapshot_only_first_match() {
        let pom = "<version>1.0-SNAPSHOT</version>\n<version>2.0-SNAPSHOT</version>";
        assert_eq!(
            strip_snapshot(pom).unwrap(),
            "<version>1.0</version>\n<version>2.0-SNAPSHOT</version>"
        );
    }

    #[test]
    fn test_project_version() {
        assert_eq!(project_version(POM), Some("6.1.4-SNAPSHOT"));
        assert_eq!(project_version("<project/>"), None);
    }

    #[test]
    fn test_set_project_version() {
        let released = strip_snapshot(POM).unwrap();
        let bumped = set_project_version(&released, "6.1.5-SNAPSHOT");
        assert!(bumped.contains("<version>6.1.5-SNAPSHOT</version>"));
        assert!(bumped.contains("<version>13.0.1</version>"));
    }

    #[test]
    fn test_product_dependency() {
        assert_eq!(product_dependency_version(POM), Some("6.1.3"));
        let pom = POM.replace("<cdap.version>6.1.3", "<cdap.version>6.1.4-SNAPSHOT");
        let stripped = strip_product_dependency_snapshot(&pom);
        assert!(stripped.contains("<cdap.version>6.1.4</cdap.version>"));
        assert_eq!(strip_product_dependency_snapshot("<project/>"), "<project/>");
    }

    #[test]
    fn test_next_snapshot() {
        assert_eq!(next_snapshot("6.1.4").unwrap(), "6.1.5-SNAPSHOT");
        assert_eq!(next_snapshot("2.3.9").unwrap(), "2.3.10-SNAPSHOT");
        assert_eq!(next_snapshot("7").unwrap(), "8-SNAPSHOT");
    }

    #[test]
    fn test_next_snapshot_rejects_snapshot() {
        let err = next_snapshot("6.1.5-SNAPSHOT").unwrap_err();
        assert!(err.to_string().contains("already a SNAPSHOT"));
    }

    #[test]
    fn test_next_snapshot_rejects_non_numeric() {
        assert!(next_snapshot("6.1.x").is_err());
    }
}
