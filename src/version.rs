use std::fmt::Display;
use std::str::FromStr;

use anyhow::Result;
use anyhow::bail;

/// Suffix marking a not-yet-released artifact version.
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// A release version such as `6.1.4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    raw: String,
    major: String,
    minor: String,
}

impl ReleaseVersion {
    /// The release branch for this version's minor line, e.g. `release/6.1`.
    pub fn release_branch(&self) -> String {
        format!("release/{}.{}", self.major, self.minor)
    }

    /// The version with its dots removed, e.g. `614`. Used in change branch names.
    pub fn compact(&self) -> String {
        self.raw.replace('.', "")
    }
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let mut parts = raw.split('.');
        let major = parts.next().unwrap_or_default();
        let minor = parts.next().unwrap_or_default();
        if major.is_empty() || minor.is_empty() {
            bail!("Invalid release version '{}': expected at least <major>.<minor>", s);
        }
        Ok(Self {
            raw: raw.to_string(),
            major: major.to_string(),
            minor: minor.to_string(),
        })
    }
}

impl Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_branch_uses_major_and_minor() {
        for (version, branch) in [
            ("6.1.4", "release/6.1"),
            ("6.10.0", "release/6.10"),
            ("2.3.1", "release/2.3"),
            ("7.0", "release/7.0"),
        ] {
            let v: ReleaseVersion = version.parse().unwrap();
            assert_eq!(v.release_branch(), branch);
        }
    }

    #[test]
    fn test_compact() {
        let v: ReleaseVersion = "6.1.4".parse().unwrap();
        assert_eq!(v.compact(), "614");
        assert_eq!(v.to_string(), "6.1.4");
    }

    #[test]
    fn test_rejects_single_component() {
        assert!("6".parse::<ReleaseVersion>().is_err());
        assert!("".parse::<ReleaseVersion>().is_err());
        assert!("6.".parse::<ReleaseVersion>().is_err());
    }
}
