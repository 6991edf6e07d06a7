//! Release version handling.
//!
//! The running version is the newest (first) entry of the changelog
//! document. Only the major component decides cache compatibility.

use semver::Version;
use serde::Deserialize;
use std::path::Path;

use crate::Error;

/// One changelog entry, newest first in the document.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangelogEntry {
    pub version: String,
    #[serde(default)]
    pub changes: Vec<String>,
}

/// Parsed release version of a worker generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    raw: String,
    parsed: Version,
}

impl ReleaseVersion {
    /// Parse a `major.feature.fix` string.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let trimmed = raw.trim();
        let parsed = Version::parse(trimmed).map_err(|e| Error::InvalidVersion(format!("{trimmed}: {e}")))?;
        Ok(Self { raw: trimmed.to_string(), parsed })
    }

    /// Version of the newest entry in a changelog JSON document.
    pub fn from_changelog(json: &str) -> Result<Self, Error> {
        let entries: Vec<ChangelogEntry> =
            serde_json::from_str(json).map_err(|e| Error::InvalidVersion(format!("bad changelog: {e}")))?;
        let newest = entries
            .first()
            .ok_or_else(|| Error::InvalidVersion("changelog has no entries".into()))?;
        Self::parse(&newest.version)
    }

    pub fn from_changelog_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidVersion(format!("cannot read {}: {e}", path.display())))?;
        Self::from_changelog(&json)
    }

    /// Full version string as released.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u64 {
        self.parsed.major
    }

    /// Whether a persisted marker belongs to the same compatibility generation.
    ///
    /// The marker is compared on its text before the first dot, so a marker
    /// written by any earlier release format still compares sensibly.
    pub fn same_major_as(&self, marker: &str) -> bool {
        marker_major(marker) == self.parsed.major.to_string()
    }
}

impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn marker_major(marker: &str) -> &str {
    marker.trim().split('.').next().unwrap_or_default()
}
