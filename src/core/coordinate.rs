//! Package coordinates and version ordering.
//!
//! A coordinate is `group:artifact:version`. The versionless form
//! `group:artifact` is the key used when unifying competing versions of the
//! same package.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static COORDINATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*):(.*):(.*)$").expect("coordinate pattern is valid"));

/// A package version.
///
/// Ordering splits the text into segments on `.` and `-`. Numeric segments
/// compare numerically and sort below textual ones; textual segments compare
/// lexically; with all shared segments equal, more segments is higher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Number(u64),
    Text(&'a str),
}

impl Version {
    pub fn new(value: impl Into<String>) -> Self {
        Version(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn segments(&self) -> Vec<Segment<'_>> {
        self.0
            .split(['.', '-'])
            .map(|s| match s.parse::<u64>() {
                Ok(n) => Segment::Number(n),
                Err(_) => Segment::Text(s),
            })
            .collect()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let left = self.segments();
        let right = other.segments();
        for (l, r) in left.iter().zip(right.iter()) {
            let ord = match (l, r) {
                (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
                (Segment::Number(_), Segment::Text(_)) => Ordering::Less,
                (Segment::Text(_), Segment::Number(_)) => Ordering::Greater,
                (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        left.len()
            .cmp(&right.len())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that a version has the form `major.minor.point[-tweak]`.
///
/// Returns a description of the first problem found.
pub fn check_version(version: &Version) -> Result<(), String> {
    let text = version.as_str();
    if text.is_empty() {
        return Err("version is empty".to_string());
    }
    let (release, _tweak) = match text.split_once('-') {
        Some((release, tweak)) => {
            if tweak.is_empty() {
                return Err(format!("version '{}' has an empty tweak after '-'", text));
            }
            (release, Some(tweak))
        }
        None => (text, None),
    };
    let parts: Vec<&str> = release.split('.').collect();
    if parts.len() != 3 {
        return Err(format!(
            "version '{}' should have major.minor.point[-tweak] form but had {} release segment{}",
            text,
            parts.len(),
            if parts.len() == 1 { "" } else { "s" }
        ));
    }
    for (name, part) in ["major", "minor", "point"].iter().zip(parts.iter()) {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "version '{}' has non-numeric {} version '{}'",
                text, name, part
            ));
        }
    }
    Ok(())
}

/// A package identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "groupId", default)]
    pub group_id: String,
    #[serde(rename = "artifactId", default)]
    pub artifact_id: String,
    #[serde(default)]
    pub version: Version,
}

impl Coordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Coordinate {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: Version::new(version),
        }
    }

    /// Parse `group:artifact:version`. All three parts must be non-empty.
    pub fn try_parse(text: &str) -> Option<Coordinate> {
        let caps = COORDINATE_PATTERN.captures(text)?;
        let group = caps.get(1)?.as_str();
        let artifact = caps.get(2)?.as_str();
        let version = caps.get(3)?.as_str();
        if group.is_empty() || artifact.is_empty() || version.is_empty() {
            return None;
        }
        Some(Coordinate::new(group, artifact, version))
    }

    /// The coordinate without its version.
    pub fn versionless(&self) -> Coordinate {
        Coordinate::new(self.group_id.clone(), self.artifact_id.clone(), "")
    }

    /// The `group:artifact` unification key.
    pub fn versionless_key(&self) -> String {
        format!("{}:{}", self.group_id, self.artifact_id)
    }

    /// Whether every part is empty (an absent `coordinate:` block).
    pub fn is_blank(&self) -> bool {
        self.group_id.is_empty() && self.artifact_id.is_empty() && self.version.is_empty()
    }

    /// The artifact id with `/` replaced, for use in script identifiers.
    pub fn artifact_identifier(&self) -> String {
        self.artifact_id.replace(['/', '-', '.'], "_")
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}:{}", self.group_id, self.artifact_id)
        } else {
            write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
        }
    }
}

impl FromStr for Coordinate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coordinate::try_parse(s).ok_or_else(|| format!("'{}' is not a group:artifact:version coordinate", s))
    }
}
