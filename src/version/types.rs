//! Release identifiers shared by every layer

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::version::error::InvalidVersion;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)\.(\d+)").expect("version pattern is valid")
});

/// Returns true when `s` starts with four dot-separated non-negative integers.
///
/// Trailing text after the fourth component is allowed, so directory names
/// such as `120.0.6099.5` and `120.0.6099.5-old` both qualify.
pub fn is_version_string(s: &str) -> bool {
    VERSION_PATTERN.is_match(s)
}

/// A four-component Chromium version such as `120.0.6099.5`.
///
/// Ordering is component-wise numeric, so `9.0.0.1 < 10.0.0.0`. The original
/// text is kept because it names the version's directory on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    components: [u64; 4],
    text: String,
}

impl Version {
    /// Numeric components, most significant first.
    pub fn components(&self) -> [u64; 4] {
        self.components
    }

    pub fn major(&self) -> u64 {
        self.components[0]
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .cmp(&other.components)
            .then_with(|| self.text.cmp(&other.text))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = InvalidVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let captures = VERSION_PATTERN
            .captures(s)
            .ok_or_else(|| InvalidVersion(s.to_string()))?;

        let mut components = [0u64; 4];
        for (slot, index) in components.iter_mut().zip(1..=4) {
            *slot = captures[index]
                .parse()
                .map_err(|_| InvalidVersion(s.to_string()))?;
        }

        Ok(Self {
            components,
            text: s.to_string(),
        })
    }
}

impl TryFrom<String> for Version {
    type Error = InvalidVersion;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.text
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Chromium release track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Stable,
    Beta,
    Dev,
    Canary,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Dev => "dev",
            Channel::Canary => "canary",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            "dev" => Ok(Channel::Dev),
            "canary" => Ok(Channel::Canary),
            other => Err(format!("unknown channel: {other}")),
        }
    }
}

/// What `--download` was asked for: the newest release of a channel, or an
/// exact version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    Latest(Channel),
    Exact(Version),
}

impl FromStr for DownloadTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(channel) = s.parse::<Channel>() {
            return Ok(DownloadTarget::Latest(channel));
        }
        s.parse::<Version>()
            .map(DownloadTarget::Exact)
            .map_err(|_| format!("expected a channel name or a version, got {s:?}"))
    }
}

/// Sorts and deduplicates version strings, dropping anything unparseable.
pub fn sorted_versions<I, S>(raw: I) -> Vec<Version>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut versions: Vec<Version> = raw
        .into_iter()
        .filter_map(|s| s.as_ref().parse().ok())
        .collect();
    versions.sort();
    versions.dedup();
    versions
}
