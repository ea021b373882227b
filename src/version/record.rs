//! Version records parsed from upstream image tags

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::error::ParseError;

/// `X.Y.Z` optionally followed by a suffix that starts with neither a digit nor a dot
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)([^0-9.].*)?$").expect("version pattern is valid")
});

/// A parsed upstream version tag.
///
/// Ordering is by `(major, minor, patch)`, then unsuffixed before suffixed,
/// then suffix as an opaque string. `raw` is kept verbatim so suffixed tags
/// such as `5.5.4-ext-v3.2` are re-published unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionRecord {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub suffix: Option<String>,
    pub raw: String,
}

impl VersionRecord {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }

        let captures = VERSION_PATTERN
            .captures(raw)
            .ok_or_else(|| ParseError::Malformed(raw.to_string()))?;

        let component = |index: usize| -> Result<u64, ParseError> {
            captures[index]
                .parse()
                .map_err(|_| ParseError::Overflow(raw.to_string()))
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
            suffix: captures.get(4).map(|m| m.as_str().to_string()),
            raw: raw.to_string(),
        })
    }
}

impl FromStr for VersionRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Outcome of parsing a whole upstream listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedVersions {
    /// Valid versions, sorted ascending and deduplicated
    pub versions: Vec<VersionRecord>,
    /// Tags that are not versions, with the reason
    pub rejected: Vec<(String, ParseError)>,
}

/// Parse every tag of a listing; tags that are not versions are set aside
/// instead of failing the whole listing.
pub fn parse_all<I, S>(raws: I) -> ParsedVersions
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = ParsedVersions::default();

    for raw in raws {
        let raw = raw.as_ref();
        match VersionRecord::parse(raw) {
            Ok(version) => parsed.versions.push(version),
            Err(e) => {
                debug!("Skipping tag {:?}: {}", raw, e);
                parsed.rejected.push((raw.to_string(), e));
            }
        }
    }

    parsed.versions.sort();
    parsed.versions.dedup();

    if !parsed.rejected.is_empty() {
        info!(
            "Skipped {} tags that are not versions ({} versions kept)",
            parsed.rejected.len(),
            parsed.versions.len()
        );
    }

    parsed
}
