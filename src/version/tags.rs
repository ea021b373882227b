//! Destination tag derivation

use crate::version::record::VersionRecord;

/// Tags published on the destination for one mirrored version.
///
/// `minor` and `major` are built from the numeric triple only, so whichever
/// version sharing that prefix is mirrored last owns the alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagSet {
    /// `<variant>-X.Y.Z[suffix]`
    pub full: String,
    /// `<variant>-X.Y`
    pub minor: String,
    /// `<variant>-X`
    pub major: String,
}

impl TagSet {
    pub fn new(variant: &str, version: &VersionRecord) -> Self {
        Self {
            full: full_tag(variant, version),
            minor: format!("{}-{}.{}", variant, version.major, version.minor),
            major: format!("{}-{}", variant, version.major),
        }
    }

    /// All three tags, most specific first
    pub fn to_vec(&self) -> Vec<String> {
        vec![self.full.clone(), self.minor.clone(), self.major.clone()]
    }
}

/// The immutable per-version tag, `<variant>-<raw>`
pub fn full_tag(variant: &str, version: &VersionRecord) -> String {
    format!("{}-{}", variant, version.raw)
}

/// Floating tags re-pointed at the newest mirrored version of a variant
pub fn floating_tags(variant: &str) -> Vec<String> {
    vec![format!("{}-latest", variant), variant.to_string()]
}

/// Recover the version from a destination tag belonging to `variant`.
///
/// Alias tags (`official-5.0`, `official-latest`) and other variants' tags
/// yield `None`.
pub fn version_from_tag(variant: &str, tag: &str) -> Option<VersionRecord> {
    let raw = tag.strip_prefix(variant)?.strip_prefix('-')?;
    VersionRecord::parse(raw).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn v(raw: &str) -> VersionRecord {
        VersionRecord::parse(raw).unwrap()
    }

    #[test]
    fn tag_set_for_suffixed_version_keeps_suffix_only_on_full_tag() {
        let tags = TagSet::new("cep", &v("5.5.4-ext-v3.2"));

        assert_eq!(
            tags,
            TagSet {
                full: "cep-5.5.4-ext-v3.2".to_string(),
                minor: "cep-5.5".to_string(),
                major: "cep-5".to_string(),
            }
        );
    }

    #[test]
    fn tag_set_to_vec_orders_full_minor_major() {
        let tags = TagSet::new("official", &v("1.2.3"));

        assert_eq!(
            tags.to_vec(),
            vec!["official-1.2.3", "official-1.2", "official-1"]
        );
    }

    #[test]
    fn floating_tags_include_latest_and_bare_variant() {
        assert_eq!(floating_tags("full"), vec!["full-latest", "full"]);
    }

    #[rstest]
    #[case("official", "official-5.0.1", Some("5.0.1"))]
    #[case("cep", "cep-5.5.4-ext-v3.2", Some("5.5.4-ext-v3.2"))]
    #[case("official", "official-5.0", None)]
    #[case("official", "official-5", None)]
    #[case("official", "official-latest", None)]
    #[case("official", "official", None)]
    #[case("official", "full-5.0.1", None)]
    #[case("full", "fullish-5.0.1", None)]
    fn version_from_tag_only_matches_full_version_tags(
        #[case] variant: &str,
        #[case] tag: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(
            version_from_tag(variant, tag).map(|v| v.raw),
            expected.map(|s| s.to_string())
        );
    }
}
