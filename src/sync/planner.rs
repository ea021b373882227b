//! Mirror job planning

use crate::sync::variant::VariantSource;
use crate::version::record::VersionRecord;
use crate::version::tags::TagSet;

/// One version to copy, with every destination tag it should receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorJob {
    pub version: VersionRecord,
    /// Upstream reference, e.g. `docker.io/sharelatex/sharelatex:5.0.1`
    pub source_ref: String,
    pub tags: TagSet,
}

impl MirrorJob {
    pub fn new(variant: &VariantSource, source_registry: &str, version: &VersionRecord) -> Self {
        Self {
            version: version.clone(),
            source_ref: variant.source_ref(source_registry, &version.raw),
            tags: TagSet::new(&variant.name, version),
        }
    }

    pub fn dest_tags(&self) -> Vec<String> {
        self.tags.to_vec()
    }
}

/// Expand unmirrored versions into jobs, keeping their order.
///
/// Jobs must run oldest first: an interrupted run then leaves a contiguous
/// mirrored prefix, and minor/major aliases end on the newest version.
pub fn plan(
    variant: &VariantSource,
    source_registry: &str,
    unmirrored: &[VersionRecord],
) -> Vec<MirrorJob> {
    unmirrored
        .iter()
        .map(|version| MirrorJob::new(variant, source_registry, version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::record::parse_all;

    #[test]
    fn plan_preserves_order_and_derives_tags() {
        let variant = VariantSource::new("official", "sharelatex/sharelatex");
        let versions = parse_all(["1.2.3", "1.2.5", "1.3.0"]).versions;

        let jobs = plan(&variant, "docker.io", &versions);

        let summary: Vec<_> = jobs
            .iter()
            .map(|job| (job.source_ref.as_str(), job.tags.minor.as_str(), job.tags.major.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("docker.io/sharelatex/sharelatex:1.2.3", "official-1.2", "official-1"),
                ("docker.io/sharelatex/sharelatex:1.2.5", "official-1.2", "official-1"),
                ("docker.io/sharelatex/sharelatex:1.3.0", "official-1.3", "official-1"),
            ]
        );
    }

    #[test]
    fn job_for_suffixed_version_keeps_raw_tag_for_source_and_full_tag() {
        let variant = VariantSource::new("cep", "overleafcep/sharelatex");
        let version = VersionRecord::parse("5.5.4-ext-v3.2").unwrap();

        let job = MirrorJob::new(&variant, "docker.io", &version);

        assert_eq!(job.source_ref, "docker.io/overleafcep/sharelatex:5.5.4-ext-v3.2");
        assert_eq!(
            job.dest_tags(),
            vec!["cep-5.5.4-ext-v3.2", "cep-5.5", "cep-5"]
        );
    }

    #[test]
    fn plan_of_nothing_is_empty() {
        let variant = VariantSource::new("full", "tuetenk0pp/sharelatex-full");

        assert!(plan(&variant, "docker.io", &[]).is_empty());
    }
}
