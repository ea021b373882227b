//! Floating tag maintenance

use tracing::info;

use crate::error::RegistryError;
use crate::registry::RegistryClient;
use crate::sync::variant::VariantSource;
use crate::version::record::VersionRecord;
use crate::version::tags::{TagSet, floating_tags, version_from_tag};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestOutcome {
    /// Floating tags now point at `version`
    Updated {
        version: VersionRecord,
        tags: TagSet,
        floating: Vec<String>,
    },
    /// The destination holds no versions of the variant
    NoOp,
}

/// Newest version of `variant` among destination tags
pub fn newest_mirrored(variant: &str, tags: &[String]) -> Option<VersionRecord> {
    tags.iter()
        .filter_map(|tag| version_from_tag(variant, tag))
        .max()
}

/// Re-point `<variant>-latest` and `<variant>` at the newest mirrored version.
pub async fn update_latest<R: RegistryClient + ?Sized>(
    registry: &R,
    variant: &VariantSource,
) -> Result<LatestOutcome, RegistryError> {
    let tags = registry.list_tags().await?;

    let Some(version) = newest_mirrored(&variant.name, &tags) else {
        info!("No versions found for {}", variant.name);
        return Ok(LatestOutcome::NoOp);
    };

    let version_tags = TagSet::new(&variant.name, &version);
    let floating = floating_tags(&variant.name);

    info!(
        "Updating {} to point to {}",
        floating.join(", "),
        version_tags.full
    );
    registry
        .copy(&registry.reference(&version_tags.full), &floating)
        .await?;

    Ok(LatestOutcome::Updated {
        version,
        tags: version_tags,
        floating,
    })
}
