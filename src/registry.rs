//! Registry traits used by the synchronizer

#[cfg(test)]
use mockall::automock;

use crate::error::RegistryError;

/// Lists the tags an upstream source publishes
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait UpstreamRegistry: Send + Sync {
    /// Fetches every tag of an image
    ///
    /// # Arguments
    /// * `image` - Upstream image path (e.g., "sharelatex/sharelatex")
    ///
    /// # Returns
    /// * `Ok(Vec<String>)` - Raw tag names in listing order; may include non-version tags
    /// * `Err(RegistryError)` - If the listing fails
    async fn fetch_tags(&self, image: &str) -> Result<Vec<String>, RegistryError>;
}

/// The destination registry: existence checks and manifest-level copies.
///
/// Tags are bare (`official-5.0.1`); the client owns the destination image name.
/// Both `exists` and `copy` are idempotent.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fully qualified reference to a destination tag (`ghcr.io/org/image:tag`)
    fn reference(&self, tag: &str) -> String;

    /// Checks whether `tag` exists on the destination
    async fn exists(&self, tag: &str) -> Result<bool, RegistryError>;

    /// Points every tag in `dest_tags` at the image behind `source_ref`
    ///
    /// Re-tagging an already present tag with the same image succeeds.
    async fn copy(&self, source_ref: &str, dest_tags: &[String]) -> Result<(), RegistryError>;

    /// Lists every tag currently on the destination
    async fn list_tags(&self) -> Result<Vec<String>, RegistryError>;
}
