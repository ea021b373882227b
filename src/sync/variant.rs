//! Upstream image variants

use serde::Deserialize;

/// One independently mirrored upstream flavor.
///
/// `name` doubles as the tag prefix on the destination (`official-5.0.1`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct VariantSource {
    pub name: String,
    /// Upstream image path, e.g. `sharelatex/sharelatex`
    pub registry_ref: String,
}

impl VariantSource {
    pub fn new(name: &str, registry_ref: &str) -> Self {
        Self {
            name: name.to_string(),
            registry_ref: registry_ref.to_string(),
        }
    }

    /// Fully qualified upstream reference for one tag
    pub fn source_ref(&self, source_registry: &str, tag: &str) -> String {
        format!("{}/{}:{}", source_registry, self.registry_ref, tag)
    }
}
