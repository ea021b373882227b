//! Registry test utilities

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use image_mirror::commands::App;
use image_mirror::config::MirrorConfig;
use image_mirror::error::RegistryError;
use image_mirror::registry::{RegistryClient, UpstreamRegistry};

pub const DESTINATION: &str = "registry.test/mirror";

/// In-memory upstream listing tags per image
#[derive(Default)]
pub struct FakeUpstream {
    tags: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
}

impl FakeUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, image: &str, tags: &[&str]) -> Self {
        self.tags
            .insert(image.to_string(), tags.iter().map(|t| t.to_string()).collect());
        self
    }

    /// Listing `image` fails as if the registry stayed down
    pub fn failing(mut self, image: &str) -> Self {
        self.failing.insert(image.to_string());
        self
    }
}

#[async_trait]
impl UpstreamRegistry for FakeUpstream {
    async fn fetch_tags(&self, image: &str) -> Result<Vec<String>, RegistryError> {
        if self.failing.contains(image) {
            return Err(RegistryError::Unavailable {
                attempts: 3,
                message: format!("{} unreachable", image),
            });
        }
        Ok(self.tags.get(image).cloned().unwrap_or_default())
    }
}

/// In-memory destination: tag → upstream reference of the image it points at
#[derive(Default)]
pub struct FakeDestination {
    tags: Mutex<BTreeMap<String, String>>,
    probes: Mutex<Vec<String>>,
    copies: Mutex<usize>,
    rejected_sources: HashSet<String>,
}

impl FakeDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a tag as if an earlier run had mirrored it
    pub fn with_tag(self, tag: &str, source_ref: &str) -> Self {
        self.tags
            .lock()
            .unwrap()
            .insert(tag.to_string(), source_ref.to_string());
        self
    }

    /// Copies from `source_ref` fail with a copy error
    pub fn rejecting(mut self, source_ref: &str) -> Self {
        self.rejected_sources.insert(source_ref.to_string());
        self
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.tags.lock().unwrap().clone()
    }

    pub fn target_of(&self, tag: &str) -> Option<String> {
        self.tags.lock().unwrap().get(tag).cloned()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.lock().unwrap().len()
    }

    pub fn copy_count(&self) -> usize {
        *self.copies.lock().unwrap()
    }

    fn resolve(&self, source_ref: &str) -> String {
        let prefix = format!("{}:", DESTINATION);
        match source_ref.strip_prefix(&prefix) {
            Some(tag) => self
                .target_of(tag)
                .unwrap_or_else(|| source_ref.to_string()),
            None => source_ref.to_string(),
        }
    }
}

#[async_trait]
impl RegistryClient for FakeDestination {
    fn reference(&self, tag: &str) -> String {
        format!("{}:{}", DESTINATION, tag)
    }

    async fn exists(&self, tag: &str) -> Result<bool, RegistryError> {
        self.probes.lock().unwrap().push(tag.to_string());
        Ok(self.tags.lock().unwrap().contains_key(tag))
    }

    async fn copy(&self, source_ref: &str, dest_tags: &[String]) -> Result<(), RegistryError> {
        *self.copies.lock().unwrap() += 1;
        if self.rejected_sources.contains(source_ref) {
            return Err(RegistryError::Copy(format!("denied: {}", source_ref)));
        }
        let target = self.resolve(source_ref);
        let mut tags = self.tags.lock().unwrap();
        for tag in dest_tags {
            tags.insert(tag.clone(), target.clone());
        }
        Ok(())
    }

    async fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.tags.lock().unwrap().keys().cloned().collect())
    }
}

/// App over the default variants wired to the given fakes
pub fn create_test_app(upstream: FakeUpstream, destination: Arc<FakeDestination>) -> App {
    App::new(MirrorConfig::default(), Arc::new(upstream), destination)
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
