//! Command implementations behind the CLI
//!
//! Each command resolves its variants from the config, runs one
//! [`Synchronizer`] per variant, and keeps going when a variant fails so that
//! siblings are still processed.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use tracing::error;

use crate::config::MirrorConfig;
use crate::error::{ConfigError, SyncError};
use crate::registries::{BuildxImageTools, DockerHubRegistry, OciRegistryClient};
use crate::registry::{RegistryClient, UpstreamRegistry};
use crate::sync::latest::LatestOutcome;
use crate::sync::planner::MirrorJob;
use crate::sync::synchronizer::{SyncOptions, SyncReport, Synchronizer};
use crate::sync::variant::VariantSource;
use crate::version::record::VersionRecord;

/// Per-variant results in config order
#[derive(Debug)]
pub struct VariantResults<T> {
    pub results: IndexMap<String, Result<T, SyncError>>,
}

impl<T> VariantResults<T> {
    /// Successful results, in variant order
    pub fn successes(&self) -> impl Iterator<Item = (&str, &T)> {
        self.results
            .iter()
            .filter_map(|(name, result)| result.as_ref().ok().map(|value| (name.as_str(), value)))
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }

    /// The first failure, consuming the results
    pub fn into_first_error(self) -> Option<SyncError> {
        self.results.into_values().find_map(Result::err)
    }
}

/// Wires config and registries into per-variant synchronizers
pub struct App {
    config: MirrorConfig,
    upstream: Arc<dyn UpstreamRegistry>,
    registry: Arc<dyn RegistryClient>,
}

impl App {
    pub fn new(
        config: MirrorConfig,
        upstream: Arc<dyn UpstreamRegistry>,
        registry: Arc<dyn RegistryClient>,
    ) -> Self {
        Self {
            config,
            upstream,
            registry,
        }
    }

    /// Docker Hub upstream, OCI destination, `docker buildx imagetools` copies
    pub fn from_config(config: MirrorConfig, token: Option<String>) -> Result<Self, SyncError> {
        let upstream = DockerHubRegistry::new(&config.upstream.base_url)?
            .with_page_size(config.upstream.page_size)
            .with_max_pages(config.upstream.max_pages)
            .with_retry(config.retry);
        let registry =
            OciRegistryClient::from_config(&config.destination, Arc::new(BuildxImageTools::new()))?
                .with_token(token)
                .with_retry(config.retry);

        Ok(Self::new(config, Arc::new(upstream), Arc::new(registry)))
    }

    fn options(&self, force_full_sync: bool) -> SyncOptions {
        SyncOptions {
            source_registry: self.config.upstream.source_registry.clone(),
            placeholder: self.config.placeholder.clone(),
            force_full_sync,
        }
    }

    fn synchronizer(&self, variant: &VariantSource, options: SyncOptions) -> Synchronizer {
        Synchronizer::new(
            variant.clone(),
            self.upstream.clone(),
            self.registry.clone(),
            options,
        )
    }

    /// Run `operation` for every selected variant concurrently
    async fn for_each_variant<T, F, Fut>(
        &self,
        filter: &str,
        force_full_sync: bool,
        operation: F,
    ) -> Result<VariantResults<T>, ConfigError>
    where
        F: Fn(Synchronizer) -> Fut,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let variants = self.config.select_variants(filter)?;

        let runs = variants.into_iter().map(|variant| {
            let name = variant.name.clone();
            let run = operation(self.synchronizer(variant, self.options(force_full_sync)));
            async move {
                let result = run.await;
                if let Err(e) = &result {
                    error!("{} failed [{}]: {}", name, e.kind(), e);
                }
                (name, result)
            }
        });

        Ok(VariantResults {
            results: join_all(runs).await.into_iter().collect(),
        })
    }

    /// Raw versions needing mirroring, per variant
    pub async fn discover(
        &self,
        filter: &str,
        force_full_sync: bool,
    ) -> Result<VariantResults<Vec<String>>, ConfigError> {
        self.for_each_variant(filter, force_full_sync, |sync| async move {
            Ok(sync.discover().await?.raw_versions())
        })
        .await
    }

    /// Mirror one explicitly requested version
    pub async fn mirror(
        &self,
        variant: &str,
        version: &str,
        placeholder: Option<String>,
    ) -> Result<MirrorJob, SyncError> {
        let variant = self.config.variant(variant)?;
        let mut options = self.options(false);
        if placeholder.is_some() {
            options.placeholder = placeholder;
        }
        let sync = self.synchronizer(variant, options);

        let job = sync.job_for(version)?;
        sync.mirror(&job).await?;
        Ok(job)
    }

    pub async fn update_latest(
        &self,
        filter: &str,
    ) -> Result<VariantResults<LatestOutcome>, ConfigError> {
        self.for_each_variant(filter, false, |sync| async move {
            Ok(sync.update_latest().await?)
        })
        .await
    }

    /// Newest upstream version of one variant
    pub async fn latest(&self, variant: &str) -> Result<VersionRecord, SyncError> {
        let variant = self.config.variant(variant)?;
        self.synchronizer(variant, self.options(false))
            .latest_upstream()
            .await?
            .ok_or_else(|| SyncError::NoVersions(variant.registry_ref.clone()))
    }

    pub async fn sync(
        &self,
        filter: &str,
        force_full_sync: bool,
    ) -> Result<VariantResults<SyncReport>, ConfigError> {
        self.for_each_variant(filter, force_full_sync, |sync| async move {
            Ok(sync.sync().await?)
        })
        .await
    }

    /// Every configured variant mapped to its discovered versions; variants
    /// that were not selected or that failed map to an empty list
    pub fn discovery_table(
        &self,
        discovered: &VariantResults<Vec<String>>,
    ) -> IndexMap<String, Vec<String>> {
        self.config
            .variants
            .iter()
            .map(|variant| {
                let versions = discovered
                    .results
                    .get(&variant.name)
                    .and_then(|r| r.as_ref().ok())
                    .cloned()
                    .unwrap_or_default();
                (variant.name.clone(), versions)
            })
            .collect()
    }
}

/// Discovery output as a JSON object, variant → versions
pub fn render_json(table: &IndexMap<String, Vec<String>>) -> Result<String, serde_json::Error> {
    serde_json::to_string(table)
}

/// Discovery output in the human-readable GitHub Actions log format
pub fn render_github(table: &IndexMap<String, Vec<String>>) -> Result<String, serde_json::Error> {
    let mut lines = Vec::with_capacity(table.len());
    for (variant, versions) in table {
        lines.push(format!(
            "{}: {}",
            capitalize(variant),
            serde_json::to_string(versions)?
        ));
    }
    Ok(lines.join("\n"))
}

/// Append `<variant>_versions=<json>` lines to a `GITHUB_OUTPUT` file
pub fn write_github_output(
    path: &Path,
    table: &IndexMap<String, Vec<String>>,
) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    for (variant, versions) in table {
        writeln!(
            file,
            "{}_versions={}",
            variant,
            serde_json::to_string(versions)?
        )?;
    }
    Ok(())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
