//! Per-variant mirror driver
//!
//! Every variant runs through the same [`Synchronizer`]; only the
//! [`VariantSource`] differs. Phases run sequentially within a variant and
//! no state is shared between variants.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::{RegistryError, SyncError};
use crate::registry::{RegistryClient, UpstreamRegistry};
use crate::sync::frontier::{Frontier, MirrorDecision, find_frontier};
use crate::sync::latest::{self, LatestOutcome};
use crate::sync::planner::{self, MirrorJob};
use crate::sync::variant::VariantSource;
use crate::version::record::{VersionRecord, parse_all};

/// Knobs shared by every variant of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Registry host prefixed to upstream references (`docker.io`)
    pub source_registry: String,
    /// Image used when an upstream version only has a schema1 manifest
    pub placeholder: Option<String>,
    /// Skip probing and treat every upstream version as unmirrored
    pub force_full_sync: bool,
}

/// Result of discovery for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub frontier: Frontier,
    /// Every upstream version with its mirror state, oldest first
    pub decisions: Vec<MirrorDecision>,
}

impl Discovery {
    /// Versions needing mirroring, oldest first
    pub fn unmirrored(&self) -> Vec<VersionRecord> {
        self.decisions
            .iter()
            .filter(|d| !d.already_mirrored)
            .map(|d| d.version.clone())
            .collect()
    }

    pub fn raw_versions(&self) -> Vec<String> {
        self.unmirrored().into_iter().map(|v| v.raw).collect()
    }
}

/// Result of a full sync for one variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub mirrored: Vec<VersionRecord>,
    pub latest: LatestOutcome,
}

pub struct Synchronizer {
    variant: VariantSource,
    upstream: Arc<dyn UpstreamRegistry>,
    registry: Arc<dyn RegistryClient>,
    options: SyncOptions,
}

impl Synchronizer {
    pub fn new(
        variant: VariantSource,
        upstream: Arc<dyn UpstreamRegistry>,
        registry: Arc<dyn RegistryClient>,
        options: SyncOptions,
    ) -> Self {
        Self {
            variant,
            upstream,
            registry,
            options,
        }
    }

    /// Every valid upstream version, sorted ascending
    pub async fn upstream_versions(&self) -> Result<Vec<VersionRecord>, RegistryError> {
        info!("Fetching tags from {}...", self.variant.registry_ref);
        let tags = self.upstream.fetch_tags(&self.variant.registry_ref).await?;
        Ok(parse_all(tags).versions)
    }

    /// Newest version published upstream, regardless of mirror state
    pub async fn latest_upstream(&self) -> Result<Option<VersionRecord>, RegistryError> {
        Ok(self.upstream_versions().await?.pop())
    }

    /// Versions not yet on the destination, oldest first
    pub async fn discover(&self) -> Result<Discovery, RegistryError> {
        let versions = self.upstream_versions().await?;

        let frontier = if self.options.force_full_sync {
            info!("Full sync requested for {}; skipping probes", self.variant.name);
            Frontier::everything_unmirrored()
        } else {
            let registry = self.registry.as_ref();
            find_frontier(&self.variant.name, &versions, |tag| async move {
                registry.exists(&tag).await
            })
            .await?
        };

        let discovery = Discovery {
            decisions: frontier.decisions(&versions),
            frontier,
        };
        info!(
            "{} versions to mirror: {}",
            self.variant.name,
            discovery.decisions.iter().filter(|d| !d.already_mirrored).count()
        );

        Ok(discovery)
    }

    /// Discover and expand into mirror jobs
    pub async fn plan(&self) -> Result<Vec<MirrorJob>, RegistryError> {
        let discovery = self.discover().await?;
        Ok(planner::plan(
            &self.variant,
            &self.options.source_registry,
            &discovery.unmirrored(),
        ))
    }

    /// Build the job for an explicitly requested version
    pub fn job_for(&self, raw: &str) -> Result<MirrorJob, SyncError> {
        let version = VersionRecord::parse(raw)?;
        Ok(MirrorJob::new(
            &self.variant,
            &self.options.source_registry,
            &version,
        ))
    }

    /// Copy one version under its full, minor and major tags.
    ///
    /// Falls back to the placeholder image when upstream only has a schema1
    /// manifest and a placeholder is configured.
    pub async fn mirror(&self, job: &MirrorJob) -> Result<(), RegistryError> {
        let dest_tags = job.dest_tags();
        info!("Mirroring {} to {}...", job.source_ref, job.tags.full);

        match self.registry.copy(&job.source_ref, &dest_tags).await {
            Ok(()) => {
                info!("Successfully mirrored {}:{}", self.variant.name, job.version);
                Ok(())
            }
            Err(e) if e.is_schema1_manifest() => {
                let Some(placeholder) = &self.options.placeholder else {
                    return Err(e);
                };
                warn!(
                    "Schema1 manifest detected for {}, using placeholder image",
                    job.version
                );
                self.registry.copy(placeholder, &dest_tags).await?;
                info!(
                    "Successfully created placeholder for {}:{}",
                    self.variant.name, job.version
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Run jobs in order, stopping at the first failure so the mirrored
    /// versions stay a contiguous prefix. Returns the mirrored versions.
    pub async fn execute(&self, jobs: &[MirrorJob]) -> Result<Vec<VersionRecord>, RegistryError> {
        let mut mirrored = Vec::with_capacity(jobs.len());
        for (i, job) in jobs.iter().enumerate() {
            if let Err(e) = self.mirror(job).await {
                error!(
                    "Failed to mirror {}:{} ({} of {} jobs done): {}",
                    self.variant.name,
                    job.version,
                    i,
                    jobs.len(),
                    e
                );
                return Err(e);
            }
            mirrored.push(job.version.clone());
        }
        Ok(mirrored)
    }

    pub async fn update_latest(&self) -> Result<LatestOutcome, RegistryError> {
        latest::update_latest(self.registry.as_ref(), &self.variant).await
    }

    /// discover → plan → execute → update-latest
    pub async fn sync(&self) -> Result<SyncReport, RegistryError> {
        let jobs = self.plan().await?;
        let mirrored = self.execute(&jobs).await?;
        let latest = self.update_latest().await?;
        Ok(SyncReport { mirrored, latest })
    }
}
