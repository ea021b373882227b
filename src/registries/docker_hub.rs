//! Docker Hub tag listing implementation

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_UPSTREAM_PAGE_SIZE, MAX_UPSTREAM_PAGES, RetryPolicy};
use crate::error::RegistryError;
use crate::registries::{http_client, status_error};
use crate::registry::UpstreamRegistry;
use crate::retry::with_backoff;

/// One page of the Docker Hub tags API
#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    results: Vec<TagEntry>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Upstream registry backed by the Docker Hub v2 repositories API
pub struct DockerHubRegistry {
    client: reqwest::Client,
    base_url: String,
    page_size: usize,
    max_pages: usize,
    retry: RetryPolicy,
}

impl DockerHubRegistry {
    /// Creates a new DockerHubRegistry with a custom base URL
    pub fn new(base_url: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_UPSTREAM_PAGE_SIZE,
            max_pages: MAX_UPSTREAM_PAGES,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_page(&self, image: &str, page: usize) -> Result<TagPage, RegistryError> {
        let url = format!(
            "{}/v2/repositories/{}/tags?page={}&page_size={}",
            self.base_url, image, page, self.page_size
        );
        let url = url.as_str();
        let description = format!("list tags of {} (page {})", image, page);

        with_backoff(&self.retry, &description, || async move {
            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(RegistryError::NotFound(image.to_string()));
            }

            if !status.is_success() {
                warn!("Docker Hub returned status {}: {}", status, url);
                return Err(status_error(status, response.headers(), url));
            }

            response.json::<TagPage>().await.map_err(|e| {
                warn!("Failed to parse Docker Hub tags response: {}", e);
                RegistryError::InvalidResponse(e.to_string())
            })
        })
        .await
    }
}

#[async_trait::async_trait]
impl UpstreamRegistry for DockerHubRegistry {
    async fn fetch_tags(&self, image: &str) -> Result<Vec<String>, RegistryError> {
        let mut tags = Vec::new();

        for page in 1..=self.max_pages {
            let tag_page = self.fetch_page(image, page).await?;
            debug!(
                "Fetched page {} of {} ({} tags)",
                page,
                image,
                tag_page.results.len()
            );

            if tag_page.results.is_empty() {
                break;
            }
            tags.extend(tag_page.results.into_iter().map(|t| t.name));

            if tag_page.next.is_none() {
                break;
            }
            if page == self.max_pages {
                warn!(
                    "Stopped listing {} after {} pages; {} tags fetched, more remain",
                    image,
                    page,
                    tags.len()
                );
            }
        }

        info!("Fetched {} tags for {}", tags.len(), image);
        Ok(tags)
    }
}
