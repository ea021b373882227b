//! Destination registry client speaking the OCI distribution API

use std::sync::Arc;

use reqwest::header::{ACCEPT, LINK};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::{DEFAULT_TAGS_PAGE_SIZE, DestinationConfig, RetryPolicy};
use crate::error::RegistryError;
use crate::registries::imagetools::ImageCopier;
use crate::registries::{http_client, status_error};
use crate::registry::RegistryClient;
use crate::retry::with_backoff;

/// Manifest media types accepted when probing for a tag
const MANIFEST_ACCEPT: &str = "application/vnd.oci.image.index.v1+json, \
application/vnd.oci.image.manifest.v1+json, \
application/vnd.docker.distribution.manifest.list.v2+json, \
application/vnd.docker.distribution.manifest.v2+json";

/// Response from `GET /v2/<name>/tags/list`
#[derive(Debug, Deserialize)]
struct TagList {
    // GHCR answers `"tags": null` for repositories without tags
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Registry client for the destination repository.
///
/// Existence checks and tag listing go over HTTP; copies are delegated to an
/// [`ImageCopier`].
pub struct OciRegistryClient {
    client: reqwest::Client,
    base_url: String,
    registry: String,
    repository: String,
    token: Option<String>,
    page_size: usize,
    retry: RetryPolicy,
    copier: Arc<dyn ImageCopier>,
}

impl OciRegistryClient {
    /// Creates a client for `<registry>/<repository>` reachable at `base_url`
    pub fn new(
        base_url: &str,
        registry: &str,
        repository: &str,
        copier: Arc<dyn ImageCopier>,
    ) -> Result<Self, RegistryError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            registry: registry.to_string(),
            repository: repository.to_string(),
            token: None,
            page_size: DEFAULT_TAGS_PAGE_SIZE,
            retry: RetryPolicy::default(),
            copier,
        })
    }

    pub fn from_config(
        destination: &DestinationConfig,
        copier: Arc<dyn ImageCopier>,
    ) -> Result<Self, RegistryError> {
        Ok(Self::new(
            &destination.base_url(),
            &destination.registry,
            &destination.repository,
            copier,
        )?
        .with_page_size(destination.tags_page_size))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Resolve a `Link` target, which registries may send as a relative path
    fn absolute_url(&self, link: &str) -> String {
        if link.starts_with("http://") || link.starts_with("https://") {
            link.to_string()
        } else {
            format!("{}/{}", self.base_url, link.trim_start_matches('/'))
        }
    }

    async fn fetch_tag_page(
        &self,
        url: &str,
    ) -> Result<(Vec<String>, Option<String>), RegistryError> {
        let description = format!("list tags of {}", self.repository);

        with_backoff(&self.retry, &description, || async move {
            let response = self.authorize(self.client.get(url)).send().await?;
            let status = response.status();

            // Repository not created yet: nothing has been mirrored
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok((Vec::new(), None));
            }

            if !status.is_success() {
                warn!("Registry returned status {}: {}", status, url);
                return Err(status_error(status, response.headers(), url));
            }

            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(next_link)
                .map(|link| self.absolute_url(&link));

            let list: TagList = response.json().await.map_err(|e| {
                warn!("Failed to parse tags/list response: {}", e);
                RegistryError::InvalidResponse(e.to_string())
            })?;

            Ok((list.tags.unwrap_or_default(), next))
        })
        .await
    }
}

/// Extract the `rel="next"` target from a `Link` header
fn next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find(|part| part.contains("rel=\"next\"") || part.contains("rel=next"))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part[start..].find('>')? + start;
            Some(part[start..end].to_string())
        })
}

#[async_trait::async_trait]
impl RegistryClient for OciRegistryClient {
    fn reference(&self, tag: &str) -> String {
        format!("{}/{}:{}", self.registry, self.repository, tag)
    }

    async fn exists(&self, tag: &str) -> Result<bool, RegistryError> {
        let url = format!("{}/v2/{}/manifests/{}", self.base_url, self.repository, tag);
        let url = url.as_str();
        let description = format!("check {}", self.reference(tag));

        let found = with_backoff(&self.retry, &description, || async move {
            let response = self
                .authorize(self.client.head(url))
                .header(ACCEPT, MANIFEST_ACCEPT)
                .send()
                .await?;
            let status = response.status();

            if status.is_success() {
                Ok(true)
            } else if status == reqwest::StatusCode::NOT_FOUND {
                Ok(false)
            } else {
                Err(status_error(status, response.headers(), url))
            }
        })
        .await?;

        debug!("{} exists: {}", tag, found);
        Ok(found)
    }

    async fn copy(&self, source_ref: &str, dest_tags: &[String]) -> Result<(), RegistryError> {
        let targets: Vec<String> = dest_tags.iter().map(|tag| self.reference(tag)).collect();
        self.copier.create(source_ref, &targets).await
    }

    async fn list_tags(&self) -> Result<Vec<String>, RegistryError> {
        let mut tags = Vec::new();
        let mut url = Some(format!(
            "{}/v2/{}/tags/list?n={}",
            self.base_url, self.repository, self.page_size
        ));

        while let Some(current) = url.take() {
            let (page, next) = self.fetch_tag_page(&current).await?;
            let empty = page.is_empty();
            tags.extend(page);
            // Guard against registries that keep linking to empty pages
            if !empty {
                url = next;
            }
        }

        debug!("Listed {} tags in {}", tags.len(), self.repository);
        Ok(tags)
    }
}
