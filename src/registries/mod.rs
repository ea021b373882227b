//! Registry implementations for listing, probing and copying images

pub mod docker_hub;
pub mod imagetools;
pub mod oci;

pub use docker_hub::DockerHubRegistry;
pub use imagetools::{BuildxImageTools, ImageCopier};
pub use oci::OciRegistryClient;

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::config::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::error::RegistryError;

/// HTTP client shared by the registry implementations
pub(crate) fn http_client() -> Result<reqwest::Client, RegistryError> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Map an unexpected (non-success, non-404) status to a registry error
pub(crate) fn status_error(status: StatusCode, headers: &HeaderMap, url: &str) -> RegistryError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => RegistryError::RateLimited {
            retry_after_secs: headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            RegistryError::Unauthorized(format!("{} returned {}", url, status))
        }
        s if s.is_server_error() => RegistryError::Server(format!("{} returned {}", url, s)),
        s => RegistryError::InvalidResponse(format!("Unexpected status {}: {}", s, url)),
    }
}
