use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::sync::variant::VariantSource;

// =============================================================================
// Registry defaults
// =============================================================================

/// Registry host that mirrored images are pushed to
pub const DEFAULT_DESTINATION_REGISTRY: &str = "ghcr.io";

/// Repository inside the destination registry holding every variant
pub const DEFAULT_DESTINATION_REPOSITORY: &str = "btreemap/overleaf";

/// Base URL of the Docker Hub API used to list upstream tags
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://hub.docker.com";

/// Registry host prefixed to upstream image references when copying
pub const DEFAULT_SOURCE_REGISTRY: &str = "docker.io";

/// Tags requested per Docker Hub page (API maximum)
pub const DEFAULT_UPSTREAM_PAGE_SIZE: usize = 100;

/// Upper bound on Docker Hub pages walked for one image
pub const MAX_UPSTREAM_PAGES: usize = 1000;

/// Tags requested per `tags/list` page on the destination
pub const DEFAULT_TAGS_PAGE_SIZE: usize = 1000;

/// Variant listed by `latest` when none is given
pub const DEFAULT_LATEST_VARIANT: &str = "official";

// =============================================================================
// Time-related constants
// =============================================================================

/// Timeout for a single registry HTTP request (30 seconds)
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Attempts made for a transient registry failure before giving up
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubled for every further attempt
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Largest `Retry-After` we are willing to honor
pub const MAX_RETRY_AFTER_SECS: u64 = 60;

/// User agent sent with every HTTP request
pub const USER_AGENT: &str = "image-mirror";

/// Environment variables consulted, in order, for the destination token
pub const TOKEN_ENV_VARS: &[&str] = &["GH_TOKEN", "REGISTRY_TOKEN"];

/// Mirror configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MirrorConfig {
    pub destination: DestinationConfig,
    pub upstream: UpstreamConfig,
    pub variants: Vec<VariantSource>,
    /// Image used in place of upstream images that only ship schema1 manifests
    pub placeholder: Option<String>,
    pub retry: RetryPolicy,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            destination: DestinationConfig::default(),
            upstream: UpstreamConfig::default(),
            variants: vec![
                VariantSource::new("official", "sharelatex/sharelatex"),
                VariantSource::new("full", "tuetenk0pp/sharelatex-full"),
                VariantSource::new("cep", "overleafcep/sharelatex"),
            ],
            placeholder: None,
            retry: RetryPolicy::default(),
        }
    }
}

/// Destination registry configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DestinationConfig {
    pub registry: String,
    pub repository: String,
    /// Overrides `https://<registry>` for API calls
    pub base_url: Option<String>,
    pub tags_page_size: usize,
}

impl DestinationConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.registry))
    }

}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_DESTINATION_REGISTRY.to_string(),
            repository: DEFAULT_DESTINATION_REPOSITORY.to_string(),
            base_url: None,
            tags_page_size: DEFAULT_TAGS_PAGE_SIZE,
        }
    }
}

/// Upstream (Docker Hub) configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct UpstreamConfig {
    pub base_url: String,
    pub source_registry: String,
    pub page_size: usize,
    /// Pages walked before the listing is cut short
    pub max_pages: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_BASE_URL.to_string(),
            source_registry: DEFAULT_SOURCE_REGISTRY.to_string(),
            page_size: DEFAULT_UPSTREAM_PAGE_SIZE,
            max_pages: MAX_UPSTREAM_PAGES,
        }
    }
}

/// Bounded exponential backoff for transient registry failures
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_RETRY_ATTEMPTS,
            base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

impl MirrorConfig {
    /// Load from `path`, or from the default config location when it exists,
    /// or fall back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = config_path();
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::Validation("no variants configured".to_string()));
        }
        let mut seen = HashSet::new();
        for variant in &self.variants {
            if variant.name.is_empty() || variant.name == "all" {
                return Err(ConfigError::Validation(format!(
                    "invalid variant name: {:?}",
                    variant.name
                )));
            }
            if !seen.insert(variant.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate variant: {}",
                    variant.name
                )));
            }
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Validation(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn variant(&self, name: &str) -> Result<&VariantSource, ConfigError> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| ConfigError::UnknownVariant(name.to_string()))
    }

    /// Resolve a `--variant` filter; `all` selects every configured variant
    pub fn select_variants(&self, filter: &str) -> Result<Vec<&VariantSource>, ConfigError> {
        if filter == "all" {
            Ok(self.variants.iter().collect())
        } else {
            Ok(vec![self.variant(filter)?])
        }
    }
}

/// Returns the first destination token found in the environment.
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|token| !token.is_empty())
}

/// Returns the path to the default config file.
/// Uses $XDG_CONFIG_HOME/image-mirror/config.json if XDG_CONFIG_HOME is set,
/// otherwise falls back to ~/.config/image-mirror/config.json,
/// or ./image-mirror/config.json if neither is available.
pub fn config_path() -> PathBuf {
    config_dir_with_env(std::env::var("XDG_CONFIG_HOME").ok(), dirs::home_dir()).join("config.json")
}

fn config_dir_with_env(xdg_config_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let config_dir = xdg_config_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    config_dir.join("image-mirror")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn mirror_config_from_partial_object_uses_defaults_for_missing_fields() {
        let result = serde_json::from_value::<MirrorConfig>(json!({
            "destination": {
                "repository": "acme/mirror"
            }
        }))
        .unwrap();

        assert_eq!(result.destination.repository, "acme/mirror");
        assert_eq!(result.destination.registry, DEFAULT_DESTINATION_REGISTRY);
        assert_eq!(result.variants, MirrorConfig::default().variants);
        assert_eq!(result.retry, RetryPolicy::default());
    }

    #[test]
    fn mirror_config_from_full_object_parses_all_fields() {
        let result = serde_json::from_value::<MirrorConfig>(json!({
            "destination": {
                "registry": "registry.example.com",
                "repository": "team/app",
                "baseUrl": "http://localhost:5000",
                "tagsPageSize": 50
            },
            "upstream": {
                "baseUrl": "http://localhost:8080",
                "sourceRegistry": "registry-1.docker.io",
                "pageSize": 10,
                "maxPages": 5
            },
            "variants": [
                { "name": "stable", "registryRef": "team/app" }
            ],
            "placeholder": "ghcr.io/team/placeholder:latest",
            "retry": { "attempts": 5, "baseDelayMs": 10 }
        }))
        .unwrap();

        assert_eq!(
            result,
            MirrorConfig {
                destination: DestinationConfig {
                    registry: "registry.example.com".to_string(),
                    repository: "team/app".to_string(),
                    base_url: Some("http://localhost:5000".to_string()),
                    tags_page_size: 50,
                },
                upstream: UpstreamConfig {
                    base_url: "http://localhost:8080".to_string(),
                    source_registry: "registry-1.docker.io".to_string(),
                    page_size: 10,
                    max_pages: 5,
                },
                variants: vec![VariantSource::new("stable", "team/app")],
                placeholder: Some("ghcr.io/team/placeholder:latest".to_string()),
                retry: RetryPolicy {
                    attempts: 5,
                    base_delay_ms: 10
                },
            }
        );
    }

    #[test]
    fn destination_base_url_defaults_to_https_registry() {
        let destination = DestinationConfig::default();

        assert_eq!(destination.base_url(), "https://ghcr.io");
    }

    #[test]
    fn retry_policy_delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            attempts: 3,
            base_delay_ms: 100,
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
    }

    #[test]
    fn select_variants_resolves_all_and_single_names() {
        let config = MirrorConfig::default();

        let all: Vec<_> = config
            .select_variants("all")
            .unwrap()
            .into_iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(all, vec!["official", "full", "cep"]);

        let single = config.select_variants("cep").unwrap();
        assert_eq!(single[0].registry_ref, "overleafcep/sharelatex");

        assert!(matches!(
            config.select_variants("nightly"),
            Err(ConfigError::UnknownVariant(name)) if name == "nightly"
        ));
    }

    #[test]
    fn validate_rejects_duplicate_variants_and_zero_attempts() {
        let mut config = MirrorConfig::default();
        config.variants.push(VariantSource::new("full", "someone/else"));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let config = MirrorConfig {
            retry: RetryPolicy {
                attempts: 0,
                base_delay_ms: 1,
            },
            ..MirrorConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_reads_explicit_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"variants": [{{"name": "official", "registryRef": "sharelatex/sharelatex"}}]}}"#
        )
        .unwrap();

        let config = MirrorConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.variants.len(), 1);
        assert_eq!(config.destination, DestinationConfig::default());
    }

    #[test]
    fn load_reports_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        let result = MirrorConfig::load(Some(file.path()));

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn load_reports_missing_file() {
        let result = MirrorConfig::load(Some(Path::new("/nonexistent/image-mirror.json")));

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn config_dir_with_env_uses_xdg_config_home_when_set() {
        let path = config_dir_with_env(
            Some("/tmp/test-config".to_string()),
            Some(PathBuf::from("/home/user")),
        );

        assert_eq!(path, PathBuf::from("/tmp/test-config/image-mirror"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_home_config() {
        let path = config_dir_with_env(None, Some(PathBuf::from("/home/user")));

        assert_eq!(path, PathBuf::from("/home/user/.config/image-mirror"));
    }

    #[test]
    fn config_dir_with_env_falls_back_to_current_dir_when_no_dirs_available() {
        let path = config_dir_with_env(None, None);
        assert_eq!(path, PathBuf::from("./image-mirror"));
    }
}
