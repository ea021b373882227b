//! Platform support check for image manifests
//!
//! Reads the JSON printed by
//! `docker buildx imagetools inspect --format '{{json .}}' <image>` and
//! reports whether a requested `os/arch` platform is present. Used by build
//! pipelines to gate per-platform builds; the synchronizer does not need it.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::PlatformError;

/// An `os/architecture` pair such as `linux/amd64`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

impl FromStr for Platform {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [os, architecture] if !os.is_empty() && !architecture.is_empty() => Ok(Self {
                os: os.to_string(),
                architecture: architecture.to_string(),
            }),
            _ => Err(PlatformError::InvalidPlatform(s.to_string())),
        }
    }
}

/// One platform entry of a manifest list
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct PlatformEntry {
    pub os: Option<String>,
    pub architecture: Option<String>,
    pub variant: Option<String>,
}

pub fn load_manifest(path: &Path) -> Result<Value, PlatformError> {
    let content = std::fs::read_to_string(path)
        .map_err(|_| PlatformError::ManifestNotFound(path.to_path_buf()))?;
    serde_json::from_str(&content).map_err(|_| PlatformError::InvalidManifest(path.to_path_buf()))
}

/// Platform entries of a manifest list, or the single platform of a plain manifest
pub fn extract_platforms(data: &Value) -> Vec<PlatformEntry> {
    let listed = data.get("platforms").filter(|v| match v {
        Value::Array(entries) => !entries.is_empty(),
        Value::Null => false,
        _ => true,
    });

    let entries = match listed {
        Some(Value::Array(entries)) => entries.clone(),
        Some(_) => return Vec::new(),
        None => data
            .get("manifest")
            .and_then(|m| m.get("platform"))
            .filter(|p| p.is_object())
            .map(|p| vec![p.clone()])
            .unwrap_or_default(),
    };

    entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect()
}

pub fn is_platform_supported(entries: &[PlatformEntry], platform: &Platform) -> bool {
    entries.iter().any(|entry| {
        entry.os.as_deref() == Some(platform.os.as_str())
            && entry.architecture.as_deref() == Some(platform.architecture.as_str())
    })
}

/// Check whether the manifest JSON at `path` lists `platform` (`os/arch`)
pub fn check_platform(platform: &str, path: &Path) -> Result<bool, PlatformError> {
    let platform: Platform = platform.parse()?;
    let manifest = load_manifest(path)?;
    Ok(is_platform_supported(&extract_platforms(&manifest), &platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[rstest]
    #[case("linux/amd64", Some(("linux", "amd64")))]
    #[case("linux/arm64", Some(("linux", "arm64")))]
    #[case("linux", None)]
    #[case("linux/", None)]
    #[case("/amd64", None)]
    #[case("linux/arm/v7", None)]
    fn parse_platform(#[case] input: &str, #[case] expected: Option<(&str, &str)>) {
        let result = input.parse::<Platform>().ok();
        assert_eq!(
            result,
            expected.map(|(os, architecture)| Platform {
                os: os.to_string(),
                architecture: architecture.to_string(),
            })
        );
    }

    #[test]
    fn extract_platforms_reads_manifest_list() {
        let data = json!({
            "platforms": [
                {"os": "linux", "architecture": "amd64"},
                {"os": "linux", "architecture": "arm64", "variant": "v8"},
                "not-an-object"
            ]
        });

        let entries = extract_platforms(&data);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].variant.as_deref(), Some("v8"));
    }

    #[test]
    fn extract_platforms_falls_back_to_single_manifest_platform() {
        let data = json!({
            "platforms": [],
            "manifest": {"platform": {"os": "linux", "architecture": "amd64"}}
        });

        let entries = extract_platforms(&data);

        assert_eq!(
            entries,
            vec![PlatformEntry {
                os: Some("linux".to_string()),
                architecture: Some("amd64".to_string()),
                variant: None,
            }]
        );
    }

    #[test]
    fn extract_platforms_ignores_non_list_platforms() {
        assert!(extract_platforms(&json!({"platforms": "linux/amd64"})).is_empty());
        assert!(extract_platforms(&json!({})).is_empty());
    }

    #[rstest]
    #[case("linux/amd64", true)]
    #[case("linux/arm64", true)]
    #[case("windows/amd64", false)]
    fn check_platform_reads_inspect_json(#[case] platform: &str, #[case] expected: bool) {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"platforms": [{{"os": "linux", "architecture": "amd64"}}, {{"os": "linux", "architecture": "arm64"}}]}}"#
        )
        .unwrap();

        assert_eq!(check_platform(platform, file.path()).unwrap(), expected);
    }

    #[test]
    fn check_platform_reports_missing_and_invalid_manifests() {
        assert!(matches!(
            check_platform("linux/amd64", Path::new("/nonexistent/inspect.json")),
            Err(PlatformError::ManifestNotFound(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            check_platform("linux/amd64", file.path()),
            Err(PlatformError::InvalidManifest(_))
        ));

        assert!(matches!(
            check_platform("amd64", file.path()),
            Err(PlatformError::InvalidPlatform(_))
        ));
    }
}
