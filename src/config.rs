//! Runtime configuration, read from the environment at start-up

use std::path::PathBuf;
use url::Url;

/// Environment variable selecting the remote API host
pub const API_URL_VAR: &str = "PDF_TOOLS_API_URL";
pub const RESOURCE_DIRS_VAR: &str = "PDF_TOOLS_RESOURCE_DIRS";
pub const ALLOW_PRIVATE_URLS_VAR: &str = "PDF_TOOLS_ALLOW_PRIVATE_URLS";
pub const MAX_DOWNLOAD_BYTES_VAR: &str = "PDF_TOOLS_MAX_DOWNLOAD_BYTES";
pub const REQUEST_TIMEOUT_VAR: &str = "PDF_TOOLS_REQUEST_TIMEOUT_SECS";
pub const MAX_SESSIONS_VAR: &str = "PDF_TOOLS_MAX_SESSIONS";
pub const PDFIUM_DIR_VAR: &str = "PDF_TOOLS_PDFIUM_DIR";

/// Security, network and resource configuration for the tool server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the remote PDF API (no fallback host)
    pub api_url: Option<Url>,
    /// Raw value of the API URL variable when it failed to parse
    pub invalid_api_url: Option<String>,
    /// Directories local file inputs and outputs are confined to (empty = unrestricted)
    pub resource_dirs: Vec<String>,
    /// Allow URL sources that resolve to private/reserved IPs (default: false)
    pub allow_private_urls: bool,
    /// Maximum size in bytes for URL sources and result downloads (default: 100MB)
    pub max_download_bytes: u64,
    /// Per-request timeout against the API (default: 120s)
    pub request_timeout_secs: u64,
    /// Maximum number of live sessions before the least recently used is dropped (default: 64)
    pub max_sessions: usize,
    /// Directory holding the PDFium shared library for previews
    pub pdfium_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            invalid_api_url: None,
            resource_dirs: Vec::new(),
            allow_private_urls: false,
            max_download_bytes: 100 * 1024 * 1024, // 100MB
            request_timeout_secs: 120,
            max_sessions: 64,
            pdfium_dir: None,
        }
    }
}

impl ServerConfig {
    /// Build configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(API_URL_VAR).filter(|v| !v.trim().is_empty()) {
            match parse_api_url(&raw) {
                Some(url) => config.api_url = Some(url),
                None => {
                    tracing::warn!(value = %raw, "ignoring invalid {}", API_URL_VAR);
                    config.invalid_api_url = Some(raw);
                }
            }
        }

        if let Some(raw) = lookup(RESOURCE_DIRS_VAR) {
            config.resource_dirs = std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.to_string_lossy().to_string())
                .collect();
        }

        if let Some(raw) = lookup(ALLOW_PRIVATE_URLS_VAR) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => config.allow_private_urls = true,
                "0" | "false" | "no" | "" => config.allow_private_urls = false,
                other => tracing::warn!(value = %other, "ignoring invalid {}", ALLOW_PRIVATE_URLS_VAR),
            }
        }

        if let Some(v) = parse_number(&lookup, MAX_DOWNLOAD_BYTES_VAR) {
            config.max_download_bytes = v;
        }
        if let Some(v) = parse_number(&lookup, REQUEST_TIMEOUT_VAR) {
            config.request_timeout_secs = v;
        }
        if let Some(v) = parse_number::<usize, _>(&lookup, MAX_SESSIONS_VAR) {
            config.max_sessions = v.max(1);
        }

        if let Some(raw) = lookup(PDFIUM_DIR_VAR).filter(|v| !v.trim().is_empty()) {
            config.pdfium_dir = Some(PathBuf::from(raw));
        }

        config
    }
}

/// Parse the API base URL, normalising it to end with a slash so that
/// relative endpoint paths join underneath it.
pub fn parse_api_url(raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    let url = Url::parse(&with_slash).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

fn parse_number<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(value = %raw, "ignoring invalid {}", key);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = ServerConfig::from_lookup(|_| None);
        assert!(config.api_url.is_none());
        assert!(config.invalid_api_url.is_none());
        assert!(config.resource_dirs.is_empty());
        assert!(!config.allow_private_urls);
        assert_eq!(config.max_download_bytes, 100 * 1024 * 1024);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.max_sessions, 64);
    }

    #[test]
    fn test_api_url_gets_trailing_slash() {
        let config = ServerConfig::from_lookup(lookup_from(&[(
            API_URL_VAR,
            "https://pdf.example.com/api",
        )]));
        assert_eq!(
            config.api_url.unwrap().as_str(),
            "https://pdf.example.com/api/"
        );
    }

    #[test]
    fn test_invalid_api_url_recorded() {
        let config = ServerConfig::from_lookup(lookup_from(&[(API_URL_VAR, "ftp://nope")]));
        assert!(config.api_url.is_none());
        assert_eq!(config.invalid_api_url.as_deref(), Some("ftp://nope"));
    }

    #[test]
    fn test_numeric_overrides_and_bad_values() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            (MAX_DOWNLOAD_BYTES_VAR, "2048"),
            (REQUEST_TIMEOUT_VAR, "soon"),
            (MAX_SESSIONS_VAR, "0"),
            (ALLOW_PRIVATE_URLS_VAR, "TRUE"),
        ]));
        assert_eq!(config.max_download_bytes, 2048);
        assert_eq!(config.request_timeout_secs, 120);
        assert_eq!(config.max_sessions, 1);
        assert!(config.allow_private_urls);
    }

    #[test]
    fn test_parse_api_url_rejects_garbage() {
        assert!(parse_api_url("not a url").is_none());
        assert!(parse_api_url("http://localhost:8000").is_some());
    }
}
