//! Resolution of local tool inputs into in-memory files

use crate::error::{Error, Result};
use base64::Engine;
use futures_util::StreamExt;
use std::net::IpAddr;
use std::path::Path;

/// A file ready to be uploaded to the API
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub data: Vec<u8>,
    pub mime: String,
}

impl LocalFile {
    /// Wrap raw bytes, guessing the MIME type from the file name
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        let mime = guess_mime(&name).to_string();
        Self { name, data, mime }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lower-case extension of the file name, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    pub fn is_pdf(&self) -> bool {
        self.data.len() >= 4 && &self.data[0..4] == b"%PDF"
    }

    /// Fail unless the bytes start with a PDF header
    pub fn ensure_pdf(&self) -> Result<()> {
        if self.is_pdf() {
            Ok(())
        } else {
            Err(Error::InvalidPdf {
                reason: format!("{} is not a PDF file", self.name),
            })
        }
    }

    /// Fail unless the extension is one of `allowed`
    pub fn ensure_extension(&self, allowed: &[&str]) -> Result<()> {
        match self.extension() {
            Some(ext) if allowed.contains(&ext.as_str()) => Ok(()),
            _ => Err(Error::SourceResolution {
                reason: format!(
                    "{} has an unsupported type (expected one of: {})",
                    self.name,
                    allowed.join(", ")
                ),
            }),
        }
    }
}

/// MIME type by extension; unknown extensions are sent as octet-stream
pub fn guess_mime(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        _ => "application/octet-stream",
    }
}

/// Read a local file
pub fn resolve_path<P: AsRef<Path>>(path: P) -> Result<LocalFile> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::SourceResolution {
            reason: format!("file not found: {}", path.display()),
        });
    }

    let data = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    Ok(LocalFile::new(name, data))
}

/// Decode inline base64 content
pub fn resolve_base64(base64_data: &str, name: Option<&str>) -> Result<LocalFile> {
    let engine = base64::engine::general_purpose::STANDARD;
    let data = engine.decode(base64_data.trim())?;

    let name = match name {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        // Bytes without a name are most likely a PDF
        _ if data.starts_with(b"%PDF") => "upload.pdf".to_string(),
        _ => "upload".to_string(),
    };

    Ok(LocalFile::new(name, data))
}

/// True for loopback, private, link-local, CGNAT and other non-public addresses
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (a == 100 && (b & 0xC0) == 64)
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xFE00) == 0xFC00
                || (first & 0xFFC0) == 0xFE80
        }
    }
}

/// Resolve the URL's host and refuse it if any address is non-public
async fn check_ssrf(url: &url::Url) -> Result<()> {
    let host = url.host_str().ok_or_else(|| Error::SourceResolution {
        reason: "URL has no host".to_string(),
    })?;
    let port = url.port_or_known_default().unwrap_or(443);

    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::SourceResolution {
            reason: format!("DNS resolution failed for {}: {}", host, e),
        })?;

    for addr in addrs {
        if is_private_ip(&addr.ip()) {
            return Err(Error::SsrfBlocked {
                url: url.to_string(),
            });
        }
    }

    Ok(())
}

/// Download a remote input file with SSRF protection and a size ceiling
pub async fn resolve_url(
    raw_url: &str,
    allow_private_urls: bool,
    max_download_bytes: u64,
) -> Result<LocalFile> {
    let url = url::Url::parse(raw_url).map_err(|e| Error::SourceResolution {
        reason: format!("Invalid URL: {}", e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::SourceResolution {
            reason: format!("unsupported URL scheme: {}", url.scheme()),
        });
    }

    if !allow_private_urls {
        check_ssrf(&url).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .map_err(Error::HttpRequest)?;

    let response = client.get(url.clone()).send().await?;

    if !response.status().is_success() {
        return Err(Error::SourceResolution {
            reason: format!("HTTP request failed with status: {}", response.status()),
        });
    }

    if let Some(content_length) = response.content_length() {
        if content_length > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: content_length,
                max_size: max_download_bytes,
            });
        }
    }

    let mut data = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Error::HttpRequest)?;
        data.extend_from_slice(&chunk);
        if data.len() as u64 > max_download_bytes {
            return Err(Error::DownloadTooLarge {
                size: data.len() as u64,
                max_size: max_download_bytes,
            });
        }
    }

    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "download".to_string());

    Ok(LocalFile::new(name, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_base64_names() {
        // "%PDF-1.4"
        let pdf = resolve_base64("JVBERi0xLjQ=", None).unwrap();
        assert_eq!(pdf.name, "upload.pdf");
        assert_eq!(pdf.mime, "application/pdf");
        assert!(pdf.is_pdf());

        let named = resolve_base64("SGVsbG8gV29ybGQ=", Some("notes.html")).unwrap();
        assert_eq!(named.mime, "text/html");
        assert!(matches!(named.ensure_pdf(), Err(Error::InvalidPdf { .. })));
    }

    #[test]
    fn test_resolve_base64_invalid_base64() {
        let result = resolve_base64("not valid base64!!!", None);
        assert!(matches!(result, Err(Error::Base64Decode(_))));
    }

    #[test]
    fn test_resolve_path_not_found() {
        let result = resolve_path("/nonexistent/path/file.pdf");
        assert!(matches!(result, Err(Error::SourceResolution { .. })));
    }

    #[test]
    fn test_resolve_path_reads_file() {
        let mut tmp = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        tmp.write_all(b"PK\x03\x04").unwrap();
        let file = resolve_path(tmp.path()).unwrap();
        assert_eq!(file.size(), 4);
        assert_eq!(file.extension().as_deref(), Some("docx"));
        assert!(file.ensure_extension(&["doc", "docx"]).is_ok());
        assert!(file.ensure_extension(&["pdf"]).is_err());
    }

    #[test]
    fn test_guess_mime_case_insensitive() {
        assert_eq!(guess_mime("SCAN.JPG"), "image/jpeg");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn test_is_private_ip_v4() {
        for ip in [
            "127.0.0.1",
            "10.0.0.1",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.169.254",
            "100.64.0.1",
            "0.0.0.0",
            "255.255.255.255",
        ] {
            assert!(is_private_ip(&ip.parse().unwrap()), "{} should be private", ip);
        }
        for ip in ["8.8.8.8", "1.1.1.1", "203.0.113.1", "100.128.0.1"] {
            assert!(!is_private_ip(&ip.parse().unwrap()), "{} should be public", ip);
        }
    }

    #[test]
    fn test_is_private_ip_v6() {
        for ip in ["::1", "::", "fc00::1", "fd00::1", "fe80::1"] {
            assert!(is_private_ip(&ip.parse().unwrap()), "{} should be private", ip);
        }
        assert!(!is_private_ip(&"2607:f8b0:4004:800::200e".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_resolve_url_rejects_scheme() {
        let result = resolve_url("file:///etc/passwd", false, 1024).await;
        assert!(matches!(result, Err(Error::SourceResolution { .. })));
    }

    #[tokio::test]
    async fn test_resolve_url_blocks_loopback() {
        let result = resolve_url("http://127.0.0.1:9/doc.pdf", false, 1024).await;
        assert!(matches!(result, Err(Error::SsrfBlocked { .. })));
    }
}
