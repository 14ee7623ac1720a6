//! Error types for the PDF tools client

use serde::Serialize;
use thiserror::Error;

/// Result type alias for the PDF tools client
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse error classification reported alongside every failed tool call.
///
/// Callers use it to decide which step to retry: an `Upload` failure needs a
/// new upload, an `Operation` failure can be retried against the same document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Upload,
    Operation,
    Network,
    Input,
    Local,
}

/// Error types for the PDF tools client
#[derive(Error, Debug)]
pub enum Error {
    /// No API base URL configured
    #[error("API base URL is not configured (set PDF_TOOLS_API_URL)")]
    ApiNotConfigured,

    /// Configured API base URL could not be parsed
    #[error("Invalid API base URL: {url}")]
    InvalidApiUrl { url: String },

    /// Upload endpoint answered with a non-success status
    #[error("Upload failed with status {status}: {message}")]
    UploadFailed { status: u16, message: String },

    /// Operation endpoint answered with a non-success status
    #[error("Operation {operation} failed with status {status}: {message}")]
    OperationFailed {
        operation: String,
        status: u16,
        message: String,
    },

    /// Result download answered with a non-success status
    #[error("Download failed with status {status}")]
    DownloadFailed { status: u16 },

    /// API answered 2xx but the body was not what we expected
    #[error("Unexpected API response: {reason}")]
    UnexpectedResponse { reason: String },

    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An operation was requested before any document was uploaded
    #[error("No document uploaded in this session")]
    NoDocument,

    /// Session id not known (expired or never created)
    #[error("Session not found: {id}")]
    SessionNotFound { id: String },

    /// Another action is already running in this session
    #[error("Session {id} is busy")]
    SessionBusy { id: String },

    /// Tool or conversion name not in the catalog
    #[error("Unknown tool: {name}")]
    UnknownTool { name: String },

    /// Tool option failed validation
    #[error("Invalid option {name}: {reason}")]
    InvalidOption { name: String, reason: String },

    /// Invalid page selection
    #[error("Invalid page range: {range}")]
    InvalidPageRange { range: String },

    /// Reorder index outside the list
    #[error("Cannot move item {from} to {to} in a list of {len}")]
    InvalidMove { from: usize, to: usize, len: usize },

    /// Source resolution error
    #[error("Failed to resolve source: {reason}")]
    SourceResolution { reason: String },

    /// Input expected to be a PDF is not one
    #[error("Invalid PDF file: {reason}")]
    InvalidPdf { reason: String },

    /// Path access denied (outside allowed resource directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },

    /// SSRF blocked (URL resolves to private/reserved IP)
    #[error("SSRF blocked: {url}")]
    SsrfBlocked { url: String },

    /// Download too large
    #[error("Download too large: {size} bytes (max: {max_size} bytes)")]
    DownloadTooLarge { size: u64, max_size: u64 },

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Preview rendering error
    #[error("Render error: {reason}")]
    Render { reason: String },
}

impl Error {
    /// Which step of the upload/process/download lifecycle this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::UploadFailed { .. } => ErrorCategory::Upload,
            Error::OperationFailed { .. } | Error::DownloadFailed { .. } | Error::NoDocument => {
                ErrorCategory::Operation
            }
            Error::HttpRequest(_)
            | Error::Serialization(_)
            | Error::UnexpectedResponse { .. }
            | Error::DownloadTooLarge { .. } => ErrorCategory::Network,
            Error::ApiNotConfigured
            | Error::InvalidApiUrl { .. }
            | Error::SessionNotFound { .. }
            | Error::SessionBusy { .. }
            | Error::UnknownTool { .. }
            | Error::InvalidOption { .. }
            | Error::InvalidPageRange { .. }
            | Error::InvalidMove { .. }
            | Error::SourceResolution { .. }
            | Error::InvalidPdf { .. }
            | Error::PathAccessDenied { .. }
            | Error::SsrfBlocked { .. }
            | Error::Base64Decode(_) => ErrorCategory::Input,
            Error::Io(_) | Error::Render { .. } => ErrorCategory::Local,
        }
    }

    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, response bodies, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::ApiNotConfigured => "API base URL is not configured".to_string(),
            Error::InvalidApiUrl { .. } => "API base URL is invalid".to_string(),
            Error::UploadFailed { status, .. } => format!("Upload failed (HTTP {})", status),
            Error::OperationFailed {
                operation, status, ..
            } => format!("Operation {} failed (HTTP {})", operation, status),
            Error::DownloadFailed { status } => format!("Download failed (HTTP {})", status),
            Error::UnexpectedResponse { .. } => "Unexpected response from API".to_string(),
            Error::HttpRequest(_) => "HTTP request failed".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::NoDocument => "No document uploaded; upload a file first".to_string(),
            Error::SessionNotFound { id } => format!("Session not found: {}", id),
            Error::SessionBusy { .. } => {
                "Another action is in progress for this session".to_string()
            }
            Error::UnknownTool { name } => format!("Unknown tool: {}", name),
            Error::InvalidOption { name, reason } => {
                format!("Invalid option {}: {}", name, reason)
            }
            Error::InvalidPageRange { range } => format!("Invalid page range: {}", range),
            Error::InvalidMove { from, to, len } => {
                format!("Cannot move item {} to {} in a list of {}", from, to, len)
            }
            Error::SourceResolution { .. } => "Failed to resolve input file".to_string(),
            Error::InvalidPdf { .. } => "Invalid PDF file".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
            Error::SsrfBlocked { .. } => "URL not allowed".to_string(),
            Error::DownloadTooLarge { max_size, .. } => {
                format!("Download exceeds maximum size of {} bytes", max_size)
            }
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Render { .. } => "Preview rendering failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_categories() {
        let upload = Error::UploadFailed {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(upload.category(), ErrorCategory::Upload);

        let operation = Error::OperationFailed {
            operation: "rotate".to_string(),
            status: 400,
            message: "bad angle".to_string(),
        };
        assert_eq!(operation.category(), ErrorCategory::Operation);

        let parse = Error::UnexpectedResponse {
            reason: "missing id".to_string(),
        };
        assert_eq!(parse.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_client_message_hides_response_body() {
        let err = Error::OperationFailed {
            operation: "compress".to_string(),
            status: 502,
            message: "Traceback (most recent call last): /srv/app/views.py".to_string(),
        };
        let message = err.client_message();
        assert_eq!(message, "Operation compress failed (HTTP 502)");
        assert!(!message.contains("/srv"));
    }

    #[test]
    fn test_client_message_hides_paths() {
        let err = Error::PathAccessDenied {
            path: "/etc/shadow".to_string(),
        };
        assert_eq!(err.client_message(), "Access denied");
    }
}
