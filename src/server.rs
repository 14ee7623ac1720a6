//! MCP Server implementation using rmcp

use crate::api::{ApiClient, Comparison, OperationOutcome};
use crate::config::ServerConfig;
use crate::editor::{
    CropRect, DragState, MoveRequest, PageBounds, PageOrder, PageOrderItem, PointerEvent,
    PreviewBox, WatermarkEditor, WatermarkPreset,
};
use crate::error::{Error, ErrorCategory};
use crate::render::{self, PreviewOverlay, DEFAULT_PREVIEW_WIDTH};
use crate::session::{Session, SessionStore};
use crate::source::{resolve_base64, resolve_path, resolve_url, FileSource, LocalFile};
use crate::tool::{
    compare_files, convert_files, find_conversion, find_tool, merge_files, EditorBinding,
    ToolRunner, ToolStatus, CONVERSIONS, TOOLS,
};
use anyhow::Result;
use base64::Engine;
use rmcp::{
    handler::server::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    schemars::JsonSchema, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::Path;
use std::sync::Arc;

/// PDF tools MCP server
#[derive(Clone)]
pub struct PdfToolsServer {
    api: Option<ApiClient>,
    sessions: Arc<SessionStore>,
    tool_router: ToolRouter<Self>,
    /// Server configuration
    config: Arc<ServerConfig>,
}

// ============================================================================
// Request/Response types for list_tools and diagnostics
// ============================================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListToolsParams {
    /// Only describe this tool or conversion (e.g. "rotate", "images-to-pdf")
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListToolsResult {
    /// Per-document tools, run with run_tool
    pub tools: Vec<Value>,
    /// Standalone conversions, run with convert_to_pdf
    pub conversions: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsResult {
    pub version: String,
    /// Base URL of the remote API, when configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    pub api_configured: bool,
    pub resource_dirs: Vec<String>,
    pub allow_private_urls: bool,
    pub max_download_bytes: u64,
    pub request_timeout_secs: u64,
    pub max_sessions: usize,
    pub active_sessions: usize,
    /// Whether pdfium bound, so page previews can be rendered locally
    pub previews_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for list_files
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesParams {
    /// Directory to search
    pub directory: String,
    /// Search subdirectories recursively (default: false)
    #[serde(default)]
    pub recursive: bool,
    /// Filename pattern to filter (e.g., "report*.pdf"). Supports glob patterns.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Extensions to include (default: pdf plus every conversion input type)
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct FileInfo {
    /// Full path to the file
    pub path: String,
    /// Filename only
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// MIME type guessed from the extension
    pub mime_type: String,
    /// Last modified time (ISO 8601 format)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListFilesResult {
    /// Directory that was searched
    pub directory: String,
    pub files: Vec<FileInfo>,
    pub total_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for upload_document
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct UploadDocumentParams {
    /// PDF to upload
    pub source: FileSource,
    /// Reuse an existing session (replaces its document); a new session is created when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadDocumentResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub source: String,
    /// Server-assigned document id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for run_tool
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RunToolParams {
    /// Session returned by upload_document
    pub session_id: String,
    /// Tool name from list_tools (e.g. "rotate", "extract-pages", "add_watermark")
    pub tool: String,
    /// Tool options. For crop, organize and add_watermark the session's editor state is used when omitted.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Extra file for tools that take one (the signature image for sign)
    #[serde(default)]
    pub attachment: Option<FileSource>,
}

#[derive(Debug, Serialize)]
pub struct RunToolResult {
    pub session_id: String,
    pub tool: String,
    pub status: ToolStatus,
    /// File reference or inline data returned by the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for download_result
// ============================================================================

/// Which file to fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadTarget {
    /// File produced by the last tool, merge or conversion
    #[default]
    Result,
    /// Document as currently stored by the API
    Processed,
    /// Document as originally uploaded
    Original,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadResultParams {
    pub session_id: String,
    #[serde(default)]
    pub target: DownloadTarget,
    /// Write the file here instead of returning it inline
    #[serde(default)]
    pub output_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResultResult {
    pub session_id: String,
    /// Size in bytes
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// File content when no output_path was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for merge_documents, compare_documents, convert_to_pdf
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct MergeDocumentsParams {
    /// PDFs to merge, at least two
    pub sources: Vec<FileSource>,
    /// Final order as indices into sources (e.g. [2, 0, 1]); upload order when omitted
    #[serde(default)]
    pub order: Option<Vec<usize>>,
    /// Session to store the result in; a new session is created when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CompareDocumentsParams {
    pub first: FileSource,
    pub second: FileSource,
}

#[derive(Debug, Serialize)]
pub struct CompareDocumentsResult {
    pub first: String,
    pub second: String,
    pub difference_count: u32,
    pub differences: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ConvertToPdfParams {
    /// Conversion name from list_tools (e.g. "word-to-pdf", "images-to-pdf", "redact")
    pub conversion: String,
    /// Input files; only images-to-pdf takes more than one, in page order
    pub sources: Vec<FileSource>,
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Session to store the result in; a new session is created when omitted
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Result of a flow whose output is stored in a session (merge, conversion)
#[derive(Debug, Serialize)]
pub struct StoredOutcomeResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub tool: String,
    pub source_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for the editors
// ============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CropEditorParams {
    pub session_id: String,
    /// Restore the default rectangle before anything else
    #[serde(default)]
    pub reset: bool,
    /// Replace the rectangle outright (percent of page)
    #[serde(default)]
    pub rect: Option<CropRect>,
    /// Pointer events, applied in order
    #[serde(default)]
    pub events: Vec<PointerEvent>,
    /// Rendered page box; when given, event coordinates are pixels in the same space
    #[serde(default)]
    pub bounds: Option<PageBounds>,
}

#[derive(Debug, Serialize)]
pub struct CropEditorResult {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rect: Option<CropRect>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drag: Option<DragState>,
    /// Options run_tool will send for crop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WatermarkEditorParams {
    pub session_id: String,
    #[serde(default)]
    pub reset: bool,
    #[serde(default)]
    pub text: Option<String>,
    /// Points, 8 to 144
    #[serde(default)]
    pub font_size: Option<f64>,
    /// 0 to 1
    #[serde(default)]
    pub opacity: Option<f64>,
    /// Degrees
    #[serde(default)]
    pub rotation: Option<f64>,
    /// Snap the centre to a grid position
    #[serde(default)]
    pub preset: Option<WatermarkPreset>,
    /// Pointer events dragging the watermark, applied after the other settings
    #[serde(default)]
    pub events: Vec<PointerEvent>,
    #[serde(default)]
    pub bounds: Option<PageBounds>,
}

#[derive(Debug, Serialize)]
pub struct WatermarkEditorResult {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<WatermarkEditor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_box: Option<PreviewBox>,
    /// Options run_tool will send for add_watermark
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One step of a reorder request
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReorderAction {
    /// Move the item at index `from` to index `to` (0-based)
    Move(MoveRequest),
    /// Move the item with this stable id to index `to`
    MoveId { id: String, to: usize },
    /// Drop a page from the order
    Remove { id: String },
    Reverse,
    /// Back to upload order
    Reset,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReorderPagesParams {
    pub session_id: String,
    /// Actions applied in order
    #[serde(default)]
    pub actions: Vec<ReorderAction>,
}

#[derive(Debug, Serialize)]
pub struct ReorderPagesResult {
    pub session_id: String,
    pub items: Vec<PageOrderItem>,
    /// Page numbers run_tool will send for organize
    pub page_order: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Request/Response types for render_preview and reset_session
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    #[default]
    None,
    Crop,
    Watermark,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RenderPreviewParams {
    pub session_id: String,
    /// 1-based page number (default: 1)
    #[serde(default = "default_page")]
    pub page: u32,
    /// Image width in pixels (default: 800)
    #[serde(default)]
    pub width: Option<u32>,
    /// Editor state to draw over the page
    #[serde(default)]
    pub overlay: OverlayKind,
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Serialize)]
pub struct RenderPreviewResult {
    pub session_id: String,
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub data_base64: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResetSessionParams {
    pub session_id: String,
    /// Drop the session entirely instead of clearing it
    #[serde(default)]
    pub close: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetSessionResult {
    pub session_id: String,
    pub closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

const SOURCE_FORMAT: &str = "Source format: {\"path\": \"/absolute/file.pdf\"}, {\"url\": \"https://...\"}, or {\"base64\": \"...\", \"name\": \"file.pdf\"}";

fn to_response<T: Serialize>(results: &[T]) -> String {
    let response = json!({ "results": results });
    serde_json::to_string_pretty(&response).unwrap_or_default()
}

// ============================================================================
// Tool implementations
// ============================================================================

#[tool_router]
impl PdfToolsServer {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    /// Create a new server with full configuration
    pub fn with_config(config: ServerConfig) -> Self {
        let api = match ApiClient::from_config(&config) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "remote API unavailable; tools will report it");
                None
            }
        };
        Self {
            api,
            sessions: Arc::new(SessionStore::new(config.max_sessions)),
            tool_router: Self::tool_router(),
            config: Arc::new(config),
        }
    }

    /// Describe the tool catalog
    #[tool(
        description = "List every PDF tool and conversion with its options schema. Per-document tools run with run_tool after upload_document; conversions run with convert_to_pdf."
    )]
    async fn list_tools(&self, Parameters(params): Parameters<ListToolsParams>) -> String {
        let result = Self::process_list_tools(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_tools failed");
            ListToolsResult {
                tools: vec![],
                conversions: vec![],
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Report configuration
    #[tool(
        description = "Report the server configuration: which API host is used (PDF_TOOLS_API_URL), limits, active sessions and whether local previews are available."
    )]
    async fn diagnostics(&self) -> String {
        to_response(&[self.process_diagnostics()])
    }

    /// List candidate input files
    #[tool(
        description = "List files in a directory that the tools accept: PDFs and office, HTML and image files for the conversions.

Returns path, name, size, MIME type and last modified time. Supports recursive search and glob pattern filtering."
    )]
    async fn list_files(&self, Parameters(params): Parameters<ListFilesParams>) -> String {
        let result = self.process_list_files(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "list_files failed");
            ListFilesResult {
                directory: params.directory.clone(),
                files: vec![],
                total_count: 0,
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Upload a PDF and open a session on it
    #[tool(
        description = "Upload a PDF to the processing API. Returns a session_id used by every other per-document tool, the server document id and the page count.

A failed upload leaves the session without a document; upload again to retry.

Source format: {\"path\": \"/absolute/file.pdf\"}, {\"url\": \"https://...\"}, or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn upload_document(
        &self,
        Parameters(params): Parameters<UploadDocumentParams>,
    ) -> String {
        let result = self.process_upload(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "upload_document failed");
            UploadDocumentResult {
                session_id: params.session_id.clone(),
                source: params.source.display_name(),
                document_id: None,
                title: None,
                page_count: None,
                status: ToolStatus::Failed(e.category()),
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Run one tool on the session's document
    #[tool(
        description = "Run a PDF tool (rotate, crop, organize, extract-pages, add_watermark, compress, protect, unlock, add-page-numbers, sign, ocr, pdf-to-images, pdf-to-excel, pdf_to_word, pdf-to-powerpoint, edit, find_replace) on the uploaded document.

Options are validated against the tool's schema (see list_tools). crop, organize and add_watermark take their options from crop_editor, reorder_pages and watermark_editor when none are given.

A failed run keeps the document, so the same call can be retried. Use download_result to fetch a produced file."
    )]
    async fn run_tool(&self, Parameters(params): Parameters<RunToolParams>) -> String {
        let result = self.process_run_tool(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, tool = %params.tool, "run_tool failed");
            RunToolResult {
                session_id: params.session_id.clone(),
                tool: params.tool.clone(),
                status: ToolStatus::Failed(e.category()),
                outcome: None,
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Fetch a produced file
    #[tool(
        description = "Download the file produced by the last tool, merge or conversion in a session, or the stored document itself (target: result | processed | original). Writes to output_path when given, otherwise returns base64."
    )]
    async fn download_result(
        &self,
        Parameters(params): Parameters<DownloadResultParams>,
    ) -> String {
        let result = self.process_download(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "download_result failed");
            DownloadResultResult {
                session_id: params.session_id.clone(),
                size: 0,
                output_path: None,
                data_base64: None,
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Merge PDFs
    #[tool(
        description = "Merge PDF files into one. Files are uploaded one after another, then merged in upload order or in the given order. The result is stored in a session for download_result.

Source format: {\"path\": \"/absolute/file.pdf\"}, {\"url\": \"https://...\"}, or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn merge_documents(
        &self,
        Parameters(params): Parameters<MergeDocumentsParams>,
    ) -> String {
        let result = self.process_merge(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "merge_documents failed");
            StoredOutcomeResult {
                session_id: params.session_id.clone(),
                tool: "merge".to_string(),
                source_count: params.sources.len() as u32,
                outcome: None,
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Compare two PDFs
    #[tool(
        description = "Compare two PDF files and list their differences as reported by the API.

Source format: {\"path\": \"/absolute/file.pdf\"}, {\"url\": \"https://...\"}, or {\"base64\": \"...\", \"name\": \"file.pdf\"}"
    )]
    async fn compare_documents(
        &self,
        Parameters(params): Parameters<CompareDocumentsParams>,
    ) -> String {
        let result = self.process_compare(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "compare_documents failed");
            CompareDocumentsResult {
                first: params.first.display_name(),
                second: params.second.display_name(),
                difference_count: 0,
                differences: vec![],
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Run a standalone conversion
    #[tool(
        description = "Convert files to PDF: excel-to-pdf, html-to-pdf, word-to-pdf, powerpoint-to-pdf, images-to-pdf (several images, one per page, in order), scan-to-pdf, or redact a PDF. The result is stored in a session for download_result."
    )]
    async fn convert_to_pdf(&self, Parameters(params): Parameters<ConvertToPdfParams>) -> String {
        let result = self.process_convert(&params).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, conversion = %params.conversion, "convert_to_pdf failed");
            StoredOutcomeResult {
                session_id: params.session_id.clone(),
                tool: params.conversion.clone(),
                source_count: params.sources.len() as u32,
                outcome: None,
                category: Some(e.category()),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Drive the crop rectangle
    #[tool(
        description = "Edit the session's crop rectangle (percent of page, default x=10 y=10 width=80 height=80).

Send pointer events in order: {\"type\": \"down\", \"handle\": \"se\", \"x\": .., \"y\": ..}, {\"type\": \"move\", \"x\": .., \"y\": ..}, {\"type\": \"up\"} or {\"type\": \"leave\"}. Handles: move, n, s, e, w, ne, nw, se, sw. With bounds, coordinates are pixels on the rendered page. The rectangle always stays on the page and at least 10% wide and tall."
    )]
    async fn crop_editor(&self, Parameters(params): Parameters<CropEditorParams>) -> String {
        let result = self.process_crop_editor(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "crop_editor failed");
            CropEditorResult {
                session_id: params.session_id.clone(),
                rect: None,
                drag: None,
                options: None,
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Position the watermark
    #[tool(
        description = "Edit the session's watermark: text, font size, opacity, rotation, a position preset (top-left ... bottom-right) or pointer events dragging its centre. Returns the preview box and the add_watermark options."
    )]
    async fn watermark_editor(
        &self,
        Parameters(params): Parameters<WatermarkEditorParams>,
    ) -> String {
        let result = self.process_watermark_editor(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "watermark_editor failed");
            WatermarkEditorResult {
                session_id: params.session_id.clone(),
                editor: None,
                preview_box: None,
                options: None,
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Reorder pages
    #[tool(
        description = "Reorder the session document's pages. Actions run in order: {\"action\": \"move\", \"from\": 2, \"to\": 0}, {\"action\": \"move_id\", \"id\": \"0-3\", \"to\": 0}, {\"action\": \"remove\", \"id\": \"0-2\"}, {\"action\": \"reverse\"}, {\"action\": \"reset\"}. Indices are 0-based; positions in the result are 1-based. run_tool organize uses this order."
    )]
    async fn reorder_pages(&self, Parameters(params): Parameters<ReorderPagesParams>) -> String {
        let result = self.process_reorder(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "reorder_pages failed");
            ReorderPagesResult {
                session_id: params.session_id.clone(),
                items: vec![],
                page_order: vec![],
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Render a page preview
    #[tool(
        description = "Render a page of the session's document as a PNG (base64), optionally with the crop rectangle or the watermark box drawn on top."
    )]
    async fn render_preview(
        &self,
        Parameters(params): Parameters<RenderPreviewParams>,
    ) -> String {
        let result = self.process_render_preview(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "render_preview failed");
            RenderPreviewResult {
                session_id: params.session_id.clone(),
                page: params.page,
                width: 0,
                height: 0,
                data_base64: String::new(),
                mime_type: String::new(),
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }

    /// Reset or close a session
    #[tool(
        description = "Forget a session's document, result and editor state (or close the session entirely with close=true)."
    )]
    async fn reset_session(&self, Parameters(params): Parameters<ResetSessionParams>) -> String {
        let result = self.process_reset(&params).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "reset_session failed");
            ResetSessionResult {
                session_id: params.session_id.clone(),
                closed: false,
                error: Some(e.client_message()),
            }
        });
        to_response(&[result])
    }
}

impl PdfToolsServer {
    fn api(&self) -> crate::error::Result<&ApiClient> {
        match (&self.api, &self.config.invalid_api_url) {
            (Some(client), _) => Ok(client),
            (None, Some(raw)) => Err(Error::InvalidApiUrl { url: raw.clone() }),
            (None, None) => Err(Error::ApiNotConfigured),
        }
    }

    async fn resolve_source(&self, source: &FileSource) -> crate::error::Result<LocalFile> {
        match source {
            FileSource::Path { path } => {
                let path = self.validate_path_access(path)?;
                resolve_path(path)
            }
            FileSource::Base64 { base64, name } => resolve_base64(base64, name.as_deref()),
            FileSource::Url { url } => {
                resolve_url(
                    url,
                    self.config.allow_private_urls,
                    self.config.max_download_bytes,
                )
                .await
            }
        }
    }

    async fn resolve_sources(
        &self,
        sources: &[FileSource],
    ) -> crate::error::Result<Vec<LocalFile>> {
        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            files.push(self.resolve_source(source).await?);
        }
        Ok(files)
    }

    /// Validate that a path is within allowed resource directories.
    /// If no resource_dirs are configured, all paths are allowed.
    fn validate_path_access(&self, path: &str) -> crate::error::Result<std::path::PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(std::path::PathBuf::from(path));
        }

        let canonical = std::fs::canonicalize(path).map_err(|_| Error::PathAccessDenied {
            path: path.to_string(),
        })?;

        if self.within_resource_dirs(&canonical) {
            Ok(canonical)
        } else {
            Err(Error::PathAccessDenied {
                path: path.to_string(),
            })
        }
    }

    /// Validate an output path; the parent is canonicalized since the file may not exist yet.
    fn validate_output_path_access(
        &self,
        path: &str,
    ) -> crate::error::Result<std::path::PathBuf> {
        if self.config.resource_dirs.is_empty() {
            return Ok(std::path::PathBuf::from(path));
        }

        let path_obj = Path::new(path);
        let parent = path_obj.parent().unwrap_or(Path::new("."));
        let canonical_parent =
            std::fs::canonicalize(parent).map_err(|_| Error::PathAccessDenied {
                path: path.to_string(),
            })?;
        let canonical_target =
            canonical_parent.join(path_obj.file_name().unwrap_or(std::ffi::OsStr::new("")));

        if self.within_resource_dirs(&canonical_target) {
            Ok(canonical_target)
        } else {
            Err(Error::PathAccessDenied {
                path: path.to_string(),
            })
        }
    }

    fn within_resource_dirs(&self, canonical: &Path) -> bool {
        self.config.resource_dirs.iter().any(|dir| {
            std::fs::canonicalize(dir)
                .map(|cd| canonical.starts_with(&cd))
                .unwrap_or(false)
        })
    }

    fn write_output(&self, path_str: &str, data: &[u8]) -> crate::error::Result<String> {
        let path = self.validate_output_path_access(path_str)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(&path, data)?;
        Ok(path_str.to_string())
    }

    fn process_list_tools(params: &ListToolsParams) -> crate::error::Result<ListToolsResult> {
        match params.name.as_deref() {
            None => Ok(ListToolsResult {
                tools: TOOLS.iter().map(|t| t.describe()).collect(),
                conversions: CONVERSIONS.iter().map(|c| c.describe()).collect(),
                error: None,
            }),
            Some(name) => {
                if let Ok(tool) = find_tool(name) {
                    return Ok(ListToolsResult {
                        tools: vec![tool.describe()],
                        conversions: vec![],
                        error: None,
                    });
                }
                let conversion = find_conversion(name)?;
                Ok(ListToolsResult {
                    tools: vec![],
                    conversions: vec![conversion.describe()],
                    error: None,
                })
            }
        }
    }

    fn process_diagnostics(&self) -> DiagnosticsResult {
        let config = &self.config;
        DiagnosticsResult {
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_url: self.api.as_ref().map(|c| c.base_url().to_string()),
            api_configured: self.api.is_some(),
            resource_dirs: config.resource_dirs.clone(),
            allow_private_urls: config.allow_private_urls,
            max_download_bytes: config.max_download_bytes,
            request_timeout_secs: config.request_timeout_secs,
            max_sessions: config.max_sessions,
            active_sessions: self.sessions.len(),
            previews_available: render::previews_available(),
            error: self.api().err().map(|e| e.client_message()),
        }
    }

    pub fn process_list_files(
        &self,
        params: &ListFilesParams,
    ) -> crate::error::Result<ListFilesResult> {
        // Sandbox check: if resource_dirs are configured, directory must be within them
        if !self.config.resource_dirs.is_empty() {
            let canonical =
                std::fs::canonicalize(&params.directory).map_err(|_| Error::PathAccessDenied {
                    path: params.directory.clone(),
                })?;
            if !self.within_resource_dirs(&canonical) {
                return Err(Error::PathAccessDenied {
                    path: params.directory.clone(),
                });
            }
        }

        let dir_path = Path::new(&params.directory);
        if !dir_path.is_dir() {
            return Err(Error::SourceResolution {
                reason: format!("{} is not a directory", params.directory),
            });
        }

        let extensions: Vec<String> = match &params.extensions {
            Some(list) => list
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => accepted_extensions(),
        };

        let pattern = params
            .pattern
            .as_ref()
            .and_then(|p| glob::Pattern::new(p).ok());

        let mut files = Vec::new();
        Self::collect_files(dir_path, params.recursive, &pattern, &extensions, &mut files)?;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let total_count = files.len() as u32;
        Ok(ListFilesResult {
            directory: params.directory.clone(),
            files,
            total_count,
            error: None,
        })
    }

    fn collect_files(
        dir: &Path,
        recursive: bool,
        pattern: &Option<glob::Pattern>,
        extensions: &[String],
        files: &mut Vec<FileInfo>,
    ) -> crate::error::Result<()> {
        let entries = std::fs::read_dir(dir).map_err(Error::Io)?;

        for entry in entries.flatten() {
            let path = entry.path();

            if path.is_dir() {
                if recursive {
                    let _ = Self::collect_files(&path, recursive, pattern, extensions, files);
                }
                continue;
            }

            let matches_ext = path
                .extension()
                .map(|ext| extensions.contains(&ext.to_string_lossy().to_ascii_lowercase()))
                .unwrap_or(false);
            if !path.is_file() || !matches_ext {
                continue;
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if let Some(ref pat) = pattern {
                if !pat.matches(&name) {
                    continue;
                }
            }

            let metadata = std::fs::metadata(&path).ok();
            let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
            let modified = metadata
                .as_ref()
                .and_then(|m| m.modified().ok())
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| {
                    chrono::DateTime::from_timestamp(d.as_secs() as i64, 0)
                        .map(|dt| dt.to_rfc3339())
                        .unwrap_or_default()
                });

            files.push(FileInfo {
                path: path.to_string_lossy().to_string(),
                mime_type: crate::source::guess_mime(&name).to_string(),
                name,
                size,
                modified,
            });
        }

        Ok(())
    }

    pub async fn process_upload(
        &self,
        params: &UploadDocumentParams,
    ) -> crate::error::Result<UploadDocumentResult> {
        let api = self.api()?;
        let (session_id, mut guard) = self
            .sessions
            .acquire_or_create(params.session_id.as_deref())?;
        let session = &mut *guard;

        let uploaded = match self.resolve_source(&params.source).await {
            Ok(file) => match file.ensure_pdf() {
                Ok(()) => {
                    let result = ToolRunner::new(api, &mut session.tool).upload(&file).await;
                    if result.is_ok() {
                        if session.tool.page_count.is_none() && render::previews_available() {
                            session.tool.page_count = render::page_count(&file.data).ok();
                        }
                        session.attach(file);
                    } else {
                        session.file = None;
                        session.page_order = None;
                    }
                    result
                }
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        let (category, error) = match &uploaded {
            Ok(_) => (None, None),
            Err(e) => {
                tracing::warn!(error = %e, session = %session_id, "upload_document failed");
                session.tool.record_failure(e);
                (Some(e.category()), Some(e.client_message()))
            }
        };

        let document = uploaded.ok();
        Ok(UploadDocumentResult {
            session_id: Some(session_id),
            source: params.source.display_name(),
            document_id: document.as_ref().map(|d| d.id.to_string()),
            title: document.as_ref().and_then(|d| d.title.clone()),
            page_count: session.tool.page_count,
            status: session.tool.status,
            category,
            error,
        })
    }

    /// Options for a tool bound to an editor when the caller sent none
    fn editor_options(
        session: &Session,
        binding: EditorBinding,
    ) -> crate::error::Result<Map<String, Value>> {
        match binding {
            EditorBinding::Crop => Ok(session.crop.rect().to_options()),
            EditorBinding::Watermark => Ok(session.watermark.to_options()),
            EditorBinding::PageOrder => {
                let order = session.page_order.as_ref().ok_or_else(unknown_page_count)?;
                let mut options = Map::new();
                options.insert("page_order".to_string(), json!(order.page_order()));
                Ok(options)
            }
        }
    }

    pub async fn process_run_tool(
        &self,
        params: &RunToolParams,
    ) -> crate::error::Result<RunToolResult> {
        let spec = find_tool(&params.tool)?;
        let api = self.api()?;
        let mut guard = self.sessions.acquire(&params.session_id)?;
        let session = &mut *guard;

        let prepared = async {
            let options = match (&params.options, spec.editor) {
                (Some(options), _) => options.clone(),
                (None, Some(binding)) => Self::editor_options(session, binding)?,
                (None, None) => Map::new(),
            };
            let attachments = match &params.attachment {
                Some(source) => vec![self.resolve_source(source).await?],
                None => vec![],
            };
            Ok::<_, Error>((options, attachments))
        }
        .await;

        let outcome = match prepared {
            Ok((options, attachments)) => {
                ToolRunner::new(api, &mut session.tool)
                    .process(spec, &options, attachments)
                    .await
            }
            Err(e) => {
                session.tool.record_failure(&e);
                Err(e)
            }
        };

        let (category, error) = match &outcome {
            Ok(_) => (None, None),
            Err(e) => (Some(e.category()), Some(e.client_message())),
        };

        Ok(RunToolResult {
            session_id: params.session_id.clone(),
            tool: spec.name().to_string(),
            status: session.tool.status,
            outcome: outcome.ok(),
            category,
            error,
        })
    }

    pub async fn process_download(
        &self,
        params: &DownloadResultParams,
    ) -> crate::error::Result<DownloadResultResult> {
        let api = self.api()?;
        let mut guard = self.sessions.acquire(&params.session_id)?;
        let mut runner = ToolRunner::new(api, &mut guard.tool);

        let data = match params.target {
            DownloadTarget::Result => runner.download().await?,
            DownloadTarget::Processed => runner.download_document(false).await?,
            DownloadTarget::Original => runner.download_document(true).await?,
        };

        let size = data.len() as u64;
        let (output_path, data_base64) = match &params.output_path {
            Some(path) => (Some(self.write_output(path, &data)?), None),
            None => (
                None,
                Some(base64::engine::general_purpose::STANDARD.encode(&data)),
            ),
        };

        tracing::info!(session = %params.session_id, size, "result downloaded");
        Ok(DownloadResultResult {
            session_id: params.session_id.clone(),
            size,
            output_path,
            data_base64,
            category: None,
            error: None,
        })
    }

    pub async fn process_merge(
        &self,
        params: &MergeDocumentsParams,
    ) -> crate::error::Result<StoredOutcomeResult> {
        let api = self.api()?;
        let order = match &params.order {
            Some(order) => Some(file_order(params.sources.len(), order)?),
            None => None,
        };
        let (session_id, mut guard) = self
            .sessions
            .acquire_or_create(params.session_id.as_deref())?;

        let files = self.resolve_sources(&params.sources).await?;
        let outcome = merge_files(api, &files, order.as_ref()).await?;
        guard.tool.record_outcome("merge", outcome.clone());

        Ok(StoredOutcomeResult {
            session_id: Some(session_id),
            tool: "merge".to_string(),
            source_count: files.len() as u32,
            outcome: Some(outcome),
            category: None,
            error: None,
        })
    }

    pub async fn process_compare(
        &self,
        params: &CompareDocumentsParams,
    ) -> crate::error::Result<CompareDocumentsResult> {
        let api = self.api()?;
        let first = self.resolve_source(&params.first).await?;
        let second = self.resolve_source(&params.second).await?;
        let Comparison { differences } = compare_files(api, &first, &second).await?;

        Ok(CompareDocumentsResult {
            first: params.first.display_name(),
            second: params.second.display_name(),
            difference_count: differences.len() as u32,
            differences,
            category: None,
            error: None,
        })
    }

    pub async fn process_convert(
        &self,
        params: &ConvertToPdfParams,
    ) -> crate::error::Result<StoredOutcomeResult> {
        let spec = find_conversion(&params.conversion)?;
        let api = self.api()?;
        let (session_id, mut guard) = self
            .sessions
            .acquire_or_create(params.session_id.as_deref())?;

        let files = self.resolve_sources(&params.sources).await?;
        let options = params.options.clone().unwrap_or_default();
        let outcome = convert_files(api, spec, &files, &options).await?;
        guard.tool.record_outcome(spec.name(), outcome.clone());

        Ok(StoredOutcomeResult {
            session_id: Some(session_id),
            tool: spec.name().to_string(),
            source_count: files.len() as u32,
            outcome: Some(outcome),
            category: None,
            error: None,
        })
    }

    pub fn process_crop_editor(
        &self,
        params: &CropEditorParams,
    ) -> crate::error::Result<CropEditorResult> {
        let mut guard = self.sessions.acquire(&params.session_id)?;
        let crop = &mut guard.crop;

        if params.reset {
            crop.reset();
        }
        if let Some(rect) = params.rect {
            *crop = crate::editor::CropEditor::with_rect(rect);
        }
        for event in &params.events {
            crop.apply(event, params.bounds.as_ref());
        }

        let rect = crop.rect();
        Ok(CropEditorResult {
            session_id: params.session_id.clone(),
            rect: Some(rect),
            drag: Some(crop.drag()),
            options: Some(rect.to_options()),
            error: None,
        })
    }

    pub fn process_watermark_editor(
        &self,
        params: &WatermarkEditorParams,
    ) -> crate::error::Result<WatermarkEditorResult> {
        let mut guard = self.sessions.acquire(&params.session_id)?;
        let editor = &mut guard.watermark;

        if params.reset {
            *editor = WatermarkEditor::new();
        }
        if let Some(text) = &params.text {
            editor.set_text(text.clone());
        }
        if let Some(size) = params.font_size {
            editor.set_font_size(size);
        }
        if let Some(opacity) = params.opacity {
            editor.set_opacity(opacity);
        }
        if let Some(rotation) = params.rotation {
            editor.set_rotation(rotation);
        }
        if let Some(preset) = params.preset {
            editor.apply_preset(preset);
        }
        for event in &params.events {
            editor.apply(event, params.bounds.as_ref());
        }

        Ok(WatermarkEditorResult {
            session_id: params.session_id.clone(),
            preview_box: Some(editor.preview_box()),
            options: Some(editor.to_options()),
            editor: Some(editor.clone()),
            error: None,
        })
    }

    pub fn process_reorder(
        &self,
        params: &ReorderPagesParams,
    ) -> crate::error::Result<ReorderPagesResult> {
        let mut guard = self.sessions.acquire(&params.session_id)?;
        let session = &mut *guard;

        if session.page_order.is_none() {
            let count = match (session.tool.page_count, &session.tool.document) {
                (Some(count), _) => count,
                (None, None) => return Err(Error::NoDocument),
                (None, Some(_)) => return Err(unknown_page_count()),
            };
            session.page_order = Some(PageOrder::for_pages(count));
        }
        let order = session.page_order.get_or_insert_with(|| PageOrder::for_pages(0));

        // Work on a copy so a bad action leaves the stored order untouched
        let mut working = order.clone();
        for action in &params.actions {
            match action {
                ReorderAction::Move(MoveRequest { from, to }) => working.move_item(*from, *to)?,
                ReorderAction::MoveId { id, to } => working.move_by_id(id, *to)?,
                ReorderAction::Remove { id } => working.remove(id)?,
                ReorderAction::Reverse => working.reverse(),
                ReorderAction::Reset => working.reset(),
            }
        }
        *order = working;

        Ok(ReorderPagesResult {
            session_id: params.session_id.clone(),
            items: order.items().to_vec(),
            page_order: order.page_order(),
            error: None,
        })
    }

    pub fn process_render_preview(
        &self,
        params: &RenderPreviewParams,
    ) -> crate::error::Result<RenderPreviewResult> {
        let guard = self.sessions.acquire(&params.session_id)?;
        let file = guard.file.as_ref().ok_or(Error::NoDocument)?;

        let overlay = match params.overlay {
            OverlayKind::None => None,
            OverlayKind::Crop => Some(PreviewOverlay::Crop(guard.crop.rect())),
            OverlayKind::Watermark => Some(PreviewOverlay::Watermark(guard.watermark.preview_box())),
        };

        let preview = render::render_page_preview(
            &file.data,
            params.page,
            params.width.unwrap_or(DEFAULT_PREVIEW_WIDTH),
            overlay.as_ref(),
        )?;

        Ok(RenderPreviewResult {
            session_id: params.session_id.clone(),
            page: preview.page,
            width: preview.width,
            height: preview.height,
            data_base64: preview.data_base64,
            mime_type: preview.mime_type,
            error: None,
        })
    }

    pub fn process_reset(
        &self,
        params: &ResetSessionParams,
    ) -> crate::error::Result<ResetSessionResult> {
        let mut guard = self.sessions.acquire(&params.session_id)?;
        guard.reset();
        drop(guard);

        let closed = params.close && self.sessions.remove(&params.session_id);
        tracing::info!(session = %params.session_id, closed, "session reset");
        Ok(ResetSessionResult {
            session_id: params.session_id.clone(),
            closed,
            error: None,
        })
    }
}

/// A document is loaded but nothing reported how many pages it has
fn unknown_page_count() -> Error {
    Error::InvalidOption {
        name: "page_order".to_string(),
        reason: "page count unknown; pass page_order explicitly".to_string(),
    }
}

/// Extensions accepted by at least one tool or conversion
fn accepted_extensions() -> Vec<String> {
    let mut extensions: Vec<String> = std::iter::once("pdf")
        .chain(CONVERSIONS.iter().flat_map(|c| c.conversion.extensions().iter().copied()))
        .map(str::to_string)
        .collect();
    extensions.sort();
    extensions.dedup();
    extensions
}

/// Build a file order from a permutation of source indices
fn file_order(count: usize, order: &[usize]) -> crate::error::Result<PageOrder> {
    let mut seen = vec![false; count];
    let is_permutation = order.len() == count
        && order.iter().all(|&i| i < count && !std::mem::replace(&mut seen[i], true));
    if !is_permutation {
        return Err(Error::InvalidOption {
            name: "order".to_string(),
            reason: format!("must list each of the {} sources exactly once", count),
        });
    }

    let mut files = PageOrder::for_files(count);
    for (target, &source) in order.iter().enumerate() {
        files.move_by_id(&format!("file-{}", source), target)?;
    }
    Ok(files)
}

impl Default for PdfToolsServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for PdfToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(format!(
                "PDF tools backed by a remote processing API. Start with upload_document, \
                 then run_tool and download_result. merge_documents, compare_documents and \
                 convert_to_pdf work on files directly. crop_editor, watermark_editor and \
                 reorder_pages prepare options interactively; render_preview shows them. {}",
                SOURCE_FORMAT
            )),
        }
    }
}

/// Run the MCP server with configuration from the environment
pub async fn run_server() -> Result<()> {
    run_server_with_config(ServerConfig::from_env()).await
}

/// Run the MCP server with full configuration
pub async fn run_server_with_config(config: ServerConfig) -> Result<()> {
    let server = PdfToolsServer::with_config(config);

    tracing::info!("PDF tools MCP server ready, waiting for connections...");

    let service = server.serve(rmcp::transport::io::stdio()).await?;
    service.waiting().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::DEFAULT_RECT;
    use pretty_assertions::assert_eq;

    fn server() -> PdfToolsServer {
        PdfToolsServer::with_config(ServerConfig {
            api_url: crate::config::parse_api_url("http://127.0.0.1:9/api"),
            ..ServerConfig::default()
        })
    }

    fn new_session(server: &PdfToolsServer) -> String {
        server.sessions.create().0
    }

    #[test]
    fn test_params_deserialization() {
        let params: RunToolParams = serde_json::from_str(
            r#"{"session_id": "s", "tool": "rotate", "options": {"angle": 180}}"#,
        )
        .unwrap();
        assert_eq!(params.tool, "rotate");
        assert!(params.attachment.is_none());

        let params: RenderPreviewParams =
            serde_json::from_str(r#"{"session_id": "s", "overlay": "crop"}"#).unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.overlay, OverlayKind::Crop);

        let params: DownloadResultParams =
            serde_json::from_str(r#"{"session_id": "s"}"#).unwrap();
        assert_eq!(params.target, DownloadTarget::Result);
    }

    #[test]
    fn test_reorder_action_deserialization() {
        let params: ReorderPagesParams = serde_json::from_str(
            r#"{"session_id": "s", "actions": [
                {"action": "move", "from": 2, "to": 0},
                {"action": "move_id", "id": "0-1", "to": 2},
                {"action": "remove", "id": "0-3"},
                {"action": "reverse"},
                {"action": "reset"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(params.actions.len(), 5);
        assert!(matches!(
            params.actions[0],
            ReorderAction::Move(MoveRequest { from: 2, to: 0 })
        ));
    }

    #[test]
    fn test_list_tools_lookup() {
        let all = PdfToolsServer::process_list_tools(&ListToolsParams::default()).unwrap();
        assert_eq!(all.tools.len(), TOOLS.len());
        assert_eq!(all.conversions.len(), CONVERSIONS.len());

        let one = PdfToolsServer::process_list_tools(&ListToolsParams {
            name: Some("images-to-pdf".to_string()),
        })
        .unwrap();
        assert!(one.tools.is_empty());
        assert_eq!(one.conversions[0]["multiple_files"], true);

        assert!(PdfToolsServer::process_list_tools(&ListToolsParams {
            name: Some("shred".to_string()),
        })
        .is_err());
    }

    #[test]
    fn test_diagnostics_reports_missing_api() {
        let server = PdfToolsServer::new();
        let report = server.process_diagnostics();
        assert!(!report.api_configured);
        assert!(report.api_url.is_none());
        assert_eq!(
            report.error.as_deref(),
            Some("API base URL is not configured")
        );

        let report = self::server().process_diagnostics();
        assert_eq!(report.api_url.as_deref(), Some("http://127.0.0.1:9/api/"));
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_tools_refuse_without_api() {
        let server = PdfToolsServer::new();
        let params = UploadDocumentParams {
            source: FileSource::Base64 {
                base64: "JVBERi0xLjQ=".to_string(),
                name: None,
            },
            session_id: None,
        };
        let err = server.process_upload(&params).await.unwrap_err();
        assert!(matches!(err, Error::ApiNotConfigured));
    }

    #[tokio::test]
    async fn test_upload_rejects_non_pdf() {
        let server = server();
        let params = UploadDocumentParams {
            source: FileSource::Base64 {
                base64: "SGVsbG8=".to_string(),
                name: Some("hello.txt".to_string()),
            },
            session_id: None,
        };
        let result = server.process_upload(&params).await.unwrap();
        assert!(result.document_id.is_none());
        assert_eq!(result.category, Some(ErrorCategory::Input));
        assert_eq!(result.status, ToolStatus::Failed(ErrorCategory::Input));
        assert!(result.session_id.is_some());
    }

    #[tokio::test]
    async fn test_run_tool_without_document() {
        let server = server();
        let session_id = new_session(&server);
        let result = server
            .process_run_tool(&RunToolParams {
                session_id: session_id.clone(),
                tool: "compress".to_string(),
                options: None,
                attachment: None,
            })
            .await
            .unwrap();
        assert!(result.outcome.is_none());
        assert_eq!(result.category, Some(ErrorCategory::Operation));
        assert_eq!(
            result.error.as_deref(),
            Some("No document uploaded; upload a file first")
        );
    }

    #[tokio::test]
    async fn test_run_tool_unknown_tool() {
        let server = server();
        let session_id = new_session(&server);
        let err = server
            .process_run_tool(&RunToolParams {
                session_id,
                tool: "shred".to_string(),
                options: None,
                attachment: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
    }

    #[tokio::test]
    async fn test_busy_session_is_rejected() {
        let server = server();
        let session_id = new_session(&server);
        let _held = server.sessions.acquire(&session_id).unwrap();

        let err = server
            .process_crop_editor(&CropEditorParams {
                session_id: session_id.clone(),
                reset: false,
                rect: None,
                events: vec![],
                bounds: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::SessionBusy { .. }));
    }

    #[test]
    fn test_crop_editor_drag_and_reset() {
        let server = server();
        let session_id = new_session(&server);
        let events: Vec<PointerEvent> = serde_json::from_str(
            r#"[
                {"type": "down", "handle": "se", "x": 90, "y": 90},
                {"type": "move", "x": 95, "y": 95},
                {"type": "up"}
            ]"#,
        )
        .unwrap();

        let result = server
            .process_crop_editor(&CropEditorParams {
                session_id: session_id.clone(),
                reset: false,
                rect: None,
                events,
                bounds: None,
            })
            .unwrap();
        assert_eq!(
            result.rect,
            Some(CropRect {
                x: 10.0,
                y: 10.0,
                width: 85.0,
                height: 85.0
            })
        );
        assert_eq!(result.drag, Some(DragState::Idle));
        assert_eq!(result.options.unwrap()["width"], 85.0);

        let result = server
            .process_crop_editor(&CropEditorParams {
                session_id,
                reset: true,
                rect: None,
                events: vec![],
                bounds: None,
            })
            .unwrap();
        assert_eq!(result.rect, Some(DEFAULT_RECT));
    }

    #[test]
    fn test_watermark_editor_preset_and_text() {
        let server = server();
        let session_id = new_session(&server);
        let result = server
            .process_watermark_editor(&WatermarkEditorParams {
                session_id,
                reset: false,
                text: Some("CONFIDENTIAL".to_string()),
                font_size: Some(500.0),
                opacity: None,
                rotation: Some(270.0),
                preset: Some(WatermarkPreset::BottomRight),
                events: vec![],
                bounds: None,
            })
            .unwrap();
        let options = result.options.unwrap();
        assert_eq!(options["text"], "CONFIDENTIAL");
        assert_eq!(options["font_size"], 144.0);
        assert_eq!(options["rotation"], -90.0);
        assert_eq!(options["position_x"], 85.0);
        assert_eq!(options["position_y"], 85.0);
    }

    #[test]
    fn test_reorder_requires_page_count() {
        let server = server();
        let session_id = new_session(&server);
        let err = server
            .process_reorder(&ReorderPagesParams {
                session_id,
                actions: vec![ReorderAction::Reverse],
            })
            .unwrap_err();
        assert!(matches!(err, Error::NoDocument));
    }

    #[test]
    fn test_reorder_with_unknown_page_count() {
        let server = server();
        let session_id = new_session(&server);
        server.sessions.acquire(&session_id).unwrap().tool.document =
            Some(serde_json::from_value(json!({"id": 5})).unwrap());

        let err = server
            .process_reorder(&ReorderPagesParams {
                session_id,
                actions: vec![ReorderAction::Reverse],
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref name, .. } if name == "page_order"));
        assert_eq!(err.category(), ErrorCategory::Input);
    }

    #[test]
    fn test_reorder_applies_actions_atomically() {
        let server = server();
        let session_id = new_session(&server);
        server.sessions.acquire(&session_id).unwrap().tool.page_count = Some(4);

        let result = server
            .process_reorder(&ReorderPagesParams {
                session_id: session_id.clone(),
                actions: vec![ReorderAction::Reverse],
            })
            .unwrap();
        assert_eq!(result.page_order, vec![4, 3, 2, 1]);
        let positions: Vec<u32> = result.items.iter().map(|i| i.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);

        // second action is out of range: nothing from this request is kept
        let err = server
            .process_reorder(&ReorderPagesParams {
                session_id: session_id.clone(),
                actions: vec![
                    ReorderAction::Reset,
                    ReorderAction::Move(MoveRequest { from: 0, to: 9 }),
                ],
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMove { .. }));

        let result = server
            .process_reorder(&ReorderPagesParams {
                session_id,
                actions: vec![],
            })
            .unwrap();
        assert_eq!(result.page_order, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_editor_options_for_organize() {
        let mut session = Session::default();
        assert!(PdfToolsServer::editor_options(&session, EditorBinding::PageOrder).is_err());

        session.page_order = Some(PageOrder::for_pages(3));
        session.page_order.as_mut().unwrap().move_item(2, 0).unwrap();
        let options = PdfToolsServer::editor_options(&session, EditorBinding::PageOrder).unwrap();
        assert_eq!(options["page_order"], json!([3, 1, 2]));

        let options = PdfToolsServer::editor_options(&session, EditorBinding::Crop).unwrap();
        assert_eq!(options["x"], 10.0);
    }

    #[test]
    fn test_render_preview_without_document() {
        let server = server();
        let session_id = new_session(&server);
        let err = server
            .process_render_preview(&RenderPreviewParams {
                session_id,
                page: 1,
                width: None,
                overlay: OverlayKind::Crop,
            })
            .unwrap_err();
        assert!(matches!(err, Error::NoDocument));
    }

    #[test]
    fn test_reset_and_close() {
        let server = server();
        let session_id = new_session(&server);
        let result = server
            .process_reset(&ResetSessionParams {
                session_id: session_id.clone(),
                close: true,
            })
            .unwrap();
        assert!(result.closed);
        assert!(matches!(
            server.process_reset(&ResetSessionParams {
                session_id,
                close: false,
            }),
            Err(Error::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_file_order() {
        let order = file_order(3, &[2, 0, 1]).unwrap();
        assert_eq!(order.source_order(), vec![2, 0, 1]);
        assert!(file_order(3, &[0, 0, 1]).is_err());
        assert!(file_order(3, &[0, 1]).is_err());
        assert!(file_order(2, &[0, 5]).is_err());
    }

    #[test]
    fn test_list_files_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("b.DOCX"), b"PK").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();

        let server = server();
        let result = server
            .process_list_files(&ListFilesParams {
                directory: dir.path().to_string_lossy().to_string(),
                recursive: false,
                pattern: None,
                extensions: None,
            })
            .unwrap();
        let names: Vec<&str> = result.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.DOCX"]);
        assert_eq!(result.files[0].mime_type, "application/pdf");

        let result = server
            .process_list_files(&ListFilesParams {
                directory: dir.path().to_string_lossy().to_string(),
                recursive: false,
                pattern: None,
                extensions: Some(vec![".pdf".to_string()]),
            })
            .unwrap();
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn test_path_sandbox() {
        let allowed = tempfile::tempdir().unwrap();
        let server = PdfToolsServer::with_config(ServerConfig {
            resource_dirs: vec![allowed.path().to_string_lossy().to_string()],
            ..ServerConfig::default()
        });
        assert!(matches!(
            server.validate_path_access("/etc/hosts"),
            Err(Error::PathAccessDenied { .. })
        ));
        let inside = allowed.path().join("out.pdf");
        assert!(server
            .validate_output_path_access(&inside.to_string_lossy())
            .is_ok());
    }
}
