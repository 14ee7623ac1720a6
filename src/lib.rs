//! PDF Tools MCP Server Library
//!
//! An MCP front end for a remote PDF processing API:
//! - `upload_document` / `run_tool` / `download_result`: the per-document lifecycle
//! - `merge_documents`, `compare_documents`, `convert_to_pdf`: multi-file flows
//! - `crop_editor`, `watermark_editor`, `reorder_pages`: interactive option editors
//! - `render_preview`: local page previews with editor overlays

pub mod api;
pub mod config;
pub mod editor;
pub mod error;
pub mod render;
pub mod server;
pub mod session;
pub mod source;
pub mod tool;

pub use api::{ApiClient, Conversion, DocumentId, Operation, OperationOutcome};
pub use config::ServerConfig;
pub use error::{Error, ErrorCategory, Result};
pub use server::{run_server, run_server_with_config, PdfToolsServer};
pub use session::{Session, SessionStore};
pub use source::{FileSource, LocalFile};
pub use tool::{ToolRunner, ToolState, ToolStatus};
