//! End-to-end tool flows through the MCP server handlers against a mock API

use base64::Engine;
use mockito::{Matcher, Server};
use pdf_tools_mcp::config::{parse_api_url, ServerConfig};
use pdf_tools_mcp::editor::PointerEvent;
use pdf_tools_mcp::error::ErrorCategory;
use pdf_tools_mcp::server::{
    ConvertToPdfParams, CropEditorParams, DownloadResultParams, DownloadTarget,
    MergeDocumentsParams, ReorderAction, ReorderPagesParams, RunToolParams, UploadDocumentParams,
};
use pdf_tools_mcp::source::FileSource;
use pdf_tools_mcp::tool::ToolStatus;
use pdf_tools_mcp::PdfToolsServer;
use pretty_assertions::assert_eq;
use serde_json::json;

const PDF: &[u8] = b"%PDF-1.4\n%%EOF\n";

fn encode(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn pdf_source(name: &str) -> FileSource {
    FileSource::Base64 {
        base64: encode(PDF),
        name: Some(name.to_string()),
    }
}

fn tools_server(mock: &Server, resource_dir: Option<&std::path::Path>) -> PdfToolsServer {
    PdfToolsServer::with_config(ServerConfig {
        api_url: parse_api_url(&format!("{}/api", mock.url())),
        resource_dirs: resource_dir
            .map(|d| vec![d.to_string_lossy().to_string()])
            .unwrap_or_default(),
        ..ServerConfig::default()
    })
}

async fn upload(server: &PdfToolsServer, name: &str) -> String {
    let result = server
        .process_upload(&UploadDocumentParams {
            source: pdf_source(name),
            session_id: None,
        })
        .await
        .unwrap();
    assert!(result.error.is_none(), "upload failed: {:?}", result.error);
    result.session_id.unwrap()
}

#[tokio::test]
async fn test_crop_editor_feeds_crop_tool() {
    let mut mock = Server::new_async().await;
    mock.mock("POST", "/api/documents/")
        .with_body(r#"{"id": 21, "page_count": 2}"#)
        .create_async()
        .await;
    let crop = mock
        .mock("POST", "/api/documents/21/crop/")
        .match_body(Matcher::Json(
            json!({"x": 20.0, "y": 10.0, "width": 70.0, "height": 80.0}),
        ))
        .with_body(r#"{"download_url": "/media/cropped.pdf"}"#)
        .create_async()
        .await;
    mock.mock("GET", "/media/cropped.pdf")
        .with_body(PDF)
        .create_async()
        .await;

    let out_dir = tempfile::tempdir().unwrap();
    let server = tools_server(&mock, Some(out_dir.path()));
    let session_id = upload(&server, "scan.pdf").await;

    // drag the west edge in by 10% on a 500px wide rendering
    let events = vec![
        PointerEvent::Down {
            handle: Some(pdf_tools_mcp::editor::Handle::W),
            x: 50.0,
            y: 300.0,
        },
        PointerEvent::Move { x: 100.0, y: 300.0 },
        PointerEvent::Up,
    ];
    let edited = server
        .process_crop_editor(&CropEditorParams {
            session_id: session_id.clone(),
            reset: false,
            rect: None,
            events,
            bounds: Some(pdf_tools_mcp::editor::PageBounds {
                left: 0.0,
                top: 0.0,
                width: 500.0,
                height: 600.0,
            }),
        })
        .unwrap();
    assert_eq!(edited.rect.unwrap().x, 20.0);

    let result = server
        .process_run_tool(&RunToolParams {
            session_id: session_id.clone(),
            tool: "crop".to_string(),
            options: None,
            attachment: None,
        })
        .await
        .unwrap();
    assert_eq!(result.status, ToolStatus::Completed);
    crop.assert_async().await;

    let target = out_dir.path().join("cropped.pdf");
    let downloaded = server
        .process_download(&DownloadResultParams {
            session_id,
            target: DownloadTarget::Result,
            output_path: Some(target.to_string_lossy().to_string()),
        })
        .await
        .unwrap();
    assert_eq!(downloaded.size, PDF.len() as u64);
    assert!(downloaded.data_base64.is_none());
    assert_eq!(std::fs::read(&target).unwrap(), PDF);
}

#[tokio::test]
async fn test_reordered_pages_feed_organize() {
    let mut mock = Server::new_async().await;
    mock.mock("POST", "/api/documents/")
        .with_body(r#"{"id": 4, "page_count": 3}"#)
        .create_async()
        .await;
    let organize = mock
        .mock("POST", "/api/documents/4/organize/")
        .match_body(Matcher::Json(json!({"page_order": [2, 3, 1]})))
        .with_body(r#"{"download_url": "/media/organized.pdf"}"#)
        .create_async()
        .await;

    let server = tools_server(&mock, None);
    let session_id = upload(&server, "deck.pdf").await;

    let reordered = server
        .process_reorder(&ReorderPagesParams {
            session_id: session_id.clone(),
            actions: vec![ReorderAction::MoveId {
                id: "0-1".to_string(),
                to: 2,
            }],
        })
        .unwrap();
    assert_eq!(reordered.page_order, vec![2, 3, 1]);

    let result = server
        .process_run_tool(&RunToolParams {
            session_id,
            tool: "organize".to_string(),
            options: None,
            attachment: None,
        })
        .await
        .unwrap();
    assert!(result.error.is_none());
    organize.assert_async().await;
}

#[tokio::test]
async fn test_failed_run_reports_category_and_retries() {
    let mut mock = Server::new_async().await;
    mock.mock("POST", "/api/documents/")
        .with_body(r#"{"id": 9, "page_count": 1}"#)
        .expect(1)
        .create_async()
        .await;
    let failing = mock
        .mock("POST", "/api/documents/9/ocr/")
        .with_status(503)
        .create_async()
        .await;

    let server = tools_server(&mock, None);
    let session_id = upload(&server, "scan.pdf").await;
    let params = RunToolParams {
        session_id: session_id.clone(),
        tool: "ocr".to_string(),
        options: None,
        attachment: None,
    };

    let result = server.process_run_tool(&params).await.unwrap();
    assert_eq!(result.category, Some(ErrorCategory::Operation));
    assert_eq!(result.status, ToolStatus::Failed(ErrorCategory::Operation));
    assert_eq!(result.error.as_deref(), Some("Operation ocr failed (HTTP 503)"));

    failing.remove_async().await;
    mock.mock("POST", "/api/documents/9/ocr/")
        .with_body(r#"{"text": "hello"}"#)
        .create_async()
        .await;

    let result = server.process_run_tool(&params).await.unwrap();
    assert_eq!(result.status, ToolStatus::Completed);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_failed_upload_clears_previous_document() {
    let mut mock = Server::new_async().await;
    let first = mock
        .mock("POST", "/api/documents/")
        .with_body(r#"{"id": 1, "page_count": 1}"#)
        .create_async()
        .await;

    let server = tools_server(&mock, None);
    let session_id = upload(&server, "a.pdf").await;

    first.remove_async().await;
    mock.mock("POST", "/api/documents/")
        .with_status(413)
        .create_async()
        .await;

    let result = server
        .process_upload(&UploadDocumentParams {
            source: pdf_source("b.pdf"),
            session_id: Some(session_id.clone()),
        })
        .await
        .unwrap();
    assert_eq!(result.category, Some(ErrorCategory::Upload));
    assert!(result.document_id.is_none());
    assert!(result.page_count.is_none());

    let run = server
        .process_run_tool(&RunToolParams {
            session_id,
            tool: "compress".to_string(),
            options: None,
            attachment: None,
        })
        .await
        .unwrap();
    assert_eq!(
        run.error.as_deref(),
        Some("No document uploaded; upload a file first")
    );
}

#[tokio::test]
async fn test_merge_result_downloads_from_session() {
    let mut mock = Server::new_async().await;
    for (name, id) in [("a.pdf", 1), ("b.pdf", 2)] {
        mock.mock("POST", "/api/documents/")
            .match_body(Matcher::Regex(format!(r#"filename="{}""#, name)))
            .with_body(json!({ "id": id }).to_string())
            .create_async()
            .await;
    }
    mock.mock("POST", "/api/documents/merge/")
        .match_body(Matcher::Json(json!({"document_ids": [2, 1]})))
        .with_body(r#"{"merged_file": "/media/merged.pdf"}"#)
        .create_async()
        .await;
    mock.mock("GET", "/media/merged.pdf")
        .with_body(PDF)
        .create_async()
        .await;

    let server = tools_server(&mock, None);
    let merged = server
        .process_merge(&MergeDocumentsParams {
            sources: vec![pdf_source("a.pdf"), pdf_source("b.pdf")],
            order: Some(vec![1, 0]),
            session_id: None,
        })
        .await
        .unwrap();
    assert_eq!(merged.source_count, 2);

    let downloaded = server
        .process_download(&DownloadResultParams {
            session_id: merged.session_id.unwrap(),
            target: DownloadTarget::Result,
            output_path: None,
        })
        .await
        .unwrap();
    assert_eq!(downloaded.data_base64, Some(encode(PDF)));
}

#[tokio::test]
async fn test_conversion_output_outside_sandbox_is_denied() {
    let mut mock = Server::new_async().await;
    mock.mock("POST", "/api/html-to-pdf/")
        .with_body(r#"{"output_file": "/media/page.pdf"}"#)
        .create_async()
        .await;
    mock.mock("GET", "/media/page.pdf")
        .with_body(PDF)
        .create_async()
        .await;

    let sandbox = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let server = tools_server(&mock, Some(sandbox.path()));

    let converted = server
        .process_convert(&ConvertToPdfParams {
            conversion: "html-to-pdf".to_string(),
            sources: vec![FileSource::Base64 {
                base64: encode(b"<h1>hi</h1>"),
                name: Some("page.html".to_string()),
            }],
            options: None,
            session_id: None,
        })
        .await
        .unwrap();
    let session_id = converted.session_id.unwrap();

    let err = server
        .process_download(&DownloadResultParams {
            session_id,
            target: DownloadTarget::Result,
            output_path: Some(
                elsewhere
                    .path()
                    .join("page.pdf")
                    .to_string_lossy()
                    .to_string(),
            ),
        })
        .await
        .unwrap_err();
    assert_eq!(err.client_message(), "Access denied");
}
