//! Upload, process and download lifecycle of a single tool

use super::catalog::{BodyFormat, ConversionSpec, ToolSpec};
use crate::api::{
    ApiClient, Comparison, DocumentId, Operation, OperationOutcome, RequestBody, UploadedDocument,
};
use crate::editor::{CropRect, PageOrder, DEFAULT_RECT};
use crate::error::{Error, ErrorCategory, Result};
use crate::source::LocalFile;
use serde::Serialize;
use serde_json::{Map, Value};

/// Where a tool is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "category", rename_all = "snake_case")]
pub enum ToolStatus {
    #[default]
    Idle,
    Uploading,
    Uploaded,
    Processing,
    Completed,
    Failed(ErrorCategory),
}

impl ToolStatus {
    /// True while a request is outstanding
    pub fn is_busy(self) -> bool {
        matches!(self, ToolStatus::Uploading | ToolStatus::Processing)
    }
}

/// Per-session tool state
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolState {
    pub document: Option<UploadedDocument>,
    pub file_name: Option<String>,
    pub page_count: Option<u32>,
    pub status: ToolStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OperationOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl ToolState {
    pub fn document_id(&self) -> Option<&DocumentId> {
        self.document.as_ref().map(|d| &d.id)
    }

    /// Mark the last step as failed; the document and any earlier outcome stay
    pub fn record_failure(&mut self, e: &Error) {
        self.status = ToolStatus::Failed(e.category());
        self.last_error = Some(e.client_message());
    }

    /// Store the result of a flow that ran outside [`ToolRunner::process`]
    /// (merge, conversion) so it can be downloaded like any tool result
    pub fn record_outcome(&mut self, tool: &str, outcome: OperationOutcome) {
        self.last_tool = Some(tool.to_string());
        self.outcome = Some(outcome);
        self.last_error = None;
        self.status = ToolStatus::Completed;
    }
}

/// Drives one session's [`ToolState`] through the API
pub struct ToolRunner<'a> {
    client: &'a ApiClient,
    state: &'a mut ToolState,
}

impl<'a> ToolRunner<'a> {
    pub fn new(client: &'a ApiClient, state: &'a mut ToolState) -> Self {
        Self { client, state }
    }

    pub fn state(&self) -> &ToolState {
        self.state
    }

    /// Upload a file, replacing any previous document.
    ///
    /// On failure the document stays empty so later steps are refused.
    pub async fn upload(&mut self, file: &LocalFile) -> Result<UploadedDocument> {
        self.state.document = None;
        self.state.page_count = None;
        self.state.outcome = None;
        self.state.last_error = None;
        self.state.file_name = Some(file.name.clone());
        self.state.status = ToolStatus::Uploading;

        let document = match self.client.upload(file).await {
            Ok(document) => document,
            Err(e) => return Err(self.fail("upload", e)),
        };

        let page_count = match document.page_count {
            Some(count) => Some(count),
            None => match self.client.page_count(&document.id).await {
                Ok(count) => Some(count),
                Err(e) => {
                    // The document is usable without it; page selections just go unchecked
                    tracing::warn!(error = %e, id = %document.id, "page_count lookup failed");
                    None
                }
            },
        };

        tracing::info!(id = %document.id, name = %file.name, ?page_count, "document uploaded");
        self.state.page_count = page_count;
        self.state.document = Some(document.clone());
        self.state.status = ToolStatus::Uploaded;
        Ok(document)
    }

    /// Run a tool on the uploaded document.
    ///
    /// The document id survives a failure, so calling again retries without a new upload.
    pub async fn process(
        &mut self,
        spec: &ToolSpec,
        options: &Map<String, Value>,
        attachments: Vec<LocalFile>,
    ) -> Result<OperationOutcome> {
        let name = spec.name();
        let id = match self.state.document_id().cloned() {
            Some(id) => id,
            None => return Err(self.fail(name, Error::NoDocument)),
        };

        let body = match build_body(spec, options, self.state.page_count, attachments) {
            Ok(body) => body,
            Err(e) => return Err(self.fail(name, e)),
        };

        self.state.status = ToolStatus::Processing;
        self.state.last_tool = Some(name.to_string());
        self.state.outcome = None;
        self.state.last_error = None;

        let result = match (spec.operation, body) {
            (Operation::FindReplace, RequestBody::Json(fields)) => {
                let find = fields.get("find_text").and_then(Value::as_str).unwrap_or("");
                let replace = fields
                    .get("replace_text")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                self.client.find_replace(&id, find, replace).await
            }
            (operation, body) => self.client.run_operation(&id, operation, body).await,
        };

        match result {
            Ok(outcome) => {
                tracing::info!(%id, tool = name, file = outcome.file().is_some(), "tool completed");
                self.state.outcome = Some(outcome.clone());
                self.state.status = ToolStatus::Completed;
                Ok(outcome)
            }
            Err(e) => Err(self.fail(name, e)),
        }
    }

    /// Fetch the file produced by the last successful tool
    pub async fn download(&mut self) -> Result<Vec<u8>> {
        let reference = match self.state.outcome.as_ref().map(|o| o.file().cloned()) {
            Some(Some(reference)) => reference,
            Some(None) => {
                let e = Error::UnexpectedResponse {
                    reason: "last operation returned data, not a file".to_string(),
                };
                return Err(self.fail("download", e));
            }
            None => return Err(self.fail("download", Error::NoDocument)),
        };

        match self.client.download(&reference).await {
            Ok(data) => {
                self.state.last_error = None;
                Ok(data)
            }
            Err(e) => Err(self.fail("download", e)),
        }
    }

    /// Fetch the document as stored by the API (processed or original upload)
    pub async fn download_document(&mut self, original: bool) -> Result<Vec<u8>> {
        let id = match self.state.document_id().cloned() {
            Some(id) => id,
            None => return Err(self.fail("download", Error::NoDocument)),
        };
        match self.client.download_document(&id, original).await {
            Ok(data) => Ok(data),
            Err(e) => Err(self.fail("download", e)),
        }
    }

    fn fail(&mut self, step: &str, e: Error) -> Error {
        tracing::warn!(error = %e, step, "tool step failed");
        self.state.record_failure(&e);
        e
    }
}

fn build_body(
    spec: &ToolSpec,
    options: &Map<String, Value>,
    page_count: Option<u32>,
    attachments: Vec<LocalFile>,
) -> Result<RequestBody> {
    let mut fields = spec.options.normalize(options, page_count)?;
    if spec.operation == Operation::Crop {
        fit_crop_rect(&mut fields);
    }
    match spec.body {
        BodyFormat::Json => Ok(RequestBody::Json(fields)),
        BodyFormat::Multipart { file_field } => {
            if attachments.is_empty() {
                return Err(Error::InvalidOption {
                    name: file_field.to_string(),
                    reason: "attachment is required".to_string(),
                });
            }
            let files = attachments
                .into_iter()
                .map(|f| (file_field.to_string(), f))
                .collect();
            Ok(RequestBody::Multipart { files, fields })
        }
    }
}

/// Hold explicit crop options to the same rectangle rules as the crop editor
fn fit_crop_rect(fields: &mut Map<String, Value>) {
    let read = |key: &str, fallback: f64| {
        fields
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(fallback)
    };
    let rect = CropRect {
        x: read("x", DEFAULT_RECT.x),
        y: read("y", DEFAULT_RECT.y),
        width: read("width", DEFAULT_RECT.width),
        height: read("height", DEFAULT_RECT.height),
    }
    .clamped();
    fields.extend(rect.to_options());
}

/// Documents uploaded for a multi-file flow
#[derive(Debug, Clone, Serialize)]
pub struct UploadedBatch {
    pub documents: Vec<UploadedDocument>,
}

impl UploadedBatch {
    pub fn ids(&self) -> Vec<DocumentId> {
        self.documents.iter().map(|d| d.id.clone()).collect()
    }
}

/// Upload files one after another, stopping at the first failure
pub async fn upload_all(client: &ApiClient, files: &[LocalFile]) -> Result<UploadedBatch> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let document = client.upload(file).await?;
        tracing::debug!(id = %document.id, name = %file.name, "batch upload");
        documents.push(document);
    }
    Ok(UploadedBatch { documents })
}

/// Upload and merge files in the order given by `order` (upload order when `None`)
pub async fn merge_files(
    client: &ApiClient,
    files: &[LocalFile],
    order: Option<&PageOrder>,
) -> Result<OperationOutcome> {
    if files.len() < 2 {
        return Err(Error::InvalidOption {
            name: "files".to_string(),
            reason: "at least two files are required".to_string(),
        });
    }
    for file in files {
        file.ensure_pdf()?;
    }

    let batch = upload_all(client, files).await?;
    let ids = match order {
        Some(order) => order.document_ids(&batch.ids()),
        None => batch.ids(),
    };
    tracing::info!(count = ids.len(), "merging documents");
    client.merge(&ids).await
}

/// Upload two PDFs and compare them
pub async fn compare_files(
    client: &ApiClient,
    first: &LocalFile,
    second: &LocalFile,
) -> Result<Comparison> {
    first.ensure_pdf()?;
    second.ensure_pdf()?;
    let a = client.upload(first).await?;
    let b = client.upload(second).await?;
    client.compare(&a.id, &b.id).await
}

/// Run a standalone conversion
pub async fn convert_files(
    client: &ApiClient,
    spec: &ConversionSpec,
    files: &[LocalFile],
    options: &Map<String, Value>,
) -> Result<OperationOutcome> {
    let conversion = spec.conversion;
    if files.is_empty() {
        return Err(Error::InvalidOption {
            name: "files".to_string(),
            reason: "at least one file is required".to_string(),
        });
    }
    if files.len() > 1 && !conversion.accepts_many() {
        return Err(Error::InvalidOption {
            name: "files".to_string(),
            reason: format!("{} takes a single file", conversion),
        });
    }
    for file in files {
        file.ensure_extension(conversion.extensions())?;
    }

    let fields = spec.options.normalize(options, None)?;
    tracing::info!(%conversion, files = files.len(), "converting");
    client.convert(conversion, files, &fields).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::catalog::find_tool;
    use serde_json::json;

    #[test]
    fn test_status_serialization() {
        assert_eq!(
            serde_json::to_value(ToolStatus::Idle).unwrap(),
            json!({"state": "idle"})
        );
        assert_eq!(
            serde_json::to_value(ToolStatus::Failed(ErrorCategory::Upload)).unwrap(),
            json!({"state": "failed", "category": "upload"})
        );
    }

    #[test]
    fn test_busy_statuses() {
        assert!(ToolStatus::Uploading.is_busy());
        assert!(ToolStatus::Processing.is_busy());
        assert!(!ToolStatus::Failed(ErrorCategory::Operation).is_busy());
    }

    #[test]
    fn test_sign_requires_attachment() {
        let sign = find_tool("sign").unwrap();
        let err = build_body(sign, &Map::new(), None, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref name, .. } if name == "signature"));

        let image = LocalFile::new("sig.png", vec![0x89, b'P', b'N', b'G']);
        match build_body(sign, &Map::new(), None, vec![image]).unwrap() {
            RequestBody::Multipart { files, fields } => {
                assert_eq!(files[0].0, "signature");
                assert_eq!(fields["page"], 1);
            }
            other => panic!("expected multipart, got {:?}", other),
        }
    }

    #[test]
    fn test_explicit_crop_options_fit_the_page() {
        let crop = find_tool("crop").unwrap();
        let options = json!({"x": 95, "y": 95, "width": 50, "height": 2, "pages": "1-2"});
        let options = options.as_object().unwrap();
        match build_body(crop, options, Some(3), Vec::new()).unwrap() {
            RequestBody::Json(fields) => {
                assert_eq!(fields["x"], json!(90.0));
                assert_eq!(fields["y"], json!(90.0));
                assert_eq!(fields["width"], json!(10.0));
                assert_eq!(fields["height"], json!(10.0));
                assert_eq!(fields["pages"], json!([1, 2]));
            }
            other => panic!("expected json, got {:?}", other),
        }

        let options = json!({"x": 20, "y": 10, "width": 70, "height": 80});
        match build_body(crop, options.as_object().unwrap(), None, Vec::new()).unwrap() {
            RequestBody::Json(fields) => assert_eq!(
                Value::Object(fields),
                json!({"x": 20.0, "y": 10.0, "width": 70.0, "height": 80.0})
            ),
            other => panic!("expected json, got {:?}", other),
        }
    }

    #[test]
    fn test_body_checks_pages_against_count() {
        let extract = find_tool("extract-pages").unwrap();
        let mut options = Map::new();
        options.insert("pages".to_string(), json!("2-9"));
        assert!(build_body(extract, &options, Some(4), Vec::new()).is_err());
        match build_body(extract, &options, None, Vec::new()).unwrap() {
            RequestBody::Json(fields) => assert_eq!(fields["pages"], json!([2, 3, 4, 5, 6, 7, 8, 9])),
            other => panic!("expected json, got {:?}", other),
        }
    }
}
