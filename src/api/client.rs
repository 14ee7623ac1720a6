//! HTTP client for the remote PDF API

use super::endpoints::{ApiEndpoints, Conversion, Operation};
use super::types::{
    form_value, Comparison, DocumentId, OperationOutcome, PageCountResponse, RequestBody,
    ResultReference, UploadedDocument,
};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::source::LocalFile;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde_json::{json, Map, Value};
use std::time::Duration;
use url::Url;

/// Longest slice of an error body kept for logs
const ERROR_BODY_LIMIT: usize = 512;

/// Client for the remote PDF API
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: ApiEndpoints,
    max_download_bytes: u64,
}

impl ApiClient {
    /// Create a client for the given API base URL
    pub fn new(base_url: Url, timeout_secs: u64, max_download_bytes: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("pdf-tools-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::HttpRequest)?;

        Ok(Self {
            client,
            endpoints: ApiEndpoints::new(base_url),
            max_download_bytes,
        })
    }

    /// Create a client from server configuration; fails when no API URL is set
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        match (&config.api_url, &config.invalid_api_url) {
            (Some(url), _) => Self::new(
                url.clone(),
                config.request_timeout_secs,
                config.max_download_bytes,
            ),
            (None, Some(raw)) => Err(Error::InvalidApiUrl { url: raw.clone() }),
            (None, None) => Err(Error::ApiNotConfigured),
        }
    }

    pub fn base_url(&self) -> &Url {
        self.endpoints.base()
    }

    /// Upload a file; the returned id addresses every later call
    pub async fn upload(&self, file: &LocalFile) -> Result<UploadedDocument> {
        let url = self.endpoints.upload()?;
        tracing::debug!(%url, name = %file.name, size = file.data.len(), "uploading document");

        let form = Form::new().part("file", file_part(file)?);
        let response = self.client.post(url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::UploadFailed {
                status: status.as_u16(),
                message: error_body(response).await,
            });
        }

        let body: Value = response.json().await?;
        serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
            reason: format!("upload response: {}", e),
        })
    }

    pub async fn page_count(&self, id: &DocumentId) -> Result<u32> {
        let url = self.endpoints.page_count(id)?;
        let response = self.client.get(url).send().await?;
        let body = read_json(response, "page_count").await?;
        let parsed: PageCountResponse =
            serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
                reason: format!("page_count response: {}", e),
            })?;
        Ok(parsed.page_count)
    }

    pub async fn find_replace(
        &self,
        id: &DocumentId,
        find_text: &str,
        replace_text: &str,
    ) -> Result<OperationOutcome> {
        let mut body = Map::new();
        body.insert("find_text".to_string(), Value::from(find_text));
        body.insert("replace_text".to_string(), Value::from(replace_text));
        self.run_operation(id, Operation::FindReplace, RequestBody::Json(body))
            .await
    }

    /// Invoke one per-document operation endpoint
    pub async fn run_operation(
        &self,
        id: &DocumentId,
        operation: Operation,
        body: RequestBody,
    ) -> Result<OperationOutcome> {
        let url = self.endpoints.operation(id, operation)?;
        tracing::debug!(%url, %operation, "running operation");

        let request = match body {
            RequestBody::Json(map) => self.client.post(url).json(&map),
            RequestBody::Multipart { files, fields } => {
                self.client.post(url).multipart(build_form(&files, &fields)?)
            }
        };

        let response = request.send().await?;
        let body = read_json(response, operation.path()).await?;
        OperationOutcome::from_response(body, self.base_url())
    }

    /// Merge already-uploaded documents in the given order
    pub async fn merge(&self, ids: &[DocumentId]) -> Result<OperationOutcome> {
        let url = self.endpoints.merge()?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "document_ids": ids }))
            .send()
            .await?;
        let body = read_json(response, "merge").await?;
        OperationOutcome::from_response(body, self.base_url())
    }

    pub async fn compare(&self, first: &DocumentId, second: &DocumentId) -> Result<Comparison> {
        let url = self.endpoints.compare()?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "doc1_id": first, "doc2_id": second }))
            .send()
            .await?;
        let body = read_json(response, "compare").await?;
        serde_json::from_value(body).map_err(|e| Error::UnexpectedResponse {
            reason: format!("compare response: {}", e),
        })
    }

    /// Run a standalone conversion on local files
    pub async fn convert(
        &self,
        conversion: Conversion,
        files: &[LocalFile],
        fields: &Map<String, Value>,
    ) -> Result<OperationOutcome> {
        let url = self.endpoints.conversion(conversion)?;
        tracing::debug!(%url, %conversion, files = files.len(), "running conversion");

        let named: Vec<(String, LocalFile)> = files
            .iter()
            .map(|f| (conversion.file_field().to_string(), f.clone()))
            .collect();
        let form = build_form(&named, fields)?;

        let response = self.client.post(url).multipart(form).send().await?;
        let body = read_json(response, conversion.name()).await?;
        OperationOutcome::from_response(body, self.base_url())
    }

    /// Fetch the file behind an operation result
    pub async fn download(&self, reference: &ResultReference) -> Result<Vec<u8>> {
        let url = Url::parse(&reference.url).map_err(|e| Error::UnexpectedResponse {
            reason: format!("bad result URL: {}", e),
        })?;
        self.fetch_bytes(url).await
    }

    /// Fetch the processed (or original) file stored for a document
    pub async fn download_document(&self, id: &DocumentId, original: bool) -> Result<Vec<u8>> {
        let url = self.endpoints.download(id, original)?;
        self.fetch_bytes(url).await
    }

    async fn fetch_bytes(&self, url: Url) -> Result<Vec<u8>> {
        tracing::debug!(%url, "downloading result");
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed {
                status: status.as_u16(),
            });
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: content_length,
                    max_size: self.max_download_bytes,
                });
            }
        }

        // Count while streaming; Content-Length may be absent or wrong
        let mut data = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Error::HttpRequest)?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_download_bytes {
                return Err(Error::DownloadTooLarge {
                    size: data.len() as u64,
                    max_size: self.max_download_bytes,
                });
            }
        }

        Ok(data)
    }
}

/// Check status and decode a JSON body; non-2xx becomes `OperationFailed`
async fn read_json(response: Response, operation: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::OperationFailed {
            operation: operation.to_string(),
            status: status.as_u16(),
            message: error_body(response).await,
        });
    }

    let text = response.text().await?;
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| Error::UnexpectedResponse {
        reason: format!("{} response is not JSON: {}", operation, e),
    })
}

async fn error_body(response: Response) -> String {
    let mut text = response.text().await.unwrap_or_default();
    if text.len() > ERROR_BODY_LIMIT {
        let mut cut = ERROR_BODY_LIMIT;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
    }
    text
}

fn file_part(file: &LocalFile) -> Result<Part> {
    Part::bytes(file.data.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime)
        .map_err(Error::HttpRequest)
}

fn build_form(files: &[(String, LocalFile)], fields: &Map<String, Value>) -> Result<Form> {
    let mut form = Form::new();
    for (field, file) in files {
        form = form.part(field.clone(), file_part(file)?);
    }
    for (name, value) in fields {
        form = form.text(name.clone(), form_value(value));
    }
    Ok(form)
}
