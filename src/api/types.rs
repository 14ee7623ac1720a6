//! Wire types of the remote PDF API

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::fmt;
use url::Url;

/// Opaque server-issued document identifier.
///
/// The API returns integer ids, but the id is never interpreted: it is sent
/// back exactly as it arrived, a JSON number as a number and a string as the
/// same string (`"007"` stays `"007"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    raw: String,
    numeric: bool,
}

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the API issued this id as a JSON number
    pub fn is_numeric(&self) -> bool {
        self.numeric
    }

    fn number(&self) -> Option<Number> {
        if !self.numeric {
            return None;
        }
        if let Ok(n) = self.raw.parse::<u64>() {
            return Some(n.into());
        }
        if let Ok(n) = self.raw.parse::<i64>() {
            return Some(n.into());
        }
        self.raw.parse::<f64>().ok().and_then(Number::from_f64)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        s.to_string().into()
    }
}

impl From<String> for DocumentId {
    fn from(raw: String) -> Self {
        DocumentId {
            raw,
            numeric: false,
        }
    }
}

impl From<u64> for DocumentId {
    fn from(n: u64) -> Self {
        DocumentId {
            raw: n.to_string(),
            numeric: true,
        }
    }
}

impl Serialize for DocumentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.number() {
            Some(n) => n.serialize(serializer),
            None => serializer.serialize_str(&self.raw),
        }
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::String(s) if !s.is_empty() => Ok(s.into()),
            Value::Number(n) => Ok(DocumentId {
                raw: n.to_string(),
                numeric: true,
            }),
            other => Err(serde::de::Error::custom(format!(
                "document id must be a number or non-empty string, got {}",
                other
            ))),
        }
    }
}

/// Response of the upload endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub id: DocumentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageCountResponse {
    pub page_count: u32,
}

/// Downloadable file produced by an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultReference {
    pub url: String,
}

/// Keys under which the API reports a produced file, in lookup order
const FILE_KEYS: &[&str] = &[
    "download_url",
    "edited_file",
    "merged_file",
    "output_file",
    "file_url",
];

/// What an operation endpoint handed back
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// A file to download
    File(ResultReference),
    /// Data returned in the response itself (extracted text, differences, ...)
    Inline(Value),
}

impl OperationOutcome {
    /// Classify an operation response body. Relative file references are
    /// resolved against the API base URL.
    pub fn from_response(body: Value, base: &Url) -> Result<Self> {
        if let Value::Object(ref map) = body {
            for key in FILE_KEYS {
                if let Some(Value::String(reference)) = map.get(*key) {
                    if reference.is_empty() {
                        continue;
                    }
                    let url = base.join(reference).map_err(|e| Error::UnexpectedResponse {
                        reason: format!("bad file reference in {}: {}", key, e),
                    })?;
                    return Ok(OperationOutcome::File(ResultReference {
                        url: url.to_string(),
                    }));
                }
            }
        }
        Ok(OperationOutcome::Inline(body))
    }

    pub fn file(&self) -> Option<&ResultReference> {
        match self {
            OperationOutcome::File(reference) => Some(reference),
            OperationOutcome::Inline(_) => None,
        }
    }
}

/// Response of the compare endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default)]
    pub differences: Vec<Value>,
}

/// Body of an operation request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(Map<String, Value>),
    /// Multipart form: named file parts plus plain fields
    Multipart {
        files: Vec<(String, crate::source::LocalFile)>,
        fields: Map<String, Value>,
    },
}

impl RequestBody {
    pub fn empty() -> Self {
        RequestBody::Json(Map::new())
    }
}

/// Render a JSON option as a multipart text field
pub(crate) fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://pdf.example.com/api/").unwrap()
    }

    #[test]
    fn test_document_id_from_number_or_string() {
        let doc: UploadedDocument =
            serde_json::from_value(json!({"id": 42, "page_count": 3})).unwrap();
        assert_eq!(doc.id.as_str(), "42");
        assert_eq!(doc.page_count, Some(3));
        assert!(doc.title.is_none());

        let doc: UploadedDocument =
            serde_json::from_value(json!({"id": "a1b2", "title": "report"})).unwrap();
        assert_eq!(doc.id.as_str(), "a1b2");
    }

    #[test]
    fn test_document_id_rejects_missing_or_empty() {
        assert!(serde_json::from_value::<UploadedDocument>(json!({"title": "x"})).is_err());
        assert!(serde_json::from_value::<UploadedDocument>(json!({"id": ""})).is_err());
        assert!(serde_json::from_value::<UploadedDocument>(json!({"id": null})).is_err());
    }

    #[test]
    fn test_document_id_sent_back_as_received() {
        let received = json!([7, "007", "123", "abc", -4]);
        let ids: Vec<DocumentId> = serde_json::from_value(received.clone()).unwrap();
        assert_eq!(serde_json::to_value(&ids).unwrap(), received);

        assert!(ids[0].is_numeric());
        assert_eq!(ids[1].as_str(), "007");
        assert!(!ids[2].is_numeric());
        assert_ne!(ids[0], DocumentId::from("7"));
        assert_eq!(ids[0], DocumentId::from(7u64));
        assert_eq!(
            serde_json::to_value([DocumentId::from(12u64), DocumentId::from("12")]).unwrap(),
            json!([12, "12"])
        );
    }

    #[test]
    fn test_outcome_relative_reference() {
        let outcome =
            OperationOutcome::from_response(json!({"download_url": "/media/out.pdf"}), &base())
                .unwrap();
        assert_eq!(
            outcome.file().unwrap().url,
            "https://pdf.example.com/media/out.pdf"
        );
    }

    #[test]
    fn test_outcome_key_variants() {
        let outcome = OperationOutcome::from_response(
            json!({"merged_file": "https://cdn.example.com/m.pdf"}),
            &base(),
        )
        .unwrap();
        assert_eq!(outcome.file().unwrap().url, "https://cdn.example.com/m.pdf");

        let outcome =
            OperationOutcome::from_response(json!({"edited_file": "media/e.pdf"}), &base())
                .unwrap();
        assert_eq!(
            outcome.file().unwrap().url,
            "https://pdf.example.com/api/media/e.pdf"
        );
    }

    #[test]
    fn test_outcome_inline() {
        let body = json!({"text": "hello", "pages": 2});
        let outcome = OperationOutcome::from_response(body.clone(), &base()).unwrap();
        assert_eq!(outcome, OperationOutcome::Inline(body));
    }

    #[test]
    fn test_form_value() {
        assert_eq!(form_value(&json!("eng")), "eng");
        assert_eq!(form_value(&json!(90)), "90");
        assert_eq!(form_value(&json!([1, 2])), "[1,2]");
        assert_eq!(form_value(&Value::Null), "");
    }
}
