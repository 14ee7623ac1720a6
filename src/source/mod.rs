//! Local input files: where an upload's bytes come from

pub mod resolver;

pub use resolver::{guess_mime, resolve_base64, resolve_path, resolve_url, LocalFile};

use rmcp::schemars::JsonSchema;
use serde::Serialize;

/// Where an input file comes from
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum FileSource {
    /// File path (absolute or relative)
    Path {
        /// Path to the file
        path: String,
    },
    /// Base64 encoded file content
    Base64 {
        /// Base64 encoded bytes
        base64: String,
        /// File name sent to the API (its extension selects the MIME type)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// URL to download the file from
    Url {
        /// URL of the file
        url: String,
    },
}

impl FileSource {
    /// Name used in results; never exposes inline content
    pub fn display_name(&self) -> String {
        match self {
            FileSource::Path { path } => path.clone(),
            FileSource::Base64 { name, .. } => name
                .clone()
                .map(|n| format!("<base64:{}>", n))
                .unwrap_or_else(|| "<base64>".to_string()),
            FileSource::Url { url } => url.clone(),
        }
    }
}

impl<'de> serde::Deserialize<'de> for FileSource {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;

        let obj = match value.as_object() {
            Some(obj) => obj,
            None => {
                return Err(serde::de::Error::custom(format!(
                    "Invalid source: expected an object with one of \"path\", \"base64\" or \"url\", but got {}",
                    match &value {
                        serde_json::Value::Array(_) => "an array",
                        serde_json::Value::String(_) => "a string",
                        serde_json::Value::Number(_) => "a number",
                        serde_json::Value::Bool(_) => "a boolean",
                        serde_json::Value::Null => "null",
                        _ => "unknown type",
                    }
                )))
            }
        };

        let string_field = |key: &str| -> std::result::Result<Option<String>, D::Error> {
            match obj.get(key) {
                None => Ok(None),
                Some(serde_json::Value::String(s)) => Ok(Some(s.clone())),
                Some(_) => Err(serde::de::Error::custom(format!(
                    "\"{}\" must be a string",
                    key
                ))),
            }
        };

        if let Some(path) = string_field("path")? {
            return Ok(FileSource::Path { path });
        }
        if let Some(base64) = string_field("base64")? {
            return Ok(FileSource::Base64 {
                base64,
                name: string_field("name")?,
            });
        }
        if let Some(url) = string_field("url")? {
            return Ok(FileSource::Url { url });
        }

        let keys: Vec<&String> = obj.keys().collect();
        Err(serde::de::Error::custom(format!(
            "Invalid source: expected an object with one of \"path\", \"base64\" or \"url\", but got keys: {:?}",
            keys
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_source_deserialization() {
        let source: FileSource = serde_json::from_str(r#"{"path": "/tmp/a.pdf"}"#).unwrap();
        assert!(matches!(source, FileSource::Path { .. }));

        let source: FileSource =
            serde_json::from_str(r#"{"base64": "JVBERi0xLjQ=", "name": "a.pdf"}"#).unwrap();
        match source {
            FileSource::Base64 { name, .. } => assert_eq!(name.as_deref(), Some("a.pdf")),
            other => panic!("unexpected source {:?}", other),
        }

        let source: FileSource =
            serde_json::from_str(r#"{"url": "https://example.com/a.pdf"}"#).unwrap();
        assert!(matches!(source, FileSource::Url { .. }));
    }

    #[test]
    fn test_file_source_errors() {
        let err = serde_json::from_str::<FileSource>(r#""/tmp/a.pdf""#).unwrap_err();
        assert!(err.to_string().contains("a string"));

        let err = serde_json::from_str::<FileSource>(r#"{"path": 5}"#).unwrap_err();
        assert!(err.to_string().contains("\"path\" must be a string"));

        let err = serde_json::from_str::<FileSource>(r#"{"cache_key": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("cache_key"));
    }

    #[test]
    fn test_display_name_hides_content() {
        let source = FileSource::Base64 {
            base64: "JVBERi0xLjQ=".to_string(),
            name: None,
        };
        assert_eq!(source.display_name(), "<base64>");
    }
}
