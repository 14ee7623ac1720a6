//! Routes of the remote PDF API

use super::types::DocumentId;
use crate::error::{Error, Result};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Per-document operation endpoints (`documents/{id}/<path>/`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Operation {
    #[serde(rename = "rotate")]
    Rotate,
    #[serde(rename = "crop")]
    Crop,
    #[serde(rename = "organize")]
    Organize,
    #[serde(rename = "extract-pages")]
    ExtractPages,
    #[serde(rename = "add_watermark")]
    AddWatermark,
    #[serde(rename = "compress")]
    Compress,
    #[serde(rename = "protect")]
    Protect,
    #[serde(rename = "unlock")]
    Unlock,
    #[serde(rename = "add-page-numbers")]
    AddPageNumbers,
    #[serde(rename = "sign")]
    Sign,
    #[serde(rename = "ocr")]
    Ocr,
    #[serde(rename = "pdf-to-images")]
    PdfToImages,
    #[serde(rename = "pdf-to-excel")]
    PdfToExcel,
    #[serde(rename = "pdf_to_word")]
    PdfToWord,
    #[serde(rename = "pdf-to-powerpoint")]
    PdfToPowerpoint,
    #[serde(rename = "edit")]
    Edit,
    #[serde(rename = "find_replace")]
    FindReplace,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::Rotate,
        Operation::Crop,
        Operation::Organize,
        Operation::ExtractPages,
        Operation::AddWatermark,
        Operation::Compress,
        Operation::Protect,
        Operation::Unlock,
        Operation::AddPageNumbers,
        Operation::Sign,
        Operation::Ocr,
        Operation::PdfToImages,
        Operation::PdfToExcel,
        Operation::PdfToWord,
        Operation::PdfToPowerpoint,
        Operation::Edit,
        Operation::FindReplace,
    ];

    /// Path segment of the endpoint. Spelling follows the API, which mixes
    /// hyphens and underscores.
    pub fn path(self) -> &'static str {
        match self {
            Operation::Rotate => "rotate",
            Operation::Crop => "crop",
            Operation::Organize => "organize",
            Operation::ExtractPages => "extract-pages",
            Operation::AddWatermark => "add_watermark",
            Operation::Compress => "compress",
            Operation::Protect => "protect",
            Operation::Unlock => "unlock",
            Operation::AddPageNumbers => "add-page-numbers",
            Operation::Sign => "sign",
            Operation::Ocr => "ocr",
            Operation::PdfToImages => "pdf-to-images",
            Operation::PdfToExcel => "pdf-to-excel",
            Operation::PdfToWord => "pdf_to_word",
            Operation::PdfToPowerpoint => "pdf-to-powerpoint",
            Operation::Edit => "edit",
            Operation::FindReplace => "find_replace",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Operation {
    type Err = Error;

    /// Accepts the endpoint spelling with either separator
    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('_', "-").to_ascii_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.path().replace('_', "-") == wanted)
            .ok_or_else(|| Error::UnknownTool {
                name: s.to_string(),
            })
    }
}

/// Standalone conversion endpoints that take files directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Conversion {
    ExcelToPdf,
    HtmlToPdf,
    WordToPdf,
    PowerpointToPdf,
    ImagesToPdf,
    ScanToPdf,
    Redact,
}

impl Conversion {
    pub const ALL: [Conversion; 7] = [
        Conversion::ExcelToPdf,
        Conversion::HtmlToPdf,
        Conversion::WordToPdf,
        Conversion::PowerpointToPdf,
        Conversion::ImagesToPdf,
        Conversion::ScanToPdf,
        Conversion::Redact,
    ];

    /// Path relative to the API base
    pub fn path(self) -> &'static [&'static str] {
        match self {
            Conversion::ExcelToPdf => &["excel-to-pdf"],
            Conversion::HtmlToPdf => &["html-to-pdf"],
            Conversion::WordToPdf => &["documents", "word-to-pdf"],
            Conversion::PowerpointToPdf => &["documents", "powerpoint-to-pdf"],
            Conversion::ImagesToPdf => &["documents", "images-to-pdf"],
            Conversion::ScanToPdf => &["documents", "scan-to-pdf"],
            Conversion::Redact => &["redact"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Conversion::ExcelToPdf => "excel-to-pdf",
            Conversion::HtmlToPdf => "html-to-pdf",
            Conversion::WordToPdf => "word-to-pdf",
            Conversion::PowerpointToPdf => "powerpoint-to-pdf",
            Conversion::ImagesToPdf => "images-to-pdf",
            Conversion::ScanToPdf => "scan-to-pdf",
            Conversion::Redact => "redact",
        }
    }

    /// Multipart field each input file is sent under
    pub fn file_field(self) -> &'static str {
        match self {
            Conversion::ImagesToPdf => "images",
            _ => "file",
        }
    }

    /// Whether more than one input file is accepted
    pub fn accepts_many(self) -> bool {
        matches!(self, Conversion::ImagesToPdf)
    }

    /// Lower-case extensions accepted as input
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Conversion::ExcelToPdf => &["xls", "xlsx", "ods", "csv"],
            Conversion::HtmlToPdf => &["html", "htm"],
            Conversion::WordToPdf => &["doc", "docx", "odt", "rtf"],
            Conversion::PowerpointToPdf => &["ppt", "pptx", "odp"],
            Conversion::ImagesToPdf => &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"],
            Conversion::ScanToPdf => &["png", "jpg", "jpeg", "tif", "tiff", "pdf"],
            Conversion::Redact => &["pdf"],
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Conversion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().replace('_', "-").to_ascii_lowercase();
        Conversion::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| Error::UnknownTool {
                name: s.to_string(),
            })
    }
}

/// URL builder rooted at the configured API base
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    base: Url,
}

impl ApiEndpoints {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Append path segments (percent-encoded) plus the trailing slash the API expects
    fn route(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| Error::InvalidApiUrl {
                url: self.base.to_string(),
            })?;
            path.pop_if_empty();
            path.extend(segments);
            path.push("");
        }
        Ok(url)
    }

    pub fn upload(&self) -> Result<Url> {
        self.route(&["documents"])
    }

    pub fn page_count(&self, id: &DocumentId) -> Result<Url> {
        self.route(&["documents", id.as_str(), "page_count"])
    }

    pub fn operation(&self, id: &DocumentId, operation: Operation) -> Result<Url> {
        self.route(&["documents", id.as_str(), operation.path()])
    }

    pub fn merge(&self) -> Result<Url> {
        self.route(&["documents", "merge"])
    }

    pub fn compare(&self) -> Result<Url> {
        self.route(&["documents", "compare"])
    }

    pub fn download(&self, id: &DocumentId, original: bool) -> Result<Url> {
        let leaf = if original { "download_original" } else { "download" };
        self.route(&["documents", id.as_str(), leaf])
    }

    pub fn conversion(&self, conversion: Conversion) -> Result<Url> {
        self.route(conversion.path())
    }
}
