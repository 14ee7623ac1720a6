//! Catalog of every tool the API offers

use super::schema::{OptionField, OptionKind, OptionsSchema};
use crate::api::{Conversion, Operation};
use crate::error::{Error, Result};
use serde_json::{json, Value};

/// How the option body is sent to the operation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    /// Multipart form carrying one extra file under `file_field`
    Multipart { file_field: &'static str },
}

/// Session editor whose state supplies the options when the caller omits them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorBinding {
    Crop,
    PageOrder,
    Watermark,
}

/// A per-document tool
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub operation: Operation,
    pub title: &'static str,
    pub description: &'static str,
    pub body: BodyFormat,
    pub options: OptionsSchema,
    pub editor: Option<EditorBinding>,
}

impl ToolSpec {
    pub fn name(&self) -> &'static str {
        self.operation.path()
    }

    pub fn describe(&self) -> Value {
        let mut value = json!({
            "name": self.name(),
            "title": self.title,
            "description": self.description,
            "options": self.options.describe(),
        });
        if let BodyFormat::Multipart { file_field } = self.body {
            value["attachment"] = json!(file_field);
        }
        value
    }
}

/// A standalone conversion
#[derive(Debug, Clone, Copy)]
pub struct ConversionSpec {
    pub conversion: Conversion,
    pub title: &'static str,
    pub description: &'static str,
    pub options: OptionsSchema,
}

impl ConversionSpec {
    pub fn name(&self) -> &'static str {
        self.conversion.name()
    }

    pub fn describe(&self) -> Value {
        json!({
            "name": self.name(),
            "title": self.title,
            "description": self.description,
            "accepts": self.conversion.extensions(),
            "multiple_files": self.conversion.accepts_many(),
            "options": self.options.describe(),
        })
    }
}

const NO_OPTIONS: OptionsSchema = OptionsSchema::new(&[]);

const PERCENT: OptionKind = OptionKind::Number {
    min: 0.0,
    max: 100.0,
    default: None,
};

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        operation: Operation::Rotate,
        title: "Rotate PDF",
        description: "Rotate all or selected pages by a quarter turn.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::optional("angle", OptionKind::RightAngle { default: 90 }, "Clockwise rotation in degrees"),
            OptionField::optional("pages", OptionKind::PageSelection, "Pages to rotate (default: all)"),
        ]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::Crop,
        title: "Crop PDF",
        description: "Crop pages to a rectangle given in percent of the page. Defaults to the session's crop editor.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::required("x", PERCENT, "Left edge, percent of page width"),
            OptionField::required("y", PERCENT, "Top edge, percent of page height"),
            OptionField::required("width", PERCENT, "Width, percent of page width"),
            OptionField::required("height", PERCENT, "Height, percent of page height"),
            OptionField::optional("pages", OptionKind::PageSelection, "Pages to crop (default: all)"),
        ]),
        editor: Some(EditorBinding::Crop),
    },
    ToolSpec {
        operation: Operation::Organize,
        title: "Organize pages",
        description: "Rewrite the document with pages in a new order. Defaults to the session's page order.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::required(
            "page_order",
            OptionKind::PageList,
            "Page numbers in their new order; omitted pages are dropped",
        )]),
        editor: Some(EditorBinding::PageOrder),
    },
    ToolSpec {
        operation: Operation::ExtractPages,
        title: "Extract pages",
        description: "Create a new PDF from selected pages.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::required(
            "pages",
            OptionKind::PageSelection,
            "Pages to extract, e.g. 1-3,5",
        )]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::AddWatermark,
        title: "Add watermark",
        description: "Stamp a text watermark on every page. Defaults to the session's watermark editor.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::required("text", OptionKind::Text { default: None }, "Watermark text"),
            OptionField::optional(
                "font_size",
                OptionKind::Number { min: 8.0, max: 144.0, default: Some(48.0) },
                "Font size in points",
            ),
            OptionField::optional(
                "opacity",
                OptionKind::Number { min: 0.0, max: 1.0, default: Some(0.3) },
                "0 = invisible, 1 = opaque",
            ),
            OptionField::optional(
                "rotation",
                OptionKind::Number { min: -180.0, max: 180.0, default: Some(45.0) },
                "Rotation in degrees",
            ),
            OptionField::optional(
                "position_x",
                OptionKind::Number { min: 0.0, max: 100.0, default: Some(50.0) },
                "Centre, percent of page width",
            ),
            OptionField::optional(
                "position_y",
                OptionKind::Number { min: 0.0, max: 100.0, default: Some(50.0) },
                "Centre, percent of page height",
            ),
            OptionField::optional("color", OptionKind::Text { default: Some("#808080") }, "Text colour"),
        ]),
        editor: Some(EditorBinding::Watermark),
    },
    ToolSpec {
        operation: Operation::Compress,
        title: "Compress PDF",
        description: "Reduce file size.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::optional(
            "level",
            OptionKind::Choice { choices: &["low", "medium", "high"], default: Some("medium") },
            "Compression strength",
        )]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::Protect,
        title: "Protect PDF",
        description: "Encrypt the document with a password.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::required("password", OptionKind::Secret, "Password required to open")]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::Unlock,
        title: "Unlock PDF",
        description: "Remove password protection.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::required("password", OptionKind::Secret, "Current password")]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::AddPageNumbers,
        title: "Add page numbers",
        description: "Number every page.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::optional(
                "position",
                OptionKind::Choice {
                    choices: &["bottom-center", "bottom-left", "bottom-right", "top-center", "top-left", "top-right"],
                    default: Some("bottom-center"),
                },
                "Where the number is placed",
            ),
            OptionField::optional(
                "start_number",
                OptionKind::Integer { min: 1, max: 100_000, default: Some(1) },
                "Number printed on the first page",
            ),
            OptionField::optional(
                "font_size",
                OptionKind::Integer { min: 6, max: 72, default: Some(12) },
                "Font size in points",
            ),
        ]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::Sign,
        title: "Sign PDF",
        description: "Place a signature image on a page. Requires an attachment with the signature image.",
        body: BodyFormat::Multipart { file_field: "signature" },
        options: OptionsSchema::new(&[
            OptionField::optional("page", OptionKind::Integer { min: 1, max: 100_000, default: Some(1) }, "Page to sign"),
            OptionField::optional("x", OptionKind::Number { min: 0.0, max: 100.0, default: Some(60.0) }, "Left edge, percent"),
            OptionField::optional("y", OptionKind::Number { min: 0.0, max: 100.0, default: Some(80.0) }, "Top edge, percent"),
            OptionField::optional("width", OptionKind::Number { min: 1.0, max: 100.0, default: Some(25.0) }, "Width, percent"),
        ]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::Ocr,
        title: "OCR PDF",
        description: "Make scanned pages searchable.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[OptionField::optional(
            "language",
            OptionKind::Text { default: Some("eng") },
            "Tesseract language code",
        )]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::PdfToImages,
        title: "PDF to images",
        description: "Render every page as an image.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::optional(
                "format",
                OptionKind::Choice { choices: &["png", "jpg"], default: Some("png") },
                "Image format",
            ),
            OptionField::optional("dpi", OptionKind::Integer { min: 72, max: 600, default: Some(150) }, "Resolution"),
        ]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::PdfToExcel,
        title: "PDF to Excel",
        description: "Extract tables into a spreadsheet.",
        body: BodyFormat::Json,
        options: NO_OPTIONS,
        editor: None,
    },
    ToolSpec {
        operation: Operation::PdfToWord,
        title: "PDF to Word",
        description: "Convert to an editable Word document.",
        body: BodyFormat::Json,
        options: NO_OPTIONS,
        editor: None,
    },
    ToolSpec {
        operation: Operation::PdfToPowerpoint,
        title: "PDF to PowerPoint",
        description: "Convert pages to slides.",
        body: BodyFormat::Json,
        options: NO_OPTIONS,
        editor: None,
    },
    ToolSpec {
        operation: Operation::Edit,
        title: "Edit PDF",
        description: "Add a line of text to a page.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::required("text", OptionKind::Text { default: None }, "Text to add"),
            OptionField::optional("page", OptionKind::Integer { min: 1, max: 100_000, default: Some(1) }, "Target page"),
            OptionField::optional("x", OptionKind::Number { min: 0.0, max: 100.0, default: Some(10.0) }, "Left edge, percent"),
            OptionField::optional("y", OptionKind::Number { min: 0.0, max: 100.0, default: Some(10.0) }, "Baseline, percent"),
            OptionField::optional("font_size", OptionKind::Integer { min: 6, max: 144, default: Some(12) }, "Font size"),
        ]),
        editor: None,
    },
    ToolSpec {
        operation: Operation::FindReplace,
        title: "Find and replace",
        description: "Replace every occurrence of a text in the document.",
        body: BodyFormat::Json,
        options: OptionsSchema::new(&[
            OptionField::required("find_text", OptionKind::Text { default: None }, "Text to look for"),
            OptionField::optional("replace_text", OptionKind::Text { default: Some("") }, "Replacement"),
        ]),
        editor: None,
    },
];

pub static CONVERSIONS: &[ConversionSpec] = &[
    ConversionSpec {
        conversion: Conversion::ExcelToPdf,
        title: "Excel to PDF",
        description: "Convert a spreadsheet to PDF.",
        options: NO_OPTIONS,
    },
    ConversionSpec {
        conversion: Conversion::HtmlToPdf,
        title: "HTML to PDF",
        description: "Convert an HTML page to PDF.",
        options: OptionsSchema::new(&[OptionField::optional(
            "page_size",
            OptionKind::Choice { choices: &["A4", "Letter", "Legal"], default: Some("A4") },
            "Paper size",
        )]),
    },
    ConversionSpec {
        conversion: Conversion::WordToPdf,
        title: "Word to PDF",
        description: "Convert a Word document to PDF.",
        options: NO_OPTIONS,
    },
    ConversionSpec {
        conversion: Conversion::PowerpointToPdf,
        title: "PowerPoint to PDF",
        description: "Convert a presentation to PDF.",
        options: NO_OPTIONS,
    },
    ConversionSpec {
        conversion: Conversion::ImagesToPdf,
        title: "Images to PDF",
        description: "Combine images into one PDF, one image per page, in the order given.",
        options: OptionsSchema::new(&[OptionField::optional(
            "orientation",
            OptionKind::Choice { choices: &["portrait", "landscape"], default: Some("portrait") },
            "Page orientation",
        )]),
    },
    ConversionSpec {
        conversion: Conversion::ScanToPdf,
        title: "Scan to PDF",
        description: "Clean up a scanned page and wrap it in a PDF.",
        options: OptionsSchema::new(&[OptionField::optional(
            "enhance",
            OptionKind::Flag { default: true },
            "Deskew and increase contrast",
        )]),
    },
    ConversionSpec {
        conversion: Conversion::Redact,
        title: "Redact PDF",
        description: "Black out every occurrence of the given words.",
        options: OptionsSchema::new(&[OptionField::required(
            "words",
            OptionKind::Text { default: None },
            "Comma-separated words or phrases to redact",
        )]),
    },
];

/// Look up a per-document tool by name (either separator accepted)
pub fn find_tool(name: &str) -> Result<&'static ToolSpec> {
    let operation: Operation = name.parse()?;
    TOOLS
        .iter()
        .find(|t| t.operation == operation)
        .ok_or_else(|| Error::UnknownTool {
            name: name.to_string(),
        })
}

pub fn find_conversion(name: &str) -> Result<&'static ConversionSpec> {
    let conversion: Conversion = name.parse()?;
    CONVERSIONS
        .iter()
        .find(|c| c.conversion == conversion)
        .ok_or_else(|| Error::UnknownTool {
            name: name.to_string(),
        })
}
