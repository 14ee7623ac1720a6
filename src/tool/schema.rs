//! Declarative option schemas for tools
//!
//! Each tool lists its options once; the same description validates caller
//! input, fills defaults, clamps numeric ranges and is rendered as a JSON
//! schema for clients.

use crate::error::{Error, Result};
use serde_json::{json, Map, Value};

/// Most pages a single selection may expand to
pub const MAX_PAGES: usize = 10_000;

/// Value type and constraints of a single option
#[derive(Debug, Clone, Copy)]
pub enum OptionKind {
    Flag {
        default: bool,
    },
    Integer {
        min: i64,
        max: i64,
        default: Option<i64>,
    },
    Number {
        min: f64,
        max: f64,
        default: Option<f64>,
    },
    Text {
        default: Option<&'static str>,
    },
    /// Text that is never echoed back
    Secret,
    Choice {
        choices: &'static [&'static str],
        default: Option<&'static str>,
    },
    /// Quarter turn in degrees: 90, 180 or 270 (negative turns accepted)
    RightAngle {
        default: i64,
    },
    /// Page selection like `1-3,5`, sent as an ascending list of pages
    PageSelection,
    /// Explicit ordered list of pages, duplicates allowed
    PageList,
}

/// A named option of a tool
#[derive(Debug, Clone, Copy)]
pub struct OptionField {
    pub name: &'static str,
    pub kind: OptionKind,
    pub required: bool,
    pub help: &'static str,
}

impl OptionField {
    pub const fn optional(name: &'static str, kind: OptionKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            help,
        }
    }

    pub const fn required(name: &'static str, kind: OptionKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            help,
        }
    }
}

/// The full option set of a tool
#[derive(Debug, Clone, Copy)]
pub struct OptionsSchema {
    pub fields: &'static [OptionField],
}

impl OptionsSchema {
    pub const fn new(fields: &'static [OptionField]) -> Self {
        Self { fields }
    }

    pub fn field(&self, name: &str) -> Option<&OptionField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate caller options into the body sent to the API.
    ///
    /// `page_count` bounds page selections when the document size is known.
    pub fn normalize(
        &self,
        input: &Map<String, Value>,
        page_count: Option<u32>,
    ) -> Result<Map<String, Value>> {
        if let Some(unknown) = input.keys().find(|k| self.field(k).is_none()) {
            return Err(invalid(unknown, "unknown option"));
        }

        let mut out = Map::new();
        for field in self.fields {
            let value = input.get(field.name).filter(|v| !v.is_null());
            let normalized = match value {
                Some(v) => Some(normalize_value(field, v, page_count)?),
                None if field.required => return Err(invalid(field.name, "is required")),
                None => default_value(&field.kind),
            };
            if let Some(v) = normalized {
                out.insert(field.name.to_string(), v);
            }
        }
        Ok(out)
    }

    /// JSON schema describing the options
    pub fn describe(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut prop = match field.kind {
                OptionKind::Flag { default } => json!({"type": "boolean", "default": default}),
                OptionKind::Integer { min, max, default } => {
                    let mut p = json!({"type": "integer", "minimum": min, "maximum": max});
                    if let Some(d) = default {
                        p["default"] = json!(d);
                    }
                    p
                }
                OptionKind::Number { min, max, default } => {
                    let mut p = json!({"type": "number", "minimum": min, "maximum": max});
                    if let Some(d) = default {
                        p["default"] = json!(d);
                    }
                    p
                }
                OptionKind::Text { default } => {
                    let mut p = json!({"type": "string"});
                    if let Some(d) = default {
                        p["default"] = json!(d);
                    }
                    p
                }
                OptionKind::Secret => json!({"type": "string", "writeOnly": true}),
                OptionKind::Choice { choices, default } => {
                    let mut p = json!({"type": "string", "enum": choices});
                    if let Some(d) = default {
                        p["default"] = json!(d);
                    }
                    p
                }
                OptionKind::RightAngle { default } => {
                    json!({"type": "integer", "enum": [90, 180, 270], "default": default})
                }
                OptionKind::PageSelection => {
                    json!({"type": "string", "examples": ["1-3,5"]})
                }
                OptionKind::PageList => {
                    json!({"type": "array", "items": {"type": "integer", "minimum": 1}})
                }
            };
            prop["description"] = json!(field.help);
            properties.insert(field.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }
}

fn invalid(name: &str, reason: impl Into<String>) -> Error {
    Error::InvalidOption {
        name: name.to_string(),
        reason: reason.into(),
    }
}

fn default_value(kind: &OptionKind) -> Option<Value> {
    match *kind {
        OptionKind::Flag { default } => Some(json!(default)),
        OptionKind::Integer { default, .. } => default.map(|d| json!(d)),
        OptionKind::Number { default, .. } => default.map(|d| json!(d)),
        OptionKind::Text { default } => default.map(|d| json!(d)),
        OptionKind::Choice { default, .. } => default.map(|d| json!(d)),
        OptionKind::RightAngle { default } => Some(json!(default)),
        OptionKind::Secret | OptionKind::PageSelection | OptionKind::PageList => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn normalize_value(field: &OptionField, value: &Value, page_count: Option<u32>) -> Result<Value> {
    let name = field.name;
    match field.kind {
        OptionKind::Flag { .. } => match value {
            Value::Bool(b) => Ok(json!(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(json!(true)),
                "false" | "0" | "no" => Ok(json!(false)),
                _ => Err(invalid(name, "expected a boolean")),
            },
            _ => Err(invalid(name, "expected a boolean")),
        },
        OptionKind::Integer { min, max, .. } => {
            let v = as_f64(value).ok_or_else(|| invalid(name, "expected an integer"))?;
            Ok(json!((v.round() as i64).clamp(min, max)))
        }
        OptionKind::Number { min, max, .. } => {
            let v = as_f64(value).ok_or_else(|| invalid(name, "expected a number"))?;
            Ok(json!(v.clamp(min, max)))
        }
        OptionKind::Text { .. } => match value {
            Value::String(s) => {
                if field.required && s.trim().is_empty() {
                    Err(invalid(name, "must not be empty"))
                } else {
                    Ok(json!(s))
                }
            }
            Value::Number(n) => Ok(json!(n.to_string())),
            _ => Err(invalid(name, "expected a string")),
        },
        OptionKind::Secret => match value {
            Value::String(s) if !s.is_empty() => Ok(json!(s)),
            _ => Err(invalid(name, "expected a non-empty string")),
        },
        OptionKind::Choice { choices, .. } => {
            let raw = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => return Err(invalid(name, "expected a string")),
            };
            choices
                .iter()
                .find(|c| c.eq_ignore_ascii_case(&raw))
                .map(|c| json!(c))
                .ok_or_else(|| invalid(name, format!("must be one of {}", choices.join(", "))))
        }
        OptionKind::RightAngle { .. } => {
            let v = as_f64(value).ok_or_else(|| invalid(name, "expected degrees"))?;
            if v.fract() != 0.0 {
                return Err(invalid(name, "must be a multiple of 90"));
            }
            let turned = (v as i64).rem_euclid(360);
            match turned {
                90 | 180 | 270 => Ok(json!(turned)),
                _ => Err(invalid(name, "must be 90, 180 or 270")),
            }
        }
        OptionKind::PageSelection => {
            let max = page_count.unwrap_or(u32::MAX);
            let pages = match value {
                Value::String(s) => parse_page_range(s, max)?,
                Value::Array(_) => page_list(name, value, page_count)?
                    .into_iter()
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                Value::Number(_) => page_list(name, &json!([value]), page_count)?,
                _ => return Err(invalid(name, "expected a page range such as 1-3,5")),
            };
            if pages.is_empty() {
                return Err(invalid(name, "selects no pages"));
            }
            Ok(json!(pages))
        }
        OptionKind::PageList => {
            let pages = page_list(name, value, page_count)?;
            if pages.is_empty() {
                return Err(invalid(name, "must list at least one page"));
            }
            Ok(json!(pages))
        }
    }
}

fn page_list(name: &str, value: &Value, page_count: Option<u32>) -> Result<Vec<u32>> {
    let items = value
        .as_array()
        .ok_or_else(|| invalid(name, "expected a list of page numbers"))?;
    let max = page_count.unwrap_or(u32::MAX);
    if items.len() > MAX_PAGES {
        return Err(invalid(name, format!("lists more than {} pages", MAX_PAGES)));
    }
    items
        .iter()
        .map(|item| {
            item.as_u64()
                .filter(|&p| p >= 1 && p <= max as u64)
                .map(|p| p as u32)
                .ok_or_else(|| invalid(name, format!("{} is not a page of this document", item)))
        })
        .collect()
}

/// Parse a page selection like `1-3,5,7-9` into sorted, de-duplicated pages.
///
/// Ranges expanding to more than [`MAX_PAGES`] pages in total are rejected,
/// which bounds the work when the document's page count is unknown.
pub fn parse_page_range(range: &str, max_pages: u32) -> Result<Vec<u32>> {
    let bad = || Error::InvalidPageRange {
        range: range.to_string(),
    };
    let mut pages = Vec::new();

    for part in range.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (start, end) = match part.split_once('-') {
            Some((start, end)) => (
                start.trim().parse::<u32>().map_err(|_| bad())?,
                end.trim().parse::<u32>().map_err(|_| bad())?,
            ),
            None => {
                let page = part.parse::<u32>().map_err(|_| bad())?;
                (page, page)
            }
        };

        if start < 1 || end > max_pages || start > end {
            return Err(bad());
        }
        if pages.len() + (end - start) as usize >= MAX_PAGES {
            return Err(bad());
        }
        pages.extend(start..=end);
    }

    pages.sort_unstable();
    pages.dedup();
    Ok(pages)
}
