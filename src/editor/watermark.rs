//! Watermark placement preview
//!
//! Tracks the watermark's text, size, opacity, rotation and centre point so a
//! client can preview placement before the `add_watermark` call is made.

use super::pointer::{PageBounds, PercentPoint, PointerEvent};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIN_FONT_SIZE: f64 = 8.0;
pub const MAX_FONT_SIZE: f64 = 144.0;

// US Letter in points; only used to estimate the preview box
const REFERENCE_PAGE_WIDTH: f64 = 612.0;
const REFERENCE_PAGE_HEIGHT: f64 = 792.0;
const GLYPH_WIDTH_RATIO: f64 = 0.6;
const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Nine-cell placement grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPreset {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    Center,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl WatermarkPreset {
    pub fn center(self) -> PercentPoint {
        let (x, y) = match self {
            WatermarkPreset::TopLeft => (15.0, 15.0),
            WatermarkPreset::TopCenter => (50.0, 15.0),
            WatermarkPreset::TopRight => (85.0, 15.0),
            WatermarkPreset::MiddleLeft => (15.0, 50.0),
            WatermarkPreset::Center => (50.0, 50.0),
            WatermarkPreset::MiddleRight => (85.0, 50.0),
            WatermarkPreset::BottomLeft => (15.0, 85.0),
            WatermarkPreset::BottomCenter => (50.0, 85.0),
            WatermarkPreset::BottomRight => (85.0, 85.0),
        };
        PercentPoint { x, y }
    }
}

/// Estimated on-page footprint of the watermark text, percent coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, JsonSchema)]
pub struct PreviewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, counter-clockwise
    pub rotation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatermarkEditor {
    text: String,
    font_size: f64,
    opacity: f64,
    rotation: f64,
    center: PercentPoint,
    dragging: bool,
}

impl Default for WatermarkEditor {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_size: 48.0,
            opacity: 0.3,
            rotation: 45.0,
            center: WatermarkPreset::Center.center(),
            dragging: false,
        }
    }
}

impl WatermarkEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_size(&self) -> f64 {
        self.font_size
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn center(&self) -> PercentPoint {
        self.center
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_font_size(&mut self, size: f64) {
        if size.is_finite() {
            self.font_size = size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        }
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        if opacity.is_finite() {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.rotation = normalize_degrees(degrees);
        }
    }

    pub fn set_center(&mut self, center: PercentPoint) {
        self.center = center;
    }

    pub fn apply_preset(&mut self, preset: WatermarkPreset) {
        self.center = preset.center();
    }

    /// Grab the watermark; the centre follows the pointer until release.
    pub fn apply(&mut self, event: &PointerEvent, bounds: Option<&PageBounds>) {
        match event {
            PointerEvent::Down { .. } => self.dragging = true,
            PointerEvent::Move { .. } => {
                if self.dragging {
                    if let Some(point) = event.point(bounds) {
                        self.center = point;
                    }
                }
            }
            PointerEvent::Up | PointerEvent::Leave => self.dragging = false,
        }
    }

    /// Approximate unrotated text box centred on the watermark position,
    /// shifted so it stays on the page.
    pub fn preview_box(&self) -> PreviewBox {
        let chars = self.text.chars().count().max(1) as f64;
        let width = (chars * self.font_size * GLYPH_WIDTH_RATIO / REFERENCE_PAGE_WIDTH * 100.0)
            .min(100.0);
        let height =
            (self.font_size * LINE_HEIGHT_RATIO / REFERENCE_PAGE_HEIGHT * 100.0).min(100.0);

        PreviewBox {
            x: (self.center.x - width / 2.0).clamp(0.0, 100.0 - width),
            y: (self.center.y - height / 2.0).clamp(0.0, 100.0 - height),
            width,
            height,
            rotation: self.rotation,
        }
    }

    /// Option map for the `add_watermark` operation endpoint
    pub fn to_options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("text".to_string(), Value::from(self.text.clone()));
        options.insert("font_size".to_string(), Value::from(self.font_size));
        options.insert("opacity".to_string(), Value::from(self.opacity));
        options.insert("rotation".to_string(), Value::from(self.rotation));
        options.insert("position_x".to_string(), Value::from(self.center.x));
        options.insert("position_y".to_string(), Value::from(self.center.y));
        options
    }
}

/// Normalise an angle into (-180, 180]
pub fn normalize_degrees(degrees: f64) -> f64 {
    let mut r = degrees % 360.0;
    if r > 180.0 {
        r -= 360.0;
    } else if r <= -180.0 {
        r += 360.0;
    }
    r
}
