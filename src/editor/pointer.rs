//! Pointer input shared by the page overlay editors

use super::crop::Handle;
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A point in percent-of-page coordinates, both axes within [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PercentPoint {
    pub x: f64,
    pub y: f64,
}

impl PercentPoint {
    /// Clamp raw coordinates onto the page. Non-finite input yields `None`.
    pub fn clamped(x: f64, y: f64) -> Option<Self> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(Self {
            x: x.clamp(0.0, 100.0),
            y: y.clamp(0.0, 100.0),
        })
    }
}

/// Bounding box of the rendered page image, in the pointer's pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PageBounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PageBounds {
    /// Map a pixel position to percent coordinates relative to this box.
    ///
    /// Positions outside the box are clamped to its edges. A box with no
    /// area cannot map anything.
    pub fn to_percent(&self, x: f64, y: f64) -> Option<PercentPoint> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        PercentPoint::clamped(
            (x - self.left) / self.width * 100.0,
            (y - self.top) / self.height * 100.0,
        )
    }
}

/// Pointer event forwarded from the client.
///
/// Coordinates are pixels when the caller supplies [`PageBounds`], otherwise
/// they are already percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    /// Button pressed on a handle (crop) or on the watermark (handle ignored)
    Down {
        #[serde(default)]
        handle: Option<Handle>,
        x: f64,
        y: f64,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up,
    /// Pointer left the rendered page area
    Leave,
}

impl PointerEvent {
    /// Position of this event in percent coordinates, if it carries one
    pub fn point(&self, bounds: Option<&PageBounds>) -> Option<PercentPoint> {
        let (x, y) = match *self {
            PointerEvent::Down { x, y, .. } | PointerEvent::Move { x, y } => (x, y),
            PointerEvent::Up | PointerEvent::Leave => return None,
        };
        match bounds {
            Some(b) => b.to_percent(x, y),
            None => PercentPoint::clamped(x, y),
        }
    }
}
