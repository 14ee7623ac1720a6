//! Crop rectangle editor
//!
//! The rectangle lives in percent-of-page coordinates so the same selection
//! applies regardless of the resolution the page was rendered at. Every
//! update leaves the rectangle inside the page with both sides at least
//! [`MIN_EXTENT`] wide.

use super::pointer::{PageBounds, PercentPoint, PointerEvent};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Smallest width/height a drag may shrink the rectangle to, in percent
pub const MIN_EXTENT: f64 = 10.0;

/// Rectangle restored by [`CropEditor::reset`]
pub const DEFAULT_RECT: CropRect = CropRect {
    x: 10.0,
    y: 10.0,
    width: 80.0,
    height: 80.0,
};

/// Crop region in percent-of-page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for CropRect {
    fn default() -> Self {
        DEFAULT_RECT
    }
}

impl CropRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Whether the rectangle lies within the page and respects the minimum extent
    pub fn is_within_page(&self) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= 100.0
            && self.bottom() <= 100.0
            && self.width >= MIN_EXTENT
            && self.height >= MIN_EXTENT
    }

    /// Force the rectangle onto the page.
    ///
    /// The origin is limited so a minimum-size rectangle still fits, then an
    /// overflowing width/height is shrunk rather than moving the origin.
    ///
    /// Every coordinate comes back rounded to a hundredth of a percent, so
    /// the editors and the `crop` tool only ever emit values on that grid.
    /// The origin is rounded before the extent is fitted against it, which
    /// keeps `right()` and `bottom()` at or below 100 with no float drift.
    pub fn clamped(self) -> Self {
        let sanitize = |v: f64, fallback: f64| if v.is_finite() { v } else { fallback };
        let x = round_hundredths(sanitize(self.x, DEFAULT_RECT.x).clamp(0.0, 100.0 - MIN_EXTENT));
        let y = round_hundredths(sanitize(self.y, DEFAULT_RECT.y).clamp(0.0, 100.0 - MIN_EXTENT));
        let mut width = round_hundredths(sanitize(self.width, DEFAULT_RECT.width).max(MIN_EXTENT));
        let mut height =
            round_hundredths(sanitize(self.height, DEFAULT_RECT.height).max(MIN_EXTENT));

        if x + width > 100.0 {
            width = round_hundredths(100.0 - x);
        }
        if y + height > 100.0 {
            height = round_hundredths(100.0 - y);
        }

        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Option map for the `crop` operation endpoint
    pub fn to_options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("x".to_string(), Value::from(self.x));
        options.insert("y".to_string(), Value::from(self.y));
        options.insert("width".to_string(), Value::from(self.width));
        options.insert("height".to_string(), Value::from(self.height));
        options
    }
}

fn round_hundredths(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Drag handle on the crop overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Move,
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl Handle {
    fn adjusts_left(self) -> bool {
        matches!(self, Handle::W | Handle::Nw | Handle::Sw)
    }

    fn adjusts_right(self) -> bool {
        matches!(self, Handle::E | Handle::Ne | Handle::Se)
    }

    fn adjusts_top(self) -> bool {
        matches!(self, Handle::N | Handle::Ne | Handle::Nw)
    }

    fn adjusts_bottom(self) -> bool {
        matches!(self, Handle::S | Handle::Se | Handle::Sw)
    }
}

/// Apply one pointer position to the rectangle for the given handle.
pub fn apply_handle(rect: CropRect, handle: Handle, pointer: PercentPoint) -> CropRect {
    let rect = rect.clamped();

    let next = if handle == Handle::Move {
        CropRect {
            x: (pointer.x - rect.width / 2.0).clamp(0.0, 100.0 - rect.width),
            y: (pointer.y - rect.height / 2.0).clamp(0.0, 100.0 - rect.height),
            ..rect
        }
    } else {
        let (mut left, mut top) = (rect.x, rect.y);
        let (mut right, mut bottom) = (rect.right(), rect.bottom());

        if handle.adjusts_left() {
            left = pointer.x.min(right - MIN_EXTENT).max(0.0);
        }
        if handle.adjusts_right() {
            right = pointer.x.max(left + MIN_EXTENT).min(100.0);
        }
        if handle.adjusts_top() {
            top = pointer.y.min(bottom - MIN_EXTENT).max(0.0);
        }
        if handle.adjusts_bottom() {
            bottom = pointer.y.max(top + MIN_EXTENT).min(100.0);
        }

        CropRect {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    };

    next.clamped()
}

/// Interaction state of the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "state", content = "handle", rename_all = "snake_case")]
pub enum DragState {
    Idle,
    Dragging(Handle),
}

/// Crop rectangle plus the drag currently in progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropEditor {
    rect: CropRect,
    drag: DragState,
}

impl Default for CropEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl CropEditor {
    pub fn new() -> Self {
        Self {
            rect: DEFAULT_RECT,
            drag: DragState::Idle,
        }
    }

    /// Start from an explicit rectangle (clamped onto the page)
    pub fn with_rect(rect: CropRect) -> Self {
        Self {
            rect: rect.clamped(),
            drag: DragState::Idle,
        }
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn drag(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging(_))
    }

    pub fn pointer_down(&mut self, handle: Handle) {
        self.drag = DragState::Dragging(handle);
    }

    /// Update the rectangle for a pointer position. Ignored while idle.
    pub fn pointer_move(&mut self, pointer: PercentPoint) {
        if let DragState::Dragging(handle) = self.drag {
            self.rect = apply_handle(self.rect, handle, pointer);
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn reset(&mut self) {
        self.rect = DEFAULT_RECT;
        self.drag = DragState::Idle;
    }

    /// Feed one client event through the state machine.
    ///
    /// A press without a handle is treated as grabbing the whole rectangle.
    pub fn apply(&mut self, event: &PointerEvent, bounds: Option<&PageBounds>) {
        match *event {
            PointerEvent::Down { handle, .. } => {
                self.pointer_down(handle.unwrap_or(Handle::Move));
            }
            PointerEvent::Move { .. } => {
                if let Some(point) = event.point(bounds) {
                    self.pointer_move(point);
                }
            }
            PointerEvent::Up => self.pointer_up(),
            PointerEvent::Leave => self.pointer_leave(),
        }
    }
}
