//! Interactive page editors
//!
//! Pure state machines driven by pointer events: the crop rectangle, the
//! watermark placement preview and the page/file reorder list. None of them
//! touch the network; their output becomes tool options.

pub mod crop;
pub mod pointer;
pub mod reorder;
pub mod watermark;

pub use crop::{apply_handle, CropEditor, CropRect, DragState, Handle, DEFAULT_RECT, MIN_EXTENT};
pub use pointer::{PageBounds, PercentPoint, PointerEvent};
pub use reorder::{move_item, MoveRequest, PageOrder, PageOrderItem};
pub use watermark::{normalize_degrees, PreviewBox, WatermarkEditor, WatermarkPreset};
