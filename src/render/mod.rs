//! Local page previews
//!
//! Pages are rendered with pdfium so a client can see where a crop rectangle
//! or watermark will land before the API call is made. The binding location
//! is fixed once at start-up by [`init`].

use crate::editor::{CropRect, PreviewBox};
use crate::error::{Error, Result};
use base64::Engine;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use pdfium_render::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_PREVIEW_WIDTH: u32 = 800;
pub const MAX_PREVIEW_WIDTH: u32 = 2400;

const CROP_COLOR: Rgba<u8> = Rgba([220, 38, 38, 255]);
const WATERMARK_COLOR: Rgba<u8> = Rgba([37, 99, 235, 255]);
const OUTLINE_THICKNESS: i32 = 3;
/// Fraction of brightness kept outside the crop area
const DIM_FACTOR: f32 = 0.45;

static PDFIUM_DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
static PREVIEWS_AVAILABLE: OnceLock<bool> = OnceLock::new();

/// Fix the pdfium library location and try binding it once. Only the first
/// call has any effect; returns whether this call performed the initialisation.
pub fn init(dir: Option<PathBuf>) -> bool {
    if PDFIUM_DIR.set(dir).is_err() {
        return false;
    }
    let available = binding_outcome(create_pdfium());
    // Only the call that set the directory reaches this point
    let _ = PREVIEWS_AVAILABLE.set(available);
    true
}

fn binding_outcome(bound: Result<Pdfium>) -> bool {
    match bound {
        Ok(_) => {
            tracing::info!("pdfium bound; page previews enabled");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "pdfium unavailable; page previews disabled");
            false
        }
    }
}

/// Whether [`init`] has run, whatever its outcome
pub fn is_initialized() -> bool {
    PDFIUM_DIR.get().is_some()
}

/// Whether [`init`] has run and pdfium actually bound
pub fn previews_available() -> bool {
    PREVIEWS_AVAILABLE.get().copied().unwrap_or(false)
}

fn configured_dir() -> Option<&'static Path> {
    PDFIUM_DIR.get().and_then(|dir| dir.as_deref())
}

fn create_pdfium() -> Result<Pdfium> {
    let bind_at = |dir: &Path| {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
    };

    let mut candidates: Vec<&Path> = Vec::with_capacity(3);
    if let Some(dir) = configured_dir() {
        candidates.push(dir);
    }
    candidates.push(Path::new("./"));
    candidates.push(Path::new("/opt/pdfium/lib"));

    let bindings = match candidates.into_iter().find_map(|dir| bind_at(dir).ok()) {
        Some(bindings) => bindings,
        None => Pdfium::bind_to_system_library().map_err(|e| Error::Render {
            reason: format!("failed to bind pdfium: {}", e),
        })?,
    };

    Ok(Pdfium::new(bindings))
}

fn load_error(e: PdfiumError) -> Error {
    match e {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError) => {
            Error::InvalidPdf {
                reason: "document is password protected".to_string(),
            }
        }
        other => Error::Render {
            reason: other.to_string(),
        },
    }
}

fn ensure_pdf_header(data: &[u8]) -> Result<()> {
    if data.len() < 4 || &data[0..4] != b"%PDF" {
        return Err(Error::InvalidPdf {
            reason: "Not a valid PDF file".to_string(),
        });
    }
    Ok(())
}

/// Number of pages in a local PDF
pub fn page_count(data: &[u8]) -> Result<u32> {
    ensure_pdf_header(data)?;
    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(load_error)?;
    Ok(document.pages().len() as u32)
}

/// What to draw on top of the rendered page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PreviewOverlay {
    /// Outline the crop area and dim what will be cut away
    Crop(CropRect),
    /// Outline the estimated watermark footprint
    Watermark(PreviewBox),
}

/// A rendered page, PNG encoded
#[derive(Debug, Clone, Serialize)]
pub struct PagePreview {
    pub page: u32,
    pub width: u32,
    pub height: u32,
    pub data_base64: String,
    pub mime_type: String,
}

/// Pixel-space rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    fn contains(&self, px: u32, py: u32) -> bool {
        let (px, py) = (px as i64, py as i64);
        px >= self.x as i64
            && py >= self.y as i64
            && px < self.x as i64 + self.width as i64
            && py < self.y as i64 + self.height as i64
    }
}

/// Map a percent-of-page rectangle onto an image of the given size.
///
/// The result is at least one pixel in each direction and never extends past
/// the image.
pub fn overlay_pixels(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    image_width: u32,
    image_height: u32,
) -> PixelRect {
    let to_px = |percent: f64, extent: u32| -> u32 {
        ((percent.clamp(0.0, 100.0) / 100.0) * extent as f64).round() as u32
    };

    let max_x = image_width.saturating_sub(1);
    let max_y = image_height.saturating_sub(1);
    let left = to_px(x, image_width).min(max_x);
    let top = to_px(y, image_height).min(max_y);
    let right = to_px(x + width, image_width).min(image_width);
    let bottom = to_px(y + height, image_height).min(image_height);

    PixelRect {
        x: left as i32,
        y: top as i32,
        width: right.saturating_sub(left).max(1),
        height: bottom.saturating_sub(top).max(1),
    }
}

fn outline(image: &mut RgbaImage, rect: PixelRect, color: Rgba<u8>) {
    for inset in 0..OUTLINE_THICKNESS {
        let shrink = 2 * inset as u32;
        if rect.width <= shrink || rect.height <= shrink {
            break;
        }
        let r = Rect::at(rect.x + inset, rect.y + inset)
            .of_size(rect.width - shrink, rect.height - shrink);
        draw_hollow_rect_mut(image, r, color);
    }
}

fn dim_outside(image: &mut RgbaImage, keep: PixelRect) {
    for (px, py, pixel) in image.enumerate_pixels_mut() {
        if keep.contains(px, py) {
            continue;
        }
        for channel in pixel.0.iter_mut().take(3) {
            *channel = (*channel as f32 * DIM_FACTOR) as u8;
        }
    }
}

/// Draw an overlay onto an already rendered page
pub fn draw_overlay(image: &mut RgbaImage, overlay: &PreviewOverlay) {
    let (w, h) = image.dimensions();
    match overlay {
        PreviewOverlay::Crop(rect) => {
            let px = overlay_pixels(rect.x, rect.y, rect.width, rect.height, w, h);
            dim_outside(image, px);
            outline(image, px, CROP_COLOR);
        }
        PreviewOverlay::Watermark(b) => {
            let px = overlay_pixels(b.x, b.y, b.width, b.height, w, h);
            outline(image, px, WATERMARK_COLOR);
        }
    }
}

/// Render one page (1-based) at the given pixel width, optionally with an overlay
pub fn render_page_preview(
    data: &[u8],
    page_number: u32,
    width: u32,
    overlay: Option<&PreviewOverlay>,
) -> Result<PagePreview> {
    ensure_pdf_header(data)?;
    let width = width.clamp(1, MAX_PREVIEW_WIDTH);

    let pdfium = create_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(data, None)
        .map_err(load_error)?;

    let pages = document.pages();
    let page_count = pages.len() as u32;
    if page_number < 1 || page_number > page_count {
        return Err(Error::InvalidPageRange {
            range: page_number.to_string(),
        });
    }

    let page = pages
        .get((page_number - 1) as u16)
        .map_err(|e| Error::Render {
            reason: format!("Failed to get page {}: {}", page_number, e),
        })?;

    let config = PdfRenderConfig::new()
        .set_target_width(width as i32)
        .render_form_data(true)
        .render_annotations(true);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| Error::Render {
            reason: format!("Failed to render page {}: {}", page_number, e),
        })?;

    let mut image = bitmap.as_image().to_rgba8();
    if let Some(overlay) = overlay {
        draw_overlay(&mut image, overlay);
    }

    let mut png_bytes = Vec::new();
    image
        .write_to(
            &mut std::io::Cursor::new(&mut png_bytes),
            image::ImageFormat::Png,
        )
        .map_err(|e| Error::Render {
            reason: format!("Failed to encode page {} as PNG: {}", page_number, e),
        })?;

    Ok(PagePreview {
        page: page_number,
        width: image.width(),
        height: image.height(),
        data_base64: base64::engine::general_purpose::STANDARD.encode(&png_bytes),
        mime_type: "image/png".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::DEFAULT_RECT;

    #[test]
    fn test_previews_follow_binding_outcome() {
        init(Some(PathBuf::from("/nonexistent/pdfium")));
        assert!(is_initialized());
        // A second call never rebinds or flips the recorded outcome
        let before = previews_available();
        assert!(!init(None));
        assert_eq!(previews_available(), before);

        let failed = Err(Error::Render {
            reason: "failed to bind pdfium".to_string(),
        });
        assert!(!binding_outcome(failed));
    }

    #[test]
    fn test_overlay_pixels_default_rect() {
        let px = overlay_pixels(10.0, 10.0, 80.0, 80.0, 800, 1000);
        assert_eq!(
            px,
            PixelRect {
                x: 80,
                y: 100,
                width: 640,
                height: 800
            }
        );
    }

    #[test]
    fn test_overlay_pixels_stays_inside_image() {
        let px = overlay_pixels(95.0, 99.9, 50.0, 50.0, 200, 100);
        assert!(px.x as u32 + px.width <= 200);
        assert!(px.y as u32 + px.height <= 100);
        assert!(px.width >= 1 && px.height >= 1);

        let px = overlay_pixels(-20.0, 0.0, 0.0, 0.0, 10, 10);
        assert_eq!((px.x, px.y, px.width, px.height), (0, 0, 1, 1));
    }

    #[test]
    fn test_crop_overlay_dims_outside() {
        let mut image = RgbaImage::from_pixel(100, 100, Rgba([200, 200, 200, 255]));
        draw_overlay(&mut image, &PreviewOverlay::Crop(DEFAULT_RECT));

        // discarded margin is darkened, alpha untouched
        assert_eq!(image.get_pixel(2, 2).0, [90, 90, 90, 255]);
        // outline on the crop border
        assert_eq!(*image.get_pixel(10, 50), CROP_COLOR);
        // interior untouched
        assert_eq!(image.get_pixel(50, 50).0, [200, 200, 200, 255]);
    }

    #[test]
    fn test_watermark_overlay_only_outlines() {
        let mut image = RgbaImage::from_pixel(100, 100, Rgba([255, 255, 255, 255]));
        let b = PreviewBox {
            x: 20.0,
            y: 40.0,
            width: 60.0,
            height: 20.0,
            rotation: 45.0,
        };
        draw_overlay(&mut image, &PreviewOverlay::Watermark(b));
        assert_eq!(*image.get_pixel(20, 50), WATERMARK_COLOR);
        assert_eq!(image.get_pixel(2, 2).0, [255, 255, 255, 255]);
    }

    #[test]
    fn test_rejects_non_pdf_before_binding() {
        let result = render_page_preview(b"hello", 1, 400, None);
        assert!(matches!(result, Err(Error::InvalidPdf { .. })));
        assert!(matches!(page_count(b""), Err(Error::InvalidPdf { .. })));
    }
}
