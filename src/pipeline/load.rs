//! Document loading: validate PDF bytes and rasterise the first page.
//!
//! ## Why a trait?
//!
//! pdfium is a native library that may not be installed where the pipeline
//! is built or tested. [`PageRasterizer`] keeps the byte validation, the
//! empty-document check and the pixel ceiling in plain Rust, and leaves only
//! "how big is page one" and "draw page one" to the engine.
//!
//! ## Why fail instead of capping pixels?
//!
//! The QR search regions are absolute pixel coordinates at the configured
//! DPI. Silently shrinking an oversized page would move every region, so a
//! page that would exceed `max_rendered_pixels` is rejected outright.

use crate::config::CardConfig;
use crate::error::CardError;
use crate::raster::RasterPage;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// PDF points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Rasterisation backend for the first page of a PDF.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// run that uses the same [`CardConfig`].
pub trait PageRasterizer: Send + Sync {
    /// Size of the first page in PDF points, or `None` when the document
    /// has no pages.
    fn first_page_points(
        &self,
        pdf: &[u8],
        password: Option<&str>,
    ) -> Result<Option<(f32, f32)>, CardError>;

    /// Render the first page at `width × height` pixels.
    fn render_first_page(
        &self,
        pdf: &[u8],
        width: u32,
        height: u32,
        password: Option<&str>,
    ) -> Result<RgbImage, CardError>;
}

/// Load and rasterise the first page of `pdf` per `config`.
///
/// Checks run cheapest first: byte ceiling, `%PDF` magic, page count,
/// pixel ceiling, and only then the actual render.
pub fn load_first_page(pdf: &[u8], config: &CardConfig) -> Result<RasterPage, CardError> {
    validate_bytes(pdf, config.max_input_bytes)?;

    let password = config.password.as_deref();
    let (width_pt, height_pt) = config
        .rasterizer
        .first_page_points(pdf, password)?
        .ok_or(CardError::EmptyDocument)?;

    let (width, height) = target_dimensions(width_pt, height_pt, config.dpi);
    if width > config.max_rendered_pixels || height > config.max_rendered_pixels {
        return Err(CardError::PageTooLarge {
            width,
            height,
            dpi: config.dpi,
            limit: config.max_rendered_pixels,
        });
    }

    let image = config
        .rasterizer
        .render_first_page(pdf, width, height, password)?;
    info!(
        "PDF rendered: {}x{} px at {} DPI",
        image.width(),
        image.height(),
        config.dpi
    );

    Ok(RasterPage::new(image, config.dpi))
}

/// Reject inputs that are too large or do not carry the PDF magic bytes.
pub fn validate_bytes(pdf: &[u8], max_bytes: usize) -> Result<(), CardError> {
    if pdf.len() > max_bytes {
        return Err(CardError::InputTooLarge {
            size: pdf.len(),
            limit: max_bytes,
        });
    }
    if pdf.len() < 4 || &pdf[..4] != b"%PDF" {
        return Err(CardError::NotAPdf {
            magic: pdf.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Pixel size of a page of `width_pt × height_pt` points at `dpi`.
pub fn target_dimensions(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f32 / POINTS_PER_INCH;
    let w = (width_pt * scale).round().max(1.0) as u32;
    let h = (height_pt * scale).round().max(1.0) as u32;
    (w, h)
}

// ── pdfium backend ───────────────────────────────────────────────────────

/// [`PageRasterizer`] backed by pdfium-render.
///
/// Stateless: the upstream `Pdfium` handle is `!Send`, so each call binds
/// the library afresh. The OS caches the `dlopen`, so repeat binds are cheap.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfiumRasterizer;

impl PageRasterizer for PdfiumRasterizer {
    fn first_page_points(
        &self,
        pdf: &[u8],
        password: Option<&str>,
    ) -> Result<Option<(f32, f32)>, CardError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| map_load_error(e, password))?;

        let pages = document.pages();
        let total = pages.len() as usize;
        debug!("PDF loaded: {} pages", total);
        if total == 0 {
            return Ok(None);
        }

        let page = pages
            .get(0)
            .map_err(|e| CardError::RasterisationFailed {
                page: 1,
                detail: format!("{:?}", e),
            })?;
        Ok(Some((page.width().value, page.height().value)))
    }

    fn render_first_page(
        &self,
        pdf: &[u8],
        width: u32,
        height: u32,
        password: Option<&str>,
    ) -> Result<RgbImage, CardError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| map_load_error(e, password))?;

        let page = document
            .pages()
            .get(0)
            .map_err(|e| CardError::RasterisationFailed {
                page: 1,
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);

        let bitmap =
            page.render_with_config(&render_config)
                .map_err(|e| CardError::RasterisationFailed {
                    page: 1,
                    detail: format!("{:?}", e),
                })?;

        Ok(bitmap.as_image().to_rgb8())
    }
}

/// Bind the pdfium shared library.
///
/// Discovery order:
/// 1. `PDFIUM_LIB_PATH` env var (explicit path to the library file)
/// 2. Alongside the running executable
/// 3. The current working directory
/// 4. System library search paths
pub fn bind_pdfium() -> Result<Pdfium, CardError> {
    if let Ok(path) = std::env::var("PDFIUM_LIB_PATH") {
        debug!("Binding pdfium from PDFIUM_LIB_PATH={}", path);
        return Pdfium::bind_to_library(&path)
            .map(Pdfium::new)
            .map_err(|e| CardError::PdfiumBindingFailed(format!("{path}: {e}")));
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
    {
        candidates.push(exe_dir);
    }
    candidates.push(PathBuf::from("./"));

    for dir in &candidates {
        let lib_path =
            Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&lib_path) {
            debug!("Bound pdfium from {}", dir.display());
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| CardError::PdfiumBindingFailed(format!("{e}")))
}

/// Map a pdfium load failure, singling out password problems.
fn map_load_error(e: PdfiumError, password: Option<&str>) -> CardError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            CardError::WrongPassword
        } else {
            CardError::PasswordRequired
        }
    } else {
        CardError::CorruptPdf { detail: err_str }
    }
}
