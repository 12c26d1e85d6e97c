//! Card rendering: template, text lines, image patches, PNG output.
//!
//! ## Why best-effort?
//!
//! By the time rendering starts the expensive part is done: the page was
//! rasterised and the identity record decoded. A missing font or a photo crop
//! that falls off a smaller page should not throw that away, so every drawing
//! step reports a [`RenderIssue`] and moves on. Only template loading and
//! file output are fatal.

use crate::error::{CardError, RenderIssue};
use crate::layout::TemplateLayout;
use crate::output::IdentityRecord;
use crate::raster::{RasterPage, Region};
use ab_glyph::FontVec;
use chrono::Local;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::fs::{self, OpenOptions};
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const GREEN: Rgb<u8> = Rgb([0, 122, 51]);
const YELLOW: Rgb<u8> = Rgb([241, 196, 15]);
const RED: Rgb<u8> = Rgb([203, 45, 62]);
const PLACEHOLDER: Rgb<u8> = Rgb([240, 240, 240]);

/// Fonts tried when no font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "arial.ttf",
];

/// Upper bound on `-N` suffixes tried when the output name is taken.
const MAX_NAME_ATTEMPTS: u32 = 1000;

// ── Template ─────────────────────────────────────────────────────────────

/// Open the layout's template image, or synthesise the default one.
///
/// A configured path that does not exist falls back to the synthesised
/// template; a file that exists but cannot be decoded is an error.
pub fn load_template(
    layout: &TemplateLayout,
    font: Option<&FontVec>,
) -> Result<RgbImage, CardError> {
    match &layout.template_path {
        Some(path) if path.exists() => {
            let img = image::open(path).map_err(|e| CardError::TemplateLoadFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            debug!("Loaded template {}", path.display());
            Ok(img.to_rgb8())
        }
        Some(path) => {
            warn!(
                "Template {} not found, using the default {} template",
                path.display(),
                layout.id()
            );
            Ok(default_template(layout, font))
        }
        None => Ok(default_template(layout, font)),
    }
}

/// The plain FAYDA template: flag bands, photo and QR frames, a footer.
pub fn default_template(layout: &TemplateLayout, font: Option<&FontVec>) -> RgbImage {
    let (w, h) = layout.canvas;
    let mut img = RgbImage::from_pixel(w, h, WHITE);

    fill(&mut img, 0, 0, w, 100, GREEN);
    fill(&mut img, 0, 100, w, 20, YELLOW);
    fill(&mut img, 0, 120, w, 20, RED);
    fill(&mut img, 0, h.saturating_sub(100), w, 100, GREEN);

    let (px, py) = layout.photo_position;
    frame(&mut img, px, py, layout.photo_size.0, layout.photo_size.1);
    let (qx, qy) = layout.qr_position;
    frame(&mut img, qx, qy, layout.qr_size, layout.qr_size);

    if let Some(font) = font {
        let scale = layout.font_scale;
        draw_text_mut(&mut img, WHITE, 40, 35, scale, font, "ETHIOPIAN DIGITAL ID CARD");
        draw_text_mut(
            &mut img,
            WHITE,
            40,
            h as i32 - 65,
            scale,
            font,
            "Government of Ethiopia - FAYDA National ID System",
        );
    }
    img
}

fn fill(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    if w > 0 && h > 0 {
        draw_filled_rect_mut(img, Rect::at(x as i32, y as i32).of_size(w, h), color);
    }
}

/// Placeholder box with a 3 px border; skipped when it does not fit `img`.
fn frame(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32) {
    let fits = x.checked_add(w).is_some_and(|r| r <= img.width())
        && y.checked_add(h).is_some_and(|b| b <= img.height());
    if !fits {
        debug!("Placeholder {}x{} at ({}, {}) is off the template", w, h, x, y);
        return;
    }
    fill(img, x, y, w, h, PLACEHOLDER);
    for inset in 0..3u32 {
        if w > 2 * inset && h > 2 * inset {
            let rect = Rect::at((x + inset) as i32, (y + inset) as i32)
                .of_size(w - 2 * inset, h - 2 * inset);
            draw_hollow_rect_mut(img, rect, BLACK);
        }
    }
}

// ── Font ─────────────────────────────────────────────────────────────────

/// Load the configured font, else the first system font that parses.
pub fn load_font(font_path: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = font_path {
        match read_font(path) {
            Some(font) => return Some(font),
            None => warn!("Font {} is unusable, trying system fonts", path.display()),
        }
    }

    for candidate in SYSTEM_FONTS {
        if let Some(font) = read_font(Path::new(candidate)) {
            debug!("Loaded system font: {}", candidate);
            return Some(font);
        }
    }
    None
}

fn read_font(path: &Path) -> Option<FontVec> {
    let data = fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

// ── Composition ──────────────────────────────────────────────────────────

/// Draw `record` and the page patches onto `template`.
///
/// `qr_region` is where the code was found on `page`. Every step that cannot
/// be carried out is skipped and reported in the returned issue list.
pub fn compose_card(
    template: RgbImage,
    record: &IdentityRecord,
    page: &RasterPage,
    qr_region: Region,
    font: Option<&FontVec>,
    layout: &TemplateLayout,
) -> (RgbImage, Vec<RenderIssue>) {
    let mut card = template;
    let mut issues = Vec::new();

    if let Some(crop) = layout.photo_crop {
        paste_patch(
            &mut card,
            page,
            "photo",
            crop,
            layout.photo_size,
            layout.photo_position,
            &mut issues,
        );
    }

    draw_lines(&mut card, record, font, layout, &mut issues);

    paste_patch(
        &mut card,
        page,
        "qr",
        qr_region,
        (layout.qr_size, layout.qr_size),
        layout.qr_position,
        &mut issues,
    );

    for issue in &issues {
        warn!("Card render issue: {}", issue);
    }
    (card, issues)
}

fn draw_lines(
    card: &mut RgbImage,
    record: &IdentityRecord,
    font: Option<&FontVec>,
    layout: &TemplateLayout,
    issues: &mut Vec<RenderIssue>,
) {
    if font.is_none() {
        issues.push(RenderIssue::FontUnavailable);
    }

    let (w, h) = (card.width() as i32, card.height() as i32);
    for (idx, line) in layout.lines.iter().enumerate() {
        // i32::MAX stands in for a line offset that overflowed
        let (x, y) = layout
            .line_position(idx)
            .unwrap_or((layout.text_origin.0, i32::MAX));
        if x < 0 || y < 0 || x >= w || y >= h {
            issues.push(RenderIssue::FieldOutOfBounds {
                field: line.field.key().to_string(),
                x,
                y,
            });
            continue;
        }
        let Some(font) = font else { continue };
        let value = layout.display_value(line.field, record.get(line.field));
        draw_text_mut(card, BLACK, x, y, layout.font_scale, font, &line.text(&value));
    }
}

fn paste_patch(
    card: &mut RgbImage,
    page: &RasterPage,
    patch: &str,
    crop: Region,
    size: (u32, u32),
    at: (u32, u32),
    issues: &mut Vec<RenderIssue>,
) {
    let Some(source) = page.crop(&crop) else {
        issues.push(RenderIssue::CropOutOfBounds {
            patch: patch.to_string(),
            left: crop.left,
            top: crop.top,
            right: crop.right,
            bottom: crop.bottom,
        });
        return;
    };

    let fits = at.0.checked_add(size.0).is_some_and(|r| r <= card.width())
        && at.1.checked_add(size.1).is_some_and(|b| b <= card.height());
    if !fits {
        issues.push(RenderIssue::PasteOutOfBounds {
            patch: patch.to_string(),
            x: at.0,
            y: at.1,
        });
        return;
    }

    let resized = imageops::resize(&source, size.0, size.1, FilterType::Lanczos3);
    imageops::replace(card, &resized, at.0 as i64, at.1 as i64);
    debug!("Pasted {} patch {} at {:?}", patch, crop, at);
}

// ── Output ───────────────────────────────────────────────────────────────

/// Write `card` as a PNG into `output_dir` and return its path.
///
/// Names are `fayda_id_{requester}_{timestamp}.png`. The file is opened with
/// `create_new`; if the name is taken a `-N` suffix is tried instead, so two
/// runs never write to the same file.
pub fn persist_card(
    card: &RgbImage,
    output_dir: &Path,
    requester_id: &str,
) -> Result<PathBuf, CardError> {
    let stem = format!(
        "fayda_id_{}_{}",
        sanitize_requester(requester_id),
        Local::now().format("%Y%m%d_%H%M%S_%6f")
    );
    persist_card_named(card, output_dir, &stem)
}

/// Write `card` as `{stem}.png`, or `{stem}-N.png` for the first free `N`.
pub fn persist_card_named(
    card: &RgbImage,
    output_dir: &Path,
    stem: &str,
) -> Result<PathBuf, CardError> {
    fs::create_dir_all(output_dir).map_err(|source| CardError::OutputWriteFailed {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let mut png = Vec::new();
    card.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| CardError::ImageEncodeFailed(e.to_string()))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.png")
        } else {
            format!("{stem}-{attempt}.png")
        };
        let path = output_dir.join(name);

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(CardError::OutputWriteFailed { path, source }),
        };
        file.write_all(&png)
            .and_then(|_| file.flush())
            .map_err(|source| CardError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;

        info!("Card written: {} ({} bytes)", path.display(), png.len());
        return Ok(path);
    }

    Err(CardError::OutputWriteFailed {
        path: output_dir.join(format!("{stem}.png")),
        source: std::io::Error::new(ErrorKind::AlreadyExists, "no free output name"),
    })
}

/// Keep only `[A-Za-z0-9_-]` from a requester id; empty becomes `anon`.
pub fn sanitize_requester(requester_id: &str) -> String {
    let clean: String = requester_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if clean.is_empty() {
        "anon".to_string()
    } else {
        clean
    }
}
