//! Integration tests for fayda-card.
//!
//! Most tests swap pdfium for an in-memory [`PageRasterizer`] that "renders"
//! a page with a real QR code on it, so the locate → decode → normalise →
//! render chain runs for real without a native library.
//!
//! Tests marked `pdfium_` build a PDF with pdfium itself and are gated
//! behind `PDFIUM_LIB_PATH`. Run with:
//!   PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test pipeline -- --nocapture

use fayda_card::{
    extract_identity, generate_card, CardConfig, CardError, Corner, ErrorKind, Field,
    PageRasterizer, ProbeStrategy, Region, RenderIssue, TemplateLayout, FAYDA_QR_REGIONS,
};
use image::{GrayImage, Luma, Rgb, RgbImage};
use qrcode::{Color, QrCode};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

const PAYLOAD: &str = r#"{"fullName": "Tigist Alemu", "dateOfBirth": "1992-03-14",
"gender": "Female", "FIN": "FIN-5566", "mobile": "+251911223344",
"residentialAddress": "Addis Ababa, Bole Sub-City, Woreda 03, House 1234",
"validUntil": "2031-12-31"}"#;

/// Skip this test unless a pdfium library path is configured.
macro_rules! pdfium_skip_unless_ready {
    () => {{
        if std::env::var("PDFIUM_LIB_PATH").is_err() {
            println!("SKIP: set PDFIUM_LIB_PATH to run pdfium tests");
            return;
        }
    }};
}

fn qr(payload: &str, module_px: u32) -> GrayImage {
    let code = QrCode::new(payload.as_bytes()).unwrap();
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let quiet = 4;
    let size = (modules + 2 * quiet) * module_px;
    GrayImage::from_fn(size, size, |x, y| {
        let (mx, my) = (x / module_px, y / module_px);
        let span = quiet..quiet + modules;
        if span.contains(&mx)
            && span.contains(&my)
            && colors[((my - quiet) * modules + (mx - quiet)) as usize] == Color::Dark
        {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Pretends every PDF is one A4 page with a QR code at a fixed pixel offset.
struct StampedPage {
    code: GrayImage,
    at: (u32, u32),
}

impl PageRasterizer for StampedPage {
    fn first_page_points(
        &self,
        _pdf: &[u8],
        _password: Option<&str>,
    ) -> Result<Option<(f32, f32)>, CardError> {
        Ok(Some((595.0, 842.0)))
    }

    fn render_first_page(
        &self,
        _pdf: &[u8],
        width: u32,
        height: u32,
        _password: Option<&str>,
    ) -> Result<RgbImage, CardError> {
        let mut img = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
        for (x, y, px) in self.code.enumerate_pixels() {
            let v = px.0[0];
            img.put_pixel(self.at.0 + x, self.at.1 + y, Rgb([v, v, v]));
        }
        Ok(img)
    }
}

fn config(out: &std::path::Path, at: (u32, u32)) -> fayda_card::CardConfigBuilder {
    CardConfig::builder()
        .output_dir(out)
        .rasterizer(Arc::new(StampedPage {
            code: qr(PAYLOAD, 4),
            at,
        }))
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

#[test]
fn card_from_code_in_first_region() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), (1250, 750)).build().unwrap();

    let out = generate_card(b"%PDF-1.4 stub", "5551234", &config).unwrap();
    let r = &out.record;
    assert_eq!(r.name, "Tigist Alemu");
    assert_eq!(r.dob, "1992-03-14");
    assert_eq!(r.sex, "Female");
    assert_eq!(r.id, "FIN-5566");
    assert_eq!(r.phone, "+251911223344");
    assert_eq!(r.expiry, "2031-12-31");
    assert_eq!(r.nationality, "Ethiopian");
    assert_eq!(
        r.address,
        "Addis Ababa, Bole Sub-City, Woreda 03, House 1234"
    );

    assert_eq!(out.code_region, FAYDA_QR_REGIONS[0]);
    let name = out.artifact.path.file_name().unwrap().to_string_lossy();
    assert!(name.starts_with("fayda_id_5551234_"), "{name}");

    let card = image::open(&out.artifact.path).unwrap().to_rgb8();
    assert_eq!(card.dimensions(), (1500, 1000));
    // QR patch: the top-left quiet zone lands at the layout's QR position
    assert_eq!(*card.get_pixel(1102, 702), Rgb([255, 255, 255]));
}

#[test]
fn every_record_has_all_fields() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), (1250, 750)).build().unwrap();
    let (record, _) = extract_identity(b"%PDF-1.4", &config).unwrap();

    let json = serde_json::to_value(&record).unwrap();
    let obj = json.as_object().unwrap();
    assert_eq!(obj.len(), 8);
    for field in Field::ALL {
        assert!(obj[field.key()].is_string(), "{field}");
    }
}

#[test]
fn code_outside_fixed_regions_is_found_by_quadrant() {
    let dir = tempfile::tempdir().unwrap();
    // bottom-right quadrant, below every fixed region
    let config = config(dir.path(), (1300, 1800)).build().unwrap();

    let out = generate_card(b"%PDF-1.4", "q", &config).unwrap();
    assert_eq!(out.code_region, Region::new(826, 1169, 1653, 2339));
    assert_eq!(out.stats.regions_probed, 5);
    assert_eq!(out.record.name, "Tigist Alemu");
}

#[test]
fn code_in_top_left_falls_back_to_full_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), (100, 100)).build().unwrap();

    let (record, region) = extract_identity(b"%PDF-1.4", &config).unwrap();
    assert_eq!(region, Region::new(0, 0, 1653, 2339));
    assert_eq!(record.id, "FIN-5566");
}

#[test]
fn custom_probe_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), (100, 100))
        .probe_strategies(vec![
            ProbeStrategy::Quadrant(Corner::TopLeft),
            ProbeStrategy::Fixed(FAYDA_QR_REGIONS.to_vec()),
        ])
        .build()
        .unwrap();

    let (_, region) = extract_identity(b"%PDF-1.4", &config).unwrap();
    assert_eq!(region, Region::new(0, 0, 826, 1169));
}

#[test]
fn no_code_means_no_card() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cards");
    let config = CardConfig::builder()
        .output_dir(&out)
        .rasterizer(Arc::new(StampedPage {
            code: GrayImage::from_pixel(10, 10, Luma([255])),
            at: (0, 0),
        }))
        .build()
        .unwrap();

    let err = generate_card(b"%PDF-1.4", "1", &config).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CodeNotFound);
    assert_eq!(
        err.user_message(),
        "QR code not found in PDF. Please ensure PDF contains a QR code."
    );
    assert!(!out.exists());
}

#[test]
fn not_a_pdf_is_rejected_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), (0, 0)).build().unwrap();
    let err = generate_card(b"\x89PNG\r\n", "1", &config).unwrap_err();
    assert!(matches!(err, CardError::NotAPdf { .. }));
}

#[test]
fn layout_json_and_template_file() {
    let dir = tempfile::tempdir().unwrap();

    let template = dir.path().join("template.png");
    RgbImage::from_pixel(1200, 800, Rgb([10, 20, 30]))
        .save(&template)
        .unwrap();
    let layout_path = dir.path().join("layout.json");
    std::fs::write(
        &layout_path,
        r#"{"version": "v2", "qr_position": [900, 500], "qr_size": 250, "photo_crop": null}"#,
    )
    .unwrap();

    let mut layout = TemplateLayout::from_json_file(&layout_path).unwrap();
    layout.template_path = Some(template);
    let config = config(&dir.path().join("out"), (1250, 750))
        .layout(layout)
        .font_path(dir.path().join("missing.ttf"))
        .build()
        .unwrap();

    let out = generate_card(b"%PDF-1.4", "layout", &config).unwrap();
    let card = image::open(&out.artifact.path).unwrap().to_rgb8();
    assert_eq!(card.dimensions(), (1200, 800));
    assert_eq!(*card.get_pixel(5, 5), Rgb([10, 20, 30]));
    assert_eq!(*card.get_pixel(902, 502), Rgb([255, 255, 255]));
    assert!(!out
        .artifact
        .issues
        .iter()
        .any(|i| matches!(i, RenderIssue::CropOutOfBounds { .. })));
}

// ── pdfium ───────────────────────────────────────────────────────────────────

/// One A4 page with the QR image placed inside the first FAYDA search region.
fn fayda_like_pdf(payload: &str) -> Vec<u8> {
    use pdfium_render::prelude::*;

    let pdfium = fayda_card::pipeline::load::bind_pdfium().unwrap();
    let mut document = pdfium.create_new_pdf().unwrap();
    let code = image::DynamicImage::ImageLuma8(qr(payload, 6));
    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .unwrap();
        // 1236..1597 px across and 750..1111 px down at 200 DPI
        page.objects_mut()
            .create_image_object(
                PdfPoints::new(445.0),
                PdfPoints::new(442.0),
                &code,
                Some(PdfPoints::new(130.0)),
                Some(PdfPoints::new(130.0)),
            )
            .unwrap();
    }
    document.save_to_bytes().unwrap()
}

#[test]
fn pdfium_end_to_end() {
    pdfium_skip_unless_ready!();
    let pdf = fayda_like_pdf(PAYLOAD);

    let dir = tempfile::tempdir().unwrap();
    let config = CardConfig::builder()
        .output_dir(dir.path())
        .build()
        .unwrap();

    let out = generate_card(&pdf, "pdfium", &config).unwrap();
    assert_eq!(out.record.name, "Tigist Alemu");
    assert_eq!(out.code_region, FAYDA_QR_REGIONS[0]);
    assert!(out.artifact.path.exists());
}

#[test]
fn pdfium_empty_document() {
    pdfium_skip_unless_ready!();
    let pdfium = fayda_card::pipeline::load::bind_pdfium().unwrap();
    let pdf = pdfium.create_new_pdf().unwrap().save_to_bytes().unwrap();

    let err = generate_card(&pdf, "empty", &CardConfig::default()).unwrap_err();
    assert!(matches!(err, CardError::EmptyDocument));
}

#[test]
fn pdfium_corrupt_document() {
    pdfium_skip_unless_ready!();
    let err = generate_card(b"%PDF-1.7\n%%garbage", "bad", &CardConfig::default()).unwrap_err();
    assert!(err.is_document_error(), "{err}");
}
