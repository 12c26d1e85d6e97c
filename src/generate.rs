//! Card generation entry points.
//!
//! ## Why synchronous at the core?
//!
//! Every stage is CPU-bound (rasterise, scan, draw, encode) and the only I/O
//! is one PNG write at the end, so the pipeline is plain blocking code.
//! [`generate_card_async`] moves a run onto tokio's blocking pool for callers
//! that live on an async runtime, such as a bot transport.

use crate::config::CardConfig;
use crate::error::CardError;
use crate::output::{CardArtifact, CardOutput, GenerationStats, IdentityRecord};
use crate::pipeline::{decode, load, locate, normalize, render};
use crate::raster::{RasterPage, Region};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Generate an ID card PNG from the bytes of a FAYDA PDF.
///
/// # Returns
/// `Ok(CardOutput)` once the PNG is on disk, even if some drawing steps were
/// skipped (check `output.artifact.issues`).
///
/// # Errors
/// Returns `Err(CardError)` for fatal errors, and writes nothing:
/// - Input too large, not a PDF, encrypted, corrupt or empty
/// - No QR code in any candidate region
/// - QR payload is not a JSON object
/// - Template or output file could not be read or written
pub fn generate_card(
    pdf: &[u8],
    requester_id: &str,
    config: &CardConfig,
) -> Result<CardOutput, CardError> {
    let total_start = Instant::now();
    info!(
        "Generating card for {} ({} bytes, template {})",
        requester_id,
        pdf.len(),
        config.layout.id()
    );

    let raster_start = Instant::now();
    let page = load::load_first_page(pdf, config)?;
    let raster_duration_ms = raster_start.elapsed().as_millis() as u64;

    let mut output = run_from_page(&page, requester_id, config)?;
    output.stats.raster_duration_ms = raster_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Card ready in {}ms: {}",
        output.stats.total_duration_ms,
        output.artifact.path.display()
    );
    Ok(output)
}

/// Generate a card from an already rasterised page.
///
/// Skips loading; everything from region location onwards is the same as
/// [`generate_card`].
pub fn generate_card_from_page(
    page: &RasterPage,
    requester_id: &str,
    config: &CardConfig,
) -> Result<CardOutput, CardError> {
    let total_start = Instant::now();
    let mut output = run_from_page(page, requester_id, config)?;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Decode the identity record without drawing or writing a card.
///
/// Returns the record and the region the code was found in.
pub fn extract_identity(
    pdf: &[u8],
    config: &CardConfig,
) -> Result<(IdentityRecord, Region), CardError> {
    let page = load::load_first_page(pdf, config)?;
    let (record, region, _) = decode_page(&page, config)?;
    Ok((record, region))
}

/// Async wrapper around [`generate_card`].
///
/// Runs the blocking pipeline on `tokio::task::spawn_blocking`, so it must be
/// called from within a tokio runtime.
pub async fn generate_card_async(
    pdf: Vec<u8>,
    requester_id: impl Into<String>,
    config: CardConfig,
) -> Result<CardOutput, CardError> {
    let requester_id = requester_id.into();
    tokio::task::spawn_blocking(move || generate_card(&pdf, &requester_id, &config))
        .await
        .map_err(|e| CardError::Internal(format!("spawn_blocking panicked: {e}")))?
}

/// Read a PDF from disk and generate its card.
pub fn generate_card_from_file(
    path: impl AsRef<Path>,
    requester_id: &str,
    config: &CardConfig,
) -> Result<CardOutput, CardError> {
    let pdf = read_pdf(path.as_ref())?;
    generate_card(&pdf, requester_id, config)
}

/// Read a PDF file, mapping I/O failures onto document errors.
pub fn read_pdf(path: &Path) -> Result<Vec<u8>, CardError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => CardError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => CardError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => CardError::Internal(format!("cannot read '{}': {e}", path.display())),
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Steps 2–4: locate, decode, normalise. Returns the number of regions probed.
fn decode_page(
    page: &RasterPage,
    config: &CardConfig,
) -> Result<(IdentityRecord, Region, usize), CardError> {
    let candidates = locate::locate_candidates(page, &config.probe_strategies);
    let payload = decode::decode_first(page, &candidates, config.detector.as_ref())?;

    let probed = candidates
        .iter()
        .position(|r| *r == payload.region)
        .map_or(candidates.len(), |i| i + 1);

    let record = normalize::normalize_payload(&payload.text)?;
    Ok((record, payload.region, probed))
}

fn run_from_page(
    page: &RasterPage,
    requester_id: &str,
    config: &CardConfig,
) -> Result<CardOutput, CardError> {
    let decode_start = Instant::now();
    let (record, code_region, regions_probed) = decode_page(page, config)?;
    let decode_duration_ms = decode_start.elapsed().as_millis() as u64;
    debug!(
        "Decoded after {} regions in {}ms",
        regions_probed, decode_duration_ms
    );

    let render_start = Instant::now();
    let font = render::load_font(config.font_path.as_deref());
    let layout = &config.layout;
    let template = render::load_template(layout, font.as_ref())?;
    let (card, issues) =
        render::compose_card(template, &record, page, code_region, font.as_ref(), layout);
    let path = render::persist_card(&card, &config.output_dir, requester_id)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    Ok(CardOutput {
        artifact: CardArtifact {
            path,
            width: card.width(),
            height: card.height(),
            issues,
        },
        record,
        code_region,
        stats: GenerationStats {
            raster_duration_ms: 0,
            decode_duration_ms,
            render_duration_ms,
            total_duration_ms: 0,
            regions_probed,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FAYDA_QR_REGIONS;
    use crate::pipeline::decode::tests::qr_image;
    use crate::pipeline::decode::CodeDetector;
    use crate::pipeline::load::tests::MockRasterizer;
    use image::{GrayImage, Rgb, RgbImage};
    use std::sync::Arc;

    const PAYLOAD: &str = "{'fullName': 'Abebe Kebede', 'nationalId': '1234567890'}";

    /// Answers only for crops of one size; stands in for rqrr on blank pages.
    struct FixedDetector {
        size: (u32, u32),
        payload: &'static str,
    }

    impl CodeDetector for FixedDetector {
        fn detect(&self, image: &GrayImage) -> Option<String> {
            (image.dimensions() == self.size).then(|| self.payload.to_string())
        }
    }

    fn mock_config(dir: &Path, detector: FixedDetector) -> CardConfig {
        CardConfig::builder()
            .rasterizer(Arc::new(MockRasterizer::a4()))
            .detector(Arc::new(detector))
            .output_dir(dir)
            .build()
            .unwrap()
    }

    /// A white page with a real QR code drawn at (`x`, `y`).
    fn page_with_code(w: u32, h: u32, x: u32, y: u32, payload: &str) -> RasterPage {
        let code = qr_image(payload, 6);
        let mut img = RgbImage::from_pixel(w, h, Rgb([255, 255, 255]));
        for (cx, cy, px) in code.enumerate_pixels() {
            let v = px.0[0];
            img.put_pixel(x + cx, y + cy, Rgb([v, v, v]));
        }
        RasterPage::new(img, 200)
    }

    #[test]
    fn generates_card_from_pdf_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(
            dir.path(),
            FixedDetector {
                size: (450, 450),
                payload: PAYLOAD,
            },
        );

        let out = generate_card(b"%PDF-1.7 test", "12345", &config).unwrap();
        assert_eq!(out.record.name, "Abebe Kebede");
        assert_eq!(out.record.id, "1234567890");
        assert_eq!(out.record.phone, "N/A");
        assert_eq!(out.code_region, FAYDA_QR_REGIONS[0]);
        assert_eq!(out.stats.regions_probed, 1);
        assert!(out.artifact.path.exists());
        assert_eq!((out.artifact.width, out.artifact.height), (1500, 1000));
    }

    #[test]
    fn repeated_runs_give_same_record_and_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(
            dir.path(),
            FixedDetector {
                size: (450, 450),
                payload: PAYLOAD,
            },
        );

        let a = generate_card(b"%PDF-1.7", "7", &config).unwrap();
        let b = generate_card(b"%PDF-1.7", "7", &config).unwrap();
        assert_eq!(a.record, b.record);
        assert_ne!(a.artifact.path, b.artifact.path);
        assert!(a.artifact.path.exists() && b.artifact.path.exists());
    }

    #[test]
    fn no_code_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let config = mock_config(
            &out_dir,
            FixedDetector {
                size: (1, 1),
                payload: PAYLOAD,
            },
        );

        let err = generate_card(b"%PDF-1.7", "1", &config).unwrap_err();
        // 4 fixed regions, bottom-right quadrant, full page
        assert!(matches!(err, CardError::CodeNotFound { probed: 6 }));
        assert!(!out_dir.exists());
    }

    #[test]
    fn bad_payload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let config = mock_config(
            &out_dir,
            FixedDetector {
                size: (450, 450),
                payload: "https://fayda.et/verify/XYZ",
            },
        );

        let err = generate_card(b"%PDF-1.7", "1", &config).unwrap_err();
        assert!(matches!(err, CardError::PayloadFormat { .. }));
        assert!(!out_dir.exists());
    }

    #[test]
    fn document_errors_stop_before_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let config = CardConfig::builder()
            .rasterizer(Arc::new(MockRasterizer::empty()))
            .output_dir(dir.path())
            .build()
            .unwrap();
        let err = generate_card(b"%PDF-1.7", "1", &config).unwrap_err();
        assert!(matches!(err, CardError::EmptyDocument));
        assert!(err.is_document_error());
    }

    #[test]
    fn extract_identity_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = dir.path().join("out");
        let config = mock_config(
            &out_dir,
            FixedDetector {
                size: (450, 450),
                payload: PAYLOAD,
            },
        );

        let (record, region) = extract_identity(b"%PDF-1.7", &config).unwrap();
        assert_eq!(record.name, "Abebe Kebede");
        assert_eq!(region, FAYDA_QR_REGIONS[0]);
        assert!(!out_dir.exists());
    }

    #[test]
    fn real_code_is_found_and_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let config = CardConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let page = page_with_code(1653, 2339, 1250, 750, PAYLOAD);

        let out = generate_card_from_page(&page, "42", &config).unwrap();
        assert_eq!(out.record.name, "Abebe Kebede");
        assert_eq!(out.code_region, FAYDA_QR_REGIONS[0]);
        assert!(out.artifact.path.exists());
    }

    #[test]
    fn record_does_not_depend_on_which_region_matched() {
        let dir = tempfile::tempdir().unwrap();
        let config = CardConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();

        // Wholly inside region 1 vs wholly inside region 3 only.
        let first = page_with_code(1653, 2339, 1380, 760, PAYLOAD);
        let third = page_with_code(1653, 2339, 1010, 610, PAYLOAD);

        let a = generate_card_from_page(&first, "a", &config).unwrap();
        let b = generate_card_from_page(&third, "b", &config).unwrap();
        assert_eq!(a.code_region, FAYDA_QR_REGIONS[0]);
        assert_eq!(b.code_region, FAYDA_QR_REGIONS[2]);
        assert_eq!(a.record, b.record);
    }

    #[test]
    fn missing_file_is_reported() {
        let config = CardConfig::default();
        let err = generate_card_from_file("/no/such/file.pdf", "1", &config).unwrap_err();
        assert!(matches!(err, CardError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn async_wrapper_runs_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let config = mock_config(
            dir.path(),
            FixedDetector {
                size: (450, 450),
                payload: PAYLOAD,
            },
        );
        let out = generate_card_async(b"%PDF-1.7".to_vec(), "async", config)
            .await
            .unwrap();
        assert_eq!(out.record.id, "1234567890");
    }
}
