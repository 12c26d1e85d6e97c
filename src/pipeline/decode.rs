//! Code decoding: probe candidate regions in order until one yields a payload.
//!
//! A FAYDA page carries exactly one relevant QR code, and each decode
//! attempt is expensive, so the first region that decodes wins and the rest
//! are never looked at.

use crate::error::CardError;
use crate::output::DecodedPayload;
use crate::raster::{RasterPage, Region};
use image::GrayImage;
use rqrr::PreparedImage;
use tracing::{debug, info};

/// Extracts a textual payload from a greyscale image.
///
/// Returns `None` when nothing decodable is found. Implementations must be
/// `Send + Sync`; one instance serves every run sharing a config.
pub trait CodeDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Option<String>;
}

/// [`CodeDetector`] backed by rqrr's finder-pattern search.
///
/// Returns the first grid that decodes. Bytes that are not valid UTF-8 are
/// replaced rather than rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDetector;

impl CodeDetector for RqrrDetector {
    fn detect(&self, image: &GrayImage) -> Option<String> {
        let (w, h) = image.dimensions();
        let mut prepared = PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
            image.get_pixel(x as u32, y as u32).0[0]
        });

        prepared.detect_grids().into_iter().find_map(|grid| {
            let mut bytes = Vec::new();
            match grid.decode_to(&mut bytes) {
                Ok(_) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    debug!("QR grid found but not decodable: {:?}", e);
                    None
                }
            }
        })
    }
}

/// Probe `regions` in order and return the first non-empty payload.
///
/// Regions that do not fit on the page are passed over. Fails with
/// [`CardError::CodeNotFound`] when every region comes up empty.
pub fn decode_first(
    page: &RasterPage,
    regions: &[Region],
    detector: &dyn CodeDetector,
) -> Result<DecodedPayload, CardError> {
    for (idx, region) in regions.iter().enumerate() {
        let Some(crop) = page.crop_luma(region) else {
            debug!("Area {} {} lies outside the page", idx + 1, region);
            continue;
        };

        match detector.detect(&crop) {
            Some(text) if !text.trim().is_empty() => {
                info!("QR found in area {}: {}", idx + 1, region);
                return Ok(DecodedPayload {
                    text,
                    region: *region,
                });
            }
            _ => debug!("Area {} {}: no code", idx + 1, region),
        }
    }

    Err(CardError::CodeNotFound {
        probed: regions.len(),
    })
}
