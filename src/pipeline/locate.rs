//! Region location: expand probe strategies into concrete page rectangles.
//!
//! The locator never looks at pixels. It turns the configured
//! [`ProbeStrategy`] list into an ordered candidate list for the decoder,
//! dropping anything that does not fit on the page. Out-of-bounds candidates
//! are skipped rather than clamped: a clamped box is a different box, and
//! the hand-tuned coordinates only make sense at the size they were tuned for.

use crate::config::{Corner, ProbeStrategy};
use crate::raster::{RasterPage, Region};
use tracing::debug;

/// Ordered, de-duplicated candidate regions for `page`.
///
/// Always returns at least the full-page region.
pub fn locate_candidates(page: &RasterPage, strategies: &[ProbeStrategy]) -> Vec<Region> {
    let mut candidates: Vec<Region> = Vec::new();

    for strategy in strategies {
        for region in expand(strategy, page) {
            if !page.contains(&region) {
                debug!(
                    "Skipping region {} (outside {}x{} page)",
                    region,
                    page.width(),
                    page.height()
                );
                continue;
            }
            if !candidates.contains(&region) {
                candidates.push(region);
            }
        }
    }

    let full = page.full_region();
    if !candidates.contains(&full) {
        candidates.push(full);
    }

    debug!("{} candidate regions", candidates.len());
    candidates
}

/// Regions proposed by one strategy, before bounds filtering.
fn expand(strategy: &ProbeStrategy, page: &RasterPage) -> Vec<Region> {
    let (w, h) = (page.width(), page.height());
    match strategy {
        ProbeStrategy::Fixed(regions) => regions.clone(),
        ProbeStrategy::Relative {
            left,
            top,
            right,
            bottom,
        } => vec![Region::new(
            scale(*left, w),
            scale(*top, h),
            scale(*right, w),
            scale(*bottom, h),
        )],
        ProbeStrategy::Quadrant(corner) => {
            let (mid_x, mid_y) = (w / 2, h / 2);
            let region = match corner {
                Corner::TopLeft => Region::new(0, 0, mid_x, mid_y),
                Corner::TopRight => Region::new(mid_x, 0, w, mid_y),
                Corner::BottomLeft => Region::new(0, mid_y, mid_x, h),
                Corner::BottomRight => Region::new(mid_x, mid_y, w, h),
            };
            vec![region]
        }
        ProbeStrategy::FullPage => vec![page.full_region()],
    }
}

fn scale(fraction: f32, extent: u32) -> u32 {
    (fraction * extent as f32).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_probe_strategies, FAYDA_QR_REGIONS};
    use image::{Rgb, RgbImage};

    fn page(w: u32, h: u32) -> RasterPage {
        RasterPage::new(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])), 200)
    }

    #[test]
    fn out_of_bounds_region_is_skipped_not_clamped() {
        let p = page(1000, 1000);
        let outside = Region::new(1200, 700, 1650, 1150);
        let inside = Region::new(500, 500, 900, 900);
        let got = locate_candidates(&p, &[ProbeStrategy::Fixed(vec![outside, inside])]);

        assert!(!got.contains(&outside));
        assert_eq!(got, vec![inside, Region::new(0, 0, 1000, 1000)]);
    }

    #[test]
    fn full_page_is_always_present() {
        let p = page(300, 200);
        assert_eq!(locate_candidates(&p, &[]), vec![Region::new(0, 0, 300, 200)]);
    }

    #[test]
    fn full_page_is_not_duplicated() {
        let p = page(300, 200);
        let got = locate_candidates(&p, &[ProbeStrategy::FullPage, ProbeStrategy::FullPage]);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn default_order_on_fayda_page() {
        // A4 at 200 DPI
        let p = page(1653, 2339);
        let got = locate_candidates(&p, &default_probe_strategies());

        assert_eq!(&got[..4], &FAYDA_QR_REGIONS[..]);
        assert_eq!(got[4], Region::new(826, 1169, 1653, 2339));
        assert_eq!(got[5], Region::new(0, 0, 1653, 2339));
        assert_eq!(got.len(), 6);
    }

    #[test]
    fn small_page_keeps_only_fitting_fixed_regions() {
        let p = page(1300, 1000);
        let got = locate_candidates(&p, &[ProbeStrategy::Fixed(FAYDA_QR_REGIONS.to_vec())]);
        assert_eq!(got, vec![FAYDA_QR_REGIONS[3], Region::new(0, 0, 1300, 1000)]);
    }

    #[test]
    fn relative_and_quadrant_regions() {
        let p = page(1000, 800);
        let got = locate_candidates(
            &p,
            &[
                ProbeStrategy::Relative {
                    left: 0.5,
                    top: 0.25,
                    right: 1.0,
                    bottom: 0.75,
                },
                ProbeStrategy::Quadrant(Corner::TopLeft),
            ],
        );
        assert_eq!(got[0], Region::new(500, 200, 1000, 600));
        assert_eq!(got[1], Region::new(0, 0, 500, 400));
    }
}
