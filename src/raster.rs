//! Page bitmaps and the rectangles probed inside them.

use image::{imageops, GrayImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bitmap rendering of one PDF page.
///
/// Owned by a single pipeline run and dropped when the run completes.
#[derive(Debug, Clone)]
pub struct RasterPage {
    image: RgbImage,
    dpi: u32,
}

impl RasterPage {
    pub fn new(image: RgbImage, dpi: u32) -> Self {
        Self { image, dpi }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resolution the page was rasterised at.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The whole page as a [`Region`].
    pub fn full_region(&self) -> Region {
        Region::new(0, 0, self.width(), self.height())
    }

    /// `true` when `region` is non-empty and lies entirely inside the page.
    pub fn contains(&self, region: &Region) -> bool {
        !region.is_empty() && region.right <= self.width() && region.bottom <= self.height()
    }

    /// Copy out `region`, or `None` when it does not lie inside the page.
    pub fn crop(&self, region: &Region) -> Option<RgbImage> {
        if !self.contains(region) {
            return None;
        }
        Some(
            imageops::crop_imm(
                &self.image,
                region.left,
                region.top,
                region.width(),
                region.height(),
            )
            .to_image(),
        )
    }

    /// Greyscale copy of `region` for code detection.
    pub fn crop_luma(&self, region: &Region) -> Option<GrayImage> {
        self.crop(region).map(|rgb| imageops::grayscale(&rgb))
    }
}

/// Axis-aligned rectangle in page pixel coordinates.
///
/// `right` and `bottom` are exclusive, so `(0, 0, w, h)` covers a `w × h` page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Region {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.left, self.top, self.right, self.bottom
        )
    }
}
