//! Configuration types for card generation.
//!
//! All pipeline behaviour is controlled through [`CardConfig`], built via its
//! [`CardConfigBuilder`]. The config is cheap to clone (the detector and
//! rasteriser are shared behind `Arc`) so one value can serve every request a
//! transport hands to the pipeline.

use crate::error::CardError;
use crate::layout::TemplateLayout;
use crate::pipeline::decode::{CodeDetector, RqrrDetector};
use crate::pipeline::load::{PageRasterizer, PdfiumRasterizer};
use crate::raster::Region;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// QR search areas on a FAYDA PDF rendered at 200 DPI, most likely first.
pub const FAYDA_QR_REGIONS: [Region; 4] = [
    Region::new(1200, 700, 1650, 1150),
    Region::new(1100, 650, 1550, 1100),
    Region::new(1000, 600, 1450, 1050),
    Region::new(800, 500, 1250, 950),
];

/// Configuration for one card-generation run.
///
/// Built via [`CardConfig::builder()`] or using [`CardConfig::default()`].
///
/// # Example
/// ```rust
/// use fayda_card::CardConfig;
///
/// let config = CardConfig::builder()
///     .dpi(200)
///     .output_dir("data/processed")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CardConfig {
    /// Rasterisation DPI for the first page. Range: 72–400. Default: 200.
    ///
    /// The QR search regions in [`FAYDA_QR_REGIONS`] are pixel coordinates at
    /// 200 DPI; changing the DPI without changing the regions moves them.
    pub dpi: u32,

    /// Largest allowed edge of the rendered page, in pixels. Default: 4800,
    /// enough for A4 and US Letter at the 400 DPI maximum.
    ///
    /// A page that would render larger fails with
    /// [`CardError::PageTooLarge`] instead of being allocated.
    pub max_rendered_pixels: u32,

    /// Largest accepted PDF, in bytes. Default: 20 MiB.
    pub max_input_bytes: usize,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Directory the card PNG is written to. Created on demand.
    pub output_dir: PathBuf,

    /// Card template geometry.
    pub layout: TemplateLayout,

    /// Ordered QR search strategies.
    pub probe_strategies: Vec<ProbeStrategy>,

    /// TrueType/OpenType font for card text. If None, common system fonts are tried.
    pub font_path: Option<PathBuf>,

    /// QR detector. Default: [`RqrrDetector`].
    pub detector: Arc<dyn CodeDetector>,

    /// PDF rasteriser. Default: [`PdfiumRasterizer`].
    pub rasterizer: Arc<dyn PageRasterizer>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_rendered_pixels: 4800,
            max_input_bytes: 20 * 1024 * 1024,
            password: None,
            output_dir: PathBuf::from("data/processed"),
            layout: TemplateLayout::default(),
            probe_strategies: default_probe_strategies(),
            font_path: None,
            detector: Arc::new(RqrrDetector),
            rasterizer: Arc::new(PdfiumRasterizer),
        }
    }
}

impl fmt::Debug for CardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("max_input_bytes", &self.max_input_bytes)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("output_dir", &self.output_dir)
            .field("layout", &self.layout.id())
            .field("probe_strategies", &self.probe_strategies)
            .field("font_path", &self.font_path)
            .field("detector", &"<dyn CodeDetector>")
            .field("rasterizer", &"<dyn PageRasterizer>")
            .finish()
    }
}

impl CardConfig {
    /// Create a new builder for `CardConfig`.
    pub fn builder() -> CardConfigBuilder {
        CardConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`CardConfig`].
#[derive(Debug)]
pub struct CardConfigBuilder {
    config: CardConfig,
}

impl CardConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn max_input_bytes(mut self, n: usize) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn layout(mut self, layout: TemplateLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.layout.template_path = Some(path.into());
        self
    }

    pub fn probe_strategies(mut self, strategies: Vec<ProbeStrategy>) -> Self {
        self.config.probe_strategies = strategies;
        self
    }

    pub fn font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.font_path = Some(path.into());
        self
    }

    pub fn detector(mut self, detector: Arc<dyn CodeDetector>) -> Self {
        self.config.detector = detector;
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = rasterizer;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CardConfig, CardError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(CardError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.max_input_bytes == 0 {
            return Err(CardError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        for strategy in &c.probe_strategies {
            strategy.validate()?;
        }
        c.layout.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// One way of proposing QR search regions.
///
/// Strategies are evaluated in list order. None of them look at pixel
/// content: they encode where the code sits on a known document family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProbeStrategy {
    /// Absolute pixel rectangles, probed in the order given.
    Fixed(Vec<Region>),
    /// A rectangle expressed as fractions (0.0–1.0) of the page size.
    Relative {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },
    /// One quarter of the page.
    Quadrant(Corner),
    /// The whole page, left to the detector's own finder-pattern search.
    FullPage,
}

impl ProbeStrategy {
    fn validate(&self) -> Result<(), CardError> {
        if let ProbeStrategy::Relative {
            left,
            top,
            right,
            bottom,
        } = *self
        {
            let in_unit = |v: f32| (0.0..=1.0).contains(&v);
            if !(in_unit(left) && in_unit(top) && in_unit(right) && in_unit(bottom))
                || left >= right
                || top >= bottom
            {
                return Err(CardError::InvalidConfig(format!(
                    "relative probe ({left}, {top}, {right}, {bottom}) must satisfy \
                     0 ≤ left < right ≤ 1 and 0 ≤ top < bottom ≤ 1"
                )));
            }
        }
        Ok(())
    }
}

/// Page quadrant selector for [`ProbeStrategy::Quadrant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// FAYDA search areas, then the bottom-right quadrant, then the whole page.
pub fn default_probe_strategies() -> Vec<ProbeStrategy> {
    vec![
        ProbeStrategy::Fixed(FAYDA_QR_REGIONS.to_vec()),
        ProbeStrategy::Quadrant(Corner::BottomRight),
        ProbeStrategy::FullPage,
    ]
}
