//! # fayda-card
//!
//! Turn a FAYDA national-ID PDF into a printable ID card image.
//!
//! ## Why this crate?
//!
//! The FAYDA PDF already carries everything a card needs: the holder's
//! photo, and a QR code whose payload is the identity record. Instead of
//! OCR-ing printed text this crate rasterises the first page, finds and
//! decodes the QR code, and lays the decoded record plus the photo and the
//! code itself onto a card template.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Load       size/magic checks, rasterise page 1 via pdfium
//!  ├─ 2. Locate     ordered candidate regions (fixed, quadrant, full page)
//!  ├─ 3. Decode     first region with a readable QR code wins
//!  ├─ 4. Normalize  lenient JSON parse, alias keys onto card fields
//!  └─ 5. Render     template + text + photo/QR patches → PNG on disk
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fayda_card::{generate_card_from_file, CardConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CardConfig::builder().output_dir("cards").build()?;
//!     let output = generate_card_from_file("fayda.pdf", "12345", &config)?;
//!     println!("{} -> {}", output.record.name, output.artifact.path.display());
//!     for issue in &output.artifact.issues {
//!         eprintln!("warning: {issue}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fayda-card` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding the library in a bot or service:
//! ```toml
//! fayda-card = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDFium
//!
//! Rasterisation binds to a pdfium shared library at run time. Set
//! `PDFIUM_LIB_PATH`, place the library next to the executable, or install
//! it system-wide.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod layout;
pub mod output;
pub mod pipeline;
pub mod raster;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CardConfig, CardConfigBuilder, Corner, ProbeStrategy, FAYDA_QR_REGIONS};
pub use error::{CardError, ErrorKind, RenderIssue};
pub use generate::{
    extract_identity, generate_card, generate_card_async, generate_card_from_file,
    generate_card_from_page,
};
pub use layout::{CardLine, TemplateLayout};
pub use output::{CardArtifact, CardOutput, DecodedPayload, Field, GenerationStats, IdentityRecord};
pub use pipeline::decode::{CodeDetector, RqrrDetector};
pub use pipeline::load::{PageRasterizer, PdfiumRasterizer};
pub use raster::{RasterPage, Region};
