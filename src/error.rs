//! Error types for the fayda-card library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`CardError`]: **Fatal**. The run cannot produce a card at all (the PDF
//!   is unreadable, no QR code was found, the payload is not JSON). Returned
//!   as `Err(CardError)` from the top-level `generate*` functions.
//!
//! * [`RenderIssue`]: **Non-fatal**. One field or one image patch could not
//!   be drawn, but the rest of the card is fine. Stored inside
//!   [`crate::output::CardArtifact`] so callers can inspect a best-effort card
//!   rather than losing it to a missing font or a misplaced photo crop.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the fayda-card library.
///
/// Rendering problems use [`RenderIssue`] and are stored in
/// [`crate::output::CardArtifact`] rather than propagated here.
#[derive(Debug, Error)]
pub enum CardError {
    // ── Input / document errors ───────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The byte stream is bigger than the configured ceiling.
    #[error("PDF is {size} bytes, above the {limit}-byte limit")]
    InputTooLarge { size: usize, limit: usize },

    /// The byte stream does not start with the `%PDF` magic.
    #[error("Input is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    /// The document parsed but contains no pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// Rendering the first page at the configured DPI would exceed the pixel ceiling.
    #[error("Page renders to {width}x{height} px at {dpi} DPI, above the {limit} px limit")]
    PageTooLarge {
        width: u32,
        height: u32,
        dpi: u32,
        limit: u32,
    },

    /// pdfium-render returned an error while rasterising the page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
executable, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Code errors ───────────────────────────────────────────────────────
    /// No candidate region (including the full page) yielded a decodable code.
    #[error("QR code not found after probing {probed} regions")]
    CodeNotFound { probed: usize },

    // ── Payload errors ────────────────────────────────────────────────────
    /// The decoded text is not a JSON object even after lenient substitution.
    #[error("Invalid QR code data format: {detail} (payload starts with {preview:?})")]
    PayloadFormat { detail: String, preview: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// The configured template image exists but could not be opened.
    #[error("Failed to load card template '{path}': {detail}")]
    TemplateLoadFailed { path: PathBuf, detail: String },

    /// The card could not be PNG-encoded.
    #[error("Failed to encode card image: {0}")]
    ImageEncodeFailed(String),

    /// Could not create or write the output PNG.
    #[error("Failed to write card to '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of a [`CardError`], matching the pipeline stage
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    /// The PDF could not be read or rasterised.
    Document,
    /// No QR code in any candidate region.
    CodeNotFound,
    /// The QR payload is not a JSON object.
    PayloadFormat,
    /// Template loading or card persistence failed.
    Output,
    /// Invalid configuration.
    Config,
    Internal,
}

impl CardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CardError::FileNotFound { .. }
            | CardError::PermissionDenied { .. }
            | CardError::InputTooLarge { .. }
            | CardError::NotAPdf { .. }
            | CardError::CorruptPdf { .. }
            | CardError::PasswordRequired
            | CardError::WrongPassword
            | CardError::EmptyDocument
            | CardError::PageTooLarge { .. }
            | CardError::RasterisationFailed { .. }
            | CardError::PdfiumBindingFailed(_) => ErrorKind::Document,
            CardError::CodeNotFound { .. } => ErrorKind::CodeNotFound,
            CardError::PayloadFormat { .. } => ErrorKind::PayloadFormat,
            CardError::TemplateLoadFailed { .. }
            | CardError::ImageEncodeFailed(_)
            | CardError::OutputWriteFailed { .. } => ErrorKind::Output,
            CardError::InvalidConfig(_) => ErrorKind::Config,
            CardError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn is_document_error(&self) -> bool {
        self.kind() == ErrorKind::Document
    }

    /// Short message suitable for showing to the person who sent the PDF.
    ///
    /// The [`Display`](std::fmt::Display) output carries diagnostic detail for
    /// logs; this one does not.
    pub fn user_message(&self) -> String {
        match self {
            CardError::InputTooLarge { .. } => {
                "File too large! Please send a PDF under 20MB.".to_string()
            }
            CardError::PasswordRequired | CardError::WrongPassword => {
                "This PDF is password protected. Please send an unlocked copy.".to_string()
            }
            CardError::PdfiumBindingFailed(_) => {
                "The PDF engine is unavailable right now. Please try again later.".to_string()
            }
            _ if self.is_document_error() => {
                "Could not read the PDF. Please send a valid FAYDA PDF document.".to_string()
            }
            CardError::CodeNotFound { .. } => {
                "QR code not found in PDF. Please ensure PDF contains a QR code.".to_string()
            }
            CardError::PayloadFormat { detail, .. } => {
                format!("Invalid QR code data format: {detail}")
            }
            _ => "Processing error. Please try again.".to_string(),
        }
    }
}

/// A non-fatal problem while composing the card.
///
/// Stored in [`crate::output::CardArtifact::issues`]. The card is still
/// written; the affected field or patch is simply missing from it.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderIssue {
    /// No usable font was found, so no text was drawn.
    #[error("no font available; text fields were not drawn")]
    FontUnavailable,

    /// A text line would start outside the template canvas.
    #[error("field '{field}' at ({x}, {y}) lies outside the template")]
    FieldOutOfBounds { field: String, x: i32, y: i32 },

    /// A source crop lies outside the rasterised page.
    #[error("{patch} crop ({left}, {top}, {right}, {bottom}) lies outside the page")]
    CropOutOfBounds {
        patch: String,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
    },

    /// A patch does not fit at its paste position on the template.
    #[error("{patch} patch does not fit at ({x}, {y}) on the template")]
    PasteOutOfBounds { patch: String, x: u32, y: u32 },
}
