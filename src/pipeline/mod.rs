//! Pipeline stages for PDF-to-card generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the two heavy dependencies (pdfium and the QR
//! detector) sit behind traits that tests replace.
//!
//! ## Data Flow
//!
//! ```text
//! load ──▶ locate ──▶ decode ──▶ normalize ──▶ render
//! (pdfium)  (regions)  (rqrr)    (lenient JSON)  (template + PNG)
//! ```
//!
//! 1. [`load`]      validate the bytes and rasterise the first page
//! 2. [`locate`]    expand probe strategies into in-bounds candidate regions
//! 3. [`decode`]    try each candidate until a QR payload comes back
//! 4. [`normalize`] parse the payload and map aliased keys to card fields
//! 5. [`render`]    draw the record and page patches onto the template and
//!    write the PNG

pub mod decode;
pub mod load;
pub mod locate;
pub mod normalize;
pub mod render;
