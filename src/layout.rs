//! Card template layout: where each field and patch goes.
//!
//! Coordinates are tied to a named template version rather than baked into
//! the renderer, so a new card design is a new [`TemplateLayout`] value (or
//! JSON file), not a code change. [`TemplateLayout::fayda_v1`] carries the
//! coordinates of the FAYDA card the bot was built for.

use crate::error::CardError;
use crate::output::Field;
use crate::raster::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One text line on the card: which field, and the label printed before it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardLine {
    pub field: Field,
    /// Printed as `"{label} {value}"`; an empty label prints the bare value.
    #[serde(default)]
    pub label: String,
}

impl CardLine {
    pub fn new(field: Field, label: impl Into<String>) -> Self {
        Self {
            field,
            label: label.into(),
        }
    }

    /// The text drawn for `value`.
    pub fn text(&self, value: &str) -> String {
        if self.label.is_empty() {
            value.to_string()
        } else {
            format!("{} {}", self.label, value)
        }
    }
}

/// Geometry of a card template.
///
/// Deserialising fills any missing key from [`TemplateLayout::fayda_v1`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateLayout {
    pub name: String,
    pub version: String,

    /// Base bitmap. When `None`, or when the file is missing, a default
    /// template of `canvas` size is synthesised.
    pub template_path: Option<PathBuf>,

    /// `(width, height)` of the synthesised template.
    pub canvas: (u32, u32),

    /// Where the holder's photo sits on the rasterised source page.
    /// `None` disables the photo patch.
    pub photo_crop: Option<Region>,
    pub photo_position: (u32, u32),
    pub photo_size: (u32, u32),

    pub qr_position: (u32, u32),
    /// Edge length of the square QR patch.
    pub qr_size: u32,

    /// Top-left corner of the first text line.
    pub text_origin: (i32, i32),
    pub line_height: i32,
    pub font_scale: f32,

    /// Address values longer than this (in characters) are cut and suffixed
    /// with `...` on the card. The record keeps the full value.
    pub address_max_chars: usize,

    pub lines: Vec<CardLine>,
}

impl Default for TemplateLayout {
    fn default() -> Self {
        Self::fayda_v1()
    }
}

impl TemplateLayout {
    /// The FAYDA national-ID card layout (1500 × 1000 template).
    pub fn fayda_v1() -> Self {
        Self {
            name: "fayda".to_string(),
            version: "v1".to_string(),
            template_path: None,
            canvas: (1500, 1000),
            photo_crop: Some(Region::new(100, 250, 550, 850)),
            photo_position: (80, 180),
            photo_size: (300, 300),
            qr_position: (1100, 700),
            qr_size: 300,
            text_origin: (400, 200),
            line_height: 50,
            font_scale: 24.0,
            address_max_chars: 40,
            lines: vec![
                CardLine::new(Field::Name, ""),
                CardLine::new(Field::Dob, "DOB:"),
                CardLine::new(Field::Sex, "Gender:"),
                CardLine::new(Field::Expiry, "Expiry:"),
                CardLine::new(Field::Phone, "Phone:"),
                CardLine::new(Field::Nationality, "Nationality:"),
                CardLine::new(Field::Address, "Address:"),
                CardLine::new(Field::Id, "ID:"),
            ],
        }
    }

    /// Load a layout from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, CardError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CardError::InvalidConfig(format!("cannot read layout '{}': {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            CardError::InvalidConfig(format!("layout '{}' is not valid: {e}", path.display()))
        })
    }

    /// `"name/version"`, for logs.
    pub fn id(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    /// Top-left corner of text line `index`, or `None` if it overflows `i32`.
    pub fn line_position(&self, index: usize) -> Option<(i32, i32)> {
        let step = i32::try_from(index)
            .ok()
            .and_then(|i| self.line_height.checked_mul(i))?;
        let y = self.text_origin.1.checked_add(step)?;
        Some((self.text_origin.0, y))
    }

    /// Value as printed on the card; only the address is ever shortened.
    pub fn display_value(&self, field: Field, value: &str) -> String {
        if field == Field::Address {
            truncate_chars(value, self.address_max_chars)
        } else {
            value.to_string()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CardError> {
        if self.canvas.0 == 0 || self.canvas.1 == 0 {
            return Err(CardError::InvalidConfig(
                "template canvas must be non-empty".into(),
            ));
        }
        if self.qr_size == 0 || self.photo_size.0 == 0 || self.photo_size.1 == 0 {
            return Err(CardError::InvalidConfig(
                "patch sizes must be non-zero".into(),
            ));
        }
        check_patch("photo", self.photo_position, self.photo_size, self.canvas)?;
        check_patch(
            "qr",
            self.qr_position,
            (self.qr_size, self.qr_size),
            self.canvas,
        )?;
        if self.font_scale.is_nan() || self.font_scale <= 0.0 {
            return Err(CardError::InvalidConfig(format!(
                "font scale must be positive, got {}",
                self.font_scale
            )));
        }
        Ok(())
    }
}

/// Reject a patch that does not fit inside the canvas.
fn check_patch(
    patch: &str,
    at: (u32, u32),
    size: (u32, u32),
    canvas: (u32, u32),
) -> Result<(), CardError> {
    let fits = at.0.checked_add(size.0).is_some_and(|r| r <= canvas.0)
        && at.1.checked_add(size.1).is_some_and(|b| b <= canvas.1);
    if fits {
        Ok(())
    } else {
        Err(CardError::InvalidConfig(format!(
            "{patch} patch {}x{} at ({}, {}) does not fit the {}x{} canvas",
            size.0, size.1, at.0, at.1, canvas.0, canvas.1
        )))
    }
}

/// Cut `s` to `max` characters plus `...` when it is longer.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}
