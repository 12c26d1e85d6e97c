//! Output types: the identity record, the rendered card, and run statistics.

use crate::error::RenderIssue;
use crate::raster::Region;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Value used for every field the payload does not carry.
pub const NOT_AVAILABLE: &str = "N/A";

/// Nationality assumed when the payload does not state one.
pub const DEFAULT_NATIONALITY: &str = "Ethiopian";

/// The eight canonical identity fields, in card order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Dob,
    Sex,
    Id,
    Address,
    Phone,
    Nationality,
    Expiry,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Name,
        Field::Dob,
        Field::Sex,
        Field::Id,
        Field::Address,
        Field::Phone,
        Field::Nationality,
        Field::Expiry,
    ];

    /// Canonical key used in serialised records.
    pub fn key(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Dob => "dob",
            Field::Sex => "sex",
            Field::Id => "id",
            Field::Address => "address",
            Field::Phone => "phone",
            Field::Nationality => "nationality",
            Field::Expiry => "expiry",
        }
    }

    /// Value stored when no alias of this field is present.
    pub fn default_value(self) -> &'static str {
        match self {
            Field::Nationality => DEFAULT_NATIONALITY,
            _ => NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Canonical identity fields extracted from a QR payload.
///
/// Every field is always present; absent source data shows up as
/// [`Field::default_value`], never as a missing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRecord {
    pub name: String,
    pub dob: String,
    pub sex: String,
    pub id: String,
    pub address: String,
    pub phone: String,
    pub nationality: String,
    pub expiry: String,
}

impl Default for IdentityRecord {
    fn default() -> Self {
        Self {
            name: Field::Name.default_value().to_string(),
            dob: Field::Dob.default_value().to_string(),
            sex: Field::Sex.default_value().to_string(),
            id: Field::Id.default_value().to_string(),
            address: Field::Address.default_value().to_string(),
            phone: Field::Phone.default_value().to_string(),
            nationality: Field::Nationality.default_value().to_string(),
            expiry: Field::Expiry.default_value().to_string(),
        }
    }
}

impl IdentityRecord {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Dob => &self.dob,
            Field::Sex => &self.sex,
            Field::Id => &self.id,
            Field::Address => &self.address,
            Field::Phone => &self.phone,
            Field::Nationality => &self.nationality,
            Field::Expiry => &self.expiry,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Name => &mut self.name,
            Field::Dob => &mut self.dob,
            Field::Sex => &mut self.sex,
            Field::Id => &mut self.id,
            Field::Address => &mut self.address,
            Field::Phone => &mut self.phone,
            Field::Nationality => &mut self.nationality,
            Field::Expiry => &mut self.expiry,
        };
        *slot = value;
    }

    /// `(field, value)` pairs in card order.
    pub fn entries(&self) -> impl Iterator<Item = (Field, &str)> + '_ {
        Field::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

/// Raw text decoded from a QR code and where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    pub region: Region,
}

/// A rendered card on disk.
///
/// The file is not removed automatically; the caller deletes it after
/// delivery with [`CardArtifact::remove`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardArtifact {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Non-fatal problems hit while composing the card.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<RenderIssue>,
}

impl CardArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` when every field and patch made it onto the card.
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }

    /// Delete the card file.
    pub fn remove(self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }
}

/// Timing and probing statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub raster_duration_ms: u64,
    pub decode_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
    /// Number of candidate regions handed to the decoder.
    pub regions_probed: usize,
}

/// Everything a successful run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardOutput {
    pub artifact: CardArtifact,
    pub record: IdentityRecord,
    /// Region the QR code was decoded from.
    pub code_region: Region,
    pub stats: GenerationStats,
}
