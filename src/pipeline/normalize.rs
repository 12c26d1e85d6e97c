//! Payload normalisation: lenient JSON parse, then alias lookup.
//!
//! ## Why lenient?
//!
//! Some FAYDA QR codes carry a Python-literal dump rather than JSON:
//! single quotes, `None`, `True`, `False`. The payload is first tried as
//! strict JSON; only when that fails are the [`SUBSTITUTION_RULES`] applied,
//! in order, before a second parse. Trying strict first keeps valid payloads
//! with apostrophes in their values (`"O'Brien"`) intact.
//!
//! ## Why an alias table?
//!
//! Issuers spell the same key several ways (`fullName`, `full_name`,
//! `name`). [`FIELD_ALIASES`] lists them once per canonical field, and a
//! single lookup walks the list.

use crate::error::CardError;
use crate::output::{Field, IdentityRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

/// A textual rewrite applied to a payload that is not strict JSON.
pub struct SubstitutionRule {
    pub name: &'static str,
    pattern: &'static str,
    replacement: &'static str,
}

/// Rewrites that turn a Python-literal dict into JSON, in application order.
pub static SUBSTITUTION_RULES: &[SubstitutionRule] = &[
    SubstitutionRule {
        name: "single-quotes",
        pattern: r"'",
        replacement: "\"",
    },
    SubstitutionRule {
        name: "none-literal",
        pattern: r"\bNone\b",
        replacement: "null",
    },
    SubstitutionRule {
        name: "true-literal",
        pattern: r"\bTrue\b",
        replacement: "true",
    },
    SubstitutionRule {
        name: "false-literal",
        pattern: r"\bFalse\b",
        replacement: "false",
    },
];

static COMPILED_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    SUBSTITUTION_RULES
        .iter()
        .map(|rule| Regex::new(rule.pattern).unwrap())
        .collect()
});

/// Source keys for each canonical field, most preferred first.
pub static FIELD_ALIASES: &[(Field, &[&str])] = &[
    (Field::Name, &["fullName", "full_name", "name"]),
    (Field::Dob, &["dateOfBirth", "dob", "birthDate"]),
    (Field::Sex, &["sex", "gender", "Sex"]),
    (Field::Id, &["nationalId", "idNumber", "FIN", "id"]),
    (
        Field::Address,
        &["address", "residentialAddress", "Address"],
    ),
    (Field::Phone, &["phone", "phoneNumber", "mobile"]),
    (Field::Nationality, &["nationality"]),
    (Field::Expiry, &["expiryDate", "dateOfExpiry", "validUntil"]),
];

/// Characters of the payload kept in error messages.
const PREVIEW_CHARS: usize = 100;

/// Parse decoded QR text into an [`IdentityRecord`].
pub fn normalize_payload(text: &str) -> Result<IdentityRecord, CardError> {
    let object = parse_lenient(text)?;
    let record = record_from_object(&object);

    let name_preview: String = record.name.chars().take(20).collect();
    info!("Extracted data: {}... | ID: {}", name_preview, record.id);
    Ok(record)
}

/// Apply every substitution rule to `text`, in order.
pub fn apply_substitutions(text: &str) -> String {
    COMPILED_RULES
        .iter()
        .zip(SUBSTITUTION_RULES)
        .fold(text.to_string(), |acc, (re, rule)| {
            re.replace_all(&acc, rule.replacement).into_owned()
        })
}

/// Parse `text` as a JSON object, falling back to the substitution rules.
pub fn parse_lenient(text: &str) -> Result<Map<String, Value>, CardError> {
    let trimmed = text.trim();

    let value = match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => v,
        Err(strict_err) => {
            debug!("Payload is not strict JSON ({}), applying substitutions", strict_err);
            let rewritten = apply_substitutions(trimmed);
            serde_json::from_str::<Value>(&rewritten).map_err(|e| CardError::PayloadFormat {
                detail: e.to_string(),
                preview: preview(trimmed),
            })?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(CardError::PayloadFormat {
            detail: format!("expected a JSON object, got {}", json_type(&other)),
            preview: preview(trimmed),
        }),
    }
}

/// Build a record from a parsed payload object via [`FIELD_ALIASES`].
pub fn record_from_object(object: &Map<String, Value>) -> IdentityRecord {
    let mut record = IdentityRecord::default();
    for (field, aliases) in FIELD_ALIASES {
        if let Some(value) = lookup(object, aliases) {
            record.set(*field, value);
        }
    }
    record
}

/// First alias whose value is present, non-null and non-blank.
pub fn lookup(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|key| object.get(*key))
        .find_map(coerce)
}

/// String form of a JSON value, or `None` for null and blank strings.
fn coerce(value: &Value) -> Option<String> {
    let s = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    (!s.is_empty()).then_some(s)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
