//! Record Normalizer
//!
//! Coerces the loosely-typed incoming listing message into a typed view.
//! Structured fields may arrive as native JSON, as JSON-encoded strings, or
//! not at all; every optional field is normalized into [`Field`] so checks can
//! tell "nothing supplied" (`Absent`) from "garbage supplied" (`Malformed`).
//!
//! Normalization never fails on a malformed optional field. The only
//! record-level error is a missing or blank listing identifier.

use crate::error::{AuditError, AuditResult};
use chrono::{DateTime, Utc};
use listing_common::time::parse_instant;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Normalized optional field
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    /// Not supplied (missing key or JSON null)
    Absent,
    /// Supplied but unusable; carries the reason
    Malformed(String),
    /// Supplied and well-formed (possibly empty)
    Value(T),
}

impl<T> Field<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Field::Malformed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Absent => Field::Absent,
            Field::Malformed(reason) => Field::Malformed(reason),
            Field::Value(v) => Field::Value(f(v)),
        }
    }
}

impl Field<String> {
    /// Present value with surrounding whitespace removed, if non-blank
    pub fn non_blank(&self) -> Option<&str> {
        self.value().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

/// Weekly operating hours, keyed by day
///
/// Per-day entries are kept opaque; checks only care whether any exist.
pub type WeeklyHours = BTreeMap<String, Value>;

/// Postal address fields of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct AddressFields {
    pub address_lines: Field<Vec<String>>,
    pub locality: Field<String>,
    pub administrative_area: Field<String>,
    pub sublocality: Field<String>,
    pub postal_code: Field<String>,
    pub region_code: Field<String>,
}

impl Default for AddressFields {
    fn default() -> Self {
        Self {
            address_lines: Field::Absent,
            locality: Field::Absent,
            administrative_area: Field::Absent,
            sublocality: Field::Absent,
            postal_code: Field::Absent,
            region_code: Field::Absent,
        }
    }
}

/// Typed listing record, built fresh for every message
#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub listing_id: String,
    pub primary_category: Field<String>,
    pub additional_categories: Field<Vec<String>>,
    pub service_areas: Field<Vec<String>>,
    pub website_uri: Field<String>,
    pub regular_hours: Field<WeeklyHours>,
    pub description: Field<String>,
    pub posts_text: Field<String>,
    pub answers_text: Field<String>,
    pub address: AddressFields,
    pub review_timestamps: Field<Vec<DateTime<Utc>>>,
}

impl ListingRecord {
    /// Record with the given identifier and every optional field absent
    pub fn new(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            primary_category: Field::Absent,
            additional_categories: Field::Absent,
            service_areas: Field::Absent,
            website_uri: Field::Absent,
            regular_hours: Field::Absent,
            description: Field::Absent,
            posts_text: Field::Absent,
            answers_text: Field::Absent,
            address: AddressFields::default(),
            review_timestamps: Field::Absent,
        }
    }

    /// Normalize a raw JSON message body
    ///
    /// # Errors
    /// - `InvalidMessage` if the body is not a JSON object
    /// - `MissingIdentifier` if `gmb_id` is missing or blank
    pub fn from_json(body: &Value) -> AuditResult<Self> {
        if !body.is_object() {
            return Err(AuditError::InvalidMessage(format!(
                "expected a listing object, found {}",
                json_kind(body)
            )));
        }
        let raw: RawListing = serde_json::from_value(body.clone())
            .map_err(|e| AuditError::InvalidMessage(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Normalize an already-deserialized raw listing
    pub fn from_raw(raw: RawListing) -> AuditResult<Self> {
        let listing_id = identifier(raw.gmb_id).ok_or(AuditError::MissingIdentifier)?;

        Ok(Self {
            listing_id,
            primary_category: text_field(raw.primary_category),
            additional_categories: string_list_field(raw.additional_categories),
            service_areas: string_list_field(raw.service_areas),
            website_uri: text_field(raw.website_uri),
            regular_hours: hours_field(raw.regular_hours),
            description: text_field(raw.description),
            posts_text: free_text_field(raw.posts_text),
            answers_text: free_text_field(raw.answers_text),
            address: AddressFields {
                address_lines: address_lines_field(raw.address_lines),
                locality: text_field(raw.locality),
                administrative_area: text_field(raw.administrative_area),
                sublocality: text_field(raw.sublocality),
                postal_code: text_field(raw.postal_code),
                region_code: text_field(raw.region_code),
            },
            review_timestamps: timestamps_field(raw.reviews_dates),
        })
    }
}

/// Listing message exactly as received
///
/// Every field stays an untyped JSON value until normalization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListing {
    #[serde(default, alias = "listing_id")]
    pub gmb_id: Option<Value>,
    #[serde(default)]
    pub primary_category: Option<Value>,
    #[serde(default)]
    pub additional_categories: Option<Value>,
    #[serde(default)]
    pub service_areas: Option<Value>,
    #[serde(default)]
    pub website_uri: Option<Value>,
    #[serde(default)]
    pub regular_hours: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub posts_text: Option<Value>,
    #[serde(default)]
    pub answers_text: Option<Value>,
    #[serde(default)]
    pub address_lines: Option<Value>,
    #[serde(default)]
    pub locality: Option<Value>,
    #[serde(default)]
    pub administrative_area: Option<Value>,
    #[serde(default)]
    pub sublocality: Option<Value>,
    #[serde(default)]
    pub postal_code: Option<Value>,
    #[serde(default)]
    pub region_code: Option<Value>,
    #[serde(default, alias = "review_timestamps")]
    pub reviews_dates: Option<Value>,
}

// ============================================================================
// Field coercion
// ============================================================================

fn identifier(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_field(value: Option<Value>) -> Field<String> {
    match value {
        None | Some(Value::Null) => Field::Absent,
        Some(Value::String(s)) => Field::Value(s),
        Some(other) => Field::Malformed(format!("expected text, found {}", json_kind(&other))),
    }
}

fn string_list_field(value: Option<Value>) -> Field<Vec<String>> {
    match value {
        None | Some(Value::Null) => Field::Absent,
        Some(Value::Array(items)) => strings_from_array(items),
        Some(Value::String(encoded)) => {
            if encoded.trim().is_empty() {
                return Field::Value(Vec::new());
            }
            match serde_json::from_str::<Value>(&encoded) {
                Ok(Value::Array(items)) => strings_from_array(items),
                Ok(other) => Field::Malformed(format!(
                    "JSON-encoded value is {}, expected a list",
                    json_kind(&other)
                )),
                Err(e) => Field::Malformed(format!("invalid JSON-encoded list: {}", e)),
            }
        }
        Some(other) => Field::Malformed(format!("expected a list, found {}", json_kind(&other))),
    }
}

/// Address lines also accept a single plain-text line
fn address_lines_field(value: Option<Value>) -> Field<Vec<String>> {
    match value {
        Some(Value::String(s)) if !s.trim_start().starts_with('[') => {
            if s.trim().is_empty() {
                Field::Value(Vec::new())
            } else {
                Field::Value(vec![s])
            }
        }
        other => string_list_field(other),
    }
}

fn hours_field(value: Option<Value>) -> Field<WeeklyHours> {
    match value {
        None | Some(Value::Null) => Field::Absent,
        Some(Value::Object(map)) => Field::Value(map.into_iter().collect()),
        Some(Value::String(encoded)) => {
            if encoded.trim().is_empty() {
                return Field::Value(WeeklyHours::new());
            }
            match serde_json::from_str::<Value>(&encoded) {
                Ok(Value::Object(map)) => Field::Value(map.into_iter().collect()),
                Ok(other) => Field::Malformed(format!(
                    "JSON-encoded hours is {}, expected an object",
                    json_kind(&other)
                )),
                Err(e) => Field::Malformed(format!("invalid JSON-encoded hours: {}", e)),
            }
        }
        Some(other) => Field::Malformed(format!(
            "expected an hours object, found {}",
            json_kind(&other)
        )),
    }
}

/// Posts and answers: plain text, or a list of entries joined by newlines
fn free_text_field(value: Option<Value>) -> Field<String> {
    match value {
        Some(Value::Array(items)) => strings_from_array(items).map(|entries| entries.join("\n")),
        Some(Value::String(s)) if s.trim_start().starts_with('[') => {
            // Looks like a JSON-encoded list; fall back to plain text if it is not one
            match serde_json::from_str::<Vec<String>>(&s) {
                Ok(entries) => Field::Value(entries.join("\n")),
                Err(_) => Field::Value(s),
            }
        }
        other => text_field(other),
    }
}

fn timestamps_field(value: Option<Value>) -> Field<Vec<DateTime<Utc>>> {
    match string_list_field(value) {
        Field::Absent => Field::Absent,
        Field::Malformed(reason) => Field::Malformed(reason),
        Field::Value(raw) => {
            let mut parsed = Vec::with_capacity(raw.len());
            for entry in &raw {
                match parse_instant(entry) {
                    Some(instant) => parsed.push(instant),
                    None => {
                        return Field::Malformed(format!("unparseable review timestamp '{}'", entry))
                    }
                }
            }
            Field::Value(parsed)
        }
    }
}

fn strings_from_array(items: Vec<Value>) -> Field<Vec<String>> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s),
            other => {
                return Field::Malformed(format!(
                    "list element is {}, expected text",
                    json_kind(&other)
                ))
            }
        }
    }
    Field::Value(out)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
