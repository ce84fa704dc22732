//! Attendance document aggregate.
//!
//! # Responsibility
//! - Define the `Document` root and its nested class/person/record shapes.
//! - Provide default-document construction and JSON export/import.
//!
//! # Invariants
//! - `updated_at` is an RFC 3339 UTC string with millisecond precision, so
//!   lexicographic comparison of two stamps is chronological comparison.
//! - The serialized field names (`updatedAt`, `ageRange`, `teacherName`) are
//!   the persisted schema and must not change without a version bump.

use chrono::{SecondsFormat, Utc};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Current document schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed cohort definitions: (id, name, age range).
///
/// Ids are stable storage keys; renaming a class must keep its id.
pub const DEFAULT_CLASSES: [(&str, &str, &str); 5] = [
    ("nursery", "Nursery", "0-3"),
    ("beginners", "Beginners", "4-6"),
    ("primary", "Primary", "7-9"),
    ("juniors", "Juniors", "10-12"),
    ("teens", "Teens", "13-17"),
];

static NON_DIGIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9]").expect("hard-coded pattern compiles"));

/// date-key -> class-id -> person-id -> record.
///
/// `BTreeMap` keeps date keys sorted; ISO date strings sort lexicographically
/// in chronological order, which the statistics engine relies on.
pub type AttendanceLog = BTreeMap<String, BTreeMap<String, BTreeMap<String, AttendanceRecord>>>;

/// Presence flag and optional note for one person on one date.
///
/// A record created through `set_note` alone has `present = false` and is
/// counted as an absence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default)]
    pub present: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// An individual tracked within exactly one class roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Unique within the owning class; generated as uuid-v4 text.
    pub id: String,
    /// Non-empty after trim; enforced at the mutation boundary.
    pub name: String,
    /// Free-form as entered. Use [`Person::dial_string`] for tel links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Person {
    /// Creates a person with a freshly generated stable id.
    pub fn new(name: impl Into<String>, phone: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            phone,
        }
    }

    /// Returns the phone reduced to a dialable form, or `None` when no phone
    /// is stored or nothing dialable remains.
    ///
    /// Keeps digits only, plus a single leading `+` when the entered value
    /// starts with one: `"+49 (171) 23-45"` -> `"+491712345"`.
    pub fn dial_string(&self) -> Option<String> {
        let raw = self.phone.as_deref()?.trim();
        let digits = NON_DIGIT.replace_all(raw, "");
        if digits.is_empty() {
            return None;
        }
        if raw.starts_with('+') {
            Some(format!("+{digits}"))
        } else {
            Some(digits.into_owned())
        }
    }
}

/// A fixed age-based cohort with a teacher and a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: String,
    pub name: String,
    pub age_range: String,
    /// May be empty; display-only.
    #[serde(default)]
    pub teacher_name: String,
    /// Insertion order is display order.
    #[serde(default)]
    pub roster: Vec<Person>,
}

/// Root aggregate: the single document persisted locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub version: u32,
    /// Last-mutation stamp; reconciliation tiebreak between local and remote.
    pub updated_at: String,
    pub classes: Vec<Class>,
    pub attendance: AttendanceLog,
}

impl Document {
    /// Returns the default document: the five fixed classes with empty
    /// teachers and rosters, no attendance, schema version 1.
    pub fn default_document() -> Self {
        Self {
            version: SCHEMA_VERSION,
            updated_at: now_stamp(),
            classes: DEFAULT_CLASSES
                .iter()
                .map(|(id, name, age_range)| Class {
                    id: (*id).to_string(),
                    name: (*name).to_string(),
                    age_range: (*age_range).to_string(),
                    teacher_name: String::new(),
                    roster: Vec::new(),
                })
                .collect(),
            attendance: BTreeMap::new(),
        }
    }

    /// Looks up a class by id.
    pub fn class(&self, class_id: &str) -> Option<&Class> {
        self.classes.iter().find(|class| class.id == class_id)
    }

    /// Looks up a person by (class id, person id).
    pub fn person(&self, class_id: &str, person_id: &str) -> Option<&Person> {
        self.class(class_id)?
            .roster
            .iter()
            .find(|person| person.id == person_id)
    }
}

/// Returns the current UTC time as an RFC 3339 string with millisecond
/// precision and `Z` suffix, e.g. `2025-01-02T00:00:00.000Z`.
pub fn now_stamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Export/import failures for the document wire format.
#[derive(Debug)]
pub enum ExportError {
    /// Input bytes are not syntactically valid JSON.
    Parse(serde_json::Error),
    /// The document failed to serialize (should not happen for valid state).
    Serialize(serde_json::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "document bytes are not valid JSON: {err}"),
            Self::Serialize(err) => write!(f, "document failed to serialize: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) | Self::Serialize(err) => Some(err),
        }
    }
}

/// Serializes the document to pretty JSON bytes for export.
pub fn to_json_bytes(document: &Document) -> ExportResult<Vec<u8>> {
    serde_json::to_vec_pretty(document).map_err(ExportError::Serialize)
}

/// Parses exported bytes and normalizes the result into a usable document.
///
/// # Errors
/// - Returns `ExportError::Parse` for syntactically invalid JSON. Shape
///   problems are not errors; the normalizer repairs them.
pub fn from_json_bytes(bytes: &[u8]) -> ExportResult<Document> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|err| {
        warn!("event=document_import module=model status=error error_code=parse_failed error={err}");
        ExportError::Parse(err)
    })?;
    Ok(super::normalize::normalize(value))
}

#[cfg(test)]
mod tests {
    use super::{now_stamp, Document, Person, DEFAULT_CLASSES};
    use std::collections::HashSet;

    #[test]
    fn default_document_has_five_unique_classes() {
        let doc = Document::default_document();
        assert_eq!(doc.classes.len(), DEFAULT_CLASSES.len());
        let ids: HashSet<_> = doc.classes.iter().map(|class| class.id.as_str()).collect();
        assert_eq!(ids.len(), doc.classes.len());
        assert!(doc.attendance.is_empty());
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn now_stamp_is_rfc3339_with_millis_and_z() {
        let stamp = now_stamp();
        assert!(stamp.ends_with('Z'));
        assert_eq!(stamp.len(), "2025-01-02T00:00:00.000Z".len());
    }

    #[test]
    fn dial_string_keeps_digits_and_leading_plus() {
        let person = Person::new("Ada", Some("+49 (171) 23-45".to_string()));
        assert_eq!(person.dial_string().as_deref(), Some("+491712345"));

        let local = Person::new("Ben", Some("0171 / 23 45".to_string()));
        assert_eq!(local.dial_string().as_deref(), Some("01712345"));
    }

    #[test]
    fn dial_string_without_digits_is_none() {
        let person = Person::new("Cleo", Some("n/a".to_string()));
        assert_eq!(person.dial_string(), None);
        let no_phone = Person::new("Dot", None);
        assert_eq!(no_phone.dial_string(), None);
    }
}
