//! State shape normalizer.
//!
//! # Responsibility
//! - Coerce any loaded JSON value into a fully shaped [`Document`].
//! - Repair partial or malformed state instead of masking it with panics.
//!
//! # Invariants
//! - The returned document always has classes, an attendance map and
//!   `version >= 1`; no field is ever left absent.
//! - Normalization is idempotent: feeding a normalized document back in
//!   yields an equal document.

use crate::model::document::{
    now_stamp, AttendanceLog, AttendanceRecord, Class, Document, Person,
};
use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;

/// Coerces an arbitrary JSON value into a well-formed document.
///
/// Non-object input yields the default document. Object input keeps every
/// salvageable part and fills defaults for the rest, per field:
/// - `classes` not an array -> the five default classes; non-object elements
///   inside the array are dropped; a roster that is not an array becomes
///   empty.
/// - `attendance` not an object -> empty; non-object nesting levels dropped.
/// - missing/zero `version` -> 1; missing/empty `updatedAt` -> now.
pub fn normalize(value: Value) -> Document {
    let Value::Object(mut root) = value else {
        warn!("event=normalize module=model status=repair reason=not_an_object");
        return Document::default_document();
    };

    let classes = match root.remove("classes") {
        Some(Value::Array(items)) => normalize_classes(items),
        _ => Document::default_document().classes,
    };

    let attendance = match root.remove("attendance") {
        Some(Value::Object(dates)) => normalize_attendance(dates),
        _ => BTreeMap::new(),
    };

    let version = match root.get("version").and_then(Value::as_u64) {
        // Clamp rather than truncate: values past u32::MAX must not wrap
        // below 1.
        Some(version) if version >= 1 => u32::try_from(version).unwrap_or(u32::MAX),
        _ => 1,
    };

    let updated_at = match root.get("updatedAt").and_then(Value::as_str) {
        Some(stamp) if !stamp.is_empty() => stamp.to_string(),
        _ => now_stamp(),
    };

    Document {
        version,
        updated_at,
        classes,
        attendance,
    }
}

fn normalize_classes(items: Vec<Value>) -> Vec<Class> {
    items
        .into_iter()
        .filter_map(|item| {
            let Value::Object(mut fields) = item else {
                return None;
            };
            Some(Class {
                id: take_string(&mut fields, "id"),
                name: take_string(&mut fields, "name"),
                age_range: take_string(&mut fields, "ageRange"),
                teacher_name: take_string(&mut fields, "teacherName"),
                roster: match fields.remove("roster") {
                    Some(Value::Array(entries)) => normalize_roster(entries),
                    _ => Vec::new(),
                },
            })
        })
        .collect()
}

fn normalize_roster(entries: Vec<Value>) -> Vec<Person> {
    entries
        .into_iter()
        .filter_map(|entry| {
            let Value::Object(mut fields) = entry else {
                return None;
            };
            Some(Person {
                id: take_string(&mut fields, "id"),
                name: take_string(&mut fields, "name"),
                phone: match fields.remove("phone") {
                    Some(Value::String(phone)) => Some(phone),
                    _ => None,
                },
            })
        })
        .collect()
}

fn normalize_attendance(
    dates: serde_json::Map<String, Value>,
) -> AttendanceLog {
    let mut log = BTreeMap::new();
    for (date, by_class) in dates {
        let Value::Object(by_class) = by_class else {
            continue;
        };
        let mut classes = BTreeMap::new();
        for (class_id, by_person) in by_class {
            let Value::Object(by_person) = by_person else {
                continue;
            };
            let mut persons = BTreeMap::new();
            for (person_id, record) in by_person {
                let Value::Object(mut record) = record else {
                    continue;
                };
                persons.insert(
                    person_id,
                    AttendanceRecord {
                        present: record
                            .remove("present")
                            .and_then(|flag| flag.as_bool())
                            .unwrap_or(false),
                        note: match record.remove("note") {
                            Some(Value::String(note)) => Some(note),
                            _ => None,
                        },
                    },
                );
            }
            classes.insert(class_id, persons);
        }
        log.insert(date, classes);
    }
    log
}

fn take_string(fields: &mut serde_json::Map<String, Value>, key: &str) -> String {
    match fields.remove(key) {
        Some(Value::String(text)) => text,
        _ => String::new(),
    }
}
