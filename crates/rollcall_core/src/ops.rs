//! Mutation operations over the attendance document.
//!
//! # Responsibility
//! - Provide the only write path for document state.
//! - Keep every transform copy-on-write: callers always receive a new
//!   document and the input is never touched.
//!
//! # Invariants
//! - An effective change refreshes `updated_at`; a no-op (missing class or
//!   person) returns an unchanged copy with the old stamp.
//! - Removing a person cascades over every attendance record for that
//!   (class id, person id) pair across all dates.

use crate::model::document::{now_stamp, AttendanceRecord, Document, Person};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type OpResult = Result<Document, OpError>;

/// Validation failures at the mutation boundary.
///
/// Missing classes or persons are deliberately not errors; those calls are
/// silent no-ops per the store contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpError {
    /// Person name is empty or whitespace-only after trimming.
    EmptyPersonName,
}

impl Display for OpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPersonName => write!(f, "person name must not be empty"),
        }
    }
}

impl Error for OpError {}

/// Sets the teacher name for a class. No-op when the class is missing.
pub fn set_teacher(document: &Document, class_id: &str, name: &str) -> Document {
    let mut next = document.clone();
    let Some(class) = next.classes.iter_mut().find(|class| class.id == class_id) else {
        return next;
    };
    class.teacher_name = name.to_string();
    next.updated_at = now_stamp();
    next
}

/// Appends a person to a class roster. The person arrives with a generated
/// unique id; the name is trimmed here.
///
/// # Errors
/// - `OpError::EmptyPersonName` when the trimmed name is empty; the document
///   is not mutated.
pub fn add_person(document: &Document, class_id: &str, mut person: Person) -> OpResult {
    person.name = validated_name(&person.name)?;
    let mut next = document.clone();
    let Some(class) = next.classes.iter_mut().find(|class| class.id == class_id) else {
        return Ok(next);
    };
    class.roster.push(person);
    next.updated_at = now_stamp();
    Ok(next)
}

/// Renames a person. Same non-empty rule as [`add_person`]; no-op when the
/// person is missing.
pub fn rename_person(
    document: &Document,
    class_id: &str,
    person_id: &str,
    name: &str,
) -> OpResult {
    let name = validated_name(name)?;
    let mut next = document.clone();
    let Some(person) = find_person(&mut next, class_id, person_id) else {
        return Ok(next);
    };
    person.name = name;
    next.updated_at = now_stamp();
    Ok(next)
}

/// Removes a person from a roster and cascade-deletes every attendance
/// record for that (class id, person id) pair across all dates.
pub fn remove_person(document: &Document, class_id: &str, person_id: &str) -> Document {
    let mut next = document.clone();
    let Some(class) = next.classes.iter_mut().find(|class| class.id == class_id) else {
        return next;
    };
    let before = class.roster.len();
    class.roster.retain(|person| person.id != person_id);
    if class.roster.len() == before {
        return next;
    }

    for by_class in next.attendance.values_mut() {
        if let Some(by_person) = by_class.get_mut(class_id) {
            by_person.remove(person_id);
        }
    }
    next.updated_at = now_stamp();
    next
}

/// Updates a person's phone. No-op when the person is missing.
pub fn set_person_phone(
    document: &Document,
    class_id: &str,
    person_id: &str,
    phone: Option<String>,
) -> Document {
    let mut next = document.clone();
    let Some(person) = find_person(&mut next, class_id, person_id) else {
        return next;
    };
    person.phone = phone;
    next.updated_at = now_stamp();
    next
}

/// Sets the presence flag for one person on one date, creating the nested
/// date -> class -> person entry when absent.
pub fn set_presence(
    document: &Document,
    date: &str,
    class_id: &str,
    person_id: &str,
    present: bool,
) -> Document {
    let mut next = document.clone();
    record_entry(&mut next, date, class_id, person_id).present = present;
    next.updated_at = now_stamp();
    next
}

/// Sets the note for one person on one date with the same nested-creation
/// contract as [`set_presence`]. An empty note clears the field.
pub fn set_note(
    document: &Document,
    date: &str,
    class_id: &str,
    person_id: &str,
    note: &str,
) -> Document {
    let mut next = document.clone();
    let record = record_entry(&mut next, date, class_id, person_id);
    record.note = if note.is_empty() {
        None
    } else {
        Some(note.to_string())
    };
    next.updated_at = now_stamp();
    next
}

fn validated_name(name: &str) -> Result<String, OpError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        warn!("event=mutation module=ops status=rejected error_code=empty_person_name");
        return Err(OpError::EmptyPersonName);
    }
    Ok(trimmed.to_string())
}

fn find_person<'doc>(
    document: &'doc mut Document,
    class_id: &str,
    person_id: &str,
) -> Option<&'doc mut Person> {
    document
        .classes
        .iter_mut()
        .find(|class| class.id == class_id)?
        .roster
        .iter_mut()
        .find(|person| person.id == person_id)
}

fn record_entry<'doc>(
    document: &'doc mut Document,
    date: &str,
    class_id: &str,
    person_id: &str,
) -> &'doc mut AttendanceRecord {
    document
        .attendance
        .entry(date.to_string())
        .or_default()
        .entry(class_id.to_string())
        .or_default()
        .entry(person_id.to_string())
        .or_default()
}
