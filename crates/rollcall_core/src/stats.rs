//! Statistics engine over an attendance document snapshot.
//!
//! # Responsibility
//! - Derive by-date aggregates and per-person metrics on demand.
//! - Stay stateless: every query walks the full document, no caches.
//!
//! # Invariants
//! - Derivations never mutate the document.
//! - Dates with no classes and classes with no roster contribute zero
//!   without error.

use crate::model::document::Document;
use serde::Serialize;
use std::cmp::Ordering;

/// Consecutive most-recent absences at which the dropout alert fires.
pub const DROPOUT_STREAK_THRESHOLD: u32 = 3;

/// Present-count for one recorded date across all classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTally {
    pub date: String,
    pub present: u32,
}

/// Present-count for one class on the most recent recorded date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassTally {
    pub class_name: String,
    pub present: u32,
}

/// Derived attendance metrics for one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonMetrics {
    pub class_id: String,
    pub person_id: String,
    pub name: String,
    /// Number of distinct recorded dates in the whole document.
    pub weeks_total: u32,
    pub present_count: u32,
    pub last_attendance_date: Option<String>,
    /// Consecutive not-present dates counted backward from the most recent
    /// recorded date; equals `weeks_total` for a never-present person.
    pub current_absent_streak: u32,
    /// `round(present_count / weeks_total * 100)`, 0 when nothing recorded.
    pub attendance_percentage: u32,
    pub dropout_alert: bool,
}

/// Counts present records per date, ascending by date.
///
/// ISO date keys sort lexicographically in chronological order, so the
/// document's own key order is the series order.
pub fn by_date_series(document: &Document) -> Vec<DateTally> {
    document
        .attendance
        .iter()
        .map(|(date, by_class)| DateTally {
            date: date.clone(),
            present: by_class
                .values()
                .flat_map(|by_person| by_person.values())
                .filter(|record| record.present)
                .count() as u32,
        })
        .collect()
}

/// The by-date series sorted descending by count, stable on ties, for
/// strongest/weakest displays.
pub fn date_ranking(document: &Document) -> Vec<DateTally> {
    let mut ranking = by_date_series(document);
    ranking.sort_by(|a, b| b.present.cmp(&a.present));
    ranking
}

/// Per-class present counts for the most recent recorded date, in class
/// display order. Empty when nothing has been recorded yet.
pub fn last_date_breakdown(document: &Document) -> Vec<ClassTally> {
    let Some((_, by_class)) = document.attendance.iter().next_back() else {
        return Vec::new();
    };
    document
        .classes
        .iter()
        .map(|class| ClassTally {
            class_name: class.name.clone(),
            present: by_class
                .get(&class.id)
                .map_or(0, |by_person| {
                    by_person.values().filter(|record| record.present).count()
                }) as u32,
        })
        .collect()
}

/// Derives streak/percentage/alert metrics for every rostered person.
///
/// Sorted alerted-first, then by longer absence streak, then by name
/// (case-insensitive) as the final tiebreak.
pub fn person_metrics(document: &Document) -> Vec<PersonMetrics> {
    let dates: Vec<&String> = document.attendance.keys().collect();
    let weeks_total = dates.len() as u32;

    let mut metrics: Vec<PersonMetrics> = document
        .classes
        .iter()
        .flat_map(|class| {
            class.roster.iter().map(|person| {
                derive_for_person(
                    document,
                    &dates,
                    weeks_total,
                    &class.id,
                    &person.id,
                    &person.name,
                )
            })
        })
        .collect();

    metrics.sort_by(|a, b| {
        b.dropout_alert
            .cmp(&a.dropout_alert)
            .then(b.current_absent_streak.cmp(&a.current_absent_streak))
            .then_with(|| compare_names(&a.name, &b.name))
    });
    metrics
}

fn derive_for_person(
    document: &Document,
    dates: &[&String],
    weeks_total: u32,
    class_id: &str,
    person_id: &str,
    name: &str,
) -> PersonMetrics {
    let mut present_count = 0;
    let mut last_attendance_date = None;
    let mut current_absent_streak = 0;
    let mut streak_open = true;

    // Walk most recent -> oldest; the streak stops at the first present date.
    for date in dates.iter().rev() {
        let present = document
            .attendance
            .get(*date)
            .and_then(|by_class| by_class.get(class_id))
            .and_then(|by_person| by_person.get(person_id))
            .is_some_and(|record| record.present);
        if present {
            present_count += 1;
            if last_attendance_date.is_none() {
                last_attendance_date = Some((*date).clone());
            }
            streak_open = false;
        } else if streak_open {
            current_absent_streak += 1;
        }
    }

    let attendance_percentage = if weeks_total > 0 {
        (f64::from(present_count) / f64::from(weeks_total) * 100.0).round() as u32
    } else {
        0
    };

    PersonMetrics {
        class_id: class_id.to_string(),
        person_id: person_id.to_string(),
        name: name.to_string(),
        weeks_total,
        present_count,
        last_attendance_date,
        current_absent_streak,
        attendance_percentage,
        dropout_alert: current_absent_streak >= DROPOUT_STREAK_THRESHOLD,
    }
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{by_date_series, person_metrics};
    use crate::model::document::{Document, Person};
    use crate::ops::{add_person, set_presence};

    #[test]
    fn empty_document_produces_empty_series_and_metrics() {
        let doc = Document::default_document();
        assert!(by_date_series(&doc).is_empty());
        assert!(person_metrics(&doc).is_empty());
    }

    #[test]
    fn never_present_person_has_streak_equal_to_weeks_total() {
        let doc = add_person(
            &Document::default_document(),
            "primary",
            Person::new("Ada", None),
        )
        .expect("valid name should be accepted");
        let person_id = doc.classes[2].roster[0].id.clone();
        let doc = set_presence(&doc, "2025-01-05", "primary", &person_id, false);
        let doc = set_presence(&doc, "2025-01-12", "primary", &person_id, false);

        let metrics = person_metrics(&doc);
        assert_eq!(metrics[0].weeks_total, 2);
        assert_eq!(metrics[0].current_absent_streak, 2);
        assert!(!metrics[0].dropout_alert);
    }
}
