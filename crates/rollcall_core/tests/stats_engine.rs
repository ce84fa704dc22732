use rollcall_core::{
    by_date_series, date_ranking, last_date_breakdown, normalize, person_metrics,
};
use serde_json::json;

#[test]
fn by_date_series_is_ascending_and_counts_empty_dates_as_zero() {
    let doc = normalize(json!({
        "classes": [],
        "attendance": {
            "2025-01-12": {},
            "2025-01-05": { "c1": { "p1": { "present": true } } }
        }
    }));

    let series = by_date_series(&doc);
    assert_eq!(series.len(), 2);
    assert_eq!((series[0].date.as_str(), series[0].present), ("2025-01-05", 1));
    assert_eq!((series[1].date.as_str(), series[1].present), ("2025-01-12", 0));
}

#[test]
fn date_ranking_is_descending_and_stable_on_ties() {
    let doc = normalize(json!({
        "classes": [],
        "attendance": {
            "2025-01-05": { "c1": { "p1": { "present": true } } },
            "2025-01-12": { "c1": { "p1": { "present": true }, "p2": { "present": true } } },
            "2025-01-19": { "c1": { "p2": { "present": true } } }
        }
    }));

    let ranking = date_ranking(&doc);
    assert_eq!(ranking[0].date, "2025-01-12");
    // Tie between 01-05 and 01-19 keeps ascending date order.
    assert_eq!(ranking[1].date, "2025-01-05");
    assert_eq!(ranking[2].date, "2025-01-19");
}

#[test]
fn last_date_breakdown_uses_the_greatest_date_in_class_order() {
    let doc = normalize(json!({
        "classes": [
            { "id": "primary", "name": "Primary", "ageRange": "7-9" },
            { "id": "teens", "name": "Teens", "ageRange": "13-17" }
        ],
        "attendance": {
            "2025-01-05": { "primary": { "a": { "present": true }, "b": { "present": true } } },
            "2025-01-12": { "teens": { "c": { "present": true }, "d": { "present": false } } }
        }
    }));

    let breakdown = last_date_breakdown(&doc);
    assert_eq!(breakdown.len(), 2);
    assert_eq!((breakdown[0].class_name.as_str(), breakdown[0].present), ("Primary", 0));
    assert_eq!((breakdown[1].class_name.as_str(), breakdown[1].present), ("Teens", 1));
}

#[test]
fn last_date_breakdown_is_empty_without_attendance() {
    let doc = normalize(json!(null));
    assert!(last_date_breakdown(&doc).is_empty());
}

#[test]
fn streak_stops_at_the_most_recent_present_date() {
    // Four recorded weeks: present on dates 1 and 3, absent on 2 and 4.
    let doc = normalize(json!({
        "classes": [{
            "id": "primary", "name": "Primary", "ageRange": "7-9",
            "roster": [{ "id": "ada", "name": "Ada" }]
        }],
        "attendance": {
            "2025-01-05": { "primary": { "ada": { "present": true } } },
            "2025-01-12": { "primary": { "ada": { "present": false } } },
            "2025-01-19": { "primary": { "ada": { "present": true } } },
            "2025-01-26": { "primary": { "ada": { "present": false } } }
        }
    }));

    let metrics = person_metrics(&doc);
    assert_eq!(metrics.len(), 1);
    let ada = &metrics[0];
    assert_eq!(ada.weeks_total, 4);
    assert_eq!(ada.present_count, 2);
    assert_eq!(ada.current_absent_streak, 1);
    assert_eq!(ada.attendance_percentage, 50);
    assert_eq!(ada.last_attendance_date.as_deref(), Some("2025-01-19"));
    assert!(!ada.dropout_alert);
}

#[test]
fn dropout_alert_fires_exactly_at_three_consecutive_absences() {
    for (weeks, expect_alert) in [(0u32, false), (1, false), (2, false), (3, true), (5, true)] {
        let mut attendance = serde_json::Map::new();
        for week in 0..weeks {
            attendance.insert(
                format!("2025-01-{:02}", week + 1),
                json!({ "primary": {} }),
            );
        }
        let doc = normalize(json!({
            "classes": [{
                "id": "primary", "name": "Primary", "ageRange": "7-9",
                "roster": [{ "id": "ada", "name": "Ada" }]
            }],
            "attendance": attendance
        }));

        let metrics = person_metrics(&doc);
        let ada = &metrics[0];
        assert_eq!(ada.current_absent_streak, weeks, "never-present streak equals weeks");
        assert_eq!(ada.dropout_alert, expect_alert, "alert boundary at {weeks} weeks");
        assert_eq!(ada.attendance_percentage, 0);
    }
}

#[test]
fn person_sort_is_alert_then_streak_then_name() {
    let doc = normalize(json!({
        "classes": [{
            "id": "primary", "name": "Primary", "ageRange": "7-9",
            "roster": [
                { "id": "p1", "name": "zoe" },
                { "id": "p2", "name": "Alice" },
                { "id": "p3", "name": "bob" }
            ]
        }],
        "attendance": {
            "2025-01-05": { "primary": { "p2": { "present": true }, "p3": { "present": true } } },
            "2025-01-12": { "primary": {} },
            "2025-01-19": { "primary": {} },
            "2025-01-26": { "primary": { "p3": { "present": true } } }
        }
    }));

    let metrics = person_metrics(&doc);
    // zoe: never present, streak 4, alerted. Alice: streak 3, alerted.
    // bob: present on the last date, streak 0.
    assert_eq!(metrics[0].name, "zoe");
    assert!(metrics[0].dropout_alert);
    assert_eq!(metrics[1].name, "Alice");
    assert!(metrics[1].dropout_alert);
    assert_eq!(metrics[2].name, "bob");
    assert!(!metrics[2].dropout_alert);
}

#[test]
fn case_insensitive_name_breaks_full_ties() {
    let doc = normalize(json!({
        "classes": [{
            "id": "primary", "name": "Primary", "ageRange": "7-9",
            "roster": [
                { "id": "p1", "name": "delta" },
                { "id": "p2", "name": "Charlie" }
            ]
        }],
        "attendance": { "2025-01-05": { "primary": {} } }
    }));

    let metrics = person_metrics(&doc);
    assert_eq!(metrics[0].name, "Charlie");
    assert_eq!(metrics[1].name, "delta");
}

#[test]
fn rounding_of_attendance_percentage_is_nearest_integer() {
    let doc = normalize(json!({
        "classes": [{
            "id": "primary", "name": "Primary", "ageRange": "7-9",
            "roster": [{ "id": "ada", "name": "Ada" }]
        }],
        "attendance": {
            "2025-01-05": { "primary": { "ada": { "present": true } } },
            "2025-01-12": { "primary": {} },
            "2025-01-19": { "primary": {} }
        }
    }));

    // 1 of 3 weeks -> 33.33 -> 33.
    assert_eq!(person_metrics(&doc)[0].attendance_percentage, 33);
}
