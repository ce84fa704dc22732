use rollcall_core::{from_json_bytes, normalize, to_json_bytes, ExportError};
use serde_json::json;
use std::collections::HashSet;

#[test]
fn arbitrary_non_object_values_normalize_to_defaults() {
    for garbage in [json!(null), json!(false), json!(7.5), json!("state"), json!([])] {
        let doc = normalize(garbage);
        assert_eq!(doc.classes.len(), 5);
        let ids: HashSet<_> = doc.classes.iter().map(|class| class.id.as_str()).collect();
        assert_eq!(ids.len(), 5, "default class ids must be unique");
        assert!(doc.attendance.is_empty());
        assert!(doc.version >= 1);
        assert!(!doc.updated_at.is_empty());
    }
}

#[test]
fn partially_valid_object_keeps_salvageable_parts() {
    let doc = normalize(json!({
        "version": 2,
        "updatedAt": "2025-03-01T09:00:00.000Z",
        "classes": [
            { "id": "primary", "name": "Primary", "ageRange": "7-9", "teacherName": 4, "roster": "x" },
            null
        ],
        "attendance": 12
    }));

    assert_eq!(doc.version, 2);
    assert_eq!(doc.updated_at, "2025-03-01T09:00:00.000Z");
    assert_eq!(doc.classes.len(), 1);
    assert_eq!(doc.classes[0].teacher_name, "");
    assert!(doc.classes[0].roster.is_empty());
    assert!(doc.attendance.is_empty());
}

#[test]
fn classes_that_are_not_a_sequence_fall_back_to_defaults() {
    let doc = normalize(json!({ "classes": "oops", "attendance": {} }));
    assert_eq!(doc.classes.len(), 5);
}

#[test]
fn normalize_is_idempotent_over_the_public_round_trip() {
    let inputs = [
        json!(null),
        json!({ "classes": [], "attendance": { "2025-01-05": { "c": { "p": { "present": true } } } } }),
        json!({ "version": 9, "updatedAt": "2025-06-01T00:00:00.000Z" }),
    ];
    for input in inputs {
        let once = normalize(input);
        let twice = normalize(serde_json::to_value(&once).expect("document should serialize"));
        assert_eq!(once, twice);
    }
}

#[test]
fn export_then_import_round_trips_an_already_valid_document() {
    let doc = normalize(json!({
        "version": 1,
        "updatedAt": "2025-02-02T10:30:00.000Z",
        "classes": [{
            "id": "teens", "name": "Teens", "ageRange": "13-17",
            "teacherName": "Ms. Adler",
            "roster": [{ "id": "p1", "name": "Robin", "phone": "+1 555 0100" }]
        }],
        "attendance": { "2025-02-02": { "teens": { "p1": { "present": true, "note": "late" } } } }
    }));

    let bytes = to_json_bytes(&doc).expect("export should serialize");
    let imported = from_json_bytes(&bytes).expect("exported bytes should import");
    assert_eq!(imported, doc);
}

#[test]
fn import_rejects_unparseable_bytes() {
    let err = from_json_bytes(b"{definitely not json")
        .expect_err("syntactically invalid JSON should be rejected");
    assert!(matches!(err, ExportError::Parse(_)));
}
