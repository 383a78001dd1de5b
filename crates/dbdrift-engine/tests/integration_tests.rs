//! End-to-end tests for the diff engine
//!
//! Covers the behavioural guarantees of `compare`: reflexivity, presence
//! symmetry, determinism, order insensitivity and type-mismatch safety,
//! plus the drift scenarios the tool is used for.

mod fixtures;

use dbdrift_core::{
    AttributeValue, CompareConfig, DefinitionHasher, DiffEntry, DiffValue, ObjectKey, ObjectType,
    Snapshot,
};
use dbdrift_engine::{compare, DiffEngine};
use fixtures::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::BTreeSet;

fn keys(items: &[&str]) -> BTreeSet<ObjectKey> {
    items.iter().map(|k| ObjectKey::from(*k)).collect()
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn reflexivity() {
    for snapshot in [staging(), production(), Snapshot::new()] {
        let report = compare(&snapshot, &snapshot, &CompareConfig::default()).unwrap();

        assert_eq!(report.object_types().collect::<BTreeSet<_>>(), snapshot.present_types());
        for (object_type, type_report) in report.iter() {
            assert!(type_report.missing_in_destination.is_empty(), "{}", object_type);
            assert!(type_report.extra_in_destination.is_empty(), "{}", object_type);
            assert!(type_report.mismatched.is_empty(), "{}", object_type);
            assert!(type_report.is_clean());
        }
    }
}

#[test]
fn presence_symmetry() {
    let (a, b) = (staging(), production());
    let forward = compare(&a, &b, &CompareConfig::default()).unwrap();
    let backward = compare(&b, &a, &CompareConfig::default()).unwrap();

    assert_eq!(
        forward.object_types().collect::<Vec<_>>(),
        backward.object_types().collect::<Vec<_>>()
    );
    for object_type in forward.object_types() {
        let f = forward.get(object_type).unwrap();
        let r = backward.get(object_type).unwrap();
        assert_eq!(f.missing_in_destination, r.extra_in_destination);
        assert_eq!(f.extra_in_destination, r.missing_in_destination);
    }
}

#[test]
fn determinism_regardless_of_insertion_order() {
    let forward = staging();

    let mut reversed = Snapshot::with_capabilities(ObjectType::ALL.iter().rev().copied());
    for (object_type, set) in forward.objects.iter().rev() {
        reversed.ensure_type(*object_type);
        for (key, record) in set.iter().rev() {
            let shuffled = record.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
            reversed.insert(*object_type, key.clone(), shuffled);
        }
    }

    let config = CompareConfig::default();
    let first = compare(&forward, &production(), &config).unwrap().to_json().unwrap();
    let second = compare(&forward, &production(), &config).unwrap().to_json().unwrap();
    let third = compare(&reversed, &production(), &config).unwrap().to_json().unwrap();

    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn order_insensitivity() {
    let mut source = Snapshot::new();
    source.insert(
        ObjectType::Index,
        "public.orders.orders_cover_idx",
        record(json!({"columns": ["user_id", "created_at", "status"]})),
    );
    let mut destination = Snapshot::new();
    destination.insert(
        ObjectType::Index,
        "public.orders.orders_cover_idx",
        record(json!({"columns": ["status", "user_id", "created_at"]})),
    );

    let report = compare(&source, &destination, &CompareConfig::default()).unwrap();
    assert!(report.get(ObjectType::Index).unwrap().is_clean());

    let ordered = CompareConfig::default().with_ordered_path("columns");
    let report = compare(&source, &destination, &ordered).unwrap();
    let indexes = report.get(ObjectType::Index).unwrap();
    assert_eq!(indexes.mismatched[0].diffs.len(), 3);
    assert_eq!(indexes.mismatched[0].diffs[0].path, "columns[0]");
}

#[test]
fn nested_order_insensitivity() {
    let mut source = Snapshot::new();
    source.insert(
        ObjectType::Table,
        "public.users",
        record(json!({"columns": [
            {"column": "id", "tags": ["pk", "serial"]},
            {"column": "email", "tags": [["lower", "trim"], "unique"]},
        ]})),
    );
    let mut destination = Snapshot::new();
    destination.insert(
        ObjectType::Table,
        "public.users",
        record(json!({"columns": [
            {"column": "email", "tags": ["unique", ["trim", "lower"]]},
            {"column": "id", "tags": ["serial", "pk"]},
        ]})),
    );

    let report = compare(&source, &destination, &CompareConfig::default()).unwrap();
    assert!(report.get(ObjectType::Table).unwrap().is_clean());

    // An ordered pattern below an unordered sequence still applies.
    let ordered = CompareConfig::default().with_ordered_path("columns[*].tags");
    let report = compare(&source, &destination, &ordered).unwrap();
    let tables = report.get(ObjectType::Table).unwrap();
    assert_eq!(tables.mismatched.len(), 1);
    assert_eq!(tables.mismatched[0].diffs[0].path, "columns");
}

#[test]
fn type_mismatch_safety() {
    let mut source = Snapshot::new();
    source.insert(
        ObjectType::Trigger,
        "public.users.audit_trg",
        record(json!({"timing": {"when": "AFTER", "events": ["INSERT"]}})),
    );
    let mut destination = Snapshot::new();
    destination.insert(
        ObjectType::Trigger,
        "public.users.audit_trg",
        record(json!({"timing": "AFTER INSERT"})),
    );

    let report = compare(&source, &destination, &CompareConfig::default()).unwrap();
    let triggers = report.get(ObjectType::Trigger).unwrap();

    assert_eq!(triggers.mismatched.len(), 1);
    let diffs = &triggers.mismatched[0].diffs;
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].path, "timing");
    assert!(matches!(diffs[0].source_value, DiffValue::Present(AttributeValue::Mapping(_))));
    assert_eq!(diffs[0].destination_value, DiffValue::Present("AFTER INSERT".into()));
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn scenario_table_missing_in_destination() {
    let mut source = Snapshot::new();
    source.insert(ObjectType::Table, "public.users", users_table());
    let destination = Snapshot::new();

    let report = compare(&source, &destination, &CompareConfig::default()).unwrap();
    let tables = report.get(ObjectType::Table).unwrap();

    assert_eq!(tables.missing_in_destination, keys(&["public.users"]));
    assert!(tables.extra_in_destination.is_empty());
    assert!(tables.mismatched.is_empty());
    assert!(!tables.is_clean());
}

#[test]
fn scenario_extra_column_is_one_multiset_entry() {
    let mut source = Snapshot::new();
    source.insert(ObjectType::Table, "public.users", users_table());
    let mut destination = Snapshot::new();
    destination.insert(ObjectType::Table, "public.users", users_table_with_email());

    let report = compare(&source, &destination, &CompareConfig::default()).unwrap();
    let tables = report.get(ObjectType::Table).unwrap();

    assert_eq!(tables.mismatched.len(), 1);
    let users = &tables.mismatched[0];
    assert_eq!(users.object, ObjectKey::from("public.users"));
    assert_eq!(
        users.diffs,
        vec![DiffEntry::changed(
            "columns",
            users_table()["columns"].clone(),
            users_table_with_email()["columns"].clone(),
        )]
    );

    let source_columns = users.diffs[0].source_value.value().and_then(AttributeValue::as_sequence).unwrap();
    let destination_columns = users.diffs[0]
        .destination_value
        .value()
        .and_then(AttributeValue::as_sequence)
        .unwrap();
    let only_in_destination: Vec<_> = destination_columns
        .iter()
        .filter(|c| !source_columns.contains(c))
        .collect();
    assert_eq!(only_in_destination.len(), 1);
    assert_eq!(only_in_destination[0].as_mapping().unwrap()["column"], "email".into());
}

#[test]
fn scenario_empty_snapshots_are_clean() {
    let source = Snapshot::with_capabilities(ObjectType::ALL);
    let destination = Snapshot::with_capabilities(ObjectType::ALL);
    let config = CompareConfig::default().with_enabled_types(ObjectType::ALL);

    let report = compare(&source, &destination, &config).unwrap();

    assert_eq!(report.object_types().count(), ObjectType::ALL.len());
    for (_, type_report) in report.iter() {
        assert!(type_report.clean);
        assert!(type_report.missing_in_destination.is_empty());
        assert!(type_report.extra_in_destination.is_empty());
        assert!(type_report.mismatched.is_empty());
    }
    assert!(report.is_clean());

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(
        json["routines"],
        json!({"missing_in_destination": [], "extra_in_destination": [], "mismatched": [], "clean": true})
    );
}

#[test]
fn scenario_digest_is_advisory() {
    fn colliding(_: &str) -> String {
        "f".repeat(64)
    }

    let body = "BEGIN\n  RETURN (SELECT SUM(amount) FROM orders);\nEND";
    let tampered = "BEGIN\n  RETURN (SELECT SUM(amount) FROM refunds);\nEND";
    let hasher = DefinitionHasher::new(0).with_digest_fn(colliding);
    assert_eq!(hasher.digest(body), hasher.digest(tampered));

    let engine = DiffEngine::new(CompareConfig::default()).unwrap().with_hasher(hasher);

    let mut source = Snapshot::new();
    source.insert(ObjectType::Routine, "public.order_total", routine(body));

    let mut same = Snapshot::new();
    same.insert(ObjectType::Routine, "public.order_total", routine(body));
    assert!(engine.compare(&source, &same).unwrap().is_clean());

    let mut different = Snapshot::new();
    different.insert(ObjectType::Routine, "public.order_total", routine(tampered));
    let report = engine.compare(&source, &different).unwrap();
    let routines = report.get(ObjectType::Routine).unwrap();
    assert!(!routines.is_clean());
    assert_eq!(routines.mismatched[0].diffs[0].path, "definition");
}

#[test]
fn staging_vs_production_drift() {
    let report = compare(&staging(), &production(), &CompareConfig::default()).unwrap();

    let tables = report.get(ObjectType::Table).unwrap();
    assert_eq!(tables.missing_in_destination, keys(&["public.orders"]));
    assert_eq!(tables.extra_in_destination, keys(&["public.audit_log"]));
    assert_eq!(tables.mismatched.len(), 1);

    let views = report.get(ObjectType::View).unwrap();
    assert_eq!(views.mismatched[0].diffs[0].path, "definition");

    assert!(report.get(ObjectType::Routine).unwrap().is_clean());
    assert!(report.get(ObjectType::Trigger).unwrap().is_clean());

    let indexes = report.get(ObjectType::Index).unwrap();
    assert_eq!(
        indexes.mismatched[0].diffs,
        vec![DiffEntry::changed("unique", false.into(), true.into())]
    );

    let summary = report.summary();
    assert_eq!(summary.missing_in_destination, 1);
    assert_eq!(summary.extra_in_destination, 1);
    assert_eq!(summary.mismatched, 3);
    assert_eq!(summary.skipped, 0);
}

#[test]
fn inputs_are_not_mutated() {
    let (source, destination) = (staging(), production());
    let (source_before, destination_before) = (source.clone(), destination.clone());

    compare(&source, &destination, &CompareConfig::default()).unwrap();

    assert_eq!(source, source_before);
    assert_eq!(destination, destination_before);
}
