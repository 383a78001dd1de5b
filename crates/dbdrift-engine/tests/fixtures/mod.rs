//! Snapshot fixtures for diff engine tests
//!
//! Records follow the canonical shapes the bundled adapters emit.

#![allow(dead_code)]

use dbdrift_core::{AttributeValue, ObjectRecord, ObjectType, Snapshot};
use serde_json::json;

/// Build a record from a JSON object literal
pub fn record(value: serde_json::Value) -> ObjectRecord {
    match AttributeValue::from(value) {
        AttributeValue::Mapping(entries) => entries,
        other => panic!("fixture must be a JSON object, got {}", other.kind()),
    }
}

/// `public.users` with id and name columns
pub fn users_table() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "id", "data_type": "int", "nullable": false, "max_length": null},
            {"column": "name", "data_type": "varchar", "nullable": true, "max_length": 255},
        ]
    }))
}

/// `public.users` with an extra email column
pub fn users_table_with_email() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "id", "data_type": "int", "nullable": false, "max_length": null},
            {"column": "name", "data_type": "varchar", "nullable": true, "max_length": 255},
            {"column": "email", "data_type": "varchar", "nullable": true, "max_length": 320},
        ]
    }))
}

pub fn orders_table() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "id", "data_type": "bigint", "nullable": false, "max_length": null},
            {"column": "user_id", "data_type": "int", "nullable": false, "max_length": null},
        ]
    }))
}

pub fn active_users_view() -> ObjectRecord {
    record(json!({"definition": "SELECT id, name FROM public.users WHERE active"}))
}

pub fn routine(definition: &str) -> ObjectRecord {
    record(json!({"type": "FUNCTION", "definition": definition}))
}

/// A small staging database: two tables, one view, one routine, one index
pub fn staging() -> Snapshot {
    let mut snapshot = Snapshot::with_capabilities(ObjectType::ALL);
    snapshot
        .insert(ObjectType::Table, "public.users", users_table())
        .insert(ObjectType::Table, "public.orders", orders_table())
        .insert(ObjectType::View, "public.active_users", active_users_view())
        .insert(ObjectType::Routine, "public.order_total", routine("RETURN SUM(amount)"))
        .insert(
            ObjectType::Index,
            "public.orders.orders_user_idx",
            record(json!({"columns": ["user_id"], "unique": false})),
        );
    snapshot.ensure_type(ObjectType::Trigger);
    snapshot
}

/// Production: email column added, orders dropped, view rewritten, audit table added
pub fn production() -> Snapshot {
    let mut snapshot = Snapshot::with_capabilities(ObjectType::ALL);
    snapshot
        .insert(ObjectType::Table, "public.users", users_table_with_email())
        .insert(
            ObjectType::Table,
            "public.audit_log",
            record(json!({"columns": [{"column": "id", "data_type": "bigint", "nullable": false, "max_length": null}]})),
        )
        .insert(
            ObjectType::View,
            "public.active_users",
            record(json!({"definition": "SELECT id, name, email FROM public.users WHERE active"})),
        )
        .insert(ObjectType::Routine, "public.order_total", routine("RETURN SUM(amount)"))
        .insert(
            ObjectType::Index,
            "public.orders.orders_user_idx",
            record(json!({"columns": ["user_id"], "unique": true})),
        );
    snapshot.ensure_type(ObjectType::Trigger);
    snapshot
}
