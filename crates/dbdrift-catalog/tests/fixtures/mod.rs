//! Test fixtures for adapter integration tests
//!
//! Two small databases in the canonical record shapes: a staging database
//! and a production database that has drifted from it.

#![allow(dead_code)]

use dbdrift_catalog::{MockAdapter, MockAdapterBuilder};
use dbdrift_core::{AttributeValue, ObjectRecord, ObjectType};
use serde_json::json;

/// Build a record from a JSON object literal
pub fn record(value: serde_json::Value) -> ObjectRecord {
    match AttributeValue::from(value) {
        AttributeValue::Mapping(entries) => entries,
        other => panic!("fixture must be a JSON object, got {}", other.kind()),
    }
}

pub fn users_table() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "id", "data_type": "integer", "nullable": false, "max_length": null},
            {"column": "email", "data_type": "character varying", "nullable": false, "max_length": 320},
            {"column": "created_at", "data_type": "timestamp with time zone", "nullable": false, "max_length": null},
        ]
    }))
}

/// Production widened `email` and made it nullable
pub fn users_table_drifted() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "created_at", "data_type": "timestamp with time zone", "nullable": false, "max_length": null},
            {"column": "id", "data_type": "integer", "nullable": false, "max_length": null},
            {"column": "email", "data_type": "character varying", "nullable": true, "max_length": 512},
        ]
    }))
}

pub fn billing_invoices_table() -> ObjectRecord {
    record(json!({
        "columns": [
            {"column": "id", "data_type": "bigint", "nullable": false, "max_length": null},
            {"column": "amount", "data_type": "numeric", "nullable": false, "max_length": null},
        ]
    }))
}

pub fn users_pkey() -> ObjectRecord {
    record(json!({"type": "primary_key", "definition": "PRIMARY KEY (id)"}))
}

pub fn users_email_idx(unique: bool) -> ObjectRecord {
    record(json!({"columns": ["email"], "unique": unique}))
}

pub fn audit_trigger(disabled: bool) -> ObjectRecord {
    record(json!({
        "definition": "CREATE TRIGGER users_audit AFTER UPDATE ON public.users FOR EACH ROW EXECUTE FUNCTION audit()",
        "disabled": disabled,
    }))
}

/// Staging: every type populated except routines
pub fn staging_adapter() -> MockAdapter {
    MockAdapterBuilder::new()
        .with_name("mock-staging")
        .with_object(ObjectType::Table, "public.users", users_table())
        .with_object(ObjectType::Table, "billing.invoices", billing_invoices_table())
        .with_object(ObjectType::View, "public.recent_users", record(json!({
            "definition": "SELECT id, email FROM users WHERE created_at > now() - interval '7 days'"
        })))
        .with_object(ObjectType::Constraint, "public.users.users_pkey", users_pkey())
        .with_object(ObjectType::Index, "public.users.users_email_idx", users_email_idx(true))
        .with_object(ObjectType::Trigger, "public.users.users_audit", audit_trigger(false))
        .build()
}

/// Production: drifted users table, no recent_users view, disabled trigger
pub fn production_adapter() -> MockAdapter {
    MockAdapterBuilder::new()
        .with_name("mock-production")
        .with_object(ObjectType::Table, "public.users", users_table_drifted())
        .with_object(ObjectType::Table, "billing.invoices", billing_invoices_table())
        .with_object(ObjectType::Constraint, "public.users.users_pkey", users_pkey())
        .with_object(ObjectType::Index, "public.users.users_email_idx", users_email_idx(false))
        .with_object(ObjectType::Trigger, "public.users.users_audit", audit_trigger(true))
        .build()
}
