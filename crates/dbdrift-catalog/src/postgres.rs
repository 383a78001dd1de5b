//! PostgreSQL metadata adapter
//!
//! Reads tables and views from `information_schema`, and routines,
//! constraints, indexes and triggers from `pg_catalog`. Works with
//! PostgreSQL 10+ and compatible engines that expose the same catalogs.
//!
//! Requires the `postgres` cargo feature; without it `connect` reports
//! [`AdapterError::Unsupported`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let adapter = PostgresAdapter::new();
//! let credentials = Credentials {
//!     host: Some("localhost".into()),
//!     database: Some("app".into()),
//!     user: Some("postgres".into()),
//!     password: Some("secret".into()),
//!     ..Credentials::default()
//! };
//! let mut connection = adapter.connect(&credentials).await?;
//! let snapshot = connection.extract(&ExtractScope::all().with_schemas(["public"])).await?;
//! connection.close().await;
//! ```
//!
//! Reference: https://www.postgresql.org/docs/current/catalogs.html

use crate::adapter::{AdapterError, Credentials, MetadataAdapter, MetadataConnection};
use dbdrift_core::{AttributeValue, ObjectRecord, ObjectType};
use std::collections::BTreeSet;

#[cfg(feature = "postgres")]
use crate::adapter::ExtractScope;

#[cfg(feature = "postgres")]
use dbdrift_core::{ObjectKey, Snapshot};

#[cfg(feature = "postgres")]
use tokio_postgres::{Client, NoTls};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

/// Default PostgreSQL port
pub const DEFAULT_PORT: u16 = 5432;

/// Schema filter shared by every query; `$1` is the list of schemas in
/// scope, empty for all user schemas.
#[cfg(feature = "postgres")]
const SCHEMA_FILTER: &str =
    "(cardinality($1::text[]) = 0 OR n.nspname = ANY($1::text[])) \
     AND n.nspname NOT IN ('pg_catalog', 'information_schema') \
     AND n.nspname NOT LIKE 'pg_toast%'";

/// PostgreSQL metadata adapter
#[derive(Debug, Clone, Default)]
pub struct PostgresAdapter;

impl PostgresAdapter {
    pub fn new() -> Self {
        Self
    }
}

/// Canonical constraint kind for a `pg_constraint.contype` code
pub fn constraint_kind(contype: &str) -> &'static str {
    match contype {
        "p" => "primary_key",
        "u" => "unique",
        "f" => "foreign_key",
        "c" => "check",
        "x" => "exclusion",
        _ => "other",
    }
}

/// `information_schema` reports nullability as `YES` / `NO`
pub fn is_nullable(flag: &str) -> bool {
    flag.eq_ignore_ascii_case("YES")
}

/// One entry of a table's `columns` sequence
pub fn column_value(name: &str, data_type: &str, nullable: bool, max_length: Option<i32>) -> AttributeValue {
    AttributeValue::mapping([
        ("column", AttributeValue::from(name)),
        ("data_type", AttributeValue::from(data_type)),
        ("nullable", AttributeValue::from(nullable)),
        ("max_length", AttributeValue::from(max_length)),
    ])
}

/// Record for a definition-only object (views)
pub fn definition_record(definition: Option<&str>) -> ObjectRecord {
    ObjectRecord::from([("definition".to_string(), AttributeValue::from(definition))])
}

/// Record for a routine
pub fn routine_record(routine_type: &str, definition: Option<&str>) -> ObjectRecord {
    ObjectRecord::from([
        ("type".to_string(), AttributeValue::from(routine_type.to_lowercase())),
        ("definition".to_string(), AttributeValue::from(definition)),
    ])
}

/// Record for a table constraint
pub fn constraint_record(contype: &str, definition: &str) -> ObjectRecord {
    ObjectRecord::from([
        ("type".to_string(), AttributeValue::from(constraint_kind(contype))),
        ("definition".to_string(), AttributeValue::from(definition)),
    ])
}

/// Record for an index
pub fn index_record(columns: Vec<String>, unique: bool) -> ObjectRecord {
    ObjectRecord::from([
        ("columns".to_string(), AttributeValue::sequence(columns)),
        ("unique".to_string(), AttributeValue::from(unique)),
    ])
}

/// Record for a trigger
pub fn trigger_record(definition: &str, disabled: bool) -> ObjectRecord {
    ObjectRecord::from([
        ("definition".to_string(), AttributeValue::from(definition)),
        ("disabled".to_string(), AttributeValue::from(disabled)),
    ])
}

#[async_trait::async_trait]
impl MetadataAdapter for PostgresAdapter {
    fn engine(&self) -> &'static str {
        "postgres"
    }

    fn capabilities(&self) -> BTreeSet<ObjectType> {
        ObjectType::ALL.into_iter().collect()
    }

    #[cfg(feature = "postgres")]
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn MetadataConnection>, AdapterError> {
        let host = credentials.host.clone().unwrap_or_else(|| "localhost".to_string());
        let port = credentials.port.unwrap_or(DEFAULT_PORT);

        let mut config = tokio_postgres::Config::new();
        config.host(&host).port(port);
        if let Some(database) = &credentials.database {
            config.dbname(database);
        }
        if let Some(user) = &credentials.user {
            config.user(user);
        }
        if let Some(password) = &credentials.password {
            config.password(password);
        }

        let endpoint = format!("{}:{}", host, port);
        let client = if credentials.tls {
            let connector = TlsConnector::builder()
                .build()
                .map_err(|e| AdapterError::Configuration(format!("Failed to create TLS connector: {}", e)))?;
            let (client, connection) = config
                .connect(MakeTlsConnector::new(connector))
                .await
                .map_err(|e| AdapterError::Connection(format!("{} (TLS): {}", endpoint, e)))?;
            spawn_connection(endpoint.clone(), connection);
            client
        } else {
            let (client, connection) = config
                .connect(NoTls)
                .await
                .map_err(|e| AdapterError::Connection(format!("{}: {}", endpoint, e)))?;
            spawn_connection(endpoint.clone(), connection);
            client
        };

        tracing::debug!(endpoint = %endpoint, tls = credentials.tls, "connected to PostgreSQL");

        Ok(Box::new(PostgresConnection {
            client: Some(client),
            endpoint,
        }))
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn MetadataConnection>, AdapterError> {
        Err(AdapterError::Unsupported(
            "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres".to_string(),
        ))
    }
}

/// Drive the connection in the background until the client is dropped
#[cfg(feature = "postgres")]
fn spawn_connection<F>(endpoint: String, connection: F)
where
    F: std::future::Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!(endpoint = %endpoint, error = %e, "PostgreSQL connection error");
        }
    });
}

/// Open PostgreSQL connection
#[cfg(feature = "postgres")]
pub struct PostgresConnection {
    client: Option<Client>,
    endpoint: String,
}

#[cfg(feature = "postgres")]
impl PostgresConnection {
    fn client(&self) -> Result<&Client, AdapterError> {
        self.client
            .as_ref()
            .ok_or_else(|| AdapterError::Connection(format!("connection to {} is closed", self.endpoint)))
    }

    async fn query(
        &self,
        object_type: ObjectType,
        sql: &str,
        schemas: &[String],
    ) -> Result<Vec<tokio_postgres::Row>, AdapterError> {
        let schemas = schemas.to_vec();
        self.client()?
            .query(sql, &[&schemas])
            .await
            .map_err(|e| AdapterError::Extraction(format!("reading {} from {}: {}", object_type, self.endpoint, e)))
    }

    async fn extract_tables(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        let sql = format!(
            "SELECT n.nspname::text, c.table_name::text, c.column_name::text, c.data_type::text, \
                    c.is_nullable::text, c.character_maximum_length::int \
             FROM information_schema.columns c \
             JOIN information_schema.tables t \
               ON t.table_schema = c.table_schema AND t.table_name = c.table_name \
             JOIN pg_namespace n ON n.nspname = c.table_schema \
             WHERE t.table_type = 'BASE TABLE' AND {} \
             ORDER BY c.table_schema, c.table_name, c.ordinal_position",
            SCHEMA_FILTER
        );

        let mut tables: std::collections::BTreeMap<ObjectKey, Vec<AttributeValue>> = Default::default();
        for row in self.query(ObjectType::Table, &sql, schemas).await? {
            let schema: String = row.get(0);
            let table: String = row.get(1);
            let nullable: String = row.get(4);
            tables
                .entry(ObjectKey::qualified(&schema, &table))
                .or_default()
                .push(column_value(row.get(2), row.get(3), is_nullable(&nullable), row.get(5)));
        }

        let set = snapshot.ensure_type(ObjectType::Table);
        for (key, columns) in tables {
            set.insert(key, ObjectRecord::from([("columns".to_string(), AttributeValue::Sequence(columns))]));
        }
        Ok(())
    }

    async fn extract_views(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        let sql = format!(
            "SELECT n.nspname::text, v.table_name::text, v.view_definition::text \
             FROM information_schema.views v \
             JOIN pg_namespace n ON n.nspname = v.table_schema \
             WHERE {}",
            SCHEMA_FILTER
        );

        let set = snapshot.ensure_type(ObjectType::View);
        for row in self.query(ObjectType::View, &sql, schemas).await? {
            let schema: String = row.get(0);
            let name: String = row.get(1);
            let definition: Option<String> = row.get(2);
            set.insert(ObjectKey::qualified(&schema, &name), definition_record(definition.as_deref()));
        }
        Ok(())
    }

    async fn extract_routines(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        // Overloads share a name; ordering by specific_name keeps the winner stable.
        let sql = format!(
            "SELECT n.nspname::text, r.routine_name::text, r.routine_type::text, r.routine_definition::text \
             FROM information_schema.routines r \
             JOIN pg_namespace n ON n.nspname = r.specific_schema \
             WHERE {} \
             ORDER BY r.specific_name",
            SCHEMA_FILTER
        );

        let set = snapshot.ensure_type(ObjectType::Routine);
        for row in self.query(ObjectType::Routine, &sql, schemas).await? {
            let schema: String = row.get(0);
            let name: String = row.get(1);
            let routine_type: Option<String> = row.get(2);
            let definition: Option<String> = row.get(3);
            set.insert(
                ObjectKey::qualified(&schema, &name),
                routine_record(routine_type.as_deref().unwrap_or("function"), definition.as_deref()),
            );
        }
        Ok(())
    }

    async fn extract_constraints(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        let sql = format!(
            "SELECT n.nspname::text, cl.relname::text, con.conname::text, con.contype::text, \
                    pg_get_constraintdef(con.oid) \
             FROM pg_constraint con \
             JOIN pg_class cl ON cl.oid = con.conrelid \
             JOIN pg_namespace n ON n.oid = cl.relnamespace \
             WHERE con.contype IN ('p', 'u', 'f', 'c', 'x') AND {}",
            SCHEMA_FILTER
        );

        let set = snapshot.ensure_type(ObjectType::Constraint);
        for row in self.query(ObjectType::Constraint, &sql, schemas).await? {
            let schema: String = row.get(0);
            let table: String = row.get(1);
            let name: String = row.get(2);
            let contype: String = row.get(3);
            let definition: String = row.get(4);
            set.insert(ObjectKey::child(&schema, &table, &name), constraint_record(&contype, &definition));
        }
        Ok(())
    }

    async fn extract_indexes(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        let sql = format!(
            "SELECT n.nspname::text, t.relname::text, i.relname::text, ix.indisunique, \
                    array_remove(array_agg(a.attname::text ORDER BY a.attnum), NULL) \
             FROM pg_index ix \
             JOIN pg_class i ON i.oid = ix.indexrelid \
             JOIN pg_class t ON t.oid = ix.indrelid \
             JOIN pg_namespace n ON n.oid = t.relnamespace \
             LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
             WHERE {} \
             GROUP BY n.nspname, t.relname, i.relname, ix.indisunique",
            SCHEMA_FILTER
        );

        let set = snapshot.ensure_type(ObjectType::Index);
        for row in self.query(ObjectType::Index, &sql, schemas).await? {
            let schema: String = row.get(0);
            let table: String = row.get(1);
            let name: String = row.get(2);
            set.insert(ObjectKey::child(&schema, &table, &name), index_record(row.get(4), row.get(3)));
        }
        Ok(())
    }

    async fn extract_triggers(&self, schemas: &[String], snapshot: &mut Snapshot) -> Result<(), AdapterError> {
        let sql = format!(
            "SELECT n.nspname::text, c.relname::text, tg.tgname::text, pg_get_triggerdef(tg.oid), \
                    tg.tgenabled = 'D' \
             FROM pg_trigger tg \
             JOIN pg_class c ON c.oid = tg.tgrelid \
             JOIN pg_namespace n ON n.oid = c.relnamespace \
             WHERE NOT tg.tgisinternal AND {}",
            SCHEMA_FILTER
        );

        let set = snapshot.ensure_type(ObjectType::Trigger);
        for row in self.query(ObjectType::Trigger, &sql, schemas).await? {
            let schema: String = row.get(0);
            let table: String = row.get(1);
            let name: String = row.get(2);
            let definition: String = row.get(3);
            set.insert(ObjectKey::child(&schema, &table, &name), trigger_record(&definition, row.get(4)));
        }
        Ok(())
    }
}

#[cfg(feature = "postgres")]
#[async_trait::async_trait]
impl MetadataConnection for PostgresConnection {
    async fn extract(&self, scope: &ExtractScope) -> Result<Snapshot, AdapterError> {
        let capabilities: BTreeSet<ObjectType> = ObjectType::ALL.into_iter().collect();
        let types = scope.resolve_types("postgres", &capabilities)?;
        let schemas: Vec<String> = scope.schemas.iter().cloned().collect();

        let mut snapshot = Snapshot::with_capabilities(capabilities);
        for object_type in types {
            match object_type {
                ObjectType::Table => self.extract_tables(&schemas, &mut snapshot).await?,
                ObjectType::View => self.extract_views(&schemas, &mut snapshot).await?,
                ObjectType::Routine => self.extract_routines(&schemas, &mut snapshot).await?,
                ObjectType::Constraint => self.extract_constraints(&schemas, &mut snapshot).await?,
                ObjectType::Index => self.extract_indexes(&schemas, &mut snapshot).await?,
                ObjectType::Trigger => self.extract_triggers(&schemas, &mut snapshot).await?,
            }

            tracing::debug!(
                endpoint = %self.endpoint,
                object_type = %object_type,
                objects = snapshot.objects_of(object_type).map_or(0, |set| set.len()),
                "extracted object type"
            );
        }

        Ok(snapshot)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            tracing::debug!(endpoint = %self.endpoint, "closed PostgreSQL connection");
        }
    }
}
