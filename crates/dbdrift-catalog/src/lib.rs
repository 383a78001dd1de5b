//! Metadata adapters for database drift detection
//!
//! Adapters connect to a database and extract a [`dbdrift_core::Snapshot`]
//! of its tables, views, routines, constraints, indexes and triggers.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support via tokio-postgres
//!
//! The snapshot-file and mock adapters are always available.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dbdrift_catalog::{adapter_for, Credentials, ExtractScope};
//!
//! let adapter = adapter_for(&endpoint)?;
//! let mut connection = adapter.connect(&Credentials::from_endpoint(&endpoint)?).await?;
//! let snapshot = connection.extract(&ExtractScope::for_endpoint(&endpoint, None)).await;
//! connection.close().await;
//! ```

pub mod adapter;
pub mod factory;
pub mod file;
pub mod mock;
pub mod postgres;

pub use adapter::{AdapterError, Credentials, ExtractScope, MetadataAdapter, MetadataConnection};
pub use factory::adapter_for;
pub use file::SnapshotFileAdapter;
pub use mock::{MockAdapter, MockAdapterBuilder};
pub use postgres::PostgresAdapter;
