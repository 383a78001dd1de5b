//! Mock metadata adapter for testing
//!
//! Serves a snapshot held in memory instead of querying a database. Useful
//! for exercising the comparison pipeline end to end and for simulating
//! slow or failing endpoints.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dbdrift_catalog::{Credentials, ExtractScope, MetadataAdapter, MockAdapter};
//! use dbdrift_core::ObjectType;
//!
//! let adapter = MockAdapter::new();
//! adapter.add_object(ObjectType::View, "public.active_users", record).await;
//!
//! let mut connection = adapter.connect(&Credentials::default()).await?;
//! let snapshot = connection.extract(&ExtractScope::all()).await?;
//! connection.close().await;
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! let adapter = MockAdapter::new().with_connection_failure();
//! assert!(adapter.connect(&Credentials::default()).await.is_err());
//!
//! let adapter = MockAdapter::new().with_latency(100); // 100ms per call
//! ```

use crate::adapter::{AdapterError, Credentials, ExtractScope, MetadataAdapter, MetadataConnection};
use dbdrift_core::{ObjectKey, ObjectRecord, ObjectType, Snapshot};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock metadata adapter
///
/// Clones share the same stored snapshot, so objects added through one
/// handle are visible to connections opened through another.
pub struct MockAdapter {
    /// Objects served by every connection
    snapshot: Arc<RwLock<Snapshot>>,

    /// Error returned by `extract`, if any
    extraction_error: Arc<RwLock<Option<AdapterError>>>,

    /// Object types this adapter claims to support
    capabilities: BTreeSet<ObjectType>,

    /// Simulate connection failure
    fail_connection: bool,

    /// Simulated latency per call (milliseconds)
    latency_ms: u64,

    /// Name to return from engine()
    engine_name: &'static str,

    /// Number of connections closed so far
    closed: Arc<AtomicUsize>,
}

impl MockAdapter {
    /// Create a mock adapter with no objects that supports every type
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::new())
    }

    /// Create a mock adapter serving a pre-built snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(snapshot)),
            extraction_error: Arc::new(RwLock::new(None)),
            capabilities: ObjectType::ALL.into_iter().collect(),
            fail_connection: false,
            latency_ms: 0,
            engine_name: "mock",
            closed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add or replace one object
    pub async fn add_object(&self, object_type: ObjectType, key: impl Into<ObjectKey>, record: ObjectRecord) {
        self.snapshot.write().await.insert(object_type, key, record);
    }

    /// Make every subsequent extraction fail with `error`
    pub async fn fail_extraction(&self, error: AdapterError) {
        *self.extraction_error.write().await = Some(error);
    }

    /// Clear a configured extraction error
    pub async fn clear_error(&self) {
        *self.extraction_error.write().await = None;
    }

    /// Restrict the object types this adapter supports
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = ObjectType>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Fail every connection attempt
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Delay every connect and extract call
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom engine name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.engine_name = name;
        self
    }

    /// Number of objects stored across all types
    pub async fn object_count(&self) -> usize {
        self.snapshot.read().await.object_count()
    }

    /// Number of connections that have been closed
    pub fn closed_connections(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    async fn simulate_latency(latency_ms: u64) {
        if latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(latency_ms)).await;
        }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAdapter {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            extraction_error: Arc::clone(&self.extraction_error),
            capabilities: self.capabilities.clone(),
            fail_connection: self.fail_connection,
            latency_ms: self.latency_ms,
            engine_name: self.engine_name,
            closed: Arc::clone(&self.closed),
        }
    }
}

#[async_trait::async_trait]
impl MetadataAdapter for MockAdapter {
    fn engine(&self) -> &'static str {
        self.engine_name
    }

    fn capabilities(&self) -> BTreeSet<ObjectType> {
        self.capabilities.clone()
    }

    async fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn MetadataConnection>, AdapterError> {
        Self::simulate_latency(self.latency_ms).await;

        if self.fail_connection {
            return Err(AdapterError::Connection("Simulated connection failure".to_string()));
        }

        Ok(Box::new(MockConnection {
            adapter: self.clone(),
            open: true,
        }))
    }
}

/// Connection handed out by [`MockAdapter`]
pub struct MockConnection {
    adapter: MockAdapter,
    open: bool,
}

#[async_trait::async_trait]
impl MetadataConnection for MockConnection {
    async fn extract(&self, scope: &ExtractScope) -> Result<Snapshot, AdapterError> {
        if !self.open {
            return Err(AdapterError::Connection("connection is closed".to_string()));
        }

        MockAdapter::simulate_latency(self.adapter.latency_ms).await;

        if let Some(error) = self.adapter.extraction_error.read().await.as_ref() {
            return Err(error.clone());
        }

        let snapshot = self.adapter.snapshot.read().await;
        scope.select(self.adapter.engine_name, &snapshot, &self.adapter.capabilities)
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.adapter.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Builder for a [`MockAdapter`] with several objects
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockAdapterBuilder::new()
///     .with_object(ObjectType::Table, "public.users", users)
///     .with_object(ObjectType::View, "public.active_users", active_users)
///     .with_latency(50)
///     .build();
/// ```
pub struct MockAdapterBuilder {
    snapshot: Snapshot,
    capabilities: Option<BTreeSet<ObjectType>>,
    fail_connection: bool,
    latency_ms: u64,
    engine_name: &'static str,
}

impl MockAdapterBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot::new(),
            capabilities: None,
            fail_connection: false,
            latency_ms: 0,
            engine_name: "mock",
        }
    }

    /// Add one object
    pub fn with_object(mut self, object_type: ObjectType, key: impl Into<ObjectKey>, record: ObjectRecord) -> Self {
        self.snapshot.insert(object_type, key, record);
        self
    }

    /// Register a type as present without adding objects
    pub fn with_empty_type(mut self, object_type: ObjectType) -> Self {
        self.snapshot.ensure_type(object_type);
        self
    }

    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = ObjectType>) -> Self {
        self.capabilities = Some(capabilities.into_iter().collect());
        self
    }

    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.engine_name = name;
        self
    }

    pub fn build(self) -> MockAdapter {
        let mut adapter = MockAdapter::from_snapshot(self.snapshot)
            .with_latency(self.latency_ms)
            .with_name(self.engine_name);
        if let Some(capabilities) = self.capabilities {
            adapter = adapter.with_capabilities(capabilities);
        }
        if self.fail_connection {
            adapter = adapter.with_connection_failure();
        }
        adapter
    }
}

impl Default for MockAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
