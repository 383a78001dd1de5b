//! Metadata adapter contract
//!
//! An adapter knows how to reach one kind of database; a connection extracts
//! a [`Snapshot`] of the objects in scope. Adapters normalize engine-specific
//! values into [`dbdrift_core::AttributeValue`] so the diff engine never has
//! to special-case an engine.

use dbdrift_core::{EndpointConfig, ObjectType, Snapshot};
use std::collections::BTreeSet;
use std::fmt;

/// Errors raised while connecting to or reading from a database
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Connection parameters for a database endpoint
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,

    /// Require an encrypted connection
    pub tls: bool,
}

impl Credentials {
    /// Read credentials from an endpoint's settings
    ///
    /// Accepts `user` or `username`, and `password` or `password_env`.
    /// `sslmode = "require"` (or `verify-ca`, `verify-full`) turns on TLS.
    pub fn from_endpoint(endpoint: &EndpointConfig) -> Result<Self, AdapterError> {
        let port = endpoint
            .setting("port")
            .map(|p| {
                p.parse::<u16>().map_err(|_| {
                    AdapterError::Configuration(format!("invalid port '{}' for {}", p, endpoint.label()))
                })
            })
            .transpose()?;

        Ok(Self {
            host: endpoint.setting("host").map(str::to_string),
            port,
            database: endpoint.setting("database").map(str::to_string),
            user: endpoint
                .setting("user")
                .or_else(|| endpoint.setting("username"))
                .map(str::to_string),
            password: endpoint.secret("password"),
            tls: matches!(
                endpoint.setting("sslmode"),
                Some("require") | Some("verify-ca") | Some("verify-full")
            ),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("tls", &self.tls)
            .finish()
    }
}

/// Which part of a database to extract
///
/// Empty sets mean "everything": all non-system schemas and every object
/// type the adapter supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractScope {
    pub schemas: BTreeSet<String>,
    pub object_types: BTreeSet<ObjectType>,
}

impl ExtractScope {
    /// Scope covering everything the adapter can see
    pub fn all() -> Self {
        Self::default()
    }

    /// Scope for a configured endpoint, optionally limited to some types
    pub fn for_endpoint(endpoint: &EndpointConfig, object_types: Option<&BTreeSet<ObjectType>>) -> Self {
        Self {
            schemas: endpoint.schemas.iter().cloned().collect(),
            object_types: object_types.cloned().unwrap_or_default(),
        }
    }

    pub fn with_schemas<S: Into<String>>(mut self, schemas: impl IntoIterator<Item = S>) -> Self {
        self.schemas.extend(schemas.into_iter().map(Into::into));
        self
    }

    pub fn with_types(mut self, object_types: impl IntoIterator<Item = ObjectType>) -> Self {
        self.object_types.extend(object_types);
        self
    }

    /// Whether objects in `schema` are in scope
    pub fn includes_schema(&self, schema: &str) -> bool {
        self.schemas.is_empty() || self.schemas.contains(schema)
    }

    /// Object types to extract given what the adapter supports
    ///
    /// Asking for a type outside `capabilities` is an error rather than a
    /// silently empty result.
    pub fn resolve_types(
        &self,
        engine: &str,
        capabilities: &BTreeSet<ObjectType>,
    ) -> Result<BTreeSet<ObjectType>, AdapterError> {
        if self.object_types.is_empty() {
            return Ok(capabilities.clone());
        }

        if let Some(missing) = self.object_types.iter().find(|t| !capabilities.contains(*t)) {
            return Err(AdapterError::Unsupported(format!(
                "{} adapter cannot extract {}",
                engine, missing
            )));
        }

        Ok(self.object_types.clone())
    }

    /// Cut a full snapshot down to this scope
    ///
    /// Every resolved type is present in the result, even when it holds no
    /// objects, and the result declares `capabilities`.
    pub fn select(
        &self,
        engine: &str,
        snapshot: &Snapshot,
        capabilities: &BTreeSet<ObjectType>,
    ) -> Result<Snapshot, AdapterError> {
        let types = self.resolve_types(engine, capabilities)?;
        let mut selected = snapshot.restrict(&self.schemas, &types);
        selected.capabilities = capabilities.clone();
        for object_type in types {
            selected.ensure_type(object_type);
        }
        Ok(selected)
    }
}

/// A kind of database that metadata can be extracted from
#[async_trait::async_trait]
pub trait MetadataAdapter: Send + Sync {
    /// Engine name (e.g. "postgres", "snapshot")
    fn engine(&self) -> &'static str;

    /// Object types this adapter can extract
    fn capabilities(&self) -> BTreeSet<ObjectType>;

    /// Open a connection
    ///
    /// Authentication and network problems surface as
    /// [`AdapterError::Connection`].
    async fn connect(&self, credentials: &Credentials) -> Result<Box<dyn MetadataConnection>, AdapterError>;
}

/// An open connection to one database
#[async_trait::async_trait]
pub trait MetadataConnection: Send + Sync {
    /// Extract the objects in scope into a snapshot
    async fn extract(&self, scope: &ExtractScope) -> Result<Snapshot, AdapterError>;

    /// Release the connection
    ///
    /// Safe to call more than once; later calls do nothing.
    async fn close(&mut self);
}
