//! Snapshot file adapter
//!
//! Treats a snapshot JSON written earlier (by `dbdrift snapshot`) as a
//! database. Lets one side of a comparison be a frozen baseline.

use crate::adapter::{AdapterError, Credentials, ExtractScope, MetadataAdapter, MetadataConnection};
use dbdrift_core::{ObjectType, Snapshot};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Adapter reading a snapshot file
#[derive(Debug, Clone)]
pub struct SnapshotFileAdapter {
    path: PathBuf,
}

impl SnapshotFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a snapshot where this adapter can read it back
    pub async fn write(path: &Path, snapshot: &Snapshot) -> Result<(), AdapterError> {
        let json = snapshot
            .to_json()
            .map_err(|e| AdapterError::Extraction(format!("cannot serialize snapshot: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AdapterError::Configuration(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        tokio::fs::write(path, json)
            .await
            .map_err(|e| AdapterError::Configuration(format!("cannot write {}: {}", path.display(), e)))
    }
}

#[async_trait::async_trait]
impl MetadataAdapter for SnapshotFileAdapter {
    fn engine(&self) -> &'static str {
        "snapshot"
    }

    /// A file can hold any type; what it actually supports is only known
    /// once it has been read.
    fn capabilities(&self) -> BTreeSet<ObjectType> {
        ObjectType::ALL.into_iter().collect()
    }

    async fn connect(&self, _credentials: &Credentials) -> Result<Box<dyn MetadataConnection>, AdapterError> {
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| AdapterError::Connection(format!("cannot read {}: {}", self.path.display(), e)))?;

        let snapshot = Snapshot::from_json(&json).map_err(|e| {
            AdapterError::Extraction(format!("invalid snapshot file {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(
            path = %self.path.display(),
            objects = snapshot.object_count(),
            "loaded snapshot file"
        );

        Ok(Box::new(SnapshotFileConnection {
            snapshot: Some(snapshot),
        }))
    }
}

/// Connection over a loaded snapshot file
pub struct SnapshotFileConnection {
    snapshot: Option<Snapshot>,
}

#[async_trait::async_trait]
impl MetadataConnection for SnapshotFileConnection {
    async fn extract(&self, scope: &ExtractScope) -> Result<Snapshot, AdapterError> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| AdapterError::Connection("connection is closed".to_string()))?;

        let capabilities: BTreeSet<ObjectType> = ObjectType::ALL
            .into_iter()
            .filter(|t| snapshot.supports(*t))
            .collect();

        scope.select("snapshot", snapshot, &capabilities)
    }

    async fn close(&mut self) {
        self.snapshot = None;
    }
}
