//! Build adapters from configuration

use crate::adapter::{AdapterError, MetadataAdapter};
use crate::file::SnapshotFileAdapter;
use crate::mock::MockAdapter;
use crate::postgres::PostgresAdapter;
use dbdrift_core::EndpointConfig;

/// Engines users commonly point at that have no bundled adapter
const UNBUNDLED_ENGINES: &[&str] = &["mysql", "mariadb", "sqlserver", "mssql"];

/// Create the adapter for an endpoint's `type`
///
/// | type                    | adapter                 |
/// |-------------------------|-------------------------|
/// | `postgres`, `postgresql`| [`PostgresAdapter`]     |
/// | `snapshot`, `file`      | [`SnapshotFileAdapter`] (needs `path`) |
/// | `mock`                  | empty [`MockAdapter`]   |
pub fn adapter_for(endpoint: &EndpointConfig) -> Result<Box<dyn MetadataAdapter>, AdapterError> {
    let adapter_type = endpoint.adapter_type.to_lowercase();

    match adapter_type.as_str() {
        "postgres" | "postgresql" => Ok(Box::new(PostgresAdapter::new())),
        "snapshot" | "file" => {
            let path = endpoint.setting("path").ok_or_else(|| {
                AdapterError::Configuration(format!(
                    "endpoint of type '{}' needs a 'path' setting",
                    endpoint.adapter_type
                ))
            })?;
            Ok(Box::new(SnapshotFileAdapter::new(path)))
        }
        "mock" => Ok(Box::new(MockAdapter::new())),
        other if UNBUNDLED_ENGINES.contains(&other) => Err(AdapterError::Unsupported(format!(
            "no bundled adapter for '{}'; export a snapshot file and use type = \"snapshot\"",
            other
        ))),
        _ => Err(AdapterError::Configuration(format!(
            "unknown adapter type '{}'",
            endpoint.adapter_type
        ))),
    }
}
