//! dbdrift core
//!
//! Canonical metadata model and diff report types shared by adapters, the
//! diff engine and report sinks. Serialized field names are part of the
//! public report format.

pub mod value;
pub mod model;
pub mod diff;
pub mod hasher;
pub mod config;
pub mod report;

pub use value::AttributeValue;
pub use model::{ObjectType, ObjectKey, ObjectRecord, ObjectSet, Snapshot, UnknownObjectType};
pub use diff::{DiffValue, DiffEntry, LimitKind, SkipMarker, ObjectDiff, TypeDiffReport, DiffReport, DiffSummary};
pub use hasher::{digest, record_digest, DefinitionHasher};
pub use config::{Config, CompareConfig, EndpointConfig, OutputConfig, ConfigError};
pub use report::{ComparisonReport, EndpointInfo, ReportVersion};
