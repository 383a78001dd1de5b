//! Canonical metadata model
//!
//! The engine-agnostic shape every metadata adapter must emit. Adapters
//! normalize engine quirks (numeric type codes, boolean-as-int flags,
//! `YES`/`NO` nullability) into [`AttributeValue`]s before building a
//! [`Snapshot`]; nothing downstream ever special-cases an engine.

use crate::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Kind of database object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    /// Base tables (column lists)
    #[serde(rename = "tables", alias = "table")]
    Table,

    /// Views (definition text)
    #[serde(rename = "views", alias = "view")]
    View,

    /// Stored procedures and functions
    #[serde(
        rename = "routines",
        alias = "routine",
        alias = "stored_procedures",
        alias = "functions"
    )]
    Routine,

    /// Primary key, unique, foreign key and check constraints
    #[serde(rename = "constraints", alias = "constraint")]
    Constraint,

    /// Indexes
    #[serde(rename = "indexes", alias = "index")]
    Index,

    /// Triggers
    #[serde(rename = "triggers", alias = "trigger")]
    Trigger,
}

impl ObjectType {
    /// Every object type, in report order
    pub const ALL: [ObjectType; 6] = [
        Self::Table,
        Self::View,
        Self::Routine,
        Self::Constraint,
        Self::Index,
        Self::Trigger,
    ];

    /// Stable plural identifier used in snapshots, configs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "tables",
            Self::View => "views",
            Self::Routine => "routines",
            Self::Constraint => "constraints",
            Self::Index => "indexes",
            Self::Trigger => "triggers",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown object type name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown object type: {0}")]
pub struct UnknownObjectType(pub String);

impl FromStr for ObjectType {
    type Err = UnknownObjectType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tables" | "table" => Ok(Self::Table),
            "views" | "view" => Ok(Self::View),
            "routines" | "routine" | "stored_procedures" | "functions" => Ok(Self::Routine),
            "constraints" | "constraint" => Ok(Self::Constraint),
            "indexes" | "index" => Ok(Self::Index),
            "triggers" | "trigger" => Ok(Self::Trigger),
            _ => Err(UnknownObjectType(s.to_string())),
        }
    }
}

/// Engine-normalized qualified identifier of an object
///
/// `schema.name` for top-level objects, `schema.table.name` for objects that
/// belong to a table (indexes, triggers, constraints).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Wrap an already-qualified identifier
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// `schema.name`
    pub fn qualified(schema: &str, name: &str) -> Self {
        Self(format!("{}.{}", schema, name))
    }

    /// `schema.table.name`
    pub fn child(schema: &str, table: &str, name: &str) -> Self {
        Self(format!("{}.{}.{}", schema, table, name))
    }

    /// Borrow the identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ObjectKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ObjectKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Attributes describing one database object
pub type ObjectRecord = BTreeMap<String, AttributeValue>;

/// All objects of one type, keyed by identifier
pub type ObjectSet = BTreeMap<ObjectKey, ObjectRecord>;

/// Full metadata picture of one database at one point in time
///
/// Built once by an adapter and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Object types the producing adapter is able to supply
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<ObjectType>,

    /// Extracted objects per type
    #[serde(default)]
    pub objects: BTreeMap<ObjectType, ObjectSet>,
}

impl Snapshot {
    /// Create an empty snapshot with no declared capabilities
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty snapshot declaring what its adapter can supply
    pub fn with_capabilities(capabilities: impl IntoIterator<Item = ObjectType>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
            objects: BTreeMap::new(),
        }
    }

    /// Register an object type as extracted, even if it holds no objects
    pub fn ensure_type(&mut self, object_type: ObjectType) -> &mut ObjectSet {
        self.objects.entry(object_type).or_default()
    }

    /// Add or replace one object
    pub fn insert(
        &mut self,
        object_type: ObjectType,
        key: impl Into<ObjectKey>,
        record: ObjectRecord,
    ) -> &mut Self {
        self.ensure_type(object_type).insert(key.into(), record);
        self
    }

    /// Objects of one type, if that type was extracted
    pub fn objects_of(&self, object_type: ObjectType) -> Option<&ObjectSet> {
        self.objects.get(&object_type)
    }

    /// Look up a single object
    pub fn get(&self, object_type: ObjectType, key: &ObjectKey) -> Option<&ObjectRecord> {
        self.objects.get(&object_type).and_then(|set| set.get(key))
    }

    /// Object types present in this snapshot
    pub fn present_types(&self) -> BTreeSet<ObjectType> {
        self.objects.keys().copied().collect()
    }

    /// Whether the producing adapter can supply this type
    ///
    /// A type that is present counts as supported even when the adapter did
    /// not declare capabilities explicitly.
    pub fn supports(&self, object_type: ObjectType) -> bool {
        self.capabilities.contains(&object_type) || self.objects.contains_key(&object_type)
    }

    /// Total number of objects across all types
    pub fn object_count(&self) -> usize {
        self.objects.values().map(BTreeMap::len).sum()
    }

    /// Keep only the given schemas and object types
    ///
    /// Schema membership is decided by the first segment of the object key.
    pub fn restrict(
        &self,
        schemas: &BTreeSet<String>,
        object_types: &BTreeSet<ObjectType>,
    ) -> Snapshot {
        let objects = self
            .objects
            .iter()
            .filter(|(object_type, _)| object_types.is_empty() || object_types.contains(*object_type))
            .map(|(object_type, set)| {
                let kept = set
                    .iter()
                    .filter(|(key, _)| schemas.is_empty() || schemas.contains(schema_of(key)))
                    .map(|(key, record)| (key.clone(), record.clone()))
                    .collect();
                (*object_type, kept)
            })
            .collect();

        Snapshot {
            capabilities: self.capabilities.clone(),
            objects,
        }
    }

    /// Parse a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn schema_of(key: &ObjectKey) -> &str {
    key.as_str().split('.').next().unwrap_or_default()
}
