//! Diff report types
//!
//! The [`DiffReport`] is the only artifact handed to report sinks. All
//! collections are sorted so that a report serializes byte-identically for
//! identical inputs.

use crate::model::{ObjectKey, ObjectType};
use crate::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One side of a difference
///
/// `Absent` is the reserved marker for "attribute not present on this side"
/// and is never confused with an explicit `null`:
/// `{"state":"absent"}` vs `{"state":"present","value":null}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum DiffValue {
    /// The attribute exists with this value
    Present(AttributeValue),

    /// The attribute does not exist on this side
    Absent,
}

impl DiffValue {
    /// Whether this side holds a value
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrow the value, if present
    pub fn value(&self) -> Option<&AttributeValue> {
        match self {
            Self::Present(value) => Some(value),
            Self::Absent => None,
        }
    }
}

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present(value) => write!(f, "{}", value),
            Self::Absent => write!(f, "<absent>"),
        }
    }
}

/// A single localized discrepancy within a matched object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    /// Attribute path, e.g. `columns`, `options.fillfactor`, `args[2]`
    pub path: String,

    /// Value on the source side
    pub source_value: DiffValue,

    /// Value on the destination side
    pub destination_value: DiffValue,
}

impl DiffEntry {
    /// Both sides present with different values
    pub fn changed(path: impl Into<String>, source: AttributeValue, destination: AttributeValue) -> Self {
        Self {
            path: path.into(),
            source_value: DiffValue::Present(source),
            destination_value: DiffValue::Present(destination),
        }
    }

    /// Attribute only exists on the source side
    pub fn only_in_source(path: impl Into<String>, source: AttributeValue) -> Self {
        Self {
            path: path.into(),
            source_value: DiffValue::Present(source),
            destination_value: DiffValue::Absent,
        }
    }

    /// Attribute only exists on the destination side
    pub fn only_in_destination(path: impl Into<String>, destination: AttributeValue) -> Self {
        Self {
            path: path.into(),
            source_value: DiffValue::Absent,
            destination_value: DiffValue::Present(destination),
        }
    }
}

/// Which resource limit aborted a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitKind {
    /// A sequence was longer than `sequence_comparison_limit`
    SequenceLength,

    /// Values were nested deeper than `max_depth`
    Depth,

    /// The per-object wall-clock budget ran out
    TimeBudget,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SequenceLength => write!(f, "sequence length"),
            Self::Depth => write!(f, "depth"),
            Self::TimeBudget => write!(f, "time budget"),
        }
    }
}

/// Placeholder recorded when an object's comparison was aborted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipMarker {
    /// Limit that was exceeded
    pub limit: LimitKind,

    /// Path at which the limit was hit
    pub path: String,

    /// Human-readable detail
    pub detail: String,
}

impl fmt::Display for SkipMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "comparison skipped: exceeded {} limit", self.limit)?;
        if !self.path.is_empty() {
            write!(f, " at '{}'", self.path)?;
        }
        write!(f, " ({})", self.detail)
    }
}

/// Differences found within one object present on both sides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDiff {
    /// Object identifier
    pub object: ObjectKey,

    /// Discrepancies in path order
    pub diffs: Vec<DiffEntry>,

    /// Set when the comparison was aborted by a resource limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipMarker>,
}

impl ObjectDiff {
    /// Object with at least one discrepancy
    pub fn new(object: ObjectKey, diffs: Vec<DiffEntry>) -> Self {
        Self {
            object,
            diffs,
            skipped: None,
        }
    }

    /// Object whose comparison was aborted
    pub fn skipped(object: ObjectKey, marker: SkipMarker) -> Self {
        Self {
            object,
            diffs: Vec::new(),
            skipped: Some(marker),
        }
    }

    /// Whether this entry is a skip marker
    pub fn is_skipped(&self) -> bool {
        self.skipped.is_some()
    }
}

/// Comparison outcome for one object type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDiffReport {
    /// Keys present in the source only, sorted
    pub missing_in_destination: BTreeSet<ObjectKey>,

    /// Keys present in the destination only, sorted
    pub extra_in_destination: BTreeSet<ObjectKey>,

    /// Objects present on both sides that differ, in key order
    pub mismatched: Vec<ObjectDiff>,

    /// True when all three collections are empty
    pub clean: bool,
}

impl TypeDiffReport {
    /// Assemble a report, deriving the clean flag
    pub fn new(
        missing_in_destination: BTreeSet<ObjectKey>,
        extra_in_destination: BTreeSet<ObjectKey>,
        mismatched: Vec<ObjectDiff>,
    ) -> Self {
        let clean = missing_in_destination.is_empty()
            && extra_in_destination.is_empty()
            && mismatched.is_empty();

        Self {
            missing_in_destination,
            extra_in_destination,
            mismatched,
            clean,
        }
    }

    /// A report with nothing to say
    pub fn clean() -> Self {
        Self::new(BTreeSet::new(), BTreeSet::new(), Vec::new())
    }

    /// Whether no difference was found
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Number of objects whose comparison was skipped
    pub fn skipped_count(&self) -> usize {
        self.mismatched.iter().filter(|d| d.is_skipped()).count()
    }
}

impl Default for TypeDiffReport {
    fn default() -> Self {
        Self::clean()
    }
}

/// Aggregate counts over a whole report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    /// Number of object types compared
    pub object_types: usize,

    /// Objects missing in the destination
    pub missing_in_destination: usize,

    /// Objects only in the destination
    pub extra_in_destination: usize,

    /// Objects that differ (including skipped ones)
    pub mismatched: usize,

    /// Objects whose comparison was aborted
    pub skipped: usize,

    /// Individual attribute discrepancies
    pub attribute_diffs: usize,
}

impl DiffSummary {
    /// Whether nothing differs
    pub fn is_clean(&self) -> bool {
        self.missing_in_destination == 0 && self.extra_in_destination == 0 && self.mismatched == 0
    }
}

/// Full comparison result, keyed by object type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiffReport(BTreeMap<ObjectType, TypeDiffReport>);

impl DiffReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for one type
    pub fn insert(&mut self, object_type: ObjectType, report: TypeDiffReport) {
        self.0.insert(object_type, report);
    }

    /// Outcome for one type, if it was compared
    pub fn get(&self, object_type: ObjectType) -> Option<&TypeDiffReport> {
        self.0.get(&object_type)
    }

    /// Iterate in object type order
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectType, &TypeDiffReport)> {
        self.0.iter()
    }

    /// Object types that were compared
    pub fn object_types(&self) -> impl Iterator<Item = ObjectType> + '_ {
        self.0.keys().copied()
    }

    /// Whether every compared type is clean
    pub fn is_clean(&self) -> bool {
        self.0.values().all(TypeDiffReport::is_clean)
    }

    /// Aggregate counts
    pub fn summary(&self) -> DiffSummary {
        self.0.values().fold(
            DiffSummary {
                object_types: self.0.len(),
                ..DiffSummary::default()
            },
            |mut summary, report| {
                summary.missing_in_destination += report.missing_in_destination.len();
                summary.extra_in_destination += report.extra_in_destination.len();
                summary.mismatched += report.mismatched.len();
                summary.skipped += report.skipped_count();
                summary.attribute_diffs += report.mismatched.iter().map(|d| d.diffs.len()).sum::<usize>();
                summary
            },
        )
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn absent_and_null_serialize_differently() {
        let entry = DiffEntry::only_in_source("comment", AttributeValue::Null);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["source_value"], serde_json::json!({"state": "present", "value": null}));
        assert_eq!(json["destination_value"], serde_json::json!({"state": "absent"}));

        let parsed: DiffEntry = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn clean_flag_is_derived() {
        assert!(TypeDiffReport::clean().is_clean());

        let report = TypeDiffReport::new(
            BTreeSet::from([ObjectKey::from("public.users")]),
            BTreeSet::new(),
            Vec::new(),
        );
        assert!(!report.is_clean());
        assert!(!report.clean);
    }

    #[test]
    fn skip_marker_is_omitted_when_unset() {
        let diff = ObjectDiff::new(
            ObjectKey::from("public.v"),
            vec![DiffEntry::changed("definition", "a".into(), "b".into())],
        );
        let json = serde_json::to_string(&diff).unwrap();
        assert!(!json.contains("skipped"));

        let skipped = ObjectDiff::skipped(
            ObjectKey::from("public.big"),
            SkipMarker {
                limit: LimitKind::SequenceLength,
                path: "columns".to_string(),
                detail: "20001 elements exceeds limit of 10000".to_string(),
            },
        );
        let json = serde_json::to_string(&skipped).unwrap();
        assert!(json.contains(r#""limit":"sequence_length""#));
        assert!(skipped.skipped.as_ref().unwrap().to_string().starts_with("comparison skipped: exceeded"));
    }

    #[test]
    fn report_summary_and_keys() {
        let mut report = DiffReport::new();
        report.insert(ObjectType::View, TypeDiffReport::clean());
        report.insert(
            ObjectType::Table,
            TypeDiffReport::new(
                BTreeSet::from([ObjectKey::from("public.b"), ObjectKey::from("public.a")]),
                BTreeSet::new(),
                vec![ObjectDiff::new(
                    ObjectKey::from("public.c"),
                    vec![DiffEntry::changed("columns", "x".into(), "y".into())],
                )],
            ),
        );

        let summary = report.summary();
        assert_eq!(summary.object_types, 2);
        assert_eq!(summary.missing_in_destination, 2);
        assert_eq!(summary.mismatched, 1);
        assert_eq!(summary.attribute_diffs, 1);
        assert!(!report.is_clean());

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.starts_with(r#"{"tables":{"missing_in_destination":["public.a","public.b"]"#));
    }
}
