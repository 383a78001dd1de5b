//! Metadata diff engine
//!
//! Pure, synchronous comparison of two [`Snapshot`]s. The engine never
//! mutates its inputs and never fails on content: every disagreement is
//! reported as data. The only error is a configuration the snapshots cannot
//! satisfy.

use crate::paths::OrderedPaths;
use crate::structural::{Limits, Walker};
use dbdrift_core::{
    CompareConfig, DefinitionHasher, DiffReport, ObjectDiff, ObjectKey, ObjectRecord, ObjectSet,
    ObjectType, Snapshot, TypeDiffReport,
};
use std::collections::BTreeSet;
use std::time::Duration;

/// Errors that abort a whole comparison
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompareError {
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Compares snapshots under one compiled configuration
#[derive(Debug, Clone)]
pub struct DiffEngine {
    config: CompareConfig,
    limits: Limits,
    ordered: OrderedPaths,
    hasher: DefinitionHasher,
}

impl DiffEngine {
    /// Validate and compile a configuration
    pub fn new(config: CompareConfig) -> Result<Self, CompareError> {
        if config.sequence_comparison_limit == 0 {
            return Err(CompareError::Configuration(
                "sequence_comparison_limit must be greater than zero".to_string(),
            ));
        }
        if config.max_depth == 0 {
            return Err(CompareError::Configuration(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        if config.object_time_budget_ms == Some(0) {
            return Err(CompareError::Configuration(
                "object_time_budget_ms must be greater than zero".to_string(),
            ));
        }

        let ordered = OrderedPaths::compile(&config.ordered_attribute_paths).map_err(|e| {
            CompareError::Configuration(format!("invalid ordered attribute path pattern: {}", e))
        })?;

        let limits = Limits {
            max_sequence_len: config.sequence_comparison_limit,
            max_depth: config.max_depth,
            time_budget: config.object_time_budget_ms.map(Duration::from_millis),
        };

        Ok(Self {
            hasher: DefinitionHasher::new(config.definition_digest_threshold),
            config,
            limits,
            ordered,
        })
    }

    /// Replace the definition hasher
    pub fn with_hasher(mut self, hasher: DefinitionHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// The configuration this engine was built from
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compare every object type in scope
    pub fn compare(&self, source: &Snapshot, destination: &Snapshot) -> Result<DiffReport, CompareError> {
        let scope = self.scope(source, destination)?;
        let mut report = DiffReport::new();

        for object_type in scope {
            let type_report = self.compare_type(
                object_type,
                source.objects_of(object_type),
                destination.objects_of(object_type),
            );

            tracing::debug!(
                object_type = %object_type,
                missing = type_report.missing_in_destination.len(),
                extra = type_report.extra_in_destination.len(),
                mismatched = type_report.mismatched.len(),
                "compared object type"
            );

            report.insert(object_type, type_report);
        }

        let summary = report.summary();
        tracing::info!(
            object_types = summary.object_types,
            missing = summary.missing_in_destination,
            extra = summary.extra_in_destination,
            mismatched = summary.mismatched,
            skipped = summary.skipped,
            "metadata comparison completed"
        );

        Ok(report)
    }

    /// Object types to compare
    ///
    /// Explicitly enabled types must be supported by both snapshots. Without
    /// an explicit list, every type present on either side is compared, and a
    /// side without the type compares as an empty set.
    fn scope(&self, source: &Snapshot, destination: &Snapshot) -> Result<BTreeSet<ObjectType>, CompareError> {
        if let Some(enabled) = &self.config.enabled_object_types {
            for object_type in enabled {
                if !source.supports(*object_type) {
                    return Err(CompareError::Configuration(format!(
                        "object type '{}' is not supported by the source adapter",
                        object_type
                    )));
                }
                if !destination.supports(*object_type) {
                    return Err(CompareError::Configuration(format!(
                        "object type '{}' is not supported by the destination adapter",
                        object_type
                    )));
                }
            }
            return Ok(enabled.clone());
        }

        let source_types = source.present_types();
        let destination_types = destination.present_types();

        for object_type in source_types.symmetric_difference(&destination_types) {
            let side = if source_types.contains(object_type) {
                "destination"
            } else {
                "source"
            };
            tracing::warn!(
                object_type = %object_type,
                "{} snapshot has no {}; comparing against an empty set",
                side,
                object_type
            );
        }

        Ok(source_types.union(&destination_types).copied().collect())
    }

    /// Presence and value diff for one object type
    ///
    /// A type missing from a snapshot compares as an empty set.
    pub fn compare_type(
        &self,
        object_type: ObjectType,
        source: Option<&ObjectSet>,
        destination: Option<&ObjectSet>,
    ) -> TypeDiffReport {
        let empty = ObjectSet::new();
        let source = source.unwrap_or(&empty);
        let destination = destination.unwrap_or(&empty);

        let missing_in_destination: BTreeSet<ObjectKey> = source
            .keys()
            .filter(|key| !destination.contains_key(*key))
            .cloned()
            .collect();

        let extra_in_destination: BTreeSet<ObjectKey> = destination
            .keys()
            .filter(|key| !source.contains_key(*key))
            .cloned()
            .collect();

        let mismatched = source
            .iter()
            .filter_map(|(key, record)| {
                let other = destination.get(key)?;
                self.compare_objects(object_type, key, record, other)
            })
            .collect();

        TypeDiffReport::new(missing_in_destination, extra_in_destination, mismatched)
    }

    /// Structural diff of one object present on both sides
    ///
    /// `None` when the records are equal.
    pub fn compare_objects(
        &self,
        object_type: ObjectType,
        key: &ObjectKey,
        source: &ObjectRecord,
        destination: &ObjectRecord,
    ) -> Option<ObjectDiff> {
        let walker = Walker::new(self.limits, &self.ordered, &self.hasher);

        match walker.diff_records(source, destination) {
            Ok(entries) if entries.is_empty() => None,
            Ok(entries) => Some(ObjectDiff::new(key.clone(), entries)),
            Err(marker) => {
                tracing::warn!(
                    object_type = %object_type,
                    object = %key,
                    "{}",
                    marker
                );
                Some(ObjectDiff::skipped(key.clone(), marker))
            }
        }
    }
}

/// Compare two snapshots under `config`
pub fn compare(
    source: &Snapshot,
    destination: &Snapshot,
    config: &CompareConfig,
) -> Result<DiffReport, CompareError> {
    DiffEngine::new(config.clone())?.compare(source, destination)
}
