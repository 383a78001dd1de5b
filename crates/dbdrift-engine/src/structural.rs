//! Structural diff of attribute values
//!
//! Recursive, order-insensitive comparison of two [`AttributeValue`] trees.
//! Content disagreement always becomes a [`DiffEntry`]; the only way out of
//! a walk early is a resource limit, reported as a [`SkipMarker`].

use crate::paths::{child_path, element_path, index_path, OrderedPaths};
use dbdrift_core::{AttributeValue, DefinitionHasher, DiffEntry, LimitKind, ObjectRecord, SkipMarker};
use std::collections::{BTreeMap, BTreeSet};
use std::time::{Duration, Instant};

/// Bounds applied to a single object's comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Longest sequence that will be compared
    pub max_sequence_len: usize,

    /// Deepest nesting that will be compared
    pub max_depth: usize,

    /// Wall-clock budget per object
    pub time_budget: Option<Duration>,
}

type Walk = Result<(), SkipMarker>;

/// Collects the differences between two records
pub struct Walker<'a> {
    limits: Limits,
    ordered: &'a OrderedPaths,
    hasher: &'a DefinitionHasher,
    started: Instant,
    entries: Vec<DiffEntry>,
}

impl<'a> Walker<'a> {
    pub fn new(limits: Limits, ordered: &'a OrderedPaths, hasher: &'a DefinitionHasher) -> Self {
        Self {
            limits,
            ordered,
            hasher,
            started: Instant::now(),
            entries: Vec::new(),
        }
    }

    /// Diff two records attribute by attribute
    ///
    /// Returns the entries in path order, or the marker of the limit that
    /// aborted the walk. Partial results are discarded on abort.
    pub fn diff_records(mut self, source: &ObjectRecord, destination: &ObjectRecord) -> Result<Vec<DiffEntry>, SkipMarker> {
        self.started = Instant::now();
        self.diff_mappings("", source, destination, 0)?;
        Ok(self.entries)
    }

    fn diff_values(&mut self, path: &str, a: &AttributeValue, b: &AttributeValue, depth: usize) -> Walk {
        self.check_budget(path, depth)?;

        match (a, b) {
            (AttributeValue::Mapping(x), AttributeValue::Mapping(y)) => {
                self.diff_mappings(path, x, y, depth)
            }
            (AttributeValue::Sequence(x), AttributeValue::Sequence(y)) => {
                self.check_sequence_len(path, x.len().max(y.len()))?;
                if self.ordered.matches(path) {
                    self.diff_ordered(path, x, y, depth)
                } else {
                    self.diff_unordered(path, x, y, depth)
                }
            }
            (x, y) if x.is_scalar() && y.is_scalar() => {
                if !self.scalars_equal(x, y) {
                    self.entries.push(DiffEntry::changed(path, x.clone(), y.clone()));
                }
                Ok(())
            }
            // Shape clash: the clash itself is the difference.
            (x, y) => {
                self.entries.push(DiffEntry::changed(path, x.clone(), y.clone()));
                Ok(())
            }
        }
    }

    fn diff_mappings(
        &mut self,
        path: &str,
        a: &BTreeMap<String, AttributeValue>,
        b: &BTreeMap<String, AttributeValue>,
        depth: usize,
    ) -> Walk {
        let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();

        for key in keys {
            let child = child_path(path, key);
            match (a.get(key), b.get(key)) {
                (Some(x), Some(y)) => self.diff_values(&child, x, y, depth + 1)?,
                (Some(x), None) => self.entries.push(DiffEntry::only_in_source(child, x.clone())),
                (None, Some(y)) => self.entries.push(DiffEntry::only_in_destination(child, y.clone())),
                (None, None) => {}
            }
        }

        Ok(())
    }

    /// Multiset comparison: sorted canonical views are equal iff the
    /// multisets are. Position-free comparison cannot localize further, so a
    /// mismatch reports both full sequences.
    fn diff_unordered(&mut self, path: &str, a: &[AttributeValue], b: &[AttributeValue], depth: usize) -> Walk {
        if a.len() == b.len() {
            let left = self.canonical_elements(path, a, depth)?;
            let right = self.canonical_elements(path, b, depth)?;
            if left == right {
                return Ok(());
            }
        }

        self.entries.push(DiffEntry::changed(
            path,
            AttributeValue::Sequence(a.to_vec()),
            AttributeValue::Sequence(b.to_vec()),
        ));
        Ok(())
    }

    /// Elements of an unordered sequence in canonical, sorted form
    fn canonical_elements(&self, path: &str, items: &[AttributeValue], depth: usize) -> Result<Vec<AttributeValue>, SkipMarker> {
        let element = element_path(path);
        let mut canonical = items
            .iter()
            .map(|item| self.canonical(&element, item, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;
        canonical.sort();
        Ok(canonical)
    }

    /// Rewrite `value` so that structural equality ignores the order of every
    /// nested sequence not matched by an ordered pattern.
    fn canonical(&self, path: &str, value: &AttributeValue, depth: usize) -> Result<AttributeValue, SkipMarker> {
        self.check_budget(path, depth)?;

        match value {
            AttributeValue::Mapping(entries) => entries
                .iter()
                .map(|(key, item)| {
                    self.canonical(&child_path(path, key), item, depth + 1)
                        .map(|canonical| (key.clone(), canonical))
                })
                .collect::<Result<BTreeMap<_, _>, SkipMarker>>()
                .map(AttributeValue::Mapping),
            AttributeValue::Sequence(items) => {
                self.check_sequence_len(path, items.len())?;
                if self.ordered.matches(path) {
                    let element = element_path(path);
                    items
                        .iter()
                        .map(|item| self.canonical(&element, item, depth + 1))
                        .collect::<Result<Vec<_>, _>>()
                        .map(AttributeValue::Sequence)
                } else {
                    self.canonical_elements(path, items, depth).map(AttributeValue::Sequence)
                }
            }
            scalar => Ok(scalar.clone()),
        }
    }

    fn diff_ordered(&mut self, path: &str, a: &[AttributeValue], b: &[AttributeValue], depth: usize) -> Walk {
        for index in 0..a.len().max(b.len()) {
            let child = index_path(path, index);
            match (a.get(index), b.get(index)) {
                (Some(x), Some(y)) => self.diff_values(&child, x, y, depth + 1)?,
                (Some(x), None) => self.entries.push(DiffEntry::only_in_source(child, x.clone())),
                (None, Some(y)) => self.entries.push(DiffEntry::only_in_destination(child, y.clone())),
                (None, None) => {}
            }
        }
        Ok(())
    }

    fn scalars_equal(&self, a: &AttributeValue, b: &AttributeValue) -> bool {
        match (a, b) {
            (AttributeValue::String(x), AttributeValue::String(y)) => self.hasher.texts_equal(x, y),
            _ => a == b,
        }
    }

    fn check_budget(&self, path: &str, depth: usize) -> Walk {
        if depth > self.limits.max_depth {
            return Err(SkipMarker {
                limit: LimitKind::Depth,
                path: path.to_string(),
                detail: format!("nesting depth {} exceeds limit of {}", depth, self.limits.max_depth),
            });
        }

        if let Some(budget) = self.limits.time_budget {
            let elapsed = self.started.elapsed();
            if elapsed >= budget {
                return Err(SkipMarker {
                    limit: LimitKind::TimeBudget,
                    path: path.to_string(),
                    detail: format!(
                        "{}ms elapsed reached budget of {}ms",
                        elapsed.as_millis(),
                        budget.as_millis()
                    ),
                });
            }
        }

        Ok(())
    }

    fn check_sequence_len(&self, path: &str, len: usize) -> Walk {
        if len > self.limits.max_sequence_len {
            return Err(SkipMarker {
                limit: LimitKind::SequenceLength,
                path: path.to_string(),
                detail: format!(
                    "{} elements exceeds limit of {}",
                    len, self.limits.max_sequence_len
                ),
            });
        }
        Ok(())
    }
}
