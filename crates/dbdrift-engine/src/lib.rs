//! dbdrift engine - metadata diff engine
//!
//! This crate turns two canonical [`Snapshot`](dbdrift_core::Snapshot)s into a
//! deterministic, path-addressed [`DiffReport`](dbdrift_core::DiffReport):
//! - Presence diff (missing / extra objects per type)
//! - Recursive structural diff of matched objects
//! - Resource limits with per-object skip markers

pub mod engine;
pub mod paths;
pub mod structural;

pub use engine::{compare, CompareError, DiffEngine};
pub use paths::OrderedPaths;
