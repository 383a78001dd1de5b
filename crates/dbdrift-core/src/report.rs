//! Report envelope (stable v1)
//!
//! Wraps a [`DiffReport`] with run metadata for report sinks. The `diff`
//! member is deterministic; `timestamp` is the only field that changes
//! between runs over the same inputs.

use crate::diff::{DiffReport, DiffSummary};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Describes one side of the comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Adapter engine name
    pub engine: String,

    /// Connection label (never contains credentials)
    pub label: String,

    /// Number of objects extracted
    pub objects: usize,
}

impl EndpointInfo {
    pub fn new(engine: impl Into<String>, label: impl Into<String>, objects: usize) -> Self {
        Self {
            engine: engine.into(),
            label: label.into(),
            objects,
        }
    }
}

/// Comparison report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Source database
    pub source: EndpointInfo,

    /// Destination database
    pub destination: EndpointInfo,

    /// Aggregate counts
    pub summary: DiffSummary,

    /// Per-type differences
    pub diff: DiffReport,
}

impl ComparisonReport {
    /// Wrap a diff report with run metadata
    pub fn new(source: EndpointInfo, destination: EndpointInfo, diff: DiffReport) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            source,
            destination,
            summary: diff.summary(),
            diff,
        }
    }

    /// Whether any difference was found
    pub fn has_differences(&self) -> bool {
        !self.diff.is_clean()
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file, creating parent directories as needed
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
    }
}
