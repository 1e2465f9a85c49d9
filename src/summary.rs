//! Coverage run summary (coverage_summary.json)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Schema version for coverage_summary.json
pub const SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for coverage_summary.json
pub const SUMMARY_SCHEMA_ID: &str = "covlane/coverage_summary@1";

/// File name of the summary artifact
pub const SUMMARY_FILE: &str = "coverage_summary.json";

/// Outcome of the coverage run for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failed,
}

/// Machine-readable record of one coverage pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// Test target the report was generated for
    pub target: String,

    /// When the summary was created
    pub created_at: DateTime<Utc>,

    /// Run status
    pub status: Status,

    /// Stable exit code
    pub exit_code: i32,

    /// Objects the extraction step processed
    pub objects_total: usize,

    /// Objects whose extraction failed (tolerated under the default policy)
    pub objects_failed: usize,

    /// Listings produced, rewritten and renamed
    pub listings_produced: usize,

    /// Listings dropped by exclusion rules
    pub listings_excluded: usize,

    /// Index artifact of the generated report
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_index: Option<PathBuf>,

    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,

    /// Human-readable summary line
    pub human_summary: String,
}

impl CoverageSummary {
    /// Create a success summary
    pub fn success(
        target: String,
        objects_total: usize,
        objects_failed: usize,
        listings_produced: usize,
        listings_excluded: usize,
        report_index: PathBuf,
        duration_ms: u64,
    ) -> Self {
        let human_summary = format!(
            "coverage report for {}: {} listing(s) from {} object(s), {} excluded",
            target, listings_produced, objects_total, listings_excluded
        );

        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            target,
            created_at: Utc::now(),
            status: Status::Success,
            exit_code: 0,
            objects_total,
            objects_failed,
            listings_produced,
            listings_excluded,
            report_index: Some(report_index),
            duration_ms,
            human_summary,
        }
    }

    /// Create a failure summary
    pub fn failure(
        target: String,
        objects_total: usize,
        objects_failed: usize,
        exit_code: i32,
        human_summary: String,
        duration_ms: u64,
    ) -> Self {
        Self {
            schema_version: SUMMARY_SCHEMA_VERSION,
            schema_id: SUMMARY_SCHEMA_ID.to_string(),
            target,
            created_at: Utc::now(),
            status: Status::Failed,
            exit_code,
            objects_total,
            objects_failed,
            listings_produced: 0,
            listings_excluded: 0,
            report_index: None,
            duration_ms,
            human_summary,
        }
    }

    /// Write coverage_summary.json into the given directory
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let path = dir.join(SUMMARY_FILE);
        fs::write(&path, json)?;
        Ok(path)
    }
}
