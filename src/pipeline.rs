//! Pipeline orchestration for the coverage lane
//!
//! Two strictly ordered steps per test target:
//!
//! 1. **Extract** — per-object listing extraction, source-path rewrite and
//!    collision-free renaming. Finishes all file writes before the next
//!    step starts; the ordering is a hard dependency, not a race.
//! 2. **Aggregate** — exclusion filtering, then one merge invocation
//!    producing the HTML index and detail pages.
//!
//! Runs for different targets operate on disjoint object and listing sets
//! and may execute in parallel under an enclosing build scheduler; no
//! cross-target synchronization is needed. A per-object extraction failure
//! stays inside the extraction step; an aggregation failure aborts the
//! target.

use std::time::Instant;

use crate::aggregate::{AggregateError, Aggregator};
use crate::artifact::{self, ObjectArtifact};
use crate::config::{ConfigError, PipelineConfig};
use crate::extract::{ExtractError, Extractor, ListingFile};
use crate::logging::ConsoleLog;
use crate::summary::CoverageSummary;
use crate::toolchain::ToolchainError;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    /// Stable process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Config(_) => 1,
            PipelineError::Toolchain(_) => 2,
            PipelineError::Io(_) => 1,
            PipelineError::Extract(_) => 30,
            PipelineError::Aggregate(_) => 40,
            PipelineError::Serialization(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// The coverage pipeline for one resolved configuration
pub struct CoveragePipeline {
    config: PipelineConfig,
}

impl CoveragePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover the target's objects under the build root and run
    pub fn run_target(&self, target: &str, log: &ConsoleLog) -> PipelineResult<CoverageSummary> {
        let objects = artifact::discover_objects(&self.config.build_root)?;
        self.run(target, &objects, log)
    }

    /// Run both steps for an explicit object list
    pub fn run(
        &self,
        target: &str,
        objects: &[ObjectArtifact],
        log: &ConsoleLog,
    ) -> PipelineResult<CoverageSummary> {
        let start = Instant::now();

        log.debug(&format!(
            "coverage pipeline for {}: {} object(s)",
            target,
            objects.len()
        ));

        let outcome = Extractor::new(&self.config).run(objects, log)?;

        let mut kept: Vec<ListingFile> = Vec::new();
        let mut excluded = 0usize;
        for listing in outcome.listings {
            if self.config.exclusions.is_excluded(&listing.declared_name) {
                log.debug(&format!("excluding {}", listing.declared_name));
                excluded += 1;
            } else {
                kept.push(listing);
            }
        }

        match Aggregator::new(&self.config).run(&kept, log) {
            Ok(report) => {
                let summary = CoverageSummary::success(
                    target.to_string(),
                    outcome.objects_processed,
                    outcome.failures.len(),
                    kept.len(),
                    excluded,
                    report.index,
                    start.elapsed().as_millis() as u64,
                );
                summary.write_to(&self.config.report_dir)?;
                log.info(&summary.human_summary);
                Ok(summary)
            }
            Err(err) => {
                let message = format!("coverage report generation failed for {}", target);
                let pipeline_err = PipelineError::from(err);
                let summary = CoverageSummary::failure(
                    target.to_string(),
                    outcome.objects_processed,
                    outcome.failures.len(),
                    pipeline_err.exit_code(),
                    message.clone(),
                    start.elapsed().as_millis() as u64,
                );
                // Best effort: the summary must not mask the real failure
                let _ = summary.write_to(&self.config.report_dir);
                log.error(&message);
                Err(pipeline_err)
            }
        }
    }
}
