//! The aggregation step
//!
//! Runs once per test target, strictly after the extraction step has
//! finished all its file writes. Invokes the report-merging command through
//! the interpreter with per-file HTML detail pages requested, the
//! keep-intermediate flag, the declared index output path, the project
//! root, and the build output root as the scan root. Configured exclusion
//! patterns are also forwarded verbatim as native `--exclude` flags, on top
//! of the lane's own listing filter.
//!
//! A non-zero exit here is fatal: consumers depend on the report artifact
//! existing, so the captured output is echoed and the target's build
//! aborts.

use std::fs;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::extract::ListingFile;
use crate::invoke::run_captured;
use crate::logging::ConsoleLog;

/// Aggregation errors; all of them abort the target
#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("failed to create report directory {path}: {source}")]
    ReportDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to invoke gcovr: {source}")]
    Invoke {
        #[source]
        source: std::io::Error,
    },

    #[error("coverage report generation failed (exit code {exit_code})")]
    ToolFailed { exit_code: i32 },
}

/// The aggregator's declared output set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Top-level HTML index artifact
    pub index: PathBuf,

    /// Per-file HTML detail pages, one per non-excluded listing
    pub details: Vec<PathBuf>,
}

/// The aggregation step for one target
pub struct Aggregator<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Aggregator<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Merge the filtered listing set into the HTML report
    pub fn run(
        &self,
        listings: &[ListingFile],
        log: &ConsoleLog,
    ) -> Result<Report, AggregateError> {
        let config = self.config;

        fs::create_dir_all(&config.report_dir).map_err(|source| AggregateError::ReportDir {
            path: config.report_dir.clone(),
            source,
        })?;

        let index = config.index_path();
        let gcovr = config.toolchain.gcovr.to_string_lossy().into_owned();
        let index_arg = index.to_string_lossy().into_owned();
        let root_arg = config.project_root.to_string_lossy().into_owned();
        let scan_arg = config.build_root.to_string_lossy().into_owned();

        let mut args: Vec<String> = vec![
            gcovr,
            "--html-details".to_string(),
            "--keep".to_string(),
            "-o".to_string(),
            index_arg,
            "-r".to_string(),
            root_arg,
        ];
        for pattern in config.exclusions.native_patterns() {
            args.push(format!("--exclude={}", pattern));
        }
        args.push(scan_arg);

        log.debug(&format!("aggregating {} listing(s)", listings.len()));

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let captured = run_captured(
            &config.toolchain.interpreter,
            &arg_refs,
            Some(&config.build_root),
        )
        .map_err(|source| AggregateError::Invoke { source })?;

        if !captured.success() {
            log.echo_classified(&captured.combined());
            return Err(AggregateError::ToolFailed {
                exit_code: captured.exit_code,
            });
        }

        let details = listings
            .iter()
            .map(|listing| {
                config
                    .report_dir
                    .join(config.naming.detail_name(&listing.declared_name))
            })
            .collect();

        Ok(Report { index, details })
    }
}
