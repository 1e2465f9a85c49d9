//! The extraction step
//!
//! For every instrumented object of a test target, runs the extraction
//! command with the preserve-directory-structure flag, working directory
//! set to the build output root. The captured output text is the sole
//! channel used to discover which listing files the tool actually wrote;
//! the tool decides the immediate on-disk names, which this step does not
//! fully control.
//!
//! Each discovered listing gets its embedded source path rewritten to an
//! absolute path, and the listing belonging to the object itself is
//! renamed onto its collision-free declared name. A non-zero exit for one
//! object is logged and skipped; the remaining objects still produce
//! listings (unless the strict policy is configured).

use std::fs;
use std::path::PathBuf;

use regex_lite::Regex;

use crate::artifact::ObjectArtifact;
use crate::config::PipelineConfig;
use crate::invoke::run_captured;
use crate::listing::{self, ListingError, RewriteOutcome};
use crate::logging::ConsoleLog;
use crate::naming::{LISTING_SUFFIX, PATH_DELIMITER};

/// Flag asking the extraction tool to encode directory structure into the
/// emitted listing names
pub const PRESERVE_PATHS_FLAG: &str = "--preserve-paths";

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to invoke gcov for {object}: {source}")]
    Invoke {
        object: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Listing(#[from] ListingError),

    #[error("failed to rename listing {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised only under the strict extraction policy
    #[error("coverage extraction failed for {object} (exit code {exit_code})")]
    ObjectFailed { object: PathBuf, exit_code: i32 },
}

/// One produced listing, rewritten and on its final name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingFile {
    /// On-disk location
    pub path: PathBuf,

    /// Declared (collision-free) file name
    pub declared_name: String,
}

/// A tolerated per-object extraction failure
#[derive(Debug, Clone)]
pub struct ObjectFailure {
    pub object: ObjectArtifact,
    pub exit_code: i32,
}

/// Result of the extraction step across all objects of a target
#[derive(Debug, Clone, Default)]
pub struct ExtractOutcome {
    pub listings: Vec<ListingFile>,
    pub failures: Vec<ObjectFailure>,
    pub objects_processed: usize,
}

/// The extraction step for one target
pub struct Extractor<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Extractor<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Process every object; all listings are rewritten and renamed before
    /// this returns, so the aggregation step can rely on final names.
    pub fn run(
        &self,
        objects: &[ObjectArtifact],
        log: &ConsoleLog,
    ) -> Result<ExtractOutcome, ExtractError> {
        let mut outcome = ExtractOutcome::default();

        for object in objects {
            outcome.objects_processed += 1;
            self.extract_object(object, log, &mut outcome)?;
        }

        Ok(outcome)
    }

    fn extract_object(
        &self,
        object: &ObjectArtifact,
        log: &ConsoleLog,
        outcome: &mut ExtractOutcome,
    ) -> Result<(), ExtractError> {
        let config = self.config;

        log.debug(&format!("extracting coverage for {}", object.path().display()));

        let object_arg = object.path().to_string_lossy();
        let captured = run_captured(
            &config.toolchain.gcov,
            &[PRESERVE_PATHS_FLAG, object_arg.as_ref()],
            Some(&config.build_root),
        )
        .map_err(|source| ExtractError::Invoke {
            object: object.path().to_path_buf(),
            source,
        })?;

        if !captured.success() {
            log.error(&format!(
                "coverage extraction failed for {} (exit code {})",
                object.path().display(),
                captured.exit_code
            ));
            log.echo_classified(&captured.combined());

            if config.strict_extract {
                return Err(ExtractError::ObjectFailed {
                    object: object.path().to_path_buf(),
                    exit_code: captured.exit_code,
                });
            }

            outcome.failures.push(ObjectFailure {
                object: object.clone(),
                exit_code: captured.exit_code,
            });
            return Ok(());
        }

        let declared = config.naming.listing_name(object, &config.build_root);

        // Zero qualifying lines means zero listings for this object, which
        // is tolerated, not an error.
        for emitted_rel in listing_paths_from_output(&captured.stdout) {
            let emitted = config.build_root.join(&emitted_rel);
            if !emitted.is_file() {
                continue;
            }

            match listing::rewrite_source_path(&emitted, &config.build_root)? {
                RewriteOutcome::Rewritten { from, to } => {
                    log.debug(&format!("rewrote Source:{} -> {}", from, to.display()));
                }
                RewriteOutcome::AlreadyAbsolute | RewriteOutcome::NoMarker => {}
            }

            let emitted_name = emitted
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let (path, declared_name) = if belongs_to(&emitted_name, &declared) {
                let target = config.build_root.join(&declared);
                if emitted != target {
                    fs::rename(&emitted, &target).map_err(|source| ExtractError::Rename {
                        from: emitted.clone(),
                        to: target.clone(),
                        source,
                    })?;
                }
                (target, declared.clone())
            } else {
                (emitted, emitted_name)
            };

            outcome.listings.push(ListingFile {
                path,
                declared_name,
            });
        }

        Ok(())
    }
}

/// Extract the listing paths an extraction run reported.
///
/// Pure text scan with no side effects: a line is a candidate iff it
/// contains the listing suffix, and the path is the text between the
/// tool's single-quote markers. Candidate lines without a quoted path are
/// informational ("removing ...", progress text) and are skipped. Order of
/// appearance is preserved.
pub fn listing_paths_from_output(text: &str) -> Vec<PathBuf> {
    let quoted = Regex::new(r"'([^']+)'").unwrap();

    text.lines()
        .filter(|line| line.contains(LISTING_SUFFIX))
        .filter_map(|line| quoted.captures(line))
        .map(|caps| PathBuf::from(&caps[1]))
        .collect()
}

/// Whether an emitted listing is the one for the object itself (as opposed
/// to a header or include pulled in by the same object).
fn belongs_to(emitted_name: &str, declared_name: &str) -> bool {
    let emitted = emitted_name
        .strip_suffix(LISTING_SUFFIX)
        .unwrap_or(emitted_name);
    let declared = declared_name
        .strip_suffix(LISTING_SUFFIX)
        .unwrap_or(declared_name);

    // Flattened emission: the source stem extends the object stem within
    // the same encoded directory.
    if let Some(tail) = emitted.strip_prefix(declared) {
        return tail.is_empty() || tail.starts_with('.');
    }

    // Unflattened emission carries only the bare source file name.
    if !emitted.contains(PATH_DELIMITER) {
        let base = declared.rsplit(PATH_DELIMITER).next().unwrap_or(declared);
        if let Some(tail) = emitted.strip_prefix(base) {
            return tail.is_empty() || tail.starts_with('.');
        }
    }

    false
}
