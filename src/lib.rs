//! Covlane - coverage report lane for gcov-instrumented builds
//!
//! This crate turns raw coverage counters from a test target's
//! instrumented object files into a browsable per-source-file HTML report:
//! gcov extracts a listing per object, listings get collision-free names
//! and absolute source paths, exclusion rules filter the set, and gcovr
//! merges the remainder into the report.

pub mod aggregate;
pub mod artifact;
pub mod config;
pub mod exclude;
pub mod extract;
pub mod format;
pub mod invoke;
pub mod listing;
pub mod logging;
pub mod naming;
pub mod pipeline;
pub mod summary;
pub mod toolchain;

pub use artifact::ObjectArtifact;
pub use config::{PipelineConfig, RepoConfig};
pub use logging::ConsoleLog;
pub use naming::NamingMode;
pub use pipeline::{CoveragePipeline, PipelineError};
pub use summary::CoverageSummary;
pub use toolchain::Toolchain;
