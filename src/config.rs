//! Lane configuration
//!
//! Two layers, both explicit values rather than ambient state:
//!
//! - [`RepoConfig`] is the authored `covlane.toml` file: tool overrides,
//!   report settings, per-target exclusion rules, the strict-extract
//!   policy and the format task's file list.
//! - [`PipelineConfig`] is the resolved configuration handed to every
//!   component entry point: probed tool paths, the aggregator version, the
//!   naming scheme computed once from it, roots and parsed rules.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::exclude::{ExcludeError, ExclusionRules};
use crate::naming::{NamingMode, NamingScheme};
use crate::toolchain::{self, Toolchain, ToolOverrides, ToolchainError};

/// Default repo configuration file name
pub const REPO_CONFIG_FILE: &str = "covlane.toml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error(transparent)]
    Exclude(#[from] ExcludeError),
}

/// Report output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// File name of the HTML index artifact
    pub index: String,

    /// Report directory, relative to the build root
    pub dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            index: "index.html".to_string(),
            dir: PathBuf::from("coverage"),
        }
    }
}

/// Per-target authored attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Exclusion rules: path fragments, or regexes with the `re:` prefix
    pub exclude: Vec<String>,
}

/// Format task settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Files the format task touches, relative to the project root
    pub files: Vec<PathBuf>,

    /// Options passed before any user-appended arguments
    pub options: Vec<String>,
}

/// The authored `covlane.toml` repo configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Promote per-object extraction failures to fatal pipeline errors
    pub strict_extract: bool,

    pub tools: ToolOverrides,

    pub report: ReportConfig,

    pub targets: BTreeMap<String, TargetConfig>,

    pub format: FormatConfig,
}

impl RepoConfig {
    /// Load the repo configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Exclusion rule strings authored for a target; empty when the target
    /// has no entry
    pub fn target_excludes(&self, target: &str) -> &[String] {
        self.targets
            .get(target)
            .map(|t| t.exclude.as_slice())
            .unwrap_or(&[])
    }
}

/// Resolved configuration passed into each pipeline component
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Project root; source paths in listings become absolute under it
    pub project_root: PathBuf,

    /// Build output root; working directory of the extraction tool and
    /// scan root of the aggregator
    pub build_root: PathBuf,

    /// Probed tool set
    pub toolchain: Toolchain,

    /// Naming scheme, mode fixed from the aggregator version
    pub naming: NamingScheme,

    /// Directory receiving the report artifacts
    pub report_dir: PathBuf,

    /// File name of the index artifact
    pub index_name: String,

    /// Parsed exclusion rules for the target
    pub exclusions: ExclusionRules,

    /// Fail the pipeline on any per-object extraction failure
    pub strict_extract: bool,
}

impl PipelineConfig {
    /// Resolve the full pipeline configuration for one target.
    ///
    /// Probes the toolchain (failing fast when a tool is missing) and fixes
    /// the naming mode from the discovered aggregator version.
    pub fn resolve(
        repo: &RepoConfig,
        target: &str,
        project_root: PathBuf,
        build_root: PathBuf,
    ) -> Result<Self, ConfigError> {
        let toolchain = toolchain::probe(&repo.tools)?;
        Self::with_toolchain(repo, target, project_root, build_root, toolchain)
    }

    /// Resolve against an already-probed toolchain
    pub fn with_toolchain(
        repo: &RepoConfig,
        target: &str,
        project_root: PathBuf,
        build_root: PathBuf,
        toolchain: Toolchain,
    ) -> Result<Self, ConfigError> {
        let mode = NamingMode::for_version(toolchain.gcovr_version);
        let levels_up = levels_below(&project_root, &build_root);
        let index_stem = index_stem(&repo.report.index);
        let naming = NamingScheme::new(mode, levels_up, index_stem);

        let exclusions = ExclusionRules::parse(repo.target_excludes(target))?;
        let report_dir = build_root.join(&repo.report.dir);

        Ok(Self {
            project_root,
            build_root,
            toolchain,
            naming,
            report_dir,
            index_name: repo.report.index.clone(),
            exclusions,
            strict_extract: repo.strict_extract,
        })
    }

    /// Absolute path of the report index artifact
    pub fn index_path(&self) -> PathBuf {
        self.report_dir.join(&self.index_name)
    }
}

/// Directory levels separating the build root from the project root
fn levels_below(project_root: &Path, build_root: &Path) -> usize {
    match build_root.strip_prefix(project_root) {
        Ok(rel) => rel.components().count(),
        Err(_) => 1,
    }
}

fn index_stem(index_name: &str) -> &str {
    Path::new(index_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(index_name)
}
