//! External tool discovery for the coverage lane
//!
//! Resolves absolute paths for the extraction command (gcov), the
//! aggregation command (gcovr) and the interpreter that runs gcovr, and
//! discovers the aggregator's semantic version. Discovery happens once at
//! configuration time; a missing tool fails the configuration before any
//! pipeline step runs.
//!
//! The lane is wired in for one OS family only: on the family without
//! native gcov tooling (Windows), probing reports the lane unsupported and
//! nothing downstream executes.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::invoke::run_captured;

/// Extraction command name
pub const GCOV: &str = "gcov";

/// Aggregation command name; also the version-output prefix
pub const GCOVR: &str = "gcovr";

/// Aggregator versions at or above this threshold use hashed detail names
pub const HASHED_NAMING_MIN: Version = Version {
    major: 4,
    minor: 2,
    patch: 0,
};

/// Semantic version triple, ordered component-wise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ToolchainError;

    /// Parse a dotted version, tolerating a non-numeric tail ("5.0+main").
    /// Missing components default to zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric: String = s
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let mut parts = numeric.split('.').filter(|p| !p.is_empty());
        let major = parts.next().and_then(|p| p.parse().ok());

        match major {
            Some(major) => Ok(Self {
                major,
                minor: parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
                patch: parts.next().and_then(|p| p.parse().ok()).unwrap_or(0),
            }),
            None => Err(ToolchainError::InvalidVersion {
                version: s.to_string(),
            }),
        }
    }
}

/// Toolchain discovery errors
#[derive(Debug, thiserror::Error)]
pub enum ToolchainError {
    /// A required external tool is not on PATH
    #[error("required tool not found: {tool}")]
    NotFound { tool: String },

    /// The coverage lane is not available on this OS family
    #[error("coverage tooling is not available on this platform")]
    UnsupportedPlatform,

    /// Version output did not contain a parseable version token
    #[error("could not read {tool} version from: {output:?}")]
    VersionUnreadable { tool: String, output: String },

    /// Version string did not parse
    #[error("invalid version format: {version}")]
    InvalidVersion { version: String },

    /// Spawning the version probe failed
    #[error("failed to invoke {tool}: {source}")]
    Probe {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

/// Optional absolute-path overrides for the probed tools, settable from the
/// repo configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcov: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcovr: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,
}

/// Resolved tool set for one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Absolute path of the extraction command
    pub gcov: PathBuf,

    /// Absolute path of the aggregation command
    pub gcovr: PathBuf,

    /// Interpreter used to invoke the aggregation command
    pub interpreter: PathBuf,

    /// Discovered aggregator version
    pub gcovr_version: Version,
}

/// Probe the toolchain, honoring overrides where given.
///
/// The aggregator version is discovered by invoking it with `--version`
/// through the interpreter and parsing the first whitespace-delimited token
/// after the `gcovr` prefix.
pub fn probe(overrides: &ToolOverrides) -> Result<Toolchain, ToolchainError> {
    if cfg!(windows) {
        return Err(ToolchainError::UnsupportedPlatform);
    }

    let gcov = resolve(overrides.gcov.as_deref(), &[GCOV])?;
    let gcovr = resolve(overrides.gcovr.as_deref(), &[GCOVR])?;
    let interpreter = resolve(overrides.interpreter.as_deref(), &["python3", "python"])?;

    let gcovr_version = discover_gcovr_version(&interpreter, &gcovr)?;

    Ok(Toolchain {
        gcov,
        gcovr,
        interpreter,
        gcovr_version,
    })
}

/// Invoke the aggregator with its version flag and parse the triple
pub fn discover_gcovr_version(
    interpreter: &Path,
    gcovr: &Path,
) -> Result<Version, ToolchainError> {
    let gcovr_arg = gcovr.to_string_lossy();
    let captured = run_captured(interpreter, &[gcovr_arg.as_ref(), "--version"], None)
        .map_err(|source| ToolchainError::Probe {
            tool: GCOVR.to_string(),
            source,
        })?;

    parse_version_output(&captured.stdout).ok_or_else(|| ToolchainError::VersionUnreadable {
        tool: GCOVR.to_string(),
        output: captured.stdout,
    })?
}

/// Extract the version triple from `gcovr --version` output.
///
/// Returns `None` when no `gcovr` prefix is present, `Some(Err)` when the
/// following token is not a version.
pub fn parse_version_output(output: &str) -> Option<Result<Version, ToolchainError>> {
    let first_line = output.lines().next()?;
    let mut tokens = first_line.split_whitespace();

    tokens.find(|t| *t == GCOVR)?;
    let version_token = tokens.next()?;

    Some(version_token.parse())
}

fn resolve(override_path: Option<&Path>, candidates: &[&str]) -> Result<PathBuf, ToolchainError> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(ToolchainError::NotFound {
            tool: path.display().to_string(),
        });
    }

    for name in candidates {
        if let Some(path) = find_program(name) {
            return Ok(path);
        }
    }

    Err(ToolchainError::NotFound {
        tool: candidates.join("/"),
    })
}

/// Locate a program on PATH
pub fn find_program(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;

    env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_parse_full_triple() {
        let v: Version = "4.2.1".parse().unwrap();
        assert_eq!(v, Version::new(4, 2, 1));
    }

    #[test]
    fn test_version_parse_short() {
        let v: Version = "5.0".parse().unwrap();
        assert_eq!(v, Version::new(5, 0, 0));

        let v: Version = "7".parse().unwrap();
        assert_eq!(v, Version::new(7, 0, 0));
    }

    #[test]
    fn test_version_parse_with_suffix() {
        let v: Version = "6.0+main".parse().unwrap();
        assert_eq!(v, Version::new(6, 0, 0));
    }

    #[test]
    fn test_version_parse_garbage() {
        assert!("not-a-version".parse::<Version>().is_err());
        assert!("".parse::<Version>().is_err());
    }

    #[test]
    fn test_version_ordering() {
        let threshold = HASHED_NAMING_MIN;
        assert!(Version::new(4, 1, 9) < threshold);
        assert!(Version::new(4, 2, 0) >= threshold);
        assert!(Version::new(5, 0, 0) > threshold);
        assert!(Version::new(3, 9, 9) < threshold);
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(4, 2, 0).to_string(), "4.2.0");
    }

    #[test]
    fn test_parse_version_output() {
        let v = parse_version_output("gcovr 5.1\nCopyright (c) ...\n")
            .unwrap()
            .unwrap();
        assert_eq!(v, Version::new(5, 1, 0));
    }

    #[test]
    fn test_parse_version_output_no_prefix() {
        assert!(parse_version_output("something else 1.0").is_none());
        assert!(parse_version_output("").is_none());
    }

    #[test]
    fn test_parse_version_output_bad_token() {
        let result = parse_version_output("gcovr unknown").unwrap();
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_program_sh() {
        // sh exists on every Unix family host we support
        assert!(find_program("sh").is_some());
        assert!(find_program("definitely-not-a-real-tool-xyz").is_none());
    }

    #[test]
    fn test_resolve_override_must_exist() {
        let missing = PathBuf::from("/nonexistent/gcov");
        let result = resolve(Some(&missing), &[GCOV]);
        assert!(matches!(result, Err(ToolchainError::NotFound { .. })));
    }
}
