//! Coverage listings and the embedded source-path rewrite
//!
//! The first line of a listing carries a `Source:<path>` marker whose path
//! is usually relative to the build root, because the extraction tool ran
//! there. Downstream tooling must locate sources regardless of working
//! directory, so the marker is rewritten to an absolute path exactly once.
//!
//! The first line is parsed into a structured marker record and only the
//! marker's path field is rewritten; every other line of the listing stays
//! byte-identical.

use std::fs;
use std::path::{Component, Path, PathBuf};

use regex_lite::Regex;

/// Structured form of a listing's first line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMarker {
    /// Everything up to and including the `Source:` tag
    pub prefix: String,
    /// The embedded source path
    pub path: String,
}

impl SourceMarker {
    /// Parse the marker from a listing's first line
    pub fn parse(line: &str) -> Option<Self> {
        let re = Regex::new(r"^(.*?Source:)(.*)$").unwrap();
        let caps = re.captures(line)?;

        Some(Self {
            prefix: caps[1].to_string(),
            path: caps[2].to_string(),
        })
    }

    /// Re-serialize the marker as a listing first line
    pub fn render(&self) -> String {
        format!("{}{}", self.prefix, self.path)
    }
}

/// Listing rewrite errors
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("failed to read listing {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write listing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What the rewrite did to a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    /// Marker path was relative and is now absolute
    Rewritten { from: String, to: PathBuf },
    /// Marker path was already absolute; nothing changed
    AlreadyAbsolute,
    /// No recognizable marker on the first line; nothing changed
    NoMarker,
}

/// Rewrite a listing's embedded source path to an absolute path.
///
/// Relative marker paths are resolved against the build output root, the
/// directory the extraction tool ran in. Idempotent: a second invocation
/// sees an absolute marker and is a no-op.
pub fn rewrite_source_path(
    listing: &Path,
    build_root: &Path,
) -> Result<RewriteOutcome, ListingError> {
    let text = fs::read_to_string(listing).map_err(|source| ListingError::Read {
        path: listing.to_path_buf(),
        source,
    })?;

    let (first_line, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (text.as_str(), None),
    };

    let Some(mut marker) = SourceMarker::parse(first_line) else {
        return Ok(RewriteOutcome::NoMarker);
    };

    if Path::new(&marker.path).is_absolute() {
        return Ok(RewriteOutcome::AlreadyAbsolute);
    }

    let from = marker.path.clone();
    let absolute = normalize_lexically(&build_root.join(&marker.path));
    marker.path = absolute.to_string_lossy().into_owned();

    let mut rewritten = marker.render();
    if let Some(rest) = rest {
        rewritten.push('\n');
        rewritten.push_str(rest);
    }

    fs::write(listing, rewritten).map_err(|source| ListingError::Write {
        path: listing.to_path_buf(),
        source,
    })?;

    Ok(RewriteOutcome::Rewritten { from, to: absolute })
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// Purely lexical: `/work/build/../src` becomes `/work/src` whether or not
/// either directory exists. Leading `..` components that cannot be popped
/// are kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    normalized.components().next_back(),
                    Some(Component::Normal(_))
                );

                if can_pop {
                    normalized.pop();
                } else {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}
