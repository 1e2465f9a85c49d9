//! Declared output names for coverage listings
//!
//! Listings for objects in different directories may share a base name, so
//! the flat listing namespace needs collision-free names. Two generations
//! of the scheme exist, selected once per build from the discovered
//! aggregator version:
//!
//! - **Flattened**: the object's source-relative path is embedded verbatim
//!   in the name, `..` hops rendered as `^` and separators as `#`. Distinct
//!   object paths always give distinct names, at the cost of very long
//!   names for deep trees.
//! - **Hashed**: newer aggregators keep detail-page names short by deriving
//!   a 128-bit hex digest of the canonical relative path and using it as
//!   the suffix of an index-prefixed detail name.
//!
//! The flattened guarantee assumes the reserved `#` delimiter never occurs
//! literally inside a directory or file name; a tree that uses it can
//! collide.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::artifact::ObjectArtifact;
use crate::toolchain::{Version, HASHED_NAMING_MIN};

/// Reserved delimiter replacing path separators in flattened names
pub const PATH_DELIMITER: char = '#';

/// Marker replacing a `..` component in flattened names
pub const UP_MARKER: &str = "^";

/// Suffix of every coverage listing
pub const LISTING_SUFFIX: &str = ".gcov";

/// Naming scheme generation, fixed at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingMode {
    /// Full relative path embedded in the name (older aggregators)
    Flattened,
    /// Digest-suffixed detail names (aggregators at or above the threshold)
    Hashed,
}

impl NamingMode {
    /// Select the mode for a discovered aggregator version
    pub fn for_version(version: Version) -> Self {
        if version >= HASHED_NAMING_MIN {
            NamingMode::Hashed
        } else {
            NamingMode::Flattened
        }
    }
}

/// Computes declared output names for one build
#[derive(Debug, Clone)]
pub struct NamingScheme {
    mode: NamingMode,
    /// Directory levels between the project root and the build root; each
    /// contributes one `..` hop in the source-relative path
    levels_up: usize,
    /// Stem of the report index artifact, prefix of hashed detail names
    index_stem: String,
}

impl NamingScheme {
    pub fn new(mode: NamingMode, levels_up: usize, index_stem: impl Into<String>) -> Self {
        Self {
            mode,
            levels_up,
            index_stem: index_stem.into(),
        }
    }

    pub fn mode(&self) -> NamingMode {
        self.mode
    }

    /// Collision-free on-disk name for an object's listing.
    ///
    /// Always flattened: the extraction tool writes all listings into the
    /// build root regardless of mode, so the flat listing namespace needs
    /// the embedded path in both generations.
    pub fn listing_name(&self, object: &ObjectArtifact, build_root: &Path) -> String {
        let mut name = self.flattened_stem(object, build_root);
        name.push_str(LISTING_SUFFIX);
        name
    }

    /// Declared output name for an object under the active mode.
    ///
    /// Flattened mode declares the listing itself; hashed mode declares the
    /// index-prefixed, digest-suffixed per-file detail page that replaces
    /// the long flattened name.
    pub fn declared_name(&self, object: &ObjectArtifact, build_root: &Path) -> String {
        match self.mode {
            NamingMode::Flattened => self.listing_name(object, build_root),
            NamingMode::Hashed => {
                let digest = hash_suffix(&self.canonical_source_path(object, build_root));
                format!("{}.{}.html", self.index_stem, digest)
            }
        }
    }

    /// Declared name of the per-file HTML detail page for a listing.
    ///
    /// Flattened mode embeds the listing's long name verbatim; hashed mode
    /// replaces it with the digest of the canonical relative path the
    /// listing name encodes.
    pub fn detail_name(&self, listing_name: &str) -> String {
        let stem = listing_name
            .strip_suffix(LISTING_SUFFIX)
            .unwrap_or(listing_name);

        match self.mode {
            NamingMode::Flattened => format!("{}.{}.html", self.index_stem, stem),
            NamingMode::Hashed => {
                let digest = hash_suffix(&canonical_from_listing_stem(stem));
                format!("{}.{}.html", self.index_stem, digest)
            }
        }
    }

    /// Flattened name without the listing suffix
    fn flattened_stem(&self, object: &ObjectArtifact, build_root: &Path) -> String {
        let mut parts: Vec<String> = Vec::new();

        for _ in 0..self.levels_up {
            parts.push(UP_MARKER.to_string());
        }

        for component in object.rel_dir(build_root).components() {
            parts.push(component.as_os_str().to_string_lossy().into_owned());
        }

        parts.push(strip_object_extensions(object.base_name()).to_string());

        parts.join(&PATH_DELIMITER.to_string())
    }

    /// Canonical hash input: the source-relative path with forward slashes
    /// and no listing suffix, independent of the platform separator.
    fn canonical_source_path(&self, object: &ObjectArtifact, build_root: &Path) -> String {
        let mut parts: Vec<String> = Vec::new();

        for _ in 0..self.levels_up {
            parts.push("..".to_string());
        }

        for component in object.rel_dir(build_root).components() {
            parts.push(component.as_os_str().to_string_lossy().into_owned());
        }

        parts.push(strip_object_extensions(object.base_name()).to_string());

        parts.join("/")
    }
}

/// Strip the last two dot-separated extension segments from an object base
/// name: `foo.cpp.1.o` becomes `foo.cpp`, `foo.o` becomes `foo`.
pub fn strip_object_extensions(base: &str) -> &str {
    let mut end = base.len();

    for _ in 0..2 {
        match base[..end].rfind('.') {
            Some(dot) if dot > 0 => end = dot,
            _ => break,
        }
    }

    &base[..end]
}

/// Canonical forward-slash path encoded by a flattened listing stem
fn canonical_from_listing_stem(stem: &str) -> String {
    stem.split(PATH_DELIMITER)
        .map(|part| if part == UP_MARKER { ".." } else { part })
        .collect::<Vec<_>>()
        .join("/")
}

/// 128-bit hex digest of the canonical path string
fn hash_suffix(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..16])
}
