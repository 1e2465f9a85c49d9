//! Instrumented object artifacts
//!
//! An object artifact is a compiled unit built with coverage counters
//! enabled. The build graph owns these files; the lane only reads them.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extension of linked object files in the build tree
pub const OBJECT_EXTENSION: &str = "o";

/// One instrumented compiled unit belonging to a test target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectArtifact {
    path: PathBuf,
}

impl ObjectArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Absolute path of the object file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parent directory of the object file
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name of the object
    pub fn base_name(&self) -> &str {
        self.path
            .file_name()
            .map(|n| n.to_str().unwrap_or(""))
            .unwrap_or("")
    }

    /// Object directory relative to the build root; empty for objects
    /// sitting directly in the build root or outside it
    pub fn rel_dir(&self, build_root: &Path) -> &Path {
        self.dir()
            .strip_prefix(build_root)
            .unwrap_or_else(|_| Path::new(""))
    }
}

/// Discover the object artifacts under a target's build directory.
///
/// Stands in for the build graph's "linked objects of target X" query:
/// walks the directory for `.o` files in deterministic (sorted) order.
pub fn discover_objects(dir: &Path) -> io::Result<Vec<ObjectArtifact>> {
    let mut objects = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        let path = entry.path();

        if entry.file_type().is_file()
            && path.extension().is_some_and(|ext| ext == OBJECT_EXTENSION)
        {
            objects.push(ObjectArtifact::new(path.to_path_buf()));
        }
    }

    Ok(objects)
}
