//! Shared fixtures for pipeline integration tests
//!
//! Builds a throwaway project/build tree and stub gcov/gcovr executables
//! so the pipeline can be exercised end to end without real compilers.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};

use covlane::artifact::ObjectArtifact;
use covlane::config::{PipelineConfig, RepoConfig};
use covlane::toolchain::{Toolchain, Version};
use tempfile::TempDir;

/// A fabricated project with a build output root one level below it
pub struct BuildTree {
    _dir: TempDir,
    pub project_root: PathBuf,
    pub build_root: PathBuf,
}

impl BuildTree {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let project_root = dir.path().join("project");
        let build_root = project_root.join("build");
        fs::create_dir_all(&build_root).unwrap();

        Self {
            _dir: dir,
            project_root,
            build_root,
        }
    }

    /// Create a source file and its instrumented object, mirrored under
    /// the build root; returns the object artifact.
    pub fn add_object(&self, rel_dir: &str, stem: &str) -> ObjectArtifact {
        let src_dir = self.project_root.join(rel_dir);
        fs::create_dir_all(&src_dir).unwrap();
        fs::write(src_dir.join(format!("{stem}.cpp")), b"int covered;\n").unwrap();

        let obj_dir = self.build_root.join(rel_dir);
        fs::create_dir_all(&obj_dir).unwrap();
        let object = obj_dir.join(format!("{stem}.o"));
        fs::write(&object, b"").unwrap();

        ObjectArtifact::new(object)
    }

    /// Write an executable /bin/sh stub into the tree
    pub fn write_tool(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.project_root.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// Toolchain wired to stub tools; gcovr runs through /bin/sh
    pub fn toolchain(&self, gcov: PathBuf, gcovr: PathBuf, version: Version) -> Toolchain {
        Toolchain {
            gcov,
            gcovr,
            interpreter: PathBuf::from("/bin/sh"),
            gcovr_version: version,
        }
    }

    /// Resolved pipeline configuration against stub tools
    pub fn pipeline_config(
        &self,
        repo: &RepoConfig,
        target: &str,
        toolchain: Toolchain,
    ) -> PipelineConfig {
        PipelineConfig::with_toolchain(
            repo,
            target,
            self.project_root.clone(),
            self.build_root.clone(),
            toolchain,
        )
        .unwrap()
    }
}

/// What the stub extraction tool does for one object
pub enum GcovBehavior {
    /// Emit a listing for the given build-root-relative source path
    Emit { source_rel: &'static str },
    /// Exit non-zero with an error line on stderr
    Fail { exit_code: i32 },
}

/// Flattened listing name the real tool would emit for a source path
pub fn mangled_listing(source_rel: &str) -> String {
    let mangled = source_rel.replace("..", "^").replace('/', "#");
    format!("{mangled}.gcov")
}

/// Build the stub gcov script body: matches on the object path suffix and
/// either writes a listing into the working directory (announcing it on
/// stdout the way the real tool does) or fails.
pub fn gcov_stub(cases: &[(&str, GcovBehavior)]) -> String {
    let mut body = String::from("obj=\"$2\"\ncase \"$obj\" in\n");

    for (suffix, behavior) in cases {
        match behavior {
            GcovBehavior::Emit { source_rel } => {
                let listing = mangled_listing(source_rel);
                body.push_str(&format!(
                    "  *{suffix})\n    \
                     printf '        -:    0:Source:{source_rel}\\n        -:    1:int covered;\\n        2:    2:covered = 1;\\n' > '{listing}'\n    \
                     echo \"File '{source_rel}'\"\n    \
                     echo \"Creating '{listing}'\"\n    ;;\n"
                ));
            }
            GcovBehavior::Fail { exit_code } => {
                body.push_str(&format!(
                    "  *{suffix})\n    \
                     echo 'error: cannot open data file' >&2\n    \
                     exit {exit_code}\n    ;;\n"
                ));
            }
        }
    }

    body.push_str("esac\nexit 0\n");
    body
}

/// Stub aggregator: writes the index artifact at the -o path
pub fn gcovr_ok_stub() -> &'static str {
    "out=\"\"\n\
     while [ $# -gt 0 ]; do\n\
       if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n\
       shift\n\
     done\n\
     echo '<html>report</html>' > \"$out\"\n\
     echo 'aggregated'\n"
}

/// Stub aggregator that fails without producing an index
pub fn gcovr_fail_stub() -> &'static str {
    "echo 'error: cannot merge listings' >&2\nexit 3\n"
}

/// Record the full argv the stub was invoked with, then succeed
pub fn gcovr_recording_stub(record_path: &Path) -> String {
    format!(
        "echo \"$@\" >> '{}'\n{}",
        record_path.display(),
        gcovr_ok_stub()
    )
}
