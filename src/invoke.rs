//! Synchronous external-command invocation
//!
//! Every external tool the lane touches (gcov, gcovr, clang-format) runs as
//! a blocking child process with captured output. The captured text is the
//! only channel the caller inspects; nothing streams.

use std::io;
use std::path::Path;
use std::process::Command;

/// Captured result of one external command
#[derive(Debug, Clone)]
pub struct Captured {
    /// Process exit code, -1 when terminated by signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, for classified re-echo
    pub fn combined(&self) -> String {
        let mut text = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Run a command to completion and capture its output.
///
/// Lossy UTF-8 conversion: tool output is human-readable text and an
/// occasional invalid byte must not abort the pipeline.
pub fn run_captured(program: &Path, args: &[&str], cwd: Option<&Path>) -> io::Result<Captured> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let output = cmd.output()?;

    Ok(Captured {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
