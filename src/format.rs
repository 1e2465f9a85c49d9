//! Formatting sibling task
//!
//! Runs clang-format over the files configured in the repo file, one
//! invocation per file. User-supplied extra arguments from the CLI are
//! appended after the configured options, so a one-off `--dry-run` or
//! `-style` override never needs a config edit.

use std::path::{Path, PathBuf};

use crate::config::RepoConfig;
use crate::invoke::run_captured;
use crate::logging::ConsoleLog;
use crate::toolchain::{find_program, ToolchainError};

/// Formatter command name
pub const CLANG_FORMAT: &str = "clang-format";

/// Format task errors
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("failed to invoke clang-format on {file}: {source}")]
    Invoke {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("clang-format failed on {file} (exit code {exit_code})")]
    ToolFailed { file: PathBuf, exit_code: i32 },
}

/// Resolve the formatter and format every configured file
pub fn run_format(
    repo: &RepoConfig,
    project_root: &Path,
    extra_args: &[String],
    log: &ConsoleLog,
) -> Result<usize, FormatError> {
    if repo.format.files.is_empty() {
        log.debug("no files configured for formatting");
        return Ok(0);
    }

    let tool = find_program(CLANG_FORMAT).ok_or(ToolchainError::NotFound {
        tool: CLANG_FORMAT.to_string(),
    })?;

    run_format_with(&tool, repo, project_root, extra_args, log)
}

/// Format every configured file with an already-resolved formatter;
/// returns how many files were touched
pub fn run_format_with(
    tool: &Path,
    repo: &RepoConfig,
    project_root: &Path,
    extra_args: &[String],
    log: &ConsoleLog,
) -> Result<usize, FormatError> {
    let mut args: Vec<String> = repo.format.options.clone();
    args.extend(extra_args.iter().cloned());

    for file in &repo.format.files {
        let path = project_root.join(file);
        log.debug(&format!("formatting {}", path.display()));

        let path_arg = path.to_string_lossy().into_owned();
        let mut file_args: Vec<&str> = args.iter().map(String::as_str).collect();
        file_args.push(&path_arg);

        let captured = run_captured(tool, &file_args, Some(project_root)).map_err(|source| {
            FormatError::Invoke {
                file: path.clone(),
                source,
            }
        })?;

        if !captured.success() {
            log.echo_classified(&captured.combined());
            return Err(FormatError::ToolFailed {
                file: path,
                exit_code: captured.exit_code,
            });
        }
    }

    Ok(repo.format.files.len())
}
