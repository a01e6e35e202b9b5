//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitCli`](crate::GitCli)
//! methods. Callers match on the variant to tell a missing git installation
//! apart from a failed command or an unresolved merge.

use thiserror::Error;

/// Errors returned by [`GitCli`](crate::GitCli) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git executable could not be run at all.
    #[error("git is not available (`{binary} --version` failed): {message}")]
    Unavailable {
        /// The binary that was probed (e.g. `"git"` or an absolute path).
        binary: String,
        /// Why the probe failed.
        message: String,
    },

    /// A git command ran but exited unsuccessfully.
    #[error("`{command}` failed (exit code {}): {stderr}", exit_label(.exit_code.as_ref()))]
    CommandFailed {
        /// The command line that was run (e.g. `"git commit -q -m Original"`).
        command: String,
        /// The process exit code, if the process was not killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// A merge left paths unmerged after conflict resolution.
    #[error("merge of `{branch}` left {} unmerged path(s): {}", .paths.len(), .paths.join(", "))]
    UnresolvedMerge {
        /// The branch that was being merged in.
        branch: String,
        /// Paths git still reports as unmerged.
        paths: Vec<String>,
    },

    /// Git produced output that could not be interpreted.
    #[error("unexpected output from `{command}`: {message}")]
    InvalidOutput {
        /// The command that produced the output.
        command: String,
        /// What was wrong with it.
        message: String,
    },

    /// An I/O error occurred (process spawn, pipe, etc.).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn exit_label(code: Option<&i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), ToString::to_string)
}
