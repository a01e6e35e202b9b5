//! Error types for package operations.
//!
//! Defines [`OoxmlError`], the unified error type for extraction, packing and
//! merging. Every message names what went wrong and how to fix it.
//!
//! Structural failures (`NotFound`, `InvalidArchive`, `AlreadyExists`,
//! `ToolUnavailable`) abort the current operation. `FormattingFailure` and
//! `ExternalStepFailure` are produced per file or per step, logged, and
//! counted by the caller; they never abort an extract or pack run.

use std::fmt;
use std::path::PathBuf;

use ooxml_git::GitError;

// ---------------------------------------------------------------------------
// OoxmlError
// ---------------------------------------------------------------------------

/// Unified error type for package operations.
#[derive(Debug)]
pub enum OoxmlError {
    /// An input file or directory does not exist.
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// A path that must be a directory is something else.
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// The input is not a readable zip container.
    InvalidArchive {
        /// The archive path.
        path: PathBuf,
        /// What the zip reader reported.
        detail: String,
    },

    /// The output path exists and overwriting was not requested.
    AlreadyExists {
        /// The existing output path.
        path: PathBuf,
    },

    /// The revision-control engine could not be reached.
    ToolUnavailable {
        /// The tool that was probed.
        tool: String,
        /// Why the probe failed.
        detail: String,
    },

    /// A single XML part could not be reformatted.
    FormattingFailure {
        /// The part on disk.
        path: PathBuf,
        /// Why formatting failed.
        detail: String,
    },

    /// The macro-project export or import step failed.
    ExternalStepFailure {
        /// Which step (`"export"` or `"import"`).
        step: &'static str,
        /// What went wrong.
        detail: String,
    },

    /// A merge could not produce a result tree.
    MergeFailed {
        /// Human-readable description.
        detail: String,
    },

    /// A configuration file could not be loaded or parsed.
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Human-readable description of the problem.
        detail: String,
    },

    /// A git command failed.
    Git(GitError),

    /// The zip writer failed while building an archive.
    Zip {
        /// The archive being read or written.
        path: PathBuf,
        /// What the zip library reported.
        detail: String,
    },

    /// An I/O error occurred while reading, writing or deleting.
    Io(std::io::Error),
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for OoxmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { path } => {
                write!(
                    f,
                    "'{}' not found.\n  To fix: check the path and try again.",
                    path.display()
                )
            }
            Self::NotADirectory { path } => {
                write!(
                    f,
                    "'{}' is not a directory.\n  To fix: pass the folder produced by `ooxml extract`.",
                    path.display()
                )
            }
            Self::InvalidArchive { path, detail } => {
                write!(
                    f,
                    "'{}' is not a valid ZIP/OOXML archive: {detail}\n  To fix: check that the file is an unencrypted .xlsx/.docx/.pptx/.vsdx package.",
                    path.display()
                )
            }
            Self::AlreadyExists { path } => {
                write!(
                    f,
                    "'{}' already exists.\n  To fix: choose another output path, or pass --force to overwrite.",
                    path.display()
                )
            }
            Self::ToolUnavailable { tool, detail } => {
                write!(
                    f,
                    "{tool} is not available: {detail}\n  To fix: install {tool} or set merge.engine = \"in-process\" in ooxml.toml."
                )
            }
            Self::FormattingFailure { path, detail } => {
                write!(f, "could not format '{}': {detail}", path.display())
            }
            Self::ExternalStepFailure { step, detail } => {
                write!(
                    f,
                    "macro project {step} failed: {detail}\n  To fix: check the [macros] commands in ooxml.toml."
                )
            }
            Self::MergeFailed { detail } => {
                write!(f, "merge failed: {detail}")
            }
            Self::Config { path, detail } => {
                write!(
                    f,
                    "configuration error in '{}': {detail}\n  To fix: edit the config file and correct the issue.",
                    path.display()
                )
            }
            Self::Git(err) => {
                write!(
                    f,
                    "git command failed: {err}\n  To fix: run `ooxml doctor` to check the git installation."
                )
            }
            Self::Zip { path, detail } => {
                write!(f, "zip error on '{}': {detail}", path.display())
            }
            Self::Io(err) => {
                write!(
                    f,
                    "I/O error: {err}\n  To fix: check file permissions and disk space."
                )
            }
        }
    }
}

// ---------------------------------------------------------------------------
// std::error::Error
// ---------------------------------------------------------------------------

impl std::error::Error for OoxmlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Git(err) => Some(err),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// From impls
// ---------------------------------------------------------------------------

impl From<std::io::Error> for OoxmlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<GitError> for OoxmlError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Unavailable { binary, message } => Self::ToolUnavailable {
                tool: binary,
                detail: message,
            },
            other => Self::Git(other),
        }
    }
}

impl From<crate::config::ConfigError> for OoxmlError {
    fn from(err: crate::config::ConfigError) -> Self {
        Self::Config {
            path: err.path.unwrap_or_default(),
            detail: err.message,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_found() {
        let err = OoxmlError::NotFound {
            path: PathBuf::from("book.xlsx"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("book.xlsx"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn display_invalid_archive() {
        let err = OoxmlError::InvalidArchive {
            path: PathBuf::from("notes.txt"),
            detail: "invalid Zip archive: Could not find EOCD".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("notes.txt"));
        assert!(msg.contains("not a valid ZIP/OOXML archive"));
        assert!(msg.contains("EOCD"));
    }

    #[test]
    fn display_already_exists_mentions_force() {
        let err = OoxmlError::AlreadyExists {
            path: PathBuf::from("merged.xlsx"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("merged.xlsx"));
        assert!(msg.contains("--force"));
    }

    #[test]
    fn display_tool_unavailable_suggests_in_process() {
        let err = OoxmlError::ToolUnavailable {
            tool: "git".to_owned(),
            detail: "No such file or directory".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("git is not available"));
        assert!(msg.contains("in-process"));
    }

    #[test]
    fn display_external_step_failure() {
        let err = OoxmlError::ExternalStepFailure {
            step: "import",
            detail: "exit code 2".to_owned(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("macro project import failed"));
        assert!(msg.contains("[macros]"));
    }

    #[test]
    fn display_io_error() {
        let err = OoxmlError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        ));
        let msg = format!("{err}");
        assert!(msg.contains("permission denied"));
        assert!(msg.contains("file permissions"));
    }

    #[test]
    fn error_source_io() {
        let err = OoxmlError::Io(std::io::Error::other("gone"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn error_source_structural_is_none() {
        let err = OoxmlError::AlreadyExists {
            path: PathBuf::from("x"),
        };
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn git_unavailable_maps_to_tool_unavailable() {
        let err: OoxmlError = GitError::Unavailable {
            binary: "git".to_owned(),
            message: "not found".to_owned(),
        }
        .into();
        assert!(matches!(err, OoxmlError::ToolUnavailable { ref tool, .. } if tool == "git"));
    }

    #[test]
    fn git_command_failure_stays_git() {
        let err: OoxmlError = GitError::CommandFailed {
            command: "git commit".to_owned(),
            exit_code: Some(1),
            stderr: String::new(),
        }
        .into();
        assert!(matches!(err, OoxmlError::Git(_)));
        assert!(err.to_string().contains("ooxml doctor"));
    }

    #[test]
    fn from_config_error() {
        let cfg_err = crate::config::ConfigError {
            path: Some(PathBuf::from("/work/ooxml.toml")),
            message: "bad syntax".to_owned(),
        };
        let err: OoxmlError = cfg_err.into();
        match err {
            OoxmlError::Config { path, detail } => {
                assert_eq!(path, PathBuf::from("/work/ooxml.toml"));
                assert_eq!(detail, "bad syntax");
            }
            other => panic!("expected Config, got {other:?}"),
        }
    }
}
