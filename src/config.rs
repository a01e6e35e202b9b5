//! Tool configuration (`ooxml.toml`).
//!
//! Defines the typed configuration for formatting, merging and the
//! macro-project bridge. Missing file → all defaults, which reproduce the
//! stock behavior: two-space indent, git engine, incoming branch wins.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::merge::ConflictPolicy;

/// Default file name looked up by the CLI when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "ooxml.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OoxmlConfig {
    /// Pretty-print settings.
    #[serde(default)]
    pub format: FormatConfig,

    /// Merge settings.
    #[serde(default)]
    pub merge: MergeConfig,

    /// External macro-project commands.
    #[serde(default)]
    pub macros: MacrosConfig,
}

// ---------------------------------------------------------------------------
// FormatConfig
// ---------------------------------------------------------------------------

/// Pretty-print settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FormatConfig {
    /// Spaces per nesting level.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
        }
    }
}

const fn default_indent() -> usize {
    2
}

// ---------------------------------------------------------------------------
// MergeConfig
// ---------------------------------------------------------------------------

/// Merge behaviour settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Which three-way merge engine runs the tree merge.
    #[serde(default)]
    pub engine: MergeEngineKind,

    /// Who wins a file changed on both sides.
    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    /// The git executable used by the git engine and `ooxml doctor`.
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            engine: MergeEngineKind::default(),
            conflict_policy: ConflictPolicy::default(),
            git_binary: default_git_binary(),
        }
    }
}

fn default_git_binary() -> String {
    "git".to_owned()
}

/// The three-way merge engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeEngineKind {
    /// Record snapshots in a throwaway git repository and let git merge them.
    #[default]
    Git,
    /// Compare the three trees directly, no external tool.
    InProcess,
}

impl std::str::FromStr for MergeEngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "git" => Ok(Self::Git),
            "in-process" => Ok(Self::InProcess),
            other => Err(format!(
                "unknown merge engine '{other}' (expected git or in-process)"
            )),
        }
    }
}

impl fmt::Display for MergeEngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Git => write!(f, "git"),
            Self::InProcess => write!(f, "in-process"),
        }
    }
}

// ---------------------------------------------------------------------------
// MacrosConfig
// ---------------------------------------------------------------------------

/// Commands bridging to a host application that can export and import
/// macro modules.
///
/// Each command is an argv prefix; the archive path and the `vbaProject`
/// folder are appended. Empty means the step is skipped.
///
/// ```toml
/// [macros]
/// export_command = ["cscript", "//nologo", "tools/export-vba.vbs"]
/// import_command = ["cscript", "//nologo", "tools/import-vba.vbs"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MacrosConfig {
    /// Runs after a successful extraction.
    #[serde(default)]
    pub export_command: Vec<String>,

    /// Runs after a successful pack.
    #[serde(default)]
    pub import_command: Vec<String>,
}

impl MacrosConfig {
    /// Whether either command is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        !self.export_command.is_empty() || !self.import_command.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl OoxmlConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        if config.format.indent > 16 {
            return Err(ConfigError {
                path: None,
                message: format!(
                    "format.indent = {} is out of range (0-16)",
                    config.format.indent
                ),
            });
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
