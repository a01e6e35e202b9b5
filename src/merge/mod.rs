//! Three-way merge of OOXML packages.
//!
//! [`automerge`] extracts the original and both variants (pretty-printed)
//! into a private temporary workspace, hands the three trees to a
//! [`ThreeWayMerge`] engine, and packs the merged tree. Variant A is merged
//! before variant B.
//!
//! # Merge semantics
//!
//! Granularity is the whole file. Relative to the original:
//!
//! - a file changed by only one side takes that side's content;
//! - a file deleted by one side and untouched by the other is deleted;
//! - a file added by either side is kept;
//! - a file changed differently by both sides takes the [`ConflictPolicy`]
//!   winner's entire content, deletion included.
//!
//! With the default [`ConflictPolicy::IncomingWins`] a file changed by both
//! variants ends up as variant B's version.
//!
//! Two engines implement the contract: [`GitMerge`] records the trees as
//! branches of a throwaway git repository and lets git merge them,
//! [`TreeMerge`] compares content digests in process.

pub mod git;
pub mod repo;
pub mod tree;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ooxml_git::StrategyOption;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::OoxmlError;
use crate::package::{self, ExtractOptions, MacroProject};

pub use git::GitMerge;
pub use repo::{MergeRepoOptions, PreparedRepo, prepare_merge_repo};
pub use tree::TreeMerge;

// ---------------------------------------------------------------------------
// ConflictPolicy
// ---------------------------------------------------------------------------

/// Which side wins a file changed on both sides of a merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// The branch being merged in replaces the current content.
    #[default]
    IncomingWins,
    /// The current content is kept.
    CurrentWins,
}

impl ConflictPolicy {
    /// The git `-X` strategy option matching this policy.
    #[must_use]
    pub const fn strategy_option(self) -> StrategyOption {
        match self {
            Self::IncomingWins => StrategyOption::Theirs,
            Self::CurrentWins => StrategyOption::Ours,
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncomingWins => write!(f, "incoming-wins"),
            Self::CurrentWins => write!(f, "current-wins"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "incoming-wins" => Ok(Self::IncomingWins),
            "current-wins" => Ok(Self::CurrentWins),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected incoming-wins or current-wins)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine contract
// ---------------------------------------------------------------------------

/// The three extracted trees a merge works on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshots {
    /// The common ancestor.
    pub ancestor: PathBuf,
    /// Merged first.
    pub variant_a: PathBuf,
    /// Merged second.
    pub variant_b: PathBuf,
}

/// What an engine produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergedTree {
    /// Root of the merged tree, inside the engine's working directory.
    pub root: PathBuf,
    /// Files variant A changed relative to the ancestor.
    pub changed_by_a: usize,
    /// Files variant B changed relative to the ancestor.
    pub changed_by_b: usize,
    /// Forward-slash paths both sides changed differently, sorted.
    pub conflicts: Vec<String>,
}

/// A file-level three-way merge engine.
///
/// Implementations merge variant A into the ancestor, then variant B into
/// that result, applying `policy` to every file changed on both sides.
/// Everything they write stays under `workdir`, which the caller owns and
/// discards.
pub trait ThreeWayMerge {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Check that the engine can run.
    ///
    /// # Errors
    /// [`OoxmlError::ToolUnavailable`] if an external tool is missing.
    fn probe(&self) -> Result<(), OoxmlError>;

    /// Merge `snapshots` into a new tree under `workdir`.
    ///
    /// # Errors
    /// Engine-specific failures; the caller discards `workdir` either way.
    fn merge(
        &self,
        snapshots: &Snapshots,
        policy: ConflictPolicy,
        workdir: &Path,
    ) -> Result<MergedTree, OoxmlError>;
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Knobs for [`automerge`].
pub struct AutomergeOptions<'a> {
    /// Replace an existing output archive.
    pub force: bool,
    /// Winner of files changed on both sides.
    pub policy: ConflictPolicy,
    /// Pretty-print indent used for the extracted trees.
    pub indent: usize,
    /// The merge engine.
    pub engine: &'a dyn ThreeWayMerge,
    /// Macro bridge run on each extraction and on the final pack.
    pub macros: &'a dyn MacroProject,
}

/// Outcome of [`automerge`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// The merged archive.
    pub output: PathBuf,
    /// Engine name.
    pub engine: &'static str,
    /// Policy applied to conflicts.
    pub policy: ConflictPolicy,
    /// Files variant A changed.
    pub changed_by_a: usize,
    /// Files variant B changed.
    pub changed_by_b: usize,
    /// Paths both sides changed differently.
    pub conflicts: Vec<String>,
}

/// Merge `variant_a` and `variant_b`, both derived from `original`, into
/// `merged_out`.
///
/// All intermediate state lives in a fresh temporary directory that is
/// removed when the call returns, on success and on failure alike.
///
/// # Errors
/// - [`OoxmlError::ToolUnavailable`] if the engine probe fails.
/// - [`OoxmlError::AlreadyExists`] if `merged_out` exists and `force` is off.
/// - Any extraction, engine or packing failure.
pub fn automerge(
    original: &Path,
    variant_a: &Path,
    variant_b: &Path,
    merged_out: &Path,
    options: &AutomergeOptions<'_>,
) -> Result<MergeReport, OoxmlError> {
    options.engine.probe()?;
    if merged_out.exists() && !options.force {
        return Err(OoxmlError::AlreadyExists {
            path: merged_out.to_path_buf(),
        });
    }

    let workspace = tempfile::Builder::new().prefix("ooxml-merge-").tempdir()?;
    tracing::debug!(workspace = %workspace.path().display(), engine = options.engine.name(), "merge workspace");

    let snapshots = extract_snapshots(
        [original, variant_a, variant_b],
        workspace.path(),
        options.indent,
        options.macros,
    )?;
    let merged = options
        .engine
        .merge(&snapshots, options.policy, workspace.path())?;
    fs::create_dir_all(&merged.root)?;

    package::pack(&merged.root, merged_out, true, options.macros)?;
    tracing::info!(
        output = %merged_out.display(),
        engine = options.engine.name(),
        conflicts = merged.conflicts.len(),
        "merged"
    );

    Ok(MergeReport {
        output: merged_out.to_path_buf(),
        engine: options.engine.name(),
        policy: options.policy,
        changed_by_a: merged.changed_by_a,
        changed_by_b: merged.changed_by_b,
        conflicts: merged.conflicts,
    })
}

/// Extract the three packages, pretty-printed, under `root`.
pub(crate) fn extract_snapshots(
    [original, variant_a, variant_b]: [&Path; 3],
    root: &Path,
    indent: usize,
    macros: &dyn MacroProject,
) -> Result<Snapshots, OoxmlError> {
    let options = ExtractOptions {
        overwrite: true,
        prettify: true,
        indent,
    };
    let unpack = |archive: &Path, name: &str| -> Result<PathBuf, OoxmlError> {
        let report = package::extract(archive, &root.join(name), &options, macros)?;
        if report.formatting.failed() > 0 {
            tracing::warn!(
                archive = %archive.display(),
                failed = report.formatting.failed(),
                "some XML parts stay unformatted and merge as opaque files"
            );
        }
        Ok(report.target)
    };
    Ok(Snapshots {
        ancestor: unpack(original, "original")?,
        variant_a: unpack(variant_a, "variant-a")?,
        variant_b: unpack(variant_b, "variant-b")?,
    })
}

/// Copy every file under `from` into `to`, creating directories as needed.
pub(crate) fn copy_tree(from: &Path, to: &Path) -> Result<usize, OoxmlError> {
    fs::create_dir_all(to)?;
    let mut copied = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| OoxmlError::Io(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &dest)?;
            copied += 1;
        }
    }
    Ok(copied)
}
