//! Persistent repository for merging by hand.
//!
//! Same layout as the git engine's throwaway repository, but kept on disk
//! and left unmerged so a person can inspect the branches and merge them
//! with their own tools.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::git::{self, GitMerge, ORIGINAL_BRANCH, VARIANT_A_BRANCH, VARIANT_B_BRANCH};
use super::{ThreeWayMerge, extract_snapshots};
use crate::error::OoxmlError;
use crate::package::MacroProject;

/// Knobs for [`prepare_merge_repo`].
pub struct MergeRepoOptions<'a> {
    /// Remove an existing repository directory first.
    pub force: bool,
    /// The git executable.
    pub git_binary: &'a str,
    /// Pretty-print indent used for the snapshots.
    pub indent: usize,
    /// Macro bridge run on each extraction.
    pub macros: &'a dyn MacroProject,
}

/// Where the prepared repository lives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PreparedRepo {
    /// Repository root.
    pub repo: PathBuf,
    /// Folder holding the extracted package inside the repository.
    pub tree: PathBuf,
    /// Checked-out branch, then the two variant branches.
    pub branches: [&'static str; 3],
}

/// Build a git repository at `repo_path` with `original` committed on the
/// `original` branch and each variant on its own branch, `original` checked
/// out.
///
/// # Errors
/// - [`OoxmlError::ToolUnavailable`] if git cannot run.
/// - [`OoxmlError::AlreadyExists`] if `repo_path` exists and `force` is off.
///   With `force` it is replaced only after the new repository is built, so
///   a failed call leaves it untouched.
/// - Any extraction or git failure.
pub fn prepare_merge_repo(
    original: &Path,
    variant_a: &Path,
    variant_b: &Path,
    repo_path: &Path,
    options: &MergeRepoOptions<'_>,
) -> Result<PreparedRepo, OoxmlError> {
    let engine = GitMerge::new(options.git_binary);
    engine.probe()?;
    if repo_path.exists() && !options.force {
        return Err(OoxmlError::AlreadyExists {
            path: repo_path.to_path_buf(),
        });
    }

    // Staged next to the destination so the final rename stays on one
    // filesystem. An existing repository is only replaced once the new one
    // is complete.
    let parent = match repo_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let staging = tempfile::Builder::new()
        .prefix(".ooxml-repo-")
        .tempdir_in(parent)?;
    let snapshots = extract_snapshots(
        [original, variant_a, variant_b],
        &staging.path().join("snapshots"),
        options.indent,
        options.macros,
    )?;
    let staged_repo = staging.path().join("repo");
    engine.record_snapshots(&staged_repo, &snapshots)?;

    if repo_path.is_dir() {
        fs::remove_dir_all(repo_path)?;
    } else if repo_path.exists() {
        fs::remove_file(repo_path)?;
    }
    fs::rename(&staged_repo, repo_path)?;
    tracing::info!(repo = %repo_path.display(), "merge repository ready");

    Ok(PreparedRepo {
        repo: repo_path.to_path_buf(),
        tree: git::tree_root(repo_path),
        branches: [ORIGINAL_BRANCH, VARIANT_A_BRANCH, VARIANT_B_BRANCH],
    })
}
