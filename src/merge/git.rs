//! Git-backed merge engine.
//!
//! The three trees are committed on branches `original`, `variant-a` and
//! `variant-b` of a throwaway repository; `original` then merges A and B in
//! that order. Git's content merge runs with the policy's `-X` option, and
//! every file changed differently on both sides is afterwards reset to the
//! policy winner's entire version, so no line-level interleaving survives.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ooxml_git::{GitCli, GitError};

use super::{ConflictPolicy, MergedTree, Snapshots, ThreeWayMerge, copy_tree};
use crate::error::OoxmlError;

/// Branch holding the ancestor; checked out when recording finishes.
pub const ORIGINAL_BRANCH: &str = "original";
/// Branch holding variant A.
pub const VARIANT_A_BRANCH: &str = "variant-a";
/// Branch holding variant B.
pub const VARIANT_B_BRANCH: &str = "variant-b";
/// Folder inside the repository that holds the extracted package.
pub const TREE_DIR: &str = "ooxml";

const AUTHOR_NAME: &str = "ooxml-merge";
const AUTHOR_EMAIL: &str = "ooxml-merge@localhost";

/// Merge engine that shells out to git.
#[derive(Clone, Debug)]
pub struct GitMerge {
    binary: String,
}

impl GitMerge {
    /// Use the git executable `binary`.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Initialize `repo` and commit the three snapshots on their branches,
    /// leaving [`ORIGINAL_BRANCH`] checked out.
    ///
    /// # Errors
    /// Any git or filesystem failure.
    pub fn record_snapshots(&self, repo: &Path, snapshots: &Snapshots) -> Result<GitCli, OoxmlError> {
        fs::create_dir_all(repo)?;
        let git = GitCli::new(self.binary.as_str(), repo);
        git.init(ORIGINAL_BRANCH)?;
        git.configure_identity(AUTHOR_NAME, AUTHOR_EMAIL)?;

        let tree = tree_root(repo);
        record(&git, &snapshots.ancestor, &tree, "Original")?;

        git.create_branch(VARIANT_A_BRANCH)?;
        record(&git, &snapshots.variant_a, &tree, "Version A")?;

        git.checkout(ORIGINAL_BRANCH)?;
        git.create_branch(VARIANT_B_BRANCH)?;
        record(&git, &snapshots.variant_b, &tree, "Version B")?;

        git.checkout(ORIGINAL_BRANCH)?;
        Ok(git)
    }
}

impl ThreeWayMerge for GitMerge {
    fn name(&self) -> &'static str {
        "git"
    }

    fn probe(&self) -> Result<(), OoxmlError> {
        let version = GitCli::version(&self.binary)?;
        tracing::debug!(%version, "git available");
        Ok(())
    }

    fn merge(
        &self,
        snapshots: &Snapshots,
        policy: ConflictPolicy,
        workdir: &Path,
    ) -> Result<MergedTree, OoxmlError> {
        let repo = workdir.join("repo");
        let git = self.record_snapshots(&repo, snapshots)?;

        let step_a = merge_branch(&git, VARIANT_A_BRANCH, policy)?;
        let step_b = merge_branch(&git, VARIANT_B_BRANCH, policy)?;

        let mut conflicts = step_a.conflicts;
        conflicts.extend(step_b.conflicts);
        conflicts.sort();
        conflicts.dedup();
        Ok(MergedTree {
            root: tree_root(&repo),
            changed_by_a: step_a.changed,
            changed_by_b: step_b.changed,
            conflicts,
        })
    }
}

/// Replace the working tree folder with `snapshot` and commit it.
fn record(git: &GitCli, snapshot: &Path, tree: &Path, message: &str) -> Result<(), OoxmlError> {
    if tree.exists() {
        fs::remove_dir_all(tree)?;
    }
    let files = copy_tree(snapshot, tree)?;
    git.add_all()?;
    git.commit(message)?;
    tracing::debug!(snapshot = message, files, "recorded snapshot");
    Ok(())
}

#[derive(Debug, Default)]
struct BranchMerge {
    changed: usize,
    conflicts: Vec<String>,
}

/// Merge `branch` into `HEAD` with whole-file conflict resolution.
fn merge_branch(
    git: &GitCli,
    branch: &str,
    policy: ConflictPolicy,
) -> Result<BranchMerge, OoxmlError> {
    let base = git.merge_base("HEAD", branch)?;
    let theirs: BTreeSet<String> = git.changed_paths(&base, branch)?.into_iter().collect();
    let ours: BTreeSet<String> = git.changed_paths(&base, "HEAD")?.into_iter().collect();
    let differing: BTreeSet<String> = git.changed_paths("HEAD", branch)?.into_iter().collect();
    let conflicts: Vec<String> = theirs
        .iter()
        .filter(|path| ours.contains(*path) && differing.contains(*path))
        .cloned()
        .collect();

    let outcome = git.merge_no_commit(branch, policy.strategy_option())?;
    tracing::debug!(branch, ?outcome, conflicts = conflicts.len(), "merged branch");

    let winner = match policy {
        ConflictPolicy::IncomingWins => branch,
        ConflictPolicy::CurrentWins => "HEAD",
    };
    for path in &conflicts {
        if git.path_exists_at(winner, path)? {
            git.restore_path(winner, path)?;
        } else {
            git.remove_path(path)?;
        }
    }

    let unresolved = git.unmerged_paths()?;
    if !unresolved.is_empty() {
        return Err(GitError::UnresolvedMerge {
            branch: branch.to_owned(),
            paths: unresolved,
        }
        .into());
    }
    if git.merge_in_progress()? {
        git.commit_merge(&format!("Merge {branch}"))?;
    }

    Ok(BranchMerge {
        changed: theirs.len(),
        conflicts: conflicts.iter().map(|p| tree_relative(p)).collect(),
    })
}

/// Strip the [`TREE_DIR`] prefix from a repository path.
fn tree_relative(path: &str) -> String {
    path.strip_prefix(TREE_DIR)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
        .to_owned()
}

/// Where the merged tree lives for a repository at `repo`.
#[must_use]
pub fn tree_root(repo: &Path) -> PathBuf {
    repo.join(TREE_DIR)
}
