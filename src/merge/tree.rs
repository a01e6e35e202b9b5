//! In-process merge engine.
//!
//! Indexes each tree by forward-slash path and SHA-256 digest, then replays
//! the three-way rules over those indexes. No external tool is involved.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use super::{ConflictPolicy, MergedTree, Snapshots, ThreeWayMerge};
use crate::error::OoxmlError;
use crate::paths;

/// A file in one of the trees.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    path: PathBuf,
    digest: [u8; 32],
}

type Index = BTreeMap<String, Entry>;

/// Per-step counts.
#[derive(Debug, Default)]
struct Step {
    changed: usize,
    conflicts: Vec<String>,
}

/// File-level three-way merge computed from content digests.
#[derive(Clone, Copy, Debug, Default)]
pub struct TreeMerge;

impl ThreeWayMerge for TreeMerge {
    fn name(&self) -> &'static str {
        "in-process"
    }

    fn probe(&self) -> Result<(), OoxmlError> {
        Ok(())
    }

    fn merge(
        &self,
        snapshots: &Snapshots,
        policy: ConflictPolicy,
        workdir: &Path,
    ) -> Result<MergedTree, OoxmlError> {
        let base = index(&snapshots.ancestor)?;
        let variant_a = index(&snapshots.variant_a)?;
        let variant_b = index(&snapshots.variant_b)?;

        let mut current = base.clone();
        let step_a = merge_step(&mut current, &base, &variant_a, policy);
        let step_b = merge_step(&mut current, &base, &variant_b, policy);

        let root = workdir.join("merged");
        if root.exists() {
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        for (name, entry) in &current {
            let dest = root.join(name);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&entry.path, &dest)?;
        }
        tracing::debug!(files = current.len(), root = %root.display(), "wrote merged tree");

        let mut conflicts = step_a.conflicts;
        conflicts.extend(step_b.conflicts);
        conflicts.sort();
        conflicts.dedup();
        Ok(MergedTree {
            root,
            changed_by_a: step_a.changed,
            changed_by_b: step_b.changed,
            conflicts,
        })
    }
}

/// Apply `incoming`'s changes relative to `base` onto `current`.
fn merge_step(
    current: &mut Index,
    base: &Index,
    incoming: &Index,
    policy: ConflictPolicy,
) -> Step {
    let names: BTreeSet<String> = base
        .keys()
        .chain(incoming.keys())
        .chain(current.keys())
        .cloned()
        .collect();

    let mut step = Step::default();
    for name in names {
        let digest_of = |idx: &Index| idx.get(&name).map(|e| e.digest);
        let (ancestor, theirs, ours) = (digest_of(base), digest_of(incoming), digest_of(&*current));
        if theirs == ancestor {
            continue;
        }
        step.changed += 1;
        let take_incoming = if ours == ancestor || ours == theirs {
            true
        } else {
            tracing::debug!(path = %name, %policy, "changed on both sides");
            step.conflicts.push(name.clone());
            policy == ConflictPolicy::IncomingWins
        };
        if take_incoming {
            match incoming.get(&name) {
                Some(entry) => {
                    current.insert(name, entry.clone());
                }
                None => {
                    current.remove(&name);
                }
            }
        }
    }
    step
}

/// Index every regular file under `root`.
fn index(root: &Path) -> Result<Index, OoxmlError> {
    let mut idx = Index::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| OoxmlError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = paths::entry_name(root, entry.path()) else {
            return Err(OoxmlError::MergeFailed {
                detail: format!("cannot name '{}' inside the tree", entry.path().display()),
            });
        };
        let bytes = fs::read(entry.path())?;
        idx.insert(
            name,
            Entry {
                path: entry.path().to_path_buf(),
                digest: Sha256::digest(&bytes).into(),
            },
        );
    }
    Ok(idx)
}
