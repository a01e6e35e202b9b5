//! [`GitCli`] — runs the `git` executable inside one explicit working directory.
//!
//! Every call passes `current_dir` explicitly; nothing depends on the
//! process-wide working directory, so independent merges in separate temp
//! directories never observe each other.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::error::GitError;
use crate::types::{MergeOutcome, StrategyOption};

/// Settings forced on every invocation so user or system config cannot
/// change what a snapshot commit or merge produces.
const FIXED_CONFIG: &[&str] = &[
    "-c",
    "core.autocrlf=false",
    "-c",
    "core.quotepath=false",
    "-c",
    "commit.gpgsign=false",
    "-c",
    "merge.renames=false",
];

/// A git repository driven through the command line.
#[derive(Clone, Debug)]
pub struct GitCli {
    binary: String,
    workdir: PathBuf,
}

impl GitCli {
    /// Bind to `workdir`. The directory does not need to be a repository yet.
    pub fn new(binary: impl Into<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            workdir: workdir.into(),
        }
    }

    /// The directory every command runs in.
    #[must_use]
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Probe `binary --version`.
    ///
    /// # Errors
    /// [`GitError::Unavailable`] if the binary cannot be spawned or exits
    /// unsuccessfully.
    pub fn version(binary: &str) -> Result<String, GitError> {
        let output = Command::new(binary)
            .arg("--version")
            .output()
            .map_err(|e| GitError::Unavailable {
                binary: binary.to_owned(),
                message: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(GitError::Unavailable {
                binary: binary.to_owned(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
    }

    /// `git init` and point `HEAD` at `initial_branch` before the first commit.
    ///
    /// Setting the symbolic ref directly works on every git version, unlike
    /// `git init -b`.
    ///
    /// # Errors
    /// Returns an error if either command fails.
    pub fn init(&self, initial_branch: &str) -> Result<(), GitError> {
        self.run(&["init", "-q"])?;
        let head = format!("refs/heads/{initial_branch}");
        self.run(&["symbolic-ref", "HEAD", &head])
    }

    /// Write a repository-local config value.
    ///
    /// # Errors
    /// Returns an error if `git config` fails.
    pub fn set_config(&self, key: &str, value: &str) -> Result<(), GitError> {
        self.run(&["config", key, value])
    }

    /// Set the committer identity for this repository.
    ///
    /// # Errors
    /// Returns an error if `git config` fails.
    pub fn configure_identity(&self, name: &str, email: &str) -> Result<(), GitError> {
        self.set_config("user.name", name)?;
        self.set_config("user.email", email)
    }

    /// Stage every addition, modification and deletion in the working tree.
    ///
    /// # Errors
    /// Returns an error if `git add` fails.
    pub fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "-A", "."])
    }

    /// Commit the index. Empty commits are allowed so an unchanged snapshot
    /// still gets its own revision.
    ///
    /// # Errors
    /// Returns an error if `git commit` fails.
    pub fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-q", "--allow-empty", "--no-verify", "-m", message])
    }

    /// Create `name` at `HEAD` and switch to it.
    ///
    /// # Errors
    /// Returns an error if `git checkout -b` fails.
    pub fn create_branch(&self, name: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-q", "-b", name])
    }

    /// Switch to an existing branch, replacing the working tree.
    ///
    /// # Errors
    /// Returns an error if `git checkout` fails.
    pub fn checkout(&self, name: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-q", "-f", name])
    }

    /// The merge base of two revisions.
    ///
    /// # Errors
    /// Returns an error if `git merge-base` fails or prints nothing.
    pub fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        let out = self.stdout(&["merge-base", a, b])?;
        let oid = out.trim();
        if oid.is_empty() {
            return Err(GitError::InvalidOutput {
                command: format!("git merge-base {a} {b}"),
                message: "empty merge base".to_owned(),
            });
        }
        Ok(oid.to_owned())
    }

    /// Paths that differ between two revisions, rename detection off.
    ///
    /// # Errors
    /// Returns an error if `git diff` fails.
    pub fn changed_paths(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let out = self.stdout(&["diff", "--name-only", "-z", "--no-renames", from, to])?;
        Ok(split_nul(&out))
    }

    /// `git merge --no-ff --no-commit -X <option> <branch>`.
    ///
    /// A merge that stops on conflicts is not an error: it returns
    /// [`MergeOutcome::Conflicted`] with `MERGE_HEAD` in place so the caller
    /// can resolve and commit.
    ///
    /// # Errors
    /// Returns an error if git fails without entering a merge state.
    pub fn merge_no_commit(
        &self,
        branch: &str,
        option: StrategyOption,
    ) -> Result<MergeOutcome, GitError> {
        let args = [
            "merge",
            "--no-ff",
            "--no-commit",
            "--no-edit",
            "-X",
            option.as_arg(),
            "-X",
            "no-renames",
            branch,
        ];
        let output = self.output(&args)?;
        if output.status.success() {
            return Ok(MergeOutcome::Clean);
        }
        if self.merge_in_progress()? {
            tracing::debug!(branch, "merge stopped with conflicts");
            return Ok(MergeOutcome::Conflicted);
        }
        Err(command_failed(&args, &output))
    }

    /// Whether `MERGE_HEAD` exists.
    ///
    /// # Errors
    /// Returns an error if git cannot be spawned.
    pub fn merge_in_progress(&self) -> Result<bool, GitError> {
        let output = self.output(&["rev-parse", "-q", "--verify", "MERGE_HEAD"])?;
        Ok(output.status.success())
    }

    /// Paths git still reports as unmerged.
    ///
    /// # Errors
    /// Returns an error if `git diff` fails.
    pub fn unmerged_paths(&self) -> Result<Vec<String>, GitError> {
        let out = self.stdout(&["diff", "--name-only", "-z", "--diff-filter=U"])?;
        let mut paths = split_nul(&out);
        paths.dedup();
        Ok(paths)
    }

    /// Whether `path` exists in the tree of `rev`.
    ///
    /// # Errors
    /// Returns an error if git cannot be spawned.
    pub fn path_exists_at(&self, rev: &str, path: &str) -> Result<bool, GitError> {
        let object = format!("{rev}:{path}");
        let output = self.output(&["cat-file", "-e", &object])?;
        Ok(output.status.success())
    }

    /// Replace `path` in index and working tree with its content at `rev`.
    ///
    /// # Errors
    /// Returns an error if `git checkout` fails.
    pub fn restore_path(&self, rev: &str, path: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-q", rev, "--", path])
    }

    /// Remove `path` from index and working tree. Missing paths are ignored.
    ///
    /// # Errors
    /// Returns an error if `git rm` fails.
    pub fn remove_path(&self, path: &str) -> Result<(), GitError> {
        self.run(&["rm", "-q", "-f", "--ignore-unmatch", "--", path])
    }

    /// Conclude an in-progress merge.
    ///
    /// # Errors
    /// Returns an error if `git commit` fails.
    pub fn commit_merge(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-q", "--no-verify", "-m", message])
    }

    /// Run a git command, ignoring output.
    fn run(&self, args: &[&str]) -> Result<(), GitError> {
        self.stdout(args)?;
        Ok(())
    }

    /// Run a git command and return its stdout.
    fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.output(args)?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(command_failed(args, &output))
        }
    }

    fn output(&self, args: &[&str]) -> Result<Output, GitError> {
        tracing::debug!(workdir = %self.workdir.display(), "git {}", args.join(" "));
        let output = Command::new(&self.binary)
            .args(FIXED_CONFIG)
            .args(args)
            .current_dir(&self.workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()?;
        Ok(output)
    }
}

fn command_failed(args: &[&str], output: &Output) -> GitError {
    GitError::CommandFailed {
        command: format!("git {}", args.join(" ")),
        exit_code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    }
}

fn split_nul(out: &str) -> Vec<String> {
    out.split('\0')
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_nul_drops_trailing_terminator() {
        assert_eq!(split_nul("a.xml\0dir/b.rels\0"), vec!["a.xml", "dir/b.rels"]);
        assert!(split_nul("").is_empty());
    }

    #[test]
    fn version_of_missing_binary_is_unavailable() {
        let err = GitCli::version("definitely-not-a-git-binary-7f3a").unwrap_err();
        assert!(matches!(err, GitError::Unavailable { .. }));
    }

    #[test]
    fn workdir_is_kept() {
        let git = GitCli::new("git", "/tmp/snapshots");
        assert_eq!(git.workdir(), Path::new("/tmp/snapshots"));
    }
}
