//! Value types used in [`GitCli`](crate::GitCli) signatures.

use std::fmt;

/// The `-X` option handed to git's merge strategy.
///
/// Decides which side wins a conflicting hunk inside git's own content
/// merge. Whole-file resolution on top of it is the caller's business.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyOption {
    /// `-X theirs`: the branch being merged in wins.
    Theirs,
    /// `-X ours`: the checked-out branch wins.
    Ours,
}

impl StrategyOption {
    /// The value passed after `-X`.
    #[must_use]
    pub const fn as_arg(self) -> &'static str {
        match self {
            Self::Theirs => "theirs",
            Self::Ours => "ours",
        }
    }
}

impl fmt::Display for StrategyOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// Result of `git merge --no-commit`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The merge applied without conflicts and is staged, waiting for a commit.
    Clean,
    /// The merge stopped with conflicts; `MERGE_HEAD` is set.
    Conflicted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_option_args() {
        assert_eq!(StrategyOption::Theirs.as_arg(), "theirs");
        assert_eq!(StrategyOption::Ours.to_string(), "ours");
    }
}
