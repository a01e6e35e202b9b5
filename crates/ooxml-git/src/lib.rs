//! Git bridge for ooxml-merge.
//!
//! This crate wraps the `git` executable behind [`GitCli`], the single
//! interface the merge engine uses to record package snapshots and merge
//! them. Nothing else in the workspace spawns `git` directly.
//!
//! # Crate layout
//!
//! - [`cli`] — [`GitCli`], one method per git operation the merge needs.
//! - [`types`] — value types used in method signatures ([`StrategyOption`],
//!   [`MergeOutcome`]).
//! - [`error`] — the [`GitError`] enum returned by every method.

pub mod cli;
pub mod error;
pub mod types;

pub use cli::GitCli;
pub use error::GitError;
pub use types::{MergeOutcome, StrategyOption};
