//! ooxml library crate.
//!
//! The primary interface is the `ooxml` binary. This crate exposes the
//! pipeline behind it so other tools and the integration tests can extract,
//! pack and merge OOXML packages directly:
//!
//! - [`xml`] pretty-prints and minifies single XML parts.
//! - [`package`] extracts archives to trees and packs trees to archives.
//! - [`merge`] three-way merges packages through git or in process.
//! - [`paths`], [`config`] and [`error`] support the above.

pub mod config;
pub mod error;
pub mod merge;
pub mod package;
pub mod paths;
pub mod xml;

pub use error::OoxmlError;

// Private modules only used by the binary: commands, doctor, format,
// telemetry.
