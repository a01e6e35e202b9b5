//! OOXML package container: reading, extracting and packing.
//!
//! A package is a zip archive of named parts. [`extract`] turns an archive
//! into a directory tree (optionally pretty-printing every XML part),
//! [`pack`] turns such a tree back into an archive with XML parts minified.
//! [`Package`] is the read-only in-memory view used by tests and tooling.
//!
//! The macro-project bridge ([`MacroProject`]) runs after a successful
//! extract or pack. Its failure is reported, never fatal.

pub mod extract;
pub mod macros;
pub mod pack;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use zip::ZipArchive;

use crate::error::OoxmlError;
use crate::paths;

pub use extract::{ExtractOptions, extract};
pub use macros::{CommandMacroProject, MacroProject, NoMacroProject};
pub use pack::pack;

// ---------------------------------------------------------------------------
// Package model
// ---------------------------------------------------------------------------

/// A named part inside a package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    /// Forward-slash relative name, never absolute.
    pub name: String,
    /// Raw content bytes.
    pub data: Vec<u8>,
}

impl Part {
    /// Whether the part's extension marks it as XML.
    #[must_use]
    pub fn is_xml(&self) -> bool {
        paths::is_xml_part(Path::new(&self.name))
    }
}

/// Parts of an archive, in archive order. Names are unique.
#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: Vec<Part>,
}

impl Package {
    /// Read every file entry of the archive at `path`.
    ///
    /// # Errors
    /// [`OoxmlError::NotFound`] if the file is missing,
    /// [`OoxmlError::InvalidArchive`] if it is not a zip, an entry escapes
    /// the archive root, or a name appears twice.
    pub fn open(path: &Path) -> Result<Self, OoxmlError> {
        if !path.exists() {
            return Err(OoxmlError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        let mut zip = ZipArchive::new(file).map_err(|e| invalid_archive(path, &e))?;
        Self::read_zip(&mut zip, path)
    }

    /// Read a package from an in-memory archive.
    ///
    /// # Errors
    /// [`OoxmlError::InvalidArchive`] as for [`Package::open`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OoxmlError> {
        let label = Path::new("<memory>");
        let mut zip = ZipArchive::new(std::io::Cursor::new(bytes))
            .map_err(|e| invalid_archive(label, &e))?;
        Self::read_zip(&mut zip, label)
    }

    fn read_zip<R: Read + std::io::Seek>(
        zip: &mut ZipArchive<R>,
        path: &Path,
    ) -> Result<Self, OoxmlError> {
        let mut parts: Vec<Part> = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| invalid_archive(path, &e))?;
            if entry.is_dir() {
                continue;
            }
            let Some(name) = safe_entry_name(entry.name(), entry.enclosed_name()) else {
                return Err(OoxmlError::InvalidArchive {
                    path: path.to_path_buf(),
                    detail: format!("entry '{}' escapes the archive root", entry.name()),
                });
            };
            if parts.iter().any(|p| p.name == name) {
                return Err(OoxmlError::InvalidArchive {
                    path: path.to_path_buf(),
                    detail: format!("duplicate entry '{name}'"),
                });
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            parts.push(Part { name, data });
        }
        Ok(Self { parts })
    }

    /// All parts, in archive order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Part names, in archive order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.name.as_str())
    }

    /// Content of the part called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// Number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the package has no parts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Normalized name of an entry that stays inside the archive root.
fn safe_entry_name(raw: &str, enclosed: Option<PathBuf>) -> Option<String> {
    let enclosed = enclosed?;
    let name = paths::entry_name(Path::new(""), &enclosed)?;
    // enclosed_name() accepts a leading separator; part names never carry one.
    if raw.starts_with('/') || raw.starts_with('\\') {
        return None;
    }
    Some(name)
}

pub(crate) fn invalid_archive(path: &Path, err: &zip::result::ZipError) -> OoxmlError {
    OoxmlError::InvalidArchive {
        path: path.to_path_buf(),
        detail: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// How many XML parts were pretty-printed during an extract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FormatReport {
    /// Parts rewritten in pretty form.
    pub formatted: usize,
    /// XML parts found.
    pub total: usize,
}

impl FormatReport {
    /// Parts left as extracted because formatting failed.
    #[must_use]
    pub const fn failed(&self) -> usize {
        self.total.saturating_sub(self.formatted)
    }
}

/// Outcome of [`extract`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    /// The directory actually written. Differs from the requested one when
    /// that was taken and a `_NNN` sibling was allocated.
    pub target: PathBuf,
    /// File entries written.
    pub files: usize,
    /// Pretty-print counts; zero when not requested.
    pub formatting: FormatReport,
    /// Whether the macro-project export ran and succeeded.
    pub macro_project: bool,
}

/// Outcome of [`pack`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PackReport {
    /// The archive written.
    pub target: PathBuf,
    /// Entries written.
    pub files: usize,
    /// XML entries stored minified.
    pub xml_parts: usize,
    /// XML entries stored as-is because they could not be minified.
    pub unformatted: usize,
    /// Whether the macro-project import ran and succeeded.
    pub macro_project: bool,
}
