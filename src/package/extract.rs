//! Archive → directory tree.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use super::{ExtractReport, FormatReport, MacroProject, invalid_archive};
use crate::error::OoxmlError;
use crate::paths::{self, MACRO_PROJECT_DIR};
use crate::xml;

/// How [`extract`] treats the target directory and the XML parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Delete an existing target instead of allocating a `_NNN` sibling.
    pub overwrite: bool,
    /// Pretty-print every XML part after extraction.
    pub prettify: bool,
    /// Spaces per nesting level when pretty-printing.
    pub indent: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            prettify: false,
            indent: xml::DEFAULT_INDENT,
        }
    }
}

/// Extract every entry of `archive` into `target_dir`.
///
/// The archive is validated before anything is created on disk. If
/// `target_dir` exists and `overwrite` is off, the first free sibling from
/// [`paths::allocate_unique_path`] is used instead; the report carries the
/// directory actually written.
///
/// Formatting failures and a failing macro export are logged and counted,
/// never returned.
///
/// # Errors
/// - [`OoxmlError::NotFound`] if `archive` does not exist.
/// - [`OoxmlError::InvalidArchive`] if it is not a zip or an entry would
///   land outside the target. A partially written target is removed.
/// - [`OoxmlError::Io`] on filesystem failures.
pub fn extract(
    archive: &Path,
    target_dir: &Path,
    options: &ExtractOptions,
    macros: &dyn MacroProject,
) -> Result<ExtractReport, OoxmlError> {
    if !archive.exists() {
        return Err(OoxmlError::NotFound {
            path: archive.to_path_buf(),
        });
    }
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file).map_err(|e| invalid_archive(archive, &e))?;

    let target = resolve_target(target_dir, options.overwrite)?;
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir(&target).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => OoxmlError::AlreadyExists {
            path: target.clone(),
        },
        _ => OoxmlError::Io(e),
    })?;

    let files = match unpack_entries(&mut zip, archive, &target) {
        Ok(files) => files,
        Err(err) => {
            discard_partial(&target);
            return Err(err);
        }
    };
    tracing::info!(archive = %archive.display(), target = %target.display(), files, "extracted");

    let formatting = if options.prettify {
        prettify_tree(&target, options.indent)
    } else {
        FormatReport::default()
    };

    let macro_project = match macros.export(archive, &target.join(MACRO_PROJECT_DIR)) {
        Ok(done) => done,
        Err(err) => {
            tracing::warn!(error = %err, "macro project export failed");
            false
        }
    };

    Ok(ExtractReport {
        target,
        files,
        formatting,
        macro_project,
    })
}

fn resolve_target(target_dir: &Path, overwrite: bool) -> Result<PathBuf, OoxmlError> {
    if !target_dir.exists() {
        return Ok(target_dir.to_path_buf());
    }
    if !overwrite {
        let allocated = paths::allocate_unique_path(target_dir);
        tracing::info!(
            requested = %target_dir.display(),
            allocated = %allocated.display(),
            "target exists, using a new folder"
        );
        return Ok(allocated);
    }
    if target_dir.is_dir() {
        fs::remove_dir_all(target_dir)?;
    } else {
        fs::remove_file(target_dir)?;
    }
    Ok(target_dir.to_path_buf())
}

fn unpack_entries(
    zip: &mut ZipArchive<File>,
    archive: &Path,
    target: &Path,
) -> Result<usize, OoxmlError> {
    let mut files = 0;
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| invalid_archive(archive, &e))?;
        let Some(rel) = entry.enclosed_name() else {
            return Err(OoxmlError::InvalidArchive {
                path: archive.to_path_buf(),
                detail: format!("entry '{}' escapes the target directory", entry.name()),
            });
        };
        let out = target.join(rel);
        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut dest = File::create(&out)?;
        io::copy(&mut entry, &mut dest).map_err(|e| OoxmlError::InvalidArchive {
            path: archive.to_path_buf(),
            detail: format!("entry '{}': {e}", entry.name()),
        })?;
        files += 1;
    }
    Ok(files)
}

/// Pretty-print every XML part under `root`, counting successes.
fn prettify_tree(root: &Path, indent: usize) -> FormatReport {
    let mut report = FormatReport::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() || !paths::is_xml_part(entry.path()) {
            continue;
        }
        report.total += 1;
        match xml::prettify_file(entry.path(), indent) {
            Ok(()) => report.formatted += 1,
            Err(err) => tracing::warn!(error = %err, "left unformatted"),
        }
    }
    tracing::debug!(formatted = report.formatted, total = report.total, "prettified");
    report
}

fn discard_partial(target: &Path) {
    if let Err(err) = fs::remove_dir_all(target) {
        tracing::warn!(target = %target.display(), error = %err, "could not remove partial extraction");
    }
}
