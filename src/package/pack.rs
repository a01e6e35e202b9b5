//! Directory tree → archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::{MacroProject, PackReport};
use crate::error::OoxmlError;
use crate::paths::{self, MACRO_PROJECT_DIR};
use crate::xml;

/// A file selected for packing.
#[derive(Debug)]
struct Source {
    name: String,
    path: PathBuf,
    xml: bool,
}

/// Pack every file under `source_dir` into `target_file`.
///
/// Entries are written in lexical path order with a fixed timestamp and
/// fixed permissions, so packing the same tree twice yields identical bytes.
/// XML parts are minified; one that cannot be read as UTF-8 is stored as-is
/// and counted in [`PackReport::unformatted`]. Files directly inside the
/// macro-project folder are never packed; that folder feeds the macro
/// import that runs after the archive is written.
///
/// # Errors
/// - [`OoxmlError::NotFound`] / [`OoxmlError::NotADirectory`] for a bad
///   `source_dir`.
/// - [`OoxmlError::AlreadyExists`] if `target_file` exists and `overwrite`
///   is off. The existing file is left untouched.
/// - [`OoxmlError::Zip`] / [`OoxmlError::Io`] while writing. The partial
///   archive is removed.
pub fn pack(
    source_dir: &Path,
    target_file: &Path,
    overwrite: bool,
    macros: &dyn MacroProject,
) -> Result<PackReport, OoxmlError> {
    if !source_dir.exists() {
        return Err(OoxmlError::NotFound {
            path: source_dir.to_path_buf(),
        });
    }
    if !source_dir.is_dir() {
        return Err(OoxmlError::NotADirectory {
            path: source_dir.to_path_buf(),
        });
    }
    if target_file.exists() && !overwrite {
        return Err(OoxmlError::AlreadyExists {
            path: target_file.to_path_buf(),
        });
    }

    let sources = collect_sources(source_dir)?;
    if let Some(parent) = target_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let (xml_parts, unformatted) = match write_archive(&sources, target_file) {
        Ok(counts) => counts,
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(target_file) {
                tracing::warn!(target = %target_file.display(), error = %cleanup, "could not remove partial archive");
            }
            return Err(err);
        }
    };
    tracing::info!(
        source = %source_dir.display(),
        target = %target_file.display(),
        files = sources.len(),
        xml_parts,
        unformatted,
        "packed"
    );

    let macro_project = match macros.import(target_file, &source_dir.join(MACRO_PROJECT_DIR)) {
        Ok(done) => done,
        Err(err) => {
            tracing::warn!(error = %err, "macro project import failed");
            false
        }
    };

    Ok(PackReport {
        target: target_file.to_path_buf(),
        files: sources.len(),
        xml_parts,
        unformatted,
        macro_project,
    })
}

fn collect_sources(root: &Path) -> Result<Vec<Source>, OoxmlError> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| OoxmlError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if paths::in_macro_project(path) {
            tracing::debug!(path = %path.display(), "skipping macro project source");
            continue;
        }
        let Some(name) = paths::entry_name(root, path) else {
            tracing::warn!(path = %path.display(), "skipping file with a non UTF-8 name");
            continue;
        };
        sources.push(Source {
            name,
            path: path.to_path_buf(),
            xml: paths::is_xml_part(path),
        });
    }
    Ok(sources)
}

/// Returns `(xml_parts, unformatted)`.
fn write_archive(sources: &[Source], target: &Path) -> Result<(usize, usize), OoxmlError> {
    let zip_err = |e: zip::result::ZipError| OoxmlError::Zip {
        path: target.to_path_buf(),
        detail: e.to_string(),
    };
    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644);

    let mut writer = ZipWriter::new(File::create(target)?);
    let mut xml_parts = 0;
    let mut unformatted = 0;
    for source in sources {
        let data = if source.xml {
            match xml::minify_file(&source.path) {
                Ok(minified) => {
                    xml_parts += 1;
                    minified
                }
                Err(err) => {
                    tracing::warn!(error = %err, "storing part as-is");
                    unformatted += 1;
                    fs::read(&source.path)?
                }
            }
        } else {
            fs::read(&source.path)?
        };
        writer
            .start_file(source.name.as_str(), options)
            .map_err(zip_err)?;
        writer.write_all(&data)?;
    }
    writer.finish().map_err(zip_err)?;
    Ok((xml_parts, unformatted))
}
