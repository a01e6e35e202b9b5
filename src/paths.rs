//! Path allocation and part-name helpers shared by extraction and packing.

use std::path::{Component, Path, PathBuf};

/// Extensions (lowercase, without dot) whose parts are XML and get
/// canonicalized.
pub const XML_EXTENSIONS: &[&str] = &["xml", "rels", "vml"];

/// Folder the macro-project export writes into. Never repacked.
pub const MACRO_PROJECT_DIR: &str = "vbaProject";

/// Return `base` if it does not exist, otherwise the first free sibling
/// `base_001`, `base_002`, ….
///
/// Purely a naming function: nothing is created, nothing is overwritten.
#[must_use]
pub fn allocate_unique_path(base: &Path) -> PathBuf {
    if !base.exists() {
        return base.to_path_buf();
    }
    let name = base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parent = base.parent().unwrap_or_else(|| Path::new(""));
    (1u64..)
        .map(|counter| parent.join(format!("{name}_{counter:03}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| base.to_path_buf())
}

/// Whether a part is XML by its extension, case-insensitively.
///
/// A dot-leading name such as `_rels/.rels` counts as all extension.
#[must_use]
pub fn is_xml_part(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.rsplit_once('.'))
        .is_some_and(|(_, ext)| {
            XML_EXTENSIONS
                .iter()
                .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
}

/// Whether a file sits directly inside a macro-project folder.
#[must_use]
pub fn in_macro_project(path: &Path) -> bool {
    path.parent()
        .and_then(Path::file_name)
        .is_some_and(|name| name == MACRO_PROJECT_DIR)
}

/// The archive entry name for `path` relative to `root`: forward slashes,
/// no leading separator. `None` if `path` is outside `root` or a component
/// is not valid UTF-8.
#[must_use]
pub fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}
