//! XML canonicalization: pretty ⇄ minified.
//!
//! Both directions split off an optional `<?xml … ?>` declaration and work on
//! the remaining body as text; no DOM is built. The body is cut into
//! *segments* at every run of whitespace between a `>` and the next `<`.
//! Pretty form writes one segment per line, indented by nesting depth;
//! minified form writes the segments back to back. Segments themselves are
//! never altered, so `minify(pretty(x)) == minify(x)` for any input.
//!
//! Input that is not well-formed still formats without panicking; only the
//! indentation may come out wrong.

use std::path::Path;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::OoxmlError;

/// Indentation width used when the caller does not pick one.
pub const DEFAULT_INDENT: usize = 2;

const BOM: char = '\u{feff}';

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<\?xml [^?]+\?>\s*").expect("declaration pattern is valid")
});

static INTER_TAG_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*<").expect("inter-tag pattern is valid"));

static INTER_TAG_WS_NONEMPTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s+<").expect("inter-tag pattern is valid"));

// ---------------------------------------------------------------------------
// XmlDocument
// ---------------------------------------------------------------------------

/// An XML document split into optional BOM, optional declaration, and body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct XmlDocument<'a> {
    /// Whether the text started with a UTF-8 byte order mark.
    pub bom: bool,
    /// The `<?xml … ?>` declaration, trimmed.
    pub declaration: Option<&'a str>,
    /// Everything after the declaration, trimmed.
    pub body: &'a str,
}

impl<'a> XmlDocument<'a> {
    /// Split `text` into its parts. Never fails.
    #[must_use]
    pub fn split(text: &'a str) -> Self {
        let (bom, text) = text
            .strip_prefix(BOM)
            .map_or((false, text), |rest| (true, rest));
        let text = text.trim_start();
        match DECLARATION.find(text) {
            Some(m) => Self {
                bom,
                declaration: Some(m.as_str().trim()),
                body: text[m.end()..].trim(),
            },
            None => Self {
                bom,
                declaration: None,
                body: text.trim(),
            },
        }
    }

    /// Pretty form: one segment per line, `indent` spaces per depth level.
    #[must_use]
    pub fn pretty(&self, indent: usize) -> String {
        let mut lines = Vec::new();
        let mut depth = 0usize;

        for segment in segments(self.body) {
            if segment.is_empty() {
                continue;
            }
            if !segment.starts_with('<') {
                lines.push(segment.to_owned());
                continue;
            }
            let delta = depth_delta(segment);
            if delta < 0 {
                depth = depth.saturating_sub(delta.unsigned_abs());
            }
            lines.push(format!("{}{segment}", " ".repeat(indent * depth)));
            if delta > 0 {
                depth += delta.unsigned_abs();
            }
        }

        self.assemble(&lines.join("\n"))
    }

    /// Minified form: whitespace between tags removed.
    #[must_use]
    pub fn minified(&self) -> String {
        let body = INTER_TAG_WS_NONEMPTY.replace_all(self.body, "><");
        self.assemble(&body)
    }

    fn assemble(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len() + 64);
        if self.bom {
            out.push(BOM);
        }
        if let Some(declaration) = self.declaration {
            out.push_str(declaration);
            out.push('\n');
        }
        out.push_str(body);
        out
    }
}

/// Cut `body` at every `>`-whitespace-`<` run. Each segment keeps its own
/// `>` and `<`; only the whitespace between them is dropped.
fn segments(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for m in INTER_TAG_WS.find_iter(body) {
        out.push(&body[start..=m.start()]);
        start = m.end() - 1;
    }
    out.push(&body[start..]);
    out
}

/// Net nesting change of one segment: opening tags minus closing tags.
///
/// Self-closing tags, comments, CDATA sections, processing instructions and
/// doctype declarations do not count. Quoted attribute values may contain `>`.
fn depth_delta(segment: &str) -> isize {
    let bytes = segment.as_bytes();
    let mut delta = 0isize;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'<' {
            i += 1;
            continue;
        }
        let rest = &segment[i..];
        if rest.starts_with("<!--") {
            i += rest.find("-->").map_or(rest.len(), |end| end + 3);
            continue;
        }
        if rest.starts_with("<![CDATA[") {
            i += rest.find("]]>").map_or(rest.len(), |end| end + 3);
            continue;
        }

        let end = tag_end(bytes, i);
        let tag = &segment[i..end];
        if tag.starts_with("</") {
            delta -= 1;
        } else if tag.starts_with("<?") || tag.starts_with("<!") {
            // neutral
        } else if !tag.ends_with("/>") {
            delta += 1;
        }
        i = end;
    }
    delta
}

/// Index just past the `>` closing the tag that starts at `start`, honoring
/// quoted attribute values. Returns `bytes.len()` for an unterminated tag.
fn tag_end(bytes: &[u8], start: usize) -> usize {
    let mut quote = None;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        match (quote, b) {
            (None, b'"' | b'\'') => quote = Some(b),
            (Some(q), _) if q == b => quote = None,
            (None, b'>') => return start + offset + 1,
            _ => {}
        }
    }
    bytes.len()
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Pretty-print with the default two-space indent.
#[must_use]
pub fn to_pretty(text: &str) -> String {
    XmlDocument::split(text).pretty(DEFAULT_INDENT)
}

/// Pretty-print with `indent` spaces per nesting level.
#[must_use]
pub fn to_pretty_with_indent(text: &str, indent: usize) -> String {
    XmlDocument::split(text).pretty(indent)
}

/// Minify and encode as UTF-8.
#[must_use]
pub fn to_minified(text: &str) -> Vec<u8> {
    XmlDocument::split(text).minified().into_bytes()
}

/// Rewrite an XML file on disk in pretty form.
///
/// # Errors
/// [`OoxmlError::FormattingFailure`] if the file is not UTF-8 or cannot be
/// read or written. The file is left untouched on failure.
pub fn prettify_file(path: &Path, indent: usize) -> Result<(), OoxmlError> {
    let text = read_utf8(path)?;
    std::fs::write(path, to_pretty_with_indent(&text, indent)).map_err(|e| {
        OoxmlError::FormattingFailure {
            path: path.to_path_buf(),
            detail: e.to_string(),
        }
    })
}

/// Read an XML file and return its minified bytes.
///
/// # Errors
/// [`OoxmlError::FormattingFailure`] if the file is not UTF-8 or cannot be read.
pub fn minify_file(path: &Path) -> Result<Vec<u8>, OoxmlError> {
    read_utf8(path).map(|text| to_minified(&text))
}

fn read_utf8(path: &Path) -> Result<String, OoxmlError> {
    let bytes = std::fs::read(path).map_err(|e| OoxmlError::FormattingFailure {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| OoxmlError::FormattingFailure {
        path: path.to_path_buf(),
        detail: format!("not valid UTF-8: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
