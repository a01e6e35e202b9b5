//! Shared test helpers for ooxml integration tests.
//!
//! All tests use temp directories; nothing touches the real filesystem
//! outside them. Fixture packages are small zip archives built in memory
//! with the same XML shape office applications write: a declaration and
//! the whole body on one line.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Output};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Write a zip archive with the given entries, in the given order.
pub fn write_package(path: &Path, entries: &[(&str, &[u8])]) {
    let file = File::create(path).expect("failed to create fixture archive");
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// Every file entry of an archive, by name.
pub fn read_package(path: &Path) -> BTreeMap<String, Vec<u8>> {
    let file = File::open(path).expect("failed to open archive");
    let mut zip = ZipArchive::new(file).expect("not a zip archive");
    let mut parts = BTreeMap::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        parts.insert(entry.name().to_owned(), data);
    }
    parts
}

/// Entry names of an archive, in archive order.
pub fn entry_names(path: &Path) -> Vec<String> {
    let file = File::open(path).expect("failed to open archive");
    let mut zip = ZipArchive::new(file).expect("not a zip archive");
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_owned())
        .collect()
}

/// Text of one part, panicking if it is missing.
pub fn part_text(parts: &BTreeMap<String, Vec<u8>>, name: &str) -> String {
    let data = parts
        .get(name)
        .unwrap_or_else(|| panic!("part {name} missing; have {:?}", parts.keys()));
    String::from_utf8(data.clone()).expect("part is not UTF-8")
}

/// A one-line sheet part holding `cells` as inline strings in row 1.
pub fn sheet_xml(cells: &[&str]) -> String {
    let cells: String = cells
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let col = char::from(b'A' + u8::try_from(i).unwrap());
            format!(r#"<c r="{col}1" t="inlineStr"><is><t>{text}</t></is></c>"#)
        })
        .collect();
    format!(
        r#"{DECL}<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1">{cells}</row></sheetData></worksheet>"#
    )
}

/// A small workbook: two sheets, a picture, and the usual plumbing parts.
pub fn workbook_parts(sheet1: &[&str], sheet2: &[&str]) -> Vec<(String, Vec<u8>)> {
    vec![
        (
            "[Content_Types].xml".to_owned(),
            format!(
                r#"{DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/></Types>"#
            )
            .into_bytes(),
        ),
        (
            "_rels/.rels".to_owned(),
            format!(
                r#"{DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
            )
            .into_bytes(),
        ),
        (
            "xl/workbook.xml".to_owned(),
            format!(
                r#"{DECL}<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets><sheet name="One" sheetId="1"/><sheet name="Two" sheetId="2"/></sheets></workbook>"#
            )
            .into_bytes(),
        ),
        ("xl/worksheets/sheet1.xml".to_owned(), sheet_xml(sheet1).into_bytes()),
        ("xl/worksheets/sheet2.xml".to_owned(), sheet_xml(sheet2).into_bytes()),
        ("xl/media/image1.png".to_owned(), b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec()),
    ]
}

/// Write `parts` as an archive at `path`.
pub fn write_parts(path: &Path, parts: &[(String, Vec<u8>)]) {
    let entries: Vec<(&str, &[u8])> = parts
        .iter()
        .map(|(name, data)| (name.as_str(), data.as_slice()))
        .collect();
    write_package(path, &entries);
}

/// Whether a usable `git` is on PATH. Git-engine tests skip without it.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|out| out.status.success())
}

/// Run the ooxml binary in `dir`, isolated from the caller's config.
pub fn ooxml_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ooxml"))
        .args(args)
        .current_dir(dir)
        .env_remove("OOXML_CONFIG")
        .env_remove("OOXML_LOG")
        .output()
        .expect("failed to execute ooxml")
}

/// Run ooxml and assert it succeeds. Returns stdout as string.
pub fn ooxml_ok(dir: &Path, args: &[&str]) -> String {
    let out = ooxml_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        out.status.success(),
        "ooxml {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    stdout.to_string()
}

/// Run ooxml and assert it fails. Returns stderr as string.
pub fn ooxml_fails(dir: &Path, args: &[&str]) -> String {
    let out = ooxml_in(dir, args);
    assert!(
        !out.status.success(),
        "Expected ooxml {} to fail, but it succeeded.\nstdout: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    String::from_utf8_lossy(&out.stderr).to_string()
}
