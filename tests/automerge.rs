//! End-to-end automerge scenarios, run against both merge engines.
//!
//! Git-engine cases return early when git is not installed.

mod common;

use std::path::{Path, PathBuf};

use common::{git_available, part_text, read_package, sheet_xml, workbook_parts, write_parts};
use ooxml::OoxmlError;
use ooxml::merge::{
    AutomergeOptions, ConflictPolicy, GitMerge, MergeRepoOptions, ThreeWayMerge, TreeMerge,
    automerge, prepare_merge_repo,
};
use ooxml::package::NoMacroProject;
use ooxml_git::GitCli;
use tempfile::TempDir;

struct Inputs {
    _dir: TempDir,
    original: PathBuf,
    variant_a: PathBuf,
    variant_b: PathBuf,
    out: PathBuf,
}

fn inputs(
    original: &[(String, Vec<u8>)],
    variant_a: &[(String, Vec<u8>)],
    variant_b: &[(String, Vec<u8>)],
) -> Inputs {
    let dir = TempDir::new().unwrap();
    let path = |name: &str| dir.path().join(name);
    let (o, a, b) = (path("Book.xlsx"), path("Alice.xlsx"), path("Bob.xlsx"));
    write_parts(&o, original);
    write_parts(&a, variant_a);
    write_parts(&b, variant_b);
    Inputs {
        out: path("Merged.xlsx"),
        original: o,
        variant_a: a,
        variant_b: b,
        _dir: dir,
    }
}

fn run(
    engine: &dyn ThreeWayMerge,
    io: &Inputs,
    policy: ConflictPolicy,
) -> Result<ooxml::merge::MergeReport, OoxmlError> {
    let options = AutomergeOptions {
        force: false,
        policy,
        indent: 2,
        engine,
        macros: &NoMacroProject,
    };
    automerge(&io.original, &io.variant_a, &io.variant_b, &io.out, &options)
}

fn engines() -> Vec<Box<dyn ThreeWayMerge>> {
    let mut engines: Vec<Box<dyn ThreeWayMerge>> = vec![Box::new(TreeMerge)];
    if git_available() {
        engines.push(Box::new(GitMerge::new("git")));
    } else {
        eprintln!("git not installed; only the in-process engine runs");
    }
    engines
}

fn set(parts: &mut [(String, Vec<u8>)], name: &str, data: String) {
    let slot = parts.iter_mut().find(|(n, _)| n == name).unwrap();
    slot.1 = data.into_bytes();
}

/// Minified form as packed: declaration, newline, one-line body.
fn packed_sheet(cells: &[&str]) -> String {
    sheet_xml(cells).replacen("?>", "?>\n", 1)
}

#[test]
fn disjoint_edits_both_survive() {
    for engine in engines() {
        let original = workbook_parts(&["a"], &["b"]);
        let mut alice = original.clone();
        set(&mut alice, "xl/worksheets/sheet1.xml", sheet_xml(&["a", "from alice"]));
        let mut bob = original.clone();
        set(&mut bob, "xl/worksheets/sheet2.xml", sheet_xml(&["b", "from bob"]));
        let io = inputs(&original, &alice, &bob);

        let report = run(engine.as_ref(), &io, ConflictPolicy::IncomingWins).unwrap();
        assert_eq!(report.changed_by_a, 1, "{}", engine.name());
        assert_eq!(report.changed_by_b, 1, "{}", engine.name());
        assert!(report.conflicts.is_empty(), "{}", engine.name());

        let merged = read_package(&io.out);
        assert_eq!(
            part_text(&merged, "xl/worksheets/sheet1.xml"),
            packed_sheet(&["a", "from alice"])
        );
        assert_eq!(
            part_text(&merged, "xl/worksheets/sheet2.xml"),
            packed_sheet(&["b", "from bob"])
        );
        assert_eq!(merged.len(), original.len());
    }
}

#[test]
fn same_part_edited_by_both_takes_b_whole() {
    for engine in engines() {
        let original = workbook_parts(&["one", "two", "three"], &["x"]);
        let mut alice = original.clone();
        set(&mut alice, "xl/worksheets/sheet1.xml", sheet_xml(&["ONE", "two", "three"]));
        let mut bob = original.clone();
        set(&mut bob, "xl/worksheets/sheet1.xml", sheet_xml(&["one", "two", "THREE"]));
        let io = inputs(&original, &alice, &bob);

        let report = run(engine.as_ref(), &io, ConflictPolicy::IncomingWins).unwrap();
        assert_eq!(report.conflicts, ["xl/worksheets/sheet1.xml"], "{}", engine.name());

        // Whole-file: Alice's non-overlapping line edit does not survive.
        let merged = read_package(&io.out);
        assert_eq!(
            part_text(&merged, "xl/worksheets/sheet1.xml"),
            packed_sheet(&["one", "two", "THREE"]),
            "{}",
            engine.name()
        );
    }
}

#[test]
fn current_wins_keeps_a_on_conflict() {
    for engine in engines() {
        let original = workbook_parts(&["base"], &["x"]);
        let mut alice = original.clone();
        set(&mut alice, "xl/worksheets/sheet1.xml", sheet_xml(&["alice"]));
        let mut bob = original.clone();
        set(&mut bob, "xl/worksheets/sheet1.xml", sheet_xml(&["bob"]));
        let io = inputs(&original, &alice, &bob);

        let report = run(engine.as_ref(), &io, ConflictPolicy::CurrentWins).unwrap();
        assert_eq!(report.policy, ConflictPolicy::CurrentWins);
        let merged = read_package(&io.out);
        assert_eq!(
            part_text(&merged, "xl/worksheets/sheet1.xml"),
            packed_sheet(&["alice"]),
            "{}",
            engine.name()
        );
    }
}

#[test]
fn deletions_and_additions_apply() {
    for engine in engines() {
        let original = workbook_parts(&["a"], &["b"]);
        let alice: Vec<_> = original
            .iter()
            .filter(|(name, _)| name != "xl/media/image1.png")
            .cloned()
            .collect();
        let mut bob = original.clone();
        bob.push((
            "xl/comments1.xml".to_owned(),
            b"<comments><comment ref=\"A1\"/></comments>".to_vec(),
        ));
        let io = inputs(&original, &alice, &bob);

        run(engine.as_ref(), &io, ConflictPolicy::IncomingWins).unwrap();
        let merged = read_package(&io.out);
        assert!(!merged.contains_key("xl/media/image1.png"), "{}", engine.name());
        assert_eq!(
            part_text(&merged, "xl/comments1.xml"),
            "<comments><comment ref=\"A1\"/></comments>"
        );
    }
}

fn small(parts: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
    parts
        .iter()
        .map(|(name, text)| ((*name).to_owned(), text.as_bytes().to_vec()))
        .collect()
}

#[test]
fn uncontested_change_and_addition_merge_cleanly() {
    for engine in engines() {
        let original = small(&[("a.xml", "<r><x>1</x></r>"), ("b.txt", "hello")]);
        let alice = small(&[("a.xml", "<r><x>2</x></r>"), ("b.txt", "hello")]);
        let bob = small(&[
            ("a.xml", "<r><x>1</x></r>"),
            ("b.txt", "hello"),
            ("c.xml", "<c/>"),
        ]);
        let io = inputs(&original, &alice, &bob);

        let report = run(engine.as_ref(), &io, ConflictPolicy::IncomingWins).unwrap();
        assert!(report.conflicts.is_empty(), "{}", engine.name());

        let merged = read_package(&io.out);
        assert_eq!(part_text(&merged, "a.xml"), "<r><x>2</x></r>", "{}", engine.name());
        assert_eq!(merged["b.txt"], b"hello");
        assert_eq!(part_text(&merged, "c.xml"), "<c/>");
    }
}

#[test]
fn removal_by_b_drops_the_part() {
    for engine in engines() {
        let original = small(&[("a.xml", "<r><x>1</x></r>"), ("b.txt", "hello")]);
        let bob = small(&[("a.xml", "<r><x>1</x></r>")]);
        let io = inputs(&original, &original, &bob);

        run(engine.as_ref(), &io, ConflictPolicy::IncomingWins).unwrap();
        let merged = read_package(&io.out);
        assert!(!merged.contains_key("b.txt"), "{}", engine.name());
        assert!(merged.contains_key("a.xml"));
    }
}

#[test]
fn existing_output_is_refused_without_force() {
    let original = workbook_parts(&["a"], &["b"]);
    let io = inputs(&original, &original, &original);
    std::fs::write(&io.out, b"keep me").unwrap();

    let err = run(&TreeMerge, &io, ConflictPolicy::IncomingWins).unwrap_err();
    assert!(matches!(err, OoxmlError::AlreadyExists { .. }));
    assert_eq!(std::fs::read(&io.out).unwrap(), b"keep me");

    let options = AutomergeOptions {
        force: true,
        policy: ConflictPolicy::IncomingWins,
        indent: 2,
        engine: &TreeMerge,
        macros: &NoMacroProject,
    };
    automerge(&io.original, &io.variant_a, &io.variant_b, &io.out, &options).unwrap();
    assert_eq!(read_package(&io.out).len(), original.len());
}

#[test]
fn missing_git_is_tool_unavailable() {
    let original = workbook_parts(&["a"], &["b"]);
    let io = inputs(&original, &original, &original);
    let engine = GitMerge::new("ooxml-test-no-such-git");

    let err = run(&engine, &io, ConflictPolicy::IncomingWins).unwrap_err();
    assert!(matches!(err, OoxmlError::ToolUnavailable { .. }), "{err}");
    assert!(!io.out.exists());
}

#[test]
fn unreadable_variant_fails_without_output() {
    let original = workbook_parts(&["a"], &["b"]);
    let io = inputs(&original, &original, &original);
    std::fs::write(&io.variant_b, b"not a zip").unwrap();

    let err = run(&TreeMerge, &io, ConflictPolicy::IncomingWins).unwrap_err();
    assert!(matches!(err, OoxmlError::InvalidArchive { .. }), "{err}");
    assert!(!io.out.exists());
}

#[test]
fn prepared_repository_has_three_branches() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let original = workbook_parts(&["a"], &["b"]);
    let mut alice = original.clone();
    set(&mut alice, "xl/worksheets/sheet1.xml", sheet_xml(&["alice"]));
    let io = inputs(&original, &alice, &original);
    let repo = io.out.with_extension("git");
    let options = MergeRepoOptions {
        force: false,
        git_binary: "git",
        indent: 2,
        macros: &NoMacroProject,
    };

    let prepared =
        prepare_merge_repo(&io.original, &io.variant_a, &io.variant_b, &repo, &options).unwrap();
    assert_eq!(prepared.branches, ["original", "variant-a", "variant-b"]);
    assert_eq!(head_branch(&repo), "original");

    let sheet = std::fs::read_to_string(prepared.tree.join("xl/worksheets/sheet1.xml")).unwrap();
    assert!(sheet.contains("\n      <c r=\"A1\""), "snapshot should be pretty: {sheet}");
    assert!(!sheet.contains("alice"), "original must be checked out");

    let git = GitCli::new("git", &repo);
    let changed = git.changed_paths("original", "variant-a").unwrap();
    assert_eq!(changed, ["ooxml/xl/worksheets/sheet1.xml"]);
    assert!(git.changed_paths("original", "variant-b").unwrap().is_empty());

    let err = prepare_merge_repo(&io.original, &io.variant_a, &io.variant_b, &repo, &options)
        .unwrap_err();
    assert!(matches!(err, OoxmlError::AlreadyExists { .. }));
}

fn head_branch(repo: &Path) -> String {
    let out = std::process::Command::new("git")
        .args(["symbolic-ref", "--short", "HEAD"])
        .current_dir(repo)
        .output()
        .unwrap();
    String::from_utf8_lossy(&out.stdout).trim().to_owned()
}

#[test]
fn forced_prepare_keeps_existing_repository_when_inputs_fail() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let original = workbook_parts(&["a"], &["b"]);
    let io = inputs(&original, &original, &original);
    let repo = io.out.with_extension("git");
    std::fs::create_dir(&repo).unwrap();
    std::fs::write(repo.join("my-work.txt"), "keep").unwrap();
    let missing = io.variant_a.with_file_name("Missing.xlsx");
    let options = MergeRepoOptions {
        force: true,
        git_binary: "git",
        indent: 2,
        macros: &NoMacroProject,
    };

    let err = prepare_merge_repo(&io.original, &missing, &io.variant_b, &repo, &options)
        .unwrap_err();
    assert!(matches!(err, OoxmlError::NotFound { .. }), "{err}");
    assert_eq!(std::fs::read_to_string(repo.join("my-work.txt")).unwrap(), "keep");
}

#[test]
fn forced_prepare_replaces_a_plain_file() {
    if !git_available() {
        eprintln!("skipping: git not installed");
        return;
    }
    let original = workbook_parts(&["a"], &["b"]);
    let io = inputs(&original, &original, &original);
    let repo = io.out.with_extension("git");
    std::fs::write(&repo, "not a repository").unwrap();
    let options = MergeRepoOptions {
        force: true,
        git_binary: "git",
        indent: 2,
        macros: &NoMacroProject,
    };

    let prepared =
        prepare_merge_repo(&io.original, &io.variant_a, &io.variant_b, &repo, &options).unwrap();
    assert!(prepared.tree.join("xl/workbook.xml").is_file());
    assert_eq!(head_branch(&repo), "original");
}
