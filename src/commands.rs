//! Command handlers: run the library operation, then print the report.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ooxml::config::{MergeEngineKind, OoxmlConfig};
use ooxml::merge::{
    self, AutomergeOptions, ConflictPolicy, GitMerge, MergeRepoOptions, ThreeWayMerge, TreeMerge,
};
use ooxml::package::{self, CommandMacroProject, ExtractOptions};

use crate::format::OutputFormat;

/// Load the configuration, defaults when the file is absent.
pub fn load_config(path: &Path) -> Result<OoxmlConfig> {
    let config = OoxmlConfig::load(path).map_err(ooxml::OoxmlError::from)?;
    tracing::debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// `<parent>/<stem>` of the archive.
fn default_target(file: &Path) -> PathBuf {
    let stem = file.file_stem().unwrap_or(file.as_os_str());
    file.parent().map_or_else(|| PathBuf::from(stem), |parent| parent.join(stem))
}

pub fn extract(
    config: &OoxmlConfig,
    file: &Path,
    output: Option<PathBuf>,
    force: bool,
    prettify: bool,
    format: OutputFormat,
) -> Result<()> {
    let requested = output.unwrap_or_else(|| default_target(file));
    let options = ExtractOptions {
        overwrite: force,
        prettify,
        indent: config.format.indent,
    };
    let macros = CommandMacroProject::from_config(&config.macros);

    if format == OutputFormat::Text {
        println!("Extracting: {}", display_name(file));
    }
    let report = package::extract(file, &requested, &options, &macros)
        .with_context(|| format!("extracting {}", file.display()))?;

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&report)?);
        return Ok(());
    }
    if report.target != requested {
        println!("Folder exists, using: {}", display_name(&report.target));
    }
    println!(
        "✓ Extracted {} files to: {}",
        report.files,
        report.target.display()
    );
    if prettify {
        println!(
            "✓ {} of {} XML files formatted",
            report.formatting.formatted, report.formatting.total
        );
    }
    if report.macro_project {
        println!("✓ Macro project exported to: {}/", ooxml::paths::MACRO_PROJECT_DIR);
    }
    Ok(())
}

pub fn pack(
    config: &OoxmlConfig,
    directory: &Path,
    output: &Path,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let macros = CommandMacroProject::from_config(&config.macros);

    if format == OutputFormat::Text {
        println!("Packing: {}", display_name(directory));
    }
    let report = package::pack(directory, output, force, &macros)
        .with_context(|| format!("packing {}", directory.display()))?;

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&report)?);
        return Ok(());
    }
    println!(
        "✓ {} files packed ({} XML files minified)",
        report.files, report.xml_parts
    );
    if report.unformatted > 0 {
        println!("! {} XML files stored unminified", report.unformatted);
    }
    println!("✓ Created: {}", report.target.display());
    if config.macros.is_configured() {
        if report.macro_project {
            println!("✓ Macro project imported");
        } else {
            println!("✗ No macro project to import");
        }
    }
    Ok(())
}

/// Command-line overrides for `automerge`.
pub struct MergeOverrides {
    pub force: bool,
    pub engine: Option<MergeEngineKind>,
    pub policy: Option<ConflictPolicy>,
}

pub fn automerge(
    config: &OoxmlConfig,
    [original, variant_a, variant_b]: [&Path; 3],
    merged: &Path,
    overrides: &MergeOverrides,
    format: OutputFormat,
) -> Result<()> {
    let engine: Box<dyn ThreeWayMerge> = match overrides.engine.unwrap_or(config.merge.engine) {
        MergeEngineKind::Git => Box::new(GitMerge::new(config.merge.git_binary.as_str())),
        MergeEngineKind::InProcess => Box::new(TreeMerge),
    };
    let macros = CommandMacroProject::from_config(&config.macros);
    let options = AutomergeOptions {
        force: overrides.force,
        policy: overrides.policy.unwrap_or(config.merge.conflict_policy),
        indent: config.format.indent,
        engine: engine.as_ref(),
        macros: &macros,
    };

    if format == OutputFormat::Text {
        println!(
            "Merging {} and {} (base: {}) into {}",
            display_name(variant_a),
            display_name(variant_b),
            display_name(original),
            display_name(merged)
        );
    }
    let report = merge::automerge(original, variant_a, variant_b, merged, &options)
        .context("automerge failed")?;

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&report)?);
        return Ok(());
    }
    println!(
        "✓ {} files changed by A, {} by B ({} engine)",
        report.changed_by_a, report.changed_by_b, report.engine
    );
    if !report.conflicts.is_empty() {
        let winner = match report.policy {
            ConflictPolicy::IncomingWins => "B",
            ConflictPolicy::CurrentWins => "A",
        };
        println!(
            "! {} files changed by both, kept {winner}'s version:",
            report.conflicts.len()
        );
        for path in &report.conflicts {
            println!("    {path}");
        }
    }
    println!("✓ Created: {}", report.output.display());
    Ok(())
}

pub fn prepare_merge(
    config: &OoxmlConfig,
    [original, variant_a, variant_b]: [&Path; 3],
    repo: &Path,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let macros = CommandMacroProject::from_config(&config.macros);
    let options = MergeRepoOptions {
        force,
        git_binary: &config.merge.git_binary,
        indent: config.format.indent,
        macros: &macros,
    };
    let prepared = merge::prepare_merge_repo(original, variant_a, variant_b, repo, &options)
        .context("could not prepare the merge repository")?;

    if format == OutputFormat::Json {
        println!("{}", format.serialize(&prepared)?);
        return Ok(());
    }
    let [current, first, second] = prepared.branches;
    println!("✓ Repository ready: {}", prepared.repo.display());
    println!("  Branches: {current} (checked out), {first}, {second}");
    println!();
    println!("Next:");
    println!("  cd {}", prepared.repo.display());
    println!("  git merge {first}");
    println!("  git merge {second}");
    println!("  ooxml pack {} merged{}", prepared.tree.display(), extension_hint(original));
    Ok(())
}

fn extension_hint(original: &Path) -> String {
    original
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
