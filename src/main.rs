use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

mod commands;
mod doctor;
mod format;
mod telemetry;

use format::OutputFormat;
use ooxml::config::MergeEngineKind;
use ooxml::merge::ConflictPolicy;

/// Unpack, prettify, repack and three-way merge OOXML packages
///
/// Office documents (.xlsx, .docx, .pptx, .vsdx) are zip archives of XML
/// parts stored on a single line. `ooxml extract -p` unpacks them with
/// every XML part pretty-printed so they diff and merge as text;
/// `ooxml pack` minifies them back into a valid archive.
///
/// QUICK START:
///
///   ooxml extract -p Book.xlsx          # -> Book/ with readable XML
///   # edit, diff, commit Book/ ...
///   ooxml pack Book Book-new.xlsx
///
///   # Combine two edited copies of the same workbook
///   ooxml automerge Book.xlsx Alice.xlsx Bob.xlsx Merged.xlsx
///
/// A file changed by both variants takes variant B's version unless
/// merge.conflict_policy says otherwise (see ooxml.toml).
#[derive(Parser)]
#[command(name = "ooxml")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'ooxml <command> --help' for more information on a specific command.")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, env = "OOXML_CONFIG", default_value = ooxml::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Result format on stdout: text or json
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack an archive into a folder
    ///
    /// Without --output the folder is created next to the archive and named
    /// after it. If that folder exists, a numbered sibling (Book_001, ...)
    /// is used unless --force is given.
    Extract {
        /// The .xlsx/.docx/.pptx/.vsdx file
        file: PathBuf,

        /// Folder to extract into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing folder
        #[arg(short, long)]
        force: bool,

        /// Pretty-print XML parts
        #[arg(short, long)]
        prettify: bool,
    },

    /// Pack a folder back into an archive
    ///
    /// XML parts are minified; a vbaProject/ folder is never packed.
    Pack {
        /// Folder produced by `ooxml extract`
        directory: PathBuf,

        /// Archive to write
        output: PathBuf,

        /// Replace an existing archive
        #[arg(short, long)]
        force: bool,
    },

    /// Merge two variants of the same original into one archive
    ///
    /// Changes from A are applied first, then changes from B. A file changed
    /// by both takes one side's whole content, chosen by the conflict policy.
    Automerge {
        /// The common ancestor
        original: PathBuf,

        /// First variant (merged first)
        variant_a: PathBuf,

        /// Second variant (merged last)
        variant_b: PathBuf,

        /// Merged archive to write
        merged: PathBuf,

        /// Replace an existing merged archive
        #[arg(short, long)]
        force: bool,

        /// Merge engine: git or in-process [default: from config]
        #[arg(long)]
        engine: Option<MergeEngineKind>,

        /// Conflict policy: incoming-wins or current-wins [default: from config]
        #[arg(long)]
        policy: Option<ConflictPolicy>,
    },

    /// Build a git repository with the three versions on branches
    ///
    /// Branches original, variant-a and variant-b hold the pretty-printed
    /// packages; original is checked out so you can merge by hand.
    #[command(name = "prepare-merge")]
    PrepareMerge {
        /// The common ancestor
        original: PathBuf,

        /// First variant
        variant_a: PathBuf,

        /// Second variant
        variant_b: PathBuf,

        /// Repository folder to create
        repo: PathBuf,

        /// Replace an existing repository folder
        #[arg(short, long)]
        force: bool,
    },

    /// Check the git installation and configuration
    Doctor,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        format,
        command,
        ..
    } = cli;
    let config = || commands::load_config(&config_path);

    match command {
        Commands::Extract {
            file,
            output,
            force,
            prettify,
        } => commands::extract(&config()?, &file, output, force, prettify, format),
        Commands::Pack {
            directory,
            output,
            force,
        } => commands::pack(&config()?, &directory, &output, force, format),
        Commands::Automerge {
            original,
            variant_a,
            variant_b,
            merged,
            force,
            engine,
            policy,
        } => commands::automerge(
            &config()?,
            [&original, &variant_a, &variant_b],
            &merged,
            &commands::MergeOverrides {
                force,
                engine,
                policy,
            },
            format,
        ),
        Commands::PrepareMerge {
            original,
            variant_a,
            variant_b,
            repo,
            force,
        } => commands::prepare_merge(
            &config()?,
            [&original, &variant_a, &variant_b],
            &repo,
            force,
            format,
        ),
        Commands::Doctor => doctor::run(&config_path, format),
    }
}
