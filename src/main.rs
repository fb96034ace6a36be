//! mapstitch CLI
//!
//! Entry point for the `mapstitch` command-line tool.

use clap::{Parser, Subcommand};
use mapstitch::report::FileAction;
use mapstitch::{Packer, TreeMerger};
use std::fs;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "mapstitch")]
#[command(about = "Deterministic three-tier merge of map descriptor trees", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge base, patch, and overlay trees into one output tree
    Merge {
        /// Base map folder (lowest priority)
        base: PathBuf,

        /// Game patch folder
        patch: PathBuf,

        /// Overlay fixes folder (highest priority)
        overlay: PathBuf,

        /// Output directory for the merged tree
        #[arg(long, short = 'o')]
        out: PathBuf,

        /// Overwrite a pre-existing output directory or archive
        #[arg(long)]
        force: bool,

        /// Emit the merge report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Skip packing the merged tree into an archive
        #[arg(long)]
        no_pack: bool,

        /// Archive path (default: <out>.tar)
        #[arg(long)]
        archive: Option<PathBuf>,
    },

    /// Show how one relative path would merge, without writing output
    Inspect {
        /// Base map folder (lowest priority)
        base: PathBuf,

        /// Game patch folder
        patch: PathBuf,

        /// Overlay fixes folder (highest priority)
        overlay: PathBuf,

        /// Relative path to inspect
        rel: PathBuf,

        /// Emit the file outcome as JSON instead of merged content
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            base,
            patch,
            overlay,
            out,
            force,
            json,
            no_pack,
            archive,
        } => {
            run_merge(base, patch, overlay, out, force, json, no_pack, archive);
        }
        Commands::Inspect {
            base,
            patch,
            overlay,
            rel,
            json,
        } => {
            run_inspect(base, patch, overlay, rel, json);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_merge(
    base: PathBuf,
    patch: PathBuf,
    overlay: PathBuf,
    out: PathBuf,
    force: bool,
    json: bool,
    no_pack: bool,
    archive: Option<PathBuf>,
) {
    // Destination collision is resolved here, outside the merge core.
    if out.exists() {
        if !force {
            eprintln!("Output folder exists: {} (use --force)", out.display());
            process::exit(1);
        }
        if let Err(e) = fs::remove_dir_all(&out) {
            eprintln!("Error clearing output folder: {}", e);
            process::exit(1);
        }
    }
    if let Err(e) = fs::create_dir_all(&out) {
        eprintln!("Error creating output folder: {}", e);
        process::exit(1);
    }

    let merger = TreeMerger::new(base, patch, overlay);
    let report = match merger.merge_to(&out) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Merge failed: {}", e);
            process::exit(1);
        }
    };

    if json {
        match report.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                process::exit(1);
            }
        }
    } else {
        for (path, warning) in report.warnings() {
            eprintln!("Warning [{}]: {}", path, warning);
        }
        for (path, conflict) in report.conflicts() {
            println!("Conflict [{}]: {}", path, conflict);
        }

        let count = |action: FileAction| {
            report.files.iter().filter(|f| f.action == action).count()
        };
        println!(
            "Merged {} file(s): {} merged, {} copied, {} skipped, {} failed",
            report.files.len(),
            count(FileAction::Merged),
            count(FileAction::Copied),
            count(FileAction::Skipped),
            count(FileAction::Failed),
        );
    }

    if !no_pack {
        let archive = archive.unwrap_or_else(|| out.with_extension("tar"));
        match Packer::new(out.clone()).with_force(force).pack_to(&archive) {
            Ok(manifest) => {
                eprintln!("Packed {} (sha256 {})", archive.display(), manifest.archive_sha256);
            }
            Err(e) => {
                eprintln!("Packing failed: {}", e);
                process::exit(1);
            }
        }
    }

    if report.has_failures() {
        process::exit(2);
    }
}

fn run_inspect(base: PathBuf, patch: PathBuf, overlay: PathBuf, rel: PathBuf, json: bool) {
    let merger = TreeMerger::new(base, patch, overlay);
    let preview = match merger.preview(&rel) {
        Ok(preview) => preview,
        Err(e) => {
            eprintln!("Inspect failed: {}", e);
            process::exit(1);
        }
    };

    if json {
        match serde_json::to_string_pretty(&preview.outcome) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing outcome: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    eprintln!(
        "{}: {} ({:?})",
        preview.outcome.path, preview.outcome.strategy, preview.outcome.action
    );
    for warning in &preview.outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
    for conflict in &preview.outcome.conflicts {
        eprintln!("Conflict: {}", conflict);
    }
    if let Some(content) = preview.content {
        let mut stdout = std::io::stdout();
        use std::io::Write;
        if stdout.write_all(&content).is_err() {
            process::exit(1);
        }
    }
}
