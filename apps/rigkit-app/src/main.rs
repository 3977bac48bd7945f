//! Rigkit limb rigging CLI.
//!
//! Provides two modes of operation:
//! - `plan`: Build every limb of a rig file into an in-memory scene and print
//!   the scene operations a host adapter would execute
//! - `info`: Print workspace crate versions

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rigkit_core::prelude::*;
use rigkit_limb::prelude::*;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Procedural IK/FK limb rigs.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Log build steps (same as RUST_LOG=debug).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the limbs of a rig file and print the resulting scene operations.
    Plan {
        /// TOML rig file with `[[guides]]` and `[[limbs]]`.
        file: PathBuf,

        /// Emulate a host without offset-parent matrices.
        #[arg(long)]
        offset_groups: bool,
    },

    /// Print crate information.
    Info,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_plan(file: &Path, offset_groups: bool) -> Result<(), RigkitError> {
    let rig_file = RigFile::from_file(file)?;
    let strategy = if offset_groups {
        OffsetStrategy::OffsetNode
    } else {
        OffsetStrategy::OffsetMatrix
    };

    let mut scene = MemoryScene::with_strategy(strategy);
    for guide in rig_file.guides() {
        scene.add_guide(&guide);
    }

    let mut rigs = Vec::with_capacity(rig_file.limbs.len());
    for limb in &rig_file.limbs {
        rigs.push(build_limb(&mut scene, limb)?);
    }

    for op in scene.ops() {
        println!("{op}");
    }
    println!();
    for rig in &rigs {
        print!(
            "{}: size {:.3}, {} blend links, switch {}",
            rig.name,
            rig.controls.size,
            rig.blend_links.len(),
            rig.switch.attr
        );
        match &rig.stretch {
            Some(state) => println!(", stretch rest {:.3}", state.total),
            None => println!(),
        }
    }
    println!("{} nodes, {} operations", scene.len(), scene.ops().len());
    Ok(())
}

fn run_info() {
    println!("rigkit v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("crates:");
    println!("  rigkit-core  {}", env!("CARGO_PKG_VERSION"));
    println!("  rigkit-limb  {}", env!("CARGO_PKG_VERSION"));
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Some(Commands::Plan { file, offset_groups }) => match run_plan(&file, offset_groups) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(file = %file.display(), "{e}");
                ExitCode::FAILURE
            }
        },
        Some(Commands::Info) | None => {
            run_info();
            ExitCode::SUCCESS
        }
    }
}
