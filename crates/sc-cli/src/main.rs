//! CLI frontend for the Stagecraft scene assembler.

mod commands;
mod snapshot;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stagecraft",
    about = "Stagecraft: assemble game scenes from declarative documents",
    version,
    propagate_version = true
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Folders shared by `build` and `update`.
#[derive(Args)]
struct ProjectArgs {
    /// Folder with the scene tree and asset manifest
    #[arg(long, alias = "inputFolder")]
    input_folder: PathBuf,

    /// Folder the scene snapshot is written to
    #[arg(long, alias = "outputFolder")]
    output_folder: PathBuf,

    /// Game document (an empty game when absent)
    #[arg(long, alias = "itemFile")]
    item_file: Option<PathBuf>,

    /// Folder searched recursively for module definitions
    #[arg(long, alias = "moduleFolder")]
    module_folder: Option<PathBuf>,

    /// Build document with avatar and NPC configurations
    #[arg(long, alias = "buildFile")]
    build_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fresh scene from the scene tree and the game document
    Build {
        #[command(flatten)]
        project: ProjectArgs,

        /// Scene-tree document (default: scene.json in the input folder)
        #[arg(long)]
        scene: Option<PathBuf>,
    },

    /// Reconcile an existing scene snapshot against the game document
    Update {
        #[command(flatten)]
        project: ProjectArgs,
    },

    /// Parse the game document and modules without touching a scene
    Check {
        /// Game document
        #[arg(long, alias = "itemFile")]
        item_file: PathBuf,

        /// Folder searched recursively for module definitions
        #[arg(long, alias = "moduleFolder")]
        module_folder: Option<PathBuf>,
    },

    /// List discovered modules
    Modules {
        /// Folder searched recursively for module definitions
        #[arg(long, alias = "moduleFolder")]
        module_folder: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Build { project, scene } => commands::build::run(
            &project.input_folder,
            &project.output_folder,
            project.item_file.as_deref(),
            project.module_folder.as_deref(),
            project.build_file.as_deref(),
            scene.as_deref(),
        ),
        Commands::Update { project } => commands::update::run(
            &project.input_folder,
            &project.output_folder,
            project.item_file.as_deref(),
            project.module_folder.as_deref(),
            project.build_file.as_deref(),
        ),
        Commands::Check {
            item_file,
            module_folder,
        } => commands::check::run(&item_file, module_folder.as_deref()),
        Commands::Modules { module_folder } => commands::modules::run(&module_folder),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
