pub mod build;
pub mod check;
pub mod modules;
pub mod update;

use std::path::{Path, PathBuf};

use colored::Colorize;
use comfy_table::{ContentArrangement, Table};
use sc_engine::{
    ControllerRegistry, MemoryAsset, Orchestrator, PassConfig, PassReport, SceneOp, SceneOpKind,
};
use sc_loader::{LoadConfig, LoadedGame, ModuleCatalog};

use crate::snapshot::SNAPSHOT_FILE;

/// Asset manifest read from the input folder.
pub const ASSET_MANIFEST: &str = "assets.json";
/// Scene-tree document looked up in the input folder when `--scene` is absent.
pub const SCENE_FILE: &str = "scene.json";

fn require_dir(dir: &Path, what: &str) -> Result<(), String> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(format!("{what} does not exist: {}", dir.display()))
    }
}

/// Discover modules, or return an empty catalog when no folder was given.
fn discover(module_folder: Option<&Path>, config: &LoadConfig) -> Result<ModuleCatalog, String> {
    match module_folder {
        Some(folder) => {
            require_dir(folder, "module folder")?;
            sc_loader::discover_modules(folder, config).map_err(|e| e.to_string())
        }
        None => {
            log::warn!("no module folder given, only built-in handlers are available");
            Ok(ModuleCatalog::new())
        }
    }
}

/// Load the game document against the discovered modules.
///
/// A missing game document yields an empty game.
fn load_game(item_file: Option<&Path>, module_folder: Option<&Path>) -> Result<LoadedGame, String> {
    let config = LoadConfig::default();
    let catalog = discover(module_folder, &config)?;
    match item_file.filter(|path| path.is_file()) {
        Some(path) => sc_loader::load_game_file(path, &catalog, &config).map_err(|e| e.to_string()),
        None => {
            if let Some(path) = item_file {
                log::warn!("game document {} not found, building an empty game", path.display());
            }
            sc_loader::load_game("{}", &catalog, &config).map_err(|e| e.to_string())
        }
    }
}

/// Read the asset manifest; an absent manifest means no assets.
fn read_assets(input: &Path) -> Result<Vec<MemoryAsset>, String> {
    let path = input.join(ASSET_MANIFEST);
    if !path.is_file() {
        log::warn!("no {ASSET_MANIFEST} in {}, the scene has no assets", input.display());
        return Ok(Vec::new());
    }
    let json = std::fs::read_to_string(&path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    serde_json::from_str(&json).map_err(|e| format!("invalid {}: {e}", path.display()))
}

/// Pick the scene-tree document: `explicit`, else `scene.json`, else the
/// first other JSON file in the input folder by name. Files in `exclude`
/// (the game and build documents) are never picked.
fn scene_file(input: &Path, explicit: Option<&Path>, exclude: &[Option<&Path>]) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = input.join(SCENE_FILE);
    if default.is_file() {
        return Some(default);
    }
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(input)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter(|p| {
            p.file_name()
                .is_some_and(|name| name != ASSET_MANIFEST && name != SNAPSHOT_FILE)
        })
        .filter(|p| !exclude.iter().flatten().any(|other| same_file(p, other)))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Bind loaded modules to the built-in controllers and attach the build
/// document, when one was given.
fn orchestrator(loaded: LoadedGame, build_file: Option<&Path>) -> Result<Orchestrator, String> {
    let packages: Vec<&str> = loaded
        .game
        .modules
        .iter()
        .flat_map(|m| m.packages.iter().map(String::as_str))
        .collect();
    if !packages.is_empty() {
        log::warn!("no package manager available, skipping packages: {}", packages.join(", "));
    }
    let modules = ControllerRegistry::with_builtins().bind(loaded.game.modules.clone());
    let orchestrator = Orchestrator::new(
        loaded.game,
        modules,
        PassConfig::default().with_install_packages(false),
    );

    let Some(path) = build_file else {
        return Ok(orchestrator);
    };
    if !path.is_file() {
        return Err(format!("build document does not exist: {}", path.display()));
    }
    let builds = sc_loader::load_build_file(path).map_err(|e| e.to_string())?;
    Ok(orchestrator.with_builds(builds))
}

fn describe_op(op: &SceneOp) -> (String, String) {
    match &op.kind {
        SceneOpKind::Removed { custom } => (
            "removed".red().to_string(),
            if *custom { "module".into() } else { String::new() },
        ),
        SceneOpKind::Created { path } => ("created".green().to_string(), path.to_string()),
        SceneOpKind::Updated { custom } => (
            "updated".cyan().to_string(),
            if *custom { "module".into() } else { String::new() },
        ),
        SceneOpKind::Skipped { reason } => ("skipped".yellow().to_string(), reason.clone()),
    }
}

/// Print the outcome of a pass.
fn print_report(report: &PassReport, show_ops: bool) {
    let counts = &report.reconcile;
    println!(
        "  {} added ({} placeholders), {} updated, {} removed, {} skipped",
        counts.added, counts.placeholders, counts.updated, counts.removed, counts.skipped
    );

    if let Some(tree) = &report.tree {
        println!(
            "  {} nodes materialized, {} skipped, {} area lights",
            tree.materialized, tree.skipped, tree.lights
        );
    }
    if let Some(game) = &report.game_module {
        println!("  {} {} ({})", "Game module:".dimmed(), game.alias.bold(), game.module_id);
    }
    if !report.build_scenes.is_empty() {
        println!("  {} {}", "Build scenes:".dimmed(), report.build_scenes.join(", "));
    }

    if show_ops && !report.ops.is_empty() {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Item", "Operation", "Detail"]);
        for op in &report.ops {
            let (operation, detail) = describe_op(op);
            table.add_row(vec![op.item.to_string(), operation, detail]);
        }
        println!();
        println!("{table}");
    }

    if !report.module_failures.is_empty() {
        println!();
        println!("  {}", "Module failures:".red().bold());
        for failure in &report.module_failures {
            println!(
                "    {} ({}) during {}: {}",
                failure.module, failure.controller, failure.stage, failure.message
            );
        }
    }
}
