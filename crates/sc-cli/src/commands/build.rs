use std::path::Path;

use colored::Colorize;
use sc_engine::{AssetLibrary, IdentityIndex, MemoryScene};

use crate::snapshot::Snapshot;

pub fn run(
    input: &Path,
    output: &Path,
    item_file: Option<&Path>,
    module_folder: Option<&Path>,
    build_file: Option<&Path>,
    scene: Option<&Path>,
) -> Result<(), String> {
    super::require_dir(input, "input folder")?;

    let tree = match super::scene_file(input, scene, &[item_file, build_file]) {
        Some(path) => {
            log::info!("loading scene tree {}", path.display());
            Some(sc_loader::load_scene_tree_file(&path).map_err(|e| e.to_string())?)
        }
        None => {
            log::error!("no scene-tree document in {}", input.display());
            None
        }
    };

    let mut host = MemoryScene::with_assets(super::read_assets(input)?);
    let library = AssetLibrary::from_host(&host);
    let loaded = super::load_game(item_file, module_folder)?;
    let name = loaded.game.name.clone();

    let mut index = IdentityIndex::new();
    let mut orchestrator = super::orchestrator(loaded, build_file)?;
    let report = orchestrator.run_build(&mut host, tree.as_ref(), &library, &mut index);

    let path = Snapshot { scene: host, index }.save(output)?;

    let title = if name.is_empty() { "game" } else { name.as_str() };
    println!("  Built '{}' into {}", title.bold(), path.display());
    super::print_report(&report, false);
    Ok(())
}
