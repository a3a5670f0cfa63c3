use std::path::Path;

use colored::Colorize;
use sc_engine::SceneHost;

use crate::snapshot::Snapshot;

pub fn run(
    input: &Path,
    output: &Path,
    item_file: Option<&Path>,
    module_folder: Option<&Path>,
    build_file: Option<&Path>,
) -> Result<(), String> {
    super::require_dir(input, "input folder")?;
    let mut snapshot = Snapshot::load(output)?;

    // User assets may have been imported since the last build.
    for asset in super::read_assets(input)? {
        if snapshot.scene.resolve_asset(&asset.name).is_none() {
            log::info!("new asset {}", asset.name);
            snapshot.scene.add_asset(asset);
        }
    }

    let loaded = super::load_game(item_file, module_folder)?;
    let mut orchestrator = super::orchestrator(loaded, build_file)?;
    let report = orchestrator.run_update(&mut snapshot.scene, &mut snapshot.index);
    let path = snapshot.save(output)?;

    println!("  Updated {}", path.display().to_string().bold());
    super::print_report(&report, true);
    Ok(())
}
