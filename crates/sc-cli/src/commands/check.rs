use std::path::Path;

pub fn run(item_file: &Path, module_folder: Option<&Path>) -> Result<(), String> {
    if !item_file.is_file() {
        return Err(format!("game document does not exist: {}", item_file.display()));
    }
    let loaded = super::load_game(Some(item_file), module_folder)?;
    let game = &loaded.game;

    let unresolved = game
        .items
        .iter()
        .filter(|item| game.template_for(item).is_none())
        .count();

    println!("  All checks passed for '{}'.", game.name);
    println!("  {} modules, {} items", game.modules.len(), game.items.len());
    if unresolved > 0 {
        println!("  {unresolved} items have no resolvable template");
    }
    Ok(())
}
