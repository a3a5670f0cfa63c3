//! Document loader for Stagecraft.
//!
//! Turns the JSON document kinds (game, module definition, scene tree, build)
//! into [`sc_core`] types and discovers module definitions on disk.
//!
//! Only data corruption is an error here: invalid JSON, an unknown property
//! type, a malformed transform, or a missing id. Everything else (unknown
//! modules, unsupported values) is logged and skipped.

/// Build documents.
pub mod build;
/// Loader configuration.
pub mod config;
/// Raw JSON value conversions shared by the document parsers.
pub mod convert;
/// Loader error types.
pub mod error;
/// Game documents.
pub mod game;
/// Module definitions and discovery.
pub mod module;
/// Scene-tree documents.
pub mod scene;

use std::path::Path;

pub use build::{load_build, load_build_file};
pub use config::{CORE_MODULE_ID, LoadConfig, MODULE_FILE_NAME};
pub use error::{LoadError, LoadResult};
pub use game::{LoadedGame, load_game, load_game_file};
pub use module::{CatalogEntry, ModuleCatalog, discover_modules, parse_module, parse_template};
pub use scene::{load_scene_tree, load_scene_tree_file};

/// Discover modules under `module_root` and load the game at `game_path`
/// against them.
pub fn load_project(game_path: &Path, module_root: &Path, config: &LoadConfig) -> LoadResult<LoadedGame> {
    let catalog = discover_modules(module_root, config)?;
    load_game_file(game_path, &catalog, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn load_project_wires_discovery_into_the_game() {
        let dir = tempfile::tempdir().unwrap();
        let modules = dir.path().join("modules");
        fs::create_dir_all(modules.join("props")).unwrap();
        fs::write(
            modules.join("props").join(MODULE_FILE_NAME),
            r#"{ "id": "M1", "name": "Props", "itemGroups": [ { "name": "g", "items": [ { "id": "T1", "prefab": "Box" } ] } ] }"#,
        )
        .unwrap();
        let game_path = dir.path().join("game.json");
        fs::write(
            &game_path,
            r#"{ "name": "G", "modules": ["M1"], "items": [ { "id": "i1", "moduleId": "M1", "templateId": "T1", "position": [1, 2, 3] } ] }"#,
        )
        .unwrap();

        let loaded = load_project(&game_path, &modules, &LoadConfig::default()).unwrap();
        assert_eq!(loaded.game.modules.len(), 1);
        let item = &loaded.game.items[0];
        assert_eq!(
            loaded.game.template_for(item).unwrap().asset_ref.as_deref(),
            Some("Box")
        );
    }
}
