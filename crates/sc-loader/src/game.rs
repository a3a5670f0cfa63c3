//! Game documents: used modules, user templates, and item instances.

use std::path::Path;

use glam::Vec3;
use sc_core::{GameDefinition, ItemInstance, ModuleId, Transform};
use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::config::LoadConfig;
use crate::convert;
use crate::error::{LoadError, LoadResult};
use crate::module::{ModuleCatalog, parse_template};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawGame {
    name: Option<String>,
    main_module: Option<Json>,
    modules: Option<Vec<Json>>,
    user_item_templates: Vec<Json>,
    items: Vec<Map<String, Json>>,
}

/// Result of loading a game document.
#[derive(Debug, Clone)]
pub struct LoadedGame {
    /// The assembled game, with retained module definitions attached.
    pub game: GameDefinition,
    /// Module ids the game uses, including the core module.
    pub used_modules: Vec<ModuleId>,
}

/// Load a game document against a catalog of discovered modules.
///
/// Only modules in the game's used set (plus the core module) are retained.
/// Unknown user-template owners and unsupported value kinds are logged and
/// skipped; malformed JSON, transforms, and property types are fatal.
pub fn load_game(json: &str, catalog: &ModuleCatalog, config: &LoadConfig) -> LoadResult<LoadedGame> {
    let raw: RawGame = serde_json::from_str(json).map_err(|e| LoadError::json("game", e))?;

    let mut used_modules: Vec<ModuleId> = Vec::new();
    for token in raw.modules.iter().flatten() {
        match convert::token(Some(token)) {
            Some(id) => {
                let id = ModuleId::from(id);
                if !used_modules.contains(&id) {
                    used_modules.push(id);
                }
            }
            None => log::warn!("ignoring non-scalar module reference {token}"),
        }
    }
    if !used_modules.contains(&config.core_module_id) {
        used_modules.push(config.core_module_id.clone());
    }

    let mut game = GameDefinition::new(raw.name.unwrap_or_default());
    game.main_module_id = convert::token(raw.main_module.as_ref()).map(ModuleId::from);
    game.modules = catalog.retain_used(&used_modules);

    for id in &used_modules {
        if game.module(id).is_none() {
            log::warn!("game uses module {id} but no definition was discovered");
        }
    }

    for node in &raw.user_item_templates {
        let owner = convert::token(node.get("_moduleId"))
            .or_else(|| convert::token(node.get("moduleId")))
            .map(ModuleId::from);
        let Some(module) = owner
            .as_ref()
            .and_then(|id| game.modules.iter_mut().find(|m| &m.id == id))
        else {
            log::warn!(
                "user template references unknown module {}",
                owner.as_ref().map(ModuleId::as_str).unwrap_or("<none>")
            );
            continue;
        };
        let mut template = parse_template(node)?;
        template.is_user_template = true;
        log::debug!("user template {} added to module {}", template.id, module.id);
        module.user_templates.push(template);
    }

    for node in &raw.items {
        let item = parse_item(node)?;
        log::debug!("adding game item {}", item.id);
        game.items.push(item);
    }

    log::info!(
        "loaded game \"{}\": {} module(s), {} item(s)",
        game.name,
        game.modules.len(),
        game.items.len()
    );
    Ok(LoadedGame { game, used_modules })
}

fn parse_item(node: &Map<String, Json>) -> LoadResult<ItemInstance> {
    let id = convert::token(node.get("id")).ok_or_else(|| LoadError::MissingField {
        field: "id",
        context: "game item".to_string(),
    })?;
    let owner = format!("item {id}");

    let module_ref = convert::token(node.get("moduleId")).unwrap_or_default();
    let template_ref = convert::token(node.get("templateId")).unwrap_or_default();
    let mut item = ItemInstance::new(id, module_ref, template_ref);
    item.name = convert::token(node.get("name")).unwrap_or_default();
    item.build_id = convert::token(node.get("buildId")).filter(|id| !id.is_empty());
    item.values = convert::optional_values(node.get("values"), &owner);
    item.transform = Transform {
        position: convert::vec3(node.get("position"), "position", &owner, Vec3::ZERO)?,
        rotation: convert::quat(node.get("rotation"), "rotation", &owner)?,
        scale: convert::vec3(node.get("scale"), "scale", &owner, Vec3::ONE)?,
    };
    Ok(item)
}

/// Read and load a game document from disk.
pub fn load_game_file(path: &Path, catalog: &ModuleCatalog, config: &LoadConfig) -> LoadResult<LoadedGame> {
    let json = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    load_game(&json, catalog, config)
}
