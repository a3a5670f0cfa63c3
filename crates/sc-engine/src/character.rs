use std::any::Any;
use std::collections::BTreeMap;

use sc_core::{ItemInstance, ItemTemplate, Value};
use serde_json::{Map, Value as Json};

use crate::error::EngineResult;
use crate::host::ObjectHandle;
use crate::module::{InitContext, Module, StageContext};

/// Item value holding the character descriptor object.
pub const DESCRIPTOR_KEY: &str = "descriptor";
/// Template default value holding the character gender.
pub const GENDER_KEY: &str = "Gender";

/// Controller that spawns characters from game-specific prefabs.
///
/// Every character needs a descriptor object. The prefab is
/// `{alias}_Player_{gender}` for unique templates and
/// `{alias}_{role}_{gender}` otherwise.
///
/// A spawned character keeps its build-document entry, if it had one, until
/// the object is removed.
#[derive(Debug, Default)]
pub struct CharacterModule {
    spawned: usize,
    builds: BTreeMap<ObjectHandle, Json>,
}

impl CharacterModule {
    /// Number of characters created in the current pass.
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    /// Build configuration applied to a spawned character.
    pub fn build_config(&self, handle: ObjectHandle) -> Option<&Json> {
        self.builds.get(&handle)
    }

    /// Prefab name for an item, or `None` when a piece is missing.
    pub fn prefab_name(alias: &str, item: &ItemInstance, template: &ItemTemplate) -> Option<String> {
        let descriptor = descriptor(item)?;
        let gender = match template.default_value(GENDER_KEY)?.as_str() {
            Ok(gender) => gender,
            Err(e) => {
                log::warn!("template {} gender: {e}", template.id);
                return None;
            }
        };
        if template.unique {
            return Some(format!("{alias}_Player_{gender}"));
        }
        let role = role(item, descriptor)?;
        Some(format!("{alias}_{role}_{gender}"))
    }

    fn build_character(&mut self, item: &ItemInstance, handle: ObjectHandle, build: Option<&Json>) {
        match build {
            Some(config) => {
                log::debug!("character {} built from entry {}", item.id, config["id"]);
                self.builds.insert(handle, config.clone());
            }
            None => {
                if let Some(build_id) = &item.build_id {
                    log::warn!("character {}: build entry {build_id} not found", item.id);
                }
            }
        }
    }
}

fn descriptor(item: &ItemInstance) -> Option<&Map<String, Json>> {
    match item.value(DESCRIPTOR_KEY) {
        Some(Value::Object(descriptor)) => Some(descriptor),
        _ => {
            log::warn!("character {} has no descriptor object", item.id);
            None
        }
    }
}

fn role<'a>(item: &ItemInstance, descriptor: &'a Map<String, Json>) -> Option<&'a str> {
    let role = descriptor
        .get("role")
        .or_else(|| descriptor.get("Role"))
        .and_then(|v| v.as_str());
    if role.is_none() {
        log::warn!("character {} descriptor has no role", item.id);
    }
    role
}

impl Module for CharacterModule {
    fn name(&self) -> &str {
        "character"
    }

    fn init(&mut self, _ctx: &InitContext<'_>) -> EngineResult<()> {
        self.spawned = 0;
        Ok(())
    }

    fn create_item(
        &mut self,
        item: &ItemInstance,
        template: &ItemTemplate,
        build: Option<&Json>,
        ctx: &mut StageContext<'_>,
    ) -> EngineResult<Option<ObjectHandle>> {
        let Some(game) = ctx.game_module else {
            log::warn!("character {}: no game module to name prefabs", item.id);
            return Ok(None);
        };
        let Some(prefab) = Self::prefab_name(&game.alias, item, template) else {
            return Ok(None);
        };
        let Some(asset) = ctx.host.find_prefab(&prefab) else {
            log::warn!("character {}: prefab {prefab} not found", item.id);
            return Ok(None);
        };
        let handle = ctx.host.instantiate(asset, None)?;
        ctx.host.set_transform(handle, &item.transform)?;
        self.spawned += 1;
        log::debug!("character {} spawned from {prefab}", item.id);
        self.build_character(item, handle, build);
        Ok(Some(handle))
    }

    fn remove_item(&mut self, handle: ObjectHandle, _ctx: &mut StageContext<'_>) -> EngineResult<()> {
        self.builds.remove(&handle);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;
    use sc_core::{GameDefinition, ModuleDefinition, Transform};

    use super::*;
    use crate::host::SceneHost;
    use crate::memory::{MemoryAsset, MemoryScene};
    use crate::module::{GameModuleRef, ModuleInstance, PassEnv, ProjectSettings};

    fn template(unique: bool) -> ItemTemplate {
        let mut template = ItemTemplate::new("T1", "Guard");
        template.unique = unique;
        template.default_values.insert(GENDER_KEY.into(), "Female".into());
        template
    }

    fn item() -> ItemInstance {
        let mut item = ItemInstance::new("c1", "M1", "T1");
        let mut descriptor = serde_json::Map::new();
        descriptor.insert("role".into(), "Guard".into());
        item.values.insert(DESCRIPTOR_KEY.into(), Value::Object(descriptor));
        item.transform = Transform::from_position(Vec3::new(4.0, 0.0, 2.0));
        item
    }

    #[test]
    fn prefab_name_depends_on_uniqueness() {
        assert_eq!(
            CharacterModule::prefab_name("Escape", &item(), &template(true)).as_deref(),
            Some("Escape_Player_Female")
        );
        assert_eq!(
            CharacterModule::prefab_name("Escape", &item(), &template(false)).as_deref(),
            Some("Escape_Guard_Female")
        );
    }

    #[test]
    fn missing_pieces_yield_none() {
        let bare = ItemInstance::new("c1", "M1", "T1");
        assert!(CharacterModule::prefab_name("Escape", &bare, &template(false)).is_none());
        assert!(CharacterModule::prefab_name("Escape", &bare, &template(true)).is_none());
        assert!(CharacterModule::prefab_name("Escape", &item(), &ItemTemplate::new("T1", "Guard")).is_none());
    }

    #[test]
    fn create_item_instantiates_prefab_with_transform() {
        let game = GameDefinition::new("Demo");
        let game_ref = GameModuleRef {
            module_id: "G1".into(),
            alias: "Escape".into(),
        };
        let mut scene = MemoryScene::with_assets(vec![MemoryAsset::prefab("Escape_Guard_Female")]);
        let mut settings = ProjectSettings::default();
        let mut instance = ModuleInstance::new(
            ModuleDefinition::new("M1", "People"),
            "BaseCharacterModule",
            Box::new(CharacterModule::default()),
        );
        instance.init(&game, &[], Some(&game_ref)).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: Some(&game_ref),
            settings: &mut settings,
        };
        let handle = instance
            .create_item(&item(), &template(false), None, &mut env)
            .unwrap()
            .unwrap();
        assert_eq!(
            scene.transform(handle).unwrap().position,
            Vec3::new(4.0, 0.0, 2.0)
        );
        let module = instance.controller_as::<CharacterModule>().unwrap();
        assert_eq!(module.spawned(), 1);
        assert!(module.build_config(handle).is_none());
    }

    #[test]
    fn build_entry_is_kept_until_removal() {
        let game = GameDefinition::new("Demo");
        let game_ref = GameModuleRef {
            module_id: "G1".into(),
            alias: "Escape".into(),
        };
        let mut scene = MemoryScene::with_assets(vec![MemoryAsset::prefab("Escape_Player_Female")]);
        let mut settings = ProjectSettings::default();
        let mut instance = ModuleInstance::new(
            ModuleDefinition::new("M1", "People"),
            "BaseCharacterModule",
            Box::new(CharacterModule::default()),
        );
        instance.init(&game, &[], Some(&game_ref)).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: Some(&game_ref),
            settings: &mut settings,
        };
        let mut hero = item();
        hero.build_id = Some("player-1".into());
        let build = serde_json::json!({ "id": "player-1", "hair": "red" });

        let handle = instance
            .create_item(&hero, &template(true), Some(&build), &mut env)
            .unwrap()
            .unwrap();
        let module = instance.controller_as::<CharacterModule>().unwrap();
        assert_eq!(module.build_config(handle), Some(&build));

        instance.remove_item(handle, &mut env).unwrap();
        let module = instance.controller_as::<CharacterModule>().unwrap();
        assert!(module.build_config(handle).is_none());
    }

    #[test]
    fn create_item_without_game_module_falls_back() {
        let game = GameDefinition::new("Demo");
        let mut scene = MemoryScene::new();
        let mut settings = ProjectSettings::default();
        let mut instance = ModuleInstance::new(
            ModuleDefinition::new("M1", "People"),
            "BaseCharacterModule",
            Box::new(CharacterModule::default()),
        );
        instance.init(&game, &[], None).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: None,
            settings: &mut settings,
        };
        let created = instance.create_item(&item(), &template(true), None, &mut env).unwrap();
        assert!(created.is_none());
        assert!(scene.is_empty());
    }
}
