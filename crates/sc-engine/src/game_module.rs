use std::any::Any;

use crate::error::EngineResult;
use crate::module::{GameRole, InitContext, MAIN_SCENE, Module, StageContext};

/// Controller for the module that represents the game itself.
///
/// Registers the main scene during project configuration and reports the
/// game alias other controllers use to name prefabs.
#[derive(Debug, Default)]
pub struct GameModule {
    alias: Option<String>,
    flushed_scenes: Vec<String>,
}

impl GameModule {
    /// Alias captured at init, if init ran.
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Build scenes as they stood at cleanup.
    pub fn flushed_scenes(&self) -> &[String] {
        &self.flushed_scenes
    }
}

impl GameRole for GameModule {}

impl Module for GameModule {
    fn name(&self) -> &str {
        "game"
    }

    fn game_role(&self) -> Option<&dyn GameRole> {
        Some(self)
    }

    fn init(&mut self, ctx: &InitContext<'_>) -> EngineResult<()> {
        self.alias = Some(GameRole::alias(self, ctx.definition));
        self.flushed_scenes.clear();
        Ok(())
    }

    fn configure_project(&mut self, ctx: &mut StageContext<'_>) -> EngineResult<()> {
        ctx.settings.add_scene(MAIN_SCENE, false);
        Ok(())
    }

    fn cleanup(&mut self, ctx: &mut StageContext<'_>) -> EngineResult<()> {
        self.flushed_scenes = ctx.settings.build_scenes.clone();
        log::info!(
            "game {} build scenes: {}",
            ctx.definition.id,
            self.flushed_scenes.join(", ")
        );
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
    use sc_core::{GameDefinition, ModuleDefinition};

    use super::*;
    use crate::memory::MemoryScene;
    use crate::module::{ModuleInstance, PassEnv, ProjectSettings};

    #[test]
    fn game_module_registers_main_scene_and_alias() {
        let game = GameDefinition::new("Demo");
        let mut instance = ModuleInstance::new(
            ModuleDefinition::new("G1", "Escape"),
            "BaseGameModule",
            Box::new(GameModule::default()),
        );
        let game_ref = instance.game_module_ref().unwrap();
        assert_eq!(game_ref.alias, "Escape");

        let mut scene = MemoryScene::new();
        let mut settings = ProjectSettings::default();
        settings.add_scene("Intro", true);
        instance.init(&game, &[], Some(&game_ref)).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: Some(&game_ref),
            settings: &mut settings,
        };
        instance.configure_project(&mut env).unwrap();
        instance.cleanup(&mut env).unwrap();

        let module = instance.controller_as::<GameModule>().unwrap();
        assert_eq!(module.alias(), Some("Escape"));
        assert_eq!(module.flushed_scenes(), ["Intro", MAIN_SCENE]);
    }
}
