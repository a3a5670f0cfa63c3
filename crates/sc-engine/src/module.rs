use std::any::Any;
use std::fmt;

use sc_core::{
    GameDefinition, ItemInstance, ItemTemplate, ModuleDefinition, ModuleId, NodeAttribute,
    TemplateId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::{EngineError, EngineResult};
use crate::host::{AssetHandle, ObjectHandle, SceneHost};

/// Scene registered when a game module configures the project.
pub const MAIN_SCENE: &str = "MainScene";

/// Capability of a controller that represents the game itself.
///
/// At most one is expected per pass; the first one found in pass order wins.
pub trait GameRole {
    /// Alias used to name game-specific prefabs. Defaults to the module name.
    fn alias(&self, definition: &ModuleDefinition) -> String {
        definition.name.clone()
    }
}

/// Snapshot of the module that plays the game role in this pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameModuleRef {
    /// Module id.
    pub module_id: ModuleId,
    /// Alias reported by the controller.
    pub alias: String,
}

/// Summary of a bound module, visible to every module at init.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSummary {
    /// Module id.
    pub id: ModuleId,
    /// Module display name.
    pub name: String,
    /// Name of the bound controller.
    pub controller: String,
    /// Whether the controller plays the game role.
    pub is_game: bool,
}

/// Project-wide settings accumulated by modules during a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Scenes included in the player build, in order.
    pub build_scenes: Vec<String>,
}

impl ProjectSettings {
    /// Register a build scene. A starter scene goes first, any other scene
    /// is appended. Already registered names are ignored.
    pub fn add_scene(&mut self, name: impl Into<String>, starter: bool) {
        let name = name.into();
        if self.build_scenes.contains(&name) {
            log::debug!("scene {name} already registered");
            return;
        }
        if starter {
            self.build_scenes.insert(0, name);
        } else {
            self.build_scenes.push(name);
        }
    }
}

/// A tagged submesh collected during tree building for `preprocess`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedNode {
    /// Object the tagged submesh belongs to.
    pub parent: ObjectHandle,
    /// Child object standing for the submesh, when the host created one.
    pub object: Option<ObjectHandle>,
    /// Asset holding the submesh geometry.
    pub asset: AssetHandle,
    /// Submesh name.
    pub submesh: String,
    /// Directives authored on the node.
    pub attributes: Vec<NodeAttribute>,
}

/// Read-only context for [`Module::init`].
#[derive(Debug)]
pub struct InitContext<'a> {
    /// The loaded game.
    pub game: &'a GameDefinition,
    /// The module's own definition.
    pub definition: &'a ModuleDefinition,
    /// Every bound module in pass order.
    pub modules: &'a [ModuleSummary],
    /// The game-role module, if any module plays it.
    pub game_module: Option<&'a GameModuleRef>,
}

/// Context handed to every hook after init.
pub struct StageContext<'a> {
    /// The scene being built.
    pub host: &'a mut dyn SceneHost,
    /// The loaded game.
    pub game: &'a GameDefinition,
    /// The module's own definition.
    pub definition: &'a ModuleDefinition,
    /// The game-role module, if any module plays it.
    pub game_module: Option<&'a GameModuleRef>,
    /// Project settings shared by all modules.
    pub settings: &'a mut ProjectSettings,
}

impl fmt::Debug for StageContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageContext")
            .field("module", &self.definition.id)
            .field("game_module", &self.game_module)
            .field("settings", &self.settings)
            .finish()
    }
}

/// The pass-wide pieces a [`StageContext`] is built from.
pub struct PassEnv<'a> {
    /// The scene being built.
    pub host: &'a mut dyn SceneHost,
    /// The loaded game.
    pub game: &'a GameDefinition,
    /// The game-role module, if any.
    pub game_module: Option<&'a GameModuleRef>,
    /// Project settings shared by all modules.
    pub settings: &'a mut ProjectSettings,
}

impl PassEnv<'_> {
    fn stage<'s>(&'s mut self, definition: &'s ModuleDefinition) -> StageContext<'s> {
        StageContext {
            host: &mut *self.host,
            game: self.game,
            definition,
            game_module: self.game_module,
            settings: &mut *self.settings,
        }
    }
}

/// A module controller: custom creation, update, and removal of items plus
/// per-pass lifecycle hooks.
///
/// Every hook has a default that does nothing, so a controller only
/// overrides what it handles.
pub trait Module: fmt::Debug {
    /// Human-readable controller name.
    fn name(&self) -> &str;

    /// The game role, when this controller plays it.
    fn game_role(&self) -> Option<&dyn GameRole> {
        None
    }

    /// Called once per pass before any other hook.
    fn init(&mut self, _ctx: &InitContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    /// One-time project setup, called exactly once per pass.
    fn configure_project(&mut self, _ctx: &mut StageContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    /// Handle the surface nodes collected during tree building. Only called
    /// when there is at least one.
    fn preprocess(&mut self, _nodes: &[TaggedNode], _ctx: &mut StageContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    /// Custom creation. `None` asks for the default prefab fallback.
    ///
    /// `build` is the build-document entry matching the item's build id, if
    /// the item has one and the entry exists.
    fn create_item(
        &mut self,
        _item: &ItemInstance,
        _template: &ItemTemplate,
        _build: Option<&Json>,
        _ctx: &mut StageContext<'_>,
    ) -> EngineResult<Option<ObjectHandle>> {
        Ok(None)
    }

    /// Custom update of an existing object. The item transform is applied
    /// afterwards whatever this returns.
    fn update_item(
        &mut self,
        _item: &ItemInstance,
        _handle: ObjectHandle,
        _ctx: &mut StageContext<'_>,
    ) -> EngineResult<bool> {
        Ok(false)
    }

    /// Release side resources before the object is destroyed.
    fn remove_item(&mut self, _handle: ObjectHandle, _ctx: &mut StageContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    /// Final per-pass hook.
    fn cleanup(&mut self, _ctx: &mut StageContext<'_>) -> EngineResult<()> {
        Ok(())
    }

    /// Support downcasting to concrete controller types.
    fn as_any(&self) -> &dyn Any;

    /// Support downcasting to concrete controller types.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Controller that handles nothing; bound when a controller name cannot be
/// resolved.
#[derive(Debug, Default)]
pub struct NoopModule;

impl Module for NoopModule {
    fn name(&self) -> &str {
        "noop"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Lifecycle of a module within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Bound, no hook called yet.
    Unbound,
    /// `init` ran.
    Initialized,
    /// `configure_project` ran.
    Configured,
    /// At least one item or preprocess hook ran.
    Dispatching,
    /// `cleanup` ran; terminal for the pass.
    CleanedUp,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unbound => "unbound",
            Self::Initialized => "initialized",
            Self::Configured => "configured",
            Self::Dispatching => "dispatching",
            Self::CleanedUp => "cleaned up",
        };
        f.write_str(label)
    }
}

impl ModuleState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_advance(self, next: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, next),
            (Unbound, Initialized)
                | (Initialized, Configured)
                | (Initialized | Configured | Dispatching, Dispatching)
                | (Initialized | Configured | Dispatching, CleanedUp)
        )
    }
}

/// Pass stage a hook belongs to, for failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// `init`.
    Init,
    /// `configure_project`.
    Configure,
    /// `preprocess`.
    Preprocess,
    /// `create_item`.
    Create,
    /// `update_item`.
    Update,
    /// `remove_item`.
    Remove,
    /// `cleanup`.
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::Configure => "configure",
            Self::Preprocess => "preprocess",
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Cleanup => "cleanup",
        };
        f.write_str(label)
    }
}

/// A hook error caught during a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFailure {
    /// Module id.
    pub module: ModuleId,
    /// Controller name.
    pub controller: String,
    /// Stage the hook belongs to.
    pub stage: Stage,
    /// Error message.
    pub message: String,
}

impl ModuleFailure {
    /// Record and log a hook error.
    pub fn new(instance: &ModuleInstance, stage: Stage, error: &EngineError) -> Self {
        log::error!(
            "module {} ({}) failed during {stage}: {error}",
            instance.id(),
            instance.controller_name
        );
        Self {
            module: instance.id().clone(),
            controller: instance.controller_name.clone(),
            stage,
            message: error.to_string(),
        }
    }
}

/// A module definition bound to its controller, plus its lifecycle state.
#[derive(Debug)]
pub struct ModuleInstance {
    /// The module's definition.
    pub definition: ModuleDefinition,
    /// Name the controller was registered under.
    pub controller_name: String,
    controller: Box<dyn Module>,
    state: ModuleState,
}

impl ModuleInstance {
    /// Bind a definition to a controller.
    pub fn new(definition: ModuleDefinition, controller_name: impl Into<String>, controller: Box<dyn Module>) -> Self {
        Self {
            definition,
            controller_name: controller_name.into(),
            controller,
            state: ModuleState::Unbound,
        }
    }

    /// Module id.
    pub fn id(&self) -> &ModuleId {
        &self.definition.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ModuleState {
        self.state
    }

    /// Borrow the controller.
    pub fn controller(&self) -> &dyn Module {
        self.controller.as_ref()
    }

    /// Downcast the controller to a concrete type.
    pub fn controller_as<T: Module + 'static>(&self) -> Option<&T> {
        self.controller.as_any().downcast_ref::<T>()
    }

    /// Downcast the controller mutably to a concrete type.
    pub fn controller_as_mut<T: Module + 'static>(&mut self) -> Option<&mut T> {
        self.controller.as_any_mut().downcast_mut::<T>()
    }

    /// Find a template owned by this module (groups first, then user
    /// templates).
    pub fn template_item(&self, id: &TemplateId) -> Option<&ItemTemplate> {
        self.definition.template(id)
    }

    /// Summary used in init contexts.
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            id: self.definition.id.clone(),
            name: self.definition.name.clone(),
            controller: self.controller_name.clone(),
            is_game: self.controller.game_role().is_some(),
        }
    }

    /// Game-role snapshot, when the controller plays it.
    pub fn game_module_ref(&self) -> Option<GameModuleRef> {
        self.controller.game_role().map(|role| GameModuleRef {
            module_id: self.definition.id.clone(),
            alias: role.alias(&self.definition),
        })
    }

    /// Return to `Unbound` so the instance can run another pass.
    pub fn reset(&mut self) {
        self.state = ModuleState::Unbound;
    }

    /// Move to `next`, refusing illegal transitions.
    pub fn advance(&mut self, next: ModuleState, hook: &'static str) -> EngineResult<()> {
        if self.state == next && next == ModuleState::Dispatching {
            return Ok(());
        }
        if !self.state.can_advance(next) {
            let err = EngineError::InvalidState {
                module: self.definition.id.to_string(),
                hook,
                state: self.state,
            };
            log::error!("{err}");
            return Err(err);
        }
        self.state = next;
        Ok(())
    }

    /// Run `init`.
    pub fn init(
        &mut self,
        game: &GameDefinition,
        modules: &[ModuleSummary],
        game_module: Option<&GameModuleRef>,
    ) -> EngineResult<()> {
        self.advance(ModuleState::Initialized, "init")?;
        let ctx = InitContext {
            game,
            definition: &self.definition,
            modules,
            game_module,
        };
        self.controller.init(&ctx)
    }

    /// Run `configure_project`.
    pub fn configure_project(&mut self, env: &mut PassEnv<'_>) -> EngineResult<()> {
        self.advance(ModuleState::Configured, "configure_project")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.configure_project(&mut ctx)
    }

    /// Run `preprocess`.
    pub fn preprocess(&mut self, nodes: &[TaggedNode], env: &mut PassEnv<'_>) -> EngineResult<()> {
        self.advance(ModuleState::Dispatching, "preprocess")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.preprocess(nodes, &mut ctx)
    }

    /// Run `create_item`.
    pub fn create_item(
        &mut self,
        item: &ItemInstance,
        template: &ItemTemplate,
        build: Option<&Json>,
        env: &mut PassEnv<'_>,
    ) -> EngineResult<Option<ObjectHandle>> {
        self.advance(ModuleState::Dispatching, "create_item")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.create_item(item, template, build, &mut ctx)
    }

    /// Run `update_item`.
    pub fn update_item(
        &mut self,
        item: &ItemInstance,
        handle: ObjectHandle,
        env: &mut PassEnv<'_>,
    ) -> EngineResult<bool> {
        self.advance(ModuleState::Dispatching, "update_item")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.update_item(item, handle, &mut ctx)
    }

    /// Run `remove_item`.
    pub fn remove_item(&mut self, handle: ObjectHandle, env: &mut PassEnv<'_>) -> EngineResult<()> {
        self.advance(ModuleState::Dispatching, "remove_item")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.remove_item(handle, &mut ctx)
    }

    /// Run `cleanup`.
    pub fn cleanup(&mut self, env: &mut PassEnv<'_>) -> EngineResult<()> {
        self.advance(ModuleState::CleanedUp, "cleanup")?;
        let mut ctx = env.stage(&self.definition);
        self.controller.cleanup(&mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryScene;

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl Module for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }
        fn init(&mut self, _ctx: &InitContext<'_>) -> EngineResult<()> {
            self.calls.push("init");
            Ok(())
        }
        fn configure_project(&mut self, ctx: &mut StageContext<'_>) -> EngineResult<()> {
            self.calls.push("configure");
            ctx.settings.add_scene("Intro", true);
            Ok(())
        }
        fn cleanup(&mut self, _ctx: &mut StageContext<'_>) -> EngineResult<()> {
            self.calls.push("cleanup");
            Ok(())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn instance() -> ModuleInstance {
        ModuleInstance::new(
            ModuleDefinition::new("M1", "Props"),
            "Recorder",
            Box::new(Recorder::default()),
        )
    }

    #[test]
    fn lifecycle_runs_in_order() {
        let game = GameDefinition::new("G");
        let mut scene = MemoryScene::new();
        let mut settings = ProjectSettings::default();
        let mut module = instance();

        module.init(&game, &[], None).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: None,
            settings: &mut settings,
        };
        module.configure_project(&mut env).unwrap();
        module.cleanup(&mut env).unwrap();

        assert_eq!(module.state(), ModuleState::CleanedUp);
        let recorder = module.controller_as::<Recorder>().unwrap();
        assert_eq!(recorder.calls, vec!["init", "configure", "cleanup"]);
        assert_eq!(settings.build_scenes, vec!["Intro"]);
    }

    #[test]
    fn dispatch_before_init_is_refused() {
        let game = GameDefinition::new("G");
        let mut scene = MemoryScene::new();
        let mut settings = ProjectSettings::default();
        let mut module = instance();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: None,
            settings: &mut settings,
        };
        let item = ItemInstance::new("i1", "M1", "T1");
        let template = ItemTemplate::new("T1", "Box");
        let err = module.create_item(&item, &template, None, &mut env).unwrap_err();
        assert!(matches!(err, EngineError::InvalidState { state: ModuleState::Unbound, .. }));
    }

    #[test]
    fn configure_runs_once_and_cleanup_is_terminal() {
        let game = GameDefinition::new("G");
        let mut scene = MemoryScene::new();
        let mut settings = ProjectSettings::default();
        let mut module = instance();
        module.init(&game, &[], None).unwrap();
        let mut env = PassEnv {
            host: &mut scene,
            game: &game,
            game_module: None,
            settings: &mut settings,
        };
        module.configure_project(&mut env).unwrap();
        assert!(module.configure_project(&mut env).is_err());
        module.remove_item(ObjectHandle(1), &mut env).unwrap();
        assert_eq!(module.state(), ModuleState::Dispatching);
        module.cleanup(&mut env).unwrap();
        assert!(module.remove_item(ObjectHandle(1), &mut env).is_err());

        module.reset();
        assert_eq!(module.state(), ModuleState::Unbound);
    }

    #[test]
    fn add_scene_orders_starters_first_and_ignores_duplicates() {
        let mut settings = ProjectSettings::default();
        settings.add_scene(MAIN_SCENE, false);
        settings.add_scene("Credits", false);
        settings.add_scene("Intro", true);
        settings.add_scene("Credits", true);
        assert_eq!(settings.build_scenes, vec!["Intro", MAIN_SCENE, "Credits"]);
    }

    #[test]
    fn template_item_is_scoped_to_the_module() {
        let mut definition = ModuleDefinition::new("M1", "Props");
        definition.user_templates.push(ItemTemplate::new("U1", "Mine"));
        let module = ModuleInstance::new(definition, "BaseBGModel", Box::new(NoopModule));
        assert!(module.template_item(&"U1".into()).is_some());
        assert!(module.template_item(&"T9".into()).is_none());
        assert!(!module.summary().is_game);
    }
}
