use std::collections::HashMap;

use sc_core::ModuleDefinition;

use crate::character::CharacterModule;
use crate::game_module::GameModule;
use crate::module::{Module, ModuleInstance, NoopModule};

/// Constructor for a fresh controller.
pub type ControllerFactory = fn() -> Box<dyn Module>;

/// Controller name bound to [`GameModule`].
pub const GAME_CONTROLLER: &str = "BaseGameModule";
/// Controller name bound to [`CharacterModule`].
pub const CHARACTER_CONTROLLER: &str = "BaseCharacterModule";
/// Controller name for modules that only ship templates.
pub const MODEL_CONTROLLER: &str = "BaseBGModel";

/// Name-keyed controller factories.
#[derive(Debug, Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in controllers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(GAME_CONTROLLER, || Box::new(GameModule::default()));
        registry.register(CHARACTER_CONTROLLER, || Box::new(CharacterModule::default()));
        registry.register(MODEL_CONTROLLER, || Box::new(NoopModule));
        registry
    }

    /// Register (or replace) a controller under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: ControllerFactory) {
        let name = name.into();
        if self.factories.insert(name.clone(), factory).is_some() {
            log::debug!("controller {name} re-registered");
        }
    }

    /// Whether a controller is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered controller names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Bind each definition to a fresh controller, preserving order.
    ///
    /// Definitions with no controller name, or one nobody registered, get a
    /// [`NoopModule`].
    pub fn bind(&self, definitions: Vec<ModuleDefinition>) -> Vec<ModuleInstance> {
        definitions
            .into_iter()
            .map(|definition| {
                let name = definition.controller.clone().unwrap_or_default();
                match self.factories.get(&name) {
                    Some(factory) => ModuleInstance::new(definition, name, factory()),
                    None => {
                        if name.is_empty() {
                            log::warn!("module {} names no controller, binding noop", definition.id);
                        } else {
                            log::warn!(
                                "module {} names unknown controller {name}, binding noop",
                                definition.id
                            );
                        }
                        ModuleInstance::new(definition, name, Box::new(NoopModule))
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(id: &str, controller: Option<&str>) -> ModuleDefinition {
        let mut definition = ModuleDefinition::new(id, id);
        definition.controller = controller.map(str::to_string);
        definition
    }

    #[test]
    fn builtins_are_registered() {
        let registry = ControllerRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec![MODEL_CONTROLLER, CHARACTER_CONTROLLER, GAME_CONTROLLER]
        );
    }

    #[test]
    fn bind_preserves_order_and_resolves_controllers() {
        let registry = ControllerRegistry::with_builtins();
        let bound = registry.bind(vec![
            definition("M1", Some(CHARACTER_CONTROLLER)),
            definition("M2", Some(GAME_CONTROLLER)),
        ]);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound[0].id().as_str(), "M1");
        assert!(bound[0].controller_as::<CharacterModule>().is_some());
        assert!(bound[1].controller_as::<GameModule>().is_some());
        assert!(bound[1].summary().is_game);
    }

    #[test]
    fn unknown_or_missing_controller_binds_noop() {
        let registry = ControllerRegistry::with_builtins();
        let bound = registry.bind(vec![
            definition("M1", Some("DoesNotExist")),
            definition("M2", None),
        ]);
        assert!(bound[0].controller_as::<NoopModule>().is_some());
        assert_eq!(bound[0].controller_name, "DoesNotExist");
        assert!(bound[1].controller_as::<NoopModule>().is_some());
    }

    #[test]
    fn register_replaces_factory() {
        let mut registry = ControllerRegistry::new();
        registry.register("Custom", || Box::new(NoopModule));
        registry.register("Custom", || Box::new(GameModule::default()));
        assert!(registry.contains("Custom"));
        let bound = registry.bind(vec![definition("M1", Some("Custom"))]);
        assert!(bound[0].controller_as::<GameModule>().is_some());
    }
}
