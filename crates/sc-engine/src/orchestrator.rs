use sc_core::{BuildDocument, GameDefinition, SceneNode};

use crate::config::PassConfig;
use crate::host::SceneHost;
use crate::module::{
    GameModuleRef, Module, ModuleFailure, ModuleInstance, ModuleSummary, PassEnv, ProjectSettings,
    Stage, TaggedNode,
};
use crate::oplog::{OpLog, SceneOp};
use crate::packages::{InstallOutcome, InstallSummary, PackageClient, PackageResult, install_packages};
use crate::reconcile::{IdentityIndex, ReconcileReport, Reconciler, plan};
use crate::tree::{AssetLibrary, TreeBuilder, TreeReport};

/// Everything a pass produced.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Reconciliation counters.
    pub reconcile: ReconcileReport,
    /// Tree build counters; `None` for update passes.
    pub tree: Option<TreeReport>,
    /// Package install outcomes.
    pub installs: InstallSummary,
    /// Every hook error caught during the pass, in order.
    pub module_failures: Vec<ModuleFailure>,
    /// Surface nodes collected by the tree builder.
    pub tagged_nodes: Vec<TaggedNode>,
    /// Build scenes registered by modules.
    pub build_scenes: Vec<String>,
    /// Module playing the game role, if any.
    pub game_module: Option<GameModuleRef>,
    /// Applied reconciliation operations, in order.
    pub ops: Vec<SceneOp>,
}

impl PassReport {
    /// Whether the pass ran without hook errors or failed installs.
    pub fn is_clean(&self) -> bool {
        self.module_failures.is_empty() && self.installs.is_success()
    }
}

/// Sequences module lifecycle hooks around tree building and reconciliation.
///
/// Stages run strictly in order and each module's hook finishes before the
/// next module's starts. Hook errors are recorded, never fatal.
pub struct Orchestrator {
    game: GameDefinition,
    modules: Vec<ModuleInstance>,
    config: PassConfig,
    builds: BuildDocument,
    packages: Option<Box<dyn PackageClient>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("game", &self.game.name)
            .field("modules", &self.modules.len())
            .field("items", &self.game.items.len())
            .field("builds", &self.builds.len())
            .finish()
    }
}

impl Orchestrator {
    /// Create an orchestrator over a loaded game and its bound modules.
    pub fn new(game: GameDefinition, modules: Vec<ModuleInstance>, config: PassConfig) -> Self {
        Self {
            game,
            modules,
            config,
            builds: BuildDocument::default(),
            packages: None,
        }
    }

    /// Attach the build document that items reference by build id.
    pub fn with_builds(mut self, builds: BuildDocument) -> Self {
        self.builds = builds;
        self
    }

    /// Attach the package manager used before configuration.
    pub fn with_package_client(mut self, client: Box<dyn PackageClient>) -> Self {
        self.packages = Some(client);
        self
    }

    /// The game being materialized.
    pub fn game(&self) -> &GameDefinition {
        &self.game
    }

    /// Replace the game, keeping the bound modules. Used between passes.
    pub fn set_game(&mut self, game: GameDefinition) {
        self.game = game;
    }

    /// Replace the build document. Used between passes.
    pub fn set_builds(&mut self, builds: BuildDocument) {
        self.builds = builds;
    }

    /// Bound modules in pass order.
    pub fn modules(&self) -> &[ModuleInstance] {
        &self.modules
    }

    /// Access a controller by downcasting to a concrete type.
    pub fn module<T: Module + 'static>(&self) -> Option<&T> {
        self.modules.iter().find_map(|m| m.controller_as::<T>())
    }

    /// Access a controller mutably by downcasting to a concrete type.
    pub fn module_mut<T: Module + 'static>(&mut self) -> Option<&mut T> {
        self.modules.iter_mut().find_map(|m| m.controller_as_mut::<T>())
    }

    /// Full build: init, package install, configure, tree import,
    /// preprocess, reconcile, cleanup.
    pub fn run_build(
        &mut self,
        host: &mut dyn SceneHost,
        scene_tree: Option<&SceneNode>,
        library: &AssetLibrary,
        index: &mut IdentityIndex,
    ) -> PassReport {
        log::info!("build pass for {}", self.game.name);
        self.run_pass(host, scene_tree.map(|tree| (tree, library)), index, true)
    }

    /// Incremental update: init, configure, reconcile, cleanup.
    pub fn run_update(&mut self, host: &mut dyn SceneHost, index: &mut IdentityIndex) -> PassReport {
        log::info!("update pass for {}", self.game.name);
        self.run_pass(host, None, index, false)
    }

    fn run_pass(
        &mut self,
        host: &mut dyn SceneHost,
        tree: Option<(&SceneNode, &AssetLibrary)>,
        index: &mut IdentityIndex,
        install: bool,
    ) -> PassReport {
        let mut report = PassReport::default();
        let game_module = self.init_modules(&mut report.module_failures);

        if install && self.config.install_packages {
            report.installs = self.install_module_packages();
        }

        let Self {
            game,
            modules,
            config,
            builds,
            ..
        } = self;
        let game: &GameDefinition = game;
        let mut settings = ProjectSettings::default();
        let mut env = PassEnv {
            host: &mut *host,
            game,
            game_module: game_module.as_ref(),
            settings: &mut settings,
        };

        for module in modules.iter_mut() {
            if let Err(e) = module.configure_project(&mut env) {
                report
                    .module_failures
                    .push(ModuleFailure::new(module, Stage::Configure, &e));
            }
        }

        if let Some((root, library)) = tree {
            let mut builder = TreeBuilder::new(&mut *env.host, library);
            builder.materialize(root, None, &mut report.tagged_nodes);
            report.tree = Some(builder.finish());
        }

        if !report.tagged_nodes.is_empty() {
            log::info!("preprocessing {} surface nodes", report.tagged_nodes.len());
            for module in modules.iter_mut() {
                if let Err(e) = module.preprocess(&report.tagged_nodes, &mut env) {
                    report
                        .module_failures
                        .push(ModuleFailure::new(module, Stage::Preprocess, &e));
                }
            }
        }

        let pruned = index.prune(&*env.host);
        if pruned > 0 {
            log::info!("{pruned} tracked objects were missing from the scene");
        }
        let mut ops = OpLog::new(config.max_ops);
        let plan = plan(&game.items, index.existing());
        log::debug!(
            "plan: {} to add, {} to update, {} to remove",
            plan.to_add.len(),
            plan.to_update.len(),
            plan.to_remove.len()
        );
        let reconcile_env = PassEnv {
            host: &mut *env.host,
            game,
            game_module: game_module.as_ref(),
            settings: &mut *env.settings,
        };
        report.reconcile = Reconciler::new(reconcile_env, index, &mut ops)
            .with_builds(builds)
            .apply(plan, modules);
        report
            .module_failures
            .extend(report.reconcile.failures.iter().cloned());

        for module in modules.iter_mut() {
            if let Err(e) = module.cleanup(&mut env) {
                report
                    .module_failures
                    .push(ModuleFailure::new(module, Stage::Cleanup, &e));
            }
        }

        report.ops = ops.take();
        report.build_scenes = settings.build_scenes;
        report.game_module = game_module;
        report
    }

    fn init_modules(&mut self, failures: &mut Vec<ModuleFailure>) -> Option<GameModuleRef> {
        for module in &mut self.modules {
            module.reset();
        }
        let summaries: Vec<ModuleSummary> = self.modules.iter().map(ModuleInstance::summary).collect();

        let mut game_modules = self.modules.iter().filter_map(ModuleInstance::game_module_ref);
        let game_module = game_modules.next();
        for extra in game_modules {
            log::debug!("module {} also plays the game role, ignored", extra.module_id);
        }
        match &game_module {
            Some(found) => log::debug!("game module {} (alias {})", found.module_id, found.alias),
            None => log::warn!("no module plays the game role"),
        }

        for module in &mut self.modules {
            if let Err(e) = module.init(&self.game, &summaries, game_module.as_ref()) {
                failures.push(ModuleFailure::new(module, Stage::Init, &e));
            }
        }
        game_module
    }

    fn install_module_packages(&mut self) -> InstallSummary {
        let mut packages: Vec<String> = Vec::new();
        for package in self.modules.iter().flat_map(|m| m.definition.packages.iter()) {
            if !packages.contains(package) {
                packages.push(package.clone());
            }
        }
        if packages.is_empty() {
            return InstallSummary::default();
        }

        match self.packages.as_deref_mut() {
            Some(client) => install_packages(client, &packages, &self.config.install_policy),
            None => {
                log::warn!("no package client, {} packages not installed", packages.len());
                InstallSummary {
                    results: packages
                        .into_iter()
                        .map(|package| PackageResult {
                            package,
                            outcome: InstallOutcome::Failed("no package client".into()),
                        })
                        .collect(),
                }
            }
        }
    }
}
