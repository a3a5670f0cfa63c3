//! Module dispatch, scene reconciliation, and tree building for Stagecraft.
//!
//! The engine drives a host scene through the [`SceneHost`] trait and never
//! owns scene objects itself. Loaded modules are bound to controllers by a
//! [`ControllerRegistry`] and driven through a staged pass by the
//! [`Orchestrator`]: init, package install, configure, tree import,
//! preprocess, reconcile, cleanup. [`MemoryScene`] is a complete host kept
//! in plain maps, so every stage runs without an engine attached.

/// Built-in controller for character modules.
pub mod character;
/// Configuration types for passes.
pub mod config;
/// Error types for the engine crate.
pub mod error;
/// Built-in controller for the game module.
pub mod game_module;
/// Quad reconstruction and area-light synthesis.
pub mod geometry;
/// The host scene trait and handle types.
pub mod host;
/// In-memory scene host.
pub mod memory;
/// The controller trait, pass contexts, and module lifecycle.
pub mod module;
/// Log of applied scene operations.
pub mod oplog;
/// Top-level pass orchestrator.
pub mod orchestrator;
/// Package installation.
pub mod packages;
/// Desired-versus-materialized reconciliation.
pub mod reconcile;
/// Controller registry.
pub mod registry;
/// Scene-tree materialization.
pub mod tree;

/// Re-export of [`character::CharacterModule`].
pub use character::CharacterModule;
/// Re-export of [`config::PassConfig`].
pub use config::PassConfig;
/// Re-exports of [`error::EngineError`] and [`error::EngineResult`].
pub use error::{EngineError, EngineResult};
/// Re-export of [`game_module::GameModule`].
pub use game_module::GameModule;
/// Re-exports of geometry types.
pub use geometry::{AreaLight, MeshData, Quad, pair_quads};
/// Re-exports of host types.
pub use host::{AssetHandle, ObjectFlags, ObjectHandle, SceneHost};
/// Re-exports of in-memory host types.
pub use memory::{AssetKind, MemoryAsset, MemoryScene};
/// Re-exports of module dispatch types.
pub use module::{
    GameModuleRef, GameRole, InitContext, Module, ModuleFailure, ModuleInstance, ModuleState,
    NoopModule, ProjectSettings, Stage, StageContext, TaggedNode,
};
/// Re-exports of [`oplog::OpLog`], [`oplog::SceneOp`], and related types.
pub use oplog::{CreatePath, OpLog, SceneOp, SceneOpKind};
/// Re-exports of [`orchestrator::Orchestrator`] and [`orchestrator::PassReport`].
pub use orchestrator::{Orchestrator, PassReport};
/// Re-exports of package installation types.
pub use packages::{InstallPolicy, InstallSummary, PackageClient, RequestId, RequestStatus};
/// Re-exports of reconciliation types.
pub use reconcile::{IdentityIndex, ReconcilePlan, ReconcileReport, Reconciler, USER_ASSET_MODULE, plan};
/// Re-export of [`registry::ControllerRegistry`].
pub use registry::ControllerRegistry;
/// Re-exports of tree building types.
pub use tree::{AssetLibrary, TreeBuilder, TreeReport};
