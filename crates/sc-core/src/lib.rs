//! Core types for Stagecraft: games, modules, templates, items, and scene nodes.
//!
//! This crate defines the declarative data model that the loader fills in and
//! the engine materializes. It knows nothing about document layouts or host
//! scenes, so a [`GameDefinition`] can be built programmatically in tests.

/// Per-item build configuration keyed by build id.
pub mod build;
/// Error types used throughout the crate.
pub mod error;
/// Game definitions, modules, templates, and item instances.
pub mod game;
/// Opaque identifier tokens for modules, templates, and items.
pub mod id;
/// Scene-tree nodes and their declarative attributes.
pub mod scene;
/// Position / rotation / scale triples.
pub mod transform;
/// Dynamically typed item values.
pub mod value;

/// Re-export the build document.
pub use build::BuildDocument;
/// Re-export error types.
pub use error::{CoreError, CoreResult};
/// Re-export game model types.
pub use game::{
    GameDefinition, ItemGroup, ItemInstance, ItemTemplate, ModuleDefinition, PropertyDef,
    PropertyKind,
};
/// Re-export identifier types.
pub use id::{ItemId, ModuleId, TemplateId};
/// Re-export scene-tree types.
pub use scene::{NodeAttribute, SceneNode};
/// Re-export the transform type.
pub use transform::Transform;
/// Re-export the value type.
pub use value::Value;
