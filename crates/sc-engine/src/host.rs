use std::fmt;

use glam::{Quat, Vec3};
use sc_core::Transform;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::geometry::{AreaLight, MeshData};

/// Opaque handle to a materialized scene object, owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque handle to an importable asset (mesh or prefab), owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetHandle(pub u64);

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// Static classification flags the tree builder and attributes toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFlags {
    /// Object never moves and can be batched.
    pub is_static: bool,
    /// Object contributes to global illumination.
    pub contribute_gi: bool,
    /// Object receives baked lightmaps.
    pub receive_lightmaps: bool,
    /// Object's collider is active.
    pub collider_enabled: bool,
}

impl Default for ObjectFlags {
    fn default() -> Self {
        Self {
            is_static: false,
            contribute_gi: false,
            receive_lightmaps: false,
            collider_enabled: true,
        }
    }
}

/// The engine capability the pipeline drives.
///
/// Object handles are owned by the host; the pipeline only stores them and
/// forwards create, update, and destroy requests. Lookups return `None` for
/// misses, mutations return [`EngineError::UnknownObject`](crate::EngineError)
/// for stale handles.
pub trait SceneHost {
    /// Resolve an asset by its import key (any kind).
    fn resolve_asset(&self, key: &str) -> Option<AssetHandle>;

    /// Find a prefab asset by name.
    fn find_prefab(&self, name: &str) -> Option<AssetHandle>;

    /// All mesh assets with their import keys, for building an asset library.
    fn mesh_assets(&self) -> Vec<(String, AssetHandle)>;

    /// Instantiate an asset under `parent` (or at the scene root).
    fn instantiate(&mut self, asset: AssetHandle, parent: Option<ObjectHandle>) -> EngineResult<ObjectHandle>;

    /// Create an empty named object.
    fn create_empty(&mut self, name: &str, parent: Option<ObjectHandle>) -> EngineResult<ObjectHandle>;

    /// Destroy an object and its whole subtree.
    fn destroy(&mut self, handle: ObjectHandle) -> EngineResult<()>;

    /// Whether the handle refers to a live object.
    fn exists(&self, handle: ObjectHandle) -> bool;

    /// Replace position, rotation, and scale.
    fn set_transform(&mut self, handle: ObjectHandle, transform: &Transform) -> EngineResult<()>;

    /// Replace position and rotation, keeping the current scale.
    fn set_position_rotation(&mut self, handle: ObjectHandle, position: Vec3, rotation: Quat) -> EngineResult<()>;

    /// Current transform of an object.
    fn transform(&self, handle: ObjectHandle) -> Option<Transform>;

    /// Rename an object.
    fn set_name(&mut self, handle: ObjectHandle, name: &str) -> EngineResult<()>;

    /// Name of an object.
    fn name(&self, handle: ObjectHandle) -> Option<String>;

    /// First object with the given name.
    fn find_by_name(&self, name: &str) -> Option<ObjectHandle>;

    /// Direct children, in creation order.
    fn children(&self, handle: ObjectHandle) -> Vec<ObjectHandle>;

    /// The object and every descendant, pre-order.
    fn descendants(&self, handle: ObjectHandle) -> Vec<ObjectHandle>;

    /// Classification flags of an object.
    fn flags(&self, handle: ObjectHandle) -> Option<ObjectFlags>;

    /// Replace the classification flags of an object.
    fn set_flags(&mut self, handle: ObjectHandle, flags: ObjectFlags) -> EngineResult<()>;

    /// Asset an object was instantiated from, if any.
    fn asset_of(&self, handle: ObjectHandle) -> Option<AssetHandle>;

    /// Named submesh of an asset.
    fn submesh(&self, asset: AssetHandle, name: &str) -> Option<MeshData>;

    /// Remove a named submesh from an asset's visible geometry. Returns
    /// whether anything was removed.
    fn remove_submesh(&mut self, asset: AssetHandle, name: &str) -> EngineResult<bool>;

    /// Add a baked area light under `parent`.
    fn add_area_light(&mut self, parent: ObjectHandle, light: &AreaLight) -> EngineResult<ObjectHandle>;
}

/// Apply `update` to the flags of `handle` and every descendant.
pub fn update_subtree_flags(
    host: &mut dyn SceneHost,
    handle: ObjectHandle,
    update: impl Fn(&mut ObjectFlags),
) -> EngineResult<()> {
    for object in host.descendants(handle) {
        let mut flags = host.flags(object).unwrap_or_default();
        update(&mut flags);
        host.set_flags(object, flags)?;
    }
    Ok(())
}
