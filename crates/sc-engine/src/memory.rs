//! An in-memory [`SceneHost`] that can be serialized as a snapshot.

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Quat, Vec3};
use sc_core::Transform;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::geometry::{AreaLight, MeshData};
use crate::host::{AssetHandle, ObjectFlags, ObjectHandle, SceneHost};

/// Name given to objects created for synthesized area lights.
pub const AREA_LIGHT_NAME: &str = "Quad Area Light";

/// What an asset instantiates as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// Imported mesh, addressable through the asset library.
    Mesh,
    /// Authored prefab, addressable by name.
    Prefab,
}

/// A named piece of an asset's geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submesh {
    /// Submesh name.
    pub name: String,
    /// Geometry.
    #[serde(flatten)]
    pub mesh: MeshData,
}

/// An asset known to the in-memory host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryAsset {
    /// Import key, e.g. `Room.fbx` or `Box`.
    pub name: String,
    /// Mesh or prefab.
    pub kind: AssetKind,
    /// Submeshes; each becomes a child object on instantiation.
    #[serde(default)]
    pub submeshes: Vec<Submesh>,
}

impl MemoryAsset {
    /// A mesh asset without submeshes.
    pub fn mesh(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssetKind::Mesh,
            submeshes: Vec::new(),
        }
    }

    /// A prefab asset without submeshes.
    pub fn prefab(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AssetKind::Prefab,
            submeshes: Vec::new(),
        }
    }

    /// Builder-style submesh append.
    pub fn with_submesh(mut self, name: impl Into<String>, mesh: MeshData) -> Self {
        self.submeshes.push(Submesh {
            name: name.into(),
            mesh,
        });
        self
    }
}

/// One object in the in-memory scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Object name.
    pub name: String,
    /// Parent object, `None` at the scene root.
    pub parent: Option<ObjectHandle>,
    /// Children in creation order.
    pub children: Vec<ObjectHandle>,
    /// Local transform.
    pub transform: Transform,
    /// Classification flags.
    pub flags: ObjectFlags,
    /// Asset the object was instantiated from.
    pub asset: Option<AssetHandle>,
    /// Light carried by the object.
    pub light: Option<AreaLight>,
}

impl SceneObject {
    fn new(name: impl Into<String>, parent: Option<ObjectHandle>) -> Self {
        Self {
            name: name.into(),
            parent,
            children: Vec::new(),
            transform: Transform::IDENTITY,
            flags: ObjectFlags::default(),
            asset: None,
            light: None,
        }
    }
}

/// Plain-map scene host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryScene {
    next_handle: u64,
    assets: Vec<MemoryAsset>,
    objects: BTreeMap<ObjectHandle, SceneObject>,
}

impl MemoryScene {
    /// Create an empty scene with no assets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scene backed by an asset manifest.
    pub fn with_assets(assets: Vec<MemoryAsset>) -> Self {
        Self {
            assets,
            ..Self::default()
        }
    }

    /// Register an asset.
    pub fn add_asset(&mut self, asset: MemoryAsset) -> AssetHandle {
        self.assets.push(asset);
        AssetHandle(self.assets.len() as u64 - 1)
    }

    /// Look up an asset.
    pub fn asset(&self, handle: AssetHandle) -> Option<&MemoryAsset> {
        self.assets.get(handle.0 as usize)
    }

    /// All registered assets.
    pub fn assets(&self) -> &[MemoryAsset] {
        &self.assets
    }

    /// Look up an object.
    pub fn object(&self, handle: ObjectHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }

    /// Objects without a parent, in creation order.
    pub fn roots(&self) -> Vec<ObjectHandle> {
        self.objects
            .iter()
            .filter(|(_, o)| o.parent.is_none())
            .map(|(h, _)| *h)
            .collect()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the scene holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn insert(&mut self, object: SceneObject) -> EngineResult<ObjectHandle> {
        if let Some(parent) = object.parent.filter(|p| !self.objects.contains_key(p)) {
            return Err(EngineError::UnknownObject(parent));
        }
        self.next_handle += 1;
        let handle = ObjectHandle(self.next_handle);
        if let Some(parent) = object.parent.and_then(|p| self.objects.get_mut(&p)) {
            parent.children.push(handle);
        }
        self.objects.insert(handle, object);
        Ok(handle)
    }

    fn object_mut(&mut self, handle: ObjectHandle) -> EngineResult<&mut SceneObject> {
        self.objects
            .get_mut(&handle)
            .ok_or(EngineError::UnknownObject(handle))
    }

    fn asset_mut(&mut self, handle: AssetHandle) -> EngineResult<&mut MemoryAsset> {
        self.assets
            .get_mut(handle.0 as usize)
            .ok_or(EngineError::UnknownAsset(handle))
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

impl SceneHost for MemoryScene {
    fn resolve_asset(&self, key: &str) -> Option<AssetHandle> {
        self.assets
            .iter()
            .position(|a| a.name == key)
            .map(|i| AssetHandle(i as u64))
    }

    fn find_prefab(&self, name: &str) -> Option<AssetHandle> {
        let prefabs = || {
            self.assets
                .iter()
                .enumerate()
                .filter(|(_, a)| a.kind == AssetKind::Prefab)
        };
        prefabs()
            .find(|(_, a)| a.name == name)
            .or_else(|| prefabs().find(|(_, a)| file_stem(&a.name) == name))
            .map(|(i, _)| AssetHandle(i as u64))
    }

    fn mesh_assets(&self) -> Vec<(String, AssetHandle)> {
        self.assets
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind == AssetKind::Mesh)
            .map(|(i, a)| (a.name.clone(), AssetHandle(i as u64)))
            .collect()
    }

    fn instantiate(&mut self, asset: AssetHandle, parent: Option<ObjectHandle>) -> EngineResult<ObjectHandle> {
        let source = self.asset(asset).ok_or(EngineError::UnknownAsset(asset))?;
        let mut object = SceneObject::new(file_stem(&source.name), parent);
        object.asset = Some(asset);
        let submeshes: Vec<String> = source.submeshes.iter().map(|s| s.name.clone()).collect();

        let handle = self.insert(object)?;
        for name in submeshes {
            self.insert(SceneObject::new(name, Some(handle)))?;
        }
        Ok(handle)
    }

    fn create_empty(&mut self, name: &str, parent: Option<ObjectHandle>) -> EngineResult<ObjectHandle> {
        self.insert(SceneObject::new(name, parent))
    }

    fn destroy(&mut self, handle: ObjectHandle) -> EngineResult<()> {
        let parent = self
            .objects
            .get(&handle)
            .ok_or(EngineError::UnknownObject(handle))?
            .parent;
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(&p)) {
            parent.children.retain(|c| *c != handle);
        }
        for object in self.descendants(handle) {
            self.objects.remove(&object);
        }
        Ok(())
    }

    fn exists(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    fn set_transform(&mut self, handle: ObjectHandle, transform: &Transform) -> EngineResult<()> {
        self.object_mut(handle)?.transform = *transform;
        Ok(())
    }

    fn set_position_rotation(&mut self, handle: ObjectHandle, position: Vec3, rotation: Quat) -> EngineResult<()> {
        let object = self.object_mut(handle)?;
        object.transform.position = position;
        object.transform.rotation = rotation;
        Ok(())
    }

    fn transform(&self, handle: ObjectHandle) -> Option<Transform> {
        self.objects.get(&handle).map(|o| o.transform)
    }

    fn set_name(&mut self, handle: ObjectHandle, name: &str) -> EngineResult<()> {
        self.object_mut(handle)?.name = name.to_string();
        Ok(())
    }

    fn name(&self, handle: ObjectHandle) -> Option<String> {
        self.objects.get(&handle).map(|o| o.name.clone())
    }

    fn find_by_name(&self, name: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .find(|(_, o)| o.name == name)
            .map(|(h, _)| *h)
    }

    fn children(&self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        self.objects
            .get(&handle)
            .map(|o| o.children.clone())
            .unwrap_or_default()
    }

    fn descendants(&self, handle: ObjectHandle) -> Vec<ObjectHandle> {
        let mut result = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            let Some(object) = self.objects.get(&current) else {
                continue;
            };
            result.push(current);
            stack.extend(object.children.iter().rev());
        }
        result
    }

    fn flags(&self, handle: ObjectHandle) -> Option<ObjectFlags> {
        self.objects.get(&handle).map(|o| o.flags)
    }

    fn set_flags(&mut self, handle: ObjectHandle, flags: ObjectFlags) -> EngineResult<()> {
        self.object_mut(handle)?.flags = flags;
        Ok(())
    }

    fn asset_of(&self, handle: ObjectHandle) -> Option<AssetHandle> {
        self.objects.get(&handle).and_then(|o| o.asset)
    }

    fn submesh(&self, asset: AssetHandle, name: &str) -> Option<MeshData> {
        self.asset(asset)?
            .submeshes
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.mesh.clone())
    }

    fn remove_submesh(&mut self, asset: AssetHandle, name: &str) -> EngineResult<bool> {
        let source = self.asset_mut(asset)?;
        let before = source.submeshes.len();
        source.submeshes.retain(|s| s.name != name);
        if source.submeshes.len() == before {
            return Ok(false);
        }

        // Existing instances lose the submesh too.
        let stale: Vec<ObjectHandle> = self
            .objects
            .iter()
            .filter(|(_, o)| o.name == name)
            .filter(|(_, o)| {
                o.parent
                    .and_then(|p| self.objects.get(&p))
                    .is_some_and(|p| p.asset == Some(asset))
            })
            .map(|(h, _)| *h)
            .collect();
        for handle in stale {
            self.destroy(handle)?;
        }
        Ok(true)
    }

    fn add_area_light(&mut self, parent: ObjectHandle, light: &AreaLight) -> EngineResult<ObjectHandle> {
        let mut object = SceneObject::new(AREA_LIGHT_NAME, Some(parent));
        object.transform.position = light.position;
        object.transform.rotation = light.rotation;
        object.light = Some(*light);
        self.insert(object)
    }
}
