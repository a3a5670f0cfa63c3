//! Scene-tree materialization and submesh tagging.

use std::collections::HashMap;
use std::path::Path;

use glam::Vec3;
use sc_core::scene::{
    ATTR_DO_NOT_COLLIDE, ATTR_EXCLUDED_FROM_LIGHTMAPS, ATTR_PREFAB, ATTR_SURFACE, ATTR_TRANSLUCENT,
};
use sc_core::{NodeAttribute, SceneNode, Transform};

use crate::geometry::{AreaLight, pair_quads};
use crate::host::{AssetHandle, ObjectHandle, SceneHost, update_subtree_flags};
use crate::module::TaggedNode;

/// Name of the container synthesized for an unresolved root.
pub const ENVIRONMENT_NAME: &str = "Environment";
/// Name of the group holding lights synthesized from a translucent submesh.
pub const QUAD_LIGHTS_NAME: &str = "QuadLights";

/// Mesh assets available to the tree builder, keyed by import key.
#[derive(Debug, Clone, Default)]
pub struct AssetLibrary {
    meshes: HashMap<String, AssetHandle>,
}

impl AssetLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every mesh asset the host knows.
    pub fn from_host(host: &dyn SceneHost) -> Self {
        Self {
            meshes: host.mesh_assets().into_iter().collect(),
        }
    }

    /// Add a mesh under its key.
    pub fn insert(&mut self, key: impl Into<String>, asset: AssetHandle) {
        self.meshes.insert(key.into(), asset);
    }

    /// Look up a mesh by key.
    pub fn get(&self, key: &str) -> Option<AssetHandle> {
        self.meshes.get(key).copied()
    }

    /// Number of meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Return `true` if the library has no meshes.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Split children into those materialized as their own objects and those
/// that tag regions of the parent mesh.
pub fn partition_children(children: &[SceneNode]) -> (Vec<&SceneNode>, Vec<&SceneNode>) {
    children.iter().partition(|child| !child.has_attributes())
}

/// Counters from one tree build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeReport {
    /// Objects created for nodes.
    pub materialized: usize,
    /// Nodes that resolved to nothing; their subtrees were skipped.
    pub skipped: usize,
    /// Area lights synthesized from translucent submeshes.
    pub lights: usize,
    /// Submeshes removed from visible geometry.
    pub removed_submeshes: usize,
}

fn file_stem(key: &str) -> &str {
    Path::new(key)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(key)
}

/// Walks a scene tree and materializes it in a host.
pub struct TreeBuilder<'a> {
    host: &'a mut dyn SceneHost,
    library: &'a AssetLibrary,
    report: TreeReport,
}

impl<'a> TreeBuilder<'a> {
    /// Create a builder over a host and asset library.
    pub fn new(host: &'a mut dyn SceneHost, library: &'a AssetLibrary) -> Self {
        Self {
            host,
            library,
            report: TreeReport::default(),
        }
    }

    /// Counters so far.
    pub fn report(&self) -> &TreeReport {
        &self.report
    }

    /// Consume the builder, returning its counters.
    pub fn finish(self) -> TreeReport {
        self.report
    }

    /// Materialize `node` under `parent`, then its children, pre-order.
    ///
    /// Children carrying attributes are not materialized; their submeshes
    /// are tagged instead, and surface submeshes are pushed to
    /// `side_channel`. Returns `None` when the node resolves to nothing, in
    /// which case its subtree is skipped.
    pub fn materialize(
        &mut self,
        node: &SceneNode,
        parent: Option<ObjectHandle>,
        side_channel: &mut Vec<TaggedNode>,
    ) -> Option<ObjectHandle> {
        let (handle, via_prefab) = self.resolve(node, parent)?;
        self.report.materialized += 1;

        if let Some(transform) = &node.transform {
            let applied = if via_prefab {
                self.host
                    .set_position_rotation(handle, transform.position, transform.rotation)
            } else {
                self.host.set_transform(handle, transform)
            };
            if let Err(e) = applied {
                log::warn!("node {}: transform failed: {e}", describe(node));
            }
        }

        for attribute in &node.attributes {
            self.apply_attribute(handle, attribute);
        }

        let (recurse, tagged) = partition_children(&node.children);
        for child in tagged {
            self.process_tagged_geometry(handle, child, side_channel);
        }
        for child in recurse {
            self.materialize(child, Some(handle), side_channel);
        }
        Some(handle)
    }

    fn resolve(&mut self, node: &SceneNode, parent: Option<ObjectHandle>) -> Option<(ObjectHandle, bool)> {
        if let Some(prefab) = node.attribute(ATTR_PREFAB) {
            match self.host.find_prefab(&prefab.value) {
                Some(asset) => match self.host.instantiate(asset, parent) {
                    Ok(handle) => return Some((handle, true)),
                    Err(e) => log::warn!("prefab {}: {e}", prefab.value),
                },
                None => log::warn!("prefab {} not found, trying the mesh library", prefab.value),
            }
        }

        if let Some(asset) = node.mesh_ref.as_deref().and_then(|m| self.library.get(m)) {
            match self.host.instantiate(asset, parent) {
                Ok(handle) => {
                    let marked = update_subtree_flags(&mut *self.host, handle, |flags| {
                        flags.is_static = true;
                        flags.contribute_gi = true;
                        flags.receive_lightmaps = true;
                    });
                    if let Err(e) = marked {
                        log::warn!("node {}: static flags failed: {e}", describe(node));
                    }
                    return Some((handle, false));
                }
                Err(e) => log::warn!("node {}: {e}", describe(node)),
            }
        }

        if parent.is_none() {
            let container = self.host.create_empty(ENVIRONMENT_NAME, None);
            let mirrored = Transform {
                scale: Vec3::new(-1.0, 1.0, 1.0),
                ..Transform::IDENTITY
            };
            let created = container.and_then(|handle| {
                self.host.set_transform(handle, &mirrored)?;
                Ok(handle)
            });
            match created {
                Ok(handle) => return Some((handle, false)),
                Err(e) => log::error!("environment container: {e}"),
            }
        }

        log::warn!("node {} did not resolve, subtree skipped", describe(node));
        self.report.skipped += 1;
        None
    }

    /// Apply one declarative directive to a materialized object.
    pub fn apply_attribute(&mut self, handle: ObjectHandle, attribute: &NodeAttribute) {
        let name = attribute.name.as_str();
        match name {
            ATTR_DO_NOT_COLLIDE | ATTR_EXCLUDED_FROM_LIGHTMAPS => {
                let Some(enabled) = attribute.bool_value() else {
                    log::warn!("attribute {name}: unknown value {}", attribute.value);
                    return;
                };
                if !enabled {
                    return;
                }
                let result = if name == ATTR_DO_NOT_COLLIDE {
                    update_subtree_flags(&mut *self.host, handle, |f| f.collider_enabled = false)
                } else {
                    update_subtree_flags(&mut *self.host, handle, |f| f.contribute_gi = false)
                };
                if let Err(e) = result {
                    log::warn!("attribute {name} on {handle}: {e}");
                }
            }
            ATTR_PREFAB | ATTR_TRANSLUCENT | ATTR_SURFACE => {}
            _ => log::warn!("unknown attribute {name}"),
        }
    }

    /// Handle an attributed child as a tagged region of its parent's mesh.
    ///
    /// Translucent submeshes become area lights and are removed from the
    /// visible geometry. Surface submeshes stay and are pushed to
    /// `side_channel`; surface wins when both are set.
    pub fn process_tagged_geometry(
        &mut self,
        parent: ObjectHandle,
        child: &SceneNode,
        side_channel: &mut Vec<TaggedNode>,
    ) {
        let Some(mesh_ref) = child.mesh_ref.as_deref() else {
            return;
        };
        let submesh = file_stem(mesh_ref);
        let asset = self
            .host
            .asset_of(parent)
            .filter(|a| self.host.submesh(*a, submesh).is_some())
            .or_else(|| {
                self.library
                    .get(mesh_ref)
                    .filter(|a| self.host.submesh(*a, submesh).is_some())
            });
        let Some((asset, mesh)) = asset.and_then(|a| self.host.submesh(a, submesh).map(|m| (a, m))) else {
            log::debug!("tagged node {mesh_ref}: no submesh {submesh}");
            return;
        };

        let translucent = child.attribute(ATTR_TRANSLUCENT).is_some();
        let surface = child.attribute(ATTR_SURFACE).is_some();

        if translucent {
            match self.host.create_empty(QUAD_LIGHTS_NAME, Some(parent)) {
                Ok(group) => {
                    for quad in pair_quads(&mesh) {
                        match self.host.add_area_light(group, &AreaLight::from_quad(&quad)) {
                            Ok(_) => self.report.lights += 1,
                            Err(e) => log::warn!("submesh {submesh}: area light failed: {e}"),
                        }
                    }
                }
                Err(e) => log::warn!("submesh {submesh}: light group failed: {e}"),
            }
        }

        if surface {
            let object = self
                .host
                .children(parent)
                .into_iter()
                .find(|c| self.host.name(*c).as_deref() == Some(submesh));
            side_channel.push(TaggedNode {
                parent,
                object,
                asset,
                submesh: submesh.to_string(),
                attributes: child.attributes.clone(),
            });
        } else if translucent {
            match self.host.remove_submesh(asset, submesh) {
                Ok(true) => self.report.removed_submeshes += 1,
                Ok(false) => {}
                Err(e) => log::warn!("submesh {submesh}: remove failed: {e}"),
            }
        }
    }
}

fn describe(node: &SceneNode) -> &str {
    node.mesh_ref.as_deref().unwrap_or("<root>")
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::geometry::MeshData;
    use crate::memory::{AREA_LIGHT_NAME, MemoryAsset, MemoryScene};

    fn light_panel() -> MeshData {
        MeshData::new(
            vec![
                Vec3::ZERO,
                Vec3::X,
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::Y,
            ],
            vec![0, 1, 2, 2, 3, 0],
        )
    }

    fn room_scene() -> MemoryScene {
        MemoryScene::with_assets(vec![
            MemoryAsset::mesh("room.fbx")
                .with_submesh("Light01", light_panel())
                .with_submesh("Floor", light_panel()),
            MemoryAsset::mesh("chair.fbx"),
            MemoryAsset::prefab("Props/Lamp.prefab"),
        ])
    }

    fn build(scene: &mut MemoryScene, tree: &SceneNode) -> (Option<ObjectHandle>, Vec<TaggedNode>, TreeReport) {
        let library = AssetLibrary::from_host(&*scene);
        let mut side = Vec::new();
        let mut builder = TreeBuilder::new(scene, &library);
        let root = builder.materialize(tree, None, &mut side);
        (root, side, builder.finish())
    }

    #[test]
    fn partition_splits_on_attributes() {
        let children = vec![
            SceneNode::mesh("a.fbx", Transform::IDENTITY),
            SceneNode::mesh("b.fbx", Transform::IDENTITY).with_attribute("surface", "true"),
        ];
        let (recurse, tagged) = partition_children(&children);
        assert_eq!(recurse.len(), 1);
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].mesh_ref.as_deref(), Some("b.fbx"));
    }

    #[test]
    fn unresolved_root_becomes_mirrored_environment() {
        let mut scene = room_scene();
        let tree = SceneNode::root(vec![SceneNode::mesh("room.fbx", Transform::IDENTITY)]);
        let (root, _, report) = build(&mut scene, &tree);

        let root = root.unwrap();
        assert_eq!(scene.name(root).as_deref(), Some(ENVIRONMENT_NAME));
        assert_eq!(scene.transform(root).unwrap().scale, Vec3::new(-1.0, 1.0, 1.0));
        assert_eq!(report.materialized, 2);
        let room = scene.children(root)[0];
        assert_eq!(scene.name(room).as_deref(), Some("room"));
    }

    #[test]
    fn library_meshes_are_marked_static_for_lightmaps() {
        let mut scene = room_scene();
        let tree = SceneNode::root(vec![SceneNode::mesh("room.fbx", Transform::IDENTITY)]);
        let (root, _, _) = build(&mut scene, &tree);
        let room = scene.children(root.unwrap())[0];
        for object in scene.descendants(room) {
            let flags = scene.flags(object).unwrap();
            assert!(flags.is_static && flags.contribute_gi && flags.receive_lightmaps);
        }
    }

    #[test]
    fn unknown_mesh_skips_its_subtree() {
        let mut scene = room_scene();
        let tree = SceneNode::root(vec![
            SceneNode::mesh("missing.fbx", Transform::IDENTITY)
                .with_child(SceneNode::mesh("chair.fbx", Transform::IDENTITY)),
        ]);
        let (_, _, report) = build(&mut scene, &tree);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.materialized, 1);
        assert!(scene.find_by_name("chair").is_none());
    }

    #[test]
    fn prefab_root_keeps_its_scale() {
        let mut scene = room_scene();
        let transform = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Quat::from_rotation_y(1.0),
            scale: Vec3::splat(4.0),
        };
        let tree = SceneNode::mesh("lamp.fbx", transform).with_attribute("prefab", "Lamp");
        let (root, _, _) = build(&mut scene, &tree);

        let applied = scene.transform(root.unwrap()).unwrap();
        assert_eq!(applied.position, transform.position);
        assert_eq!(applied.rotation, transform.rotation);
        assert_eq!(applied.scale, Vec3::ONE);
    }

    #[test]
    fn do_not_collide_disables_colliders_recursively() {
        let mut scene = room_scene();
        let tree = SceneNode::mesh("room.fbx", Transform::IDENTITY)
            .with_attribute("do not collide", "True")
            .with_attribute("excluded from lightmaps", "maybe");
        let (root, _, _) = build(&mut scene, &tree);
        for object in scene.descendants(root.unwrap()) {
            let flags = scene.flags(object).unwrap();
            assert!(!flags.collider_enabled);
            assert!(flags.contribute_gi);
        }
    }

    #[test]
    fn translucent_submesh_becomes_area_lights() {
        let mut scene = room_scene();
        let tree = SceneNode::root(vec![
            SceneNode::mesh("room.fbx", Transform::IDENTITY).with_child(
                SceneNode::mesh("Light01.fbx", Transform::IDENTITY)
                    .with_attribute("translucent", "true"),
            ),
        ]);
        let (_, side, report) = build(&mut scene, &tree);

        assert!(side.is_empty());
        assert_eq!(report.lights, 1);
        assert_eq!(report.removed_submeshes, 1);
        let room = scene.find_by_name("room").unwrap();
        let asset = scene.asset_of(room).unwrap();
        assert!(scene.submesh(asset, "Light01").is_none());
        assert!(scene.submesh(asset, "Floor").is_some());
        let group = scene.find_by_name(QUAD_LIGHTS_NAME).unwrap();
        let lights = scene.children(group);
        assert_eq!(lights.len(), 1);
        assert_eq!(scene.name(lights[0]).as_deref(), Some(AREA_LIGHT_NAME));
    }

    #[test]
    fn surface_submesh_is_kept_and_collected() {
        let mut scene = room_scene();
        let tree = SceneNode::mesh("room.fbx", Transform::IDENTITY).with_child(
            SceneNode::mesh("Floor.fbx", Transform::IDENTITY)
                .with_attribute("surface", "walkable")
                .with_attribute("translucent", "true"),
        );
        let (root, side, report) = build(&mut scene, &tree);

        assert_eq!(side.len(), 1);
        assert_eq!(side[0].submesh, "Floor");
        assert_eq!(side[0].parent, root.unwrap());
        assert!(side[0].object.is_some());
        assert_eq!(report.removed_submeshes, 0);
        assert!(scene.submesh(side[0].asset, "Floor").is_some());
    }

    #[test]
    fn untagged_submesh_is_left_alone() {
        let mut scene = room_scene();
        let tree = SceneNode::mesh("room.fbx", Transform::IDENTITY).with_child(
            SceneNode::mesh("Floor.fbx", Transform::IDENTITY).with_attribute("do not collide", "true"),
        );
        let (root, side, report) = build(&mut scene, &tree);
        assert!(side.is_empty());
        assert_eq!(report.lights, 0);
        let asset = scene.asset_of(root.unwrap()).unwrap();
        assert!(scene.submesh(asset, "Floor").is_some());
    }
}
