use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Attribute name that instantiates a named prefab instead of a library mesh.
pub const ATTR_PREFAB: &str = "prefab";
/// Attribute name that disables colliders on a subtree.
pub const ATTR_DO_NOT_COLLIDE: &str = "do not collide";
/// Attribute name that removes a subtree from lightmap contribution.
pub const ATTR_EXCLUDED_FROM_LIGHTMAPS: &str = "excluded from lightmaps";
/// Attribute name marking a submesh as a light-emitting quad region.
pub const ATTR_TRANSLUCENT: &str = "translucent";
/// Attribute name marking a submesh as a walkable surface.
pub const ATTR_SURFACE: &str = "surface";

/// A declarative name/value directive attached to a scene node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttribute {
    /// Directive name, e.g. `"do not collide"`.
    pub name: String,
    /// Raw directive value as authored.
    pub value: String,
}

impl NodeAttribute {
    /// Create an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parse the value as a boolean (`true` / `false`, any case).
    pub fn bool_value(&self) -> Option<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// One node of an imported scene tree.
///
/// Built bottom-up by the loader and consumed top-down by the tree builder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// Mesh the node instantiates. Only the synthetic root has none.
    pub mesh_ref: Option<String>,
    /// Local placement. Only the synthetic root has none.
    pub transform: Option<Transform>,
    /// Flat list of declarative directives, in authored order.
    pub attributes: Vec<NodeAttribute>,
    /// Ordered children.
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    /// Create a synthetic root holding `children`.
    pub fn root(children: Vec<SceneNode>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Create a mesh node at `transform`.
    pub fn mesh(mesh_ref: impl Into<String>, transform: Transform) -> Self {
        Self {
            mesh_ref: Some(mesh_ref.into()),
            transform: Some(transform),
            ..Default::default()
        }
    }

    /// Builder-style attribute append.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(NodeAttribute::new(name, value));
        self
    }

    /// Builder-style child append.
    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// First attribute with the given name.
    pub fn attribute(&self, name: &str) -> Option<&NodeAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether this is the synthetic root (no mesh, no transform).
    pub fn is_root(&self) -> bool {
        self.mesh_ref.is_none() && self.transform.is_none()
    }

    /// Whether the node carries any attribute at all.
    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Total number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_value_is_case_insensitive() {
        assert_eq!(NodeAttribute::new("x", "True").bool_value(), Some(true));
        assert_eq!(NodeAttribute::new("x", " false ").bool_value(), Some(false));
        assert_eq!(NodeAttribute::new("x", "yes").bool_value(), None);
    }

    #[test]
    fn attribute_lookup_returns_first_match() {
        let node = SceneNode::mesh("Room.fbx", Transform::IDENTITY)
            .with_attribute(ATTR_PREFAB, "Door")
            .with_attribute(ATTR_PREFAB, "Window");
        assert_eq!(node.attribute(ATTR_PREFAB).unwrap().value, "Door");
        assert!(node.has_attributes());
    }

    #[test]
    fn node_count_covers_subtree() {
        let tree = SceneNode::root(vec![
            SceneNode::mesh("A", Transform::IDENTITY)
                .with_child(SceneNode::mesh("B", Transform::IDENTITY)),
            SceneNode::mesh("C", Transform::IDENTITY),
        ]);
        assert_eq!(tree.node_count(), 4);
        assert!(tree.is_root());
        assert!(!tree.children[0].is_root());
    }
}
