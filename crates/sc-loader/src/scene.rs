//! Scene-tree documents.

use std::path::Path;

use glam::{Quat, Vec3};
use sc_core::{NodeAttribute, SceneNode, Transform};
use serde_json::{Map, Value as Json};

use crate::convert;
use crate::error::{LoadError, LoadResult};

/// Parse a scene-tree document into a synthetic root node.
///
/// Nodes without a mesh are dropped together with their subtree.
pub fn load_scene_tree(json: &str) -> LoadResult<SceneNode> {
    let doc: Json = serde_json::from_str(json).map_err(|e| LoadError::json("scene tree", e))?;
    let Some(root) = doc.get("root").and_then(Json::as_array) else {
        return Err(LoadError::MissingField {
            field: "root",
            context: "scene tree".to_string(),
        });
    };
    Ok(SceneNode::root(parse_nodes(root)?))
}

/// Read and parse a scene-tree document from disk.
pub fn load_scene_tree_file(path: &Path) -> LoadResult<SceneNode> {
    let json = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    load_scene_tree(&json)
}

fn parse_nodes(nodes: &[Json]) -> LoadResult<Vec<SceneNode>> {
    let mut parsed = Vec::with_capacity(nodes.len());
    for node in nodes {
        let Some(object) = node.as_object() else {
            log::warn!("scene tree entry is not an object, skipped");
            continue;
        };
        if let Some(node) = parse_node(object)? {
            parsed.push(node);
        }
    }
    Ok(parsed)
}

fn parse_node(node: &Map<String, Json>) -> LoadResult<Option<SceneNode>> {
    let mesh = node
        .get("mesh")
        .and_then(Json::as_str)
        .filter(|m| !m.is_empty());
    let Some(mesh) = mesh else {
        log::debug!("scene node without mesh dropped with its subtree");
        return Ok(None);
    };

    let f = |field: &'static str, default: f32| convert::scalar(node.get(field), field, mesh, default);
    let transform = Transform {
        position: Vec3::new(f("tx", 0.0)?, f("ty", 0.0)?, f("tz", 0.0)?),
        rotation: Quat::from_xyzw(f("rx", 0.0)?, f("ry", 0.0)?, f("rz", 0.0)?, f("rw", 1.0)?),
        scale: Vec3::new(f("sx", 1.0)?, f("sy", 1.0)?, f("sz", 1.0)?),
    };

    let mut scene_node = SceneNode::mesh(mesh, transform);
    if let Some(sheets) = node.get("attrs").and_then(Json::as_object) {
        for (sheet, attrs) in sheets {
            let Some(attrs) = attrs.as_object() else {
                log::warn!("{mesh}: attribute sheet \"{sheet}\" is not an object, skipped");
                continue;
            };
            scene_node.attributes.extend(
                attrs
                    .iter()
                    .map(|(name, value)| NodeAttribute::new(name.clone(), convert::text(value))),
            );
        }
    }
    if let Some(children) = node.get("children").and_then(Json::as_array) {
        scene_node.children = parse_nodes(children)?;
    }
    Ok(Some(scene_node))
}
