//! Module definition documents and on-disk module discovery.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sc_core::{ItemGroup, ItemTemplate, ModuleDefinition, ModuleId, PropertyDef, PropertyKind};
use serde::Deserialize;
use serde_json::Value as Json;
use walkdir::WalkDir;

use crate::config::LoadConfig;
use crate::convert;
use crate::error::{LoadError, LoadResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawModule {
    id: Option<Json>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    controller: Option<String>,
    #[serde(default)]
    packages: Vec<Json>,
    #[serde(default)]
    item_groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    items: Vec<Json>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawTemplate {
    id: Option<Json>,
    name: Option<String>,
    description: Option<String>,
    image: Option<String>,
    model: Option<String>,
    prefab: Option<String>,
    unique: bool,
    not_draggable: bool,
    template: bool,
    properties: Vec<RawProperty>,
    values: Option<Json>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawProperty {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    data: Option<Json>,
}

/// Parse a module definition document.
pub fn parse_module(json: &str) -> LoadResult<ModuleDefinition> {
    let raw: RawModule = serde_json::from_str(json).map_err(|e| LoadError::json("module", e))?;
    module_from_raw(raw)
}

fn module_from_raw(raw: RawModule) -> LoadResult<ModuleDefinition> {
    let id = convert::token(raw.id.as_ref()).ok_or_else(|| LoadError::MissingField {
        field: "id",
        context: format!("module \"{}\"", raw.name.as_deref().unwrap_or_default()),
    })?;

    let mut module = ModuleDefinition::new(id, raw.name.unwrap_or_default());
    module.kind = raw.kind;
    module.controller = raw.controller.filter(|c| !c.trim().is_empty());
    module.packages = raw
        .packages
        .iter()
        .filter_map(|p| convert::token(Some(p)))
        .collect();

    for group in raw.item_groups {
        let mut items = Vec::with_capacity(group.items.len());
        for item in &group.items {
            items.push(parse_template(item)?);
        }
        module.item_groups.push(ItemGroup {
            name: group.name.unwrap_or_default(),
            icon: group.icon,
            items,
        });
    }
    Ok(module)
}

/// Parse one item template from its JSON object.
///
/// An unknown property type is fatal; every other field is optional except
/// `id`.
pub fn parse_template(json: &Json) -> LoadResult<ItemTemplate> {
    let raw = RawTemplate::deserialize(json).map_err(|e| LoadError::json("template", e))?;
    let id = convert::token(raw.id.as_ref()).ok_or_else(|| LoadError::MissingField {
        field: "id",
        context: format!("template \"{}\"", raw.name.as_deref().unwrap_or_default()),
    })?;

    let mut properties = Vec::with_capacity(raw.properties.len());
    for prop in raw.properties {
        let token = prop.kind.unwrap_or_default();
        let kind = PropertyKind::parse(&token).map_err(|_| LoadError::UnknownPropertyType {
            template: id.clone(),
            token: token.clone(),
        })?;
        properties.push(PropertyDef {
            name: prop.name.unwrap_or_default(),
            kind,
            raw_data: prop.data.as_ref().map(convert::text),
        });
    }

    let owner = format!("template {id}");
    Ok(ItemTemplate {
        default_values: convert::optional_values(raw.values.as_ref(), &owner),
        id: id.into(),
        name: raw.name.unwrap_or_default(),
        description: raw.description.unwrap_or_default(),
        icon: raw.image,
        icon3d: raw.model,
        asset_ref: raw.prefab.filter(|p| !p.is_empty()),
        unique: raw.unique,
        not_draggable: raw.not_draggable,
        is_user_template: raw.template,
        properties,
    })
}

/// Module definitions found on disk, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    entries: Vec<CatalogEntry>,
}

/// One discovered module and the file it came from.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Parsed definition.
    pub definition: ModuleDefinition,
    /// Source file, when discovered from disk.
    pub path: Option<PathBuf>,
}

impl ModuleCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from in-memory definitions.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ModuleDefinition>) -> Self {
        let mut catalog = Self::new();
        for definition in definitions {
            catalog.push(definition, None);
        }
        catalog
    }

    /// Append a definition.
    pub fn push(&mut self, definition: ModuleDefinition, path: Option<PathBuf>) {
        self.entries.push(CatalogEntry { definition, path });
    }

    /// All entries in discovery order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of discovered modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was discovered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a definition by id.
    pub fn get(&self, id: &ModuleId) -> Option<&ModuleDefinition> {
        self.entries
            .iter()
            .map(|e| &e.definition)
            .find(|d| &d.id == id)
    }

    /// Clone out the definitions whose id is in `used`, keeping discovery
    /// order. A module discovered twice is retained once (first wins).
    pub fn retain_used(&self, used: &[ModuleId]) -> Vec<ModuleDefinition> {
        let wanted: HashSet<&ModuleId> = used.iter().collect();
        let mut seen = HashSet::new();
        let mut retained = Vec::new();
        for entry in &self.entries {
            let id = &entry.definition.id;
            if !wanted.contains(id) {
                continue;
            }
            if !seen.insert(id.clone()) {
                log::warn!("module {id} discovered more than once, keeping the first definition");
                continue;
            }
            retained.push(entry.definition.clone());
        }
        retained
    }
}

/// Walk `root` for module definition files and parse each one.
///
/// The module file sitting directly in `root` describes the project itself
/// and is skipped. Files that fail to read or parse are logged and skipped.
pub fn discover_modules(root: &Path, config: &LoadConfig) -> LoadResult<ModuleCatalog> {
    std::fs::read_dir(root).map_err(|e| LoadError::io(root, e))?;

    let mut catalog = ModuleCatalog::new();
    let walker = WalkDir::new(root)
        .min_depth(2)
        .sort_by_file_name()
        .into_iter();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("skipping unreadable entry under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != config.module_file_name.as_str() {
            continue;
        }

        let path = entry.path();
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| LoadError::io(path, e))
            .and_then(|json| parse_module(&json));
        match parsed {
            Ok(definition) => {
                log::debug!("discovered module {} at {}", definition.id, path.display());
                catalog.push(definition, Some(path.to_path_buf()));
            }
            Err(e) => log::error!("failed to load module {}: {e}", path.display()),
        }
    }

    log::info!(
        "discovered {} module(s) under {}",
        catalog.len(),
        root.display()
    );
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PROPS_MODULE: &str = r#"{
        "id": "M1",
        "name": "Props",
        "type": "content",
        "controller": "BaseBGModel",
        "packages": ["com.example.props"],
        "itemGroups": [
            {
                "name": "Boxes",
                "icon": "box.png",
                "items": [
                    {
                        "id": "T1",
                        "name": "Box",
                        "image": "box.png",
                        "model": "box.glb",
                        "prefab": "Box",
                        "unique": true,
                        "properties": [
                            { "name": "Color", "type": "enum", "data": "red|green" },
                            { "name": "Target", "type": "gameitem" }
                        ],
                        "values": { "Color": "red", "Weight": 2 }
                    }
                ]
            }
        ]
    }"#;

    fn write_module(dir: &Path, json: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(MODULE_FILE), json).unwrap();
    }

    const MODULE_FILE: &str = crate::config::MODULE_FILE_NAME;

    #[test]
    fn parse_module_reads_groups_and_templates() {
        let module = parse_module(PROPS_MODULE).unwrap();
        assert_eq!(module.id, ModuleId::from("M1"));
        assert_eq!(module.kind.as_deref(), Some("content"));
        assert_eq!(module.controller.as_deref(), Some("BaseBGModel"));
        assert_eq!(module.packages, vec!["com.example.props".to_string()]);

        let template = module.template(&"T1".into()).unwrap();
        assert_eq!(template.asset_ref.as_deref(), Some("Box"));
        assert_eq!(template.icon3d.as_deref(), Some("box.glb"));
        assert!(template.unique);
        assert_eq!(template.properties.len(), 2);
        assert_eq!(template.properties[0].raw_data.as_deref(), Some("red|green"));
        assert_eq!(template.properties[1].kind, PropertyKind::GameItem);
        assert_eq!(template.default_value("Weight"), Some(&sc_core::Value::Int(2)));
    }

    #[test]
    fn unknown_property_type_is_fatal() {
        let json = r#"{ "id": "M1", "itemGroups": [ { "name": "g", "items": [
            { "id": "T1", "properties": [ { "name": "p", "type": "vector3" } ] }
        ] } ] }"#;
        let err = parse_module(json).unwrap_err();
        assert!(matches!(
            err,
            LoadError::UnknownPropertyType { ref template, ref token } if template == "T1" && token == "vector3"
        ));
    }

    #[test]
    fn numeric_module_id_is_accepted() {
        let module = parse_module(r#"{ "id": 7, "name": "Legacy" }"#).unwrap();
        assert_eq!(module.id.as_str(), "7");
        assert!(module.item_groups.is_empty());
    }

    #[test]
    fn missing_module_id_is_reported() {
        let err = parse_module(r#"{ "name": "Nameless" }"#).unwrap_err();
        assert!(matches!(err, LoadError::MissingField { field: "id", .. }));
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(parse_module("{ nope"), Err(LoadError::Json { .. })));
    }

    #[test]
    fn discovery_skips_root_file_and_bad_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write_module(root, r#"{ "id": "project" }"#);
        write_module(&root.join("b_props"), PROPS_MODULE);
        write_module(&root.join("a_core"), r#"{ "id": "core", "name": "Core" }"#);
        write_module(&root.join("c_broken"), "{ not json");
        fs::write(root.join("a_core").join("notes.txt"), "ignored").unwrap();

        let catalog = discover_modules(root, &LoadConfig::default()).unwrap();
        let ids: Vec<_> = catalog
            .entries()
            .iter()
            .map(|e| e.definition.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["core", "M1"]);
        assert!(catalog.get(&"project".into()).is_none());
        assert!(catalog.entries()[0].path.is_some());
    }

    #[test]
    fn discovery_of_missing_root_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_modules(&missing, &LoadConfig::default()),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn retain_used_keeps_discovery_order_and_dedups() {
        let catalog = ModuleCatalog::from_definitions([
            ModuleDefinition::new("A", "first"),
            ModuleDefinition::new("B", "b"),
            ModuleDefinition::new("A", "second"),
            ModuleDefinition::new("C", "c"),
        ]);
        let kept = catalog.retain_used(&["C".into(), "A".into()]);
        let names: Vec<_> = kept.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["first", "c"]);
    }
}
