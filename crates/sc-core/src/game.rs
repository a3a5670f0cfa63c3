use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::id::{ItemId, ModuleId, TemplateId};
use crate::transform::Transform;
use crate::value::Value;

/// The type of a template property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    /// Free text.
    String,
    /// Whole number.
    Int,
    /// Floating-point number.
    Float,
    /// True / false switch.
    Bool,
    /// One of a fixed set of named options.
    Enum,
    /// Reference to another item in the game.
    #[serde(rename = "gameitem")]
    GameItem,
    /// Reference to an imported asset.
    Asset,
    /// Reference to a prefab.
    Prefab,
    /// Structured nested data.
    Object,
}

impl PropertyKind {
    /// Parse a schema token. Unknown tokens are a hard error: a corrupted type
    /// schema must never be silently tolerated.
    pub fn parse(token: &str) -> CoreResult<Self> {
        match token {
            "string" => Ok(Self::String),
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "bool" => Ok(Self::Bool),
            "enum" => Ok(Self::Enum),
            "gameitem" => Ok(Self::GameItem),
            "asset" => Ok(Self::Asset),
            "prefab" => Ok(Self::Prefab),
            "object" => Ok(Self::Object),
            other => Err(CoreError::UnknownPropertyType(other.to_string())),
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Enum => "enum",
            Self::GameItem => "gameitem",
            Self::Asset => "asset",
            Self::Prefab => "prefab",
            Self::Object => "object",
        };
        f.write_str(token)
    }
}

/// One entry of a template's property schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Property name as seen by item values.
    pub name: String,
    /// Declared type.
    pub kind: PropertyKind,
    /// Type-specific encoded default or configuration.
    pub raw_data: Option<String>,
}

/// A reusable item definition that instances are stamped from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemTemplate {
    /// Template identifier, unique within its module.
    pub id: TemplateId,
    /// Display name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// 2D icon reference.
    pub icon: Option<String>,
    /// 3D preview model reference.
    pub icon3d: Option<String>,
    /// Prefab or mesh the template instantiates by default.
    pub asset_ref: Option<String>,
    /// At most one live instance is expected.
    pub unique: bool,
    /// Editors must not let users drag this template into the scene.
    pub not_draggable: bool,
    /// Authored by the user rather than shipped with the module.
    pub is_user_template: bool,
    /// Property schema.
    pub properties: Vec<PropertyDef>,
    /// Default property values.
    pub default_values: HashMap<String, Value>,
}

impl ItemTemplate {
    /// Create a template with only an id and a name.
    pub fn new(id: impl Into<TemplateId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder-style setter for the default asset reference.
    pub fn with_asset(mut self, asset_ref: impl Into<String>) -> Self {
        self.asset_ref = Some(asset_ref.into());
        self
    }

    /// Look up a default value by key.
    pub fn default_value(&self, key: &str) -> Option<&Value> {
        self.default_values.get(key)
    }
}

/// A named bucket of templates, used for editor categorization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemGroup {
    /// Group name.
    pub name: String,
    /// Group icon reference.
    pub icon: Option<String>,
    /// Templates in declaration order.
    pub items: Vec<ItemTemplate>,
}

/// A pluggable unit owning a set of templates and naming the controller that
/// creates, updates, and removes its items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// Module identifier, unique within a game.
    pub id: ModuleId,
    /// Display name; game modules also use it as their alias.
    pub name: String,
    /// Free-form module type tag.
    pub kind: Option<String>,
    /// Name of the controller implementation to bind.
    pub controller: Option<String>,
    /// Shipped template groups.
    pub item_groups: Vec<ItemGroup>,
    /// Templates authored by the user that reference this module.
    pub user_templates: Vec<ItemTemplate>,
    /// Host packages this module requires.
    pub packages: Vec<String>,
}

impl ModuleDefinition {
    /// Create an empty module definition.
    pub fn new(id: impl Into<ModuleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: None,
            controller: None,
            item_groups: Vec::new(),
            user_templates: Vec::new(),
            packages: Vec::new(),
        }
    }

    /// Find a template by id.
    ///
    /// Groups are scanned in declaration order before user templates; the
    /// first match wins, so duplicates resolve deterministically.
    pub fn template(&self, id: &TemplateId) -> Option<&ItemTemplate> {
        self.item_groups
            .iter()
            .flat_map(|group| group.items.iter())
            .find(|template| &template.id == id)
            .or_else(|| self.user_templates.iter().find(|t| &t.id == id))
    }

    /// All templates, groups first, then user templates.
    pub fn templates(&self) -> impl Iterator<Item = &ItemTemplate> {
        self.item_groups
            .iter()
            .flat_map(|group| group.items.iter())
            .chain(self.user_templates.iter())
    }

    /// Number of templates across groups and user templates.
    pub fn template_count(&self) -> usize {
        self.templates().count()
    }
}

/// A placed, identified occurrence of a template within a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInstance {
    /// Stable identity used to match materialized objects across runs.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Owning module.
    pub module_ref: ModuleId,
    /// Template the item was stamped from.
    pub template_ref: TemplateId,
    /// Per-instance property values.
    pub values: HashMap<String, Value>,
    /// Placement in the scene.
    pub transform: Transform,
    /// Key into the build document, for items configured per player or NPC.
    pub build_id: Option<String>,
}

impl ItemInstance {
    /// Create an item at the identity transform with no values.
    pub fn new(
        id: impl Into<ItemId>,
        module_ref: impl Into<ModuleId>,
        template_ref: impl Into<TemplateId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            module_ref: module_ref.into(),
            template_ref: template_ref.into(),
            values: HashMap::new(),
            transform: Transform::IDENTITY,
            build_id: None,
        }
    }

    /// Look up a value by key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Look up a value that the caller requires to be present.
    pub fn require_value(&self, key: &str) -> CoreResult<&Value> {
        self.value(key)
            .ok_or_else(|| CoreError::MissingValue(key.to_string()))
    }
}

/// Root aggregate of one load pass. Immutable once loading finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameDefinition {
    /// Game name.
    pub name: String,
    /// Main module, when the document names one.
    pub main_module_id: Option<ModuleId>,
    /// Module catalog in discovery order.
    pub modules: Vec<ModuleDefinition>,
    /// Item instances in document order.
    pub items: Vec<ItemInstance>,
}

impl GameDefinition {
    /// Create an empty game.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Find a module definition by id (first match).
    pub fn module(&self, id: &ModuleId) -> Option<&ModuleDefinition> {
        self.modules.iter().find(|m| &m.id == id)
    }

    /// Resolve the template an item was stamped from.
    ///
    /// Returns `None` when either the module or the template is unknown; a
    /// missing module is logged since it usually means a stale document.
    pub fn template_for(&self, item: &ItemInstance) -> Option<&ItemTemplate> {
        match self.module(&item.module_ref) {
            Some(module) => module.template(&item.template_ref),
            None => {
                log::warn!(
                    "item {} references unknown module {}",
                    item.id,
                    item.module_ref
                );
                None
            }
        }
    }

    /// Find an item by id.
    pub fn item(&self, id: &ItemId) -> Option<&ItemInstance> {
        self.items.iter().find(|i| &i.id == id)
    }
}
