//! Desired-versus-materialized reconciliation of game items.
//!
//! [`plan`] splits the desired items and the previously materialized ones
//! into add, update, and remove sets. [`Reconciler::apply`] then runs the
//! plan against the host in the fixed order remove, add, update, dispatching
//! to the owning module where one exists and falling back to prefabs or
//! placeholders where none does.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use sc_core::{BuildDocument, ItemId, ItemInstance, ItemTemplate, TemplateId};
use serde_json::Value as Json;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::host::{AssetHandle, ObjectHandle, SceneHost};
use crate::module::{ModuleFailure, ModuleInstance, PassEnv, Stage};
use crate::oplog::{CreatePath, OpLog, SceneOp, SceneOpKind};

/// Sentinel module id for items instantiated straight from user assets.
pub const USER_ASSET_MODULE: &str = "MODULE_USER_ASSET";
/// File inside a user asset folder that holds the model.
pub const USER_ASSET_FILE: &str = "object.glb";

/// Which object materializes which item, and from which template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityIndex {
    items: BTreeMap<ItemId, ObjectHandle>,
    templates: BTreeMap<ObjectHandle, TemplateId>,
}

impl IdentityIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or replace) the object for an item.
    pub fn insert(&mut self, item: ItemId, handle: ObjectHandle, template: TemplateId) {
        if let Some(previous) = self.items.insert(item, handle).filter(|p| *p != handle) {
            self.templates.remove(&previous);
        }
        self.templates.insert(handle, template);
    }

    /// Forget an item, returning its object.
    pub fn remove(&mut self, item: &ItemId) -> Option<ObjectHandle> {
        let handle = self.items.remove(item)?;
        self.templates.remove(&handle);
        Some(handle)
    }

    /// Object materializing an item.
    pub fn handle(&self, item: &ItemId) -> Option<ObjectHandle> {
        self.items.get(item).copied()
    }

    /// Template an object was created from.
    pub fn template_of(&self, handle: ObjectHandle) -> Option<&TemplateId> {
        self.templates.get(&handle)
    }

    /// Item to object map, ordered by item id.
    pub fn existing(&self) -> &BTreeMap<ItemId, ObjectHandle> {
        &self.items
    }

    /// Drop entries whose object no longer exists in the host. Returns how
    /// many were dropped.
    pub fn prune(&mut self, host: &dyn SceneHost) -> usize {
        let stale: Vec<ItemId> = self
            .items
            .iter()
            .filter(|(_, handle)| !host.exists(**handle))
            .map(|(item, _)| item.clone())
            .collect();
        for item in &stale {
            log::warn!("item {item} lost its scene object, it will be recreated");
            self.remove(item);
        }
        stale.len()
    }

    /// Number of tracked items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The three-way split computed by [`plan`].
#[derive(Debug, Default)]
pub struct ReconcilePlan<'a> {
    /// Desired items with no object yet, in desired order.
    pub to_add: Vec<&'a ItemInstance>,
    /// Desired items that already have an object, in desired order.
    pub to_update: Vec<(&'a ItemInstance, ObjectHandle)>,
    /// Objects whose item is no longer desired, in existing-map order.
    pub to_remove: Vec<(ItemId, ObjectHandle)>,
}

impl ReconcilePlan<'_> {
    /// Return `true` if the plan does nothing.
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_update.is_empty() && self.to_remove.is_empty()
    }
}

/// Split `desired` against `existing`.
///
/// Duplicate desired ids keep their first occurrence; later ones are logged
/// and ignored.
pub fn plan<'a>(
    desired: &'a [ItemInstance],
    existing: &BTreeMap<ItemId, ObjectHandle>,
) -> ReconcilePlan<'a> {
    let mut seen: HashSet<&ItemId> = HashSet::with_capacity(desired.len());
    let mut plan = ReconcilePlan::default();

    for item in desired {
        if !seen.insert(&item.id) {
            log::warn!("duplicate item id {}, later occurrence ignored", item.id);
            continue;
        }
        match existing.get(&item.id) {
            Some(handle) => plan.to_update.push((item, *handle)),
            None => plan.to_add.push(item),
        }
    }

    plan.to_remove = existing
        .iter()
        .filter(|(item, _)| !seen.contains(item))
        .map(|(item, handle)| (item.clone(), *handle))
        .collect();
    plan
}

/// Counters and failures from applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Objects created, placeholders included.
    pub added: usize,
    /// Objects updated.
    pub updated: usize,
    /// Objects removed.
    pub removed: usize,
    /// Created objects that are placeholders.
    pub placeholders: usize,
    /// Items that produced no object.
    pub skipped: usize,
    /// Module hook errors.
    pub failures: Vec<ModuleFailure>,
}

/// Applies reconciliation plans to a host.
pub struct Reconciler<'a> {
    env: PassEnv<'a>,
    index: &'a mut IdentityIndex,
    log: &'a mut OpLog,
    builds: Option<&'a BuildDocument>,
    report: ReconcileReport,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler over a pass environment.
    pub fn new(env: PassEnv<'a>, index: &'a mut IdentityIndex, log: &'a mut OpLog) -> Self {
        Self {
            env,
            index,
            log,
            builds: None,
            report: ReconcileReport::default(),
        }
    }

    /// Hand each created item its entry from `builds`.
    pub fn with_builds(mut self, builds: &'a BuildDocument) -> Self {
        self.builds = Some(builds);
        self
    }

    fn build_entry(&self, item: &ItemInstance) -> Option<&'a Json> {
        let build_id = item.build_id.as_deref()?;
        let entry = self.builds.and_then(|builds| builds.entry(build_id));
        if entry.is_none() {
            log::debug!("item {}: no build entry for {build_id}", item.id);
        }
        entry
    }

    /// Apply `plan`: removals, then additions, then updates.
    pub fn apply(mut self, plan: ReconcilePlan<'_>, modules: &mut [ModuleInstance]) -> ReconcileReport {
        for (item, handle) in plan.to_remove {
            self.remove(&item, handle, modules);
        }
        for item in plan.to_add {
            self.add(item, modules);
        }
        for (item, handle) in plan.to_update {
            self.update(item, handle, modules);
        }
        log::info!(
            "reconciled: {} added ({} placeholders), {} updated, {} removed, {} skipped",
            self.report.added,
            self.report.placeholders,
            self.report.updated,
            self.report.removed,
            self.report.skipped
        );
        self.report
    }

    fn remove(&mut self, item: &ItemId, handle: ObjectHandle, modules: &mut [ModuleInstance]) {
        let owner = self
            .index
            .template_of(handle)
            .and_then(|template| modules.iter().position(|m| m.template_item(template).is_some()));

        let mut custom = false;
        match owner {
            Some(i) => match modules[i].remove_item(handle, &mut self.env) {
                Ok(()) => custom = true,
                Err(e) => self.fail(&modules[i], Stage::Remove, &e),
            },
            None => log::debug!("item {item}: no module owns its template, destroying only"),
        }

        if self.env.host.exists(handle) {
            if let Err(e) = self.env.host.destroy(handle) {
                log::warn!("item {item}: destroy failed: {e}");
            }
        }
        self.index.remove(item);
        self.report.removed += 1;
        self.record(item, Some(handle), SceneOpKind::Removed { custom });
    }

    fn add(&mut self, item: &ItemInstance, modules: &mut [ModuleInstance]) {
        let created = match modules.iter().position(|m| m.id() == &item.module_ref) {
            Some(i) => self.create_with_module(item, &mut modules[i]),
            None if item.module_ref.as_str() == USER_ASSET_MODULE => self.create_user_asset(item),
            None => {
                log::warn!("item {} references invalid module {}", item.id, item.module_ref);
                None
            }
        };

        let Some((handle, path)) = created else {
            self.report.skipped += 1;
            self.record(
                &item.id,
                None,
                SceneOpKind::Skipped {
                    reason: format!("nothing to create for template {}", item.template_ref),
                },
            );
            return;
        };

        if let Err(e) = self.env.host.set_name(handle, item.id.as_str()) {
            log::warn!("item {}: rename failed: {e}", item.id);
        }
        self.index
            .insert(item.id.clone(), handle, item.template_ref.clone());
        self.report.added += 1;
        if path == CreatePath::Placeholder {
            self.report.placeholders += 1;
        }
        self.record(&item.id, Some(handle), SceneOpKind::Created { path });
    }

    fn create_with_module(
        &mut self,
        item: &ItemInstance,
        module: &mut ModuleInstance,
    ) -> Option<(ObjectHandle, CreatePath)> {
        let Some(template) = module.template_item(&item.template_ref).cloned() else {
            log::warn!(
                "item {}: module {} has no template {}",
                item.id,
                item.module_ref,
                item.template_ref
            );
            return self.placeholder(item);
        };

        let build = self.build_entry(item);
        match module.create_item(item, &template, build, &mut self.env) {
            Ok(Some(handle)) => return Some((handle, CreatePath::Module)),
            Ok(None) => {}
            Err(e) => self.fail(module, Stage::Create, &e),
        }

        if let Some(handle) = self.instantiate_prefab(item, &template) {
            return Some((handle, CreatePath::Prefab));
        }
        log::warn!(
            "item {}: template {} has no usable prefab, placing a placeholder",
            item.id,
            template.id
        );
        self.placeholder(item)
    }

    fn instantiate_prefab(&mut self, item: &ItemInstance, template: &ItemTemplate) -> Option<ObjectHandle> {
        let asset_ref = template.asset_ref.as_deref()?;
        let stem = Path::new(asset_ref).file_stem()?.to_str()?;
        let asset = self.env.host.find_prefab(stem)?;
        self.spawn(item, asset)
    }

    fn create_user_asset(&mut self, item: &ItemInstance) -> Option<(ObjectHandle, CreatePath)> {
        let key = format!("{}/{USER_ASSET_FILE}", item.template_ref);
        let Some(asset) = self.env.host.resolve_asset(&key) else {
            log::warn!("item {}: user asset {key} is missing", item.id);
            return None;
        };
        self.spawn(item, asset).map(|h| (h, CreatePath::UserAsset))
    }

    fn spawn(&mut self, item: &ItemInstance, asset: AssetHandle) -> Option<ObjectHandle> {
        let result = self
            .env
            .host
            .instantiate(asset, None)
            .and_then(|handle| {
                self.env.host.set_transform(handle, &item.transform)?;
                Ok(handle)
            });
        match result {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::warn!("item {}: instantiate failed: {e}", item.id);
                None
            }
        }
    }

    fn placeholder(&mut self, item: &ItemInstance) -> Option<(ObjectHandle, CreatePath)> {
        let result = self
            .env
            .host
            .create_empty(item.id.as_str(), None)
            .and_then(|root| {
                self.env.host.create_empty(item.template_ref.as_str(), Some(root))?;
                self.env.host.set_transform(root, &item.transform)?;
                Ok(root)
            });
        match result {
            Ok(root) => Some((root, CreatePath::Placeholder)),
            Err(e) => {
                log::warn!("item {}: placeholder failed: {e}", item.id);
                None
            }
        }
    }

    fn update(&mut self, item: &ItemInstance, handle: ObjectHandle, modules: &mut [ModuleInstance]) {
        if !self.env.host.exists(handle) {
            log::warn!("item {}: object {handle} vanished before update", item.id);
            self.index.remove(&item.id);
            self.report.skipped += 1;
            self.record(
                &item.id,
                Some(handle),
                SceneOpKind::Skipped {
                    reason: "object vanished".into(),
                },
            );
            return;
        }

        let mut custom = false;
        if let Some(module) = modules.iter_mut().find(|m| m.id() == &item.module_ref) {
            match module.update_item(item, handle, &mut self.env) {
                Ok(handled) => custom = handled,
                Err(e) => self.fail(module, Stage::Update, &e),
            }
        }
        if let Err(e) = self.env.host.set_transform(handle, &item.transform) {
            log::warn!("item {}: transform update failed: {e}", item.id);
        }
        self.index
            .insert(item.id.clone(), handle, item.template_ref.clone());
        self.report.updated += 1;
        self.record(&item.id, Some(handle), SceneOpKind::Updated { custom });
    }

    fn fail(&mut self, module: &ModuleInstance, stage: Stage, error: &EngineError) {
        self.report
            .failures
            .push(ModuleFailure::new(module, stage, error));
    }

    fn record(&mut self, item: &ItemId, handle: Option<ObjectHandle>, kind: SceneOpKind) {
        self.log.push(SceneOp::new(item.clone(), handle, kind));
    }
}
