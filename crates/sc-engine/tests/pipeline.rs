//! Integration tests for the sc-engine pipeline.
use glam::Vec3;
use sc_engine::reconcile::USER_ASSET_FILE;
use sc_engine::{
    AssetLibrary, ControllerRegistry, GameModule, IdentityIndex, MemoryAsset, MemoryScene, MeshData,
    Orchestrator, PassConfig, SceneHost, SceneOpKind, USER_ASSET_MODULE,
};
use sc_loader::{LoadConfig, ModuleCatalog, load_game, load_scene_tree, parse_module};

const PROPS: &str = r#"{
    "id": "M1",
    "name": "Props",
    "controller": "BaseBGModel",
    "itemGroups": [
        { "name": "Furniture", "items": [ { "id": "T1", "name": "Box", "prefab": "Props/Box.prefab" } ] }
    ]
}"#;

const GAME_MODULE: &str = r#"{ "id": "G1", "name": "Escape", "controller": "BaseGameModule" }"#;

const ROOM: &str = r#"{
    "root": [
        {
            "mesh": "room.fbx",
            "children": [
                { "mesh": "Light01.fbx", "attrs": { "sheet": { "translucent": "true" } } }
            ]
        }
    ]
}"#;

fn catalog() -> ModuleCatalog {
    ModuleCatalog::from_definitions([
        parse_module(PROPS).unwrap(),
        parse_module(GAME_MODULE).unwrap(),
    ])
}

fn game_json(items: &str) -> String {
    format!(r#"{{ "name": "Demo", "modules": ["G1", "M1"], "items": [{items}] }}"#)
}

fn scene() -> MemoryScene {
    MemoryScene::with_assets(vec![
        MemoryAsset::prefab("Box"),
        MemoryAsset::prefab(format!("U7/{USER_ASSET_FILE}")),
        MemoryAsset::mesh("room.fbx").with_submesh(
            "Light01",
            MeshData::new(
                vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0), Vec3::Y],
                vec![0, 1, 2, 2, 3, 0],
            ),
        ),
    ])
}

fn orchestrator(json: &str) -> Orchestrator {
    let loaded = load_game(json, &catalog(), &LoadConfig::default()).unwrap();
    let modules = ControllerRegistry::with_builtins().bind(loaded.game.modules.clone());
    Orchestrator::new(
        loaded.game,
        modules,
        PassConfig::default().with_install_packages(false),
    )
}

#[test]
fn loaded_item_is_built_at_its_position() {
    let json = game_json(
        r#"{ "id": "i1", "moduleId": "M1", "templateId": "T1", "position": [1, 2, 3] }"#,
    );
    let mut orchestrator = orchestrator(&json);
    let mut scene = scene();
    let library = AssetLibrary::from_host(&scene);
    let tree = load_scene_tree(ROOM).unwrap();
    let mut index = IdentityIndex::new();

    let report = orchestrator.run_build(&mut scene, Some(&tree), &library, &mut index);

    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.reconcile.added, 1);
    let handle = index.handle(&"i1".into()).unwrap();
    assert_eq!(scene.name(handle).as_deref(), Some("i1"));
    assert_eq!(scene.transform(handle).unwrap().position, Vec3::new(1.0, 2.0, 3.0));

    let tree_report = report.tree.unwrap();
    assert_eq!(tree_report.lights, 1);
    assert_eq!(tree_report.removed_submeshes, 1);
    let room = scene.find_by_name("room").unwrap();
    assert!(scene.submesh(scene.asset_of(room).unwrap(), "Light01").is_none());

    assert!(orchestrator.module::<GameModule>().is_some());
    assert_eq!(report.build_scenes, vec!["MainScene"]);
}

#[test]
fn rerun_with_edited_document_adds_updates_and_removes() {
    let first = game_json(
        r#"{ "id": "i1", "moduleId": "M1", "templateId": "T1" },
           { "id": "i2", "moduleId": "M1", "templateId": "T1" }"#,
    );
    let mut scene = scene();
    let mut index = IdentityIndex::new();
    orchestrator(&first).run_update(&mut scene, &mut index);
    assert_eq!(index.len(), 2);

    let second = game_json(&format!(
        r#"{{ "id": "i2", "moduleId": "M1", "templateId": "T1", "position": [0, 4, 0] }},
           {{ "id": "u1", "moduleId": "{USER_ASSET_MODULE}", "templateId": "U7" }}"#
    ));
    let report = orchestrator(&second).run_update(&mut scene, &mut index);

    let kinds: Vec<(&str, &SceneOpKind)> = report
        .ops
        .iter()
        .map(|op| (op.item.as_str(), &op.kind))
        .collect();
    assert_eq!(kinds.len(), 3);
    assert_eq!(kinds[0].0, "i1");
    assert!(matches!(kinds[0].1, SceneOpKind::Removed { .. }));
    assert_eq!(kinds[1].0, "u1");
    assert!(matches!(kinds[1].1, SceneOpKind::Created { .. }));
    assert_eq!(kinds[2].0, "i2");

    assert!(index.handle(&"i1".into()).is_none());
    let i2 = index.handle(&"i2".into()).unwrap();
    assert_eq!(scene.transform(i2).unwrap().position, Vec3::new(0.0, 4.0, 0.0));
    assert_eq!(scene.roots().len(), 2);
}
