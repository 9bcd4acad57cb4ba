//! End-to-end repair scenarios across janitor-fs, janitor-content and
//! janitor-core.

use std::time::{Duration, Instant};

use janitor_core::config::WatchConfig;
use janitor_core::{
    AutoRepairPolicy, DirectoryHost, Host, PipelineOptions, QuiescenceWatcher, RepairConfig,
    RepairPipeline, RepairSession, SlotState, WatcherState,
};
use janitor_fs::NormalizedPath;
use janitor_test_utils::TestTree;
use janitor_test_utils::fixtures::{self, extracted_project};
use pretty_assertions::assert_eq;

const FULL_CONFIG: &str = r#"prune = ["Assets/TutorialInfo", "LibraryX"]

[watch]
source = "AssetRipperOutput"
stable_after_ms = 1000

[[relocate]]
target_dir = "Assets/Plugins/DOTween"
names = ["DOTween.dll", "DOTweenEditor.dll"]

[[relocate]]
search_root = "AssetRipperOutput"
target_dir = "Assets/Meshes"
extensions = ["fbx", "obj"]

[[patch]]
dir = "Assets/Plugins"
pattern = "*.dll.meta"
replacements = [
    { from = "isPredefined: 0", to = "isPredefined: 1" },
    { from = "validateReferences: 1", to = "validateReferences: 0" },
]

[manifest]
denylist = ["com.unity.render-pipelines.universal", "LibraryX"]
ensure = [{ line = "\"com.unity.ugui\": \"1.0.0\",", after = "\"dependencies\"" }]

[descriptors]
dir = "Assets/Photon"
entries = [
    { name = "PhotonRealtime", references = [] },
    { name = "PhotonUnityNetworking", references = ["PhotonRealtime"] },
]

[assets.kinds]
mesh = ["fbx", "obj"]
material = ["mat"]

[objects]
dir = "Assets/Objects"
"#;

const URP_MANIFEST: &str = r#"{
  "dependencies": {
    "com.unity.textmeshpro": "3.0.6",
    "com.unity.render-pipelines.universal": "12.1.7"
  }
}
"#;

fn ripped_project() -> TestTree {
    let tree = TestTree::new();
    tree.file("janitor.toml", FULL_CONFIG)
        .file("Assets/TutorialInfo/Readme.asset", "tutorial")
        .file("AssetRipperOutput/Plugins/DOTween.dll", "dotween")
        .file("AssetRipperOutput/Plugins/DOTween.dll.meta", "PluginImporter:\n  isPredefined: 0\n")
        .file("AssetRipperOutput/Editor/DOTweenEditor.dll", "editor")
        .file("AssetRipperOutput/Meshes/Crate.fbx", "crate mesh")
        .file("AssetRipperOutput/Meshes/Barrel.obj", "barrel mesh")
        .file("Assets/Materials/Crate.mat", "crate material")
        .file("Packages/manifest.json", URP_MANIFEST)
        .file(
            "Assets/Objects/Crate.json",
            r#"{"name":"Crate","slots":[{"kind":"mesh","ref":null},{"kind":"material","ref":"Assets/Materials/Lost.mat"}]}"#,
        )
        .file(
            "Assets/Objects/Barrel.json",
            r#"{"name":"Barrel","slots":[{"kind":"material","ref":null}]}"#,
        )
        .dir("Assets/Photon/PhotonRealtime")
        .dir("Assets/Photon/PhotonUnityNetworking");
    tree
}

fn setup(tree: &TestTree) -> (RepairConfig, RepairPipeline, DirectoryHost) {
    let root = NormalizedPath::new(tree.root());
    let config = RepairConfig::discover(&root).unwrap();
    let host = DirectoryHost::new(root.clone(), &config).unwrap();
    let pipeline = RepairPipeline::from_config(root, &config);
    (config, pipeline, host)
}

#[test]
fn test_extracted_project_converges_in_one_pass() {
    let tree = extracted_project();
    let (_, pipeline, host) = setup(&tree);

    let first = pipeline.apply(&host, PipelineOptions::default());
    assert!(first.changed());
    tree.assert_missing("LibraryX");
    tree.assert_exists("Plugins/LibraryX/Foo.dll");
    tree.assert_exists("Plugins/LibraryX/Foo.dll.meta");
    assert!(!tree.read("Packages/manifest.json").contains("LibraryX"));

    let snapshot = tree.snapshot();
    let second = pipeline.apply(&host, PipelineOptions::default());
    assert!(!second.changed());
    assert_eq!(tree.snapshot(), snapshot);
}

#[test]
fn test_full_project_repair() {
    let tree = ripped_project();
    let (_, pipeline, host) = setup(&tree);

    let report = pipeline.apply(&host, PipelineOptions::default());
    assert!(report.errors.is_empty(), "errors: {:?}", report.errors);

    tree.assert_missing("Assets/TutorialInfo");
    assert_eq!(tree.read("Assets/Plugins/DOTween/DOTween.dll"), "dotween");
    assert_eq!(
        tree.read("Assets/Plugins/DOTween/DOTween.dll.meta"),
        "PluginImporter:\n  isPredefined: 1\n"
    );
    tree.assert_exists("Assets/Plugins/DOTween/DOTweenEditor.dll");
    tree.assert_exists("Assets/Meshes/Crate.fbx");
    tree.assert_exists("Assets/Meshes/Barrel.obj");

    let manifest: serde_json::Value =
        serde_json::from_str(&tree.read("Packages/manifest.json")).unwrap();
    let deps = manifest["dependencies"].as_object().unwrap();
    let keys: Vec<&String> = deps.keys().collect();
    assert_eq!(keys, vec!["com.unity.ugui", "com.unity.textmeshpro"]);

    let descriptor: serde_json::Value = serde_json::from_str(
        &tree.read("Assets/Photon/PhotonUnityNetworking/PhotonUnityNetworking.asmdef"),
    )
    .unwrap();
    assert_eq!(descriptor["references"][0], "PhotonRealtime");

    let crate_object = host
        .load_object(&NormalizedPath::new("Assets/Objects/Crate.json"))
        .unwrap();
    let states: Vec<&SlotState> = crate_object.slots.iter().map(|s| &s.state).collect();
    assert!(matches!(states[0], SlotState::Linked(_)));
    assert_eq!(
        *states[1],
        SlotState::Linked(NormalizedPath::new("Assets/Materials/Crate.mat"))
    );

    let barrel = host
        .load_object(&NormalizedPath::new("Assets/Objects/Barrel.json"))
        .unwrap();
    assert_eq!(barrel.slots[0].state, SlotState::Empty);
}

#[test]
fn test_full_project_is_idempotent_over_repeated_runs() {
    let tree = ripped_project();
    let (_, pipeline, host) = setup(&tree);

    pipeline.apply(&host, PipelineOptions::default());
    let after_first = tree.snapshot();

    for _ in 0..3 {
        let report = pipeline.apply(&host, PipelineOptions::default());
        assert_eq!(report.summary.total(), 0, "{:?}", report.steps);
        assert_eq!(tree.snapshot(), after_first);
    }
    assert_eq!(host.reconcile_requests(), 1);
}

#[test]
fn test_duplicate_meshes_are_reported_as_ambiguous() {
    let tree = ripped_project();
    tree.file("AssetRipperOutput/Meshes/Old/Crate.fbx", "older crate mesh");
    let (_, pipeline, host) = setup(&tree);

    let report = pipeline.apply(&host, PipelineOptions::default());

    let relink = report.steps.iter().find(|s| s.step == "relink").unwrap();
    assert!(
        relink.warnings.iter().any(|w| w.contains("mesh 'Crate'")),
        "warnings: {:?}",
        relink.warnings
    );
    let relocate = report.steps.iter().find(|s| s.step == "relocate").unwrap();
    assert!(relocate.warnings.iter().any(|w| w.contains("Crate.fbx")));
    assert_eq!(tree.read("Assets/Meshes/Crate.fbx"), "crate mesh");
}

#[test]
fn test_incremental_extraction_repairs_after_it_settles() {
    let tree = TestTree::new();
    tree.file("janitor.toml", FULL_CONFIG);
    let root = NormalizedPath::new(tree.root());
    let config = RepairConfig::discover(&root).unwrap();
    let host = DirectoryHost::new(root.clone(), &config).unwrap();
    let watch = WatchConfig {
        stable_after_ms: 1000,
        ..config.watch.clone()
    };
    let mut session = RepairSession::new(RepairPipeline::from_config(root.clone(), &config), host)
        .with_watcher(QuiescenceWatcher::from_config(&root, &watch))
        .with_policy(AutoRepairPolicy::Off);

    let start = Instant::now();
    let at = |ms: u64| start + Duration::from_millis(ms);

    // Extraction has not started
    assert!(session.tick(at(0)).is_none());
    assert!(session.tick(at(2000)).is_none());

    // Files arrive in bursts
    tree.file("AssetRipperOutput/Plugins/DOTween.dll", "dotween");
    assert!(session.tick(at(2500)).is_none());
    tree.file("AssetRipperOutput/Meshes/Crate.fbx", "crate");
    assert!(session.tick(at(3000)).is_none());
    assert!(session.tick(at(3500)).is_none());
    tree.assert_missing("Assets/Plugins/DOTween/DOTween.dll");

    let report = session.tick(at(4000)).expect("stable after 1s");
    assert!(report.changed());
    tree.assert_exists("Assets/Plugins/DOTween/DOTween.dll");
    tree.assert_exists("Assets/Meshes/Crate.fbx");

    assert_eq!(
        session.watcher().map(|w| w.state()),
        Some(WatcherState::Stable)
    );
    assert!(session.tick(at(9000)).is_none());
}

#[test]
fn test_manifest_last_entry_removal_keeps_valid_json() {
    let tree = TestTree::new();
    tree.file("janitor.toml", "[manifest]\ndenylist = [\"universal\"]\n")
        .file("Packages/manifest.json", URP_MANIFEST);
    let (_, pipeline, host) = setup(&tree);

    let report = pipeline.apply(&host, PipelineOptions::default());

    let manifest = tree.read("Packages/manifest.json");
    assert!(serde_json::from_str::<serde_json::Value>(&manifest).is_ok());
    assert_eq!(
        manifest,
        "{\n  \"dependencies\": {\n    \"com.unity.textmeshpro\": \"3.0.6\"\n  }\n}\n"
    );
    let step = report.steps.iter().find(|s| s.step == "manifest").unwrap();
    assert!(step.warnings.is_empty());
}

#[test]
fn test_fixture_config_matches_fixture_tree() {
    let config = RepairConfig::parse(fixtures::CONFIG).unwrap();
    assert_eq!(config.prune, vec!["LibraryX".to_string()]);
    assert_eq!(config.relocate[0].target_dir, "Plugins/LibraryX");
}
