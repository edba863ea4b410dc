//! Build pipeline integration tests
//!
//! Drives whole tasks through [`BuildPipeline`] against real PNG files in a
//! temporary project, with recording and failing packers swapped in where a
//! test needs to observe or break the packing boundary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

use spritesheet::build::{BuildContext, BuildError, BuildPipeline};
use spritesheet::config::parse_config;
use spritesheet::pack::{
    DimensionProbe, PackError, PackOptions, PackedSheet, Packer, ProbeError, RawBox, ShelfPacker,
};

// ============================================================================
// Test Utilities
// ============================================================================

/// Write a solid-color PNG, creating parent directories.
fn write_png(root: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 255])).save(&path).unwrap();
    path
}

/// Build a context for the `web` task of the given config text.
fn context(root: &Path, toml: &str) -> BuildContext {
    let mut config = parse_config(toml).unwrap();
    let task = config.tasks.remove("web").unwrap();
    BuildContext::new("web", task, root.to_path_buf()).unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn names(records: &Value) -> Vec<String> {
    records.as_array().unwrap().iter().map(|r| r["name"].as_str().unwrap().to_string()).collect()
}

/// One packer invocation as seen by [`RecordingPacker`].
#[derive(Debug, Clone)]
struct PackCall {
    files: Vec<PathBuf>,
    options: PackOptions,
    coordinates: BTreeMap<String, RawBox>,
}

/// Shelf packer that remembers every call.
#[derive(Default)]
struct RecordingPacker {
    calls: Mutex<Vec<PackCall>>,
}

impl RecordingPacker {
    fn calls(&self) -> Vec<PackCall> {
        self.calls.lock().unwrap().clone()
    }

    fn call_with_marker(&self, double: bool) -> PackCall {
        self.calls()
            .into_iter()
            .find(|c| c.files.iter().all(|f| f.to_string_lossy().contains("@2x") == double))
            .unwrap()
    }
}

#[async_trait]
impl Packer for RecordingPacker {
    async fn pack(
        &self,
        files: &[PathBuf],
        options: &PackOptions,
    ) -> Result<PackedSheet, PackError> {
        let packed = ShelfPacker::new().pack(files, options).await?;
        self.calls.lock().unwrap().push(PackCall {
            files: files.to_vec(),
            options: options.clone(),
            coordinates: packed.coordinates.clone(),
        });
        Ok(packed)
    }
}

/// Fails any subset containing a `broken` file, once `wait_for` exists.
struct FailingPacker {
    wait_for: PathBuf,
}

#[async_trait]
impl Packer for FailingPacker {
    async fn pack(
        &self,
        files: &[PathBuf],
        options: &PackOptions,
    ) -> Result<PackedSheet, PackError> {
        if !files.iter().any(|f| f.to_string_lossy().contains("broken")) {
            return ShelfPacker::new().pack(files, options).await;
        }

        for _ in 0..500 {
            if self.wait_for.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Err(PackError::Failed("packer exploded".to_string()))
    }
}

struct FailingProbe;

#[async_trait]
impl DimensionProbe for FailingProbe {
    async fn dimensions(&self, _path: &Path) -> Result<(u32, u32), ProbeError> {
        Err(ProbeError::Task("probe unavailable".to_string()))
    }
}

const ICONS_JSON: &str = r#"
[tasks.web]
sheet = "css/sprites.json"
renderer = "json"
class_prefix = "icon"

[[tasks.web.sprites]]
image = "img/icons.png"
src = ["icons/*.png"]
"#;

fn icons_project() -> TempDir {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "icons/a.png", 10, 10);
    write_png(temp.path(), "icons/b.png", 12, 20);
    write_png(temp.path(), "icons/a@2x.png", 20, 20);
    write_png(temp.path(), "icons/b@2x.png", 24, 40);
    temp
}

// ============================================================================
// Manifest Contents
// ============================================================================

#[tokio::test]
async fn test_naming_and_halving() {
    let temp = icons_project();
    let packer = Arc::new(RecordingPacker::default());
    let pipeline = BuildPipeline::new(context(temp.path(), ICONS_JSON)).with_packer(packer.clone());

    let result = pipeline.run().await.unwrap();
    assert_eq!(result.standard_count, 2);
    assert_eq!(result.double_count, 2);
    assert_eq!(result.sheets.len(), 2);

    let manifest = read_json(&temp.path().join("css/sprites.json"));
    assert_eq!(names(&manifest["standard"]), vec!["icon-a", "icon-b"]);
    assert_eq!(names(&manifest["double"]), vec!["icon-a", "icon-b"]);

    // Standard records keep raw coordinates
    let standard = packer.call_with_marker(false);
    for (record, raw) in manifest["standard"].as_array().unwrap().iter().zip(standard.coordinates.values()) {
        assert_eq!(record["x"].as_f64().unwrap(), raw.x as f64);
        assert_eq!(record["y"].as_f64().unwrap(), raw.y as f64);
        assert_eq!(record["width"].as_f64().unwrap(), raw.width as f64);
        assert_eq!(record["height"].as_f64().unwrap(), raw.height as f64);
        assert_eq!(record["sheetReference"], "../img/icons.png");
        assert!(record.get("sheetWidth").is_none());
    }

    // Double records are exactly half the raw output
    let double = packer.call_with_marker(true);
    let (sheet_w, sheet_h) = image::image_dimensions(temp.path().join("img/icons@2x.png")).unwrap();
    for (record, raw) in manifest["double"].as_array().unwrap().iter().zip(double.coordinates.values()) {
        assert_eq!(record["x"].as_f64().unwrap(), raw.x as f64 / 2.0);
        assert_eq!(record["y"].as_f64().unwrap(), raw.y as f64 / 2.0);
        assert_eq!(record["width"].as_f64().unwrap(), raw.width as f64 / 2.0);
        assert_eq!(record["height"].as_f64().unwrap(), raw.height as f64 / 2.0);
        assert_eq!(record["sheetReference"], "../img/icons@2x.png");
        assert_eq!(record["sheetWidth"].as_f64().unwrap(), sheet_w as f64 / 2.0);
        assert_eq!(record["sheetHeight"].as_f64().unwrap(), sheet_h as f64 / 2.0);
    }
}

#[tokio::test]
async fn test_padding_doubled_for_double_subset() {
    let temp = icons_project();
    let toml = ICONS_JSON.replace("class_prefix = \"icon\"", "class_prefix = \"icon\"\n\n[tasks.web.packing]\npadding = 3");
    let packer = Arc::new(RecordingPacker::default());
    let pipeline = BuildPipeline::new(context(temp.path(), &toml)).with_packer(packer.clone());

    pipeline.run().await.unwrap();

    assert_eq!(packer.calls().len(), 2);
    assert_eq!(packer.call_with_marker(false).options.padding, Some(3));
    assert_eq!(packer.call_with_marker(true).options.padding, Some(6));
}

#[tokio::test]
async fn test_absent_padding_stays_absent() {
    let temp = icons_project();
    let packer = Arc::new(RecordingPacker::default());
    let pipeline = BuildPipeline::new(context(temp.path(), ICONS_JSON)).with_packer(packer.clone());

    pipeline.run().await.unwrap();

    assert!(packer.calls().iter().all(|c| c.options.padding.is_none()));
}

#[tokio::test]
async fn test_output_is_deterministic() {
    let temp = icons_project();
    let manifest_path = temp.path().join("css/sprites.json");

    BuildPipeline::new(context(temp.path(), ICONS_JSON)).run().await.unwrap();
    let first = fs::read(&manifest_path).unwrap();
    let first_sheet = fs::read(temp.path().join("img/icons@2x.png")).unwrap();

    BuildPipeline::new(context(temp.path(), ICONS_JSON)).run().await.unwrap();
    assert_eq!(fs::read(&manifest_path).unwrap(), first);
    assert_eq!(fs::read(temp.path().join("img/icons@2x.png")).unwrap(), first_sheet);
}

#[tokio::test]
async fn test_groups_concatenate_in_declaration_order() {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "zeta/z1.png", 8, 8);
    write_png(temp.path(), "zeta/z2.png", 8, 8);
    write_png(temp.path(), "alpha/a1.png", 8, 8);

    let toml = r#"
[tasks.web]
sheet = "out/sprites.json"
renderer = "json"

[[tasks.web.sprites]]
image = "out/zeta.png"
src = ["zeta/*.png"]

[[tasks.web.sprites]]
image = "out/alpha.png"
src = ["alpha/*.png"]
"#;
    BuildPipeline::new(context(temp.path(), toml)).run().await.unwrap();

    let manifest = read_json(&temp.path().join("out/sprites.json"));
    assert_eq!(names(&manifest["standard"]), vec!["zeta-z1", "zeta-z2", "alpha-a1"]);
    assert_eq!(manifest["standard"][0]["sheetReference"], "zeta.png");
    assert_eq!(manifest["standard"][2]["sheetReference"], "alpha.png");
    assert!(manifest["double"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_standard_only_group_skips_double_sheet() {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "icons/a.png", 8, 8);

    let toml = r#"
[tasks.web]
sheet = "css/sprites.css"
sprite_img_prefix = "/static/img/"

[[tasks.web.sprites]]
image = "img/icons.png"
src = ["icons/*.png"]
"#;
    let result = BuildPipeline::new(context(temp.path(), toml)).run().await.unwrap();

    assert_eq!(result.sheets, vec![temp.path().join("img/icons.png")]);
    assert!(!temp.path().join("img/icons@2x.png").exists());

    let css = fs::read_to_string(temp.path().join("css/sprites.css")).unwrap();
    assert!(css.contains(".icons-a {"));
    assert!(css.contains("url(/static/img/icons.png)"));
    assert!(!css.contains("@media"));
}

#[tokio::test]
async fn test_double_only_group() {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "icons/a@2x.png", 16, 16);

    let toml = ICONS_JSON;
    let result = BuildPipeline::new(context(temp.path(), toml)).run().await.unwrap();

    assert_eq!(result.standard_count, 0);
    assert_eq!(result.double_count, 1);
    assert!(!temp.path().join("img/icons.png").exists());

    let manifest = read_json(&temp.path().join("css/sprites.json"));
    assert_eq!(manifest["double"][0]["name"], "icon-a");
    assert_eq!(manifest["double"][0]["width"].as_f64().unwrap(), 8.0);
    assert_eq!(manifest["double"][0]["sheetWidth"].as_f64().unwrap(), 8.0);
}

#[tokio::test]
async fn test_empty_group_still_writes_manifest() {
    let temp = TempDir::new().unwrap();

    let result = BuildPipeline::new(context(temp.path(), ICONS_JSON)).run().await.unwrap();

    assert!(result.sheets.is_empty());
    let manifest = read_json(&temp.path().join("css/sprites.json"));
    assert!(manifest["standard"].as_array().unwrap().is_empty());
    assert!(manifest["double"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_marker_in_project_directory_name() {
    let temp = tempfile::Builder::new().prefix("site@2x-").tempdir().unwrap();
    write_png(temp.path(), "icons/a.png", 10, 10);
    write_png(temp.path(), "icons/a@2x.png", 20, 20);

    let result = BuildPipeline::new(context(temp.path(), ICONS_JSON)).run().await.unwrap();

    assert_eq!(result.standard_count, 1);
    assert_eq!(result.double_count, 1);
    assert!(temp.path().join("img/icons.png").exists());
    assert!(temp.path().join("img/icons@2x.png").exists());

    let manifest = read_json(&temp.path().join("css/sprites.json"));
    assert_eq!(names(&manifest["standard"]), vec!["icon-a"]);
    assert_eq!(manifest["standard"][0]["sheetReference"], "../img/icons.png");
}

#[tokio::test]
async fn test_template_renderer_from_file() {
    let temp = icons_project();
    fs::write(
        temp.path().join("sprites.mustache"),
        "{{#standard}}{{name}}={{x}},{{y}}\n{{/standard}}{{^double}}no retina\n{{/double}}",
    )
    .unwrap();

    let toml = ICONS_JSON.replace("renderer = \"json\"", "template = \"sprites.mustache\"");
    BuildPipeline::new(context(temp.path(), &toml)).run().await.unwrap();

    let text = fs::read_to_string(temp.path().join("css/sprites.json")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("icon-a="));
    assert!(lines[1].starts_with("icon-b="));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_packer_failure_halts_without_manifest() {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "good/a.png", 8, 8);
    write_png(temp.path(), "bad/broken.png", 8, 8);

    let toml = r#"
[tasks.web]
sheet = "css/sprites.css"

[[tasks.web.sprites]]
image = "img/good.png"
src = ["good/*.png"]

[[tasks.web.sprites]]
image = "img/bad.png"
src = ["bad/*.png"]
"#;
    let good_sheet = temp.path().join("img/good.png");
    let packer = Arc::new(FailingPacker { wait_for: good_sheet.clone() });
    let err = BuildPipeline::new(context(temp.path(), toml))
        .with_packer(packer)
        .run()
        .await
        .unwrap_err();

    match err {
        BuildError::Packing { sheet, source } => {
            assert_eq!(sheet, temp.path().join("img/bad.png"));
            assert!(source.to_string().contains("packer exploded"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(good_sheet.exists());
    assert!(!temp.path().join("css/sprites.css").exists());
}

#[tokio::test]
async fn test_probe_failure_halts_without_manifest() {
    let temp = icons_project();
    let err = BuildPipeline::new(context(temp.path(), ICONS_JSON))
        .with_probe(Arc::new(FailingProbe))
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Probe { .. }));
    assert!(temp.path().join("img/icons@2x.png").exists());
    assert!(!temp.path().join("css/sprites.json").exists());
}

#[tokio::test]
async fn test_unreadable_source_is_packing_error() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("icons")).unwrap();
    fs::write(temp.path().join("icons/a.png"), b"not a png").unwrap();

    let err = BuildPipeline::new(context(temp.path(), ICONS_JSON)).run().await.unwrap_err();

    assert!(matches!(err, BuildError::Packing { .. }));
    assert!(!temp.path().join("css/sprites.json").exists());
}

#[tokio::test]
async fn test_duplicate_names_across_groups() {
    let temp = TempDir::new().unwrap();
    write_png(temp.path(), "one/a.png", 8, 8);
    write_png(temp.path(), "two/a.png", 8, 8);

    let toml = r#"
[tasks.web]
sheet = "css/sprites.css"
class_prefix = "icon"

[[tasks.web.sprites]]
image = "img/one.png"
src = ["one/*.png"]

[[tasks.web.sprites]]
image = "img/two.png"
src = ["two/*.png"]
"#;
    let err = BuildPipeline::new(context(temp.path(), toml)).run().await.unwrap_err();

    assert!(matches!(err, BuildError::DuplicateName(_)));
    assert!(err.to_string().contains("icon-a"));
    assert!(!temp.path().join("css/sprites.css").exists());
}

#[tokio::test]
async fn test_missing_template_fails_before_packing() {
    let temp = icons_project();
    let toml = ICONS_JSON.replace("renderer = \"json\"", "template = \"missing.mustache\"");

    let err = BuildPipeline::new(context(temp.path(), &toml)).run().await.unwrap_err();

    assert!(matches!(err, BuildError::Render(_)));
    assert!(!temp.path().join("img/icons.png").exists());
}
