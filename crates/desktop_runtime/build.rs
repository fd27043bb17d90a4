use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const CATALOG_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureSize {
    width: i32,
    height: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FeatureFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    draggable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resizable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    maximizable: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FeatureManifest {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    single_instance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    persist_session: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_size: Option<FeatureSize>,
    #[serde(default)]
    flags: FeatureFlags,
}

#[derive(Debug, Deserialize)]
struct CatalogManifest {
    schema_version: u32,
    #[serde(default, rename = "feature")]
    features: Vec<FeatureManifest>,
}

fn main() {
    let crate_root = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let path = crate_root.join("features").join("builtin.toml");
    println!("cargo:rerun-if-changed={}", path.display());

    let raw = fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    let mut manifest: CatalogManifest = toml::from_str(&raw)
        .unwrap_or_else(|err| panic!("failed to parse {}: {err}", path.display()));
    if manifest.schema_version != CATALOG_SCHEMA_VERSION {
        panic!(
            "feature catalog schema mismatch in {}: expected {} found {}",
            path.display(),
            CATALOG_SCHEMA_VERSION,
            manifest.schema_version
        );
    }

    let mut seen = BTreeSet::new();
    for feature in &manifest.features {
        if feature.id.trim().is_empty() || feature.id.contains('#') {
            panic!("invalid feature id {:?} in {}", feature.id, path.display());
        }
        if !seen.insert(feature.id.clone()) {
            panic!("duplicate feature id {:?} in {}", feature.id, path.display());
        }
        if let Some(size) = &feature.default_size {
            if size.width <= 0 || size.height <= 0 {
                panic!("feature {:?} has a non-positive default size", feature.id);
            }
        }
    }

    manifest.features.sort_by(|a, b| a.id.cmp(&b.id));
    let json = serde_json::to_string_pretty(&manifest.features)
        .expect("serialize feature catalog");
    let generated = format!(
        "/// Build-time generated feature catalog JSON.\n\
pub const FEATURE_CATALOG_JSON: &str = r##\"{}\"##;\n",
        json
    );

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").expect("OUT_DIR"));
    let out_file = out_dir.join("feature_catalog_generated.rs");
    fs::write(&out_file, generated)
        .unwrap_or_else(|err| panic!("failed to write {}: {err}", out_file.display()));
}
