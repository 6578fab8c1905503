use super::AssetPaths;
use crate::item::strip_namespace;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Texture slots tried in order before falling back to the first slot the model declares.
pub const MODEL_SLOT_PRIORITY: [&str; 7] = ["side", "all", "texture", "front", "top", "end", "particle"];

pub const COMPONENT_REGISTRY: &str = "minecraft:data_component_type";

// Older generators ignore `--output` and write under `generated/`.
const REGISTRY_REPORTS: [&str; 2] = ["reports/registries.json", "generated/reports/registries.json"];

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resource not found: {0}")]
    ResourceNotFound(String),
    #[error("malformed model descriptor {path}: {source}")]
    MalformedModel {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize)]
struct ModelDescriptor {
    #[serde(default)]
    textures: Map<String, Value>,
}

/// Maps requests onto files inside an unpacked bundle. Callers make sure the bundle exists first.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    paths: AssetPaths,
}

impl ResourceResolver {
    pub fn new(paths: AssetPaths) -> Self {
        Self { paths }
    }

    pub fn resolve_generic_resource(&self, version: &str, path: &str) -> PathBuf {
        self.paths.bundle_dir(version).join(path)
    }

    pub fn resolve_item_sprite(&self, version: &str, item_id: &str) -> Result<PathBuf, ResolveError> {
        let name = strip_namespace(item_id);
        let bundle = self.paths.bundle_dir(version);
        let sprite = bundle.join("textures").join("item").join(format!("{name}.png"));
        if sprite.is_file() {
            return Ok(sprite);
        }

        let model_path = bundle.join("models").join("block").join(format!("{name}.json"));
        if !model_path.is_file() {
            return Err(ResolveError::ResourceNotFound(format!("{version}/{item_id}")));
        }
        let bytes = fs::read(&model_path)?;
        let model: ModelDescriptor = serde_json::from_slice(&bytes)
            .map_err(|source| ResolveError::MalformedModel { path: model_path.clone(), source })?;
        let reference = select_model_texture(&model.textures)
            .ok_or_else(|| ResolveError::ResourceNotFound(format!("{version}/{item_id} (model has no texture)")))?;
        log::debug!(target: "assets", "{item_id} falls back to block texture '{reference}'");
        Ok(bundle.join("textures").join(format!("{}.png", strip_namespace(reference))))
    }

    /// Names of the item data components the version's registry report declares.
    pub fn component_names(&self, version: &str) -> Result<Vec<String>> {
        let datagen = self.paths.bundle_dir(version).join("datagen");
        let report = REGISTRY_REPORTS
            .iter()
            .map(|relative| datagen.join(relative))
            .find(|candidate| candidate.is_file())
            .unwrap_or_else(|| datagen.join(REGISTRY_REPORTS[0]));
        let bytes = fs::read(&report).with_context(|| format!("Failed to read {}", report.display()))?;
        let registries: Map<String, Value> =
            serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {}", report.display()))?;
        let Some(Value::Object(entry)) = registries.get(COMPONENT_REGISTRY) else {
            return Ok(Vec::new());
        };
        let names = match entry.get("entries") {
            Some(Value::Object(entries)) => entries.keys().cloned().collect(),
            _ => entry.keys().cloned().collect(),
        };
        Ok(names)
    }

    /// Versions in the game directory that ship a jar, newest first.
    pub fn installed_versions(&self) -> Result<Vec<String>> {
        let versions_dir = self.paths.versions_dir();
        if !versions_dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&versions_dir)
            .with_context(|| format!("Failed to list {}", versions_dir.display()))?
        {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if has_jar(&entry.path(), &name) {
                versions.push(name);
            }
        }
        versions.sort_by(|a, b| compare_versions(b, a));
        Ok(versions)
    }
}

fn has_jar(dir: &Path, version: &str) -> bool {
    dir.join(format!("{version}.jar")).is_file()
}

fn select_model_texture(textures: &Map<String, Value>) -> Option<&str> {
    let declared = textures.keys().map(String::as_str);
    MODEL_SLOT_PRIORITY.into_iter().chain(declared).find_map(|slot| follow_slot(textures, slot))
}

// `#name` values point at another slot of the same model.
fn follow_slot<'a>(textures: &'a Map<String, Value>, slot: &str) -> Option<&'a str> {
    let mut value = textures.get(slot)?.as_str()?;
    for _ in 0..textures.len() {
        match value.strip_prefix('#') {
            Some(target) => value = textures.get(target)?.as_str()?,
            None => return Some(value),
        }
    }
    None
}

/// Numeric-aware ordering so that `1.21.10` sorts above `1.21.9`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
