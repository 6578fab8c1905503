use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const NAMESPACE: &str = "minecraft";

/// The edited item document.
///
/// Component values are kept as their serialized structured-data text; see [`crate::snbt`] for
/// the parser that reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub version: String,
    pub id: String,
    pub count: i64,
    #[serde(default)]
    pub components: BTreeMap<String, String>,
}

impl Item {
    pub fn new(version: impl Into<String>, id: impl Into<String>) -> Self {
        Self { version: version.into(), id: id.into(), count: 1, components: BTreeMap::new() }
    }

    pub fn with_component(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.insert(key.into(), value.into());
        self
    }

    /// Component lookup that accepts both `minecraft:lore` and `lore`.
    pub fn component(&self, key: &str) -> Option<&str> {
        let bare = strip_namespace(key);
        self.components
            .get(key)
            .or_else(|| self.components.get(bare))
            .or_else(|| self.components.get(&format!("{NAMESPACE}:{bare}")))
            .map(|value| value.as_str())
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let item = serde_json::from_str(text).context("Failed to parse item document")?;
        Ok(item)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read item document {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid item document {}", path.display()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write item document {}", path.display()))
    }
}

pub fn strip_namespace(id: &str) -> &str {
    match id.split_once(':') {
        Some((_, rest)) => rest,
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_roundtrip_keeps_empty_components() {
        let item = Item::new("1.21.4", "minecraft:stone");
        let json = item.to_json().expect("serialize");
        assert!(json.contains("\"components\": {}"), "empty components must be written: {json}");
        let parsed = Item::from_json(&json).expect("parse");
        assert_eq!(parsed, item);
        assert!(parsed.components.is_empty());
    }

    #[test]
    fn json_roundtrip_keeps_component_values() {
        let item = Item::new("1.21.4", "minecraft:diamond_sword")
            .with_component("minecraft:enchantment_glint_override", "true")
            .with_component("minecraft:lore", "['\"line\"']");
        let parsed = Item::from_json(&item.to_json().unwrap()).unwrap();
        assert_eq!(parsed, item);
    }

    #[test]
    fn missing_components_default_to_empty() {
        let parsed = Item::from_json(r#"{"version":"1.21","id":"stone","count":3}"#).unwrap();
        assert_eq!(parsed.count, 3);
        assert!(parsed.components.is_empty());
    }

    #[test]
    fn component_lookup_ignores_namespace() {
        let item = Item::new("1.21", "stone").with_component("lore", "[]");
        assert_eq!(item.component("minecraft:lore"), Some("[]"));
        let item = Item::new("1.21", "stone").with_component("minecraft:lore", "[]");
        assert_eq!(item.component("lore"), Some("[]"));
    }

    #[test]
    fn strips_namespace_prefix() {
        assert_eq!(strip_namespace("minecraft:stone"), "stone");
        assert_eq!(strip_namespace("stone"), "stone");
    }
}
