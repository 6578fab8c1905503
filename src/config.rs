use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub data_root: Option<PathBuf>,
    #[serde(default)]
    pub game_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatagenConfig {
    #[serde(default = "DatagenConfig::default_java")]
    pub java: String,
    #[serde(default = "DatagenConfig::default_main_class")]
    pub main_class: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "PreviewConfig::default_width")]
    pub width: u32,
    #[serde(default = "PreviewConfig::default_height")]
    pub height: u32,
    #[serde(default = "PreviewConfig::default_font_manifest")]
    pub font_manifest: String,
    #[serde(default = "PreviewConfig::default_glint_texture")]
    pub glint_texture: String,
    #[serde(default = "PreviewConfig::default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(default)]
    pub datagen: DatagenConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub data_root: Option<PathBuf>,
    pub game_dir: Option<PathBuf>,
    pub java: Option<String>,
}

impl AssetConfig {
    pub fn resolved_data_root(&self) -> PathBuf {
        self.data_root.clone().or_else(dirs::data_dir).unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn resolved_game_dir(&self) -> PathBuf {
        self.game_dir.clone().unwrap_or_else(default_game_dir)
    }
}

fn default_game_dir() -> PathBuf {
    let base = if cfg!(target_os = "linux") { dirs::home_dir() } else { dirs::data_dir() };
    let base = base.unwrap_or_else(|| PathBuf::from("."));
    if cfg!(target_os = "macos") {
        base.join("minecraft")
    } else {
        base.join(".minecraft")
    }
}

impl DatagenConfig {
    fn default_java() -> String {
        "java".to_string()
    }

    fn default_main_class() -> String {
        "net.minecraft.data.Main".to_string()
    }
}

impl Default for DatagenConfig {
    fn default() -> Self {
        Self { java: Self::default_java(), main_class: Self::default_main_class() }
    }
}

impl PreviewConfig {
    const fn default_width() -> u32 {
        320
    }

    const fn default_height() -> u32 {
        240
    }

    fn default_font_manifest() -> String {
        "font/include/default.json".to_string()
    }

    fn default_glint_texture() -> String {
        "textures/misc/enchanted_glint_item.png".to_string()
    }

    const fn default_settle_timeout_ms() -> u64 {
        120_000
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            width: Self::default_width(),
            height: Self::default_height(),
            font_manifest: Self::default_font_manifest(),
            glint_texture: Self::default_glint_texture(),
            settle_timeout_ms: Self::default_settle_timeout_ms(),
        }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!(target: "config", "Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.preview.width = width;
        }
        if let Some(height) = overrides.height {
            self.preview.height = height;
        }
        if let Some(root) = &overrides.data_root {
            self.assets.data_root = Some(root.clone());
        }
        if let Some(game_dir) = &overrides.game_dir {
            self.assets.game_dir = Some(game_dir.clone());
        }
        if let Some(java) = &overrides.java {
            self.datagen.java = java.clone();
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.height.is_none()
            && self.data_root.is_none()
            && self.game_dir.is_none()
            && self.java.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.data_root.is_some() {
            fields.push("data-root");
        }
        if self.game_dir.is_some() {
            fields.push("game-dir");
        }
        if self.java.is_some() {
            fields.push("java");
        }
        fields
    }
}
