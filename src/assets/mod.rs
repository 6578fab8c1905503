use crate::config::AssetConfig;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

pub mod archive;
pub mod datagen;
pub mod manager;
pub mod resolver;

pub use manager::{UnpackError, VersionAssetManager};
pub use resolver::{ResolveError, ResourceResolver};

pub const TOOL_DIR: &str = "item-preview";
pub const BUNDLE_SUBDIRS: [&str; 4] = ["textures", "models", "font", "datagen"];

/// On-disk layout of the game installation and of the unpacked bundle cache.
#[derive(Debug, Clone)]
pub struct AssetPaths {
    data_root: PathBuf,
    game_dir: PathBuf,
}

impl AssetPaths {
    pub fn new(data_root: impl Into<PathBuf>, game_dir: impl Into<PathBuf>) -> Self {
        Self { data_root: data_root.into(), game_dir: game_dir.into() }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.resolved_data_root(), config.resolved_game_dir())
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    pub fn unpacked_root(&self) -> PathBuf {
        self.data_root.join(TOOL_DIR).join("unpacked")
    }

    pub fn bundle_dir(&self, version: &str) -> PathBuf {
        self.unpacked_root().join(version)
    }

    /// Unpacking happens here and is renamed onto [`Self::bundle_dir`] once complete.
    pub fn staging_dir(&self, version: &str) -> PathBuf {
        self.unpacked_root().join(format!(".{version}.partial"))
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.game_dir.join("versions")
    }

    pub fn version_jar(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version).join(format!("{version}.jar"))
    }

    pub fn version_manifest(&self, version: &str) -> PathBuf {
        self.versions_dir().join(version).join(format!("{version}.json"))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.game_dir.join("libraries")
    }
}

/// Version strings become directory names, so anything that could escape the cache is refused.
/// `#` is refused too: it would make `version##path` cache keys ambiguous.
pub fn validate_version(version: &str) -> Result<()> {
    if version.is_empty()
        || version.starts_with('.')
        || version.contains(['/', '\\', '#'])
        || version.contains("..")
    {
        bail!("Invalid version identifier '{version}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_layout_lives_under_tool_folder() {
        let paths = AssetPaths::new("/data", "/game");
        assert_eq!(paths.bundle_dir("1.21.4"), PathBuf::from("/data/item-preview/unpacked/1.21.4"));
        assert_eq!(paths.staging_dir("1.21.4"), PathBuf::from("/data/item-preview/unpacked/.1.21.4.partial"));
        assert_eq!(paths.version_jar("1.21.4"), PathBuf::from("/game/versions/1.21.4/1.21.4.jar"));
    }

    #[test]
    fn rejects_path_like_versions() {
        assert!(validate_version("1.21.4").is_ok());
        assert!(validate_version("24w14a").is_ok());
        assert!(validate_version("").is_err());
        assert!(validate_version("../etc").is_err());
        assert!(validate_version("1.21/..").is_err());
        assert!(validate_version("1..2").is_err());
        assert!(validate_version("a##b").is_err());
        assert!(validate_version("1.21#1").is_err());
    }
}
