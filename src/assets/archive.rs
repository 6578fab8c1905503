use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

pub const ASSET_PREFIX: &str = "assets/minecraft/";
pub const EXTRACTED_SUBTREES: [&str; 3] = ["textures/", "models/", "font/"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub files: usize,
    pub bytes: u64,
}

struct PlannedEntry {
    index: usize,
    relative: PathBuf,
    size: u64,
}

/// Extracts the texture, model and font subtrees of a version jar into `dest`, dropping the
/// `assets/minecraft/` prefix. Progress is weighted by uncompressed entry size.
pub fn extract_asset_subtrees(jar: &Path, dest: &Path) -> Result<ExtractionReport> {
    let file = File::open(jar).with_context(|| format!("Failed to open version archive {}", jar.display()))?;
    let mut archive = ZipArchive::new(BufReader::new(file))
        .with_context(|| format!("Failed to read version archive {}", jar.display()))?;

    let mut planned = Vec::new();
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.name().strip_prefix(ASSET_PREFIX) else {
            continue;
        };
        if !EXTRACTED_SUBTREES.iter().any(|subtree| relative.starts_with(subtree)) {
            continue;
        }
        if entry.enclosed_name().is_none() {
            log::warn!(target: "assets", "Skipping unsafe archive entry '{}'", entry.name());
            continue;
        }
        planned.push(PlannedEntry { index, relative: PathBuf::from(relative), size: entry.size() });
    }

    let total: u64 = planned.iter().map(|entry| entry.size).sum();
    let mut done = 0_u64;
    let mut last_decile = 0_u64;
    for entry in &planned {
        let target = dest.join(&entry.relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).with_context(|| format!("Creating directory {}", parent.display()))?;
        }
        let mut source = archive.by_index(entry.index)?;
        let mut out = File::create(&target).with_context(|| format!("Creating {}", target.display()))?;
        io::copy(&mut source, &mut out).with_context(|| format!("Extracting {}", target.display()))?;
        done += entry.size;
        if total > 0 {
            let decile = done * 10 / total;
            if decile > last_decile {
                last_decile = decile;
                log::debug!(target: "assets", "Extracting {}: {}%", jar.display(), decile * 10);
            }
        }
    }

    Ok(ExtractionReport { files: planned.len(), bytes: total })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data) in entries {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn extracts_only_asset_subtrees() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("1.21.jar");
        write_jar(
            &jar,
            &[
                ("assets/minecraft/textures/item/stick.png", b"png"),
                ("assets/minecraft/models/block/stone.json", b"{}"),
                ("assets/minecraft/font/default.json", b"{}"),
                ("assets/minecraft/lang/en_us.json", b"{}"),
                ("net/minecraft/Main.class", b"class"),
            ],
        );
        let dest = dir.path().join("out");
        let report = extract_asset_subtrees(&jar, &dest).expect("extract");
        assert_eq!(report, ExtractionReport { files: 3, bytes: 7 });
        assert_eq!(fs::read(dest.join("textures/item/stick.png")).unwrap(), b"png");
        assert!(dest.join("models/block/stone.json").exists());
        assert!(dest.join("font/default.json").exists());
        assert!(!dest.join("lang").exists());
    }

    #[test]
    fn missing_archive_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(extract_asset_subtrees(&dir.path().join("absent.jar"), dir.path()).is_err());
    }
}
