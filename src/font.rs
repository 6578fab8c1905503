//! Bitmap font tables built from a provider manifest and the dimensions of the atlas pages.

use anyhow::{Context, Result};
use glam::UVec2;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Atlas pages in page-index order.
pub const PAGE_FILES: [&str; 3] = ["ascii.png", "accented.png", "nonlatin_european.png"];
pub const PAGE_COUNT: usize = PAGE_FILES.len();
pub const DEFAULT_ROW_HEIGHT: u32 = 8;

const BITMAP_PROVIDER: &str = "bitmap";
const PLACEHOLDER: char = '\u{0}';

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FontManifest {
    #[serde(default)]
    pub providers: Vec<FontProvider>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FontProvider {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub file: String,
    #[serde(default = "FontProvider::default_height")]
    pub height: u32,
    #[serde(default)]
    pub ascent: i32,
    #[serde(default)]
    pub chars: Vec<String>,
}

impl FontProvider {
    const fn default_height() -> u32 {
        DEFAULT_ROW_HEIGHT
    }
}

impl FontManifest {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse font manifest")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glyph {
    pub page: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub advance: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphTable {
    font_name: String,
    glyphs: BTreeMap<char, Glyph>,
}

impl GlyphTable {
    pub fn font_name(&self) -> &str {
        &self.font_name
    }

    pub fn get(&self, c: char) -> Option<&Glyph> {
        self.glyphs.get(&c)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &Glyph)> {
        self.glyphs.iter().map(|(c, glyph)| (*c, glyph))
    }

    /// Horizontal step for characters the font does not cover.
    pub fn fallback_advance(&self) -> u32 {
        self.get(' ').map_or(DEFAULT_ROW_HEIGHT / 2, |space| space.advance)
    }
}

/// Page index for an atlas reference such as `minecraft:font/ascii.png`.
pub fn page_index(file: &str) -> Option<usize> {
    let name = file.rsplit(['/', ':']).next().unwrap_or(file);
    PAGE_FILES.iter().position(|page| *page == name)
}

/// Builds the glyph table for `font_name`.
///
/// Providers are applied in manifest order, so a character declared twice keeps the cell of the
/// last provider that maps it.
pub fn build(font_name: &str, pages: [UVec2; PAGE_COUNT], manifest: &FontManifest) -> GlyphTable {
    let mut glyphs = BTreeMap::new();
    for provider in &manifest.providers {
        if provider.kind != BITMAP_PROVIDER {
            log::debug!(target: "font", "{font_name}: ignoring '{}' provider", provider.kind);
            continue;
        }
        let Some(page) = page_index(&provider.file) else {
            log::warn!(target: "font", "{font_name}: no atlas page for '{}', skipping provider", provider.file);
            continue;
        };
        let page_width = pages[page].x;
        for (row, chars) in provider.chars.iter().enumerate() {
            let row_len = chars.chars().count() as u32;
            if row_len == 0 {
                continue;
            }
            let cell_width = page_width / row_len;
            let y = row as u32 * provider.height;
            for (column, c) in chars.chars().enumerate() {
                if c == PLACEHOLDER {
                    continue;
                }
                let glyph = Glyph {
                    page,
                    x: column as u32 * cell_width,
                    y,
                    width: cell_width,
                    height: provider.height,
                    advance: cell_width,
                };
                glyphs.insert(c, glyph);
            }
        }
    }
    log::debug!(target: "font", "{font_name}: {} glyphs", glyphs.len());
    GlyphTable { font_name: font_name.to_string(), glyphs }
}
