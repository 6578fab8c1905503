//! Software compositor for the item preview.
//!
//! Mirrors a small fragment pipeline: per-frame uniforms drive a checkerboard backdrop, the item
//! sprite (nearest-neighbour scaled), a scrolling enchantment glint over opaque sprite texels and
//! finally the tooltip panel with its text.

use crate::font::{GlyphTable, PAGE_COUNT};
use crate::item::Item;
use crate::snbt::{self, Tag};
use crate::tooltip::{self, TooltipLayout, BACKGROUND, BORDER_BOTTOM, BORDER_TOP};
use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec2};
use image::{Rgba, RgbaImage};

const GLINT_OVERRIDE: &str = "minecraft:enchantment_glint_override";
const ENCHANTMENTS: &str = "minecraft:enchantments";
const CHECKER_DIVISIONS: u32 = 16;
const UI_SCALE_STEP: u32 = 120;
const GLINT_SCROLL: Vec2 = Vec2::new(0.125, 0.0625);
const GLINT_STRENGTH: f32 = 0.75;
const CHECKER_LIGHT: [u8; 4] = [0x3B, 0x3B, 0x3B, 0xFF];
const CHECKER_DARK: [u8; 4] = [0x2C, 0x2C, 0x2C, 0xFF];

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RenderMode: u32 {
        const HAS_SPRITE = 1 << 0;
        const ENCHANTED = 1 << 1;
        const FONTS_READY = 1 << 2;
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PreviewUniforms {
    pub resolution: [f32; 2],
    pub sprite_scale: [f32; 2], // sprite square side as a fraction of width, height
    pub time: f32,
    pub checker_cell: f32,
    pub ui_scale: f32,
    pub mode: u32,
}

/// Atlas pages plus the glyph table built from them.
#[derive(Debug, Clone)]
pub struct FontAtlas {
    pub pages: [RgbaImage; PAGE_COUNT],
    pub glyphs: GlyphTable,
}

/// Explicit glint override wins; otherwise any enchantment entry turns the glint on.
pub fn is_enchanted(item: &Item) -> bool {
    if let Some(raw) = item.component(GLINT_OVERRIDE) {
        if let Some(flag) = snbt::parse(raw).ok().as_ref().and_then(Tag::as_bool) {
            return flag;
        }
    }
    let Some(raw) = item.component(ENCHANTMENTS) else {
        return false;
    };
    match snbt::parse(raw) {
        Ok(tag) => match tag.get("levels") {
            Some(levels) => !levels.is_empty(),
            None => !tag.is_empty(),
        },
        Err(err) => {
            log::debug!(target: "compositor", "Unparsable enchantments component: {err}");
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct Compositor {
    size: UVec2,
    uniforms: PreviewUniforms,
    mode: RenderMode,
    item: Option<Item>,
    sprite: Option<RgbaImage>,
    glint: Option<RgbaImage>,
    fonts: Option<FontAtlas>,
    tooltip: Option<TooltipLayout>,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        let mut compositor = Self::default();
        compositor.tick(0.0, width, height);
        compositor
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn uniforms(&self) -> &PreviewUniforms {
        &self.uniforms
    }

    pub fn uniform_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(&self.uniforms)
    }

    pub fn tooltip(&self) -> Option<&TooltipLayout> {
        self.tooltip.as_ref()
    }

    pub fn item(&self) -> Option<&Item> {
        self.item.as_ref()
    }

    /// Advances animation time. Resolution, checker cell, UI scale and sprite scale depend only on
    /// the surface size and are recomputed when it changes.
    pub fn tick(&mut self, time: f32, width: u32, height: u32) {
        self.uniforms.time = time;
        let size = UVec2::new(width, height);
        if size != self.size {
            self.size = size;
            self.resize();
        }
    }

    fn resize(&mut self) {
        let UVec2 { x: width, y: height } = self.size;
        let short = width.min(height);
        self.uniforms.resolution = [width as f32, height as f32];
        self.uniforms.checker_cell = (short / CHECKER_DIVISIONS).max(1) as f32;
        self.uniforms.ui_scale = (short / UI_SCALE_STEP).max(1) as f32;
        let side = (short / 2) as f32;
        self.uniforms.sprite_scale = [side / width.max(1) as f32, side / height.max(1) as f32];
        log::debug!(target: "compositor", "Surface resized to {width}x{height}");
    }

    pub fn set_item(&mut self, item: Option<Item>) {
        let enchanted = item.as_ref().is_some_and(is_enchanted);
        self.set_mode(RenderMode::ENCHANTED, enchanted);
        self.item = item;
        self.rebuild_tooltip();
    }

    pub fn set_sprite(&mut self, sprite: Option<RgbaImage>) {
        self.set_mode(RenderMode::HAS_SPRITE, sprite.is_some());
        self.sprite = sprite;
    }

    pub fn set_glint(&mut self, glint: Option<RgbaImage>) {
        self.glint = glint;
    }

    pub fn set_fonts(&mut self, fonts: FontAtlas) {
        self.fonts = Some(fonts);
        self.set_mode(RenderMode::FONTS_READY, true);
        self.rebuild_tooltip();
    }

    /// Drops the atlas of the previous version; text stays hidden until new fonts arrive.
    pub fn clear_fonts(&mut self) {
        self.fonts = None;
        self.set_mode(RenderMode::FONTS_READY, false);
        self.tooltip = None;
    }

    fn set_mode(&mut self, flag: RenderMode, on: bool) {
        self.mode.set(flag, on);
        self.uniforms.mode = self.mode.bits();
    }

    fn rebuild_tooltip(&mut self) {
        self.tooltip = match (&self.item, &self.fonts) {
            (Some(item), Some(fonts)) => Some(tooltip::layout(&tooltip::tooltip_lines(item), &fonts.glyphs)),
            _ => None,
        };
    }

    pub fn render(&self) -> RgbaImage {
        let UVec2 { x: width, y: height } = self.size;
        let cell = self.uniforms.checker_cell.max(1.0) as u32;
        let mut frame = RgbaImage::from_fn(width, height, |x, y| {
            if (x / cell + y / cell) % 2 == 0 {
                Rgba(CHECKER_LIGHT)
            } else {
                Rgba(CHECKER_DARK)
            }
        });

        let side = (self.uniforms.sprite_scale[0] * width as f32) as u32;
        let sprite_origin = UVec2::new(width.saturating_sub(side) / 2, cell);
        if let (true, Some(sprite)) = (self.mode.contains(RenderMode::HAS_SPRITE), &self.sprite) {
            self.draw_sprite(&mut frame, sprite, sprite_origin, side);
        }

        if let (Some(layout), Some(fonts)) = (&self.tooltip, &self.fonts) {
            let scale = self.uniforms.ui_scale as u32;
            let panel_width = layout.panel.size.x as u32 * scale;
            let origin = UVec2::new(width.saturating_sub(panel_width) / 2, sprite_origin.y + side + cell);
            draw_tooltip(&mut frame, layout, fonts, origin, scale);
        }
        frame
    }

    fn draw_sprite(&self, frame: &mut RgbaImage, sprite: &RgbaImage, origin: UVec2, side: u32) {
        if side == 0 || sprite.width() == 0 || sprite.height() == 0 {
            return;
        }
        let glint = match (self.mode.contains(RenderMode::ENCHANTED), &self.glint) {
            (true, Some(glint)) if glint.width() > 0 && glint.height() > 0 => Some(glint),
            _ => None,
        };
        let offset = GLINT_SCROLL * self.uniforms.time;
        for dy in 0..side {
            for dx in 0..side {
                let (x, y) = (origin.x + dx, origin.y + dy);
                if x >= frame.width() || y >= frame.height() {
                    continue;
                }
                let uv = Vec2::new(dx as f32 + 0.5, dy as f32 + 0.5) / side as f32;
                let texel = sample_nearest(sprite, uv);
                if texel[3] == 0 {
                    continue;
                }
                let dst = frame.get_pixel_mut(x, y);
                blend_over(dst, texel);
                if let Some(glint) = glint {
                    let g = sample_nearest(glint, (uv + offset).fract());
                    add_glint(dst, g);
                }
            }
        }
    }
}

fn draw_tooltip(frame: &mut RgbaImage, layout: &TooltipLayout, fonts: &FontAtlas, origin: UVec2, scale: u32) {
    let w = layout.panel.size.x as u32;
    let h = layout.panel.size.y as u32;
    let corner = |x: u32, y: u32| (x == 0 || x + 1 == w) && (y == 0 || y + 1 == h);
    for y in 0..h {
        for x in 0..w {
            if corner(x, y) {
                continue;
            }
            fill_scaled(frame, origin, scale, x, y, BACKGROUND);
        }
    }

    // Accent frame one unit inside the panel, fading from top to bottom.
    if w > 2 && h > 2 {
        let (right, bottom) = (w - 2, h - 2);
        for y in 1..=bottom {
            let t = (y - 1) as f32 / (bottom - 1).max(1) as f32;
            let color = lerp_rgba(BORDER_TOP, BORDER_BOTTOM, t);
            let is_edge_row = y == 1 || y == bottom;
            for x in 1..=right {
                if (is_edge_row || x == 1 || x == right) && !((x == 1 || x == right) && is_edge_row) {
                    fill_scaled(frame, origin, scale, x, y, color);
                }
            }
        }
    }

    for run in &layout.runs {
        let tint = run.color.to_rgba();
        for placed in &run.glyphs {
            let page = &fonts.pages[placed.glyph.page];
            for gy in 0..placed.glyph.height {
                for gx in 0..placed.glyph.width {
                    let (px, py) = (placed.glyph.x + gx, placed.glyph.y + gy);
                    if px >= page.width() || py >= page.height() {
                        continue;
                    }
                    let texel = page.get_pixel(px, py).0;
                    if texel[3] == 0 {
                        continue;
                    }
                    let color = [
                        mul8(tint[0], texel[0]),
                        mul8(tint[1], texel[1]),
                        mul8(tint[2], texel[2]),
                        texel[3],
                    ];
                    let x = placed.origin.x as u32 + gx;
                    let y = placed.origin.y as u32 + gy;
                    fill_scaled(frame, origin, scale, x, y, color);
                }
            }
        }
    }
}

fn fill_scaled(frame: &mut RgbaImage, origin: UVec2, scale: u32, x: u32, y: u32, color: [u8; 4]) {
    for sy in 0..scale {
        for sx in 0..scale {
            let (fx, fy) = (origin.x + x * scale + sx, origin.y + y * scale + sy);
            if fx < frame.width() && fy < frame.height() {
                blend_over(frame.get_pixel_mut(fx, fy), color);
            }
        }
    }
}

fn sample_nearest(image: &RgbaImage, uv: Vec2) -> [u8; 4] {
    let x = ((uv.x * image.width() as f32) as u32).min(image.width() - 1);
    let y = ((uv.y * image.height() as f32) as u32).min(image.height() - 1);
    image.get_pixel(x, y).0
}

fn blend_over(dst: &mut Rgba<u8>, src: [u8; 4]) {
    let alpha = src[3] as u32;
    for channel in 0..3 {
        let blended = (src[channel] as u32 * alpha + dst.0[channel] as u32 * (255 - alpha)) / 255;
        dst.0[channel] = blended as u8;
    }
    dst.0[3] = (alpha + dst.0[3] as u32 * (255 - alpha) / 255).min(255) as u8;
}

fn add_glint(dst: &mut Rgba<u8>, glint: [u8; 4]) {
    let weight = glint[3] as f32 / 255.0 * GLINT_STRENGTH;
    for channel in 0..3 {
        let lifted = dst.0[channel] as f32 + glint[channel] as f32 * weight;
        dst.0[channel] = lifted.min(255.0) as u8;
    }
}

fn mul8(a: u8, b: u8) -> u8 {
    ((a as u32 * b as u32) / 255) as u8
}

fn lerp_rgba(from: [u8; 4], to: [u8; 4], t: f32) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (i, value) in out.iter_mut().enumerate() {
        *value = (from[i] as f32 + (to[i] as f32 - from[i] as f32) * t).round() as u8;
    }
    out
}
