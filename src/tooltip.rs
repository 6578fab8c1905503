//! Lays out styled tooltip lines into positioned glyph runs inside a padded panel.

use crate::font::{Glyph, GlyphTable, DEFAULT_ROW_HEIGHT};
use crate::item::{strip_namespace, Item};
use crate::snbt::{self, Tag};
use crate::text::{StyledText, TextColor, TextNode};
use glam::Vec2;
use std::collections::VecDeque;

pub const OUTER_PADDING: f32 = 3.0;
pub const INNER_PADDING: f32 = 1.0;
pub const BACKGROUND: [u8; 4] = [0x10, 0x00, 0x10, 0xF0];
pub const BORDER_TOP: [u8; 4] = [0x50, 0x00, 0xFF, 0x50];
pub const BORDER_BOTTOM: [u8; 4] = [0x28, 0x00, 0x7F, 0x50];

const CUSTOM_NAME: &str = "minecraft:custom_name";
const ITEM_NAME: &str = "minecraft:item_name";
const LORE: &str = "minecraft:lore";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub glyph: Glyph,
    pub origin: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlyphRun {
    pub text: String,
    pub color: TextColor,
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
    pub glyphs: Vec<PlacedGlyph>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipLayout {
    pub panel: Rect,
    pub runs: Vec<GlyphRun>,
}

impl TooltipLayout {
    pub fn content_origin() -> Vec2 {
        Vec2::splat(OUTER_PADDING + INNER_PADDING)
    }
}

/// Lays out `lines` top to bottom with the panel at the origin.
///
/// Every line starts white. Within a line the tree is walked breadth first: a node's children are
/// queued behind its siblings and inherit its resolved color.
pub fn layout(lines: &[TextNode], glyphs: &GlyphTable) -> TooltipLayout {
    let inset = OUTER_PADDING + INNER_PADDING;
    let mut runs = Vec::new();
    let mut content = Vec2::ZERO;

    for line in lines {
        let line_top = inset + content.y;
        let mut cursor = 0.0f32;
        let mut line_height = 0.0f32;
        let mut queue = VecDeque::from([(line, TextColor::WHITE)]);
        while let Some((node, inherited)) = queue.pop_front() {
            match node {
                TextNode::Text(text) => {
                    let run = place_run(text, inherited, Vec2::new(inset + cursor, line_top), glyphs);
                    cursor += run.width;
                    line_height = line_height.max(run.height);
                    runs.push(run);
                }
                TextNode::List(children) => queue.extend(children.iter().map(|child| (child, inherited))),
                TextNode::Styled(StyledText { text, color, extra, .. }) => {
                    let color = color.unwrap_or(inherited);
                    if !text.is_empty() {
                        let run = place_run(text, color, Vec2::new(inset + cursor, line_top), glyphs);
                        cursor += run.width;
                        line_height = line_height.max(run.height);
                        runs.push(run);
                    }
                    queue.extend(extra.iter().map(|child| (child, color)));
                }
            }
        }
        if line_height == 0.0 {
            line_height = DEFAULT_ROW_HEIGHT as f32;
        }
        content.x = content.x.max(cursor);
        content.y += line_height;
    }

    let panel = Rect { min: Vec2::ZERO, size: content + Vec2::splat(2.0 * inset) };
    TooltipLayout { panel, runs }
}

fn place_run(text: &str, color: TextColor, origin: Vec2, table: &GlyphTable) -> GlyphRun {
    let mut placed = Vec::new();
    let mut width = 0.0f32;
    let mut height = 0.0f32;
    for c in text.chars() {
        match table.get(c) {
            Some(glyph) => {
                placed.push(PlacedGlyph { glyph: *glyph, origin: origin + Vec2::new(width, 0.0) });
                width += glyph.advance as f32;
                height = height.max(glyph.height as f32);
            }
            None => width += table.fallback_advance() as f32,
        }
    }
    if height == 0.0 {
        height = DEFAULT_ROW_HEIGHT as f32;
    }
    GlyphRun { text: text.to_string(), color, origin, width, height, glyphs: placed }
}

/// Tooltip lines for an item: its name, any lore, then the item id in dark gray.
pub fn tooltip_lines(item: &Item) -> Vec<TextNode> {
    let mut lines = Vec::new();
    let name = component_tag(item, CUSTOM_NAME)
        .or_else(|| component_tag(item, ITEM_NAME))
        .map(|tag| TextNode::from_tag(&tag))
        .unwrap_or_else(|| TextNode::text(display_name(&item.id)));
    lines.push(name);

    if let Some(Tag::List(entries)) = component_tag(item, LORE) {
        for entry in &entries {
            lines.push(TextNode::Styled(StyledText {
                color: Some(TextColor::DARK_PURPLE),
                italic: Some(true),
                extra: vec![TextNode::from_tag(entry)],
                ..StyledText::default()
            }));
        }
    }

    let id = if item.id.contains(':') { item.id.clone() } else { format!("{}:{}", crate::item::NAMESPACE, item.id) };
    lines.push(TextNode::colored(id, TextColor::DARK_GRAY));
    lines
}

fn component_tag(item: &Item, key: &str) -> Option<Tag> {
    let raw = item.component(key)?;
    match snbt::parse(raw) {
        Ok(tag) => Some(tag),
        Err(err) => {
            log::debug!(target: "tooltip", "Ignoring unparsable {key} component: {err}");
            None
        }
    }
}

/// `minecraft:diamond_sword` -> `Diamond Sword`.
pub fn display_name(id: &str) -> String {
    strip_namespace(id)
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::{build, FontManifest, PAGE_COUNT};
    use glam::UVec2;

    // 16 glyphs per row on a 96px page: every glyph is 6 wide and 8 high.
    fn glyphs() -> GlyphTable {
        let manifest: FontManifest = serde_json::from_str(
            r#"{"providers":[{"type":"bitmap","file":"font/ascii.png","chars":[" !abcdefghijklmn","opqrstuvwxyzABCD"]}]}"#,
        )
        .unwrap();
        build("default", [UVec2::new(96, 96); PAGE_COUNT], &manifest)
    }

    #[test]
    fn panel_wraps_lines_with_padding() {
        let layout = layout(&[TextNode::text("hi"), TextNode::text("hello")], &glyphs());
        let pad = 2.0 * (OUTER_PADDING + INNER_PADDING);
        assert_eq!(layout.panel.size, Vec2::new(5.0 * 6.0 + pad, 8.0 + 8.0 + pad));
        assert_eq!(layout.runs.len(), 2);
        assert_eq!(layout.runs[1].origin, Vec2::new(4.0, 12.0));
        assert_eq!(layout.runs[1].glyphs[2].origin, Vec2::new(16.0, 12.0));
    }

    #[test]
    fn colors_resolve_top_down_in_queue_order() {
        let line: TextNode = serde_json::from_str(
            r#"{"text":"a","color":"red","extra":[["b"],{"text":"c","color":"blue"}]}"#,
        )
        .unwrap();
        let layout = layout(&[line], &glyphs());
        let order: Vec<(&str, TextColor)> = layout.runs.iter().map(|run| (run.text.as_str(), run.color)).collect();
        let red = TextColor::parse("red").unwrap();
        assert_eq!(order, vec![("a", red), ("c", TextColor::parse("blue").unwrap()), ("b", red)]);
        assert_eq!(layout.runs[1].origin.x, 4.0 + 6.0);
        assert_eq!(layout.runs[2].origin.x, 4.0 + 12.0);
    }

    #[test]
    fn missing_glyphs_advance_by_space() {
        let layout = layout(&[TextNode::text("a\u{2603}b")], &glyphs());
        let run = &layout.runs[0];
        assert_eq!(run.glyphs.len(), 2);
        assert_eq!(run.width, 18.0);
        assert_eq!(run.glyphs[1].origin.x, 4.0 + 12.0);
    }

    #[test]
    fn empty_line_keeps_default_height() {
        let layout = layout(&[TextNode::List(vec![])], &glyphs());
        let pad = 2.0 * (OUTER_PADDING + INNER_PADDING);
        assert_eq!(layout.panel.size, Vec2::new(pad, DEFAULT_ROW_HEIGHT as f32 + pad));
    }

    #[test]
    fn item_lines_use_name_lore_and_id() {
        let item = Item::new("1.21", "minecraft:diamond_sword")
            .with_component("minecraft:lore", r#"['"Sharp"', '{"text":"Old","color":"gold"}']"#);
        let lines = tooltip_lines(&item);
        let plain: Vec<String> = lines.iter().map(TextNode::plain_text).collect();
        assert_eq!(plain, vec!["Diamond Sword", "Sharp", "Old", "minecraft:diamond_sword"]);
        assert_eq!(lines[3], TextNode::colored("minecraft:diamond_sword", TextColor::DARK_GRAY));

        let named = Item::new("1.21", "stick").with_component("custom_name", r#"'{"text":"Wand"}'"#);
        let lines = tooltip_lines(&named);
        assert_eq!(lines[0].plain_text(), "Wand");
        assert_eq!(lines[1].plain_text(), "minecraft:stick");
    }

    #[test]
    fn runaway_component_nesting_falls_back_to_the_id() {
        let name = "[".repeat(100_000);
        let item = Item::new("1.21", "minecraft:stick").with_component("minecraft:custom_name", name);
        let plain: Vec<String> = tooltip_lines(&item).iter().map(TextNode::plain_text).collect();
        assert_eq!(plain, vec!["Stick", "minecraft:stick"]);
    }

    #[test]
    fn display_name_title_cases_words() {
        assert_eq!(display_name("minecraft:golden_apple"), "Golden Apple");
        assert_eq!(display_name("stone"), "Stone");
    }
}
