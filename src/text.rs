use crate::snbt::Tag;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TextColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

const NAMED_COLORS: [(&str, u32); 16] = [
    ("black", 0x000000),
    ("dark_blue", 0x0000AA),
    ("dark_green", 0x00AA00),
    ("dark_aqua", 0x00AAAA),
    ("dark_red", 0xAA0000),
    ("dark_purple", 0xAA00AA),
    ("gold", 0xFFAA00),
    ("gray", 0xAAAAAA),
    ("dark_gray", 0x555555),
    ("blue", 0x5555FF),
    ("green", 0x55FF55),
    ("aqua", 0x55FFFF),
    ("red", 0xFF5555),
    ("light_purple", 0xFF55FF),
    ("yellow", 0xFFFF55),
    ("white", 0xFFFFFF),
];

impl TextColor {
    pub const WHITE: TextColor = TextColor::from_rgb(0xFFFFFF);
    pub const GRAY: TextColor = TextColor::from_rgb(0xAAAAAA);
    pub const DARK_GRAY: TextColor = TextColor::from_rgb(0x555555);
    pub const DARK_PURPLE: TextColor = TextColor::from_rgb(0xAA00AA);

    pub const fn from_rgb(rgb: u32) -> Self {
        Self { r: (rgb >> 16) as u8, g: (rgb >> 8) as u8, b: rgb as u8 }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if let Some(hex) = value.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            return u32::from_str_radix(hex, 16).ok().map(Self::from_rgb);
        }
        NAMED_COLORS.iter().find(|(name, _)| *name == value).map(|(_, rgb)| Self::from_rgb(*rgb))
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, 0xFF]
    }
}

impl fmt::Display for TextColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for TextColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown text color '{value}'"))
    }
}

impl From<TextColor> for String {
    fn from(color: TextColor) -> Self {
        color.to_string()
    }
}

/// One node of a styled text tree.
///
/// Mirrors the JSON text component shapes: a bare string, an array whose children inherit the
/// parent color, or an object with its own text, optional style overrides and `extra` children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextNode {
    Text(String),
    List(Vec<TextNode>),
    Styled(StyledText),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyledText {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<TextColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<TextNode>,
}

impl TextNode {
    pub fn text(value: impl Into<String>) -> Self {
        TextNode::Text(value.into())
    }

    pub fn colored(value: impl Into<String>, color: TextColor) -> Self {
        TextNode::Styled(StyledText { text: value.into(), color: Some(color), ..StyledText::default() })
    }

    /// Reads a text component written either as JSON (`'{"text":"a"}'`, `'"a"'`) or as a
    /// structured-data compound (`{text:"a",color:"red"}`).
    pub fn from_tag(tag: &Tag) -> TextNode {
        match tag {
            Tag::String(value) => parse_json_component(value).unwrap_or_else(|| TextNode::Text(value.clone())),
            Tag::List(items) => TextNode::List(items.iter().map(TextNode::from_tag).collect()),
            Tag::Compound(_) => {
                let color = tag.get("color").and_then(Tag::as_str).and_then(TextColor::parse);
                let extra = match tag.get("extra") {
                    Some(Tag::List(items)) => items.iter().map(TextNode::from_tag).collect(),
                    _ => Vec::new(),
                };
                TextNode::Styled(StyledText {
                    text: tag.get("text").and_then(Tag::as_str).unwrap_or_default().to_string(),
                    color,
                    bold: tag.get("bold").and_then(Tag::as_bool),
                    italic: tag.get("italic").and_then(Tag::as_bool),
                    extra,
                })
            }
            Tag::Byte(v) => TextNode::Text(v.to_string()),
            Tag::Short(v) => TextNode::Text(v.to_string()),
            Tag::Int(v) => TextNode::Text(v.to_string()),
            Tag::Long(v) => TextNode::Text(v.to_string()),
            Tag::Float(v) => TextNode::Text(v.to_string()),
            Tag::Double(v) => TextNode::Text(v.to_string()),
        }
    }

    /// Concatenated text in reading order, ignoring styles.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_plain(&mut out);
        out
    }

    fn collect_plain(&self, out: &mut String) {
        match self {
            TextNode::Text(value) => out.push_str(value),
            TextNode::List(children) => children.iter().for_each(|child| child.collect_plain(out)),
            TextNode::Styled(styled) => {
                out.push_str(&styled.text);
                styled.extra.iter().for_each(|child| child.collect_plain(out));
            }
        }
    }
}

fn parse_json_component(value: &str) -> Option<TextNode> {
    let trimmed = value.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[') || trimmed.starts_with('"')) {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snbt;

    #[test]
    fn parses_named_and_hex_colors() {
        assert_eq!(TextColor::parse("red"), Some(TextColor::from_rgb(0xFF5555)));
        assert_eq!(TextColor::parse("#00ff7f"), Some(TextColor::from_rgb(0x00FF7F)));
        assert_eq!(TextColor::parse("#12"), None);
        assert_eq!(TextColor::parse("mauve"), None);
    }

    #[test]
    fn deserializes_json_component_shapes() {
        let node: TextNode =
            serde_json::from_str(r#"["a", {"text":"b","color":"gold","extra":["c"]}]"#).unwrap();
        assert_eq!(node.plain_text(), "abc");
        let TextNode::List(children) = node else { panic!("expected list") };
        let TextNode::Styled(styled) = &children[1] else { panic!("expected styled") };
        assert_eq!(styled.color, Some(TextColor::from_rgb(0xFFAA00)));
    }

    #[test]
    fn converts_structured_data_compound() {
        let tag = snbt::parse(r#"{text:"Blade",color:"aqua",italic:0b}"#).unwrap();
        let TextNode::Styled(styled) = TextNode::from_tag(&tag) else { panic!("expected styled") };
        assert_eq!(styled.text, "Blade");
        assert_eq!(styled.color, TextColor::parse("aqua"));
        assert_eq!(styled.italic, Some(false));
    }

    #[test]
    fn string_tag_holding_json_is_decoded() {
        let tag = snbt::parse(r#"'{"text":"Named","color":"red"}'"#).unwrap();
        assert_eq!(TextNode::from_tag(&tag), TextNode::colored("Named", TextColor::from_rgb(0xFF5555)));
        let literal = snbt::parse(r#""plain words""#).unwrap();
        assert_eq!(TextNode::from_tag(&literal), TextNode::text("plain words"));
    }
}
