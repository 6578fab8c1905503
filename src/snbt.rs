//! Parser for the nested-tag notation used by item component values.
//!
//! Covers compounds, lists, typed arrays, quoted/unquoted strings, booleans and suffixed numbers.
//! Anything else is reported as [`SnbtError`]; callers treat a failed parse as "component absent".

use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    List(Vec<Tag>),
    Compound(Vec<(String, Tag)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnbtError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },
    #[error("trailing input at offset {0}")]
    TrailingInput(usize),
    #[error("empty key at offset {0}")]
    EmptyKey(usize),
    #[error("nesting too deep at offset {0}")]
    TooDeep(usize),
}

/// Compounds and lists nested deeper than this are rejected.
pub const MAX_DEPTH: usize = 512;

impl Tag {
    pub fn get(&self, key: &str) -> Option<&Tag> {
        match self {
            Tag::Compound(entries) => entries.iter().find(|(name, _)| name == key).map(|(_, tag)| tag),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tag::String(value) => Some(value),
            _ => None,
        }
    }

    /// Truthiness as the game reads it: non-zero numbers and the literal `true`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tag::Byte(v) => Some(*v != 0),
            Tag::Short(v) => Some(*v != 0),
            Tag::Int(v) => Some(*v != 0),
            Tag::Long(v) => Some(*v != 0),
            Tag::String(v) if v.eq_ignore_ascii_case("true") => Some(true),
            Tag::String(v) if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Tag::List(items) => items.is_empty(),
            Tag::Compound(entries) => entries.is_empty(),
            Tag::String(value) => value.is_empty(),
            _ => false,
        }
    }
}

pub fn parse(input: &str) -> Result<Tag, SnbtError> {
    let mut parser = Parser { input, chars: input.char_indices().peekable(), depth: 0 };
    let tag = parser.value()?;
    parser.skip_whitespace();
    match parser.chars.peek() {
        Some(&(offset, _)) => Err(SnbtError::TrailingInput(offset)),
        None => Ok(tag),
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn peek(&mut self) -> Result<(usize, char), SnbtError> {
        self.skip_whitespace();
        self.chars.peek().copied().ok_or(SnbtError::UnexpectedEnd)
    }

    fn expect(&mut self, expected: char) -> Result<(), SnbtError> {
        let (offset, found) = self.peek()?;
        if found != expected {
            return Err(SnbtError::Unexpected { found, offset });
        }
        self.chars.next();
        Ok(())
    }

    fn value(&mut self) -> Result<Tag, SnbtError> {
        let (offset, c) = self.peek()?;
        match c {
            '{' | '[' => self.nested(offset, c),
            '"' | '\'' => Ok(Tag::String(self.quoted()?)),
            c if is_unquoted(c) => Ok(scalar(self.unquoted())),
            found => Err(SnbtError::Unexpected { found, offset }),
        }
    }

    fn nested(&mut self, offset: usize, open: char) -> Result<Tag, SnbtError> {
        if self.depth >= MAX_DEPTH {
            return Err(SnbtError::TooDeep(offset));
        }
        self.depth += 1;
        let tag = if open == '{' { self.compound() } else { self.list() };
        self.depth -= 1;
        tag
    }

    fn compound(&mut self) -> Result<Tag, SnbtError> {
        self.expect('{')?;
        let mut entries = Vec::new();
        if self.peek()?.1 == '}' {
            self.chars.next();
            return Ok(Tag::Compound(entries));
        }
        loop {
            let (offset, c) = self.peek()?;
            let key = if c == '"' || c == '\'' { self.quoted()? } else { self.unquoted().to_string() };
            if key.is_empty() {
                return Err(SnbtError::EmptyKey(offset));
            }
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            let (offset, c) = self.peek()?;
            self.chars.next();
            match c {
                ',' => continue,
                '}' => return Ok(Tag::Compound(entries)),
                found => return Err(SnbtError::Unexpected { found, offset }),
            }
        }
    }

    fn list(&mut self) -> Result<Tag, SnbtError> {
        self.expect('[')?;
        self.skip_typed_array_prefix();
        let mut items = Vec::new();
        if self.peek()?.1 == ']' {
            self.chars.next();
            return Ok(Tag::List(items));
        }
        loop {
            items.push(self.value()?);
            let (offset, c) = self.peek()?;
            self.chars.next();
            match c {
                ',' => continue,
                ']' => return Ok(Tag::List(items)),
                found => return Err(SnbtError::Unexpected { found, offset }),
            }
        }
    }

    // `[B; 1b, 2b]`, `[I; ...]`, `[L; ...]` are read as plain lists.
    fn skip_typed_array_prefix(&mut self) {
        let rest = match self.chars.peek() {
            Some(&(offset, _)) => &self.input[offset..],
            None => return,
        };
        let mut prefix = rest.chars();
        if let (Some('B' | 'I' | 'L'), Some(';')) = (prefix.next(), prefix.next()) {
            self.chars.next();
            self.chars.next();
        }
    }

    fn quoted(&mut self) -> Result<String, SnbtError> {
        let (_, quote) = self.chars.next().ok_or(SnbtError::UnexpectedEnd)?;
        let mut out = String::new();
        loop {
            let (_, c) = self.chars.next().ok_or(SnbtError::UnexpectedEnd)?;
            match c {
                '\\' => {
                    let (_, escaped) = self.chars.next().ok_or(SnbtError::UnexpectedEnd)?;
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        other => out.push(other),
                    }
                }
                c if c == quote => return Ok(out),
                c => out.push(c),
            }
        }
    }

    fn unquoted(&mut self) -> &'a str {
        self.skip_whitespace();
        let start = match self.chars.peek() {
            Some(&(offset, _)) => offset,
            None => return "",
        };
        let mut end = start;
        while let Some(&(offset, c)) = self.chars.peek() {
            if !is_unquoted(c) {
                break;
            }
            end = offset + c.len_utf8();
            self.chars.next();
        }
        &self.input[start..end]
    }
}

fn is_unquoted(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+' | ':')
}

fn scalar(token: &str) -> Tag {
    match token {
        "true" => return Tag::Byte(1),
        "false" => return Tag::Byte(0),
        _ => {}
    }
    let (body, suffix) = match token.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&token[..idx], Some(c.to_ascii_lowercase())),
        _ => (token, None),
    };
    let parsed = match suffix {
        Some('b') => body.parse().ok().map(Tag::Byte),
        Some('s') => body.parse().ok().map(Tag::Short),
        Some('l') => body.parse().ok().map(Tag::Long),
        Some('f') => body.parse().ok().map(Tag::Float),
        Some('d') => body.parse().ok().map(Tag::Double),
        None if !body.contains(['.', 'e', 'E']) => body.parse().ok().map(Tag::Int),
        None => body.parse().ok().map(Tag::Double),
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| Tag::String(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_compound() {
        let tag = parse(r#"{levels:{"minecraft:sharpness":5,'minecraft:unbreaking':3b}}"#).unwrap();
        let levels = tag.get("levels").expect("levels");
        assert_eq!(levels.get("minecraft:sharpness"), Some(&Tag::Int(5)));
        assert_eq!(levels.get("minecraft:unbreaking"), Some(&Tag::Byte(3)));
    }

    #[test]
    fn parses_scalars_with_suffixes() {
        assert_eq!(parse("true").unwrap(), Tag::Byte(1));
        assert_eq!(parse("0b").unwrap(), Tag::Byte(0));
        assert_eq!(parse("12s").unwrap(), Tag::Short(12));
        assert_eq!(parse("7L").unwrap(), Tag::Long(7));
        assert_eq!(parse("1.5f").unwrap(), Tag::Float(1.5));
        assert_eq!(parse("2.5").unwrap(), Tag::Double(2.5));
        assert_eq!(parse("minecraft:stone").unwrap(), Tag::String("minecraft:stone".into()));
    }

    #[test]
    fn parses_lists_and_typed_arrays() {
        assert_eq!(parse("[]").unwrap(), Tag::List(vec![]));
        assert_eq!(parse("[I; 1, 2]").unwrap(), Tag::List(vec![Tag::Int(1), Tag::Int(2)]));
        let lore = parse(r#"['"first"', '{"text":"second"}']"#).unwrap();
        assert_eq!(
            lore,
            Tag::List(vec![Tag::String("\"first\"".into()), Tag::String("{\"text\":\"second\"}".into())])
        );
    }

    #[test]
    fn quoted_strings_unescape() {
        assert_eq!(parse(r#""a\"b""#).unwrap(), Tag::String("a\"b".into()));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(parse("{levels:").is_err());
        assert!(parse("{a:1}}").is_err());
        assert!(parse("{:1}").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn runaway_nesting_is_rejected_without_recursing() {
        assert_eq!(parse(&"[".repeat(200_000)), Err(SnbtError::TooDeep(MAX_DEPTH)));
        let compounds = "{a:".repeat(MAX_DEPTH + 1);
        assert!(matches!(parse(&compounds), Err(SnbtError::TooDeep(_))));
    }

    #[test]
    fn deep_but_bounded_nesting_parses() {
        let depth = 100;
        let input = format!("{}1{}", "[".repeat(depth), "]".repeat(depth));
        let mut tag = &parse(&input).unwrap();
        for _ in 0..depth {
            let Tag::List(items) = tag else { panic!("expected list, got {tag:?}") };
            tag = &items[0];
        }
        assert_eq!(tag, &Tag::Int(1));
    }
}
