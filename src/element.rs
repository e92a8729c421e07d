//! Element descriptors and the frozen registry.
//!
//! Elements are the external configuration surface: each one names a node,
//! picks a parsing behavior ([`ElementType`]), and binds a delimiter. The
//! parser consults a frozen [`ElementSet`] built once, up front; table
//! problems are fatal [`ConfigError`]s raised before any parse work.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Parsing behavior of an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementType {
    // blocks
    Line,
    Walled,
    Hanging,
    RankedHanging,
    Fenced,
    VerbatimLine,
    VerbatimWalled,
    Hat,

    // inlines
    Text,
    Uniform,
    Escaped,
    Forward,
}

/// Category of an element, derived from its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Block,
    Inline,
}

impl ElementType {
    pub fn category(self) -> Category {
        match self {
            ElementType::Line
            | ElementType::Walled
            | ElementType::Hanging
            | ElementType::RankedHanging
            | ElementType::Fenced
            | ElementType::VerbatimLine
            | ElementType::VerbatimWalled
            | ElementType::Hat => Category::Block,
            ElementType::Text | ElementType::Uniform | ElementType::Escaped
            | ElementType::Forward => Category::Inline,
        }
    }
}

/// A configured element.
///
/// Block delimiters are strings of one or more codepoints; inline
/// delimiters use only the leading codepoint of the string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    #[serde(rename = "type")]
    pub typ: ElementType,
    pub delimiter: String,
    /// Hanging variants only: the body is raw lines.
    #[serde(default)]
    pub verbatim: bool,
    /// Ranked hanging only: the opener run must be at least this long to
    /// activate, else the line falls through to plain text.
    #[serde(default = "default_min_rank")]
    pub min_rank: u32,
}

fn default_min_rank() -> u32 {
    1
}

impl Element {
    pub fn new(name: &str, typ: ElementType, delimiter: &str) -> Element {
        Element {
            name: name.into(),
            typ,
            delimiter: delimiter.into(),
            verbatim: false,
            min_rank: 1,
        }
    }

    /// The default element table.
    pub fn defaults() -> Vec<Element> {
        vec![
            Element::new("Paragraph", ElementType::Walled, "|"),
            Element::new("Blockquote", ElementType::Walled, ">"),
            Element::new("DescriptionList", ElementType::Hanging, "*"),
            Element::new("CodeBlock", ElementType::Fenced, "`"),
            Element::new("Emphasis", ElementType::Uniform, "_"),
            Element::new("Strong", ElementType::Uniform, "*"),
            Element::new("Code", ElementType::Escaped, "`"),
            Element::new("Link", ElementType::Forward, "<"),
        ]
    }
}

/// A frozen lookup table of elements: blocks by delimiter string, inlines
/// by the leading codepoint of their delimiter.
#[derive(Clone, Debug, Default)]
pub struct ElementSet {
    blocks: HashMap<String, Element>,
    inlines: HashMap<char, Element>,
}

impl ElementSet {
    pub fn new(elements: &[Element]) -> Result<ElementSet> {
        let mut set = ElementSet::default();
        for el in elements {
            match el.typ.category() {
                Category::Block => {
                    if el.delimiter.is_empty() {
                        return Err(ConfigError::InvalidDelimiterEncoding {
                            element: el.name.clone(),
                        });
                    }
                    if set.blocks.contains_key(&el.delimiter) {
                        return Err(ConfigError::DuplicateDelimiter {
                            element: el.name.clone(),
                            delimiter: el.delimiter.clone(),
                        });
                    }
                    set.blocks.insert(el.delimiter.clone(), el.clone());
                }
                Category::Inline => {
                    let Some(delim) = el.delimiter.chars().next() else {
                        return Err(ConfigError::InvalidDelimiterEncoding {
                            element: el.name.clone(),
                        });
                    };
                    if set.inlines.contains_key(&delim) {
                        return Err(ConfigError::DuplicateDelimiter {
                            element: el.name.clone(),
                            delimiter: delim.to_string(),
                        });
                    }
                    set.inlines.insert(delim, el.clone());
                }
            }
        }
        Ok(set)
    }

    /// The registry for [`Element::defaults`].
    pub fn default_set() -> ElementSet {
        let mut set = ElementSet::default();
        for el in Element::defaults() {
            match el.typ.category() {
                Category::Block => {
                    set.blocks.insert(el.delimiter.clone(), el);
                }
                Category::Inline => {
                    // defaults are single-codepoint; chars() is never empty here
                    if let Some(delim) = el.delimiter.chars().next() {
                        set.inlines.insert(delim, el);
                    }
                }
            }
        }
        set
    }

    /// The block element whose delimiter is a prefix of the current
    /// codepoint followed by the rest of the line. The longest delimiter
    /// wins; duplicates are rejected at construction, so the winner is
    /// unique.
    pub fn match_block(&self, ch: char, rest: &[u8]) -> Option<&Element> {
        let mut found: Option<&Element> = None;
        for (delimiter, el) in &self.blocks {
            if !delimiter_matches(delimiter, ch, rest) {
                continue;
            }
            if found.map_or(true, |f| delimiter.len() > f.delimiter.len()) {
                found = Some(el);
            }
        }
        found
    }

    /// The inline element registered for this leading codepoint.
    pub fn inline(&self, ch: char) -> Option<&Element> {
        self.inlines.get(&ch)
    }
}

fn delimiter_matches(delimiter: &str, ch: char, rest: &[u8]) -> bool {
    let mut chars = delimiter.chars();
    if chars.next() != Some(ch) {
        return false;
    }
    rest.starts_with(chars.as_str().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_block_delimiter() {
        let elements = [
            Element::new("A", ElementType::Walled, ">"),
            Element::new("B", ElementType::Hanging, ">"),
        ];
        assert!(matches!(
            ElementSet::new(&elements),
            Err(ConfigError::DuplicateDelimiter { .. })
        ));
    }

    #[test]
    fn test_duplicate_inline_leading_codepoint() {
        let elements = [
            Element::new("A", ElementType::Uniform, "*"),
            Element::new("B", ElementType::Escaped, "*"),
        ];
        assert!(matches!(
            ElementSet::new(&elements),
            Err(ConfigError::DuplicateDelimiter { .. })
        ));
    }

    #[test]
    fn test_empty_delimiter_rejected() {
        let elements = [Element::new("A", ElementType::Walled, "")];
        assert!(matches!(
            ElementSet::new(&elements),
            Err(ConfigError::InvalidDelimiterEncoding { .. })
        ));
    }

    #[test]
    fn test_block_and_inline_namespaces_are_separate() {
        // the default table reuses "*" and "`" across categories
        assert!(ElementSet::new(&Element::defaults()).is_ok());
    }

    #[test]
    fn test_longest_block_match_wins() {
        let elements = [
            Element::new("Title", ElementType::Hanging, "="),
            Element::new("Heading", ElementType::RankedHanging, "=="),
        ];
        let set = ElementSet::new(&elements).unwrap();
        assert_eq!(set.match_block('=', b"=a").unwrap().name, "Heading");
        assert_eq!(set.match_block('=', b"a").unwrap().name, "Title");
        assert_eq!(set.match_block('=', b"").unwrap().name, "Title");
        assert!(set.match_block('-', b"").is_none());
    }

    #[test]
    fn test_multi_codepoint_delimiter() {
        let elements = [Element::new("Image", ElementType::VerbatimLine, ".image")];
        let set = ElementSet::new(&elements).unwrap();
        assert!(set.match_block('.', b"image url").is_some());
        assert!(set.match_block('.', b"imag").is_none());
    }

    #[test]
    fn test_element_table_deserializes() {
        let json = r#"{
            "name": "Heading",
            "type": "RankedHanging",
            "delimiter": "=="
        }"#;
        let el: Element = serde_json::from_str(json).unwrap();
        assert_eq!(el.typ, ElementType::RankedHanging);
        assert_eq!(el.min_rank, 1);
        assert!(!el.verbatim);
    }
}
