//! The Quill node tree.
//!
//! One closed enum per category: [`Block`] and [`Inline`]. A block's
//! children are either blocks or inlines, never mixed, and verbatim blocks
//! hold raw byte lines that are never scanned for nested content.

/// A block-level node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Block {
    /// A logical line of inline content. May span several physical lines.
    Line { name: String, children: Vec<Inline> },
    /// A block whose continuation lines repeat the delimiter as prefix.
    Walled { name: String, children: Vec<Block> },
    /// A block whose continuation lines hang past the opener's columns.
    /// `rank` is present for ranked elements only.
    Hanging {
        name: String,
        rank: Option<u32>,
        children: Vec<Block>,
    },
    /// A hanging block whose body is raw lines.
    HangingVerbatim {
        name: String,
        rank: Option<u32>,
        lines: Vec<Vec<u8>>,
    },
    /// A fence-delimited verbatim block. `trailing_text` holds characters
    /// that followed the closing fence on its line, if any.
    Fenced {
        name: String,
        lines: Vec<Vec<u8>>,
        trailing_text: Option<Vec<u8>>,
    },
    /// A one-line verbatim block; the remainder of the opening line.
    VerbatimLine { name: String, content: Vec<u8> },
    /// A walled block whose per-line content is raw, with one space after
    /// the wall stripped.
    VerbatimWalled { name: String, lines: Vec<Vec<u8>> },
    /// Consecutive annotation lines attached to the following sibling.
    Hat {
        lines: Vec<Vec<u8>>,
        block: Option<Box<Block>>,
    },
}

/// An inline node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inline {
    /// An atomic run of text.
    Text(Vec<u8>),
    /// `//` to end of line.
    LineComment(Vec<u8>),
    /// A span delimited by doubled codepoints, closed by the doubled
    /// mirror of the opener.
    Uniform { name: String, children: Vec<Inline> },
    /// A span whose content is verbatim until the matching closer.
    Escaped { name: String, content: Vec<u8> },
    /// A one- or two-part span: `<content>` or `<children><content>`.
    Forward {
        name: String,
        content: Vec<u8>,
        children: Vec<Inline>,
    },
}

impl Block {
    /// The node's name. Hats have no configured name and report `"Hat"`.
    pub fn name(&self) -> &str {
        match self {
            Block::Line { name, .. }
            | Block::Walled { name, .. }
            | Block::Hanging { name, .. }
            | Block::HangingVerbatim { name, .. }
            | Block::Fenced { name, .. }
            | Block::VerbatimLine { name, .. }
            | Block::VerbatimWalled { name, .. } => name,
            Block::Hat { .. } => "Hat",
        }
    }

    /// Child blocks, for variants that have them.
    pub fn block_children(&self) -> Option<&[Block]> {
        match self {
            Block::Walled { children, .. } | Block::Hanging { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Child inlines, for variants that have them.
    pub fn inline_children(&self) -> Option<&[Inline]> {
        match self {
            Block::Line { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Raw body lines, for verbatim variants.
    pub fn raw_lines(&self) -> Option<&[Vec<u8>]> {
        match self {
            Block::HangingVerbatim { lines, .. }
            | Block::Fenced { lines, .. }
            | Block::VerbatimWalled { lines, .. } => Some(lines),
            Block::Hat { lines, .. } => Some(lines),
            _ => None,
        }
    }

    /// Raw content of a one-line verbatim block.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Block::VerbatimLine { content, .. } => Some(content),
            _ => None,
        }
    }

    /// Text after the closing fence, for fenced blocks that were closed
    /// with trailing characters.
    pub fn trailing_text(&self) -> Option<&[u8]> {
        match self {
            Block::Fenced { trailing_text, .. } => trailing_text.as_deref(),
            _ => None,
        }
    }

    /// The first raw line of a fenced block.
    pub fn head(&self) -> Option<&[u8]> {
        match self {
            Block::Fenced { lines, .. } => lines.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// The raw lines of a fenced block after the first, joined with `\n`.
    pub fn body(&self) -> Option<Vec<u8>> {
        match self {
            Block::Fenced { lines, .. } => {
                if lines.is_empty() {
                    return None;
                }
                Some(lines[1..].join(&b'\n'))
            }
            _ => None,
        }
    }

    /// The rank of a ranked hanging block.
    pub fn rank(&self) -> Option<u32> {
        match self {
            Block::Hanging { rank, .. } | Block::HangingVerbatim { rank, .. } => *rank,
            _ => None,
        }
    }
}

impl Inline {
    pub fn name(&self) -> &str {
        match self {
            Inline::Text(_) => "Text",
            Inline::LineComment(_) => "LineComment",
            Inline::Uniform { name, .. }
            | Inline::Escaped { name, .. }
            | Inline::Forward { name, .. } => name,
        }
    }

    /// Content bytes, for text-carrying variants.
    pub fn content(&self) -> Option<&[u8]> {
        match self {
            Inline::Text(content) | Inline::LineComment(content) => Some(content),
            Inline::Escaped { content, .. } | Inline::Forward { content, .. } => Some(content),
            Inline::Uniform { .. } => None,
        }
    }

    /// Child inlines, for variants that have them.
    pub fn inline_children(&self) -> Option<&[Inline]> {
        match self {
            Inline::Uniform { children, .. } => Some(children),
            Inline::Forward { children, .. } if !children.is_empty() => Some(children),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_name() {
        let b = Block::Walled {
            name: "Blockquote".into(),
            children: Vec::new(),
        };
        assert_eq!(b.name(), "Blockquote");
        let h = Block::Hat {
            lines: Vec::new(),
            block: None,
        };
        assert_eq!(h.name(), "Hat");
    }

    #[test]
    fn test_fenced_head_body() {
        let f = Block::Fenced {
            name: "CodeBlock".into(),
            lines: vec![b"go".to_vec(), b"a".to_vec(), b"b".to_vec()],
            trailing_text: None,
        };
        assert_eq!(f.head(), Some(&b"go"[..]));
        assert_eq!(f.body(), Some(b"a\nb".to_vec()));
        let empty = Block::Fenced {
            name: "CodeBlock".into(),
            lines: Vec::new(),
            trailing_text: None,
        };
        assert_eq!(empty.head(), None);
        assert_eq!(empty.body(), None);
    }

    #[test]
    fn test_inline_content() {
        let t = Inline::Text(b"a".to_vec());
        assert_eq!(t.name(), "Text");
        assert_eq!(t.content(), Some(&b"a"[..]));
        let u = Inline::Uniform {
            name: "Strong".into(),
            children: vec![t],
        };
        assert_eq!(u.content(), None);
        assert_eq!(u.inline_children().map(<[Inline]>::len), Some(1));
    }
}
