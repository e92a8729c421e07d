//! Quill parser implementation.
//!
//! Quill is a configurable lightweight markup language: an element table
//! maps delimiters to block and inline behaviors, and the parser turns a
//! UTF-8 byte stream into a tree of block and inline nodes driven by that
//! table.
//!
//! # Parsing Pipeline
//!
//! The parser operates in two phases:
//!
//! 1. **Scanner**: Splits the input into lines and yields one codepoint at
//!    a time, validating encoding and recovering from bad bytes with
//!    U+FFFD.
//!
//! 2. **Parser**: A single line-oriented pass that tracks the open-block
//!    prefix stack and the open-inline delimiter stack, producing the node
//!    tree.
//!
//! Encoding problems never abort a parse; they are returned alongside the
//! tree. Element-table problems are fatal and reported before any parse
//! work begins.

mod element;
mod error;
mod node;
mod parser;
mod scanner;

pub use element::{Category, Element, ElementSet, ElementType};
pub use error::{ConfigError, EncodingError, EncodingErrorKind};
pub use node::{Block, Inline};

/// Parse a Quill document with the default element table.
///
/// # Example
///
/// ```
/// use libquill::parse;
///
/// let (blocks, errors) = parse(b">quoted");
/// assert!(errors.is_empty());
/// assert_eq!(blocks[0].name(), "Blockquote");
/// ```
pub fn parse(input: &[u8]) -> (Vec<Block>, Vec<EncodingError>) {
    parser::parse_with_set(input, &ElementSet::default_set())
}

/// Parse a Quill document with a custom element table.
///
/// Returns a [`ConfigError`] without parsing anything when the table is
/// invalid.
pub fn parse_with_elements(
    input: &[u8],
    elements: &[Element],
) -> Result<(Vec<Block>, Vec<EncodingError>), ConfigError> {
    let set = ElementSet::new(elements)?;
    Ok(parser::parse_with_set(input, &set))
}

/// Parse a Quill document with a prebuilt registry. Useful when one table
/// drives many parses.
pub fn parse_with_element_set(input: &[u8], set: &ElementSet) -> (Vec<Block>, Vec<EncodingError>) {
    parser::parse_with_set(input, set)
}
