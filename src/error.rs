//! Error types for Quill parsing.

use thiserror::Error;

/// Result type for element-table validation.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Kinds of recoverable encoding errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodingErrorKind {
    /// A byte was not a valid UTF-8 lead or continuation byte.
    InvalidUtf8Encoding,
    /// A NUL byte appeared in the input.
    IllegalNul,
    /// U+FEFF appeared anywhere other than at the start of the first line.
    IllegalBom,
}

impl std::fmt::Display for EncodingErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            EncodingErrorKind::InvalidUtf8Encoding => "invalid UTF-8 encoding",
            EncodingErrorKind::IllegalNul => "illegal character NUL",
            EncodingErrorKind::IllegalBom => "illegal byte order mark",
        };
        f.write_str(msg)
    }
}

/// A recoverable encoding error.
///
/// The parser substitutes U+FFFD at the affected position and keeps going;
/// these are collected in source order and returned alongside the tree.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{kind} at line {line}, byte {offset}")]
pub struct EncodingError {
    pub kind: EncodingErrorKind,
    /// Zero-based index of the line the error occurred on.
    pub line: usize,
    /// Byte offset of the offending byte within the line.
    pub offset: usize,
}

/// A fatal element-table error, raised during registry construction before
/// any parse work begins.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Two block elements share a delimiter string, or two inline elements
    /// share a leading delimiter codepoint.
    #[error("duplicate delimiter {delimiter:?} (element {element:?})")]
    DuplicateDelimiter { element: String, delimiter: String },

    /// An element's delimiter is empty or does not decode to the codepoints
    /// its type requires.
    #[error("invalid delimiter encoding (element {element:?})")]
    InvalidDelimiterEncoding { element: String },
}
