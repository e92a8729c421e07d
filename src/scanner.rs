//! Phase 1: Scanner
//!
//! The scanner turns the input byte stream into lines and hands the parser
//! one codepoint at a time. It performs:
//! - line splitting (`\n` or `\r\n`, terminators excluded)
//! - UTF-8 decoding with U+FFFD substitution on bad bytes
//! - BOM handling (skipped at the very start, an error anywhere else)
//! - NUL rejection
//!
//! Encoding problems never abort a parse; they accumulate as
//! [`EncodingError`]s with the line and byte offset they occurred at.

use crate::error::{EncodingError, EncodingErrorKind};

/// End-of-line sentinel stored in `ch` when the current line is exhausted.
pub(crate) const EOL: char = '\0';

const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Result of decoding one codepoint from a byte slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Decoded {
    /// No bytes left.
    Empty,
    /// The first byte does not begin a valid UTF-8 sequence; consume one byte.
    Invalid,
    /// A codepoint and its encoded width.
    Char(char, usize),
}

/// Decode the first codepoint of `bytes`.
pub(crate) fn decode_codepoint(bytes: &[u8]) -> Decoded {
    let Some(&b0) = bytes.first() else {
        return Decoded::Empty;
    };
    let width = match b0 {
        0x00..=0x7f => 1,
        0xc2..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf4 => 4,
        _ => return Decoded::Invalid,
    };
    if bytes.len() < width {
        return Decoded::Invalid;
    }
    // from_utf8 rejects overlong encodings and surrogates
    match std::str::from_utf8(&bytes[..width]) {
        Ok(s) => match s.chars().next() {
            Some(c) => Decoded::Char(c, width),
            None => Decoded::Invalid,
        },
        Err(_) => Decoded::Invalid,
    }
}

/// A line-oriented codepoint reader over an in-memory byte slice.
pub(crate) struct Scanner<'a> {
    lines: Vec<&'a [u8]>,
    next: usize,
    line: &'a [u8],
    pos: usize,
    ch: char,
    at_eof: bool,
    errors: Vec<EncodingError>,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8]) -> Scanner<'a> {
        // a BOM is skipped only as the very first codepoint of the input
        let input = input
            .strip_prefix("\u{FEFF}".as_bytes())
            .unwrap_or(input);
        Scanner {
            lines: split_lines(input),
            next: 0,
            line: b"",
            pos: 0,
            ch: EOL,
            at_eof: false,
            errors: Vec::new(),
        }
    }

    /// The current codepoint, or [`EOL`] when the line is exhausted.
    pub fn ch(&self) -> char {
        self.ch
    }

    pub fn at_eol(&self) -> bool {
        self.ch == EOL
    }

    pub fn at_eof(&self) -> bool {
        self.at_eof
    }

    /// The unconsumed remainder of the current line, after the current
    /// codepoint.
    pub fn rest(&self) -> &'a [u8] {
        &self.line[self.pos..]
    }

    /// Advance to the next physical line. Returns false and sets EOF when
    /// there are no more lines.
    pub fn next_line(&mut self) -> bool {
        if self.next >= self.lines.len() {
            self.at_eof = true;
            self.line = b"";
            self.pos = 0;
            self.ch = EOL;
            return false;
        }
        self.line = self.lines[self.next];
        self.next += 1;
        self.pos = 0;
        self.ch = EOL;
        true
    }

    /// Decode the next codepoint of the current line into `ch`. Returns
    /// false at end of line.
    pub fn next_char(&mut self) -> bool {
        match decode_codepoint(self.rest()) {
            Decoded::Empty => {
                self.ch = EOL;
                false
            }
            Decoded::Invalid => {
                self.error(EncodingErrorKind::InvalidUtf8Encoding);
                self.ch = REPLACEMENT;
                self.pos += 1;
                true
            }
            Decoded::Char(c, w) => {
                self.ch = match c {
                    '\0' => {
                        self.error(EncodingErrorKind::IllegalNul);
                        REPLACEMENT
                    }
                    BOM => {
                        self.error(EncodingErrorKind::IllegalBom);
                        REPLACEMENT
                    }
                    _ => c,
                };
                self.pos += w;
                true
            }
        }
    }

    /// The codepoint following the current one, without advancing.
    pub fn peek(&self) -> Option<char> {
        match decode_codepoint(self.rest()) {
            Decoded::Char(c, _) => Some(c),
            _ => None,
        }
    }

    pub fn peek_equals(&self, want: char) -> bool {
        self.peek() == Some(want)
    }

    /// Like [`Scanner::peek_equals`] but one codepoint further ahead.
    pub fn peek2_equals(&self, want: char) -> bool {
        match decode_codepoint(self.rest()) {
            Decoded::Char(_, w) => {
                matches!(decode_codepoint(&self.rest()[w..]), Decoded::Char(c, _) if c == want)
            }
            _ => false,
        }
    }

    /// Zero-based index of the current line.
    pub fn line_index(&self) -> usize {
        self.next.saturating_sub(1)
    }

    pub fn take_errors(&mut self) -> Vec<EncodingError> {
        std::mem::take(&mut self.errors)
    }

    fn error(&mut self, kind: EncodingErrorKind) {
        self.errors.push(EncodingError {
            kind,
            line: self.line_index(),
            offset: self.pos,
        });
    }
}

/// Split input into lines the way the parser sees them: `\n`-separated,
/// `\r` stripped, no phantom line after a trailing terminator.
fn split_lines(input: &[u8]) -> Vec<&[u8]> {
    if input.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&[u8]> = input.split(|&b| b == b'\n').collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
        .into_iter()
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(input: &[u8]) -> (Vec<String>, Vec<EncodingError>) {
        let mut s = Scanner::new(input);
        let mut lines = Vec::new();
        while s.next_line() {
            let mut line = String::new();
            while s.next_char() {
                line.push(s.ch());
            }
            lines.push(line);
        }
        (lines, s.take_errors())
    }

    #[test]
    fn test_empty_input() {
        let (lines, errors) = drain(b"");
        assert!(lines.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_line_terminators() {
        let (lines, _) = drain(b"a\nb\r\nc");
        assert_eq!(lines, ["a", "b", "c"]);
        let (lines, _) = drain(b"a\n");
        assert_eq!(lines, ["a"]);
        let (lines, _) = drain(b"\n");
        assert_eq!(lines, [""]);
    }

    #[test]
    fn test_bom_skipped_at_start() {
        let (lines, errors) = drain("\u{FEFF}a".as_bytes());
        assert_eq!(lines, ["a"]);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_bom_error_elsewhere() {
        let (lines, errors) = drain("a\u{FEFF}b".as_bytes());
        assert_eq!(lines, ["a\u{FFFD}b"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, EncodingErrorKind::IllegalBom);
        assert_eq!(errors[0].line, 0);
        assert_eq!(errors[0].offset, 1);
    }

    #[test]
    fn test_nul_replaced() {
        let (lines, errors) = drain(b"a\x00b");
        assert_eq!(lines, ["a\u{FFFD}b"]);
        assert_eq!(errors[0].kind, EncodingErrorKind::IllegalNul);
    }

    #[test]
    fn test_invalid_utf8_consumes_one_byte() {
        let (lines, errors) = drain(b"a\x80b");
        assert_eq!(lines, ["a\u{FFFD}b"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, EncodingErrorKind::InvalidUtf8Encoding);
        assert_eq!(errors[0].offset, 1);
    }

    #[test]
    fn test_truncated_sequence_at_eol() {
        // lead byte of a 2-byte sequence with nothing after it
        let (lines, errors) = drain(b"a\xc3");
        assert_eq!(lines, ["a\u{FFFD}"]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_peek() {
        let mut s = Scanner::new(b"ab");
        s.next_line();
        s.next_char();
        assert_eq!(s.ch(), 'a');
        assert!(s.peek_equals('b'));
        assert!(!s.peek2_equals('b'));
        s.next_char();
        assert_eq!(s.ch(), 'b');
        assert!(!s.peek_equals('b'));
        assert!(!s.next_char());
        assert!(s.at_eol());
    }

    #[test]
    fn test_multibyte() {
        let (lines, errors) = drain("á→𝄞".as_bytes());
        assert_eq!(lines, ["á→𝄞"]);
        assert!(errors.is_empty());
    }
}
