//! Phase 2: Block & inline parser
//!
//! A single pass over the scanner's lines drives two cooperating state
//! machines:
//!
//! - The block machine keeps a stack of required codepoints, one run per
//!   open block: walled blocks contribute their literal delimiter, hanging
//!   blocks one space per opener column. At each line start `parse_lead`
//!   consumes the longest matching prefix and `continues` judges, by
//!   display columns (tab = 8), whether the line still belongs to every
//!   open block.
//! - The inline machine keeps a stack of open delimiter pairs and runs
//!   inside line elements. Line elements span physical lines as long as
//!   the block context continues and no block construct starts the next
//!   line; text runs join across the break with a single space.
//!
//! Both stacks restore through with-closures on every return path.

use log::trace;

use crate::element::{Element, ElementSet, ElementType};
use crate::error::EncodingError;
use crate::node::{Block, Inline};
use crate::scanner::{decode_codepoint, Decoded, Scanner};

const TAB_WIDTH: usize = 8;

/// Absent escape codepoint in an inline stack entry.
const NONE: char = '\0';

pub(crate) fn parse_with_set(input: &[u8], set: &ElementSet) -> (Vec<Block>, Vec<EncodingError>) {
    let mut parser = Parser::new(input, set);
    let blocks = parser.parse_blocks(0);
    let errors = parser.scanner.take_errors();
    (blocks, errors)
}

struct Parser<'a> {
    scanner: Scanner<'a>,
    set: &'a ElementSet,

    /// Required line prefix of every open block, flattened.
    blocks: Vec<char>,
    /// Prefix actually consumed on the current line.
    lead: Vec<char>,
    /// Whether the current line holds any non-spacing codepoint.
    filled: bool,
    /// Consecutive blank lines staged in the current context.
    blanks: usize,

    /// Open inline spans as (delimiter, escape-or-NONE).
    inlines: Vec<(char, char)>,
    /// The current line element is over; inline loops unwind.
    line_ended: bool,
    /// A joining space is owed to the next text run.
    pending_space: bool,
}

impl<'a> Parser<'a> {
    fn new(input: &'a [u8], set: &'a ElementSet) -> Parser<'a> {
        let mut parser = Parser {
            scanner: Scanner::new(input),
            set,
            blocks: Vec::new(),
            lead: Vec::new(),
            filled: false,
            blanks: 0,
            inlines: Vec::new(),
            line_ended: false,
            pending_space: false,
        };
        parser.scanner.next_line();
        parser.scanner.next_char();
        parser.parse_lead();
        parser
    }

    fn ch(&self) -> char {
        self.scanner.ch()
    }

    fn at_eol(&self) -> bool {
        self.scanner.at_eol()
    }

    // ========================================================================
    // Block context stack
    // ========================================================================

    /// Run `f` with `required` pushed onto the open-block stack; the stack
    /// is restored on return.
    fn with_open<T>(&mut self, required: &[char], f: impl FnOnce(&mut Parser<'a>) -> T) -> T {
        let depth = self.blocks.len();
        self.blocks.extend_from_slice(required);
        let out = f(self);
        self.blocks.truncate(depth);
        out
    }

    /// Whether the current line's lead satisfies the first `depth` required
    /// codepoints. Non-spacing codepoints must match exactly; a spacing run
    /// is satisfied by any spacing run of at least the same display-column
    /// width.
    fn continues(&self, depth: usize) -> bool {
        let required = &self.blocks[..depth];
        let mut i = 0;
        let mut j = 0;
        loop {
            if i >= required.len() {
                return true;
            }
            if j >= self.lead.len() {
                return false;
            }
            if is_spacing(required[i]) || is_spacing(self.lead[j]) {
                let mut want = 0;
                while i < required.len() && is_spacing(required[i]) {
                    want += spacing_width(required[i]);
                    i += 1;
                }
                let mut got = 0;
                while j < self.lead.len() && is_spacing(self.lead[j]) {
                    got += spacing_width(self.lead[j]);
                    j += 1;
                }
                if got < want {
                    return false;
                }
                continue;
            }
            if required[i] != self.lead[j] {
                return false;
            }
            i += 1;
            j += 1;
        }
    }

    fn only_spacing_required(&self, depth: usize) -> bool {
        self.blocks[..depth].iter().copied().all(is_spacing)
    }

    /// Consume the longest prefix of required codepoints and interleaved
    /// spacing at the start of a line. Spacing requirements are skipped
    /// over when matching literals; their column widths are judged by
    /// [`Parser::continues`].
    fn parse_lead(&mut self) {
        let mut i = 0;
        while !self.at_eol() {
            let ch = self.ch();
            if !is_spacing(ch) {
                self.filled = true;
                let mut j = i;
                while j < self.blocks.len() && is_spacing(self.blocks[j]) {
                    j += 1;
                }
                if j < self.blocks.len() && self.blocks[j] == ch {
                    i = j + 1;
                } else {
                    break;
                }
            }
            self.lead.push(ch);
            self.scanner.next_char();
        }
    }

    /// Like [`Parser::parse_lead`] but stops as soon as every required
    /// codepoint has been matched, leaving the rest of the line untouched.
    /// Used by verbatim walls, whose content must stay raw.
    fn parse_lead_bounded(&mut self) {
        let mut i = 0;
        while !self.at_eol() && i < self.blocks.len() {
            let ch = self.ch();
            if !is_spacing(ch) {
                self.filled = true;
                let mut j = i;
                while j < self.blocks.len() && is_spacing(self.blocks[j]) {
                    j += 1;
                }
                if j < self.blocks.len() && self.blocks[j] == ch {
                    i = j + 1;
                } else {
                    break;
                }
            }
            self.lead.push(ch);
            self.scanner.next_char();
        }
    }

    /// Consume spacing mid-line into the lead.
    fn parse_spacing(&mut self) {
        while is_spacing(self.ch()) {
            self.lead.push(self.ch());
            if !self.scanner.next_char() {
                break;
            }
        }
    }

    /// The trailing spacing run of the current lead.
    fn spacing(&self) -> Vec<char> {
        let start = self
            .lead
            .iter()
            .rposition(|&c| !is_spacing(c))
            .map_or(0, |i| i + 1);
        self.lead[start..].to_vec()
    }

    /// Move to the next physical line and consume its lead. Returns false
    /// at end of input.
    fn advance_line(&mut self) -> bool {
        let more = self.scanner.next_line();
        self.lead.clear();
        self.filled = false;
        self.scanner.next_char();
        self.parse_lead();
        more
    }

    // ========================================================================
    // Block parsing
    // ========================================================================

    /// The main block loop for one context: the first `depth` entries of
    /// the open-block stack are this context's required prefix.
    fn parse_blocks(&mut self, depth: usize) -> Vec<Block> {
        let mut blocks = Vec::new();
        while !self.scanner.at_eof() {
            if is_spacing(self.ch()) {
                self.parse_spacing();
            }
            if self.only_spacing_required(depth) && !self.filled {
                // blank line in a spacing-only context: stage it and move
                // on; ancestors decide what the run of blanks means
                if depth > 0 {
                    self.blanks += 1;
                    trace!("stage blank line ({} staged)", self.blanks);
                }
                self.advance_line();
                continue;
            }
            if !self.continues(depth) {
                break;
            }
            self.blanks = 0;
            if self.at_eol() {
                // nothing on this line beyond the required prefix
                self.advance_line();
                continue;
            }
            blocks.push(self.parse_block());
        }
        blocks
    }

    /// Dispatch on the first non-prefix codepoint of the line.
    fn parse_block(&mut self) -> Block {
        trace!("parse_block at {:?}", self.ch());
        if self.ch() == '\\' {
            // block escape: the rest of the line is ordinary line content
            self.scanner.next_char();
        } else if self.ch() == '%' {
            return self.parse_hat();
        } else if let Some(el) = self.set.match_block(self.ch(), self.scanner.rest()).cloned() {
            match el.typ {
                ElementType::Line => return self.parse_line(&el.name),
                ElementType::Walled => return self.parse_walled(&el.name),
                ElementType::VerbatimWalled => return self.parse_verbatim_walled(&el.name),
                ElementType::VerbatimLine => return self.parse_verbatim_line(&el),
                ElementType::Hanging => return self.parse_hanging(&el),
                ElementType::RankedHanging => {
                    if el.min_rank <= 1 || self.consecutive() >= el.min_rank {
                        return self.parse_hanging(&el);
                    }
                }
                ElementType::Fenced => {
                    // a fence is at least two consecutive delimiters
                    if self.scanner.peek_equals(self.ch()) {
                        return self.parse_fenced(&el.name);
                    }
                }
                ElementType::Hat => return self.parse_hat(),
                ElementType::Text
                | ElementType::Uniform
                | ElementType::Escaped
                | ElementType::Forward => {}
            }
        }
        self.parse_line("Line")
    }

    /// Whether a block construct would activate at the current position.
    /// Used to decide if the next physical line interrupts a line element.
    fn starts_block(&self) -> bool {
        if self.ch() == '%' {
            return true;
        }
        match self.set.match_block(self.ch(), self.scanner.rest()) {
            Some(el) => match el.typ {
                ElementType::RankedHanging => {
                    el.min_rank <= 1 || self.consecutive() >= el.min_rank
                }
                ElementType::Fenced => self.scanner.peek_equals(self.ch()),
                ElementType::Text
                | ElementType::Uniform
                | ElementType::Escaped
                | ElementType::Forward => false,
                _ => true,
            },
            None => false,
        }
    }

    /// Length of the run of the current codepoint, counting the current
    /// one. Stops at the first undecodable byte.
    fn consecutive(&self) -> u32 {
        let ch = self.ch();
        let mut n = 1;
        let mut rest = self.scanner.rest();
        while let Decoded::Char(c, w) = decode_codepoint(rest) {
            if c != ch {
                break;
            }
            n += 1;
            rest = &rest[w..];
        }
        n
    }

    fn parse_walled(&mut self, name: &str) -> Block {
        let delim = self.ch();
        self.lead.push(delim);
        self.scanner.next_char();
        let children = self.with_open(&[delim], |p| {
            let depth = p.blocks.len();
            p.parse_blocks(depth)
        });
        Block::Walled {
            name: name.into(),
            children,
        }
    }

    fn parse_verbatim_walled(&mut self, name: &str) -> Block {
        let delim = self.ch();
        self.lead.push(delim);
        self.scanner.next_char();
        let lines = self.with_open(&[delim], |p| {
            let depth = p.blocks.len();
            let mut lines = Vec::new();
            loop {
                // one space after the wall is decoration, not content
                if p.ch() == ' ' {
                    p.scanner.next_char();
                }
                let mut line = Vec::new();
                while !p.at_eol() {
                    push_char(&mut line, p.ch());
                    p.scanner.next_char();
                }
                lines.push(line);
                if !p.scanner.next_line() {
                    break;
                }
                p.lead.clear();
                p.filled = false;
                p.scanner.next_char();
                p.parse_lead_bounded();
                if !p.continues(depth) {
                    break;
                }
            }
            lines
        });
        Block::VerbatimWalled {
            name: name.into(),
            lines,
        }
    }

    fn parse_hanging(&mut self, el: &Element) -> Block {
        let ranked = el.typ == ElementType::RankedHanging;
        let mut rank = 0u32;
        if ranked {
            let delim = self.ch();
            while self.ch() == delim {
                rank += 1;
                self.lead.push(' ');
                self.scanner.next_char();
            }
        } else {
            for _ in el.delimiter.chars() {
                self.lead.push(' ');
                self.scanner.next_char();
            }
        }
        // everything consumed beyond the parent's requirement becomes the
        // child's additional requirement
        let start = self.blocks.len().min(self.lead.len());
        let opened: Vec<char> = self.lead[start..].to_vec();
        let name = el.name.clone();
        if el.verbatim {
            let lines = self.with_open(&opened, |p| {
                let depth = p.blocks.len();
                p.parse_raw_lines(depth)
            });
            Block::HangingVerbatim {
                name,
                rank: ranked.then_some(rank),
                lines,
            }
        } else {
            let children = self.with_open(&opened, |p| {
                let depth = p.blocks.len();
                p.parse_blocks(depth)
            });
            Block::Hanging {
                name,
                rank: ranked.then_some(rank),
                children,
            }
        }
    }

    /// Body of a hanging verbatim block: raw lines while the context
    /// continues. Trailing blanks are detached for ancestors to judge.
    fn parse_raw_lines(&mut self, depth: usize) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            let mut pushed = 0;
            if self.at_eol() {
                while self.at_eol() && !self.scanner.at_eof() {
                    lines.push(std::mem::take(&mut buf));
                    self.advance_line();
                    pushed += 1;
                }
                if self.scanner.at_eof() {
                    break;
                }
            }
            if !self.continues(depth) {
                if pushed > 1 {
                    let trailing = pushed - 1;
                    self.blanks = trailing;
                    lines.truncate(lines.len() - trailing);
                }
                break;
            }
            while !self.at_eol() {
                push_char(&mut buf, self.ch());
                self.scanner.next_char();
            }
        }
        lines
    }

    fn parse_fenced(&mut self, name: &str) -> Block {
        let open_spacing = self.spacing();
        let depth = self.blocks.len();
        let delim = self.ch();
        let mut opening = 0usize;
        while self.ch() == delim {
            opening += 1;
            if !self.scanner.next_char() {
                break;
            }
        }
        trace!("parse_fenced {:?} x{}", delim, opening);

        let mut lines: Vec<Vec<u8>> = Vec::new();
        let mut trailing_text: Option<Vec<u8>> = None;

        // the remainder of the opening line is the first body line; it is
        // never scanned for a closing run
        let mut buf = Vec::new();
        while !self.at_eol() {
            push_char(&mut buf, self.ch());
            self.scanner.next_char();
        }

        loop {
            if !self.advance_line() || !self.continues(depth) {
                if !buf.is_empty() {
                    lines.push(buf);
                }
                break;
            }
            // re-prefix the body line with its indentation beyond the
            // opening line's spacing
            let mut content: Vec<u8> = Vec::new();
            for &ch in &diff_spacing(&open_spacing, &self.spacing()) {
                push_char(&mut content, ch);
            }
            let mut run = 0usize;
            let mut closed = false;
            while !self.at_eol() {
                if self.ch() == delim {
                    run += 1;
                    if run == opening {
                        closed = true;
                        let mut text = Vec::new();
                        while self.scanner.next_char() {
                            push_char(&mut text, self.ch());
                        }
                        if !text.is_empty() {
                            trailing_text = Some(text);
                        }
                        break;
                    }
                } else {
                    run = 0;
                }
                push_char(&mut content, self.ch());
                self.scanner.next_char();
            }
            if closed {
                if !buf.is_empty() {
                    lines.push(buf);
                }
                self.advance_line();
                break;
            }
            lines.push(std::mem::take(&mut buf));
            buf = content;
        }

        Block::Fenced {
            name: name.into(),
            lines,
            trailing_text,
        }
    }

    fn parse_verbatim_line(&mut self, el: &Element) -> Block {
        for _ in el.delimiter.chars() {
            self.scanner.next_char();
        }
        let mut content = Vec::new();
        while !self.at_eol() {
            push_char(&mut content, self.ch());
            self.scanner.next_char();
        }
        self.advance_line();
        Block::VerbatimLine {
            name: el.name.clone(),
            content,
        }
    }

    fn parse_hat(&mut self) -> Block {
        let lines = self.parse_hat_lines();
        let depth = self.blocks.len();
        // annotations bind to the next block in the same context, looking
        // past blank lines on the way
        let mut block = None;
        while !self.scanner.at_eof() {
            if is_spacing(self.ch()) {
                self.parse_spacing();
            }
            if self.only_spacing_required(depth) && !self.filled {
                self.advance_line();
                continue;
            }
            if !self.continues(depth) {
                break;
            }
            if self.at_eol() {
                self.advance_line();
                continue;
            }
            block = Some(Box::new(self.parse_block()));
            break;
        }
        Block::Hat { lines, block }
    }

    fn parse_hat_lines(&mut self) -> Vec<Vec<u8>> {
        let delim = self.ch();
        self.lead.push(delim);
        self.scanner.next_char();
        self.with_open(&[delim], |p| {
            let depth = p.blocks.len();
            let mut lines = Vec::new();
            let mut buf = Vec::new();
            loop {
                if p.at_eol() {
                    lines.push(std::mem::take(&mut buf));
                    p.advance_line();
                    if p.scanner.at_eof() {
                        break;
                    }
                }
                if !p.continues(depth) {
                    break;
                }
                while !p.at_eol() {
                    push_char(&mut buf, p.ch());
                    p.scanner.next_char();
                }
            }
            lines
        })
    }

    fn parse_line(&mut self, name: &str) -> Block {
        let children = self.parse_inlines();
        self.line_ended = false;
        self.pending_space = false;
        Block::Line {
            name: name.into(),
            children,
        }
    }

    /// At end of line inside a line element: decide whether the element
    /// spans onto the next physical line. On success the scanner sits at
    /// the first content codepoint of the new line and a joining space is
    /// owed; on failure the line element is over and the scanner is parked
    /// for the enclosing block loop.
    fn continue_line(&mut self) -> bool {
        if self.scanner.at_eof() {
            self.line_ended = true;
            return false;
        }
        self.advance_line();
        if self.scanner.at_eof() {
            self.line_ended = true;
            return false;
        }
        let depth = self.blocks.len();
        if !self.continues(depth) || self.at_eol() {
            self.line_ended = true;
            return false;
        }
        if self.ch() == '\\' {
            // block escape: explicitly not a block, keep the line going
            self.scanner.next_char();
            self.pending_space = true;
            return true;
        }
        if self.starts_block() {
            self.line_ended = true;
            return false;
        }
        self.pending_space = true;
        true
    }

    // ========================================================================
    // Inline parsing
    // ========================================================================

    /// Run `f` with an inline span pushed; the stack is restored on return.
    fn with_open_inline<T>(
        &mut self,
        delim: char,
        escape: char,
        f: impl FnOnce(&mut Parser<'a>) -> T,
    ) -> T {
        let depth = self.inlines.len();
        self.inlines.push((delim, escape));
        let out = f(self);
        self.inlines.truncate(depth);
        out
    }

    fn parse_inlines(&mut self) -> Vec<Inline> {
        let mut inlines = Vec::new();
        loop {
            if self.line_ended {
                break;
            }
            if self.at_eol() {
                if self.continue_line() {
                    continue;
                }
                break;
            }
            if self.is_closing_delimiter() {
                break;
            }
            inlines.push(self.parse_inline());
        }
        inlines
    }

    fn parse_inline(&mut self) -> Inline {
        if self.is_line_comment() {
            return self.parse_line_comment();
        }
        if let Some(el) = self.set.inline(self.ch()).cloned() {
            match el.typ {
                ElementType::Uniform => {
                    if self.scanner.peek_equals(self.ch()) {
                        return self.parse_uniform(&el.name);
                    }
                }
                ElementType::Escaped => {
                    if self.is_escaped_opener() {
                        return self.parse_escaped(&el.name);
                    }
                }
                ElementType::Forward => return self.parse_forward(&el.name),
                _ => {}
            }
        }
        self.parse_text()
    }

    fn is_line_comment(&self) -> bool {
        self.ch() == '/' && self.scanner.peek_equals('/')
    }

    fn parse_line_comment(&mut self) -> Inline {
        self.scanner.next_char();
        self.scanner.next_char();
        let mut content = Vec::new();
        while !self.at_eol() {
            push_char(&mut content, self.ch());
            self.scanner.next_char();
        }
        Inline::LineComment(content)
    }

    /// An escaped span opens when the codepoint after the delimiter repeats
    /// it or is any left-right codepoint.
    fn is_escaped_opener(&self) -> bool {
        if self.scanner.peek_equals(self.ch()) {
            return true;
        }
        matches!(self.scanner.peek(), Some(c) if is_left_right(c))
    }

    /// Whether the current position closes the span `(delim, escape)`.
    fn closes_span(&self, delim: char, escape: char) -> bool {
        if escape == NONE {
            self.ch() == counterpart(delim)
        } else {
            self.ch() == counterpart(escape) && self.scanner.peek_equals(counterpart(delim))
        }
    }

    /// Whether any open inline span closes at the current position.
    fn is_closing_delimiter(&self) -> bool {
        self.inlines
            .iter()
            .rev()
            .any(|&(delim, escape)| self.closes_span(delim, escape))
    }

    /// Whether an inline element would open at the current position.
    fn is_inline_delimiter(&self) -> bool {
        match self.set.inline(self.ch()) {
            Some(el) => match el.typ {
                ElementType::Uniform => self.scanner.peek_equals(self.ch()),
                ElementType::Escaped => self.is_escaped_opener(),
                ElementType::Forward => true,
                _ => false,
            },
            None => false,
        }
    }

    /// An inline escape is a backslash before `\`, `/`, or a registered
    /// inline delimiter codepoint.
    fn is_inline_escape(&self) -> bool {
        if self.ch() != '\\' {
            return false;
        }
        match self.scanner.peek() {
            Some(c) => c == '\\' || c == '/' || self.set.inline(c).is_some(),
            None => false,
        }
    }

    fn parse_uniform(&mut self, name: &str) -> Inline {
        let delim = self.ch();
        self.scanner.next_char();
        self.scanner.next_char();
        let children = self.with_open_inline(delim, delim, |p| {
            let children = p.parse_inlines();
            if !p.line_ended && p.closes_span(delim, delim) {
                p.scanner.next_char();
                p.scanner.next_char();
            }
            children
        });
        Inline::Uniform {
            name: name.into(),
            children,
        }
    }

    fn parse_escaped(&mut self, name: &str) -> Inline {
        let delim = self.ch();
        self.scanner.next_char();
        let escape = self.ch();
        self.scanner.next_char();
        // a leading backslash guards the closer: the span then ends only
        // at backslash + closer, so the content may hold bare closers
        let guarded = !self.at_eol() && self.ch() == '\\';
        if guarded {
            self.scanner.next_char();
        }
        let close0 = counterpart(escape);
        let close1 = counterpart(delim);
        let mut content = Vec::new();
        loop {
            if self.at_eol() {
                trim_trailing_spacing(&mut content);
                if self.continue_line() {
                    content.push(b' ');
                    self.pending_space = false;
                    continue;
                }
                break;
            }
            if guarded {
                if self.ch() == '\\'
                    && self.scanner.peek_equals(close0)
                    && self.scanner.peek2_equals(close1)
                {
                    self.scanner.next_char();
                    self.scanner.next_char();
                    self.scanner.next_char();
                    break;
                }
            } else if self.ch() == close0 && self.scanner.peek_equals(close1) {
                self.scanner.next_char();
                self.scanner.next_char();
                break;
            }
            push_char(&mut content, self.ch());
            self.scanner.next_char();
        }
        Inline::Escaped {
            name: name.into(),
            content,
        }
    }

    fn parse_forward(&mut self, name: &str) -> Inline {
        let delim = self.ch();
        self.scanner.next_char();
        let mut children = Vec::new();
        if self.forward_is_two_part(delim) {
            let mut closed = false;
            children = self.with_open_inline(delim, NONE, |p| {
                let children = p.parse_inlines();
                if !p.line_ended && p.closes_span(delim, NONE) {
                    p.scanner.next_char();
                    closed = true;
                }
                children
            });
            if !closed {
                return Inline::Forward {
                    name: name.into(),
                    content: Vec::new(),
                    children,
                };
            }
            self.scanner.next_char(); // opening delimiter of the second part
        }
        let mut content = Vec::new();
        loop {
            if self.at_eol() {
                trim_trailing_spacing(&mut content);
                if self.continue_line() {
                    content.push(b' ');
                    self.pending_space = false;
                    continue;
                }
                break;
            }
            if self.ch() == counterpart(delim) {
                self.scanner.next_char();
                break;
            }
            push_char(&mut content, self.ch());
            self.scanner.next_char();
        }
        Inline::Forward {
            name: name.into(),
            content,
            children,
        }
    }

    /// A forward span is two-part iff the first closer on the line is
    /// immediately followed by another opener.
    fn forward_is_two_part(&self, delim: char) -> bool {
        let close = counterpart(delim);
        if self.ch() == close {
            return self.scanner.peek_equals(delim);
        }
        let rest = self.scanner.rest();
        let mut offs = 0;
        while offs < rest.len() {
            match decode_codepoint(&rest[offs..]) {
                Decoded::Char(c, w) => {
                    if c == close {
                        if let Decoded::Char(next, _) = decode_codepoint(&rest[offs + w..]) {
                            return next == delim;
                        }
                    }
                    offs += w;
                }
                Decoded::Invalid => offs += 1,
                Decoded::Empty => break,
            }
        }
        false
    }

    fn parse_text(&mut self) -> Inline {
        let mut content = Vec::new();
        if self.pending_space {
            content.push(b' ');
            self.pending_space = false;
        }
        loop {
            if self.at_eol() {
                trim_trailing_spacing(&mut content);
                if self.continue_line() {
                    content.push(b' ');
                    self.pending_space = false;
                    continue;
                }
                break;
            }
            if self.is_inline_escape() {
                // the escaped codepoint is literal
                self.scanner.next_char();
            } else if self.is_line_comment()
                || self.is_closing_delimiter()
                || self.is_inline_delimiter()
            {
                break;
            }
            push_char(&mut content, self.ch());
            self.scanner.next_char();
        }
        Inline::Text(content)
    }
}

// ============================================================================
// Spacing and codepoint helpers
// ============================================================================

fn is_spacing(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

fn spacing_width(ch: char) -> usize {
    if ch == '\t' {
        TAB_WIDTH
    } else {
        1
    }
}

fn count_spacing(spacing: &[char]) -> usize {
    spacing.iter().copied().map(spacing_width).sum()
}

/// The suffix of `new` whose display-column width is `width(new) -
/// width(old)`, empty when `new` is not wider. A tab that straddles the
/// boundary is split into spaces.
fn diff_spacing(old: &[char], new: &[char]) -> Vec<char> {
    let want = count_spacing(new).saturating_sub(count_spacing(old));
    if want == 0 {
        return Vec::new();
    }
    let mut left = want;
    let mut out = Vec::new();
    for &ch in new.iter().rev() {
        if left == 0 {
            break;
        }
        let w = spacing_width(ch);
        if w > left {
            out.extend(std::iter::repeat(' ').take(left));
            break;
        }
        out.push(ch);
        left -= w;
    }
    out.reverse();
    out
}

/// The mirror of a left-right codepoint; any other codepoint mirrors
/// itself.
fn counterpart(ch: char) -> char {
    match ch {
        '(' => ')',
        ')' => '(',
        '<' => '>',
        '>' => '<',
        '[' => ']',
        ']' => '[',
        '{' => '}',
        '}' => '{',
        _ => ch,
    }
}

fn is_left_right(ch: char) -> bool {
    matches!(ch, '(' | ')' | '<' | '>' | '[' | ']' | '{' | '}')
}

fn push_char(buf: &mut Vec<u8>, ch: char) {
    let mut tmp = [0u8; 4];
    buf.extend_from_slice(ch.encode_utf8(&mut tmp).as_bytes());
}

fn trim_trailing_spacing(content: &mut Vec<u8>) {
    while let Some(&b) = content.last() {
        if b == b' ' || b == b'\t' {
            content.pop();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counterpart() {
        assert_eq!(counterpart('('), ')');
        assert_eq!(counterpart('}'), '{');
        assert_eq!(counterpart('_'), '_');
        assert_eq!(counterpart('`'), '`');
    }

    #[test]
    fn test_count_spacing() {
        assert_eq!(count_spacing(&[' ', ' ']), 2);
        assert_eq!(count_spacing(&['\t']), 8);
        assert_eq!(count_spacing(&[' ', '\t', ' ']), 10);
    }

    #[test]
    fn test_diff_spacing_plain() {
        assert_eq!(diff_spacing(&[' '], &[' ', ' ', ' ']), vec![' ', ' ']);
        assert_eq!(diff_spacing(&[' ', ' '], &[' ']), Vec::<char>::new());
        assert_eq!(diff_spacing(&[], &[]), Vec::<char>::new());
    }

    #[test]
    fn test_diff_spacing_splits_tab() {
        // one column consumed, seven remain from the tab
        assert_eq!(
            diff_spacing(&[' '], &['\t']),
            vec![' ', ' ', ' ', ' ', ' ', ' ', ' ']
        );
        // a full tab survives as itself
        assert_eq!(diff_spacing(&[], &['\t']), vec!['\t']);
    }

    #[test]
    fn test_trim_trailing_spacing() {
        let mut buf = b"a \t ".to_vec();
        trim_trailing_spacing(&mut buf);
        assert_eq!(buf, b"a");
        let mut all = b"  ".to_vec();
        trim_trailing_spacing(&mut all);
        assert!(all.is_empty());
    }

    #[test]
    fn test_push_char_encodes_utf8() {
        let mut buf = Vec::new();
        push_char(&mut buf, 'a');
        push_char(&mut buf, '→');
        assert_eq!(buf, "a→".as_bytes());
    }
}
