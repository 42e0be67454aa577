//! Scanning primitives.
//!
//! [`Lexer`] turns the document into a lazy, fused sequence of tokens. It
//! never looks back: lookahead is a peek at the next byte, and the extent of
//! a value literal is decided once, by [`decode::extent`], before the value
//! token is yielded.

use crate::decode;
use crate::error::{Error, ErrorKind};
use crate::Span;
use std::iter::FusedIterator;

#[cfg(test)]
#[path = "./lexer_tests.rs"]
mod tests;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// A key: a run of bytes up to whitespace, `=`, `{`, `}` or `//`.
    Key(&'a str),
    /// `{`
    Open,
    /// `}`
    Close,
    /// `=`; the next token is always a [`Token::Value`].
    Assign,
    /// The value literal following `=`, empty when the line has none.
    Value(&'a str),
}

impl Token<'_> {
    pub fn describe(&self) -> &'static str {
        match self {
            Token::Key(_) => "a key",
            Token::Open => "a left brace",
            Token::Close => "a right brace",
            Token::Assign => "an equals",
            Token::Value(_) => "a value",
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Mode {
    Structure,
    Value,
}

pub(crate) struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    cursor: usize,
    mode: Mode,
    /// Newlines consumed so far.
    line: usize,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            cursor: 0,
            mode: Mode::Structure,
            line: 0,
            line_start: 0,
        }
    }

    /// 0-based line of the current position.
    #[inline]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Span of the end of input.
    pub fn eof_span(&self) -> Span {
        let end = self.bytes.len() as u32;
        Span::new(end, end)
    }

    /// Builds an error at `span` with line information.
    ///
    /// Tokens never cross a newline, so any span handed out by the lexer
    /// lies on the current line.
    pub fn error(&self, kind: ErrorKind, span: Span) -> Error {
        let col = (span.start as usize).saturating_sub(self.line_start);
        Error {
            kind,
            span,
            line_info: Some((self.line, col)),
        }
    }

    #[inline]
    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.cursor).copied()
    }

    #[inline]
    fn peek_byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.cursor + offset).copied()
    }

    #[inline]
    fn at_comment(&self) -> bool {
        self.peek_byte() == Some(b'/') && self.peek_byte_at(1) == Some(b'/')
    }

    /// Skips whitespace and `//` comments, counting newlines.
    fn skip_ignored(&mut self) {
        while let Some(b) = self.peek_byte() {
            match b {
                b'\n' => {
                    self.cursor += 1;
                    self.line += 1;
                    self.line_start = self.cursor;
                }
                b if is_whitespace(b) => self.cursor += 1,
                b'/' if self.at_comment() => self.skip_comment(),
                _ => break,
            }
        }
    }

    /// Skips to the newline ending the comment, leaving it unconsumed.
    fn skip_comment(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b'\n' {
                break;
            }
            self.cursor += 1;
        }
    }

    fn skip_horizontal(&mut self) {
        while let Some(b) = self.peek_byte() {
            if b == b'\n' || !is_whitespace(b) {
                break;
            }
            self.cursor += 1;
        }
    }

    fn read_key(&mut self) -> &'a str {
        let start = self.cursor;
        while let Some(b) = self.peek_byte() {
            if is_whitespace(b) || matches!(b, b'=' | b'{' | b'}') || self.at_comment() {
                break;
            }
            self.cursor += 1;
        }
        // Every stop byte is ASCII, so both ends lie on char boundaries.
        &self.src[start..self.cursor]
    }

    fn read_value(&mut self) -> &'a str {
        self.skip_horizontal();
        let start = self.cursor;
        let line_end = match self.bytes[start..].iter().position(|&b| b == b'\n') {
            Some(n) => start + n,
            None => self.bytes.len(),
        };
        if self.at_comment() {
            return "";
        }
        let rest = &self.src[start..line_end];
        let len = decode::extent(rest);
        self.cursor = start + len;
        &rest[..len]
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = (Token<'a>, Span);

    fn next(&mut self) -> Option<Self::Item> {
        if self.mode == Mode::Value {
            self.mode = Mode::Structure;
            let text = self.read_value();
            let start = self.cursor - text.len();
            let span = Span::new(start as u32, self.cursor as u32);
            return Some((Token::Value(text), span));
        }

        self.skip_ignored();
        let start = self.cursor;
        let token = match self.peek_byte()? {
            b'{' => {
                self.cursor += 1;
                Token::Open
            }
            b'}' => {
                self.cursor += 1;
                Token::Close
            }
            b'=' => {
                self.cursor += 1;
                self.mode = Mode::Value;
                Token::Assign
            }
            _ => Token::Key(self.read_key()),
        };
        Some((token, Span::new(start as u32, self.cursor as u32)))
    }
}

impl FusedIterator for Lexer<'_> {}

/// Whitespace as the format defines it: space, tab, CR, LF and backspace.
#[inline]
pub(crate) fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x08)
}
