//! The parse driver.
//!
//! Sequences lexer tokens through a small state machine, tracks open scopes
//! and commits every decoded `key = value` to the [`Store`] under its full
//! dotted name.

use crate::alloc::{self, Allocator};
use crate::block::{Alloc, Block, Text};
use crate::decode;
use crate::error::{Error, ErrorKind};
use crate::lexer::{Lexer, Token};
use crate::scope::Scope;
use crate::store::{DEFAULT_BUCKETS, Store};
use crate::Span;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[cfg(test)]
#[path = "./parser_tests.rs"]
mod tests;

#[derive(Copy, Clone)]
enum State<'a> {
    /// At a key position: a key, or a `}` closing the innermost scope.
    ScanningKey,
    /// After a key: `=` or `{`.
    ExpectingSeparator(&'a str, Span),
    /// After `=`: the value text.
    ReadingValue(&'a str, Span),
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    scope: Scope,
    store: Store,
    alloc: Alloc,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, store: Store, alloc: Alloc) -> Self {
        Self {
            lexer: Lexer::new(src),
            scope: Scope::new(alloc),
            store,
            alloc,
        }
    }

    fn wanted(&self, expected: &'static str, found: Token<'_>, span: Span) -> Error {
        self.lexer.error(
            ErrorKind::Wanted {
                expected,
                found: found.describe(),
            },
            span,
        )
    }

    fn parse_document(&mut self) -> Result<(), Error> {
        let mut state = State::ScanningKey;
        while let Some((token, span)) = self.lexer.next() {
            state = match (state, token) {
                (State::ScanningKey, Token::Close) => {
                    if !self.scope.pop() {
                        tracing::trace!(line = self.lexer.line() + 1, "ignoring unmatched `}}`");
                    }
                    State::ScanningKey
                }
                (State::ScanningKey, Token::Key(key)) => State::ExpectingSeparator(key, span),
                (State::ScanningKey, found) => return Err(self.wanted("a key", found, span)),

                (State::ExpectingSeparator(key, key_span), Token::Open) => {
                    self.scope
                        .push(key)
                        .map_err(|kind| self.lexer.error(kind, key_span))?;
                    State::ScanningKey
                }
                (State::ExpectingSeparator(key, key_span), Token::Assign) => {
                    State::ReadingValue(key, key_span)
                }
                (State::ExpectingSeparator(..), found) => {
                    return Err(self.wanted("`=` or `{`", found, span));
                }

                (State::ReadingValue(key, key_span), Token::Value(text)) => {
                    self.commit(key, key_span, text, span)?;
                    State::ScanningKey
                }
                (State::ReadingValue(..), found) => {
                    return Err(self.wanted("a value", found, span));
                }
            };
        }

        match state {
            State::ScanningKey => {}
            State::ExpectingSeparator(..) | State::ReadingValue(..) => {
                let eof = self.lexer.eof_span();
                return Err(self.lexer.error(ErrorKind::UnexpectedEof, eof));
            }
        }
        if self.scope.depth() > 0 {
            tracing::debug!(
                depth = self.scope.depth(),
                scope = self.scope.path(),
                "input ended inside open scopes"
            );
        }
        Ok(())
    }

    /// Decodes `text` and stores it under the current scope joined with
    /// `key`. An empty value text stores nothing.
    fn commit(&mut self, key: &str, key_span: Span, text: &str, span: Span) -> Result<(), Error> {
        if text.is_empty() {
            return Ok(());
        }
        let value = decode::decode(text, self.alloc)
            .map_err(|(kind, at)| self.lexer.error(kind, at.offset(span.start)))?;
        let name = Text::join_path(self.scope.path(), key, self.alloc)
            .map_err(|kind| self.lexer.error(kind, key_span))?;
        self.store
            .insert(name, value)
            .map_err(|kind| self.lexer.error(kind, span))
    }
}

/// Settings for building a [`Store`].
///
/// ```
/// use nestconf::Options;
///
/// let store = Options::new().buckets(64).parse("a = 1").unwrap();
/// assert_eq!(store.bucket_count(), 64);
/// ```
#[derive(Copy, Clone)]
pub struct Options {
    alloc: Option<Alloc>,
    buckets: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("custom_allocator", &self.alloc.is_some())
            .field("buckets", &self.buckets)
            .finish()
    }
}

impl Options {
    /// The process-wide allocator and [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self {
            alloc: None,
            buckets: DEFAULT_BUCKETS,
        }
    }

    /// Builds the store with `alloc` instead of the process-wide allocator.
    pub fn allocator(mut self, alloc: &'static dyn Allocator) -> Self {
        self.alloc = Some(alloc);
        self
    }

    /// Sets the bucket count of the store's hash table. Clamped to at least
    /// one.
    pub fn buckets(mut self, buckets: u32) -> Self {
        self.buckets = buckets.max(1);
        self
    }

    fn resolve(&self) -> Alloc {
        match self.alloc {
            Some(alloc) => alloc,
            None => alloc::global(),
        }
    }

    /// Parses an in-memory document.
    pub fn parse(&self, src: &str) -> Result<Store, Error> {
        let alloc = self.resolve();
        let result = parse_with(src, "", self.buckets, alloc);
        log_outcome(&result);
        result
    }

    /// Reads and parses the document at `path`.
    ///
    /// The file contents are read into memory from the store's allocator and
    /// released once parsing ends. The store's [`source`](Store::source) is
    /// the path.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Store, Error> {
        let path = path.as_ref();
        let alloc = self.resolve();
        let result = read_source(path, alloc).and_then(|bytes| {
            let src = match std::str::from_utf8(&bytes) {
                Ok(src) => src,
                Err(err) => {
                    let at = err.valid_up_to() as u32;
                    return Err(Error::from((ErrorKind::InvalidUtf8, Span::new(at, at + 1))));
                }
            };
            parse_with(src, &path.to_string_lossy(), self.buckets, alloc)
        });
        log_outcome(&result);
        result
    }
}

/// Parses `src` with default [`Options`].
///
/// ```
/// let store = nestconf::parse("
///     // connection settings
///     db {
///         host = \"localhost\"
///         ports = [5432, 5433]
///     }
/// ").unwrap();
///
/// assert_eq!(store.get_string("db.host").unwrap()[0], "localhost");
/// assert_eq!(store.get_integer("db.ports"), Some(&[5432, 5433][..]));
/// ```
pub fn parse(src: &str) -> Result<Store, Error> {
    Options::new().parse(src)
}

/// Reads and parses the file at `path` with default [`Options`].
pub fn open(path: impl AsRef<Path>) -> Result<Store, Error> {
    Options::new().open(path)
}

fn parse_with(src: &str, source: &str, buckets: u32, alloc: Alloc) -> Result<Store, Error> {
    if u32::try_from(src.len()).is_err() {
        return Err(ErrorKind::FileTooLarge.into());
    }
    let store = Store::new(source, buckets, alloc)?;
    let mut parser = Parser::new(src, store, alloc);
    parser.parse_document()?;
    Ok(parser.store)
}

fn log_outcome(result: &Result<Store, Error>) {
    match result {
        Ok(store) => tracing::debug!(
            source = store.source(),
            entries = store.len(),
            "opened store"
        ),
        Err(err) => tracing::debug!(
            status = %err.status(),
            line = ?err.line_info.map(|(line, _)| line + 1),
            error = %err,
            "failed to open store"
        ),
    }
}

const CHUNK: usize = 8 * 1024;

/// Reads the whole file into an allocator-owned buffer.
fn read_source(path: &Path, alloc: Alloc) -> Result<Block<u8>, Error> {
    let file_error = |err: io::Error| {
        Error::from(ErrorKind::FilePath {
            path: path.display().to_string(),
            cause: err.kind(),
        })
    };
    let mut file = File::open(path).map_err(file_error)?;
    let mut bytes = Block::new(alloc);
    if let Ok(meta) = file.metadata() {
        let len = usize::try_from(meta.len())
            .ok()
            .filter(|&len| u32::try_from(len).is_ok())
            .ok_or(ErrorKind::FileTooLarge)?;
        if len > 0 {
            bytes.reserve(len)?;
        }
    }
    let mut chunk = [0u8; CHUNK];
    loop {
        let read = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(file_error(err)),
        };
        if u32::try_from(bytes.len() + read).is_err() {
            return Err(ErrorKind::FileTooLarge.into());
        }
        bytes.extend_from_slice(&chunk[..read])?;
    }
    Ok(bytes)
}
