#![allow(clippy::question_mark)]
use crate::Span;
use std::fmt::{self, Debug, Display};

#[cfg(test)]
#[path = "./error_tests.rs"]
mod tests;

/// Outcome codes of the library surface.
///
/// Every [`ErrorKind`] maps onto exactly one non-success status, see
/// [`ErrorKind::status`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    /// The input path could not be opened or read.
    FilePath,
    /// An allocation failed.
    OutOfMemory,
    /// A required argument, such as an allocator hook, was absent.
    NullPointer,
    /// The input is structurally malformed.
    Syntax,
    /// The input is well formed but a value or argument is unacceptable.
    InvalidValue,
    /// No entry exists under the requested name.
    NotFound,
}

impl Status {
    /// Human-readable name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => "success",
            Status::FilePath => "file path error",
            Status::OutOfMemory => "out of memory",
            Status::NullPointer => "null pointer argument",
            Status::Syntax => "syntax error",
            Status::InvalidValue => "invalid value",
            Status::NotFound => "entry not found",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced while opening, parsing or querying a store.
#[derive(Debug, Clone)]
pub struct Error {
    /// The error kind
    pub kind: ErrorKind,
    /// The byte span in the input where the error occurs. Empty for errors
    /// that are not tied to the input.
    pub span: Span,
    /// 0-based line and column, only available for errors coming from the
    /// parser
    pub line_info: Option<(usize, usize)>,
}

impl Error {
    /// The status code this error reports.
    #[inline]
    pub fn status(&self) -> Status {
        self.kind.status()
    }
}

impl std::error::Error for Error {}

impl From<(ErrorKind, Span)> for Error {
    fn from((kind, span): (ErrorKind, Span)) -> Self {
        Self {
            kind,
            span,
            line_info: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            span: Span::default(),
            line_info: None,
        }
    }
}

/// The kinds of failure.
#[derive(Clone, PartialEq)]
pub enum ErrorKind {
    /// The input file could not be opened or read.
    FilePath {
        /// The path as given by the caller
        path: String,
        /// What the operating system reported
        cause: std::io::ErrorKind,
    },

    /// The input is larger than the maximum supported size of 4GiB.
    FileTooLarge,

    /// The input is not valid UTF-8.
    InvalidUtf8,

    /// An allocation primitive reported exhaustion.
    OutOfMemory,

    /// An allocator hook table is missing the named hook.
    MissingHook(&'static str),

    /// The process-wide allocator was already fixed, either by an earlier
    /// `set_allocator` or by a store opened with it.
    AllocatorLocked,

    /// EOF was reached after a key, where `=` or `{` was expected.
    UnexpectedEof,

    /// Wanted one sort of token, but found another.
    Wanted {
        /// Expected token type.
        expected: &'static str,
        /// Actually found token type.
        found: &'static str,
    },

    /// A string had no closing quote.
    UnterminatedString,

    /// An array had no closing bracket.
    UnterminatedArray,

    /// A number had no digits.
    InvalidNumber,

    /// An integer does not fit in 64 bits.
    NumberOutOfRange,

    /// No entry with the given dotted name.
    NotFound(String),
}

impl ErrorKind {
    /// The status code reported for this kind.
    pub fn status(&self) -> Status {
        match self {
            Self::FilePath { .. } => Status::FilePath,
            Self::OutOfMemory => Status::OutOfMemory,
            Self::MissingHook(..) => Status::NullPointer,
            Self::UnexpectedEof
            | Self::Wanted { .. }
            | Self::UnterminatedString
            | Self::UnterminatedArray
            | Self::InvalidNumber => Status::Syntax,
            Self::FileTooLarge
            | Self::InvalidUtf8
            | Self::AllocatorLocked
            | Self::NumberOutOfRange => Status::InvalidValue,
            Self::NotFound(..) => Status::NotFound,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::FilePath { .. } => "file-path",
            Self::FileTooLarge => "file-too-large",
            Self::InvalidUtf8 => "invalid-utf8",
            Self::OutOfMemory => "out-of-memory",
            Self::MissingHook(..) => "missing-hook",
            Self::AllocatorLocked => "allocator-locked",
            Self::UnexpectedEof => "unexpected-eof",
            Self::Wanted { .. } => "wanted",
            Self::UnterminatedString => "unterminated-string",
            Self::UnterminatedArray => "unterminated-array",
            Self::InvalidNumber => "invalid-number",
            Self::NumberOutOfRange => "number-out-of-range",
            Self::NotFound(..) => "not-found",
        };
        f.write_str(text)
    }
}

impl Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

macro_rules! rtry {
    ($($tt:tt)*) => {
        if let Err(err) = $($tt)* {
            return Err(err);
        }
    };
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::FilePath { path, cause } => {
                rtry!(f.write_str("unable to read `"));
                rtry!(f.write_str(path));
                rtry!(f.write_str("`: "));
                Display::fmt(cause, f)
            }
            ErrorKind::FileTooLarge => f.write_str("file is too large (maximum 4GiB)"),
            ErrorKind::InvalidUtf8 => f.write_str("input is not valid UTF-8"),
            ErrorKind::OutOfMemory => f.write_str("allocation failed"),
            ErrorKind::MissingHook(name) => {
                rtry!(f.write_str("allocator hook `"));
                rtry!(f.write_str(name));
                f.write_str("` is missing")
            }
            ErrorKind::AllocatorLocked => {
                f.write_str("the process-wide allocator is already in use")
            }
            ErrorKind::UnexpectedEof => f.write_str("unexpected eof encountered"),
            ErrorKind::Wanted { expected, found } => {
                rtry!(f.write_str("expected "));
                rtry!(f.write_str(expected));
                rtry!(f.write_str(", found "));
                f.write_str(found)
            }
            ErrorKind::UnterminatedString => f.write_str("unterminated string"),
            ErrorKind::UnterminatedArray => f.write_str("unterminated array"),
            ErrorKind::InvalidNumber => f.write_str("invalid number"),
            ErrorKind::NumberOutOfRange => f.write_str("number is out of range of 'i64'"),
            ErrorKind::NotFound(name) => {
                rtry!(f.write_str("no entry named `"));
                rtry!(f.write_str(name));
                f.write_str("`")
            }
        }?;
        if let Some((line, col)) = self.line_info {
            write!(f, " at line {}, column {}", line + 1, col + 1)?;
        }
        Ok(())
    }
}
