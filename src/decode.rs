//! Value text decoding.
//!
//! [`extent`] decides how much of a line belongs to the value literal;
//! [`decode`] turns exactly that text into a typed [`Value`]. Errors carry
//! spans relative to the value text.

use crate::Span;
use crate::block::{Alloc, Block, Text};
use crate::error::ErrorKind;
use crate::lexer::is_whitespace;
use crate::value::Value;

#[cfg(test)]
#[path = "./decode_tests.rs"]
mod tests;

type DecodeError = (ErrorKind, Span);

/// Returns the byte length of the value literal at the start of `rest`, the
/// remainder of the line after `=` and leading whitespace.
///
/// - a string runs to the last `"` before a `}` or `//` outside quotes,
/// - an array runs to its first `]` outside quotes,
/// - a number runs to whitespace, `}` or `//`.
///
/// A string or array without its terminator takes the whole (trimmed) line;
/// [`decode`] then reports it as unterminated.
pub(crate) fn extent(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let whole_line = || trim_end(bytes).len();
    match bytes.first() {
        None => 0,
        Some(b'"') => {
            let mut quoted = true;
            let mut last = 0;
            let mut i = 1;
            while i < bytes.len() {
                match bytes[i] {
                    b'"' => {
                        quoted = !quoted;
                        last = i;
                    }
                    b'}' if !quoted => break,
                    b'/' if !quoted && bytes.get(i + 1) == Some(&b'/') => break,
                    _ => {}
                }
                i += 1;
            }
            if last == 0 { whole_line() } else { last + 1 }
        }
        Some(b'[') => {
            let mut quoted = false;
            for (i, &b) in bytes.iter().enumerate().skip(1) {
                match b {
                    b'"' => quoted = !quoted,
                    b']' if !quoted => return i + 1,
                    _ => {}
                }
            }
            whole_line()
        }
        Some(_) => {
            let mut i = 0;
            while i < bytes.len() {
                let b = bytes[i];
                if is_whitespace(b) || b == b'}' || (b == b'/' && bytes.get(i + 1) == Some(&b'/')) {
                    break;
                }
                i += 1;
            }
            // A bare `}` right after `=` is not a value; keep it so decoding
            // rejects it.
            i.max(1)
        }
    }
}

/// Decodes a non-empty value literal.
pub(crate) fn decode(text: &str, alloc: Alloc) -> Result<Value, DecodeError> {
    match text.as_bytes().first() {
        Some(b'[') if text.contains('"') => strings(text, alloc),
        Some(b'[') => numbers(text, alloc),
        Some(b'"') => string(text, alloc),
        _ => number(text, alloc),
    }
}

fn span(start: usize, end: usize) -> Span {
    Span::new(start as u32, end as u32)
}

fn oom(start: usize, end: usize) -> impl FnOnce(ErrorKind) -> DecodeError {
    move |kind| (kind, span(start, end))
}

fn trim_end(bytes: &[u8]) -> &[u8] {
    let mut end = bytes.len();
    while end > 0 && is_whitespace(bytes[end - 1]) {
        end -= 1;
    }
    &bytes[..end]
}

fn skip_ws(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_whitespace(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn describe(byte: Option<u8>) -> &'static str {
    match byte {
        None => "the end of the value",
        Some(b',') => "a comma",
        Some(b']') => "a right bracket",
        Some(b'[') => "a left bracket",
        Some(b'"') => "a string",
        Some(b'.') => "a period",
        Some(b) if b.is_ascii_digit() => "a digit",
        Some(b) if b.is_ascii_alphabetic() => "an identifier",
        Some(_) => "a character",
    }
}

// -- strings -----------------------------------------------------------------

/// A single string: everything between the first and the last quote.
fn string(text: &str, alloc: Alloc) -> Result<Value, DecodeError> {
    let last = match text.rfind('"') {
        Some(last) if last > 0 => last,
        _ => return Err((ErrorKind::UnterminatedString, span(0, text.len()))),
    };
    let s = Text::copy_from(&text[1..last], alloc).map_err(oom(0, text.len()))?;
    let block = Block::with_single(s, alloc).map_err(oom(0, text.len()))?;
    Ok(Value::String(block))
}

/// `[ "a", "b" ]`. Elements end at the next quote; there are no escapes.
fn strings(text: &str, alloc: Alloc) -> Result<Value, DecodeError> {
    let bytes = text.as_bytes();
    let mut out = Block::new(alloc);
    let mut pos = skip_ws(bytes, 1);
    if bytes.get(pos) != Some(&b'"') {
        return Err((
            ErrorKind::Wanted {
                expected: "a string",
                found: describe(bytes.get(pos).copied()),
            },
            span(pos, pos + 1),
        ));
    }
    loop {
        let open = pos;
        let Some(len) = bytes[open + 1..].iter().position(|&b| b == b'"') else {
            return Err((ErrorKind::UnterminatedString, span(open, bytes.len())));
        };
        let close = open + 1 + len;
        let element = Text::copy_from(&text[open + 1..close], alloc).map_err(oom(open, close + 1))?;
        out.push(element).map_err(oom(open, close + 1))?;

        pos = skip_ws(bytes, close + 1);
        match bytes.get(pos) {
            Some(b']') => break,
            Some(b',') => {
                pos = skip_ws(bytes, pos + 1);
                match bytes.get(pos) {
                    Some(b'"') => {}
                    None => return Err((ErrorKind::UnterminatedArray, span(0, bytes.len()))),
                    Some(&b) => {
                        return Err((
                            ErrorKind::Wanted {
                                expected: "a string",
                                found: describe(Some(b)),
                            },
                            span(pos, pos + 1),
                        ));
                    }
                }
            }
            None => return Err((ErrorKind::UnterminatedArray, span(0, bytes.len()))),
            Some(&b) => {
                return Err((
                    ErrorKind::Wanted {
                        expected: "a comma or right bracket",
                        found: describe(Some(b)),
                    },
                    span(pos, pos + 1),
                ));
            }
        }
    }
    Ok(Value::String(out))
}

// -- numbers -----------------------------------------------------------------

/// Length of `[+-]?[0-9]+` at `pos`, or 0 without digits.
fn integer_len(bytes: &[u8], pos: usize) -> usize {
    let mut i = pos;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits = bytes[i.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 { 0 } else { i + digits - pos }
}

/// Length of `[+-]?[0-9]*(\.[0-9]*)?([eE][+-]?[0-9]+)?` at `pos` with at
/// least one mantissa digit, or 0.
fn float_len(bytes: &[u8], pos: usize) -> usize {
    let digits_from = |i: usize| {
        bytes[i.min(bytes.len())..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };
    let mut i = pos;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let mut mantissa = digits_from(i);
    i += mantissa;
    if bytes.get(i) == Some(&b'.') {
        let fraction = digits_from(i + 1);
        mantissa += fraction;
        i += 1 + fraction;
    }
    if mantissa == 0 {
        return 0;
    }
    if matches!(bytes.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exponent = digits_from(j);
        if exponent > 0 {
            i = j + exponent;
        }
    }
    i - pos
}

fn parse_integer(text: &str, start: usize, len: usize) -> Result<i64, DecodeError> {
    text[start..start + len]
        .parse::<i64>()
        .map_err(|_| (ErrorKind::NumberOutOfRange, span(start, start + len)))
}

fn parse_float(text: &str, start: usize, len: usize) -> Result<f64, DecodeError> {
    text[start..start + len]
        .parse::<f64>()
        .map_err(|_| (ErrorKind::InvalidNumber, span(start, start + len)))
}

/// A scalar number. An integer literal followed by `.` is re-read as a
/// double. Anything after the literal is ignored, so `30s` is `30`.
fn number(text: &str, alloc: Alloc) -> Result<Value, DecodeError> {
    let bytes = text.as_bytes();
    let int_len = integer_len(bytes, 0);
    if int_len == 0 {
        return Err((ErrorKind::InvalidNumber, span(0, text.len())));
    }
    if bytes.get(int_len) == Some(&b'.') {
        let len = float_len(bytes, 0);
        let f = parse_float(text, 0, len)?;
        let block = Block::with_single(f, alloc).map_err(oom(0, len))?;
        Ok(Value::Double(block))
    } else {
        let i = parse_integer(text, 0, int_len)?;
        let block = Block::with_single(i, alloc).map_err(oom(0, int_len))?;
        Ok(Value::Integer(block))
    }
}

/// Elements of a numeric array while it is being built.
enum Numbers {
    Integer(Block<i64>),
    Double(Block<f64>),
}

impl Numbers {
    /// Converts every integer read so far into a double.
    fn promote(&mut self, alloc: Alloc) -> Result<(), ErrorKind> {
        if let Numbers::Integer(ints) = self {
            let mut doubles = Block::with_capacity(ints.capacity().max(1) as u32, alloc)?;
            for &i in ints.iter() {
                doubles.push(i as f64)?;
            }
            *self = Numbers::Double(doubles);
        }
        Ok(())
    }
}

/// `[ 1, 2, 3 ]`. The first double element promotes the whole array.
fn numbers(text: &str, alloc: Alloc) -> Result<Value, DecodeError> {
    let bytes = text.as_bytes();
    let mut out = Numbers::Integer(Block::new(alloc));
    let mut pos = skip_ws(bytes, 1);
    loop {
        let start = pos;
        if matches!(out, Numbers::Integer(_)) {
            let int_len = integer_len(bytes, start);
            if int_len > 0 && bytes.get(start + int_len) == Some(&b'.') {
                out.promote(alloc).map_err(oom(start, start + int_len))?;
            }
        }
        let len = match &mut out {
            Numbers::Integer(ints) => {
                let len = integer_len(bytes, start);
                if len > 0 {
                    let i = parse_integer(text, start, len)?;
                    ints.push(i).map_err(oom(start, start + len))?;
                }
                len
            }
            Numbers::Double(doubles) => {
                let len = float_len(bytes, start);
                if len > 0 {
                    let f = parse_float(text, start, len)?;
                    doubles.push(f).map_err(oom(start, start + len))?;
                }
                len
            }
        };
        if len == 0 {
            return Err(match bytes.get(start) {
                None => (ErrorKind::UnterminatedArray, span(0, bytes.len())),
                Some(b']' | b',') => (
                    ErrorKind::Wanted {
                        expected: "a number",
                        found: describe(bytes.get(start).copied()),
                    },
                    span(start, start + 1),
                ),
                Some(_) => (ErrorKind::InvalidNumber, span(start, start + 1)),
            });
        }

        pos = skip_ws(bytes, start + len);
        match bytes.get(pos) {
            Some(b']') => break,
            Some(b',') => pos = skip_ws(bytes, pos + 1),
            None => return Err((ErrorKind::UnterminatedArray, span(0, bytes.len()))),
            Some(&b) => {
                return Err((
                    ErrorKind::Wanted {
                        expected: "a comma or right bracket",
                        found: describe(Some(b)),
                    },
                    span(pos, pos + 1),
                ));
            }
        }
    }
    Ok(match out {
        Numbers::Integer(ints) => Value::Integer(ints),
        Numbers::Double(doubles) => Value::Double(doubles),
    })
}
