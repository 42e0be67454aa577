#![allow(unsafe_code)]

use crate::block::{Block, Text};
use std::fmt;

#[cfg(test)]
#[path = "./value_tests.rs"]
mod tests;

/// The type tag of a stored value.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    Double,
    String,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Double => "double",
            Kind::String => "string",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value: a homogeneous block of one element kind.
///
/// Scalars are blocks of length one; `x = 5` and `x = [5]` produce the same
/// value.
pub enum Value {
    Integer(Block<i64>),
    Double(Block<f64>),
    String(Block<Text>),
}

impl Value {
    /// Returns the type tag.
    #[inline]
    pub fn kind(&self) -> Kind {
        match self {
            Value::Integer(_) => Kind::Integer,
            Value::Double(_) => Kind::Double,
            Value::String(_) => Kind::String,
        }
    }

    /// Returns the element count.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Value::Integer(block) => block.len(),
            Value::Double(block) => block.len(),
            Value::String(block) => block.len(),
        }
    }

    /// Returns `true` for single-element values.
    #[inline]
    pub fn is_scalar(&self) -> bool {
        self.len() == 1
    }

    /// Returns the elements of an integer value.
    #[inline]
    pub fn as_integers(&self) -> Option<&[i64]> {
        match self {
            Value::Integer(block) => Some(&block[..]),
            _ => None,
        }
    }

    /// Returns the elements of a double value.
    #[inline]
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Value::Double(block) => Some(&block[..]),
            _ => None,
        }
    }

    /// Returns the elements of a string value.
    #[inline]
    pub fn as_strings(&self) -> Option<&[Text]> {
        match self {
            Value::String(block) => Some(&block[..]),
            _ => None,
        }
    }

    /// Returns the first element if this is an integer value.
    pub fn as_integer(&self) -> Option<i64> {
        self.as_integers().and_then(|v| v.first().copied())
    }

    /// Returns the first element if this is a double value.
    pub fn as_double(&self) -> Option<f64> {
        self.as_doubles().and_then(|v| v.first().copied())
    }

    /// Returns the first element if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_strings().and_then(|v| v.first()).map(Text::as_str)
    }

    /// Numeric storage viewed as `i64`, without checking the tag.
    ///
    /// Double elements come back as their IEEE-754 bit patterns.
    pub(crate) fn integer_storage(&self) -> Option<&[i64]> {
        match self {
            Value::Integer(block) => Some(&block[..]),
            // Safety: f64 and i64 share size and alignment, and every bit
            // pattern is a valid i64.
            Value::Double(block) => Some(unsafe {
                std::slice::from_raw_parts(block.as_ptr().cast::<i64>(), block.len())
            }),
            Value::String(_) => None,
        }
    }

    /// Numeric storage viewed as `f64`, without checking the tag.
    ///
    /// Integer elements come back reinterpreted bit for bit.
    pub(crate) fn double_storage(&self) -> Option<&[f64]> {
        match self {
            Value::Double(block) => Some(&block[..]),
            // Safety: as above, every bit pattern is a valid f64.
            Value::Integer(block) => Some(unsafe {
                std::slice::from_raw_parts(block.as_ptr().cast::<f64>(), block.len())
            }),
            Value::String(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(block) => fmt::Debug::fmt(block, f),
            Value::Double(block) => fmt::Debug::fmt(block, f),
            Value::String(block) => fmt::Debug::fmt(block, f),
        }
    }
}

/// Renders `<len> <kind> [ a, b ]`, the debug dump's value column.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T>(
            f: &mut fmt::Formatter<'_>,
            items: &[T],
            tag: &str,
            mut each: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
        ) -> fmt::Result {
            write!(f, "{} {tag} [", items.len())?;
            for (i, item) in items.iter().enumerate() {
                f.write_str(if i == 0 { " " } else { ", " })?;
                each(f, item)?;
            }
            f.write_str(" ]")
        }
        match self {
            Value::Integer(block) => list(f, &block[..], "int", |f, v| write!(f, "{v}")),
            Value::Double(block) => list(f, &block[..], "dbl", |f, v| write!(f, "{v:?}")),
            Value::String(block) => list(f, &block[..], "str", |f, v| write!(f, "<{v}>")),
        }
    }
}
