#![allow(unsafe_code)]

//! Scope tracker.
//!
//! Holds the dotted path of the open `name { ... }` blocks and where each
//! segment starts, so closing a block drops exactly its own segment.

use crate::block::{Alloc, Block};
use crate::error::ErrorKind;

#[cfg(test)]
#[path = "./scope_tests.rs"]
mod tests;

/// The dot-joined path of all currently open `{ }` scopes.
///
/// The path is one growable string. `starts` remembers where each pushed
/// segment begins so a pop removes exactly one push, even when the segment
/// itself contains a `.`.
pub(crate) struct Scope {
    path: Block<u8>,
    starts: Block<u32>,
}

impl Scope {
    pub fn new(alloc: Alloc) -> Self {
        Self {
            path: Block::new(alloc),
            starts: Block::new(alloc),
        }
    }

    /// The current prefix. Empty at the top level.
    #[inline]
    pub fn path(&self) -> &str {
        // Safety: only whole `&str` segments and ASCII dots are appended,
        // and truncation happens at segment starts.
        unsafe { std::str::from_utf8_unchecked(&self.path) }
    }

    /// Number of open scopes.
    #[inline]
    pub fn depth(&self) -> usize {
        self.starts.len()
    }

    /// Opens a scope named `segment`.
    pub fn push(&mut self, segment: &str) -> Result<(), ErrorKind> {
        let sep = !self.path.is_empty();
        self.path.reserve(segment.len() + sep as usize)?;
        self.starts.reserve(1)?;
        let start = self.path.len() as u32;
        if sep {
            self.path.push(b'.')?;
        }
        self.path.extend_from_slice(segment.as_bytes())?;
        self.starts.push(start)?;
        Ok(())
    }

    /// Closes the innermost scope. Returns `false` when none is open.
    pub fn pop(&mut self) -> bool {
        let Some(&start) = self.starts.last() else {
            return false;
        };
        self.path.truncate(start as usize);
        self.starts.truncate(self.starts.len() - 1);
        true
    }
}
