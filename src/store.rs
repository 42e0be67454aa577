//! The typed key-value store.
//!
//! A fixed number of buckets, each heading a singly linked chain of entries.
//! Entries live in one arena in insertion order; chains link them by index.

use crate::block::{Alloc, Block, Text};
use crate::error::{Error, ErrorKind};
use crate::value::Value;
use std::fmt;
use std::hash::BuildHasher;

#[cfg(test)]
#[path = "./store_tests.rs"]
mod tests;

/// Bucket count used unless [`Options::buckets`](crate::Options::buckets)
/// says otherwise.
pub const DEFAULT_BUCKETS: u32 = 32;

const HASH_SEED: u64 = 199_933;

/// Chain link: 0 ends a chain, anything else is an entry index plus one.
type Link = u32;

struct Entry {
    // Field order is teardown order: payload, then name.
    value: Value,
    name: Text,
    next: Link,
}

/// A parsed document: every entry under its full dotted name.
///
/// Names are unique; a later assignment to the same name replaced the
/// earlier one during parsing. Dropping the store releases everything it
/// owns through the allocator it was built with.
///
/// ```
/// let store = nestconf::parse("server { port = 8080 }").unwrap();
/// assert_eq!(store.get_integer("server.port"), Some(&[8080][..]));
/// ```
pub struct Store {
    entries: Block<Entry>,
    buckets: Block<Link>,
    source: Text,
}

impl Store {
    pub(crate) fn new(source: &str, buckets: u32, alloc: Alloc) -> Result<Self, ErrorKind> {
        Ok(Self {
            entries: Block::new(alloc),
            buckets: Block::zeroed(buckets.max(1), alloc)?,
            source: Text::copy_from(source, alloc)?,
        })
    }

    #[inline]
    fn bucket_of(&self, name: &str) -> usize {
        let hash = foldhash::fast::FixedState::with_seed(HASH_SEED).hash_one(name.as_bytes());
        (hash % self.buckets.len() as u64) as usize
    }

    fn find(&self, name: &str) -> Option<&Entry> {
        let mut link = self.buckets[self.bucket_of(name)];
        while link != 0 {
            let entry = &self.entries[(link - 1) as usize];
            if entry.name == name {
                return Some(entry);
            }
            link = entry.next;
        }
        None
    }

    /// Stores `value` under `name`, replacing the value of an existing entry
    /// with the same name in place.
    pub(crate) fn insert(&mut self, name: Text, value: Value) -> Result<(), ErrorKind> {
        let bucket = self.bucket_of(&name);
        let mut link = self.buckets[bucket];
        let mut tail = None;
        while link != 0 {
            let index = (link - 1) as usize;
            let entry = &mut self.entries.as_mut_slice()[index];
            if entry.name == *name {
                tracing::trace!(name = %name, "overwriting entry");
                entry.value = value;
                entry.name = name;
                return Ok(());
            }
            tail = Some(index);
            link = entry.next;
        }

        let new_link = u32::try_from(self.entries.len() + 1).map_err(|_| ErrorKind::OutOfMemory)?;
        self.entries.push(Entry {
            value,
            name,
            next: 0,
        })?;
        match tail {
            Some(index) => self.entries.as_mut_slice()[index].next = new_link,
            None => self.buckets.as_mut_slice()[bucket] = new_link,
        }
        Ok(())
    }

    /// Returns the value stored under the full dotted `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|entry| &entry.value)
    }

    /// Like [`Store::get`], but a missing entry is an [`ErrorKind::NotFound`]
    /// error.
    pub fn require(&self, name: &str) -> Result<&Value, Error> {
        self.get(name)
            .ok_or_else(|| ErrorKind::NotFound(name.to_owned()).into())
    }

    /// Returns the elements stored under `name` as `i64`.
    ///
    /// The accessor does not check the tag of numeric entries: a double
    /// entry yields the bit patterns of its elements. String entries yield
    /// `None`.
    pub fn get_integer(&self, name: &str) -> Option<&[i64]> {
        self.get(name)?.integer_storage()
    }

    /// Returns the elements stored under `name` as `f64`.
    ///
    /// As with [`Store::get_integer`], an integer entry is reinterpreted bit
    /// for bit and string entries yield `None`.
    pub fn get_double(&self, name: &str) -> Option<&[f64]> {
        self.get(name)?.double_storage()
    }

    /// Returns the strings stored under `name`, or `None` for a missing or
    /// numeric entry.
    pub fn get_string(&self, name: &str) -> Option<&[Text]> {
        self.get(name)?.as_strings()
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in first-insertion order.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = (&str, &Value)> + DoubleEndedIterator {
        self.entries
            .iter()
            .map(|entry| (entry.name.as_str(), &entry.value))
    }

    /// Path the store was opened from; empty for parsed text.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of hash buckets.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Returns a [`Display`](fmt::Display) rendering of every bucket and its
    /// chain, for debugging.
    pub fn dump(&self) -> Dump<'_> {
        Dump { store: self }
    }

    /// Releases the store. Equivalent to dropping it.
    pub fn close(self) {}
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

/// Per-bucket debug rendering, see [`Store::dump`].
///
/// ```text
///   0:	<empty>
///   1:	"server.port"	= 1 int [ 8080 ]
///   2:	"name"	= 1 str [ <demo> ]
///     	"ratio"	= 1 dbl [ 0.5 ]
/// ```
pub struct Dump<'a> {
    store: &'a Store,
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store;
        for (i, &head) in store.buckets.iter().enumerate() {
            write!(f, "{i:3}:")?;
            if head == 0 {
                f.write_str("\t<empty>\n")?;
                continue;
            }
            let mut link = head;
            let mut first = true;
            while link != 0 {
                let entry = &store.entries[(link - 1) as usize];
                if !first {
                    f.write_str("    ")?;
                }
                writeln!(f, "\t{:?}\t= {}", entry.name, entry.value)?;
                first = false;
                link = entry.next;
            }
        }
        Ok(())
    }
}
