#![allow(unsafe_code)]

//! Allocator-backed buffers.
//!
//! [`Block`] is the length-prefixed element run behind every stored value:
//! a `(ptr, len, cap)` triple plus the allocator that owns the memory.
//! [`Text`] is a `Block<u8>` known to hold UTF-8.

use crate::alloc::Allocator;
use crate::error::ErrorKind;
use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ops::Deref;
use std::ptr::{self, NonNull};

#[cfg(test)]
#[path = "./block_tests.rs"]
mod tests;

const MIN_CAP: u32 = 4;

pub(crate) type Alloc = &'static dyn Allocator;

/// A growable run of `T` whose memory comes from an [`Allocator`].
///
/// Dereferences to `[T]`, so the element count is always `len()` of the
/// slice. Growth is fallible and leaves the block untouched on failure.
pub struct Block<T> {
    ptr: NonNull<T>,
    len: u32,
    cap: u32,
    alloc: Alloc,
    _marker: PhantomData<T>,
}

// Safety: a Block uniquely owns its elements, like `Vec<T>`. The allocator is
// `Sync`, so sharing the handle across threads is fine.
unsafe impl<T: Send> Send for Block<T> {}
unsafe impl<T: Sync> Sync for Block<T> {}

impl<T> Block<T> {
    /// Creates an empty block. Does not allocate.
    #[inline]
    pub(crate) fn new(alloc: Alloc) -> Self {
        const { assert!(size_of::<T>() != 0) };
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Creates an empty block with room for `cap` elements.
    pub(crate) fn with_capacity(cap: u32, alloc: Alloc) -> Result<Self, ErrorKind> {
        let mut block = Self::new(alloc);
        if cap > 0 {
            block.grow_to(cap)?;
        }
        Ok(block)
    }

    /// Creates a block holding exactly one element.
    pub(crate) fn with_single(value: T, alloc: Alloc) -> Result<Self, ErrorKind> {
        let mut block = Self::with_capacity(1, alloc)?;
        // Safety: capacity is one and the block is empty.
        unsafe { block.ptr.as_ptr().write(value) };
        block.len = 1;
        Ok(block)
    }

    /// Appends `value`, growing the allocation when full.
    #[inline]
    pub(crate) fn push(&mut self, value: T) -> Result<(), ErrorKind> {
        if self.len == self.cap {
            self.grow()?;
        }
        // Safety: len < cap after growth.
        unsafe { self.ptr.as_ptr().add(self.len as usize).write(value) };
        self.len += 1;
        Ok(())
    }

    /// Ensures room for `additional` more elements.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), ErrorKind> {
        let required = (self.len as usize)
            .checked_add(additional)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or(ErrorKind::OutOfMemory)?;
        if required > self.cap {
            let doubled = self.cap.saturating_mul(2).max(MIN_CAP);
            self.grow_to(required.max(doubled))?;
        }
        Ok(())
    }

    /// Shortens the block to `len` elements, dropping the rest.
    pub(crate) fn truncate(&mut self, len: usize) {
        let current = self.len as usize;
        if len >= current {
            return;
        }
        // `len < current <= u32::MAX`, so the cast is lossless.
        self.len = len as u32;
        // Safety: the tail elements were initialized and are no longer
        // reachable through `len`.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr().add(len),
                current - len,
            ));
        }
    }

    /// Returns the number of allocated element slots.
    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.cap as usize
    }

    #[inline]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: the first len elements are initialized.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len as usize) }
    }

    #[cold]
    fn grow(&mut self) -> Result<(), ErrorKind> {
        let new_cap = if self.cap == 0 {
            MIN_CAP
        } else {
            self.cap.checked_mul(2).ok_or(ErrorKind::OutOfMemory)?
        };
        self.grow_to(new_cap)
    }

    fn grow_to(&mut self, new_cap: u32) -> Result<(), ErrorKind> {
        let new_layout =
            Layout::array::<T>(new_cap as usize).map_err(|_| ErrorKind::OutOfMemory)?;
        let raw = if self.cap == 0 {
            self.alloc.alloc(new_layout)
        } else {
            // Safety: ptr came from this allocator with the current layout.
            unsafe {
                self.alloc
                    .realloc(self.ptr.cast(), self.layout(), new_layout.size())
            }
        };
        let Some(raw) = raw else {
            return Err(ErrorKind::OutOfMemory);
        };
        self.ptr = raw.cast();
        self.cap = new_cap;
        Ok(())
    }

    #[inline]
    fn layout(&self) -> Layout {
        // Safety: this exact layout was validated when the capacity was set.
        unsafe {
            Layout::from_size_align_unchecked(
                self.cap as usize * size_of::<T>(),
                std::mem::align_of::<T>(),
            )
        }
    }
}

impl Block<u32> {
    /// Creates a block of `len` zeroes from a zero-filled allocation.
    pub(crate) fn zeroed(len: u32, alloc: Alloc) -> Result<Self, ErrorKind> {
        let mut block = Self::new(alloc);
        if len == 0 {
            return Ok(block);
        }
        let layout = Layout::array::<u32>(len as usize).map_err(|_| ErrorKind::OutOfMemory)?;
        let Some(raw) = alloc.alloc_zeroed(layout) else {
            return Err(ErrorKind::OutOfMemory);
        };
        block.ptr = raw.cast();
        block.cap = len;
        block.len = len;
        Ok(block)
    }
}

impl<T: Copy> Block<T> {
    /// Appends every element of `items`.
    pub(crate) fn extend_from_slice(&mut self, items: &[T]) -> Result<(), ErrorKind> {
        self.reserve(items.len())?;
        // Safety: reserve made room for items.len() more elements.
        unsafe {
            ptr::copy_nonoverlapping(
                items.as_ptr(),
                self.ptr.as_ptr().add(self.len as usize),
                items.len(),
            );
        }
        self.len += items.len() as u32;
        Ok(())
    }
}

impl<T> Deref for Block<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        // Safety: the first len elements are initialized. A dangling pointer
        // is valid for an empty slice.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len as usize) }
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        if self.cap == 0 {
            return;
        }
        // Safety: elements are dropped before their storage is released, and
        // storage goes back to the allocator that produced it.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len as usize,
            ));
            self.alloc.release(self.ptr.cast(), self.layout());
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Block<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a Block<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// An owned UTF-8 string stored in a [`Block`].
pub struct Text {
    bytes: Block<u8>,
}

impl Text {
    /// Copies `s` through the allocator's duplicate-string primitive.
    pub(crate) fn copy_from(s: &str, alloc: Alloc) -> Result<Self, ErrorKind> {
        let mut bytes = Block::new(alloc);
        if s.is_empty() {
            return Ok(Self { bytes });
        }
        let len = u32::try_from(s.len()).map_err(|_| ErrorKind::OutOfMemory)?;
        let Some(raw) = alloc.dup_str(s.as_bytes()) else {
            return Err(ErrorKind::OutOfMemory);
        };
        bytes.ptr = raw;
        bytes.len = len;
        bytes.cap = len;
        Ok(Self { bytes })
    }

    /// Builds `prefix.segment`, or `segment` alone when `prefix` is empty.
    pub(crate) fn join_path(prefix: &str, segment: &str, alloc: Alloc) -> Result<Self, ErrorKind> {
        if prefix.is_empty() {
            return Self::copy_from(segment, alloc);
        }
        let mut bytes = Block::with_capacity(
            u32::try_from(prefix.len() + 1 + segment.len()).map_err(|_| ErrorKind::OutOfMemory)?,
            alloc,
        )?;
        bytes.extend_from_slice(prefix.as_bytes())?;
        bytes.push(b'.')?;
        bytes.extend_from_slice(segment.as_bytes())?;
        Ok(Self { bytes })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        // Safety: every constructor only stores UTF-8.
        unsafe { std::str::from_utf8_unchecked(&self.bytes) }
    }
}

impl Deref for Text {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Text {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<str> for Text {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Text {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
