#![allow(unsafe_code)]

//! Allocation indirection.
//!
//! Every byte owned by a [`Store`](crate::Store) is requested from an
//! [`Allocator`]. A store uses the allocator passed through
//! [`Options::allocator`](crate::Options::allocator), or the process-wide one,
//! which is [`System`] unless [`set_allocator`] installed a [`MemHooks`] table
//! first.

use crate::error::{Error, ErrorKind};
use std::alloc::Layout;
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

#[cfg(test)]
#[path = "./alloc_tests.rs"]
mod tests;

/// The five allocation primitives a store relies on.
///
/// Exhaustion is reported by returning `None`; the caller unwinds and reports
/// [`Status::OutOfMemory`](crate::Status::OutOfMemory). Layouts passed to an
/// allocator are never zero-sized.
pub trait Allocator: Sync {
    /// Allocates uninitialized memory for `layout`.
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Allocates zero-filled memory for `layout`.
    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Resizes the allocation at `ptr` to `new_size` bytes, keeping the
    /// alignment of `layout`. On failure the old allocation stays valid.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout` and not
    /// yet released.
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;

    /// Copies `bytes` into a fresh allocation of `bytes.len()` bytes with an
    /// alignment of one.
    fn dup_str(&self, bytes: &[u8]) -> Option<NonNull<u8>> {
        let layout = Layout::array::<u8>(bytes.len()).ok()?;
        let dst = self.alloc(layout)?;
        // Safety: dst was just allocated with room for bytes.len() bytes.
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), bytes.len()) };
        Some(dst)
    }

    /// Returns the allocation at `ptr` to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator for `layout` and not
    /// yet released.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The platform allocator, backed by [`std::alloc`].
#[derive(Copy, Clone, Debug, Default)]
pub struct System;

impl Allocator for System {
    #[inline]
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        // Safety: layouts handed to an allocator are never zero-sized.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        // Safety: as above.
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    #[inline]
    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // Safety: forwarded from the caller's contract.
        NonNull::new(unsafe { std::alloc::realloc(ptr.as_ptr(), layout, new_size) })
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // Safety: forwarded from the caller's contract.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}

/// Allocates or zero-allocates `layout`; null signals exhaustion.
pub type AllocFn = fn(layout: Layout, user_data: *mut ()) -> *mut u8;
/// Resizes `ptr` (allocated with `layout`) to `new_size`; null signals
/// exhaustion and leaves `ptr` untouched.
pub type ReallocFn =
    unsafe fn(ptr: *mut u8, layout: Layout, new_size: usize, user_data: *mut ()) -> *mut u8;
/// Copies `bytes` into a fresh allocation of `bytes.len()` bytes, alignment 1.
pub type DupStrFn = fn(bytes: &[u8], user_data: *mut ()) -> *mut u8;
/// Releases `ptr`, which was allocated with `layout`.
pub type ReleaseFn = unsafe fn(ptr: *mut u8, layout: Layout, user_data: *mut ());

/// A table of allocation hooks for [`set_allocator`].
///
/// All five hooks are required. `user_data` is passed verbatim to every hook
/// and is never dereferenced by this crate.
#[derive(Copy, Clone, Debug)]
pub struct MemHooks {
    pub alloc: Option<AllocFn>,
    pub alloc_zeroed: Option<AllocFn>,
    pub realloc: Option<ReallocFn>,
    pub dup_str: Option<DupStrFn>,
    pub release: Option<ReleaseFn>,
    pub user_data: *mut (),
}

impl Default for MemHooks {
    fn default() -> Self {
        Self {
            alloc: None,
            alloc_zeroed: None,
            realloc: None,
            dup_str: None,
            release: None,
            user_data: ptr::null_mut(),
        }
    }
}

impl MemHooks {
    fn validate(&self) -> Result<Hooks, Error> {
        let missing = |name| Error::from(ErrorKind::MissingHook(name));
        Ok(Hooks {
            alloc: self.alloc.ok_or_else(|| missing("alloc"))?,
            alloc_zeroed: self.alloc_zeroed.ok_or_else(|| missing("alloc_zeroed"))?,
            realloc: self.realloc.ok_or_else(|| missing("realloc"))?,
            dup_str: self.dup_str.ok_or_else(|| missing("dup_str"))?,
            release: self.release.ok_or_else(|| missing("release"))?,
            user_data: self.user_data,
        })
    }
}

/// A validated [`MemHooks`] table.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Hooks {
    alloc: AllocFn,
    alloc_zeroed: AllocFn,
    realloc: ReallocFn,
    dup_str: DupStrFn,
    release: ReleaseFn,
    user_data: *mut (),
}

// Safety: the crate only hands `user_data` back to the installer's hooks.
// Synchronizing whatever it points to is the installer's responsibility.
unsafe impl Send for Hooks {}
unsafe impl Sync for Hooks {}

impl Allocator for Hooks {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        NonNull::new((self.alloc)(layout, self.user_data))
    }

    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        NonNull::new((self.alloc_zeroed)(layout, self.user_data))
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // Safety: forwarded from the caller's contract.
        NonNull::new(unsafe { (self.realloc)(ptr.as_ptr(), layout, new_size, self.user_data) })
    }

    fn dup_str(&self, bytes: &[u8]) -> Option<NonNull<u8>> {
        NonNull::new((self.dup_str)(bytes, self.user_data))
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        // Safety: forwarded from the caller's contract.
        unsafe { (self.release)(ptr.as_ptr(), layout, self.user_data) }
    }
}

enum Global {
    System(System),
    Hooks(Hooks),
}

impl Global {
    fn get(&'static self) -> &'static dyn Allocator {
        match self {
            Global::System(system) => system,
            Global::Hooks(hooks) => hooks,
        }
    }
}

static GLOBAL: OnceLock<Global> = OnceLock::new();

/// Installs `hooks` as the process-wide allocator.
///
/// This is a single-initialization slot: it succeeds at most once, and only
/// if no store has been opened with the process-wide allocator yet. Later
/// calls fail with [`ErrorKind::AllocatorLocked`]. A table with any hook
/// missing fails with [`ErrorKind::MissingHook`] and installs nothing.
///
/// Installing hooks while another thread is parsing is a caller error; the
/// slot itself stays consistent, but the parse may already be bound to the
/// previous allocator.
pub fn set_allocator(hooks: MemHooks) -> Result<(), Error> {
    let hooks = hooks.validate()?;
    let mut installed = false;
    GLOBAL.get_or_init(|| {
        installed = true;
        Global::Hooks(hooks)
    });
    if installed {
        tracing::debug!("installed process-wide allocator hooks");
        Ok(())
    } else {
        Err(ErrorKind::AllocatorLocked.into())
    }
}

/// Returns the process-wide allocator, freezing the slot on first use.
pub(crate) fn global() -> &'static dyn Allocator {
    GLOBAL.get_or_init(|| Global::System(System)).get()
}
