#![allow(unsafe_code)]

use nestconf::{Allocator, ErrorKind, Options, Status, System};
use std::alloc::Layout;
use std::io::Write;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

/// Forwards to [`System`], tracking live bytes and failing every request
/// from the `fail_at`-th one on.
struct Counting {
    live: AtomicIsize,
    requests: AtomicUsize,
    fail_at: AtomicUsize,
}

impl Counting {
    const fn new() -> Self {
        Self {
            live: AtomicIsize::new(0),
            requests: AtomicUsize::new(0),
            fail_at: AtomicUsize::new(usize::MAX),
        }
    }

    fn live(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn reset(&self, fail_at: usize) {
        assert_eq!(self.live(), 0, "leaked before reset");
        self.requests.store(0, Ordering::SeqCst);
        self.fail_at.store(fail_at, Ordering::SeqCst);
    }

    fn admit(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst) < self.fail_at.load(Ordering::SeqCst)
    }

    fn track(&self, result: Option<NonNull<u8>>, delta: isize) -> Option<NonNull<u8>> {
        if result.is_some() {
            self.live.fetch_add(delta, Ordering::SeqCst);
        }
        result
    }
}

impl Allocator for Counting {
    fn alloc(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        self.track(System.alloc(layout), layout.size() as isize)
    }

    fn alloc_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        self.track(System.alloc_zeroed(layout), layout.size() as isize)
    }

    unsafe fn realloc(
        &self,
        ptr: NonNull<u8>,
        layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        if !self.admit() {
            return None;
        }
        let grown = unsafe { System.realloc(ptr, layout, new_size) };
        self.track(grown, new_size as isize - layout.size() as isize)
    }

    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live.fetch_sub(layout.size() as isize, Ordering::SeqCst);
        unsafe { System.release(ptr, layout) }
    }
}

const DOC: &str = r#"
// every value shape, nested scopes and an overwrite
name = "service"
tags = ["a", "bb", "ccc", "dddd", "eeeee"]
server {
    port = 8080
    port = 8081
    weights = [1, 2, 3, 4.5, 6]
    tls {
        ciphers = ["x", "y"]
        ratio = 0.5
    }
}
pool.size = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10]
"#;

#[test]
fn dropping_the_store_releases_everything() {
    static ALLOC: Counting = Counting::new();
    let store = Options::new().allocator(&ALLOC).parse(DOC).unwrap();
    assert_eq!(store.len(), 7);
    assert!(ALLOC.live() > 0);
    drop(store);
    assert_eq!(ALLOC.live(), 0);
}

#[test]
fn close_releases_everything() {
    static ALLOC: Counting = Counting::new();
    let store = Options::new().allocator(&ALLOC).buckets(3).parse(DOC).unwrap();
    store.close();
    assert_eq!(ALLOC.live(), 0);
}

#[test]
fn failed_parse_releases_everything() {
    static ALLOC: Counting = Counting::new();
    let broken = format!("{DOC}\nlast = [1, 2");
    let err = Options::new().allocator(&ALLOC).parse(&broken).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnterminatedArray);
    assert_eq!(ALLOC.live(), 0);

    let err = Options::new()
        .allocator(&ALLOC)
        .parse("a { b = [\"x\", \"y\", \"z\" }")
        .unwrap_err();
    assert_eq!(err.status(), Status::Syntax);
    assert_eq!(ALLOC.live(), 0);
}

#[test]
fn overwrite_releases_the_previous_value() {
    static ALLOC: Counting = Counting::new();
    let single = Options::new().allocator(&ALLOC).parse("x = 1").unwrap();
    let expected = ALLOC.live();
    drop(single);

    let overwritten = Options::new()
        .allocator(&ALLOC)
        .parse("x = [\"a\", \"b\", \"c\"]\nx = [1, 2, 3]\nx = 1")
        .unwrap();
    assert_eq!(ALLOC.live(), expected);
    drop(overwritten);
    assert_eq!(ALLOC.live(), 0);
}

#[test]
fn every_allocation_failure_is_reported() {
    static ALLOC: Counting = Counting::new();
    ALLOC.reset(usize::MAX);
    let store = Options::new().allocator(&ALLOC).parse(DOC).unwrap();
    let total = ALLOC.requests();
    drop(store);
    assert!(total > 20, "only {total} allocation requests");

    for fail_at in 0..total {
        ALLOC.reset(fail_at);
        let err = Options::new().allocator(&ALLOC).parse(DOC).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OutOfMemory, "failing request #{fail_at}");
        assert_eq!(err.status(), Status::OutOfMemory);
        assert_eq!(ALLOC.live(), 0, "leak after failing request #{fail_at}");
    }

    ALLOC.reset(total);
    let store = Options::new().allocator(&ALLOC).parse(DOC).unwrap();
    assert_eq!(store.len(), 7);
}

#[test]
fn open_allocates_through_the_store_allocator() {
    static ALLOC: Counting = Counting::new();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DOC.as_bytes()).unwrap();
    file.flush().unwrap();

    let store = Options::new().allocator(&ALLOC).open(file.path()).unwrap();
    assert_eq!(store.get_integer("server.port"), Some(&[8081][..]));
    drop(store);
    assert_eq!(ALLOC.live(), 0);

    ALLOC.reset(0);
    let err = Options::new().allocator(&ALLOC).open(file.path()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert_eq!(ALLOC.live(), 0);
}
