use super::*;
use crate::alloc::System;

fn scope() -> Scope {
    Scope::new(&System)
}

#[test]
fn push_joins_with_dots() {
    let mut s = scope();
    assert_eq!(s.path(), "");
    s.push("server").unwrap();
    assert_eq!(s.path(), "server");
    s.push("tls").unwrap();
    assert_eq!(s.path(), "server.tls");
    assert_eq!(s.depth(), 2);
}

#[test]
fn pop_truncates_one_level() {
    let mut s = scope();
    s.push("a").unwrap();
    s.push("b").unwrap();
    s.push("c").unwrap();
    assert!(s.pop());
    assert_eq!(s.path(), "a.b");
    assert!(s.pop());
    assert_eq!(s.path(), "a");
    assert!(s.pop());
    assert_eq!(s.path(), "");
}

#[test]
fn pop_on_empty_is_a_no_op() {
    let mut s = scope();
    assert!(!s.pop());
    assert!(!s.pop());
    assert_eq!(s.path(), "");
    s.push("x").unwrap();
    assert_eq!(s.path(), "x");
}

#[test]
fn dotted_segment_pops_as_one() {
    let mut s = scope();
    s.push("outer").unwrap();
    s.push("a.b").unwrap();
    assert_eq!(s.path(), "outer.a.b");
    assert!(s.pop());
    assert_eq!(s.path(), "outer");
}

#[test]
fn long_paths_grow() {
    let mut s = scope();
    let segment = "segment-name-that-is-fairly-long";
    for _ in 0..64 {
        s.push(segment).unwrap();
    }
    assert_eq!(s.depth(), 64);
    assert_eq!(s.path().len(), 64 * segment.len() + 63);
    for _ in 0..64 {
        assert!(s.pop());
    }
    assert_eq!(s.path(), "");
}
