//! A reader for a small, brace-scoped configuration format that materializes
//! documents as a typed key-value store.
//!
//! Nested `name { ... }` blocks flatten into dotted names, and every
//! right-hand side is stored as a homogeneous block of 64-bit integers,
//! doubles or strings. Every byte the store owns comes from an [`Allocator`],
//! either the process-wide one (see [`set_allocator`]) or one passed through
//! [`Options::allocator`].
//!
//! # Examples
//!
//! ```
//! use nestconf::{Error, Kind};
//!
//! let content = r#"
//! // service settings
//! name = "api"
//!
//! server {
//!     port = 8080
//!     weights = [1, 0.5]
//!     tls {
//!         ciphers = ["aes", "chacha"]
//!     }
//! }
//! "#;
//!
//! let store = nestconf::parse(content)?;
//!
//! assert_eq!(store.get_string("name").unwrap()[0], "api");
//! assert_eq!(store.get_integer("server.port"), Some(&[8080][..]));
//! assert_eq!(store.get_double("server.weights"), Some(&[1.0, 0.5][..]));
//!
//! let ciphers = store.require("server.tls.ciphers")?;
//! assert_eq!(ciphers.kind(), Kind::String);
//! assert_eq!(ciphers.len(), 2);
//! # Ok::<(), Error>(())
//! ```

mod alloc;
mod block;
mod decode;
mod error;
mod lexer;
mod parser;
mod scope;
mod span;
mod store;
mod value;

pub use alloc::{AllocFn, Allocator, DupStrFn, MemHooks, ReallocFn, ReleaseFn, System, set_allocator};
pub use block::{Block, Text};
pub use error::{Error, ErrorKind, Status};
pub use parser::{Options, open, parse};
pub use span::Span;
pub use store::{DEFAULT_BUCKETS, Dump, Store};
pub use value::{Kind, Value};

#[cfg(feature = "serde")]
pub mod impl_serde;
