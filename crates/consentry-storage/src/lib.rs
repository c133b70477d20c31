//! Consentry Storage - Record persistence backends.
//!
//! This crate persists the consent record produced by `consentry-core`. It
//! handles:
//!
//! - The keyed text-record backend seam and an in-memory implementation
//! - A file-per-key local store (the persistent-storage analogue)
//! - A cookie backend rendering full attribute strings over a host jar
//! - Reversible record obfuscation (explicitly not encryption)
//! - The [`StorageAdapter`] gluing it together behind the core's store trait
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use consentry_core::ConsentManager;
//! use consentry_storage::{CookieBackend, MemoryCookieJar, StorageAdapter};
//!
//! let jar = Arc::new(MemoryCookieJar::new());
//! let adapter = StorageAdapter::new(Box::new(CookieBackend::new(jar))).with_encoding(true);
//! let manager = ConsentManager::new(Arc::new(adapter));
//!
//! tokio_test::block_on(async {
//!     manager.accept_all().await.unwrap();
//! });
//! assert!(manager.load().is_some());
//! ```

mod adapter;
mod backend;
mod cookie;
pub mod encoding;
pub mod error;
mod local;

pub use adapter::{StorageAdapter, DEFAULT_STORAGE_KEY};
pub use backend::{MemoryBackend, StorageBackend};
pub use cookie::{CookieAttributes, CookieBackend, CookieJar, MemoryCookieJar, SameSite};
pub use error::{Result, StorageError};
pub use local::LocalBackend;
