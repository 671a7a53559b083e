//! Storage abstraction and implementations for Pathtrack.
//!
//! This crate provides a trait-based storage interface with revision-checked
//! writes, an in-memory backend and a JSON file backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod memory_storage;
#[cfg(feature = "json")]
pub mod json_storage;

pub use trait_::{Storage, StorageError, Result};
pub use memory_storage::MemoryStorage;
#[cfg(feature = "json")]
pub use json_storage::JsonStorage;
