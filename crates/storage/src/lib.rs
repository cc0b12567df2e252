//! # Storage
//!
//! Persistence adapters for the dispatch engine. Each SDK instance owns one
//! logical slot holding its pending events; `save` atomically replaces the
//! slot and quota-bounded adapters shed oldest events, reporting the drop.

pub mod file;
pub mod memory;

pub use contracts::EventStore;
pub use file::FileStore;
pub use memory::MemoryStore;
