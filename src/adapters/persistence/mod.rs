//! Persistence Adapters - Tree Stores and Rate Repository
//!
//! Implements the `TreeStore` port three ways (memory, JSON file,
//! Firebase REST) and the `RateRepository` port on top of any of them.

pub mod file;
pub mod firebase;
pub mod memory;
pub mod repository_impl;
mod tree;

pub use file::FileStore;
pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use repository_impl::TreeRateRepository;
