//! Adapters implementing the domain ports.

pub mod codec;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
