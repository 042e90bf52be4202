//! Adapters implementing the domain ports.

pub mod gateway_stub;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
