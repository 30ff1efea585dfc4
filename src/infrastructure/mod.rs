//! Storage adapters implementing the [`crate::domain::ports::RecordStore`]
//! port, plus an in-memory transport double for tests.

pub mod in_memory;
pub mod json_file;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
