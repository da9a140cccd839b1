//! Storage utilities and abstractions.
//!
//! ## Modules
//!
//! - `rocksdb`: Generic RocksDB utilities (configuration, handle, iteration, batches)

pub mod rocksdb;

pub use rocksdb::{
    id_from_key_suffix, id_key, prefixed_key, Batch, RocksDbConfig, RocksDbHandle,
};
