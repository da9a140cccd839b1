//! Shared RocksDB storage utilities.
//!
//! This module provides generic utilities and patterns for RocksDB-based
//! storage. It contains no forum logic - just RocksDB helpers.
//!
//! ## Key Features
//!
//! - Configurable RocksDB setup with sensible defaults
//! - Generic key-value operations with bincode serialization
//! - Forward and reverse prefix iteration
//! - Atomic write batches for compound mutations

use crate::error::{GlassError, Result};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options,
    WriteBatch,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

// =============================================================================
// RocksDB Configuration
// =============================================================================

/// Configuration for RocksDB storage.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Maximum number of open files.
    pub max_open_files: i32,
    /// Number of log files to keep.
    pub keep_log_file_num: usize,
    /// Maximum WAL size in bytes.
    pub max_wal_size: u64,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Maximum number of write buffers.
    pub max_write_buffer_number: i32,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 128,
            keep_log_file_num: 2,
            max_wal_size: 16 * 1024 * 1024,      // 16MB
            write_buffer_size: 8 * 1024 * 1024,  // 8MB
            max_write_buffer_number: 2,
        }
    }
}

impl RocksDbConfig {
    /// Builds RocksDB Options from this configuration.
    pub fn build_options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_keep_log_file_num(self.keep_log_file_num);
        opts.set_max_total_wal_size(self.max_wal_size);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_max_write_buffer_number(self.max_write_buffer_number);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }
}

// =============================================================================
// Key Generation Utilities
// =============================================================================

/// Creates a prefixed key with a separator.
///
/// Format: `{prefix}{separator}{suffix}`
pub fn prefixed_key(prefix: &[u8], separator: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + suffix.len());
    key.extend_from_slice(prefix);
    key.push(separator);
    key.extend_from_slice(suffix);
    key
}

/// Encodes an id so that byte order equals numeric order.
pub fn id_key(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Decodes an id written by [`id_key`] from the last eight bytes of `key`.
pub fn id_from_key_suffix(key: &[u8]) -> Option<u64> {
    let start = key.len().checked_sub(8)?;
    let bytes: [u8; 8] = key[start..].try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| GlassError::serialization(format!("Failed to serialize: {}", e)))
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| GlassError::serialization(format!("Failed to deserialize: {}", e)))
}

// =============================================================================
// Database Handle Wrapper
// =============================================================================

/// A wrapper around RocksDB that provides common operations.
///
/// This is designed to be embedded in storage structs to provide
/// shared functionality while allowing storage-specific extensions.
pub struct RocksDbHandle {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksDbHandle {
    /// Opens a RocksDB database with the given column families.
    pub fn open(
        db_path: impl AsRef<Path>,
        config: &RocksDbConfig,
        column_families: &[&str],
    ) -> Result<Self> {
        let opts = config.build_options();
        let cf_opts = Options::default();

        let cf_descriptors: Vec<_> = column_families
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            db_path.as_ref(),
            cf_descriptors,
        )
        .map_err(|e| GlassError::storage(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Gets a column family handle.
    pub fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| GlassError::storage(format!("Column family '{}' not found", name)))
    }

    /// Stores a serializable value at the given key.
    pub fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serialize(value)?;

        trace!(
            cf = cf_name,
            key_len = key.len(),
            value_bytes = bytes.len(),
            "db_put: storing serialized value"
        );

        self.db
            .put_cf(&cf, key, &bytes)
            .map_err(|e| GlassError::storage(format!("Failed to write: {}", e)))?;

        Ok(())
    }

    /// Loads and deserializes a value from the given key.
    pub fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;

        match self.db.get_cf(&cf, key) {
            Ok(Some(bytes)) => {
                trace!(
                    cf = cf_name,
                    key_len = key.len(),
                    value_bytes = bytes.len(),
                    "db_get: found record"
                );
                Ok(Some(deserialize(&bytes)?))
            }
            Ok(None) => {
                trace!(cf = cf_name, key_len = key.len(), "db_get: key not found");
                Ok(None)
            }
            Err(e) => Err(GlassError::storage(format!("Failed to read: {}", e))),
        }
    }

    /// Checks if a key exists.
    pub fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        let cf = self.cf(cf_name)?;
        let exists = self
            .db
            .get_cf(&cf, key)
            .map(|v| v.is_some())
            .map_err(|e| GlassError::storage(format!("Failed to check key: {}", e)))?;

        trace!(
            cf = cf_name,
            key_len = key.len(),
            exists = exists,
            "db_exists: checked key existence"
        );

        Ok(exists)
    }

    /// Iterates over all entries with the given prefix, in ascending key order.
    ///
    /// The callback receives (key, value) pairs and should return true to continue
    /// or false to stop iteration. A failing iterator aborts with a storage error
    /// instead of reporting a partial scan as complete.
    pub fn prefix_iterate<F>(&self, cf_name: &str, prefix: &[u8], mut callback: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        let cf = self.cf(cf_name)?;
        let iter = self.db.prefix_iterator_cf(&cf, prefix);

        let count = scan_prefix(iter, prefix, &mut callback).map_err(|e| {
            warn!(cf = cf_name, "Iterator error: {}", e);
            e
        })?;

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_iterated = count,
            "db_prefix_iterate: completed iteration"
        );

        Ok(())
    }

    /// Iterates over all entries with the given prefix, in descending key order.
    ///
    /// Same callback contract as [`RocksDbHandle::prefix_iterate`].
    pub fn prefix_iterate_rev<F>(
        &self,
        cf_name: &str,
        prefix: &[u8],
        mut callback: F,
    ) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> bool,
    {
        let cf = self.cf(cf_name)?;
        let mut iter = self.db.raw_iterator_cf(&cf);

        match prefix_successor(prefix) {
            Some(upper) => iter.seek_for_prev(&upper),
            None => iter.seek_to_last(),
        }

        let mut count: usize = 0;
        while iter.valid() {
            let (Some(key), Some(value)) = (iter.key(), iter.value()) else {
                break;
            };
            if key.starts_with(prefix) {
                count += 1;
                if !callback(key, value) {
                    break;
                }
            } else if key < prefix {
                break;
            }
            iter.prev();
        }
        iter.status().map_err(|e| {
            warn!(cf = cf_name, "Iterator error: {}", e);
            GlassError::storage(format!("Failed to iterate: {}", e))
        })?;

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_iterated = count,
            "db_prefix_iterate_rev: completed reverse iteration"
        );

        Ok(())
    }

    /// Collects all values with the given prefix, deserializing each.
    ///
    /// Records that fail to deserialize are logged and skipped.
    pub fn prefix_collect<T: DeserializeOwned>(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<T>> {
        let mut results = Vec::new();
        let mut errors: usize = 0;

        self.prefix_iterate(cf_name, prefix, |_, value| {
            match deserialize(value) {
                Ok(item) => results.push(item),
                Err(e) => {
                    errors += 1;
                    warn!("Failed to deserialize item: {}", e);
                }
            }
            true
        })?;

        debug!(
            cf = cf_name,
            prefix_len = prefix.len(),
            records_collected = results.len(),
            deserialization_errors = errors,
            "db_prefix_collect: collected records"
        );

        Ok(results)
    }

    /// Collects the keys with the given prefix, in ascending order.
    pub fn prefix_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.prefix_iterate(cf_name, prefix, |key, _| {
            keys.push(key.to_vec());
            true
        })?;
        Ok(keys)
    }

    /// Starts an atomic write batch against this database.
    pub fn batch(&self) -> Batch<'_> {
        Batch {
            handle: self,
            inner: WriteBatch::default(),
            ops: 0,
        }
    }
}

/// Feeds the entries of `items` that start with `prefix` to `callback`.
///
/// Stops at the first key outside the prefix or when the callback returns
/// false. Returns how many entries were visited.
fn scan_prefix<I, K, V, E, F>(items: I, prefix: &[u8], callback: &mut F) -> Result<usize>
where
    I: IntoIterator<Item = std::result::Result<(K, V), E>>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(&[u8], &[u8]) -> bool,
{
    let mut count: usize = 0;
    for item in items {
        let (key, value) =
            item.map_err(|e| GlassError::storage(format!("Failed to iterate: {}", e)))?;
        let key = key.as_ref();
        if !key.starts_with(prefix) {
            break;
        }
        count += 1;
        if !callback(key, value.as_ref()) {
            break;
        }
    }
    Ok(count)
}

/// Smallest byte string greater than every key starting with `prefix`.
fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

impl std::fmt::Debug for RocksDbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbHandle")
            .field("db", &"RocksDB")
            .finish()
    }
}

// =============================================================================
// Write Batches
// =============================================================================

/// A set of writes applied atomically by [`Batch::commit`].
///
/// Nothing is visible to readers until the batch is committed; dropping an
/// uncommitted batch discards it.
pub struct Batch<'a> {
    handle: &'a RocksDbHandle,
    inner: WriteBatch,
    ops: usize,
}

impl Batch<'_> {
    /// Queues a serialized value.
    pub fn put<T: Serialize>(&mut self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let bytes = serialize(value)?;
        self.put_raw(cf_name, key, &bytes)
    }

    /// Queues raw bytes.
    pub fn put_raw(&mut self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.handle.cf(cf_name)?;
        self.inner.put_cf(&cf, key, value);
        self.ops += 1;
        Ok(())
    }

    /// Queues a deletion.
    pub fn delete(&mut self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.handle.cf(cf_name)?;
        self.inner.delete_cf(&cf, key);
        self.ops += 1;
        Ok(())
    }

    /// Writes every queued operation in one atomic step.
    pub fn commit(self) -> Result<()> {
        let ops = self.ops;
        self.handle
            .db
            .write(self.inner)
            .map_err(|e| GlassError::storage(format!("Failed to commit batch: {}", e)))?;
        trace!(ops = ops, "db_batch: committed");
        Ok(())
    }
}
