//! Prefix index: hashed bucket table to sparse candidate restart points.

use std::collections::HashMap;
use std::mem;

use crate::index::key_prefix;

/// Maps key prefixes, hashed into a fixed number of buckets, to the restart
/// points whose restart keys carry a prefix from that bucket.
///
/// Because distinct prefixes can share a bucket, one lookup may return a
/// sparse candidate list: restart points between two candidates are
/// guaranteed not to start with the target's prefix. The seek path exploits
/// that to prove a target absent without scanning the gap.
#[derive(Debug)]
pub struct BlockPrefixIndex {
    prefix_len: usize,
    num_buckets: u32,
    buckets: HashMap<u32, Vec<u32>>,
}

impl BlockPrefixIndex {
    /// Creates an empty index hashing `prefix_len`-byte prefixes into
    /// `num_buckets` buckets.
    pub fn new(prefix_len: usize, num_buckets: u32) -> Self {
        assert!(prefix_len >= 1, "prefix length must be at least 1");
        assert!(num_buckets >= 1, "bucket count must be at least 1");
        Self { prefix_len, num_buckets, buckets: HashMap::new() }
    }

    /// Records `restart_index` as a candidate for `key`'s prefix bucket.
    /// Candidates must be added in ascending restart order; keys shorter
    /// than the prefix length are ignored.
    pub fn add(&mut self, key: &[u8], restart_index: u32) {
        if let Some(prefix) = key_prefix(key, self.prefix_len) {
            let ids = self.buckets.entry(self.bucket(prefix)).or_default();
            debug_assert!(ids.last().map_or(true, |&last| last < restart_index));
            ids.push(restart_index);
        }
    }

    /// The ascending candidate restart points for `key`'s prefix bucket.
    /// Empty when the key cannot be in the block.
    pub fn get_blocks(&self, key: &[u8]) -> &[u32] {
        key_prefix(key, self.prefix_len)
            .and_then(|prefix| self.buckets.get(&self.bucket(prefix)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rough heap footprint of the index.
    pub fn approximate_memory_usage(&self) -> usize {
        let ids: usize = self.buckets.values().map(|v| v.capacity() * mem::size_of::<u32>()).sum();
        mem::size_of::<Self>()
            + self.buckets.capacity() * (mem::size_of::<u32>() + mem::size_of::<Vec<u32>>())
            + ids
    }

    fn bucket(&self, prefix: &[u8]) -> u32 {
        crc32fast::hash(prefix) % self.num_buckets
    }
}
