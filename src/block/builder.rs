//! Block builder with prefix compression.

use bytes::{BufMut, Bytes, BytesMut};

use crate::coding::{put_fixed32, put_varint32};

/// Builds a serialized block from sorted key/value pairs.
///
/// Every `block_restart_interval` entries the full key is written and its
/// offset recorded as a restart point; entries in between store only the
/// suffix that differs from their predecessor.
pub struct BlockBuilder {
    buffer: BytesMut,
    restarts: Vec<u32>,
    counter: usize,
    last_key: Vec<u8>,
    num_entries: usize,
    block_restart_interval: usize,
}

impl BlockBuilder {
    /// Creates a builder that places a restart point every
    /// `block_restart_interval` entries.
    pub fn new(block_restart_interval: usize) -> Self {
        assert!(block_restart_interval >= 1, "restart interval must be at least 1");
        Self {
            buffer: BytesMut::new(),
            restarts: vec![0],
            counter: 0,
            last_key: Vec::new(),
            num_entries: 0,
            block_restart_interval,
        }
    }

    /// Appends a key-value pair.
    ///
    /// # Panics
    ///
    /// Panics if `key` is empty or not strictly greater than the previous
    /// key.
    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        assert!(!key.is_empty(), "key cannot be empty");
        if !self.last_key.is_empty() {
            assert!(key > self.last_key.as_slice(), "keys must be added in sorted order");
        }

        let mut shared = 0;
        if self.counter >= self.block_restart_interval {
            self.restarts.push(self.buffer.len() as u32);
            self.counter = 0;
        } else if !self.last_key.is_empty() {
            shared = shared_prefix_len(&self.last_key, key);
        }
        let non_shared = key.len() - shared;

        put_varint32(&mut self.buffer, shared as u32);
        put_varint32(&mut self.buffer, non_shared as u32);
        put_varint32(&mut self.buffer, value.len() as u32);
        self.buffer.put_slice(&key[shared..]);
        self.buffer.put_slice(value);

        self.last_key.clear();
        self.last_key.extend_from_slice(key);
        self.counter += 1;
        self.num_entries += 1;
    }

    /// Appends the restart trailer and returns the finished block.
    ///
    /// An empty builder still produces a valid 8-byte block: one restart
    /// point at offset 0 and a restart count of 1.
    pub fn finish(mut self) -> Bytes {
        for &restart in &self.restarts {
            put_fixed32(&mut self.buffer, restart);
        }
        put_fixed32(&mut self.buffer, self.restarts.len() as u32);
        self.buffer.freeze()
    }

    /// Size of the block `finish` would currently produce.
    pub fn current_size_estimate(&self) -> usize {
        self.buffer.len() + self.restarts.len() * 4 + 4
    }

    /// True if no entry has been added.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of entries added so far.
    pub fn num_entries(&self) -> usize {
        self.num_entries
    }
}

fn shared_prefix_len(a: &[u8], b: &[u8]) -> usize {
    let min_len = a.len().min(b.len());
    let mut i = 0;
    while i < min_len && a[i] == b[i] {
        i += 1;
    }
    i
}
