//! Cursor over the entries of a block.
//!
//! Entries are prefix-compressed, so a key is only decodable after its
//! predecessor's key has been reconstructed. All motion is therefore built
//! from two primitives: jump to a restart point (where `shared == 0`) and
//! parse forward one entry. `prev` rewinds to the nearest restart point
//! before the current entry and walks forward; `seek` binary-searches the
//! restart array and then walks forward.

use std::cmp::Ordering;

use crate::block::entry::decode_entry;
use crate::coding::decode_fixed32;
use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::index::{BlockHashIndex, BlockPrefixIndex};

/// The current key of a cursor.
///
/// At restart points the key is a direct slice of the block buffer; anywhere
/// else it is assembled in an owned buffer by trimming the previous key to
/// the shared length and appending the unshared bytes.
#[derive(Debug, Default)]
struct IterKey<'a> {
    slice: Option<&'a [u8]>,
    buf: Vec<u8>,
}

impl<'a> IterKey<'a> {
    fn set_slice(&mut self, key: &'a [u8]) {
        self.slice = Some(key);
    }

    fn trim_append(&mut self, shared: usize, unshared: &[u8]) {
        if let Some(prev) = self.slice.take() {
            self.buf.clear();
            self.buf.extend_from_slice(&prev[..shared]);
        } else {
            self.buf.truncate(shared);
        }
        self.buf.extend_from_slice(unshared);
    }

    fn clear(&mut self) {
        self.slice = None;
        self.buf.clear();
    }

    fn len(&self) -> usize {
        match self.slice {
            Some(s) => s.len(),
            None => self.buf.len(),
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self.slice {
            Some(s) => s,
            None => &self.buf,
        }
    }
}

/// A stateful cursor over a block's entries.
///
/// Created by [`Block::iter`](crate::Block::iter). The cursor borrows the
/// block's buffer and any attached indexes, so it cannot outlive the block.
/// It is not safe for concurrent use; clone-free multiple readers should each
/// take their own cursor.
///
/// Movement never returns errors directly: a decode failure parks the cursor
/// in a corrupt state that [`status`](Self::status) reports and no later call
/// clears.
pub struct BlockIter<'a> {
    comparator: &'a dyn Comparator,
    /// The block buffer. Empty for cursors that can never become valid.
    data: &'a [u8],
    /// Offset where the restart array begins; entries end here.
    restarts: u32,
    num_restarts: u32,
    /// Offset of the entry whose key/value are exposed; `== restarts` when
    /// the cursor is invalid.
    current: u32,
    /// Offset just past the current entry; the next parse starts here.
    next_offset: u32,
    /// Largest restart index whose offset does not exceed `current`;
    /// `== num_restarts` when the cursor is invalid.
    restart_index: u32,
    key: IterKey<'a>,
    value: &'a [u8],
    status: Option<Error>,
    hash_index: Option<&'a BlockHashIndex>,
    prefix_index: Option<&'a BlockPrefixIndex>,
}

impl<'a> BlockIter<'a> {
    pub(crate) fn new(
        comparator: &'a dyn Comparator,
        data: &'a [u8],
        restarts: u32,
        num_restarts: u32,
        hash_index: Option<&'a BlockHashIndex>,
        prefix_index: Option<&'a BlockPrefixIndex>,
    ) -> Self {
        debug_assert!(num_restarts > 0);
        Self {
            comparator,
            data,
            restarts,
            num_restarts,
            current: restarts,
            next_offset: restarts,
            restart_index: num_restarts,
            key: IterKey::default(),
            value: &[],
            status: None,
            hash_index,
            prefix_index,
        }
    }

    /// A cursor that is permanently invalid with the given status.
    pub(crate) fn with_status(comparator: &'a dyn Comparator, error: Error) -> Self {
        let mut iter = Self::empty(comparator);
        iter.status = Some(error);
        iter
    }

    /// A cursor over no entries; never valid, status OK.
    pub(crate) fn empty(comparator: &'a dyn Comparator) -> Self {
        Self {
            comparator,
            data: &[],
            restarts: 0,
            num_restarts: 0,
            current: 0,
            next_offset: 0,
            restart_index: 0,
            key: IterKey::default(),
            value: &[],
            status: None,
            hash_index: None,
            prefix_index: None,
        }
    }

    /// Returns true if the cursor is positioned at an entry.
    pub fn valid(&self) -> bool {
        self.current < self.restarts
    }

    /// The cursor's error state. `Ok` unless a block or entry was corrupt.
    pub fn status(&self) -> Result<()> {
        match &self.status {
            None => Ok(()),
            Some(err) => Err(err.clone()),
        }
    }

    /// The reconstructed key of the current entry.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the cursor is not valid.
    pub fn key(&self) -> &[u8] {
        debug_assert!(self.valid());
        self.key.as_slice()
    }

    /// The value of the current entry, borrowed from the block buffer.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the cursor is not valid.
    pub fn value(&self) -> &'a [u8] {
        debug_assert!(self.valid());
        self.value
    }

    /// Positions the cursor at the first entry, or invalidates it if the
    /// block has none.
    pub fn seek_to_first(&mut self) {
        if self.data.is_empty() || self.status.is_some() {
            return;
        }
        self.seek_to_restart_point(0);
        self.parse_next_key();
    }

    /// Positions the cursor at the last entry, or invalidates it if the
    /// block has none.
    pub fn seek_to_last(&mut self) {
        if self.data.is_empty() || self.status.is_some() {
            return;
        }
        self.seek_to_restart_point(self.num_restarts - 1);
        while self.parse_next_key() && self.next_offset < self.restarts {
            // Keep skipping to the final entry.
        }
    }

    /// Positions the cursor at the first entry whose key is `>= target`,
    /// or invalidates it if no such entry exists.
    pub fn seek(&mut self, target: &[u8]) {
        if self.data.is_empty() || self.status.is_some() {
            return;
        }

        let index = if self.prefix_index.is_some() {
            self.prefix_seek(target)
        } else if self.hash_index.is_some() {
            self.hash_seek(target)
        } else {
            self.binary_seek(target, 0, self.num_restarts - 1)
        };
        let index = match index {
            Some(i) => i,
            None => return,
        };

        self.seek_to_restart_point(index);
        // Linear walk within the restart region for the first key >= target.
        loop {
            if !self.parse_next_key()
                || self.comparator.compare(self.key.as_slice(), target) != Ordering::Less
            {
                return;
            }
        }
    }

    /// Advances to the next entry.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the cursor is not valid.
    pub fn next(&mut self) {
        debug_assert!(self.valid());
        if self.status.is_some() {
            return;
        }
        self.parse_next_key();
    }

    /// Moves to the previous entry, or invalidates the cursor if the current
    /// entry is the first.
    ///
    /// Entries only decode forward, so this rewinds to the nearest restart
    /// point before the current entry and walks up to its predecessor.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if the cursor is not valid.
    pub fn prev(&mut self) {
        debug_assert!(self.valid());
        if self.status.is_some() {
            return;
        }

        let original = self.current;
        while self.restart_point(self.restart_index) >= original {
            if self.restart_index == 0 {
                // No entry precedes the current one.
                self.current = self.restarts;
                self.restart_index = self.num_restarts;
                return;
            }
            self.restart_index -= 1;
        }

        self.seek_to_restart_point(self.restart_index);
        while self.parse_next_key() && self.next_offset < original {
            // Walk forward until the next entry would be the original.
        }
    }

    /// Byte offset of restart point `index`.
    fn restart_point(&self, index: u32) -> u32 {
        debug_assert!(index < self.num_restarts);
        decode_fixed32(self.data, self.restarts as usize + index as usize * 4)
    }

    /// Resets decode state so the next parse lands on restart point `index`.
    fn seek_to_restart_point(&mut self, index: u32) {
        self.key.clear();
        self.restart_index = index;
        self.next_offset = self.restart_point(index);
        self.value = &[];
    }

    /// Parses the entry at `next_offset` and exposes it as current.
    ///
    /// Returns false when the entry region is exhausted (cursor invalid,
    /// status untouched) or the entry is corrupt (cursor invalid, status
    /// set).
    fn parse_next_key(&mut self) -> bool {
        self.current = self.next_offset;
        if self.current >= self.restarts {
            // No more entries.
            self.current = self.restarts;
            self.restart_index = self.num_restarts;
            return false;
        }

        let entry = match decode_entry(self.data, self.current as usize, self.restarts as usize) {
            Some(entry) if entry.shared as usize <= self.key.len() => entry,
            _ => {
                self.corruption_error();
                return false;
            }
        };

        let key_start = entry.key_offset;
        let key_end = key_start + entry.non_shared as usize;
        if entry.shared == 0 {
            // The full key is stored inline; expose it without copying.
            self.key.set_slice(&self.data[key_start..key_end]);
        } else {
            self.key.trim_append(entry.shared as usize, &self.data[key_start..key_end]);
        }
        self.value = &self.data[key_end..key_end + entry.value_length as usize];
        self.next_offset = (key_end + entry.value_length as usize) as u32;

        while self.restart_index + 1 < self.num_restarts
            && self.restart_point(self.restart_index + 1) < self.current
        {
            self.restart_index += 1;
        }
        true
    }

    /// Parks the cursor in the corrupt state: both invalid sentinels set,
    /// key and value cleared, status recorded.
    fn corruption_error(&mut self) {
        self.current = self.restarts;
        self.restart_index = self.num_restarts;
        self.status = Some(Error::bad_entry_in_block("entry failed to decode"));
        self.key.clear();
        self.value = &[];
    }

    /// Binary search over restart indices `[left, right]` (inclusive) for the
    /// last restart point whose key is `< target`, or the first whose key is
    /// `>= target` when none is smaller. Returns `None` on corruption.
    fn binary_seek(&mut self, target: &[u8], mut left: u32, mut right: u32) -> Option<u32> {
        debug_assert!(left <= right);

        while left < right {
            // Upper-biased midpoint makes progress whenever left < right,
            // and guarantees mid >= 1 so the decrement below cannot wrap.
            let mid = (left + right + 1) / 2;
            let region_offset = self.restart_point(mid);
            let entry =
                match decode_entry(self.data, region_offset as usize, self.restarts as usize) {
                    Some(entry) if entry.shared == 0 => entry,
                    _ => {
                        self.corruption_error();
                        return None;
                    }
                };
            let mid_key =
                &self.data[entry.key_offset..entry.key_offset + entry.non_shared as usize];
            match self.comparator.compare(mid_key, target) {
                Ordering::Less => left = mid,
                Ordering::Greater => {
                    debug_assert!(mid >= 1);
                    right = mid - 1;
                }
                Ordering::Equal => {
                    left = mid;
                    right = mid;
                }
            }
        }

        Some(left)
    }

    /// Compares the restart key of restart point `block_index` with `target`.
    /// Returns `None` on corruption.
    fn compare_block_key(&mut self, block_index: u32, target: &[u8]) -> Option<Ordering> {
        let region_offset = self.restart_point(block_index);
        let entry = match decode_entry(self.data, region_offset as usize, self.restarts as usize) {
            Some(entry) if entry.shared == 0 => entry,
            _ => {
                self.corruption_error();
                return None;
            }
        };
        let block_key = &self.data[entry.key_offset..entry.key_offset + entry.non_shared as usize];
        Some(self.comparator.compare(block_key, target))
    }

    /// Binary search over a sparse, ascending list of candidate restart
    /// indices for the first whose restart key is `>= target`.
    ///
    /// Returns `None` (cursor invalidated) when every candidate key is
    /// smaller than the target, when the target falls in a gap the index
    /// omitted, or on corruption.
    fn binary_block_index_seek(&mut self, target: &[u8], block_ids: &[u32]) -> Option<u32> {
        debug_assert!(!block_ids.is_empty());
        let mut left = 0usize;
        let mut right = block_ids.len() - 1;

        while left <= right {
            let mid = (left + right) / 2;
            match self.compare_block_key(block_ids[mid], target)? {
                Ordering::Less => left = mid + 1,
                _ => {
                    if left == right {
                        break;
                    }
                    right = mid;
                }
            }
        }

        if left != right {
            // Every candidate restart key is smaller than the target.
            self.current = self.restarts;
            self.restart_index = self.num_restarts;
            return None;
        }

        // The candidate list may skip restart points. If a gap immediately
        // precedes the chosen candidate and the restart key just before it is
        // already greater than the target, the target sits inside a region
        // the index ruled out: the key cannot exist in this block.
        if block_ids[left] > 0
            && (left == 0 || block_ids[left - 1] != block_ids[left] - 1)
            && self.compare_block_key(block_ids[left] - 1, target)? == Ordering::Greater
        {
            self.current = self.restarts;
            self.restart_index = self.num_restarts;
            return None;
        }

        Some(block_ids[left])
    }

    /// Narrows the binary-search range with the hash index, then runs the
    /// restart binary search on it.
    fn hash_seek(&mut self, target: &[u8]) -> Option<u32> {
        let hash_index = self.hash_index.expect("hash_seek requires a hash index");
        let range = match hash_index.get_restart_index(target) {
            Some(range) => range,
            None => {
                // The bucket is absent: the key cannot be in this block.
                self.current = self.restarts;
                self.restart_index = self.num_restarts;
                return None;
            }
        };
        debug_assert!(range.num_blocks > 0);
        let left = range.first_index;
        let right = range.first_index + range.num_blocks - 1;
        self.binary_seek(target, left, right)
    }

    /// Resolves the prefix index's candidate restart list, then runs the
    /// sparse binary search on it.
    fn prefix_seek(&mut self, target: &[u8]) -> Option<u32> {
        let prefix_index = self.prefix_index.expect("prefix_seek requires a prefix index");
        let block_ids = prefix_index.get_blocks(target);
        if block_ids.is_empty() {
            self.current = self.restarts;
            self.restart_index = self.num_restarts;
            return None;
        }
        self.binary_block_index_seek(target, block_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::comparator::BytewiseComparator;
    use bytes::Bytes;

    /// Hand-assembles a block from raw entry bytes and restart offsets, so
    /// tests pin the exact on-disk format.
    fn raw_block(entries: &[u8], restarts: &[u32]) -> Block {
        let mut data = entries.to_vec();
        for &offset in restarts {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        data.extend_from_slice(&(restarts.len() as u32).to_le_bytes());
        Block::new(Bytes::from(data))
    }

    #[test]
    fn test_single_entry_walk() {
        // shared=0, non_shared=3, value_length=4, "foo" -> "BARS"
        let block = raw_block(b"\x00\x03\x04fooBARS", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        assert!(!iter.valid());
        iter.seek_to_first();
        assert!(iter.valid());
        assert_eq!(iter.key(), b"foo");
        assert_eq!(iter.value(), b"BARS");

        iter.next();
        assert!(!iter.valid());
        assert!(iter.status().is_ok());
    }

    #[test]
    fn test_single_entry_seek() {
        let block = raw_block(b"\x00\x03\x04fooBARS", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek(b"foo");
        assert!(iter.valid());
        assert_eq!(iter.key(), b"foo");

        iter.seek(b"fop");
        assert!(!iter.valid());
        assert!(iter.status().is_ok());
    }

    #[test]
    fn test_prefix_compressed_pair() {
        // "foo" -> "1", then shared=2 + "r" reconstructs "for" -> "2".
        let block = raw_block(b"\x00\x03\x01foo1\x02\x01\x01r2", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek_to_first();
        assert_eq!(iter.key(), b"foo");
        assert_eq!(iter.value(), b"1");
        iter.next();
        assert!(iter.valid());
        assert_eq!(iter.key(), b"for");
        assert_eq!(iter.value(), b"2");

        // prev rewinds to restart 0 and walks forward once.
        iter.prev();
        assert!(iter.valid());
        assert_eq!(iter.key(), b"foo");

        iter.seek(b"fop");
        assert!(iter.valid());
        assert_eq!(iter.key(), b"for");

        iter.seek(b"fos");
        assert!(!iter.valid());
    }

    #[test]
    fn test_two_restarts() {
        // Two uncompressed entries, each its own restart point.
        let entries = b"\x00\x03\x01abcA\x00\x03\x01defD";
        let block = raw_block(entries, &[0, 7]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek(b"abd");
        assert!(iter.valid());
        assert_eq!(iter.key(), b"def");
        assert_eq!(iter.value(), b"D");

        iter.seek_to_last();
        assert_eq!(iter.key(), b"def");

        iter.prev();
        assert!(iter.valid());
        assert_eq!(iter.key(), b"abc");

        iter.prev();
        assert!(!iter.valid());
    }

    #[test]
    fn test_corrupt_value_length() {
        // Header claims 200 value bytes; only 3 exist before the trailer.
        let block = raw_block(b"\x00\x03\xc8\x01foo", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek_to_first();
        assert!(!iter.valid());
        assert!(matches!(iter.status(), Err(Error::BadEntryInBlock(_))));

        // Corruption is terminal: later calls stay parked.
        iter.seek_to_first();
        assert!(!iter.valid());
        assert!(matches!(iter.status(), Err(Error::BadEntryInBlock(_))));
    }

    #[test]
    fn test_corrupt_shared_exceeds_prev_key() {
        // First entry "ab"; second claims 5 shared bytes with it.
        let block = raw_block(b"\x00\x02\x01abX\x05\x01\x01cY", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek_to_first();
        assert!(iter.valid());
        iter.next();
        assert!(!iter.valid());
        assert!(matches!(iter.status(), Err(Error::BadEntryInBlock(_))));
    }

    #[test]
    fn test_corrupt_restart_key_compressed() {
        // Restart 1 points at an entry with shared != 0; binary seek must
        // report corruption instead of reconstructing from nothing.
        let entries = b"\x00\x03\x01abcA\x02\x01\x01dD";
        let block = raw_block(entries, &[0, 7]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek(b"zzz");
        assert!(!iter.valid());
        assert!(matches!(iter.status(), Err(Error::BadEntryInBlock(_))));
    }

    #[test]
    fn test_empty_block_cursor() {
        // One restart at offset 0 and no entries: never valid, status OK.
        let block = raw_block(b"", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);

        iter.seek_to_first();
        assert!(!iter.valid());
        iter.seek_to_last();
        assert!(!iter.valid());
        iter.seek(b"anything");
        assert!(!iter.valid());
        assert!(iter.status().is_ok());
    }

    #[test]
    fn test_zero_copy_key_at_restart() {
        let block = raw_block(b"\x00\x03\x04fooBARS", &[0]);
        let cmp = BytewiseComparator;
        let mut iter = block.iter(&cmp, false);
        iter.seek_to_first();

        // The key slice must point into the block buffer, not a copy.
        let key_ptr = iter.key().as_ptr() as usize;
        let data = block.data();
        let start = data.as_ptr() as usize;
        assert!(key_ptr >= start && key_ptr < start + data.len());
    }
}
