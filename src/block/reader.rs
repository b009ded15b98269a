//! Block handle: owns a block buffer and validates its trailer.

use bytes::Bytes;

use crate::block::entry::decode_entry;
use crate::block::iterator::BlockIter;
use crate::block::MIN_BLOCK_SIZE;
use crate::coding::decode_fixed32;
use crate::comparator::Comparator;
use crate::error::{Error, Result};
use crate::index::{BlockHashIndex, BlockPrefixIndex};

/// An immutable block of sorted key/value entries.
///
/// Construction never fails: a buffer too small for a trailer, or whose
/// trailer describes an impossible layout, marks the block degenerate and
/// every later operation reports [`Error::BadBlockContents`].
///
/// The block owns its buffer and any attached hash or prefix index; cursors
/// borrow all of them.
#[derive(Debug)]
pub struct Block {
    data: Bytes,
    /// Logical size; 0 marks a degenerate block.
    size: usize,
    /// Offset where the restart array begins.
    restart_offset: u32,
    hash_index: Option<BlockHashIndex>,
    prefix_index: Option<BlockPrefixIndex>,
}

impl Block {
    /// Wraps a serialized block buffer.
    pub fn new(data: Bytes) -> Self {
        let mut size = data.len();
        let mut restart_offset = 0;
        if size < 4 {
            size = 0;
        } else {
            let num_restarts = decode_fixed32(&data, data.len() - 4);
            // Computed in wrapping u32 arithmetic; an absurd restart count
            // wraps and is caught by the range check below.
            restart_offset =
                (size as u32).wrapping_sub(1u32.wrapping_add(num_restarts).wrapping_mul(4));
            if restart_offset as usize > size - 4 {
                size = 0;
            }
        }
        Self { data, size, restart_offset, hash_index: None, prefix_index: None }
    }

    /// Number of restart points recorded in the trailer.
    pub fn num_restarts(&self) -> u32 {
        debug_assert!(self.size >= MIN_BLOCK_SIZE);
        decode_fixed32(&self.data, self.data.len() - 4)
    }

    /// The raw block bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Buffer size plus the reported usage of any attached index.
    pub fn approximate_memory_usage(&self) -> usize {
        let mut usage = self.data.len();
        if let Some(index) = &self.hash_index {
            usage += index.approximate_memory_usage();
        }
        if let Some(index) = &self.prefix_index {
            usage += index.approximate_memory_usage();
        }
        usage
    }

    /// Attaches a hash index; the block takes ownership.
    pub fn set_hash_index(&mut self, index: BlockHashIndex) {
        self.hash_index = Some(index);
    }

    /// Attaches a prefix index; the block takes ownership.
    pub fn set_prefix_index(&mut self, index: BlockPrefixIndex) {
        self.prefix_index = Some(index);
    }

    /// Creates a cursor over the block's entries.
    ///
    /// A degenerate block yields a cursor whose status is
    /// [`Error::BadBlockContents`]; a block with zero restart points yields a
    /// cursor that is never valid but whose status is OK. With
    /// `total_order_seek` the attached indexes are ignored and every seek
    /// binary-searches the full restart range.
    pub fn iter<'a>(
        &'a self,
        comparator: &'a dyn Comparator,
        total_order_seek: bool,
    ) -> BlockIter<'a> {
        if self.size < MIN_BLOCK_SIZE {
            return BlockIter::with_status(
                comparator,
                Error::bad_block_contents("block too small for restart trailer"),
            );
        }
        let num_restarts = self.num_restarts();
        if num_restarts == 0 {
            return BlockIter::empty(comparator);
        }

        let hash_index = if total_order_seek { None } else { self.hash_index.as_ref() };
        let prefix_index = if total_order_seek { None } else { self.prefix_index.as_ref() };
        BlockIter::new(
            comparator,
            &self.data,
            self.restart_offset,
            num_restarts,
            hash_index,
            prefix_index,
        )
    }

    /// The key of the entry at the middle restart point.
    ///
    /// An approximation of the key halfway through the block, used for
    /// split-point planning. Degenerate blocks report
    /// [`Error::BadBlockContents`]; entry-free blocks report
    /// [`Error::Incomplete`].
    pub fn middle_key(&self) -> Result<&[u8]> {
        if self.size < MIN_BLOCK_SIZE {
            return Err(Error::bad_block_contents("block too small for restart trailer"));
        }
        if self.size == MIN_BLOCK_SIZE {
            return Err(Error::incomplete("empty block"));
        }

        let restart_idx = self.num_restarts() / 2;
        let entry_offset =
            decode_fixed32(&self.data, self.restart_offset as usize + restart_idx as usize * 4);
        match decode_entry(&self.data, entry_offset as usize, self.restart_offset as usize) {
            Some(entry) if entry.shared == 0 => {
                let start = entry.key_offset;
                Ok(&self.data[start..start + entry.non_shared as usize])
            }
            _ => Err(Error::bad_entry_in_block("restart entry failed to decode")),
        }
    }
}
