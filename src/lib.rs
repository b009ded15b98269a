//! # sstblock - SST Data-Block Encoding and Reading
//!
//! `sstblock` implements the data-block layer of an LSM storage engine's
//! sorted-string table (SST) format: an immutable, prefix-compressed run of
//! key/value entries with an embedded restart array that doubles as a
//! binary-search index and as a set of decompression anchors.
//!
//! ## Components
//!
//! - **BlockBuilder**: serializes sorted key/value pairs with prefix
//!   compression and a configurable restart interval
//! - **Block**: owns a finished buffer, validates its trailer, and answers
//!   derived queries (restart count, approximate middle key, memory usage)
//! - **BlockIter**: a forward/backward cursor with seek-to-key over the
//!   restart array
//! - **BlockHashIndex / BlockPrefixIndex**: optional auxiliary structures
//!   that narrow a seek's binary-search range by key prefix
//!
//! ## Example
//!
//! ```rust
//! use sstblock::{Block, BlockBuilder, BytewiseComparator};
//!
//! let mut builder = BlockBuilder::new(16);
//! builder.add(b"apple", b"red");
//! builder.add(b"banana", b"yellow");
//! builder.add(b"cherry", b"red");
//!
//! let block = Block::new(builder.finish());
//! let cmp = BytewiseComparator;
//! let mut iter = block.iter(&cmp, false);
//!
//! iter.seek(b"b");
//! assert!(iter.valid());
//! assert_eq!(iter.key(), b"banana");
//! assert_eq!(iter.value(), b"yellow");
//!
//! iter.prev();
//! assert_eq!(iter.key(), b"apple");
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod block;
pub mod coding;
pub mod comparator;
pub mod error;
pub mod index;

pub use block::{Block, BlockBuilder, BlockIter, MIN_BLOCK_SIZE};
pub use comparator::{BytewiseComparator, Comparator};
pub use error::{Error, Result};
pub use index::{BlockHashIndex, BlockPrefixIndex, RestartRange};
