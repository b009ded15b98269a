//! Fuzz testing for the block reader.
//!
//! This fuzz target feeds arbitrary byte buffers to the block reader and
//! exercises every cursor operation to ensure corrupted input is handled
//! gracefully without panicking, reading out of bounds, or looping forever.

#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use sstblock::{Block, BytewiseComparator};

#[derive(Debug, Arbitrary)]
struct ReaderInput {
    data: Vec<u8>,
    targets: Vec<Vec<u8>>,
    walk_budget: u16,
}

fuzz_target!(|input: ReaderInput| {
    let block = Block::new(Bytes::from(input.data));
    let cmp = BytewiseComparator;

    let _ = block.middle_key();
    let _ = block.approximate_memory_usage();

    let mut iter = block.iter(&cmp, false);
    let _ = iter.status();

    iter.seek_to_first();
    let mut budget = input.walk_budget as usize;
    while iter.valid() && budget > 0 {
        let _ = iter.key();
        let _ = iter.value();
        iter.next();
        budget -= 1;
    }

    iter.seek_to_last();
    let mut budget = input.walk_budget as usize;
    while iter.valid() && budget > 0 {
        let _ = iter.key();
        iter.prev();
        budget -= 1;
    }

    for target in &input.targets {
        iter.seek(target);
        if iter.valid() {
            // A valid cursor after seek must expose a key at or above the
            // target.
            assert!(iter.key() >= target.as_slice());
            iter.prev();
        }
    }

    let _ = iter.status();
});
