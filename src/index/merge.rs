// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Merging many sorted shards into one trie, with a frequency cutoff.
//!
//! Each shard is a trie file written by [`IndexWriter`](crate::index::IndexWriter);
//! [`merge`] walks all of them in lockstep via a k-way min-heap over
//! [`Walker`](crate::index::Walker)s, feeding the merged `(key, count)` stream
//! through an [`IndexWriter`] of its own. Keys below `cutoff` are not dropped
//! outright: their count is folded into the count of the longest prefix of
//! that key which itself survives the cutoff, so the trie's invariant that a
//! parent's count is at least the sum of its children's still holds after
//! pruning.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io::Write;

use crate::error::Result;
use crate::index::{IndexReader, IndexWriter, Walker};

/// One shard's cursor: the most recently read `(key, count)` plus the shard
/// index, so ties break by first-arrived shard (a stable merge).
struct Cursor<'a> {
    key: Vec<u8>,
    count: u64,
    shard: usize,
    walker: Walker<'a>,
}

impl<'a> Eq for Cursor<'a> {}
impl<'a> PartialEq for Cursor<'a> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.shard == other.shard
    }
}
impl<'a> Ord for Cursor<'a> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; we want the lexicographically smallest
        // key on top, with ties broken by the lowest shard index.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.shard.cmp(&self.shard))
    }
}
impl<'a> PartialOrd for Cursor<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A pending output frame: the length of a prefix currently being
/// accumulated, and the count folded into it so far.
struct Frame {
    len: usize,
    count: u64,
}

/// Merge `readers` into a single sorted `(key, count)` stream written through
/// `out`, folding any key whose count is below `cutoff` into its longest
/// surviving ancestor prefix. Returns the number of distinct keys written.
pub fn merge<'a, W: Write>(readers: &'a [IndexReader], cutoff: u64, out: W) -> Result<u64> {
    let mut heap: BinaryHeap<Cursor<'a>> = BinaryHeap::new();
    for (i, reader) in readers.iter().enumerate() {
        let mut walker = Walker::new(reader, reader.root(), reader.count())?;
        if let Some((text, _same, count)) = walker.next()? {
            heap.push(Cursor {
                key: text.to_vec(),
                count,
                shard: i,
                walker,
            });
        }
    }

    let mut writer = IndexWriter::new(out);
    let mut written = 0u64;

    // `stack` holds one frame per byte of the key currently being
    // accumulated, innermost (longest prefix) last. `pending` is the key
    // whose frames are open; when a freshly merged key diverges from it, we
    // flush every frame for the diverged suffix before starting new ones.
    let mut pending: Vec<u8> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    while let Some(mut cursor) = heap.pop() {
        let key = std::mem::take(&mut cursor.key);
        let mut total = cursor.count;

        if let Some((text, _same, count)) = cursor.walker.next()? {
            heap.push(Cursor {
                key: text.to_vec(),
                count,
                shard: cursor.shard,
                walker: cursor.walker,
            });
        }

        // Coalesce every other shard whose cursor currently sits on the same
        // key, so duplicate n-grams across shards sum their counts.
        while let Some(top) = heap.peek() {
            if top.key != key {
                break;
            }
            let mut other = heap.pop().unwrap();
            total += other.count;
            if let Some((text, _same, count)) = other.walker.next()? {
                heap.push(Cursor {
                    key: text.to_vec(),
                    count,
                    shard: other.shard,
                    walker: other.walker,
                });
            }
        }

        let common = common_prefix_len(&pending, &key);
        while stack.len() > common {
            flush_frame(&mut writer, &pending, &mut stack, &mut written, cutoff)?;
        }
        pending = key;
        for len in (common + 1)..=pending.len() {
            stack.push(Frame { len, count: 0 });
        }
        match stack.last_mut() {
            Some(top) => top.count += total,
            None => write_if_above_cutoff(&mut writer, &pending, total, cutoff, &mut written)?,
        }
    }

    while !stack.is_empty() {
        flush_frame(&mut writer, &pending, &mut stack, &mut written, cutoff)?;
    }

    writer.finish()?;
    Ok(written)
}

fn flush_frame<W: Write>(
    writer: &mut IndexWriter<W>,
    pending: &[u8],
    stack: &mut Vec<Frame>,
    written: &mut u64,
    cutoff: u64,
) -> Result<()> {
    let frame = stack.pop().expect("flush_frame called with empty stack");
    if frame.count >= cutoff {
        writer.push(&pending[..frame.len], frame.count)?;
        *written += 1;
    } else if let Some(parent) = stack.last_mut() {
        parent.count += frame.count;
    }
    Ok(())
}

fn write_if_above_cutoff<W: Write>(
    writer: &mut IndexWriter<W>,
    key: &[u8],
    count: u64,
    cutoff: u64,
    written: &mut u64,
) -> Result<()> {
    if count >= cutoff {
        writer.push(key, count)?;
        *written += 1;
    }
    Ok(())
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
