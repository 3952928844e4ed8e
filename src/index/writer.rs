// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Streaming, one-pass trie writer.

use std::io::{self, Write};

use crate::error::{Error, Result};
use crate::index::format::{self, Format};
use crate::index::{Addr, NUL};

/// A child already written to disk, ready to be referenced from its parent's
/// entry table.
#[derive(Clone, Copy)]
struct Saved {
    ch: u8,
    count: u64,
    /// `None` once written means "terminal" (no on-disk child).
    addr: Option<Addr>,
}

/// One node on the path from the root to the key currently being written.
///
/// `term_count` accumulates counts of keys that end exactly at this depth,
/// represented on disk as a `(NUL, term_count, None)` entry.
/// `children` accumulates already-emitted deeper nodes in increasing byte
/// order, which holds automatically because input keys arrive sorted.
struct Pending {
    ch: u8,
    term_count: u64,
    children: Vec<Saved>,
}

impl Pending {
    fn new(ch: u8) -> Pending {
        Pending {
            ch,
            term_count: 0,
            children: Vec::new(),
        }
    }
}

/// Accepts a sequence of `(key, common_prefix_len, count)` tuples with
/// strictly lexicographically increasing keys and streams a post-order trie
/// encoding to the underlying writer.
pub struct IndexWriter<W> {
    out: W,
    pos: u64,
    /// `chain[0]` is conceptually the root (ch is unused); `chain[i]` for
    /// `i >= 1` is the pending node reached after `i` bytes of the current
    /// common path.
    chain: Vec<Pending>,
}

impl<W: Write> IndexWriter<W> {
    pub fn new(out: W) -> IndexWriter<W> {
        IndexWriter {
            out,
            pos: 0,
            chain: vec![Pending::new(0)],
        }
    }

    /// Total bytes written so far (the address the *next* emitted node would
    /// receive).
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Feed one (key, count) pair. Keys must be strictly increasing.
    pub fn push(&mut self, key: &[u8], count: u64) -> Result<()> {
        let common = common_prefix_len(self.current_key().as_slice(), key);
        self.advance(key, common, count)
    }

    fn current_key(&self) -> Vec<u8> {
        self.chain[1..].iter().map(|p| p.ch).collect()
    }

    fn advance(&mut self, key: &[u8], common: usize, count: u64) -> Result<()> {
        // Pop and emit every pending frame strictly deeper than `common`.
        while self.chain.len() - 1 > common {
            self.emit_top()?;
        }

        // Push fresh frames for the unshared suffix of `key`.
        for &b in &key[common..] {
            self.chain.push(Pending::new(b));
        }

        // The new key's leaf frame accumulates its count directly.
        self.chain.last_mut().unwrap().term_count += count;
        Ok(())
    }

    /// Emit and pop the deepest pending frame, recording it as a child of its
    /// parent frame.
    ///
    /// A frame with no deeper children of its own (a pure leaf, e.g. "cat"
    /// with no longer key sharing its prefix) needs no on-disk node at all:
    /// it folds directly into the parent's entry table as a terminal byte.
    /// This is what lets the leaf-parent format batch many leaves
    /// under one parent with no per-leaf node overhead. A frame that is
    /// itself a complete n-gram *and* has further children (e.g. "the" is a
    /// prefix of "theology") instead gets a real node whose entry table
    /// holds both its own termination (as a `NUL` entry) and its children.
    fn emit_top(&mut self) -> Result<()> {
        let node = self.chain.pop().expect("chain always has a root frame");
        let total = node.term_count + node.children.iter().map(|c| c.count).sum::<u64>();
        if total == 0 {
            // Shouldn't happen in practice: every pushed frame either
            // accumulates a termination or ends up with children.
            return Ok(());
        }
        let addr = if node.children.is_empty() {
            None
        } else {
            Some(self.write_node(&node)?)
        };
        let parent = self.chain.last_mut().expect("root is never popped here");
        parent.children.push(Saved {
            ch: node.ch,
            count: total,
            addr,
        });
        Ok(())
    }

    /// Write one node's on-disk region. Only called for frames with at least
    /// one real (non-folded) child, so `entries` below is never empty.
    fn write_node(&mut self, node: &Pending) -> Result<Addr> {
        let node_start = self.pos;

        let mut entries: Vec<Saved> = Vec::with_capacity(node.children.len() + 1);
        if node.term_count > 0 {
            entries.push(Saved {
                ch: NUL,
                count: node.term_count,
                addr: None,
            });
        }
        entries.extend(node.children.iter().copied());
        debug_assert!(!entries.is_empty());

        // Shortcut eligibility: exactly one child, immediately preceding
        // (offset would be 0), itself a real node (not terminal), and this
        // node has no termination of its own.
        if entries.len() == 1 && node.term_count == 0 {
            let only = entries[0];
            if only.ch != NUL && (0x20..=0x7F).contains(&only.ch) {
                if let Some(addr) = only.addr {
                    if addr == node_start {
                        self.write_bytes(&[only.ch])?;
                        return Ok(self.pos);
                    }
                }
            }
        }

        let max_count = entries.iter().map(|e| e.count).max().unwrap_or(0);
        if max_count > format::MAX_COUNT {
            return Err(Error::EncodeOverflow);
        }
        let any_child = entries.iter().any(|e| e.addr.is_some());
        let max_offset = if any_child {
            entries
                .iter()
                .filter_map(|e| e.addr)
                .map(|addr| node_start - addr)
                .max()
                .unwrap_or(0)
        } else {
            0
        };

        let fmt = Format::narrowest(max_count, max_offset, any_child);
        if max_offset > fmt.max_offset() && fmt.has_offset() {
            return Err(Error::EncodeOverflow);
        }

        for e in &entries {
            self.write_entry(fmt, node_start, e)?;
        }

        let (low5, extra) = format::encode_n(entries.len());
        if let Some(extra_byte) = extra {
            self.write_bytes(&[extra_byte])?;
        }
        self.write_bytes(&[fmt.base_tag() | low5])?;

        Ok(self.pos)
    }

    fn write_entry(&mut self, fmt: Format, node_start: u64, e: &Saved) -> Result<()> {
        self.write_bytes(&[e.ch])?;
        match fmt.count_width() {
            1 => self.write_bytes(&[e.count as u8])?,
            2 => self.write_bytes(&(e.count as u16).to_le_bytes())?,
            8 => self.write_bytes(&e.count.to_le_bytes())?,
            _ => unreachable!(),
        }
        if fmt.has_offset() {
            let offset = match e.addr {
                None => fmt.terminal_offset(),
                Some(addr) => node_start - addr,
            };
            match fmt.offset_width() {
                1 => self.write_bytes(&[offset as u8])?,
                2 => self.write_bytes(&(offset as u16).to_le_bytes())?,
                8 => self.write_bytes(&offset.to_le_bytes())?,
                _ => unreachable!(),
            }
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    /// Flush the entire chain, including the root, and return the total
    /// count stored at the root (the sum of all emitted n-gram counts).
    pub fn finish(mut self) -> Result<u64> {
        while self.chain.len() > 1 {
            self.emit_top()?;
        }
        let root = self.chain.pop().expect("root frame always present");
        let total = root.term_count + root.children.iter().map(|c| c.count).sum::<u64>();
        if !root.children.is_empty() || root.term_count > 0 {
            self.write_node(&root)?;
        }
        self.out.flush()?;
        Ok(total)
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
