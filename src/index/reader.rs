// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Random-access trie reader over a memory-mapped file.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::index::format::Format;
use crate::index::Addr;

/// One decoded entry of a node's table: the edge byte, the count flowing
/// through that edge, and the child node's address (`None` if the edge is
/// terminal, i.e. the n-gram ends there).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Choice {
    pub ch: u8,
    pub count: u64,
    pub next: Option<Addr>,
}

/// Owns the memory mapping of a trie file; every `Choice::next` address is
/// valid to pass back into `children` as long as this reader (or anything
/// derived from it) is alive.
pub struct IndexReader {
    mmap: Mmap,
    total: u64,
}

impl IndexReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<IndexReader> {
        let file = File::open(path)?;
        // Safety: the file is treated as immutable for the lifetime of the
        // mapping; nothing in this process writes to index files after
        // `IndexWriter::finish` returns, and index files are never written
        // to by a concurrent process sharing them.
        let mmap = unsafe { Mmap::map(&file)? };
        let root = mmap.len() as u64;
        let mut reader = IndexReader { mmap, total: 0 };
        if root > 0 {
            // The root may collapse to a chain of shortcut nodes (each just
            // a single byte with no count of its own) before reaching the
            // node that actually carries the corpus's real entry counts;
            // follow it down instead of taking the chain's first link at
            // face value.
            let mut addr = root;
            let mut choices = reader.children(addr, u64::MAX, 0, 255)?;
            while choices.len() == 1 && reader.is_shortcut(addr)? {
                addr = choices[0].next.unwrap_or(0);
                choices = reader.children(addr, u64::MAX, 0, 255)?;
            }
            reader.total = choices.iter().map(|c| c.count).sum();
        }
        Ok(reader)
    }

    /// Whether the node at `addr` is encoded as a shortcut (a single edge
    /// byte with no count of its own, inheriting its caller's incoming
    /// count instead).
    fn is_shortcut(&self, addr: Addr) -> Result<bool> {
        if addr == 0 {
            return Ok(false);
        }
        let tag = self.byte_at(addr, "node address out of range")?;
        Ok(Format::from_tag(tag) == Format::Shortcut)
    }

    /// The root node's address (the file length).
    pub fn root(&self) -> Addr {
        self.mmap.len() as u64
    }

    /// The corpus's total n-gram count (sum over the root's entries).
    pub fn count(&self) -> u64 {
        self.total
    }

    fn byte_at(&self, addr: Addr, diag: &'static str) -> Result<u8> {
        if addr == 0 || addr as usize > self.mmap.len() {
            return Err(Error::CodecCorruption(addr, diag));
        }
        Ok(self.mmap[addr as usize - 1])
    }

    fn read_at(&self, start: u64, len: usize, diag: &'static str) -> Result<&[u8]> {
        let start = start as usize;
        let end = start + len;
        if end > self.mmap.len() {
            return Err(Error::CodecCorruption(start as u64, diag));
        }
        Ok(&self.mmap[start..end])
    }

    /// Decode the node at `addr` (reached with incoming edge count
    /// `incoming_count`), returning the subset of its entries whose byte
    /// lies in `[lo, hi]`.
    ///
    /// Tolerates a leading chain of zero-count single-child shortcut nodes
    /// at the very top of the file; such a chain is never
    /// emitted by the writer, but is accepted when reading.
    pub fn children(
        &self,
        addr: Addr,
        incoming_count: u64,
        lo: u8,
        hi: u8,
    ) -> Result<Vec<Choice>> {
        if addr == 0 {
            return Ok(Vec::new());
        }

        let tag = self.byte_at(addr, "node address out of range")?;
        let fmt = Format::from_tag(tag);

        if fmt == Format::Shortcut {
            let child_addr = addr - 1;
            let mut out = Vec::new();
            if tag >= lo && tag <= hi {
                out.push(Choice {
                    ch: tag,
                    count: incoming_count,
                    next: Some(child_addr),
                });
            }
            return Ok(out);
        }

        let low5 = tag & 0x1F;
        let (header_len, extra) = if low5 != 0 {
            (1u64, None)
        } else {
            if addr < 2 {
                return Err(Error::CodecCorruption(addr, "missing entry-count byte"));
            }
            (2u64, Some(self.byte_at(addr - 1, "entry-count byte")?))
        };
        let n = crate::index::format::decode_n(low5, extra)
            .ok_or(Error::CodecCorruption(addr, "invalid entry count"))?;

        let entry_size = fmt.entry_size() as u64;
        let table_len = entry_size * n as u64;
        if addr < header_len + table_len {
            return Err(Error::CodecCorruption(addr, "node overruns start of file"));
        }
        let node_start = addr - header_len - table_len;

        let mut out = Vec::new();
        let mut prev_byte: Option<u8> = None;
        let mut total_here = 0u64;

        for i in 0..n {
            let entry_start = node_start + (i as u64) * entry_size;
            let entry = self.read_at(entry_start, entry_size as usize, "truncated entry")?;
            let ch = entry[0];

            if let Some(p) = prev_byte {
                if ch <= p {
                    return Err(Error::CodecCorruption(entry_start, "entries not ascending"));
                }
            }
            prev_byte = Some(ch);

            let count = match fmt.count_width() {
                1 => entry[1] as u64,
                2 => u16::from_le_bytes([entry[1], entry[2]]) as u64,
                8 => u64::from_le_bytes(entry[1..9].try_into().unwrap()),
                _ => unreachable!(),
            };
            if count == 0 {
                return Err(Error::CodecCorruption(entry_start, "zero count"));
            }

            let next = if fmt.has_offset() {
                let off_start = 1 + fmt.count_width();
                let offset = match fmt.offset_width() {
                    1 => entry[off_start] as u64,
                    2 => u16::from_le_bytes([entry[off_start], entry[off_start + 1]]) as u64,
                    8 => u64::from_le_bytes(entry[off_start..off_start + 8].try_into().unwrap()),
                    _ => unreachable!(),
                };
                if offset == fmt.terminal_offset() {
                    None
                } else {
                    if offset > node_start {
                        return Err(Error::CodecCorruption(
                            entry_start,
                            "child offset past node start",
                        ));
                    }
                    Some(node_start - offset)
                }
            } else {
                None
            };

            total_here += count;
            if ch >= lo && ch <= hi {
                out.push(Choice { ch, count, next });
            }
        }

        if total_here > incoming_count && incoming_count != u64::MAX {
            return Err(Error::CodecCorruption(addr, "entries exceed incoming count"));
        }

        Ok(out)
    }

    /// Convenience: look up a single child byte, returning its choice if
    /// present.
    pub fn child(&self, addr: Addr, incoming_count: u64, byte: u8) -> Result<Option<Choice>> {
        Ok(self
            .children(addr, incoming_count, byte, byte)?
            .into_iter()
            .next())
    }

    /// Follow a literal byte path from the root, for `explore`.
    pub fn walk_path(&self, path: &[u8]) -> Result<(Addr, u64)> {
        let mut addr = self.root();
        let mut count = self.total;
        for &b in path {
            match self.child(addr, count, b)? {
                Some(choice) => {
                    count = choice.count;
                    addr = choice.next.unwrap_or(0);
                }
                None => return Ok((0, 0)),
            }
        }
        Ok((addr, count))
    }
}
