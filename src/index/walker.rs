// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Lazy in-order trie traversal.

use crate::error::Result;
use crate::index::reader::IndexReader;
use crate::index::{Addr, NUL};

struct Frame {
    choices: Vec<crate::index::Choice>,
    cursor: usize,
}

/// Walks every key in the trie in lexicographic order.
///
/// Each call to [`Walker::next`] advances to the next key and returns
/// `(text, same, count)` where `same` is the length of the common prefix
/// with the previously emitted key (so callers can avoid recopying it), and
/// `count` is the n-gram's count. Returns `None` at the end.
pub struct Walker<'a> {
    reader: &'a IndexReader,
    stack: Vec<Frame>,
    buf: Vec<u8>,
}

impl<'a> Walker<'a> {
    pub fn new(reader: &'a IndexReader, root: Addr, root_count: u64) -> Result<Walker<'a>> {
        let mut w = Walker {
            reader,
            stack: Vec::new(),
            buf: Vec::new(),
        };
        w.push_frame(root, root_count)?;
        Ok(w)
    }

    fn push_frame(&mut self, addr: Addr, count: u64) -> Result<()> {
        let choices = if addr == 0 {
            Vec::new()
        } else {
            self.reader.children(addr, count, 0, 255)?
        };
        self.stack.push(Frame { choices, cursor: 0 });
        Ok(())
    }

    /// Advance to the next key. Returns `(text, same, count)`.
    pub fn next(&mut self) -> Result<Option<(&[u8], usize, u64)>> {
        loop {
            let depth = self.stack.len();
            if depth == 0 {
                return Ok(None);
            }
            // `buf` always holds exactly the path down to the top frame,
            // even after a previous iteration emitted a terminal sibling by
            // pushing its byte without creating a deeper frame.
            self.buf.truncate(depth - 1);
            let frame = self.stack.last_mut().unwrap();

            if frame.cursor >= frame.choices.len() {
                // Exhausted this node; pop back to the parent.
                self.stack.pop();
                continue;
            }

            let choice = frame.choices[frame.cursor];
            frame.cursor += 1;

            if choice.ch == NUL {
                // A key ends exactly at the current prefix.
                let same = self.buf.len();
                return Ok(Some((&self.buf[..], same, choice.count)));
            }

            // Descend: push the byte and recurse into the child (or treat a
            // terminal non-NUL edge as ending here too, a one-node trie
            // corner case where the sole key is a single byte).
            let same = self.buf.len();
            self.buf.push(choice.ch);
            match choice.next {
                Some(addr) => self.push_frame(addr, choice.count)?,
                None => {
                    return Ok(Some((&self.buf[..], same, choice.count)));
                }
            }
        }
    }
}
