// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! The compact n-gram trie codec.
//!
//! A trie file is a sequence of nodes written child-before-parent
//! (post-order). Each node is a sorted table of (byte, count, child) entries.
//! The file has no header: its length *is* the address of the root node, and
//! the root node's on-disk region ends at that address.
//!
//! One wrinkle the on-disk format has to resolve that the surface pattern
//! grammar never needs to: an n-gram key never carries an explicit
//! terminator byte, yet a node can
//! simultaneously be the end of one n-gram ("the") and the prefix of another
//! ("then"). We resolve this the way the pattern grammar already hints at with
//! its `-` → `{null, space}` wildcard-filler class: byte value `0x00`
//! is a reserved sentinel, sorting before every real corpus byte, that stands
//! for "the n-gram ends exactly here." A node's entry table can thus contain
//! an entry `(0x00, count, None)` alongside ordinary byte-indexed entries.

pub mod format;
pub mod merge;
pub mod reader;
pub mod walker;
pub mod writer;

pub use merge::merge;
pub use reader::{Choice, IndexReader};
pub use walker::Walker;
pub use writer::IndexWriter;

/// Sentinel byte standing for "no further byte; the n-gram ends here."
///
/// Sorts before every byte in the real corpus alphabet (space is 0x20), so it
/// is always the first entry in a node's table when present.
pub const NUL: u8 = 0x00;

/// A node address: the file offset of the byte immediately after the node's
/// last byte (the exclusive end of its on-disk region). The root node's
/// address is the length of the file.
pub type Addr = u64;
