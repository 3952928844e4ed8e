// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! A search engine for word and letter puzzles: build a compact trie of
//! n-grams from a text corpus, compile a small pattern language into a
//! minimized finite automaton, and walk both structures together in
//! best-first order to enumerate matching phrases ranked by frequency.

pub mod debug;
pub mod error;
pub mod fsa;
pub mod index;
pub mod ingest;
pub mod search;

pub use error::{Error, Result};
