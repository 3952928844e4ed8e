// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

use std::fmt;
use std::io;
use std::result;

/// The kinds of failure the codec, compiler, and front end can report.
///
/// The codec and compiler are fail-fast: a corrupt trie or an
/// unparseable pattern terminates the process rather than being recovered
/// from, because the only callers are small CLIs whose correct response to
/// an inconsistency is to stop.
#[derive(Debug)]
pub enum Error {
    /// Bad argument count or shape. Front end must exit with code 2.
    Usage(&'static str),

    /// File open, memory-map, or write failure.
    IoError(io::Error),

    /// A node's tag, count, or offset violates the codec's invariants.
    ///
    /// Carries the byte offset in the file where the violation was found,
    /// plus a short diagnostic string.
    CodecCorruption(u64, &'static str),

    /// The pattern parser hit a byte it didn't recognize.
    ///
    /// Carries the byte offset of the first unrecognized byte.
    PatternParse(usize),

    /// The compiled filter has no reachable accepting state.
    PatternInfeasible,

    /// A count or offset exceeded what the wide on-disk format can hold.
    EncodeOverflow,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Usage(msg) => write!(f, "usage error: {}", msg),
            Error::IoError(err) => write!(f, "i/o error: {}", err),
            Error::CodecCorruption(offset, msg) => {
                write!(f, "corrupt index at byte {}: {}", offset, msg)
            }
            Error::PatternParse(offset) => write!(f, "can't parse pattern at byte {}", offset),
            Error::PatternInfeasible => write!(f, "pattern has no reachable accepting state"),
            Error::EncodeOverflow => write!(f, "count or offset too large to encode"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::IoError(err)
    }
}

pub type Result<T> = result::Result<T, Error>;
