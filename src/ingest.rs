// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Turns ASCII corpus text into sorted n-gram shards.
//!
//! This does not extract article text from a raw dump — that upstream step
//! is explicitly out of scope — but it does recognize the article markers
//! the extracted text carries and tokenize the body into n-grams.

use std::fs::OpenOptions;
use std::io::{BufRead, BufWriter};

use crate::error::Result;
use crate::index::IndexWriter;

/// Sliding-window cap: a chain is flushed once it reaches this many bytes.
const HISTORY_WINDOW_SIZE: usize = 40;

/// Titles are re-fed this many times, weighting them above ordinary body
/// text without a separate count field in the tokenizer itself.
const TITLE_MULTIPLIER: usize = 10;

/// Chains accumulate in memory up to this many before spilling a shard.
const CHAINS_PER_SHARD: usize = 1_000_000;

/// Tokenize one line of input into n-grams, appending them to `out`.
///
/// Slides a [`HISTORY_WINDOW_SIZE`]-byte window over the line: alphanumeric
/// bytes are lowercased and kept, apostrophes are dropped, and every other
/// byte becomes a single space (runs of punctuation or whitespace never
/// produce a run of spaces, and a leading run produces no space at all).
/// Whenever the window fills, its entire contents are flushed as one chain
/// and the window slides forward past the last space it contains (or empties
/// entirely, if it contains none). At the end of the line, the remaining
/// window is flushed repeatedly the same way, so a line yields not just one
/// n-gram per window but a shrinking sequence of trailing sub-chains too.
pub fn tokenize_line(line: &[u8], out: &mut Vec<Vec<u8>>) {
    let mut buf: Vec<u8> = Vec::with_capacity(HISTORY_WINDOW_SIZE);
    for &b in line {
        if buf.len() == HISTORY_WINDOW_SIZE {
            flush(&mut buf, out);
        }
        if b.is_ascii_alphanumeric() {
            buf.push(b.to_ascii_lowercase());
        } else if b != b'\'' && buf.last().is_some_and(|&last| last != b' ') {
            buf.push(b' ');
        }
    }
    while !buf.is_empty() {
        flush(&mut buf, out);
    }
}

/// Push the window's full contents as one chain, then slide past the last
/// space it contains (or drain it entirely if it has none).
fn flush(buf: &mut Vec<u8>, out: &mut Vec<Vec<u8>>) {
    out.push(buf.clone());
    let cut = match buf.iter().position(|&b| b == b' ') {
        Some(p) => p + 1,
        None => buf.len(),
    };
    buf.drain(..cut);
}

/// Read ASCII corpus text from `input` and write sorted shards named
/// `<prefix>.NNNNN.index`. Returns the number of shards written.
pub fn ingest<R: BufRead>(mut input: R, prefix: &str) -> Result<usize> {
    let mut shard_count = 0usize;
    let mut chains: Vec<Vec<u8>> = Vec::new();
    let mut next_line_is_title = false;
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = input.read_until(b'\n', &mut line)?;
        if n == 0 {
            break;
        }
        while matches!(line.last(), Some(b'\n') | Some(b'\r')) {
            line.pop();
        }

        if let Some(title) = line.strip_prefix(b"BEGIN ARTICLE:") {
            for _ in 0..TITLE_MULTIPLIER {
                tokenize_line(title, &mut chains);
            }
        } else if line.starts_with(b"<doc ") {
            next_line_is_title = true;
        } else if next_line_is_title {
            for _ in 0..TITLE_MULTIPLIER {
                tokenize_line(&line, &mut chains);
            }
            next_line_is_title = false;
        } else if line.starts_with(b"END ARTICLE:") || line.starts_with(b"</doc>") {
            // Block terminator; discarded.
        } else {
            tokenize_line(&line, &mut chains);
        }

        if chains.len() >= CHAINS_PER_SHARD {
            write_shard(prefix, shard_count, &mut chains)?;
            shard_count += 1;
        }
    }

    if !chains.is_empty() {
        write_shard(prefix, shard_count, &mut chains)?;
        shard_count += 1;
    }

    Ok(shard_count)
}

/// Sort and write one shard; fails if the target file already exists, so a
/// botched run can't silently clobber or extend a previous one.
fn write_shard(prefix: &str, num: usize, chains: &mut Vec<Vec<u8>>) -> Result<()> {
    let path = format!("{}.{:05}.index", prefix, num);
    let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
    let mut writer = IndexWriter::new(BufWriter::new(file));

    chains.sort();
    for chain in chains.iter() {
        writer.push(chain, 1)?;
    }
    writer.finish()?;
    chains.clear();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::index::{IndexReader, Walker};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    #[test]
    fn short_line_yields_window_and_shrinking_tail() {
        let mut out = Vec::new();
        tokenize_line(b"hello world", &mut out);
        assert_eq!(out, vec![b"hello world".to_vec(), b"world".to_vec()]);
    }

    #[test]
    fn apostrophes_are_dropped_not_turned_into_spaces() {
        let mut out = Vec::new();
        tokenize_line(b"don't stop", &mut out);
        assert_eq!(out, vec![b"dont stop".to_vec(), b"stop".to_vec()]);
    }

    #[test]
    fn punctuation_runs_collapse_to_a_single_space() {
        let mut out = Vec::new();
        tokenize_line(b"wait...  what?!", &mut out);
        assert_eq!(out, vec![b"wait what ".to_vec(), b"what ".to_vec()]);
    }

    #[test]
    fn leading_punctuation_produces_no_leading_space() {
        let mut out = Vec::new();
        tokenize_line(b"--cats", &mut out);
        assert_eq!(out, vec![b"cats".to_vec()]);
    }

    #[test]
    fn window_fills_and_flushes_before_exceeding_its_cap() {
        // 45 a's: the window fills at 40, flushes the full window, then the
        // remaining 5 a's (no space in either) flush as two more chains.
        let line = vec![b'a'; 45];
        let mut out = Vec::new();
        tokenize_line(&line, &mut out);
        assert_eq!(out, vec![vec![b'a'; 40], vec![b'a'; 5]]);
    }

    #[test]
    fn ingest_recognizes_article_markers_and_weights_titles() {
        let input = b"BEGIN ARTICLE: cat\nthe cat sat\nEND ARTICLE:\n".as_slice();

        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!(
            "nutrimatic-ingest-test-{}-{}",
            std::process::id(),
            n
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let prefix = dir.join("shard");
        let prefix_str = prefix.to_str().unwrap();

        let shards = ingest(input, prefix_str).unwrap();
        assert_eq!(shards, 1);

        let path = format!("{}.00000.index", prefix_str);
        let reader = IndexReader::open(&path).unwrap();
        let mut walker = Walker::new(&reader, reader.root(), reader.count()).unwrap();
        let mut found = std::collections::HashMap::new();
        while let Some((text, _same, count)) = walker.next().unwrap() {
            found.insert(text.to_vec(), count);
        }

        // The title "cat" is tokenized 10 times (title-weight multiplier).
        assert_eq!(found.get(b"cat".as_slice()), Some(&10));
        // The body line contributes its chains with count 1 each.
        assert_eq!(found.get(b"the cat sat".as_slice()), Some(&1));

        std::fs::remove_file(&path).unwrap();
        std::fs::remove_dir(&dir).unwrap();
    }
}
