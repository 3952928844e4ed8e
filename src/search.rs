// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Best-first search driver: walks the trie and the pattern filter in
//! lockstep, emitting matching strings ranked by `scale × count`.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::error::Result;
use crate::fsa::filter::Filter;
use crate::fsa::StateId;
use crate::index::{Addr, IndexReader};

/// One link in a back-pointer chain used to reconstruct a matched string on
/// demand, instead of cloning the prefix into every queue entry.
struct Crumb {
    parent: i64,
    ch: u8,
}

/// One entry in the priority queue: the trie edge just taken, the filter
/// state reached by taking it, and the accumulated discount.
struct Next {
    scale: f64,
    count: u64,
    ch: u8,
    addr: Addr,
    state: StateId,
    crumb: i64,
}

impl Next {
    fn priority(&self) -> f64 {
        self.scale * self.count as f64
    }
}

impl PartialEq for Next {
    fn eq(&self, other: &Next) -> bool {
        self.priority() == other.priority()
    }
}
impl Eq for Next {}

impl PartialOrd for Next {
    fn partial_cmp(&self, other: &Next) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Next {
    fn cmp(&self, other: &Next) -> Ordering {
        self.priority()
            .partial_cmp(&other.priority())
            .unwrap_or(Ordering::Equal)
    }
}

/// One emitted match: the matched text (trailing spaces trimmed) and its
/// score.
pub struct Hit {
    pub text: String,
    pub score: f64,
}

/// Drives one query against one trie reader and one compiled filter.
///
/// Not `Sync`: the queue, crumb arena, and seen-set are private mutable
/// state, so one driver instance must be touched by at most one thread.
pub struct Driver<'a> {
    reader: &'a IndexReader,
    filter: &'a Filter,
    total: u64,
    restart: f64,
    queue: BinaryHeap<Next>,
    crumbs: Vec<Crumb>,
    seen: HashSet<String>,
    popped: u64,
}

impl<'a> Driver<'a> {
    /// `restart` is the discount factor applied to a "jump back to the
    /// root" edge; `0.0` disables restarts entirely, which
    /// also restores strict score-monotonic ordering.
    pub fn new(reader: &'a IndexReader, filter: &'a Filter, restart: f64) -> Driver<'a> {
        let total = reader.count();
        let mut queue = BinaryHeap::new();
        queue.push(Next {
            scale: 1.0,
            count: total,
            ch: 0,
            addr: reader.root(),
            state: filter.start(),
            crumb: -1,
        });
        Driver {
            reader,
            filter,
            total,
            restart,
            queue,
            crumbs: Vec::new(),
            seen: HashSet::new(),
            popped: 0,
        }
    }

    /// How many entries have been popped from the queue so far; callers use
    /// this to print the `# <n>` progress marker every 100 000 pops.
    pub fn popped(&self) -> u64 {
        self.popped
    }

    /// One iteration of the outer loop. Returns `Ok(None)` if this
    /// step produced no result (call again), or the queue is exhausted;
    /// returns `Ok(Some(hit))` exactly when a new result was emitted.
    fn step(&mut self) -> Result<Option<Hit>> {
        let n = match self.queue.pop() {
            Some(n) => n,
            None => return Ok(None),
        };
        self.popped += 1;

        let k = self.crumbs.len() as i64;
        let mut pushed_crumb = false;

        let children = self.reader.children(n.addr, n.count, 0, 255)?;
        for choice in children {
            let next_state = match self.filter.step(n.state, choice.ch) {
                Some(s) => s,
                None => continue,
            };
            if !pushed_crumb {
                self.crumbs.push(Crumb {
                    parent: n.crumb,
                    ch: n.ch,
                });
                pushed_crumb = true;
            }
            self.queue.push(Next {
                scale: n.scale,
                count: choice.count,
                ch: choice.ch,
                addr: choice.next.unwrap_or(0),
                state: next_state,
                crumb: k,
            });
        }

        let mut result = None;
        if self.filter.is_accepting(n.state) && n.crumb != -1 {
            let text = self.reconstruct(n.crumb, n.ch);
            if self.seen.insert(text.clone()) {
                result = Some(Hit {
                    score: n.priority(),
                    text,
                });
            }
        }

        if self.restart > 0.0 && n.ch == b' ' && n.addr != self.reader.root() && self.total > 0 {
            self.queue.push(Next {
                scale: n.scale * (n.count as f64 / self.total as f64) * self.restart,
                count: self.total,
                ch: b' ',
                addr: self.reader.root(),
                state: n.state,
                crumb: n.crumb,
            });
        }

        Ok(result)
    }

    /// Walk the crumb chain from `crumb` to the root, appending `last` as
    /// the final byte, to reconstruct a matched string.
    /// The crumb anchored directly to the synthetic root entry (`parent ==
    /// -1`) carries no real byte of its own, so its `ch` is excluded.
    /// Trailing spaces are trimmed per the output format.
    fn reconstruct(&self, crumb: i64, last: u8) -> String {
        let mut bytes = vec![last];
        let mut at = crumb;
        while at != -1 {
            let c = &self.crumbs[at as usize];
            if c.parent == -1 {
                break;
            }
            bytes.push(c.ch);
            at = c.parent;
        }
        bytes.reverse();
        let trimmed = bytes.len() - bytes.iter().rev().take_while(|&&b| b == b' ').count();
        bytes.truncate(trimmed);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Call `step()` until a result is emitted or the queue empties.
    pub fn next(&mut self) -> Result<Option<Hit>> {
        loop {
            match self.step()? {
                Some(hit) => return Ok(Some(hit)),
                None if self.queue.is_empty() => return Ok(None),
                None => continue,
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fsa::parser;
    use crate::index::IndexWriter;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn build(pairs: &[(&str, u64)]) -> IndexReader {
        let n = COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "nutrimatic-search-test-{}-{}.index",
            std::process::id(),
            n
        ));
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = IndexWriter::new(file);
        let mut sorted: Vec<(&str, u64)> = pairs.to_vec();
        sorted.sort_by_key(|&(k, _)| k.to_string());
        for (key, count) in sorted {
            writer.push(key.as_bytes(), count).unwrap();
        }
        writer.finish().unwrap();
        let reader = IndexReader::open(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        reader
    }

    #[test]
    fn exact_literal_emits_single_hit_with_full_count() {
        let reader = build(&[("the ", 5), ("then ", 2)]);
        let automaton = parser::parse("the").unwrap();
        let filter = Filter::compile(&automaton).unwrap();
        let mut driver = Driver::new(&reader, &filter, 0.0);
        let hit = driver.next().unwrap().expect("one hit expected");
        assert_eq!(hit.text, "the");
        assert!(driver.next().unwrap().is_none());
    }

    #[test]
    fn no_restart_keeps_scores_non_increasing() {
        let reader = build(&[("cat ", 9), ("car ", 4), ("can ", 1)]);
        let automaton = parser::parse("ca.").unwrap();
        let filter = Filter::compile(&automaton).unwrap();
        let mut driver = Driver::new(&reader, &filter, 0.0);
        let mut last_score = f64::INFINITY;
        let mut count = 0;
        while let Some(hit) = driver.next().unwrap() {
            assert!(hit.score <= last_score + 1e-9);
            last_score = hit.score;
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn no_string_is_emitted_twice() {
        let reader = build(&[("eat ", 5), ("ate ", 3), ("tea ", 4)]);
        let pieces = parser::parse("<eat>").unwrap();
        let filter = Filter::compile(&pieces).unwrap();
        let mut driver = Driver::new(&reader, &filter, 0.0);
        let mut seen = HashSet::new();
        let mut texts = Vec::new();
        while let Some(hit) = driver.next().unwrap() {
            assert!(seen.insert(hit.text.clone()), "duplicate emission: {}", hit.text);
            texts.push(hit.text);
        }
        let mut sorted = texts.clone();
        sorted.sort();
        let mut expected = vec!["eat".to_string(), "ate".to_string(), "tea".to_string()];
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
