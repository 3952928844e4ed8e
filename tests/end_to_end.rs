// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Six end-to-end scenarios, each building a tiny trie in memory, compiling
//! a pattern, and checking the resulting match order and rejections.
//! Mirrors the `build`/search helper style already used by the unit tests
//! in `src/search.rs`.

use std::sync::atomic::{AtomicUsize, Ordering};

use nutrimatic::fsa::filter::Filter;
use nutrimatic::fsa::parser;
use nutrimatic::index::{IndexReader, IndexWriter};
use nutrimatic::search::Driver;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn build(pairs: &[(&str, u64)]) -> IndexReader {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "nutrimatic-e2e-test-{}-{}.index",
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

fn run_all(reader: &IndexReader, filter: &Filter, restart: f64) -> Vec<String> {
    let mut driver = Driver::new(reader, filter, restart);
    let mut texts = Vec::new();
    while let Some(hit) = driver.next().unwrap() {
        texts.push(hit.text);
    }
    texts
}

/// A trie containing only `the`/5 and `then`/2, pattern `the`: expect
/// exactly one emission, `the`.
#[test]
fn scenario_1_exact_literal_excludes_longer_word() {
    let reader = build(&[("the ", 5), ("then ", 2)]);
    let automaton = parser::parse("the").unwrap();
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 0.0);
    assert_eq!(hits, vec!["the".to_string()]);
}

/// A trie containing `chitchat`/3 and `itch`/1, pattern
/// `(((((m?o)?c)?h)?i)t?)_(h(a(t(o(ry?)?)?)?)?)?&_{5,}`: the first
/// emission is `chitchat`, and `itch` never appears (too short to satisfy
/// the `&_{5,}` length-at-least-5 intersection).
#[test]
fn scenario_2_length_intersection_rejects_short_match() {
    let reader = build(&[("chitchat ", 3), ("itch ", 1)]);
    let automaton =
        parser::parse("(((((m?o)?c)?h)?i)t?)_(h(a(t(o(ry?)?)?)?)?)?&_{5,}").unwrap();
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 1e-6);
    assert_eq!(hits.first(), Some(&"chitchat".to_string()));
    assert!(!hits.iter().any(|t| t == "itch"));
}

/// A trie with `equuleus`/9 and `equus`/4, anagram letters `eelqsuuu`:
/// `equuleus` matches (it is exactly that multiset), `equus` does not (it
/// is missing an `l` and has too few letters).
#[test]
fn scenario_3_anagram_matches_exact_multiset_only() {
    let reader = build(&[("equuleus ", 9), ("equus ", 4)]);
    let automaton = parser::parse("<eelqsuuu>").unwrap();
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 0.0);
    assert_eq!(hits.first(), Some(&"equuleus".to_string()));
    assert!(!hits.iter().any(|t| t == "equus"));
}

/// Two equal-count phrases differing only in word order; an anagram
/// pattern over their shared two-letter chunks picks out the `land in ice
/// water` ordering, not `water in iceland`.
#[test]
fn scenario_4_anagram_of_word_chunks_picks_matching_order() {
    let reader = build(&[
        ("the largest natural body of land in ice water ", 1),
        ("the largest natural body of water in iceland ", 1),
    ]);
    let automaton =
        parser::parse("<het><ral><seg><tan><rut><bla><oody><afl><ndi><cin><awe><ter>").unwrap();
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 1e-6);
    assert_eq!(
        hits.first(),
        Some(&"the largest natural body of land in ice water".to_string())
    );
    assert!(!hits
        .iter()
        .any(|t| t == "the largest natural body of water in iceland"));
}

/// Phone-word search with digits `227` on `cap`/3 and `bar`/2: both match
/// the 2-2-7 keypad pattern; the higher-count word (`cap`) is emitted
/// first.
#[test]
fn scenario_5_phone_words_rank_by_count() {
    use std::collections::BTreeSet;

    use nutrimatic::fsa::Automaton;

    const PHONE_KEYS: [&[u8]; 10] = [
        b"", b"", b"abc", b"def", b"ghi", b"jkl", b"mno", b"pqrs", b"tuv", b"wxyz",
    ];

    fn phone_pattern(digits: &[u8]) -> Automaton {
        let space_star = Automaton::closure_star(&Automaton::single_byte(b' '));
        let mut result = Automaton::epsilon();
        for &d in digits {
            let mut set: BTreeSet<u8> = PHONE_KEYS[(d - b'0') as usize].iter().copied().collect();
            set.insert(d);
            let atom = Automaton::byte_set(&set);
            let bounded = Automaton::concat(&space_star, &Automaton::concat(&atom, &space_star));
            result = Automaton::concat(&result, &bounded);
        }
        result
    }

    let reader = build(&[("cap ", 3), ("bar ", 2)]);
    let automaton = phone_pattern(b"227");
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 0.0);
    assert_eq!(hits, vec!["cap".to_string(), "bar".to_string()]);
}

/// Anagram search with letters `aet` on `eat`/5, `ate`/3, `tea`/4: all three
/// emit, ordered by count: `eat`, `tea`, `ate`.
#[test]
fn scenario_6_anagram_emits_all_permutations_ranked_by_count() {
    let reader = build(&[("eat ", 5), ("ate ", 3), ("tea ", 4)]);
    let automaton = parser::parse("<aet>").unwrap();
    let filter = Filter::compile(&automaton).unwrap();
    let hits = run_all(&reader, &filter, 0.0);
    assert_eq!(
        hits,
        vec!["eat".to_string(), "tea".to_string(), "ate".to_string()]
    );
}
