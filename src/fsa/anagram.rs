// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Anagram group compilation: `<p1 p2 … pk>` matches any string
//! formed by concatenating a permutation of one match from each piece, with
//! optional filler spaces, where syntactically identical pieces may repeat.

use crate::error::Result;
use crate::fsa::Automaton;

/// Compile a parsed piece list into the automaton matching every
/// permutation of the pieces. Each piece is minimized before bucketing so
/// that `Automaton::equivalent` comparisons are between minimal
/// automata, as recommended by the contract.
pub fn compile(pieces: &[Automaton]) -> Result<Automaton> {
    if pieces.is_empty() {
        return Ok(Automaton::epsilon());
    }

    let minimized: Vec<Automaton> = pieces.iter().map(|p| p.minimize()).collect();

    // Bucket syntactically-identical pieces by language equivalence.
    let mut buckets: Vec<(Automaton, usize)> = Vec::new();
    for piece in minimized {
        match buckets
            .iter_mut()
            .find(|(existing, _)| Automaton::equivalent(existing, &piece))
        {
            Some((_, count)) => *count += 1,
            None => buckets.push((piece, 1)),
        }
    }

    let total: usize = buckets.iter().map(|(_, c)| *c).sum();

    // L = union(P_1, ..., P_k)^T: exactly T pieces, any bucket for each.
    let any_piece = buckets
        .iter()
        .map(|(p, _)| p.clone())
        .reduce(|a, b| Automaton::union(&a, &b))
        .expect("buckets is non-empty");
    let l = repeat_concat(&any_piece, total);

    // For each bucket i: C_i = (others)* (P_i (others)*)^{c_i}.
    let combined = pairwise_intersect(
        std::iter::once(l).chain(buckets.iter().enumerate().map(|(i, (p, c))| {
            let others = buckets
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, (q, _))| q.clone())
                .reduce(|a, b| Automaton::union(&a, &b))
                .unwrap_or_else(Automaton::empty);
            let others_star = Automaton::closure_star(&others);
            let one_occurrence = Automaton::concat(p, &others_star);
            let occurrences = repeat_concat(&one_occurrence, *c);
            Automaton::concat(&others_star, &occurrences)
        })),
    );

    Ok(combined)
}

fn repeat_concat(a: &Automaton, n: usize) -> Automaton {
    let mut result = Automaton::epsilon();
    for _ in 0..n {
        result = Automaton::concat(&result, a);
    }
    result
}

/// Fold a sequence of automata pairwise, minimizing after each intersect, so
/// intermediate state counts stay small instead of multiplying unchecked
/// across the whole vector.
fn pairwise_intersect(automata: impl Iterator<Item = Automaton>) -> Automaton {
    let mut queue: std::collections::VecDeque<Automaton> = automata.collect();
    if queue.is_empty() {
        return Automaton::epsilon();
    }
    while queue.len() > 1 {
        let a = queue.pop_front().unwrap();
        let b = queue.pop_front().unwrap();
        queue.push_back(Automaton::intersect(&a, &b).minimize());
    }
    queue.pop_front().unwrap()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fsa::filter::Filter;

    fn matches(pieces: Vec<Automaton>, input: &str) -> bool {
        let automaton = compile(&pieces).unwrap();
        let filter = Filter::compile(&automaton).unwrap();
        let mut s = filter.start();
        for &b in input.as_bytes() {
            match filter.step(s, b) {
                Some(next) => s = next,
                None => return false,
            }
        }
        filter.step(s, b' ').map(|s| filter.is_accepting(s)) == Some(true)
    }

    fn word(w: &str) -> Automaton {
        w.bytes()
            .map(Automaton::single_byte)
            .reduce(|a, b| Automaton::concat(&a, &b))
            .unwrap()
    }

    #[test]
    fn two_distinct_pieces_match_either_order() {
        let pieces = vec![word("ab"), word("cd")];
        assert!(matches(pieces.clone(), "abcd"));
        assert!(matches(pieces, "cdab"));
    }

    #[test]
    fn rejects_wrong_piece_count() {
        let pieces = vec![word("ab"), word("cd")];
        assert!(!matches(pieces.clone(), "ab"));
        assert!(!matches(pieces, "abcdab"));
    }

    #[test]
    fn repeated_identical_piece_requires_both_occurrences() {
        let pieces = vec![word("ab"), word("ab")];
        assert!(matches(pieces.clone(), "abab"));
        assert!(!matches(pieces, "ab"));
    }
}
