// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! A single concrete boolean (accept/reject) byte-automaton type.
//!
//! There is no semiring abstraction here and no separate NFA/DFA types: one
//! `Automaton` serves as the representation throughout construction,
//! normalization, and use. During construction states may carry epsilon
//! transitions (`byte: None`); [`Automaton::determinize`] removes them and
//! collapses the result to one transition per byte per state.

pub mod anagram;
pub mod filter;
pub mod parser;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

pub type StateId = u32;

#[derive(Clone, Debug, Default)]
struct State {
    accepting: bool,
    /// `None` as the byte means an epsilon transition.
    transitions: Vec<(Option<u8>, StateId)>,
}

/// A byte-alphabet finite automaton, Boolean-weighted (accept or reject).
#[derive(Clone, Debug)]
pub struct Automaton {
    states: Vec<State>,
    start: StateId,
}

impl Automaton {
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn is_accepting(&self, s: StateId) -> bool {
        self.states[s as usize].accepting
    }

    /// This state's outgoing transitions. `None` as the byte means epsilon.
    pub fn transitions(&self, s: StateId) -> &[(Option<u8>, StateId)] {
        &self.states[s as usize].transitions
    }

    /// Accepts no strings at all.
    pub fn empty() -> Automaton {
        Automaton {
            states: vec![State {
                accepting: false,
                transitions: Vec::new(),
            }],
            start: 0,
        }
    }

    /// Accepts exactly the empty string.
    pub fn epsilon() -> Automaton {
        Automaton {
            states: vec![State {
                accepting: true,
                transitions: Vec::new(),
            }],
            start: 0,
        }
    }

    /// Accepts exactly the one-byte string `[b]`.
    pub fn single_byte(b: u8) -> Automaton {
        Automaton {
            states: vec![
                State {
                    accepting: false,
                    transitions: vec![(Some(b), 1)],
                },
                State {
                    accepting: true,
                    transitions: Vec::new(),
                },
            ],
            start: 0,
        }
    }

    /// Accepts exactly one byte, provided it is a member of `set`.
    pub fn byte_set(set: &BTreeSet<u8>) -> Automaton {
        let transitions = set.iter().map(|&b| (Some(b), 1)).collect();
        Automaton {
            states: vec![
                State {
                    accepting: false,
                    transitions,
                },
                State {
                    accepting: true,
                    transitions: Vec::new(),
                },
            ],
            start: 0,
        }
    }

    /// Appends `other`'s states to `self`'s arena, returning the offset
    /// applied to every one of `other`'s original state ids.
    fn absorb(&mut self, other: &Automaton) -> StateId {
        let offset = self.states.len() as StateId;
        for state in &other.states {
            let transitions = state
                .transitions
                .iter()
                .map(|&(b, t)| (b, t + offset))
                .collect();
            self.states.push(State {
                accepting: state.accepting,
                transitions,
            });
        }
        offset
    }

    pub fn union(a: &Automaton, b: &Automaton) -> Automaton {
        let mut out = Automaton {
            states: vec![State::default()],
            start: 0,
        };
        let off_a = out.absorb(a);
        let off_b = out.absorb(b);
        out.states[0].transitions = vec![(None, off_a + a.start), (None, off_b + b.start)];
        out
    }

    pub fn concat(a: &Automaton, b: &Automaton) -> Automaton {
        let mut out = Automaton {
            states: Vec::new(),
            start: 0,
        };
        let off_a = out.absorb(a);
        let off_b = out.absorb(b);
        out.start = off_a + a.start;
        for i in 0..a.states.len() {
            let idx = off_a as usize + i;
            if out.states[idx].accepting {
                out.states[idx].accepting = false;
                out.states[idx].transitions.push((None, off_b + b.start));
            }
        }
        out
    }

    pub fn closure_star(a: &Automaton) -> Automaton {
        let mut out = Automaton {
            states: vec![State {
                accepting: true,
                transitions: Vec::new(),
            }],
            start: 0,
        };
        let off_a = out.absorb(a);
        out.states[0].transitions.push((None, off_a + a.start));
        for i in 0..a.states.len() {
            let idx = off_a as usize + i;
            if out.states[idx].accepting {
                out.states[idx].transitions.push((None, off_a + a.start));
                out.states[idx].transitions.push((None, 0));
            }
        }
        out
    }

    pub fn closure_plus(a: &Automaton) -> Automaton {
        Automaton::concat(a, &Automaton::closure_star(a))
    }

    /// Remove epsilon transitions, folding each state's epsilon-closure into
    /// direct byte transitions and accepting status. The result may still be
    /// nondeterministic (several transitions on the same byte).
    pub fn remove_epsilon(&self) -> Automaton {
        let closures: Vec<BTreeSet<StateId>> = (0..self.states.len() as StateId)
            .map(|s| self.epsilon_closure(s))
            .collect();

        let mut states = Vec::with_capacity(self.states.len());
        for s in 0..self.states.len() {
            let closure = &closures[s];
            let accepting = closure.iter().any(|&c| self.states[c as usize].accepting);
            let mut transitions = Vec::new();
            for &c in closure {
                for &(b, t) in &self.states[c as usize].transitions {
                    if let Some(byte) = b {
                        transitions.push((Some(byte), t));
                    }
                }
            }
            states.push(State {
                accepting,
                transitions,
            });
        }
        Automaton {
            states,
            start: self.start,
        }
    }

    fn epsilon_closure(&self, s: StateId) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![s];
        seen.insert(s);
        while let Some(cur) = stack.pop() {
            for &(b, t) in &self.states[cur as usize].transitions {
                if b.is_none() && seen.insert(t) {
                    stack.push(t);
                }
            }
        }
        seen
    }

    /// Subset construction: collapse to a deterministic, epsilon-free
    /// automaton with at most one transition per byte per state.
    pub fn determinize(&self) -> Automaton {
        let nfa = self.remove_epsilon();

        let mut subset_id: BTreeMap<BTreeSet<StateId>, StateId> = BTreeMap::new();
        let mut states: Vec<State> = Vec::new();
        let mut queue = VecDeque::new();

        let start_subset: BTreeSet<StateId> = std::iter::once(nfa.start).collect();
        subset_id.insert(start_subset.clone(), 0);
        states.push(State::default());
        queue.push_back(start_subset);

        while let Some(subset) = queue.pop_front() {
            let id = subset_id[&subset];
            let accepting = subset.iter().any(|&s| nfa.states[s as usize].accepting);

            let mut by_byte: BTreeMap<u8, BTreeSet<StateId>> = BTreeMap::new();
            for &s in &subset {
                for &(b, t) in &nfa.states[s as usize].transitions {
                    by_byte.entry(b.unwrap()).or_default().insert(t);
                }
            }

            let mut transitions = Vec::with_capacity(by_byte.len());
            for (byte, target_subset) in by_byte {
                let next_id = *subset_id.entry(target_subset.clone()).or_insert_with(|| {
                    let id = states.len() as StateId;
                    states.push(State::default());
                    queue.push_back(target_subset.clone());
                    id
                });
                transitions.push((Some(byte), next_id));
            }

            states[id as usize] = State {
                accepting,
                transitions,
            };
        }

        Automaton { states, start: 0 }
    }

    /// Intersection (product construction). Both operands are determinized
    /// first, so this is safe to call on automata with epsilon transitions.
    pub fn intersect(a: &Automaton, b: &Automaton) -> Automaton {
        let a = a.determinize();
        let b = b.determinize();

        let mut pair_id: BTreeMap<(StateId, StateId), StateId> = BTreeMap::new();
        let mut states: Vec<State> = Vec::new();
        let mut queue = VecDeque::new();

        let start_pair = (a.start, b.start);
        pair_id.insert(start_pair, 0);
        states.push(State::default());
        queue.push_back(start_pair);

        while let Some((sa, sb)) = queue.pop_front() {
            let id = pair_id[&(sa, sb)];
            let accepting = a.states[sa as usize].accepting && b.states[sb as usize].accepting;

            let table_b: BTreeMap<u8, StateId> = b.states[sb as usize]
                .transitions
                .iter()
                .map(|&(byte, t)| (byte.unwrap(), t))
                .collect();

            let mut transitions = Vec::new();
            for &(byte, ta) in &a.states[sa as usize].transitions {
                let byte = byte.unwrap();
                if let Some(&tb) = table_b.get(&byte) {
                    let next_id = *pair_id.entry((ta, tb)).or_insert_with(|| {
                        let id = states.len() as StateId;
                        states.push(State::default());
                        queue.push_back((ta, tb));
                        id
                    });
                    transitions.push((Some(byte), next_id));
                }
            }

            states[id as usize] = State {
                accepting,
                transitions,
            };
        }

        Automaton { states, start: 0 }.minimize()
    }

    /// Hopcroft-style partition refinement: merge states with identical
    /// future behavior. Unreachable states are dropped first.
    ///
    /// Accepts an automaton in any state (epsilon transitions, non-determinism)
    /// and determinizes it first, since refinement requires a function from
    /// (state, byte) to a single next state.
    pub fn minimize(&self) -> Automaton {
        let det = self.determinize();
        det.minimize_deterministic()
    }

    fn minimize_deterministic(&self) -> Automaton {
        let reachable = self.reachable_states();
        let mut alphabet = BTreeSet::new();
        for &s in &reachable {
            for &(b, _) in &self.states[s as usize].transitions {
                alphabet.insert(b.expect("minimize requires an epsilon-free automaton"));
            }
        }

        // Initial partition: accepting vs. non-accepting, restricted to
        // reachable states.
        let mut partition: Vec<BTreeSet<StateId>> = {
            let (acc, rej): (BTreeSet<StateId>, BTreeSet<StateId>) = reachable
                .iter()
                .partition(|&&s| self.states[s as usize].accepting);
            [acc, rej].into_iter().filter(|s| !s.is_empty()).collect()
        };

        loop {
            let mut state_to_block: BTreeMap<StateId, usize> = BTreeMap::new();
            for (i, block) in partition.iter().enumerate() {
                for &s in block {
                    state_to_block.insert(s, i);
                }
            }

            let mut next_partition: Vec<BTreeSet<StateId>> = Vec::new();
            let mut changed = false;

            for block in &partition {
                let mut by_signature: BTreeMap<Vec<Option<usize>>, BTreeSet<StateId>> =
                    BTreeMap::new();
                for &s in block {
                    let table: BTreeMap<u8, StateId> = self.states[s as usize]
                        .transitions
                        .iter()
                        .map(|&(b, t)| (b.unwrap(), t))
                        .collect();
                    let sig: Vec<Option<usize>> = alphabet
                        .iter()
                        .map(|b| table.get(b).map(|t| state_to_block[t]))
                        .collect();
                    by_signature.entry(sig).or_default().insert(s);
                }
                if by_signature.len() > 1 {
                    changed = true;
                }
                next_partition.extend(by_signature.into_values());
            }

            partition = next_partition;
            if !changed {
                break;
            }
        }

        // Assign block indices so the block containing the old start state
        // always lands at id 0: callers (the filter adapter) treat state 0
        // as the automaton's start.
        let start_block = partition
            .iter()
            .position(|block| block.contains(&self.start))
            .expect("start state belongs to some block");
        partition.swap(0, start_block);

        let mut block_of: BTreeMap<StateId, usize> = BTreeMap::new();
        for (i, block) in partition.iter().enumerate() {
            for &s in block {
                block_of.insert(s, i);
            }
        }

        let mut states = vec![State::default(); partition.len()];
        for (i, block) in partition.iter().enumerate() {
            let rep = *block.iter().next().expect("partition blocks are non-empty");
            states[i].accepting = self.states[rep as usize].accepting;
            let mut transitions: Vec<(Option<u8>, StateId)> = self.states[rep as usize]
                .transitions
                .iter()
                .map(|&(b, t)| (b, block_of[&t] as StateId))
                .collect();
            transitions.sort_by_key(|&(b, _)| b.unwrap());
            states[i].transitions = transitions;
        }

        let mut out = Automaton { states, start: 0 };
        out.sort_transitions_by_byte();
        out
    }

    fn reachable_states(&self) -> BTreeSet<StateId> {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.start];
        seen.insert(self.start);
        while let Some(s) = stack.pop() {
            for &(_, t) in &self.states[s as usize].transitions {
                if seen.insert(t) {
                    stack.push(t);
                }
            }
        }
        seen
    }

    /// Sort each state's transition list by byte, for deterministic dumps
    /// and binary search by `filter::Filter`.
    pub fn sort_transitions_by_byte(&mut self) {
        for state in &mut self.states {
            state.transitions.sort_by_key(|&(b, _)| b);
        }
    }

    /// Whether two automata accept the same language. Both are minimized and
    /// compared structurally: isomorphic minimal DFAs accept the same
    /// language and vice versa.
    pub fn equivalent(a: &Automaton, b: &Automaton) -> bool {
        let a = a.minimize();
        let b = b.minimize();
        if a.states.len() != b.states.len() {
            return false;
        }

        // Walk both automata in lockstep from their start states, mapping
        // states of `a` to states of `b` as they are first encountered.
        let mut mapping: BTreeMap<StateId, StateId> = BTreeMap::new();
        let mut queue = VecDeque::new();
        mapping.insert(a.start, b.start);
        queue.push_back((a.start, b.start));

        while let Some((sa, sb)) = queue.pop_front() {
            if a.states[sa as usize].accepting != b.states[sb as usize].accepting {
                return false;
            }
            let ta = &a.states[sa as usize].transitions;
            let tb = &b.states[sb as usize].transitions;
            if ta.len() != tb.len() {
                return false;
            }
            for (&(ba, na), &(bb, nb)) in ta.iter().zip(tb.iter()) {
                if ba != bb {
                    return false;
                }
                match mapping.get(&na) {
                    Some(&mapped) if mapped == nb => {}
                    Some(_) => return false,
                    None => {
                        mapping.insert(na, nb);
                        queue.push_back((na, nb));
                    }
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn accepts(a: &Automaton, input: &[u8]) -> bool {
        let d = a.determinize();
        let mut state = d.start;
        for &b in input {
            match d.states[state as usize]
                .transitions
                .iter()
                .find(|&&(byte, _)| byte == Some(b))
            {
                Some(&(_, t)) => state = t,
                None => return false,
            }
        }
        d.states[state as usize].accepting
    }

    #[test]
    fn single_byte_accepts_only_that_byte() {
        let a = Automaton::single_byte(b'a');
        assert!(accepts(&a, b"a"));
        assert!(!accepts(&a, b"b"));
        assert!(!accepts(&a, b""));
        assert!(!accepts(&a, b"aa"));
    }

    #[test]
    fn union_accepts_either_branch() {
        let a = Automaton::union(&Automaton::single_byte(b'a'), &Automaton::single_byte(b'b'));
        assert!(accepts(&a, b"a"));
        assert!(accepts(&a, b"b"));
        assert!(!accepts(&a, b"c"));
    }

    #[test]
    fn concat_requires_both_in_order() {
        let a = Automaton::concat(&Automaton::single_byte(b'a'), &Automaton::single_byte(b'b'));
        assert!(accepts(&a, b"ab"));
        assert!(!accepts(&a, b"ba"));
        assert!(!accepts(&a, b"a"));
    }

    #[test]
    fn closure_star_accepts_zero_or_more() {
        let a = Automaton::closure_star(&Automaton::single_byte(b'a'));
        assert!(accepts(&a, b""));
        assert!(accepts(&a, b"a"));
        assert!(accepts(&a, b"aaaa"));
        assert!(!accepts(&a, b"aab"));
    }

    #[test]
    fn closure_plus_requires_at_least_one() {
        let a = Automaton::closure_plus(&Automaton::single_byte(b'a'));
        assert!(!accepts(&a, b""));
        assert!(accepts(&a, b"a"));
        assert!(accepts(&a, b"aaa"));
    }

    #[test]
    fn intersect_is_conjunction() {
        // (a|b)* intersected with a(a|b)* requires starting with 'a'.
        let ab_star = Automaton::closure_star(&Automaton::union(
            &Automaton::single_byte(b'a'),
            &Automaton::single_byte(b'b'),
        ));
        let starts_with_a = Automaton::concat(&Automaton::single_byte(b'a'), &ab_star);
        let both = Automaton::intersect(&ab_star, &starts_with_a);
        assert!(accepts(&both, b"abba"));
        assert!(!accepts(&both, b"baab"));
        assert!(!accepts(&both, b""));
    }

    #[test]
    fn minimize_preserves_language() {
        let a = Automaton::closure_star(&Automaton::single_byte(b'a'));
        let m = a.minimize();
        assert!(Automaton::equivalent(&a, &m));
        assert!(accepts(&m, b"aaaa"));
    }

    #[test]
    fn equivalent_detects_different_languages() {
        let a = Automaton::single_byte(b'a');
        let b = Automaton::single_byte(b'b');
        assert!(!Automaton::equivalent(&a, &b));
        assert!(Automaton::equivalent(&a, &a.clone()));
    }
}
