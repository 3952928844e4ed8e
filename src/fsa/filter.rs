// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Adapts a minimized [`Automaton`] into a dense O(1) step table.

use crate::debug::trace;
use crate::error::{Error, Result};
use crate::fsa::{Automaton, StateId};

/// A compiled pattern, ready to drive the search.
///
/// `step` is a flat `num_states * 256` table rather than per-state vectors,
/// trading memory for a single multiply-and-index on the hot path.
pub struct Filter {
    num_states: usize,
    step: Vec<Option<StateId>>,
    accepting: Vec<bool>,
}

impl Filter {
    /// Compile `pattern` (already parsed and combined) into a filter: append
    /// the trailing mandatory space, determinize, minimize, and lay out the
    /// dense step table.
    pub fn compile(pattern: &Automaton) -> Result<Filter> {
        trace!("compiling pattern: {} states before minimization", pattern.num_states());
        let with_trailing_space = Automaton::concat(pattern, &Automaton::single_byte(b' '));
        let min = with_trailing_space.minimize();
        trace!("minimized to {} states", min.num_states());

        let num_states = min.num_states().max(1);
        let mut step = vec![None; num_states * 256];
        let mut accepting = vec![false; num_states];

        if min.num_states() == 0 {
            // Synthesize a one-state reject-all filter.
            return Ok(Filter {
                num_states: 1,
                step,
                accepting,
            });
        }

        for s in 0..min.num_states() as StateId {
            accepting[s as usize] = min.is_accepting(s);
            for &(byte, target) in min.transitions(s) {
                let byte = byte.ok_or(Error::PatternInfeasible)?;
                if byte == 0 {
                    return Err(Error::PatternInfeasible);
                }
                if target as usize >= num_states {
                    return Err(Error::PatternInfeasible);
                }
                step[s as usize * 256 + byte as usize] = Some(target);
            }
        }

        Ok(Filter {
            num_states,
            step,
            accepting,
        })
    }

    pub fn start(&self) -> StateId {
        0
    }

    pub fn is_accepting(&self, s: StateId) -> bool {
        self.accepting[s as usize]
    }

    pub fn step(&self, s: StateId, byte: u8) -> Option<StateId> {
        if (s as usize) >= self.num_states {
            return None;
        }
        self.step[s as usize * 256 + byte as usize]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reject_all_pattern_never_accepts() {
        let filter = Filter::compile(&Automaton::empty()).unwrap();
        let s = filter.start();
        assert!(!filter.is_accepting(s));
        assert!(filter.step(s, b'a').is_none());
    }

    #[test]
    fn literal_pattern_steps_through_bytes_then_space() {
        let pattern = Automaton::concat(
            &Automaton::single_byte(b'h'),
            &Automaton::concat(&Automaton::single_byte(b'i'), &Automaton::epsilon()),
        );
        let filter = Filter::compile(&pattern).unwrap();
        let mut s = filter.start();
        for &b in b"hi " {
            s = filter.step(s, b).expect("byte should be accepted");
        }
        assert!(filter.is_accepting(s));
    }
}
