// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Recursive-descent compiler for the pattern surface syntax.
//!
//! ```text
//! Expr   ::= Branch ('|' Branch)*              -- union
//! Branch ::= Factor ('&' Factor)*              -- intersection
//! Factor ::= Piece*                            -- concatenation (may be empty)
//! Piece  ::= Atom Quantifier?
//! Atom   ::= '"' Expr '"'                      -- quoted: suppresses implicit space
//!          | '(' Expr ')'
//!          | '<' Anagram '>'
//!          | '[' '^'? CharClass+ ']'
//!          | CharClass                         -- single-char atom
//! Quantifier ::= '*' | '+' | '?' | '{' N (',' N?)? '}'
//! ```

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::fsa::anagram;
use crate::fsa::Automaton;

const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const VOWELS: &str = "aeiou";

/// Parse `source` into a single compiled automaton (not yet minimized or
/// trailing-space-adapted; see [`crate::fsa::filter::Filter::compile`]).
pub fn parse(source: &str) -> Result<Automaton> {
    let bytes = source.as_bytes();
    let mut p = Parser { bytes, pos: 0 };
    let result = p.expr(false)?;
    if p.pos != bytes.len() {
        return Err(Error::PatternParse(p.pos));
    }
    Ok(result)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek();
        if b.is_some() {
            self.pos += 1;
        }
        b
    }

    fn expect(&mut self, b: u8) -> Result<()> {
        if self.peek() == Some(b) {
            self.pos += 1;
            Ok(())
        } else {
            Err(Error::PatternParse(self.pos))
        }
    }

    fn expr(&mut self, quoted: bool) -> Result<Automaton> {
        let mut result = self.branch(quoted)?;
        while self.peek() == Some(b'|') {
            self.pos += 1;
            let next = self.branch(quoted)?;
            result = Automaton::union(&result, &next);
        }
        Ok(result)
    }

    fn branch(&mut self, quoted: bool) -> Result<Automaton> {
        let mut result = self.factor(quoted)?;
        while self.peek() == Some(b'&') {
            self.pos += 1;
            let next = self.factor(quoted)?;
            result = Automaton::intersect(&result, &next);
        }
        Ok(result)
    }

    fn factor(&mut self, quoted: bool) -> Result<Automaton> {
        let mut result = Automaton::epsilon();
        while let Some(b) = self.peek() {
            // `"` only terminates a factor when it closes the quoted region
            // we are currently inside; unquoted, it opens a new quoted atom.
            if matches!(b, b'|' | b'&' | b')') || (quoted && b == b'"') {
                break;
            }
            let piece = self.piece(quoted)?;
            result = Automaton::concat(&result, &piece);
        }
        Ok(result)
    }

    fn piece(&mut self, quoted: bool) -> Result<Automaton> {
        let atom = self.atom(quoted)?;
        self.quantifier(atom)
    }

    fn quantifier(&mut self, atom: Automaton) -> Result<Automaton> {
        match self.peek() {
            Some(b'*') => {
                self.pos += 1;
                Ok(Automaton::closure_star(&atom))
            }
            Some(b'+') => {
                self.pos += 1;
                Ok(Automaton::closure_plus(&atom))
            }
            Some(b'?') => {
                self.pos += 1;
                Ok(Automaton::union(&atom, &Automaton::epsilon()))
            }
            Some(b'{') => {
                self.pos += 1;
                let m = self.number()?;
                let n = if self.peek() == Some(b',') {
                    self.pos += 1;
                    if self.peek() == Some(b'}') {
                        None
                    } else {
                        Some(self.number()?)
                    }
                } else {
                    Some(m)
                };
                self.expect(b'}')?;
                self.bounded_repetition(&atom, m, n)
            }
            _ => Ok(atom),
        }
    }

    fn number(&mut self) -> Result<usize> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(Error::PatternParse(self.pos));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(Error::PatternParse(start))
    }

    fn bounded_repetition(&self, atom: &Automaton, m: usize, n: Option<usize>) -> Result<Automaton> {
        if let Some(n) = n {
            if m > n || n > 255 {
                return Err(Error::PatternParse(self.pos));
            }
        }
        let mut result = Automaton::epsilon();
        for _ in 0..m {
            result = Automaton::concat(&result, atom);
        }
        match n {
            Some(n) => {
                let mut optional = Automaton::epsilon();
                for _ in 0..(n - m) {
                    optional = Automaton::union(&Automaton::epsilon(), &Automaton::concat(atom, &optional));
                }
                Ok(Automaton::concat(&result, &optional))
            }
            None => Ok(Automaton::concat(&result, &Automaton::closure_star(atom))),
        }
    }

    fn atom(&mut self, quoted: bool) -> Result<Automaton> {
        match self.peek() {
            Some(b'"') => {
                self.pos += 1;
                let inner = self.expr(true)?;
                self.expect(b'"')?;
                Ok(inner)
            }
            Some(b'(') => {
                self.pos += 1;
                let inner = self.expr(quoted)?;
                self.expect(b')')?;
                Ok(inner)
            }
            Some(b'<') => {
                self.pos += 1;
                let pieces = self.anagram_pieces(quoted)?;
                self.expect(b'>')?;
                Ok(anagram::compile(&pieces)?)
            }
            Some(b'[') => {
                self.pos += 1;
                let negate = self.peek() == Some(b'^');
                if negate {
                    self.pos += 1;
                }
                let mut set = BTreeSet::new();
                while self.peek() != Some(b']') {
                    if self.peek().is_none() {
                        return Err(Error::PatternParse(self.pos));
                    }
                    set.extend(self.char_class_bytes()?);
                }
                self.expect(b']')?;
                let set = if negate {
                    let universe: BTreeSet<u8> = (LOWER.bytes())
                        .chain(DIGITS.bytes())
                        .chain(std::iter::once(b' '))
                        .collect();
                    universe.difference(&set).copied().collect()
                } else {
                    set
                };
                let atom = Automaton::byte_set(&set);
                Ok(self.maybe_implicit_space(atom, quoted))
            }
            Some(_) => {
                let set = self.char_class_bytes()?;
                let atom = Automaton::byte_set(&set);
                Ok(self.maybe_implicit_space(atom, quoted))
            }
            None => Err(Error::PatternParse(self.pos)),
        }
    }

    /// Outside a quoted region, every single-byte atom admits a space at
    /// both endpoints, so matches tolerate word boundaries between
    /// characters.
    fn maybe_implicit_space(&self, atom: Automaton, quoted: bool) -> Automaton {
        if quoted {
            return atom;
        }
        let space_star = Automaton::closure_star(&Automaton::single_byte(b' '));
        Automaton::concat(&space_star, &Automaton::concat(&atom, &space_star))
    }

    /// Consume one character-class token and return the set of corpus bytes
    /// it expands to.
    fn char_class_bytes(&mut self) -> Result<BTreeSet<u8>> {
        let b = self.bump().ok_or(Error::PatternParse(self.pos))?;

        // Range `x-y`, checked before any single-char interpretation of `b`.
        if matches!(b, b'a'..=b'z' | b'0'..=b'9' | b' ')
            && self.peek() == Some(b'-')
            && matches!(
                self.bytes.get(self.pos + 1),
                Some(b'a'..=b'z' | b'0'..=b'9' | b' ')
            )
        {
            self.pos += 1;
            let hi = self.bump().unwrap();
            if hi < b {
                return Err(Error::PatternParse(self.pos));
            }
            return Ok((b..=hi).collect());
        }

        let class: BTreeSet<u8> = match b {
            b'a'..=b'z' | b'0'..=b'9' | b' ' => std::iter::once(b).collect(),
            b'.' => LOWER.bytes().chain(DIGITS.bytes()).chain(std::iter::once(b' ')).collect(),
            b'_' => LOWER.bytes().chain(DIGITS.bytes()).collect(),
            b'#' => DIGITS.bytes().collect(),
            b'A' => LOWER.bytes().collect(),
            b'V' => VOWELS.bytes().collect(),
            b'C' => LOWER.bytes().filter(|c| !VOWELS.as_bytes().contains(c)).collect(),
            _ => return Err(Error::PatternParse(self.pos - 1)),
        };
        Ok(class)
    }

    /// Parse the piece list inside `<...>`. Each atom (with its own
    /// quantifier, if any) is its own piece of the multiset: plain letters
    /// with no separating space, as in `<eelqsuuu>`, are eight one-letter
    /// pieces, not one eight-letter piece. Spaces between atoms are
    /// insignificant whitespace; `(...)` or `"..."` groups several atoms
    /// into a single piece. `-` is the wildcard-filler piece (optional
    /// space) rather than a character-class syntax error here. Pieces
    /// inherit the ambient `quoted` flag of the enclosing atom, not a fixed
    /// `true`: an anagram written unquoted still admits a word-boundary
    /// space around (and thus between) each of its letters, the same as any
    /// other unquoted atom.
    fn anagram_pieces(&mut self, quoted: bool) -> Result<Vec<Automaton>> {
        let mut pieces = Vec::new();
        loop {
            while self.peek() == Some(b' ') {
                self.pos += 1;
            }
            match self.peek() {
                Some(b'>') | None => break,
                Some(b'-') => {
                    self.pos += 1;
                    pieces.push(wildcard_filler());
                }
                Some(_) => {
                    let atom = self.atom(quoted)?;
                    let atom = self.quantifier(atom)?;
                    pieces.push(atom);
                }
            }
        }
        Ok(pieces)
    }
}

/// The `-` wildcard-filler automaton used inside anagram pieces: optionally
/// a single space.
pub(crate) fn wildcard_filler() -> Automaton {
    Automaton::union(&Automaton::epsilon(), &Automaton::single_byte(b' '))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fsa::filter::Filter;

    fn matches(pattern: &str, input: &str) -> bool {
        let automaton = parse(pattern).unwrap();
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

    #[test]
    fn literal_word() {
        assert!(matches("cat", "cat"));
        assert!(!matches("cat", "dog"));
    }

    #[test]
    fn union_alternatives() {
        assert!(matches("cat|dog", "cat"));
        assert!(matches("cat|dog", "dog"));
        assert!(!matches("cat|dog", "emu"));
    }

    #[test]
    fn dot_matches_any_letter_digit_or_space() {
        assert!(matches("c.t", "cat"));
        assert!(matches("c.t", "c t"));
        assert!(!matches("c.t", "c!t"));
    }

    #[test]
    fn quantifiers() {
        assert!(matches("ab*c", "ac"));
        assert!(matches("ab*c", "abbbc"));
        assert!(matches("ab+c", "abc"));
        assert!(!matches("ab+c", "ac"));
        assert!(matches("colou?r", "color"));
        assert!(matches("colou?r", "colour"));
    }

    #[test]
    fn bounded_repetition() {
        assert!(matches("a{2,3}", "aa"));
        assert!(matches("a{2,3}", "aaa"));
        assert!(!matches("a{2,3}", "a"));
        assert!(!matches("a{2,3}", "aaaa"));
    }

    #[test]
    fn character_class_negation() {
        assert!(matches("[^aeiou]at", "cat"));
        assert!(!matches("[^aeiou]at", "aat"));
    }

    #[test]
    fn quoted_region_suppresses_implicit_space() {
        // Without quotes, a single letter tolerates a leading/trailing
        // space; inside quotes it must match exactly.
        assert!(matches("\"cat\"", "cat"));
    }

    #[test]
    fn empty_group_compiles_to_exactly_epsilon() {
        // `()` is the empty word, not "zero or more spaces": the compiled
        // filter's own trailing space makes `()` match one space, but not
        // two, the way a leaf atom's self-wrapping would.
        assert!(matches("()", ""));
        assert!(!matches("()", " "));
    }

    #[test]
    fn empty_anagram_compiles_to_exactly_epsilon() {
        assert!(matches("<>", ""));
        assert!(!matches("<>", " "));
    }
}

