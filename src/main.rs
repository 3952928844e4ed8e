// Nutrimatic -- Word-puzzle search engine over a corpus-derived trie
// Copyright 2024 Ruud van Asseldonk

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.

//! Thin command-line front end: parses `env::args()` by hand and dispatches
//! on the first argument. Each subcommand is a `cmd_*` function; `main`
//! translates its `Result` into the process's exit code.

use std::collections::BTreeSet;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write as _};
use std::process;

use nutrimatic::debug;
use nutrimatic::error::{Error, Result};
use nutrimatic::fsa::filter::Filter;
use nutrimatic::fsa::{parser, Automaton, StateId};
use nutrimatic::index::{self, IndexReader, Walker};
use nutrimatic::ingest;
use nutrimatic::search::Driver;

/// Restart discount used by every search subcommand, matching the original
/// tool's fixed choice: frequent enough to surface mid-sentence
/// continuations, small enough to rarely outrank a direct completion.
const RESTART: f64 = 1e-6;

fn print_usage() {
    eprintln!("usage:");
    eprintln!("  nutrimatic build out-prefix               < corpus.txt");
    eprintln!("  nutrimatic merge cutoff shard... out.index");
    eprintln!("  nutrimatic dump in.index");
    eprintln!("  nutrimatic explore in.index path [depth]");
    eprintln!("  nutrimatic find-expr in.index expression");
    eprintln!("  nutrimatic find-anagrams in.index letters");
    eprintln!("  nutrimatic find-phone-words in.index digits");
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let result = match args.get(1).map(String::as_str) {
        Some("build") => cmd_build(&args[2..]),
        Some("merge") => cmd_merge(&args[2..]),
        Some("dump") => cmd_dump(&args[2..]),
        Some("explore") => cmd_explore(&args[2..]),
        Some("find-expr") => cmd_find_expr(&args[2..]),
        Some("find-anagrams") => cmd_find_anagrams(&args[2..]),
        Some("find-phone-words") => cmd_find_phone_words(&args[2..]),
        _ => {
            print_usage();
            process::exit(2);
        }
    };

    match result {
        Ok(()) => {}
        Err(Error::Usage(_)) => process::exit(2),
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(exit_code_for(&e));
        }
    }
}

/// Maps an error to its process exit code, applied uniformly across every
/// subcommand.
fn exit_code_for(e: &Error) -> i32 {
    match e {
        Error::Usage(_) => 2,
        Error::PatternParse(_) => 2,
        Error::IoError(_) => 1,
        Error::CodecCorruption(_, _) => 1,
        Error::PatternInfeasible => 1,
        Error::EncodeOverflow => 1,
    }
}

fn cmd_build(args: &[String]) -> Result<()> {
    if args.len() != 1 {
        print_usage();
        return Err(Error::Usage("build takes exactly one argument: out-prefix"));
    }
    let stdin = io::stdin();
    ingest::ingest(stdin.lock(), &args[0])?;
    Ok(())
}

fn cmd_merge(args: &[String]) -> Result<()> {
    if args.len() < 3 {
        print_usage();
        return Err(Error::Usage(
            "merge takes a cutoff, at least one shard, and an output path",
        ));
    }
    let cutoff: u64 = args[0].parse().map_err(|_| {
        eprintln!("error: invalid cutoff \"{}\"", args[0]);
        Error::Usage("cutoff must be a non-negative integer")
    })?;

    let (shards, out_path) = args[1..].split_at(args.len() - 2);
    let out_path = &out_path[0];

    let mut readers = Vec::with_capacity(shards.len());
    for path in shards {
        readers.push(IndexReader::open(path)?);
    }

    let out = File::create(out_path)?;
    index::merge(&readers, cutoff, BufWriter::new(out))?;
    Ok(())
}

fn cmd_dump(args: &[String]) -> Result<()> {
    if args.len() != 1 {
        print_usage();
        return Err(Error::Usage("dump takes exactly one argument: in.index"));
    }
    let reader = IndexReader::open(&args[0])?;
    let mut walker = Walker::new(&reader, reader.root(), reader.count())?;
    while let Some((text, _same, count)) = walker.next()? {
        println!("{:5} [{}]", count, String::from_utf8_lossy(text));
    }
    Ok(())
}

fn cmd_explore(args: &[String]) -> Result<()> {
    if args.len() < 2 || args.len() > 3 {
        print_usage();
        return Err(Error::Usage(
            "explore takes an index path, a path, and an optional depth",
        ));
    }
    let reader = IndexReader::open(&args[0])?;
    println!("Root ({}) @{}", reader.count(), reader.root());

    let path = args[1].as_bytes();
    let depth: i64 = if args.len() == 3 {
        match args[2].parse::<i64>() {
            Ok(d) if d != 0 => d,
            _ => {
                eprintln!("error: invalid depth \"{}\"", args[2]);
                return Err(Error::Usage("depth must be a non-zero integer"));
            }
        }
    } else {
        path.len() as i64
    };

    let mut sofar = Vec::new();
    explore_walk(&reader, reader.root(), reader.count(), path, depth, &mut sofar)
}

/// Descend along `path` literally byte by byte; once `path` is exhausted,
/// explore remaining children in count-descending order for `depth` more
/// levels.
fn explore_walk(
    reader: &IndexReader,
    node: index::Addr,
    count: u64,
    path: &[u8],
    depth: i64,
    sofar: &mut Vec<u8>,
) -> Result<()> {
    if depth == 0 {
        return Ok(());
    }

    let (mut children, rest) = match path.first() {
        Some(&b) => (reader.children(node, count, b, b)?, &path[1..]),
        None => (reader.children(node, count, 0, 255)?, path),
    };
    children.sort_by_key(|c| std::cmp::Reverse(c.count));

    for choice in children {
        sofar.push(choice.ch);
        let addr = choice.next.unwrap_or(0);
        println!("{} ({}) @{}", String::from_utf8_lossy(sofar), choice.count, addr);
        explore_walk(reader, addr, choice.count, rest, depth - 1, sofar)?;
        sofar.pop();
    }
    Ok(())
}

fn cmd_find_expr(args: &[String]) -> Result<()> {
    if args.len() != 2 || args[1].is_empty() {
        print_usage();
        return Err(Error::Usage(
            "find-expr takes an index path and a non-empty expression",
        ));
    }
    let automaton = parser::parse(&args[1])?;
    let filter = compile_filter("find-expr", &automaton)?;
    if !is_feasible(&filter) {
        eprintln!("error: \"{}\" can't match anything", args[1]);
        return Err(Error::PatternInfeasible);
    }
    let reader = IndexReader::open(&args[0])?;
    run_search(&reader, &filter)
}

/// Whether an accepting state is reachable at all from the filter's start
/// state — i.e. the compiled language isn't empty. A trap state that merely
/// loops (e.g. on space) without ever accepting is not enough to call a
/// pattern feasible, so this walks the full reachable set rather than
/// checking one step.
fn is_feasible(filter: &Filter) -> bool {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![filter.start()];
    seen.insert(filter.start());
    while let Some(s) = stack.pop() {
        if filter.is_accepting(s) {
            return true;
        }
        for b in 0u16..=255 {
            if let Some(next) = filter.step(s, b as u8) {
                if seen.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
    false
}

fn cmd_find_anagrams(args: &[String]) -> Result<()> {
    if args.len() != 2 {
        print_usage();
        return Err(Error::Usage(
            "find-anagrams takes an index path and a letters argument",
        ));
    }
    let source = format!("<{}>", args[1]);
    let automaton = parser::parse(&source)?;
    let filter = compile_filter("find-anagrams", &automaton)?;
    let reader = IndexReader::open(&args[0])?;
    run_search(&reader, &filter)
}

/// Standard telephone keypad letter groups; index 0 and 1 carry no letters,
/// so a `0` or `1` digit only ever matches itself.
const PHONE_KEYS: [&[u8]; 10] = [
    b"", b"", b"abc", b"def", b"ghi", b"jkl", b"mno", b"pqrs", b"tuv", b"wxyz",
];

fn cmd_find_phone_words(args: &[String]) -> Result<()> {
    if args.len() != 2 {
        print_usage();
        return Err(Error::Usage(
            "find-phone-words takes an index path and a digits argument",
        ));
    }
    if args[1].is_empty() || !args[1].bytes().all(|b| b.is_ascii_digit()) {
        print_usage();
        return Err(Error::Usage("digits must be a non-empty string of 0-9"));
    }
    let automaton = phone_pattern(args[1].as_bytes());
    let filter = compile_filter("find-phone-words", &automaton)?;
    let reader = IndexReader::open(&args[0])?;
    run_search(&reader, &filter)
}

/// Compile `automaton` into a [`Filter`] (tracing to stderr is handled by
/// `Filter::compile` itself when `NUTRIMATIC_DEBUG_FST` is set); in addition,
/// dump the minimized automaton's transition table to
/// `NUTRIMATIC_DEBUG_FST_DUMP`, if set.
fn compile_filter(label: &str, automaton: &Automaton) -> Result<Filter> {
    if let Some(path) = debug::dump_path() {
        if debug::trace_enabled() {
            eprintln!("[{}] dumping minimized automaton to {}", label, path.display());
        }
        dump_automaton(&automaton.minimize(), &path)?;
    }
    Filter::compile(automaton)
}

fn dump_automaton(automaton: &Automaton, path: &std::path::Path) -> Result<()> {
    let mut f = File::create(path)?;
    for s in 0..automaton.num_states() as StateId {
        writeln!(f, "state {} accepting={}", s, automaton.is_accepting(s))?;
        for &(byte, target) in automaton.transitions(s) {
            match byte {
                Some(b) => writeln!(f, "  {:?} -> {}", b as char, target)?,
                None => writeln!(f, "  eps -> {}", target)?,
            }
        }
    }
    Ok(())
}

/// Build the automaton matching any phrase whose letters key the given
/// digit sequence on a telephone keypad, each digit also matching itself
/// literally. Space is allowed (but not required) around each digit's
/// match, the same as any unquoted literal in the pattern language, since
/// the digit-to-letter mapping has no surface syntax of its own to wrap.
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

/// Pull every result from `driver` in best-first order, printing `score
/// text` lines and a `# <n>` progress marker every 100 000 popped queue
/// entries.
fn run_search(reader: &IndexReader, filter: &Filter) -> Result<()> {
    let mut driver = Driver::new(reader, filter, RESTART);
    let mut last_marker = 0u64;
    loop {
        let hit = driver.next()?;
        while last_marker + 100_000 <= driver.popped() {
            last_marker += 100_000;
            println!("# {}", last_marker);
        }
        match hit {
            Some(hit) => println!("{} {}", format_score(hit.score), hit.text),
            None => break,
        }
    }
    Ok(())
}

/// Format a non-negative score with up to 8 significant digits, `%g`-style:
/// fixed-point near unit magnitude, scientific notation further out,
/// trailing zeros and a bare trailing `.` trimmed.
fn format_score(score: f64) -> String {
    if score == 0.0 {
        return "0".to_string();
    }
    const SIG_DIGITS: i32 = 8;
    let scientific = format!("{:.*e}", (SIG_DIGITS - 1) as usize, score);
    let (mantissa, exponent) = scientific.split_once('e').expect("formatted with 'e'");
    let exponent: i32 = exponent.parse().expect("exponent is an integer");

    if !(-4..SIG_DIGITS).contains(&exponent) {
        let mantissa = trim_trailing_zeros(mantissa);
        format!("{}e{}{}", mantissa, if exponent >= 0 { "+" } else { "-" }, exponent.abs())
    } else {
        let decimals = (SIG_DIGITS - 1 - exponent).max(0) as usize;
        trim_trailing_zeros(&format!("{:.*}", decimals, score))
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_score_trims_trailing_zeros() {
        assert_eq!(format_score(5.0), "5");
        assert_eq!(format_score(0.0), "0");
        assert_eq!(format_score(3.25), "3.25");
    }

    #[test]
    fn format_score_uses_scientific_notation_far_from_unit_magnitude() {
        assert_eq!(format_score(123_456_789.0), "1.2345679e+8");
        assert_eq!(format_score(0.000001234), "1.234e-6");
    }

    #[test]
    fn phone_pattern_accepts_digit_or_mapped_letter() {
        let automaton = phone_pattern(b"22");
        let filter = Filter::compile(&automaton).unwrap();
        let mut s = filter.start();
        for b in b"ab" {
            s = filter.step(s, *b).expect("letter on keypad 2 should match");
        }
        assert!(filter.step(s, b' ').map(|s| filter.is_accepting(s)) == Some(true));
    }

    #[test]
    fn is_feasible_rejects_disjoint_intersection() {
        // "zzz" only ever contains 'z' bytes, "qqq" only ever contains 'q'
        // bytes: no string satisfies both, even though the minimized filter
        // still has a (non-accepting) trap state with an outgoing space
        // self-loop, which a shallower check could mistake for reachable.
        let automaton = parser::parse("zzz & qqq").unwrap();
        let filter = Filter::compile(&automaton).unwrap();
        assert!(!is_feasible(&filter));
    }

    #[test]
    fn is_feasible_accepts_ordinary_literal() {
        let automaton = parser::parse("cat").unwrap();
        let filter = Filter::compile(&automaton).unwrap();
        assert!(is_feasible(&filter));
    }
}
