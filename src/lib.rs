#[macro_use(debug)]
extern crate tracing;

pub mod alternating;
pub mod buchi;
pub mod formula;
pub mod generalized;
pub mod monitor;
pub mod output;
pub mod parser;
pub mod rewrite;
pub mod set;

use std::io;
use std::rc::Rc;

use thiserror::Error;

use crate::alternating::Alternating;
use crate::buchi::Buchi;
use crate::formula::CexprTable;
use crate::formula::Formula;
use crate::formula::Symtab;
use crate::generalized::Generalized;
use crate::parser::ParseError;
use crate::rewrite::Cache;

/// Which simplifications run and what gets reported; everything on and
/// quiet by default.
#[derive(Debug, Clone, Copy)]
pub struct Flags {
	/// Logic rewrite laws while parsing.
	pub simp_log: bool,
	/// A-posteriori automata simplification.
	pub simp_diff: bool,
	/// On-the-fly subsumption and equivalence checks.
	pub simp_fly: bool,
	/// SCC analysis strengthening the a-posteriori passes.
	pub simp_scc: bool,
	/// Acceptance-mark trick testing the transition target instead of the
	/// source.
	pub fj_to_fj: bool,
	/// Dump each intermediate automaton to stderr.
	pub verbose: bool,
	/// Timing and size statistics to stderr.
	pub stats: bool,
}

impl Default for Flags {
	fn default() -> Self {
		Self {
			simp_log: true,
			simp_diff: true,
			simp_fly: true,
			simp_scc: true,
			fj_to_fj: true,
			verbose: false,
			stats: false,
		}
	}
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
	Spin,
	C,
	Dot,
}

#[derive(Debug, Error)]
pub enum Error<'input> {
	#[error("{0}")]
	Parse(ParseError<'input>),
	#[error("write error: {0}")]
	Io(#[from] io::Error),
}

impl<'input> Error<'input> {
	pub fn parse(&self) -> Option<&ParseError<'input>> {
		match self {
			Self::Parse(err) => Some(err),
			Self::Io(_) => None,
		}
	}
}

/// Translates one LTL formula into a Büchi automaton and emits it in the
/// requested syntax. `uform` should be a single line (the caller maps
/// tabs, quotes and newlines to spaces); verbose and statistics output
/// goes to stderr.
pub fn translate<'input>(
	uform: &'input str,
	flags: &Flags,
	mode: OutputMode,
	c_sym_prefix: &str,
	out: &mut impl io::Write,
) -> Result<(), Error<'input>> {
	let mut symtab: Symtab = Symtab::new();
	let mut cexprs: CexprTable = CexprTable::new();
	let mut cache: Cache = Cache::new();

	let f: Rc<Formula> =
		parser::parse_formula(uform, &mut symtab, &mut cexprs, &mut cache, flags.simp_log)
			.map_err(Error::Parse)?;

	if flags.verbose {
		eprintln!("formula: {uform}");
		eprintln!("\t/* Normlzd: {f} */");
	}

	let alt: Alternating = Alternating::from_formula_with(&f, flags, &cexprs);
	let g: Generalized = Generalized::from_alternating(&alt, flags);
	let mut b: Buchi = Buchi::from_generalized(&g, flags);

	match mode {
		OutputMode::Spin => output::print_spin(out, &b, &alt.sym_table, uform)?,
		OutputMode::Dot => output::print_dot(out, &b, &alt.sym_table, &cexprs)?,
		OutputMode::C => monitor::print_c(out, &mut b, &alt.sym_table, &cexprs, c_sym_prefix, uform)?,
	}

	if flags.stats {
		let (stores, hits): (u64, u64) = cache.stats();
		eprintln!("\ncache stores     : {stores}");
		eprintln!("cache hits       : {hits}");
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::buchi::BRef;
	use crate::set::Bitset;
	use std::collections::BTreeSet;

	fn spin(formula: &str) -> String {
		let mut out: Vec<u8> = Vec::new();
		translate(formula, &Flags::default(), OutputMode::Spin, "_ltl2ba", &mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	fn spin_with(formula: &str, flags: &Flags) -> String {
		let mut out: Vec<u8> = Vec::new();
		translate(formula, flags, OutputMode::Spin, "_ltl2ba", &mut out).unwrap();
		String::from_utf8(out).unwrap()
	}

	#[test]
	fn end_to_end_spin() {
		let out: String = spin("[] <> p");
		assert!(out.starts_with("never { /* [] <> p */\n"));
		assert!(out.contains("accept_"));
		assert!(out.ends_with("}\n"));
	}

	#[test]
	fn double_negation_is_identity() {
		for formula in ["p U q", "[] p", "<> p", "[] <> p", "p U (q U r)"] {
			let negated: String = format!("! ! ({formula})");
			let lhs: String = spin(formula);
			// The comment line carries the formula text; compare bodies.
			let lhs_body: &str = lhs.split_once('\n').unwrap().1;
			let rhs: String = spin(&negated);
			let rhs_body: &str = rhs.split_once('\n').unwrap().1;
			assert_eq!(lhs_body, rhs_body, "!!({formula}) differs");
		}
	}

	#[test]
	fn parse_failure_reports_position() {
		let mut out: Vec<u8> = Vec::new();
		let err: Error<'_> =
			translate("p U &&", &Flags::default(), OutputMode::Spin, "_ltl2ba", &mut out).unwrap_err();
		let parse: &ParseError<'_> = err.parse().unwrap();
		assert_eq!(parse.column(), 4);
	}

	#[test]
	fn simplifiers_off_still_translates() {
		let flags: Flags = Flags {
			simp_log: false,
			simp_diff: false,
			simp_fly: false,
			simp_scc: false,
			fj_to_fj: false,
			..Flags::default()
		};
		for formula in ["true", "false", "p U q", "[] <> p", "p -> <> q"] {
			let out: String = spin_with(formula, &flags);
			assert!(out.starts_with("never {"), "no automaton for {formula}");
			assert!(out.ends_with("}\n"));
		}
	}

	#[test]
	fn all_output_modes_emit() {
		for mode in [OutputMode::Spin, OutputMode::C, OutputMode::Dot] {
			let mut out: Vec<u8> = Vec::new();
			translate("[] (p -> <> q)", &Flags::default(), mode, "_ltl2ba", &mut out).unwrap();
			assert!(!out.is_empty());
		}
	}

	/// A translated automaton together with its predicate names, for
	/// letter-by-name simulation.
	struct Automaton {
		buchi: Buchi,
		sym_table: Vec<formula::Sym>,
	}

	fn automaton(formula: &str, flags: &Flags) -> Automaton {
		let mut symtab: Symtab = Symtab::new();
		let mut cexprs: CexprTable = CexprTable::new();
		let mut cache: Cache = Cache::new();
		let f: Rc<Formula> =
			parser::parse_formula(formula, &mut symtab, &mut cexprs, &mut cache, flags.simp_log)
				.unwrap();
		let alt: Alternating = Alternating::from_formula_with(&f, flags, &cexprs);
		let g: Generalized = Generalized::from_alternating(&alt, flags);
		let buchi: Buchi = Buchi::from_generalized(&g, flags);
		Automaton {
			buchi,
			sym_table: alt.sym_table,
		}
	}

	fn letter_enables(a: &Automaton, pos: &Bitset, neg: &Bitset, letter: &BTreeSet<&str>) -> bool {
		pos.iter().all(|i| letter.contains(&*a.sym_table[i]))
			&& !neg.iter().any(|i| letter.contains(&*a.sym_table[i]))
	}

	fn step(a: &Automaton, current: &BTreeSet<BRef>, letter: &BTreeSet<&str>) -> BTreeSet<BRef> {
		let mut next: BTreeSet<BRef> = BTreeSet::new();
		for &s in current.iter() {
			for t in a.buchi.arena[s].trans.as_deref().unwrap().iter() {
				if letter_enables(a, &t.pos, &t.neg, letter) {
					next.insert(t.to);
				}
			}
		}
		next
	}

	/// Does the automaton accept the infinite word `prefix . cycle^w`?
	///
	/// Product of states and cycle phases; accepted iff some accepting
	/// product node lies on a cycle reachable from the states left after
	/// the prefix.
	fn accepts_lasso(a: &Automaton, prefix: &[BTreeSet<&str>], cycle: &[BTreeSet<&str>]) -> bool {
		if a.buchi.is_empty() {
			return false;
		}

		let mut current: BTreeSet<BRef> = BTreeSet::from([a.buchi.solved[0]]);
		for letter in prefix.iter() {
			current = step(a, &current, letter);
		}
		if current.is_empty() {
			return false;
		}

		let dense: Vec<BRef> = a.buchi.solved.clone();
		let index_of = |s: BRef| dense.iter().position(|&d| d == s).unwrap();
		let phases: usize = cycle.len();
		let n: usize = dense.len() * phases;

		// Adjacency of (state, phase) nodes under the cycle letters.
		let mut reach: Vec<bool> = vec![false; n * n];
		for (si, &s) in dense.iter().enumerate() {
			for (phase, letter) in cycle.iter().enumerate() {
				for t in a.buchi.arena[s].trans.as_deref().unwrap().iter() {
					if letter_enables(a, &t.pos, &t.neg, letter) {
						let from: usize = si * phases + phase;
						let to: usize = index_of(t.to) * phases + (phase + 1) % phases;
						reach[from * n + to] = true;
					}
				}
			}
		}
		// Transitive closure.
		loop {
			let mut going: bool = false;
			for r in 0..n {
				for c in 0..n {
					if !reach[r * n + c] {
						let reached: bool = (0..n).any(|i| reach[r * n + i] && reach[i * n + c]);
						if reached {
							reach[r * n + c] = true;
							going = true;
						}
					}
				}
			}
			if !going {
				break;
			}
		}

		for &start in current.iter() {
			let start_node: usize = index_of(start) * phases;
			for (si, &s) in dense.iter().enumerate() {
				if !a.buchi.is_accepting(s) {
					continue;
				}
				for phase in 0..phases {
					let node: usize = si * phases + phase;
					let reachable: bool = start_node == node || reach[start_node * n + node];
					if reachable && reach[node * n + node] {
						return true;
					}
				}
			}
		}
		false
	}

	#[test]
	fn simplified_and_raw_automata_accept_the_same_words() {
		let raw_flags: Flags = Flags {
			simp_log: false,
			simp_diff: false,
			simp_fly: false,
			simp_scc: false,
			fj_to_fj: false,
			..Flags::default()
		};

		let letters: Vec<BTreeSet<&str>> = vec![
			BTreeSet::new(),
			BTreeSet::from(["p"]),
			BTreeSet::from(["q"]),
			BTreeSet::from(["p", "q"]),
		];

		for formula in [
			"p U q",
			"[] <> p",
			"<> [] p",
			"[] (p -> <> q)",
			"! (p U q)",
			"(p U q) || [] p",
		] {
			let simplified: Automaton = automaton(formula, &Flags::default());
			let raw: Automaton = automaton(formula, &raw_flags);

			// Every lasso word with |prefix| <= 1 and |cycle| <= 2 over
			// the two predicates.
			let mut prefixes: Vec<Vec<BTreeSet<&str>>> = vec![Vec::new()];
			prefixes.extend(letters.iter().map(|l| vec![l.clone()]));
			let mut cycles: Vec<Vec<BTreeSet<&str>>> = Vec::new();
			cycles.extend(letters.iter().map(|l| vec![l.clone()]));
			for l1 in letters.iter() {
				for l2 in letters.iter() {
					cycles.push(vec![l1.clone(), l2.clone()]);
				}
			}

			for prefix in prefixes.iter() {
				for cycle in cycles.iter() {
					assert_eq!(
						accepts_lasso(&simplified, prefix, cycle),
						accepts_lasso(&raw, prefix, cycle),
						"{formula} disagrees on {prefix:?} ({cycle:?})^w"
					);
				}
			}
		}
	}
}
