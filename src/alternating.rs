/// Very-weak alternating automaton construction.
///
/// One state per temporal subformula, found by structural equality, which
/// is what keeps the automaton very weak: a state can only reach itself
/// and states built before it.
///
/// Based on Paul Gastin and Denis Oddoux. 2001. Fast LTL to Büchi automata
/// translation. CAV 2001, LNCS 2102.
use std::io;
use std::rc::Rc;
use std::time::Instant;

use crate::Flags;
use crate::formula::CexprTable;
use crate::formula::Formula;
use crate::formula::Sym;
use crate::formula::isequal;
use crate::set::Bitset;

#[derive(Debug)]
pub struct Alternating {
	/// Outgoing disjunction per state; index 0 is the initial fan-out.
	pub transitions: Vec<Vec<ATrans>>,
	/// Subformula that produced each state; `None` for the initial
	/// pseudo-state and for states pruned as inaccessible.
	labels: Vec<Option<Rc<Formula>>>,
	/// States whose subformula is an Until: the acceptance obligations.
	pub final_set: Bitset,
	/// Predicate names, dense ids in discovery order.
	pub sym_table: Vec<Sym>,
	pub node_universe: usize,
	pub sym_universe: usize,
	pub state_count: usize,
	pub trans_count: usize,
}

/// A universal transition: while reading a letter satisfying every
/// literal in `pos` and none in `neg`, split into all states of `to`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ATrans {
	pub pos: Bitset,
	pub neg: Bitset,
	pub to: Bitset,
}

impl ATrans {
	/// Merged transition, or `None` when the combined guard is
	/// unsatisfiable (`pos` and `neg` overlap).
	pub fn merge(&self, other: &Self) -> Option<Self> {
		let pos: Bitset = Bitset::union_of(&self.pos, &other.pos);
		let neg: Bitset = Bitset::union_of(&self.neg, &other.neg);
		if pos.intersects(&neg) {
			return None;
		}
		Some(Self {
			pos,
			neg,
			to: Bitset::union_of(&self.to, &other.to),
		})
	}
}

/// Number of states the formula can contribute (every subformula counts).
fn node_count(f: &Formula) -> usize {
	match f {
		Formula::And(x, y) | Formula::Or(x, y) | Formula::Until(x, y) | Formula::Release(x, y) => {
			node_count(x) + node_count(y) + 1
		},
		Formula::Next(x) => node_count(x) + 1,
		_ => 1,
	}
}

/// Number of literal occurrences, an upper bound on distinct predicates.
fn sym_count(f: &Formula) -> usize {
	match f {
		Formula::And(x, y) | Formula::Or(x, y) | Formula::Until(x, y) | Formula::Release(x, y) => {
			sym_count(x) + sym_count(y)
		},
		Formula::Next(x) => sym_count(x),
		Formula::Literal { .. } => 1,
		_ => 0,
	}
}

impl Alternating {
	pub fn from_formula(f: &Rc<Formula>, simplify: bool) -> Self {
		let node_universe: usize = node_count(f) + 1;
		let sym_universe: usize = sym_count(f);

		let mut alt: Self = Self {
			transitions: vec![Vec::new()],
			labels: vec![None],
			final_set: Bitset::new(node_universe),
			sym_table: Vec::new(),
			node_universe,
			sym_universe,
			state_count: 0,
			trans_count: 0,
		};

		let init: Vec<ATrans> = alt.boolean(f);
		alt.transitions[0] = init;

		if simplify {
			alt.simplify();
		}

		alt
	}

	/// [`Alternating::from_formula`] with verbose dumps and statistics
	/// driven by the flags.
	pub fn from_formula_with(f: &Rc<Formula>, flags: &Flags, cexprs: &CexprTable) -> Self {
		let started: Instant = Instant::now();

		let mut alt: Self = Self::from_formula(f, false);

		if flags.verbose {
			eprintln!("\nAlternating automaton before simplification");
			let _ = alt.print(&mut io::stderr(), cexprs);
		}

		if flags.simp_diff {
			alt.simplify();
			if flags.verbose {
				eprintln!("\nAlternating automaton after simplification");
				let _ = alt.print(&mut io::stderr(), cexprs);
			}
		}

		if flags.stats {
			eprintln!(
				"\nBuilding and simplification of the alternating automaton: {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{} states, {} transitions", alt.state_count, alt.trans_count);
		}

		alt
	}

	pub fn state_ids(&self) -> usize {
		self.labels.len()
	}

	pub fn label(&self, i: usize) -> Option<&Rc<Formula>> {
		self.labels[i].as_ref()
	}

	fn empty_trans(&self) -> ATrans {
		ATrans {
			pos: Bitset::new(self.sym_universe),
			neg: Bitset::new(self.sym_universe),
			to: Bitset::new(self.node_universe),
		}
	}

	/// The id of the state labeled by an equal formula, if built already.
	fn already_done(&self, f: &Formula) -> Option<usize> {
		(1..self.labels.len()).find(|&i| {
			self.labels[i]
				.as_ref()
				.is_some_and(|label| isequal(label, f))
		})
	}

	/// Dense predicate id, attributed at first sight.
	fn sym_id(&mut self, sym: &Sym) -> usize {
		for (i, other) in self.sym_table.iter().enumerate() {
			if other == sym {
				return i;
			}
		}
		self.sym_table.push(sym.clone());
		self.sym_table.len() - 1
	}

	/// Transitions for the propositional structure over temporal leaves:
	/// the fan-out used by `X` operands and the initial transitions.
	fn boolean(&mut self, f: &Rc<Formula>) -> Vec<ATrans> {
		match &**f {
			Formula::True => vec![self.empty_trans()],
			Formula::False => Vec::new(),
			Formula::And(x, y) => {
				let lft: Vec<ATrans> = self.boolean(x);
				let rgt: Vec<ATrans> = self.boolean(y);
				let mut result: Vec<ATrans> = Vec::new();
				for t1 in lft.iter() {
					for t2 in rgt.iter() {
						if let Some(merged) = t1.merge(t2) {
							result.push(merged);
						}
					}
				}
				result
			},
			Formula::Or(x, y) => {
				let mut result: Vec<ATrans> = self.boolean(x);
				result.extend(self.boolean(y));
				result
			},
			_ => {
				self.build(f);
				let node: usize = self.already_done(f).expect("build registers the formula");
				let mut t: ATrans = self.empty_trans();
				t.to.add(node);
				vec![t]
			},
		}
	}

	/// Builds the state for `f` (and everything below it) and returns its
	/// outgoing transitions.
	fn build(&mut self, f: &Rc<Formula>) -> Vec<ATrans> {
		if let Some(node) = self.already_done(f) {
			return self.transitions[node].clone();
		}

		let t: Vec<ATrans> = match &**f {
			Formula::True => vec![self.empty_trans()],
			Formula::False => Vec::new(),
			Formula::Literal { sym, negated } => {
				let id: usize = self.sym_id(sym);
				let mut t: ATrans = self.empty_trans();
				if *negated {
					t.neg.add(id);
				} else {
					t.pos.add(id);
				}
				vec![t]
			},
			Formula::Next(x) => self.boolean(x),
			Formula::Until(x, y) => {
				// p U q == q || (p && X (p U q))
				let mut t: Vec<ATrans> = self.build(y);
				let lft: Vec<ATrans> = self.build(x);
				let me: usize = self.labels.len();
				for t1 in lft.into_iter() {
					let mut looped: ATrans = t1;
					looped.to.add(me);
					t.push(looped);
				}
				self.final_set.add(me);
				t
			},
			Formula::Release(x, y) => {
				// p V q == (q && p) || (q && X (p V q))
				let rgt: Vec<ATrans> = self.build(y);
				let lft: Vec<ATrans> = self.build(x);
				let me: usize = self.labels.len();
				let mut t: Vec<ATrans> = Vec::new();
				for t1 in rgt.iter() {
					for t2 in lft.iter() {
						if let Some(merged) = t1.merge(t2) {
							t.push(merged);
						}
					}
					let mut looped: ATrans = t1.clone();
					looped.to.add(me);
					t.push(looped);
				}
				t
			},
			Formula::And(x, y) => {
				let lft: Vec<ATrans> = self.build(x);
				let rgt: Vec<ATrans> = self.build(y);
				let mut t: Vec<ATrans> = Vec::new();
				for t1 in lft.iter() {
					for t2 in rgt.iter() {
						if let Some(merged) = t1.merge(t2) {
							t.push(merged);
						}
					}
				}
				t
			},
			Formula::Or(x, y) => {
				let mut t: Vec<ATrans> = self.build(x);
				t.extend(self.build(y));
				t
			},
		};

		debug!("alternating state {} labeled {f}", self.labels.len());
		self.transitions.push(t.clone());
		self.labels.push(Some(f.clone()));
		t
	}

	/// Deletes inaccessible states and subsumed transitions, and counts
	/// what survives.
	fn simplify(&mut self) {
		let mut accessible: Bitset = Bitset::new(self.node_universe);
		for t in self.transitions[0].iter() {
			accessible.union_with(&t.to);
		}

		for i in (1..self.labels.len()).rev() {
			if !accessible.contains(i) {
				self.labels[i] = None;
				self.transitions[i].clear();
				continue;
			}
			self.state_count += 1;
			self.simplify_trans(i);
			for t in self.transitions[i].iter() {
				accessible.union_with(&t.to);
			}
		}
	}

	/// Drops every transition subsumed by another in the same list
	/// (weaker guard, fewer obligations).
	fn simplify_trans(&mut self, i: usize) {
		let trans: &[ATrans] = &self.transitions[i];
		let mut removed: Vec<bool> = vec![false; trans.len()];
		let mut kept: usize = 0;
		for t in 0..trans.len() {
			let subsumed: bool = (0..trans.len()).any(|t1| {
				t1 != t
					&& !removed[t1]
					&& trans[t1].to.is_subset(&trans[t].to)
					&& trans[t1].pos.is_subset(&trans[t].pos)
					&& trans[t1].neg.is_subset(&trans[t].neg)
			});
			if subsumed {
				removed[t] = true;
			} else {
				kept += 1;
			}
		}
		self.trans_count += kept;

		let mut keep = removed.iter().map(|r| !r);
		self.transitions[i].retain(|_| keep.next().unwrap());
	}
}

// Display of the alternating automaton
impl Alternating {
	pub fn print(&self, f: &mut impl io::Write, cexprs: &CexprTable) -> io::Result<()> {
		writeln!(f, "init :")?;
		for t in self.transitions[0].iter() {
			writeln!(f, "{}", t.to)?;
		}

		for i in (1..self.labels.len()).rev() {
			let Some(label) = &self.labels[i] else {
				continue;
			};
			writeln!(f, "state {i} : {label}")?;
			for t in self.transitions[i].iter() {
				if t.pos.is_empty() && t.neg.is_empty() {
					write!(f, "1")?;
				}
				self.print_sym_set(f, cexprs, &t.pos, false)?;
				if !t.pos.is_empty() && !t.neg.is_empty() {
					write!(f, " & ")?;
				}
				self.print_sym_set(f, cexprs, &t.neg, true)?;
				writeln!(f, " -> {}", t.to)?;
			}
		}
		Ok(())
	}

	fn print_sym_set(
		&self,
		f: &mut impl io::Write,
		cexprs: &CexprTable,
		set: &Bitset,
		negate: bool,
	) -> io::Result<()> {
		for (i, sym) in set.iter().enumerate() {
			if i > 0 {
				write!(f, " & ")?;
			}
			if negate {
				write!(f, "!")?;
			}
			let name: &str = &self.sym_table[sym];
			match cexprs.expr_for_symbol(name) {
				Some(expr) => write!(f, "{{{expr}}}")?,
				None => write!(f, "{name}")?,
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::formula::Symtab;
	use crate::formula::isequal;

	fn eventually(x: Rc<Formula>) -> Rc<Formula> {
		Formula::until(Formula::tru(), x)
	}

	fn always(x: Rc<Formula>) -> Rc<Formula> {
		Formula::release(Formula::fls(), x)
	}

	/// Live (non-pruned) temporal states.
	fn live_states(alt: &Alternating) -> Vec<usize> {
		(1..alt.state_ids()).filter(|&i| alt.label(i).is_some()).collect::<Vec<_>>()
	}

	#[test]
	fn eventually_p() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let alt: Alternating = Alternating::from_formula(&eventually(p.clone()), true);

		// One state, labeled F p, accepting.
		let live: Vec<usize> = live_states(&alt);
		assert_eq!(live.len(), 1);
		let me: usize = live[0];
		assert!(isequal(alt.label(me).unwrap(), &eventually(p)));
		assert!(alt.final_set.contains(me));

		// delta(F p) = { (p -> {}), (true -> {me}) } and the initial
		// transition enters me.
		let trans: &[ATrans] = &alt.transitions[me];
		assert_eq!(trans.len(), 2);
		assert!(trans.iter().any(|t| t.pos.contains(0) && t.to.is_empty()));
		assert!(trans.iter().any(|t| t.pos.is_empty() && t.to.contains(me)));
		assert_eq!(alt.transitions[0].len(), 1);
		assert!(alt.transitions[0][0].to.contains(me));
	}

	#[test]
	fn always_p() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let alt: Alternating = Alternating::from_formula(&always(p), true);

		let live: Vec<usize> = live_states(&alt);
		assert_eq!(live.len(), 1);
		let me: usize = live[0];
		// Not an Until state: no acceptance obligation.
		assert!(alt.final_set.is_empty());

		// Single transition: on p, stay.
		let trans: &[ATrans] = &alt.transitions[me];
		assert_eq!(trans.len(), 1);
		assert!(trans[0].pos.contains(0));
		assert!(trans[0].to.contains(me));
	}

	#[test]
	fn always_eventually_has_two_temporal_states() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let alt: Alternating = Alternating::from_formula(&always(eventually(p)), true);

		// G F p: exactly the states for G F p and F p survive.
		assert_eq!(live_states(&alt).len(), 2);
		assert_eq!(alt.final_set.list().len(), 1);
	}

	#[test]
	fn until_self_loop_carries_left_guard() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let q: Rc<Formula> = Formula::literal(symtab.lookup("q"), false);
		let alt: Alternating = Alternating::from_formula(&Formula::until(p, q), true);

		let live: Vec<usize> = live_states(&alt);
		assert_eq!(live.len(), 1);
		let me: usize = live[0];
		let p_id: usize = 1; // q is discovered first (right operand built first)
		let q_id: usize = 0;

		let trans: &[ATrans] = &alt.transitions[me];
		assert_eq!(trans.len(), 2);
		// q discharges, p loops.
		assert!(trans.iter().any(|t| t.pos.contains(q_id) && t.to.is_empty()));
		assert!(trans.iter().any(|t| t.pos.contains(p_id) && t.to.contains(me)));
	}

	#[test]
	fn next_of_conjunction_fans_out() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let q: Rc<Formula> = Formula::literal(symtab.lookup("q"), false);
		// X (p && F q): boolean recursion through the conjunction, one
		// plain state for p, one accepting state for F q.
		let f: Rc<Formula> = Formula::next(Formula::and(p, eventually(q)));
		let alt: Alternating = Alternating::from_formula(&f, true);

		let next_state: usize = (1..alt.state_ids())
			.find(|&i| alt.label(i).is_some_and(|l| matches!(**l, Formula::Next(..))))
			.unwrap();
		// The X state's transition is unguarded and targets both leaves.
		let trans: &[ATrans] = &alt.transitions[next_state];
		assert_eq!(trans.len(), 1);
		assert!(trans[0].pos.is_empty() && trans[0].neg.is_empty());
		assert_eq!(trans[0].to.count(), 2);
	}

	#[test]
	fn contradictory_merges_are_dropped() {
		let pos_p: ATrans = ATrans {
			pos: Bitset::singleton(2, 0),
			neg: Bitset::new(2),
			to: Bitset::new(4),
		};
		let neg_p: ATrans = ATrans {
			pos: Bitset::new(2),
			neg: Bitset::singleton(2, 0),
			to: Bitset::new(4),
		};
		// Requiring and forbidding the same predicate is unsatisfiable.
		assert!(pos_p.merge(&neg_p).is_none());
		assert!(pos_p.merge(&pos_p).is_some());
	}

	#[test]
	fn transition_subsumption() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let q: Rc<Formula> = Formula::literal(symtab.lookup("q"), false);
		// F p || (F p && q) without logic simplification: the stricter
		// initial branch is subsumed at the alternating level.
		let fp: Rc<Formula> = eventually(p);
		let f: Rc<Formula> = Formula::or(fp.clone(), Formula::and(fp, q));
		let alt: Alternating = Alternating::from_formula(&f, true);

		// State 0 is the initial fan-out and is not simplified.
		for (i, trans) in alt.transitions.iter().enumerate().skip(1) {
			for t in trans.iter() {
				for t1 in trans.iter() {
					let both: bool = std::ptr::eq(t, t1);
					assert!(
						both || !(t1.to.is_subset(&t.to)
							&& t1.pos.is_subset(&t.pos)
							&& t1.neg.is_subset(&t.neg)),
						"state {i} keeps a subsumed transition"
					);
				}
			}
		}
	}
}
