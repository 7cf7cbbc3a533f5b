/// Transition-based generalized Büchi automaton, built on the fly as a
/// cross product over subsets of alternating states.
///
/// Based on Paul Gastin and Denis Oddoux. 2001. Fast LTL to Büchi automata
/// translation. CAV 2001, LNCS 2102.
use std::io;
use std::time::Instant;

use crate::Flags;
use crate::alternating::ATrans;
use crate::alternating::Alternating;
use crate::set::Bitset;

/// Handle into [`Generalized::arena`]; stable across removals.
pub type GRef = usize;

#[derive(Debug)]
pub struct GState {
	pub id: i32,
	/// Incoming-transition count while the state is being solved; the
	/// SCC pass re-uses it as the SCC id.
	pub incoming: i32,
	/// The set of alternating states this product state stands for.
	pub nodes_set: Bitset,
	/// `None` once the state has been removed.
	pub trans: Option<Vec<GTrans>>,
	/// Surviving equivalent state to retarget incoming transitions to.
	pub replacement: Option<GRef>,
}

#[derive(Debug, Clone)]
pub struct GTrans {
	pub pos: Bitset,
	pub neg: Bitset,
	pub to: GRef,
	/// Acceptance marks discharged by this transition, as a set of
	/// alternating Until-state ids.
	pub final_set: Bitset,
}

#[derive(Debug)]
pub struct Generalized {
	pub arena: Vec<GState>,
	/// Live solved states, in insertion order.
	pub solved: Vec<GRef>,
	pub init: Vec<Option<GRef>>,
	/// Ascending alternating Until-state ids: the acceptance components.
	pub finals: Vec<usize>,
	pub node_universe: usize,
	pub sym_universe: usize,
	pub gstate_id: i32,
	pub state_count: usize,
	pub trans_count: usize,
}

/// One column of the cross product: a chosen alternating state, a cursor
/// into its transition list, and the merged product of this column's
/// current transition with everything before it.
#[derive(Debug)]
struct Column {
	astate: usize,
	cursor: usize,
	prod: Option<ATrans>,
}

impl Generalized {
	pub fn from_alternating(alt: &Alternating, flags: &Flags) -> Self {
		let started: Instant = Instant::now();

		let mut g: Self = Self {
			arena: Vec::new(),
			solved: Vec::new(),
			init: Vec::new(),
			finals: alt.final_set.list(),
			node_universe: alt.node_universe,
			sym_universe: alt.sym_universe,
			gstate_id: 1,
			state_count: 0,
			trans_count: 0,
		};

		let mut stack: Vec<GRef> = Vec::new();
		let mut removed: Vec<GRef> = Vec::new();

		for t in alt.transitions[0].iter() {
			let s: GRef = g.new_state(t.to.clone());
			g.arena[s].incoming = 1;
			stack.push(s);
		}
		g.init = stack.iter().map(|&s| Some(s)).collect::<Vec<_>>();

		while let Some(s) = stack.pop() {
			if g.arena[s].incoming == 0 {
				// Nothing references it anymore; drop it without leaving
				// it findable for deduplication.
				g.arena[s].trans = None;
				continue;
			}
			g.make_gtrans(alt, flags, s, &mut stack, &mut removed);
		}
		g.retarget_all(&mut removed);

		if flags.stats {
			eprintln!(
				"\nBuilding the generalized Buchi automaton : {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{} states, {} transitions", g.state_count, g.trans_count);
		}

		if flags.verbose {
			eprintln!("\nGeneralized Buchi automaton before simplification");
			let _ = g.print(&mut io::stderr());
		}

		if flags.simp_diff {
			let mut bad_scc: Option<Bitset> = None;
			if flags.simp_scc {
				g.simplify_scc(alt, &mut bad_scc, &mut removed);
			}
			g.simplify_gtrans(flags, bad_scc.as_ref());
			if flags.simp_scc {
				g.simplify_scc(alt, &mut bad_scc, &mut removed);
			}
			while g.simplify_gstates(flags, bad_scc.as_ref(), &mut removed) > 0 {
				if flags.simp_scc {
					g.simplify_scc(alt, &mut bad_scc, &mut removed);
				}
				g.simplify_gtrans(flags, bad_scc.as_ref());
				if flags.simp_scc {
					g.simplify_scc(alt, &mut bad_scc, &mut removed);
				}
			}

			if flags.verbose {
				eprintln!("\nGeneralized Buchi automaton after simplification");
				let _ = g.print(&mut io::stderr());
			}
		}

		g
	}

	fn new_state(&mut self, nodes_set: Bitset) -> GRef {
		let id: i32 = if nodes_set.is_empty() {
			0
		} else {
			self.gstate_id += 1;
			self.gstate_id - 1
		};
		self.arena.push(GState {
			id,
			incoming: 0,
			nodes_set,
			trans: Some(Vec::new()),
			replacement: None,
		});
		self.arena.len() - 1
	}

	/// Finds the product state for `set`, searching the current state,
	/// the pending stack, the solved states and the removed states in
	/// that order; creates and schedules it when absent.
	fn find_gstate(&mut self, set: &Bitset, s: GRef, stack: &mut Vec<GRef>, removed: &[GRef]) -> GRef {
		if *set == self.arena[s].nodes_set {
			return s;
		}
		for &r in stack.iter() {
			if *set == self.arena[r].nodes_set {
				return r;
			}
		}
		for &r in self.solved.iter() {
			if *set == self.arena[r].nodes_set {
				return r;
			}
		}
		for &r in removed.iter() {
			if *set == self.arena[r].nodes_set {
				return r;
			}
		}
		let r: GRef = self.new_state(set.clone());
		stack.push(r);
		r
	}

	/// Is acceptance component `i` discharged on `at`, taken from a state
	/// with alternating set `from`?
	fn is_final(alt: &Alternating, from: &Bitset, at: &ATrans, i: usize, fj_to_fj: bool) -> bool {
		if (fj_to_fj && !at.to.contains(i)) || (!fj_to_fj && !from.contains(i)) {
			return true;
		}
		let mut to: Bitset = at.to.clone();
		to.remove(i);
		alt.transitions[i].iter().any(|t| {
			t.to.is_subset(&to) && t.pos.is_subset(&at.pos) && t.neg.is_subset(&at.neg)
		})
	}

	/// Computes all outgoing transitions of `s` by enumerating the cross
	/// product of the alternating transitions of its member states.
	fn make_gtrans(
		&mut self,
		alt: &Alternating,
		flags: &Flags,
		s: GRef,
		stack: &mut Vec<GRef>,
		removed: &mut Vec<GRef>,
	) {
		let empty_prod: ATrans = ATrans {
			pos: Bitset::new(self.sym_universe),
			neg: Bitset::new(self.sym_universe),
			to: Bitset::new(self.node_universe),
		};

		let list: Vec<usize> = self.arena[s].nodes_set.list();
		let mut trans_exist: bool = true;
		let mut cols: Vec<Column> = Vec::new();
		for &astate in list.iter() {
			let trans: &[ATrans] = &alt.transitions[astate];
			if trans.is_empty() {
				trans_exist = false;
			}
			let prod: Option<ATrans> = match cols.last() {
				Some(prev) => merged(prev.prod.as_ref(), trans.first()),
				None => merged(Some(&empty_prod), trans.first()),
			};
			cols.push(Column {
				astate,
				cursor: 0,
				prod,
			});
		}

		let mut state_trans: usize = 0;
		let mut fin: Bitset = Bitset::new(self.node_universe);

		while trans_exist {
			let t1: Option<ATrans> = if cols.is_empty() {
				Some(empty_prod.clone())
			} else {
				cols.last().unwrap().prod.clone()
			};

			if let Some(t1) = t1 {
				// Acceptance marks of this product transition.
				fin.clear();
				for &i in self.finals.iter() {
					if Self::is_final(alt, &self.arena[s].nodes_set, &t1, i, flags.fj_to_fj) {
						fin.add(i);
					}
				}

				let mut dominated: bool = false;
				if flags.simp_fly {
					let existing: Vec<GTrans> = self.arena[s].trans.take().expect("state is being solved");
					let mut kept: Vec<GTrans> = Vec::with_capacity(existing.len());
					for t2 in existing.into_iter() {
						if dominated {
							kept.push(t2);
							continue;
						}
						if t1.to.is_subset(&self.arena[t2.to].nodes_set)
							&& t1.pos.is_subset(&t2.pos)
							&& t1.neg.is_subset(&t2.neg)
							&& fin == t2.final_set
						{
							// t2 is dominated by the new transition.
							self.arena[t2.to].incoming -= 1;
							state_trans -= 1;
						} else {
							if self.arena[t2.to].nodes_set.is_subset(&t1.to)
								&& t2.pos.is_subset(&t1.pos)
								&& t2.neg.is_subset(&t1.neg)
								&& t2.final_set == fin
							{
								// The new transition is dominated.
								dominated = true;
							}
							kept.push(t2);
						}
					}
					self.arena[s].trans = Some(kept);
				}

				if !dominated {
					let to: GRef = self.find_gstate(&t1.to, s, stack, removed);
					self.arena[to].incoming += 1;
					self.arena[s].trans.as_mut().unwrap().push(GTrans {
						pos: t1.pos,
						neg: t1.neg,
						to,
						final_set: fin.clone(),
					});
					state_trans += 1;
				}
			}

			if cols.is_empty() {
				break;
			}
			// Advance the frontmost column that still has transitions;
			// all columns in front of it restart.
			let Some(k) = (0..cols.len())
				.rev()
				.find(|&k| cols[k].cursor + 1 < alt.transitions[cols[k].astate].len())
			else {
				break;
			};
			cols[k].cursor += 1;
			for k2 in k..cols.len() {
				if k2 > k {
					cols[k2].cursor = 0;
				}
				let t: Option<&ATrans> = alt.transitions[cols[k2].astate].get(cols[k2].cursor);
				let prev: Option<ATrans> = if k2 == 0 {
					merged(Some(&empty_prod), t)
				} else {
					merged(cols[k2 - 1].prod.as_ref(), t)
				};
				cols[k2].prod = prev;
			}
		}

		if flags.simp_fly {
			if self.arena[s].trans.as_ref().unwrap().is_empty() {
				// No way out: drop the state entirely.
				self.arena[s].trans = None;
				removed.push(s);
				return;
			}
			let equivalent: Option<GRef> = self
				.solved
				.iter()
				.copied()
				.find(|&s1| self.all_gtrans_match(s, s1, false, None));
			if let Some(s1) = equivalent {
				let targets: Vec<GRef> = self.arena[s]
					.trans
					.as_ref()
					.unwrap()
					.iter()
					.map(|t| t.to)
					.collect::<Vec<_>>();
				for r in targets {
					self.arena[r].incoming -= 1;
				}
				self.arena[s].trans = None;
				self.arena[s].replacement = Some(s1);
				removed.push(s);
				return;
			}
		}

		debug!("generalized state {} solved with {state_trans} transitions", self.arena[s].id);
		self.solved.push(s);
		self.state_count += 1;
		self.trans_count += state_trans;
	}

	fn same_gtrans(
		&self,
		a: GRef,
		s: &GTrans,
		b: GRef,
		t: &GTrans,
		use_scc: bool,
		bad_scc: Option<&Bitset>,
	) -> bool {
		if s.to != t.to || s.pos != t.pos || s.neg != t.neg {
			return false;
		}
		if s.final_set == t.final_set {
			return true;
		}
		// Acceptance may be ignored where no accepting run can pass.
		if use_scc {
			let bad = |scc: i32| bad_scc.is_some_and(|bad| bad.contains(scc as usize));
			if bad(self.arena[a].incoming)
				|| bad(self.arena[b].incoming)
				|| self.arena[a].incoming != self.arena[s.to].incoming
				|| self.arena[b].incoming != self.arena[t.to].incoming
			{
				return true;
			}
		}
		false
	}

	/// States are equivalent when their transition lists match pairwise.
	fn all_gtrans_match(&self, a: GRef, b: GRef, use_scc: bool, bad_scc: Option<&Bitset>) -> bool {
		let a_trans: &[GTrans] = self.arena[a].trans.as_deref().unwrap_or(&[]);
		let b_trans: &[GTrans] = self.arena[b].trans.as_deref().unwrap_or(&[]);
		a_trans
			.iter()
			.all(|s| b_trans.iter().any(|t| self.same_gtrans(a, s, b, t, use_scc, bad_scc)))
			&& b_trans
				.iter()
				.all(|t| a_trans.iter().any(|s| self.same_gtrans(a, s, b, t, use_scc, bad_scc)))
	}

	fn remove_gstate(&mut self, s: GRef, survivor: Option<GRef>, removed: &mut Vec<GRef>) {
		self.arena[s].trans = None;
		self.arena[s].replacement = survivor;
		removed.push(s);
	}

	/// Follows replacement chains to the surviving state, if any.
	fn live_replacement(&self, mut r: GRef) -> Option<GRef> {
		while self.arena[r].trans.is_none() {
			r = self.arena[r].replacement?;
		}
		Some(r)
	}

	/// Redirects every transition into a removed state to its
	/// replacement (dropping it when there is none), then forgets the
	/// removed states.
	fn retarget_all(&mut self, removed: &mut Vec<GRef>) {
		for i in 0..self.init.len() {
			if let Some(r) = self.init[i] {
				if self.arena[r].trans.is_none() {
					self.init[i] = self.live_replacement(r);
				}
			}
		}

		for idx in 0..self.solved.len() {
			let s: GRef = self.solved[idx];
			let Some(trans) = self.arena[s].trans.take() else {
				continue;
			};
			let retargeted: Vec<GTrans> = trans
				.into_iter()
				.filter_map(|mut t| {
					if self.arena[t.to].trans.is_none() && t.to != s {
						t.to = self.live_replacement(t.to)?;
					}
					Some(t)
				})
				.collect::<Vec<_>>();
			self.arena[s].trans = Some(retargeted);
		}

		removed.clear();
		let arena: &Vec<GState> = &self.arena;
		self.solved.retain(|&s| arena[s].trans.is_some());
	}

	/// Transition-level subsumption, optionally relaxed by the SCC
	/// analysis.
	fn simplify_gtrans(&mut self, flags: &Flags, bad_scc: Option<&Bitset>) -> usize {
		let started: Instant = Instant::now();
		let mut changed: usize = 0;

		for idx in 0..self.solved.len() {
			let s: GRef = self.solved[idx];
			let Some(trans) = self.arena[s].trans.as_ref() else {
				continue;
			};
			let mut removed_flags: Vec<bool> = vec![false; trans.len()];
			for t in 0..trans.len() {
				let redundant: bool = (0..trans.len()).any(|t1| {
					t1 != t
						&& !removed_flags[t1]
						&& trans[t1].to == trans[t].to
						&& trans[t1].pos.is_subset(&trans[t].pos)
						&& trans[t1].neg.is_subset(&trans[t].neg)
						&& (trans[t].final_set.is_subset(&trans[t1].final_set)
							|| (flags.simp_scc
								&& (self.arena[s].incoming != self.arena[trans[t].to].incoming
									|| bad_scc.is_some_and(|bad| {
										bad.contains(self.arena[s].incoming as usize)
									}))))
				});
				if redundant {
					removed_flags[t] = true;
					changed += 1;
				}
			}
			let mut keep = removed_flags.iter().map(|r| !r);
			self.arena[s]
				.trans
				.as_mut()
				.unwrap()
				.retain(|_| keep.next().unwrap());
		}

		if flags.stats {
			eprintln!(
				"\nSimplification of the generalized Buchi automaton - transitions: {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{changed} transitions removed");
		}

		changed
	}

	/// Merges equivalent states, then retargets.
	fn simplify_gstates(&mut self, flags: &Flags, bad_scc: Option<&Bitset>, removed: &mut Vec<GRef>) -> usize {
		let started: Instant = Instant::now();
		let mut changed: usize = 0;

		// Newest states first; merging then keeps the older state of an
		// equivalent pair, the initial states in particular.
		let snapshot: Vec<GRef> = self.solved.iter().rev().copied().collect::<Vec<_>>();
		for (idx, &a) in snapshot.iter().enumerate() {
			let Some(trans) = self.arena[a].trans.as_ref() else {
				continue;
			};
			if trans.is_empty() {
				self.remove_gstate(a, None, removed);
				changed += 1;
				continue;
			}
			let equivalent: Option<GRef> = snapshot[idx + 1..]
				.iter()
				.copied()
				.filter(|&b| self.arena[b].trans.is_some())
				.find(|&b| self.all_gtrans_match(a, b, flags.simp_scc, bad_scc));
			if let Some(b) = equivalent {
				// A non-trivial SCC would have made the match fail, so
				// the state from the later SCC is safe to drop.
				if self.arena[a].incoming > self.arena[b].incoming {
					self.remove_gstate(a, Some(b), removed);
				} else {
					self.remove_gstate(b, Some(a), removed);
				}
				changed += 1;
			}
		}
		self.retarget_all(removed);

		if flags.stats {
			eprintln!(
				"\nSimplification of the generalized Buchi automaton - states: {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{changed} states removed");
		}

		changed
	}

	/// Tarjan SCC pass: tags every state with its SCC id (via
	/// `incoming`), prunes unreachable states, and computes the set of
	/// "bad" SCCs missing at least one acceptance mark.
	fn simplify_scc(&mut self, alt: &Alternating, bad_scc: &mut Option<Bitset>, removed: &mut Vec<GRef>) {
		if self.solved.is_empty() {
			return;
		}

		for &s in self.solved.iter() {
			self.arena[s].incoming = 0;
		}

		let roots: Vec<GRef> = self.init.iter().flatten().copied().collect::<Vec<_>>();
		let scc_count: usize = self.tarjan(&roots);

		let mut scc_final: Vec<Bitset> = (0..scc_count)
			.map(|_| Bitset::new(self.node_universe))
			.collect::<Vec<_>>();

		let snapshot: Vec<GRef> = self.solved.clone();
		for &s in snapshot.iter() {
			if self.arena[s].trans.is_none() {
				continue;
			}
			if self.arena[s].incoming == 0 {
				self.remove_gstate(s, None, removed);
				continue;
			}
			let scc: usize = self.arena[s].incoming as usize;
			for t in self.arena[s].trans.as_ref().unwrap().iter() {
				if self.arena[t.to].incoming == self.arena[s].incoming {
					scc_final[scc].union_with(&t.final_set);
				}
			}
		}

		let mut bad: Bitset = Bitset::new(scc_count + 1);
		for (i, scc) in scc_final.iter().enumerate() {
			if !alt.final_set.is_subset(scc) {
				bad.add(i);
			}
		}
		*bad_scc = Some(bad);
	}

	/// Iterative Tarjan; SCC ids are assigned in completion order
	/// starting at 1 and stored in `incoming`.
	fn tarjan(&mut self, roots: &[GRef]) -> usize {
		let n: usize = self.arena.len();
		let mut index: Vec<usize> = vec![usize::MAX; n];
		let mut low: Vec<usize> = vec![0; n];
		let mut on_stack: Vec<bool> = vec![false; n];
		let mut stack: Vec<GRef> = Vec::new();
		let mut next_index: usize = 1;
		let mut next_scc: usize = 1;

		for &root in roots.iter() {
			if index[root] != usize::MAX || self.arena[root].trans.is_none() {
				continue;
			}
			let mut call: Vec<(GRef, usize)> = vec![(root, 0)];
			index[root] = next_index;
			low[root] = next_index;
			next_index += 1;
			stack.push(root);
			on_stack[root] = true;

			while let Some(&(v, cursor)) = call.last() {
				let trans: &[GTrans] = self.arena[v].trans.as_deref().unwrap_or(&[]);
				if cursor < trans.len() {
					let w: GRef = trans[cursor].to;
					call.last_mut().unwrap().1 += 1;
					if index[w] == usize::MAX {
						index[w] = next_index;
						low[w] = next_index;
						next_index += 1;
						stack.push(w);
						on_stack[w] = true;
						call.push((w, 0));
					} else if on_stack[w] {
						low[v] = low[v].min(index[w]);
					}
				} else {
					call.pop();
					if let Some(&(parent, _)) = call.last() {
						low[parent] = low[parent].min(low[v]);
					}
					if low[v] == index[v] {
						loop {
							let w: GRef = stack.pop().unwrap();
							on_stack[w] = false;
							self.arena[w].incoming = next_scc as i32;
							if w == v {
								break;
							}
						}
						next_scc += 1;
					}
				}
			}
		}

		next_scc
	}
}

// Display of the generalized Büchi automaton
impl Generalized {
	pub fn print(&self, f: &mut impl io::Write) -> io::Result<()> {
		writeln!(f, "init :")?;
		for slot in self.init.iter() {
			if let Some(r) = slot {
				writeln!(f, "{}", self.arena[*r].id)?;
			}
		}
		for &s in self.solved.iter() {
			let state: &GState = &self.arena[s];
			writeln!(f, "state {} ({}) : {}", state.id, state.nodes_set, state.incoming)?;
			for t in state.trans.as_ref().unwrap().iter() {
				if t.pos.is_empty() && t.neg.is_empty() {
					write!(f, "1")?;
				}
				write!(f, "{}", t.pos)?;
				if !t.pos.is_empty() && !t.neg.is_empty() {
					write!(f, " & ")?;
				}
				write!(f, "{}", t.neg)?;
				writeln!(f, " -> {} : {}", self.arena[t.to].id, t.final_set)?;
			}
		}
		Ok(())
	}
}

fn merged(prev: Option<&ATrans>, t: Option<&ATrans>) -> Option<ATrans> {
	match (prev, t) {
		(Some(a), Some(b)) => a.merge(b),
		_ => None,
	}
}
