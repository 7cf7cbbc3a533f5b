/// Büchi automaton obtained from the generalized automaton by counter
/// degeneralization: a state is a generalized state paired with the index
/// of the next acceptance component it owes a visit to.
///
/// Based on Paul Gastin and Denis Oddoux. 2001. Fast LTL to Büchi automata
/// translation. CAV 2001, LNCS 2102.
use std::io;
use std::time::Instant;

use crate::Flags;
use crate::generalized::GRef;
use crate::generalized::Generalized;
use crate::set::Bitset;

/// Handle into [`Buchi::arena`]; stable across removals.
pub type BRef = usize;

#[derive(Debug)]
pub struct BState {
	/// Underlying generalized state; `None` only for the synthetic
	/// initial state.
	pub gstate: Option<GRef>,
	pub id: i32,
	/// Incoming count during construction; the SCC pass stores 1 for
	/// states on a cycle, -1 for trivial components, 0 for unreachable.
	pub incoming: i32,
	/// Acceptance counter in `[0, accept]`; `accept` is the accepting
	/// layer.
	pub final_layer: usize,
	/// `None` once the state has been removed.
	pub trans: Option<Vec<BTrans>>,
	/// Surviving equivalent state to retarget incoming transitions to.
	pub replacement: Option<BRef>,
}

#[derive(Debug, Clone)]
pub struct BTrans {
	pub pos: Bitset,
	pub neg: Bitset,
	pub to: BRef,
}

#[derive(Debug)]
pub struct Buchi {
	pub arena: Vec<BState>,
	/// Live states in insertion order; `solved[0]` is the initial state.
	pub solved: Vec<BRef>,
	/// Number of acceptance components; also the accepting layer index.
	pub accept: usize,
	pub sym_universe: usize,
	next_id: i32,
	pub state_count: usize,
	pub trans_count: usize,
}

impl Buchi {
	pub fn from_generalized(g: &Generalized, flags: &Flags) -> Self {
		let started: Instant = Instant::now();

		let mut b: Self = Self {
			arena: Vec::new(),
			solved: Vec::new(),
			accept: g.finals.len(),
			sym_universe: g.sym_universe,
			next_id: g.gstate_id,
			state_count: 0,
			trans_count: 0,
		};

		let mut stack: Vec<BRef> = Vec::new();
		let mut removed: Vec<BRef> = Vec::new();

		// The unique synthetic initial state.
		let init: BRef = b.new_state(None, -1, 0);
		b.arena[init].incoming = 1;
		b.solved.push(init);

		let mut dummy_count: usize = 0;
		for slot in g.init.iter().flatten() {
			let Some(trans) = g.arena[*slot].trans.as_ref() else {
				continue;
			};
			for t in trans.iter() {
				let fin: usize = b.next_final(g, &t.final_set, 0);
				let to: BRef = b.find_bstate(g, t.to, fin, init, &mut stack, &removed);
				b.add_btrans(flags, init, &t.pos, &t.neg, to, &mut dummy_count);
			}
		}

		while let Some(s) = stack.pop() {
			if b.arena[s].incoming == 0 {
				// Nothing references it anymore; drop it without leaving
				// it findable for deduplication.
				b.arena[s].trans = None;
				continue;
			}
			b.make_btrans(g, flags, s, &mut stack, &mut removed);
		}
		b.retarget_all(&mut removed);

		if flags.stats {
			eprintln!(
				"\nBuilding the Buchi automaton : {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{} states, {} transitions", b.state_count, b.trans_count);
		}

		if flags.verbose {
			eprintln!("\nBuchi automaton before simplification");
			let _ = b.print(&mut io::stderr());
			if b.is_empty() {
				eprintln!("empty automaton, refuses all words");
			}
		}

		if flags.simp_diff {
			b.simplify_btrans(flags);
			if flags.simp_scc {
				b.simplify_bscc(&mut removed);
			}
			while b.simplify_bstates(flags, &mut removed) > 0 {
				b.simplify_btrans(flags);
				if flags.simp_scc {
					b.simplify_bscc(&mut removed);
				}
			}

			if flags.verbose {
				eprintln!("\nBuchi automaton after simplification");
				let _ = b.print(&mut io::stderr());
				if b.is_empty() {
					eprintln!("empty automaton, refuses all words");
				}
				eprintln!();
			}
		}

		b
	}

	/// No live states at all (the initial state goes too once it has no
	/// way out).
	pub fn is_empty(&self) -> bool {
		self.solved.is_empty()
	}

	/// A single surviving state, the one that accepts every word.
	pub fn accepts_everything(&self) -> bool {
		self.solved.len() == 1 && self.arena[self.solved[0]].id == 0
	}

	pub fn is_accepting(&self, s: BRef) -> bool {
		let state: &BState = &self.arena[s];
		state.final_layer == self.accept || state.id == 0
	}

	fn new_state(&mut self, gstate: Option<GRef>, id: i32, final_layer: usize) -> BRef {
		self.arena.push(BState {
			gstate,
			id,
			incoming: 0,
			final_layer,
			trans: Some(Vec::new()),
			replacement: None,
		});
		self.arena.len() - 1
	}

	/// Advances the acceptance counter through the components the
	/// generalized transition discharges.
	fn next_final(&self, g: &Generalized, set: &Bitset, fin: usize) -> usize {
		let mut fin: usize = fin;
		while fin != self.accept && set.contains(g.finals[fin]) {
			fin += 1;
		}
		fin
	}

	/// Finds the state `(gstate, final_layer)`, searching the current
	/// state, the pending stack, the solved states and the removed
	/// states in that order; creates and schedules it when absent.
	fn find_bstate(
		&mut self,
		g: &Generalized,
		gstate: GRef,
		fin: usize,
		s: BRef,
		stack: &mut Vec<BRef>,
		removed: &[BRef],
	) -> BRef {
		let hit = |state: &BState| state.gstate == Some(gstate) && state.final_layer == fin;
		if hit(&self.arena[s]) {
			return s;
		}
		for &r in stack.iter() {
			if hit(&self.arena[r]) {
				return r;
			}
		}
		for &r in self.solved.iter() {
			if hit(&self.arena[r]) {
				return r;
			}
		}
		for &r in removed.iter() {
			if hit(&self.arena[r]) {
				return r;
			}
		}
		let r: BRef = self.new_state(Some(gstate), g.arena[gstate].id, fin);
		stack.push(r);
		r
	}

	/// Appends a transition with on-the-fly subsumption against the
	/// transitions already on the state.
	fn add_btrans(
		&mut self,
		flags: &Flags,
		s: BRef,
		pos: &Bitset,
		neg: &Bitset,
		to: BRef,
		state_trans: &mut usize,
	) {
		let mut dominated: bool = false;
		if flags.simp_fly {
			let existing: Vec<BTrans> = self.arena[s].trans.take().expect("state is being solved");
			let mut kept: Vec<BTrans> = Vec::with_capacity(existing.len());
			for t1 in existing.into_iter() {
				if dominated {
					kept.push(t1);
					continue;
				}
				if to == t1.to && pos.is_subset(&t1.pos) && neg.is_subset(&t1.neg) {
					// t1 is dominated by the new transition.
					self.arena[t1.to].incoming -= 1;
					*state_trans -= 1;
				} else {
					if t1.to == to && t1.pos.is_subset(pos) && t1.neg.is_subset(neg) {
						// The new transition is dominated.
						dominated = true;
					}
					kept.push(t1);
				}
			}
			self.arena[s].trans = Some(kept);
		}
		if !dominated {
			self.arena[to].incoming += 1;
			self.arena[s].trans.as_mut().unwrap().push(BTrans {
				pos: pos.clone(),
				neg: neg.clone(),
				to,
			});
			*state_trans += 1;
		}
	}

	fn make_btrans(&mut self, g: &Generalized, flags: &Flags, s: BRef, stack: &mut Vec<BRef>, removed: &mut Vec<BRef>) {
		let mut state_trans: usize = 0;

		let gref: GRef = self.arena[s].gstate.expect("only the initial state has no generalized state");
		let i0: usize = if self.arena[s].final_layer == self.accept {
			0
		} else {
			self.arena[s].final_layer
		};
		if let Some(gtrans) = g.arena[gref].trans.as_ref() {
			for t in gtrans.iter() {
				let fin: usize = self.next_final(g, &t.final_set, i0);
				let to: BRef = self.find_bstate(g, t.to, fin, s, stack, removed);
				self.add_btrans(flags, s, &t.pos, &t.neg, to, &mut state_trans);
			}
		}

		if flags.simp_fly {
			if self.arena[s].trans.as_ref().unwrap().is_empty() {
				self.arena[s].trans = None;
				removed.push(s);
				return;
			}
			let equivalent: Option<BRef> = self
				.solved
				.iter()
				.copied()
				.find(|&s1| self.all_btrans_match(s, s1));
			if let Some(s1) = equivalent {
				let targets: Vec<BRef> = self.arena[s]
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

		debug!("buchi state ({}, {}) solved", self.arena[s].id, self.arena[s].final_layer);
		self.solved.push(s);
		self.state_count += 1;
		self.trans_count += state_trans;
	}

	fn same_btrans(&self, s: &BTrans, t: &BTrans) -> bool {
		s.to == t.to && s.pos == t.pos && s.neg == t.neg
	}

	/// States are equivalent when both are accepting or both are not
	/// (ignored for trivial SCCs) and their transitions match pairwise.
	fn all_btrans_match(&self, a: BRef, b: BRef) -> bool {
		let sa: &BState = &self.arena[a];
		let sb: &BState = &self.arena[b];
		if (sa.final_layer == self.accept || sb.final_layer == self.accept)
			&& sa.final_layer + sb.final_layer != 2 * self.accept
			&& sa.incoming >= 0
			&& sb.incoming >= 0
		{
			return false;
		}

		let a_trans: &[BTrans] = sa.trans.as_deref().unwrap_or(&[]);
		let b_trans: &[BTrans] = sb.trans.as_deref().unwrap_or(&[]);
		a_trans
			.iter()
			.all(|s| b_trans.iter().any(|t| self.same_btrans(s, t)))
			&& b_trans
				.iter()
				.all(|t| a_trans.iter().any(|s| self.same_btrans(s, t)))
	}

	fn remove_bstate(&mut self, s: BRef, survivor: Option<BRef>, removed: &mut Vec<BRef>) {
		self.arena[s].trans = None;
		self.arena[s].replacement = survivor;
		removed.push(s);
	}

	fn live_replacement(&self, mut r: BRef) -> Option<BRef> {
		while self.arena[r].trans.is_none() {
			r = self.arena[r].replacement?;
		}
		Some(r)
	}

	fn retarget_all(&mut self, removed: &mut Vec<BRef>) {
		for idx in 0..self.solved.len() {
			let s: BRef = self.solved[idx];
			let Some(trans) = self.arena[s].trans.take() else {
				continue;
			};
			let retargeted: Vec<BTrans> = trans
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
		let arena: &Vec<BState> = &self.arena;
		self.solved.retain(|&s| arena[s].trans.is_some());
	}

	fn simplify_btrans(&mut self, flags: &Flags) -> usize {
		let started: Instant = Instant::now();
		let mut changed: usize = 0;

		for idx in 0..self.solved.len() {
			let s: BRef = self.solved[idx];
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
				"\nSimplification of the Buchi automaton - transitions: {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{changed} transitions removed");
		}

		changed
	}

	fn simplify_bstates(&mut self, flags: &Flags, removed: &mut Vec<BRef>) -> usize {
		let started: Instant = Instant::now();
		let mut changed: usize = 0;

		// Newest states first; merging then keeps the older state of an
		// equivalent pair, the synthetic initial state in particular.
		let snapshot: Vec<BRef> = self.solved.iter().rev().copied().collect::<Vec<_>>();
		for (idx, &a) in snapshot.iter().enumerate() {
			let Some(trans) = self.arena[a].trans.as_ref() else {
				continue;
			};
			if trans.is_empty() {
				self.remove_bstate(a, None, removed);
				changed += 1;
				continue;
			}
			let equivalent: Option<BRef> = snapshot[idx + 1..]
				.iter()
				.copied()
				.filter(|&b| self.arena[b].trans.is_some())
				.find(|&b| self.all_btrans_match(a, b));
			if let Some(b) = equivalent {
				if self.arena[b].incoming == -1 {
					// The survivor is in a trivial component; adopt the
					// acceptance status of the removed state.
					self.arena[b].final_layer = self.arena[a].final_layer;
				}
				self.remove_bstate(a, Some(b), removed);
				changed += 1;
			}
		}
		self.retarget_all(removed);

		// Merging can leave two states with equal (id, final) pairs,
		// which would collide in the emitted labels; give them fresh ids.
		// Fix from ltl3ba.
		let live: Vec<BRef> = self.solved.iter().rev().copied().collect::<Vec<_>>();
		for (idx, &s) in live.iter().enumerate() {
			let clash: bool = live[idx + 1..].iter().any(|&s2| {
				self.arena[s2].final_layer == self.arena[s].final_layer
					&& self.arena[s2].id == self.arena[s].id
			});
			if clash {
				self.next_id += 1;
				let fresh: i32 = self.next_id - 1;
				self.arena[s].id = fresh;
			}
		}

		if flags.stats {
			eprintln!(
				"\nSimplification of the Buchi automaton - states: {:.6}s",
				started.elapsed().as_secs_f64()
			);
			eprintln!("{changed} states removed");
		}

		changed
	}

	/// Removes states from which no cycle is reachable and marks states
	/// forming trivial (non-self-looping) components with `incoming = -1`.
	fn simplify_bscc(&mut self, removed: &mut Vec<BRef>) {
		if self.solved.is_empty() {
			return;
		}

		for &s in self.solved.iter() {
			self.arena[s].incoming = 0;
		}

		self.tarjan(self.solved[0]);

		let snapshot: Vec<BRef> = self.solved.clone();
		for &s in snapshot.iter() {
			if self.arena[s].trans.is_some() && self.arena[s].incoming == 0 {
				self.remove_bstate(s, None, removed);
			}
		}
	}

	/// Iterative Tarjan from the initial state; members of nontrivial
	/// components get `incoming = 1`, trivial ones `-1`.
	fn tarjan(&mut self, root: BRef) {
		let n: usize = self.arena.len();
		let mut index: Vec<usize> = vec![usize::MAX; n];
		let mut low: Vec<usize> = vec![0; n];
		let mut on_stack: Vec<bool> = vec![false; n];
		let mut stack: Vec<BRef> = Vec::new();
		let mut next_index: usize = 1;

		let mut call: Vec<(BRef, usize)> = vec![(root, 0)];
		index[root] = next_index;
		low[root] = next_index;
		next_index += 1;
		stack.push(root);
		on_stack[root] = true;

		while let Some(&(v, cursor)) = call.last() {
			let trans: &[BTrans] = self.arena[v].trans.as_deref().unwrap_or(&[]);
			if cursor < trans.len() {
				let w: BRef = trans[cursor].to;
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
					let mut members: Vec<BRef> = Vec::new();
					loop {
						let w: BRef = stack.pop().unwrap();
						on_stack[w] = false;
						members.push(w);
						if w == v {
							break;
						}
					}
					let trivial: bool = members.len() == 1 && {
						let only: BRef = members[0];
						!self.arena[only]
							.trans
							.as_deref()
							.unwrap_or(&[])
							.iter()
							.any(|t| t.to == only)
					};
					for &w in members.iter() {
						self.arena[w].incoming = if trivial { -1 } else { 1 };
					}
				}
			}
		}
	}
}

// Display of the Büchi automaton
impl Buchi {
	/// Debug-dump name: `init`, `accept_<id>`, or `T<layer>_<id>`.
	fn dump_name(&self, s: BRef) -> String {
		let state: &BState = &self.arena[s];
		if state.id == -1 {
			"init".to_owned()
		} else if state.final_layer == self.accept {
			format!("accept_{}", state.id)
		} else {
			format!("T{}_{}", state.final_layer, state.id)
		}
	}

	pub fn print(&self, f: &mut impl io::Write) -> io::Result<()> {
		for &s in self.solved.iter() {
			writeln!(f, "state {}", self.dump_name(s))?;
			for t in self.arena[s].trans.as_ref().unwrap().iter() {
				if t.pos.is_empty() && t.neg.is_empty() {
					write!(f, "1")?;
				}
				write!(f, "{}", t.pos)?;
				if !t.pos.is_empty() && !t.neg.is_empty() {
					write!(f, " & ")?;
				}
				write!(f, "{}", t.neg)?;
				writeln!(f, " -> {}", self.dump_name(t.to))?;
			}
		}
		Ok(())
	}
}
