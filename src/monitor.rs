/// Monitor synthesis: the C skeleton output and the acceptance analyses
/// backing its tables.
///
/// For every letter of the `2^P` alphabet the automaton is restricted to
/// that letter and closed transitively; states sitting on an accepting
/// cycle of the restriction stutter-accept the letter. The optimistic set
/// uses the union of all restrictions, the pessimistic one a set-of-sets
/// view of the transitions the environment can force.
use std::io;

use crate::buchi::BRef;
use crate::buchi::BTrans;
use crate::buchi::Buchi;
use crate::formula::CexprTable;
use crate::formula::Sym;
use crate::output::dot_name;
use crate::set::Bitset;

#[derive(Debug)]
pub struct Monitor {
	/// Dense state numbering in solved order, indexed by arena handle.
	labels: Vec<usize>,
	state_count: usize,
	sym_id: usize,
	/// Per letter (valuation index), the states lying on an accepting
	/// cycle under that letter alone.
	stutter_accept: Vec<Bitset>,
	/// States from which some word still reaches an accepting cycle.
	optimistic_accept: Bitset,
	/// States from which every word stays within reach of an accepting
	/// cycle.
	pessimistic_accept: Bitset,
}

impl Monitor {
	pub fn label(&self, s: BRef) -> usize {
		self.labels[s]
	}

	pub fn state_count(&self) -> usize {
		self.state_count
	}

	pub fn stutter_accept(&self) -> &[Bitset] {
		&self.stutter_accept
	}

	pub fn optimistic_accept(&self) -> &Bitset {
		&self.optimistic_accept
	}

	pub fn pessimistic_accept(&self) -> &Bitset {
		&self.pessimistic_accept
	}
}

/// Advances the valuation to the next subset of the `sym_id` predicates,
/// in binary counting order; false once all subsets have been visited.
fn increment_symbol_set(a: &mut Bitset, sym_id: usize) -> bool {
	let Some(i) = (0..sym_id).find(|&i| !a.contains(i)) else {
		return false;
	};
	for j in 0..i {
		a.remove(j);
	}
	a.add(i);
	true
}

/// Does the transition fire while reading the valuation?
fn enabled(t: &BTrans, a: &Bitset) -> bool {
	t.pos.is_subset(a) && !t.neg.intersects(a)
}

/// Boolean transitive closure: `reach <- reach * reach + reach` to a
/// fixed point.
fn reachability(m: &[bool], rows: usize) -> Vec<bool> {
	let mut m1: Vec<bool> = m.to_vec();
	loop {
		let mut m2: Vec<bool> = vec![false; rows * rows];
		let mut going: bool = false;
		for r in 0..rows {
			for c in 0..rows {
				m2[r * rows + c] =
					m1[r * rows + c] || (0..rows).any(|i| m1[r * rows + i] && m1[i * rows + c]);
				going |= m2[r * rows + c] != m1[r * rows + c];
			}
		}
		m1 = m2;
		if !going {
			return m1;
		}
	}
}

/// States reachable through every forced choice: the environment picks a
/// set from the list, the automaton picks a member.
fn pess_reach(tr: &[Vec<Bitset>], st: usize, depth: usize, state_count: usize) -> Bitset {
	pess_sets(tr, &tr[st], depth, state_count)
}

fn pess_sets(tr: &[Vec<Bitset>], sl: &[Bitset], depth: usize, state_count: usize) -> Bitset {
	// Pessimistically intersect over the forced sets.
	let mut reach: Bitset = Bitset::new(state_count);
	for i in 0..state_count {
		reach.add(i);
	}
	for set in sl.iter() {
		reach = reach.intersection(&pess_members(tr, set, depth, state_count));
	}
	reach
}

fn pess_members(tr: &[Vec<Bitset>], s: &Bitset, depth: usize, state_count: usize) -> Bitset {
	// Optimistically unite over the members of one forced set.
	let mut reach: Bitset = Bitset::new(state_count);
	for i in s.iter() {
		if depth - 1 == 0 {
			reach.add(i);
		} else {
			reach.union_with(&pess_sets(tr, &tr[i], depth - 1, state_count));
		}
	}
	reach
}

fn write_sym_valuation(
	f: &mut impl io::Write,
	sym_table: &[Sym],
	cexprs: &CexprTable,
	a: &Bitset,
) -> io::Result<()> {
	for (i, sym) in sym_table.iter().enumerate() {
		if i > 0 {
			write!(f, "&")?;
		}
		if !a.contains(i) {
			write!(f, "!")?;
		}
		match cexprs.expr_for_symbol(sym) {
			Some(expr) => write!(f, "{{{expr}}}")?,
			None => write!(f, "{sym}")?,
		}
	}
	writeln!(f)
}

fn write_matrix(f: &mut impl io::Write, m: &[bool], rows: usize) -> io::Result<()> {
	for r in 0..rows {
		for c in 0..rows {
			write!(f, "{}\t", if m[r * rows + c] { 1 } else { 0 })?;
		}
		writeln!(f)?;
	}
	Ok(())
}

/// Accepting states under a closed transition relation: first the states
/// on an accepting cycle (diagonal), then everything reaching them.
fn accepting_under(b: &Buchi, labels: &[usize], reach: &[bool], state_count: usize) -> (Bitset, Bitset) {
	let mut cycles: Bitset = Bitset::new(state_count);
	for &s in b.solved.iter() {
		let label: usize = labels[s];
		if b.is_accepting(s) && reach[label * state_count + label] {
			cycles.add(label);
		}
	}
	let mut states: Bitset = Bitset::new(state_count);
	for r in 0..state_count {
		for c in 0..state_count {
			if reach[r * state_count + c] && cycles.contains(c) {
				states.add(r);
			}
		}
	}
	(cycles, states)
}

/// Computes the three acceptance analyses, dumping the intermediate
/// matrices along the way (the dump lands in the `#if 0` block of the C
/// output).
pub fn print_behaviours(
	f: &mut impl io::Write,
	b: &mut Buchi,
	sym_table: &[Sym],
	cexprs: &CexprTable,
) -> io::Result<Monitor> {
	// The all-accepting state's unguarded self-loop must be explicit for
	// the per-letter matrices.
	for idx in 0..b.solved.len() {
		let s: BRef = b.solved[idx];
		if b.arena[s].id != 0 {
			continue;
		}
		let has_loop: bool = b.arena[s]
			.trans
			.as_deref()
			.unwrap()
			.iter()
			.any(|t| t.to == s && t.pos.is_empty() && t.neg.is_empty());
		if !has_loop {
			let pos: Bitset = Bitset::new(b.sym_universe);
			let neg: Bitset = Bitset::new(b.sym_universe);
			b.arena[s].trans.as_mut().unwrap().push(BTrans { pos, neg, to: s });
		}
	}

	let mut labels: Vec<usize> = vec![0; b.arena.len()];
	for (k, &s) in b.solved.iter().enumerate() {
		labels[s] = k;
	}
	let state_count: usize = b.solved.len();
	let sym_id: usize = sym_table.len();

	writeln!(f, "States:")?;
	writeln!(f, "label\tid\tfinal")?;
	for &s in b.solved.iter() {
		writeln!(f, "{}\t{}\t{}", labels[s], dot_name(b, s), u8::from(b.is_accepting(s)))?;
	}

	writeln!(f, "\nSymbol table:")?;
	writeln!(f, "id\tsymbol\t\t\tcexpr")?;
	for (i, sym) in sym_table.iter().enumerate() {
		match cexprs.expr_for_symbol(sym) {
			Some(expr) => writeln!(f, "{i}\t{sym}\t{{ {expr} }}")?,
			None => writeln!(f, "{i}\t{sym}")?,
		}
	}

	let mut optimistic_matrix: Vec<bool> = vec![false; state_count * state_count];
	let mut pessimistic_transition: Vec<Vec<Bitset>> = (0..state_count)
		.map(|_| {
			let mut full: Bitset = Bitset::new(state_count);
			for i in 0..state_count {
				full.add(i);
			}
			vec![full]
		})
		.collect::<Vec<_>>();
	let mut stutter_accept: Vec<Bitset> = Vec::new();

	writeln!(f, "\nStuttering:")?;
	let mut a: Bitset = Bitset::new(b.sym_universe);
	loop {
		writeln!(f)?;
		write_sym_valuation(f, sym_table, cexprs, &a)?;

		let mut matrix: Vec<bool> = vec![false; state_count * state_count];
		for &s in b.solved.iter() {
			let mut working: Bitset = Bitset::new(state_count);
			for t in b.arena[s].trans.as_deref().unwrap().iter() {
				if enabled(t, &a) {
					working.add(labels[t.to]);
					matrix[labels[s] * state_count + labels[t.to]] = true;
					optimistic_matrix[labels[s] * state_count + labels[t.to]] = true;
				}
			}

			// The environment forces the automaton into `working`; keep
			// the list of minimal forced sets.
			let sets: &mut Vec<Bitset> = &mut pessimistic_transition[labels[s]];
			let mut add: bool = true;
			for set in sets.iter_mut() {
				if working.is_subset(set) {
					*set = working.clone();
					add = false;
				} else if set.is_subset(&working) {
					add = false;
				}
			}
			if add {
				sets.push(working.clone());
			}
			let mut seen: Vec<Bitset> = Vec::new();
			sets.retain(|set| {
				if seen.contains(set) {
					false
				} else {
					seen.push(set.clone());
					true
				}
			});
		}

		writeln!(f, "Transitions:")?;
		write_matrix(f, &matrix, state_count)?;
		writeln!(f)?;

		let reach: Vec<bool> = reachability(&matrix, state_count);
		writeln!(f, "Reachability:")?;
		write_matrix(f, &reach, state_count)?;
		writeln!(f)?;

		let (cycles, states): (Bitset, Bitset) = accepting_under(b, &labels, &reach, state_count);
		writeln!(f, "Accepting cycles: {cycles}")?;
		writeln!(f, "Accepting states: {states}")?;
		stutter_accept.push(states);

		if !increment_symbol_set(&mut a, sym_id) {
			break;
		}
	}

	writeln!(f, "\n\nOptimistic transitions:")?;
	write_matrix(f, &optimistic_matrix, state_count)?;
	let optimistic_reach: Vec<bool> = reachability(&optimistic_matrix, state_count);
	writeln!(f, "Optimistic reachability:")?;
	write_matrix(f, &optimistic_reach, state_count)?;
	let (cycles, optimistic_accept): (Bitset, Bitset) =
		accepting_under(b, &labels, &optimistic_reach, state_count);
	writeln!(f, "\nAccepting optimistic cycles: {cycles}")?;
	writeln!(f, "Accepting optimistic states: {optimistic_accept}")?;

	writeln!(f, "\n\nPessimistic transitions:")?;
	for i in 0..state_count {
		write!(f, "{i:2}: ")?;
		for set in pessimistic_transition[i].iter() {
			write!(f, "{set}")?;
		}
		writeln!(f)?;
	}

	writeln!(f, "\n\nPessimistic reachable:")?;
	let mut pessimistic_reachable: Vec<Bitset> = Vec::new();
	for i in 0..state_count {
		let reach: Bitset = pess_reach(&pessimistic_transition, i, state_count, state_count);
		write!(f, "{i:2}: ")?;
		writeln!(f, "{reach}")?;
		pessimistic_reachable.push(reach);
	}

	let mut pessimistic_cycles: Bitset = Bitset::new(state_count);
	for &s in b.solved.iter() {
		if b.is_accepting(s) && pessimistic_reachable[labels[s]].contains(labels[s]) {
			pessimistic_cycles.add(labels[s]);
		}
	}
	writeln!(f, "\nAccepting pessimistic cycles: {pessimistic_cycles}")?;
	let mut pessimistic_accept: Bitset = Bitset::new(state_count);
	for &s in b.solved.iter() {
		if pessimistic_reachable[labels[s]].intersects(&pessimistic_cycles) {
			pessimistic_accept.add(labels[s]);
		}
	}
	writeln!(f, "Accepting pessimistic states: {pessimistic_accept}")?;

	Ok(Monitor {
		labels,
		state_count,
		sym_id,
		stutter_accept,
		optimistic_accept,
		pessimistic_accept,
	})
}

/// Guard of one monitor step: the transition's guard, ORed with every
/// later transition into the same target.
fn write_transition_guard(
	f: &mut impl io::Write,
	b: &Buchi,
	trans: &[BTrans],
	i: usize,
	sym_table: &[Sym],
) -> io::Result<()> {
	write_spin_guard(f, sym_table, &trans[i].pos, &trans[i].neg)?;
	for t1 in trans[i + 1..].iter() {
		if b.arena[t1.to].id == b.arena[trans[i].to].id
			&& b.arena[t1.to].final_layer == b.arena[trans[i].to].final_layer
		{
			write!(f, ") || (")?;
			write_spin_guard(f, sym_table, &t1.pos, &t1.neg)?;
		}
	}
	Ok(())
}

fn write_spin_guard(f: &mut impl io::Write, sym_table: &[Sym], pos: &Bitset, neg: &Bitset) -> io::Result<()> {
	let mut first: bool = true;
	for i in pos.iter() {
		if !first {
			write!(f, " && ")?;
		}
		write!(f, "{}", sym_table[i])?;
		first = false;
	}
	for i in neg.iter() {
		if !first {
			write!(f, " && ")?;
		}
		write!(f, "!{}", sym_table[i])?;
		first = false;
	}
	if first {
		write!(f, "1")?;
	}
	Ok(())
}

/// Emits the C monitor skeleton.
pub fn print_c(
	f: &mut impl io::Write,
	b: &mut Buchi,
	sym_table: &[Sym],
	cexprs: &CexprTable,
	prefix: &str,
	uform: &str,
) -> io::Result<()> {
	if b.is_empty() {
		writeln!(f, "#error Empty Buchi automaton")?;
		return Ok(());
	}
	if b.accepts_everything() {
		writeln!(f, "#error Always-true Buchi automaton")?;
		return Ok(());
	}

	writeln!(f, "#if 0")?;
	writeln!(f, "/* Precomputed transition data */")?;
	let monitor: Monitor = print_behaviours(f, b, sym_table, cexprs)?;
	writeln!(f, "#endif")?;

	print_c_headers(f, cexprs, prefix)?;
	print_enum_decl(f, b, &monitor, prefix)?;
	print_buchi_statevars(f, prefix, monitor.state_count)?;
	print_fsm_func_opener(f, uform)?;
	print_c_buchi_body(f, b, &monitor, sym_table, prefix)?;
	print_c_buchi_body_tail(f)?;
	print_c_buchi_util_funcs(f)?;
	print_c_accept_tables(f, &monitor, sym_table, prefix)?;
	print_c_epilog(f, prefix)?;
	Ok(())
}

fn print_c_headers(f: &mut impl io::Write, cexprs: &CexprTable, prefix: &str) -> io::Result<()> {
	writeln!(f, "#include <pthread.h>")?;
	writeln!(f, "#include <stdbool.h>")?;
	writeln!(f, "#include <stdint.h>")?;
	writeln!(f)?;
	writeln!(f, "void __ESBMC_switch_to_monitor(void);")?;
	writeln!(f, "void __ESBMC_switch_from_monitor(void);")?;
	writeln!(f, "void __ESBMC_register_monitor(pthread_t t);")?;
	writeln!(f, "void __ESBMC_really_atomic_begin();")?;
	writeln!(f, "void __ESBMC_really_atomic_end();")?;
	writeln!(f, "void __ESBMC_atomic_begin();")?;
	writeln!(f, "void __ESBMC_atomic_end();")?;
	writeln!(f, "void __ESBMC_assume(bool prop);")?;
	writeln!(f, "void __ESBMC_kill_monitor();")?;
	writeln!(f, "int nondet_uint();")?;
	writeln!(f)?;

	for (i, expr) in cexprs.exprs().iter().enumerate() {
		writeln!(f, "char __ESBMC_property__ltl2ba_cexpr_{i}[] = \"{expr}\";")?;
		writeln!(f, "int {prefix}_cexpr_{i}_status;")?;
	}
	Ok(())
}

fn print_enum_decl(f: &mut impl io::Write, b: &Buchi, monitor: &Monitor, prefix: &str) -> io::Result<()> {
	writeln!(f, "\ntypedef enum {{")?;
	for &s in b.solved.iter() {
		writeln!(f, "\t{prefix}_state_{},", monitor.label(s))?;
	}
	writeln!(f, "}} {prefix}_state;\n")?;
	Ok(())
}

fn print_buchi_statevars(f: &mut impl io::Write, prefix: &str, num_states: usize) -> io::Result<()> {
	writeln!(f, "{prefix}_state {prefix}_statevar = {prefix}_state_0;\n")?;
	writeln!(f, "unsigned int {prefix}_visited_states[{num_states}];\n")?;
	Ok(())
}

fn print_fsm_func_opener(f: &mut impl io::Write, uform: &str) -> io::Result<()> {
	writeln!(f, "void\nltl2ba_fsm(bool state_stats, unsigned int num_iters)\n{{")?;
	writeln!(f, "\tunsigned int choice;")?;
	writeln!(f, "\tunsigned int iters;")?;
	writeln!(f, "\t_Bool state_is_viable;\n")?;
	writeln!(f, "\t/* Original formula:\n\t * {uform}\n\t */\n")?;
	writeln!(f, "\tfor (iters = 0; iters < num_iters; iters++) {{")?;
	Ok(())
}

fn print_c_buchi_body(
	f: &mut impl io::Write,
	b: &Buchi,
	monitor: &Monitor,
	sym_table: &[Sym],
	prefix: &str,
) -> io::Result<()> {
	writeln!(f, "\t\tchoice = nondet_uint();\n")?;
	writeln!(f, "\t\t__ESBMC_atomic_begin();\n")?;
	writeln!(f, "\t\tswitch({prefix}_statevar) {{")?;

	for &s in b.solved.iter() {
		writeln!(f, "\t\tcase {prefix}_state_{}:", monitor.label(s))?;

		let trans: &[BTrans] = b.arena[s].trans.as_deref().unwrap();
		write!(f, "\t\t\tstate_is_viable = (((")?;
		for i in 0..trans.len() {
			write_transition_guard(f, b, trans, i, sym_table)?;
			write!(f, ")) || ((")?;
		}
		writeln!(f, "false)));")?;

		write!(f, "\t\t\t")?;
		for (choice, _) in trans.iter().enumerate() {
			writeln!(f, "if (choice == {choice}) {{")?;
			write!(f, "\t\t\t\t__ESBMC_assume(((")?;
			write_transition_guard(f, b, trans, choice, sym_table)?;
			writeln!(f, ")));")?;
			writeln!(
				f,
				"\t\t\t\t{prefix}_statevar = {prefix}_state_{};",
				monitor.label(trans[choice].to)
			)?;
			write!(f, "\t\t\t}} else ")?;
		}
		writeln!(f, "{{")?;
		writeln!(f, "\t\t\t\t__ESBMC_assume(0);")?;
		writeln!(f, "\t\t\t}}")?;
		writeln!(f, "\t\t\tbreak;")?;
	}

	writeln!(f, "\t\t}}")?;
	writeln!(f, "\t\tif (state_stats)")?;
	writeln!(f, "\t\t\t{prefix}_visited_states[{prefix}_statevar]++;\n")?;
	writeln!(f, "\t\t__ESBMC_really_atomic_end();")?;
	Ok(())
}

fn print_c_buchi_body_tail(f: &mut impl io::Write) -> io::Result<()> {
	writeln!(f, "\t\t__ESBMC_switch_from_monitor();")?;
	writeln!(f, "\t}}\n")?;
	writeln!(
		f,
		"\t__ESBMC_assert(num_iters == iters, \"Unwind bound on ltl2ba_fsm insufficient\");\n"
	)?;
	writeln!(f, "\treturn;\n}}\n")?;
	Ok(())
}

fn print_c_buchi_util_funcs(f: &mut impl io::Write) -> io::Result<()> {
	writeln!(f, "#ifndef LTL_PREFIX_BOUND")?;
	writeln!(f, "#define LTL_PREFIX_BOUND 2147483648")?;
	writeln!(f, "#endif\n")?;
	writeln!(f, "#define max(x,y) ((x) < (y) ? (y) : (x))\n")?;
	writeln!(f, "int\nltl2ba_thread(int *dummy)\n{{\n")?;
	writeln!(f, "\tltl2ba_fsm(false, LTL_PREFIX_BOUND);\n\treturn 0;\n}}\n")?;
	writeln!(f, "pthread_t\nltl2ba_start_monitor(void)\n{{")?;
	writeln!(f, "\tpthread_t t;\n")?;
	writeln!(f, "\t__ESBMC_really_atomic_begin();")?;
	writeln!(f, "\tpthread_create(&t, NULL, ltl2ba_thread, NULL);")?;
	writeln!(f, "\t__ESBMC_register_monitor(t);")?;
	writeln!(f, "\t__ESBMC_atomic_end();")?;
	writeln!(f, "\t__ESBMC_switch_to_monitor();")?;
	writeln!(f, "\treturn t;\n}}\n")?;
	Ok(())
}

fn print_c_accept_tables(
	f: &mut impl io::Write,
	monitor: &Monitor,
	sym_table: &[Sym],
	prefix: &str,
) -> io::Result<()> {
	let num_states: usize = monitor.state_count;
	let num_sym_combs: usize = 1 << monitor.sym_id;

	writeln!(
		f,
		"_Bool {prefix}_stutter_accept_table[{num_sym_combs}][{num_states}] = {{"
	)?;
	for sym_comb in 0..num_sym_combs {
		write!(f, "{{\n  ")?;
		for state in 0..num_states {
			if monitor.stutter_accept[sym_comb].contains(state) {
				write!(f, "true, ")?;
			} else {
				write!(f, "false, ")?;
			}
		}
		writeln!(f, "\n}},")?;
	}
	writeln!(f, "}};\n")?;

	writeln!(f, "_Bool {prefix}_good_prefix_excluded_states[{num_states}] = {{")?;
	for state in 0..num_states {
		if monitor.optimistic_accept.contains(state) {
			write!(f, "true, ")?;
		} else {
			write!(f, "false, ")?;
		}
	}
	writeln!(f, "\n}};\n")?;

	writeln!(f, "_Bool {prefix}_bad_prefix_states[{num_states}] = {{")?;
	for state in 0..num_states {
		if monitor.pessimistic_accept.contains(state) {
			write!(f, "true, ")?;
		} else {
			write!(f, "false, ")?;
		}
	}
	writeln!(f, "\n}};\n")?;

	writeln!(f, "unsigned int\n{prefix}_sym_to_idx(void)\n{{")?;
	writeln!(f, "\tunsigned int idx = 0;")?;
	for (i, sym) in sym_table.iter().enumerate() {
		writeln!(f, "\tidx |= ({sym}) ? {} : 0;", 1usize << i)?;
	}
	writeln!(f, "\treturn idx;\n}}\n")?;
	Ok(())
}

fn print_c_epilog(f: &mut impl io::Write, prefix: &str) -> io::Result<()> {
	writeln!(f, "void\nltl2ba_finish_monitor(pthread_t t)\n{{")?;
	writeln!(f, "\n\t__ESBMC_kill_monitor();\n")?;
	writeln!(
		f,
		"\t__ESBMC_assert(!{prefix}_bad_prefix_states[{prefix}_statevar],\"LTL_BAD\");\n"
	)?;
	writeln!(
		f,
		"\t__ESBMC_assert(!{prefix}_stutter_accept_table[{prefix}_sym_to_idx()][{prefix}_statevar],\"LTL_FAILING\");\n"
	)?;
	writeln!(
		f,
		"\t__ESBMC_assert(!{prefix}_good_prefix_excluded_states[{prefix}_statevar],\"LTL_SUCCEEDING\");\n"
	)?;
	writeln!(f, "\treturn;\n}}")?;
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::Flags;
	use crate::alternating::Alternating;
	use crate::formula::Formula;
	use crate::formula::Symtab;
	use crate::generalized::Generalized;
	use std::rc::Rc;

	struct Translated {
		buchi: Buchi,
		sym_table: Vec<Sym>,
	}

	fn translated(f: &Rc<Formula>) -> Translated {
		let flags: Flags = Flags::default();
		let alt: Alternating = Alternating::from_formula(f, true);
		let g: Generalized = Generalized::from_alternating(&alt, &flags);
		let buchi: Buchi = Buchi::from_generalized(&g, &flags);
		Translated {
			buchi,
			sym_table: alt.sym_table,
		}
	}

	fn analysis(f: &Rc<Formula>) -> (Translated, Monitor) {
		let mut t: Translated = translated(f);
		let mut sink: Vec<u8> = Vec::new();
		let monitor: Monitor =
			print_behaviours(&mut sink, &mut t.buchi, &t.sym_table, &CexprTable::new()).unwrap();
		(t, monitor)
	}

	fn eventually(x: Rc<Formula>) -> Rc<Formula> {
		Formula::until(Formula::tru(), x)
	}

	fn always(x: Rc<Formula>) -> Rc<Formula> {
		Formula::release(Formula::fls(), x)
	}

	#[test]
	fn symbol_set_enumeration() {
		let mut a: Bitset = Bitset::new(3);
		let mut seen: Vec<Vec<usize>> = vec![a.list()];
		while increment_symbol_set(&mut a, 3) {
			seen.push(a.list());
		}
		// Binary counting order over all subsets of three predicates.
		assert_eq!(seen.len(), 8);
		assert_eq!(seen[0], Vec::<usize>::new());
		assert_eq!(seen[1], vec![0]);
		assert_eq!(seen[2], vec![1]);
		assert_eq!(seen[3], vec![0, 1]);
		assert_eq!(seen[7], vec![0, 1, 2]);
	}

	#[test]
	fn closure_reaches_transitively() {
		// 0 -> 1 -> 2, no cycles.
		let mut m: Vec<bool> = vec![false; 9];
		m[0 * 3 + 1] = true;
		m[1 * 3 + 2] = true;
		let reach: Vec<bool> = reachability(&m, 3);
		assert!(reach[0 * 3 + 2]);
		assert!(!reach[2 * 3 + 0]);
		assert!(!reach[0 * 3 + 0]);
	}

	#[test]
	fn eventually_p_stutter_table() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let (t, monitor): (Translated, Monitor) = analysis(&eventually(p));

		// Letter {} (no p): only the accept-all state stutter-accepts;
		// letter {p}: the waiting state escapes into it, so both do.
		let all_label: usize = t
			.buchi
			.solved
			.iter()
			.copied()
			.find(|&s| t.buchi.arena[s].id == 0)
			.map(|s| monitor.label(s))
			.unwrap();
		let init_label: usize = t
			.buchi
			.solved
			.iter()
			.copied()
			.find(|&s| t.buchi.arena[s].id == -1)
			.map(|s| monitor.label(s))
			.unwrap();

		assert!(monitor.stutter_accept()[0].contains(all_label));
		assert!(!monitor.stutter_accept()[0].contains(init_label));
		assert!(monitor.stutter_accept()[1].contains(all_label));
		assert!(monitor.stutter_accept()[1].contains(init_label));

		// Optimistically every state can still succeed; pessimistically
		// only the accept-all state is safe.
		assert!(monitor.optimistic_accept().contains(init_label));
		assert!(monitor.optimistic_accept().contains(all_label));
		assert!(monitor.pessimistic_accept().contains(all_label));
		assert!(!monitor.pessimistic_accept().contains(init_label));
	}

	#[test]
	fn always_p_pessimistic() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let (t, monitor): (Translated, Monitor) = analysis(&always(p));

		assert_eq!(monitor.state_count(), 1);
		let label: usize = monitor.label(t.buchi.solved[0]);
		// Under p the single state loops acceptingly; under !p it blocks.
		assert!(monitor.stutter_accept()[1].contains(label));
		assert!(!monitor.stutter_accept()[0].contains(label));
		// Some continuation accepts, but not all of them.
		assert!(monitor.optimistic_accept().contains(label));
		assert!(!monitor.pessimistic_accept().contains(label));
	}

	#[test]
	fn c_monitor_shape() {
		let mut symtab: Symtab = Symtab::new();
		let not_p: Rc<Formula> = Formula::literal(symtab.lookup("p"), true);
		let q: Rc<Formula> = Formula::literal(symtab.lookup("q"), false);
		// [] (p -> <> q)
		let mut t: Translated = translated(&always(Formula::or(not_p, eventually(q))));

		let mut out: Vec<u8> = Vec::new();
		print_c(
			&mut out,
			&mut t.buchi,
			&t.sym_table,
			&CexprTable::new(),
			"_ltl2ba",
			"[] (p -> <> q)",
		)
		.unwrap();
		let out: String = String::from_utf8(out).unwrap();

		assert!(out.starts_with("#if 0\n/* Precomputed transition data */\n"));
		assert!(out.contains("typedef enum {"));
		assert!(out.contains("_ltl2ba_state_0,"));
		assert!(out.contains("_ltl2ba_state _ltl2ba_statevar = _ltl2ba_state_0;"));
		assert!(out.contains("ltl2ba_fsm(bool state_stats, unsigned int num_iters)"));
		assert!(out.contains("_ltl2ba_stutter_accept_table"));
		assert!(out.contains("_ltl2ba_good_prefix_excluded_states"));
		assert!(out.contains("_ltl2ba_bad_prefix_states"));
		assert!(out.contains("_ltl2ba_sym_to_idx"));
		assert!(out.contains("\"LTL_BAD\""));
		assert!(out.contains("\"LTL_FAILING\""));
		assert!(out.contains("\"LTL_SUCCEEDING\""));
	}

	#[test]
	fn c_monitor_refuses_trivial_automata() {
		let mut t: Translated = translated(&Formula::fls());
		let mut out: Vec<u8> = Vec::new();
		print_c(
			&mut out,
			&mut t.buchi,
			&t.sym_table,
			&CexprTable::new(),
			"_ltl2ba",
			"false",
		)
		.unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "#error Empty Buchi automaton\n");
	}
}
