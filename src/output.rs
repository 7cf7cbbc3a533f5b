/// Spin never-claim and dot renderings of the Büchi automaton.
use std::io;

use crate::buchi::BRef;
use crate::buchi::BTrans;
use crate::buchi::Buchi;
use crate::formula::CexprTable;
use crate::formula::Sym;
use crate::set::Bitset;

/// Guard in spin syntax: conjunction of positive and negated predicate
/// names, `1` when unconstrained.
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

/// Guard in dot syntax: `&&`-joined, `{...}` predicates expanded back to
/// their text, parenthesized when requested and non-atomic.
fn write_dot_guard(
	f: &mut impl io::Write,
	sym_table: &[Sym],
	cexprs: &CexprTable,
	pos: &Bitset,
	neg: &Bitset,
	need_parens: bool,
) -> io::Result<()> {
	let count: usize = pos.count() + neg.count();
	let parens: bool = count > 1 && need_parens;
	if parens {
		write!(f, "(")?;
	}
	let mut first: bool = true;
	for (set, negate) in [(pos, false), (neg, true)] {
		for i in set.iter() {
			if !first {
				write!(f, "&&")?;
			}
			if negate {
				write!(f, "!")?;
			}
			let name: &str = &sym_table[i];
			match cexprs.expr_for_symbol(name) {
				Some(expr) => write!(f, "{{{expr}}}")?,
				None => write!(f, "{name}")?,
			}
			first = false;
		}
	}
	if first {
		write!(f, "true")?;
	}
	if parens {
		write!(f, ")")?;
	}
	Ok(())
}

fn spin_label(b: &Buchi, s: BRef) -> String {
	let prefix: String = if b.arena[s].final_layer == b.accept {
		"accept_".to_owned()
	} else {
		format!("T{}_", b.arena[s].final_layer)
	};
	let name: String = match b.arena[s].id {
		0 => "all".to_owned(),
		-1 => "init".to_owned(),
		id => format!("S{id}"),
	};
	prefix + &name
}

fn same_target(b: &Buchi, t: &BTrans, t1: &BTrans) -> bool {
	b.arena[t.to].id == b.arena[t1.to].id && b.arena[t.to].final_layer == b.arena[t1.to].final_layer
}

/// Emits the automaton as a spin never claim.
pub fn print_spin(f: &mut impl io::Write, b: &Buchi, sym_table: &[Sym], uform: &str) -> io::Result<()> {
	if b.is_empty() {
		writeln!(f, "never {{    /* {uform} */")?;
		writeln!(f, "T0_init:")?;
		writeln!(f, "\tfalse;")?;
		writeln!(f, "}}")?;
		return Ok(());
	}
	if b.accepts_everything() {
		writeln!(f, "never {{    /* {uform} */")?;
		writeln!(f, "accept_init:")?;
		writeln!(f, "\tif")?;
		writeln!(f, "\t:: (1) -> goto accept_init")?;
		writeln!(f, "\tfi;")?;
		writeln!(f, "}}")?;
		return Ok(());
	}

	writeln!(f, "never {{ /* {uform} */")?;
	let mut accept_all: bool = false;
	for &s in b.solved.iter() {
		if b.arena[s].id == 0 {
			// accept_all goes at the end
			accept_all = true;
			continue;
		}
		writeln!(f, "{}:", spin_label(b, s))?;
		let trans: &[BTrans] = b.arena[s].trans.as_deref().unwrap();
		if trans.is_empty() {
			writeln!(f, "\tfalse;")?;
			continue;
		}
		writeln!(f, "\tif")?;
		let mut consumed: Vec<bool> = vec![false; trans.len()];
		for (i, t) in trans.iter().enumerate() {
			if consumed[i] {
				continue;
			}
			write!(f, "\t:: (")?;
			write_spin_guard(f, sym_table, &t.pos, &t.neg)?;
			for (j, t1) in trans.iter().enumerate().skip(i + 1) {
				if !consumed[j] && same_target(b, t, t1) {
					write!(f, ") || (")?;
					write_spin_guard(f, sym_table, &t1.pos, &t1.neg)?;
					consumed[j] = true;
				}
			}
			writeln!(f, ") -> goto {}", spin_label(b, t.to))?;
		}
		writeln!(f, "\tfi;")?;
	}
	if accept_all {
		writeln!(f, "accept_all:")?;
		writeln!(f, "\tskip")?;
	}
	writeln!(f, "}}")?;
	Ok(())
}

pub(crate) fn dot_name(b: &Buchi, s: BRef) -> String {
	match b.arena[s].id {
		-1 => "init".to_owned(),
		0 => "all".to_owned(),
		id => {
			if b.arena[s].final_layer != b.accept {
				format!("T{}_{id}", b.arena[s].final_layer)
			} else {
				format!("{id}")
			}
		},
	}
}

/// Emits the automaton as a dot digraph.
pub fn print_dot(
	f: &mut impl io::Write,
	b: &Buchi,
	sym_table: &[Sym],
	cexprs: &CexprTable,
) -> io::Result<()> {
	if b.is_empty() {
		writeln!(f, "digraph G {{")?;
		writeln!(f, "init [shape=circle]")?;
		writeln!(f, "}}")?;
		return Ok(());
	}
	if b.accepts_everything() {
		writeln!(f, "digraph G {{")?;
		writeln!(f, "init -> init [label=\"{{true}}\",font=\"courier\"]")?;
		writeln!(f, "init [shape=doublecircle]")?;
		writeln!(f, "}}")?;
		return Ok(());
	}

	writeln!(f, "digraph G {{")?;
	for &s in b.solved.iter() {
		if b.arena[s].id == 0 {
			writeln!(f, "all [shape=doublecircle]")?;
			writeln!(
				f,
				"all -> all [label=\"true\", fontname=\"Courier\", fontcolor=blue]"
			)?;
			continue;
		}
		let shape: &str = if b.arena[s].final_layer == b.accept {
			"doublecircle"
		} else {
			"circle"
		};
		writeln!(f, "{} [shape={shape}]", dot_name(b, s))?;
		let trans: &[BTrans] = b.arena[s].trans.as_deref().unwrap();
		let mut consumed: Vec<bool> = vec![false; trans.len()];
		for (i, t) in trans.iter().enumerate() {
			if consumed[i] {
				continue;
			}
			let merged: bool = trans
				.iter()
				.enumerate()
				.skip(i + 1)
				.any(|(j, t1)| !consumed[j] && same_target(b, t, t1));
			write!(f, "{} -> {} [label=\"", dot_name(b, s), dot_name(b, t.to))?;
			write_dot_guard(f, sym_table, cexprs, &t.pos, &t.neg, merged)?;
			for (j, t1) in trans.iter().enumerate().skip(i + 1) {
				if !consumed[j] && same_target(b, t, t1) {
					write!(f, "||")?;
					write_dot_guard(f, sym_table, cexprs, &t1.pos, &t1.neg, true)?;
					consumed[j] = true;
				}
			}
			writeln!(f, "\", fontname=\"Courier\", fontcolor=blue]")?;
		}
	}
	writeln!(f, "}}")?;
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
	use pretty_assertions::assert_eq;
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

	fn spin(f: &Rc<Formula>, uform: &str) -> String {
		let t: Translated = translated(f);
		let mut out: Vec<u8> = Vec::new();
		print_spin(&mut out, &t.buchi, &t.sym_table, uform).unwrap();
		String::from_utf8(out).unwrap()
	}

	fn dot(f: &Rc<Formula>) -> String {
		let t: Translated = translated(f);
		let mut out: Vec<u8> = Vec::new();
		print_dot(&mut out, &t.buchi, &t.sym_table, &CexprTable::new()).unwrap();
		String::from_utf8(out).unwrap()
	}

	fn eventually(x: Rc<Formula>) -> Rc<Formula> {
		Formula::until(Formula::tru(), x)
	}

	fn always(x: Rc<Formula>) -> Rc<Formula> {
		Formula::release(Formula::fls(), x)
	}

	#[test]
	fn spin_truth() {
		// The all-accepting state merges into init, so the general
		// rendering applies.
		let out: String = spin(&Formula::tru(), "true");
		assert_eq!(
			out,
			"never { /* true */\n\
			 accept_init:\n\
			 \tif\n\
			 \t:: (1) -> goto accept_init\n\
			 \tfi;\n\
			 }\n"
		);
	}

	#[test]
	fn spin_falsity() {
		let out: String = spin(&Formula::fls(), "false");
		assert_eq!(
			out,
			"never {    /* false */\n\
			 T0_init:\n\
			 \tfalse;\n\
			 }\n"
		);
	}

	#[test]
	fn spin_always() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let out: String = spin(&always(p), "[] p");

		// One accepting state looping on p; entered from init on p.
		assert!(out.starts_with("never { /* [] p */\n"));
		assert!(out.contains("accept_init:\n") || out.contains("T0_init:\n"));
		assert!(out.contains(":: (p) -> goto "));
		assert!(out.ends_with("}\n"));
		// No unguarded escape: every guard mentions p.
		for line in out.lines().filter(|l| l.starts_with("\t:: ")) {
			assert!(line.contains("(p)"));
		}
	}

	#[test]
	fn spin_eventually() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let out: String = spin(&eventually(p), "<> p");

		// Init waits on anything, leaves on p into accept_all.
		assert!(out.contains("T0_init:\n"));
		assert!(out.contains(":: (p) -> goto accept_all\n"));
		assert!(out.contains(":: (1) -> goto T0_init\n"));
		assert!(out.contains("accept_all:\n\tskip\n"));
	}

	#[test]
	fn spin_until() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let q: Rc<Formula> = Formula::literal(symtab.lookup("q"), false);
		let out: String = spin(&Formula::until(p, q), "p U q");

		// Wait on p, discharge on q.
		assert!(out.contains(":: (q) -> goto accept_all\n"));
		assert!(out.contains(":: (p) -> goto T0_init\n") || out.contains(":: (p) -> goto T0_S"));
		assert!(out.contains("accept_all:\n\tskip\n"));
	}

	#[test]
	fn dot_truth_and_falsity() {
		assert_eq!(
			dot(&Formula::tru()),
			"digraph G {\n\
			 init [shape=doublecircle]\n\
			 init -> init [label=\"true\", fontname=\"Courier\", fontcolor=blue]\n\
			 }\n"
		);
		assert_eq!(
			dot(&Formula::fls()),
			"digraph G {\ninit [shape=circle]\n}\n"
		);
	}

	#[test]
	fn dot_always() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), false);
		let out: String = dot(&always(p));

		assert!(out.starts_with("digraph G {\n"));
		// The G p state is accepting and loops on p.
		assert!(out.contains("[shape=doublecircle]"));
		assert!(out.contains("[label=\"p\", fontname=\"Courier\", fontcolor=blue]"));
		assert!(out.ends_with("}\n"));
	}

	#[test]
	fn negated_guard_rendering() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = Formula::literal(symtab.lookup("p"), true);
		// G !p keeps a negated literal in the guard.
		let out: String = spin(&always(p), "[] !p");
		assert!(out.contains("(!p)"));
	}
}
