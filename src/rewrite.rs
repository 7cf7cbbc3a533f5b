/// Canonicalization and the logic-level rewrite laws.
///
/// The canonical form right-associates `&&`/`||` spines and sorts their
/// leaves by serialization key, so that equal sub-multisets produce the
/// same spine; canonical results are hash-consed in [`Cache`].
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::formula::Formula;
use crate::formula::isequal;
use crate::formula::spine_leaves;

/// Hash-cons cache mapping (right-linked) formulas to their canonical
/// representatives, keyed by the deterministic serialization.
#[derive(Debug, Default)]
pub struct Cache {
	entries: BTreeMap<String, Rc<Formula>>,
	interned: BTreeMap<String, Rc<Formula>>,
	stores: u64,
	hits: u64,
}

impl Cache {
	pub fn new() -> Self {
		Self::default()
	}

	/// `canonical . right_linked`; the normal form every rewritten
	/// formula passes through.
	pub fn rewrite(&mut self, f: Rc<Formula>) -> Rc<Formula> {
		self.canonical(right_linked(f))
	}

	fn canonical(&mut self, f: Rc<Formula>) -> Rc<Formula> {
		let cache_key: String = f.key();
		if let Some(hit) = self.entries.get(&cache_key) {
			self.hits += 1;
			return hit.clone();
		}

		let rebuilt: Rc<Formula> = match &*f {
			Formula::Next(x) => Formula::next(self.canonical(x.clone())),
			Formula::And(x, y) => {
				let y: Rc<Formula> = self.canonical(y.clone());
				let x: Rc<Formula> = self.canonical(x.clone());
				Formula::and(x, y)
			},
			Formula::Or(x, y) => {
				let y: Rc<Formula> = self.canonical(y.clone());
				let x: Rc<Formula> = self.canonical(x.clone());
				Formula::or(x, y)
			},
			Formula::Until(x, y) => {
				let y: Rc<Formula> = self.canonical(y.clone());
				let x: Rc<Formula> = self.canonical(x.clone());
				Formula::until(x, y)
			},
			Formula::Release(x, y) => {
				let y: Rc<Formula> = self.canonical(y.clone());
				let x: Rc<Formula> = self.canonical(x.clone());
				Formula::release(x, y)
			},
			_ => f.clone(),
		};

		let result: Rc<Formula> = self.intern(canonical_spine(rebuilt));
		self.stores += 1;
		self.entries.insert(cache_key, result.clone());
		result
	}

	/// Equal canonical forms share a single node.
	fn intern(&mut self, f: Rc<Formula>) -> Rc<Formula> {
		self.interned.entry(f.key()).or_insert(f).clone()
	}

	/// `(stores, hits)` counters for the statistics report.
	pub fn stats(&self) -> (u64, u64) {
		(self.stores, self.hits)
	}
}

/// Rotates left-nested `&&`/`||` chains into right-linked spines.
pub fn right_linked(f: Rc<Formula>) -> Rc<Formula> {
	match &*f {
		Formula::And(x, y) => {
			let (x, y): (Rc<Formula>, Rc<Formula>) = rotate(true, x.clone(), y.clone());
			Formula::and(right_linked(x), right_linked(y))
		},
		Formula::Or(x, y) => {
			let (x, y): (Rc<Formula>, Rc<Formula>) = rotate(false, x.clone(), y.clone());
			Formula::or(right_linked(x), right_linked(y))
		},
		Formula::Next(x) => Formula::next(right_linked(x.clone())),
		Formula::Until(x, y) => Formula::until(right_linked(x.clone()), right_linked(y.clone())),
		Formula::Release(x, y) => Formula::release(right_linked(x.clone()), right_linked(y.clone())),
		_ => f,
	}
}

fn rotate(conjunctive: bool, mut x: Rc<Formula>, mut y: Rc<Formula>) -> (Rc<Formula>, Rc<Formula>) {
	loop {
		match (conjunctive, &*x.clone()) {
			(true, Formula::And(xx, xy)) => {
				y = Formula::and(xy.clone(), y);
				x = xx.clone();
			},
			(false, Formula::Or(xx, xy)) => {
				y = Formula::or(xy.clone(), y);
				x = xx.clone();
			},
			_ => return (x, y),
		}
	}
}

/// Sorts, dedups and absorbs the leaves of a top-level AND/OR spine.
fn canonical_spine(f: Rc<Formula>) -> Rc<Formula> {
	let conjunctive: bool = match &*f {
		Formula::And(..) => true,
		Formula::Or(..) => false,
		_ => return f,
	};

	let mut leaves: Vec<Rc<Formula>> = Vec::new();
	collect_spine(conjunctive, &f, &mut leaves);

	leaves.sort_by_cached_key(|leaf| leaf.key());
	leaves.dedup_by_key(|leaf| leaf.key());

	// T absorbs under AND, F under OR; the dual constant annihilates.
	if conjunctive {
		if leaves.iter().any(|leaf| matches!(**leaf, Formula::False)) {
			return Formula::fls();
		}
		leaves.retain(|leaf| !matches!(**leaf, Formula::True));
		if leaves.is_empty() {
			return Formula::tru();
		}
	} else {
		if leaves.iter().any(|leaf| matches!(**leaf, Formula::True)) {
			return Formula::tru();
		}
		leaves.retain(|leaf| !matches!(**leaf, Formula::False));
		if leaves.is_empty() {
			return Formula::fls();
		}
	}

	let mut marked: Vec<bool> = vec![false; leaves.len()];
	for i in 0..leaves.len() {
		for j in 0..leaves.len() {
			if i == j || marked[i] || marked[j] {
				continue;
			}
			let k1: &Formula = &leaves[i];
			let k2: &Formula = &leaves[j];
			if conjunctive {
				// k1 && (.. || k1 || ..) == k1
				if or_spine_contains(k2, k1) {
					marked[j] = true;
					continue;
				}
				// q && (p U q) == q
				if let Formula::Until(_, q) = k2 {
					if (0..leaves.len()).any(|k| !marked[k] && k != j && isequal(&leaves[k], q)) {
						marked[j] = true;
					}
				}
			} else {
				// k1 || (.. && k1 && ..) == k1 (k2 implies k1 conjunct-wise)
				if and_spine_implies(k2, k1) {
					marked[j] = true;
					continue;
				}
				// q || (false V q) == q
				if let Formula::Release(lft, q) = k2 {
					if matches!(**lft, Formula::False)
						&& (0..leaves.len()).any(|k| !marked[k] && k != j && isequal(&leaves[k], q))
					{
						marked[j] = true;
					}
				}
			}
		}
	}

	let kept: Vec<Rc<Formula>> = leaves
		.into_iter()
		.zip(marked)
		.filter(|(_, m)| !m)
		.map(|(leaf, _)| leaf)
		.collect::<Vec<_>>();

	rebuild_spine(conjunctive, kept)
}

fn collect_spine(conjunctive: bool, f: &Rc<Formula>, out: &mut Vec<Rc<Formula>>) {
	match (conjunctive, &**f) {
		(true, Formula::And(x, y)) | (false, Formula::Or(x, y)) => {
			collect_spine(conjunctive, x, out);
			collect_spine(conjunctive, y, out);
		},
		_ => out.push(f.clone()),
	}
}

fn rebuild_spine(conjunctive: bool, mut leaves: Vec<Rc<Formula>>) -> Rc<Formula> {
	let mut spine: Rc<Formula> = leaves.pop().expect("constant absorption leaves at least one leaf");
	while let Some(leaf) = leaves.pop() {
		spine = if conjunctive {
			Formula::and(leaf, spine)
		} else {
			Formula::or(leaf, spine)
		};
	}
	spine
}

/// Does `k2`'s OR spine contain `k1` as a leaf (so `k1` implies `k2`)?
fn or_spine_contains(k2: &Formula, k1: &Formula) -> bool {
	let mut leaves: Vec<&Formula> = Vec::new();
	spine_leaves(false, k2, &mut leaves);
	leaves.iter().any(|leaf| isequal(leaf, k1))
}

/// Does every AND conjunct of `k1` occur in `k2`'s AND spine
/// (so `k2` implies `k1`)?
fn and_spine_implies(k2: &Formula, k1: &Formula) -> bool {
	let mut srch: Vec<&Formula> = Vec::new();
	spine_leaves(true, k1, &mut srch);
	let mut leaves: Vec<&Formula> = Vec::new();
	spine_leaves(true, k2, &mut leaves);
	srch.iter().all(|x| leaves.iter().any(|leaf| isequal(leaf, x)))
}

/// Negation pushdown: rewrites `!f` into negation normal form, where
/// negation survives only on literals, then canonicalizes.
pub fn negated(cache: &mut Cache, f: &Rc<Formula>) -> Rc<Formula> {
	let flipped: Rc<Formula> = match &**f {
		Formula::True => Formula::fls(),
		Formula::False => Formula::tru(),
		Formula::Literal { sym, negated } => Formula::literal(sym.clone(), !negated),
		Formula::Next(x) => Formula::next(negated(cache, x)),
		Formula::And(x, y) => Formula::or(negated(cache, x), negated(cache, y)),
		Formula::Or(x, y) => Formula::and(negated(cache, x), negated(cache, y)),
		Formula::Until(x, y) => Formula::release(negated(cache, x), negated(cache, y)),
		Formula::Release(x, y) => Formula::until(negated(cache, x), negated(cache, y)),
	};
	cache.rewrite(flipped)
}

/// Syntactic semi-decision procedure for `a => b`: sound, not complete.
pub fn implies(a: &Formula, b: &Formula) -> bool {
	if isequal(a, b) || matches!(b, Formula::True) || matches!(a, Formula::False) {
		return true;
	}
	if let Formula::And(x, y) = b {
		if implies(a, x) && implies(a, y) {
			return true;
		}
	}
	if let Formula::Or(x, y) = a {
		if implies(x, b) && implies(y, b) {
			return true;
		}
	}
	if let Formula::And(x, y) = a {
		if implies(x, b) || implies(y, b) {
			return true;
		}
	}
	if let Formula::Or(x, y) = b {
		if implies(a, x) || implies(a, y) {
			return true;
		}
	}
	if let Formula::Until(_, y) = b {
		if implies(a, y) {
			return true;
		}
	}
	if let Formula::Release(_, y) = a {
		if implies(y, b) {
			return true;
		}
	}
	if let Formula::Until(x, y) = a {
		if implies(x, b) && implies(y, b) {
			return true;
		}
	}
	if let Formula::Release(x, y) = b {
		if implies(a, x) && implies(a, y) {
			return true;
		}
	}
	match (a, b) {
		(Formula::Until(x1, y1), Formula::Until(x2, y2))
		| (Formula::Release(x1, y1), Formula::Release(x2, y2)) => implies(x1, x2) && implies(y1, y2),
		_ => false,
	}
}

/// One bottom-up simplification step: applies the first matching law and
/// returns. `F p` is `true U p` and `G p` is `false V p` throughout.
pub fn simplify(cache: &mut Cache, f: Rc<Formula>) -> Rc<Formula> {
	match &*f {
		Formula::Until(l, r) => simplify_until(cache, &f, l, r),
		Formula::Release(l, r) => simplify_release(cache, &f, l, r),
		Formula::Next(x) => simplify_next(&f, x),
		Formula::And(l, r) => simplify_and(cache, &f, l, r),
		Formula::Or(l, r) => simplify_or(cache, &f, l, r),
		_ => f,
	}
}

fn simplify_until(cache: &mut Cache, f: &Rc<Formula>, l: &Rc<Formula>, r: &Rc<Formula>) -> Rc<Formula> {
	if matches!(**r, Formula::True | Formula::False) || matches!(**l, Formula::False) {
		return r.clone();
	}
	if implies(l, r) {
		return r.clone();
	}
	// (p U q) U p == q U p
	if let Formula::Until(ll, lr) = &**l {
		if isequal(ll, r) {
			return Formula::until(lr.clone(), r.clone());
		}
	}
	if let Formula::Until(rl, _) = &**r {
		if implies(l, rl) {
			return r.clone();
		}
	}
	// X p U X q == X (p U q)
	if let (Formula::Next(lx), Formula::Next(rx)) = (&**l, &**r) {
		return Formula::next(Formula::until(lx.clone(), rx.clone()));
	}
	// F X p == X F p
	if matches!(**l, Formula::True) {
		if let Formula::Next(rx) = &**r {
			return Formula::next(Formula::until(Formula::tru(), rx.clone()));
		}
	}
	// F G F p == G F p
	if matches!(**l, Formula::True) {
		if let Formula::Release(rl, rr) = &**r {
			if matches!(**rl, Formula::False) {
				if let Formula::Until(rrl, _) = &**rr {
					if matches!(**rrl, Formula::True) {
						return r.clone();
					}
				}
			}
		}
	}
	// !q => p makes the left obligation vacuous: p U q == F q
	if !matches!(**l, Formula::True) && implies(&negated(cache, r), l) {
		return Formula::until(Formula::tru(), r.clone());
	}
	f.clone()
}

fn simplify_release(cache: &mut Cache, f: &Rc<Formula>, l: &Rc<Formula>, r: &Rc<Formula>) -> Rc<Formula> {
	if matches!(**r, Formula::True | Formula::False) || matches!(**l, Formula::True) {
		return r.clone();
	}
	if implies(r, l) {
		return r.clone();
	}
	// G (p V q) == G q
	if matches!(**l, Formula::False) {
		if let Formula::Release(_, rr) = &**r {
			return Formula::release(Formula::fls(), rr.clone());
		}
	}
	// G X p == X G p
	if matches!(**l, Formula::False) {
		if let Formula::Next(rx) = &**r {
			return Formula::next(Formula::release(Formula::fls(), rx.clone()));
		}
	}
	// G F G p == F G p
	if matches!(**l, Formula::False) {
		if let Formula::Until(rl, rr) = &**r {
			if matches!(**rl, Formula::True) {
				if let Formula::Release(rrl, _) = &**rr {
					if matches!(**rrl, Formula::False) {
						return r.clone();
					}
				}
			}
		}
	}
	if let Formula::Release(rl, _) = &**r {
		if implies(rl, l) {
			return r.clone();
		}
	}
	// p => !q makes the left release vacuous: p V q == G q
	if !matches!(**l, Formula::False) && implies(l, &negated(cache, r)) {
		return Formula::release(Formula::fls(), r.clone());
	}
	f.clone()
}

fn simplify_next(f: &Rc<Formula>, x: &Rc<Formula>) -> Rc<Formula> {
	// X G F p == G F p
	if let Formula::Release(xl, xr) = &**x {
		if matches!(**xl, Formula::False) {
			if let Formula::Until(xrl, _) = &**xr {
				if matches!(**xrl, Formula::True) {
					return x.clone();
				}
			}
		}
	}
	// X F G p == F G p
	if let Formula::Until(xl, xr) = &**x {
		if matches!(**xl, Formula::True) {
			if let Formula::Release(xrl, _) = &**xr {
				if matches!(**xrl, Formula::False) {
					return x.clone();
				}
			}
		}
	}
	f.clone()
}

fn simplify_and(cache: &mut Cache, f: &Rc<Formula>, l: &Rc<Formula>, r: &Rc<Formula>) -> Rc<Formula> {
	// p && (q U p) == p
	if let Formula::Until(_, rr) = &**r {
		if isequal(rr, l) {
			return l.clone();
		}
	}
	if let Formula::Until(_, lr) = &**l {
		if isequal(lr, r) {
			return r.clone();
		}
	}
	// p && (q V p) == q V p
	if let Formula::Release(_, rr) = &**r {
		if isequal(rr, l) {
			return r.clone();
		}
	}
	if let Formula::Release(_, lr) = &**l {
		if isequal(lr, r) {
			return l.clone();
		}
	}
	// (p U q) && (r U q) == (p && r) U q
	if let (Formula::Until(ll, lr), Formula::Until(rl, rr)) = (&**l, &**r) {
		if isequal(rr, lr) {
			return Formula::until(Formula::and(ll.clone(), rl.clone()), lr.clone());
		}
	}
	// (p V q) && (p V r) == p V (q && r)
	if let (Formula::Release(ll, lr), Formula::Release(rl, rr)) = (&**l, &**r) {
		if isequal(rl, ll) {
			return Formula::release(rl.clone(), Formula::and(lr.clone(), rr.clone()));
		}
	}
	// X p && X q == X (p && q)
	if let (Formula::Next(lx), Formula::Next(rx)) = (&**l, &**r) {
		return Formula::next(Formula::and(rx.clone(), lx.clone()));
	}
	// (p V q) && (r U q) == p V q
	if let (Formula::Release(_, lr), Formula::Until(_, rr)) = (&**l, &**r) {
		if isequal(lr, rr) {
			return l.clone();
		}
	}
	if isequal(l, r) || matches!(**r, Formula::False) || matches!(**l, Formula::True) || implies(r, l) {
		return r.clone();
	}
	if matches!(**r, Formula::True) || matches!(**l, Formula::False) || implies(l, r) {
		return l.clone();
	}
	// F G p && F G q == F G (p && q)
	if let (Some(lx), Some(rx)) = (as_eventually_always(l), as_eventually_always(r)) {
		return Formula::until(
			Formula::tru(),
			Formula::release(Formula::fls(), Formula::and(lx.clone(), rx.clone())),
		);
	}
	if implies(l, &negated(cache, r)) || implies(r, &negated(cache, l)) {
		return Formula::fls();
	}
	f.clone()
}

fn simplify_or(cache: &mut Cache, f: &Rc<Formula>, l: &Rc<Formula>, r: &Rc<Formula>) -> Rc<Formula> {
	// p || (q U p) == q U p
	if let Formula::Until(_, rr) = &**r {
		if isequal(rr, l) {
			return r.clone();
		}
	}
	// p || (q V p) == p
	if let Formula::Release(_, rr) = &**r {
		if isequal(rr, l) {
			return l.clone();
		}
	}
	// (p U q) || (p U r) == p U (q || r)
	if let (Formula::Until(ll, lr), Formula::Until(rl, rr)) = (&**l, &**r) {
		if isequal(rl, ll) {
			return Formula::until(rl.clone(), Formula::or(lr.clone(), rr.clone()));
		}
	}
	if isequal(l, r) || matches!(**r, Formula::False) || matches!(**l, Formula::True) || implies(r, l) {
		return l.clone();
	}
	if matches!(**r, Formula::True) || matches!(**l, Formula::False) || implies(l, r) {
		return r.clone();
	}
	// (p V q) || (r V q) == (p || r) V q
	if let (Formula::Release(ll, lr), Formula::Release(rl, rr)) = (&**l, &**r) {
		if isequal(lr, rr) {
			return Formula::release(Formula::or(ll.clone(), rl.clone()), rr.clone());
		}
	}
	// (p V q) || (r U q) == r U q
	if let (Formula::Release(_, lr), Formula::Until(_, rr)) = (&**l, &**r) {
		if isequal(lr, rr) {
			return r.clone();
		}
	}
	// G F p || G F q == G F (p || q)
	if let (Some(lx), Some(rx)) = (as_always_eventually(l), as_always_eventually(r)) {
		return Formula::release(
			Formula::fls(),
			Formula::until(Formula::tru(), Formula::or(lx.clone(), rx.clone())),
		);
	}
	if implies(&negated(cache, r), l) || implies(&negated(cache, l), r) {
		return Formula::tru();
	}
	f.clone()
}

/// Matches `F G x` (`true U (false V x)`).
fn as_eventually_always(f: &Formula) -> Option<&Rc<Formula>> {
	if let Formula::Until(l, r) = f {
		if matches!(**l, Formula::True) {
			if let Formula::Release(rl, rr) = &**r {
				if matches!(**rl, Formula::False) {
					return Some(rr);
				}
			}
		}
	}
	None
}

/// Matches `G F x` (`false V (true U x)`).
fn as_always_eventually(f: &Formula) -> Option<&Rc<Formula>> {
	if let Formula::Release(l, r) = f {
		if matches!(**l, Formula::False) {
			if let Formula::Until(rl, rr) = &**r {
				if matches!(**rl, Formula::True) {
					return Some(rr);
				}
			}
		}
	}
	None
}

/// Lowers `a -> b` with logic simplification enabled.
pub fn simplify_implication(cache: &mut Cache, a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
	if implies(&a, &b) {
		return Formula::tru();
	}
	let lowered: Rc<Formula> = Formula::or(negated(cache, &a), b);
	cache.rewrite(lowered)
}

/// Lowers `a <-> b` with logic simplification enabled.
pub fn simplify_equivalence(cache: &mut Cache, a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
	if implies(&a, &b) && implies(&b, &a) {
		return Formula::tru();
	}
	let both: Rc<Formula> = cache.rewrite(Formula::and(a.clone(), b.clone()));
	let not_a = negated(cache, &a);
	let not_b = negated(cache, &b);
	let neither: Rc<Formula> = cache.rewrite(Formula::and(not_a, not_b));
	cache.rewrite(Formula::or(both, neither))
}

/// Lowers `a -> b` with logic simplification disabled: expansion only.
pub fn minimal_implication(cache: &mut Cache, a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
	Formula::or(negated(cache, &a), b)
}

/// Lowers `a <-> b` with logic simplification disabled: expansion only.
pub fn minimal_equivalence(cache: &mut Cache, a: Rc<Formula>, b: Rc<Formula>) -> Rc<Formula> {
	Formula::or(
		Formula::and(a.clone(), b.clone()),
		Formula::and(negated(cache, &a), negated(cache, &b)),
	)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::formula::Symtab;

	fn lit(symtab: &mut Symtab, name: &str) -> Rc<Formula> {
		Formula::literal(symtab.lookup(name), false)
	}

	#[test]
	fn right_linking() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");
		let r: Rc<Formula> = lit(&mut symtab, "r");

		let left_nested: Rc<Formula> = Formula::and(Formula::and(p.clone(), q.clone()), r.clone());
		let linked: Rc<Formula> = right_linked(left_nested);
		assert_eq!(linked, Formula::and(p, Formula::and(q, r)));
	}

	#[test]
	fn canonical_orders_and_dedups() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		let a: Rc<Formula> = cache.rewrite(Formula::and(q.clone(), Formula::and(p.clone(), q.clone())));
		let b: Rc<Formula> = cache.rewrite(Formula::and(p.clone(), q.clone()));
		assert_eq!(a, b);
		// Interning makes equal canonical forms pointer-equal.
		assert!(Rc::ptr_eq(&a, &b));

		let absorbed: Rc<Formula> = cache.rewrite(Formula::and(p.clone(), Formula::tru()));
		assert_eq!(absorbed, p);
		let annihilated: Rc<Formula> = cache.rewrite(Formula::and(p.clone(), Formula::fls()));
		assert_eq!(*annihilated, Formula::False);
	}

	#[test]
	fn canonical_absorption_laws() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		// q && (p U q) == q
		let f: Rc<Formula> = cache.rewrite(Formula::and(q.clone(), Formula::until(p.clone(), q.clone())));
		assert_eq!(f, q);

		// p && (p || q) == p
		let f: Rc<Formula> = cache.rewrite(Formula::and(p.clone(), Formula::or(p.clone(), q.clone())));
		assert_eq!(f, p);

		// q || (false V q) == q
		let f: Rc<Formula> = cache.rewrite(Formula::or(
			q.clone(),
			Formula::release(Formula::fls(), q.clone()),
		));
		assert_eq!(f, q);
	}

	#[test]
	fn negation_normal_form() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		// !(p U q) == !p V !q
		let f: Rc<Formula> = negated(&mut cache, &Formula::until(p.clone(), q.clone()));
		let not_p: Rc<Formula> = Formula::literal(symtab.lookup("p"), true);
		let not_q: Rc<Formula> = Formula::literal(symtab.lookup("q"), true);
		assert_eq!(f, Formula::release(not_p.clone(), not_q.clone()));

		// !!p == p
		let inner: Rc<Formula> = negated(&mut cache, &p);
		let f: Rc<Formula> = negated(&mut cache, &inner);
		assert_eq!(f, p);

		// !X p == X !p
		let f: Rc<Formula> = negated(&mut cache, &Formula::next(p.clone()));
		assert_eq!(f, Formula::next(not_p));
	}

	#[test]
	fn implication_checks() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		assert!(implies(&p, &p));
		assert!(implies(&p, &Formula::True));
		assert!(implies(&Formula::False, &p));
		assert!(implies(&Formula::and(p.clone(), q.clone()), &p));
		assert!(implies(&p, &Formula::or(p.clone(), q.clone())));
		assert!(implies(&p, &Formula::until(q.clone(), p.clone())));
		assert!(implies(&Formula::release(q.clone(), p.clone()), &p));
		assert!(!implies(&p, &q));
		assert!(!implies(&Formula::or(p.clone(), q.clone()), &p));
	}

	#[test]
	fn until_laws() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		// p U true == true
		let f: Rc<Formula> = simplify(&mut cache, Formula::until(p.clone(), Formula::tru()));
		assert_eq!(*f, Formula::True);

		// X p U X q == X (p U q)
		let f: Rc<Formula> = simplify(
			&mut cache,
			Formula::until(Formula::next(p.clone()), Formula::next(q.clone())),
		);
		assert_eq!(f, Formula::next(Formula::until(p.clone(), q.clone())));

		// F X p == X F p
		let f: Rc<Formula> = simplify(
			&mut cache,
			Formula::until(Formula::tru(), Formula::next(p.clone())),
		);
		assert_eq!(f, Formula::next(Formula::until(Formula::tru(), p.clone())));

		// F G F p == G F p
		let gfp: Rc<Formula> = Formula::release(Formula::fls(), Formula::until(Formula::tru(), p.clone()));
		let f: Rc<Formula> = simplify(&mut cache, Formula::until(Formula::tru(), gfp.clone()));
		assert_eq!(f, gfp);
	}

	#[test]
	fn and_or_laws() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");
		let r: Rc<Formula> = lit(&mut symtab, "r");

		// (p U q) && (r U q) == (p && r) U q
		let f: Rc<Formula> = simplify(
			&mut cache,
			Formula::and(
				Formula::until(p.clone(), q.clone()),
				Formula::until(r.clone(), q.clone()),
			),
		);
		assert_eq!(
			f,
			Formula::until(Formula::and(p.clone(), r.clone()), q.clone())
		);

		// X p && X q == X (q && p)
		let f: Rc<Formula> = simplify(
			&mut cache,
			Formula::and(Formula::next(p.clone()), Formula::next(q.clone())),
		);
		assert_eq!(f, Formula::next(Formula::and(q.clone(), p.clone())));

		// p && !p == false
		let not_p: Rc<Formula> = Formula::literal(symtab.lookup("p"), true);
		let f: Rc<Formula> = simplify(&mut cache, Formula::and(p.clone(), not_p.clone()));
		assert_eq!(*f, Formula::False);

		// p || !p == true
		let f: Rc<Formula> = simplify(&mut cache, Formula::or(p.clone(), not_p));
		assert_eq!(*f, Formula::True);

		// (p U q) || (p U r) == p U (q || r)
		let f: Rc<Formula> = simplify(
			&mut cache,
			Formula::or(
				Formula::until(p.clone(), q.clone()),
				Formula::until(p.clone(), r.clone()),
			),
		);
		assert_eq!(
			f,
			Formula::until(p.clone(), Formula::or(q.clone(), r.clone()))
		);
	}

	#[test]
	fn derived_operator_lowering() {
		let mut symtab: Symtab = Symtab::new();
		let mut cache: Cache = Cache::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");

		// p -> p == true
		let f: Rc<Formula> = simplify_implication(&mut cache, p.clone(), p.clone());
		assert_eq!(*f, Formula::True);

		// p -> q == !p || q
		let f: Rc<Formula> = simplify_implication(&mut cache, p.clone(), q.clone());
		let not_p: Rc<Formula> = Formula::literal(symtab.lookup("p"), true);
		assert!(isequal(&f, &Formula::or(not_p.clone(), q.clone())));

		// p <-> p == true
		let f: Rc<Formula> = simplify_equivalence(&mut cache, p.clone(), p.clone());
		assert_eq!(*f, Formula::True);

		// minimal mode still expands the derived operators
		let f: Rc<Formula> = minimal_implication(&mut cache, p.clone(), q.clone());
		assert!(isequal(&f, &Formula::or(not_p, q.clone())));
	}
}
