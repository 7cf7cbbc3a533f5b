use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// An interned predicate name; pointer-cheap to clone, compared by content.
pub type Sym = Rc<str>;

/// A normalized LTL formula.
///
/// Negation appears only inside [`Formula::Literal`]: the parser pushes `!`
/// down to the predicates while building the tree, and eliminates the
/// derived operators (`F`, `G`, `->`, `<->`) on the way, so the automaton
/// stages only ever see this shape.
#[derive(Debug, Clone, Eq, Ord, PartialEq, PartialOrd)]
pub enum Formula {
	True,
	False,
	Literal { sym: Sym, negated: bool },
	Next(Rc<Formula>),
	And(Rc<Formula>, Rc<Formula>),
	Or(Rc<Formula>, Rc<Formula>),
	Until(Rc<Formula>, Rc<Formula>),
	Release(Rc<Formula>, Rc<Formula>),
}

impl Formula {
	pub fn tru() -> Rc<Self> {
		Rc::new(Self::True)
	}

	pub fn fls() -> Rc<Self> {
		Rc::new(Self::False)
	}

	pub fn literal(sym: Sym, negated: bool) -> Rc<Self> {
		Rc::new(Self::Literal { sym, negated })
	}

	pub fn next(x: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::Next(x))
	}

	pub fn and(x: Rc<Self>, y: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::And(x, y))
	}

	pub fn or(x: Rc<Self>, y: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::Or(x, y))
	}

	pub fn until(x: Rc<Self>, y: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::Until(x, y))
	}

	pub fn release(x: Rc<Self>, y: Rc<Self>) -> Rc<Self> {
		Rc::new(Self::Release(x, y))
	}

	/// True when the formula carries no temporal operator;
	/// pure boolean structure is flattened away by the alternating builder.
	pub fn is_boolean(&self) -> bool {
		match self {
			Self::True | Self::False | Self::Literal { .. } => true,
			Self::And(x, y) | Self::Or(x, y) => x.is_boolean() && y.is_boolean(),
			Self::Next(..) | Self::Until(..) | Self::Release(..) => false,
		}
	}
}

// Serialization key
impl Formula {
	/// Deterministic depth-first serialization; used as the sort key for
	/// AND/OR spine leaves and as the canonicalization cache key.
	pub fn key(&self) -> String {
		let mut buf: String = String::new();
		self.key_into(&mut buf);
		buf
	}

	fn key_into(&self, buf: &mut String) {
		match self {
			Self::True => buf.push('T'),
			Self::False => buf.push('F'),
			Self::Literal { sym, negated } => {
				if *negated {
					buf.push('!');
				}
				buf.push_str(sym);
			},
			Self::Next(x) => {
				buf.push('X');
				x.key_into(buf);
			},
			Self::And(x, y) => {
				buf.push('&');
				y.key_into(buf);
				x.key_into(buf);
			},
			Self::Or(x, y) => {
				buf.push('|');
				y.key_into(buf);
				x.key_into(buf);
			},
			Self::Until(x, y) => {
				buf.push('U');
				y.key_into(buf);
				x.key_into(buf);
			},
			Self::Release(x, y) => {
				buf.push('V');
				y.key_into(buf);
				x.key_into(buf);
			},
		}
	}
}

impl fmt::Display for Formula {
	fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::True => fmt.write_str("true"),
			Self::False => fmt.write_str("false"),
			Self::Literal { sym, negated } => {
				if *negated {
					write!(fmt, "!({sym})")
				} else {
					write!(fmt, "({sym})")
				}
			},
			Self::Next(x) => write!(fmt, "X ({x})"),
			Self::And(x, y) => write!(fmt, "({x} && {y})"),
			Self::Or(x, y) => write!(fmt, "({x} || {y})"),
			Self::Until(x, y) => write!(fmt, "({x} U {y})"),
			Self::Release(x, y) => write!(fmt, "({x} V {y})"),
		}
	}
}

/// Structural equality up to commutativity and associativity of `&&`/`||`.
///
/// AND/OR spines are compared as leaf sets, so `(a && b) && c` and
/// `b && (c && a)` are equal; everything else is compared positionally.
pub fn isequal(a: &Formula, b: &Formula) -> bool {
	match (a, b) {
		(Formula::True, Formula::True) | (Formula::False, Formula::False) => true,
		(
			Formula::Literal { sym: s1, negated: n1 },
			Formula::Literal { sym: s2, negated: n2 },
		) => s1 == s2 && n1 == n2,
		(Formula::Next(x), Formula::Next(y)) => isequal(x, y),
		(Formula::Until(x1, y1), Formula::Until(x2, y2))
		| (Formula::Release(x1, y1), Formula::Release(x2, y2)) => isequal(x1, x2) && isequal(y1, y2),
		(Formula::And(..), Formula::And(..)) | (Formula::Or(..), Formula::Or(..)) => sametrees(a, b),
		_ => false,
	}
}

/// Both spines have the same leaves, as sets (duplicates collapse).
fn sametrees(a: &Formula, b: &Formula) -> bool {
	let conjunctive: bool = matches!(a, Formula::And(..));
	let mut a_leaves: Vec<&Formula> = Vec::new();
	let mut b_leaves: Vec<&Formula> = Vec::new();
	spine_leaves(conjunctive, a, &mut a_leaves);
	spine_leaves(conjunctive, b, &mut b_leaves);

	a_leaves.iter().all(|x| b_leaves.iter().any(|y| isequal(x, y)))
		&& b_leaves.iter().all(|y| a_leaves.iter().any(|x| isequal(x, y)))
}

/// Collects the leaves of an AND (or OR) spine, recursing through nested
/// nodes of the same connective on either side.
pub fn spine_leaves<'formula>(conjunctive: bool, f: &'formula Formula, out: &mut Vec<&'formula Formula>) {
	match f {
		Formula::And(x, y) if conjunctive => {
			spine_leaves(conjunctive, x, out);
			spine_leaves(conjunctive, y, out);
		},
		Formula::Or(x, y) if !conjunctive => {
			spine_leaves(conjunctive, x, out);
			spine_leaves(conjunctive, y, out);
		},
		_ => out.push(f),
	}
}

/// Append-only intern table for predicate names.
#[derive(Debug, Default)]
pub struct Symtab {
	interned: BTreeMap<String, Sym>,
}

impl Symtab {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn lookup(&mut self, name: &str) -> Sym {
		if let Some(sym) = self.interned.get(name) {
			return sym.clone();
		}
		let sym: Sym = Rc::from(name);
		self.interned.insert(name.to_owned(), sym.clone());
		sym
	}
}

/// Opaque `{...}` predicates, interned by their text.
///
/// Each distinct expression becomes the predicate symbol
/// `_ltl2ba_cexpr_<i>_status`; the table remembers the original text for
/// the dot and C-monitor printers.
#[derive(Debug, Default)]
pub struct CexprTable {
	exprs: Vec<String>,
}

impl CexprTable {
	pub const MAX_EXPRS: usize = 256;
	pub const MAX_EXPR_LEN: usize = 2048;

	pub fn new() -> Self {
		Self::default()
	}

	/// Interns the expression text, returning the symbol name for it.
	/// `None` when the table is full.
	pub fn intern(&mut self, text: &str) -> Option<String> {
		for (i, expr) in self.exprs.iter().enumerate() {
			if expr == text {
				return Some(Self::status_symbol(i));
			}
		}
		if self.exprs.len() == Self::MAX_EXPRS {
			return None;
		}
		self.exprs.push(text.to_owned());
		Some(Self::status_symbol(self.exprs.len() - 1))
	}

	fn status_symbol(i: usize) -> String {
		format!("_ltl2ba_cexpr_{i}_status")
	}

	pub fn exprs(&self) -> &[String] {
		&self.exprs
	}

	/// The original `{...}` text behind a status symbol, if the name is one.
	pub fn expr_for_symbol(&self, name: &str) -> Option<&str> {
		let i: usize = name
			.strip_prefix("_ltl2ba_cexpr_")?
			.strip_suffix("_status")?
			.parse::<usize>()
			.ok()?;
		self.exprs.get(i).map(String::as_str)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn lit(symtab: &mut Symtab, name: &str) -> Rc<Formula> {
		Formula::literal(symtab.lookup(name), false)
	}

	#[test]
	fn keys() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");
		assert_eq!(Formula::until(p.clone(), q.clone()).key(), "Uqp");
		assert_eq!(Formula::literal(symtab.lookup("p"), true).key(), "!p");
		assert_eq!(Formula::next(Formula::and(p, q)).key(), "X&qp");
	}

	#[test]
	fn commutative_equality() {
		let mut symtab: Symtab = Symtab::new();
		let p: Rc<Formula> = lit(&mut symtab, "p");
		let q: Rc<Formula> = lit(&mut symtab, "q");
		let r: Rc<Formula> = lit(&mut symtab, "r");

		let left: Rc<Formula> = Formula::and(Formula::and(p.clone(), q.clone()), r.clone());
		let right: Rc<Formula> = Formula::and(q.clone(), Formula::and(r.clone(), p.clone()));
		assert!(isequal(&left, &right));

		let other: Rc<Formula> = Formula::and(p.clone(), q.clone());
		assert!(!isequal(&left, &other));

		// Until is not commutative.
		assert!(!isequal(&Formula::until(p.clone(), q.clone()), &Formula::until(q, p)));
	}

	#[test]
	fn cexpr_interning() {
		let mut cexprs: CexprTable = CexprTable::new();
		let first: String = cexprs.intern("x > 0").unwrap();
		let second: String = cexprs.intern("y < 2").unwrap();
		let again: String = cexprs.intern("x > 0").unwrap();
		assert_eq!(first, "_ltl2ba_cexpr_0_status");
		assert_eq!(second, "_ltl2ba_cexpr_1_status");
		assert_eq!(again, first);
		assert_eq!(cexprs.expr_for_symbol("_ltl2ba_cexpr_1_status"), Some("y < 2"));
		assert_eq!(cexprs.expr_for_symbol("p"), None);
	}
}
