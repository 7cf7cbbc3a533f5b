use std::rc::Rc;

use nom::Err as NomErr;
use nom::IResult;
use nom::Parser;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::combinator::cut;
use nom::combinator::opt;
use nom::error::ErrorKind as NomErrorKind;
use nom::error::FromExternalError;
use nom::error::ParseError as NomParseError;

use crate::formula::CexprTable;
use crate::formula::Formula;
use crate::formula::Symtab;
use crate::rewrite::Cache;
use crate::rewrite::minimal_equivalence;
use crate::rewrite::minimal_implication;
use crate::rewrite::negated;
use crate::rewrite::simplify;
use crate::rewrite::simplify_equivalence;
use crate::rewrite::simplify_implication;

/// Raw syntax tree, before operator lowering.
///
/// Derived operators survive only here: lowering eliminates `Not`,
/// `Always`, `Eventually`, `Implies` and `Equiv` while building the
/// normalized [`Formula`].
#[derive(Debug, Clone, Eq, PartialEq)]
enum Term {
	True,
	False,
	Predicate(String),
	Cexpr(String),
	Not(Box<Term>),
	Next(Box<Term>),
	Always(Box<Term>),
	Eventually(Box<Term>),
	And(Box<Term>, Box<Term>),
	Or(Box<Term>, Box<Term>),
	Until(Box<Term>, Box<Term>),
	Release(Box<Term>, Box<Term>),
	Implies(Box<Term>, Box<Term>),
	Equiv(Box<Term>, Box<Term>),
}

#[derive(Debug)]
pub struct ParseError<'a> {
	consumed: &'a str,
	remaining: &'a str,
	kind: ParseErrorKind,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ParseErrorKind {
	/// An operand (predicate, constant, or parenthesized formula) was
	/// required but not found; also covers running into end of input.
	ExpectedOperand,
	/// Expected a certain character, e.g. ')' after a parenthesized formula.
	ExpectedChar(char),
	/// Missing the closing '}' of a `{...}` predicate.
	UnterminatedCexpr,
	/// A `{...}` predicate exceeding the fixed lexer buffer.
	CexprTooLong,
	/// More distinct `{...}` predicates than the table can hold.
	TooManyCexprs,
	/// The formula ended but input remains.
	TrailingInput,
	/// An error from nom; shouldn't surface, but needed to implement
	/// [`nom::error::ParseError`].
	Nom(NomErrorKind),
}

#[derive(Debug)]
struct LtlParsingError<'a> {
	pub input: &'a str,
	pub kind: ParseErrorKind,
}

impl<'a> NomParseError<&'a str> for LtlParsingError<'a> {
	fn from_error_kind(input: &'a str, nom: NomErrorKind) -> Self {
		Self {
			input,
			kind: ParseErrorKind::Nom(nom),
		}
	}

	fn append(_input: &'a str, _kind: NomErrorKind, other: Self) -> Self {
		other
	}
}

impl<'a> FromExternalError<&'a str, Self> for LtlParsingError<'a> {
	fn from_external_error(_input: &'a str, _kind: NomErrorKind, e: Self) -> Self {
		e
	}
}

impl<'a> LtlParsingError<'a> {
	fn new(input: &'a str, kind: ParseErrorKind) -> Self {
		Self { input, kind }
	}
}

impl ParseErrorKind {
	fn error(self, input: &str) -> NomErr<LtlParsingError<'_>> {
		NomErr::Error(LtlParsingError::new(input, self))
	}

	fn failure(self, input: &str) -> NomErr<LtlParsingError<'_>> {
		NomErr::Failure(LtlParsingError::new(input, self))
	}

	fn diagnostic<'a, T>(self) -> impl Fn(&'a str) -> ParsingResult<'a, T> {
		move |input| Err(self.error(input))
	}
}

type ParsingResult<'a, T> = IResult<&'a str, T, LtlParsingError<'a>>;

impl<'a> ParseError<'a> {
	/// Character offset of the offending position, for caret diagnostics.
	pub fn column(&self) -> usize {
		self.consumed.chars().count()
	}

	pub fn kind(&self) -> ParseErrorKind {
		self.kind
	}

	pub fn remaining(&self) -> &'a str {
		self.remaining
	}
}

impl std::fmt::Display for ParseError<'_> {
	fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.kind {
			ParseErrorKind::ExpectedOperand => fmt.write_str("expected predicate"),
			ParseErrorKind::ExpectedChar(ch) => write!(fmt, "expected '{ch}'"),
			ParseErrorKind::UnterminatedCexpr => fmt.write_str("unexpected end of input during C expression"),
			ParseErrorKind::CexprTooLong => fmt.write_str("C expression is too long"),
			ParseErrorKind::TooManyCexprs => fmt.write_str("too many C expressions"),
			ParseErrorKind::TrailingInput => fmt.write_str("syntax error"),
			ParseErrorKind::Nom(_) => fmt.write_str("syntax error"),
		}
	}
}

impl std::error::Error for ParseError<'_> {}

/// Parses one LTL formula and lowers it into the normalized [`Formula`]
/// form: negation on literals only, no derived operators.
///
/// With `simp_log` the logic rewrite laws run while the tree is built,
/// exactly where the parser creates each node; without it only the
/// derived-operator expansion happens.
pub fn parse_formula<'input>(
	input: &'input str,
	symtab: &mut Symtab,
	cexprs: &mut CexprTable,
	cache: &mut Cache,
	simp_log: bool,
) -> Result<Rc<Formula>, ParseError<'input>> {
	match parse_to_end(input) {
		Ok((remaining, term)) => {
			assert_eq!(blank(remaining), "");
			lower(&term, symtab, cexprs, cache, simp_log).map_err(|kind| ParseError {
				consumed: input,
				remaining: "",
				kind,
			})
		},
		Err(NomErr::Incomplete(_)) => {
			panic!("only complete parsers are used");
		},
		Err(NomErr::Error(err) | NomErr::Failure(err)) => {
			let consumed: &str = input
				.strip_suffix(err.input)
				.expect("error position is a suffix of the input");
			Err(ParseError {
				consumed,
				remaining: err.input,
				kind: err.kind,
			})
		},
	}
}

// ==================================

fn parse_to_end(input: &str) -> ParsingResult<'_, Term> {
	let (input, term): (&str, Term) = parse_equiv(input)?;

	// A trailing ';' terminates the formula.
	let (input, _): (&str, Option<char>) = opt(token_char::<';'>).parse(input)?;

	let input: &str = blank(input);
	if !input.is_empty() {
		return Err(ParseErrorKind::TrailingInput.error(input));
	}

	Ok((input, term))
}

fn parse_equiv(input: &str) -> ParsingResult<'_, Term> {
	let (mut input, mut term): (&str, Term) = parse_implication(input)?;

	loop {
		let maybe_op: Option<&str>;
		(input, maybe_op) = opt(token(tag("<->"))).parse(input)?;
		if maybe_op.is_none() {
			break;
		}
		// Cut: after '<->' a right operand is required.
		let rhs: Term;
		(input, rhs) = cut(parse_implication).parse(input)?;
		term = Term::Equiv(Box::new(term), Box::new(rhs));
	}

	Ok((input, term))
}

fn parse_implication(input: &str) -> ParsingResult<'_, Term> {
	let (mut input, mut term): (&str, Term) = parse_or(input)?;

	loop {
		let maybe_op: Option<&str>;
		(input, maybe_op) = opt(token(tag("->"))).parse(input)?;
		if maybe_op.is_none() {
			break;
		}
		let rhs: Term;
		(input, rhs) = cut(parse_or).parse(input)?;
		term = Term::Implies(Box::new(term), Box::new(rhs));
	}

	Ok((input, term))
}

fn parse_or(input: &str) -> ParsingResult<'_, Term> {
	let (mut input, mut term): (&str, Term) = parse_and(input)?;

	loop {
		let maybe_op: Option<&str>;
		(input, maybe_op) = opt(token(alt((tag("||"), tag("\\/"))))).parse(input)?;
		if maybe_op.is_none() {
			break;
		}
		let rhs: Term;
		(input, rhs) = cut(parse_and).parse(input)?;
		term = Term::Or(Box::new(term), Box::new(rhs));
	}

	Ok((input, term))
}

fn parse_and(input: &str) -> ParsingResult<'_, Term> {
	let (mut input, mut term): (&str, Term) = parse_until_release(input)?;

	loop {
		let maybe_op: Option<&str>;
		(input, maybe_op) = opt(token(alt((tag("&&"), tag("/\\"))))).parse(input)?;
		if maybe_op.is_none() {
			break;
		}
		let rhs: Term;
		(input, rhs) = cut(parse_until_release).parse(input)?;
		term = Term::And(Box::new(term), Box::new(rhs));
	}

	Ok((input, term))
}

fn parse_until_release(input: &str) -> ParsingResult<'_, Term> {
	let (mut input, mut term): (&str, Term) = parse_unary(input)?;

	loop {
		let maybe_op: Option<char>;
		(input, maybe_op) = opt(alt((token_char::<'U'>, token_char::<'V'>))).parse(input)?;
		let Some(op) = maybe_op else {
			break;
		};
		let rhs: Term;
		(input, rhs) = cut(parse_unary).parse(input)?;
		term = match op {
			'U' => Term::Until(Box::new(term), Box::new(rhs)),
			_ => Term::Release(Box::new(term), Box::new(rhs)),
		};
	}

	Ok((input, term))
}

fn parse_unary(original_input: &str) -> ParsingResult<'_, Term> {
	let input: &str = blank(original_input);

	alt((
		parse_prefixed,
		parse_parenthesized,
		parse_cexpr,
		parse_word,
		ParseErrorKind::ExpectedOperand.diagnostic(),
	))
	.parse(input)
}

fn parse_prefixed(input: &str) -> ParsingResult<'_, Term> {
	let (input, op): (&str, &str) = alt((
		tag("<>"),
		tag("[]"),
		tag("NOT"),
		tag("!"),
		tag("X"),
		tag("G"),
		tag("F"),
	))
	.parse(input)?;

	// Cut: a prefix operator requires an operand.
	let (input, operand): (&str, Term) = cut(parse_unary).parse(input)?;

	let term: Term = match op {
		"!" | "NOT" => Term::Not(Box::new(operand)),
		"X" => Term::Next(Box::new(operand)),
		"G" | "[]" => Term::Always(Box::new(operand)),
		"F" | "<>" => Term::Eventually(Box::new(operand)),
		_ => unreachable!(),
	};
	Ok((input, term))
}

fn parse_parenthesized(input: &str) -> ParsingResult<'_, Term> {
	let (input, _): (&str, char) = parse_char::<'('>(input)?;

	let (input, term): (&str, Term) = parse_equiv(input)?;

	let input: &str = blank(input);
	match parse_char::<')'>(input) {
		Ok((input, _)) => Ok((input, term)),
		Err(_) => Err(ParseErrorKind::ExpectedChar(')').failure(input)),
	}
}

fn parse_cexpr(original_input: &str) -> ParsingResult<'_, Term> {
	let (input, _): (&str, char) = parse_char::<'{'>(original_input)?;

	let Some(end) = input.find('}') else {
		return Err(ParseErrorKind::UnterminatedCexpr.failure(original_input));
	};
	let text: &str = &input[..end];
	if text.len() >= CexprTable::MAX_EXPR_LEN {
		return Err(ParseErrorKind::CexprTooLong.failure(original_input));
	}

	Ok((&input[end + 1..], Term::Cexpr(text.to_owned())))
}

fn parse_word(input: &str) -> ParsingResult<'_, Term> {
	let mut chars = input.char_indices();
	match chars.next() {
		Some((_, ch)) if ch.is_ascii_lowercase() => (),
		_ => return Err(ParseErrorKind::ExpectedOperand.error(input)),
	}

	let mut end: usize = input.len();
	for (i, ch) in chars {
		if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_') {
			end = i;
			break;
		}
	}

	let (word, remaining): (&str, &str) = input.split_at(end);
	let term: Term = match word {
		"true" => Term::True,
		"false" => Term::False,
		_ => Term::Predicate(word.to_owned()),
	};
	Ok((remaining, term))
}

fn parse_char<const CHAR: char>(input: &str) -> ParsingResult<'_, char> {
	let mut chars = input.chars();

	if let Some(ch) = chars.next() {
		if ch == CHAR {
			return Ok((chars.as_str(), ch));
		}
	}

	Err(ParseErrorKind::ExpectedChar(CHAR).error(input))
}

fn token_char<const CHAR: char>(input: &str) -> ParsingResult<'_, char> {
	parse_char::<CHAR>(blank(input))
}

fn token<'a, P>(mut parser: P) -> impl Parser<&'a str, Output = P::Output, Error = LtlParsingError<'a>>
where
	P: Parser<&'a str, Error = LtlParsingError<'a>>,
{
	move |input: &'a str| parser.parse(blank(input))
}

/// Skips whitespace; tabs, newlines and '"' are treated as spaces,
/// matching the original tool's pre-lexing substitution.
fn blank(input: &str) -> &str {
	input.trim_start_matches([' ', '\t', '\r', '\n', '"'])
}

// ==================================

fn lower(
	term: &Term,
	symtab: &mut Symtab,
	cexprs: &mut CexprTable,
	cache: &mut Cache,
	simp_log: bool,
) -> Result<Rc<Formula>, ParseErrorKind> {
	let maybe_simplified = |cache: &mut Cache, f: Rc<Formula>| {
		if simp_log { simplify(cache, f) } else { f }
	};

	let f: Rc<Formula> = match term {
		Term::True => Formula::tru(),
		Term::False => Formula::fls(),
		Term::Predicate(name) => Formula::literal(symtab.lookup(name), false),
		Term::Cexpr(text) => {
			let status: String = cexprs.intern(text).ok_or(ParseErrorKind::TooManyCexprs)?;
			Formula::literal(symtab.lookup(&status), false)
		},
		Term::Not(x) => {
			let x: Rc<Formula> = lower(x, symtab, cexprs, cache, simp_log)?;
			let not_x = negated(cache, &x);
			maybe_simplified(cache, not_x)
		},
		Term::Next(x) => {
			let x: Rc<Formula> = lower(x, symtab, cexprs, cache, simp_log)?;
			// X true == true, X false == false
			if simp_log && matches!(*x, Formula::True | Formula::False) {
				x
			} else {
				maybe_simplified(cache, Formula::next(x))
			}
		},
		Term::Always(x) => {
			let x: Rc<Formula> = lower(x, symtab, cexprs, cache, simp_log)?;
			// None keeps the operand as-is instead of wrapping it.
			let body: Option<Rc<Formula>> = if simp_log {
				match &*x {
					// [] true == true, [] false == false
					Formula::True | Formula::False => None,
					Formula::Release(l, r) => {
						if matches!(**l, Formula::False) {
							// [] [] p == [] p
							None
						} else {
							// [] (p V q) == [] q
							Some(r.clone())
						}
					},
					_ => Some(x.clone()),
				}
			} else {
				Some(x.clone())
			};
			match body {
				None => x,
				Some(body) => maybe_simplified(cache, Formula::release(Formula::fls(), body)),
			}
		},
		Term::Eventually(x) => {
			let x: Rc<Formula> = lower(x, symtab, cexprs, cache, simp_log)?;
			let body: Option<Rc<Formula>> = if simp_log {
				match &*x {
					// <> true == true, <> false == false
					Formula::True | Formula::False => None,
					Formula::Until(l, r) => {
						if matches!(**l, Formula::True) {
							// <> <> p == <> p
							None
						} else {
							// <> (p U q) == <> q
							Some(r.clone())
						}
					},
					_ => Some(x.clone()),
				}
			} else {
				Some(x.clone())
			};
			match body {
				None => x,
				Some(body) => maybe_simplified(cache, Formula::until(Formula::tru(), body)),
			}
		},
		Term::And(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			maybe_simplified(cache, Formula::and(a, b))
		},
		Term::Or(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			maybe_simplified(cache, Formula::or(a, b))
		},
		Term::Until(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			maybe_simplified(cache, Formula::until(a, b))
		},
		Term::Release(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			maybe_simplified(cache, Formula::release(a, b))
		},
		Term::Implies(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			if simp_log {
				simplify_implication(cache, a, b)
			} else {
				minimal_implication(cache, a, b)
			}
		},
		Term::Equiv(a, b) => {
			let a: Rc<Formula> = lower(a, symtab, cexprs, cache, simp_log)?;
			let b: Rc<Formula> = lower(b, symtab, cexprs, cache, simp_log)?;
			if simp_log {
				simplify_equivalence(cache, a, b)
			} else {
				minimal_equivalence(cache, a, b)
			}
		},
	};
	Ok(f)
}
