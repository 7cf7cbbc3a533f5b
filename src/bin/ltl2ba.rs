use std::io;
use std::io::BufWriter;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::ValueEnum;
use thiserror::Error;

use ltl2ba::Flags;
use ltl2ba::OutputMode;
use ltl2ba::parser::ParseError;

/// Translator from LTL formulas to Büchi automata.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
	/// Translate this LTL formula into a never claim.
	#[arg(
		short = 'f',
		value_name = "formula",
		required_unless_present = "file",
		conflicts_with = "file"
	)]
	formula: Option<String>,

	/// Like -f, but with the LTL formula stored in a file.
	#[arg(short = 'F', value_name = "file")]
	file: Option<PathBuf>,

	/// Disable the trick in the acceptance conditions.
	#[arg(short = 'a')]
	no_accept_trick: bool,

	/// Disable the strongly-connected-components simplification.
	#[arg(short = 'c')]
	no_scc: bool,

	/// Disable the on-the-fly simplification.
	#[arg(short = 'o')]
	no_fly: bool,

	/// Disable the a-posteriori simplification.
	#[arg(short = 'p')]
	no_post: bool,

	/// Disable the logic formula simplification.
	#[arg(short = 'l')]
	no_logic: bool,

	/// Display the automaton description at each step, on stderr.
	#[arg(short = 'd')]
	verbose: bool,

	/// Computing time and automata sizes statistics, on stderr.
	#[arg(short = 's')]
	stats: bool,

	/// Output mode.
	#[arg(short = 'O', value_enum, value_name = "mode", default_value = "spin")]
	output: Mode,

	/// Symbol prefix for the C output.
	#[arg(short = 'P', value_name = "prefix", default_value = "_ltl2ba")]
	prefix: String,

	/// Invert the formula once read.
	#[arg(short = 'i')]
	invert: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
	Spin,
	C,
	Dot,
}

impl From<Mode> for OutputMode {
	fn from(mode: Mode) -> Self {
		match mode {
			Mode::Spin => Self::Spin,
			Mode::C => Self::C,
			Mode::Dot => Self::Dot,
		}
	}
}

#[derive(Debug, Error)]
enum Error {
	#[error("cannot open {path}: {source}")]
	ReadFile { path: PathBuf, source: io::Error },

	#[error("write error: {0}")]
	Write(io::Error),
}

fn main() -> ExitCode {
	let args: Args = match Args::try_parse() {
		Ok(args) => args,
		Err(err) => {
			let usage_error: bool = !matches!(
				err.kind(),
				clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
			);
			let _ = err.print();
			return if usage_error { ExitCode::FAILURE } else { ExitCode::SUCCESS };
		},
	};

	match run(args) {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("ltl2ba: {err}");
			ExitCode::FAILURE
		},
	}
}

fn run(args: Args) -> Result<(), Error> {
	let formula: String = match (&args.formula, &args.file) {
		(Some(formula), None) => formula.clone(),
		(None, Some(path)) => std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
			path: path.clone(),
			source,
		})?,
		_ => unreachable!("clap enforces exactly one of -f/-F"),
	};

	// Keep the formula single-line for the diagnostics and the emitted
	// comments.
	let mut formula: String = formula.replace(['\t', '"', '\n', '\r'], " ");
	if args.invert {
		formula = format!("!({})", formula);
	}

	let flags: Flags = Flags {
		simp_log: !args.no_logic,
		simp_diff: !args.no_post,
		simp_fly: !args.no_fly,
		simp_scc: !args.no_scc,
		fj_to_fj: !args.no_accept_trick,
		verbose: args.verbose,
		stats: args.stats,
	};

	let mut out: BufWriter<io::StdoutLock<'_>> = BufWriter::new(io::stdout().lock());
	match ltl2ba::translate(&formula, &flags, args.output.into(), &args.prefix, &mut out) {
		Ok(()) => (),
		Err(ltl2ba::Error::Parse(err)) => {
			report_parse_error(&formula, &err);
			std::process::exit(1);
		},
		Err(ltl2ba::Error::Io(err)) => return Err(Error::Write(err)),
	}
	out.flush().map_err(Error::Write)?;

	Ok(())
}

/// Mirrors the classic diagnostic: the message, the formula, and a caret
/// under the offending column.
fn report_parse_error(formula: &str, err: &ParseError<'_>) {
	eprintln!("ltl2ba: {err}");
	eprintln!("ltl2ba: {formula}");
	let dashes: usize = "ltl2ba: ".len() + err.column();
	eprintln!("{}^", "-".repeat(dashes));
}
