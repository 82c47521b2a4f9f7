//! IPPcode23 interpreter CLI.
//!
//! Reads a source XML document (from `--source=PATH` or stdin), loads and
//! validates it, and executes it against an input stream (`--input=PATH`
//! or stdin). At least one of the two paths must be given, otherwise both
//! would compete for stdin.
//!
//! Exit codes:
//! - 0: success (or `EXIT 0` in the program)
//! - 10: missing/invalid command-line arguments
//! - 11: a source or input file could not be opened
//! - 31/32/52: load-time diagnostics
//! - 52-58: runtime diagnostics
//! - 99: internal error

use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process;

use ippcode_common::{exit_code, Program};

const USAGE: &str = "\
Usage: ippcode [--help] [--source=PATH] [--input=PATH]

Options:
  --help           Print this usage text and exit
  --source=PATH    XML source file (default: standard input)
  --input=PATH     Input stream for READ (default: standard input)

At least one of --source or --input must be given.
";

/// Parsed command surface.
#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    help: bool,
    source: Option<String>,
    input: Option<String>,
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    process::exit(run(&args));
}

fn run(args: &[String]) -> i32 {
    let opts = match parse_args(args) {
        Ok(opts) => opts,
        Err(message) => {
            eprintln!("error: {message}");
            eprint!("{USAGE}");
            return exit_code::BAD_ARGS;
        }
    };

    if opts.help {
        if opts.source.is_some() || opts.input.is_some() {
            eprintln!("error: --help cannot be combined with other options");
            return exit_code::BAD_ARGS;
        }
        print!("{USAGE}");
        return exit_code::OK;
    }

    if opts.source.is_none() && opts.input.is_none() {
        eprintln!("error: at least one of --source or --input is required");
        eprint!("{USAGE}");
        return exit_code::BAD_ARGS;
    }

    let xml = match read_source(opts.source.as_deref()) {
        Ok(xml) => xml,
        Err(code) => return code,
    };

    let program = match ippcode_loader::load(&xml) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("error: {e}");
            return e.exit_code();
        }
    };

    match &opts.input {
        Some(path) => match fs::File::open(path) {
            Ok(file) => interpret(&program, BufReader::new(file)),
            Err(e) => {
                eprintln!("error: cannot open '{path}': {e}");
                exit_code::CANNOT_OPEN_INPUT
            }
        },
        None => interpret(&program, io::stdin().lock()),
    }
}

/// Parse the flag surface. Both `--flag=value` and `--flag value`
/// spellings are accepted.
fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut opts = Options::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--help" {
            opts.help = true;
        } else if let Some(path) = arg.strip_prefix("--source=") {
            opts.source = Some(path.to_string());
        } else if arg == "--source" {
            let path = iter.next().ok_or("--source requires a value")?;
            opts.source = Some(path.clone());
        } else if let Some(path) = arg.strip_prefix("--input=") {
            opts.input = Some(path.to_string());
        } else if arg == "--input" {
            let path = iter.next().ok_or("--input requires a value")?;
            opts.input = Some(path.clone());
        } else {
            return Err(format!("unknown argument '{arg}'"));
        }
    }

    Ok(opts)
}

/// Read the source XML from the given path, or all of stdin.
fn read_source(path: Option<&str>) -> Result<String, i32> {
    match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            eprintln!("error: cannot read '{path}': {e}");
            exit_code::CANNOT_OPEN_INPUT
        }),
        None => {
            let mut xml = String::new();
            io::stdin().read_to_string(&mut xml).map_err(|e| {
                eprintln!("error: cannot read standard input: {e}");
                exit_code::CANNOT_OPEN_INPUT
            })?;
            Ok(xml)
        }
    }
}

/// Execute the program, flushing stdout at termination.
fn interpret<R: BufRead>(program: &Program, input: R) -> i32 {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let status = match ippcode_vm::run(program, input, &mut out) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };

    if out.flush().is_err() {
        return exit_code::INTERNAL;
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_empty() {
        assert_eq!(parse_args(&[]), Ok(Options::default()));
    }

    #[test]
    fn parse_equals_form() {
        let opts = parse_args(&args(&["--source=a.xml", "--input=in.txt"])).unwrap();
        assert_eq!(opts.source.as_deref(), Some("a.xml"));
        assert_eq!(opts.input.as_deref(), Some("in.txt"));
        assert!(!opts.help);
    }

    #[test]
    fn parse_space_form() {
        let opts = parse_args(&args(&["--source", "a.xml"])).unwrap();
        assert_eq!(opts.source.as_deref(), Some("a.xml"));
    }

    #[test]
    fn parse_help() {
        let opts = parse_args(&args(&["--help"])).unwrap();
        assert!(opts.help);
    }

    #[test]
    fn parse_rejects_unknown_flags() {
        assert!(parse_args(&args(&["--frobnicate"])).is_err());
        assert!(parse_args(&args(&["extra"])).is_err());
    }

    #[test]
    fn parse_rejects_missing_value() {
        assert!(parse_args(&args(&["--source"])).is_err());
        assert!(parse_args(&args(&["--input"])).is_err());
    }

    #[test]
    fn last_occurrence_wins() {
        let opts = parse_args(&args(&["--source=a.xml", "--source=b.xml"])).unwrap();
        assert_eq!(opts.source.as_deref(), Some("b.xml"));
    }
}
