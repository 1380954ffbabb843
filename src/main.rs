// mipscc: C subset to MIPS32 assembly compiler

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser as _;
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use log::debug;

use mipscc::{compile, CompileError};

#[derive(clap::Parser, Debug)]
#[command(name = "mipscc", version)]
#[command(about = "Compile a subset of C to MIPS32 assembly")]
struct Cli {
    /// C source text, or the path of a file holding it
    #[arg(value_name = "PROGRAM")]
    program: String,

    /// Write the assembly here instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version go to stdout and are not failures
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    let source = match load_source(&cli.program) {
        Ok(source) => source,
        Err(err) => {
            report(&format!("cannot read '{}': {}", cli.program, err));
            process::exit(1);
        }
    };

    let asm = match compile(&source) {
        Ok(asm) => asm,
        Err(err) => {
            report_compile_error(&err, &source);
            process::exit(1);
        }
    };

    if let Err(err) = write_output(cli.output.as_ref(), &asm) {
        report(&format!("cannot write assembly: {err}"));
        process::exit(1);
    }
}

/// An argument with whitespace, `{` or `;` is the program itself; anything
/// else names a file.
fn is_inline_source(arg: &str) -> bool {
    arg.chars().any(|c| c.is_whitespace() || c == '{' || c == ';')
}

fn load_source(arg: &str) -> io::Result<String> {
    if is_inline_source(arg) {
        debug!("compiling inline source ({} bytes)", arg.len());
        Ok(arg.to_string())
    } else {
        debug!("reading source from {arg}");
        fs::read_to_string(arg)
    }
}

fn write_output(path: Option<&PathBuf>, asm: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, asm),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(asm.as_bytes())?;
            stdout.flush()
        }
    }
}

fn report(message: &str) {
    if io::stderr().is_tty() {
        eprintln!("{} {}", "error:".red().bold(), message);
    } else {
        eprintln!("error: {message}");
    }
}

fn report_compile_error(err: &CompileError, source: &str) {
    let label = error_label(err, io::stderr().is_tty());
    eprintln!("{label} {}", err.render(source));
}

/// Internal errors are told apart from bad input; colour only on a terminal
fn error_label(err: &CompileError, colour: bool) -> String {
    let label = if err.is_internal() {
        "internal compiler error:"
    } else {
        "error:"
    };

    if !colour {
        label.to_string()
    } else if err.is_internal() {
        label.magenta().bold().to_string()
    } else {
        label.red().bold().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_source_heuristic() {
        assert!(is_inline_source("int main() { return 0; }"));
        assert!(is_inline_source("int main(){return 0;}"));
        assert!(!is_inline_source("prog.c"));
        assert!(!is_inline_source("dir/prog.c"));
    }

    #[test]
    fn test_cli_parses_output_flag() {
        let cli = Cli::try_parse_from(["mipscc", "prog.c", "-o", "prog.s"]).unwrap();
        assert_eq!(cli.program, "prog.c");
        assert_eq!(cli.output, Some(PathBuf::from("prog.s")));

        assert!(Cli::try_parse_from(["mipscc"]).is_err());
        assert!(Cli::try_parse_from(["mipscc", "a.c", "b.c"]).is_err());
    }

    #[test]
    fn test_error_labels() {
        let user = compile("int helper() { return 1; }").unwrap_err();
        let internal = compile("int main() { break; }").unwrap_err();

        assert_eq!(error_label(&user, false), "error:");
        assert_eq!(error_label(&internal, false), "internal compiler error:");

        let coloured = error_label(&internal, true);
        assert!(coloured.contains("internal compiler error:"));
        assert_ne!(coloured, "internal compiler error:");
    }
}
