//! Command-line driver for the minijava compiler.
//!
//! `mjc [--offsets] <file.java>...` runs the full pipeline on each input:
//! parse, build the class table and call-site queue, then emit LLVM IR
//! text next to the source as `<file>.ll`. Units are independent: one
//! that fails is reported on stderr and leaves no output file behind,
//! and the driver moves on to the next.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Once;

use thiserror::Error;

static TRACING_INIT: Once = Once::new();

/// Install the tracing subscriber once, only when `RUST_LOG` asks for it.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// Anything that can stop a single unit from compiling.
#[derive(Debug, Error)]
enum UnitError {
    #[error(transparent)]
    Parse(#[from] mj_parse::ParseError),
    #[error(transparent)]
    Symbols(#[from] mj_types::SymbolError),
    #[error(transparent)]
    Codegen(#[from] mj_llvm::CodegenError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn print_usage() {
    eprintln!("Usage: mjc [--offsets] <file.java>...");
}

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let display_offsets = args.iter().any(|arg| arg == "--offsets");
    let files: Vec<&String> = args
        .iter()
        .filter(|arg| arg.as_str() != "--offsets")
        .collect();

    if let Some(flag) = files.iter().find(|arg| arg.starts_with("--")) {
        eprintln!("Unknown flag: {flag}");
        print_usage();
        std::process::exit(1);
    }

    if files.is_empty() {
        print_usage();
        std::process::exit(1);
    }

    let mut failed = false;
    for file in files {
        if let Err(error) = compile_unit(file, display_offsets) {
            eprintln!("{file}: {error}");
            failed = true;
        }
    }

    if !display_offsets {
        println!("To view field and method offsets for each class rerun with --offsets");
    }

    if failed {
        std::process::exit(1);
    }
}

/// Run both passes over one source file and write its `.ll` next to it.
fn compile_unit(path: &str, display_offsets: bool) -> Result<(), UnitError> {
    tracing::debug!(path, "compiling unit");

    let source = fs::read_to_string(path)?;
    let program = mj_parse::parse(&source)?;
    let symbols = mj_types::build(&program)?;

    if display_offsets {
        print!("{}", mj_types::offsets_report(&symbols.classes));
    }

    let out_path = output_path(path);
    let mut out = io::BufWriter::new(fs::File::create(&out_path)?);

    let emitted = mj_llvm::generate(&program, symbols, &mut out)
        .map_err(UnitError::from)
        .and_then(|()| out.flush().map_err(UnitError::from));

    if let Err(error) = emitted {
        drop(out);
        let _ = fs::remove_file(&out_path);
        return Err(error);
    }

    tracing::debug!(output = %out_path.display(), "unit emitted");
    Ok(())
}

/// `Foo.java` becomes `Foo.ll`; a name without the suffix gets `.ll`
/// appended whole.
fn output_path(path: &str) -> PathBuf {
    match path.strip_suffix(".java") {
        Some(stem) => PathBuf::from(format!("{stem}.ll")),
        None => PathBuf::from(format!("{path}.ll")),
    }
}
