use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{ArgGroup, Parser};
use snafu::{ResultExt, Snafu};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rgoc::{CompileError, dump};

/// Compile a small Go-flavoured package into x86-64 assembly.
#[derive(Debug, Parser)]
#[command(name = "rgoc", version)]
#[command(group(ArgGroup::new("source").required(true).args(["source_text", "build"])))]
struct Args {
  /// Compile this source text directly.
  #[arg(long = "in", value_name = "SOURCE")]
  source_text: Option<String>,

  /// Compile the source file at this path.
  #[arg(long, value_name = "FILE")]
  build: Option<PathBuf>,

  /// Write the assembly here instead of stdout.
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// Dump tokens and the typed tree to stderr.
  #[arg(long)]
  dev: bool,
}

#[derive(Debug, Snafu)]
enum CliError {
  #[snafu(display("cannot read {}: {source}", path.display()))]
  ReadSource {
    path: PathBuf,
    source: std::io::Error,
  },
  #[snafu(display("cannot write {}: {source}", path.display()))]
  WriteOutput {
    path: PathBuf,
    source: std::io::Error,
  },
  #[snafu(display("{source}"))]
  Compile { source: CompileError },
}

fn init_tracing() {
  // Stdout carries the assembly, so events only go to stderr and only on request.
  if std::env::var("RUST_LOG").is_ok() {
    tracing_subscriber::registry()
      .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
      .with(EnvFilter::from_default_env())
      .init();
  }
}

fn run(args: Args) -> Result<(), CliError> {
  let source = match &args.build {
    Some(path) => fs::read_to_string(path).context(ReadSourceSnafu { path: path.clone() })?,
    None => args.source_text.clone().unwrap_or_default(),
  };

  let compilation = rgoc::compile(&source).context(CompileSnafu)?;

  if args.dev {
    eprintln!("{}", dump::tokens(&compilation.tokens));
    eprint!("{}", dump::program(&compilation.program));
  }

  match &args.output {
    Some(path) => {
      fs::write(path, &compilation.asm).context(WriteOutputSnafu { path: path.clone() })?
    }
    None => print!("{}", compilation.asm),
  }
  Ok(())
}

fn main() {
  init_tracing();
  let args = Args::parse();
  if let Err(err) = run(args) {
    eprintln!("{err}");
    process::exit(1);
  }
}
