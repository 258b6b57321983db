//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the program tree.
//! - `typeck` binds leftover names, types every expression and lays out frames.
//! - `codegen` lowers the typed program into x86-64 Intel-syntax assembly,
//!   calling into the routines in `runtime` for `print`/`println`.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod ast;
pub mod dump;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod ty;
pub mod typeck;

mod codegen;
mod runtime;

use tracing::debug;

pub use error::{CompileError, CompileResult, ErrorKind, Location};

/// Everything one run produces, kept around for the development dump.
#[derive(Debug)]
pub struct Compilation {
  pub tokens: Vec<tokenizer::Token>,
  pub program: ast::Program,
  pub asm: String,
}

/// Run every stage over `source`.
pub fn compile(source: &str) -> CompileResult<Compilation> {
  let tokens = tokenizer::tokenize(source)?;
  let mut program = parser::parse(tokens.clone(), source)?;
  typeck::resolve(&mut program, source)?;
  let asm = codegen::generate(&program);
  debug!(bytes = asm.len(), "compilation finished");
  Ok(Compilation {
    tokens,
    program,
    asm,
  })
}

/// Compile a source string into Intel-syntax assembly.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  compile(source).map(|compilation| compilation.asm)
}
