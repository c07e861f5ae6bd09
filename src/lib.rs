//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and strictly ordered:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge, resolves variables to frame
//!   slots and returns the program IR.
//! - `codegen` lowers the IR into Morpho assembly.
//! - `error` centralises reporting utilities shared by the other modules.
//!
//! Each call to [`compile`] builds fresh parser and generator state, so
//! repeated compilations in one process are independent. A single
//! compilation is strictly sequential: parsing finishes before any code
//! generation starts.

pub mod error;
pub mod parser;
pub mod tokenizer;

mod codegen;


pub use error::{CompileError, CompileResult};

/// Compile nanoMorpho source into Morpho assembly, one instruction per
/// line. `name` names the resulting executable in the program preamble.
pub fn compile(name: &str, source: &str) -> CompileResult<Vec<String>> {
  let tokens = tokenizer::tokenize(source);
  let program = parser::parse(tokens)?;
  Ok(codegen::generate(name, &program))
}
