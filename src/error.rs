//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose – one message anchored to a
//! source line and column, reported once. The parser fails fast on the first
//! error; only the driver decides what to do with it.

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{message} (line: {line}, column: {column})"))]
  WithLocation {
    message: String,
    line: usize,
    column: usize,
  },
}

impl CompileError {
  /// Construct an error anchored at a specific source position.
  pub fn at(line: usize, column: usize, message: impl Into<String>) -> Self {
    Self::WithLocation {
      message: message.into(),
      line,
      column,
    }
  }
}
