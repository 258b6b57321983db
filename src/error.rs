//! Shared error utilities used across the compilation pipeline.
//!
//! Every stage fails fast: the first problem becomes a `CompileError` that is
//! propagated to the binary, which prints it and exits. Diagnostics point at
//! the offending byte with a caret under the source line that contains it.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Which stage rejected the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lex,
  Parse,
  Name,
  Type,
  Bounds,
}

/// Line/column of a byte offset plus the rendered source excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
  pub offset: usize,
  pub line: usize,
  pub column: usize,
  pub snippet: String,
  pub marker: String,
}

impl Location {
  /// Resolve a byte offset into the line containing it.
  pub fn resolve(source: &str, offset: usize) -> Self {
    let offset = offset.min(source.len());
    let line_start = source[..offset].rfind('\n').map_or(0, |nl| nl + 1);
    let line_end = source[offset..]
      .find('\n')
      .map_or(source.len(), |nl| offset + nl);
    let line = source[..line_start].matches('\n').count() + 1;
    let column = source[line_start..offset].chars().count();
    Self {
      offset,
      line,
      column: column + 1,
      snippet: source[line_start..line_end].to_string(),
      marker: format!("{}^", " ".repeat(column)),
    }
  }
}

impl fmt::Display for Location {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}\n{}", self.snippet, self.marker)
  }
}

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{}:{}: lex error: {message}\n{at}", at.line, at.column))]
  Lex { at: Location, message: String },

  #[snafu(display("{}:{}: parse error: {message}\n{at}", at.line, at.column))]
  Parse { at: Location, message: String },

  #[snafu(display("{}:{}: name error: {message}\n{at}", at.line, at.column))]
  Name { at: Location, message: String },

  #[snafu(display("{}:{}: type error: {message}\n{at}", at.line, at.column))]
  Type { at: Location, message: String },

  #[snafu(display("{}:{}: bounds error: {message}\n{at}", at.line, at.column))]
  Bounds { at: Location, message: String },
}

impl CompileError {
  /// Construct an error anchored at a specific byte offset in the source.
  pub fn at(kind: ErrorKind, source: &str, loc: usize, message: impl Into<String>) -> Self {
    let at = Location::resolve(source, loc);
    let message = message.into();
    match kind {
      ErrorKind::Lex => Self::Lex { at, message },
      ErrorKind::Parse => Self::Parse { at, message },
      ErrorKind::Name => Self::Name { at, message },
      ErrorKind::Type => Self::Type { at, message },
      ErrorKind::Bounds => Self::Bounds { at, message },
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Lex { .. } => ErrorKind::Lex,
      Self::Parse { .. } => ErrorKind::Parse,
      Self::Name { .. } => ErrorKind::Name,
      Self::Type { .. } => ErrorKind::Type,
      Self::Bounds { .. } => ErrorKind::Bounds,
    }
  }

  pub fn location(&self) -> &Location {
    match self {
      Self::Lex { at, .. }
      | Self::Parse { at, .. }
      | Self::Name { at, .. }
      | Self::Type { at, .. }
      | Self::Bounds { at, .. } => at,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Lex { message, .. }
      | Self::Parse { message, .. }
      | Self::Name { message, .. }
      | Self::Type { message, .. }
      | Self::Bounds { message, .. } => message,
    }
  }
}
