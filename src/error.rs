//! Error taxonomy, per spec.md §7: structural errors abort a load, config
//! errors and lint findings are accumulated as data and never surfaced as
//! `Result::Err`.

use std::fmt;

use thiserror::Error;

use crate::location::TextLocation;

/// A fatal error: malformed project archive, unresolvable object id, or a
/// missing mandatory field. Aborts the whole load.
#[derive(Debug, Error)]
pub enum StructuralError {
  #[error("object id {0:?} does not resolve to any object")]
  UnresolvedObjectId(String),

  #[error("object {0:?} is missing mandatory field {1:?}")]
  MissingField(String, &'static str),

  #[error("no root object in project archive")]
  MissingRootObject,

  #[error("root object {0:?} did not resolve to a project")]
  RootObjectNotAProject(String),

  #[error("failed to read {path:?}: {source}")]
  Io {
    path: std::path::PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// A per-line/per-directive error, carrying enough location information to
/// report against a file. Never fatal; accumulated in `configErrors`.
#[derive(Clone, Debug)]
pub struct ConfigError {
  pub file: String,
  pub line: usize,
  pub column: usize,
  pub message: String,
}

impl ConfigError {
  pub fn new(file: impl Into<String>, line: usize, column: usize, message: impl Into<String>) -> Self {
    ConfigError { file: file.into(), line, column, message: message.into() }
  }

  pub fn at(file: impl Into<String>, loc: TextLocation, message: impl Into<String>) -> Self {
    ConfigError::new(file, loc.line_number, loc.in_line_start, message)
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
  }
}

pub type RespectResult<T> = Result<T, StructuralError>;
