//! Parser for the xcconfig (Xcode build configuration) file format: a
//! line-oriented `KEY = value` language with `$(VAR)` references (left
//! unexpanded — the caller decides how to resolve them), `#include`, and
//! conditional key suffixes like `FOO[sdk=iphoneos*][arch=arm64]`.
//!
//! Grounded on `original_source/PBXProject/XCConfigParser.h`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::ConfigError;

/// A `$(VAR)` or `$(VAR:modifier)` reference found inside a raw value,
/// recorded but not expanded.
#[derive(Clone, Debug, PartialEq)]
pub struct VarRef {
  pub start: usize,
  pub end: usize,
  pub name: String,
  pub modifier: Option<String>,
}

/// The unexpanded right-hand side of an assignment, plus the spans of any
/// `$(VAR)` references inside it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawValue {
  pub text: String,
  pub references: Vec<VarRef>,
}

/// A parsed xcconfig file: an ordered map from verbatim key (including any
/// `[cond=val]` suffixes) to its unexpanded value.
#[derive(Clone, Debug, Default)]
pub struct XcconfigFile {
  pub entries: IndexMap<String, RawValue>,
}

impl XcconfigFile {
  pub fn get(&self, key: &str) -> Option<&RawValue> {
    self.entries.get(key)
  }
}

/// Parses `path`, resolving `#include` directives relative to the
/// including file (or to `include_base_path` when given). Include cycles
/// produce a `ConfigError` and parsing continues with whatever was already
/// read; this function never panics or aborts on a bad include.
pub fn parse_file(path: &Path, include_base_path: Option<&Path>) -> (XcconfigFile, Vec<ConfigError>) {
  let mut visited = HashSet::new();
  let mut errors = Vec::new();
  let mut out = XcconfigFile::default();
  parse_file_into(path, include_base_path, &mut visited, &mut out, &mut errors);
  (out, errors)
}

fn parse_file_into(
  path: &Path,
  include_base_path: Option<&Path>,
  visited: &mut HashSet<PathBuf>,
  out: &mut XcconfigFile,
  errors: &mut Vec<ConfigError>,
) {
  let canon = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
  if !visited.insert(canon.clone()) {
    errors.push(ConfigError::new(
      display(path),
      0,
      0,
      format!("include cycle detected at {:?}", path),
    ));
    return;
  }

  let text = match std::fs::read_to_string(path) {
    Ok(t) => t,
    Err(e) => {
      errors.push(ConfigError::new(display(path), 0, 0, format!("failed to read: {}", e)));
      visited.remove(&canon);
      return;
    }
  };

  parse_str_into(&text, path, include_base_path, visited, out, errors);
  visited.remove(&canon);
}

/// Parses `text` as if it were the contents of `file` (used for error
/// messages and to resolve relative includes), without requiring the
/// caller to have a file on disk for the top-level text.
pub fn parse_str(text: &str, file: &Path, include_base_path: Option<&Path>) -> (XcconfigFile, Vec<ConfigError>) {
  let mut visited = HashSet::new();
  let mut errors = Vec::new();
  let mut out = XcconfigFile::default();
  parse_str_into(text, file, include_base_path, &mut visited, &mut out, &mut errors);
  (out, errors)
}

fn parse_str_into(
  text: &str,
  file: &Path,
  include_base_path: Option<&Path>,
  visited: &mut HashSet<PathBuf>,
  out: &mut XcconfigFile,
  errors: &mut Vec<ConfigError>,
) {
  for (idx, raw_line) in text.lines().enumerate() {
    let line_number = idx + 1;
    let line = strip_comment(raw_line).trim();
    if line.is_empty() {
      continue;
    }

    if let Some(rest) = line.strip_prefix("#include") {
      let rest = rest.trim();
      match parse_quoted_path(rest) {
        Some(include_path) => {
          let dir = include_base_path.unwrap_or_else(|| file.parent().unwrap_or_else(|| Path::new(".")));
          let resolved = dir.join(include_path);
          parse_file_into(&resolved, include_base_path, visited, out, errors);
        }
        None => errors.push(ConfigError::new(
          display(file),
          line_number,
          0,
          format!("malformed #include directive: {:?}", rest),
        )),
      }
      continue;
    }

    match parse_assignment(line) {
      Some((key, raw_value)) => {
        out.entries.insert(key, raw_value);
      }
      None => {
        errors.push(ConfigError::new(display(file), line_number, 0, format!("malformed line: {:?}", line)));
      }
    }
  }
}

fn display(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

fn strip_comment(line: &str) -> &str {
  match line.find("//") {
    Some(i) => &line[..i],
    None => line,
  }
}

fn parse_quoted_path(s: &str) -> Option<&str> {
  let s = s.trim();
  if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
    Some(&s[1..s.len() - 1])
  } else if !s.is_empty() && !s.contains(' ') {
    Some(s)
  } else {
    None
  }
}

/// Splits `line` at the first top-level `=` (not inside a `$()`/`[]`
/// group) into `(key_with_conditions, raw_value)`.
fn parse_assignment(line: &str) -> Option<(String, RawValue)> {
  let bytes = line.as_bytes();
  let mut depth = 0i32;
  let mut eq = None;

  for (i, &b) in bytes.iter().enumerate() {
    match b {
      b'(' | b'[' => depth += 1,
      b')' | b']' => depth -= 1,
      b'=' if depth == 0 => {
        eq = Some(i);
        break;
      }
      _ => {}
    }
  }

  let eq = eq?;
  let key = line[..eq].trim().to_string();
  if key.is_empty() {
    return None;
  }
  let value_text = line[eq + 1..].trim().to_string();
  let references = find_var_refs(&value_text);

  Some((key, RawValue { text: value_text, references }))
}

fn find_var_refs(text: &str) -> Vec<VarRef> {
  let bytes = text.as_bytes();
  let mut refs = Vec::new();
  let mut i = 0;

  while i < bytes.len() {
    if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'(') {
      if let Some(close) = find_matching_paren(bytes, i + 1) {
        let inner = &text[i + 2..close];
        let (name, modifier) = match inner.split_once(':') {
          Some((n, m)) => (n.to_string(), Some(m.to_string())),
          None => (inner.to_string(), None),
        };
        refs.push(VarRef { start: i, end: close + 1, name, modifier });
        i = close + 1;
        continue;
      }
    } else if bytes[i] == b'$' && bytes.get(i + 1).map_or(false, |c| is_ident_start(*c)) {
      let start = i + 1;
      let mut end = start;
      while end < bytes.len() && is_ident_continue(bytes[end]) {
        end += 1;
      }
      refs.push(VarRef { start: i, end, name: text[start..end].to_string(), modifier: None });
      i = end;
      continue;
    }
    i += 1;
  }

  refs
}

fn find_matching_paren(bytes: &[u8], open: usize) -> Option<usize> {
  let mut depth = 0i32;
  for (i, &b) in bytes.iter().enumerate().skip(open) {
    match b {
      b'(' => depth += 1,
      b')' => {
        depth -= 1;
        if depth == 0 {
          return Some(i);
        }
      }
      _ => {}
    }
  }
  None
}

fn is_ident_start(c: u8) -> bool {
  c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
  c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn parses_simple_assignment() {
    let (file, errors) = parse_str("FOO = a$(BAR)c", Path::new("x.xcconfig"), None);
    assert!(errors.is_empty());
    let v = file.get("FOO").unwrap();
    assert_eq!(v.text, "a$(BAR)c");
    assert_eq!(v.references.len(), 1);
    assert_eq!(v.references[0].name, "BAR");
  }

  #[test]
  fn keeps_conditions_in_key() {
    let (file, _) = parse_str("FOO[sdk=iphoneos*][arch=arm64] = 1", Path::new("x.xcconfig"), None);
    assert!(file.entries.contains_key("FOO[sdk=iphoneos*][arch=arm64]"));
  }

  #[test]
  fn skips_comments_and_blank_lines() {
    let (file, errors) = parse_str("// comment\n\nFOO = 1 // trailing\n", Path::new("x.xcconfig"), None);
    assert!(errors.is_empty());
    assert_eq!(file.get("FOO").unwrap().text, "1");
  }

  #[test]
  fn reports_malformed_line() {
    let (_, errors) = parse_str("not an assignment", Path::new("x.xcconfig"), None);
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn resolves_includes_relative_to_file() {
    let dir = std::env::temp_dir().join(format!("reslint-xcconfig-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let base_path = dir.join("base.xcconfig");
    let included_path = dir.join("included.xcconfig");
    std::fs::write(&included_path, "BAR = 1\n").unwrap();
    let mut f = std::fs::File::create(&base_path).unwrap();
    writeln!(f, "#include \"included.xcconfig\"\nFOO = 2").unwrap();

    let (file, errors) = parse_file(&base_path, None);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(file.get("BAR").unwrap().text, "1");
    assert_eq!(file.get("FOO").unwrap().text, "2");

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn detects_include_cycles() {
    let dir = std::env::temp_dir().join(format!("reslint-xcconfig-cycle-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a = dir.join("a.xcconfig");
    let b = dir.join("b.xcconfig");
    std::fs::write(&a, "#include \"b.xcconfig\"\n").unwrap();
    std::fs::write(&b, "#include \"a.xcconfig\"\n").unwrap();

    let (_, errors) = parse_file(&a, None);
    assert!(!errors.is_empty());

    std::fs::remove_dir_all(&dir).ok();
  }
}
