//! The decoded-object-graph contract described in spec.md §6: "decode into
//! nested containers (dict, ordered array, string), preserving key
//! insertion order". The raw OpenStep/plist lexer is an external
//! collaborator and out of scope for the core algorithm (spec.md §1), but
//! the unarchiver needs *something* to drive it end to end, so this module
//! also carries a small best-effort reader for the NeXTSTEP property list
//! grammar documented in `gen/xcode.rs`'s module doc comment — no binary
//! plist, no encoding probing, comments limited to `/* ... */`.
//!
//! The unarchiver (`crate::unarchiver`) only ever depends on [`Value`];
//! nothing downstream depends on [`parse`].

use indexmap::IndexMap;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  String(String),
  Array(Vec<Value>),
  Dict(IndexMap<String, Value>),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Value::Array(a) => Some(a),
      _ => None,
    }
  }

  pub fn as_dict(&self) -> Option<&IndexMap<String, Value>> {
    match self {
      Value::Dict(d) => Some(d),
      _ => None,
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.as_dict().and_then(|d| d.get(key))
  }
}

/// Number of bytes in the UTF-8 sequence starting with `first`, per the
/// leading-byte bit pattern. An invalid leading byte reports length 1 so
/// callers make progress instead of looping.
fn utf8_sequence_len(first: u8) -> usize {
  if first & 0x80 == 0 {
    1
  } else if first & 0xE0 == 0xC0 {
    2
  } else if first & 0xF0 == 0xE0 {
    3
  } else if first & 0xF8 == 0xF0 {
    4
  } else {
    1
  }
}

#[derive(Debug, thiserror::Error)]
#[error("plist parse error at byte {offset}: {message}")]
pub struct ParseError {
  pub offset: usize,
  pub message: String,
}

/// Parses a NeXTSTEP/OpenStep property list (the textual format Xcode uses
/// for `project.pbxproj`). Best-effort: it is lenient about unquoted
/// barewords but will reject structurally invalid input.
pub fn parse(text: &str) -> Result<Value, ParseError> {
  let mut p = Parser { bytes: text.as_bytes(), pos: 0 };
  p.skip_trivia();
  let value = p.parse_value()?;
  p.skip_trivia();
  Ok(value)
}

struct Parser<'a> {
  bytes: &'a [u8],
  pos: usize,
}

impl<'a> Parser<'a> {
  fn err(&self, message: impl Into<String>) -> ParseError {
    ParseError { offset: self.pos, message: message.into() }
  }

  fn peek(&self) -> Option<u8> {
    self.bytes.get(self.pos).copied()
  }

  fn bump(&mut self) -> Option<u8> {
    let c = self.peek();
    if c.is_some() {
      self.pos += 1;
    }
    c
  }

  fn skip_trivia(&mut self) {
    loop {
      match self.peek() {
        Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
          self.pos += 1;
        }
        Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
          self.pos += 2;
          while self.pos < self.bytes.len()
            && !(self.bytes[self.pos] == b'*' && self.bytes.get(self.pos + 1) == Some(&b'/'))
          {
            self.pos += 1;
          }
          self.pos = (self.pos + 2).min(self.bytes.len());
        }
        Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
          while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
            self.pos += 1;
          }
        }
        _ => break,
      }
    }
  }

  fn parse_value(&mut self) -> Result<Value, ParseError> {
    self.skip_trivia();
    match self.peek() {
      Some(b'{') => self.parse_dict(),
      Some(b'(') => self.parse_array(),
      Some(b'"') => Ok(Value::String(self.parse_quoted_string()?)),
      Some(_) => Ok(Value::String(self.parse_bareword()?)),
      None => Err(self.err("unexpected end of input")),
    }
  }

  fn parse_dict(&mut self) -> Result<Value, ParseError> {
    self.bump(); // '{'
    let mut map = IndexMap::new();
    loop {
      self.skip_trivia();
      if self.peek() == Some(b'}') {
        self.bump();
        break;
      }
      if self.peek().is_none() {
        return Err(self.err("unterminated dictionary"));
      }

      let key = if self.peek() == Some(b'"') {
        self.parse_quoted_string()?
      } else {
        self.parse_bareword()?
      };

      self.skip_trivia();
      if self.bump() != Some(b'=') {
        return Err(self.err(format!("expected '=' after key {:?}", key)));
      }

      let value = self.parse_value()?;
      map.insert(key, value);

      self.skip_trivia();
      if self.peek() == Some(b';') {
        self.bump();
      }
    }
    Ok(Value::Dict(map))
  }

  fn parse_array(&mut self) -> Result<Value, ParseError> {
    self.bump(); // '('
    let mut items = Vec::new();
    loop {
      self.skip_trivia();
      if self.peek() == Some(b')') {
        self.bump();
        break;
      }
      if self.peek().is_none() {
        return Err(self.err("unterminated array"));
      }

      items.push(self.parse_value()?);

      self.skip_trivia();
      if self.peek() == Some(b',') {
        self.bump();
      }
    }
    Ok(Value::Array(items))
  }

  fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
    self.bump(); // opening quote
    let mut s = String::new();
    loop {
      match self.bump() {
        None => return Err(self.err("unterminated string literal")),
        Some(b'"') => break,
        Some(b'\\') => match self.bump() {
          Some(b'n') => s.push('\n'),
          Some(b't') => s.push('\t'),
          Some(c) => self.push_utf8_char(c, &mut s)?,
          None => return Err(self.err("unterminated escape sequence")),
        },
        Some(c) => self.push_utf8_char(c, &mut s)?,
      }
    }
    Ok(s)
  }

  /// Pushes the UTF-8 character starting at `first` (already consumed by
  /// `bump`) onto `s`, consuming any continuation bytes it needs. Source
  /// text is valid UTF-8 (it came in as `&str`), so this only fails on a
  /// truncated sequence at end of input.
  fn push_utf8_char(&mut self, first: u8, s: &mut String) -> Result<(), ParseError> {
    let len = utf8_sequence_len(first);
    if len == 1 {
      s.push(first as char);
      return Ok(());
    }
    let start = self.pos - 1;
    let end = start + len;
    if end > self.bytes.len() {
      return Err(self.err("truncated utf-8 sequence"));
    }
    match std::str::from_utf8(&self.bytes[start..end]) {
      Ok(text) => {
        s.push_str(text);
        self.pos = end;
        Ok(())
      }
      Err(_) => Err(self.err("invalid utf-8 sequence")),
    }
  }

  fn parse_bareword(&mut self) -> Result<String, ParseError> {
    let start = self.pos;
    while let Some(c) = self.peek() {
      if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' || c == b'$' || c == b'/' || c == b'-' {
        self.pos += 1;
      } else {
        break;
      }
    }
    if self.pos == start {
      return Err(self.err(format!("unexpected character {:?}", self.peek().map(|c| c as char))));
    }
    Ok(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_dict_array_and_strings() {
    let text = r#"{ a = 1; b = (2, "three"); }"#;
    let value = parse(text).unwrap();
    let dict = value.as_dict().unwrap();
    assert_eq!(dict.get("a").unwrap().as_str(), Some("1"));
    let arr = dict.get("b").unwrap().as_array().unwrap();
    assert_eq!(arr[0].as_str(), Some("2"));
    assert_eq!(arr[1].as_str(), Some("three"));
  }

  #[test]
  fn preserves_key_order() {
    let text = r#"{ z = 1; a = 2; m = 3; }"#;
    let value = parse(text).unwrap();
    let keys: Vec<&str> = value.as_dict().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
  }

  #[test]
  fn skips_comments() {
    let text = "{ /* hi */ a = 1 /* trailing */; }";
    let value = parse(text).unwrap();
    assert_eq!(value.get("a").unwrap().as_str(), Some("1"));
  }

  #[test]
  fn rejects_unterminated_dict() {
    assert!(parse("{ a = 1;").is_err());
  }

  #[test]
  fn quoted_strings_preserve_multibyte_characters() {
    let text = "{ name = \"Caf\u{e9} icon \u{1f600}\"; }";
    let value = parse(text).unwrap();
    assert_eq!(value.get("name").unwrap().as_str(), Some("Caf\u{e9} icon \u{1f600}"));
  }
}
