//! Expression Signature Compiler: tokenizes and parses the matcher DSL
//! (`$name(...)`, `@[recv sel:$1]`, bare identifiers) described in
//! spec.md §4.6, compiling it to a [`crate::regex_facade::RegexFacade`]
//! pattern with named captures.
//!
//! Grounded on `original_source/Respect/ExpressionSignature.h`
//! (`ExpressionSignatureToken`, `AbstractMatch`).
//!
//! The grammar's `'$' INT` argument form has no dedicated token in the
//! four-symbol/IDENT/END/UNKNOWN lexer the header enumerates — `IDENT`
//! requires a leading letter or underscore, so a bare `$1` cannot tokenize
//! as `$` + `IDENT`. The lexer here adds a `Number` token purely to make
//! `$1`/`$2` lexable; it carries no semantic weight beyond that.
//!
//! Two occurrences of the same `$N` are compiled to distinct regex
//! capture groups (`arg_N`, `arg_N__2`, ...) rather than a true
//! backreference — the `regex` crate's finite-automaton engine has no
//! backreference support, unlike the PCRE engine the original targets.
//! [`CompiledSignature::group_names_for_arg`] maps each logical argument
//! back to all of its group names so callers can still treat repeated
//! `$N` as one logical slot.

use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq)]
pub struct SignatureError {
  pub start: usize,
  pub end: usize,
  pub message: String,
}

impl std::fmt::Display for SignatureError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}..{}: {}", self.start, self.end, self.message)
  }
}

#[derive(Clone, Debug, PartialEq)]
enum TokKind {
  LBracket,
  RBracket,
  LParen,
  RParen,
  At,
  Dollar,
  Colon,
  Comma,
  Ident(String),
  Number(String),
  End,
  Unknown(char),
}

#[derive(Clone, Debug)]
struct Tok {
  kind: TokKind,
  start: usize,
  end: usize,
}

fn lex(text: &str) -> Vec<Tok> {
  let bytes = text.as_bytes();
  let mut out = Vec::new();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c == b' ' || c == b'\t' {
      i += 1;
      continue;
    }

    let start = i;
    let kind = match c {
      b'[' => { i += 1; TokKind::LBracket }
      b']' => { i += 1; TokKind::RBracket }
      b'(' => { i += 1; TokKind::LParen }
      b')' => { i += 1; TokKind::RParen }
      b'@' => { i += 1; TokKind::At }
      b'$' => { i += 1; TokKind::Dollar }
      b':' => { i += 1; TokKind::Colon }
      b',' => { i += 1; TokKind::Comma }
      c if c.is_ascii_digit() => {
        let s = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
          i += 1;
        }
        TokKind::Number(text[s..i].to_string())
      }
      c if c.is_ascii_alphabetic() || c == b'_' => {
        let s = i;
        while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
          i += 1;
        }
        TokKind::Ident(text[s..i].to_string())
      }
      _ => {
        let ch = text[i..].chars().next().unwrap();
        i += ch.len_utf8();
        TokKind::Unknown(ch)
      }
    };
    out.push(Tok { kind, start, end: i });
  }

  out.push(Tok { kind: TokKind::End, start: bytes.len(), end: bytes.len() });
  out
}

const ARG_BODY: &str = r#"(?:@?"(?:[^"\\]|\\.)*"|\([^()]*\)|\[[^\[\]]*\]|[A-Za-z_][A-Za-z0-9_.]*|[0-9]+(?:\.[0-9]+)?)"#;

struct Parser {
  tokens: Vec<Tok>,
  pos: usize,
  arg_counts: HashMap<String, usize>,
  group_names_for_arg: HashMap<String, Vec<String>>,
  arg_order: Vec<String>,
}

/// The result of compiling one expression signature: a regex pattern
/// string (to be handed to [`crate::regex_facade::RegexFacade::new`]),
/// plus the mapping from logical argument slot to the regex group names
/// that capture it.
#[derive(Clone, Debug)]
pub struct CompiledSignature {
  pub pattern: String,
  pub source: String,
  pub arg_order: Vec<String>,
  pub group_names_for_arg: HashMap<String, Vec<String>>,
}

impl CompiledSignature {
  /// Returns the capture text for logical argument `name` (e.g. `"1"` for
  /// `$1`, or `"bundle"` for a named argument), preferring the first group
  /// that actually captured.
  pub fn resolve_arg<'t>(&self, name: &str, groups: &[(String, (usize, usize), &'t str)]) -> Option<&'t str> {
    let candidates = self.group_names_for_arg.get(name)?;
    for candidate in candidates {
      if let Some((_, _, text)) = groups.iter().find(|(n, _, _)| n == candidate) {
        return Some(text);
      }
    }
    None
  }
}

pub fn compile(source: &str) -> Result<CompiledSignature, SignatureError> {
  let tokens = lex(source);
  let mut parser = Parser {
    tokens,
    pos: 0,
    arg_counts: HashMap::new(),
    group_names_for_arg: HashMap::new(),
    arg_order: Vec::new(),
  };

  let pattern = parser.parse_sig()?;
  parser.expect_end()?;

  Ok(CompiledSignature {
    pattern,
    source: source.to_string(),
    arg_order: parser.arg_order,
    group_names_for_arg: parser.group_names_for_arg,
  })
}

impl Parser {
  fn peek(&self) -> &Tok {
    &self.tokens[self.pos]
  }

  fn peek_at(&self, offset: usize) -> &Tok {
    self.tokens.get(self.pos + offset).unwrap_or_else(|| self.tokens.last().unwrap())
  }

  fn bump(&mut self) -> Tok {
    let t = self.tokens[self.pos].clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    t
  }

  fn error(&self, tok: &Tok, message: impl Into<String>) -> SignatureError {
    SignatureError { start: tok.start, end: tok.end, message: message.into() }
  }

  fn expect_end(&mut self) -> Result<(), SignatureError> {
    if matches!(self.peek().kind, TokKind::End) {
      Ok(())
    } else {
      let tok = self.peek().clone();
      Err(self.error(&tok, "unexpected trailing input"))
    }
  }

  /// `sig := call | objcMessage | ident`
  fn parse_sig(&mut self) -> Result<String, SignatureError> {
    match &self.peek().kind {
      TokKind::Dollar => self.parse_call(),
      TokKind::At => self.parse_obj_message(),
      TokKind::Ident(name) => {
        let name = name.clone();
        self.bump();
        Ok(regex::escape(&name))
      }
      _ => {
        let tok = self.peek().clone();
        Err(self.error(&tok, "expected '$name(...)', '@[...]', or an identifier"))
      }
    }
  }

  /// `call := '$' IDENT '(' argList? ')'`
  fn parse_call(&mut self) -> Result<String, SignatureError> {
    self.bump(); // '$'
    let name = match &self.peek().kind {
      TokKind::Ident(name) => {
        let n = name.clone();
        self.bump();
        n
      }
      _ => {
        let tok = self.peek().clone();
        return Err(self.error(&tok, "expected an identifier after '$'"));
      }
    };

    if !matches!(self.peek().kind, TokKind::LParen) {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected '(' after call name"));
    }
    self.bump();

    let mut args = Vec::new();
    if !matches!(self.peek().kind, TokKind::RParen) {
      loop {
        args.push(self.parse_arg()?);
        if matches!(self.peek().kind, TokKind::Comma) {
          self.bump();
          continue;
        }
        break;
      }
    }

    if !matches!(self.peek().kind, TokKind::RParen) {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected ')' to close call arguments"));
    }
    self.bump();

    Ok(format!(
      r"{}\s*\(\s*{}\s*\)",
      regex::escape(&name),
      args.join(r"\s*,\s*")
    ))
  }

  /// `objcMessage := '@' '[' recv selectorPart+ ']'`
  fn parse_obj_message(&mut self) -> Result<String, SignatureError> {
    self.bump(); // '@'
    if !matches!(self.peek().kind, TokKind::LBracket) {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected '[' after '@'"));
    }
    self.bump();

    let recv = self.parse_recv()?;

    let mut parts = Vec::new();
    loop {
      match &self.peek().kind {
        TokKind::Ident(_) => parts.push(self.parse_selector_part()?),
        _ => break,
      }
      if matches!(self.peek().kind, TokKind::RBracket) {
        break;
      }
    }

    if parts.is_empty() {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected at least one 'selector:arg' part"));
    }

    if !matches!(self.peek().kind, TokKind::RBracket) {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected ']' to close message send"));
    }
    self.bump();

    Ok(format!(r"\[\s*{}\s+{}\s*\]", recv, parts.join(r"\s+")))
  }

  /// `recv := IDENT | '$' IDENT`
  fn parse_recv(&mut self) -> Result<String, SignatureError> {
    match &self.peek().kind {
      TokKind::Ident(name) => {
        let n = name.clone();
        self.bump();
        Ok(regex::escape(&n))
      }
      TokKind::Dollar => {
        self.bump();
        match &self.peek().kind {
          TokKind::Number(n) => {
            let n = n.clone();
            self.bump();
            Ok(self.capture_group(&n))
          }
          TokKind::Ident(n) => {
            let n = n.clone();
            self.bump();
            Ok(self.capture_group(&n))
          }
          _ => {
            let tok = self.peek().clone();
            Err(self.error(&tok, "expected a number or identifier after '$' in receiver position"))
          }
        }
      }
      _ => {
        let tok = self.peek().clone();
        Err(self.error(&tok, "expected a receiver identifier"))
      }
    }
  }

  /// `selectorPart := IDENT ':' arg`
  fn parse_selector_part(&mut self) -> Result<String, SignatureError> {
    let name = match &self.peek().kind {
      TokKind::Ident(n) => {
        let n = n.clone();
        self.bump();
        n
      }
      _ => {
        let tok = self.peek().clone();
        return Err(self.error(&tok, "expected a selector keyword"));
      }
    };

    if !matches!(self.peek().kind, TokKind::Colon) {
      let tok = self.peek().clone();
      return Err(self.error(&tok, "expected ':' after selector keyword"));
    }
    self.bump();

    let arg = self.parse_arg()?;
    Ok(format!(r"{}\s*:\s*{}", regex::escape(&name), arg))
  }

  /// `arg := '$' INT | '$' IDENT | IDENT | sig`
  fn parse_arg(&mut self) -> Result<String, SignatureError> {
    match &self.peek().kind {
      TokKind::At => self.parse_obj_message(),
      TokKind::Dollar => {
        // Disambiguate '$' IDENT '(' ... (a nested call, part of `sig`)
        // from the bare '$' IDENT / '$' INT capture forms.
        if matches!(self.peek_at(1).kind, TokKind::Ident(_)) && matches!(self.peek_at(2).kind, TokKind::LParen) {
          return self.parse_call();
        }
        self.bump();
        match &self.peek().kind {
          TokKind::Number(n) => {
            let n = n.clone();
            self.bump();
            Ok(self.capture_group(&n))
          }
          TokKind::Ident(n) => {
            let n = n.clone();
            self.bump();
            Ok(self.capture_group(&n))
          }
          _ => {
            let tok = self.peek().clone();
            Err(self.error(&tok, "expected a number or identifier after '$'"))
          }
        }
      }
      TokKind::Ident(name) => {
        let n = name.clone();
        self.bump();
        Ok(regex::escape(&n))
      }
      _ => {
        let tok = self.peek().clone();
        Err(self.error(&tok, "expected an argument"))
      }
    }
  }

  /// Allocates (or reuses) a regex group name for logical argument `name`,
  /// recording the mapping needed by [`CompiledSignature::resolve_arg`].
  fn capture_group(&mut self, name: &str) -> String {
    if !self.arg_order.contains(&name.to_string()) {
      self.arg_order.push(name.to_string());
    }

    let count = self.arg_counts.entry(name.to_string()).or_insert(0);
    *count += 1;
    let group_name = if *count == 1 {
      format!("arg_{}", sanitize(name))
    } else {
      format!("arg_{}__{}", sanitize(name), count)
    };

    self
      .group_names_for_arg
      .entry(name.to_string())
      .or_insert_with(Vec::new)
      .push(group_name.clone());

    format!("(?P<{}>{})", group_name, ARG_BODY)
  }
}

/// `name` is always either a digit run or a lexer `IDENT`, both of which
/// are already valid regex group-name characters.
fn sanitize(name: &str) -> &str {
  name
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::regex_facade::RegexFacade;

  #[test]
  fn compiles_objc_message_send() {
    let sig = compile("@[UIImage imageNamed:$1]").unwrap();
    let re = RegexFacade::new(&sig.pattern).unwrap();

    let hits = re.matches(r#"x = [UIImage imageNamed:@"foo"];"#);
    assert_eq!(hits.len(), 1);
    let value = sig.resolve_arg("1", &hits[0].groups).unwrap();
    assert_eq!(value, r#"@"foo""#);

    assert!(re.matches(r#"[UIImage imageNamed:foo bar:1]"#).is_empty());
  }

  #[test]
  fn compiles_multi_keyword_message_send() {
    let sig = compile("@[UIColor colorNamed:$1 bundle:$2]").unwrap();
    let re = RegexFacade::new(&sig.pattern).unwrap();
    let hits = re.matches(r#"[UIColor colorNamed:@"accent" bundle:nil]"#);
    assert_eq!(hits.len(), 1);
    assert_eq!(sig.resolve_arg("1", &hits[0].groups).unwrap(), r#"@"accent""#);
    assert_eq!(sig.resolve_arg("2", &hits[0].groups).unwrap(), "nil");
  }

  #[test]
  fn compiles_dollar_call() {
    let sig = compile("$NSLocalizedString($1,$2)").unwrap();
    let re = RegexFacade::new(&sig.pattern).unwrap();
    let hits = re.matches(r#"NSLocalizedString(@"key", @"comment")"#);
    assert_eq!(hits.len(), 1);
    assert_eq!(sig.resolve_arg("1", &hits[0].groups).unwrap(), r#"@"key""#);
  }

  #[test]
  fn repeated_arg_reference_maps_to_multiple_groups() {
    let sig = compile("$Pair($1,$1)").unwrap();
    assert_eq!(sig.group_names_for_arg.get("1").unwrap().len(), 2);
    let re = RegexFacade::new(&sig.pattern).unwrap();
    assert_eq!(re.matches("Pair(foo,bar)").len(), 1);
  }

  #[test]
  fn malformed_signature_reports_position() {
    let err = compile("@[UIImage imageNamed:]").unwrap_err();
    assert!(err.start > 0);
  }

  #[test]
  fn bare_identifier_compiles_to_literal() {
    let sig = compile("FIXME").unwrap();
    let re = RegexFacade::new(&sig.pattern).unwrap();
    assert_eq!(re.matches("// FIXME: later").len(), 1);
  }
}
