//! A thin wrapper around the `regex` crate matching the contract described
//! in spec.md §4.2: callers enumerate matches over a UTF-8 byte buffer and
//! get back captures as codepoint-indexed ranges, plus an optional overlay
//! that resolves matches to `(line_number, in_line_range)` pairs using a
//! precomputed line table.
//!
//! Grounded on `original_source/PCRegularExpression/PCRegularExpression.h`,
//! whose `enumerateMatchesInUTF8CString:...` and
//! `enumerateMatchesWithLineNumberInUTF8CString:...` are the two methods
//! this facade exposes as `matches` and `matches_with_location`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::location::{LineTable, TextLocation};

static TRAILING_FLAGS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]+$").unwrap());

#[derive(Debug)]
pub struct RegexFacade {
  regex: Regex,
}

#[derive(Debug)]
pub struct Captured<'t> {
  pub byte_range: (usize, usize),
  pub codepoint_range: (usize, usize),
  pub text: &'t str,
  // Named group ranges, in codepoints, keyed by group name.
  pub groups: Vec<(String, (usize, usize), &'t str)>,
}

impl RegexFacade {
  /// Compiles `pattern` as-is.
  pub fn new(pattern: &str) -> Result<Self, regex::Error> {
    Ok(RegexFacade { regex: Regex::new(pattern)? })
  }

  /// Compiles a `"<pattern>/<flags>"` form, where `flags` is a suffix of
  /// single-letter inline flags (currently only `i` for case-insensitivity
  /// is recognized) appended after the last unescaped `/`.
  pub fn with_flags(pattern_and_flags: &str) -> Result<Self, regex::Error> {
    let (pattern, flags) = split_trailing_flags(pattern_and_flags);
    let mut full = String::new();
    if !flags.is_empty() {
      full.push_str("(?");
      full.push_str(&flags);
      full.push(')');
    }
    full.push_str(pattern);
    Self::new(&full)
  }

  /// Enumerates matches over `text`, yielding codepoint-indexed capture
  /// ranges built from a byte→codepoint table computed once per call.
  pub fn matches<'t>(&self, text: &'t str) -> Vec<Captured<'t>> {
    let table = ByteToCodepoint::new(text);
    self
      .regex
      .captures_iter(text)
      .map(|caps| to_captured(&self.regex, &caps, text, &table))
      .collect()
  }

  /// Like `matches`, but additionally resolves each match's start to a
  /// `(line_number, in_line_range)` pair using `lines`.
  pub fn matches_with_location<'t>(
    &self,
    text: &'t str,
    lines: &LineTable,
  ) -> Vec<(Captured<'t>, TextLocation)> {
    self
      .matches(text)
      .into_iter()
      .map(|cap| {
        let len = cap.byte_range.1 - cap.byte_range.0;
        let loc = lines.text_location(cap.byte_range.0, len);
        (cap, loc)
      })
      .collect()
  }
}

fn to_captured<'t>(
  regex: &Regex,
  caps: &regex::Captures<'t>,
  text: &'t str,
  table: &ByteToCodepoint,
) -> Captured<'t> {
  let whole = caps.get(0).unwrap();
  let mut groups = Vec::new();

  for name in regex.capture_names().flatten() {
    if let Some(m) = caps.name(name) {
      groups.push((
        name.to_string(),
        (table.to_codepoint(m.start()), table.to_codepoint(m.end())),
        m.as_str(),
      ));
    }
  }

  Captured {
    byte_range: (whole.start(), whole.end()),
    codepoint_range: (table.to_codepoint(whole.start()), table.to_codepoint(whole.end())),
    text: whole.as_str(),
    groups,
  }
}

fn split_trailing_flags(s: &str) -> (&str, &str) {
  if let Some(idx) = s.rfind('/') {
    let (pattern, rest) = s.split_at(idx);
    let flags = &rest[1..];
    if TRAILING_FLAGS_RE.is_match(flags) {
      return (pattern, flags);
    }
  }
  (s, "")
}

/// Maps byte offsets to codepoint offsets in a single left-to-right pass,
/// memoizing the cumulative codepoint count at each char boundary.
struct ByteToCodepoint {
  // (byte_offset, codepoint_offset) pairs, sorted by byte_offset.
  boundaries: Vec<(usize, usize)>,
}

impl ByteToCodepoint {
  fn new(text: &str) -> Self {
    let mut boundaries = Vec::with_capacity(text.len() + 1);
    let mut codepoints = 0;
    for (byte_offset, _) in text.char_indices() {
      boundaries.push((byte_offset, codepoints));
      codepoints += 1;
    }
    boundaries.push((text.len(), codepoints));
    ByteToCodepoint { boundaries }
  }

  fn to_codepoint(&self, byte_offset: usize) -> usize {
    match self.boundaries.binary_search_by_key(&byte_offset, |&(b, _)| b) {
      Ok(i) => self.boundaries[i].1,
      Err(i) => self.boundaries[i.saturating_sub(1)].1,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn named_captures_report_codepoint_ranges() {
    let re = RegexFacade::new(r#"\[UIImage imageNamed:(?P<arg_1>@"[^"]*")\]"#).unwrap();
    let text = r#"x = [UIImage imageNamed:@"foo"];"#;
    let matches = re.matches(text);
    assert_eq!(matches.len(), 1);
    let (_, _, value) = matches[0]
      .groups
      .iter()
      .find(|(name, _, _)| name == "arg_1")
      .unwrap();
    assert_eq!(*value, r#"@"foo""#);
  }

  #[test]
  fn unicode_offsets_are_codepoints_not_bytes() {
    let re = RegexFacade::new("b(?P<x>c)").unwrap();
    let text = "é bc";
    let m = &re.matches(text)[0];
    // 'é' is 2 bytes but 1 codepoint; "bc" starts at codepoint index 2.
    assert_eq!(m.codepoint_range.0, 2);
  }

  #[test]
  fn line_overlay_resolves_location() {
    let re = RegexFacade::new("needle").unwrap();
    let text = "line1\nline2 needle\nline3";
    let lines = LineTable::new(text);
    let hits = re.matches_with_location(text, &lines);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1.line_number, 2);
  }

  #[test]
  fn with_flags_parses_trailing_flags() {
    let re = RegexFacade::with_flags("foo/i").unwrap();
    assert_eq!(re.matches("FOO").len(), 1);
  }
}
