//! Directive Engine: scans source text for `@Lint<Name>:` headers, binds
//! matchers to actions, and drives matching over a file's text, per
//! spec.md §4.7.
//!
//! Grounded on `original_source/Respect/ResourceLinter.h` (the three
//! duplicated `@Lint*` directive tables) and
//! `original_source/Respect/FileAction.h`.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::location::LineTable;
use crate::regex_facade::RegexFacade;
use crate::signature::{self, CompiledSignature};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Condition {
  All,
  Any,
  Optional,
}

#[derive(Clone, Debug)]
pub struct FileAction {
  pub resource_pattern: String,
  pub condition: Condition,
  pub permutations: Option<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IgnoreKind {
  Missing,
  Unused,
  Warning,
  Error,
}

#[derive(Clone, Debug)]
pub struct IgnoreAction {
  pub kind: IgnoreKind,
  pub pattern: String,
  pub file: String,
  pub line: usize,
  pub matched: std::cell::Cell<bool>,
}

#[derive(Clone, Debug)]
pub struct TextAction {
  pub message: String,
}

#[derive(Clone, Debug)]
pub enum Action {
  File(FileAction),
  Ignore(IgnoreAction),
  Text(TextAction),
}

/// A compiled matcher: an expression signature's regex, plus the actions
/// that fire on every hit.
pub struct Matcher {
  pub signature: CompiledSignature,
  pub regex: RegexFacade,
  pub actions: Vec<Action>,
  pub file: String,
  pub line: usize,
  pub is_default_config: bool,
}

struct DirectiveLine {
  name: String,
  argument: String,
  line_number: usize,
}

/// Scans `text` for `@Lint<Name>:` headers, honoring trailing-backslash
/// line continuations, and returns them in file order.
fn scan_directive_lines(text: &str) -> Vec<DirectiveLine> {
  let mut out = Vec::new();
  let lines: Vec<&str> = text.lines().collect();
  let mut i = 0;

  while i < lines.len() {
    let line = lines[i];
    if let Some(rest) = find_directive_header(line) {
      let (name, mut argument) = rest;
      let line_number = i + 1;

      while argument.ends_with('\\') && i + 1 < lines.len() {
        argument.pop();
        i += 1;
        argument.push_str(lines[i].trim_start());
      }

      out.push(DirectiveLine { name, argument: argument.trim().to_string(), line_number });
    }
    i += 1;
  }

  out
}

fn find_directive_header(line: &str) -> Option<(String, String)> {
  let idx = line.find("@Lint")?;
  let rest = &line[idx + 5..];
  let colon = rest.find(':')?;
  let name = &rest[..colon];
  if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
    return None;
  }
  Some((name.to_string(), rest[colon + 1..].to_string()))
}

/// Parses all directives in `text` (declared in `file`), compiling
/// `@LintExpression:` matchers and binding the actions that follow each
/// one, until a blank directive-less gap or a new `@LintExpression:`
/// scope. Unknown directive names and malformed signatures are reported
/// as [`ConfigError`]s rather than causing the whole scan to fail.
pub fn parse_directives(text: &str, file: &str, is_default_config: bool) -> (Vec<Matcher>, Vec<ConfigError>) {
  let directive_lines = scan_directive_lines(text);
  let mut matchers = Vec::new();
  let mut errors = Vec::new();

  let mut current: Option<(CompiledSignature, RegexFacade, usize)> = None;
  let mut pending_actions: Vec<Action> = Vec::new();

  let flush = |current: &mut Option<(CompiledSignature, RegexFacade, usize)>,
               pending_actions: &mut Vec<Action>,
               matchers: &mut Vec<Matcher>,
               file: &str,
               is_default_config: bool| {
    if let Some((signature, regex, line)) = current.take() {
      matchers.push(Matcher {
        signature,
        regex,
        actions: std::mem::take(pending_actions),
        file: file.to_string(),
        line,
        is_default_config,
      });
    }
  };

  for directive in directive_lines {
    match directive.name.as_str() {
      "Expression" => {
        flush(&mut current, &mut pending_actions, &mut matchers, file, is_default_config);

        match signature::compile(&directive.argument) {
          Ok(sig) => match RegexFacade::new(&sig.pattern) {
            Ok(re) => current = Some((sig, re, directive.line_number)),
            Err(e) => errors.push(ConfigError::new(file, directive.line_number, 0, format!("failed to compile signature regex: {}", e))),
          },
          Err(e) => errors.push(ConfigError::new(file, directive.line_number, e.start, format!("malformed expression signature: {}", e.message))),
        }
      }
      "File" => {
        let (pattern, options) = split_options(&directive.argument);
        let mut condition = Condition::All;
        let mut permutations = None;
        for opt in options {
          match opt.split_once('=') {
            Some(("permutations", v)) => permutations = Some(v.to_string()),
            _ if opt == "optional" => condition = Condition::Optional,
            _ if opt == "any" => condition = Condition::Any,
            _ => errors.push(ConfigError::new(file, directive.line_number, 0, format!("unknown @LintFile option {:?}", opt))),
          }
        }
        pending_actions.push(Action::File(FileAction { resource_pattern: pattern, condition, permutations }));
      }
      "IgnoreMissing" => pending_actions.push(Action::Ignore(IgnoreAction {
        kind: IgnoreKind::Missing,
        pattern: directive.argument,
        file: file.to_string(),
        line: directive.line_number,
        matched: std::cell::Cell::new(false),
      })),
      "IgnoreUnused" => pending_actions.push(Action::Ignore(IgnoreAction {
        kind: IgnoreKind::Unused,
        pattern: directive.argument,
        file: file.to_string(),
        line: directive.line_number,
        matched: std::cell::Cell::new(false),
      })),
      "IgnoreWarning" => pending_actions.push(Action::Ignore(IgnoreAction {
        kind: IgnoreKind::Warning,
        pattern: directive.argument,
        file: file.to_string(),
        line: directive.line_number,
        matched: std::cell::Cell::new(false),
      })),
      "IgnoreError" => pending_actions.push(Action::Ignore(IgnoreAction {
        kind: IgnoreKind::Error,
        pattern: directive.argument,
        file: file.to_string(),
        line: directive.line_number,
        matched: std::cell::Cell::new(false),
      })),
      "DefaultConfig" => pending_actions.push(Action::Text(TextAction { message: directive.argument })),
      other => {
        errors.push(ConfigError::new(file, directive.line_number, 0, format!("unknown directive @Lint{}:", other)));
      }
    }
  }

  flush(&mut current, &mut pending_actions, &mut matchers, file, is_default_config);
  (matchers, errors)
}

fn split_options(argument: &str) -> (String, Vec<String>) {
  let mut parts = crate::strutil::split(argument, " \t", true, None).into_iter().filter(|s| !s.is_empty());
  let pattern = parts.next().unwrap_or_default();
  (pattern, parts.collect())
}

/// One dispatch of a matched `Action` with its matcher's capture groups.
pub struct Hit<'t> {
  pub matcher_file: String,
  pub matcher_line: usize,
  pub location: crate::location::TextLocation,
  pub groups: Vec<(String, (usize, usize), &'t str)>,
}

/// Runs every compiled `matcher` over `text`, in matcher declaration
/// order, returning one [`Hit`] per regex match.
pub fn run_matchers<'t>(matchers: &[Matcher], text: &'t str, lines: &LineTable) -> HashMap<usize, Vec<Hit<'t>>> {
  let mut out = HashMap::new();

  for (idx, matcher) in matchers.iter().enumerate() {
    let hits = matcher
      .regex
      .matches_with_location(text, lines)
      .into_iter()
      .map(|(captured, location)| Hit {
        matcher_file: matcher.file.clone(),
        matcher_line: matcher.line,
        location,
        groups: captured.groups,
      })
      .collect();
    out.insert(idx, hits);
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_expression_and_bound_file_action() {
    let text = "// @LintExpression: @[UIImage imageNamed:$1]\n// @LintFile: $1 optional\n";
    let (matchers, errors) = parse_directives(text, "a.m", false);
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(matchers.len(), 1);
    assert_eq!(matchers[0].actions.len(), 1);
    match &matchers[0].actions[0] {
      Action::File(f) => assert_eq!(f.condition, Condition::Optional),
      _ => panic!("expected a file action"),
    }
  }

  #[test]
  fn unknown_directive_is_a_config_error() {
    let (_, errors) = parse_directives("// @LintBogus: x\n", "a.m", false);
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn malformed_signature_drops_matcher_but_continues() {
    let text = "// @LintExpression: @[UIImage imageNamed:]\n// @LintExpression: FIXME\n";
    let (matchers, errors) = parse_directives(text, "a.m", false);
    assert_eq!(matchers.len(), 1);
    assert_eq!(errors.len(), 1);
  }

  #[test]
  fn line_continuation_is_honored() {
    let text = "// @LintIgnoreUnused: foo_\\\n*.png\n";
    let (matchers, _) = parse_directives(text, "a.m", false);
    assert_eq!(matchers.len(), 0);
    // No matcher is open, so the ignore action is dropped with nothing to
    // bind to; re-parse with a preceding expression to exercise binding.
    let text = "// @LintExpression: FIXME\n// @LintIgnoreUnused: foo_\\\n*.png\n";
    let (matchers, _) = parse_directives(text, "a.m", false);
    assert_eq!(matchers.len(), 1);
    match &matchers[0].actions[0] {
      Action::Ignore(a) => assert_eq!(a.pattern, "foo_*.png"),
      _ => panic!("expected an ignore action"),
    }
  }
}
