//! Linter Core: orchestrates components 1-9 and produces the result lists
//! described in spec.md §4.9 and §7 — missing references, unused resources,
//! lint warnings/errors, config errors and the ignore-config bookkeeping
//! each of those is filtered through.
//!
//! Grounded on `original_source/Respect/ResourceLinter.h`: the `Linter`
//! struct's public fields mirror that header's `NSMutableArray`/
//! `NSMutableDictionary` properties one for one, and [`LinterSource`]
//! mirrors its `ResourceLinterSource` protocol.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::directive::{self, Action, Condition, IgnoreKind, Matcher};
use crate::error::ConfigError;
use crate::location::{LineTable, TextLocation};
use crate::resolver::{self, BundleIndex, BundleResource, CaseMismatch, ResourceReference};

/// Mirrors `ResourceLinterSourceTargetType`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TargetType {
  IOS,
  Unknown,
}

/// One source text file: its name plus full content. Line ranges are
/// computed on demand by the linter rather than stored, since only files
/// that actually get scanned need one.
#[derive(Clone, Debug)]
pub struct SourceTextFile {
  pub name: String,
  pub content: String,
}

/// The `ResourceLinterSource` protocol: anything that can supply source
/// text, a bundle resource index and project/target metadata can drive the
/// linter. [`crate::model::ProjectModel`] is one implementor; tests may
/// provide a second, hand-built one.
pub trait LinterSource {
  fn source_text_files(&self) -> &[SourceTextFile];
  fn resources(&self) -> &IndexMap<String, String>;
  fn lint_warnings(&self) -> &[String];
  fn lint_errors(&self) -> &[String];
  fn project_name(&self) -> &str;
  fn project_path(&self) -> &str;
  fn source_root(&self) -> &str;
  fn target_name(&self) -> &str;
  fn configuration_name(&self) -> &str;
  fn known_regions(&self) -> &[String];
  fn target_type(&self) -> TargetType;
  fn deployment_target(&self) -> &str;
  fn default_config_text_file(&self) -> Option<&SourceTextFile>;
}

/// A case-mismatch finding surfaced as a lint warning, per spec.md §4.8
/// rule 4.
#[derive(Clone, Debug)]
pub struct CaseMismatchWarning {
  pub resource_path: String,
  pub requested: String,
  pub actual: String,
}

/// An ignore directive that never matched anything during the run; per
/// spec.md §7, this is itself a visible finding.
#[derive(Clone, Debug)]
pub struct UnusedIgnoreConfig {
  pub kind: IgnoreKind,
  pub pattern: String,
  pub file: String,
  pub line: usize,
}

enum Phase {
  Scanning,
  Resolving,
  Reporting,
}

/// Owns every mutable collection the linter accumulates while scanning, and
/// the four (plus ignore-bookkeeping) result lists it produces once done.
pub struct Linter {
  matchers: Vec<Matcher>,

  pub bundle_resources: IndexMap<String, String>,
  lowercase_bundle_resources: HashMap<String, Vec<String>>,

  referenced: indexmap::IndexSet<String>,
  pub missing_references: Vec<ResourceReference>,
  pub missing_references_ignored: Vec<ResourceReference>,
  pub unused_resources: Vec<String>,
  pub unused_resources_ignored: Vec<String>,
  pub case_mismatch_warnings: Vec<CaseMismatchWarning>,

  pub lint_warnings: Vec<String>,
  pub lint_warnings_ignored: Vec<String>,
  pub lint_errors: Vec<String>,
  pub lint_errors_ignored: Vec<String>,

  pub config_errors: Vec<ConfigError>,

  pub unused_ignore_configs: Vec<UnusedIgnoreConfig>,
  pub missing_ignore_configs: Vec<UnusedIgnoreConfig>,
  pub warning_ignore_configs: Vec<UnusedIgnoreConfig>,
  pub error_ignore_configs: Vec<UnusedIgnoreConfig>,

  phase: Phase,
}

impl Linter {
  /// Runs the full sequence described in spec.md §4.9 against `source`:
  /// loads directives (and the default config text file, when
  /// `parse_default_config` is set), populates the bundle index, scans
  /// every source text file, resolves references, and partitions each
  /// result list through its ignore filters.
  pub fn run(source: &dyn LinterSource, parse_default_config: bool) -> Linter {
    tracing::info!(target = source.target_name(), "linter: scanning");

    let mut linter = Linter {
      matchers: Vec::new(),
      bundle_resources: source.resources().clone(),
      lowercase_bundle_resources: resolver::build_lowercase_index(source.resources()),
      referenced: indexmap::IndexSet::new(),
      missing_references: Vec::new(),
      missing_references_ignored: Vec::new(),
      unused_resources: Vec::new(),
      unused_resources_ignored: Vec::new(),
      case_mismatch_warnings: Vec::new(),
      lint_warnings: source.lint_warnings().to_vec(),
      lint_warnings_ignored: Vec::new(),
      lint_errors: source.lint_errors().to_vec(),
      lint_errors_ignored: Vec::new(),
      config_errors: Vec::new(),
      unused_ignore_configs: Vec::new(),
      missing_ignore_configs: Vec::new(),
      warning_ignore_configs: Vec::new(),
      error_ignore_configs: Vec::new(),
      phase: Phase::Scanning,
    };

    linter.load_directives(source, parse_default_config);
    linter.scan(source);

    tracing::info!("linter: resolving");
    linter.phase = Phase::Resolving;
    linter.compute_unused();

    tracing::info!("linter: reporting");
    linter.phase = Phase::Reporting;
    linter.apply_ignore_filters();

    linter
  }

  /// Loads directives from every source text file plus, when requested,
  /// the target's default-config text file. Per spec.md §4.7/§4.9, a
  /// `@LintDefaultConfig:` directive attaches *another* file's directives to
  /// the scan, so each file visited here also has its own
  /// `@LintDefaultConfig:` paths read from disk and recursively folded in,
  /// guarded against include cycles by canonical path.
  fn load_directives(&mut self, source: &dyn LinterSource, parse_default_config: bool) {
    let mut loaded_default_configs: HashSet<PathBuf> = HashSet::new();

    if parse_default_config {
      if let Some(default_config) = source.default_config_text_file() {
        loaded_default_configs.insert(canonical_or_self(Path::new(&default_config.name)));
        self.load_directive_text(&default_config.content, &default_config.name, true, &mut loaded_default_configs);
      }
    }

    for file in source.source_text_files() {
      self.load_directive_text(&file.content, &file.name, false, &mut loaded_default_configs);
    }
  }

  /// Parses `text` (declared in `file`) into matchers, registers them, and
  /// follows any `@LintDefaultConfig:` paths it names — reading each file
  /// from disk and recursively feeding its text back through this same
  /// method, marked as default-config matchers.
  fn load_directive_text(&mut self, text: &str, file: &str, is_default_config: bool, loaded: &mut HashSet<PathBuf>) {
    let (matchers, errors) = directive::parse_directives(text, file, is_default_config);

    for error in &errors {
      tracing::debug!(file = %error.file, line = error.line, "config error: {}", error.message);
    }
    self.config_errors.extend(errors);

    let default_config_paths: Vec<(usize, String)> = matchers
      .iter()
      .flat_map(|m| m.actions.iter().map(move |a| (m.line, a)))
      .filter_map(|(line, action)| match action {
        Action::Text(text_action) => Some((line, text_action.message.clone())),
        _ => None,
      })
      .collect();

    self.matchers.extend(matchers);

    for (line, path) in default_config_paths {
      let canonical = canonical_or_self(Path::new(&path));
      if !loaded.insert(canonical) {
        tracing::debug!(path = %path, "skipping already-loaded @LintDefaultConfig file (cycle)");
        continue;
      }

      match std::fs::read_to_string(&path) {
        Ok(content) => self.load_directive_text(&content, &path, true, loaded),
        Err(e) => {
          tracing::debug!(path = %path, "could not read @LintDefaultConfig file: {}", e);
          self.config_errors.push(ConfigError::at(
            file,
            TextLocation::line(line),
            format!("could not read @LintDefaultConfig file {:?}: {}", path, e),
          ));
        }
      }
    }
  }

  /// Runs every compiled matcher over every source text file, in matcher
  /// declaration order, dispatching the actions bound to each hit. Matchers
  /// are taken out of `self` for the duration of the scan so that
  /// [`Linter::dispatch`] can mutate the rest of `self` while still reading
  /// matcher data by reference.
  fn scan(&mut self, source: &dyn LinterSource) {
    let matchers = std::mem::take(&mut self.matchers);

    let mut files: Vec<&SourceTextFile> = source.source_text_files().iter().collect();
    files.sort_by(|a, b| a.name.cmp(&b.name));

    for file in files {
      let lines = LineTable::new(&file.content);
      let hits = directive::run_matchers(&matchers, &file.content, &lines);

      for (matcher_index, matcher) in matchers.iter().enumerate() {
        let Some(file_hits) = hits.get(&matcher_index) else { continue };
        for hit in file_hits {
          for action in &matcher.actions {
            self.dispatch(matcher, action, hit);
          }
        }
      }
    }

    self.matchers = matchers;
  }

  /// `@LintFile:` actions fire once per regex hit; `@LintIgnore*:` actions
  /// are declarative and applied wholesale in [`Linter::apply_ignore_filters`]
  /// once scanning completes, regardless of whether their owning matcher
  /// ever hit; `@LintDefaultConfig:` actions are consumed even earlier, in
  /// [`Linter::load_directive_text`], since the files they name contribute
  /// their own matchers to the scan rather than firing on a hit.
  fn dispatch(&mut self, matcher: &Matcher, action: &Action, hit: &directive::Hit<'_>) {
    if let Action::File(file_action) = action {
      self.dispatch_file_action(matcher, file_action, hit);
    }
  }

  fn dispatch_file_action(&mut self, matcher: &Matcher, file_action: &crate::directive::FileAction, hit: &directive::Hit<'_>) {
    let resource_path = match substitute_args(&file_action.resource_pattern, matcher, hit) {
      Some(p) => p,
      None => {
        tracing::debug!(file = %hit.matcher_file, "argument substitution failed for @LintFile pattern");
        return;
      }
    };

    let pattern = match &file_action.permutations {
      Some(perm) => substitute_args(perm, matcher, hit).unwrap_or(resource_path.clone()),
      None => resource_path.clone(),
    };

    let index = BundleIndex::new(&self.bundle_resources, &self.lowercase_bundle_resources);
    let outcome = resolver::resolve(&pattern, file_action.condition, &index);

    for bundle_resource in &outcome.hits {
      self.referenced.insert(bundle_resource.bundle_path.clone());
    }

    for mismatch in &outcome.case_mismatches {
      self.case_mismatch_warnings.push(CaseMismatchWarning {
        resource_path: resource_path.clone(),
        requested: mismatch.requested.clone(),
        actual: mismatch.actual.clone(),
      });
    }

    if let Some(missing) = &outcome.missing {
      let hint = build_reference_hint(file_action.condition, &missing.candidate);
      self.missing_references.push(ResourceReference {
        resource_path: missing.candidate.clone(),
        reference_path: hit.matcher_file.clone(),
        location: hit.location,
        reference_hint: hint,
        matches: Vec::new(),
        missing_resource_hint: missing.suggestion.clone(),
      });
    }
  }

  fn compute_unused(&mut self) {
    let mut unused: Vec<String> = self
      .bundle_resources
      .keys()
      .filter(|path| !self.referenced.contains(path.as_str()))
      .cloned()
      .collect();
    unused.sort();
    self.unused_resources = unused;
  }

  /// Collects the `@LintIgnore*` actions bound to every matcher, applies
  /// them to each result list, and records which ignore rules never
  /// matched anything (themselves a finding, per spec.md §7).
  fn apply_ignore_filters(&mut self) {
    let mut missing_ignores = Vec::new();
    let mut unused_ignores = Vec::new();
    let mut warning_ignores = Vec::new();
    let mut error_ignores = Vec::new();

    for matcher in &self.matchers {
      for action in &matcher.actions {
        if let Action::Ignore(ignore) = action {
          match ignore.kind {
            IgnoreKind::Missing => missing_ignores.push(ignore),
            IgnoreKind::Unused => unused_ignores.push(ignore),
            IgnoreKind::Warning => warning_ignores.push(ignore),
            IgnoreKind::Error => error_ignores.push(ignore),
          }
        }
      }
    }

    let (missing_kept, missing_ignored) = partition(
      std::mem::take(&mut self.missing_references),
      |m| &m.resource_path,
      &missing_ignores,
    );
    self.missing_references = missing_kept;
    self.missing_references_ignored = missing_ignored;

    let (unused_kept, unused_ignored) = partition(std::mem::take(&mut self.unused_resources), |u| u, &unused_ignores);
    self.unused_resources = unused_kept;
    self.unused_resources_ignored = unused_ignored;

    let (warnings_kept, warnings_ignored) =
      partition(std::mem::take(&mut self.lint_warnings), |w| w, &warning_ignores);
    self.lint_warnings = warnings_kept;
    self.lint_warnings_ignored = warnings_ignored;

    let (errors_kept, errors_ignored) = partition(std::mem::take(&mut self.lint_errors), |e| e, &error_ignores);
    self.lint_errors = errors_kept;
    self.lint_errors_ignored = errors_ignored;

    self.missing_ignore_configs = unmatched(&missing_ignores);
    self.unused_ignore_configs = unmatched(&unused_ignores);
    self.warning_ignore_configs = unmatched(&warning_ignores);
    self.error_ignore_configs = unmatched(&error_ignores);
  }

  pub fn referenced_resources(&self) -> impl Iterator<Item = &str> {
    self.referenced.iter().map(String::as_str)
  }
}

/// Canonicalizes `path` for cycle detection, falling back to the path
/// as-is when it can't be resolved on disk (matching `xcconfig`'s include
/// cycle guard).
fn canonical_or_self(path: &Path) -> PathBuf {
  path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn unmatched(ignores: &[&crate::directive::IgnoreAction]) -> Vec<UnusedIgnoreConfig> {
  ignores
    .iter()
    .filter(|i| !i.matched.get())
    .map(|i| UnusedIgnoreConfig { kind: i.kind, pattern: i.pattern.clone(), file: i.file.clone(), line: i.line })
    .collect()
}

/// Splits `items` into (kept, ignored) using `glob::Pattern` matching
/// against every ignore's pattern, marking each ignore that fires.
fn partition<T>(
  items: Vec<T>,
  key: impl Fn(&T) -> &str,
  ignores: &[&crate::directive::IgnoreAction],
) -> (Vec<T>, Vec<T>) {
  let mut kept = Vec::new();
  let mut ignored = Vec::new();

  'items: for item in items {
    for ignore in ignores {
      if let Ok(glob) = glob::Pattern::new(&ignore.pattern) {
        if glob.matches(key(&item)) {
          ignore.matched.set(true);
          ignored.push(item);
          continue 'items;
        }
      }
    }
    kept.push(item);
  }

  (kept, ignored)
}

fn build_reference_hint(condition: Condition, resource_path: &str) -> String {
  match condition {
    Condition::All => format!("missing required resource permutation {:?}", resource_path),
    Condition::Any => format!("none of the expected permutations of {:?} resolved", resource_path),
    Condition::Optional => format!("optional resource {:?} not found", resource_path),
  }
}

/// Substitutes `$1`, `$2`, ... (and named args) in `pattern` with the
/// matching capture group's text from `hit`, using `matcher`'s compiled
/// signature to map logical argument names to group names.
fn substitute_args(pattern: &str, matcher: &Matcher, hit: &directive::Hit<'_>) -> Option<String> {
  let mut out = String::new();
  let bytes = pattern.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    if bytes[i] == b'$' && bytes.get(i + 1).map_or(false, u8::is_ascii_digit) {
      let start = i + 1;
      let mut end = start;
      while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
      }
      let arg_name = &pattern[start..end];
      let value = matcher.signature.resolve_arg(arg_name, &hit.groups)?;
      out.push_str(&strip_objc_literal(value));
      i = end;
      continue;
    }

    let ch = pattern[i..].chars().next().unwrap();
    out.push(ch);
    i += ch.len_utf8();
  }

  Some(out)
}

/// Matched argument text for an Objective-C string literal capture
/// (`@"foo"`) still carries its `@"..."` quoting; callers building a
/// resource path want the bare text.
fn strip_objc_literal(text: &str) -> String {
  let stripped = text.strip_prefix('@').unwrap_or(text);
  if stripped.len() >= 2 && stripped.starts_with('"') && stripped.ends_with('"') {
    stripped[1..stripped.len() - 1].to_string()
  } else {
    stripped.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct FakeSource {
    files: Vec<SourceTextFile>,
    resources: IndexMap<String, String>,
  }

  impl LinterSource for FakeSource {
    fn source_text_files(&self) -> &[SourceTextFile] {
      &self.files
    }
    fn resources(&self) -> &IndexMap<String, String> {
      &self.resources
    }
    fn lint_warnings(&self) -> &[String] {
      &[]
    }
    fn lint_errors(&self) -> &[String] {
      &[]
    }
    fn project_name(&self) -> &str {
      "Demo"
    }
    fn project_path(&self) -> &str {
      "/tmp/Demo.xcodeproj"
    }
    fn source_root(&self) -> &str {
      "/tmp"
    }
    fn target_name(&self) -> &str {
      "App"
    }
    fn configuration_name(&self) -> &str {
      "Debug"
    }
    fn known_regions(&self) -> &[String] {
      &[]
    }
    fn target_type(&self) -> TargetType {
      TargetType::IOS
    }
    fn deployment_target(&self) -> &str {
      "15.0"
    }
    fn default_config_text_file(&self) -> Option<&SourceTextFile> {
      None
    }
  }

  fn resources(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
  }

  #[test]
  fn referenced_resource_is_not_unused() {
    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: "// @LintExpression: @[UIImage imageNamed:$1]\n// @LintFile: $1\nx = [UIImage imageNamed:@\"icon.png\"];\n"
          .to_string(),
      }],
      resources: resources(&[("icon.png", "/src/icon.png")]),
    };

    let linter = Linter::run(&source, false);
    assert!(linter.missing_references.is_empty());
    assert!(linter.unused_resources.is_empty());
  }

  #[test]
  fn missing_reference_gets_reported_with_suggestion() {
    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: "// @LintExpression: @[UIImage imageNamed:$1]\n// @LintFile: $1\nx = [UIImage imageNamed:@\"splsh.png\"];\n"
          .to_string(),
      }],
      resources: resources(&[("splash.png", "/src/splash.png")]),
    };

    let linter = Linter::run(&source, false);
    assert_eq!(linter.missing_references.len(), 1);
    assert_eq!(linter.missing_references[0].missing_resource_hint.as_deref(), Some("splash.png"));
  }

  #[test]
  fn unreferenced_resource_is_reported_unused() {
    let source = FakeSource {
      files: vec![SourceTextFile { name: "a.m".to_string(), content: "nothing to see here\n".to_string() }],
      resources: resources(&[("unused_asset.png", "/src/unused_asset.png")]),
    };

    let linter = Linter::run(&source, false);
    assert_eq!(linter.unused_resources, vec!["unused_asset.png".to_string()]);
  }

  #[test]
  fn ignore_unused_moves_resource_out_and_is_not_itself_unused() {
    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: "// @LintExpression: FIXME\n// @LintIgnoreUnused: unused_*.png\n".to_string(),
      }],
      resources: resources(&[("unused_asset.png", "/src/unused_asset.png")]),
    };

    let linter = Linter::run(&source, false);
    assert!(linter.unused_resources.is_empty());
    assert_eq!(linter.unused_resources_ignored, vec!["unused_asset.png".to_string()]);
    assert!(linter.unused_ignore_configs.is_empty());
  }

  #[test]
  fn ignore_that_matches_nothing_is_its_own_finding() {
    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: "// @LintExpression: FIXME\n// @LintIgnoreUnused: nonexistent_*.png\n".to_string(),
      }],
      resources: resources(&[("icon.png", "/src/icon.png")]),
    };

    let linter = Linter::run(&source, false);
    assert_eq!(linter.unused_resources, vec!["icon.png".to_string()]);
    assert_eq!(linter.unused_ignore_configs.len(), 1);
  }

  #[test]
  fn lint_default_config_loads_matchers_from_named_file() {
    let dir = std::env::temp_dir().join(format!("reslint-linter-default-config-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let shared_path = dir.join("shared.lint");
    std::fs::write(
      &shared_path,
      "// @LintExpression: @[UIImage imageNamed:$1]\n// @LintFile: $1\n",
    )
    .unwrap();

    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: format!("// @LintDefaultConfig: {}\nx = [UIImage imageNamed:@\"splsh.png\"];\n", shared_path.display()),
      }],
      resources: resources(&[("splash.png", "/src/splash.png")]),
    };

    let linter = Linter::run(&source, false);
    assert_eq!(linter.missing_references.len(), 1);
    assert_eq!(linter.missing_references[0].missing_resource_hint.as_deref(), Some("splash.png"));

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn lint_default_config_cycle_is_not_followed_twice() {
    let dir = std::env::temp_dir().join(format!("reslint-linter-default-config-cycle-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a_path = dir.join("a.lint");
    let b_path = dir.join("b.lint");
    std::fs::write(&a_path, format!("// @LintDefaultConfig: {}\n", b_path.display())).unwrap();
    std::fs::write(&b_path, format!("// @LintDefaultConfig: {}\n", a_path.display())).unwrap();

    let source = FakeSource {
      files: vec![SourceTextFile {
        name: "a.m".to_string(),
        content: format!("// @LintDefaultConfig: {}\n", a_path.display()),
      }],
      resources: IndexMap::new(),
    };

    // Must terminate rather than recursing forever.
    let linter = Linter::run(&source, false);
    assert!(linter.config_errors.is_empty());

    std::fs::remove_dir_all(&dir).ok();
  }

  #[test]
  fn config_errors_are_never_filtered() {
    let source = FakeSource {
      files: vec![SourceTextFile { name: "a.m".to_string(), content: "// @LintBogus: x\n".to_string() }],
      resources: IndexMap::new(),
    };

    let linter = Linter::run(&source, false);
    assert_eq!(linter.config_errors.len(), 1);
  }
}
