//! Reference Resolver: permutation expansion, bundle index lookup
//! (exact-case and case-insensitive) and miss -> suggestion, per spec.md
//! §4.8.
//!
//! Grounded on `original_source/Respect/ResourceReference.h` (the
//! `ResourceReference` record this module builds) and
//! `original_source/Respect/FileAction.h` (the `All`/`Any`/`Optional`
//! condition this module classifies against).

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::directive::Condition;
use crate::location::TextLocation;

/// One bundle resource a reference resolved to.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleResource {
  pub bundle_path: String,
  pub build_path: String,
}

/// The resolved record emitted per matcher hit, per spec.md §3.
#[derive(Clone, Debug)]
pub struct ResourceReference {
  pub resource_path: String,
  pub reference_path: String,
  pub location: TextLocation,
  pub reference_hint: String,
  pub matches: Vec<BundleResource>,
  pub missing_resource_hint: Option<String>,
}

/// A borrowed view over a Linter's exact-case and lowercase bundle
/// indices; cheap to construct per resolve call since it only borrows.
pub struct BundleIndex<'a> {
  exact: &'a IndexMap<String, String>,
  lowercase: &'a HashMap<String, Vec<String>>,
}

impl<'a> BundleIndex<'a> {
  pub fn new(exact: &'a IndexMap<String, String>, lowercase: &'a HashMap<String, Vec<String>>) -> Self {
    BundleIndex { exact, lowercase }
  }

  fn lookup_exact(&self, path: &str) -> Option<&'a String> {
    self.exact.get(path)
  }

  fn lookup_case_insensitive(&self, path: &str) -> Option<&'a str> {
    self
      .lowercase
      .get(&path.to_lowercase())
      .and_then(|variants| variants.first())
      .map(String::as_str)
  }
}

/// Builds the lowercase index described in spec.md §3: for each lowercased
/// bundle path, the set (here: first-seen ordered list) of case-variants
/// present.
pub fn build_lowercase_index(resources: &IndexMap<String, String>) -> HashMap<String, Vec<String>> {
  let mut out: HashMap<String, Vec<String>> = HashMap::new();
  for bundle_path in resources.keys() {
    out.entry(bundle_path.to_lowercase()).or_default().push(bundle_path.clone());
  }
  out
}

/// One permutation that failed to resolve, plus its suggestion (if any).
#[derive(Clone, Debug)]
pub struct MissingCandidate {
  pub candidate: String,
  pub suggestion: Option<String>,
}

/// One case-insensitive hit: the requested (exact-case) candidate and the
/// bundle path it actually matched.
#[derive(Clone, Debug)]
pub struct CaseMismatch {
  pub requested: String,
  pub actual: String,
}

pub struct ResolveOutcome {
  pub hits: Vec<BundleResource>,
  pub case_mismatches: Vec<CaseMismatch>,
  pub missing: Option<MissingCandidate>,
}

/// Resolves `pattern` (which may contain `{a,b}` brace-permutation groups)
/// against `index`, classifying the result per `condition`:
///
/// - `All`: every permutation must resolve; the first unresolved one is
///   reported missing otherwise.
/// - `Any`: at least one permutation must resolve; the first unresolved
///   one is reported missing otherwise.
/// - `Optional`: unresolved permutations are silent.
pub fn resolve(pattern: &str, condition: Condition, index: &BundleIndex) -> ResolveOutcome {
  let candidates = crate::strutil::permutations(pattern, ('{', '}'), ",");

  let mut hits = Vec::new();
  let mut case_mismatches = Vec::new();
  let mut first_missing: Option<String> = None;

  for candidate in &candidates {
    if let Some(build_path) = index.lookup_exact(candidate) {
      hits.push(BundleResource { bundle_path: candidate.clone(), build_path: build_path.clone() });
      continue;
    }

    if let Some(actual) = index.lookup_case_insensitive(candidate) {
      let build_path = index.lookup_exact(actual).cloned().unwrap_or_default();
      hits.push(BundleResource { bundle_path: actual.to_string(), build_path });
      case_mismatches.push(CaseMismatch { requested: candidate.clone(), actual: actual.to_string() });
      continue;
    }

    if first_missing.is_none() {
      first_missing = Some(candidate.clone());
    }
  }

  let missing = match condition {
    Condition::All if hits.len() < candidates.len() => first_missing.map(|c| build_missing(&c, index)),
    Condition::Any if hits.is_empty() => first_missing.map(|c| build_missing(&c, index)),
    _ => None,
  };

  ResolveOutcome { hits, case_mismatches, missing }
}

fn build_missing(candidate: &str, index: &BundleIndex) -> MissingCandidate {
  let threshold = crate::strutil::adaptive_suggestion_threshold(candidate.chars().count());
  let pool = index.exact.keys().map(String::as_str);
  let suggestion = crate::strutil::best_suggestion(candidate, pool, threshold).map(str::to_string);
  MissingCandidate { candidate: candidate.to_string(), suggestion }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn index_of(pairs: &[(&str, &str)]) -> (IndexMap<String, String>, HashMap<String, Vec<String>>) {
    let mut exact = IndexMap::new();
    for (k, v) in pairs {
      exact.insert(k.to_string(), v.to_string());
    }
    let lowercase = build_lowercase_index(&exact);
    (exact, lowercase)
  }

  #[test]
  fn all_condition_resolves_every_permutation() {
    let (exact, lowercase) = index_of(&[("icon.png", "/src/icon.png"), ("icon@2x.png", "/src/icon@2x.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("icon{@2x,}.png", Condition::All, &index);
    assert_eq!(outcome.hits.len(), 2);
    assert!(outcome.missing.is_none());
  }

  #[test]
  fn all_condition_reports_first_unresolved() {
    let (exact, lowercase) = index_of(&[("icon.png", "/src/icon.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("icon{@2x,}.png", Condition::All, &index);
    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.missing.unwrap().candidate, "icon@2x.png");
  }

  #[test]
  fn any_condition_is_satisfied_by_a_single_hit() {
    let (exact, lowercase) = index_of(&[("icon.png", "/src/icon.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("icon{@2x,}.png", Condition::Any, &index);
    assert!(outcome.missing.is_none());
  }

  #[test]
  fn optional_condition_never_reports_missing() {
    let (exact, lowercase) = index_of(&[]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("splash.png", Condition::Optional, &index);
    assert!(outcome.missing.is_none());
    assert!(outcome.hits.is_empty());
  }

  #[test]
  fn case_insensitive_hit_is_reported_as_mismatch() {
    let (exact, lowercase) = index_of(&[("Images/Logo.png", "/src/Images/Logo.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("images/logo.png", Condition::Any, &index);
    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.case_mismatches.len(), 1);
    assert_eq!(outcome.case_mismatches[0].actual, "Images/Logo.png");
  }

  #[test]
  fn exact_case_hit_never_reports_mismatch() {
    let (exact, lowercase) = index_of(&[("logo.png", "/src/logo.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("logo.png", Condition::Any, &index);
    assert!(outcome.case_mismatches.is_empty());
  }

  #[test]
  fn missing_reference_gets_a_suggestion() {
    let (exact, lowercase) = index_of(&[("splash.png", "/src/splash.png")]);
    let index = BundleIndex::new(&exact, &lowercase);
    let outcome = resolve("splsh.png", Condition::Any, &index);
    assert_eq!(outcome.missing.unwrap().suggestion, Some("splash.png".to_string()));
  }
}
