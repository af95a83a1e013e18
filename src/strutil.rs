//! String utilities used throughout the linter: escaping, balanced-pair
//! splitting, brace permutation expansion, path relativization, edit
//! distance and iOS image name normalization.
//!
//! Grounded on `original_source/Respect/NSString+Respect.h` and
//! `original_source/NSRegularExpression+extras/NSString+withFnmatch.h`.

/// Splits `text` on any character in `separators`, skipping separators that
/// fall inside a balanced pair (when `balanced_pair` is given) or that are
/// escaped with a backslash (when `allow_escape` is true). When escaping is
/// enabled, escape sequences are removed from each returned component.
pub fn split(
  text: &str,
  separators: &str,
  allow_escape: bool,
  balanced_pair: Option<(char, char)>,
) -> Vec<String> {
  let mut out = Vec::new();
  let mut current = String::new();
  let mut depth = 0i32;
  let mut chars = text.chars().peekable();

  while let Some(c) = chars.next() {
    if allow_escape && c == '\\' {
      if let Some(&next) = chars.peek() {
        current.push(next);
        chars.next();
        continue;
      }
    }

    if let Some((open, close)) = balanced_pair {
      if c == open {
        depth += 1;
      } else if c == close && depth > 0 {
        depth -= 1;
      }
    }

    if depth == 0 && separators.contains(c) {
      out.push(std::mem::take(&mut current));
      continue;
    }

    current.push(c);
  }

  out.push(current);
  out
}

/// Splits `text` into alternating (outside, inside) regions around a
/// character pair, e.g. `"prefix-[a,b]-suffix"` with pair `('[', ']')`
/// yields `[("prefix-", false), ("a,b", true), ("-suffix", false)]`.
/// Escapes inside the outside regions are honored when `allow_escape` is
/// true; `should_balance` requires the pair to be properly nested to count.
pub fn split_by_pair(
  text: &str,
  pair: (char, char),
  allow_escape: bool,
  should_balance: bool,
) -> Vec<(String, bool)> {
  let (open, close) = pair;
  let mut out = Vec::new();
  let mut outside = String::new();
  let mut chars = text.chars().peekable();

  while let Some(c) = chars.next() {
    if allow_escape && c == '\\' {
      if let Some(&next) = chars.peek() {
        outside.push(next);
        chars.next();
        continue;
      }
    }

    if c == open {
      let mut inside = String::new();
      let mut depth = 1;
      let mut balanced = false;

      for c2 in chars.by_ref() {
        if c2 == open {
          depth += 1;
          inside.push(c2);
        } else if c2 == close {
          depth -= 1;
          if depth == 0 {
            balanced = true;
            break;
          }
          inside.push(c2);
        } else {
          inside.push(c2);
        }
      }

      if should_balance && !balanced {
        outside.push(open);
        outside.push_str(&inside);
        continue;
      }

      out.push((std::mem::take(&mut outside), false));
      out.push((inside, true));
      continue;
    }

    outside.push(c);
  }

  if !outside.is_empty() || out.is_empty() {
    out.push((outside, false));
  }

  out
}

/// Expands brace-permutation groups in `text` into the Cartesian product of
/// their comma-separated alternatives, e.g. `"icon{@2x,}{~ipad,}.png"` over
/// `pair = ('{', '}')`, `separators = ","` yields
/// `["icon@2x~ipad.png", "icon@2x.png", "icon~ipad.png", "icon.png"]`.
/// Groups are expanded left to right; nested groups are not expanded (the
/// inner braces are kept literal); empty alternatives are permitted.
pub fn permutations(text: &str, pair: (char, char), separators: &str) -> Vec<String> {
  let parts = split_by_pair(text, pair, true, true);

  let mut groups: Vec<Vec<String>> = Vec::new();
  for (part, is_group) in &parts {
    if *is_group {
      groups.push(split(part, separators, true, Some(pair)));
    } else {
      groups.push(vec![part.clone()]);
    }
  }

  let mut acc = vec![String::new()];
  for group in &groups {
    let mut next = Vec::with_capacity(acc.len() * group.len().max(1));
    for prefix in &acc {
      for alt in group {
        let mut s = prefix.clone();
        s.push_str(alt);
        next.push(s);
      }
    }
    acc = next;
  }

  acc
}

/// Unix-style relative path join: `relative_path("b", "a") == "a/b"`,
/// `relative_path("../b", "/a/c") == "/a/b"`, and an absolute `child`
/// overrides `base` entirely: `relative_path("/b", "a") == "/b"`.
pub fn relative_path(child: &str, base: &str) -> String {
  if child.starts_with('/') {
    return child.to_string();
  }

  let mut segments: Vec<&str> = if base.is_empty() {
    Vec::new()
  } else {
    base.split('/').filter(|s| !s.is_empty()).collect()
  };
  let is_absolute = base.starts_with('/');

  // Drop the base's last segment: we join relative to base's directory
  // only when base itself looks like a file; callers pass directories, so
  // we keep all of base and append child segments, resolving `..`/`.`.
  for seg in child.split('/') {
    match seg {
      "" | "." => {}
      ".." => {
        segments.pop();
      }
      s => segments.push(s),
    }
  }

  let joined = segments.join("/");
  if is_absolute {
    format!("/{}", joined)
  } else {
    joined
  }
}

/// Classical Levenshtein edit distance between two strings, operating on
/// unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
  let a: Vec<char> = a.chars().collect();
  let b: Vec<char> = b.chars().collect();

  if a.is_empty() {
    return b.len();
  }
  if b.is_empty() {
    return a.len();
  }

  let mut prev: Vec<usize> = (0..=b.len()).collect();
  let mut curr = vec![0usize; b.len() + 1];

  for (i, ca) in a.iter().enumerate() {
    curr[0] = i + 1;
    for (j, cb) in b.iter().enumerate() {
      let cost = if ca == cb { 0 } else { 1 };
      curr[j + 1] = (prev[j + 1] + 1)
        .min(curr[j] + 1)
        .min(prev[j] + cost);
    }
    std::mem::swap(&mut prev, &mut curr);
  }

  prev[b.len()]
}

/// Returns the element of `pool` with the smallest edit distance to
/// `candidate`, provided that distance is at most `max_distance`. Ties are
/// broken by first occurrence in `pool`.
pub fn best_suggestion<'a>(
  candidate: &str,
  pool: impl IntoIterator<Item = &'a str>,
  max_distance: usize,
) -> Option<&'a str> {
  let mut best: Option<(&'a str, usize)> = None;

  for item in pool {
    let d = levenshtein(candidate, item);
    if d > max_distance {
      continue;
    }
    match best {
      None => best = Some((item, d)),
      Some((_, best_d)) if d < best_d => best = Some((item, d)),
      _ => {}
    }
  }

  best.map(|(s, _)| s)
}

/// The adaptive suggestion threshold used by the reference resolver:
/// roughly a third of the candidate's length, capped at 4.
pub fn adaptive_suggestion_threshold(len: usize) -> usize {
  ((len + 2) / 3).min(4)
}

/// Strips an optional `@<scalar>x` scale suffix, an optional `~<device>`
/// idiom suffix, and the file extension, e.g.
/// `normalize_ios_image_name("icon@2x~ipad.png") == "icon"`.
pub fn normalize_ios_image_name(name: &str) -> String {
  let stem = match name.rfind('.') {
    Some(i) => &name[..i],
    None => name,
  };

  let stem = match stem.rfind('~') {
    Some(i) if is_device_suffix(&stem[i + 1..]) => &stem[..i],
    _ => stem,
  };

  match stem.rfind('@') {
    Some(i) if is_scale_suffix(&stem[i + 1..]) => &stem[..i],
    _ => stem,
  }
  .to_string()
}

fn is_scale_suffix(s: &str) -> bool {
  let bytes = s.as_bytes();
  bytes.len() >= 2
    && bytes[bytes.len() - 1] == b'x'
    && bytes[..bytes.len() - 1].iter().all(u8::is_ascii_digit)
}

fn is_device_suffix(s: &str) -> bool {
  !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_balances_parens() {
    let parts = split("a,(b,c),d", ",", false, Some(('(', ')')));
    assert_eq!(parts, vec!["a", "(b,c)", "d"]);
  }

  #[test]
  fn split_honors_escapes() {
    let parts = split(r"a\,b,c", ",", true, None);
    assert_eq!(parts, vec!["a,b", "c"]);
  }

  #[test]
  fn permutations_brace_groups() {
    let mut got = permutations("icon{@2x,}{~ipad,}.png", ('{', '}'), ",");
    let mut want = vec![
      "icon@2x~ipad.png".to_string(),
      "icon@2x.png".to_string(),
      "icon~ipad.png".to_string(),
      "icon.png".to_string(),
    ];
    got.sort();
    want.sort();
    assert_eq!(got, want);
  }

  #[test]
  fn permutations_preserve_order() {
    let got = permutations("a{b,c}{d,e}", ('{', '}'), ",");
    assert_eq!(got, vec!["abd", "abe", "acd", "ace"]);
  }

  #[test]
  fn permutations_empty_alternative() {
    let got = permutations("{,a}", ('{', '}'), ",");
    assert_eq!(got, vec!["", "a"]);
  }

  #[test]
  fn permutations_nested_not_expanded() {
    let got = permutations("x{a{b,c},d}", ('{', '}'), ",");
    let mut got = got;
    got.sort();
    assert_eq!(got, vec!["xa{b,c}", "xd"]);
  }

  #[test]
  fn relative_path_join() {
    assert_eq!(relative_path("b", "a"), "a/b");
    assert_eq!(relative_path("../b", "/a/c"), "/a/b");
    assert_eq!(relative_path("/b", "a"), "/b");
  }

  #[test]
  fn levenshtein_basic() {
    assert_eq!(levenshtein("test", "tst"), 1);
    assert_eq!(levenshtein("", "abc"), 3);
    assert_eq!(levenshtein("kitten", "sitting"), 3);
  }

  #[test]
  fn levenshtein_symmetric() {
    assert_eq!(levenshtein("splash", "splsh"), levenshtein("splsh", "splash"));
  }

  #[test]
  fn best_suggestion_picks_closest() {
    let pool = ["tst", "ts"];
    assert_eq!(best_suggestion("test", pool.iter().copied(), 1), Some("tst"));
  }

  #[test]
  fn best_suggestion_missing() {
    let pool = ["splash"];
    assert_eq!(
      best_suggestion("splsh", pool.iter().copied(), adaptive_suggestion_threshold(5)),
      Some("splash")
    );
  }

  #[test]
  fn normalize_strips_retina_and_device() {
    assert_eq!(normalize_ios_image_name("icon@2x~ipad.png"), "icon");
    assert_eq!(normalize_ios_image_name("icon.png"), "icon");
    assert_eq!(normalize_ios_image_name("icon~ipad.png"), "icon");
  }

  #[test]
  fn normalize_round_trip() {
    let base = normalize_ios_image_name("logo.png");
    let suffixed = normalize_ios_image_name("logo@2x~ipad.png");
    assert_eq!(base, suffixed);
  }
}
