//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Canonical form for answer comparison: lowercase, no whitespace,
/// no trailing period, and no leading `var=` assignment.
pub fn normalize_answer(s: &str) -> String {
  let compact: String = s
    .chars()
    .filter(|c| !c.is_whitespace())
    .flat_map(|c| c.to_lowercase())
    .collect();
  let compact = compact.trim_end_matches('.');
  strip_assignment(compact).to_string()
}

// "x=3" -> "3", but leave "3=3" or "=3" alone.
fn strip_assignment(s: &str) -> &str {
  match s.split_once('=') {
    Some((lhs, rhs)) if !lhs.is_empty() && lhs.chars().all(|c| c.is_ascii_alphabetic()) => rhs,
    _ => s,
  }
}

/// Parse a normalized answer as a number. Accepts integers, decimals,
/// simple fractions (`a/b`), mixed-sign forms and percentages.
pub fn parse_number(s: &str) -> Option<f64> {
  let s = s.trim();
  if s.is_empty() {
    return None;
  }
  if let Some(pct) = s.strip_suffix('%') {
    return parse_number(pct).map(|v| v / 100.0);
  }
  if let Some((num, den)) = s.split_once('/') {
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
      return None;
    }
    return Some(num / den);
  }
  let cleaned = strip_thousands(s)?;
  cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// "12,345.6" -> "12345.6". Commas are only accepted as thousands separators
// in the integer part; "6,2" or "1,5" are not numbers.
fn strip_thousands(s: &str) -> Option<String> {
  if !s.contains(',') {
    return Some(s.to_string());
  }
  let (int_part, frac) = match s.split_once('.') {
    Some((i, f)) => (i, Some(f)),
    None => (s, None),
  };
  if frac.is_some_and(|f| f.contains(',')) {
    return None;
  }
  let digits = int_part.strip_prefix(['-', '+']).unwrap_or(int_part);
  let mut groups = digits.split(',');
  let head = groups.next()?;
  let head_ok = (1..=3).contains(&head.len()) && head.chars().all(|c| c.is_ascii_digit());
  if !head_ok || !groups.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit())) {
    return None;
  }
  Some(s.replace(',', ""))
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} bytes total)", head, s.len())
  }
}
