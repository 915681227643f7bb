//! Scraped text is noisy: badges, units, and stray markup end up next to the
//! numbers. These helpers never fail; unparsable input yields zero or an empty
//! value so a single bad field cannot abort a whole scrape.

use std::sync::LazyLock;

use regex::Regex;

static TEAM_WITH_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(.*?)\s*[\(\[]\s*([A-Za-z0-9]{1,6})\s*[\)\]]\s*$").expect("static regex")
});

fn numeric_chars(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Parse a decimal number after stripping everything but digits and `.`.
///
/// `"Target: 187"` is `187.0`; `""` and `"1.2.3"` are `0.0`.
#[must_use]
pub fn parse_number(text: &str) -> f64 {
    numeric_chars(text).parse::<f64>().unwrap_or(0.0)
}

/// Parse a whole number; fractional parts are truncated.
#[must_use]
pub fn parse_count(text: &str) -> i64 {
    #[allow(clippy::cast_possible_truncation)]
    let n = parse_number(text).trunc() as i64;
    n
}

/// Parse overs in `N.B` notation into a decimal: `"15.3"` is `15.5`.
///
/// `B` counts legal balls of the current over (0 to 5 by convention).
#[must_use]
pub fn parse_overs(text: &str) -> f64 {
    let cleaned = numeric_chars(text);
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.split_once('.') {
        None => cleaned.parse::<f64>().unwrap_or(0.0),
        Some((overs, balls)) => {
            let (Ok(overs), Ok(balls)) = (
                if overs.is_empty() { Ok(0) } else { overs.parse::<u32>() },
                if balls.is_empty() { Ok(0) } else { balls.parse::<u32>() },
            ) else {
                return 0.0;
            };
            f64::from(overs) + f64::from(balls) / 6.0
        }
    }
}

/// Split a combined score such as `"245/6"` or `"245-6"` into runs and wickets.
///
/// A bare number yields `(runs, None)`.
#[must_use]
pub fn parse_score(text: &str) -> (i64, Option<i64>) {
    let head = text.split('(').next().unwrap_or_default();
    match head.split_once(['/', '-']) {
        Some((runs, wickets)) => {
            let wickets = wickets.trim();
            let w = if numeric_chars(wickets).is_empty() {
                None
            } else {
                Some(parse_count(wickets))
            };
            (parse_count(runs), w)
        }
        None => (parse_count(head), None),
    }
}

/// Derive a short code from a team name: initials for multi-word names,
/// otherwise the first three characters, upper-cased.
#[must_use]
pub fn derive_short_code(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.len() {
        0 => String::new(),
        1 => words[0].chars().take(3).collect::<String>().to_uppercase(),
        _ => words
            .iter()
            .filter_map(|w| w.chars().next())
            .collect::<String>()
            .to_uppercase(),
    }
}

/// Parse `"India (IND)"` into `("India", "IND")`.
///
/// Without a bracketed code the short name is derived with [`derive_short_code`].
#[must_use]
pub fn parse_team_name(text: &str) -> (String, String) {
    if let Some(caps) = TEAM_WITH_CODE.captures(text) {
        let name = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
        let code = caps.get(2).map_or("", |m| m.as_str()).to_uppercase();
        if !name.is_empty() {
            return (name, code);
        }
    }
    let name = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let code = derive_short_code(&name);
    (name, code)
}
