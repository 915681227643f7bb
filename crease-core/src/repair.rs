//! Candidate generation for selector auto-repair.
//!
//! Given a rule that stopped matching, produce plausible replacements: class,
//! id, and attribute-substring swaps of the last compound segment, separator
//! and case permutations, generic `data-*` guesses, and the document's search
//! patterns for the field type. Candidates are ordered by similarity to the
//! original so that small markup drift is tried before generic guesses.

/// Normalized edit similarity in `[0, 1]`; `1.0` for identical strings.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            cur[j + 1] = substitution.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    #[allow(clippy::cast_precision_loss)]
    let score = 1.0 - prev[b.len()] as f64 / longest as f64;
    score
}

fn split_last_segment(rule: &str) -> (&str, &str) {
    let rule = rule.trim();
    match rule.rfind(|c: char| c.is_whitespace() || c == '>') {
        Some(idx) => (&rule[..=idx], &rule[idx + 1..]),
        None => ("", rule),
    }
}

/// Bare identifier of a simple `.name`, `#name`, or `tag.name` segment.
fn identifier(segment: &str) -> Option<&str> {
    let start = segment.find(['.', '#'])?;
    let ident = &segment[start + 1..];
    let end = ident
        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(ident.len());
    let ident = &ident[..end];
    (!ident.is_empty()).then_some(ident)
}

fn permutations(rule: &str) -> Vec<String> {
    vec![
        rule.replace('-', "_"),
        rule.replace('_', "-"),
        rule.replace(['-', '_'], ""),
        rule.to_lowercase(),
    ]
}

/// Generate replacement candidates for `rule`, excluding the rule itself.
pub fn generate(rule: &str, patterns: &[String]) -> Vec<String> {
    let rule = rule.trim();
    let (prefix, last) = split_last_segment(rule);
    let mut out: Vec<String> = Vec::new();

    out.extend(permutations(rule));

    if let Some(ident) = identifier(last) {
        let swaps = if last.contains('.') {
            vec![
                format!("#{ident}"),
                format!("[class*='{ident}']"),
                format!("[id*='{ident}']"),
            ]
        } else {
            vec![
                format!(".{ident}"),
                format!("[id*='{ident}']"),
                format!("[class*='{ident}']"),
            ]
        };
        for swap in swaps {
            if !prefix.is_empty() {
                out.push(format!("{prefix}{swap}"));
            }
            out.push(swap);
        }
        for p in permutations(ident) {
            out.push(format!(".{p}"));
            out.push(format!("#{p}"));
        }
        out.push(format!("[data-{ident}]"));
        out.push(format!("[data-testid*='{ident}']"));
        out.push(format!("[data-field='{ident}']"));
    }

    out.extend(patterns.iter().map(|p| p.trim().to_string()));

    let mut seen: Vec<String> = Vec::with_capacity(out.len());
    for candidate in out {
        if !candidate.is_empty() && candidate != rule && !seen.contains(&candidate) {
            seen.push(candidate);
        }
    }
    seen
}

/// Order candidates: those at or above `threshold` by similarity descending,
/// then the rest in generation order. At most `limit` are returned.
pub fn rank(original: &str, candidates: Vec<String>, threshold: f64, limit: usize) -> Vec<String> {
    let (mut close, far): (Vec<(f64, String)>, Vec<(f64, String)>) = candidates
        .into_iter()
        .map(|c| (similarity(original, &c), c))
        .partition(|(score, _)| *score >= threshold);
    close.sort_by(|a, b| b.0.total_cmp(&a.0));
    close
        .into_iter()
        .chain(far)
        .map(|(_, c)| c)
        .take(limit)
        .collect()
}
