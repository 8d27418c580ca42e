//! Fuzzy lookup of a free-text food name against known names.

/// Candidates scoring at or below this are not a match.
pub const MATCH_THRESHOLD: f64 = 0.4;

/// Word-prefix similarity in `[0, 1]`.
///
/// Counts the words of `a` whose first three characters start some word of
/// `b`, divided by the larger word count. Equal strings score 1.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a == b {
        return 1.0;
    }

    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();
    let longest = a_words.len().max(b_words.len());
    if longest == 0 {
        return 0.0;
    }

    let matches = a_words
        .iter()
        .filter(|word| {
            let prefix: String = word.chars().take(3).collect();
            b_words.iter().any(|bw| bw.starts_with(&prefix))
        })
        .count();

    matches as f64 / longest as f64
}

/// Best candidate for `query`: a candidate whose name is contained in the
/// query wins outright, otherwise the highest similarity above
/// [`MATCH_THRESHOLD`]. Ties keep the earlier candidate.
pub fn find_best_match<'a, T, F>(query: &str, candidates: &'a [T], name_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return None;
    }

    if let Some(direct) = candidates.iter().find(|c| {
        let name = name_of(*c).trim().to_lowercase();
        !name.is_empty() && query.contains(&name)
    }) {
        return Some(direct);
    }

    let mut best: Option<(&T, f64)> = None;
    for candidate in candidates {
        let score = string_similarity(&query, name_of(candidate));
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score > MATCH_THRESHOLD => {
            tracing::debug!(query = %query, name = name_of(candidate), score, "fuzzy match");
            Some(candidate)
        }
        _ => None,
    }
}
