//! Boolean (Lucene-style) search string from grouped keywords.
//!
//! Inclusion groups are ANDed in a fixed order (titles, positions, skills,
//! arrangements); terms inside a group are ORed; exclusions become one NOT
//! group at the end.

use crate::models::job_query::JobQueryKeywords;

/// Trims terms, drops blanks and case-insensitive repeats (first wins) and
/// strips embedded double quotes.
pub fn normalize_terms(terms: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out = Vec::new();
    for term in terms {
        let cleaned: String = term.replace('"', "");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            continue;
        }
        let key = cleaned.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(cleaned);
    }
    out
}

pub fn normalize_keywords(keywords: &JobQueryKeywords) -> JobQueryKeywords {
    JobQueryKeywords {
        job_titles: normalize_terms(&keywords.job_titles),
        required_skills: normalize_terms(&keywords.required_skills),
        work_arrangements: normalize_terms(&keywords.work_arrangements),
        positions: normalize_terms(&keywords.positions),
        exclude_words: normalize_terms(&keywords.exclude_words),
    }
}

fn quote(term: &str) -> String {
    if term.contains(' ') {
        format!("\"{term}\"")
    } else {
        term.to_string()
    }
}

/// `a` for one term, `(a OR b)` for several, `None` for none.
fn or_group(terms: &[String]) -> Option<String> {
    match terms {
        [] => None,
        [single] => Some(quote(single)),
        many => Some(format!(
            "({})",
            many.iter().map(|t| quote(t)).collect::<Vec<_>>().join(" OR ")
        )),
    }
}

pub fn build_query(keywords: &JobQueryKeywords) -> String {
    let k = normalize_keywords(keywords);
    let include = [
        &k.job_titles,
        &k.positions,
        &k.required_skills,
        &k.work_arrangements,
    ]
    .into_iter()
    .filter_map(|group| or_group(group))
    .collect::<Vec<_>>()
    .join(" AND ");

    match (include.is_empty(), or_group(&k.exclude_words)) {
        (_, None) => include,
        (true, Some(exclude)) => format!("NOT {exclude}"),
        (false, Some(exclude)) => format!("{include} NOT {exclude}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_documented_example() {
        let keywords = JobQueryKeywords {
            job_titles: strings(&["Backend Engineer", "Rust Developer"]),
            required_skills: strings(&["Rust"]),
            exclude_words: strings(&["intern"]),
            ..Default::default()
        };
        assert_eq!(
            build_query(&keywords),
            r#"("Backend Engineer" OR "Rust Developer") AND Rust NOT intern"#
        );
    }

    #[test]
    fn test_group_order_is_titles_positions_skills_arrangements() {
        let keywords = JobQueryKeywords {
            job_titles: strings(&["Engineer"]),
            required_skills: strings(&["Go", "Rust"]),
            work_arrangements: strings(&["Remote"]),
            positions: strings(&["Senior"]),
            exclude_words: vec![],
        };
        assert_eq!(
            build_query(&keywords),
            "Engineer AND Senior AND (Go OR Rust) AND Remote"
        );
    }

    #[test]
    fn test_multiple_excludes_grouped() {
        let keywords = JobQueryKeywords {
            job_titles: strings(&["Engineer"]),
            exclude_words: strings(&["intern", "unpaid internship"]),
            ..Default::default()
        };
        assert_eq!(
            build_query(&keywords),
            r#"Engineer NOT (intern OR "unpaid internship")"#
        );
    }

    #[test]
    fn test_only_excludes() {
        let keywords = JobQueryKeywords {
            exclude_words: strings(&["intern"]),
            ..Default::default()
        };
        assert_eq!(build_query(&keywords), "NOT intern");
    }

    #[test]
    fn test_empty_keywords_give_empty_query() {
        assert_eq!(build_query(&JobQueryKeywords::default()), "");
    }

    #[test]
    fn test_terms_trimmed_deduplicated_and_unquoted() {
        assert_eq!(
            normalize_terms(&strings(&[" Rust ", "rust", "", "  ", "\"Go\"", "Data   Engineer"])),
            strings(&["Rust", "Go", "Data Engineer"])
        );
    }

    #[test]
    fn test_embedded_quotes_cannot_break_the_query() {
        let keywords = JobQueryKeywords {
            job_titles: strings(&["Site \"Reliability\" Engineer"]),
            ..Default::default()
        };
        assert_eq!(build_query(&keywords), r#""Site Reliability Engineer""#);
    }
}
