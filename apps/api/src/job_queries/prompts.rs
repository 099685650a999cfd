// Prompt for keyword generation from a parsed resume.

/// Replace `{candidate_json}` before sending.
pub const KEYWORDS_PROMPT_TEMPLATE: &str = r#"Based on the candidate data below, generate job search keywords.
For each category give exactly 2 words or short phrases that are most relevant for a job search.

Categories:
- job_titles: desired job titles
- required_skills: key skills to look for
- work_arrangements: preferred work arrangements (e.g. Remote, Hybrid)
- positions: desired positions or seniority levels
- exclude_words: words to exclude from the search

Candidate data:
{candidate_json}

Return JSON with this exact structure:
{
  "job_titles": ["", ""],
  "required_skills": ["", ""],
  "work_arrangements": ["", ""],
  "positions": ["", ""],
  "exclude_words": ["", ""]
}"#;

pub fn keywords_prompt(candidate_json: &str) -> String {
    KEYWORDS_PROMPT_TEMPLATE.replace("{candidate_json}", candidate_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_prompt_lists_every_category() {
        let prompt = keywords_prompt("{\"skills\": [\"Rust\"]}");
        for category in [
            "job_titles",
            "required_skills",
            "work_arrangements",
            "positions",
            "exclude_words",
        ] {
            assert!(prompt.contains(category), "missing {category}");
        }
        assert!(prompt.contains("\"Rust\""));
    }
}
