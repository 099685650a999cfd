// Prompts for cover-letter section writing and placeholder rendering.

use crate::models::cover_letter::ContentSection;

/// Section-writing prompt. Replace `{candidate_json}`, `{section}`,
/// `{section_rules}` and `{user_prompt}` before sending.
pub const GENERATE_PROMPT_TEMPLATE: &str = r#"Write one section of a cover letter for the candidate below.

Candidate data:
{candidate_json}

Section: {section}
Section rules:
{section_rules}

User prompt: {user_prompt}

Rules:
1. Never leave your own comments in the text.
2. Wherever job-specific information belongs (company name, role, requirements), write a placeholder
   in double curly braces, e.g. {{company_name}} or {{key_requirement}}.
3. Be professional, specific to the candidate's data, and avoid cliches and generic phrases.
4. Write in the same language as the resume content.
5. Return ONLY the section text."#;

/// Rendering prompt. Replace `{job_description}` and `{content}` before sending.
pub const RENDER_PROMPT_TEMPLATE: &str = r#"Fill in the cover letter below using the job description.

Job description:
{job_description}

Cover letter content:
{content}

Rules:
1. Find every placeholder written as {{placeholder_key}} and replace it with relevant information
   from the job description.
2. Keep the text flowing naturally and keep a professional tone.
3. Preserve the structure and formatting of the content; join the sections into one letter.
4. Do not add comments or explanations.
5. Return ONLY the rendered text."#;

pub fn section_rules(section: ContentSection) -> &'static str {
    match section {
        ContentSection::Introduction => {
            "Start with an appropriate greeting and briefly introduce the candidate. At most 1 paragraph."
        }
        ContentSection::BodyPart1 => {
            "Highlight skills, experience and achievements, preferably as bullet points. \
             No introduction and no repetition of the introduction's wording. At most 2 paragraphs."
        }
        ContentSection::BodyPart2 => {
            "Explain the interest in the company and how the candidate matches its needs. \
             No introduction and no repetition of the introduction's wording. At most 1 paragraph."
        }
        ContentSection::Conclusion => {
            "Summarize the fit and express the wish to discuss further. At most 1 paragraph."
        }
    }
}

pub fn generate_prompt(candidate_json: &str, section: ContentSection, user_prompt: &str) -> String {
    fill(
        GENERATE_PROMPT_TEMPLATE,
        &[
            ("candidate_json", candidate_json),
            ("section", section.as_str()),
            ("section_rules", section_rules(section)),
            ("user_prompt", user_prompt),
        ],
    )
}

pub fn render_prompt(job_description: &str, content_json: &str) -> String {
    fill(
        RENDER_PROMPT_TEMPLATE,
        &[("job_description", job_description), ("content", content_json)],
    )
}

/// Substitutes `{name}` slots in one pass over the template. Inserted values
/// are never scanned again, so braces in user text come through verbatim.
fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open + 1..];
        let slot = slots.iter().find(|(name, _)| {
            tail.strip_prefix(name)
                .is_some_and(|after| after.starts_with('}'))
        });
        match slot {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prompt_keeps_placeholder_example() {
        let prompt = generate_prompt("{}", ContentSection::BodyPart1, "focus on Rust");
        assert!(prompt.contains("Section: body_part_1"));
        assert!(prompt.contains("bullet points"));
        assert!(prompt.contains("focus on Rust"));
        assert!(prompt.contains("{{company_name}}"));
    }

    #[test]
    fn test_render_prompt_fills_inputs() {
        let prompt = render_prompt("We are Acme", "{\"introduction\": \"Hi {{company}}\"}");
        assert!(prompt.contains("We are Acme"));
        assert!(prompt.contains("Hi {{company}}"));
        assert!(!prompt.contains("{job_description}"));
    }

    #[test]
    fn test_user_text_with_slot_names_is_not_substituted() {
        let prompt = generate_prompt(
            r#"{"name": "{user_prompt}"}"#,
            ContentSection::Conclusion,
            "mention {section} and {job_description} literally",
        );
        assert!(prompt.contains(r#"{"name": "{user_prompt}"}"#));
        assert!(prompt.contains("User prompt: mention {section} and {job_description} literally"));
        assert!(prompt.contains("Section: conclusion"));

        let rendered = render_prompt("Role text with {content} inside", r#"{"intro": "{job_description}"}"#);
        assert!(rendered.contains("Role text with {content} inside"));
        assert!(rendered.contains(r#"{"intro": "{job_description}"}"#));
    }

    #[test]
    fn test_fill_leaves_unknown_braces() {
        assert_eq!(fill("{a} {{b}} {", &[("a", "x")]), "x {{b}} {");
    }
}
