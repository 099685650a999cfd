use std::sync::OnceLock;

use regex::Regex;

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("placeholder regex is valid"))
}

/// Distinct `{{key}}` names in order of first appearance.
pub fn extract_placeholders(text: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for caps in placeholder_regex().captures_iter(text) {
        let key = &caps[1];
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_in_order_without_duplicates() {
        let text = "Dear {{hiring_manager}}, I want to join {{company_name}}. \
                    {{company_name}} builds {{ product }}.";
        assert_eq!(
            extract_placeholders(text),
            vec!["hiring_manager", "company_name", "product"]
        );
    }

    #[test]
    fn test_single_braces_ignored() {
        assert!(extract_placeholders("{company} and {{ }}").is_empty());
    }

    #[test]
    fn test_no_placeholders() {
        assert!(extract_placeholders("Fully rendered text.").is_empty());
    }
}
