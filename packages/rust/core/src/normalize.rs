//! Name normalization and plausibility checks.

/// Leading honorifics stripped before storing or comparing names.
const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "dr", "prof", "sir"];

/// Placeholder strings providers use when they have no real answer.
const PLACEHOLDERS: &[&str] = &[
    "n/a", "na", "none", "null", "unknown", "not found", "not available", "error", "tbd", "-",
];

/// Trim, collapse internal whitespace, and strip a leading honorific.
/// This is the display form written to the output table.
pub fn clean_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut words: Vec<&str> = collapsed.split(' ').collect();
    if let Some(first) = words.first() {
        let bare = first.trim_end_matches('.').to_ascii_lowercase();
        // Only strip when a name remains afterwards.
        if HONORIFICS.contains(&bare.as_str()) && words.len() > 1 {
            words.remove(0);
        }
    }
    words.join(" ")
}

/// Case-folded comparison key for cross-checking names between providers.
pub fn comparison_key(raw: &str) -> String {
    clean_name(raw).to_lowercase()
}

pub fn is_placeholder(value: &str) -> bool {
    PLACEHOLDERS.contains(&value.trim().to_lowercase().as_str())
}

/// Minimum bar for accepting a proposed name: non-empty, not a known
/// placeholder, longer than a bare initial, and not just the company name
/// echoed back.
pub fn plausible(name: &str, company: &str) -> bool {
    let cleaned = clean_name(name);
    if cleaned.len() <= 3 || is_placeholder(&cleaned) {
        return false;
    }
    comparison_key(&cleaned) != comparison_key(company)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_strips_honorific_and_whitespace() {
        assert_eq!(clean_name("  Dr.  Jane   Smith "), "Jane Smith");
        assert_eq!(clean_name("Mr John Roe"), "John Roe");
        assert_eq!(clean_name("Jane Smith"), "Jane Smith");
    }

    #[test]
    fn clean_name_keeps_bare_honorific() {
        // A lone "Dr." has nothing left to strip down to.
        assert_eq!(clean_name("Dr."), "Dr.");
    }

    #[test]
    fn placeholders_are_rejected() {
        for value in ["N/A", "unknown", "Not Found", "  none  ", "-"] {
            assert!(is_placeholder(value), "{value:?} should be a placeholder");
        }
        assert!(!is_placeholder("Jane Smith"));
    }

    #[test]
    fn company_echo_is_not_plausible() {
        assert!(!plausible("Acme Inc", "Acme Inc"));
        assert!(!plausible("acme inc", "Acme Inc"));
        assert!(plausible("Jane Smith", "Acme Inc"));
    }

    #[test]
    fn short_and_placeholder_names_are_not_plausible() {
        assert!(!plausible("", "Acme"));
        assert!(!plausible("Jo", "Acme"));
        assert!(!plausible("Unknown", "Acme"));
    }

    #[test]
    fn comparison_key_matches_across_honorifics_and_case() {
        assert_eq!(comparison_key("Dr. Jane Smith"), comparison_key("jane smith"));
    }
}
