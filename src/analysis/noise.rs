//! Noise filter and heading-validity check.
//!
//! Both predicates are pure functions of the fragment text. The same
//! [`is_noise`] runs before font statistics are aggregated, before title
//! selection, before classification, and when training rows are rebuilt.

use regex::Regex;
use std::sync::OnceLock;

/// Case-insensitive substrings marking boilerplate.
pub const BOILERPLATE_KEYWORDS: [&str; 10] = [
    "author",
    "date",
    "page",
    "footer",
    "header",
    "contact",
    "copyright",
    "www.",
    "@",
    ".com",
];

/// Minimum trimmed length of structural text.
pub const MIN_TEXT_LEN: usize = 3;

/// Maximum length of a heading.
pub const MAX_HEADING_LEN: usize = 150;

fn page_number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(page\s+)?\d+$").expect("static pattern"))
}

fn caption_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(figure|table|fig\.|tab\.)\s*\d+").expect("static pattern"))
}

/// Check whether text is unlikely to be structural content.
///
/// Rejects boilerplate keywords, purely numeric text, text shorter than
/// [`MIN_TEXT_LEN`], and figure/table caption labels.
pub fn is_noise(text: &str) -> bool {
    let trimmed = text.trim();
    let lower = trimmed.to_lowercase();

    BOILERPLATE_KEYWORDS.iter().any(|k| lower.contains(k))
        || (!trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()))
        || trimmed.chars().count() < MIN_TEXT_LEN
        || caption_pattern().is_match(&lower)
}

/// Check whether text is shaped like a heading.
///
/// Length must be in `[3, 150]`; bare page numbers and figure/table
/// captions are rejected; at least one letter is required.
pub fn is_valid_heading(text: &str) -> bool {
    let len = text.chars().count();
    if !(MIN_TEXT_LEN..=MAX_HEADING_LEN).contains(&len) {
        return false;
    }
    let lower = text.to_lowercase();
    if page_number_pattern().is_match(&lower) || caption_pattern().is_match(&lower) {
        return false;
    }
    text.chars().any(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_rejections() {
        assert!(is_noise("3"));
        assert!(is_noise("Page 4"));
        assert!(is_noise("Figure 2"));
        assert!(is_noise("Table 10: Results"));
        assert!(is_noise("ab"));
        assert!(is_noise("  12345  "));
        assert!(is_noise("contact@example.org"));
        assert!(is_noise("Visit www.example.org"));
        assert!(is_noise("Copyright 2024"));
        assert!(is_noise("Last UPDATED: March"));
    }

    #[test]
    fn test_noise_accepts_content() {
        assert!(!is_noise("Introduction"));
        assert!(!is_noise("Project Report"));
        assert!(!is_noise("Figures and tables are discussed below."));
    }

    #[test]
    fn test_valid_heading() {
        assert!(is_valid_heading("Introduction"));
        assert!(is_valid_heading("2.1 Methods"));
        assert!(!is_valid_heading("ab"));
        assert!(!is_valid_heading("Page 12"));
        assert!(!is_valid_heading("42"));
        assert!(!is_valid_heading("Fig. 3 Overview"));
        assert!(!is_valid_heading("1.2.3"));
        assert!(!is_valid_heading(&"x".repeat(151)));
        assert!(is_valid_heading(&"x".repeat(150)));
    }
}
