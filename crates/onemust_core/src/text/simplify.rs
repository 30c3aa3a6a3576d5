//! Action-oriented rewrite of captured text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Conversational lead-ins dropped from the front of a capture.
static LEAD_IN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:ok(?:ay)?|so|um+|uh+|hey|please)[,\s]+)*(?:(?:i|we)\s+(?:really\s+)?(?:need|have|want|ought|got)\s+to|(?:i|we)\s+(?:should|must|gotta|gonna)|(?:don'?t|do\s+not)\s+forget\s+to|(?:need|have)\s+to|remember\s+to|remind\s+me\s+to|gotta|must)\s+",
    )
    .expect("valid lead-in regex")
});
static TRAILING_FILLER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[,\s]+(?:please|asap|i\s+guess|or\s+something)$").expect("valid filler regex")
});
static TRAILING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s.,;:!]+$").expect("valid punct regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Shorthand expanded to full words.
const SHORTHAND: &[(&str, &str)] = &[
    ("tmrw", "tomorrow"),
    ("tmr", "tomorrow"),
    ("2day", "today"),
    ("appt", "appointment"),
    ("w/", "with"),
    ("b4", "before"),
    ("pls", "please"),
    ("mtg", "meeting"),
];

/// Derives the short imperative form shown on cards and the widget.
///
/// Falls back to the whitespace-normalized input when rewriting would leave
/// nothing behind.
pub fn simplify_text(original: &str) -> String {
    let normalized = WHITESPACE_RE.replace_all(original.trim(), " ").into_owned();
    if normalized.is_empty() {
        return normalized;
    }

    let expanded = normalized
        .split(' ')
        .map(|word| expand_shorthand(word))
        .collect::<Vec<_>>()
        .join(" ");
    let without_lead_in = LEAD_IN_RE.replace(&expanded, "");
    let without_filler = TRAILING_FILLER_RE.replace(&without_lead_in, "");
    let trimmed = TRAILING_PUNCT_RE.replace(&without_filler, "");

    let result = capitalize_first(trimmed.trim());
    if result.is_empty() {
        return normalized;
    }
    result
}

fn expand_shorthand(word: &str) -> String {
    let lowered = word.to_lowercase();
    SHORTHAND
        .iter()
        .find(|(short, _)| *short == lowered)
        .map(|(_, full)| (*full).to_string())
        .unwrap_or_else(|| word.to_string())
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
