//! Emoji glyph stripping and keyword lookup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Pictographic glyphs removed from free text before it reaches the widget.
///
/// `Extended_Pictographic` covers emoji proper, including text-default ones
/// such as `⭐`, `↩` and `‼`. The explicit ranges add enclosed alphanumerics
/// and regional indicators, skin-tone modifiers, variation selectors, the
/// zero-width joiner, keycap combiners and the tag scalars of subdivision
/// flags, so composed sequences do not leave stray scalars behind.
static EMOJI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"[",
        r"\p{Extended_Pictographic}",
        r"\x{1F170}-\x{1F251}",
        r"\x{1F3FB}-\x{1F3FF}",
        r"\x{FE00}-\x{FE0F}",
        r"\x{200D}",
        r"\x{20E3}",
        r"\x{E0020}-\x{E007F}",
        r"]+"
    ))
    .expect("valid emoji regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Keyword groups checked in order; the first group that matches wins.
const KEYWORD_EMOJI: &[(&str, &str)] = &[
    (r"call|phone|ring|dial", "📞"),
    (r"email|e-mail|mail|inbox|reply", "📧"),
    (r"meeting|meet|sync|standup|interview", "📅"),
    (r"buy|shop|shopping|groceries|grocery|order", "🛒"),
    (r"pay|bill|bills|invoice|rent|tax|taxes", "💸"),
    (r"gym|workout|run|running|exercise|yoga", "🏃"),
    (r"doctor|dentist|pharmacy|medicine|appointment", "🩺"),
    (r"cook|dinner|lunch|breakfast|recipe", "🍳"),
    (r"clean|laundry|dishes|vacuum|tidy", "🧹"),
    (r"read|book|article", "📚"),
    (r"write|draft|essay|blog", "✍️"),
    (r"study|learn|homework|exam|class", "🎓"),
    (r"birthday|gift|present|party", "🎁"),
    (r"flight|travel|trip|pack|hotel", "✈️"),
    (r"car|gas|fuel|mechanic", "🚗"),
    (r"dog|cat|vet|pet", "🐾"),
    (r"plant|plants|garden|water", "🌱"),
    (r"code|deploy|bug|fix|review", "💻"),
];

static KEYWORD_EMOJI_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    KEYWORD_EMOJI
        .iter()
        .map(|(pattern, emoji)| {
            let regex = Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).expect("valid keyword regex");
            (regex, *emoji)
        })
        .collect()
});

/// Removes emoji glyphs and collapses the whitespace they leave behind.
pub fn strip_emoji(text: &str) -> String {
    let stripped = EMOJI_RE.replace_all(text, " ");
    WHITESPACE_RE.replace_all(stripped.trim(), " ").into_owned()
}

/// Returns the curated emoji for the first keyword group found in `text`.
pub fn emoji_for_text(text: &str) -> Option<String> {
    KEYWORD_EMOJI_RES
        .iter()
        .find(|(regex, _)| regex.is_match(text))
        .map(|(_, emoji)| (*emoji).to_string())
}
