//! Undoes the common ways sites disguise addresses from scrapers.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static NUMERIC_ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&#(?:[xX]([0-9a-fA-F]{1,6})|([0-9]{1,7}));").expect("entity regex must compile")
});

static ESCAPED_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\\u0040|\\x40|%40").expect("escape regex must compile"));

static BRACKET_AT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\[({]\s*at\s*[\])}]\s*").expect("at regex must compile")
});

static BRACKET_DOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*[\[({]\s*dot\s*[\])}]\s*").expect("dot regex must compile")
});

// Bare words only count when shouted, so prose like "reach us at" survives.
static BARE_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+AT\s+").expect("bare at regex must compile"));

static BARE_DOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+DOT\s+").expect("bare dot regex must compile"));

/// `j a n e @ a c m e . c o m`, bounded so neighbouring words are not swallowed.
static SPACED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(^|[^A-Za-z0-9._%+-])((?:[A-Za-z0-9._%+-] ){2,}@(?: [A-Za-z0-9.-]){3,})([^A-Za-z0-9]|$)",
    )
    .expect("spaced regex must compile")
});

const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("&commat;", "@"),
    ("&period;", "."),
    ("&amp;", "&"),
    ("&nbsp;", " "),
];

fn decode_entities(content: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(content, |caps: &Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (None, Some(dec)) => dec.as_str().parse::<u32>().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_else(|| caps[0].to_string())
    });

    let mut decoded = numeric.into_owned();
    for (entity, replacement) in NAMED_ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    decoded
}

/// Rewrites disguised `@` and `.` tokens into their literal characters so a
/// plain address scan can see through them.
pub(crate) fn deobfuscate(content: &str) -> String {
    let decoded = decode_entities(content);
    let unescaped = ESCAPED_AT_RE.replace_all(&decoded, "@");
    let with_at = BRACKET_AT_RE.replace_all(&unescaped, "@");
    let with_dot = BRACKET_DOT_RE.replace_all(&with_at, ".");
    let bare_at = BARE_AT_RE.replace_all(&with_dot, "@");
    let bare_dot = BARE_DOT_RE.replace_all(&bare_at, ".");
    SPACED_RE
        .replace_all(&bare_dot, |caps: &Captures| {
            format!("{}{}{}", &caps[1], caps[2].replace(' ', ""), &caps[3])
        })
        .into_owned()
}
