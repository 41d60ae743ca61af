//! Phone-number scanning and normalisation.

use once_cell::sync::Lazy;
use regex::Regex;

/// Phone-shaped runs: optional `+`, then 8 to 15 digits with at most three
/// separator characters between any two of them, and an optional extension.
/// Separators stay on one line.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\+?\d(?:[\-. \t\u{00A0}()/]{0,3}\d){7,14})(?:[ \t]*(?:ext\.?|extension|x)[ \t]*(\d{1,6}))?",
    )
    .expect("phone regex must compile")
});

/// Calendar dates and timestamps share the phone shape; `2023-10-19 12` is not a number.
static DATE_LIKE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{4}[-/.]\d{1,2}[-/.]\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{4})(?:\D|$)")
        .expect("date regex must compile")
});

fn only_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn distinct_digits(digits: &str) -> usize {
    let mut seen = [false; 10];
    for b in digits.bytes() {
        seen[(b - b'0') as usize] = true;
    }
    seen.iter().filter(|s| **s).count()
}

/// North American numbers: `+1` followed by NXX-NXX-XXXX.
fn normalize_nanp(digits: &str) -> Option<String> {
    let national = match digits.len() {
        11 if digits.starts_with('1') => &digits[1..],
        10 => digits,
        _ => return None,
    };
    let bytes = national.as_bytes();
    if matches!(bytes[0], b'0' | b'1') || matches!(bytes[3], b'0' | b'1') {
        return None;
    }
    if distinct_digits(national) <= 2 {
        return None;
    }
    Some(format!("+1{}", national))
}

/// Any other number must be written with an explicit `+` and 8-15 digits.
fn normalize_international(digits: &str) -> Option<String> {
    if !(8..=15).contains(&digits.len()) || distinct_digits(digits) <= 2 {
        return None;
    }
    Some(format!("+{}", digits))
}

/// Normalises a phone-shaped string to E.164 (plus ` x<ext>` when present).
/// Returns `None` for anything that does not look dialable.
pub(crate) fn normalize_phone(raw: &str, extension: Option<&str>) -> Option<String> {
    let trimmed = raw.trim();
    if DATE_LIKE_RE.is_match(trimmed) {
        return None;
    }
    let has_plus = trimmed.starts_with('+');
    let digits = only_digits(trimmed);
    if digits.is_empty() {
        return None;
    }

    // Country code 1 is NANP only, so `+1` numbers get no international fallback.
    let normalized = if has_plus && !digits.starts_with('1') {
        normalize_international(&digits)
    } else {
        normalize_nanp(&digits)
    }?;

    match extension.map(str::trim).filter(|e| !e.is_empty()) {
        Some(ext) => Some(format!("{} x{}", normalized, ext)),
        None => Some(normalized),
    }
}

/// Normalises a free-form phone field (JSON-LD `telephone`, `tel:` target),
/// splitting out a trailing extension if one is written.
pub(crate) fn normalize_phone_field(raw: &str) -> Option<String> {
    match PHONE_RE.captures(raw) {
        Some(caps) => normalize_phone(&caps[1], caps.get(2).map(|m| m.as_str())),
        None => None,
    }
}

/// Shortest leading NANP number of a run that fused several numbers
/// together (`512-555-0150 512-555-0151`). Returns the number and the byte
/// length of the run it used.
fn leading_number(run: &str) -> Option<(String, usize)> {
    let mut digits = 0;
    for (i, c) in run.char_indices() {
        if !c.is_ascii_digit() {
            continue;
        }
        digits += 1;
        let end = i + 1;
        let at_group_end = run[end..].starts_with(|next: char| !next.is_ascii_digit());
        if at_group_end && (digits == 10 || digits == 11) {
            if let Some(phone) = normalize_phone(&run[..end], None) {
                return Some((phone, end));
            }
        }
        if digits > 11 {
            break;
        }
    }
    None
}

/// Every dialable number found in plain text, normalised.
pub(crate) fn scan_phones(text: &str) -> Vec<String> {
    let mut phones = Vec::new();
    let mut pos = 0;
    while let Some(caps) = PHONE_RE.captures_at(text, pos) {
        let (Some(whole), Some(run)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        if let Some(phone) = normalize_phone(run.as_str(), caps.get(2).map(|m| m.as_str())) {
            phones.push(phone);
            pos = whole.end();
        } else if let Some((phone, used)) = leading_number(run.as_str()) {
            phones.push(phone);
            pos = run.start() + used;
        } else {
            pos = whole.end();
        }
    }
    phones
}
