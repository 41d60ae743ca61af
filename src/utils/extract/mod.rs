//! Contact extraction from raw page content.
//!
//! Four passes run over the same content and feed one `ExtractedContact`:
//! plain addresses, `mailto:` links, de-obfuscated text and JSON-LD blocks.
//! When the same address turns up in several passes the most trusted
//! method wins. Phones come from visible text, `tel:` links and JSON-LD.

mod json_ld;
mod obfuscation;
mod phone;

use crate::core::models::{EmailSource, ExtractedContact};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use scraper::{Html, Node, Selector};
use std::borrow::Cow;
use std::collections::HashSet;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[a-z0-9][a-z0-9._%+-]{0,63}@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,24}\b")
        .expect("email regex must compile")
});

static MAILTO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)mailto:([^"'<>\s]+)"#).expect("mailto regex must compile")
});

static TEL_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector must parse"));

/// Things that end in an image or asset extension look like addresses
/// (`logo@2x.png`) but never are.
const ASSET_SUFFIXES: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "ico", "avif", "tif", "tiff", "css", "js",
    "json", "xml", "pdf", "mp4", "webm", "woff", "woff2", "ttf",
];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

fn is_plausible_email(address: &str) -> bool {
    let Some((local, domain)) = address.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let tld = domain.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    !ASSET_SUFFIXES.contains(&tld.as_str())
}

/// A match right after `\` or `%` may start with the tail of an escape
/// sequence (`\u003ejane@...` in JSON-escaped markup, `%20bob@...` in a
/// link). The escape is decoded and kept only when it yields a local-part
/// character.
fn strip_escape_residue<'a>(text: &str, m: regex::Match<'a>) -> Cow<'a, str> {
    let before = &text[..m.start()];
    let found = m.as_str();
    let (skip, hex_len) = if before.ends_with('\\') {
        match found.as_bytes().first() {
            Some(b'u') => (1, 4),
            Some(b'x') => (1, 2),
            _ => return Cow::Borrowed(found),
        }
    } else if before.ends_with('%') {
        (0, 2)
    } else {
        return Cow::Borrowed(found);
    };

    let Some(hex) = found.get(skip..skip + hex_len) else {
        return Cow::Borrowed(found);
    };
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Cow::Borrowed(found);
    }
    let rest = &found[skip + hex_len..];
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) if c.is_ascii_alphanumeric() || "._+-".contains(c) => {
            Cow::Owned(format!("{}{}", c, rest))
        }
        _ => Cow::Borrowed(rest),
    }
}

fn scan_addresses(text: &str) -> Vec<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| strip_escape_residue(text, m).to_lowercase())
        .filter(|a| is_plausible_email(a))
        .collect()
}

fn mailto_addresses(content: &str) -> Vec<String> {
    let mut found = Vec::new();
    for caps in MAILTO_RE.captures_iter(content) {
        let target = caps[1].split(['?', '#']).next().unwrap_or_default();
        let decoded = percent_decode_str(target).decode_utf8_lossy();
        for candidate in decoded.split([',', ';']) {
            let candidate = candidate.trim();
            match EMAIL_RE.find(candidate) {
                Some(m) if m.start() == 0 && m.end() == candidate.len() => {
                    let address = candidate.to_lowercase();
                    if is_plausible_email(&address) {
                        found.push(address);
                    }
                }
                _ => {}
            }
        }
    }
    found
}

fn visible_text(document: &Html) -> String {
    let mut text = String::new();
    for node in document.root_element().descendants() {
        let Node::Text(chunk) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map(|el| HIDDEN_ELEMENTS.contains(&el.name()))
                .unwrap_or(false)
        });
        if !hidden {
            text.push_str(chunk);
            text.push('\n');
        }
    }
    text
}

fn tel_link_phones(document: &Html) -> Vec<String> {
    document
        .select(&TEL_LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| {
            let href = href.trim();
            match href.get(..4) {
                Some(scheme) if scheme.eq_ignore_ascii_case("tel:") => Some(&href[4..]),
                _ => None,
            }
        })
        .filter_map(|target| {
            let decoded = percent_decode_str(target).decode_utf8_lossy();
            phone::normalize_phone_field(&decoded)
        })
        .collect()
}

/// Finds every email address and phone number in `page_content`.
///
/// Never fails: unparseable structured data is skipped and an empty
/// document simply yields an empty result.
pub fn extract(page_content: &str) -> ExtractedContact {
    let mut contacts = ExtractedContact::default();
    if page_content.trim().is_empty() {
        return contacts;
    }

    let raw: HashSet<String> = scan_addresses(page_content).into_iter().collect();
    for address in &raw {
        contacts.add_email(address, EmailSource::Raw);
    }

    for address in mailto_addresses(page_content) {
        contacts.add_email(&address, EmailSource::Mailto);
    }

    let revealed = obfuscation::deobfuscate(page_content);
    for address in scan_addresses(&revealed) {
        if !raw.contains(&address) {
            contacts.add_email(&address, EmailSource::Deobfuscated);
        }
    }

    let document = Html::parse_document(page_content);
    let structured = json_ld::structured_contacts(&document);
    for value in &structured.email_values {
        for address in scan_addresses(value) {
            contacts.add_email(&address, EmailSource::JsonLd);
        }
    }

    for number in phone::scan_phones(&visible_text(&document))
        .into_iter()
        .chain(tel_link_phones(&document))
        .chain(structured.phones)
    {
        contacts.add_phone(number);
    }

    tracing::trace!(
        target: "extract_task",
        "Extracted {} email(s), {} phone(s)",
        contacts.emails.len(),
        contacts.phones.len()
    );
    contacts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_content() {
        assert!(extract("").is_empty());
        assert!(extract("   \n").is_empty());
    }

    #[test]
    fn test_raw_and_mailto() {
        let html = r#"<html><body>
            <p>Write to jane.doe@acme.test</p>
            <a href="mailto:sales@acme.test?subject=Hi">Sales</a>
        </body></html>"#;
        let contacts = extract(html);
        assert_eq!(contacts.email_source("jane.doe@acme.test"), Some(EmailSource::Raw));
        assert_eq!(contacts.email_source("sales@acme.test"), Some(EmailSource::Mailto));
        assert_eq!(contacts.emails.len(), 2);
    }

    #[test]
    fn test_percent_encoded_mailto() {
        let html = r#"<a href="mailto:Ops%40Acme.test,billing@acme.test">x</a>"#;
        let contacts = extract(html);
        assert_eq!(contacts.email_source("ops@acme.test"), Some(EmailSource::Deobfuscated));
        assert_eq!(contacts.email_source("billing@acme.test"), Some(EmailSource::Mailto));
    }

    #[test]
    fn test_deobfuscated_only_when_not_plain() {
        let html = "<p>contact us at jane (at) acme (dot) com</p>";
        let contacts = extract(html);
        assert_eq!(
            contacts.email_source("jane@acme.com"),
            Some(EmailSource::Deobfuscated)
        );
        assert_eq!(contacts.emails.len(), 1);
    }

    #[test]
    fn test_json_ld_wins_over_raw_and_dedupes() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Organization","email":"info@example.com"}</script>
        </head><body>Info@Example.com</body></html>"#;
        let contacts = extract(html);
        assert_eq!(contacts.emails.len(), 1);
        assert_eq!(
            contacts.email_source("info@example.com"),
            Some(EmailSource::JsonLd)
        );
    }

    #[test]
    fn test_json_escaped_markup_yields_real_address() {
        let html = r#"<script>self.__next_f.push([1,"\u003cp\u003ejane@acme.test\u003c/p\u003e"])</script>"#;
        let contacts = extract(html);
        let emails: Vec<&str> = contacts.emails.keys().map(String::as_str).collect();
        assert_eq!(emails, vec!["jane@acme.test"]);
        assert_eq!(contacts.email_source("jane@acme.test"), Some(EmailSource::Raw));
    }

    #[test]
    fn test_percent_escape_not_glued_to_local_part() {
        let html = r#"<a href="mailto:%20bob@acme.test">Bob</a>"#;
        let contacts = extract(html);
        let emails: Vec<&str> = contacts.emails.keys().map(String::as_str).collect();
        assert_eq!(emails, vec!["bob@acme.test"]);
        assert_eq!(contacts.email_source("bob@acme.test"), Some(EmailSource::Mailto));
    }

    #[test]
    fn test_escape_decoding_to_letter_is_kept() {
        // \u0061 is 'a'
        let contacts = extract(r#"{"c":"\u0061nna@acme.test"}"#);
        assert_eq!(contacts.email_source("anna@acme.test"), Some(EmailSource::Raw));
        assert_eq!(contacts.emails.len(), 1);
    }

    #[test]
    fn test_asset_names_rejected() {
        let html = r#"<img src="/img/logo@2x.png"><link href="/static/app@3.1.css">"#;
        assert!(extract(html).emails.is_empty());
    }

    #[test]
    fn test_phones_from_text_and_links() {
        let html = r#"<html><head><style>.x { width: 512-555-0199px }</style></head><body>
            <p>Call (512) 555-0142</p>
            <a href="tel:+1-512-555-0100">Desk</a>
            <script>var id = "512-555-0177";</script>
        </body></html>"#;
        let contacts = extract(html);
        let phones: Vec<&str> = contacts.phones.iter().map(String::as_str).collect();
        assert_eq!(phones, vec!["+15125550100", "+15125550142"]);
    }

    #[test]
    fn test_idempotent() {
        let html = r#"<p>jane AT acme DOT com, bob@acme.test</p>
            <a href="mailto:bob@acme.test">bob</a> (512) 555-0142"#;
        assert_eq!(extract(html), extract(html));
    }

    #[test]
    fn test_garbage_does_not_panic() {
        let garbage = "<<<>>>\u{0}@@@...&#xFFFFFFFF;<script type=\"application/ld+json\">{{{</script>";
        let _ = extract(garbage);
    }
}
