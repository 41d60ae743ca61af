//! Utility functions for handling domain names and URLs.

use crate::core::error::{AppError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static SCHEME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://").expect("scheme regex must compile"));

/// Parses a candidate website string into an absolute `Url`.
///
/// Adds an `http://` scheme when none is present. Only `http` and `https`
/// are accepted, and the URL must carry a host.
pub(crate) fn normalize_url(candidate: &str) -> Result<Url> {
    let trimmed_input = candidate.trim();
    if trimmed_input.is_empty() {
        return Err(AppError::malformed(candidate, "input is empty"));
    }

    let with_scheme = if SCHEME_RE.is_match(trimmed_input) {
        trimmed_input.to_string()
    } else {
        format!("http://{}", trimmed_input.trim_start_matches("//"))
    };

    let url = Url::parse(&with_scheme).map_err(|e| {
        tracing::debug!(
            "Failed to parse '{}' as URL (original: '{}'): {}",
            with_scheme,
            trimmed_input,
            e
        );
        AppError::malformed(trimmed_input, e)
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(AppError::malformed(
                trimmed_input,
                format!("unsupported scheme '{}'", other),
            ))
        }
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(AppError::malformed(trimmed_input, "URL has no host")),
    }
}

/// Derives the domain reported for a resolved URL: host lowercased, port
/// dropped, and a leading `www.` removed.
pub(crate) fn domain_from_url(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| AppError::malformed(url.as_str(), "URL has no host"))?;

    let lowered = host.trim_end_matches('.').to_lowercase();
    let domain = lowered.strip_prefix("www.").unwrap_or(&lowered).to_string();

    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        return Err(AppError::malformed(
            url.as_str(),
            format!("extracted domain appears invalid: '{}'", domain),
        ));
    }
    Ok(domain)
}

/// Lowercase domain part of an email address, if it has one.
pub(crate) fn email_domain(address: &str) -> Option<&str> {
    address
        .rsplit_once('@')
        .map(|(_, domain)| domain)
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_domain_from_url(website_url_or_domain: &str) -> Result<String> {
        let url = normalize_url(website_url_or_domain)?;
        domain_from_url(&url)
    }

    #[test]
    fn test_get_domain_from_url_valid() {
        assert_eq!(
            get_domain_from_url("https://www.example.com").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("http://example.com").unwrap(),
            "example.com"
        );
        assert_eq!(get_domain_from_url("example.com").unwrap(), "example.com");
        assert_eq!(
            get_domain_from_url("www.example.com").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("https://EXAMPLE.com/path?query=1").unwrap(),
            "example.com"
        );
        assert_eq!(
            get_domain_from_url("http://WWW.Acme.test:8080/contact").unwrap(),
            "acme.test"
        );
        assert_eq!(
            get_domain_from_url(" sub.domain.example.co.uk ").unwrap(),
            "sub.domain.example.co.uk"
        );
        assert_eq!(
            get_domain_from_url("http://www.sub.example.org/").unwrap(),
            "sub.example.org"
        );
    }

    #[test]
    fn test_get_domain_from_url_invalid() {
        assert!(get_domain_from_url("").is_err());
        assert!(get_domain_from_url("   ").is_err());
        assert!(get_domain_from_url("http://").is_err());
        assert!(get_domain_from_url("https://").is_err());
        assert!(get_domain_from_url("example").is_err());
        assert!(get_domain_from_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_normalize_url_defaults_to_http() {
        assert_eq!(
            normalize_url("example.com").unwrap().as_str(),
            "http://example.com/"
        );
        assert_eq!(
            normalize_url("https://example.com").unwrap().as_str(),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url(" acme.test/contact ").unwrap().as_str(),
            "http://acme.test/contact"
        );
    }

    #[test]
    fn test_normalize_url_scheme_only_at_start() {
        assert_eq!(
            normalize_url("acme.test/go?u=https://x.test").unwrap().as_str(),
            "http://acme.test/go?u=https://x.test"
        );
        assert_eq!(
            get_domain_from_url("acme.test/go?u=https://x.test").unwrap(),
            "acme.test"
        );
        assert_eq!(
            normalize_url("HTTPS://Acme.test/").unwrap().as_str(),
            "https://acme.test/"
        );
    }

    #[test]
    fn test_normalize_url_invalid() {
        assert!(normalize_url("").is_err());
        assert!(normalize_url("http://").is_err());
        assert!(normalize_url("javascript://example.com").is_err());
        assert!(matches!(
            normalize_url("http://exa mple.com"),
            Err(AppError::UrlMalformed { .. })
        ));
    }

    #[test]
    fn test_email_domain() {
        assert_eq!(email_domain("jane@acme.test"), Some("acme.test"));
        assert_eq!(email_domain("broken@"), None);
        assert_eq!(email_domain("nodomain"), None);
    }
}
