//! Runtime configuration: defaults, TOML file sections, and the fluent builder.

mod builder;
mod loading;
mod validation;

pub use builder::ConfigBuilder;
pub(crate) use crate::core::error::Result;

use rand::Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Local-parts that mark an address as belonging to a function, not a person.
pub const DEFAULT_ROLE_EMAIL_PREFIXES: &[&str] = &[
    "info",
    "sales",
    "support",
    "admin",
    "contact",
    "hello",
    "office",
    "billing",
    "noreply",
    "no-reply",
    "help",
    "team",
    "marketing",
    "enquiries",
    "inquiries",
    "service",
    "orders",
    "jobs",
    "hr",
    "careers",
    "accounts",
    "webmaster",
    "press",
];

/// Addresses on these domains are page furniture (error trackers, site
/// builders, placeholder text), never a prospect's contact.
pub const DEFAULT_IGNORED_EMAIL_DOMAINS: &[&str] = &[
    "example.com",
    "example.org",
    "domain.com",
    "email.com",
    "sentry.io",
    "sentry.wixpress.com",
    "sentry-next.wixpress.com",
    "wixpress.com",
];

/// Whether a prospect with a resolved domain but no contacts still yields a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DomainOnlyPolicy {
    /// Emit only when the MX check reached a verdict (`mx_present` or `no_mx`).
    #[default]
    KnownDeliverability,
    Always,
    Never,
}

/// Effective configuration for a pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    pub request_timeout: Duration,
    pub sleep_between_requests: (f32, f32),
    pub user_agent: String,
    pub max_redirects: usize,
    pub max_page_bytes: usize,

    pub dns_timeout: Duration,
    pub dns_servers: Vec<String>,

    pub role_email_prefixes: HashSet<String>,
    pub ignored_email_domains: HashSet<String>,
    pub max_phones: usize,

    pub domain_only_policy: DomainOnlyPolicy,

    pub max_concurrency: usize,

    pub loaded_config_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            sleep_between_requests: (0.5, 1.2),
            user_agent: format!(
                "Mozilla/5.0 (compatible; lead-sleuth/{}; +https://github.com/lead-sleuth)",
                env!("CARGO_PKG_VERSION")
            ),
            max_redirects: 5,
            max_page_bytes: 2 * 1024 * 1024,
            dns_timeout: Duration::from_secs(3),
            dns_servers: Vec::new(),
            role_email_prefixes: DEFAULT_ROLE_EMAIL_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            ignored_email_domains: DEFAULT_IGNORED_EMAIL_DOMAINS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_phones: 3,
            domain_only_policy: DomainOnlyPolicy::default(),
            max_concurrency: 4,
            loaded_config_path: None,
        }
    }
}

/// Mirror of `Config` as read from TOML. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub network: NetworkSection,
    pub dns: DnsSection,
    pub extraction: ExtractionSection,
    pub scoring: ScoringSection,
    pub processing: ProcessingSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub request_timeout: Option<u64>,
    pub min_sleep: Option<f32>,
    pub max_sleep: Option<f32>,
    pub user_agent: Option<String>,
    pub max_redirects: Option<usize>,
    pub max_page_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DnsSection {
    pub dns_timeout: Option<u64>,
    pub dns_servers: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExtractionSection {
    pub role_email_prefixes: Option<Vec<String>>,
    pub ignored_email_domains: Option<Vec<String>>,
    pub max_phones: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringSection {
    pub domain_only_policy: Option<DomainOnlyPolicy>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProcessingSection {
    pub max_concurrency: Option<usize>,
}

/// Random jitter drawn from `sleep_between_requests`. Zero when both bounds are zero.
pub fn get_random_sleep_duration(config: &Config) -> Duration {
    let (min, max) = config.sleep_between_requests;
    if max <= 0.0 {
        return Duration::ZERO;
    }
    if (max - min).abs() < f32::EPSILON {
        return Duration::from_secs_f32(min);
    }
    let secs = rand::thread_rng().gen_range(min..=max);
    Duration::from_secs_f32(secs)
}
