//! Handles loading configuration from files and applying it to the Config struct.

use super::{Config, ConfigFile};
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Loads configuration settings from a TOML file.
pub(crate) fn load_config_file(file_path: &str) -> anyhow::Result<ConfigFile> {
    let path = Path::new(file_path);
    if !path.is_file() {
        return Err(anyhow::anyhow!(
            "File not found or is not a file: {}",
            file_path
        ));
    }
    tracing::debug!("Attempting to read config file: {}", file_path);
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", file_path))?;

    let config_file_content: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML configuration from {}", file_path))?;

    tracing::debug!("Successfully parsed configuration file: {}", file_path);
    Ok(config_file_content)
}

/// Merges every key present in `file_config` onto `config`.
pub(crate) fn apply_file_config(config: &mut Config, file_config: &ConfigFile) {
    // Network
    if let Some(timeout) = file_config.network.request_timeout {
        config.request_timeout = Duration::from_secs(timeout);
    }
    if let Some(min_sleep) = file_config.network.min_sleep {
        config.sleep_between_requests.0 = min_sleep;
    }
    if let Some(max_sleep) = file_config.network.max_sleep {
        config.sleep_between_requests.1 = max_sleep;
    }
    if let Some(ref user_agent) = file_config.network.user_agent {
        config.user_agent = user_agent.clone();
    }
    if let Some(redirects) = file_config.network.max_redirects {
        config.max_redirects = redirects;
    }
    if let Some(bytes) = file_config.network.max_page_bytes {
        config.max_page_bytes = bytes;
    }

    // DNS
    if let Some(timeout) = file_config.dns.dns_timeout {
        config.dns_timeout = Duration::from_secs(timeout);
    }
    if let Some(ref servers) = file_config.dns.dns_servers {
        config.dns_servers = servers
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }

    // Extraction
    if let Some(ref prefixes) = file_config.extraction.role_email_prefixes {
        config.role_email_prefixes = prefixes.iter().map(|p| p.trim().to_lowercase()).collect();
    }
    if let Some(ref domains) = file_config.extraction.ignored_email_domains {
        config.ignored_email_domains = domains.iter().map(|d| d.trim().to_lowercase()).collect();
    }
    if let Some(max_phones) = file_config.extraction.max_phones {
        config.max_phones = max_phones;
    }

    // Scoring
    if let Some(policy) = file_config.scoring.domain_only_policy {
        config.domain_only_policy = policy;
    }

    // Processing
    if let Some(concurrency) = file_config.processing.max_concurrency {
        config.max_concurrency = concurrency;
    }
}
