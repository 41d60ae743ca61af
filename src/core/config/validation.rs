//! Contains validation logic for the final Config struct.

use super::{Config, Result};
use crate::core::error::AppError;
use crate::utils::dns::parse_name_server;
use std::time::Duration;

pub(crate) const MAX_REDIRECT_CAP: usize = 20;

/// Validates the configuration after loading and overrides.
/// Clamps values where a sane fallback exists, errors where none does.
pub(crate) fn validate_config(config: &mut Config) -> Result<()> {
    if config.sleep_between_requests.0 < 0.0 || config.sleep_between_requests.1 < 0.0 {
        return Err(AppError::Config(
            "Sleep durations cannot be negative.".to_string(),
        ));
    }
    if config.sleep_between_requests.0 > config.sleep_between_requests.1 {
        tracing::warn!(
            "Min sleep ({:.2}s) > Max sleep ({:.2}s). Setting max sleep = min sleep.",
            config.sleep_between_requests.0,
            config.sleep_between_requests.1
        );
        config.sleep_between_requests.1 = config.sleep_between_requests.0;
    }
    if config.request_timeout == Duration::ZERO {
        return Err(AppError::Config(
            "Request timeout must be at least one second.".to_string(),
        ));
    }
    if config.dns_timeout == Duration::ZERO {
        return Err(AppError::Config(
            "DNS timeout must be at least one second.".to_string(),
        ));
    }
    if config.max_redirects == 0 {
        tracing::warn!("Max redirects was set to 0. Setting to 1.");
        config.max_redirects = 1;
    }
    if config.max_redirects > MAX_REDIRECT_CAP {
        tracing::warn!(
            "Max redirects ({}) > {}. Clamping.",
            config.max_redirects,
            MAX_REDIRECT_CAP
        );
        config.max_redirects = MAX_REDIRECT_CAP;
    }
    if config.max_page_bytes == 0 {
        return Err(AppError::Config(
            "Max page size must be greater than zero.".to_string(),
        ));
    }
    for server in &config.dns_servers {
        if parse_name_server(server).is_none() {
            return Err(AppError::Config(format!(
                "Invalid DNS server address (expected an IP, optionally with a port): {}",
                server
            )));
        }
    }
    if config.max_phones == 0 {
        tracing::warn!("Max phones was set to 0. Setting to 1.");
        config.max_phones = 1;
    }
    if config.max_concurrency == 0 {
        tracing::warn!("Max concurrency was set to 0. Setting to 1.");
        config.max_concurrency = 1;
    }
    if config.role_email_prefixes.is_empty() {
        tracing::warn!("Role email vocabulary is empty. Every address will be treated as named.");
    }
    if config.user_agent.trim().is_empty() {
        return Err(AppError::Config("User agent cannot be empty.".to_string()));
    }
    Ok(())
}
