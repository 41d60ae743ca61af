//! Resolves a candidate website to the page it finally lands on.

use crate::core::error::{ErrorKind, Result};
use crate::core::models::ResolvedSite;
use crate::utils::domain::{domain_from_url, normalize_url};
use crate::utils::fetch::describe_request_error;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

#[async_trait]
pub trait SiteResolver: Send + Sync {
    /// Follows redirects from `candidate_url`. Never errors: failures come
    /// back as `ResolvedSite::Failed`.
    async fn resolve(&self, candidate_url: &str) -> ResolvedSite;
}

/// Resolver backed by a reqwest client whose redirect policy carries the cap.
pub struct HttpSiteResolver {
    client: Client,
}

impl HttpSiteResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn try_resolve(&self, candidate_url: &str) -> Result<(Url, String)> {
        let start = normalize_url(candidate_url)?;
        let response = self
            .client
            .get(start.clone())
            .send()
            .await
            .map_err(|e| describe_request_error(start.as_str(), &e))?;

        // Any answer means the host is reachable, whatever the status.
        let final_url = response.url().clone();
        tracing::debug!(
            target: "resolve_task",
            "{} -> {} (HTTP {})",
            start,
            final_url,
            response.status()
        );
        drop(response);

        let domain = domain_from_url(&final_url)?;
        Ok((final_url, domain))
    }
}

#[async_trait]
impl SiteResolver for HttpSiteResolver {
    async fn resolve(&self, candidate_url: &str) -> ResolvedSite {
        match self.try_resolve(candidate_url).await {
            Ok((final_url, domain)) => ResolvedSite::Resolved { final_url, domain },
            Err(e) => {
                let kind = e.kind().unwrap_or(ErrorKind::Unreachable);
                tracing::warn!(
                    target: "resolve_task",
                    "Could not resolve '{}' ({}): {}",
                    candidate_url,
                    kind,
                    e
                );
                ResolvedSite::Failed(ErrorKind::Unreachable)
            }
        }
    }
}
