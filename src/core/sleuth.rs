use crate::core::config::{get_random_sleep_duration, Config};
use crate::core::error::Result;
use crate::core::models::{
    DeliverabilityStatus, ExtractedContact, LeadRecord, ProspectInput, ResolvedSite,
};
use crate::core::scoring::score_and_select;
use crate::utils::dns::{
    check_mx, create_resolver, DeliverabilityCache, DnsMxLookup, MailExchangeLookup,
};
use crate::utils::domain::email_domain;
use crate::utils::extract::extract;
use crate::utils::fetch::{build_http_client, HttpPageFetcher, PageFetcher};
use crate::utils::resolver::{HttpSiteResolver, SiteResolver};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Everything learned about one prospect on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct Enrichment {
    pub resolved: ResolvedSite,
    pub contacts: ExtractedContact,
    pub deliverability: DeliverabilityStatus,
    pub lead: Option<LeadRecord>,
}

/// The main struct orchestrating resolution, extraction, MX checks and scoring.
#[derive(Clone)]
pub struct LeadSleuth {
    resolver: Arc<dyn SiteResolver>,
    fetcher: Arc<dyn PageFetcher>,
    mx_lookup: Arc<dyn MailExchangeLookup>,
    deliverability_cache: DeliverabilityCache,
}

impl LeadSleuth {
    /// Creates a LeadSleuth wired to the real network.
    pub(crate) async fn new(config: &Config) -> Result<Self> {
        tracing::debug!("Initializing LeadSleuth components...");
        let http_client = build_http_client(config)?;
        tracing::debug!("HTTP client initialized.");
        let dns_resolver = create_resolver(config)?;
        tracing::debug!("DNS resolver initialized.");

        let sleuth = Self::with_collaborators(
            Arc::new(HttpSiteResolver::new(http_client.clone())),
            Arc::new(HttpPageFetcher::new(http_client, config.max_page_bytes)),
            Arc::new(DnsMxLookup::new(dns_resolver, config.dns_timeout)),
        );
        tracing::info!("LeadSleuth initialized successfully.");
        Ok(sleuth)
    }

    /// Assembles a LeadSleuth from explicit collaborators with a fresh cache.
    pub fn with_collaborators(
        resolver: Arc<dyn SiteResolver>,
        fetcher: Arc<dyn PageFetcher>,
        mx_lookup: Arc<dyn MailExchangeLookup>,
    ) -> Self {
        Self {
            resolver,
            fetcher,
            mx_lookup,
            deliverability_cache: DeliverabilityCache::new(),
        }
    }

    pub fn deliverability_cache(&self) -> &DeliverabilityCache {
        &self.deliverability_cache
    }

    /// Runs one prospect through resolve, fetch, extract, MX check and scoring.
    ///
    /// Failures never escape: they leave the affected fields empty or `unknown`.
    pub async fn enrich(&self, config: &Config, prospect: &ProspectInput) -> Enrichment {
        let task_label = prospect.company_name.as_str();
        tracing::info!(target: "enrich_task", "[{}] Starting enrichment of {}", task_label, prospect.candidate_url);
        let start_time = Instant::now();

        let resolved = self.resolver.resolve(&prospect.candidate_url).await;
        let (final_url, domain) = match (resolved.final_url(), resolved.domain()) {
            (Some(url), Some(domain)) => (url.clone(), domain.to_string()),
            _ => {
                tracing::info!(target: "enrich_task", "[{}] Resolution failed; nothing to extract.", task_label);
                return Enrichment {
                    lead: score_and_select(
                        &prospect.company_name,
                        &ExtractedContact::default(),
                        DeliverabilityStatus::Unknown,
                        &resolved,
                        config,
                    ),
                    resolved,
                    contacts: ExtractedContact::default(),
                    deliverability: DeliverabilityStatus::Unknown,
                };
            }
        };
        tracing::debug!(target: "enrich_task", "[{}] Resolved to {} ({})", task_label, final_url, domain);

        let jitter = get_random_sleep_duration(config);
        if !jitter.is_zero() {
            tracing::trace!(target: "enrich_task", "[{}] Sleeping {:.2?} before fetch", task_label, jitter);
            sleep(jitter).await;
        }

        let fetched = match self.fetcher.fetch(&final_url).await {
            Ok(page) if page.is_extractable() => Some(page.body),
            Ok(page) if !page.is_success() => {
                tracing::warn!(target: "enrich_task", "[{}] {} answered HTTP {}; skipping extraction.", task_label, final_url, page.status);
                None
            }
            Ok(page) => {
                tracing::warn!(target: "enrich_task", "[{}] {} is not HTML ({}); skipping extraction.",
                    task_label, final_url, page.content_type.as_deref().unwrap_or("unknown type"));
                None
            }
            Err(e) => {
                tracing::warn!(target: "enrich_task", "[{}] Fetch failed: {}", task_label, e);
                None
            }
        };

        let (contacts, deliverability) = match fetched {
            Some(body) => {
                let mut contacts = extract(&body);
                drop_ignored_emails(&mut contacts, &config.ignored_email_domains);
                tracing::info!(target: "enrich_task", "[{}] Found {} email(s), {} phone(s)",
                    task_label, contacts.emails.len(), contacts.phones.len());
                let deliverability =
                    check_mx(self.mx_lookup.as_ref(), &self.deliverability_cache, &domain).await;
                (contacts, deliverability)
            }
            None => (ExtractedContact::default(), DeliverabilityStatus::Unknown),
        };

        let lead = score_and_select(
            &prospect.company_name,
            &contacts,
            deliverability,
            &resolved,
            config,
        );

        tracing::info!(target: "enrich_task", "[{}] Enrichment finished in {:.2?}. Lead: {:?}",
            task_label, start_time.elapsed(), lead.as_ref().map(|l| (l.email.as_deref(), l.score)));

        Enrichment {
            resolved,
            contacts,
            deliverability,
            lead,
        }
    }
}

/// Removes addresses on placeholder or tracker domains (and their subdomains).
fn drop_ignored_emails(contacts: &mut ExtractedContact, ignored: &HashSet<String>) {
    contacts.emails.retain(|address, _| match email_domain(address) {
        Some(domain) => !ignored.iter().any(|blocked| {
            domain == blocked
                || domain
                    .strip_suffix(blocked.as_str())
                    .is_some_and(|rest| rest.ends_with('.'))
        }),
        None => false,
    });
}
