//! # Lead Sleuth Core Library
//!
//! This crate turns a list of prospects (company name plus candidate website)
//! into scored leads: it resolves each site, pulls contact emails and phone
//! numbers out of the landing page, checks the domain for MX records and
//! ranks what it found.
//!
//! It is designed to be used either directly as a library or via the `lead-sleuth`
//! command-line tool (which uses this library).

mod core;
mod utils;

pub use crate::core::config::{Config, ConfigBuilder, ConfigFile, DomainOnlyPolicy};
pub use crate::core::error::{AppError, ErrorKind, Result};
pub use crate::core::models::{
    DeliverabilityStatus, EmailSource, ExtractedContact, LeadKind, LeadRecord, ProcessingResult,
    ProspectInput, ResolvedSite,
};
pub use crate::core::scoring::{is_role_email, score_and_select, select_email, ScoreKey};
pub use crate::core::sleuth::{Enrichment, LeadSleuth};
pub use crate::utils::dns::{check_mx, DeliverabilityCache, MailExchangeLookup};
pub use crate::utils::extract::extract;
pub use crate::utils::fetch::{FetchedPage, PageFetcher};
pub use crate::utils::resolver::SiteResolver;
pub use crate::utils::tabular::{load_prospects, save_leads};

use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;

/// Initializes shared resources like the HTTP client and DNS resolver.
/// Essential for creating a `LeadSleuth` instance.
pub async fn initialize_sleuth(config: &Config) -> Result<LeadSleuth> {
    LeadSleuth::new(config).await
}

/// Processes a single prospect and packages the outcome.
///
/// Rows without a candidate URL are reported as skipped without touching
/// the network.
pub async fn enrich_single_prospect(
    config: &Config,
    sleuth: &LeadSleuth,
    row_index: usize,
    prospect: ProspectInput,
) -> ProcessingResult {
    let task_id = format!("Row {}: {}", row_index + 1, prospect.company_name);
    tracing::info!(target: "enrich_task", "[{}] Starting processing.", task_id);

    if let Err(reason) = validate_prospect_input(&prospect) {
        tracing::warn!(target: "enrich_task", "[{}] Skipping record. Reason: {}", task_id, reason);
        return ProcessingResult::skipped(row_index, prospect, reason);
    }

    let enrichment = sleuth.enrich(config, &prospect).await;
    match &enrichment.lead {
        Some(lead) => {
            tracing::info!(target: "enrich_task",
                "[{}] Lead: {} (score {}, {})",
                task_id,
                lead.email.as_deref().or(lead.phone.as_deref()).unwrap_or("domain only"),
                lead.score,
                lead.verification_status
            );
        }
        None => {
            tracing::info!(target: "enrich_task", "[{}] No actionable lead.", task_id);
        }
    }
    ProcessingResult::from_enrichment(row_index, prospect, enrichment)
}

/// Enriches every prospect with at most `config.max_concurrency` in flight.
///
/// `on_complete` is called as each row finishes (in completion order). The
/// returned results are sorted back into input order.
pub async fn process_prospects<F>(
    config: Arc<Config>,
    sleuth: Arc<LeadSleuth>,
    prospects: Vec<ProspectInput>,
    mut on_complete: F,
) -> Vec<ProcessingResult>
where
    F: FnMut(&ProcessingResult),
{
    let total_records = prospects.len();
    if total_records == 0 {
        return Vec::new();
    }

    let mut tasks = FuturesUnordered::new();
    let mut results = Vec::with_capacity(total_records);

    for (row_index, prospect) in prospects.into_iter().enumerate() {
        if let Err(reason) = validate_prospect_input(&prospect) {
            tracing::warn!("Row {} skipped: {}", row_index + 1, reason);
            let skipped = ProcessingResult::skipped(row_index, prospect, reason);
            on_complete(&skipped);
            results.push(skipped);
            continue;
        }

        while tasks.len() >= config.max_concurrency {
            if let Some(join_handle_result) = tasks.next().await {
                match join_handle_result {
                    Ok(processing_result) => {
                        on_complete(&processing_result);
                        results.push(processing_result);
                    }
                    Err(e) => {
                        tracing::error!("A processing task failed to join: {}", e);
                    }
                }
            } else {
                tracing::warn!("Task queue unexpectedly empty while limiting concurrency.");
                break;
            }
        }

        let sleuth_clone = Arc::clone(&sleuth);
        let config_clone = Arc::clone(&config);

        tasks.push(tokio::spawn(async move {
            enrich_single_prospect(&config_clone, &sleuth_clone, row_index, prospect).await
        }));
    }

    while let Some(join_handle_result) = tasks.next().await {
        match join_handle_result {
            Ok(processing_result) => {
                on_complete(&processing_result);
                results.push(processing_result);
            }
            Err(e) => {
                tracing::error!("A processing task failed to join during final drain: {}", e);
            }
        }
    }

    results.sort_by_key(|r| r.row_index);
    results
}

fn validate_prospect_input(prospect: &ProspectInput) -> std::result::Result<(), String> {
    if prospect.candidate_url.trim().is_empty() {
        return Err("Missing candidate URL".to_string());
    }
    Ok(())
}

impl ProcessingResult {
    fn skipped(row_index: usize, prospect: ProspectInput, reason: String) -> Self {
        Self {
            row_index,
            prospect,
            resolution_error: None,
            emails_found: 0,
            phones_found: 0,
            deliverability: DeliverabilityStatus::Unknown,
            lead: None,
            skipped_reason: Some(reason),
        }
    }

    fn from_enrichment(row_index: usize, prospect: ProspectInput, enrichment: Enrichment) -> Self {
        Self {
            row_index,
            prospect,
            resolution_error: enrichment.resolved.resolution_error(),
            emails_found: enrichment.contacts.emails.len(),
            phones_found: enrichment.contacts.phones.len(),
            deliverability: enrichment.deliverability,
            lead: enrichment.lead,
            skipped_reason: None,
        }
    }
}
