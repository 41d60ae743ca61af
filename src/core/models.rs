//! Data types flowing through the enrichment pipeline.

use crate::core::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use url::Url;

/// One prospect row as read from the input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectInput {
    pub company_name: String,
    pub candidate_url: String,
}

impl ProspectInput {
    pub fn new(company_name: impl Into<String>, candidate_url: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            candidate_url: candidate_url.into(),
        }
    }
}

/// Outcome of following a prospect's candidate URL.
///
/// A failed resolution carries no URL or domain, so downstream steps cannot
/// accidentally run extraction or MX lookups against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSite {
    Resolved { final_url: Url, domain: String },
    Failed(ErrorKind),
}

impl ResolvedSite {
    pub fn final_url(&self) -> Option<&Url> {
        match self {
            ResolvedSite::Resolved { final_url, .. } => Some(final_url),
            ResolvedSite::Failed(_) => None,
        }
    }

    pub fn domain(&self) -> Option<&str> {
        match self {
            ResolvedSite::Resolved { domain, .. } => Some(domain.as_str()),
            ResolvedSite::Failed(_) => None,
        }
    }

    pub fn resolution_error(&self) -> Option<ErrorKind> {
        match self {
            ResolvedSite::Resolved { .. } => None,
            ResolvedSite::Failed(kind) => Some(*kind),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedSite::Resolved { .. })
    }
}

/// How an email address was discovered. Variant order is the trust ranking:
/// `Raw < Mailto < Deobfuscated < JsonLd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailSource {
    Raw,
    Mailto,
    Deobfuscated,
    JsonLd,
}

impl EmailSource {
    /// Trust rank used by selection and scoring, 1 (raw) through 4 (json_ld).
    pub fn trust_rank(self) -> u8 {
        match self {
            EmailSource::Raw => 1,
            EmailSource::Mailto => 2,
            EmailSource::Deobfuscated => 3,
            EmailSource::JsonLd => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmailSource::Raw => "raw",
            EmailSource::Mailto => "mailto",
            EmailSource::Deobfuscated => "deobfuscated",
            EmailSource::JsonLd => "json_ld",
        }
    }
}

impl std::fmt::Display for EmailSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contacts found on a single page.
///
/// Emails are keyed by lowercase address and keep only their best discovery
/// method. Ordered collections keep repeated extractions byte-identical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContact {
    pub emails: BTreeMap<String, EmailSource>,
    pub phones: BTreeSet<String>,
}

impl ExtractedContact {
    /// Records an address, upgrading its method if `source` ranks higher.
    pub fn add_email(&mut self, address: &str, source: EmailSource) {
        let key = address.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.emails
            .entry(key)
            .and_modify(|existing| {
                if source > *existing {
                    *existing = source;
                }
            })
            .or_insert(source);
    }

    pub fn add_phone(&mut self, phone: String) {
        self.phones.insert(phone);
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.phones.is_empty()
    }

    pub fn email_source(&self, address: &str) -> Option<EmailSource> {
        self.emails.get(&address.to_lowercase()).copied()
    }
}

/// Result of the cheap MX presence check for a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliverabilityStatus {
    MxPresent,
    NoMx,
    Unknown,
}

impl DeliverabilityStatus {
    /// Ordering used by scoring: `mx_present > unknown > no_mx`.
    pub fn rank(self) -> u8 {
        match self {
            DeliverabilityStatus::MxPresent => 2,
            DeliverabilityStatus::Unknown => 1,
            DeliverabilityStatus::NoMx => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliverabilityStatus::MxPresent => "mx_present",
            DeliverabilityStatus::NoMx => "no_mx",
            DeliverabilityStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for DeliverabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of contact a lead row represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadKind {
    NamedEmail,
    RoleEmail,
    PhoneOnly,
    DomainOnly,
}

/// One output row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadRecord {
    pub company_name: String,
    pub final_url: Option<String>,
    pub domain: Option<String>,
    pub email: Option<String>,
    pub email_source: Option<EmailSource>,
    pub phone: Option<String>,
    pub source_url: Option<String>,
    pub verification_status: DeliverabilityStatus,
    pub score: u32,
    #[serde(skip)]
    pub kind: LeadKind,
}

/// Per-row outcome of the batch driver, kept in input order.
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub row_index: usize,
    pub prospect: ProspectInput,
    pub resolution_error: Option<ErrorKind>,
    pub emails_found: usize,
    pub phones_found: usize,
    pub deliverability: DeliverabilityStatus,
    pub lead: Option<LeadRecord>,
    pub skipped_reason: Option<String>,
}
