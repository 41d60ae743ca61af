//! CSV input and output.

use crate::core::error::{AppError, Result};
use crate::core::models::{LeadRecord, ProspectInput};
use std::path::Path;

const COMPANY_COLUMNS: &[&str] = &[
    "company_name",
    "company",
    "name",
    "business_name",
    "organization",
];

const URL_COLUMNS: &[&str] = &[
    "url",
    "candidate_url",
    "website",
    "website_url",
    "domain",
    "site",
    "homepage",
];

/// Output header, in the order `LeadRecord` serialises its fields.
pub const LEAD_COLUMNS: &[&str] = &[
    "company_name",
    "final_url",
    "domain",
    "email",
    "email_source",
    "phone",
    "source_url",
    "verification_status",
    "score",
];

fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|wanted| headers.iter().position(|h| h == wanted))
}

/// Reads prospects from a header-driven CSV file.
///
/// Column names are matched case-insensitively against a few common
/// spellings. A file without any URL-like column is rejected.
pub fn load_prospects(path: impl AsRef<Path>) -> Result<Vec<ProspectInput>> {
    let path = path.as_ref();
    tracing::debug!("Opening input file: {}", path.display());
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let url_index = find_column(&headers, URL_COLUMNS).ok_or_else(|| {
        AppError::InputFormat(format!(
            "No URL column in '{}'. Expected one of: {}",
            path.display(),
            URL_COLUMNS.join(", ")
        ))
    })?;
    let company_index = find_column(&headers, COMPANY_COLUMNS);
    if company_index.is_none() {
        tracing::warn!(
            "No company column in '{}'; company names will be empty.",
            path.display()
        );
    }
    tracing::debug!(
        "Using URL column '{}' and company column {:?}",
        headers[url_index],
        company_index.map(|i| headers[i].as_str())
    );

    let mut prospects = Vec::new();
    for record in reader.records() {
        let record = record?;
        let field = |index: Option<usize>| {
            index
                .and_then(|i| record.get(i))
                .unwrap_or_default()
                .to_string()
        };
        prospects.push(ProspectInput::new(
            field(company_index),
            field(Some(url_index)),
        ));
    }
    Ok(prospects)
}

/// Writes `leads` as CSV with a fixed header, even when there are no rows.
pub fn save_leads(path: impl AsRef<Path>, leads: &[LeadRecord]) -> Result<()> {
    let path = path.as_ref();
    tracing::debug!("Writing {} leads to {}", leads.len(), path.display());
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(LEAD_COLUMNS)?;
    for lead in leads {
        writer.serialize(lead)?;
    }
    writer.flush()?;
    Ok(())
}
