//! Error types for the lead enrichment library.

use serde::Serialize;
use thiserror::Error;

/// Coarse failure taxonomy used by the pipeline when degrading a prospect's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UrlMalformed,
    Unreachable,
    DnsUnknown,
    ParseMalformed,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::UrlMalformed => "url_malformed",
            ErrorKind::Unreachable => "unreachable",
            ErrorKind::DnsUnknown => "dns_unknown",
            ErrorKind::ParseMalformed => "parse_malformed",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed URL '{input}': {reason}")]
    UrlMalformed { input: String, reason: String },

    #[error("Site unreachable: {0}")]
    Unreachable(String),

    #[error("MX lookup inconclusive for {domain}: {reason}")]
    DnsUnknown { domain: String, reason: String },

    #[error("Malformed structured data: {0}")]
    ParseMalformed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl AppError {
    /// Maps the error onto the pipeline taxonomy. Plumbing errors have no kind.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::UrlMalformed { .. } => Some(ErrorKind::UrlMalformed),
            AppError::Unreachable(_) => Some(ErrorKind::Unreachable),
            AppError::DnsUnknown { .. } => Some(ErrorKind::DnsUnknown),
            AppError::ParseMalformed(_) => Some(ErrorKind::ParseMalformed),
            AppError::Config(_)
            | AppError::Initialization(_)
            | AppError::InputFormat(_)
            | AppError::Io(_)
            | AppError::Csv(_) => None,
        }
    }

    pub(crate) fn malformed(input: &str, reason: impl std::fmt::Display) -> Self {
        AppError::UrlMalformed {
            input: input.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn dns_unknown(domain: &str, reason: impl std::fmt::Display) -> Self {
        AppError::DnsUnknown {
            domain: domain.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
