//! # Lead Sleuth CLI
//!
//! Command-line interface for the Lead Sleuth library (`lead_sleuth_core`).
//! This binary parses arguments, sets up configuration, initializes the core sleuth logic,
//! processes prospects (either a single URL or a CSV file), and writes the leads.

use lead_sleuth_core::{
    enrich_single_prospect, initialize_sleuth, load_prospects, process_prospects, save_leads,
    Config, ConfigBuilder, DomainOnlyPolicy, LeadKind, LeadRecord, LeadSleuth, ProcessingResult,
    ProspectInput,
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter, FmtSubscriber};

/// When a resolved prospect with no contacts still gets a row.
#[derive(Copy, Clone, Debug, ValueEnum)]
enum DomainOnlyMode {
    /// Only when the MX check reached a verdict
    KnownDeliverability,
    /// Always
    Always,
    /// Never
    Never,
}

impl From<DomainOnlyMode> for DomainOnlyPolicy {
    fn from(mode: DomainOnlyMode) -> Self {
        match mode {
            DomainOnlyMode::KnownDeliverability => DomainOnlyPolicy::KnownDeliverability,
            DomainOnlyMode::Always => DomainOnlyPolicy::Always,
            DomainOnlyMode::Never => DomainOnlyPolicy::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Enriches prospect websites into scored contact leads.",
    long_about = "Lead Sleuth resolves each prospect's website, extracts emails and phone numbers from the landing page (plain text, mailto links, obfuscated text and JSON-LD), checks the domain for MX records and ranks the best contact per prospect."
)]
struct AppArgs {
    /// Path to the input CSV file containing prospects (required in file mode).
    #[arg(short, long, default_value = "prospects.csv", env = "LEAD_SLEUTH_INPUT")]
    input: String,

    /// Path to the output CSV file where leads will be saved.
    #[arg(short, long, default_value = "leads.csv", env = "LEAD_SLEUTH_OUTPUT")]
    output: String,

    /// Website of a single prospect (enables single prospect CLI mode).
    #[arg(long, env = "LEAD_SLEUTH_URL")]
    url: Option<String>,

    /// Company name for the single prospect. Defaults to the URL.
    #[arg(long, env = "LEAD_SLEUTH_COMPANY", requires = "url")]
    company: Option<String>,

    /// Output results to standard output instead of a file (only in single prospect CLI mode).
    #[arg(long, default_value = "false", env = "LEAD_SLEUTH_STDOUT")]
    stdout: bool,

    /// Path to a configuration file (TOML format) to load settings from. CLI args override file settings.
    #[arg(long, env = "LEAD_SLEUTH_CONFIG")]
    config_file: Option<String>,

    /// Maximum number of concurrent processing tasks.
    #[arg(short, long, env = "LEAD_SLEUTH_CONCURRENCY")]
    concurrency: Option<usize>,

    /// User agent string for HTTP requests.
    #[arg(long, env = "LEAD_SLEUTH_USER_AGENT")]
    user_agent: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "LEAD_SLEUTH_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// DNS resolution timeout in seconds.
    #[arg(long, env = "LEAD_SLEUTH_DNS_TIMEOUT")]
    dns_timeout: Option<u64>,

    /// Comma-separated list of DNS servers (`ip` or `ip:port`) to use for lookups.
    #[arg(long, value_delimiter = ',', env = "LEAD_SLEUTH_DNS_SERVERS")]
    dns_servers: Option<Vec<String>>,

    /// Maximum number of redirects followed while resolving a website.
    #[arg(long, env = "LEAD_SLEUTH_MAX_REDIRECTS")]
    max_redirects: Option<usize>,

    /// Whether prospects with no contacts still produce a domain-only row.
    #[arg(long, value_enum, env = "LEAD_SLEUTH_DOMAIN_ONLY")]
    domain_only: Option<DomainOnlyMode>,

    /// Skip this many input rows before processing.
    #[arg(long, default_value_t = 0, env = "LEAD_SLEUTH_OFFSET")]
    offset: usize,

    /// Process at most this many rows (after the offset).
    #[arg(long, env = "LEAD_SLEUTH_LIMIT")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!("Lead Sleuth CLI v{} starting...", env!("CARGO_PKG_VERSION"));

    let args = AppArgs::parse();
    tracing::debug!("Parsed CLI arguments: {:?}", args);

    let config = match build_config(&args) {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    let sleuth = match initialize_sleuth(&config).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Initialization error: {}", e);
            return Err(anyhow::anyhow!(
                "Failed to initialize LeadSleuth core: {}",
                e
            ));
        }
    };

    let is_cli_mode = args.url.is_some();
    let start_time = Instant::now();

    let execution_result = if is_cli_mode {
        process_cli_mode(&config, &sleuth, &args).await
    } else {
        process_file_mode(config.clone(), sleuth, &args, start_time).await
    };

    if let Err(e) = execution_result {
        tracing::error!("Execution failed: {}", e);
        return Err(e);
    }

    if !is_cli_mode {
        tracing::info!(
            "Processing finished successfully. Total duration: {:.2?}",
            start_time.elapsed()
        );
    }

    Ok(())
}

fn build_config(args: &AppArgs) -> lead_sleuth_core::Result<Config> {
    let mut config_builder = ConfigBuilder::new();

    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(c) = args.concurrency {
        config_builder = config_builder.max_concurrency(c);
    }
    if let Some(ref ua) = args.user_agent {
        config_builder = config_builder.user_agent(ua);
    }
    if let Some(t) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(t));
    }
    if let Some(t) = args.dns_timeout {
        config_builder = config_builder.dns_timeout(Duration::from_secs(t));
    }
    if let Some(ref servers) = args.dns_servers {
        if !servers.is_empty() {
            config_builder = config_builder.dns_servers(servers.clone());
        }
    }
    if let Some(r) = args.max_redirects {
        config_builder = config_builder.max_redirects(r);
    }
    if let Some(mode) = args.domain_only {
        config_builder = config_builder.domain_only_policy(mode.into());
    }

    config_builder.build()
}

async fn process_cli_mode(config: &Config, sleuth: &LeadSleuth, args: &AppArgs) -> Result<()> {
    tracing::info!("Running in Single Prospect CLI mode.");
    let start_time = Instant::now();
    let url = args.url.clone().unwrap_or_default();
    let company = args.company.clone().unwrap_or_else(|| url.clone());

    tracing::info!("Enriching Company='{}', URL='{}'", company, url);
    let result = enrich_single_prospect(config, sleuth, 0, ProspectInput::new(company, url)).await;

    if args.stdout {
        print_cli_results(&result);
    } else {
        tracing::info!("Saving result to '{}'...", args.output);
        let leads: Vec<LeadRecord> = result.lead.iter().cloned().collect();
        prepare_output_path(&args.output)?;
        save_leads(&args.output, &leads)
            .with_context(|| format!("Failed to write leads to '{}'", args.output))?;
        tracing::info!("Result saved successfully to '{}'.", args.output);
    }
    tracing::info!("CLI mode finished. Duration: {:.2?}", start_time.elapsed());
    Ok(())
}

/// Creates the output's parent directory and checks the file is writable
/// before any network work starts.
fn prepare_output_path(output: &str) -> Result<()> {
    let output_path = Path::new(output);
    if let Some(parent_dir) = output_path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            tracing::debug!("Creating output directory: {}", parent_dir.display());
            std::fs::create_dir_all(parent_dir).with_context(|| {
                format!(
                    "Failed to create output directory '{}'",
                    parent_dir.display()
                )
            })?;
        }
    }
    File::create(output_path)
        .with_context(|| format!("Cannot write to output file '{}'. Check permissions.", output))?;
    tracing::debug!("Output path '{}' seems writable.", output);
    Ok(())
}

async fn process_file_mode(
    config: Arc<Config>,
    sleuth: Arc<LeadSleuth>,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    tracing::info!(
        "Running in File Processing mode. Input: '{}', Output: '{}'",
        args.input,
        args.output
    );
    let input_path = Path::new(&args.input);
    if !input_path.exists() || !input_path.is_file() {
        return Err(anyhow::anyhow!(
            "Input file not found or is not a file: {}",
            args.input
        ));
    }
    prepare_output_path(&args.output)?;

    tracing::info!("Loading prospects from '{}'...", args.input);
    let all_prospects = load_prospects(input_path)
        .with_context(|| format!("Failed to read prospects from '{}'", args.input))?;
    let total_in_file = all_prospects.len();

    let prospects: Vec<ProspectInput> = all_prospects
        .into_iter()
        .skip(args.offset)
        .take(args.limit.unwrap_or(usize::MAX))
        .collect();
    let total_records_loaded = prospects.len();
    if total_records_loaded == 0 {
        tracing::warn!(
            "No prospects to process in '{}' (offset {}, limit {:?}). Saving empty results file.",
            args.input,
            args.offset,
            args.limit
        );
        save_leads(&args.output, &[])?;
        return Ok(());
    }
    tracing::info!(
        "Loaded {} records from input file ({} selected).",
        total_in_file,
        total_records_loaded
    );

    tracing::info!(
        "Starting enrichment for {} records (Concurrency: {})...",
        total_records_loaded,
        config.max_concurrency
    );
    let pb = ProgressBar::new(total_records_loaded as u64);
    pb.set_style(ProgressStyle::default_bar()
         .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) | ETA: {eta} | {msg}")
         .context("Failed to set progress bar template")?
         .progress_chars("=> "));
    pb.set_message("Processing prospects...");

    let processed_results = process_prospects(config.clone(), sleuth, prospects, |result| {
        pb.set_message(result.prospect.company_name.clone());
        pb.inc(1);
    })
    .await;

    pb.finish_with_message(format!("Processed {} records", processed_results.len()));

    let leads: Vec<LeadRecord> = processed_results
        .iter()
        .filter_map(|r| r.lead.clone())
        .collect();

    tracing::info!("Saving {} leads to '{}'...", leads.len(), args.output);
    save_leads(&args.output, &leads)
        .with_context(|| format!("Failed to write leads to '{}'", args.output))?;
    tracing::info!("Results saved successfully.");

    log_summary(
        &processed_results,
        total_records_loaded,
        start_time.elapsed(),
    );

    Ok(())
}

/// Logs a summary of the processing results to the console using `tracing::info`.
fn log_summary(processed_results: &[ProcessingResult], original_total: usize, duration: Duration) {
    let total_processed = processed_results.len();
    let count_kind = |kind: LeadKind| {
        processed_results
            .iter()
            .filter(|r| r.lead.as_ref().is_some_and(|l| l.kind == kind))
            .count()
    };
    let leads_emitted = processed_results.iter().filter(|r| r.lead.is_some()).count();
    let skipped_input = processed_results
        .iter()
        .filter(|r| r.skipped_reason.is_some())
        .count();
    let unresolved = processed_results
        .iter()
        .filter(|r| r.resolution_error.is_some())
        .count();
    let no_lead = processed_results
        .iter()
        .filter(|r| r.skipped_reason.is_none() && r.resolution_error.is_none() && r.lead.is_none())
        .count();

    tracing::info!("-------------------- Processing Summary --------------------");
    tracing::info!("Total Records Selected      : {}", original_total);
    tracing::info!("Records Processed/Attempted : {}", total_processed);
    tracing::info!("Leads Written               : {}", leads_emitted);
    tracing::info!("  - Named Email             : {}", count_kind(LeadKind::NamedEmail));
    tracing::info!("  - Role Email              : {}", count_kind(LeadKind::RoleEmail));
    tracing::info!("  - Phone Only              : {}", count_kind(LeadKind::PhoneOnly));
    tracing::info!("  - Domain Only             : {}", count_kind(LeadKind::DomainOnly));
    tracing::info!("No Actionable Lead          : {}", no_lead);
    tracing::info!("Unresolved Websites         : {}", unresolved);
    tracing::info!("Skipped (Invalid Input)     : {}", skipped_input);
    tracing::info!("Total Time Taken            : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && total_processed > 0 {
        let rate = (total_processed as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate             : {:.2} records/sec", rate);
    }
    tracing::info!("----------------------------------------------------------");
}

/// Prints the result for a single prospect to standard output (CLI mode).
fn print_cli_results(result: &ProcessingResult) {
    const BLUE: &str = "\x1b[34m";
    const GREEN: &str = "\x1b[32m";
    const YELLOW: &str = "\x1b[33m";
    const RED: &str = "\x1b[31m";
    const RESET: &str = "\x1b[0m";

    println!("\n{BLUE}===== Lead Sleuth Results ====={RESET}");
    println!("Company: {}", result.prospect.company_name);
    println!("URL:     {}", result.prospect.candidate_url);

    if let Some(reason) = &result.skipped_reason {
        println!("\n{YELLOW}Status: SKIPPED{RESET}");
        println!("Reason: {}", reason);
    } else if let Some(kind) = result.resolution_error {
        println!("\n{RED}Status: UNRESOLVED{RESET}");
        println!("Error:  {}", kind);
    } else if let Some(lead) = &result.lead {
        let colour = match lead.kind {
            LeadKind::NamedEmail | LeadKind::RoleEmail => GREEN,
            LeadKind::PhoneOnly | LeadKind::DomainOnly => YELLOW,
        };
        println!("\n{colour}Status: LEAD FOUND{RESET}");
        println!("Final URL:    {}", lead.final_url.as_deref().unwrap_or("N/A"));
        println!("Domain:       {}", lead.domain.as_deref().unwrap_or("N/A"));
        match (&lead.email, lead.email_source) {
            (Some(email), Some(source)) => {
                println!("Email:        {GREEN}{}{RESET} (via {})", email, source)
            }
            _ => println!("Email:        N/A"),
        }
        println!("Phone:        {}", lead.phone.as_deref().unwrap_or("N/A"));
        println!("Deliverable:  {}", lead.verification_status);
        println!("Score:        {}", lead.score);
    } else {
        println!("\n{YELLOW}Status: NO LEAD{RESET}");
        println!(
            "Reason: No contacts found and deliverability was {}.",
            result.deliverability
        );
    }

    println!(
        "\n{BLUE}Contacts on page:{RESET} {} email(s), {} phone(s)",
        result.emails_found, result.phones_found
    );
    println!("{BLUE}=============================={RESET}\n");
}
