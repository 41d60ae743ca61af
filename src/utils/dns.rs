//! MX presence checks with a per-run, per-domain cache.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::DeliverabilityStatus;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::op::ResponseCode;
use trust_dns_resolver::TokioAsyncResolver;

/// Source of MX answers.
///
/// `Ok(hosts)` is an authoritative answer (empty when the domain exists but
/// publishes no MX). Anything inconclusive is an `Err`.
#[async_trait]
pub trait MailExchangeLookup: Send + Sync {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>>;
}

/// Parses a configured name server: `1.1.1.1`, `[::1]:5353` or `127.0.0.1:5353`.
/// Port 53 when none is given.
pub(crate) fn parse_name_server(server: &str) -> Option<SocketAddr> {
    let server = server.trim();
    server
        .parse::<SocketAddr>()
        .ok()
        .or_else(|| server.parse::<IpAddr>().ok().map(|ip| SocketAddr::new(ip, 53)))
}

/// Creates the async resolver, using explicit name servers when configured
/// and the system configuration otherwise.
pub(crate) fn create_resolver(config: &Config) -> Result<TokioAsyncResolver> {
    let mut opts = ResolverOpts::default();
    opts.timeout = config.dns_timeout;
    opts.attempts = 1;

    if !config.dns_servers.is_empty() {
        let addrs = config
            .dns_servers
            .iter()
            .map(|s| {
                parse_name_server(s).ok_or_else(|| {
                    AppError::Initialization(format!("Invalid DNS server '{}'", s))
                })
            })
            .collect::<Result<Vec<SocketAddr>>>()?;
        tracing::debug!("Using custom DNS servers: {:?}", addrs);
        let mut group = NameServerConfigGroup::new();
        for addr in &addrs {
            group.merge(NameServerConfigGroup::from_ips_clear(
                &[addr.ip()],
                addr.port(),
                true,
            ));
        }
        let resolver_config = ResolverConfig::from_parts(None, vec![], group);
        return Ok(TokioAsyncResolver::tokio(resolver_config, opts));
    }

    match trust_dns_resolver::system_conf::read_system_conf() {
        Ok((system_config, _)) => Ok(TokioAsyncResolver::tokio(system_config, opts)),
        Err(e) => {
            tracing::warn!(
                "Could not read system DNS configuration ({}). Falling back to defaults.",
                e
            );
            Ok(TokioAsyncResolver::tokio(ResolverConfig::default(), opts))
        }
    }
}

/// `MailExchangeLookup` over trust-dns, bounded by the configured timeout.
pub struct DnsMxLookup {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl DnsMxLookup {
    pub fn new(resolver: TokioAsyncResolver, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }
}

#[async_trait]
impl MailExchangeLookup for DnsMxLookup {
    async fn lookup_mx(&self, domain: &str) -> Result<Vec<String>> {
        let fqdn = format!("{}.", domain.trim_end_matches('.'));
        let lookup = tokio::time::timeout(self.timeout, self.resolver.mx_lookup(fqdn.as_str()))
            .await
            .map_err(|_| AppError::dns_unknown(domain, "lookup timed out"))?;

        match lookup {
            Ok(answer) => {
                let mut hosts: Vec<(u16, String)> = answer
                    .iter()
                    .map(|mx| (mx.preference(), mx.exchange().to_utf8()))
                    .collect();
                hosts.sort();
                Ok(hosts.into_iter().map(|(_, host)| host).collect())
            }
            Err(e) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { response_code, .. }
                    if *response_code == ResponseCode::NoError =>
                {
                    Ok(Vec::new())
                }
                _ => Err(AppError::dns_unknown(domain, e)),
            },
        }
    }
}

/// Deliverability verdicts shared by every task of a run.
#[derive(Debug, Clone, Default)]
pub struct DeliverabilityCache {
    inner: Arc<RwLock<HashMap<String, DeliverabilityStatus>>>,
}

impl DeliverabilityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str) -> Option<DeliverabilityStatus> {
        self.inner.read().get(domain).copied()
    }

    pub fn insert(&self, domain: &str, status: DeliverabilityStatus) {
        self.inner.write().insert(domain.to_string(), status);
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Classifies `domain` as `mx_present`, `no_mx` or `unknown`.
///
/// Any lookup failure degrades to `unknown`. Verdicts are cached per domain,
/// so repeated calls for the same domain hit the network at most once
/// (barring two tasks racing on a cold entry).
pub async fn check_mx(
    lookup: &dyn MailExchangeLookup,
    cache: &DeliverabilityCache,
    domain: &str,
) -> DeliverabilityStatus {
    let domain = domain.trim().trim_end_matches('.').to_lowercase();
    if domain.is_empty() {
        return DeliverabilityStatus::Unknown;
    }
    if let Some(status) = cache.get(&domain) {
        tracing::trace!(target: "mx_task", "Cache hit for {}: {}", domain, status);
        return status;
    }

    let status = match lookup.lookup_mx(&domain).await {
        Ok(hosts) if hosts.is_empty() => {
            tracing::debug!(target: "mx_task", "{} has no MX records", domain);
            DeliverabilityStatus::NoMx
        }
        Ok(hosts) => {
            tracing::debug!(target: "mx_task", "{} MX: {}", domain, hosts.join(", "));
            DeliverabilityStatus::MxPresent
        }
        Err(e) => {
            tracing::warn!(target: "mx_task", "{}", e);
            DeliverabilityStatus::Unknown
        }
    };

    cache.insert(&domain, status);
    status
}
