//! Scan targets and hostname resolution.
//!
//! A [`ScanTarget`] pairs the host exactly as the user typed it with the one
//! address that was resolved for it. Resolution sits behind the [`Resolve`]
//! trait so the gate pipeline can be exercised without touching the network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// A single scan target that has been resolved to an IP address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The original input (hostname or IP string).
    pub original: String,
    /// The resolved IP address.
    pub ip: IpAddr,
}

impl ScanTarget {
    /// Create a new scan target.
    pub fn new(original: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            original: original.into(),
            ip,
        }
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.original, self.ip)
    }
}

/// Hostname resolution failure.
///
/// Callers never need to tell an unknown host from a resolver I/O failure, so
/// both collapse into one variant carrying the reason for display.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("hostname '{host}' could not be resolved: {reason}")]
    ResolutionFailed { host: String, reason: String },
}

impl ResolveError {
    fn failed(host: &str, reason: impl fmt::Display) -> Self {
        Self::ResolutionFailed {
            host: host.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Forward lookup of a host to a single address.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError>;

    /// Resolve `host` into a [`ScanTarget`].
    async fn resolve_target(&self, host: &str) -> Result<ScanTarget, ResolveError> {
        let ip = self.resolve(host).await?;
        debug!(host, %ip, "resolved target");
        Ok(ScanTarget::new(host, ip))
    }
}

/// Which [`Resolve`] implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Operating system resolver (hosts file, then DNS).
    #[default]
    System,
    /// Direct DNS queries using the system resolv.conf.
    Dns,
}

impl ResolverKind {
    pub fn build(self) -> Box<dyn Resolve> {
        match self {
            Self::System => Box::new(SystemResolver),
            Self::Dns => Box::new(DnsResolver::new()),
        }
    }
}

impl fmt::Display for ResolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Dns => write!(f, "dns"),
        }
    }
}

/// Resolver backed by the operating system's `getaddrinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| ResolveError::failed(host, e))?
            .map(|addr| addr.ip())
            .collect();

        pick_address(&addrs).ok_or_else(|| ResolveError::failed(host, "no addresses found"))
    }
}

/// Resolver that queries DNS servers directly.
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Build a resolver from the system configuration, falling back to the
    /// library defaults when it cannot be read.
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            debug!(error = %e, "system resolver config unavailable, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for DnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Resolve for DnsResolver {
    async fn resolve(&self, host: &str) -> Result<IpAddr, ResolveError> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(ip);
        }

        let response = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|e| ResolveError::failed(host, e))?;

        let addrs: Vec<IpAddr> = response.iter().collect();
        pick_address(&addrs).ok_or_else(|| ResolveError::failed(host, "no addresses found"))
    }
}

/// First IPv4 address, or the first address of any family.
fn pick_address(addrs: &[IpAddr]) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
