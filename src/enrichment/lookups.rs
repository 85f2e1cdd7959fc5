//! The lookup-service seam.
//!
//! [`LookupServices`] abstracts the three external calls an enrichment task
//! makes so the coordinator can be exercised in tests without network access.
//! [`NetworkLookups`] is the production implementation: hickory DNS for IP
//! resolution, raw WHOIS for the organization, Safe Browsing for reputation,
//! each time-boxed independently.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;

use super::safety::SafeBrowsingClient;
use super::whois;
use crate::config::{Config, SAFETY_TIMEOUT_SECS, WHOIS_TIMEOUT_SECS};
use crate::error_handling::{InitializationError, LookupError};
use crate::registry::SafetyStatus;

/// External lookup services consumed during enrichment.
///
/// All three calls are fallible and time-boxed by the implementation. IP and
/// organization are best-effort; the reputation check decides whether the
/// enrichment as a whole completes or fails.
pub trait LookupServices: Send + Sync + 'static {
    /// Resolves the domain to an IP address.
    fn resolve_ip(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<IpAddr, LookupError>> + Send;

    /// Looks up the owning organization.
    fn lookup_org(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<String, LookupError>> + Send;

    /// Queries the reputation service.
    fn check_reputation(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<SafetyStatus, LookupError>> + Send;
}

/// Production lookups backed by real network services.
pub struct NetworkLookups {
    resolver: Arc<TokioAsyncResolver>,
    safety: SafeBrowsingClient,
    skip_whois: bool,
    whois_timeout: Duration,
    safety_timeout: Duration,
}

impl NetworkLookups {
    pub fn new(
        config: &Config,
        resolver: Arc<TokioAsyncResolver>,
    ) -> Result<Self, InitializationError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SAFETY_TIMEOUT_SECS))
            .build()?;
        Ok(NetworkLookups {
            resolver,
            safety: SafeBrowsingClient::new(http, config.api_key.clone()),
            skip_whois: config.skip_whois,
            whois_timeout: Duration::from_secs(WHOIS_TIMEOUT_SECS),
            safety_timeout: Duration::from_secs(SAFETY_TIMEOUT_SECS),
        })
    }
}

impl LookupServices for NetworkLookups {
    fn resolve_ip(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<IpAddr, LookupError>> + Send {
        async move {
            // The resolver applies its own per-query timeout (DNS_TIMEOUT_SECS).
            let lookup = self
                .resolver
                .lookup_ip(domain)
                .await
                .map_err(|e| LookupError::Unavailable(e.to_string()))?;
            lookup.iter().next().ok_or(LookupError::NoAnswer)
        }
    }

    fn lookup_org(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<String, LookupError>> + Send {
        async move {
            if self.skip_whois {
                return Err(LookupError::NoAnswer);
            }
            tokio::time::timeout(self.whois_timeout, whois::lookup_org(domain))
                .await
                .map_err(|_| LookupError::Timeout("whois"))?
        }
    }

    fn check_reputation(
        &self,
        domain: &str,
    ) -> impl Future<Output = Result<SafetyStatus, LookupError>> + Send {
        async move {
            tokio::time::timeout(self.safety_timeout, self.safety.check(domain))
                .await
                .map_err(|_| LookupError::Timeout("safe browsing"))?
        }
    }
}
