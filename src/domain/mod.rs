//! Domain normalization.
//!
//! Collapses a raw query name to the canonical registrable domain used as the
//! registry key, via the Public Suffix List. Subdomains are grouped: queries
//! for `mail.example.com` and `www.example.com` both normalize to
//! `example.com`. Pure function, no I/O.

use crate::error_handling::InvalidDomain;

/// Maximum hostname length accepted, per RFC 1035 presentation form.
const MAX_HOSTNAME_LEN: usize = 253;

/// Normalizes a raw query name to its canonical registrable domain.
///
/// Lowercases, strips one trailing dot, then collapses to the registrable
/// domain plus public suffix (e.g. `News.BBC.co.uk.` becomes `bbc.co.uk`).
///
/// # Errors
///
/// Returns `InvalidDomain` if the input is empty, an IP literal (policy:
/// IP-literal query targets are not tracked as domains), not a plausible
/// hostname, or has no registrable domain under the Public Suffix List
/// (e.g. `localhost`, bare TLDs).
pub fn normalize_domain(raw: &str) -> Result<String, InvalidDomain> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(InvalidDomain::Empty);
    }

    if trimmed.parse::<std::net::Ipv4Addr>().is_ok()
        || trimmed.parse::<std::net::Ipv6Addr>().is_ok()
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
    {
        return Err(InvalidDomain::IpLiteral(trimmed.to_string()));
    }

    let host = trimmed.to_ascii_lowercase();
    if !is_plausible_hostname(&host) {
        return Err(InvalidDomain::NotAHostname(trimmed.to_string()));
    }

    match psl::domain_str(&host) {
        Some(domain) => Ok(domain.to_string()),
        None => Err(InvalidDomain::NoRegistrableDomain(host)),
    }
}

/// Syntactic hostname check: dot-separated labels of letters, digits,
/// hyphens, and underscores (service labels like `_dmarc` are common in real
/// query streams; they disappear when collapsing to the registrable domain).
fn is_plausible_hostname(host: &str) -> bool {
    if host.len() > MAX_HOSTNAME_LEN || !host.contains('.') {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    })
}

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
