//! WHOIS organization lookup over TCP port 43.
//!
//! Two-hop lookup: ask IANA for the TLD's registry server, then query that
//! server for the domain and scrape an organization field out of the raw
//! key/value text. WHOIS output is wildly inconsistent across registries, so
//! parsing is a best-effort scan over the common field spellings.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::{IANA_WHOIS_SERVER, WHOIS_PORT};
use crate::error_handling::LookupError;

/// Organization field names seen in the wild, lowercase.
const ORG_FIELDS: [&str; 5] = [
    "registrant organization",
    "registrant organisation",
    "org-name",
    "orgname",
    "org",
];

/// Upper bound on the WHOIS response we keep; some servers dump history.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024;

/// Looks up the registrant organization for `domain`.
///
/// # Errors
///
/// `LookupError::Unavailable` on connection or I/O failure,
/// `LookupError::NoAnswer` when the registry answered but no organization
/// field could be found. The caller applies the time box.
pub async fn lookup_org(domain: &str) -> Result<String, LookupError> {
    let tld = domain.rsplit('.').next().unwrap_or(domain);
    let referral = whois_query(IANA_WHOIS_SERVER, tld).await?;
    let server = parse_referral(&referral).ok_or(LookupError::NoAnswer)?;

    let body = whois_query(&server, domain).await?;
    parse_organization(&body).ok_or(LookupError::NoAnswer)
}

/// One WHOIS exchange: connect, send the query line, read to EOF.
async fn whois_query(server: &str, query: &str) -> Result<String, LookupError> {
    let mut stream = TcpStream::connect((server, WHOIS_PORT))
        .await
        .map_err(|e| LookupError::Unavailable(format!("{server}: {e}")))?;
    stream
        .write_all(format!("{query}\r\n").as_bytes())
        .await
        .map_err(|e| LookupError::Unavailable(format!("{server}: {e}")))?;

    let mut response = String::new();
    stream
        .take(MAX_RESPONSE_BYTES)
        .read_to_string(&mut response)
        .await
        .map_err(|e| LookupError::Unavailable(format!("{server}: {e}")))?;
    Ok(response)
}

/// Extracts the referred registry server from an IANA TLD response.
fn parse_referral(response: &str) -> Option<String> {
    for line in response.lines() {
        let line = line.trim();
        for prefix in ["refer:", "whois:"] {
            if let Some(value) = line.strip_prefix(prefix) {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Scans raw WHOIS text for the first usable organization field.
fn parse_organization(response: &str) -> Option<String> {
    for line in response.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        if !ORG_FIELDS.contains(&key.as_str()) {
            continue;
        }
        let value = value.trim();
        // GDPR-era registries redact the field but keep the key.
        if value.is_empty() || value.to_ascii_lowercase().contains("redacted") {
            continue;
        }
        return Some(value.to_string());
    }
    None
}
