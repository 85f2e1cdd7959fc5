//! Domain reputation check via the Google Safe Browsing v4 API.

use reqwest::Client;

use crate::config::{SAFE_BROWSING_ENDPOINT, SAFE_BROWSING_THREAT_TYPES};
use crate::error_handling::LookupError;
use crate::registry::SafetyStatus;

/// Client for the Safe Browsing threat-match endpoint.
pub struct SafeBrowsingClient {
    http: Client,
    api_key: Option<String>,
}

impl SafeBrowsingClient {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        SafeBrowsingClient { http, api_key }
    }

    /// Checks `domain` against the threat lists.
    ///
    /// An empty `matches` array means no known threat (`Safe`); any match
    /// means `Unsafe`. A missing API key fails fast so the observation
    /// settles at `LookupFailed` instead of masquerading as verified safe.
    pub async fn check(&self, domain: &str) -> Result<SafetyStatus, LookupError> {
        let api_key = self.api_key.as_deref().ok_or(LookupError::MissingApiKey)?;

        let payload = serde_json::json!({
            "client": {
                "clientId": "domain_watch",
                "clientVersion": env!("CARGO_PKG_VERSION"),
            },
            "threatInfo": {
                "threatTypes": SAFE_BROWSING_THREAT_TYPES,
                "platformTypes": ["ANY_PLATFORM"],
                "threatEntryTypes": ["URL"],
                "threatEntries": [{ "url": format!("http://{domain}/") }],
            },
        });

        let response = self
            .http
            .post(format!("{SAFE_BROWSING_ENDPOINT}?key={api_key}"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;
        let flagged = body
            .get("matches")
            .and_then(|m| m.as_array())
            .map(|m| !m.is_empty())
            .unwrap_or(false);

        Ok(if flagged {
            SafetyStatus::Unsafe
        } else {
            SafetyStatus::Safe
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let client = SafeBrowsingClient::new(Client::new(), None);
        let result = client.check("example.com").await;
        assert!(matches!(result, Err(LookupError::MissingApiKey)));
    }
}
