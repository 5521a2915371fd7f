//! Token validation against the forge's "current user" endpoint.

use super::ProviderKind;
use std::time::Duration;

/// Decides whether a token is accepted by the forge.
pub trait TokenValidator: Send + Sync {
    fn validate(&self, provider: ProviderKind, host: &str, token: &str) -> bool;
}

/// The endpoint that answers 2xx for a valid token.
///
/// GitHub Enterprise serves its API under `/api/v3` on the instance host,
/// public GitHub under `api.github.com`.
pub fn validation_url(provider: ProviderKind, host: &str) -> String {
    let host = host.trim_end_matches('/');
    match provider {
        ProviderKind::GitHub if host.eq_ignore_ascii_case("github.com") => {
            "https://api.github.com/user".to_string()
        }
        ProviderKind::GitHub => format!("https://{}/api/v3/user", host),
        ProviderKind::Gitea => format!("https://{}/api/v1/user", host),
    }
}

/// Validates with a blocking HTTP request.
pub struct HttpValidator {
    timeout: Duration,
}

impl Default for HttpValidator {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
        }
    }
}

impl HttpValidator {
    fn client(&self) -> reqwest::Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .user_agent(concat!("pkgmgr/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

impl TokenValidator for HttpValidator {
    fn validate(&self, provider: ProviderKind, host: &str, token: &str) -> bool {
        let url = validation_url(provider, host);
        let response = self.client().and_then(|client| {
            client
                .get(&url)
                .header("Authorization", format!("token {}", token))
                .header("Accept", "application/json")
                .send()
        });
        match response {
            Ok(response) => {
                log::debug!("GET {} -> {}", url, response.status());
                response.status().is_success()
            }
            Err(e) => {
                log::debug!("GET {} failed: {}", url, e);
                false
            }
        }
    }
}
