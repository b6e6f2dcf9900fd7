// HTTP implementation of RedirectResolver.
//
// Follows exactly one redirect hop: redirects are disabled on the client and
// the Location header is read off the first response.

use crate::core::links::{LinkError, RedirectResolver};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;
use url::Url;

pub struct HttpRedirectResolver {
    client: Client,
}

impl HttpRedirectResolver {
    pub fn new() -> Result<Self, LinkError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .user_agent("GroupGuardBot/1.0")
            .build()
            .map_err(|e| LinkError::Resolution(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectResolver for HttpRedirectResolver {
    async fn resolve_redirect(&self, url: &Url, timeout: Duration) -> Result<Url, LinkError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| LinkError::Resolution(e.to_string()))?;

        let status = response.status();
        if status.is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    LinkError::Resolution(format!("redirect from {url} without a Location header"))
                })?;

            // Location may be relative to the original URL.
            url.join(location)
                .map_err(|e| LinkError::Resolution(e.to_string()))
        } else if status.is_success() {
            // Not a redirect after all; the link already points at its
            // destination.
            Ok(url.clone())
        } else {
            Err(LinkError::Resolution(format!(
                "unexpected status {status} from {url}"
            )))
        }
    }
}
