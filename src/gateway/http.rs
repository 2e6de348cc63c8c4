use crate::gateway::error::{GatewayError, GatewayResult};
use reqwest::Client;
use std::time::Duration;

/// Thin HTTP client for form-encoded processor APIs.
///
/// No retry loop here: a failed or rejected initiate is fatal for the attempt
/// and surfaced to the caller. Timeouts are the transport's concern.
#[derive(Clone)]
pub struct GatewayHttpClient {
    client: Client,
    timeout: Duration,
}

impl GatewayHttpClient {
    pub fn new(timeout: Duration) -> GatewayResult<Self> {
        let client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| GatewayError::NetworkError {
                    message: format!("failed to initialize HTTP client: {}", e),
                })?;

        Ok(Self { client, timeout })
    }

    /// POST a form-encoded body and return the raw response text.
    pub async fn post_form(&self, url: &str, body: &str) -> GatewayResult<String> {
        let response = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError {
                message: format!("processor request failed: {}", e),
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::NetworkError {
                message: format!("failed to read processor response: {}", e),
            })?;

        if !status.is_success() {
            return Err(GatewayError::ProviderError {
                driver: "http".to_string(),
                message: format!("processor returned HTTP {}: {}", status.as_u16(), text),
                retryable: status.is_server_error(),
            });
        }

        Ok(text)
    }
}
