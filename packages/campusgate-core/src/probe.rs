//! Connectivity probing against a generate-204 endpoint.
//!
//! The probe is the one signal the whole system trusts: HTTP 204 means the
//! portal is letting traffic through, anything else means it is not.
//! Transient failures (timeouts, DNS, refused connections) are routine on
//! a captive network and are folded into "offline" rather than raised.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Result of a single probe.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityState {
    pub online: bool,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConnectivityProbe {
    client: reqwest::Client,
    probe_url: String,
}

impl ConnectivityProbe {
    pub fn new(probe_url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build probe HTTP client")?;
        Ok(Self {
            client,
            probe_url: probe_url.to_string(),
        })
    }

    /// Probe once and record when we looked.
    pub async fn check(&self) -> ConnectivityState {
        let online = match self.client.get(&self.probe_url).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::NO_CONTENT,
            Err(e) => {
                tracing::debug!("Connectivity probe failed: {}", e);
                false
            }
        };
        ConnectivityState {
            online,
            observed_at: Utc::now(),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.check().await.online
    }

    /// Probe up to `retry_times` times, sleeping `wait_secs` between
    /// attempts. Returns true on the first success. The inter-attempt wait
    /// aborts as soon as `cancel` fires so shutdown never sits out a full
    /// backoff window.
    pub async fn is_connected_retry(
        &self,
        retry_times: u32,
        wait_secs: u64,
        cancel: &CancellationToken,
    ) -> bool {
        for attempt in 0..retry_times {
            if self.is_connected().await {
                return true;
            }
            tracing::debug!("Probe attempt {}/{} failed", attempt + 1, retry_times);
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(Duration::from_secs(wait_secs)) => {}
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn probe_for(server: &MockServer) -> ConnectivityProbe {
        ConnectivityProbe::new(&format!("{}/generate_204", server.uri()), 5).unwrap()
    }

    #[tokio::test]
    async fn status_204_means_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let probe = probe_for(&server).await;
        let state = probe.check().await;
        assert!(state.online);
    }

    #[tokio::test]
    async fn any_other_status_means_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = probe_for(&server).await;
        assert!(!probe.is_connected().await);
    }

    #[tokio::test]
    async fn transport_error_means_offline() {
        // Nothing is listening on this port.
        let probe = ConnectivityProbe::new("http://127.0.0.1:9/generate_204", 1).unwrap();
        assert!(!probe.is_connected().await);
    }

    #[tokio::test]
    async fn retry_probes_exactly_retry_times_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let probe = probe_for(&server).await;
        let cancel = CancellationToken::new();
        assert!(!probe.is_connected_retry(3, 0, &cancel).await);
        // expect(3) is verified when the mock server drops
    }

    #[tokio::test]
    async fn retry_stops_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let probe = probe_for(&server).await;
        let cancel = CancellationToken::new();
        assert!(probe.is_connected_retry(3, 0, &cancel).await);
    }

    #[tokio::test]
    async fn retry_wait_aborts_on_cancellation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let probe = probe_for(&server).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        // With a long wait a non-cancelled run would take minutes.
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            probe.is_connected_retry(3, 600, &cancel),
        )
        .await
        .expect("cancelled retry should return promptly");
        assert!(!result);
    }
}
