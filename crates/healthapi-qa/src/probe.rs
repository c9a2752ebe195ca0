//! Health, readiness and liveness probes against the system under test.

use crate::config::QaConfig;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const USER_AGENT: &str = concat!("HealthAPI-QA-Framework/", env!("CARGO_PKG_VERSION"));

/// Probe endpoints exposed by the target service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Probe {
    Health,
    Ready,
    Live,
}

impl Probe {
    pub const ALL: [Probe; 3] = [Probe::Health, Probe::Ready, Probe::Live];

    pub fn path(&self) -> &'static str {
        match self {
            Probe::Health => "/health",
            Probe::Ready => "/ready",
            Probe::Live => "/live",
        }
    }
}

/// Result of one probe request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeOutcome {
    pub probe: Probe,
    pub url: String,

    /// HTTP 200 with a JSON body carrying a string `status` field.
    pub healthy: bool,

    pub status_code: Option<u16>,

    /// Value of the body's `status` field, when present.
    pub status: Option<String>,

    pub error: Option<String>,
}

/// HTTP client bound to the configured target.
pub struct ProbeClient {
    client: reqwest::Client,
    base_url: String,
}

impl ProbeClient {
    pub fn new(config: &QaConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.target_base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one probe request. Transport and decoding failures are
    /// reported in the outcome.
    pub async fn check(&self, probe: Probe) -> ProbeOutcome {
        let url = format!("{}{}", self.base_url, probe.path());
        let mut outcome = ProbeOutcome {
            probe,
            url: url.clone(),
            healthy: false,
            status_code: None,
            status: None,
            error: None,
        };

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        let code = response.status();
        outcome.status_code = Some(code.as_u16());

        match response.json::<serde_json::Value>().await {
            Ok(body) => {
                outcome.status = body
                    .get("status")
                    .and_then(|s| s.as_str())
                    .map(str::to_string);
                if outcome.status.is_none() {
                    outcome.error = Some("response body has no status field".to_string());
                }
            }
            Err(e) => outcome.error = Some(format!("invalid JSON body: {}", e)),
        }

        if code != reqwest::StatusCode::OK && outcome.error.is_none() {
            outcome.error = Some(format!("unexpected HTTP status {}", code));
        }
        outcome.healthy = code == reqwest::StatusCode::OK && outcome.status.is_some();
        outcome
    }

    /// Check every probe once, in order.
    pub async fn check_all(&self) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(Probe::ALL.len());
        for probe in Probe::ALL {
            outcomes.push(self.check(probe).await);
        }
        outcomes
    }

    /// Poll `/health` until it is healthy or the attempts run out.
    pub async fn wait_for_target(&self, attempts: u32, delay: std::time::Duration) -> ProbeOutcome {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = self.check(Probe::Health).await;
            if outcome.healthy {
                info!(event = "probe.ready", url = %outcome.url, attempt = attempt, "Target is available");
                return outcome;
            }
            if attempt >= attempts {
                warn!(
                    event = "probe.unavailable",
                    url = %outcome.url,
                    attempts = attempts,
                    error = ?outcome.error,
                    "Target is not available"
                );
                return outcome;
            }
            warn!(
                event = "probe.retry",
                attempt = attempt,
                attempts = attempts,
                "Waiting for target..."
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Convenience: build a client from `config` and wait for the target using
/// the configured attempts and delay.
pub async fn wait_for_target(config: &QaConfig) -> Result<ProbeOutcome> {
    let client = ProbeClient::new(config)?;
    Ok(client
        .wait_for_target(config.probe_attempts, config.probe_delay())
        .await)
}
