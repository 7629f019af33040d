//! Client-side resolution gateway
//!
//! Posts a finished game's outcome to the resolver service and returns the
//! settlement receipt. Error bodies may be JSON or plain text.

use crate::common::multiplier_to_percent;
use crate::errors::ResolutionError;
use crate::resolver::{ResolutionReceipt, ResolveRequest, Resolver};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(120);

/// Outcome of one finished game, as posted to `/resolve-game`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeReport {
    pub game_id: String,
    pub did_win: bool,
    pub multiplier: f64,
    pub game_type: String,
    pub player: String,
}

impl From<&OutcomeReport> for ResolveRequest {
    fn from(report: &OutcomeReport) -> Self {
        Self {
            game_id: report.game_id.clone(),
            did_win: report.did_win,
            multiplier: report.multiplier,
            game_type: Some(report.game_type.clone()),
            player: Some(report.player.clone()),
        }
    }
}

/// Anything that can settle a reported outcome
#[async_trait]
pub trait Resolution: Send + Sync {
    async fn resolve_game(&self, report: &OutcomeReport) -> Result<ResolutionReceipt, ResolutionError>;
}

/// HTTP client for the resolver service
#[derive(Clone)]
pub struct ResolutionGateway {
    endpoint: Url,
    http: HttpClient,
    retry: RetryPolicy,
}

impl ResolutionGateway {
    pub fn new(base_url: &str) -> Result<Self, ResolutionError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| ResolutionError::InvalidRequest(format!("invalid resolver url {}: {}", base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("resolve-game")
            .map_err(|e| ResolutionError::InvalidRequest(e.to_string()))?;

        let http = HttpClient::builder()
            .timeout(TIMEOUT)
            .build()
            .map_err(|e| ResolutionError::Network(e.to_string()))?;

        Ok(Self {
            endpoint,
            http,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post_with_retry(&self, report: &OutcomeReport) -> Result<reqwest::Response, ResolutionError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.http.post(self.endpoint.clone()).json(report).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable_status(status) || attempt >= max_attempts {
                        return Ok(response);
                    }
                    debug!(game_id = %report.game_id, attempt, %status, "Resolver busy, retrying");
                }
                Err(err) => {
                    if attempt >= max_attempts || !is_retryable_error(&err) {
                        return Err(ResolutionError::Network(err.to_string()));
                    }
                    debug!(game_id = %report.game_id, attempt, error = %err, "Resolver unreachable, retrying");
                }
            }
            self.retry.pause(attempt).await;
        }
    }
}

#[async_trait]
impl Resolution for ResolutionGateway {
    async fn resolve_game(&self, report: &OutcomeReport) -> Result<ResolutionReceipt, ResolutionError> {
        let response = self.post_with_retry(report).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ResolutionError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message_from_body(status.as_u16(), &body);
            warn!(game_id = %report.game_id, status = status.as_u16(), %message, "Resolution failed");
            return Err(ResolutionError::Service {
                status: status.as_u16(),
                code: error_code_from_body(&body),
                message,
            });
        }

        let parsed: ResolveResponseBody = serde_json::from_str(&body).map_err(|e| ResolutionError::Service {
            status: status.as_u16(),
            code: None,
            message: format!("Unreadable resolver response: {}", e),
        })?;
        Ok(parsed.into_receipt(report))
    }
}

/// Success body of `/resolve-game`. Only the hash is guaranteed; the rest
/// falls back to what was reported.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResolveResponseBody {
    transaction_hash: String,
    game_id: Option<String>,
    did_win: Option<bool>,
    multiplier: Option<f64>,
    multiplier_percent: Option<u64>,
    block_number: Option<u64>,
}

impl ResolveResponseBody {
    fn into_receipt(self, report: &OutcomeReport) -> ResolutionReceipt {
        let multiplier = self.multiplier.unwrap_or(report.multiplier);
        let multiplier_percent = self
            .multiplier_percent
            .or_else(|| multiplier_to_percent(multiplier))
            .unwrap_or(100);
        ResolutionReceipt {
            transaction_hash: self.transaction_hash,
            game_id: self.game_id.unwrap_or_else(|| report.game_id.clone()),
            did_win: self.did_win.unwrap_or(report.did_win),
            multiplier,
            multiplier_percent,
            block_number: self.block_number,
        }
    }
}

/// Resolution that calls a resolver in the same process
pub struct InProcessResolution {
    resolver: Arc<dyn Resolver>,
}

impl InProcessResolution {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Resolution for InProcessResolution {
    async fn resolve_game(&self, report: &OutcomeReport) -> Result<ResolutionReceipt, ResolutionError> {
        self.resolver.resolve_game(&ResolveRequest::from(report)).await
    }
}

/// Extract a readable message from a failed response body.
///
/// JSON bodies yield `message`, then `error`; anything else is returned as
/// raw text so the failure is never lost.
pub fn error_message_from_body(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("Failed to resolve game (Status: {})", status);
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            for field in ["message", "error"] {
                if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                    if !text.is_empty() {
                        return text.to_string();
                    }
                }
            }
            if value.as_object().map_or(false, |o| o.is_empty()) {
                return "Resolver configuration error - check server logs".to_string();
            }
            return trimmed.to_string();
        }
    }

    trimmed.to_string()
}

/// Machine-readable `error` code of a JSON error body, when present
pub fn error_code_from_body(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body.trim())
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::REQUEST_TIMEOUT
            | StatusCode::TOO_MANY_REQUESTS
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
