//! Payment gateways.
//!
//! The ledger only sees [`PaymentGateway`]. Two implementations exist: a
//! simulator that always approves after a fixed delay, and an HTTP client for
//! a real charge endpoint.

use crate::config::{PaymentConfig, PaymentMode};
use crate::models::RechargeRequest;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Prefix of simulator-issued transaction ids.
pub const TRANSACTION_PREFIX: &str = "TXN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    #[error("payment declined ({code}): {reason}")]
    Declined { code: String, reason: String },

    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    #[error("payment gateway not configured")]
    NotConfigured,
}

/// Proof of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeReceipt {
    pub transaction_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: &RechargeRequest) -> Result<ChargeReceipt, PaymentError>;

    fn name(&self) -> &'static str;
}

pub fn build_gateway(config: &PaymentConfig) -> Arc<dyn PaymentGateway> {
    match config.mode {
        PaymentMode::Simulated => Arc::new(SimulatedGateway::new(config.simulated_delay())),
        PaymentMode::Gateway => Arc::new(HttpGateway::new(config)),
    }
}

/// Approves every charge after `delay`, issuing `TXN{unix-millis}` ids.
pub struct SimulatedGateway {
    delay: Duration,
    last_issued: AtomicU64,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_issued: AtomicU64::new(0),
        }
    }

    /// Clock-derived id, bumped past the previous one when the clock has not
    /// moved so ids stay unique within the process.
    fn next_transaction_id(&self) -> String {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let mut last = self.last_issued.load(Ordering::SeqCst);
        loop {
            let next = now.max(last + 1);
            match self
                .last_issued
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return format!("{}{}", TRANSACTION_PREFIX, next),
                Err(current) => last = current,
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, request: &RechargeRequest) -> Result<ChargeReceipt, PaymentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let transaction_id = self.next_transaction_id();
        tracing::debug!(
            transaction_id = %transaction_id,
            amount = request.amount,
            "Simulated charge approved"
        );

        Ok(ChargeReceipt { transaction_id })
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Client for an HTTP charge endpoint (`POST {gateway_url}/charges`).
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Option<String>,
    key_id: String,
    key_secret: Secret<String>,
    timeout: Duration,
}

/// Body sent to the gateway.
#[derive(Debug, Serialize)]
pub struct ChargeRequest<'a> {
    pub amount: i64,
    pub currency: &'static str,
    pub phone_number: &'a str,
    pub operator: &'a str,
    pub user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ChargeResponse {
    pub transaction_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GatewayError {
    pub error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct GatewayErrorDetail {
    pub code: String,
    pub description: String,
}

impl HttpGateway {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config
                .gateway_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn charge(&self, request: &RechargeRequest) -> Result<ChargeReceipt, PaymentError> {
        let base_url = self.base_url.as_ref().ok_or(PaymentError::NotConfigured)?;
        let url = format!("{}/charges", base_url);

        let body = ChargeRequest {
            amount: request.amount,
            currency: "INR",
            phone_number: &request.phone_number,
            operator: &request.operator,
            user_id: &request.user_id,
            plan_id: request.selected_plan.as_ref().map(|p| p.id.as_str()),
            idempotency_key: request.idempotency_key.as_deref(),
        };

        let mut builder = self.client.post(&url).timeout(self.timeout).json(&body);
        if !self.key_id.is_empty() {
            builder = builder.basic_auth(&self.key_id, Some(self.key_secret.expose_secret()));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::Unavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PaymentError::Unavailable(e.to_string()))?;

        tracing::debug!(status = %status, "Gateway charge response");

        if status.is_server_error() {
            tracing::warn!(status = %status, body = %text, "Gateway failed to process charge");
            return Err(PaymentError::Unavailable(format!(
                "gateway returned {}",
                status
            )));
        }

        if status.is_success() {
            let charge: ChargeResponse = serde_json::from_str(&text).map_err(|e| {
                PaymentError::Unavailable(format!("unreadable gateway response: {}", e))
            })?;
            tracing::info!(
                transaction_id = %charge.transaction_id,
                amount = request.amount,
                "Gateway charge approved"
            );
            Ok(ChargeReceipt {
                transaction_id: charge.transaction_id,
            })
        } else {
            let error: GatewayError =
                serde_json::from_str(&text).unwrap_or_else(|_| GatewayError {
                    error: GatewayErrorDetail {
                        code: status.as_u16().to_string(),
                        description: text.clone(),
                    },
                });
            tracing::warn!(
                code = %error.error.code,
                description = %error.error.description,
                "Gateway charge declined"
            );
            Err(PaymentError::Declined {
                code: error.error.code,
                reason: error.error.description,
            })
        }
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}
