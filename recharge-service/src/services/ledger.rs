//! Recharge transaction ledger.
//!
//! Validates a recharge, charges it through the configured
//! [`PaymentGateway`] and prepends the resulting record to the persisted,
//! newest-first transaction log. Only confirmed charges are ever recorded.

use crate::models::{LedgerSummary, RechargeRequest, TransactionRecord};
use crate::services::metrics;
use crate::services::payment::{PaymentError, PaymentGateway};
use crate::services::store::{LedgerStore, StorageError};
use chrono::Utc;
use recharge_core::error::AppError;
use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::Mutex;
use validator::ValidationErrors;

/// Storage key of the ledger document.
pub const LEDGER_KEY: &str = "transactions";

#[derive(Debug, Error)]
pub enum RechargeError {
    #[error("invalid recharge request: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("a submission with idempotency key '{0}' is already in progress")]
    DuplicateSubmission(String),

    #[error("idempotency key '{0}' was already used for a different recharge")]
    IdempotencyKeyReused(String),

    #[error("transaction '{0}' is already recorded")]
    DuplicateTransaction(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<RechargeError> for AppError {
    fn from(err: RechargeError) -> Self {
        match err {
            RechargeError::Validation(errors) => AppError::ValidationError(errors),
            RechargeError::Payment(PaymentError::Unavailable(reason)) => {
                AppError::BadGateway(reason)
            }
            RechargeError::Payment(PaymentError::NotConfigured) => AppError::ServiceUnavailable,
            RechargeError::Payment(e) => AppError::PaymentRequired(e.to_string()),
            e @ (RechargeError::DuplicateSubmission(_)
            | RechargeError::IdempotencyKeyReused(_)
            | RechargeError::DuplicateTransaction(_)) => AppError::Conflict(anyhow::Error::new(e)),
            RechargeError::Storage(e) => AppError::StorageError(anyhow::Error::new(e)),
        }
    }
}

pub struct RechargeLedger {
    store: Arc<dyn LedgerStore>,
    gateway: Arc<dyn PaymentGateway>,
    /// Serializes read-modify-write of the ledger document.
    write_lock: Mutex<()>,
    /// `(user_id, idempotency_key)` pairs with a charge in progress.
    in_flight: StdMutex<HashSet<(String, String)>>,
}

/// Releases an idempotency key when the submission holding it finishes.
struct InFlightGuard<'a> {
    keys: &'a StdMutex<HashSet<(String, String)>>,
    key: (String, String),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut keys = self.keys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        keys.remove(&self.key);
    }
}

impl RechargeLedger {
    pub fn new(store: Arc<dyn LedgerStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            store,
            gateway,
            write_lock: Mutex::new(()),
            in_flight: StdMutex::new(HashSet::new()),
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Charges a validated recharge and records it.
    ///
    /// Nothing is charged or written when validation fails, and nothing is
    /// written when the charge is declined. Idempotency keys are scoped to the
    /// user: a key already recorded for the same recharge returns the existing
    /// record without charging again, and one recorded for a different recharge
    /// is rejected.
    pub async fn submit(
        &self,
        request: RechargeRequest,
    ) -> Result<TransactionRecord, RechargeError> {
        if let Err(errors) = request.check() {
            let fields: Vec<String> = errors
                .field_errors()
                .keys()
                .map(|field| field.to_string())
                .collect();
            tracing::info!(
                user_id = %request.user_id,
                fields = ?fields,
                "Recharge rejected by validation"
            );
            metrics::record_submission("invalid");
            return Err(errors.into());
        }

        let _guard = match &request.idempotency_key {
            Some(key) => {
                let guard = self.claim(&request.user_id, key)?;
                if let Some(existing) = self
                    .find_by_idempotency_key(&request.user_id, key)
                    .await?
                {
                    if !existing.request.same_recharge(&request) {
                        tracing::warn!(
                            user_id = %request.user_id,
                            idempotency_key = %key,
                            transaction_id = %existing.transaction_id,
                            "Idempotency key reused for a different recharge"
                        );
                        metrics::record_submission("duplicate");
                        return Err(RechargeError::IdempotencyKeyReused(key.clone()));
                    }
                    tracing::info!(
                        transaction_id = %existing.transaction_id,
                        idempotency_key = %key,
                        "Duplicate submission collapsed onto recorded transaction"
                    );
                    metrics::record_submission("replayed");
                    return Ok(existing);
                }
                Some(guard)
            }
            None => None,
        };

        tracing::info!(
            user_id = %request.user_id,
            operator = %request.operator,
            amount = request.amount,
            gateway = self.gateway.name(),
            "Charging recharge"
        );

        let receipt = match self.gateway.charge(&request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                tracing::warn!(user_id = %request.user_id, error = %e, "Recharge payment failed");
                metrics::record_submission("declined");
                return Err(e.into());
            }
        };

        let amount = request.amount;
        let record = TransactionRecord::success(receipt.transaction_id, request, Utc::now());
        if let Err(e) = self.append(record.clone()).await {
            // The charge went through; this line is the only trace of it.
            tracing::error!(
                transaction_id = %record.transaction_id,
                user_id = %record.request.user_id,
                amount,
                error = %e,
                "Charged recharge could not be recorded; reconcile with the gateway"
            );
            metrics::record_submission("unrecorded");
            return Err(e);
        }

        tracing::info!(
            transaction_id = %record.transaction_id,
            amount,
            "Recharge recorded"
        );
        metrics::record_submission("success");
        metrics::record_amount(amount);

        Ok(record)
    }

    /// Full ledger, newest first.
    pub async fn history(&self) -> Result<Vec<TransactionRecord>, RechargeError> {
        Ok(self.load().await?)
    }

    pub async fn history_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionRecord>, RechargeError> {
        let mut records = self.load().await?;
        records.retain(|r| r.request.user_id == user_id);
        Ok(records)
    }

    pub async fn find(
        &self,
        transaction_id: &str,
    ) -> Result<Option<TransactionRecord>, RechargeError> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|r| r.transaction_id == transaction_id))
    }

    pub async fn summary(&self, user_id: Option<&str>) -> Result<LedgerSummary, RechargeError> {
        let records = match user_id {
            Some(user_id) => self.history_for_user(user_id).await?,
            None => self.history().await?,
        };
        Ok(LedgerSummary::from_records(&records))
    }

    fn claim(&self, user_id: &str, key: &str) -> Result<InFlightGuard<'_>, RechargeError> {
        let claimed = (user_id.to_string(), key.to_string());
        let mut keys = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !keys.insert(claimed.clone()) {
            tracing::warn!(
                user_id = %user_id,
                idempotency_key = %key,
                "Submission already in flight"
            );
            metrics::record_submission("duplicate");
            return Err(RechargeError::DuplicateSubmission(key.to_string()));
        }
        Ok(InFlightGuard {
            keys: &self.in_flight,
            key: claimed,
        })
    }

    async fn find_by_idempotency_key(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<TransactionRecord>, StorageError> {
        Ok(self.load().await?.into_iter().find(|r| {
            r.request.user_id == user_id && r.request.idempotency_key.as_deref() == Some(key)
        }))
    }

    async fn load(&self) -> Result<Vec<TransactionRecord>, StorageError> {
        match self.store.get(LEDGER_KEY).await? {
            Some(document) => {
                serde_json::from_str(&document).map_err(|source| StorageError::Corrupt {
                    key: LEDGER_KEY.to_string(),
                    source,
                })
            }
            None => Ok(Vec::new()),
        }
    }

    async fn append(&self, record: TransactionRecord) -> Result<(), RechargeError> {
        let _lock = self.write_lock.lock().await;

        let mut records = self.load().await?;
        if records
            .iter()
            .any(|r| r.transaction_id == record.transaction_id)
        {
            tracing::error!(
                transaction_id = %record.transaction_id,
                "Gateway issued an already recorded transaction id"
            );
            return Err(RechargeError::DuplicateTransaction(record.transaction_id));
        }

        records.insert(0, record);
        let document = serde_json::to_string(&records).map_err(StorageError::Encode)?;
        self.store.set(LEDGER_KEY, &document).await?;

        Ok(())
    }
}
