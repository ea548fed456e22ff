use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RechargeRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Success,
    Failed,
}

/// An entry of the recharge ledger: the request snapshot plus the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub status: TransactionStatus,
    #[serde(flatten)]
    pub request: RechargeRequest,
    pub completed_at: DateTime<Utc>,
    /// Display date, `YYYY-MM-DD`.
    pub date: String,
}

impl TransactionRecord {
    pub fn success(
        transaction_id: String,
        request: RechargeRequest,
        completed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id,
            status: TransactionStatus::Success,
            request,
            date: completed_at.format("%Y-%m-%d").to_string(),
            completed_at,
        }
    }

    pub fn amount(&self) -> i64 {
        self.request.amount
    }
}

/// Dashboard totals over a slice of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub total_transactions: usize,
    pub total_amount: i64,
    pub last_recharge: Option<TransactionRecord>,
}

impl LedgerSummary {
    /// Summarizes newest-first records; only successful ones count. The total
    /// saturates at `i64::MAX`.
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut successful = records
            .iter()
            .filter(|r| r.status == TransactionStatus::Success);

        let (total_transactions, total_amount) = successful
            .clone()
            .fold((0usize, 0i64), |(count, sum), r| {
                (count + 1, sum.saturating_add(r.amount()))
            });

        Self {
            total_transactions,
            total_amount,
            last_recharge: successful.next().cloned(),
        }
    }
}
