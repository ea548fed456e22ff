use serde::{Deserialize, Serialize};

use crate::models::{PlanType, TransactionRecord};

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    #[serde(rename = "type")]
    pub plan_type: Option<PlanType>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RechargeResponse {
    pub success: bool,
    pub transaction_id: String,
    pub message: String,
    pub transaction: TransactionRecord,
}

impl From<TransactionRecord> for RechargeResponse {
    fn from(record: TransactionRecord) -> Self {
        Self {
            success: true,
            transaction_id: record.transaction_id.clone(),
            message: "Recharge successful!".to_string(),
            transaction: record,
        }
    }
}
