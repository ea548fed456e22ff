pub mod plan;
pub mod recharge;
pub mod transaction;

pub use plan::{Plan, PlanType};
pub use recharge::{RechargeRequest, OPERATORS};
pub use transaction::{LedgerSummary, TransactionRecord, TransactionStatus};
