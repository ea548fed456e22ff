pub mod catalog;
pub mod ledger;
pub mod metrics;
pub mod payment;
pub mod store;

pub use catalog::{fallback_plans, filter_by_type, PlanCatalog};
pub use ledger::{RechargeError, RechargeLedger, LEDGER_KEY};
pub use metrics::{get_metrics, init_metrics};
pub use payment::{build_gateway, HttpGateway, PaymentError, PaymentGateway, SimulatedGateway};
pub use store::{build_store, FileStore, LedgerStore, MemoryStore, StorageError};
