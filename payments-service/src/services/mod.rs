//! Services module for payments-service.

pub mod database;
pub mod engine;
pub mod ledger;
pub mod metrics;

pub use database::{
    Database, PatientSummary, RevenueByClinic, RevenueByDay, RevenueByMethod, RevenueByProvider,
};
pub use engine::{AllocationEngine, RecordedPayment, VoidedPayment};
pub use ledger::{outstanding_balance, recompute, LedgerState};
pub use metrics::{get_metrics, init_metrics};
