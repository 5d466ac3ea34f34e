//! Allocation model: the portion of one payment applied to one invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Allocation row. Owned by its payment: created with it, voided with it,
/// never independently mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Allocation {
    pub allocation_id: Uuid,
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub provider_id: Option<Uuid>,
    pub is_voided: bool,
    pub created_utc: DateTime<Utc>,
}

/// One requested (invoice, amount) split of a payment being recorded.
/// `provider_id` attributes the revenue to a dentist for reporting.
#[derive(Debug, Clone)]
pub struct AllocationInput {
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub provider_id: Option<Uuid>,
}
