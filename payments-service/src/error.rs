//! Error taxonomy for the allocation engine.

use rust_decimal::Decimal;
use service_core::error::AppError;
use thiserror::Error;
use uuid::Uuid;

/// A rejected `record_payment` input. Every variant names the rule that
/// failed and carries enough detail to identify the offending invoice or
/// amount, so callers never see a generic failure.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Payment must allocate to at least one invoice")]
    EmptyAllocations,

    #[error("Payment amount must be positive, got {amount}")]
    NonPositiveAmount { amount: Decimal },

    #[error("Allocation amount for invoice {invoice_id} must be positive, got {amount}")]
    NonPositiveAllocation { invoice_id: Uuid, amount: Decimal },

    #[error("Invoice {invoice_id} appears more than once in the allocation list")]
    DuplicateInvoice { invoice_id: Uuid },

    #[error("Allocated total {allocated} exceeds payment amount {amount}")]
    OverAllocated { allocated: Decimal, amount: Decimal },

    #[error("Invoice {invoice_id} not found")]
    InvoiceNotFound { invoice_id: Uuid },

    #[error("Invoice {invoice_id} is cancelled and cannot receive payments")]
    InvoiceCancelled { invoice_id: Uuid },

    #[error("Invoice {invoice_id} does not belong to patient {patient_id}")]
    PatientMismatch { invoice_id: Uuid, patient_id: Uuid },

    #[error(
        "Allocation of {requested} to invoice {invoice_id} exceeds its outstanding balance {balance}"
    )]
    ExceedsInvoiceBalance {
        invoice_id: Uuid,
        requested: Decimal,
        balance: Decimal,
    },
}

impl ValidationError {
    /// Stable label for the failed rule, used as a metrics dimension.
    pub fn rule(&self) -> &'static str {
        match self {
            ValidationError::EmptyAllocations => "empty_allocations",
            ValidationError::NonPositiveAmount { .. } => "non_positive_amount",
            ValidationError::NonPositiveAllocation { .. } => "non_positive_allocation",
            ValidationError::DuplicateInvoice { .. } => "duplicate_invoice",
            ValidationError::OverAllocated { .. } => "over_allocated",
            ValidationError::InvoiceNotFound { .. } => "invoice_not_found",
            ValidationError::InvoiceCancelled { .. } => "invoice_cancelled",
            ValidationError::PatientMismatch { .. } => "patient_mismatch",
            ValidationError::ExceedsInvoiceBalance { .. } => "exceeds_invoice_balance",
        }
    }
}

/// Failures surfaced by the allocation engine. Validation failures and
/// state conflicts are distinct from transient lock contention so callers
/// can decide what is retryable.
#[derive(Debug, Error)]
pub enum PaymentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Payment {payment_id} not found")]
    PaymentNotFound { payment_id: Uuid },

    #[error("Payment {payment_id} is already voided")]
    AlreadyVoided { payment_id: Uuid },

    #[error("Concurrent operation on the same invoice, retry the request")]
    ConcurrencyConflict,

    #[error("Database error: {0}")]
    Database(anyhow::Error),
}

impl PaymentError {
    /// Wrap a sqlx error, classifying serialization and lock failures as
    /// retryable conflicts.
    pub fn from_sqlx(err: sqlx::Error, context: &str) -> Self {
        use crate::services::metrics::ERRORS_TOTAL;

        if let sqlx::Error::Database(ref db_err) = err {
            // 40001 serialization_failure, 40P01 deadlock_detected,
            // 55P03 lock_not_available
            if let Some(code) = db_err.code() {
                if code == "40001" || code == "40P01" || code == "55P03" {
                    ERRORS_TOTAL.with_label_values(&["concurrency_conflict"]).inc();
                    return PaymentError::ConcurrencyConflict;
                }
            }
        }
        ERRORS_TOTAL.with_label_values(&["database"]).inc();
        PaymentError::Database(anyhow::anyhow!("{}: {}", context, err))
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Validation(e) => AppError::BadRequest(anyhow::anyhow!(e)),
            e @ PaymentError::PaymentNotFound { .. } => AppError::NotFound(anyhow::anyhow!(e)),
            e @ PaymentError::AlreadyVoided { .. } => AppError::Conflict(anyhow::anyhow!(e)),
            e @ PaymentError::ConcurrencyConflict => AppError::Conflict(anyhow::anyhow!(e)),
            PaymentError::Database(e) => AppError::DatabaseError(e),
        }
    }
}
