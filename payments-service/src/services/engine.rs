//! Allocation engine: the sole entry point for recording and voiding
//! payments.
//!
//! Both operations run as one database transaction that takes `FOR UPDATE`
//! row locks on every touched invoice (sorted by id) before validating, so
//! two racing payments cannot both pass the balance check against stale
//! state. Derived invoice fields and the cached patient balance are only
//! ever written inside these transactions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{PaymentError, ValidationError};
use crate::models::{format_payment_number, Allocation, Invoice, Payment, RecordPayment};
use crate::services::ledger;
use crate::services::metrics::{
    DB_QUERY_DURATION, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL, VALIDATION_FAILURES_TOTAL,
    VOIDS_TOTAL,
};
use crate::services::Database;

/// Result of a successful `record_payment`: the created payment, its
/// allocations, and every invoice with freshly recomputed fields.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedPayment {
    pub payment: Payment,
    pub allocations: Vec<Allocation>,
    pub invoices: Vec<Invoice>,
}

/// Result of a successful `void_payment`: the voided payment and the
/// invoices restored to their recomputed balances.
#[derive(Debug, Clone, Serialize)]
pub struct VoidedPayment {
    pub payment: Payment,
    pub invoices: Vec<Invoice>,
}

/// Check the shape of a payment request before touching the database:
/// positive amounts, a non-empty allocation list with no duplicate
/// invoices, and an allocated total within the payment amount.
/// Under-allocation is permitted; the remainder is simply not applied to
/// any invoice.
pub fn validate_request(input: &RecordPayment) -> Result<(), ValidationError> {
    if input.amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount {
            amount: input.amount,
        });
    }
    if input.allocations.is_empty() {
        return Err(ValidationError::EmptyAllocations);
    }

    let mut seen = Vec::with_capacity(input.allocations.len());
    let mut allocated = Decimal::ZERO;
    for alloc in &input.allocations {
        if alloc.amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAllocation {
                invoice_id: alloc.invoice_id,
                amount: alloc.amount,
            });
        }
        if seen.contains(&alloc.invoice_id) {
            return Err(ValidationError::DuplicateInvoice {
                invoice_id: alloc.invoice_id,
            });
        }
        seen.push(alloc.invoice_id);
        allocated += alloc.amount;
    }

    if allocated > input.amount {
        return Err(ValidationError::OverAllocated {
            allocated,
            amount: input.amount,
        });
    }

    Ok(())
}

/// Check each requested allocation against the live invoice rows: the
/// invoice must exist, must not be cancelled, must belong to the paying
/// patient, and must have enough outstanding balance.
pub fn validate_against_invoices(
    input: &RecordPayment,
    invoices: &HashMap<Uuid, Invoice>,
) -> Result<(), ValidationError> {
    use crate::models::InvoiceStatus;

    for alloc in &input.allocations {
        let invoice = invoices.get(&alloc.invoice_id).ok_or(
            ValidationError::InvoiceNotFound {
                invoice_id: alloc.invoice_id,
            },
        )?;
        if invoice.status() == InvoiceStatus::Cancelled {
            return Err(ValidationError::InvoiceCancelled {
                invoice_id: alloc.invoice_id,
            });
        }
        if invoice.patient_id != input.patient_id {
            return Err(ValidationError::PatientMismatch {
                invoice_id: alloc.invoice_id,
                patient_id: input.patient_id,
            });
        }
        if alloc.amount > invoice.balance {
            return Err(ValidationError::ExceedsInvoiceBalance {
                invoice_id: alloc.invoice_id,
                requested: alloc.amount,
                balance: invoice.balance,
            });
        }
    }

    Ok(())
}

/// Single-entry-point service for payment writes. Everything else in this
/// crate only reads.
#[derive(Clone)]
pub struct AllocationEngine {
    db: Arc<Database>,
}

impl AllocationEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record one received payment and apply it to one or more invoices.
    /// Fails atomically: any validation error leaves no trace in the
    /// database.
    #[instrument(skip(self, input), fields(
        clinic_id = %input.clinic_id,
        patient_id = %input.patient_id,
        allocation_count = input.allocations.len()
    ))]
    pub async fn record_payment(
        &self,
        input: &RecordPayment,
    ) -> Result<RecordedPayment, PaymentError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        if let Err(e) = validate_request(input) {
            VALIDATION_FAILURES_TOTAL
                .with_label_values(&[e.rule()])
                .inc();
            return Err(e.into());
        }

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to begin transaction"))?;

        // Lock every target invoice in id order so concurrent payments
        // against overlapping invoice sets cannot deadlock.
        let mut invoice_ids: Vec<Uuid> =
            input.allocations.iter().map(|a| a.invoice_id).collect();
        invoice_ids.sort();

        let locked: Vec<Invoice> = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes, created_utc, updated_utc
            FROM invoices
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id
            FOR UPDATE
            "#,
        )
        .bind(&invoice_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to lock invoices"))?;

        let invoice_map: HashMap<Uuid, Invoice> = locked
            .into_iter()
            .map(|inv| (inv.invoice_id, inv))
            .collect();

        if let Err(e) = validate_against_invoices(input, &invoice_map) {
            VALIDATION_FAILURES_TOTAL
                .with_label_values(&[e.rule()])
                .inc();
            return Err(e.into());
        }

        // Draw the next per-clinic per-month sequence value inside the
        // transaction. A rolled-back request may skip a value; numbers stay
        // monotonic and are never reused.
        let seq: i32 = sqlx::query_scalar("SELECT next_payment_seq($1, $2, $3)")
            .bind(input.clinic_id)
            .bind(input.payment_date.year())
            .bind(input.payment_date.month() as i32)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to draw payment sequence"))?;
        let payment_number = format_payment_number(
            input.payment_date.year(),
            input.payment_date.month(),
            seq,
        );

        let payment_id = Uuid::new_v4();
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                payment_method, check_number, bank_name, reference_number, notes, recorded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                is_voided, void_reason, voided_utc, created_utc
            "#,
        )
        .bind(payment_id)
        .bind(&payment_number)
        .bind(input.clinic_id)
        .bind(input.patient_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(input.payment_method.as_str())
        .bind(&input.check_number)
        .bind(&input.bank_name)
        .bind(&input.reference_number)
        .bind(&input.notes)
        .bind(input.recorded_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to insert payment"))?;

        let mut allocations = Vec::with_capacity(input.allocations.len());
        for alloc in &input.allocations {
            let allocation = sqlx::query_as::<_, Allocation>(
                r#"
                INSERT INTO allocations (allocation_id, payment_id, invoice_id, amount, provider_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING allocation_id, payment_id, invoice_id, amount, provider_id, is_voided, created_utc
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(payment_id)
            .bind(alloc.invoice_id)
            .bind(alloc.amount)
            .bind(alloc.provider_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to insert allocation"))?;
            allocations.push(allocation);
        }

        let mut invoices = Vec::with_capacity(invoice_ids.len());
        for invoice_id in &invoice_ids {
            let refreshed =
                refresh_invoice(&mut tx, &invoice_map[invoice_id]).await?;
            invoices.push(refreshed);
        }

        refresh_patient_balance(&mut tx, input.patient_id).await?;

        tx.commit()
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to commit transaction"))?;

        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc();
        PAYMENT_AMOUNT_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc_by(input.amount.to_f64().unwrap_or(0.0));

        info!(
            payment_id = %payment.payment_id,
            payment_number = %payment.payment_number,
            amount = %payment.amount,
            allocation_count = allocations.len(),
            "Payment recorded"
        );

        Ok(RecordedPayment {
            payment,
            allocations,
            invoices,
        })
    }

    /// Void a recorded payment, cascading to its allocations and restoring
    /// every touched invoice from the remaining live allocation set. Rows
    /// are kept for audit, never deleted.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn void_payment(
        &self,
        payment_id: Uuid,
        reason: &str,
    ) -> Result<VoidedPayment, PaymentError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["void_payment"])
            .start_timer();

        let mut tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to begin transaction"))?;

        let existing: Option<Payment> = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                is_voided, void_reason, voided_utc, created_utc
            FROM payments
            WHERE payment_id = $1
            FOR UPDATE
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to lock payment"))?;

        let existing = match existing {
            Some(p) => p,
            None => return Err(PaymentError::PaymentNotFound { payment_id }),
        };
        if existing.is_voided {
            return Err(PaymentError::AlreadyVoided { payment_id });
        }

        let mut invoice_ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT invoice_id FROM allocations WHERE payment_id = $1",
        )
        .bind(payment_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to fetch allocated invoices"))?;
        invoice_ids.sort();

        let locked: Vec<Invoice> = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes, created_utc, updated_utc
            FROM invoices
            WHERE invoice_id = ANY($1)
            ORDER BY invoice_id
            FOR UPDATE
            "#,
        )
        .bind(&invoice_ids)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to lock invoices"))?;
        let invoice_map: HashMap<Uuid, Invoice> = locked
            .into_iter()
            .map(|inv| (inv.invoice_id, inv))
            .collect();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET is_voided = TRUE,
                void_reason = $2,
                voided_utc = NOW()
            WHERE payment_id = $1
            RETURNING payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                is_voided, void_reason, voided_utc, created_utc
            "#,
        )
        .bind(payment_id)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PaymentError::from_sqlx(e, "Failed to void payment"))?;

        sqlx::query("UPDATE allocations SET is_voided = TRUE WHERE payment_id = $1")
            .bind(payment_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to void allocations"))?;

        let mut invoices = Vec::with_capacity(invoice_ids.len());
        for invoice_id in &invoice_ids {
            let refreshed =
                refresh_invoice(&mut tx, &invoice_map[invoice_id]).await?;
            invoices.push(refreshed);
        }

        refresh_patient_balance(&mut tx, payment.patient_id).await?;

        tx.commit()
            .await
            .map_err(|e| PaymentError::from_sqlx(e, "Failed to commit transaction"))?;

        timer.observe_duration();

        VOIDS_TOTAL
            .with_label_values(&[payment.method().as_str()])
            .inc();

        info!(
            payment_id = %payment.payment_id,
            payment_number = %payment.payment_number,
            reason = %reason,
            "Payment voided"
        );

        Ok(VoidedPayment { payment, invoices })
    }
}

/// Recompute one locked invoice's derived fields from the full live
/// allocation set across all payments, not just the one being written.
/// Summing from scratch instead of adjusting a running total avoids drift.
async fn refresh_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &Invoice,
) -> Result<Invoice, PaymentError> {
    let live_allocated: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(a.amount), 0)
        FROM allocations a
        JOIN payments p ON p.payment_id = a.payment_id
        WHERE a.invoice_id = $1
          AND a.is_voided = FALSE
          AND p.is_voided = FALSE
        "#,
    )
    .bind(invoice.invoice_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| PaymentError::from_sqlx(e, "Failed to sum allocations"))?;

    let state = ledger::recompute(invoice.total_due, invoice.status(), live_allocated);

    sqlx::query_as::<_, Invoice>(
        r#"
        UPDATE invoices
        SET amount_paid = $2,
            balance = $3,
            status = $4,
            updated_utc = NOW()
        WHERE invoice_id = $1
        RETURNING invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
            invoice_date, due_date, notes, created_utc, updated_utc
        "#,
    )
    .bind(invoice.invoice_id)
    .bind(state.amount_paid)
    .bind(state.balance)
    .bind(state.status.as_str())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| PaymentError::from_sqlx(e, "Failed to update invoice"))
}

/// Refresh the cached patient balance from the live invoice rows. The
/// cache is upserted inside the same transaction as the invoice writes and
/// is never authoritative.
async fn refresh_patient_balance(
    tx: &mut Transaction<'_, Postgres>,
    patient_id: Uuid,
) -> Result<(), PaymentError> {
    sqlx::query(
        r#"
        INSERT INTO patient_balances (patient_id, outstanding_balance, updated_utc)
        SELECT $1, COALESCE(SUM(balance), 0), NOW()
        FROM invoices
        WHERE patient_id = $1 AND status <> 'cancelled'
        ON CONFLICT (patient_id)
        DO UPDATE SET outstanding_balance = EXCLUDED.outstanding_balance,
                      updated_utc = EXCLUDED.updated_utc
        "#,
    )
    .bind(patient_id)
    .execute(&mut **tx)
    .await
    .map_err(|e| PaymentError::from_sqlx(e, "Failed to refresh patient balance"))?;
    Ok(())
}
