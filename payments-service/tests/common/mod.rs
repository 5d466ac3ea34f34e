//! Common test fixtures for payments-service tests.

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use payments_service::models::{
    AllocationInput, Invoice, InvoiceStatus, PaymentMethod, RecordPayment,
};
use payments_service::services::ledger;
use rust_decimal::Decimal;
use uuid::Uuid;

/// A fresh, fully outstanding invoice for the given patient.
pub fn invoice(patient_id: Uuid, total_due: Decimal, status: InvoiceStatus) -> Invoice {
    Invoice {
        invoice_id: Uuid::new_v4(),
        clinic_id: Uuid::new_v4(),
        patient_id,
        total_due,
        amount_paid: Decimal::ZERO,
        balance: total_due,
        status: status.as_str().to_string(),
        invoice_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
        due_date: NaiveDate::from_ymd_opt(2026, 2, 15),
        notes: None,
        created_utc: Utc::now(),
        updated_utc: Utc::now(),
    }
}

/// A cash payment request from `patient_id` with the given splits.
pub fn payment_request(
    patient_id: Uuid,
    amount: Decimal,
    allocations: Vec<AllocationInput>,
) -> RecordPayment {
    RecordPayment {
        clinic_id: Uuid::new_v4(),
        patient_id,
        amount,
        payment_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        payment_method: PaymentMethod::Cash,
        check_number: None,
        bank_name: None,
        reference_number: None,
        notes: None,
        recorded_by: Uuid::new_v4(),
        allocations,
    }
}

pub fn split(invoice_id: Uuid, amount: Decimal) -> AllocationInput {
    AllocationInput {
        invoice_id,
        amount,
        provider_id: None,
    }
}

/// Apply a recomputation result back onto an invoice, mirroring what the
/// engine persists after allocations change.
pub fn apply_allocated(invoice: &Invoice, live_allocated: Decimal) -> Invoice {
    let state = ledger::recompute(invoice.total_due, invoice.status(), live_allocated);
    let mut updated = invoice.clone();
    updated.amount_paid = state.amount_paid;
    updated.balance = state.balance;
    updated.status = state.status.as_str().to_string();
    updated
}
