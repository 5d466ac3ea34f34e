//! Voiding semantics: a void restores every touched invoice to the state
//! it would have had if the payment's allocations never existed.

mod common;

use common::{apply_allocated, invoice};
use payments_service::models::InvoiceStatus;
use payments_service::services::ledger;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[test]
fn void_restores_pre_payment_state() {
    let patient = Uuid::new_v4();
    let before = invoice(patient, dec!(2000.00), InvoiceStatus::Sent);

    // Record a full payment, then void it: the live allocation set drops
    // back to zero and recomputation restores the original fields.
    let paid = apply_allocated(&before, dec!(2000.00));
    assert_eq!(paid.status(), InvoiceStatus::Paid);

    let after_void = apply_allocated(&paid, Decimal::ZERO);
    assert_eq!(after_void.total_due, dec!(2000.00));
    assert_eq!(after_void.balance, dec!(2000.00));
    assert_eq!(after_void.amount_paid, dec!(0.00));
    assert_eq!(after_void.status(), InvoiceStatus::Sent);
}

#[test]
fn void_leaves_other_payments_in_place() {
    // Two payments against one invoice; voiding the first leaves the
    // second's allocation intact because the ledger recomputes from the
    // remaining live set rather than subtracting.
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(1000.00), InvoiceStatus::Sent);

    let after_both = apply_allocated(&inv, dec!(600.00) + dec!(300.00));
    assert_eq!(after_both.balance, dec!(100.00));

    // Void the 600.00 payment: only the 300.00 allocation remains live.
    let after_void = apply_allocated(&after_both, dec!(300.00));
    assert_eq!(after_void.amount_paid, dec!(300.00));
    assert_eq!(after_void.balance, dec!(700.00));
    assert_eq!(after_void.status(), InvoiceStatus::Sent);
}

#[test]
fn recompute_without_allocation_changes_is_stable() {
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(750.00), InvoiceStatus::Sent);

    let once = apply_allocated(&inv, dec!(250.00));
    let twice = apply_allocated(&once, dec!(250.00));

    assert_eq!(once.amount_paid, twice.amount_paid);
    assert_eq!(once.balance, twice.balance);
    assert_eq!(once.status, twice.status);
}

#[test]
fn void_of_partially_allocated_payment_restores_full_balance() {
    // A payment can under-allocate; voiding it only removes what was
    // actually applied to the invoice.
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(900.00), InvoiceStatus::Sent);

    let applied = apply_allocated(&inv, dec!(400.00));
    assert_eq!(applied.balance, dec!(500.00));

    let restored = apply_allocated(&applied, Decimal::ZERO);
    assert_eq!(restored.balance, dec!(900.00));
    assert_eq!(restored.status(), InvoiceStatus::Sent);
}

#[test]
fn ledger_state_equality_covers_all_fields() {
    let a = ledger::recompute(dec!(100.00), InvoiceStatus::Sent, dec!(40.00));
    let b = ledger::recompute(dec!(100.00), InvoiceStatus::Sent, dec!(40.00));
    assert_eq!(a, b);
    assert_eq!(a.amount_paid, dec!(40.00));
    assert_eq!(a.balance, dec!(60.00));
    assert_eq!(a.status, InvoiceStatus::Sent);
}
