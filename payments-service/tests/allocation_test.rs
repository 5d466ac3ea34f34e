//! Allocation scenarios: validating and applying payment splits against
//! outstanding invoices.

mod common;

use common::{apply_allocated, invoice, payment_request, split};
use payments_service::error::ValidationError;
use payments_service::models::InvoiceStatus;
use payments_service::services::engine::{validate_against_invoices, validate_request};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use uuid::Uuid;

#[test]
fn full_payment_settles_single_invoice() {
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(2000.00), InvoiceStatus::Sent);
    let input = payment_request(
        patient,
        dec!(2000.00),
        vec![split(inv.invoice_id, dec!(2000.00))],
    );

    validate_request(&input).expect("request shape should be valid");
    let invoices = HashMap::from([(inv.invoice_id, inv.clone())]);
    validate_against_invoices(&input, &invoices).expect("allocation should fit the balance");

    let updated = apply_allocated(&inv, dec!(2000.00));
    assert_eq!(updated.balance, dec!(0.00));
    assert_eq!(updated.status(), InvoiceStatus::Paid);
}

#[test]
fn one_payment_settles_two_invoices() {
    let patient = Uuid::new_v4();
    let inv1 = invoice(patient, dec!(1500.00), InvoiceStatus::Sent);
    let inv2 = invoice(patient, dec!(800.00), InvoiceStatus::Sent);
    let input = payment_request(
        patient,
        dec!(2300.00),
        vec![
            split(inv1.invoice_id, dec!(1500.00)),
            split(inv2.invoice_id, dec!(800.00)),
        ],
    );

    validate_request(&input).expect("request shape should be valid");
    let invoices = HashMap::from([
        (inv1.invoice_id, inv1.clone()),
        (inv2.invoice_id, inv2.clone()),
    ]);
    validate_against_invoices(&input, &invoices).expect("both splits should fit");

    let updated1 = apply_allocated(&inv1, dec!(1500.00));
    let updated2 = apply_allocated(&inv2, dec!(800.00));
    assert_eq!(updated1.balance, dec!(0.00));
    assert_eq!(updated1.status(), InvoiceStatus::Paid);
    assert_eq!(updated2.balance, dec!(0.00));
    assert_eq!(updated2.status(), InvoiceStatus::Paid);
}

#[test]
fn partial_payment_leaves_invoice_sent() {
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(3000.00), InvoiceStatus::Sent);
    let input = payment_request(
        patient,
        dec!(1500.00),
        vec![split(inv.invoice_id, dec!(1500.00))],
    );

    validate_request(&input).expect("request shape should be valid");
    let invoices = HashMap::from([(inv.invoice_id, inv.clone())]);
    validate_against_invoices(&input, &invoices).expect("partial split should fit");

    let updated = apply_allocated(&inv, dec!(1500.00));
    assert_eq!(updated.balance, dec!(1500.00));
    assert_eq!(updated.amount_paid, dec!(1500.00));
    assert_eq!(updated.status(), InvoiceStatus::Sent);
}

#[test]
fn allocation_beyond_balance_is_rejected_and_invoice_untouched() {
    let patient = Uuid::new_v4();
    // Invoice already half paid: 1000.00 outstanding of 2000.00.
    let mut inv = invoice(patient, dec!(2000.00), InvoiceStatus::Sent);
    inv = apply_allocated(&inv, dec!(1000.00));
    assert_eq!(inv.balance, dec!(1000.00));

    let input = payment_request(
        patient,
        dec!(2000.00),
        vec![split(inv.invoice_id, dec!(2000.00))],
    );
    validate_request(&input).expect("shape is fine, the ledger check must catch this");

    let invoices = HashMap::from([(inv.invoice_id, inv.clone())]);
    let err = validate_against_invoices(&input, &invoices).unwrap_err();
    assert_eq!(
        err,
        ValidationError::ExceedsInvoiceBalance {
            invoice_id: inv.invoice_id,
            requested: dec!(2000.00),
            balance: dec!(1000.00),
        }
    );

    // Nothing was applied: the invoice still reads exactly as before.
    assert_eq!(inv.balance, dec!(1000.00));
    assert_eq!(inv.amount_paid, dec!(1000.00));
    assert_eq!(inv.status(), InvoiceStatus::Sent);
}

#[test]
fn under_allocation_is_permitted() {
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(500.00), InvoiceStatus::Sent);
    // 300.00 of a 1000.00 payment applied; the remainder is not tracked.
    let input = payment_request(
        patient,
        dec!(1000.00),
        vec![split(inv.invoice_id, dec!(300.00))],
    );

    validate_request(&input).expect("under-allocation is allowed");
    let invoices = HashMap::from([(inv.invoice_id, inv.clone())]);
    validate_against_invoices(&input, &invoices).expect("split fits the balance");
}

#[test]
fn cross_patient_allocation_is_rejected() {
    let patient = Uuid::new_v4();
    let other_patient = Uuid::new_v4();
    let inv = invoice(other_patient, dec!(500.00), InvoiceStatus::Sent);
    let input = payment_request(patient, dec!(500.00), vec![split(inv.invoice_id, dec!(500.00))]);

    let invoices = HashMap::from([(inv.invoice_id, inv.clone())]);
    let err = validate_against_invoices(&input, &invoices).unwrap_err();
    assert_eq!(
        err,
        ValidationError::PatientMismatch {
            invoice_id: inv.invoice_id,
            patient_id: patient,
        }
    );
}

#[test]
fn recording_two_payments_commutes() {
    let patient = Uuid::new_v4();
    let inv = invoice(patient, dec!(1000.00), InvoiceStatus::Sent);

    // P1 = 600.00, P2 = 400.00, both individually within total_due.
    // Recompute always sums the full live allocation set, so the order of
    // application cannot change the final state.
    let p1_then_p2 = {
        let after_p1 = apply_allocated(&inv, dec!(600.00));
        apply_allocated(&after_p1, dec!(600.00) + dec!(400.00))
    };
    let p2_then_p1 = {
        let after_p2 = apply_allocated(&inv, dec!(400.00));
        apply_allocated(&after_p2, dec!(400.00) + dec!(600.00))
    };

    assert_eq!(p1_then_p2.balance, p2_then_p1.balance);
    assert_eq!(p1_then_p2.amount_paid, p2_then_p1.amount_paid);
    assert_eq!(p1_then_p2.status, p2_then_p1.status);
    assert_eq!(p1_then_p2.status(), InvoiceStatus::Paid);
}

#[test]
fn allocation_bound_holds_across_valid_requests() {
    // Σ(allocations) ≤ payment amount is enforced at request time, so any
    // accepted payment satisfies the bound by construction.
    let patient = Uuid::new_v4();
    let inv1 = invoice(patient, dec!(700.00), InvoiceStatus::Sent);
    let inv2 = invoice(patient, dec!(300.00), InvoiceStatus::Sent);

    let input = payment_request(
        patient,
        dec!(1000.00),
        vec![
            split(inv1.invoice_id, dec!(700.00)),
            split(inv2.invoice_id, dec!(300.00)),
        ],
    );
    validate_request(&input).expect("exact allocation is valid");

    let allocated: rust_decimal::Decimal =
        input.allocations.iter().map(|a| a.amount).sum();
    assert!(allocated <= input.amount);
}
