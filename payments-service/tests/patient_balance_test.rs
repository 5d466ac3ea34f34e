//! Patient balance aggregation over non-cancelled invoices.

mod common;

use common::{apply_allocated, invoice};
use payments_service::models::InvoiceStatus;
use payments_service::services::ledger::outstanding_balance;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[test]
fn outstanding_balance_sums_open_invoices() {
    let patient = Uuid::new_v4();
    let invoices = vec![
        invoice(patient, dec!(1500.00), InvoiceStatus::Sent),
        invoice(patient, dec!(800.00), InvoiceStatus::Sent),
        invoice(patient, dec!(200.00), InvoiceStatus::Overdue),
    ];

    assert_eq!(outstanding_balance(invoices.iter()), dec!(2500.00));
}

#[test]
fn cancelled_invoices_are_excluded() {
    let patient = Uuid::new_v4();
    let open = invoice(patient, dec!(1000.00), InvoiceStatus::Sent);
    let cancelled = invoice(patient, dec!(5000.00), InvoiceStatus::Cancelled);

    assert_eq!(
        outstanding_balance([&open, &cancelled]),
        dec!(1000.00)
    );
}

#[test]
fn paid_invoices_contribute_nothing() {
    let patient = Uuid::new_v4();
    let open = invoice(patient, dec!(300.00), InvoiceStatus::Sent);
    let paid = apply_allocated(&invoice(patient, dec!(700.00), InvoiceStatus::Sent), dec!(700.00));

    assert_eq!(outstanding_balance([&open, &paid]), dec!(300.00));
}

#[test]
fn balance_tracks_engine_writes() {
    // Recording a payment against one invoice lowers the patient's
    // aggregate by exactly the allocated amount.
    let patient = Uuid::new_v4();
    let inv1 = invoice(patient, dec!(1200.00), InvoiceStatus::Sent);
    let inv2 = invoice(patient, dec!(600.00), InvoiceStatus::Sent);

    let before = outstanding_balance([&inv1, &inv2]);
    assert_eq!(before, dec!(1800.00));

    let inv1_after = apply_allocated(&inv1, dec!(500.00));
    let after = outstanding_balance([&inv1_after, &inv2]);
    assert_eq!(after, dec!(1300.00));
}

#[test]
fn patient_with_no_invoices_owes_nothing() {
    let invoices: Vec<payments_service::models::Invoice> = Vec::new();
    assert_eq!(outstanding_balance(invoices.iter()), Decimal::ZERO);
}
