//! Invoice ledger: recomputation of an invoice's derived monetary state.
//!
//! The ledger always re-derives `amount_paid` from the full live allocation
//! set rather than adjusting a running total. Recomputation is a fixed
//! point: applying it twice with no intervening allocation change yields
//! the same state.

use rust_decimal::Decimal;

use crate::models::{Invoice, InvoiceStatus};

/// Recomputed derived fields for one invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerState {
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub status: InvoiceStatus,
}

/// Re-derive an invoice's monetary fields from the sum of its non-voided
/// allocations. Allocations voided directly or through their payment must
/// already be excluded from `live_allocated`.
///
/// Status transitions owned here: `paid` when the balance reaches zero,
/// `sent` while partially paid. A cancelled invoice keeps its status, and
/// an unpaid invoice keeps whatever the billing process assigned
/// (draft/sent/overdue) since due-date handling is not this service's
/// write.
pub fn recompute(
    total_due: Decimal,
    current_status: InvoiceStatus,
    live_allocated: Decimal,
) -> LedgerState {
    let amount_paid = live_allocated;
    let balance = (total_due - amount_paid).max(Decimal::ZERO);

    let status = if current_status == InvoiceStatus::Cancelled {
        InvoiceStatus::Cancelled
    } else if balance.is_zero() {
        InvoiceStatus::Paid
    } else if amount_paid > Decimal::ZERO {
        InvoiceStatus::Sent
    } else if current_status == InvoiceStatus::Paid {
        // All allocations voided: a formerly-paid invoice goes back to
        // awaiting payment rather than claiming to be settled.
        InvoiceStatus::Sent
    } else {
        current_status
    };

    LedgerState {
        amount_paid,
        balance,
        status,
    }
}

/// A patient's outstanding total: the sum of balances over their
/// non-cancelled invoices. The cached `patient_balances` row is derived
/// from this; the invoice rows stay authoritative.
pub fn outstanding_balance<'a, I>(invoices: I) -> Decimal
where
    I: IntoIterator<Item = &'a Invoice>,
{
    invoices
        .into_iter()
        .filter(|inv| inv.status() != InvoiceStatus::Cancelled)
        .map(|inv| inv.balance)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn full_allocation_marks_invoice_paid() {
        let state = recompute(dec!(2000.00), InvoiceStatus::Sent, dec!(2000.00));
        assert_eq!(state.amount_paid, dec!(2000.00));
        assert_eq!(state.balance, dec!(0.00));
        assert_eq!(state.status, InvoiceStatus::Paid);
    }

    #[test]
    fn partial_allocation_keeps_invoice_sent() {
        let state = recompute(dec!(3000.00), InvoiceStatus::Sent, dec!(1500.00));
        assert_eq!(state.balance, dec!(1500.00));
        assert_eq!(state.status, InvoiceStatus::Sent);
    }

    #[test]
    fn partial_payment_moves_draft_to_sent() {
        let state = recompute(dec!(500.00), InvoiceStatus::Draft, dec!(100.00));
        assert_eq!(state.status, InvoiceStatus::Sent);
    }

    #[test]
    fn unpaid_invoice_keeps_external_status() {
        let state = recompute(dec!(500.00), InvoiceStatus::Overdue, Decimal::ZERO);
        assert_eq!(state.status, InvoiceStatus::Overdue);
        assert_eq!(state.balance, dec!(500.00));
    }

    #[test]
    fn overdue_invoice_receiving_partial_payment_becomes_sent() {
        let state = recompute(dec!(500.00), InvoiceStatus::Overdue, dec!(200.00));
        assert_eq!(state.status, InvoiceStatus::Sent);
    }

    #[test]
    fn cancelled_invoice_stays_cancelled() {
        let state = recompute(dec!(500.00), InvoiceStatus::Cancelled, Decimal::ZERO);
        assert_eq!(state.status, InvoiceStatus::Cancelled);
    }

    #[test]
    fn balance_clamps_at_zero() {
        // An over-credited invoice never reports a negative balance.
        let state = recompute(dec!(100.00), InvoiceStatus::Sent, dec!(150.00));
        assert_eq!(state.balance, dec!(0.00));
        assert_eq!(state.status, InvoiceStatus::Paid);
    }

    #[test]
    fn recompute_is_a_fixed_point() {
        let first = recompute(dec!(750.00), InvoiceStatus::Sent, dec!(250.00));
        let second = recompute(dec!(750.00), first.status, first.amount_paid);
        assert_eq!(first, second);
    }

    #[test]
    fn voiding_all_allocations_restores_original_state() {
        // Record then void: recomputing with an empty live set returns the
        // invoice to its pre-payment fields.
        let before = recompute(dec!(2000.00), InvoiceStatus::Sent, Decimal::ZERO);
        let paid = recompute(dec!(2000.00), before.status, dec!(2000.00));
        assert_eq!(paid.status, InvoiceStatus::Paid);
        let after_void = recompute(dec!(2000.00), paid.status, Decimal::ZERO);
        assert_eq!(after_void.balance, dec!(2000.00));
        assert_eq!(after_void.status, InvoiceStatus::Sent);
        assert_eq!(after_void.amount_paid, Decimal::ZERO);
    }
}
