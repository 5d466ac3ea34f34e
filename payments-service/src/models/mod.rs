//! Domain models for payments-service.

mod allocation;
mod invoice;
mod payment;

pub use allocation::{Allocation, AllocationInput};
pub use invoice::{CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter};
pub use payment::{
    ListPaymentsFilter, Payment, PaymentMethod, RecordPayment, format_payment_number,
};
