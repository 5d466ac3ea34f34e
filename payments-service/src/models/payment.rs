//! Payment model for payments-service.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::AllocationInput;

/// How the money physically arrived at the front desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Check,
    BankTransfer,
    Card,
    Gcash,
    Maya,
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Check => "check",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Card => "card",
            PaymentMethod::Gcash => "gcash",
            PaymentMethod::Maya => "maya",
            PaymentMethod::Other => "other",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "cash" => PaymentMethod::Cash,
            "check" => PaymentMethod::Check,
            "bank_transfer" => PaymentMethod::BankTransfer,
            "card" => PaymentMethod::Card,
            "gcash" => PaymentMethod::Gcash,
            "maya" => PaymentMethod::Maya,
            _ => PaymentMethod::Other,
        }
    }
}

/// Payment row. One physically received sum of money, recorded after the
/// fact by front-desk staff. Voided payments stay in the table for audit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub payment_number: String,
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: String,
    pub check_number: Option<String>,
    pub bank_name: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub is_voided: bool,
    pub void_reason: Option<String>,
    pub voided_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Payment {
    pub fn method(&self) -> PaymentMethod {
        PaymentMethod::from_string(&self.payment_method)
    }
}

/// Input for recording a payment with its invoice allocations.
#[derive(Debug, Clone)]
pub struct RecordPayment {
    pub clinic_id: Uuid,
    pub patient_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub payment_method: PaymentMethod,
    pub check_number: Option<String>,
    pub bank_name: Option<String>,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub allocations: Vec<AllocationInput>,
}

/// Filter parameters for listing payments.
#[derive(Debug, Clone, Default)]
pub struct ListPaymentsFilter {
    pub patient_id: Option<Uuid>,
    pub clinic_id: Option<Uuid>,
    pub payment_method: Option<PaymentMethod>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub include_voided: bool,
    pub page_size: i32,
    pub page_token: Option<Uuid>,
}

/// Render a payment number as `PAY-YYYY-MM-NNNN`. The sequence restarts
/// per clinic per month and is never reused, even after voids.
pub fn format_payment_number(year: i32, month: u32, seq: i32) -> String {
    format!("PAY-{:04}-{:02}-{:04}", year, month, seq)
}
