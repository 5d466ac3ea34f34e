//! Database service for payments-service.
//!
//! Owns the connection pool, the invoice seeding/cancellation boundary
//! used by the billing process, and the read-only query surface (payment
//! lookups, patient summaries, revenue reporting). All payment writes go
//! through the allocation engine instead.

use crate::models::{
    Allocation, CreateInvoice, Invoice, InvoiceStatus, ListInvoicesFilter, ListPaymentsFilter,
    Payment,
};
use crate::services::metrics::DB_QUERY_DURATION;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// A patient's aggregate position, derived live from invoice rows.
#[derive(Debug, Clone, Serialize)]
pub struct PatientSummary {
    pub patient_id: Uuid,
    pub total_invoiced: Decimal,
    pub total_paid: Decimal,
    pub outstanding_balance: Decimal,
}

/// Revenue received per payment method over a date range.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevenueByMethod {
    pub payment_method: String,
    pub total: Decimal,
    pub payment_count: i64,
}

/// Revenue attributed to one provider over a date range.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevenueByProvider {
    pub provider_id: Option<Uuid>,
    pub total: Decimal,
    pub allocation_count: i64,
}

/// Revenue received per calendar day over a date range.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevenueByDay {
    pub day: NaiveDate,
    pub total: Decimal,
    pub payment_count: i64,
}

/// Revenue received per clinic over a date range.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RevenueByClinic {
    pub clinic_id: Uuid,
    pub total: Decimal,
    pub payment_count: i64,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "payments-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Invoice Operations (billing process boundary)
    // -------------------------------------------------------------------------

    /// Seed an invoice from the billing process. Only `draft` and `sent`
    /// are valid entry states; everything after creation is driven by the
    /// allocation engine or explicit cancellation.
    #[instrument(skip(self, input), fields(clinic_id = %input.clinic_id, patient_id = %input.patient_id))]
    pub async fn create_invoice(&self, input: &CreateInvoice) -> Result<Invoice, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        if !matches!(input.status, InvoiceStatus::Draft | InvoiceStatus::Sent) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoices can only be created as draft or sent"
            )));
        }
        if input.total_due < Decimal::ZERO {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invoice total must not be negative"
            )));
        }

        let invoice_id = Uuid::new_v4();
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes
            )
            VALUES ($1, $2, $3, $4, 0, $4, $5, $6, $7, $8)
            RETURNING invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes, created_utc, updated_utc
            "#,
        )
        .bind(invoice_id)
        .bind(input.clinic_id)
        .bind(input.patient_id)
        .bind(input.total_due)
        .bind(input.status.as_str())
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        timer.observe_duration();

        info!(invoice_id = %invoice.invoice_id, total_due = %invoice.total_due, "Invoice created");

        Ok(invoice)
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes, created_utc, updated_utc
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices with optional filters.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Invoice>(
                r#"
                SELECT invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                    invoice_date, due_date, notes, created_utc, updated_utc
                FROM invoices
                WHERE ($1::uuid IS NULL OR patient_id = $1)
                  AND ($2::uuid IS NULL OR clinic_id = $2)
                  AND ($3::varchar IS NULL OR status = $3)
                  AND invoice_id > $4
                ORDER BY invoice_id
                LIMIT $5
                "#,
            )
            .bind(filter.patient_id)
            .bind(filter.clinic_id)
            .bind(&status_str)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Invoice>(
                r#"
                SELECT invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                    invoice_date, due_date, notes, created_utc, updated_utc
                FROM invoices
                WHERE ($1::uuid IS NULL OR patient_id = $1)
                  AND ($2::uuid IS NULL OR clinic_id = $2)
                  AND ($3::varchar IS NULL OR status = $3)
                ORDER BY invoice_id
                LIMIT $4
                "#,
            )
            .bind(filter.patient_id)
            .bind(filter.clinic_id)
            .bind(&status_str)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Cancel an invoice, excluding it from reconciliation and from the
    /// patient's outstanding balance. Cancellation is a billing-process
    /// decision; a paid invoice cannot be cancelled.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn cancel_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["cancel_invoice"])
            .start_timer();

        let existing = self.get_invoice(invoice_id).await?;
        match existing {
            Some(ref inv) if inv.status == "paid" => {
                return Err(AppError::BadRequest(anyhow::anyhow!(
                    "Paid invoices cannot be cancelled"
                )))
            }
            Some(ref inv) if inv.status == "cancelled" => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invoice is already cancelled"
                )))
            }
            Some(_) => {}
            None => return Ok(None),
        };

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = 'cancelled',
                updated_utc = NOW()
            WHERE invoice_id = $1 AND status <> 'cancelled' AND status <> 'paid'
            RETURNING invoice_id, clinic_id, patient_id, total_due, amount_paid, balance, status,
                invoice_date, due_date, notes, created_utc, updated_utc
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to cancel invoice: {}", e)))?;

        if let Some(ref inv) = invoice {
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
            .bind(inv.patient_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Failed to refresh patient balance: {}",
                    e
                ))
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit transaction: {}", e))
        })?;

        timer.observe_duration();

        if let Some(ref inv) = invoice {
            info!(invoice_id = %inv.invoice_id, "Invoice cancelled");
        }

        Ok(invoice)
    }

    // -------------------------------------------------------------------------
    // Payment Queries
    // -------------------------------------------------------------------------

    /// Get a payment by ID.
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment"])
            .start_timer();

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                is_voided, void_reason, voided_utc, created_utc
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get payment: {}", e)))?;

        timer.observe_duration();

        Ok(payment)
    }

    /// Get all allocations of a payment, voided ones included (audit view).
    #[instrument(skip(self), fields(payment_id = %payment_id))]
    pub async fn get_payment_allocations(
        &self,
        payment_id: Uuid,
    ) -> Result<Vec<Allocation>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_payment_allocations"])
            .start_timer();

        let allocations = sqlx::query_as::<_, Allocation>(
            r#"
            SELECT allocation_id, payment_id, invoice_id, amount, provider_id, is_voided, created_utc
            FROM allocations
            WHERE payment_id = $1
            ORDER BY created_utc, allocation_id
            "#,
        )
        .bind(payment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get allocations: {}", e))
        })?;

        timer.observe_duration();

        Ok(allocations)
    }

    /// List payments with optional filters. Voided payments are excluded
    /// unless the filter asks for them.
    #[instrument(skip(self, filter))]
    pub async fn list_payments(&self, filter: &ListPaymentsFilter) -> Result<Vec<Payment>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_payments"])
            .start_timer();

        let limit = filter.page_size.clamp(1, 100) as i64;
        let method_str = filter.payment_method.map(|m| m.as_str().to_string());

        let payments = if let Some(cursor) = filter.page_token {
            sqlx::query_as::<_, Payment>(
                r#"
                SELECT payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                    payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                    is_voided, void_reason, voided_utc, created_utc
                FROM payments
                WHERE ($1::uuid IS NULL OR patient_id = $1)
                  AND ($2::uuid IS NULL OR clinic_id = $2)
                  AND ($3::varchar IS NULL OR payment_method = $3)
                  AND ($4::date IS NULL OR payment_date >= $4)
                  AND ($5::date IS NULL OR payment_date <= $5)
                  AND ($6::bool = TRUE OR is_voided = FALSE)
                  AND payment_id > $7
                ORDER BY payment_id
                LIMIT $8
                "#,
            )
            .bind(filter.patient_id)
            .bind(filter.clinic_id)
            .bind(&method_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.include_voided)
            .bind(cursor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, Payment>(
                r#"
                SELECT payment_id, payment_number, clinic_id, patient_id, amount, payment_date,
                    payment_method, check_number, bank_name, reference_number, notes, recorded_by,
                    is_voided, void_reason, voided_utc, created_utc
                FROM payments
                WHERE ($1::uuid IS NULL OR patient_id = $1)
                  AND ($2::uuid IS NULL OR clinic_id = $2)
                  AND ($3::varchar IS NULL OR payment_method = $3)
                  AND ($4::date IS NULL OR payment_date >= $4)
                  AND ($5::date IS NULL OR payment_date <= $5)
                  AND ($6::bool = TRUE OR is_voided = FALSE)
                ORDER BY payment_id
                LIMIT $7
                "#,
            )
            .bind(filter.patient_id)
            .bind(filter.clinic_id)
            .bind(&method_str)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.include_voided)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list payments: {}", e)))?;

        timer.observe_duration();

        Ok(payments)
    }

    // -------------------------------------------------------------------------
    // Patient Balance
    // -------------------------------------------------------------------------

    /// A patient's aggregate invoiced/paid/outstanding totals, derived
    /// live from non-cancelled invoice rows.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn get_patient_summary(&self, patient_id: Uuid) -> Result<PatientSummary, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_patient_summary"])
            .start_timer();

        let (total_invoiced, total_paid, outstanding_balance): (Decimal, Decimal, Decimal) =
            sqlx::query_as(
                r#"
                SELECT COALESCE(SUM(total_due), 0),
                       COALESCE(SUM(amount_paid), 0),
                       COALESCE(SUM(balance), 0)
                FROM invoices
                WHERE patient_id = $1 AND status <> 'cancelled'
                "#,
            )
            .bind(patient_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to get patient summary: {}", e))
            })?;

        timer.observe_duration();

        Ok(PatientSummary {
            patient_id,
            total_invoiced,
            total_paid,
            outstanding_balance,
        })
    }

    /// The cached outstanding balance maintained by the allocation engine.
    /// Missing rows mean no engine write has touched the patient yet; the
    /// live invoice rows stay authoritative either way.
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn get_patient_balance(&self, patient_id: Uuid) -> Result<Option<Decimal>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_patient_balance"])
            .start_timer();

        let balance: Option<Decimal> = sqlx::query_scalar(
            "SELECT outstanding_balance FROM patient_balances WHERE patient_id = $1",
        )
        .bind(patient_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to get patient balance: {}", e))
        })?;

        timer.observe_duration();

        Ok(balance)
    }

    // -------------------------------------------------------------------------
    // Revenue Reporting
    // -------------------------------------------------------------------------

    /// Total revenue received by a clinic in a date range, from non-voided
    /// payments' allocations.
    #[instrument(skip(self), fields(clinic_id = %clinic_id))]
    pub async fn revenue_total(
        &self,
        clinic_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Decimal, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_total"])
            .start_timer();

        let total: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(a.amount), 0)
            FROM allocations a
            JOIN payments p ON p.payment_id = a.payment_id
            WHERE p.clinic_id = $1
              AND p.payment_date >= $2
              AND p.payment_date <= $3
              AND a.is_voided = FALSE
              AND p.is_voided = FALSE
            "#,
        )
        .bind(clinic_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute revenue total: {}", e))
        })?;

        timer.observe_duration();

        Ok(total)
    }

    /// Revenue broken down by payment method.
    #[instrument(skip(self), fields(clinic_id = %clinic_id))]
    pub async fn revenue_by_method(
        &self,
        clinic_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RevenueByMethod>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_method"])
            .start_timer();

        let rows = sqlx::query_as::<_, RevenueByMethod>(
            r#"
            SELECT p.payment_method,
                   COALESCE(SUM(a.amount), 0) AS total,
                   COUNT(DISTINCT p.payment_id) AS payment_count
            FROM allocations a
            JOIN payments p ON p.payment_id = a.payment_id
            WHERE p.clinic_id = $1
              AND p.payment_date >= $2
              AND p.payment_date <= $3
              AND a.is_voided = FALSE
              AND p.is_voided = FALSE
            GROUP BY p.payment_method
            ORDER BY total DESC
            "#,
        )
        .bind(clinic_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute revenue by method: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows)
    }

    /// Revenue attributed per provider (dentist). Allocations recorded
    /// without a provider appear under a NULL provider_id row.
    #[instrument(skip(self), fields(clinic_id = %clinic_id))]
    pub async fn revenue_by_provider(
        &self,
        clinic_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RevenueByProvider>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_provider"])
            .start_timer();

        let rows = sqlx::query_as::<_, RevenueByProvider>(
            r#"
            SELECT a.provider_id,
                   COALESCE(SUM(a.amount), 0) AS total,
                   COUNT(*) AS allocation_count
            FROM allocations a
            JOIN payments p ON p.payment_id = a.payment_id
            WHERE p.clinic_id = $1
              AND p.payment_date >= $2
              AND p.payment_date <= $3
              AND a.is_voided = FALSE
              AND p.is_voided = FALSE
            GROUP BY a.provider_id
            ORDER BY total DESC
            "#,
        )
        .bind(clinic_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to compute revenue by provider: {}",
                e
            ))
        })?;

        timer.observe_duration();

        Ok(rows)
    }

    /// Revenue broken down by clinic, across all clinics.
    #[instrument(skip(self))]
    pub async fn revenue_by_clinic(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RevenueByClinic>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_clinic"])
            .start_timer();

        let rows = sqlx::query_as::<_, RevenueByClinic>(
            r#"
            SELECT p.clinic_id,
                   COALESCE(SUM(a.amount), 0) AS total,
                   COUNT(DISTINCT p.payment_id) AS payment_count
            FROM allocations a
            JOIN payments p ON p.payment_id = a.payment_id
            WHERE p.payment_date >= $1
              AND p.payment_date <= $2
              AND a.is_voided = FALSE
              AND p.is_voided = FALSE
            GROUP BY p.clinic_id
            ORDER BY total DESC
            "#,
        )
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute revenue by clinic: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows)
    }

    /// Daily revenue breakdown for dashboard charts.
    #[instrument(skip(self), fields(clinic_id = %clinic_id))]
    pub async fn revenue_by_day(
        &self,
        clinic_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<RevenueByDay>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["revenue_by_day"])
            .start_timer();

        let rows = sqlx::query_as::<_, RevenueByDay>(
            r#"
            SELECT p.payment_date AS day,
                   COALESCE(SUM(a.amount), 0) AS total,
                   COUNT(DISTINCT p.payment_id) AS payment_count
            FROM allocations a
            JOIN payments p ON p.payment_id = a.payment_id
            WHERE p.clinic_id = $1
              AND p.payment_date >= $2
              AND p.payment_date <= $3
              AND a.is_voided = FALSE
              AND p.is_voided = FALSE
            GROUP BY p.payment_date
            ORDER BY p.payment_date
            "#,
        )
        .bind(clinic_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to compute revenue by day: {}", e))
        })?;

        timer.observe_duration();

        Ok(rows)
    }
}
