use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::repository::map_db_error;
use crate::schemas::RecentInvoice;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub invoice_amount: f64,
    pub invoice_status: Option<String>,
    pub payment_status: Option<String>,
    pub date_issued: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Most recent invoices across the whole store. Deliberately not scoped by
/// the dashboard's project filters; `id` breaks issue-date ties so the
/// ordering stays deterministic.
pub async fn recent_invoices(pool: &PgPool, limit: i64) -> Result<Vec<RecentInvoice>, AppError> {
    sqlx::query_as::<_, RecentInvoice>(
        "SELECT id, invoice_number, invoice_amount, invoice_status::text AS invoice_status, \
         payment_status::text AS payment_status, date_issued \
         FROM invoices \
         ORDER BY date_issued DESC NULLS LAST, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}

pub async fn list_invoices(pool: &PgPool) -> Result<Vec<InvoiceRow>, AppError> {
    sqlx::query_as::<_, InvoiceRow>(
        "SELECT id, invoice_number, invoice_amount, invoice_status::text AS invoice_status, \
         payment_status::text AS payment_status, date_issued, due_date, created_at \
         FROM invoices \
         ORDER BY date_issued DESC NULLS LAST, id DESC",
    )
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}
