use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::repository::map_db_error;

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct TimecardRow {
    pub id: i64,
    pub worker_name: String,
    pub date: NaiveDate,
    pub hours: f64,
    pub wage_per_hour: f64,
    pub total_pay: Option<f64>,
    pub payment_amount: Option<f64>,
    pub project: String,
    pub created_at: DateTime<Utc>,
}

/// Timecards newest-date first, optionally bounded to an inclusive date
/// range on the worked `date` column.
pub async fn list_timecards(
    pool: &PgPool,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<TimecardRow>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT t.id, t.worker_name, t.date, t.hours, t.wage_per_hour, t.total_pay, \
         t.payment_amount, t.project, t.created_at FROM timecards t WHERE 1=1",
    );
    if let Some(from) = from {
        query.push(" AND t.date >= ").push_bind(from);
    }
    if let Some(to) = to {
        query.push(" AND t.date <= ").push_bind(to);
    }
    query.push(" ORDER BY t.date DESC, t.id DESC");

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    rows.into_iter()
        .map(|row| sqlx::FromRow::from_row(&row).map_err(map_db_error))
        .collect()
}
