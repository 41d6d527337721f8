use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::UnprocessableEntity(format!("Validation failed: {errors}")))
}

/// Query parameters for `GET /dashboard`. Set-valued filters arrive as
/// comma-separated lists; blanks are dropped during normalization.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DashboardQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub statuses: Option<String>,
    pub client_companies: Option<String>,
}

impl DashboardQuery {
    pub fn into_filters(self) -> DashboardFilters {
        DashboardFilters {
            start_date: self.start_date,
            end_date: self.end_date,
            statuses: self.statuses.as_deref().map(split_csv),
            client_companies: self.client_companies.as_deref().map(split_csv),
        }
    }
}

/// The engine-facing filter set. Every field is optional; an empty vector in
/// a set field means "no restriction", same as the field being absent.
#[derive(Debug, Clone, Default)]
pub struct DashboardFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub statuses: Option<Vec<String>>,
    pub client_companies: Option<Vec<String>>,
}

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProjectListQuery {
    pub status: Option<String>,
    pub client_company: Option<String>,
    #[validate(length(max = 255))]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TimecardListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

// ── Dashboard response models ──

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metric {
    pub value: f64,
    pub trend: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetrics {
    pub total_revenue: Metric,
    pub new_customers: Metric,
    pub wip_projects: Metric,
    pub completed_revenue: Metric,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentInvoice {
    pub id: uuid::Uuid,
    pub invoice_number: String,
    pub invoice_amount: f64,
    pub invoice_status: Option<String>,
    pub payment_status: Option<String>,
    pub date_issued: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActiveProject {
    pub id: uuid::Uuid,
    pub name: String,
    pub status: String,
    pub client_company: Option<String>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeyPm {
    pub id: uuid::Uuid,
    pub name: Option<String>,
    pub active_project_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub summary_metrics: SummaryMetrics,
    pub project_status_distribution: Vec<StatusCount>,
    pub recent_invoices: Vec<RecentInvoice>,
    pub active_projects: Vec<ActiveProject>,
    pub key_pms: Vec<KeyPm>,
}

/// Caller-facing result: either a complete dashboard payload or a single
/// aggregated failure message, never a partial payload with silent gaps.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEnvelope {
    pub data: Option<DashboardData>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::DashboardQuery;

    #[test]
    fn csv_filters_split_and_trim() {
        let query = DashboardQuery {
            statuses: Some("won, in progress ,".to_string()),
            client_companies: Some(String::new()),
            ..DashboardQuery::default()
        };
        let filters = query.into_filters();
        assert_eq!(
            filters.statuses.as_deref(),
            Some(&["won".to_string(), "in progress".to_string()][..])
        );
        // An all-blank list normalizes to an empty vector; the engine treats
        // that the same as the field being absent.
        assert_eq!(filters.client_companies, Some(Vec::new()));
    }
}
