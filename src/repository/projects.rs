use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crate::error::AppError;
use crate::repository::map_db_error;
use crate::schemas::{ActiveProject, StatusCount};

/// The business definition of "work in progress". Fixed: caller status
/// filters never override this set.
pub const WIP_STATUSES: &[&str] = &["in progress"];

/// Statuses whose revenue counts as realized.
pub const COMPLETED_STATUSES: &[&str] = &["completed", "invoiced", "closed"];

const ACTIVE_PROJECTS_LIMIT: i64 = 50;

/// An inclusive `[start, end]` span over `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}

/// How a query constrains `status`: the caller's filter set, or a fixed
/// business set that ignores whatever the caller asked for.
#[derive(Debug, Clone, Copy)]
pub enum StatusRule<'a> {
    Caller,
    Fixed(&'a [&'a str]),
}

/// The shared predicate applied to every project sub-query. Built once per
/// dashboard invocation so all fetchers see the same filter combination.
#[derive(Debug, Clone, Default)]
pub struct ProjectScope {
    statuses: Option<Vec<String>>,
    client_companies: Option<Vec<String>>,
}

impl ProjectScope {
    /// An empty vector means "no restriction", exactly like `None`. The
    /// normalization happens here so no fetcher can accidentally turn an
    /// empty set into a match-nothing clause.
    pub fn new(statuses: Option<Vec<String>>, client_companies: Option<Vec<String>>) -> Self {
        Self {
            statuses: statuses.filter(|values| !values.is_empty()),
            client_companies: client_companies.filter(|values| !values.is_empty()),
        }
    }

    pub fn push_conditions(
        &self,
        query: &mut QueryBuilder<Postgres>,
        window: Option<&TimeWindow>,
        status_rule: StatusRule<'_>,
    ) {
        if let Some(window) = window {
            query
                .push(" AND p.created_at >= ")
                .push_bind(window.start)
                .push(" AND p.created_at <= ")
                .push_bind(window.end);
        }
        match status_rule {
            StatusRule::Caller => {
                if let Some(statuses) = &self.statuses {
                    query
                        .push(" AND p.status::text = ANY(")
                        .push_bind(statuses.clone())
                        .push(")");
                }
            }
            StatusRule::Fixed(statuses) => {
                let fixed = statuses
                    .iter()
                    .map(|status| (*status).to_string())
                    .collect::<Vec<_>>();
                query
                    .push(" AND p.status::text = ANY(")
                    .push_bind(fixed)
                    .push(")");
            }
        }
        if let Some(companies) = &self.client_companies {
            query
                .push(" AND p.client_company::text = ANY(")
                .push_bind(companies.clone())
                .push(")");
        }
    }
}

/// Revenue sum over matching rows; NULL revenue counts as zero.
pub async fn sum_revenue(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<f64, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT COALESCE(SUM(p.revenue), 0)::float8 AS total FROM projects p WHERE 1=1",
    );
    scope.push_conditions(&mut query, Some(window), StatusRule::Caller);

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    row.try_get::<f64, _>("total").map_err(map_db_error)
}

/// The WHERE base excludes NULL companies before the shared conditions are
/// appended, and the count is `DISTINCT` so duplicated rows for the same
/// company count once.
fn distinct_client_companies_query<'a>(
    scope: &ProjectScope,
    window: &TimeWindow,
) -> QueryBuilder<'a, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT COUNT(DISTINCT p.client_company)::bigint AS total FROM projects p \
         WHERE p.client_company IS NOT NULL",
    );
    scope.push_conditions(&mut query, Some(window), StatusRule::Caller);
    query
}

/// Exact distinct count of non-null client companies over matching rows.
pub async fn count_distinct_client_companies(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<i64, AppError> {
    let mut query = distinct_client_companies_query(scope, window);

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    row.try_get::<i64, _>("total").map_err(map_db_error)
}

/// Count of rows in the fixed WIP status set. Caller status filters are
/// deliberately ignored; client-company and window conditions still apply.
pub async fn count_wip(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<i64, AppError> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*)::bigint AS total FROM projects p WHERE 1=1");
    scope.push_conditions(&mut query, Some(window), StatusRule::Fixed(WIP_STATUSES));

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    row.try_get::<i64, _>("total").map_err(map_db_error)
}

pub async fn sum_completed_revenue(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<f64, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT COALESCE(SUM(p.revenue), 0)::float8 AS total FROM projects p WHERE 1=1",
    );
    scope.push_conditions(&mut query, Some(window), StatusRule::Fixed(COMPLETED_STATUSES));

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    row.try_get::<f64, _>("total").map_err(map_db_error)
}

/// Row count per status. GROUP BY naturally omits zero-count statuses and
/// `status` is NOT NULL, so no empty or null buckets appear.
pub async fn status_histogram(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<Vec<StatusCount>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT p.status::text AS status, COUNT(*)::bigint AS count FROM projects p WHERE 1=1",
    );
    scope.push_conditions(&mut query, Some(window), StatusRule::Caller);
    query.push(" GROUP BY p.status ORDER BY count DESC, status ASC");

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    rows.into_iter()
        .map(|row| {
            Ok(StatusCount {
                status: row.try_get("status").map_err(map_db_error)?,
                count: row.try_get("count").map_err(map_db_error)?,
            })
        })
        .collect()
}

/// In-flight projects matching the caller's filters, projected to the
/// lightweight dashboard shape. Soonest deadline first (NULL deadlines
/// last, then newest created), capped at [`ACTIVE_PROJECTS_LIMIT`] rows;
/// the ordering decides which rows survive the cap.
pub async fn active_projects(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
) -> Result<Vec<ActiveProject>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT p.id, p.name, p.status::text AS status, p.client_company::text AS client_company, \
         p.end_date FROM projects p WHERE 1=1",
    );
    scope.push_conditions(&mut query, Some(window), StatusRule::Fixed(WIP_STATUSES));
    query
        .push(" ORDER BY p.end_date ASC NULLS LAST, p.created_at DESC LIMIT ")
        .push_bind(ACTIVE_PROJECTS_LIMIT);

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    rows.into_iter()
        .map(|row| {
            Ok(ActiveProject {
                id: row.try_get("id").map_err(map_db_error)?,
                name: row.try_get("name").map_err(map_db_error)?,
                status: row.try_get("status").map_err(map_db_error)?,
                client_company: row.try_get("client_company").map_err(map_db_error)?,
                end_date: row.try_get("end_date").map_err(map_db_error)?,
            })
        })
        .collect()
}

/// Active-project count for a single manager, scoped like the other WIP
/// fetchers. One call per manager; failures are isolated by the caller.
pub async fn count_active_for_manager(
    pool: &PgPool,
    scope: &ProjectScope,
    window: &TimeWindow,
    manager_id: Uuid,
) -> Result<i64, AppError> {
    let mut query =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*)::bigint AS total FROM projects p WHERE 1=1");
    scope.push_conditions(&mut query, Some(window), StatusRule::Fixed(WIP_STATUSES));
    query.push(" AND p.manager_id = ").push_bind(manager_id);

    let row = query.build().fetch_one(pool).await.map_err(map_db_error)?;
    row.try_get::<i64, _>("total").map_err(map_db_error)
}

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub name: String,
    pub project_number: Option<String>,
    pub status: String,
    pub client_company: Option<String>,
    pub manager_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub revenue: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Project listing for the projects page: optional status / client-company
/// equality filters and a name-or-number substring search, newest first.
pub async fn list_projects(
    pool: &PgPool,
    status: Option<&str>,
    client_company: Option<&str>,
    search: Option<&str>,
) -> Result<Vec<ProjectRow>, AppError> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT p.id, p.name, p.project_number, p.status::text AS status, \
         p.client_company::text AS client_company, p.manager_id, p.start_date, p.end_date, \
         p.revenue, p.created_at FROM projects p WHERE 1=1",
    );
    if let Some(status) = status.map(str::trim).filter(|value| !value.is_empty()) {
        query
            .push(" AND p.status::text = ")
            .push_bind(status.to_string());
    }
    if let Some(company) = client_company.map(str::trim).filter(|value| !value.is_empty()) {
        query
            .push(" AND p.client_company::text = ")
            .push_bind(company.to_string());
    }
    if let Some(term) = search.map(str::trim).filter(|value| !value.is_empty()) {
        let pattern = format!("%{}%", term.replace('%', "\\%").replace('_', "\\_"));
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.project_number ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    query.push(" ORDER BY p.created_at DESC");

    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    rows.into_iter()
        .map(|row| sqlx::FromRow::from_row(&row).map_err(map_db_error))
        .collect()
}
