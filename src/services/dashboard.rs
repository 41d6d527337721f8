//! Dashboard aggregation: resolves the reporting windows, fans out every
//! sub-query concurrently, and merges the results into a single envelope.
//!
//! Failure policy: every sub-fetch runs to completion and lands in an error
//! log instead of cancelling its siblings. Summary-metric failures (revenue,
//! distinct customers, WIP, completed revenue, status distribution) poison
//! the whole response; list-section failures degrade to empty/zero.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use sqlx::PgPool;

use crate::error::AppError;
use crate::repository::projects::{ProjectScope, TimeWindow};
use crate::repository::users::PmUser;
use crate::repository::{invoices, projects, users};
use crate::schemas::{
    ActiveProject, DashboardData, DashboardEnvelope, DashboardFilters, KeyPm, Metric, RecentInvoice,
    StatusCount, SummaryMetrics,
};

pub const RECENT_INVOICES_LIMIT: i64 = 5;
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// The current reporting window plus the equal-duration window immediately
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindows {
    pub current: TimeWindow,
    pub comparison: TimeWindow,
}

fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|_| {
            AppError::BadRequest(format!("Invalid {field}: expected an RFC 3339 timestamp."))
        })
}

/// Turns the caller's optional bounds into the canonical windows. Both
/// endpoints are inclusive. Missing end defaults to `now`; missing start
/// defaults to thirty days before the end. The comparison window ends one
/// microsecond (one timestamptz tick) before the current one starts.
pub fn resolve_windows(
    start_raw: Option<&str>,
    end_raw: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ResolvedWindows, AppError> {
    let start_parsed = start_raw
        .map(|raw| parse_timestamp(raw, "start_date"))
        .transpose()?;
    let end_parsed = end_raw
        .map(|raw| parse_timestamp(raw, "end_date"))
        .transpose()?;

    let end = end_parsed.unwrap_or(now);
    let start = start_parsed.unwrap_or_else(|| end - Duration::days(DEFAULT_WINDOW_DAYS));
    if start > end {
        return Err(AppError::BadRequest(
            "start_date must not be after end_date.".to_string(),
        ));
    }

    let current = TimeWindow { start, end };
    let comparison_end = start - Duration::microseconds(1);
    let comparison = TimeWindow {
        start: comparison_end - current.duration(),
        end: comparison_end,
    };
    Ok(ResolvedWindows { current, comparison })
}

/// Signed percentage change, rounded to the nearest integer. Growth from a
/// zero baseline is reported as a flat 100% by policy.
pub fn trend(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return if current > 0.0 { 100 } else { 0 };
    }
    (((current - previous) / previous) * 100.0).round() as i64
}

#[derive(Debug)]
struct FetchFailure {
    source: String,
    message: String,
}

#[derive(Debug, Default)]
struct ErrorLog {
    entries: Vec<FetchFailure>,
    critical: bool,
}

impl ErrorLog {
    /// Unwraps a fetch outcome, recording the failure under `source` and
    /// substituting `fallback`. Critical failures mark the whole log.
    fn unwrap_or<T>(
        &mut self,
        source: &str,
        critical: bool,
        outcome: Result<T, AppError>,
        fallback: T,
    ) -> T {
        match outcome {
            Ok(value) => value,
            Err(error) => {
                self.entries.push(FetchFailure {
                    source: source.to_string(),
                    message: error.to_string(),
                });
                self.critical |= critical;
                fallback
            }
        }
    }

    fn joined(&self) -> String {
        self.entries
            .iter()
            .map(|entry| format!("{}: {}", entry.source, entry.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Everything the fan-out produced, one `Result` per sub-fetch. Kept as a
/// plain struct so the merge step is a pure function.
struct FetchOutcomes {
    revenue_current: Result<f64, AppError>,
    revenue_previous: Result<f64, AppError>,
    customers_current: Result<i64, AppError>,
    customers_previous: Result<i64, AppError>,
    wip_current: Result<i64, AppError>,
    wip_previous: Result<i64, AppError>,
    completed_revenue: Result<f64, AppError>,
    status_distribution: Result<Vec<StatusCount>, AppError>,
    recent_invoices: Result<Vec<RecentInvoice>, AppError>,
    active_projects: Result<Vec<ActiveProject>, AppError>,
    pm_list: Result<Vec<PmUser>, AppError>,
    pm_counts: Vec<(PmUser, Result<i64, AppError>)>,
}

/// The single caller-facing operation: validate, dispatch, collect,
/// classify, finalize.
pub async fn get_dashboard_data(
    pool: &PgPool,
    filters: DashboardFilters,
) -> Result<DashboardEnvelope, AppError> {
    // Malformed input fails before any fetch is dispatched.
    let windows = resolve_windows(
        filters.start_date.as_deref(),
        filters.end_date.as_deref(),
        Utc::now(),
    )?;
    let scope = ProjectScope::new(filters.statuses, filters.client_companies);

    let current = &windows.current;
    let comparison = &windows.comparison;

    // Join barrier over the independent fetchers: every branch completes
    // and reports its own Result; nothing short-circuits.
    let (
        revenue_current,
        revenue_previous,
        customers_current,
        customers_previous,
        wip_current,
        wip_previous,
        completed_revenue,
        status_distribution,
        recent_invoices,
        active_projects,
        pm_list,
    ) = tokio::join!(
        projects::sum_revenue(pool, &scope, current),
        projects::sum_revenue(pool, &scope, comparison),
        projects::count_distinct_client_companies(pool, &scope, current),
        projects::count_distinct_client_companies(pool, &scope, comparison),
        projects::count_wip(pool, &scope, current),
        projects::count_wip(pool, &scope, comparison),
        projects::sum_completed_revenue(pool, &scope, current),
        projects::status_histogram(pool, &scope, current),
        invoices::recent_invoices(pool, RECENT_INVOICES_LIMIT),
        projects::active_projects(pool, &scope, current),
        users::list_pms(pool),
    );

    // Per-manager counts fan out once the manager list is known; each count
    // is fault-isolated so one failure cannot block the others.
    let pm_counts = match &pm_list {
        Ok(pms) => {
            let scope = &scope;
            join_all(pms.iter().map(|pm| {
                let pm = pm.clone();
                async move {
                    let count =
                        projects::count_active_for_manager(pool, scope, current, pm.id).await;
                    (pm, count)
                }
            }))
            .await
        }
        Err(_) => Vec::new(),
    };

    Ok(assemble(FetchOutcomes {
        revenue_current,
        revenue_previous,
        customers_current,
        customers_previous,
        wip_current,
        wip_previous,
        completed_revenue,
        status_distribution,
        recent_invoices,
        active_projects,
        pm_list,
        pm_counts,
    }))
}

fn assemble(outcomes: FetchOutcomes) -> DashboardEnvelope {
    let mut log = ErrorLog::default();

    let revenue_current = log.unwrap_or("revenue_current", true, outcomes.revenue_current, 0.0);
    let revenue_previous = log.unwrap_or("revenue_previous", true, outcomes.revenue_previous, 0.0);
    let customers_current = log.unwrap_or("customers_current", true, outcomes.customers_current, 0);
    let customers_previous =
        log.unwrap_or("customers_previous", true, outcomes.customers_previous, 0);
    let wip_current = log.unwrap_or("wip_current", true, outcomes.wip_current, 0);
    let wip_previous = log.unwrap_or("wip_previous", true, outcomes.wip_previous, 0);
    let completed_revenue =
        log.unwrap_or("completed_revenue", true, outcomes.completed_revenue, 0.0);
    let status_distribution = log.unwrap_or(
        "status_distribution",
        true,
        outcomes.status_distribution,
        Vec::new(),
    );

    let recent_invoices = log.unwrap_or(
        "recent_invoices",
        false,
        outcomes.recent_invoices,
        Vec::new(),
    );
    let active_projects = log.unwrap_or(
        "active_projects",
        false,
        outcomes.active_projects,
        Vec::new(),
    );
    log.unwrap_or("pm_list", false, outcomes.pm_list.map(|_| ()), ());

    let key_pms = outcomes
        .pm_counts
        .into_iter()
        .map(|(pm, count)| {
            let source = format!("pm_active_count:{}", pm.id);
            let active_project_count = log.unwrap_or(&source, false, count, 0);
            KeyPm {
                id: pm.id,
                name: pm.name,
                active_project_count,
            }
        })
        .collect::<Vec<_>>();

    if log.critical {
        return DashboardEnvelope {
            data: None,
            error: Some(log.joined()),
        };
    }

    for entry in &log.entries {
        tracing::warn!(
            source = %entry.source,
            message = %entry.message,
            "Recovered non-critical dashboard fetch failure"
        );
    }

    let summary_metrics = SummaryMetrics {
        total_revenue: Metric {
            value: revenue_current,
            trend: Some(trend(revenue_current, revenue_previous)),
        },
        new_customers: Metric {
            value: customers_current as f64,
            trend: Some(trend(customers_current as f64, customers_previous as f64)),
        },
        wip_projects: Metric {
            value: wip_current as f64,
            trend: Some(trend(wip_current as f64, wip_previous as f64)),
        },
        // No prior-period definition for realized revenue.
        completed_revenue: Metric {
            value: completed_revenue,
            trend: None,
        },
    };

    DashboardEnvelope {
        data: Some(DashboardData {
            summary_metrics,
            project_status_distribution: status_distribution,
            recent_invoices,
            active_projects,
            key_pms,
        }),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{assemble, resolve_windows, trend, FetchOutcomes, DEFAULT_WINDOW_DAYS};
    use crate::error::AppError;
    use crate::repository::users::PmUser;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_window_is_trailing_thirty_days() {
        let windows = resolve_windows(None, None, now()).unwrap();
        assert_eq!(windows.current.end, now());
        assert_eq!(
            windows.current.start,
            now() - Duration::days(DEFAULT_WINDOW_DAYS)
        );
        assert_eq!(windows.comparison.duration(), windows.current.duration());
        assert!(windows.comparison.end < windows.current.start);
    }

    #[test]
    fn missing_start_defaults_relative_to_end() {
        let windows = resolve_windows(None, Some("2026-06-30T00:00:00Z"), now()).unwrap();
        assert_eq!(
            windows.current.end,
            Utc.with_ymd_and_hms(2026, 6, 30, 0, 0, 0).unwrap()
        );
        assert_eq!(
            windows.current.start,
            windows.current.end - Duration::days(DEFAULT_WINDOW_DAYS)
        );
    }

    #[test]
    fn missing_end_defaults_to_now() {
        let windows = resolve_windows(Some("2026-08-01T00:00:00Z"), None, now()).unwrap();
        assert_eq!(windows.current.end, now());
        assert_eq!(
            windows.current.start,
            Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn comparison_window_immediately_precedes_any_explicit_range() {
        let windows = resolve_windows(
            Some("2026-03-01T00:00:00Z"),
            Some("2026-03-11T00:00:00Z"),
            now(),
        )
        .unwrap();
        assert_eq!(windows.current.duration(), Duration::days(10));
        assert_eq!(windows.comparison.duration(), Duration::days(10));
        assert_eq!(
            windows.current.start - windows.comparison.end,
            Duration::microseconds(1)
        );
    }

    #[test]
    fn malformed_timestamps_fail_fast() {
        assert!(matches!(
            resolve_windows(Some("last tuesday"), None, now()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            resolve_windows(None, Some("2026-13-40"), now()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            resolve_windows(
                Some("2026-08-30T00:00:00Z"),
                Some("2026-08-01T00:00:00Z"),
                now()
            ),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn trend_policy_table() {
        assert_eq!(trend(0.0, 0.0), 0);
        assert_eq!(trend(50.0, 0.0), 100);
        assert_eq!(trend(150.0, 100.0), 50);
        assert_eq!(trend(50.0, 100.0), -50);
        // Nearest-integer rounding.
        assert_eq!(trend(104.0, 100.0), 4);
        assert_eq!(trend(100.4, 100.0), 0);
    }

    fn fetch_error(source: &str) -> AppError {
        AppError::Dependency(format!("{source} query failed"))
    }

    fn healthy_outcomes() -> FetchOutcomes {
        FetchOutcomes {
            revenue_current: Ok(1000.0),
            revenue_previous: Ok(500.0),
            customers_current: Ok(4),
            customers_previous: Ok(2),
            wip_current: Ok(3),
            wip_previous: Ok(3),
            completed_revenue: Ok(750.0),
            status_distribution: Ok(Vec::new()),
            recent_invoices: Ok(Vec::new()),
            active_projects: Ok(Vec::new()),
            pm_list: Ok(Vec::new()),
            pm_counts: Vec::new(),
        }
    }

    #[test]
    fn healthy_fetches_produce_full_data() {
        let envelope = assemble(healthy_outcomes());
        assert!(envelope.error.is_none());
        let data = envelope.data.expect("data");
        assert_eq!(data.summary_metrics.total_revenue.value, 1000.0);
        assert_eq!(data.summary_metrics.total_revenue.trend, Some(100));
        assert_eq!(data.summary_metrics.new_customers.trend, Some(100));
        assert_eq!(data.summary_metrics.wip_projects.trend, Some(0));
        assert_eq!(data.summary_metrics.completed_revenue.trend, None);
    }

    #[test]
    fn failed_revenue_fetch_poisons_the_response() {
        let outcomes = FetchOutcomes {
            revenue_current: Err(fetch_error("revenue_current")),
            ..healthy_outcomes()
        };
        let envelope = assemble(outcomes);
        assert!(envelope.data.is_none());
        let message = envelope.error.expect("aggregated error");
        assert!(message.contains("revenue_current"));
    }

    #[test]
    fn one_failed_manager_count_degrades_to_zero() {
        let failed = PmUser {
            id: Uuid::new_v4(),
            name: Some("TJ Snowdon".to_string()),
        };
        let healthy = PmUser {
            id: Uuid::new_v4(),
            name: Some("Trevor Forbes".to_string()),
        };
        let outcomes = FetchOutcomes {
            pm_list: Ok(vec![failed.clone(), healthy.clone()]),
            pm_counts: vec![
                (failed.clone(), Err(fetch_error("pm_active_count"))),
                (healthy.clone(), Ok(7)),
            ],
            ..healthy_outcomes()
        };
        let envelope = assemble(outcomes);
        assert!(envelope.error.is_none(), "manager failures are non-critical");
        let data = envelope.data.expect("data");
        assert_eq!(data.key_pms.len(), 2);
        let by_id = |id| {
            data.key_pms
                .iter()
                .find(|pm| pm.id == id)
                .expect("pm present")
                .active_project_count
        };
        assert_eq!(by_id(failed.id), 0);
        assert_eq!(by_id(healthy.id), 7);
    }

    #[test]
    fn failed_invoice_list_degrades_to_empty() {
        let outcomes = FetchOutcomes {
            recent_invoices: Err(fetch_error("recent_invoices")),
            active_projects: Err(fetch_error("active_projects")),
            pm_list: Err(fetch_error("pm_list")),
            ..healthy_outcomes()
        };
        let envelope = assemble(outcomes);
        assert!(envelope.error.is_none());
        let data = envelope.data.expect("data");
        assert!(data.recent_invoices.is_empty());
        assert!(data.active_projects.is_empty());
        assert!(data.key_pms.is_empty());
    }

    #[test]
    fn aggregated_error_carries_every_logged_failure() {
        let outcomes = FetchOutcomes {
            wip_current: Err(fetch_error("wip_current")),
            recent_invoices: Err(fetch_error("recent_invoices")),
            ..healthy_outcomes()
        };
        let envelope = assemble(outcomes);
        assert!(envelope.data.is_none());
        let message = envelope.error.expect("aggregated error");
        assert!(message.contains("wip_current"));
        assert!(message.contains("recent_invoices"));
    }
}
