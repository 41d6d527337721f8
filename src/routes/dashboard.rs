use axum::extract::{Query, State};
use axum::Json;

use crate::error::AppResult;
use crate::schemas::{validate_input, DashboardEnvelope, DashboardQuery};
use crate::services::dashboard::get_dashboard_data;
use crate::state::AppState;

/// Dashboard summary: four trend metrics, a status histogram, the latest
/// invoices, active projects, and per-PM active counts. Malformed filters
/// return 400; a critical fetch failure returns 200 with `data: null` and a
/// single aggregated error, matching the caller contract.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardEnvelope>> {
    validate_input(&query)?;
    let pool = state.require_db()?;
    let envelope = get_dashboard_data(pool, query.into_filters()).await?;
    Ok(Json(envelope))
}
