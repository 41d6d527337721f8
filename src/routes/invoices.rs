use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::repository::invoices;
use crate::services::finances::summarize_invoices;
use crate::state::AppState;

/// Full invoice list, newest-issued first, with the receivables summary the
/// finances page renders above the table.
pub async fn list_invoices(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let pool = state.require_db()?;

    let rows = invoices::list_invoices(pool).await?;
    let summary = summarize_invoices(&rows, Utc::now().date_naive());

    Ok(Json(json!({ "invoices": rows, "summary": summary })))
}
