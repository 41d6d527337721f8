use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::repository::timecards;
use crate::schemas::{validate_input, TimecardListQuery};
use crate::state::AppState;

pub async fn list_timecards(
    State(state): State<AppState>,
    Query(query): Query<TimecardListQuery>,
) -> AppResult<Json<Value>> {
    validate_input(&query)?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::BadRequest("from must not be after to.".to_string()));
        }
    }
    let pool = state.require_db()?;

    let rows = timecards::list_timecards(pool, query.from, query.to).await?;
    Ok(Json(json!({ "timecards": rows })))
}
