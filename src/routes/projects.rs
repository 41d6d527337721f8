use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::repository::projects;
use crate::schemas::{validate_input, ProjectListQuery};
use crate::state::AppState;

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<Value>> {
    validate_input(&query)?;
    let pool = state.require_db()?;

    let rows = projects::list_projects(
        pool,
        query.status.as_deref(),
        query.client_company.as_deref(),
        query.search.as_deref(),
    )
    .await?;

    Ok(Json(json!({ "projects": rows })))
}
