use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod projects;
pub mod timecards;

pub fn v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/projects", get(projects::list_projects))
        .route("/invoices", get(invoices::list_invoices))
        .route("/timecards", get(timecards::list_timecards))
}
