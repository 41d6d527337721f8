pub mod invoices;
pub mod projects;
pub mod timecards;
pub mod users;

use crate::error::AppError;

pub(crate) fn map_db_error(error: sqlx::Error) -> AppError {
    tracing::error!(db_error = %error, "Database query failed");
    AppError::Dependency("Database operation failed.".to_string())
}
