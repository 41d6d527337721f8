use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::repository::map_db_error;

/// The fixed manager role used for the key-PM dashboard section.
pub const MANAGER_ROLE: &str = "pm";

#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct PmUser {
    pub id: Uuid,
    pub name: Option<String>,
}

pub async fn list_pms(pool: &PgPool) -> Result<Vec<PmUser>, AppError> {
    sqlx::query_as::<_, PmUser>(
        "SELECT id, name FROM users WHERE role::text = $1 ORDER BY name ASC NULLS LAST, id ASC",
    )
    .bind(MANAGER_ROLE)
    .fetch_all(pool)
    .await
    .map_err(map_db_error)
}
