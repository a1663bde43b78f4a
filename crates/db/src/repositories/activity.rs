use sqlx::sqlite::SqliteRow;

use concierge_core::domain::activity::{Activity, ActivityId};

use super::{column, count_column, decimal_column, ActivityRepository, RepositoryError};
use crate::DbPool;

pub struct SqlActivityRepository {
    pool: DbPool,
}

impl SqlActivityRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_activity(row: &SqliteRow) -> Result<Activity, RepositoryError> {
    Ok(Activity {
        id: ActivityId(column(row, "id")?),
        activity_name: column(row, "activity_name")?,
        description: column(row, "description")?,
        price: decimal_column(row, "price")?,
        duration_minutes: count_column(row, "duration_minutes")?,
        schedule: column(row, "schedule")?,
        is_available: column(row, "is_available")?,
    })
}

#[async_trait::async_trait]
impl ActivityRepository for SqlActivityRepository {
    async fn list_available(&self) -> Result<Vec<Activity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, activity_name, description, price, duration_minutes, schedule, is_available
             FROM activities
             WHERE is_available = 1
             ORDER BY CAST(price AS REAL), activity_name",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_activity).collect()
    }
}
