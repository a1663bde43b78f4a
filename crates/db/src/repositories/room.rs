use sqlx::sqlite::SqliteRow;

use concierge_core::domain::room::{Room, RoomId};

use super::{column, count_column, decimal_column, RepositoryError, RoomRepository};
use crate::DbPool;

const ROOM_COLUMNS: &str =
    "id, room_number, room_type, description, price_per_night, capacity, is_available, amenities";

pub struct SqlRoomRepository {
    pool: DbPool,
}

impl SqlRoomRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_room(row: &SqliteRow) -> Result<Room, RepositoryError> {
    let amenities_json: String = column(row, "amenities")?;
    let amenities: Vec<String> = serde_json::from_str(&amenities_json)
        .map_err(|error| RepositoryError::Decode(error.to_string()))?;

    Ok(Room {
        id: RoomId(column(row, "id")?),
        room_number: column(row, "room_number")?,
        room_type: column(row, "room_type")?,
        description: column(row, "description")?,
        price_per_night: decimal_column(row, "price_per_night")?,
        capacity: count_column(row, "capacity")?,
        is_available: column(row, "is_available")?,
        amenities,
    })
}

#[async_trait::async_trait]
impl RoomRepository for SqlRoomRepository {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn find_by_number(&self, room_number: &str) -> Result<Option<Room>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE room_number = ?"))
            .bind(room_number.trim())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_room).transpose()
    }

    async fn list_available(&self) -> Result<Vec<Room>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ROOM_COLUMNS} FROM rooms
             WHERE is_available = 1
             ORDER BY CAST(price_per_night AS REAL), room_number"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_room).collect()
    }
}

#[cfg(test)]
mod tests {
    use concierge_core::domain::room::{RoomId, RoomRef};
    use rust_decimal::Decimal;

    use super::SqlRoomRepository;
    use crate::repositories::RoomRepository;
    use crate::{connect_with_settings, migrations, DbPool};

    async fn setup() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO rooms (room_number, room_type, description, price_per_night, capacity, is_available, amenities) VALUES
                ('301', 'Suite', 'Top floor', '300.00', 4, 1, '[\"balcony\"]'),
                ('101', 'Standard', 'Garden side', '99.50', 2, 1, '[]'),
                ('102', 'Standard', 'Closed for repairs', '80.00', 2, 0, '[]')",
        )
        .execute(&pool)
        .await
        .expect("seed rooms");
        pool
    }

    #[tokio::test]
    async fn resolves_by_id_and_number() {
        let repo = SqlRoomRepository::new(setup().await);

        let by_number = repo
            .resolve(&RoomRef::Number("301".to_string()))
            .await
            .expect("lookup")
            .expect("room 301");
        assert_eq!(by_number.amenities, vec!["balcony".to_string()]);
        assert_eq!(by_number.price_per_night, Decimal::new(30_000, 2));

        let by_id = repo.resolve(&RoomRef::Id(by_number.id)).await.expect("lookup");
        assert_eq!(by_id.map(|room| room.room_number), Some("301".to_string()));

        assert!(repo.resolve(&RoomRef::Id(RoomId(999))).await.expect("lookup").is_none());
        assert!(repo
            .resolve(&RoomRef::Number("999".to_string()))
            .await
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn available_rooms_are_ordered_by_price() {
        let repo = SqlRoomRepository::new(setup().await);

        let numbers: Vec<String> = repo
            .list_available()
            .await
            .expect("list")
            .into_iter()
            .map(|room| room.room_number)
            .collect();

        assert_eq!(numbers, vec!["101".to_string(), "301".to_string()]);
    }
}
