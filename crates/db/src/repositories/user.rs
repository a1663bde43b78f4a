use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use concierge_core::domain::user::{GuestContact, User, UserId};

use super::{column, timestamp_column, RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(column(row, "id")?),
        name: column(row, "name")?,
        email: column(row, "email")?,
        phone: column(row, "phone")?,
        created_at: timestamp_column(row, "created_at")?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, email, phone, created_at FROM users WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, created_at FROM users WHERE name = ? ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn create(&self, contact: &GuestContact) -> Result<User, RepositoryError> {
        let created_at = Utc::now();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (name, email, phone, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(&contact.name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(event_name = "db.user.created", user_id = id, "guest record created");

        Ok(User {
            id: UserId(id),
            name: contact.name.clone(),
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            created_at,
        })
    }

    async fn update_contact(
        &self,
        id: UserId,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET email = ?, phone = ? WHERE id = ?")
            .bind(email)
            .bind(phone)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
