use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use concierge_core::domain::booking::ReservationStatus;
use concierge_core::domain::spa::{
    AppointmentConflict, AppointmentId, AppointmentSlot, NewAppointment, SpaAppointment,
    SpaService, SpaServiceId,
};

use super::{column, count_column, date_text, decimal_column, RepositoryError, SpaRepository};
use crate::DbPool;

const SERVICE_COLUMNS: &str = "id, service_name, description, price, duration_minutes, is_available";

pub struct SqlSpaRepository {
    pool: DbPool,
}

impl SqlSpaRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_service(row: &SqliteRow) -> Result<SpaService, RepositoryError> {
    Ok(SpaService {
        id: SpaServiceId(column(row, "id")?),
        service_name: column(row, "service_name")?,
        description: column(row, "description")?,
        price: decimal_column(row, "price")?,
        duration_minutes: count_column(row, "duration_minutes")?,
        is_available: column(row, "is_available")?,
    })
}

fn row_to_conflict(row: &SqliteRow) -> Result<AppointmentConflict, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(AppointmentConflict {
        id: AppointmentId(column(row, "id")?),
        appointment_time: column(row, "appointment_time")?,
        status: ReservationStatus::parse(&status),
    })
}

#[async_trait::async_trait]
impl SpaRepository for SqlSpaRepository {
    async fn find_service_by_id(
        &self,
        id: SpaServiceId,
    ) -> Result<Option<SpaService>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {SERVICE_COLUMNS} FROM spa_services WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_service).transpose()
    }

    async fn find_service_by_name(&self, name: &str) -> Result<Option<SpaService>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM spa_services
             WHERE service_name = ?1 COLLATE NOCASE
             ORDER BY id LIMIT 1"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_service).transpose()
    }

    async fn list_available_services(&self) -> Result<Vec<SpaService>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {SERVICE_COLUMNS} FROM spa_services
             WHERE is_available = 1
             ORDER BY CAST(price AS REAL), service_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_service).collect()
    }

    async fn find_conflicts(
        &self,
        service_id: SpaServiceId,
        slot: &AppointmentSlot,
    ) -> Result<Vec<AppointmentConflict>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, appointment_time, status
             FROM spa_appointments
             WHERE service_id = ?1
               AND appointment_date = ?2
               AND appointment_time = ?3
               AND status <> 'cancelled'
             ORDER BY id",
        )
        .bind(service_id.0)
        .bind(date_text(slot.date))
        .bind(slot.time_label())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_conflict).collect()
    }

    async fn insert_if_free(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Option<SpaAppointment>, RepositoryError> {
        let created_at = Utc::now();
        let time = appointment.slot.time_label();
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO spa_appointments
                 (service_id, user_id, appointment_date, appointment_time, status, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6
             WHERE NOT EXISTS (
                 SELECT 1 FROM spa_appointments
                 WHERE service_id = ?1
                   AND appointment_date = ?3
                   AND appointment_time = ?4
                   AND status <> 'cancelled'
             )
             RETURNING id",
        )
        .bind(appointment.service_id.0)
        .bind(appointment.user_id.0)
        .bind(date_text(appointment.slot.date))
        .bind(&time)
        .bind(appointment.status.as_str())
        .bind(created_at.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.map(|id| SpaAppointment {
            id: AppointmentId(id),
            service_id: appointment.service_id,
            user_id: appointment.user_id,
            appointment_date: appointment.slot.date,
            appointment_time: time,
            status: appointment.status,
            created_at,
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use concierge_core::domain::booking::ReservationStatus;
    use concierge_core::domain::spa::{AppointmentSlot, NewAppointment, ServiceRef, SpaServiceId};
    use concierge_core::domain::user::{GuestContact, UserId};

    use super::SqlSpaRepository;
    use crate::repositories::{SpaRepository, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> (SqlSpaRepository, UserId) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        sqlx::query(
            "INSERT INTO spa_services (service_name, description, price, duration_minutes, is_available) VALUES
                ('Hot Stone Massage', 'Warm basalt', '130.00', 90, 1),
                ('Swedish Massage', 'Classic', '90.00', 60, 1),
                ('Mud Wrap', 'Seasonal', '70.00', 45, 0)",
        )
        .execute(&pool)
        .await
        .expect("seed services");
        let (user, _) = SqlUserRepository::new(pool.clone())
            .get_or_create(&GuestContact::new("Omar Haddad"))
            .await
            .expect("guest");
        (SqlSpaRepository::new(pool), user.id)
    }

    fn slot(hour: u32, minute: u32) -> AppointmentSlot {
        AppointmentSlot {
            date: NaiveDate::from_ymd_opt(2026, 9, 14).expect("date"),
            time: NaiveTime::from_hms_opt(hour, minute, 0).expect("time"),
        }
    }

    fn appointment(user_id: UserId, slot: AppointmentSlot) -> NewAppointment {
        NewAppointment {
            service_id: SpaServiceId(1),
            user_id,
            slot,
            status: ReservationStatus::Pending,
        }
    }

    #[tokio::test]
    async fn service_names_match_case_insensitively() {
        let (repo, _) = setup().await;
        let service = repo
            .resolve_service(&ServiceRef::Name("hot stone massage".to_string()))
            .await
            .expect("lookup")
            .expect("service");
        assert_eq!(service.id, SpaServiceId(1));
    }

    #[tokio::test]
    async fn only_available_services_are_listed() {
        let (repo, _) = setup().await;
        let names: Vec<String> = repo
            .list_available_services()
            .await
            .expect("list")
            .into_iter()
            .map(|service| service.service_name)
            .collect();
        assert_eq!(names, vec!["Swedish Massage".to_string(), "Hot Stone Massage".to_string()]);
    }

    #[tokio::test]
    async fn slots_conflict_only_on_exact_match() {
        let (repo, user_id) = setup().await;

        let booked = repo.insert_if_free(&appointment(user_id, slot(14, 0))).await.expect("insert");
        assert_eq!(booked.map(|a| a.appointment_time), Some("14:00".to_string()));

        let same = repo.insert_if_free(&appointment(user_id, slot(14, 0))).await.expect("insert");
        assert!(same.is_none());

        let later = repo.insert_if_free(&appointment(user_id, slot(14, 30))).await.expect("insert");
        assert!(later.is_some());

        let conflicts = repo.find_conflicts(SpaServiceId(1), &slot(14, 0)).await.expect("query");
        assert_eq!(conflicts.len(), 1);
    }
}
