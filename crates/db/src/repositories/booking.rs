use chrono::Utc;
use sqlx::sqlite::SqliteRow;

use concierge_core::domain::booking::{
    Booking, BookingConflict, BookingId, NewBooking, ReservationStatus, RoomBookingEntry, StayRange,
};
use concierge_core::domain::room::RoomId;

use super::{column, date_column, date_text, BookingRepository, RepositoryError};
use crate::DbPool;

pub struct SqlBookingRepository {
    pool: DbPool,
}

impl SqlBookingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_conflict(row: &SqliteRow) -> Result<BookingConflict, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(BookingConflict {
        id: BookingId(column(row, "id")?),
        check_in_date: date_column(row, "check_in_date")?,
        check_out_date: date_column(row, "check_out_date")?,
        status: ReservationStatus::parse(&status),
    })
}

fn row_to_entry(row: &SqliteRow) -> Result<RoomBookingEntry, RepositoryError> {
    let status: String = column(row, "status")?;
    Ok(RoomBookingEntry {
        id: BookingId(column(row, "id")?),
        check_in_date: date_column(row, "check_in_date")?,
        check_out_date: date_column(row, "check_out_date")?,
        status: ReservationStatus::parse(&status),
        guest_name: column(row, "guest_name")?,
        room_number: column(row, "room_number")?,
    })
}

#[async_trait::async_trait]
impl BookingRepository for SqlBookingRepository {
    async fn find_conflicts(
        &self,
        room_id: RoomId,
        stay: &StayRange,
    ) -> Result<Vec<BookingConflict>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, check_in_date, check_out_date, status
             FROM bookings
             WHERE room_id = ?1
               AND status <> 'cancelled'
               AND check_in_date <= ?3
               AND check_out_date >= ?2
             ORDER BY check_in_date, id",
        )
        .bind(room_id.0)
        .bind(date_text(stay.check_in))
        .bind(date_text(stay.check_out))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_conflict).collect()
    }

    async fn insert_if_available(
        &self,
        booking: &NewBooking,
    ) -> Result<Option<Booking>, RepositoryError> {
        let created_at = Utc::now();
        let inserted: Option<i64> = sqlx::query_scalar(
            "INSERT INTO bookings
                 (room_id, user_id, check_in_date, check_out_date, number_of_guests,
                  total_price, status, created_at)
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8
             WHERE NOT EXISTS (
                 SELECT 1 FROM bookings
                 WHERE room_id = ?1
                   AND status <> 'cancelled'
                   AND check_in_date <= ?4
                   AND check_out_date >= ?3
             )
             RETURNING id",
        )
        .bind(booking.room_id.0)
        .bind(booking.user_id.0)
        .bind(date_text(booking.stay.check_in))
        .bind(date_text(booking.stay.check_out))
        .bind(i64::from(booking.number_of_guests))
        .bind(booking.total_price.to_string())
        .bind(booking.status.as_str())
        .bind(created_at.to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        let Some(id) = inserted else {
            tracing::debug!(
                event_name = "db.booking.refused",
                room_id = booking.room_id.0,
                check_in = %booking.stay.check_in,
                check_out = %booking.stay.check_out,
                "stay overlaps an existing booking"
            );
            return Ok(None);
        };

        Ok(Some(Booking {
            id: BookingId(id),
            room_id: booking.room_id,
            user_id: booking.user_id,
            check_in_date: booking.stay.check_in,
            check_out_date: booking.stay.check_out,
            number_of_guests: booking.number_of_guests,
            total_price: booking.total_price,
            status: booking.status,
            created_at,
        }))
    }

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<RoomBookingEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT b.id, b.check_in_date, b.check_out_date, b.status,
                    u.name AS guest_name, r.room_number
             FROM bookings b
             JOIN users u ON u.id = b.user_id
             JOIN rooms r ON r.id = b.room_id
             WHERE b.room_id = ?
             ORDER BY b.check_in_date, b.id",
        )
        .bind(room_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }
}
