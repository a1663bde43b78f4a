use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Decode, Row, Sqlite, Type};
use thiserror::Error;

use concierge_core::domain::activity::Activity;
use concierge_core::domain::booking::{Booking, BookingConflict, NewBooking, RoomBookingEntry, StayRange};
use concierge_core::domain::room::{Room, RoomId, RoomRef};
use concierge_core::domain::spa::{
    AppointmentConflict, AppointmentSlot, NewAppointment, ServiceRef, SpaAppointment, SpaService,
    SpaServiceId,
};
use concierge_core::domain::user::{GuestContact, User, UserId};

pub mod activity;
pub mod booking;
pub mod room;
pub mod spa;
pub mod user;

pub use activity::SqlActivityRepository;
pub use booking::SqlBookingRepository;
pub use room::SqlRoomRepository;
pub use spa::SqlSpaRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<User>, RepositoryError>;
    async fn create(&self, contact: &GuestContact) -> Result<User, RepositoryError>;
    async fn update_contact(
        &self,
        id: UserId,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), RepositoryError>;

    /// Finds a guest by exact name, refreshing changed contact details, or
    /// creates one. The flag is `true` when a new row was inserted.
    async fn get_or_create(&self, contact: &GuestContact) -> Result<(User, bool), RepositoryError> {
        let Some(existing) = self.find_by_name(&contact.name).await? else {
            let created = self.create(contact).await?;
            return Ok((created, true));
        };

        match contact.contact_update(&existing) {
            Some((email, phone)) => {
                self.update_contact(existing.id, email.as_deref(), phone.as_deref()).await?;
                Ok((User { email, phone, ..existing }, false))
            }
            None => Ok((existing, false)),
        }
    }
}

#[async_trait]
pub trait RoomRepository: Send + Sync {
    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError>;
    async fn find_by_number(&self, room_number: &str) -> Result<Option<Room>, RepositoryError>;
    /// Rooms open for booking, cheapest first.
    async fn list_available(&self) -> Result<Vec<Room>, RepositoryError>;

    async fn resolve(&self, reference: &RoomRef) -> Result<Option<Room>, RepositoryError> {
        match reference {
            RoomRef::Id(id) => self.find_by_id(*id).await,
            RoomRef::Number(number) => self.find_by_number(number).await,
        }
    }
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Non-cancelled bookings of `room_id` whose dates intersect `stay`,
    /// bounds inclusive.
    async fn find_conflicts(
        &self,
        room_id: RoomId,
        stay: &StayRange,
    ) -> Result<Vec<BookingConflict>, RepositoryError>;

    /// Inserts the booking only if no blocking booking exists, as a single
    /// statement. Returns `None` when the stay was already taken.
    async fn insert_if_available(&self, booking: &NewBooking)
        -> Result<Option<Booking>, RepositoryError>;

    async fn list_for_room(&self, room_id: RoomId) -> Result<Vec<RoomBookingEntry>, RepositoryError>;
}

#[async_trait]
pub trait SpaRepository: Send + Sync {
    async fn find_service_by_id(&self, id: SpaServiceId)
        -> Result<Option<SpaService>, RepositoryError>;
    async fn find_service_by_name(&self, name: &str) -> Result<Option<SpaService>, RepositoryError>;
    async fn list_available_services(&self) -> Result<Vec<SpaService>, RepositoryError>;
    async fn find_conflicts(
        &self,
        service_id: SpaServiceId,
        slot: &AppointmentSlot,
    ) -> Result<Vec<AppointmentConflict>, RepositoryError>;
    async fn insert_if_free(
        &self,
        appointment: &NewAppointment,
    ) -> Result<Option<SpaAppointment>, RepositoryError>;

    async fn resolve_service(
        &self,
        reference: &ServiceRef,
    ) -> Result<Option<SpaService>, RepositoryError> {
        match reference {
            ServiceRef::Id(id) => self.find_service_by_id(*id).await,
            ServiceRef::Name(name) => self.find_service_by_name(name).await,
        }
    }
}

#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn list_available(&self) -> Result<Vec<Activity>, RepositoryError>;
}

pub(crate) fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, RepositoryError>
where
    T: Decode<'r, Sqlite> + Type<Sqlite>,
{
    row.try_get(name).map_err(|e| RepositoryError::Decode(e.to_string()))
}

pub(crate) fn decimal_column(row: &SqliteRow, name: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = column(row, name)?;
    Decimal::from_str(raw.trim())
        .map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
}

pub(crate) fn date_column(row: &SqliteRow, name: &str) -> Result<NaiveDate, RepositoryError> {
    let raw: String = column(row, name)?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
}

pub(crate) fn count_column(row: &SqliteRow, name: &str) -> Result<u32, RepositoryError> {
    let raw: i64 = column(row, name)?;
    u32::try_from(raw).map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
}

/// RFC 3339, or SQLite's `CURRENT_TIMESTAMP` text read as UTC.
pub(crate) fn timestamp_column(row: &SqliteRow, name: &str) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = column(row, name)?;
    parse_timestamp(raw.trim()).map_err(|e| RepositoryError::Decode(format!("{name} `{raw}`: {e}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).or_else(|rfc_error| {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_error)
    })
}

pub(crate) fn date_text(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
