//! Availability checks and booking creation for rooms and spa services.
//!
//! Shared by the HTTP handlers and the in-process chat gateway. Every date is
//! checked against the caller-supplied `today`, and inserts go through the
//! repositories' conditional statements so overlapping requests cannot both
//! succeed.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use concierge_core::availability::{blocking_entries, ensure_not_past, quote_stay};
use concierge_core::domain::booking::{
    BookingConflict, BookingDetails, NewBooking, ReservationStatus, RoomBookingEntry, StayRange,
};
use concierge_core::domain::reservation::{
    parse_calendar_date, AvailabilityReport, BookingResponse, Conflicts, ReservationEnvelope,
    ReservationRequest, RoomRequest, SpaRequest,
};
use concierge_core::domain::room::{Room, RoomId, RoomRef, RoomSummary};
use concierge_core::domain::spa::{
    AppointmentConflict, AppointmentDetails, AppointmentSlot, NewAppointment, ServiceSummary,
    SpaService,
};
use concierge_core::domain::user::{GuestContact, GuestSummary};
use concierge_core::errors::{ApplicationError, DateField, DomainError};
use concierge_db::{
    BookingRepository, DbPool, RepositoryError, RoomRepository, SpaRepository,
    SqlBookingRepository, SqlRoomRepository, SqlSpaRepository, SqlUserRepository, UserRepository,
};

/// The resort's current calendar date.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Query string of `GET /bookings/status`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub room_id: Option<String>,
    pub room_number: Option<String>,
    pub check_in: Option<String>,
    pub check_out: Option<String>,
}

impl StatusQuery {
    fn room_reference(&self) -> Option<RoomRef> {
        let non_blank = |value: &Option<String>| {
            value.as_deref().map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
        };

        if let Some(raw) = non_blank(&self.room_id) {
            return Some(match raw.parse::<i64>() {
                Ok(id) => RoomRef::Id(RoomId(id)),
                Err(_) => RoomRef::Number(raw),
            });
        }
        non_blank(&self.room_number).map(RoomRef::Number)
    }

    fn stay(&self) -> Option<StayRange> {
        let check_in = parse_calendar_date("checkIn", self.check_in.as_deref()).ok()?;
        let check_out = parse_calendar_date("checkOut", self.check_out.as_deref()).ok()?;
        StayRange::new(check_in, check_out).ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBookings {
    pub bookings: Vec<RoomBookingEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomAvailability {
    pub room_id: RoomId,
    pub requested: StayRange,
    pub is_available: bool,
    pub overlapping: Vec<RoomBookingEntry>,
    pub message: String,
}

/// Body of `GET /bookings/status`: the full booking list when no usable date
/// range was given, otherwise the verdict for that range.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomStatus {
    Range(RoomAvailability),
    Listing(RoomBookings),
}

pub struct ReservationService {
    users: Arc<dyn UserRepository>,
    rooms: Arc<dyn RoomRepository>,
    bookings: Arc<dyn BookingRepository>,
    spa: Arc<dyn SpaRepository>,
}

impl ReservationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        rooms: Arc<dyn RoomRepository>,
        bookings: Arc<dyn BookingRepository>,
        spa: Arc<dyn SpaRepository>,
    ) -> Self {
        Self { users, rooms, bookings, spa }
    }

    pub fn from_pool(pool: &DbPool) -> Self {
        Self::new(
            Arc::new(SqlUserRepository::new(pool.clone())),
            Arc::new(SqlRoomRepository::new(pool.clone())),
            Arc::new(SqlBookingRepository::new(pool.clone())),
            Arc::new(SqlSpaRepository::new(pool.clone())),
        )
    }

    pub async fn check_availability(
        &self,
        envelope: &ReservationEnvelope,
        today: NaiveDate,
    ) -> Result<AvailabilityReport, ApplicationError> {
        match ReservationRequest::from_envelope(envelope)? {
            ReservationRequest::Room(request) => self.check_room(&request, today).await,
            ReservationRequest::Spa(request) => self.check_spa(&request, today).await,
        }
    }

    pub async fn create_booking(
        &self,
        envelope: &ReservationEnvelope,
        today: NaiveDate,
    ) -> Result<BookingResponse, ApplicationError> {
        match ReservationRequest::from_envelope(envelope)? {
            ReservationRequest::Room(request) => self.book_room(&request, today).await,
            ReservationRequest::Spa(request) => self.book_spa(&request, today).await,
        }
    }

    pub async fn room_status(&self, query: &StatusQuery) -> Result<RoomStatus, ApplicationError> {
        let reference = query.room_reference().ok_or(DomainError::MissingField("roomId"))?;
        let room = self.resolve_room(&reference).await?;
        let entries = self.bookings.list_for_room(room.id).await.map_err(persistence)?;

        let Some(stay) = query.stay() else {
            return Ok(RoomStatus::Listing(RoomBookings { bookings: entries }));
        };

        let overlapping: Vec<RoomBookingEntry> =
            blocking_entries(&entries, &stay).into_iter().cloned().collect();
        let is_available = overlapping.is_empty();
        let message = if is_available {
            "Room is available for those dates.".to_string()
        } else {
            "Room is not available - overlaps with existing bookings.".to_string()
        };

        Ok(RoomStatus::Range(RoomAvailability {
            room_id: room.id,
            requested: stay,
            is_available,
            overlapping,
            message,
        }))
    }

    async fn check_room(
        &self,
        request: &RoomRequest,
        today: NaiveDate,
    ) -> Result<AvailabilityReport, ApplicationError> {
        let (room, stay) = self.validated_stay(request, today).await?;
        let conflicts = self.bookings.find_conflicts(room.id, &stay).await.map_err(persistence)?;
        let quote = quote_stay(room.price_per_night, &stay);
        let available = conflicts.is_empty();

        info!(
            event_name = "reservation.room.checked",
            room_id = room.id.0,
            nights = quote.nights,
            available,
            "room availability checked"
        );

        let message = if available {
            format!("✅ Room {} ({}) is available!", room.room_number, room.room_type)
        } else {
            room_unavailable(&room, &stay, conflicts.clone()).to_string()
        };

        Ok(AvailabilityReport {
            available,
            message,
            conflicts: Some(Conflicts::Rooms(conflicts)),
            room: Some(room),
            service: None,
            nights: Some(quote.nights),
            total_price: Some(quote.total_price),
        })
    }

    async fn check_spa(
        &self,
        request: &SpaRequest,
        today: NaiveDate,
    ) -> Result<AvailabilityReport, ApplicationError> {
        let service = self.validated_service(request, today).await?;
        let conflicts =
            self.spa.find_conflicts(service.id, &request.slot).await.map_err(persistence)?;
        let available = conflicts.is_empty();

        info!(
            event_name = "reservation.spa.checked",
            service_id = service.id.0,
            available,
            "spa availability checked"
        );

        let message = if available {
            format!(
                "✅ {} is available at {} on {}!",
                service.service_name,
                request.slot.time_label(),
                request.slot.date
            )
        } else {
            slot_unavailable(&service, &request.slot, conflicts.clone()).to_string()
        };

        Ok(AvailabilityReport {
            available,
            message,
            conflicts: Some(Conflicts::Spa(conflicts)),
            room: None,
            service: Some(service),
            nights: None,
            total_price: None,
        })
    }

    async fn book_room(
        &self,
        request: &RoomRequest,
        today: NaiveDate,
    ) -> Result<BookingResponse, ApplicationError> {
        let contact = guest(request.guest.as_ref())?;
        let (room, stay) = self.validated_stay(request, today).await?;
        if request.guests > room.capacity {
            return Err(DomainError::CapacityExceeded {
                room_number: room.room_number.clone(),
                capacity: room.capacity,
                requested: request.guests,
            }
            .into());
        }

        let conflicts = self.bookings.find_conflicts(room.id, &stay).await.map_err(persistence)?;
        if !conflicts.is_empty() {
            warn!(
                event_name = "reservation.room.conflict",
                room_id = room.id.0,
                conflicts = conflicts.len(),
                "room booking refused"
            );
            return Err(room_unavailable(&room, &stay, conflicts).into());
        }

        let (user, is_new_user) = self.users.get_or_create(contact).await.map_err(persistence)?;
        let quote = quote_stay(room.price_per_night, &stay);

        let inserted = self
            .bookings
            .insert_if_available(&NewBooking {
                room_id: room.id,
                user_id: user.id,
                stay,
                number_of_guests: request.guests,
                total_price: quote.total_price,
                status: ReservationStatus::Pending,
            })
            .await
            .map_err(persistence)?;

        let Some(booking) = inserted else {
            let conflicts =
                self.bookings.find_conflicts(room.id, &stay).await.map_err(persistence)?;
            warn!(
                event_name = "reservation.room.conflict",
                room_id = room.id.0,
                conflicts = conflicts.len(),
                "room taken between check and insert"
            );
            return Err(room_unavailable(&room, &stay, conflicts).into());
        };

        info!(
            event_name = "reservation.room.booked",
            booking_id = booking.id.0,
            room_id = room.id.0,
            user_id = user.id.0,
            nights = quote.nights,
            is_new_user,
            "room booking created"
        );

        let message = format!(
            "Booking received for {}! {}Booking ID: {}. Room {} for {} night(s). Total: ${:.2}. Status: {}.",
            user.name,
            new_user_note(is_new_user),
            booking.id.0,
            room.room_number,
            quote.nights,
            quote.total_price,
            booking.status.as_str()
        );

        Ok(BookingResponse {
            success: true,
            message,
            booking: Some(BookingDetails {
                booking,
                guest: GuestSummary::from(&user),
                room: RoomSummary::from(&room),
            }),
            appointment: None,
            is_new_user: Some(is_new_user),
            conflicts: None,
        })
    }

    async fn book_spa(
        &self,
        request: &SpaRequest,
        today: NaiveDate,
    ) -> Result<BookingResponse, ApplicationError> {
        let contact = guest(request.guest.as_ref())?;
        let service = self.validated_service(request, today).await?;

        let conflicts =
            self.spa.find_conflicts(service.id, &request.slot).await.map_err(persistence)?;
        if !conflicts.is_empty() {
            return Err(slot_unavailable(&service, &request.slot, conflicts).into());
        }

        let (user, is_new_user) = self.users.get_or_create(contact).await.map_err(persistence)?;
        let inserted = self
            .spa
            .insert_if_free(&NewAppointment {
                service_id: service.id,
                user_id: user.id,
                slot: request.slot,
                status: ReservationStatus::Pending,
            })
            .await
            .map_err(persistence)?;

        let Some(appointment) = inserted else {
            let conflicts =
                self.spa.find_conflicts(service.id, &request.slot).await.map_err(persistence)?;
            return Err(slot_unavailable(&service, &request.slot, conflicts).into());
        };

        info!(
            event_name = "reservation.spa.booked",
            appointment_id = appointment.id.0,
            service_id = service.id.0,
            user_id = user.id.0,
            is_new_user,
            "spa appointment created"
        );

        let message = format!(
            "Spa appointment received for {}! {}Appointment ID: {}. {} on {} at {}. Status: {}.",
            user.name,
            new_user_note(is_new_user),
            appointment.id.0,
            service.service_name,
            request.slot.date,
            request.slot.time_label(),
            appointment.status.as_str()
        );

        Ok(BookingResponse {
            success: true,
            message,
            booking: None,
            appointment: Some(AppointmentDetails {
                appointment,
                guest: GuestSummary::from(&user),
                service: ServiceSummary::from(&service),
            }),
            is_new_user: Some(is_new_user),
            conflicts: None,
        })
    }

    async fn validated_stay(
        &self,
        request: &RoomRequest,
        today: NaiveDate,
    ) -> Result<(Room, StayRange), ApplicationError> {
        ensure_not_past(DateField::CheckIn, request.check_in, today)?;
        ensure_not_past(DateField::CheckOut, request.check_out, today)?;
        let stay = StayRange::new(request.check_in, request.check_out)?;
        let room = self.resolve_room(&request.room).await?;
        Ok((room, stay))
    }

    async fn validated_service(
        &self,
        request: &SpaRequest,
        today: NaiveDate,
    ) -> Result<SpaService, ApplicationError> {
        ensure_not_past(DateField::Appointment, request.slot.date, today)?;
        self.spa
            .resolve_service(&request.service)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::ServiceNotFound(request.service.to_string()).into())
    }

    async fn resolve_room(&self, reference: &RoomRef) -> Result<Room, ApplicationError> {
        self.rooms
            .resolve(reference)
            .await
            .map_err(persistence)?
            .ok_or_else(|| DomainError::RoomNotFound(reference.to_string()).into())
    }
}

fn guest(contact: Option<&GuestContact>) -> Result<&GuestContact, DomainError> {
    contact.ok_or(DomainError::MissingField("guestName"))
}

fn room_unavailable(room: &Room, stay: &StayRange, conflicts: Vec<BookingConflict>) -> DomainError {
    DomainError::RoomUnavailable {
        room_number: room.room_number.clone(),
        room_type: room.room_type.clone(),
        check_in: stay.check_in,
        check_out: stay.check_out,
        conflicts,
    }
}

fn slot_unavailable(
    service: &SpaService,
    slot: &AppointmentSlot,
    conflicts: Vec<AppointmentConflict>,
) -> DomainError {
    DomainError::SlotUnavailable {
        service_name: service.service_name.clone(),
        date: slot.date,
        time: slot.time_label(),
        conflicts,
    }
}

fn new_user_note(is_new_user: bool) -> &'static str {
    if is_new_user {
        "(New user created) "
    } else {
        ""
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use concierge_core::domain::reservation::{Conflicts, ReservationEnvelope};
    use concierge_core::errors::{ApplicationError, DomainError};
    use concierge_db::{connect_with_settings, migrations, DbPool, ResortSeedDataset};
    use rust_decimal::Decimal;
    use serde_json::{json, Value};

    use super::{ReservationService, RoomStatus, StatusQuery};

    async fn setup() -> (ReservationService, DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        ResortSeedDataset::load(&pool).await.expect("seed");
        (ReservationService::from_pool(&pool), pool)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).expect("date")
    }

    fn room(data: Value) -> ReservationEnvelope {
        ReservationEnvelope { kind: "room".to_string(), data }
    }

    async fn booking_count(pool: &DbPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings").fetch_one(pool).await.expect("count")
    }

    #[tokio::test]
    async fn flat_rate_room_prices_two_nights() {
        let (service, pool) = setup().await;
        sqlx::query(
            "INSERT INTO rooms (room_number, room_type, description, price_per_night, capacity)
             VALUES ('901', 'Test Cabin', 'Pricing fixture', '100.00', 2)",
        )
        .execute(&pool)
        .await
        .expect("insert room");

        let report = service
            .check_availability(
                &room(json!({"roomId": "901", "checkIn": "2026-12-25", "checkOut": "2026-12-27"})),
                today(),
            )
            .await
            .expect("report");

        assert!(report.available);
        assert_eq!(report.nights, Some(2));
        assert_eq!(report.total_price, Some(Decimal::new(200, 0)));
        assert_eq!(report.message, "✅ Room 901 (Test Cabin) is available!");
    }

    #[tokio::test]
    async fn past_check_in_is_rejected_before_lookup() {
        let (service, _pool) = setup().await;
        let error = service
            .create_booking(
                &room(json!({"roomId": 999, "guestName": "Ana", "checkIn": "2026-10-16", "checkOut": "2026-10-18"})),
                today(),
            )
            .await
            .expect_err("past date");

        assert!(matches!(error, ApplicationError::Domain(DomainError::PastDate { .. })));
    }

    #[tokio::test]
    async fn unknown_room_number_writes_nothing() {
        let (service, pool) = setup().await;
        let error = service
            .create_booking(
                &room(json!({"roomId": "999", "guestName": "Ana", "checkIn": "2026-12-01", "checkOut": "2026-12-03"})),
                today(),
            )
            .await
            .expect_err("unknown room");

        assert_eq!(error, ApplicationError::Domain(DomainError::RoomNotFound("999".to_string())));
        assert_eq!(booking_count(&pool).await, 0);
        let users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&pool).await.expect("users");
        assert_eq!(users, 0);
    }

    #[tokio::test]
    async fn second_overlapping_booking_is_a_conflict() {
        let (service, pool) = setup().await;
        let first = service
            .create_booking(
                &room(json!({"roomId": 1, "guestName": "Ana", "guestEmail": "ana@example.com", "checkIn": "2026-12-01", "checkOut": "2026-12-05"})),
                today(),
            )
            .await
            .expect("first booking");

        assert!(first.success);
        assert_eq!(first.is_new_user, Some(true));
        assert!(first.message.starts_with("Booking received for Ana! (New user created) Booking ID:"));
        assert!(first.message.ends_with("Room 101 for 4 night(s). Total: $480.00. Status: pending."));

        let error = service
            .create_booking(
                &room(json!({"roomId": 1, "guestName": "Ben", "checkIn": "2026-12-04", "checkOut": "2026-12-06"})),
                today(),
            )
            .await
            .expect_err("overlap");

        let ApplicationError::Domain(domain) = &error else {
            panic!("expected a domain error, got {error:?}");
        };
        assert!(matches!(domain.conflicts(), Some(Conflicts::Rooms(ref rows)) if rows.len() == 1));
        assert_eq!(booking_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn contained_range_is_reported_unavailable() {
        let (service, _pool) = setup().await;
        service
            .create_booking(
                &room(json!({"roomId": 3, "guestName": "Ana", "checkIn": "2026-12-01", "checkOut": "2026-12-10"})),
                today(),
            )
            .await
            .expect("booking");

        let report = service
            .check_availability(
                &room(json!({"roomId": 3, "checkIn": "2026-12-03", "checkOut": "2026-12-05"})),
                today(),
            )
            .await
            .expect("report");

        assert!(!report.available);
        assert!(report.message.contains("is already booked"));
        assert!(matches!(report.conflicts, Some(Conflicts::Rooms(ref rows)) if rows.len() == 1));
    }

    #[tokio::test]
    async fn returning_guest_is_not_new() {
        let (service, _pool) = setup().await;
        for (check_in, check_out) in [("2026-12-01", "2026-12-02"), ("2026-12-10", "2026-12-12")] {
            service
                .create_booking(
                    &room(json!({"roomId": 2, "guestName": "Ana", "checkIn": check_in, "checkOut": check_out})),
                    today(),
                )
                .await
                .expect("booking");
        }

        let third = service
            .create_booking(
                &room(json!({"roomId": 1, "guestName": "Ana", "checkIn": "2027-01-01", "checkOut": "2027-01-02"})),
                today(),
            )
            .await
            .expect("booking");
        assert_eq!(third.is_new_user, Some(false));
    }

    #[tokio::test]
    async fn capacity_is_enforced() {
        let (service, _pool) = setup().await;
        let error = service
            .create_booking(
                &room(json!({"roomId": 1, "guestName": "Ana", "numGuests": 3, "checkIn": "2026-12-01", "checkOut": "2026-12-02"})),
                today(),
            )
            .await
            .expect_err("too many guests");
        assert!(matches!(error, ApplicationError::Domain(DomainError::CapacityExceeded { .. })));
    }

    #[tokio::test]
    async fn spa_slot_can_be_taken_once() {
        let (service, _pool) = setup().await;
        let envelope = ReservationEnvelope {
            kind: "spa".to_string(),
            data: json!({"serviceId": "swedish massage", "guestName": "Ana", "appointmentDate": "2026-12-01", "appointmentTime": "10:00"}),
        };

        let booked = service.create_booking(&envelope, today()).await.expect("appointment");
        assert!(booked.message.starts_with("Spa appointment received for Ana!"));
        assert!(booked.message.ends_with("Status: pending."));
        assert!(booked.appointment.is_some());

        let report = service.check_availability(&envelope, today()).await.expect("report");
        assert!(!report.available);

        let error = service.create_booking(&envelope, today()).await.expect_err("taken");
        assert!(matches!(error, ApplicationError::Domain(DomainError::SlotUnavailable { .. })));
    }

    #[tokio::test]
    async fn status_lists_or_judges_a_range() {
        let (service, _pool) = setup().await;
        service
            .create_booking(
                &room(json!({"roomId": 1, "guestName": "Ana", "checkIn": "2026-12-01", "checkOut": "2026-12-05"})),
                today(),
            )
            .await
            .expect("booking");

        let listing = service
            .room_status(&StatusQuery { room_number: Some("101".to_string()), ..StatusQuery::default() })
            .await
            .expect("listing");
        let RoomStatus::Listing(listing) = listing else {
            panic!("expected a listing");
        };
        assert_eq!(listing.bookings.len(), 1);
        assert_eq!(listing.bookings[0].guest_name, "Ana");

        let boundary = service
            .room_status(&StatusQuery {
                room_id: Some("1".to_string()),
                check_in: Some("2026-12-05".to_string()),
                check_out: Some("2026-12-07".to_string()),
                ..StatusQuery::default()
            })
            .await
            .expect("range");
        let RoomStatus::Range(range) = boundary else {
            panic!("expected a range verdict");
        };
        assert!(!range.is_available, "shared boundary day overlaps");
        assert_eq!(range.overlapping.len(), 1);

        let missing = service.room_status(&StatusQuery::default()).await.expect_err("no room");
        assert_eq!(missing, ApplicationError::Domain(DomainError::MissingField("roomId")));
    }
}
