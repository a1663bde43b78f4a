use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::booking::BookingConflict;
use crate::domain::reservation::Conflicts;
use crate::domain::spa::AppointmentConflict;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateField {
    CheckIn,
    CheckOut,
    Appointment,
}

impl DateField {
    pub fn label(&self) -> &'static str {
        match self {
            Self::CheckIn => "Check-in date",
            Self::CheckOut => "Check-out date",
            Self::Appointment => "Appointment date",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("Room not found")]
    RoomNotFound(String),
    #[error("Service not found")]
    ServiceNotFound(String),
    #[error("❌ Cannot use past dates. {} must be today or in the future.", .field.label())]
    PastDate { field: DateField },
    #[error("`{field}` is not a valid date or time: `{value}`")]
    InvalidDate { field: &'static str, value: String },
    #[error("Check-out date ({check_out}) must be after check-in date ({check_in}).")]
    InvalidStayRange { check_in: NaiveDate, check_out: NaiveDate },
    #[error("Room {room_number} accommodates at most {capacity} guest(s); {requested} requested.")]
    CapacityExceeded { room_number: String, capacity: u32, requested: u32 },
    #[error("Room {room_number} ({room_type}) is already booked for the dates {check_in} to {check_out}.")]
    RoomUnavailable {
        room_number: String,
        room_type: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        conflicts: Vec<BookingConflict>,
    },
    #[error("{service_name} is not available at {time} on {date}.")]
    SlotUnavailable {
        service_name: String,
        date: NaiveDate,
        time: String,
        conflicts: Vec<AppointmentConflict>,
    },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("malformed reservation data: {0}")]
    MalformedRequest(String),
    #[error("Invalid booking type")]
    UnsupportedReservationType(String),
}

impl DomainError {
    pub fn conflicts(&self) -> Option<Conflicts> {
        match self {
            Self::RoomUnavailable { conflicts, .. } => Some(Conflicts::Rooms(conflicts.clone())),
            Self::SlotUnavailable { conflicts, .. } => Some(Conflicts::Spa(conflicts.clone())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } => 500,
        }
    }

    /// Domain failures are explained verbatim; everything else is masked.
    pub fn user_message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. } => message,
            Self::Internal { .. } => "Something went wrong",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::NotFound { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(
                error @ (DomainError::RoomNotFound(_) | DomainError::ServiceNotFound(_)),
            ) => Self::NotFound { message: error.to_string(), correlation_id },
            ApplicationError::Domain(
                error @ (DomainError::RoomUnavailable { .. } | DomainError::SlotUnavailable { .. }),
            ) => Self::Conflict { message: error.to_string(), correlation_id },
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::Persistence(message)
            | ApplicationError::Integration(message)
            | ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::errors::{ApplicationError, DateField, DomainError, InterfaceError};

    #[test]
    fn past_dates_map_to_bad_request() {
        let interface = ApplicationError::from(DomainError::PastDate { field: DateField::CheckIn })
            .into_interface("req-1");

        assert_eq!(interface.status_code(), 400);
        assert_eq!(interface.correlation_id(), "req-1");
        assert!(interface.user_message().contains("Check-in date must be today or in the future"));
    }

    #[test]
    fn missing_room_maps_to_not_found() {
        let interface = ApplicationError::from(DomainError::RoomNotFound("999".to_owned()))
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::NotFound { .. }));
        assert_eq!(interface.user_message(), "Room not found");
    }

    #[test]
    fn unavailable_room_maps_to_conflict_and_keeps_conflicts() {
        let date = |raw: &str| NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("date");
        let error = DomainError::RoomUnavailable {
            room_number: "101".to_owned(),
            room_type: "Deluxe".to_owned(),
            check_in: date("2026-04-01"),
            check_out: date("2026-04-03"),
            conflicts: Vec::new(),
        };
        assert!(error.conflicts().is_some());

        let interface = ApplicationError::from(error).into_interface("req-3");
        assert_eq!(interface.status_code(), 409);
        assert_eq!(
            interface.user_message(),
            "Room 101 (Deluxe) is already booked for the dates 2026-04-01 to 2026-04-03."
        );
    }

    #[test]
    fn persistence_failures_are_masked() {
        let interface = ApplicationError::Persistence("database is locked".to_owned())
            .into_interface("req-4");

        assert_eq!(interface.status_code(), 500);
        assert_eq!(interface.user_message(), "Something went wrong");
    }
}
