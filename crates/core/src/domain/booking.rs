use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::room::{RoomId, RoomSummary};
use crate::domain::user::{GuestSummary, UserId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Unknown values are treated as pending so they keep blocking the calendar.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Self::Confirmed,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    pub fn blocks_calendar(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

/// A requested stay. Both bounds are calendar dates and the check-out date is
/// strictly after the check-in date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, DomainError> {
        if check_out <= check_in {
            return Err(DomainError::InvalidStayRange { check_in, check_out });
        }
        Ok(Self { check_in, check_out })
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days().max(0) as u32
    }

    /// Inclusive on both ends: a stay that checks out on the day another
    /// checks in still collides.
    pub fn overlaps(&self, other_check_in: NaiveDate, other_check_out: NaiveDate) -> bool {
        other_check_in <= self.check_out && other_check_out >= self.check_in
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub user_id: UserId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// A booking as returned to callers, with guest and room details attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub guest: GuestSummary,
    pub room: RoomSummary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConflict {
    pub id: BookingId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: ReservationStatus,
}

/// Row shape for the per-room status listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBookingEntry {
    pub id: BookingId,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub status: ReservationStatus,
    pub guest_name: String,
    pub room_number: String,
}

impl RoomBookingEntry {
    pub fn as_conflict(&self) -> BookingConflict {
        BookingConflict {
            id: self.id,
            check_in_date: self.check_in_date,
            check_out_date: self.check_out_date,
            status: self.status,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewBooking {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub stay: StayRange,
    pub number_of_guests: u32,
    pub total_price: Decimal,
    pub status: ReservationStatus,
}
