//! Stay arithmetic and date rules shared by availability checks and booking
//! creation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::{RoomBookingEntry, StayRange};
use crate::errors::{DateField, DomainError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StayQuote {
    pub nights: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
}

pub fn quote_stay(price_per_night: Decimal, stay: &StayRange) -> StayQuote {
    let nights = stay.nights();
    StayQuote { nights, total_price: price_per_night * Decimal::from(nights) }
}

/// Dates earlier than `today` are rejected; `today` itself is bookable.
pub fn ensure_not_past(field: DateField, date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
    if date < today {
        return Err(DomainError::PastDate { field });
    }
    Ok(())
}

/// Filters a room's bookings down to those that block `stay`.
pub fn blocking_entries<'a>(
    entries: &'a [RoomBookingEntry],
    stay: &StayRange,
) -> Vec<&'a RoomBookingEntry> {
    entries
        .iter()
        .filter(|entry| entry.status.blocks_calendar())
        .filter(|entry| stay.overlaps(entry.check_in_date, entry.check_out_date))
        .collect()
}
