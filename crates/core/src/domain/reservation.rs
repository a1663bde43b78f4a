//! Wire-level reservation requests and responses shared by the HTTP surface
//! and the chat gateway.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::booking::{BookingConflict, BookingDetails};
use crate::domain::room::{Room, RoomId, RoomRef};
use crate::domain::spa::{
    AppointmentConflict, AppointmentDetails, AppointmentSlot, ServiceRef, SpaService, SpaServiceId,
};
use crate::domain::user::GuestContact;
use crate::errors::DomainError;

/// `{type, data}` exactly as posted to `/bookings` and `/check-availability`,
/// and as emitted by the assistant inside a directive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdOrLabel {
    Id(i64),
    Label(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoomData {
    room_id: Option<IdOrLabel>,
    room_number: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    check_in: Option<String>,
    check_out: Option<String>,
    num_guests: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpaData {
    service_id: Option<IdOrLabel>,
    service_name: Option<String>,
    guest_name: Option<String>,
    guest_email: Option<String>,
    guest_phone: Option<String>,
    appointment_date: Option<String>,
    appointment_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoomRequest {
    pub room: RoomRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub guest: Option<GuestContact>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpaRequest {
    pub service: ServiceRef,
    pub slot: AppointmentSlot,
    pub guest: Option<GuestContact>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReservationRequest {
    Room(RoomRequest),
    Spa(SpaRequest),
}

impl ReservationRequest {
    pub fn from_envelope(envelope: &ReservationEnvelope) -> Result<Self, DomainError> {
        match envelope.kind.trim().to_ascii_lowercase().as_str() {
            "room" => {
                let data: RoomData = decode_data(&envelope.data)?;
                let room = match reference(data.room_id, data.room_number) {
                    Some(IdOrLabel::Id(id)) => RoomRef::Id(RoomId(id)),
                    Some(IdOrLabel::Label(number)) => RoomRef::Number(number),
                    None => return Err(DomainError::MissingField("roomId")),
                };
                let check_in = parse_calendar_date("checkIn", data.check_in.as_deref())?;
                let check_out = parse_calendar_date("checkOut", data.check_out.as_deref())?;
                Ok(Self::Room(RoomRequest {
                    room,
                    check_in,
                    check_out,
                    guests: data.num_guests.unwrap_or(1).max(1),
                    guest: guest_contact(data.guest_name, data.guest_email, data.guest_phone),
                }))
            }
            "spa" => {
                let data: SpaData = decode_data(&envelope.data)?;
                let service = match reference(data.service_id, data.service_name) {
                    Some(IdOrLabel::Id(id)) => ServiceRef::Id(SpaServiceId(id)),
                    Some(IdOrLabel::Label(name)) => ServiceRef::Name(name),
                    None => return Err(DomainError::MissingField("serviceId")),
                };
                let date = parse_calendar_date("appointmentDate", data.appointment_date.as_deref())?;
                let time = parse_slot_time("appointmentTime", data.appointment_time.as_deref())?;
                Ok(Self::Spa(SpaRequest {
                    service,
                    slot: AppointmentSlot { date, time },
                    guest: guest_contact(data.guest_name, data.guest_email, data.guest_phone),
                }))
            }
            other => Err(DomainError::UnsupportedReservationType(other.to_string())),
        }
    }
}

/// A numeric id wins; otherwise the first non-blank label, trimmed.
fn reference(primary: Option<IdOrLabel>, secondary: Option<String>) -> Option<IdOrLabel> {
    fn non_blank(label: String) -> Option<String> {
        let trimmed = label.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    let label = match primary {
        Some(IdOrLabel::Id(id)) => return Some(IdOrLabel::Id(id)),
        Some(IdOrLabel::Label(label)) => non_blank(label),
        None => None,
    };
    label.or_else(|| secondary.and_then(non_blank)).map(IdOrLabel::Label)
}

fn decode_data<T>(data: &Value) -> Result<T, DomainError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data.clone())
        .map_err(|error| DomainError::MalformedRequest(error.to_string()))
}

fn guest_contact(
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
) -> Option<GuestContact> {
    let name = name.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())?;
    let clean = |value: Option<String>| {
        value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    };
    Some(GuestContact { name, email: clean(email), phone: clean(phone) })
}

/// Accepts `YYYY-MM-DD` or a timestamp, keeping only the calendar date.
pub fn parse_calendar_date(field: &'static str, raw: Option<&str>) -> Result<NaiveDate, DomainError> {
    let value = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(value) = value else {
        return Err(DomainError::MissingField(field));
    };

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok().map(|dt| dt.date())
        })
        .ok_or_else(|| DomainError::InvalidDate { field, value: value.to_string() })
}

/// Accepts 24-hour `HH:MM`/`HH:MM:SS` and 12-hour `H:MM AM` forms.
pub fn parse_slot_time(field: &'static str, raw: Option<&str>) -> Result<NaiveTime, DomainError> {
    let value = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(value) = value else {
        return Err(DomainError::MissingField(field));
    };

    let upper = value.to_ascii_uppercase();
    ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(&upper, format).ok())
        .ok_or_else(|| DomainError::InvalidDate { field, value: value.to_string() })
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conflicts {
    Rooms(Vec<BookingConflict>),
    Spa(Vec<AppointmentConflict>),
}

impl Conflicts {
    pub fn len(&self) -> usize {
        match self {
            Self::Rooms(items) => items.len(),
            Self::Spa(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Body of `/check-availability`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub available: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Conflicts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<SpaService>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nights: Option<u32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub total_price: Option<Decimal>,
}

impl AvailabilityReport {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            available: false,
            message: message.into(),
            conflicts: None,
            room: None,
            service: None,
            nights: None,
            total_price: None,
        }
    }
}

/// Body of `/bookings`, for both successful and refused requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booking: Option<BookingDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment: Option<AppointmentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Conflicts>,
}

impl BookingResponse {
    pub fn failure(message: impl Into<String>, conflicts: Option<Conflicts>) -> Self {
        Self {
            success: false,
            message: message.into(),
            booking: None,
            appointment: None,
            is_new_user: None,
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    use super::{parse_calendar_date, parse_slot_time, ReservationEnvelope, ReservationRequest};
    use crate::domain::room::{RoomId, RoomRef};
    use crate::domain::spa::ServiceRef;
    use crate::errors::DomainError;

    fn envelope(value: serde_json::Value) -> ReservationEnvelope {
        serde_json::from_value(value).expect("envelope should decode")
    }

    #[test]
    fn numeric_room_id_is_a_database_id() {
        let request = ReservationRequest::from_envelope(&envelope(json!({
            "type": "room",
            "data": {"roomId": 3, "checkIn": "2026-12-01", "checkOut": "2026-12-04", "guestName": "Ana"}
        })))
        .expect("request");

        let ReservationRequest::Room(room) = request else {
            panic!("expected a room request");
        };
        assert_eq!(room.room, RoomRef::Id(RoomId(3)));
        assert_eq!(room.guests, 1);
        assert_eq!(room.guest.map(|guest| guest.name), Some("Ana".to_string()));
    }

    #[test]
    fn string_room_id_is_a_room_number() {
        let request = ReservationRequest::from_envelope(&envelope(json!({
            "type": "room",
            "data": {"roomId": "204", "checkIn": "2026-12-01", "checkOut": "2026-12-04"}
        })))
        .expect("request");

        assert!(matches!(
            request,
            ReservationRequest::Room(ref room) if room.room == RoomRef::Number("204".to_string())
        ));
    }

    #[test]
    fn spa_service_can_be_named() {
        let request = ReservationRequest::from_envelope(&envelope(json!({
            "type": "spa",
            "data": {"serviceId": "Hot Stone Massage", "appointmentDate": "2026-12-01", "appointmentTime": "2:30 PM"}
        })))
        .expect("request");

        let ReservationRequest::Spa(spa) = request else {
            panic!("expected a spa request");
        };
        assert_eq!(spa.service, ServiceRef::Name("Hot Stone Massage".to_string()));
        assert_eq!(spa.slot.time, NaiveTime::from_hms_opt(14, 30, 0).expect("time"));
    }

    #[test]
    fn blank_room_id_defers_to_room_number() {
        let request = ReservationRequest::from_envelope(&envelope(json!({
            "type": "room",
            "data": {"roomId": "", "roomNumber": " 101 ", "checkIn": "2026-12-01", "checkOut": "2026-12-04"}
        })))
        .expect("request");

        let ReservationRequest::Room(room) = request else {
            panic!("expected a room request");
        };
        assert_eq!(room.room, RoomRef::Number("101".to_string()));
    }

    #[test]
    fn blank_service_id_defers_to_service_name() {
        let request = ReservationRequest::from_envelope(&envelope(json!({
            "type": "spa",
            "data": {
                "serviceId": "  ",
                "serviceName": "Aromatherapy",
                "appointmentDate": "2026-12-01",
                "appointmentTime": "10:00"
            }
        })))
        .expect("request");

        let ReservationRequest::Spa(spa) = request else {
            panic!("expected a spa request");
        };
        assert_eq!(spa.service, ServiceRef::Name("Aromatherapy".to_string()));
    }

    #[test]
    fn blank_room_reference_is_missing() {
        let error = ReservationRequest::from_envelope(&envelope(json!({
            "type": "room",
            "data": {"roomId": " ", "roomNumber": "", "checkIn": "2026-12-01", "checkOut": "2026-12-04"}
        })))
        .expect_err("no usable room reference");
        assert_eq!(error, DomainError::MissingField("roomId"));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let error = ReservationRequest::from_envelope(&envelope(json!({"type": "golf", "data": {}})))
            .expect_err("golf is not bookable");
        assert_eq!(error, DomainError::UnsupportedReservationType("golf".to_string()));
    }

    #[test]
    fn missing_dates_are_reported_by_field() {
        let error = ReservationRequest::from_envelope(&envelope(json!({
            "type": "room",
            "data": {"roomId": 1, "checkIn": "2026-12-01"}
        })))
        .expect_err("checkOut is required");
        assert_eq!(error, DomainError::MissingField("checkOut"));
    }

    #[test]
    fn timestamps_collapse_to_calendar_dates() {
        let parsed = parse_calendar_date("checkIn", Some("2026-07-04T15:00:00Z")).expect("date");
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2026, 7, 4).expect("date"));

        let error = parse_calendar_date("checkIn", Some("next friday")).expect_err("not a date");
        assert!(matches!(error, DomainError::InvalidDate { field: "checkIn", .. }));
    }

    #[test]
    fn slot_times_accept_seconds() {
        let parsed = parse_slot_time("appointmentTime", Some("09:15:00")).expect("time");
        assert_eq!(parsed, NaiveTime::from_hms_opt(9, 15, 0).expect("time"));
    }
}
