use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::booking::ReservationStatus;
use crate::domain::user::{GuestSummary, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaServiceId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaService {
    pub id: SpaServiceId,
    pub service_name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: u32,
    pub is_available: bool,
}

/// How a caller refers to a spa service: database id, or a service name
/// matched case-insensitively.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServiceRef {
    Id(SpaServiceId),
    Name(String),
}

impl std::fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id.0),
            Self::Name(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentSlot {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl AppointmentSlot {
    pub fn time_label(&self) -> String {
        self.time.format("%H:%M").to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaAppointment {
    pub id: AppointmentId,
    pub service_id: SpaServiceId,
    pub user_id: UserId,
    pub appointment_date: NaiveDate,
    pub appointment_time: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub service_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub duration_minutes: u32,
}

impl From<&SpaService> for ServiceSummary {
    fn from(service: &SpaService) -> Self {
        Self {
            service_name: service.service_name.clone(),
            price: service.price,
            duration_minutes: service.duration_minutes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: SpaAppointment,
    pub guest: GuestSummary,
    pub service: ServiceSummary,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentConflict {
    pub id: AppointmentId,
    pub appointment_time: String,
    pub status: ReservationStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewAppointment {
    pub service_id: SpaServiceId,
    pub user_id: UserId,
    pub slot: AppointmentSlot,
    pub status: ReservationStatus,
}
