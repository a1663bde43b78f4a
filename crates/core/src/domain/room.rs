use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub i64);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub room_number: String,
    pub room_type: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price_per_night: Decimal,
    pub capacity: u32,
    pub is_available: bool,
    pub amenities: Vec<String>,
}

/// How a caller refers to a room. The database id is canonical; a room number
/// is resolved through the datastore at the boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomRef {
    Id(RoomId),
    Number(String),
}

impl std::fmt::Display for RoomRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "#{}", id.0),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// The room fields embedded in booking responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_number: String,
    pub room_type: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self { room_number: room.room_number.clone(), room_type: room.room_type.clone() }
    }
}
