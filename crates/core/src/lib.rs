pub mod availability;
pub mod config;
pub mod domain;
pub mod errors;

pub use availability::{blocking_entries, ensure_not_past, quote_stay, StayQuote};
pub use domain::activity::{Activity, ActivityId};
pub use domain::booking::{
    Booking, BookingConflict, BookingDetails, BookingId, NewBooking, ReservationStatus,
    RoomBookingEntry, StayRange,
};
pub use domain::reservation::{
    AvailabilityReport, BookingResponse, Conflicts, ReservationEnvelope, ReservationRequest,
    RoomRequest, SpaRequest,
};
pub use domain::room::{Room, RoomId, RoomRef, RoomSummary};
pub use domain::spa::{
    AppointmentConflict, AppointmentDetails, AppointmentId, AppointmentSlot, NewAppointment,
    ServiceRef, ServiceSummary, SpaAppointment, SpaService, SpaServiceId,
};
pub use domain::user::{GuestContact, GuestSummary, User, UserId};
pub use errors::{ApplicationError, DateField, DomainError, InterfaceError};
