pub mod activity;
pub mod booking;
pub mod reservation;
pub mod room;
pub mod spa;
pub mod user;
