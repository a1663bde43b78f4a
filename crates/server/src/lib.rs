//! HTTP surface of the resort concierge: reservation endpoints, the chat
//! endpoint and a readiness probe, wired over a SQLite pool.

pub mod api;
pub mod bootstrap;
pub mod gateway;
pub mod health;
pub mod reservations;

pub use api::{router, ApiState};
pub use bootstrap::{bootstrap, bootstrap_with_config, Application, BootstrapError};
pub use reservations::ReservationService;
