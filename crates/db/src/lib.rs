pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, ping, DbPool};
pub use fixtures::{ResortSeedDataset, SeedResult, VerificationResult};
pub use repositories::{
    ActivityRepository, BookingRepository, RepositoryError, RoomRepository, SpaRepository,
    SqlActivityRepository, SqlBookingRepository, SqlRoomRepository, SqlSpaRepository,
    SqlUserRepository, UserRepository,
};
