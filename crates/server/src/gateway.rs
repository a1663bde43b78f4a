use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use concierge_agent::gateway::{GatewayError, ReservationGateway};
use concierge_agent::runtime::CatalogSource;
use concierge_core::domain::activity::Activity;
use concierge_core::domain::reservation::{AvailabilityReport, BookingResponse, ReservationEnvelope};
use concierge_core::domain::room::Room;
use concierge_core::domain::spa::SpaService;
use concierge_core::errors::ApplicationError;
use concierge_db::{
    ActivityRepository, DbPool, RoomRepository, SpaRepository, SqlActivityRepository,
    SqlRoomRepository, SqlSpaRepository,
};

use crate::reservations::{local_today, ReservationService};

/// Runs chat directives against the reservation service in this process.
pub struct InProcessGateway {
    reservations: Arc<ReservationService>,
}

impl InProcessGateway {
    pub fn new(reservations: Arc<ReservationService>) -> Self {
        Self { reservations }
    }
}

#[async_trait]
impl ReservationGateway for InProcessGateway {
    async fn check_availability(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<AvailabilityReport, GatewayError> {
        match self.reservations.check_availability(request, local_today()).await {
            Ok(report) => Ok(report),
            Err(ApplicationError::Domain(error)) => Ok(AvailabilityReport {
                conflicts: error.conflicts(),
                ..AvailabilityReport::rejected(error.to_string())
            }),
            Err(error) => Err(GatewayError::Service(error.to_string())),
        }
    }

    async fn create_booking(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<BookingResponse, GatewayError> {
        match self.reservations.create_booking(request, local_today()).await {
            Ok(response) => Ok(response),
            Err(ApplicationError::Domain(error)) => {
                Ok(BookingResponse::failure(error.to_string(), error.conflicts()))
            }
            Err(error) => Err(GatewayError::Service(error.to_string())),
        }
    }
}

/// Catalogue snapshot for prompts, read straight from the database.
pub struct DbCatalog {
    rooms: Arc<dyn RoomRepository>,
    spa: Arc<dyn SpaRepository>,
    activities: Arc<dyn ActivityRepository>,
}

impl DbCatalog {
    pub fn from_pool(pool: &DbPool) -> Self {
        Self {
            rooms: Arc::new(SqlRoomRepository::new(pool.clone())),
            spa: Arc::new(SqlSpaRepository::new(pool.clone())),
            activities: Arc::new(SqlActivityRepository::new(pool.clone())),
        }
    }
}

#[async_trait]
impl CatalogSource for DbCatalog {
    async fn available_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.rooms.list_available().await?)
    }

    async fn available_spa_services(&self) -> Result<Vec<SpaService>> {
        Ok(self.spa.list_available_services().await?)
    }

    async fn available_activities(&self) -> Result<Vec<Activity>> {
        Ok(self.activities.list_available().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use concierge_agent::gateway::ReservationGateway;
    use concierge_agent::runtime::CatalogSource;
    use concierge_core::domain::reservation::ReservationEnvelope;
    use concierge_db::{connect_with_settings, migrations, ResortSeedDataset};
    use serde_json::json;

    use super::{DbCatalog, InProcessGateway};
    use crate::reservations::ReservationService;

    #[tokio::test]
    async fn refusals_come_back_as_reports() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let gateway = InProcessGateway::new(Arc::new(ReservationService::from_pool(&pool)));

        let report = gateway
            .check_availability(&ReservationEnvelope {
                kind: "room".to_string(),
                data: json!({"roomId": 42, "checkIn": "2099-01-01", "checkOut": "2099-01-02"}),
            })
            .await
            .expect("report");
        assert!(!report.available);
        assert_eq!(report.message, "Room not found");

        let response = gateway
            .create_booking(&ReservationEnvelope { kind: "golf".to_string(), data: json!({}) })
            .await
            .expect("response");
        assert!(!response.success);
        assert_eq!(response.message, "Invalid booking type");
    }

    #[tokio::test]
    async fn catalog_lists_cheapest_rooms_first() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        ResortSeedDataset::load(&pool).await.expect("seed");

        let catalog = DbCatalog::from_pool(&pool);
        let rooms = catalog.available_rooms().await.expect("rooms");
        assert_eq!(rooms.first().map(|room| room.room_number.as_str()), Some("101"));
        assert_eq!(catalog.available_spa_services().await.expect("spa").len(), 4);
        assert_eq!(catalog.available_activities().await.expect("activities").len(), 4);
    }
}
