use std::sync::Arc;

use chrono::NaiveDate;
use concierge_core::domain::reservation::ReservationEnvelope;
use concierge_core::errors::{ApplicationError, DomainError};
use concierge_db::{connect_with_settings, migrations, ResortSeedDataset};
use concierge_server::ReservationService;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Barrier;

const GUESTS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_bookings_for_one_room_admit_exactly_one() {
    let dir = TempDir::new().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("resort.db").display());
    let pool = connect_with_settings(&url, 8, 30).await.expect("file pool");
    migrations::run_pending(&pool).await.expect("migrations");
    ResortSeedDataset::load(&pool).await.expect("seed");

    let service = Arc::new(ReservationService::from_pool(&pool));
    let start = Arc::new(Barrier::new(GUESTS));
    let today = NaiveDate::from_ymd_opt(2026, 10, 17).expect("date");

    let tasks: Vec<_> = (0..GUESTS)
        .map(|guest| {
            let service = Arc::clone(&service);
            let start = Arc::clone(&start);
            tokio::spawn(async move {
                let envelope = ReservationEnvelope {
                    kind: "room".to_string(),
                    data: json!({
                        "roomId": 1,
                        "guestName": format!("Guest {guest}"),
                        "checkIn": "2026-12-01",
                        "checkOut": "2026-12-05"
                    }),
                };
                start.wait().await;
                service.create_booking(&envelope, today).await
            })
        })
        .collect();

    let mut booked = 0;
    let mut refused = 0;
    for task in tasks {
        match task.await.expect("task should not panic") {
            Ok(response) => {
                assert!(response.success);
                booked += 1;
            }
            Err(ApplicationError::Domain(DomainError::RoomUnavailable { .. })) => refused += 1,
            Err(other) => panic!("unexpected booking error: {other:?}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(refused, GUESTS - 1);
    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE room_id = 1")
        .fetch_one(&pool)
        .await
        .expect("count");
    assert_eq!(rows, 1);

    pool.close().await;
}
