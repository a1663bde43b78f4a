use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Room numbers created by the demo seed, with their nightly rate as stored.
const SEED_ROOMS: &[(&str, &str)] = &[
    ("101", "120.00"),
    ("102", "120.00"),
    ("201", "250.00"),
    ("202", "265.00"),
    ("301", "380.00"),
    ("401", "750.00"),
];

const SEED_SPA_SERVICES: &[&str] =
    &["Swedish Massage", "Hot Stone Massage", "Aromatherapy Facial", "Couples Retreat"];

const SEED_ACTIVITIES: &[&str] =
    &["Sunrise Yoga", "Kayak Rental", "Snorkeling Tour", "Sunset Catamaran Cruise"];

/// Demo resort catalogue: rooms, spa services and activities.
///
/// Loading is idempotent; existing rows with the same room number or name are
/// left untouched.
pub struct ResortSeedDataset;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub rooms: usize,
    pub spa_services: usize,
    pub activities: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}

impl ResortSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/resort_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        tracing::info!(
            event_name = "db.seed.loaded",
            rooms = SEED_ROOMS.len(),
            spa_services = SEED_SPA_SERVICES.len(),
            activities = SEED_ACTIVITIES.len(),
            "demo catalogue applied"
        );

        Ok(SeedResult {
            rooms: SEED_ROOMS.len(),
            spa_services: SEED_SPA_SERVICES.len(),
            activities: SEED_ACTIVITIES.len(),
        })
    }

    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        for (room_number, price) in SEED_ROOMS {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM rooms WHERE room_number = ?1 AND price_per_night = ?2)",
            )
            .bind(room_number)
            .bind(price)
            .fetch_one(pool)
            .await?;
            checks.push((format!("room-{room_number}"), exists == 1));
        }

        for name in SEED_SPA_SERVICES {
            let exists: i64 =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM spa_services WHERE service_name = ?)")
                    .bind(name)
                    .fetch_one(pool)
                    .await?;
            checks.push((format!("spa-{}", slug(name)), exists == 1));
        }

        for name in SEED_ACTIVITIES {
            let exists: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM activities WHERE activity_name = ?)",
            )
            .bind(name)
            .fetch_one(pool)
            .await?;
            checks.push((format!("activity-{}", slug(name)), exists == 1));
        }

        let all_present = checks.iter().all(|(_, exists)| *exists);
        Ok(VerificationResult { all_present, checks })
    }

    /// Removes the seeded catalogue along with any reservations that point at it.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let rooms = sql_array(SEED_ROOMS.iter().map(|(number, _)| *number));
        let services = sql_array(SEED_SPA_SERVICES.iter().copied());
        let activities = sql_array(SEED_ACTIVITIES.iter().copied());

        sqlx::query(&format!(
            "DELETE FROM bookings WHERE room_id IN (SELECT id FROM rooms WHERE room_number IN {rooms})"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM rooms WHERE room_number IN {rooms}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM spa_appointments WHERE service_id IN (SELECT id FROM spa_services WHERE service_name IN {services})"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM spa_services WHERE service_name IN {services}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM activities WHERE activity_name IN {activities}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase().replace(' ', "-")
}

fn sql_array<'a>(values: impl Iterator<Item = &'a str>) -> String {
    let quoted =
        values.map(|value| format!("'{}'", value.replace('\'', "''"))).collect::<Vec<_>>().join(", ");
    format!("({quoted})")
}
