//! Readiness probe. The service is ready when the database answers and every
//! embedded migration has been applied.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use concierge_db::{migrations, ping, DbPool};
use serde::Serialize;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Degraded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub name: &'static str,
    pub status: Readiness,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: Readiness,
    pub components: Vec<ComponentStatus>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    fn from_components(components: Vec<ComponentStatus>) -> Self {
        let status = if components.iter().all(|component| component.status == Readiness::Ready) {
            Readiness::Ready
        } else {
            Readiness::Degraded
        };
        Self { status, components, checked_at: Utc::now() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.status {
            Readiness::Ready => StatusCode::OK,
            Readiness::Degraded => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/health", get(health)).with_state(db_pool)
}

pub async fn health(State(pool): State<DbPool>) -> (StatusCode, Json<HealthReport>) {
    let report = HealthReport::from_components(probe(&pool).await);
    if report.status == Readiness::Degraded {
        warn!(
            event_name = "system.health.degraded",
            correlation_id = "health",
            components = ?report.components,
            "readiness probe degraded"
        );
    }
    (report.status_code(), Json(report))
}

async fn probe(pool: &DbPool) -> Vec<ComponentStatus> {
    if let Err(error) = ping(pool).await {
        return vec![
            ComponentStatus {
                name: "database",
                status: Readiness::Degraded,
                detail: format!("database query failed: {error}"),
            },
            ComponentStatus {
                name: "schema",
                status: Readiness::Degraded,
                detail: "not checked: database unreachable".to_string(),
            },
        ];
    }

    let database = ComponentStatus {
        name: "database",
        status: Readiness::Ready,
        detail: "database query succeeded".to_string(),
    };

    let known = migrations::known_migrations();
    let schema = match migrations::applied_count(pool).await {
        Ok(applied) if applied >= known => ComponentStatus {
            name: "schema",
            status: Readiness::Ready,
            detail: format!("{applied} of {known} migration(s) applied"),
        },
        Ok(applied) => ComponentStatus {
            name: "schema",
            status: Readiness::Degraded,
            detail: format!("{applied} of {known} migration(s) applied"),
        },
        Err(error) => ComponentStatus {
            name: "schema",
            status: Readiness::Degraded,
            detail: format!("migration state unavailable: {error}"),
        },
    };

    vec![database, schema]
}

#[cfg(test)]
mod tests {
    use axum::{extract::State, http::StatusCode, Json};
    use concierge_db::{connect_with_settings, migrations};

    use super::{health, Readiness};

    #[tokio::test]
    async fn ready_once_migrations_are_applied() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrate");

        let (status, Json(report)) = health(State(pool.clone())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, Readiness::Ready);
        assert!(report.components.iter().all(|component| component.status == Readiness::Ready));

        pool.close().await;
    }

    #[tokio::test]
    async fn degraded_before_migrations_run() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");

        let (status, Json(report)) = health(State(pool.clone())).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let schema = report.components.iter().find(|component| component.name == "schema");
        assert_eq!(schema.map(|component| component.status), Some(Readiness::Degraded));
        let database = report.components.iter().find(|component| component.name == "database");
        assert_eq!(database.map(|component| component.status), Some(Readiness::Ready));

        pool.close().await;
    }

    #[tokio::test]
    async fn degraded_when_pool_is_closed() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        pool.close().await;

        let (status, Json(report)) = health(State(pool)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, Readiness::Degraded);
    }
}
