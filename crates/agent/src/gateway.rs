use std::time::Duration;

use async_trait::async_trait;
use concierge_core::domain::reservation::{AvailabilityReport, BookingResponse, ReservationEnvelope};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("reservation service unreachable: {0}")]
    Transport(String),
    #[error("reservation service returned an unreadable response: {0}")]
    Decode(String),
    #[error("reservation service failed: {0}")]
    Service(String),
}

/// Where chat-initiated availability checks and bookings are executed.
///
/// Refusals the guest should hear about (past dates, unknown rooms, conflicts)
/// come back as `Ok` reports with `available`/`success` set to false.
#[async_trait]
pub trait ReservationGateway: Send + Sync {
    async fn check_availability(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<AvailabilityReport, GatewayError>;

    async fn create_booking(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<BookingResponse, GatewayError>;
}

/// Calls `/check-availability` and `/bookings` on a running concierge server.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| GatewayError::Transport(error.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        request: &ReservationEnvelope,
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|error| GatewayError::Transport(error.to_string()))?;

        // Domain refusals arrive with 4xx statuses but a well-formed body.
        match serde_json::from_slice::<T>(&body) {
            Ok(decoded) => Ok(decoded),
            Err(_) if status.is_server_error() => {
                Err(GatewayError::Service(format!("{path} returned {status}")))
            }
            Err(error) => Err(GatewayError::Decode(format!("{path} ({status}): {error}"))),
        }
    }
}

#[async_trait]
impl ReservationGateway for HttpGateway {
    async fn check_availability(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<AvailabilityReport, GatewayError> {
        self.post("/check-availability", request).await
    }

    async fn create_booking(
        &self,
        request: &ReservationEnvelope,
    ) -> Result<BookingResponse, GatewayError> {
        self.post("/bookings", request).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use concierge_core::domain::reservation::ReservationEnvelope;
    use serde_json::{json, Value};

    use super::{GatewayError, HttpGateway, ReservationGateway};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let address = listener.local_addr().expect("address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{address}")
    }

    fn room_envelope() -> ReservationEnvelope {
        ReservationEnvelope {
            kind: "room".to_string(),
            data: json!({"roomId": 1, "checkIn": "2099-01-01", "checkOut": "2099-01-03"}),
        }
    }

    #[tokio::test]
    async fn refusals_are_decoded_from_client_error_bodies() {
        let router = Router::new().route(
            "/check-availability",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["type"], json!("room"));
                (StatusCode::NOT_FOUND, Json(json!({"available": false, "message": "Room not found"})))
            }),
        );
        let gateway = HttpGateway::new(&spawn(router).await, Duration::from_secs(5)).expect("gateway");

        let report = gateway.check_availability(&room_envelope()).await.expect("report");
        assert!(!report.available);
        assert_eq!(report.message, "Room not found");
    }

    #[tokio::test]
    async fn successful_booking_is_decoded() {
        let router = Router::new().route(
            "/bookings",
            post(|| async {
                Json(json!({"success": true, "message": "Booking received for Ana!", "isNewUser": true}))
            }),
        );
        let gateway = HttpGateway::new(&spawn(router).await, Duration::from_secs(5)).expect("gateway");

        let response = gateway.create_booking(&room_envelope()).await.expect("response");
        assert!(response.success);
        assert_eq!(response.is_new_user, Some(true));
    }

    #[tokio::test]
    async fn opaque_server_errors_are_service_failures() {
        let router = Router::new().route(
            "/bookings",
            post(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let gateway = HttpGateway::new(&spawn(router).await, Duration::from_secs(5)).expect("gateway");

        let error = gateway.create_booking(&room_envelope()).await.expect_err("should fail");
        assert!(matches!(error, GatewayError::Service(_)));
    }
}
