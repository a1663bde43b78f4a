//! JSON API routes.
//!
//! - `POST /bookings`            create a room booking or spa appointment
//! - `GET  /bookings/status`     list a room's bookings or judge a date range
//! - `POST /check-availability`  availability and pricing without writing
//! - `POST /chat`                concierge conversation turn
//! - `GET  /health`              readiness probe

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use concierge_agent::runtime::{ChatReply, ChatRequest, ConciergeRuntime, EMPTY_MESSAGE_REPLY};
use concierge_core::domain::reservation::{AvailabilityReport, BookingResponse, ReservationEnvelope};
use concierge_core::errors::{ApplicationError, InterfaceError};
use concierge_db::DbPool;

use crate::health;
use crate::reservations::{local_today, ReservationService, RoomStatus, StatusQuery};

#[derive(Clone)]
pub struct ApiState {
    pub reservations: Arc<ReservationService>,
    pub concierge: Arc<ConciergeRuntime>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

pub fn router(state: ApiState, db_pool: DbPool) -> Router {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/status", get(booking_status))
        .route("/check-availability", post(check_availability))
        .route("/chat", post(chat))
        .with_state(state)
        .merge(health::router(db_pool))
        .layer(TraceLayer::new_for_http())
}

async fn create_booking(
    State(state): State<ApiState>,
    payload: Result<Json<ReservationEnvelope>, JsonRejection>,
) -> (StatusCode, Json<BookingResponse>) {
    let correlation_id = correlation_id();
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(BookingResponse::failure(rejection.body_text(), None)),
            );
        }
    };

    match state.reservations.create_booking(&envelope, local_today()).await {
        Ok(response) => {
            info!(
                event_name = "api.bookings.created",
                correlation_id = %correlation_id,
                reservation_type = %envelope.kind,
                "reservation created"
            );
            (StatusCode::OK, Json(response))
        }
        Err(failure) => {
            let conflicts = match &failure {
                ApplicationError::Domain(domain) => domain.conflicts(),
                _ => None,
            };
            let interface = failure.into_interface(correlation_id);
            log_failure("api.bookings.failed", &interface);
            (
                status_of(&interface),
                Json(BookingResponse::failure(interface.user_message(), conflicts)),
            )
        }
    }
}

async fn check_availability(
    State(state): State<ApiState>,
    payload: Result<Json<ReservationEnvelope>, JsonRejection>,
) -> (StatusCode, Json<AvailabilityReport>) {
    let correlation_id = correlation_id();
    let envelope = match payload {
        Ok(Json(envelope)) => envelope,
        Err(rejection) => {
            return (StatusCode::BAD_REQUEST, Json(AvailabilityReport::rejected(rejection.body_text())));
        }
    };

    match state.reservations.check_availability(&envelope, local_today()).await {
        Ok(report) => (StatusCode::OK, Json(report)),
        Err(failure) => {
            let interface = failure.into_interface(correlation_id);
            log_failure("api.availability.failed", &interface);
            let message = match &interface {
                InterfaceError::Internal { .. } => "Error checking availability",
                other => other.user_message(),
            };
            (status_of(&interface), Json(AvailabilityReport::rejected(message)))
        }
    }
}

async fn booking_status(
    State(state): State<ApiState>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<RoomStatus>, (StatusCode, Json<ApiError>)> {
    let correlation_id = correlation_id();
    state.reservations.room_status(&query).await.map(Json).map_err(|failure| {
        let interface = failure.into_interface(correlation_id);
        log_failure("api.status.failed", &interface);
        (status_of(&interface), Json(ApiError { error: interface.user_message().to_string() }))
    })
}

async fn chat(
    State(state): State<ApiState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatReply>) {
    let correlation_id = correlation_id();
    let Ok(Json(request)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatReply { reply: EMPTY_MESSAGE_REPLY.to_string(), booking_data: None }),
        );
    };

    match state.concierge.handle_message(&request, local_today(), &correlation_id).await {
        Ok(reply) => {
            info!(
                event_name = "api.chat.replied",
                correlation_id = %correlation_id,
                booked = reply.booking_data.is_some(),
                "chat reply sent"
            );
            (StatusCode::OK, Json(reply))
        }
        Err(failure) => {
            let status = if failure.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(ChatReply { reply: failure.reply().to_string(), booking_data: None }))
        }
    }
}

fn correlation_id() -> String {
    Uuid::new_v4().to_string()
}

fn status_of(error: &InterfaceError) -> StatusCode {
    StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn log_failure(event_name: &'static str, failure: &InterfaceError) {
    match failure {
        InterfaceError::Internal { .. } => error!(
            event_name,
            correlation_id = %failure.correlation_id(),
            error = %failure,
            "request failed"
        ),
        _ => info!(
            event_name,
            correlation_id = %failure.correlation_id(),
            status = failure.status_code(),
            reason = %failure,
            "request refused"
        ),
    }
}
