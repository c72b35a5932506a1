// src/handlers/rooms.rs
//
// Ocupação dos quartos: sempre recomputada do estado das reservas no momento
// da consulta. Não existe cache ambiente a invalidar.

use axum::{Json, extract::State, response::IntoResponse};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        catalog::RoomOccupancy,
        events::{EventKind, NotificationEvent},
    },
    services::reservation_service::RoomStatus,
};

// GET /api/rooms
#[utoipa::path(
    get,
    path = "/api/rooms",
    tag = "Rooms",
    responses(
        (status = 200, description = "Ocupação de todos os quartos ativos", body = [RoomOccupancy])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_rooms(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let occupancy = app_state.room_repo.list_occupancy(user.institution_id).await?;
    Ok(Json(occupancy))
}

// GET /api/rooms/status
#[utoipa::path(
    get,
    path = "/api/rooms/status",
    tag = "Rooms",
    responses(
        (status = 200, description = "Relógio de cada quarto ocupado", body = [RoomStatus])
    ),
    security(("api_jwt" = []))
)]
pub async fn get_room_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let statuses = app_state
        .reservation_service
        .live_room_status(user.institution_id, Utc::now())
        .await?;

    Ok(Json(statuses))
}

// POST /api/rooms/reevaluate
//
// Força uma varredura imediata (mesmo recompute do monitor) e publica o
// resultado no canal de notificações.
#[utoipa::path(
    post,
    path = "/api/rooms/reevaluate",
    tag = "Rooms",
    responses(
        (status = 200, description = "Status recomputado e notificado", body = [RoomStatus])
    ),
    security(("api_jwt" = []))
)]
pub async fn reevaluate_rooms(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let statuses = app_state
        .reservation_service
        .live_room_status(user.institution_id, Utc::now())
        .await?;

    let room_ids: Vec<Uuid> = statuses.iter().map(|s| s.room_id).collect();
    let event = NotificationEvent {
        kind: EventKind::RoomStatusChanged,
        message: "Status dos quartos reavaliado".to_string(),
        data: serde_json::json!({ "roomIds": room_ids }),
    };
    if let Err(e) = app_state.events.send(event) {
        tracing::debug!("Nenhum receptor para reavaliação de quartos: {}", e);
    }

    Ok(Json(statuses))
}
