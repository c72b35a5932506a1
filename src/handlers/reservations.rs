// src/handlers/reservations.rs
//
// Check-in, transições e check-out. O instante da operação é capturado aqui
// (Utc::now) e flui como parâmetro pelos serviços, que não leem relógio.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{reservations::Reservation, treasury::Payment},
    services::{
        reservation_service::{CreateReservation, ReservationDetail, SettleReservation},
        tariff::RateQuote,
    },
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationPayload {
    pub room_id: Uuid,
    pub visit_id: Uuid,
    pub promotion_id: Option<Uuid>,

    #[validate(range(min = 1, message = "duração deve ser positiva"))]
    #[schema(example = 120)]
    pub contracted_minutes: i32,

    #[serde(default)]
    pub is_advance_booking: bool,
}

// POST /api/reservations
#[utoipa::path(
    post,
    path = "/api/reservations",
    tag = "Reservations",
    request_body = CreateReservationPayload,
    responses(
        (status = 201, description = "Check-in realizado", body = Reservation),
        (status = 409, description = "Quarto ou visita já ocupados")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reservation = app_state
        .reservation_service
        .create(
            user.institution_id,
            CreateReservation {
                room_id: payload.room_id,
                visit_id: payload.visit_id,
                promotion_id: payload.promotion_id,
                contracted_minutes: payload.contracted_minutes,
                is_advance_booking: payload.is_advance_booking,
            },
            Utc::now(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

// GET /api/reservations/{id}
#[utoipa::path(
    get,
    path = "/api/reservations/{reservation_id}",
    tag = "Reservations",
    responses(
        (status = 200, description = "Reserva com relógio e cotação", body = ReservationDetail)
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state
        .reservation_service
        .detail(user.institution_id, reservation_id, Utc::now())
        .await?;

    Ok(Json(detail))
}

// POST /api/reservations/{id}/pause
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/pause",
    tag = "Reservations",
    responses(
        (status = 200, description = "Relógio pausado", body = Reservation),
        (status = 409, description = "Reserva não está ativa")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn pause_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state
        .reservation_service
        .pause(user.institution_id, reservation_id, Utc::now())
        .await?;

    Ok(Json(reservation))
}

// POST /api/reservations/{id}/resume
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/resume",
    tag = "Reservations",
    responses(
        (status = 200, description = "Relógio retomado", body = Reservation),
        (status = 409, description = "Reserva não está pausada")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn resume_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let reservation = app_state
        .reservation_service
        .resume(user.institution_id, reservation_id, Utc::now())
        .await?;

    Ok(Json(reservation))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExtendReservationPayload {
    /// Pode ser negativo (reduzir), desde que o total resultante fique > 0
    #[schema(example = 60)]
    pub additional_minutes: i32,
}

// POST /api/reservations/{id}/extend
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/extend",
    tag = "Reservations",
    request_body = ExtendReservationPayload,
    responses(
        (status = 200, description = "Tempo contratado ajustado", body = Reservation),
        (status = 400, description = "Duração resultante inválida")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn extend_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<ExtendReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reservation = app_state
        .reservation_service
        .extend(user.institution_id, reservation_id, payload.additional_minutes)
        .await?;

    Ok(Json(reservation))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationPayload {
    #[validate(length(min = 1, message = "motivo é obrigatório"))]
    #[schema(example = "Cliente desistiu")]
    pub reason: String,
}

// POST /api/reservations/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/cancel",
    tag = "Reservations",
    request_body = CancelReservationPayload,
    responses(
        (status = 200, description = "Reserva cancelada, quarto liberado", body = Reservation),
        (status = 409, description = "Reserva já encerrada")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<CancelReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let reservation = app_state
        .reservation_service
        .cancel(user.institution_id, reservation_id, &payload.reason, Utc::now())
        .await?;

    Ok(Json(reservation))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettleReservationPayload {
    #[schema(example = "1500.00")]
    pub cash_amount: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub card_amount: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub virtual_amount: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub discount: Decimal,
    pub card_reference: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub payment: Payment,
    pub quote: RateQuote,
}

// POST /api/reservations/{id}/settle
#[utoipa::path(
    post,
    path = "/api/reservations/{reservation_id}/settle",
    tag = "Reservations",
    request_body = SettleReservationPayload,
    responses(
        (status = 200, description = "Check-out liquidado (idempotente)", body = SettleResponse),
        (status = 400, description = "Divisão de pagamento não bate com o total"),
        (status = 409, description = "Sem caixa aberto ou reserva cancelada")
    ),
    params(
        ("reservation_id" = Uuid, Path, description = "ID da Reserva")
    ),
    security(("api_jwt" = []))
)]
pub async fn settle_reservation(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(reservation_id): Path<Uuid>,
    Json(payload): Json<SettleReservationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (payment, quote) = app_state
        .reservation_service
        .settle(
            user.institution_id,
            reservation_id,
            SettleReservation {
                cash_amount: payload.cash_amount,
                card_amount: payload.card_amount,
                virtual_amount: payload.virtual_amount,
                discount: payload.discount,
                card_reference: payload.card_reference,
            },
            Utc::now(),
        )
        .await?;

    Ok(Json(SettleResponse { payment, quote }))
}
