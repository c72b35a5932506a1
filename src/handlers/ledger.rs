// src/handlers/ledger.rs
//
// Consumos e empenhos da visita.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        ledger::{Consumption, Pawn},
        treasury::Payment,
    },
    services::ledger_service::{AddConsumption, PayPawn},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddConsumptionPayload {
    pub visit_id: Uuid,
    pub room_id: Option<Uuid>,
    pub article_id: Uuid,

    /// Quantidade decimal exata (mesma regra de todo valor monetário)
    #[schema(example = "2.0")]
    pub quantity: Decimal,

    #[schema(example = "35.00")]
    pub unit_price: Decimal,

    /// Cobrado na conta do quarto (true) ou como extra (false)
    #[serde(default)]
    pub is_room_charge: bool,
}

// POST /api/consumptions
#[utoipa::path(
    post,
    path = "/api/consumptions",
    tag = "Ledger",
    request_body = AddConsumptionPayload,
    responses(
        (status = 201, description = "Consumo lançado", body = Consumption),
        (status = 409, description = "Visita não aceita cobranças")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_consumption(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<AddConsumptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let consumption = app_state
        .ledger_service
        .add_consumption(
            user.institution_id,
            AddConsumption {
                visit_id: payload.visit_id,
                room_id: payload.room_id,
                article_id: payload.article_id,
                quantity: payload.quantity,
                unit_price: payload.unit_price,
                is_room_charge: payload.is_room_charge,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(consumption)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelConsumptionPayload {
    #[validate(length(min = 1, message = "motivo é obrigatório"))]
    #[schema(example = "Lançamento errado")]
    pub reason: String,
}

// POST /api/consumptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/consumptions/{consumption_id}/cancel",
    tag = "Ledger",
    request_body = CancelConsumptionPayload,
    responses(
        (status = 200, description = "Consumo cancelado", body = Consumption),
        (status = 409, description = "Consumo já cancelado")
    ),
    params(
        ("consumption_id" = Uuid, Path, description = "ID do Consumo")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_consumption(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(consumption_id): Path<Uuid>,
    Json(payload): Json<CancelConsumptionPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let consumption = app_state
        .ledger_service
        .cancel_consumption(user.institution_id, consumption_id, &payload.reason, Utc::now())
        .await?;

    Ok(Json(consumption))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePawnPayload {
    pub visit_id: Uuid,

    #[validate(length(min = 1, message = "descrição é obrigatória"))]
    #[schema(example = "Relógio de pulso")]
    pub description: String,

    #[schema(example = "500.00")]
    pub amount: Decimal,
}

// POST /api/pawns
#[utoipa::path(
    post,
    path = "/api/pawns",
    tag = "Ledger",
    request_body = CreatePawnPayload,
    responses(
        (status = 201, description = "Empenho registrado", body = Pawn)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_pawn(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreatePawnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let pawn = app_state
        .ledger_service
        .create_pawn(
            user.institution_id,
            payload.visit_id,
            &payload.description,
            payload.amount,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(pawn)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayPawnPayload {
    #[schema(example = "500.00")]
    pub cash_amount: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub card_amount: Decimal,
    #[serde(default)]
    #[schema(example = "0.00")]
    pub virtual_amount: Decimal,
    pub card_reference: Option<String>,
}

// POST /api/pawns/{id}/pay
#[utoipa::path(
    post,
    path = "/api/pawns/{pawn_id}/pay",
    tag = "Ledger",
    request_body = PayPawnPayload,
    responses(
        (status = 200, description = "Empenho resgatado (idempotente)", body = Payment),
        (status = 409, description = "Empenho anulado ou sem caixa aberto")
    ),
    params(
        ("pawn_id" = Uuid, Path, description = "ID do Empenho")
    ),
    security(("api_jwt" = []))
)]
pub async fn pay_pawn(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(pawn_id): Path<Uuid>,
    Json(payload): Json<PayPawnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let payment = app_state
        .ledger_service
        .pay_pawn(
            user.institution_id,
            pawn_id,
            PayPawn {
                cash_amount: payload.cash_amount,
                card_amount: payload.card_amount,
                virtual_amount: payload.virtual_amount,
                card_reference: payload.card_reference,
            },
        )
        .await?;

    Ok(Json(payment))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnulPawnPayload {
    #[validate(length(min = 1, message = "motivo é obrigatório"))]
    #[schema(example = "Item devolvido ao cliente")]
    pub reason: String,
}

// POST /api/pawns/{id}/annul
#[utoipa::path(
    post,
    path = "/api/pawns/{pawn_id}/annul",
    tag = "Ledger",
    request_body = AnnulPawnPayload,
    responses(
        (status = 200, description = "Empenho anulado", body = Pawn),
        (status = 409, description = "Empenho já anulado")
    ),
    params(
        ("pawn_id" = Uuid, Path, description = "ID do Empenho")
    ),
    security(("api_jwt" = []))
)]
pub async fn annul_pawn(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(pawn_id): Path<Uuid>,
    Json(payload): Json<AnnulPawnPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let pawn = app_state
        .ledger_service
        .annul_pawn(user.institution_id, pawn_id, &payload.reason, Utc::now())
        .await?;

    Ok(Json(pawn))
}
