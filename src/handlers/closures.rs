// src/handlers/closures.rs
//
// Abertura, despesas e fechamento de caixa.

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
    models::treasury::{CashClosure, ClosureReport, Expense},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenClosurePayload {
    /// Fundo de troco inicial
    #[schema(example = "200.00")]
    pub opening_float: Decimal,
}

// POST /api/closures
#[utoipa::path(
    post,
    path = "/api/closures",
    tag = "Closures",
    request_body = OpenClosurePayload,
    responses(
        (status = 201, description = "Caixa aberto", body = CashClosure),
        (status = 409, description = "Já existe caixa aberto")
    ),
    security(("api_jwt" = []))
)]
pub async fn open_closure(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<OpenClosurePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let closure = app_state
        .closure_service
        .open(user.institution_id, user.id, payload.opening_float)
        .await?;

    Ok((StatusCode::CREATED, Json(closure)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddExpensePayload {
    #[validate(length(min = 1, message = "descrição é obrigatória"))]
    #[schema(example = "Compra de material de limpeza")]
    pub description: String,

    #[schema(example = "85.00")]
    pub amount: Decimal,
}

// POST /api/closures/{id}/expenses
#[utoipa::path(
    post,
    path = "/api/closures/{closure_id}/expenses",
    tag = "Closures",
    request_body = AddExpensePayload,
    responses(
        (status = 201, description = "Despesa lançada", body = Expense),
        (status = 409, description = "Caixa já fechado")
    ),
    params(
        ("closure_id" = Uuid, Path, description = "ID do Fechamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_expense(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(closure_id): Path<Uuid>,
    Json(payload): Json<AddExpensePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let expense = app_state
        .closure_service
        .add_expense(user.institution_id, closure_id, &payload.description, payload.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(expense)))
}

// POST /api/closures/{id}/close
#[utoipa::path(
    post,
    path = "/api/closures/{closure_id}/close",
    tag = "Closures",
    responses(
        (status = 200, description = "Caixa reconciliado e fechado", body = ClosureReport),
        (status = 409, description = "Caixa já fechado"),
        (status = 500, description = "Falha de reconciliação (fatal)")
    ),
    params(
        ("closure_id" = Uuid, Path, description = "ID do Fechamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn close_closure(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(closure_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .closure_service
        .close(user.institution_id, closure_id, Utc::now())
        .await?;

    Ok(Json(report))
}

// GET /api/closures/{id}
#[utoipa::path(
    get,
    path = "/api/closures/{closure_id}",
    tag = "Closures",
    responses(
        (status = 200, description = "Relatório do turno (preview se ainda aberto)", body = ClosureReport)
    ),
    params(
        ("closure_id" = Uuid, Path, description = "ID do Fechamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_closure(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(closure_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let report = app_state
        .closure_service
        .report(user.institution_id, closure_id, Utc::now())
        .await?;

    Ok(Json(report))
}
