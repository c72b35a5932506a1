// src/handlers/visits.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{ledger::VisitSummary, visits::Visit},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateVisitPayload {
    #[validate(length(max = 16, message = "max 16 caracteres"))]
    #[schema(example = "ABC-1234")]
    pub vehicle_plate: Option<String>,

    #[validate(length(max = 32, message = "max 32 caracteres"))]
    #[schema(example = "+55 11 99999-0000")]
    pub phone: Option<String>,
}

// POST /api/visits
#[utoipa::path(
    post,
    path = "/api/visits",
    tag = "Visits",
    request_body = CreateVisitPayload,
    responses(
        (status = 201, description = "Visita registrada", body = Visit)
    ),
    security(("api_jwt" = []))
)]
pub async fn create_visit(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<CreateVisitPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let visit = app_state
        .visit_repo
        .create(
            user.institution_id,
            payload.vehicle_plate.as_deref(),
            payload.phone.as_deref(),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(visit)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnnulVisitPayload {
    #[validate(length(min = 1, message = "motivo é obrigatório"))]
    #[schema(example = "Registro duplicado")]
    pub reason: String,
}

// POST /api/visits/{id}/annul
#[utoipa::path(
    post,
    path = "/api/visits/{visit_id}/annul",
    tag = "Visits",
    request_body = AnnulVisitPayload,
    responses(
        (status = 200, description = "Visita anulada", body = Visit),
        (status = 409, description = "Visita já anulada")
    ),
    params(
        ("visit_id" = Uuid, Path, description = "ID da Visita")
    ),
    security(("api_jwt" = []))
)]
pub async fn annul_visit(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(visit_id): Path<Uuid>,
    Json(payload): Json<AnnulVisitPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let affected = app_state
        .visit_repo
        .annul(user.institution_id, visit_id, &payload.reason)
        .await?;

    if affected == 0 {
        // Distingue visita inexistente de visita já anulada.
        return match app_state.visit_repo.get(user.institution_id, visit_id).await? {
            Some(_) => Err(AppError::VisitNotActive { visit_id }),
            None => Err(AppError::NotFound {
                entity: "Visita",
                id: visit_id,
            }),
        };
    }

    let visit = app_state
        .visit_repo
        .get(user.institution_id, visit_id)
        .await?
        .ok_or(AppError::NotFound {
            entity: "Visita",
            id: visit_id,
        })?;

    Ok(Json(visit))
}

// GET /api/visits/{id}/summary
#[utoipa::path(
    get,
    path = "/api/visits/{visit_id}/summary",
    tag = "Visits",
    responses(
        (status = 200, description = "Totais da visita (só linhas ativas)", body = VisitSummary)
    ),
    params(
        ("visit_id" = Uuid, Path, description = "ID da Visita")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_visit_summary(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(visit_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let summary = app_state
        .ledger_service
        .summarize_by_visit(user.institution_id, visit_id)
        .await?;

    Ok(Json(summary))
}
