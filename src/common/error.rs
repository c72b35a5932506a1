// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ledger::PawnState, reservations::ReservationState};

// Taxonomia de erros do core. Erros de validação rejeitam antes de qualquer
// mudança de estado; conflitos deixam o estado intocado; a falha de
// reconciliação aborta o fechamento, nunca é ajustada em silêncio.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Duração contratada inválida: {minutes} minutos")]
    InvalidDuration { minutes: i64 },

    #[error("Extensão inválida: duração resultante {minutes} minutos")]
    InvalidExtension { minutes: i64 },

    #[error("Valor inválido em {field}: {amount}")]
    InvalidAmount { field: &'static str, amount: Decimal },

    #[error("Divisão de pagamento não bate com o total: esperado {expected}, recebido {received}")]
    PaymentSplitMismatch { expected: Decimal, received: Decimal },

    #[error("Token inválido")]
    InvalidToken,

    #[error("{entity} não encontrado(a): {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Quarto {room_id} já possui reserva ativa ou pausada")]
    RoomUnavailable { room_id: Uuid },

    #[error("Visita {visit_id} não aceita novas cobranças")]
    VisitNotActive { visit_id: Uuid },

    #[error("Visita {visit_id} já possui reserva ativa ou pausada")]
    VisitHasLiveReservation { visit_id: Uuid },

    #[error("Consumo {consumption_id} já foi cancelado")]
    ConsumptionNotActive { consumption_id: Uuid },

    #[error("Reserva {reservation_id} não está ativa (estado atual: {state:?})")]
    NotActive {
        reservation_id: Uuid,
        state: ReservationState,
    },

    #[error("Reserva {reservation_id} não está pausada (estado atual: {state:?})")]
    NotPaused {
        reservation_id: Uuid,
        state: ReservationState,
    },

    #[error("Reserva {reservation_id} já foi liquidada")]
    AlreadySettled { reservation_id: Uuid },

    #[error("Empenho {pawn_id} não pode transicionar (estado atual: {state:?})")]
    PawnNotPending { pawn_id: Uuid, state: PawnState },

    #[error("Já existe um caixa aberto para esta instituição")]
    ClosureAlreadyOpen,

    #[error("Não há caixa aberto para receber o pagamento")]
    NoOpenClosure,

    #[error("Fechamento {closure_id} já está fechado")]
    ClosureAlreadyClosed { closure_id: Uuid },

    #[error("Reconciliação do fechamento {closure_id} não fecha: esperado {expected}, obtido {actual}")]
    ReconciliationMismatch {
        closure_id: Uuid,
        expected: Decimal,
        actual: Decimal,
    },

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    // Contexto estruturado suficiente para a UI montar a mensagem
    // (id da entidade, estado atual, transição tentada).
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            AppError::RoomUnavailable { room_id } => Some(json!({ "roomId": room_id })),
            AppError::VisitNotActive { visit_id }
            | AppError::VisitHasLiveReservation { visit_id } => {
                Some(json!({ "visitId": visit_id }))
            }
            AppError::ConsumptionNotActive { consumption_id } => {
                Some(json!({ "consumptionId": consumption_id }))
            }
            AppError::NotActive { reservation_id, state }
            | AppError::NotPaused { reservation_id, state } => {
                Some(json!({ "reservationId": reservation_id, "state": state }))
            }
            AppError::AlreadySettled { reservation_id } => {
                Some(json!({ "reservationId": reservation_id, "state": ReservationState::Settled }))
            }
            AppError::PawnNotPending { pawn_id, state } => {
                Some(json!({ "pawnId": pawn_id, "state": state }))
            }
            AppError::ClosureAlreadyClosed { closure_id } => Some(json!({ "closureId": closure_id })),
            AppError::InvalidAmount { field, amount } => {
                Some(json!({ "field": field, "amount": amount }))
            }
            AppError::PaymentSplitMismatch { expected, received } => {
                Some(json!({ "expected": expected, "received": received }))
            }
            AppError::ReconciliationMismatch { closure_id, expected, actual } => {
                Some(json!({ "closureId": closure_id, "expected": expected, "actual": actual }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Validação devolve todos os detalhes por campo.
        if let AppError::ValidationError(errors) = &self {
            let mut details = std::collections::HashMap::new();
            for (field, field_errors) in errors.field_errors() {
                let messages: Vec<String> = field_errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                    .collect();
                details.insert(field.to_string(), messages);
            }
            let body = Json(json!({
                "error": "Um ou mais campos são inválidos.",
                "details": details,
            }));
            return (StatusCode::BAD_REQUEST, body).into_response();
        }

        let status = match &self {
            AppError::ValidationError(_)
            | AppError::InvalidDuration { .. }
            | AppError::InvalidExtension { .. }
            | AppError::InvalidAmount { .. }
            | AppError::PaymentSplitMismatch { .. } => StatusCode::BAD_REQUEST,

            AppError::InvalidToken => StatusCode::UNAUTHORIZED,

            AppError::NotFound { .. } => StatusCode::NOT_FOUND,

            AppError::RoomUnavailable { .. }
            | AppError::VisitNotActive { .. }
            | AppError::VisitHasLiveReservation { .. }
            | AppError::ConsumptionNotActive { .. }
            | AppError::NotActive { .. }
            | AppError::NotPaused { .. }
            | AppError::AlreadySettled { .. }
            | AppError::PawnNotPending { .. }
            | AppError::ClosureAlreadyOpen
            | AppError::NoOpenClosure
            | AppError::ClosureAlreadyClosed { .. } => StatusCode::CONFLICT,

            AppError::ReconciliationMismatch { .. } => {
                // Fatal para aquele Close; nunca ajustado em silêncio.
                tracing::error!("Falha de reconciliação: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }

            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                tracing::error!("Erro Interno do Servidor: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR
            && !matches!(self, AppError::ReconciliationMismatch { .. })
        {
            "Ocorreu um erro inesperado.".to_string()
        } else {
            self.to_string()
        };

        let body = match self.details() {
            Some(details) => Json(json!({ "error": message, "details": details })),
            None => Json(json!({ "error": message })),
        };
        (status, body).into_response()
    }
}
