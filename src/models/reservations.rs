// src/models/reservations.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// O estado "Draft" do ciclo de vida existe só durante a validação dentro da
// transação de criação e nunca é persistido.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "reservation_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationState {
    Active,
    Paused,
    Settled,
    Cancelled,
}

impl ReservationState {
    /// Reserva viva = ainda ocupa o quarto.
    pub fn is_live(&self) -> bool {
        matches!(self, ReservationState::Active | ReservationState::Paused)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub room_id: Uuid,
    pub visit_id: Uuid,
    pub promotion_id: Option<Uuid>,

    pub started_at: DateTime<Utc>,

    #[schema(example = 120)]
    pub contracted_minutes: i32,

    /// EsReserva: agendada com antecedência (true) ou walk-in (false)
    pub is_advance_booking: bool,

    pub state: ReservationState,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub payment_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Intervalo de pausa do relógio de cobrança. `ended_at = None` significa
/// pausa ainda aberta (estende-se até o instante da consulta).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationPause {
    pub id: Uuid,
    pub reservation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}
