// src/models/visits.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "visit_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitState {
    Active,
    Annulled,
}

/// Uma estadia de hóspede (Visita). Pode acumular reservas, consumos e
/// empenhos; no máximo uma reserva viva por vez.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    #[schema(example = "ABC-1234")]
    pub vehicle_plate: Option<String>,

    #[schema(example = "+55 11 99999-0000")]
    pub phone: Option<String>,

    pub first_entry_at: DateTime<Utc>,
    pub state: VisitState,
    pub annul_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
