// src/models/catalog.rs
//
// Catálogo (categorias e quartos). A escrita é responsabilidade de outro
// serviço; o core só lê para resolver tarifas e validar ocupação.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::reservations::ReservationState;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomCategory {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    #[schema(example = "Suíte Standard")]
    pub name: String,

    /// Preço por hora fora da janela de preço especial
    #[schema(example = "1000.00")]
    pub normal_price: Decimal,

    /// Preço por hora dentro da janela configurada (ex.: madrugada)
    #[schema(example = "800.00")]
    pub special_price: Decimal,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub category_id: Uuid,

    #[schema(example = "101")]
    pub number: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Linha do read model de ocupação: recomputada a partir do estado das
/// reservas, nunca mantida em cache ambiente.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomOccupancy {
    pub room_id: Uuid,
    #[schema(example = "101")]
    pub number: String,
    pub category_id: Uuid,
    /// None = quarto livre
    pub reservation_id: Option<Uuid>,
    pub reservation_state: Option<ReservationState>,
}
