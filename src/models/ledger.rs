// src/models/ledger.rs
//
// Livro de consumos e empenhos ("empeños") de uma visita.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "consumption_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumptionState {
    Active,
    Annulled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "pawn_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PawnState {
    Pending,
    Paid,
    Annulled,
}

/// Linha de consumo (quantidade × preço unitário). Imutável depois de
/// criada, exceto pelo cancelamento com motivo.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub visit_id: Uuid,
    pub room_id: Option<Uuid>,
    pub article_id: Uuid,

    #[schema(example = "2.0")]
    pub quantity: Decimal,

    #[schema(example = "35.00")]
    pub unit_price: Decimal,

    /// EsHabitacion: cobrado na conta do quarto
    pub is_room_charge: bool,

    pub state: ConsumptionState,
    pub annul_reason: Option<String>,
    pub annulled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Empenho: garantia em dinheiro contra a visita. Depois de Paid, o
/// payment_id é permanente (mesmo se o empenho for anulado).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pawn {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub visit_id: Uuid,

    #[schema(example = "Relógio de pulso")]
    pub description: String,

    #[schema(example = "500.00")]
    pub amount: Decimal,

    pub state: PawnState,
    pub payment_id: Option<Uuid>,
    pub annul_reason: Option<String>,
    pub annulled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Totais de uma visita, somando apenas linhas ativas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub visit_id: Uuid,
    /// Consumos marcados como conta do quarto
    #[schema(example = "70.00")]
    pub room_total: Decimal,
    /// Demais consumos (bar, loja etc.)
    #[schema(example = "120.00")]
    pub extras_total: Decimal,
    #[schema(example = "190.00")]
    pub grand_total: Decimal,
}
