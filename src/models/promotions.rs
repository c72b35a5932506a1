// src/models/promotions.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Promoção: tarifa fixa que substitui o preço da categoria dentro da
/// janela de validade `[valid_from, valid_to]`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub category_id: Uuid,

    #[schema(example = "Happy Hour")]
    pub name: String,

    /// Tarifa fixa cobrindo `hours_covered` horas
    #[schema(example = "1500.00")]
    pub rate: Decimal,

    #[schema(example = 2)]
    pub hours_covered: i32,

    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
