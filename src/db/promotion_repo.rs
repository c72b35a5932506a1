// src/db/promotion_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::promotions::Promotion};

/// Leitura de promoções. Sem pool própria: o executor vem do chamador, que
/// decide se a consulta participa de uma transação.
#[derive(Clone, Default)]
pub struct PromotionRepository;

impl PromotionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn get<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        promotion_id: Uuid,
    ) -> Result<Option<Promotion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let promotion = sqlx::query_as::<_, Promotion>(
            "SELECT * FROM promotions WHERE id = $1 AND institution_id = $2",
        )
        .bind(promotion_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(promotion)
    }
}
