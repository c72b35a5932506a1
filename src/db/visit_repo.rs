// src/db/visit_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::visits::Visit};

#[derive(Clone)]
pub struct VisitRepository {
    pool: PgPool,
}

impl VisitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        institution_id: Uuid,
        vehicle_plate: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Visit, AppError> {
        let visit = sqlx::query_as::<_, Visit>(
            r#"
            INSERT INTO visits (institution_id, vehicle_plate, phone)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(vehicle_plate)
        .bind(phone)
        .fetch_one(&self.pool)
        .await?;

        Ok(visit)
    }

    pub async fn get(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
    ) -> Result<Option<Visit>, AppError> {
        let visit = sqlx::query_as::<_, Visit>(
            "SELECT * FROM visits WHERE id = $1 AND institution_id = $2",
        )
        .bind(visit_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(visit)
    }

    /// Anulação só sai de ACTIVE; devolve quantas linhas mudaram.
    pub async fn annul(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
        reason: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE visits
            SET state = 'ANNULLED', annul_reason = $3
            WHERE id = $1 AND institution_id = $2 AND state = 'ACTIVE'
            "#,
        )
        .bind(visit_id)
        .bind(institution_id)
        .bind(reason)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
