// src/db/ledger_repo.rs
//
// Consumos e empenhos. Linhas de consumo são imutáveis depois de criadas,
// exceto pelo cancelamento suave com motivo.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::ledger::{Consumption, Pawn},
};

#[derive(Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CONSUMOS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_consumption<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        visit_id: Uuid,
        room_id: Option<Uuid>,
        article_id: Uuid,
        quantity: Decimal,
        unit_price: Decimal,
        is_room_charge: bool,
    ) -> Result<Consumption, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consumption = sqlx::query_as::<_, Consumption>(
            r#"
            INSERT INTO consumptions (
                institution_id, visit_id, room_id, article_id,
                quantity, unit_price, is_room_charge
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(visit_id)
        .bind(room_id)
        .bind(article_id)
        .bind(quantity)
        .bind(unit_price)
        .bind(is_room_charge)
        .fetch_one(executor)
        .await?;

        Ok(consumption)
    }

    /// Cancelamento suave; só sai de ACTIVE.
    pub async fn annul_consumption(
        &self,
        institution_id: Uuid,
        consumption_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE consumptions
            SET state = 'ANNULLED', annul_reason = $3, annulled_at = $4
            WHERE id = $1 AND institution_id = $2 AND state = 'ACTIVE'
            "#,
        )
        .bind(consumption_id)
        .bind(institution_id)
        .bind(reason)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn get_consumption(
        &self,
        institution_id: Uuid,
        consumption_id: Uuid,
    ) -> Result<Option<Consumption>, AppError> {
        let consumption = sqlx::query_as::<_, Consumption>(
            "SELECT * FROM consumptions WHERE id = $1 AND institution_id = $2",
        )
        .bind(consumption_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumption)
    }

    pub async fn list_by_visit(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
    ) -> Result<Vec<Consumption>, AppError> {
        let consumptions = sqlx::query_as::<_, Consumption>(
            r#"
            SELECT * FROM consumptions
            WHERE visit_id = $1 AND institution_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(visit_id)
        .bind(institution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(consumptions)
    }

    // =========================================================================
    //  EMPENHOS ("empeños")
    // =========================================================================

    pub async fn insert_pawn(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
        description: &str,
        amount: Decimal,
    ) -> Result<Pawn, AppError> {
        let pawn = sqlx::query_as::<_, Pawn>(
            r#"
            INSERT INTO pawns (institution_id, visit_id, description, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(visit_id)
        .bind(description)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

        Ok(pawn)
    }

    pub async fn get_pawn(
        &self,
        institution_id: Uuid,
        pawn_id: Uuid,
    ) -> Result<Option<Pawn>, AppError> {
        let pawn = sqlx::query_as::<_, Pawn>(
            "SELECT * FROM pawns WHERE id = $1 AND institution_id = $2",
        )
        .bind(pawn_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pawn)
    }

    pub async fn lock_pawn<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        pawn_id: Uuid,
    ) -> Result<Option<Pawn>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pawn = sqlx::query_as::<_, Pawn>(
            "SELECT * FROM pawns WHERE id = $1 AND institution_id = $2 FOR UPDATE",
        )
        .bind(pawn_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(pawn)
    }

    /// Pending → Paid. O payment_id gravado aqui é permanente.
    pub async fn set_pawn_paid<'e, E>(
        &self,
        executor: E,
        pawn_id: Uuid,
        payment_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE pawns SET state = 'PAID', payment_id = $2 WHERE id = $1")
            .bind(pawn_id)
            .bind(payment_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    /// Anula mantendo o payment_id (se houver): o vínculo com o pagamento
    /// nunca é apagado.
    pub async fn set_pawn_annulled<'e, E>(
        &self,
        executor: E,
        pawn_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE pawns
            SET state = 'ANNULLED', annul_reason = $2, annulled_at = $3
            WHERE id = $1
            "#,
        )
        .bind(pawn_id)
        .bind(reason)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(())
    }
}
