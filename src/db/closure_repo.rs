// src/db/closure_repo.rs
//
// Fechamentos de caixa, pagamentos e despesas. Pagamentos nunca são
// mutados depois de criados; fechamentos fechados têm totais congelados.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::treasury::{CashClosure, ClosureTotals, Expense, Payment},
};

#[derive(Clone)]
pub struct ClosureRepository {
    pool: PgPool,
}

impl ClosureRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  FECHAMENTOS
    // =========================================================================

    pub async fn insert_closure(
        &self,
        institution_id: Uuid,
        opened_by: Uuid,
        opening_float: Decimal,
    ) -> Result<CashClosure, AppError> {
        let closure = sqlx::query_as::<_, CashClosure>(
            r#"
            INSERT INTO closures (institution_id, opened_by, opening_float)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(opened_by)
        .bind(opening_float)
        .fetch_one(&self.pool)
        .await?;

        Ok(closure)
    }

    pub async fn get(
        &self,
        institution_id: Uuid,
        closure_id: Uuid,
    ) -> Result<Option<CashClosure>, AppError> {
        let closure = sqlx::query_as::<_, CashClosure>(
            "SELECT * FROM closures WHERE id = $1 AND institution_id = $2",
        )
        .bind(closure_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(closure)
    }

    pub async fn find_open(&self, institution_id: Uuid) -> Result<Option<CashClosure>, AppError> {
        let closure = sqlx::query_as::<_, CashClosure>(
            "SELECT * FROM closures WHERE institution_id = $1 AND state = 'OPEN'",
        )
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(closure)
    }

    /// Fim do último turno fechado antes de `before` (limite inferior da
    /// janela de auditoria do turno seguinte).
    pub async fn last_closed_before<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        before: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closed_at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"
            SELECT MAX(closed_at) FROM closures
            WHERE institution_id = $1 AND state = 'CLOSED' AND closed_at <= $2
            "#,
        )
        .bind(institution_id)
        .bind(before)
        .fetch_one(executor)
        .await?;

        Ok(closed_at)
    }

    /// Tranca o caixa aberto para anexar um pagamento: o pagamento nunca
    /// corre contra um Close concorrente.
    pub async fn lock_open<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
    ) -> Result<Option<CashClosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closure = sqlx::query_as::<_, CashClosure>(
            "SELECT * FROM closures WHERE institution_id = $1 AND state = 'OPEN' FOR UPDATE",
        )
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(closure)
    }

    pub async fn lock<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        closure_id: Uuid,
    ) -> Result<Option<CashClosure>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closure = sqlx::query_as::<_, CashClosure>(
            "SELECT * FROM closures WHERE id = $1 AND institution_id = $2 FOR UPDATE",
        )
        .bind(closure_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(closure)
    }

    /// Congela os totais reconciliados. Uma única vez por fechamento.
    pub async fn finalize<'e, E>(
        &self,
        executor: E,
        closure_id: Uuid,
        totals: &ClosureTotals,
        closed_at: DateTime<Utc>,
    ) -> Result<CashClosure, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let closure = sqlx::query_as::<_, CashClosure>(
            r#"
            UPDATE closures
            SET state = 'CLOSED',
                total_cash = $2,
                total_card = $3,
                total_virtual = $4,
                total_expenses = $5,
                expected_cash = $6,
                closed_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(closure_id)
        .bind(totals.total_cash)
        .bind(totals.total_card)
        .bind(totals.total_virtual)
        .bind(totals.total_expenses)
        .bind(totals.expected_cash)
        .bind(closed_at)
        .fetch_one(executor)
        .await?;

        Ok(closure)
    }

    // =========================================================================
    //  PAGAMENTOS
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        closure_id: Uuid,
        reservation_id: Option<Uuid>,
        pawn_id: Option<Uuid>,
        description: &str,
        cash_amount: Decimal,
        card_amount: Decimal,
        virtual_amount: Decimal,
        discount: Decimal,
        total_amount: Decimal,
        card_reference: Option<&str>,
    ) -> Result<Payment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (
                institution_id, closure_id, reservation_id, pawn_id, description,
                cash_amount, card_amount, virtual_amount, discount, total_amount,
                card_reference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(closure_id)
        .bind(reservation_id)
        .bind(pawn_id)
        .bind(description)
        .bind(cash_amount)
        .bind(card_amount)
        .bind(virtual_amount)
        .bind(discount)
        .bind(total_amount)
        .bind(card_reference)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn get_payment(
        &self,
        institution_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE id = $1 AND institution_id = $2",
        )
        .bind(payment_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    pub async fn list_payments<'e, E>(
        &self,
        executor: E,
        closure_id: Uuid,
    ) -> Result<Vec<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE closure_id = $1 ORDER BY created_at ASC",
        )
        .bind(closure_id)
        .fetch_all(executor)
        .await?;

        Ok(payments)
    }

    // =========================================================================
    //  DESPESAS (Egresos)
    // =========================================================================

    pub async fn insert_expense<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        closure_id: Uuid,
        description: &str,
        amount: Decimal,
    ) -> Result<Expense, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expense = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (institution_id, closure_id, description, amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(closure_id)
        .bind(description)
        .bind(amount)
        .fetch_one(executor)
        .await?;

        Ok(expense)
    }

    pub async fn list_expenses<'e, E>(
        &self,
        executor: E,
        closure_id: Uuid,
    ) -> Result<Vec<Expense>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses WHERE closure_id = $1 ORDER BY created_at ASC",
        )
        .bind(closure_id)
        .fetch_all(executor)
        .await?;

        Ok(expenses)
    }
}
