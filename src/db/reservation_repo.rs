// src/db/reservation_repo.rs
//
// Persistência da máquina de estados de reserva. Métodos que participam de
// transição recebem o executor da transação (mesmo padrão dos demais repos);
// leituras simples usam a pool.

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        reservations::{Reservation, ReservationPause, ReservationState},
        treasury::CancelledAuditLine,
    },
};

#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        room_id: Uuid,
        visit_id: Uuid,
        promotion_id: Option<Uuid>,
        started_at: DateTime<Utc>,
        contracted_minutes: i32,
        is_advance_booking: bool,
    ) -> Result<Reservation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (
                institution_id, room_id, visit_id, promotion_id,
                started_at, contracted_minutes, is_advance_booking
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(institution_id)
        .bind(room_id)
        .bind(visit_id)
        .bind(promotion_id)
        .bind(started_at)
        .bind(contracted_minutes)
        .bind(is_advance_booking)
        .fetch_one(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn get(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Option<Reservation>, AppError> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 AND institution_id = $2",
        )
        .bind(reservation_id)
        .bind(institution_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reservation)
    }

    /// Serializa operações concorrentes sobre a mesma reserva: o perdedor da
    /// corrida enxerga o estado já transicionado e falha com conflito.
    pub async fn lock<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE id = $1 AND institution_id = $2 FOR UPDATE",
        )
        .bind(reservation_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn find_live_by_room<'e, E>(
        &self,
        executor: E,
        room_id: Uuid,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE room_id = $1 AND state IN ('ACTIVE', 'PAUSED')",
        )
        .bind(room_id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    pub async fn find_live_by_visit<'e, E>(
        &self,
        executor: E,
        visit_id: Uuid,
    ) -> Result<Option<Reservation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE visit_id = $1 AND state IN ('ACTIVE', 'PAUSED')",
        )
        .bind(visit_id)
        .fetch_optional(executor)
        .await?;

        Ok(reservation)
    }

    /// Estado da reserva mais recente da visita (para a política de
    /// cobranças pós-checkout do livro de consumos).
    pub async fn latest_state_by_visit(
        &self,
        visit_id: Uuid,
    ) -> Result<Option<ReservationState>, AppError> {
        let state = sqlx::query_scalar::<_, ReservationState>(
            "SELECT state FROM reservations WHERE visit_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(visit_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(state)
    }

    /// Reservas vivas da instituição (loop de monitoração e read model).
    pub async fn list_live(&self, institution_id: Uuid) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE institution_id = $1 AND state IN ('ACTIVE', 'PAUSED')
            ORDER BY started_at ASC
            "#,
        )
        .bind(institution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Todas as reservas vivas, de todas as instituições (varredura do
    /// loop de monitoração).
    pub async fn list_all_live(&self) -> Result<Vec<Reservation>, AppError> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE state IN ('ACTIVE', 'PAUSED')
            ORDER BY started_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    pub async fn list_pauses<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
    ) -> Result<Vec<ReservationPause>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pauses = sqlx::query_as::<_, ReservationPause>(
            "SELECT * FROM reservation_pauses WHERE reservation_id = $1 ORDER BY started_at ASC",
        )
        .bind(reservation_id)
        .fetch_all(executor)
        .await?;

        Ok(pauses)
    }

    pub async fn open_pause<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<ReservationPause, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pause = sqlx::query_as::<_, ReservationPause>(
            r#"
            INSERT INTO reservation_pauses (reservation_id, started_at)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(reservation_id)
        .bind(at)
        .fetch_one(executor)
        .await?;

        Ok(pause)
    }

    pub async fn close_open_pause<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE reservation_pauses
            SET ended_at = $2
            WHERE reservation_id = $1 AND ended_at IS NULL
            "#,
        )
        .bind(reservation_id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn set_state<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        state: ReservationState,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE reservations SET state = $2, updated_at = now() WHERE id = $1")
            .bind(reservation_id)
            .bind(state)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn set_cancelled<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE reservations
            SET state = 'CANCELLED', cancel_reason = $2, cancelled_at = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .bind(reason)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn set_settled<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        payment_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE reservations
            SET state = 'SETTLED', payment_id = $2, settled_at = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .bind(payment_id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn add_contracted_minutes<'e, E>(
        &self,
        executor: E,
        reservation_id: Uuid,
        minutes: i32,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE reservations
            SET contracted_minutes = contracted_minutes + $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .bind(minutes)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Canceladas dentro da janela do turno: viram linhas de auditoria de
    /// valor zero no fechamento.
    pub async fn list_cancelled_between<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CancelledAuditLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, CancelledAuditLine>(
            r#"
            SELECT id AS reservation_id, room_id, cancel_reason, cancelled_at
            FROM reservations
            WHERE institution_id = $1
              AND state = 'CANCELLED'
              AND cancelled_at >= $2 AND cancelled_at <= $3
            ORDER BY cancelled_at ASC
            "#,
        )
        .bind(institution_id)
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;

        Ok(lines)
    }
}
