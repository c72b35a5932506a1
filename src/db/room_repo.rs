// src/db/room_repo.rs
//
// Leitura de catálogo (quartos e categorias) e do read model de ocupação.
// Escrita de catálogo é de outro serviço; aqui só consultas.

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{Room, RoomCategory, RoomOccupancy},
};

#[derive(Clone)]
pub struct RoomRepository {
    pool: PgPool,
}

impl RoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_room<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        room_id: Uuid,
    ) -> Result<Option<Room>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let room = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE id = $1 AND institution_id = $2",
        )
        .bind(room_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(room)
    }

    /// Tranca a linha do quarto na transação: toda transição de ocupação
    /// passa por aqui, garantindo exclusividade por quarto.
    pub async fn lock_room<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        room_id: Uuid,
    ) -> Result<Option<Room>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let room = sqlx::query_as::<_, Room>(
            "SELECT * FROM rooms WHERE id = $1 AND institution_id = $2 FOR UPDATE",
        )
        .bind(room_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(room)
    }

    pub async fn get_category<'e, E>(
        &self,
        executor: E,
        institution_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<RoomCategory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let category = sqlx::query_as::<_, RoomCategory>(
            "SELECT * FROM room_categories WHERE id = $1 AND institution_id = $2",
        )
        .bind(category_id)
        .bind(institution_id)
        .fetch_optional(executor)
        .await?;

        Ok(category)
    }

    /// Ocupação recomputada do estado das reservas a cada chamada;
    /// não existe cache ambiente de "quartos ocupados".
    pub async fn list_occupancy(
        &self,
        institution_id: Uuid,
    ) -> Result<Vec<RoomOccupancy>, AppError> {
        let rows = sqlx::query_as::<_, RoomOccupancy>(
            r#"
            SELECT
                r.id AS room_id,
                r.number,
                r.category_id,
                res.id AS reservation_id,
                res.state AS reservation_state
            FROM rooms r
            LEFT JOIN reservations res
                ON res.room_id = r.id
                AND res.state IN ('ACTIVE', 'PAUSED')
            WHERE r.institution_id = $1 AND r.is_active
            ORDER BY r.number ASC
            "#,
        )
        .bind(institution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
