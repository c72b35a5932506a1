// src/services/monitor.rs
//
// Loop de monitoração de ocupação: varre as reservas vivas em intervalo
// fixo, recomputa o relógio de cada uma e notifica overtime recém-atingido.
// Falha de uma varredura é logada e a próxima segue normalmente; o loop só
// termina pelo sinal de shutdown.

use std::{collections::HashSet, env, time::Duration};

use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    db::ReservationRepository,
    models::events::{EventKind, NotificationEvent},
    services::clock,
};

const DEFAULT_INTERVAL_SECS: u64 = 60;

fn interval_from_env() -> Duration {
    let secs = env::var("MONITOR_INTERVAL_SECS")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_INTERVAL_SECS);
    Duration::from_secs(secs)
}

pub async fn run(
    state: AppState,
    repo: ReservationRepository,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval_from_env());
    // Reservas já notificadas de overtime: cada uma avisa uma vez só.
    let mut notified: HashSet<Uuid> = HashSet::new();

    tracing::info!("🕒 Monitor de ocupação iniciado");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = sweep(&state, &repo, &mut notified).await {
                    tracing::warn!("Varredura de ocupação falhou: {}", e);
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("Monitor de ocupação encerrado");
                    return;
                }
            }
        }
    }
}

async fn sweep(
    state: &AppState,
    repo: &ReservationRepository,
    notified: &mut HashSet<Uuid>,
) -> Result<(), AppError> {
    let now = Utc::now();
    let reservations = repo.list_all_live().await?;

    // Ids que saíram do conjunto vivo não precisam mais de memória.
    notified.retain(|id| reservations.iter().any(|r| r.id == *id));

    for reservation in reservations {
        let pauses = repo.list_pauses(&state.db_pool, reservation.id).await?;
        let snapshot = clock::snapshot(
            reservation.id,
            reservation.started_at,
            now,
            i64::from(reservation.contracted_minutes),
            &pauses,
        );

        if snapshot.is_overtime && notified.insert(reservation.id) {
            tracing::info!(
                reservation_id = %reservation.id,
                room_id = %reservation.room_id,
                elapsed = snapshot.elapsed_minutes,
                "Reserva entrou em overtime"
            );
            let event = NotificationEvent {
                kind: EventKind::OvertimeReached,
                message: "Tempo contratado esgotado".to_string(),
                data: serde_json::json!({
                    "reservationId": reservation.id,
                    "roomId": reservation.room_id,
                    "elapsedMinutes": snapshot.elapsed_minutes,
                }),
            };
            if let Err(e) = state.events.send(event) {
                tracing::debug!("Nenhum receptor para evento de overtime: {}", e);
            }
        }
    }

    Ok(())
}
