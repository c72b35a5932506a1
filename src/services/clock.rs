// src/services/clock.rs
//
// Relógio de ocupação: aritmética pura de tempo sobre uma reserva ativa.
// Nenhum I/O aqui; persistência e notificação ficam na borda assíncrona.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::reservations::ReservationPause;

/// Fotografia do relógio de uma reserva num instante `now`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClockSnapshot {
    #[schema(example = 150)]
    pub elapsed_minutes: i64,
    /// Negativo significa overtime
    #[schema(example = -30)]
    pub remaining_minutes: i64,
    /// min(elapsed / contracted, 1.0)
    #[schema(example = 1.0)]
    pub progress: f64,
    pub is_overtime: bool,
}

/// Minutos decorridos = `now - start - Σ pausas`. Uma pausa aberta
/// (`ended_at = None`) estende-se até `now`. Nunca fica negativo: desvio de
/// relógio é grampeado em zero e registrado como anomalia, não engolido.
pub fn elapsed_minutes(
    reservation_id: Uuid,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    pauses: &[ReservationPause],
) -> i64 {
    let gross = (now - start).num_minutes();

    let paused: i64 = pauses
        .iter()
        .map(|p| {
            // Intervalos fora de [start, now] não contam
            let begin = p.started_at.max(start);
            let end = p.ended_at.unwrap_or(now).min(now);
            (end - begin).num_minutes().max(0)
        })
        .sum();

    let elapsed = gross - paused;
    if elapsed < 0 {
        tracing::warn!(
            %reservation_id,
            gross_minutes = gross,
            paused_minutes = paused,
            "Relógio decorrido negativo; grampeando em zero"
        );
        return 0;
    }
    elapsed
}

/// Pode ser negativo: minutos de overtime.
pub fn remaining_minutes(contracted_minutes: i64, elapsed_minutes: i64) -> i64 {
    contracted_minutes - elapsed_minutes
}

pub fn progress(contracted_minutes: i64, elapsed_minutes: i64) -> f64 {
    if contracted_minutes <= 0 {
        return 1.0;
    }
    (elapsed_minutes as f64 / contracted_minutes as f64).min(1.0)
}

pub fn is_overtime(contracted_minutes: i64, elapsed_minutes: i64) -> bool {
    elapsed_minutes > contracted_minutes
}

pub fn snapshot(
    reservation_id: Uuid,
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    contracted_minutes: i64,
    pauses: &[ReservationPause],
) -> ClockSnapshot {
    let elapsed = elapsed_minutes(reservation_id, start, now, pauses);
    ClockSnapshot {
        elapsed_minutes: elapsed,
        remaining_minutes: remaining_minutes(contracted_minutes, elapsed),
        progress: progress(contracted_minutes, elapsed),
        is_overtime: is_overtime(contracted_minutes, elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap()
    }

    fn pause(start_min: i64, end_min: Option<i64>) -> ReservationPause {
        ReservationPause {
            id: Uuid::new_v4(),
            reservation_id: Uuid::new_v4(),
            started_at: t0() + Duration::minutes(start_min),
            ended_at: end_min.map(|m| t0() + Duration::minutes(m)),
        }
    }

    #[test]
    fn elapsed_without_pauses() {
        let now = t0() + Duration::minutes(90);
        assert_eq!(elapsed_minutes(Uuid::new_v4(), t0(), now, &[]), 90);
    }

    #[test]
    fn scenario_two_hours_with_pause_and_overtime() {
        // Reserva de 2h em T0; pausa em T0+30, retoma em T0+45;
        // consulta em T0+2h45 → decorrido 2h30, restante -30, overtime.
        let pauses = vec![pause(30, Some(45))];
        let now = t0() + Duration::minutes(165);
        let snap = snapshot(Uuid::new_v4(), t0(), now, 120, &pauses);

        assert_eq!(snap.elapsed_minutes, 150);
        assert_eq!(snap.remaining_minutes, -30);
        assert!(snap.is_overtime);
        assert_eq!(snap.progress, 1.0);
    }

    #[test]
    fn elapsed_is_frozen_during_open_pause() {
        let pauses = vec![pause(30, None)];
        let id = Uuid::new_v4();

        let at_pause = elapsed_minutes(id, t0(), t0() + Duration::minutes(30), &pauses);
        let much_later = elapsed_minutes(id, t0(), t0() + Duration::minutes(300), &pauses);

        assert_eq!(at_pause, 30);
        assert_eq!(much_later, 30);
    }

    #[test]
    fn elapsed_is_monotonic_in_now() {
        let pauses = vec![pause(10, Some(20)), pause(40, Some(70))];
        let id = Uuid::new_v4();
        let mut previous = 0;
        for minutes in 0..180 {
            let e = elapsed_minutes(id, t0(), t0() + Duration::minutes(minutes), &pauses);
            assert!(e >= previous, "regrediu em t+{}m", minutes);
            previous = e;
        }
    }

    #[test]
    fn clock_skew_clamps_to_zero() {
        // now antes de start (drift de relógio) não pode dar negativo
        let now = t0() - Duration::minutes(5);
        assert_eq!(elapsed_minutes(Uuid::new_v4(), t0(), now, &[]), 0);
    }

    #[test]
    fn remaining_identity_and_overtime_flag() {
        for elapsed in [0i64, 60, 120, 121, 500] {
            let remaining = remaining_minutes(120, elapsed);
            assert_eq!(remaining, 120 - elapsed);
            assert_eq!(is_overtime(120, elapsed), remaining < 0);
        }
    }

    #[test]
    fn progress_caps_at_one() {
        assert_eq!(progress(120, 60), 0.5);
        assert_eq!(progress(120, 120), 1.0);
        assert_eq!(progress(120, 240), 1.0);
    }
}
