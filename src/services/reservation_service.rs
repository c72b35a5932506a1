// src/services/reservation_service.rs
//
// Máquina de estados da reserva: Active → {Paused ⇄ Active} → {Settled |
// Cancelled}. "Draft" existe só durante a validação dentro da transação de
// criação e nunca chega ao banco. Toda transição roda numa transação com a
// linha trancada (FOR UPDATE): operações concorrentes sobre a mesma reserva
// são serializadas e o perdedor falha com conflito.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::BillingConfig,
    db::{PromotionRepository, ReservationRepository, RoomRepository, VisitRepository},
    models::{
        events::{EventKind, NotificationEvent},
        reservations::{Reservation, ReservationState},
        treasury::Payment,
        visits::VisitState,
    },
    services::{
        clock::{self, ClockSnapshot},
        closure_service::{ClosureService, PaymentDraft},
        tariff::{self, RateQuote},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOp {
    Pause,
    Resume,
    Extend,
    Cancel,
    Settle,
}

/// Valida a transição pedida contra o estado atual. Reserva liquidada é
/// terminal e imutável (o re-settle idempotente é tratado antes de chegar
/// aqui).
fn ensure_transition(
    reservation_id: Uuid,
    state: ReservationState,
    op: TransitionOp,
) -> Result<(), AppError> {
    use ReservationState::*;
    use TransitionOp::*;

    match (state, op) {
        (Active, Pause) => Ok(()),
        (Paused, Resume) => Ok(()),
        (Active | Paused, Extend | Cancel | Settle) => Ok(()),

        (Settled, _) => Err(AppError::AlreadySettled { reservation_id }),
        (_, Resume) => Err(AppError::NotPaused {
            reservation_id,
            state,
        }),
        (_, _) => Err(AppError::NotActive {
            reservation_id,
            state,
        }),
    }
}

/// Reserva liquidada resolve para o pagamento original: liquidar de novo
/// devolve o mesmo Payment, nunca cria segunda cobrança.
fn settled_payment(reservation: &Reservation) -> Result<Option<Uuid>, AppError> {
    if reservation.state != ReservationState::Settled {
        return Ok(None);
    }
    let payment_id = reservation.payment_id.ok_or_else(|| {
        anyhow::anyhow!("Reserva {} liquidada sem payment_id", reservation.id)
    })?;
    Ok(Some(payment_id))
}

/// Instante de referência da cotação: o momento da liquidação, quando houve
/// uma; a cotação de uma reserva liquidada não deriva com o relógio.
fn settlement_instant(reservation: &Reservation, now: DateTime<Utc>) -> DateTime<Utc> {
    reservation.settled_at.unwrap_or(now)
}

#[derive(Debug, Clone)]
pub struct CreateReservation {
    pub room_id: Uuid,
    pub visit_id: Uuid,
    pub promotion_id: Option<Uuid>,
    pub contracted_minutes: i32,
    pub is_advance_booking: bool,
}

#[derive(Debug, Clone)]
pub struct SettleReservation {
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    pub virtual_amount: Decimal,
    pub discount: Decimal,
    pub card_reference: Option<String>,
}

/// Reserva + relógio + cotação corrente (visão de detalhe).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDetail {
    pub reservation: Reservation,
    pub clock: ClockSnapshot,
    pub quote: RateQuote,
}

/// Linha do status ao vivo dos quartos ocupados (loop de monitoração e
/// consulta sob demanda).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatus {
    pub room_id: Uuid,
    pub reservation_id: Uuid,
    pub state: ReservationState,
    pub clock: ClockSnapshot,
}

#[derive(Clone)]
pub struct ReservationService {
    pool: sqlx::PgPool,
    repo: ReservationRepository,
    room_repo: RoomRepository,
    visit_repo: VisitRepository,
    promotion_repo: PromotionRepository,
    closure_service: ClosureService,
    billing: BillingConfig,
    events: broadcast::Sender<NotificationEvent>,
}

impl ReservationService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: sqlx::PgPool,
        repo: ReservationRepository,
        room_repo: RoomRepository,
        visit_repo: VisitRepository,
        promotion_repo: PromotionRepository,
        closure_service: ClosureService,
        billing: BillingConfig,
        events: broadcast::Sender<NotificationEvent>,
    ) -> Self {
        Self {
            pool,
            repo,
            room_repo,
            visit_repo,
            promotion_repo,
            closure_service,
            billing,
            events,
        }
    }

    /// Check-in: valida visita, duração e disponibilidade do quarto dentro
    /// de uma transação com o quarto trancado. O índice único parcial no
    /// banco é a segunda linha de defesa contra double-booking.
    pub async fn create(
        &self,
        institution_id: Uuid,
        cmd: CreateReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        if cmd.contracted_minutes <= 0 {
            return Err(AppError::InvalidDuration {
                minutes: i64::from(cmd.contracted_minutes),
            });
        }

        let visit = self
            .visit_repo
            .get(institution_id, cmd.visit_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Visita",
                id: cmd.visit_id,
            })?;
        if visit.state != VisitState::Active {
            return Err(AppError::VisitNotActive {
                visit_id: cmd.visit_id,
            });
        }

        // Promoção inexistente é erro do chamador; promoção inválida não é
        // (degrada na liquidação, com aviso).
        if let Some(promotion_id) = cmd.promotion_id {
            self.promotion_repo
                .get(&self.pool, institution_id, promotion_id)
                .await?
                .ok_or(AppError::NotFound {
                    entity: "Promoção",
                    id: promotion_id,
                })?;
        }

        let mut tx = self.pool.begin().await?;

        let room = self
            .room_repo
            .lock_room(&mut *tx, institution_id, cmd.room_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Quarto",
                id: cmd.room_id,
            })?;
        if !room.is_active {
            return Err(AppError::RoomUnavailable { room_id: room.id });
        }

        if self.repo.find_live_by_room(&mut *tx, room.id).await?.is_some() {
            return Err(AppError::RoomUnavailable { room_id: room.id });
        }
        if self
            .repo
            .find_live_by_visit(&mut *tx, cmd.visit_id)
            .await?
            .is_some()
        {
            return Err(AppError::VisitHasLiveReservation {
                visit_id: cmd.visit_id,
            });
        }

        let reservation = self
            .repo
            .insert(
                &mut *tx,
                institution_id,
                room.id,
                cmd.visit_id,
                cmd.promotion_id,
                now,
                cmd.contracted_minutes,
                cmd.is_advance_booking,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %reservation.id, room_id = %room.id, "Check-in realizado");
        self.emit_room_event(room.id, "Quarto ocupado");

        Ok(reservation)
    }

    /// Pausa o relógio de cobrança. Só a partir de Active.
    pub async fn pause(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = self.lock_or_not_found(&mut tx, institution_id, reservation_id).await?;
        ensure_transition(reservation_id, reservation.state, TransitionOp::Pause)?;

        self.repo.open_pause(&mut *tx, reservation_id, now).await?;
        self.repo
            .set_state(&mut *tx, reservation_id, ReservationState::Paused)
            .await?;

        tx.commit().await?;
        self.emit_room_event(reservation.room_id, "Reserva pausada");

        self.reload(institution_id, reservation_id).await
    }

    /// Retoma o relógio fechando o intervalo de pausa aberto.
    pub async fn resume(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = self.lock_or_not_found(&mut tx, institution_id, reservation_id).await?;
        ensure_transition(reservation_id, reservation.state, TransitionOp::Resume)?;

        self.repo.close_open_pause(&mut *tx, reservation_id, now).await?;
        self.repo
            .set_state(&mut *tx, reservation_id, ReservationState::Active)
            .await?;

        tx.commit().await?;
        self.emit_room_event(reservation.room_id, "Reserva retomada");

        self.reload(institution_id, reservation_id).await
    }

    /// Soma minutos ao contratado. Permitido de Active ou Paused.
    pub async fn extend(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        additional_minutes: i32,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = self.lock_or_not_found(&mut tx, institution_id, reservation_id).await?;
        ensure_transition(reservation_id, reservation.state, TransitionOp::Extend)?;

        let resulting = i64::from(reservation.contracted_minutes) + i64::from(additional_minutes);
        if resulting <= 0 {
            return Err(AppError::InvalidExtension { minutes: resulting });
        }

        self.repo
            .add_contracted_minutes(&mut *tx, reservation_id, additional_minutes)
            .await?;

        tx.commit().await?;
        self.reload(institution_id, reservation_id).await
    }

    /// Cancela com motivo obrigatório. Libera o quarto e deixa o rastro
    /// auditável: a reserva cancelada entra no fechamento do turno como
    /// linha de valor zero, a menos que haja taxa de cancelamento
    /// configurada (aí vira um pagamento normal contra o caixa aberto).
    pub async fn cancel(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = self.lock_or_not_found(&mut tx, institution_id, reservation_id).await?;
        ensure_transition(reservation_id, reservation.state, TransitionOp::Cancel)?;

        self.repo.close_open_pause(&mut *tx, reservation_id, now).await?;
        self.repo
            .set_cancelled(&mut *tx, reservation_id, reason, now)
            .await?;

        if self.billing.cancellation_fee > Decimal::ZERO {
            let fee = self.billing.cancellation_fee;
            self.closure_service
                .attach_payment(
                    &mut tx,
                    institution_id,
                    PaymentDraft {
                        reservation_id: Some(reservation_id),
                        pawn_id: None,
                        description: format!("Taxa de cancelamento — reserva {}", reservation_id),
                        cash_amount: fee,
                        card_amount: Decimal::ZERO,
                        virtual_amount: Decimal::ZERO,
                        discount: Decimal::ZERO,
                        total_amount: fee,
                        card_reference: None,
                    },
                )
                .await?;
        }

        tx.commit().await?;

        tracing::info!(reservation_id = %reservation_id, reason, "Reserva cancelada");
        self.emit_room_event(reservation.room_id, "Quarto liberado");

        self.reload(institution_id, reservation_id).await
    }

    /// Check-out. Fecha pausa aberta, resolve a tarifa pelo tempo final,
    /// valida a divisão de pagamento e cria exatamente um Payment no caixa
    /// aberto. Idempotente por id de reserva: re-liquidar devolve o mesmo
    /// Payment, nunca uma cobrança duplicada.
    pub async fn settle(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        cmd: SettleReservation,
        now: DateTime<Utc>,
    ) -> Result<(Payment, RateQuote), AppError> {
        let mut tx = self.pool.begin().await?;

        let reservation = self.lock_or_not_found(&mut tx, institution_id, reservation_id).await?;

        // Caminho idempotente: libera o lock antes de qualquer leitura na
        // pool; segurar a transação enquanto se espera outra conexão esgota
        // a pool sob liquidações concorrentes.
        if let Some(payment_id) = settled_payment(&reservation)? {
            drop(tx);
            let payment = self
                .closure_service_payment(institution_id, payment_id)
                .await?;
            let quote = self
                .quote_for(&reservation, settlement_instant(&reservation, now))
                .await?;
            return Ok((payment, quote));
        }

        ensure_transition(reservation_id, reservation.state, TransitionOp::Settle)?;

        self.repo.close_open_pause(&mut *tx, reservation_id, now).await?;
        let pauses = self.repo.list_pauses(&mut *tx, reservation_id).await?;

        let elapsed = clock::elapsed_minutes(reservation_id, reservation.started_at, now, &pauses);

        // Leituras de catálogo na mesma transação: nenhuma segunda conexão
        // é adquirida enquanto o lock da reserva está de pé.
        let room = self
            .room_repo
            .get_room(&mut *tx, institution_id, reservation.room_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Quarto",
                id: reservation.room_id,
            })?;
        let category = self
            .room_repo
            .get_category(&mut *tx, institution_id, room.category_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Categoria",
                id: room.category_id,
            })?;
        let promotion = match reservation.promotion_id {
            Some(id) => self.promotion_repo.get(&mut *tx, institution_id, id).await?,
            None => None,
        };

        let quote = tariff::resolve_rate(
            &category,
            promotion.as_ref(),
            reservation.started_at,
            i64::from(reservation.contracted_minutes),
            elapsed,
            &self.billing,
        );

        let charged = quote.total - cmd.discount;
        let payment = self
            .closure_service
            .attach_payment(
                &mut tx,
                institution_id,
                PaymentDraft {
                    reservation_id: Some(reservation_id),
                    pawn_id: None,
                    description: format!("Liquidação quarto {}", room.number),
                    cash_amount: cmd.cash_amount,
                    card_amount: cmd.card_amount,
                    virtual_amount: cmd.virtual_amount,
                    discount: cmd.discount,
                    total_amount: charged,
                    card_reference: cmd.card_reference.clone(),
                },
            )
            .await?;

        self.repo
            .set_settled(&mut *tx, reservation_id, payment.id, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation_id,
            payment_id = %payment.id,
            total = %charged,
            "Reserva liquidada"
        );
        self.emit_room_event(reservation.room_id, "Quarto liberado");

        Ok((payment, quote))
    }

    /// Visão de detalhe: reserva + relógio + cotação no instante `now`.
    pub async fn detail(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ReservationDetail, AppError> {
        let reservation = self
            .repo
            .get(institution_id, reservation_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Reserva",
                id: reservation_id,
            })?;

        // Reserva liquidada congela relógio e cotação no instante do settle
        let at = settlement_instant(&reservation, now);

        let pauses = self.repo.list_pauses(&self.pool, reservation_id).await?;
        let snapshot = clock::snapshot(
            reservation_id,
            reservation.started_at,
            at,
            i64::from(reservation.contracted_minutes),
            &pauses,
        );
        let quote = self.quote_for(&reservation, at).await?;

        Ok(ReservationDetail {
            reservation,
            clock: snapshot,
            quote,
        })
    }

    /// Recomputa o status ao vivo de todos os quartos ocupados da
    /// instituição. Usado pelo loop de monitoração e pela consulta direta.
    pub async fn live_room_status(
        &self,
        institution_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<RoomStatus>, AppError> {
        let reservations = self.repo.list_live(institution_id).await?;
        let mut statuses = Vec::with_capacity(reservations.len());

        for reservation in reservations {
            let pauses = self.repo.list_pauses(&self.pool, reservation.id).await?;
            let snapshot = clock::snapshot(
                reservation.id,
                reservation.started_at,
                now,
                i64::from(reservation.contracted_minutes),
                &pauses,
            );
            statuses.push(RoomStatus {
                room_id: reservation.room_id,
                reservation_id: reservation.id,
                state: reservation.state,
                clock: snapshot,
            });
        }

        Ok(statuses)
    }

    async fn lock_or_not_found(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        institution_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Reservation, AppError> {
        self.repo
            .lock(&mut **tx, institution_id, reservation_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Reserva",
                id: reservation_id,
            })
    }

    async fn reload(
        &self,
        institution_id: Uuid,
        reservation_id: Uuid,
    ) -> Result<Reservation, AppError> {
        self.repo
            .get(institution_id, reservation_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Reserva",
                id: reservation_id,
            })
    }

    async fn closure_service_payment(
        &self,
        institution_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Payment, AppError> {
        self.closure_service
            .get_payment(institution_id, payment_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Pagamento",
                id: payment_id,
            })
    }

    async fn quote_for(
        &self,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> Result<RateQuote, AppError> {
        let room = self
            .room_repo
            .get_room(&self.pool, reservation.institution_id, reservation.room_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Quarto",
                id: reservation.room_id,
            })?;
        let category = self
            .room_repo
            .get_category(&self.pool, reservation.institution_id, room.category_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Categoria",
                id: room.category_id,
            })?;
        let promotion = match reservation.promotion_id {
            Some(id) => {
                self.promotion_repo
                    .get(&self.pool, reservation.institution_id, id)
                    .await?
            }
            None => None,
        };

        let pauses = self.repo.list_pauses(&self.pool, reservation.id).await?;
        let elapsed =
            clock::elapsed_minutes(reservation.id, reservation.started_at, now, &pauses);

        Ok(tariff::resolve_rate(
            &category,
            promotion.as_ref(),
            reservation.started_at,
            i64::from(reservation.contracted_minutes),
            elapsed,
            &self.billing,
        ))
    }

    /// Notificação best-effort: sem receptores não é erro; falha vira log.
    fn emit_room_event(&self, room_id: Uuid, message: &str) {
        let event = NotificationEvent {
            kind: EventKind::RoomStatusChanged,
            message: message.to_string(),
            data: serde_json::json!({ "roomId": room_id }),
        };
        if let Err(e) = self.events.send(event) {
            tracing::debug!("Nenhum receptor para evento de quarto: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn id() -> Uuid {
        Uuid::new_v4()
    }

    fn reservation(state: ReservationState, payment_id: Option<Uuid>) -> Reservation {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap();
        Reservation {
            id: id(),
            institution_id: id(),
            room_id: id(),
            visit_id: id(),
            promotion_id: None,
            started_at: t0,
            contracted_minutes: 120,
            is_advance_booking: false,
            state,
            cancel_reason: None,
            cancelled_at: None,
            settled_at: payment_id.map(|_| t0 + Duration::minutes(120)),
            payment_id,
            created_at: t0,
            updated_at: t0,
        }
    }

    #[test]
    fn pause_only_from_active() {
        assert!(ensure_transition(id(), ReservationState::Active, TransitionOp::Pause).is_ok());
        assert!(matches!(
            ensure_transition(id(), ReservationState::Paused, TransitionOp::Pause),
            Err(AppError::NotActive { .. })
        ));
        assert!(matches!(
            ensure_transition(id(), ReservationState::Cancelled, TransitionOp::Pause),
            Err(AppError::NotActive { .. })
        ));
    }

    #[test]
    fn resume_only_from_paused() {
        assert!(ensure_transition(id(), ReservationState::Paused, TransitionOp::Resume).is_ok());
        assert!(matches!(
            ensure_transition(id(), ReservationState::Active, TransitionOp::Resume),
            Err(AppError::NotPaused { .. })
        ));
    }

    #[test]
    fn extend_cancel_settle_from_live_states() {
        for state in [ReservationState::Active, ReservationState::Paused] {
            for op in [TransitionOp::Extend, TransitionOp::Cancel, TransitionOp::Settle] {
                assert!(ensure_transition(id(), state, op).is_ok());
            }
        }
    }

    #[test]
    fn settled_is_terminal_for_every_operation() {
        for op in [
            TransitionOp::Pause,
            TransitionOp::Resume,
            TransitionOp::Extend,
            TransitionOp::Cancel,
            TransitionOp::Settle,
        ] {
            assert!(matches!(
                ensure_transition(id(), ReservationState::Settled, op),
                Err(AppError::AlreadySettled { .. })
            ));
        }
    }

    #[test]
    fn resettle_resolves_to_the_original_payment() {
        let payment_id = id();
        let settled = reservation(ReservationState::Settled, Some(payment_id));

        // Toda nova tentativa devolve o mesmo pagamento; nunca uma segunda
        // cobrança
        assert_eq!(settled_payment(&settled).unwrap(), Some(payment_id));
        assert_eq!(settled_payment(&settled).unwrap(), Some(payment_id));
    }

    #[test]
    fn live_reservation_has_no_settled_payment() {
        for state in [
            ReservationState::Active,
            ReservationState::Paused,
            ReservationState::Cancelled,
        ] {
            let r = reservation(state, None);
            assert_eq!(settled_payment(&r).unwrap(), None);
        }
    }

    #[test]
    fn settled_without_payment_reference_is_an_internal_error() {
        let mut broken = reservation(ReservationState::Settled, Some(id()));
        broken.payment_id = None;

        assert!(matches!(
            settled_payment(&broken),
            Err(AppError::InternalServerError(_))
        ));
    }

    #[test]
    fn quote_instant_is_anchored_at_settlement() {
        let settled = reservation(ReservationState::Settled, Some(id()));
        let settled_at = settled.settled_at.unwrap();

        // Consultas posteriores não deslocam a cotação de uma reserva
        // liquidada
        let much_later = settled_at + Duration::hours(6);
        assert_eq!(settlement_instant(&settled, much_later), settled_at);

        let live = reservation(ReservationState::Active, None);
        let now = live.started_at + Duration::minutes(30);
        assert_eq!(settlement_instant(&live, now), now);
    }

    #[test]
    fn cancelled_rejects_further_transitions() {
        assert!(matches!(
            ensure_transition(id(), ReservationState::Cancelled, TransitionOp::Settle),
            Err(AppError::NotActive { .. })
        ));
        assert!(matches!(
            ensure_transition(id(), ReservationState::Cancelled, TransitionOp::Resume),
            Err(AppError::NotPaused { .. })
        ));
    }
}
