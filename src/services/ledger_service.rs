// src/services/ledger_service.rs
//
// Livro de consumos e empenhos de uma visita. Linhas são imutáveis depois
// de criadas; "editar" é cancelar com motivo e lançar de novo. O resumo da
// visita é sempre recomputado das linhas ativas, nunca mantido em cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::BillingConfig,
    db::{LedgerRepository, ReservationRepository, VisitRepository},
    models::{
        ledger::{Consumption, ConsumptionState, Pawn, PawnState, VisitSummary},
        treasury::Payment,
        visits::VisitState,
    },
    services::closure_service::{ClosureService, PaymentDraft},
};

#[derive(Debug, Clone)]
pub struct AddConsumption {
    pub visit_id: Uuid,
    pub room_id: Option<Uuid>,
    pub article_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_room_charge: bool,
}

#[derive(Debug, Clone)]
pub struct PayPawn {
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    pub virtual_amount: Decimal,
    pub card_reference: Option<String>,
}

/// Linha do livro só entra com quantidade positiva e preço não negativo;
/// rejeitada antes de qualquer escrita.
pub fn validate_line(quantity: Decimal, unit_price: Decimal) -> Result<(), AppError> {
    if quantity <= Decimal::ZERO {
        return Err(AppError::InvalidAmount {
            field: "quantity",
            amount: quantity,
        });
    }
    if unit_price < Decimal::ZERO {
        return Err(AppError::InvalidAmount {
            field: "unitPrice",
            amount: unit_price,
        });
    }
    Ok(())
}

/// Soma as linhas ativas da visita, separando conta do quarto dos extras.
/// Linhas anuladas não contam.
pub fn summarize(visit_id: Uuid, consumptions: &[Consumption]) -> VisitSummary {
    let mut room_total = Decimal::ZERO;
    let mut extras_total = Decimal::ZERO;

    for line in consumptions {
        if line.state != ConsumptionState::Active {
            continue;
        }
        let amount = line.quantity * line.unit_price;
        if line.is_room_charge {
            room_total += amount;
        } else {
            extras_total += amount;
        }
    }

    VisitSummary {
        visit_id,
        room_total,
        extras_total,
        grand_total: room_total + extras_total,
    }
}

#[derive(Clone)]
pub struct LedgerService {
    pool: sqlx::PgPool,
    repo: LedgerRepository,
    visit_repo: VisitRepository,
    reservation_repo: ReservationRepository,
    closure_service: ClosureService,
    billing: BillingConfig,
}

impl LedgerService {
    pub fn new(
        pool: sqlx::PgPool,
        repo: LedgerRepository,
        visit_repo: VisitRepository,
        reservation_repo: ReservationRepository,
        closure_service: ClosureService,
        billing: BillingConfig,
    ) -> Self {
        Self {
            pool,
            repo,
            visit_repo,
            reservation_repo,
            closure_service,
            billing,
        }
    }

    /// Lança um consumo contra a visita. Por padrão a visita precisa estar
    /// ativa e sem reserva já encerrada; a política pós-checkout
    /// configurável relaxa só a segunda condição.
    pub async fn add_consumption(
        &self,
        institution_id: Uuid,
        cmd: AddConsumption,
    ) -> Result<Consumption, AppError> {
        validate_line(cmd.quantity, cmd.unit_price)?;

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

        if !self.billing.allow_post_checkout_charges {
            let latest = self
                .reservation_repo
                .latest_state_by_visit(cmd.visit_id)
                .await?;
            if latest.is_some_and(|state| !state.is_live()) {
                return Err(AppError::VisitNotActive {
                    visit_id: cmd.visit_id,
                });
            }
        }

        let consumption = self
            .repo
            .insert_consumption(
                &self.pool,
                institution_id,
                cmd.visit_id,
                cmd.room_id,
                cmd.article_id,
                cmd.quantity,
                cmd.unit_price,
                cmd.is_room_charge,
            )
            .await?;

        tracing::info!(
            consumption_id = %consumption.id,
            visit_id = %cmd.visit_id,
            "Consumo lançado"
        );
        Ok(consumption)
    }

    /// Cancelamento suave com motivo. Linha já anulada conflita.
    pub async fn cancel_consumption(
        &self,
        institution_id: Uuid,
        consumption_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Consumption, AppError> {
        let affected = self
            .repo
            .annul_consumption(institution_id, consumption_id, reason, now)
            .await?;

        if affected == 0 {
            // Distingue linha inexistente de linha já anulada.
            return match self.repo.get_consumption(institution_id, consumption_id).await? {
                Some(_) => Err(AppError::ConsumptionNotActive { consumption_id }),
                None => Err(AppError::NotFound {
                    entity: "Consumo",
                    id: consumption_id,
                }),
            };
        }

        self.repo
            .get_consumption(institution_id, consumption_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Consumo",
                id: consumption_id,
            })
    }

    pub async fn list_by_visit(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
    ) -> Result<Vec<Consumption>, AppError> {
        self.repo.list_by_visit(institution_id, visit_id).await
    }

    pub async fn summarize_by_visit(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
    ) -> Result<VisitSummary, AppError> {
        self.visit_repo
            .get(institution_id, visit_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Visita",
                id: visit_id,
            })?;

        let consumptions = self.repo.list_by_visit(institution_id, visit_id).await?;
        Ok(summarize(visit_id, &consumptions))
    }

    pub async fn create_pawn(
        &self,
        institution_id: Uuid,
        visit_id: Uuid,
        description: &str,
        amount: Decimal,
    ) -> Result<Pawn, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount {
                field: "amount",
                amount,
            });
        }
        let visit = self
            .visit_repo
            .get(institution_id, visit_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Visita",
                id: visit_id,
            })?;
        if visit.state != VisitState::Active {
            return Err(AppError::VisitNotActive { visit_id });
        }

        self.repo
            .insert_pawn(institution_id, visit_id, description, amount)
            .await
    }

    pub async fn get_pawn(
        &self,
        institution_id: Uuid,
        pawn_id: Uuid,
    ) -> Result<Pawn, AppError> {
        self.repo
            .get_pawn(institution_id, pawn_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Empenho",
                id: pawn_id,
            })
    }

    /// Resgate do empenho: cria o pagamento no caixa aberto e marca Paid na
    /// mesma transação. Re-pagar um empenho já Paid devolve o pagamento
    /// original (idempotente); Annulled conflita.
    pub async fn pay_pawn(
        &self,
        institution_id: Uuid,
        pawn_id: Uuid,
        cmd: PayPawn,
    ) -> Result<Payment, AppError> {
        let mut tx = self.pool.begin().await?;

        let pawn = self
            .repo
            .lock_pawn(&mut *tx, institution_id, pawn_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Empenho",
                id: pawn_id,
            })?;

        match pawn.state {
            PawnState::Paid => {
                let payment_id = pawn.payment_id.ok_or_else(|| {
                    anyhow::anyhow!("Empenho {} pago sem payment_id", pawn_id)
                })?;
                return self
                    .closure_service
                    .get_payment(institution_id, payment_id)
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: "Pagamento",
                        id: payment_id,
                    });
            }
            PawnState::Annulled => {
                return Err(AppError::PawnNotPending {
                    pawn_id,
                    state: pawn.state,
                });
            }
            PawnState::Pending => {}
        }

        let payment = self
            .closure_service
            .attach_payment(
                &mut tx,
                institution_id,
                PaymentDraft {
                    reservation_id: None,
                    pawn_id: Some(pawn_id),
                    description: format!("Resgate de empenho: {}", pawn.description),
                    cash_amount: cmd.cash_amount,
                    card_amount: cmd.card_amount,
                    virtual_amount: cmd.virtual_amount,
                    discount: Decimal::ZERO,
                    total_amount: pawn.amount,
                    card_reference: cmd.card_reference.clone(),
                },
            )
            .await?;

        self.repo.set_pawn_paid(&mut *tx, pawn_id, payment.id).await?;
        tx.commit().await?;

        tracing::info!(pawn_id = %pawn_id, payment_id = %payment.id, "Empenho resgatado");
        Ok(payment)
    }

    /// Anula o empenho mantendo o vínculo com eventual pagamento.
    pub async fn annul_pawn(
        &self,
        institution_id: Uuid,
        pawn_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Pawn, AppError> {
        let mut tx = self.pool.begin().await?;

        let pawn = self
            .repo
            .lock_pawn(&mut *tx, institution_id, pawn_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Empenho",
                id: pawn_id,
            })?;

        if pawn.state == PawnState::Annulled {
            return Err(AppError::PawnNotPending {
                pawn_id,
                state: pawn.state,
            });
        }

        self.repo.set_pawn_annulled(&mut *tx, pawn_id, reason, now).await?;
        tx.commit().await?;

        self.get_pawn(institution_id, pawn_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn line(quantity: i64, unit_price: i64, is_room_charge: bool, state: ConsumptionState) -> Consumption {
        Consumption {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            visit_id: Uuid::new_v4(),
            room_id: None,
            article_id: Uuid::new_v4(),
            quantity: Decimal::from(quantity),
            unit_price: Decimal::from(unit_price),
            is_room_charge,
            state,
            annul_reason: None,
            annulled_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn summarize_splits_room_charges_from_extras() {
        let visit_id = Uuid::new_v4();
        let lines = vec![
            line(2, 35, true, ConsumptionState::Active),  // 70 no quarto
            line(3, 40, false, ConsumptionState::Active), // 120 extras
        ];

        let summary = summarize(visit_id, &lines);
        assert_eq!(summary.room_total, Decimal::from(70));
        assert_eq!(summary.extras_total, Decimal::from(120));
        assert_eq!(summary.grand_total, Decimal::from(190));
    }

    #[test]
    fn summarize_ignores_annulled_lines() {
        let visit_id = Uuid::new_v4();
        let lines = vec![
            line(1, 100, true, ConsumptionState::Active),
            line(5, 999, true, ConsumptionState::Annulled),
            line(5, 999, false, ConsumptionState::Annulled),
        ];

        let summary = summarize(visit_id, &lines);
        assert_eq!(summary.room_total, Decimal::from(100));
        assert_eq!(summary.extras_total, Decimal::ZERO);
        assert_eq!(summary.grand_total, Decimal::from(100));
    }

    #[test]
    fn summarize_of_empty_ledger_is_zero() {
        let summary = summarize(Uuid::new_v4(), &[]);
        assert_eq!(summary.grand_total, Decimal::ZERO);
    }

    #[test]
    fn line_with_negative_or_zero_quantity_is_rejected() {
        let err = validate_line(Decimal::from(-2), Decimal::from(35)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidAmount { field: "quantity", .. }
        ));

        let err = validate_line(Decimal::ZERO, Decimal::from(35)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidAmount { field: "quantity", .. }
        ));
    }

    #[test]
    fn line_with_negative_unit_price_is_rejected() {
        let err = validate_line(Decimal::ONE, Decimal::from(-10)).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidAmount { field: "unitPrice", .. }
        ));

        // Preço zero é cortesia, não erro
        assert!(validate_line(Decimal::ONE, Decimal::ZERO).is_ok());
    }

    #[test]
    fn summarize_multiplies_fractional_quantity() {
        let visit_id = Uuid::new_v4();
        let mut l = line(0, 0, false, ConsumptionState::Active);
        l.quantity = Decimal::new(15, 1); // 1.5
        l.unit_price = Decimal::new(3550, 2); // 35.50

        let summary = summarize(visit_id, &[l]);
        assert_eq!(summary.extras_total, Decimal::new(5325, 2)); // 53.25
    }
}
