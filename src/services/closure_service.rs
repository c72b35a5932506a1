// src/services/closure_service.rs
//
// Motor de reconciliação do fechamento de caixa ("Cierre"). Pagamentos são
// anexados ao caixa aberto no momento da criação; o Close congela os totais
// e qualquer divergência aborta a operação, nunca é ajustada em silêncio.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClosureRepository, ReservationRepository},
    models::treasury::{CashClosure, ClosureReport, ClosureState, ClosureTotals, Expense, Payment},
};

/// Dados de um pagamento a criar. O invariante
/// `cash + card + virtual == total` é verificado antes de persistir.
#[derive(Debug, Clone)]
pub struct PaymentDraft {
    pub reservation_id: Option<Uuid>,
    pub pawn_id: Option<Uuid>,
    pub description: String,
    pub cash_amount: Decimal,
    pub card_amount: Decimal,
    pub virtual_amount: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub card_reference: Option<String>,
}

impl PaymentDraft {
    pub fn split_sum(&self) -> Decimal {
        self.cash_amount + self.card_amount + self.virtual_amount
    }
}

/// A divisão por meio de pagamento tem que bater com o total cobrado,
/// centavo a centavo. Nenhum meio de pagamento pode ser negativo: um tender
/// negativo compensado por outro passaria na soma mas distorceria os totais
/// por meio no fechamento.
pub fn validate_split(draft: &PaymentDraft) -> Result<(), AppError> {
    for (field, amount) in [
        ("cashAmount", draft.cash_amount),
        ("cardAmount", draft.card_amount),
        ("virtualAmount", draft.virtual_amount),
        ("discount", draft.discount),
    ] {
        if amount < Decimal::ZERO {
            return Err(AppError::InvalidAmount { field, amount });
        }
    }

    let received = draft.split_sum();
    if received != draft.total_amount {
        return Err(AppError::PaymentSplitMismatch {
            expected: draft.total_amount,
            received,
        });
    }
    Ok(())
}

/// Totais congelados no Close; `None` enquanto o caixa está aberto.
/// Depois de fechado os totais nunca são recomputados.
pub fn frozen_totals(closure: &CashClosure) -> Option<ClosureTotals> {
    let total_cash = closure.total_cash?;
    let total_card = closure.total_card?;
    let total_virtual = closure.total_virtual?;
    let total_expenses = closure.total_expenses?;
    let expected_cash = closure.expected_cash?;

    Some(ClosureTotals {
        total_cash,
        total_card,
        total_virtual,
        total_expenses,
        expected_cash,
        // Invariante de reconciliação: Σ tenders == Σ pagamentos
        grand_total: total_cash + total_card + total_virtual - total_expenses,
    })
}

/// Início da janela de auditoria do turno: o fim do turno anterior. Um
/// cancelamento entre o fechamento de um caixa e a abertura do próximo cai
/// na janela do próximo, nunca fora de todas.
pub fn audit_window_start(previous_closed_at: Option<DateTime<Utc>>) -> DateTime<Utc> {
    previous_closed_at.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Fechamento fechado é imutável: nem despesas novas, nem segundo Close.
pub fn ensure_open(closure: &CashClosure) -> Result<(), AppError> {
    if closure.state == ClosureState::Closed {
        return Err(AppError::ClosureAlreadyClosed {
            closure_id: closure.id,
        });
    }
    Ok(())
}

/// Reconcilia os totais de um fechamento. Falha com mismatch se qualquer
/// pagamento tiver divisão inconsistente ou se os agregados não baterem com
/// a soma dos pagamentos.
pub fn reconcile(
    closure_id: Uuid,
    opening_float: Decimal,
    payments: &[Payment],
    expenses: &[Expense],
) -> Result<ClosureTotals, AppError> {
    let mut total_cash = Decimal::ZERO;
    let mut total_card = Decimal::ZERO;
    let mut total_virtual = Decimal::ZERO;

    for payment in payments {
        let split = payment.cash_amount + payment.card_amount + payment.virtual_amount;
        if split != payment.total_amount {
            return Err(AppError::ReconciliationMismatch {
                closure_id,
                expected: payment.total_amount,
                actual: split,
            });
        }
        total_cash += payment.cash_amount;
        total_card += payment.card_amount;
        total_virtual += payment.virtual_amount;
    }

    let payments_total: Decimal = payments.iter().map(|p| p.total_amount).sum();
    let aggregate = total_cash + total_card + total_virtual;
    if aggregate != payments_total {
        return Err(AppError::ReconciliationMismatch {
            closure_id,
            expected: payments_total,
            actual: aggregate,
        });
    }

    let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();

    Ok(ClosureTotals {
        total_cash,
        total_card,
        total_virtual,
        total_expenses,
        expected_cash: opening_float + total_cash - total_expenses,
        grand_total: payments_total - total_expenses,
    })
}

#[derive(Clone)]
pub struct ClosureService {
    pool: PgPool,
    repo: ClosureRepository,
    reservation_repo: ReservationRepository,
}

impl ClosureService {
    pub fn new(pool: PgPool, repo: ClosureRepository, reservation_repo: ReservationRepository) -> Self {
        Self {
            pool,
            repo,
            reservation_repo,
        }
    }

    /// Abre o turno com o fundo de troco inicial. No máximo um caixa aberto
    /// por instituição (o índice parcial no banco é a segunda linha de defesa).
    pub async fn open(
        &self,
        institution_id: Uuid,
        opened_by: Uuid,
        opening_float: Decimal,
    ) -> Result<CashClosure, AppError> {
        if opening_float < Decimal::ZERO {
            return Err(AppError::InvalidAmount {
                field: "openingFloat",
                amount: opening_float,
            });
        }
        if self.repo.find_open(institution_id).await?.is_some() {
            return Err(AppError::ClosureAlreadyOpen);
        }

        let closure = self
            .repo
            .insert_closure(institution_id, opened_by, opening_float)
            .await?;

        tracing::info!(closure_id = %closure.id, "Caixa aberto");
        Ok(closure)
    }

    /// Cria um pagamento contra o caixa aberto, dentro da transação do
    /// chamador. É o único caminho de criação de pagamentos.
    pub async fn attach_payment(
        &self,
        conn: &mut PgConnection,
        institution_id: Uuid,
        draft: PaymentDraft,
    ) -> Result<Payment, AppError> {
        validate_split(&draft)?;

        let closure = self
            .repo
            .lock_open(&mut *conn, institution_id)
            .await?
            .ok_or(AppError::NoOpenClosure)?;

        self.repo
            .insert_payment(
                &mut *conn,
                institution_id,
                closure.id,
                draft.reservation_id,
                draft.pawn_id,
                &draft.description,
                draft.cash_amount,
                draft.card_amount,
                draft.virtual_amount,
                draft.discount,
                draft.total_amount,
                draft.card_reference.as_deref(),
            )
            .await
    }

    pub async fn get_payment(
        &self,
        institution_id: Uuid,
        payment_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        self.repo.get_payment(institution_id, payment_id).await
    }

    pub async fn add_expense(
        &self,
        institution_id: Uuid,
        closure_id: Uuid,
        description: &str,
        amount: Decimal,
    ) -> Result<Expense, AppError> {
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount {
                field: "amount",
                amount,
            });
        }
        let closure = self
            .repo
            .get(institution_id, closure_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Fechamento",
                id: closure_id,
            })?;

        ensure_open(&closure)?;

        self.repo
            .insert_expense(&self.pool, institution_id, closure_id, description, amount)
            .await
    }

    /// Fecha o turno: agrega pagamentos, subtrai despesas, dobra as reservas
    /// canceladas do período como linhas de valor zero e congela os totais.
    /// Re-entrada falha com ClosureAlreadyClosed e não altera nada.
    pub async fn close(
        &self,
        institution_id: Uuid,
        closure_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClosureReport, AppError> {
        let mut tx = self.pool.begin().await?;

        let closure = self
            .repo
            .lock(&mut *tx, institution_id, closure_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Fechamento",
                id: closure_id,
            })?;

        ensure_open(&closure)?;

        let payments = self.repo.list_payments(&mut *tx, closure_id).await?;
        let expenses = self.repo.list_expenses(&mut *tx, closure_id).await?;
        let previous = self
            .repo
            .last_closed_before(&mut *tx, institution_id, closure.opened_at)
            .await?;
        let cancelled_lines = self
            .reservation_repo
            .list_cancelled_between(&mut *tx, institution_id, audit_window_start(previous), now)
            .await?;

        // Qualquer mismatch aborta aqui; a transação sofre rollback no drop.
        let totals = reconcile(closure_id, closure.opening_float, &payments, &expenses)?;

        let closure = self.repo.finalize(&mut *tx, closure_id, &totals, now).await?;
        tx.commit().await?;

        tracing::info!(
            closure_id = %closure_id,
            grand_total = %totals.grand_total,
            "Caixa fechado e reconciliado"
        );

        Ok(ClosureReport {
            closure,
            totals,
            payments,
            expenses,
            cancelled_lines,
        })
    }

    /// Relatório de leitura: para caixa aberto os totais são um preview
    /// recomputado; para caixa fechado refletem o snapshot congelado.
    pub async fn report(
        &self,
        institution_id: Uuid,
        closure_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClosureReport, AppError> {
        let closure = self
            .repo
            .get(institution_id, closure_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Fechamento",
                id: closure_id,
            })?;

        let payments = self.repo.list_payments(&self.pool, closure_id).await?;
        let expenses = self.repo.list_expenses(&self.pool, closure_id).await?;
        let previous = self
            .repo
            .last_closed_before(&self.pool, institution_id, closure.opened_at)
            .await?;
        let window_end = closure.closed_at.unwrap_or(now);
        let cancelled_lines = self
            .reservation_repo
            .list_cancelled_between(
                &self.pool,
                institution_id,
                audit_window_start(previous),
                window_end,
            )
            .await?;

        // Caixa fechado devolve o snapshot congelado; só o preview de caixa
        // aberto recomputa.
        let totals = match frozen_totals(&closure) {
            Some(totals) => totals,
            None => reconcile(closure_id, closure.opening_float, &payments, &expenses)?,
        };

        Ok(ClosureReport {
            closure,
            totals,
            payments,
            expenses,
            cancelled_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn payment(cash: i64, card: i64, virt: i64, total: i64) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            closure_id: Uuid::new_v4(),
            reservation_id: None,
            pawn_id: None,
            description: "teste".into(),
            cash_amount: dec(cash),
            card_amount: dec(card),
            virtual_amount: dec(virt),
            discount: Decimal::ZERO,
            total_amount: dec(total),
            card_reference: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
        }
    }

    fn expense(amount: i64) -> Expense {
        Expense {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            closure_id: Uuid::new_v4(),
            description: "despesa".into(),
            amount: dec(amount),
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn reconcile_sums_per_tender_and_subtracts_expenses() {
        let payments = vec![
            payment(1000, 0, 0, 1000),
            payment(500, 700, 0, 1200),
            payment(0, 0, 300, 300),
        ];
        let expenses = vec![expense(85), expense(15)];

        let totals = reconcile(Uuid::new_v4(), dec(200), &payments, &expenses).unwrap();

        assert_eq!(totals.total_cash, dec(1500));
        assert_eq!(totals.total_card, dec(700));
        assert_eq!(totals.total_virtual, dec(300));
        assert_eq!(totals.total_expenses, dec(100));
        // fundo de troco + dinheiro - despesas
        assert_eq!(totals.expected_cash, dec(1600));
        // Σ pagamentos - Σ despesas
        assert_eq!(totals.grand_total, dec(2400));
    }

    #[test]
    fn reconcile_of_empty_shift_is_just_the_float() {
        let totals = reconcile(Uuid::new_v4(), dec(200), &[], &[]).unwrap();
        assert_eq!(totals.expected_cash, dec(200));
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }

    #[test]
    fn inconsistent_payment_split_is_fatal() {
        // 900 + 0 + 0 != 1000: nunca ajustar em silêncio
        let payments = vec![payment(900, 0, 0, 1000)];
        let closure_id = Uuid::new_v4();

        let err = reconcile(closure_id, dec(0), &payments, &[]).unwrap_err();
        match err {
            AppError::ReconciliationMismatch { closure_id: id, expected, actual } => {
                assert_eq!(id, closure_id);
                assert_eq!(expected, dec(1000));
                assert_eq!(actual, dec(900));
            }
            other => panic!("esperava ReconciliationMismatch, veio {:?}", other),
        }
    }

    #[test]
    fn reconcile_is_exact_with_cents() {
        let mut p = payment(0, 0, 0, 0);
        p.cash_amount = Decimal::new(10050, 2); // 100.50
        p.card_amount = Decimal::new(4999, 2); // 49.99
        p.total_amount = Decimal::new(15049, 2); // 150.49

        let totals = reconcile(Uuid::new_v4(), Decimal::ZERO, &[p], &[]).unwrap();
        assert_eq!(totals.grand_total, Decimal::new(15049, 2));
    }

    #[test]
    fn closed_closure_rejects_further_mutation() {
        let mut closure = CashClosure {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            opened_by: Uuid::new_v4(),
            opening_float: dec(200),
            state: ClosureState::Open,
            total_cash: None,
            total_card: None,
            total_virtual: None,
            total_expenses: None,
            expected_cash: None,
            opened_at: Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap(),
            closed_at: None,
        };
        assert!(ensure_open(&closure).is_ok());

        closure.state = ClosureState::Closed;
        assert!(matches!(
            ensure_open(&closure),
            Err(AppError::ClosureAlreadyClosed { .. })
        ));
    }

    #[test]
    fn negative_tender_is_rejected_even_when_the_sum_matches() {
        // -500 + 2000 = 1500 bate com o total, mas distorceria os totais
        // por meio de pagamento no fechamento
        let draft = PaymentDraft {
            reservation_id: None,
            pawn_id: None,
            description: "x".into(),
            cash_amount: dec(-500),
            card_amount: dec(2000),
            virtual_amount: Decimal::ZERO,
            discount: Decimal::ZERO,
            total_amount: dec(1500),
            card_reference: None,
        };

        match validate_split(&draft).unwrap_err() {
            AppError::InvalidAmount { field, amount } => {
                assert_eq!(field, "cashAmount");
                assert_eq!(amount, dec(-500));
            }
            other => panic!("esperava InvalidAmount, veio {:?}", other),
        }
    }

    #[test]
    fn negative_discount_is_rejected() {
        let draft = PaymentDraft {
            reservation_id: None,
            pawn_id: None,
            description: "x".into(),
            cash_amount: dec(1000),
            card_amount: Decimal::ZERO,
            virtual_amount: Decimal::ZERO,
            discount: dec(-100),
            total_amount: dec(1000),
            card_reference: None,
        };

        assert!(matches!(
            validate_split(&draft),
            Err(AppError::InvalidAmount { field: "discount", .. })
        ));
    }

    fn closed_closure() -> CashClosure {
        CashClosure {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            opened_by: Uuid::new_v4(),
            opening_float: dec(200),
            state: ClosureState::Closed,
            total_cash: Some(dec(1500)),
            total_card: Some(dec(700)),
            total_virtual: Some(dec(300)),
            total_expenses: Some(dec(100)),
            expected_cash: Some(dec(1600)),
            opened_at: Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap(),
            closed_at: Some(Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap()),
        }
    }

    #[test]
    fn closed_closure_reports_the_frozen_snapshot() {
        let totals = frozen_totals(&closed_closure()).unwrap();
        assert_eq!(totals.total_cash, dec(1500));
        assert_eq!(totals.expected_cash, dec(1600));
        assert_eq!(totals.grand_total, dec(2400));
    }

    #[test]
    fn open_closure_has_no_frozen_snapshot() {
        let mut closure = closed_closure();
        closure.state = ClosureState::Open;
        closure.total_cash = None;
        closure.total_card = None;
        closure.total_virtual = None;
        closure.total_expenses = None;
        closure.expected_cash = None;
        closure.closed_at = None;

        assert!(frozen_totals(&closure).is_none());
    }

    #[test]
    fn audit_window_starts_at_previous_close_or_the_beginning_of_time() {
        let boundary = Utc.with_ymd_and_hms(2026, 3, 13, 22, 0, 0).unwrap();
        assert_eq!(audit_window_start(Some(boundary)), boundary);
        // Primeiro turno da instituição: nenhum cancelamento fica de fora
        assert_eq!(audit_window_start(None), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn validate_split_accepts_exact_and_rejects_off_by_one_cent() {
        let mut draft = PaymentDraft {
            reservation_id: None,
            pawn_id: None,
            description: "x".into(),
            cash_amount: Decimal::new(10000, 2),
            card_amount: Decimal::new(5000, 2),
            virtual_amount: Decimal::ZERO,
            discount: Decimal::ZERO,
            total_amount: Decimal::new(15000, 2),
            card_reference: None,
        };
        assert!(validate_split(&draft).is_ok());

        draft.total_amount = Decimal::new(15001, 2);
        assert!(matches!(
            validate_split(&draft),
            Err(AppError::PaymentSplitMismatch { .. })
        ));
    }
}
