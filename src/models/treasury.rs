// src/models/treasury.rs
//
// Pagamentos, despesas e fechamento de caixa ("Cierre").

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "closure_state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClosureState {
    Open,
    Closed,
}

/// Evento de liquidação. Criado exatamente uma vez por reserva liquidada,
/// pagamento de empenho ou cobrança avulsa; nunca mutado depois.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub closure_id: Uuid,
    pub reservation_id: Option<Uuid>,
    pub pawn_id: Option<Uuid>,

    #[schema(example = "Liquidação quarto 101")]
    pub description: String,

    #[schema(example = "1500.00")]
    pub cash_amount: Decimal,
    #[schema(example = "0.00")]
    pub card_amount: Decimal,
    /// Fatura virtual (MontoBillVirt)
    #[schema(example = "0.00")]
    pub virtual_amount: Decimal,
    #[schema(example = "0.00")]
    pub discount: Decimal,
    /// Valor cobrado após desconto; invariante: cash + card + virtual == total
    #[schema(example = "1500.00")]
    pub total_amount: Decimal,

    pub card_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub closure_id: Uuid,

    #[schema(example = "Compra de material de limpeza")]
    pub description: String,

    #[schema(example = "85.00")]
    pub amount: Decimal,

    pub created_at: DateTime<Utc>,
}

/// Snapshot de um turno de caixa. Depois de Closed os totais são congelados;
/// recomputação é proibida.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CashClosure {
    pub id: Uuid,

    #[schema(ignore)]
    pub institution_id: Uuid,

    pub opened_by: Uuid,

    #[schema(example = "200.00")]
    pub opening_float: Decimal,

    pub state: ClosureState,

    pub total_cash: Option<Decimal>,
    pub total_card: Option<Decimal>,
    pub total_virtual: Option<Decimal>,
    pub total_expenses: Option<Decimal>,
    /// opening_float + total_cash - total_expenses
    pub expected_cash: Option<Decimal>,

    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Totais reconciliados de um fechamento.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosureTotals {
    #[schema(example = "3200.00")]
    pub total_cash: Decimal,
    #[schema(example = "1100.00")]
    pub total_card: Decimal,
    #[schema(example = "0.00")]
    pub total_virtual: Decimal,
    #[schema(example = "85.00")]
    pub total_expenses: Decimal,
    #[schema(example = "3315.00")]
    pub expected_cash: Decimal,
    /// Σ pagamentos − Σ despesas
    #[schema(example = "4215.00")]
    pub grand_total: Decimal,
}

/// Linha de auditoria de valor zero para reserva cancelada no turno: cada
/// slot de quarto do turno tem entrada correspondente, liquidado ou não.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelledAuditLine {
    pub reservation_id: Uuid,
    pub room_id: Uuid,
    pub cancel_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Relatório completo devolvido ao fechar o caixa.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClosureReport {
    pub closure: CashClosure,
    pub totals: ClosureTotals,
    pub payments: Vec<Payment>,
    pub expenses: Vec<Expense>,
    pub cancelled_lines: Vec<CancelledAuditLine>,
}
