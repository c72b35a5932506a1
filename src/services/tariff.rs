// src/services/tariff.rs
//
// Resolutor de tarifa: categoria + promoção opcional + tempo decorrido →
// valor cobrável. Promoção inválida degrada para a tarifa normal com
// warning; nunca bloqueia a reserva.

use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    config::BillingConfig,
    models::{catalog::RoomCategory, promotions::Promotion},
};

const MINUTES_PER_HOUR: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum TariffWarning {
    PromotionInactive,
    PromotionCategoryMismatch,
    PromotionOutsideWindow,
}

/// Resultado da resolução de tarifa para uma reserva.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    /// Valor pelos minutos contratados
    #[schema(example = "2000.00")]
    pub base_amount: Decimal,
    /// Valor pelos minutos além do contratado
    #[schema(example = "500.00")]
    pub overtime_amount: Decimal,
    #[schema(example = "2500.00")]
    pub total: Decimal,
    pub promotion_applied: bool,
    pub warning: Option<TariffWarning>,
}

/// Janela de preço especial por hora do dia; pode atravessar a meia-noite.
/// start == end significa janela vazia (preço especial nunca se aplica).
fn in_special_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        return false;
    }
    if start < end {
        time >= start && time < end
    } else {
        time >= start || time < end
    }
}

fn validate_promotion(
    promotion: &Promotion,
    category_id: uuid::Uuid,
    start: DateTime<Utc>,
) -> Result<(), TariffWarning> {
    if !promotion.is_active {
        return Err(TariffWarning::PromotionInactive);
    }
    if promotion.category_id != category_id {
        return Err(TariffWarning::PromotionCategoryMismatch);
    }
    if start < promotion.valid_from || start > promotion.valid_to {
        return Err(TariffWarning::PromotionOutsideWindow);
    }
    Ok(())
}

fn prorated(hourly_rate: Decimal, minutes: i64) -> Decimal {
    hourly_rate * Decimal::from(minutes) / Decimal::from(MINUTES_PER_HOUR)
}

/// Resolve a tarifa de uma reserva.
///
/// - Promoção válida (categoria igual, ativa, início dentro da janela)
///   substitui o preço da categoria: a tarifa fixa cobre `hours_covered`;
///   minutos contratados além disso saem ao preço-hora da categoria.
/// - Fora de promoção vale o preço especial quando o início cai na janela
///   configurada, senão o preço normal.
/// - Overtime cobra por unidade de tempo *iniciada*; unidade e valor vêm da
///   configuração, nunca são fixos no código.
pub fn resolve_rate(
    category: &RoomCategory,
    promotion: Option<&Promotion>,
    start: DateTime<Utc>,
    contracted_minutes: i64,
    elapsed_minutes: i64,
    config: &BillingConfig,
) -> RateQuote {
    let hourly = if in_special_window(
        start.time(),
        config.special_price_start,
        config.special_price_end,
    ) {
        category.special_price
    } else {
        category.normal_price
    };

    let mut warning = None;
    let mut promotion_applied = false;

    let base_amount = match promotion {
        Some(promo) => match validate_promotion(promo, category.id, start) {
            Ok(()) => {
                promotion_applied = true;
                let covered_minutes = i64::from(promo.hours_covered) * MINUTES_PER_HOUR;
                if contracted_minutes <= covered_minutes {
                    promo.rate
                } else {
                    promo.rate + prorated(hourly, contracted_minutes - covered_minutes)
                }
            }
            Err(reason) => {
                // Degrada para a tarifa normal e sinaliza; o caller exibe o
                // aviso sem bloquear a reserva.
                tracing::warn!(
                    promotion_id = %promo.id,
                    category_id = %category.id,
                    ?reason,
                    "Promoção rejeitada; aplicando tarifa da categoria"
                );
                warning = Some(reason);
                prorated(hourly, contracted_minutes)
            }
        },
        None => prorated(hourly, contracted_minutes),
    };

    let overtime_minutes = (elapsed_minutes - contracted_minutes).max(0);
    let overtime_amount = if overtime_minutes > 0 {
        let unit = config.overtime_unit_minutes.max(1);
        // Unidade iniciada conta inteira
        let units = (overtime_minutes as u64).div_ceil(unit as u64);
        config.overtime_rate_per_unit * Decimal::from(units)
    } else {
        Decimal::ZERO
    };

    let base_amount = base_amount.round_dp(2);
    let overtime_amount = overtime_amount.round_dp(2);

    RateQuote {
        base_amount,
        overtime_amount,
        total: base_amount + overtime_amount,
        promotion_applied,
        warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 15, 0, 0).unwrap()
    }

    fn category(normal: i64, special: i64) -> RoomCategory {
        RoomCategory {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            name: "Standard".into(),
            normal_price: Decimal::from(normal),
            special_price: Decimal::from(special),
            is_active: true,
            created_at: t0(),
        }
    }

    fn promotion(category_id: Uuid, rate: i64, hours: i32) -> Promotion {
        Promotion {
            id: Uuid::new_v4(),
            institution_id: Uuid::new_v4(),
            category_id,
            name: "Happy Hour".into(),
            rate: Decimal::from(rate),
            hours_covered: hours,
            valid_from: t0() - Duration::days(1),
            valid_to: t0() + Duration::days(1),
            is_active: true,
            created_at: t0(),
        }
    }

    fn config() -> BillingConfig {
        BillingConfig {
            overtime_unit_minutes: 30,
            overtime_rate_per_unit: Decimal::from(250),
            cancellation_fee: Decimal::ZERO,
            allow_post_checkout_charges: false,
            special_price_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            special_price_end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
        }
    }

    #[test]
    fn normal_rate_prorated_by_contracted_minutes() {
        let quote = resolve_rate(&category(1000, 800), None, t0(), 90, 60, &config());
        assert_eq!(quote.base_amount, Decimal::from(1500));
        assert_eq!(quote.overtime_amount, Decimal::ZERO);
        assert_eq!(quote.total, Decimal::from(1500));
        assert!(!quote.promotion_applied);
        assert!(quote.warning.is_none());
    }

    #[test]
    fn valid_promotion_overrides_category_price() {
        // "Happy Hour" 1500 fixo, válida [T-1d, T+1d] → 1500 independente
        // do preço normal da categoria.
        let cat = category(9999, 9999);
        let promo = promotion(cat.id, 1500, 2);
        let quote = resolve_rate(&cat, Some(&promo), t0(), 120, 120, &config());

        assert!(quote.promotion_applied);
        assert_eq!(quote.base_amount, Decimal::from(1500));
        assert_eq!(quote.total, Decimal::from(1500));
    }

    #[test]
    fn contracted_time_beyond_promotion_bills_hourly() {
        let cat = category(1000, 800);
        let promo = promotion(cat.id, 1500, 2);
        // 3h contratadas: 2h na promoção + 1h ao preço normal
        let quote = resolve_rate(&cat, Some(&promo), t0(), 180, 0, &config());
        assert_eq!(quote.base_amount, Decimal::from(2500));
    }

    #[test]
    fn expired_promotion_falls_back_with_warning() {
        let cat = category(1000, 800);
        let mut promo = promotion(cat.id, 1500, 2);
        promo.valid_to = t0() - Duration::hours(1);

        let quote = resolve_rate(&cat, Some(&promo), t0(), 120, 0, &config());
        assert!(!quote.promotion_applied);
        assert_eq!(quote.warning, Some(TariffWarning::PromotionOutsideWindow));
        assert_eq!(quote.base_amount, Decimal::from(2000));
    }

    #[test]
    fn promotion_for_other_category_is_rejected() {
        let cat = category(1000, 800);
        let promo = promotion(Uuid::new_v4(), 1500, 2);

        let quote = resolve_rate(&cat, Some(&promo), t0(), 60, 0, &config());
        assert_eq!(quote.warning, Some(TariffWarning::PromotionCategoryMismatch));
        assert_eq!(quote.base_amount, Decimal::from(1000));
    }

    #[test]
    fn inactive_promotion_is_rejected() {
        let cat = category(1000, 800);
        let mut promo = promotion(cat.id, 1500, 2);
        promo.is_active = false;

        let quote = resolve_rate(&cat, Some(&promo), t0(), 60, 0, &config());
        assert_eq!(quote.warning, Some(TariffWarning::PromotionInactive));
    }

    #[test]
    fn special_price_applies_inside_window() {
        let cat = category(1000, 800);
        // 23h cai na janela 22:00–06:00 (atravessa a meia-noite)
        let late = Utc.with_ymd_and_hms(2026, 3, 14, 23, 0, 0).unwrap();
        let quote = resolve_rate(&cat, None, late, 60, 0, &config());
        assert_eq!(quote.base_amount, Decimal::from(800));

        let early = Utc.with_ymd_and_hms(2026, 3, 15, 5, 0, 0).unwrap();
        let quote = resolve_rate(&cat, None, early, 60, 0, &config());
        assert_eq!(quote.base_amount, Decimal::from(800));
    }

    #[test]
    fn overtime_bills_per_started_unit() {
        let cat = category(1000, 800);
        // 31 minutos além do contratado = 2 unidades de 30min
        let quote = resolve_rate(&cat, None, t0(), 120, 151, &config());
        assert_eq!(quote.overtime_amount, Decimal::from(500));
        assert_eq!(quote.total, Decimal::from(2500));

        // exatamente 30 → 1 unidade
        let quote = resolve_rate(&cat, None, t0(), 120, 150, &config());
        assert_eq!(quote.overtime_amount, Decimal::from(250));
    }

    #[test]
    fn no_overtime_no_extra_charge() {
        let cat = category(1000, 800);
        let quote = resolve_rate(&cat, None, t0(), 120, 119, &config());
        assert_eq!(quote.overtime_amount, Decimal::ZERO);
    }
}
