// src/config.rs

use std::{env, time::Duration};

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::sync::broadcast;

use crate::{
    db::{
        ClosureRepository, LedgerRepository, PromotionRepository, ReservationRepository,
        RoomRepository, VisitRepository,
    },
    models::events::NotificationEvent,
    services::{
        closure_service::ClosureService, ledger_service::LedgerService,
        reservation_service::ReservationService,
    },
};

/// Política de cobrança, toda externa ao código (unidade e valor do
/// overtime são configuração, nunca constantes).
#[derive(Debug, Clone)]
pub struct BillingConfig {
    /// Tamanho da unidade de overtime em minutos; unidade iniciada conta inteira
    pub overtime_unit_minutes: i64,
    pub overtime_rate_per_unit: Decimal,
    /// Taxa cobrada ao cancelar; zero = cancelamento vira só linha de auditoria
    pub cancellation_fee: Decimal,
    /// Permite lançar consumos depois da reserva liquidada/cancelada
    pub allow_post_checkout_charges: bool,
    /// Janela de preço especial (pode atravessar a meia-noite);
    /// start == end desativa o preço especial
    pub special_price_start: NaiveTime,
    pub special_price_end: NaiveTime,
}

impl BillingConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            overtime_unit_minutes: env_or("BILLING_OVERTIME_UNIT_MINUTES", 30)?,
            overtime_rate_per_unit: env_or_decimal("BILLING_OVERTIME_RATE", Decimal::ZERO)?,
            cancellation_fee: env_or_decimal("BILLING_CANCELLATION_FEE", Decimal::ZERO)?,
            allow_post_checkout_charges: env::var("BILLING_ALLOW_POST_CHECKOUT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            special_price_start: env_or_time("SPECIAL_PRICE_START")?,
            special_price_end: env_or_time("SPECIAL_PRICE_END")?,
        })
    }
}

fn env_or(key: &str, default: i64) -> anyhow::Result<i64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn env_or_decimal(key: &str, default: Decimal) -> anyhow::Result<Decimal> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn env_or_time(key: &str) -> anyhow::Result<NaiveTime> {
    match env::var(key) {
        Ok(raw) => NaiveTime::parse_from_str(&raw, "%H:%M")
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", key, raw, e)),
        // Janela vazia por padrão: preço especial desativado
        Err(_) => Ok(NaiveTime::MIN),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub billing: BillingConfig,
    /// Canal de notificações (best-effort, fire-and-forget)
    pub events: broadcast::Sender<NotificationEvent>,
    pub room_repo: RoomRepository,
    pub visit_repo: VisitRepository,
    pub reservation_service: ReservationService,
    pub ledger_service: LedgerService,
    pub closure_service: ClosureService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET deve ser definido");
        let billing = BillingConfig::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let (events, _) = broadcast::channel(256);

        // --- Monta o gráfico de dependências ---
        let room_repo = RoomRepository::new(db_pool.clone());
        let visit_repo = VisitRepository::new(db_pool.clone());
        let reservation_repo = ReservationRepository::new(db_pool.clone());
        let promotion_repo = PromotionRepository::new();
        let ledger_repo = LedgerRepository::new(db_pool.clone());
        let closure_repo = ClosureRepository::new(db_pool.clone());

        let closure_service =
            ClosureService::new(db_pool.clone(), closure_repo, reservation_repo.clone());
        let reservation_service = ReservationService::new(
            db_pool.clone(),
            reservation_repo.clone(),
            room_repo.clone(),
            visit_repo.clone(),
            promotion_repo,
            closure_service.clone(),
            billing.clone(),
            events.clone(),
        );
        let ledger_service = LedgerService::new(
            db_pool.clone(),
            ledger_repo,
            visit_repo.clone(),
            reservation_repo,
            closure_service.clone(),
            billing.clone(),
        );

        Ok(Self {
            db_pool,
            jwt_secret,
            billing,
            events,
            room_repo,
            visit_repo,
            reservation_service,
            ledger_service,
            closure_service,
        })
    }
}
