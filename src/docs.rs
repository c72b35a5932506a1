// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Visits ---
        handlers::visits::create_visit,
        handlers::visits::annul_visit,
        handlers::visits::get_visit_summary,

        // --- Reservations ---
        handlers::reservations::create_reservation,
        handlers::reservations::get_reservation,
        handlers::reservations::pause_reservation,
        handlers::reservations::resume_reservation,
        handlers::reservations::extend_reservation,
        handlers::reservations::cancel_reservation,
        handlers::reservations::settle_reservation,

        // --- Rooms ---
        handlers::rooms::list_rooms,
        handlers::rooms::get_room_status,
        handlers::rooms::reevaluate_rooms,

        // --- Ledger ---
        handlers::ledger::add_consumption,
        handlers::ledger::cancel_consumption,
        handlers::ledger::create_pawn,
        handlers::ledger::pay_pawn,
        handlers::ledger::annul_pawn,

        // --- Closures ---
        handlers::closures::open_closure,
        handlers::closures::add_expense,
        handlers::closures::close_closure,
        handlers::closures::get_closure,
    ),
    components(
        schemas(
            // --- Visits ---
            models::visits::VisitState,
            models::visits::Visit,

            // --- Catalog ---
            models::catalog::RoomCategory,
            models::catalog::Room,
            models::catalog::RoomOccupancy,
            models::promotions::Promotion,

            // --- Reservations ---
            models::reservations::ReservationState,
            models::reservations::Reservation,
            models::reservations::ReservationPause,
            services::clock::ClockSnapshot,
            services::tariff::TariffWarning,
            services::tariff::RateQuote,
            services::reservation_service::ReservationDetail,
            services::reservation_service::RoomStatus,

            // --- Ledger ---
            models::ledger::ConsumptionState,
            models::ledger::Consumption,
            models::ledger::PawnState,
            models::ledger::Pawn,
            models::ledger::VisitSummary,

            // --- Treasury ---
            models::treasury::ClosureState,
            models::treasury::Payment,
            models::treasury::Expense,
            models::treasury::CashClosure,
            models::treasury::ClosureTotals,
            models::treasury::CancelledAuditLine,
            models::treasury::ClosureReport,

            // --- Events ---
            models::events::EventKind,
            models::events::NotificationEvent,

            // --- Payloads ---
            handlers::visits::CreateVisitPayload,
            handlers::visits::AnnulVisitPayload,
            handlers::reservations::CreateReservationPayload,
            handlers::reservations::ExtendReservationPayload,
            handlers::reservations::CancelReservationPayload,
            handlers::reservations::SettleReservationPayload,
            handlers::reservations::SettleResponse,
            handlers::ledger::AddConsumptionPayload,
            handlers::ledger::CancelConsumptionPayload,
            handlers::ledger::CreatePawnPayload,
            handlers::ledger::PayPawnPayload,
            handlers::ledger::AnnulPawnPayload,
            handlers::closures::OpenClosurePayload,
            handlers::closures::AddExpensePayload,
        )
    ),
    tags(
        (name = "Visits", description = "Registro e anulação de visitas"),
        (name = "Reservations", description = "Check-in, relógio de ocupação e check-out"),
        (name = "Rooms", description = "Ocupação e status ao vivo dos quartos"),
        (name = "Ledger", description = "Consumos e empenhos da visita"),
        (name = "Closures", description = "Abertura, despesas e fechamento de caixa")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
