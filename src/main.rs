//src/main.rs

use axum::{
    Json, Router,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio::{net::TcpListener, sync::watch};
use utoipa::OpenApi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::db::ReservationRepository;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // .expect() é bom aqui: se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Falha ao rodar as migrações do banco de dados.");

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Loop de monitoração de ocupação, encerrado junto com o servidor
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor_repo = ReservationRepository::new(app_state.db_pool.clone());
    let monitor_handle = tokio::spawn(services::monitor::run(
        app_state.clone(),
        monitor_repo,
        shutdown_rx,
    ));

    // Rotas de visitas
    let visit_routes = Router::new()
        .route("/", post(handlers::visits::create_visit))
        .route("/{visit_id}/annul", post(handlers::visits::annul_visit))
        .route("/{visit_id}/summary", get(handlers::visits::get_visit_summary));

    // Rotas de reservas (check-in, transições, check-out)
    let reservation_routes = Router::new()
        .route("/", post(handlers::reservations::create_reservation))
        .route("/{reservation_id}", get(handlers::reservations::get_reservation))
        .route("/{reservation_id}/pause", post(handlers::reservations::pause_reservation))
        .route("/{reservation_id}/resume", post(handlers::reservations::resume_reservation))
        .route("/{reservation_id}/extend", post(handlers::reservations::extend_reservation))
        .route("/{reservation_id}/cancel", post(handlers::reservations::cancel_reservation))
        .route("/{reservation_id}/settle", post(handlers::reservations::settle_reservation));

    // Rotas de ocupação dos quartos
    let room_routes = Router::new()
        .route("/", get(handlers::rooms::list_rooms))
        .route("/status", get(handlers::rooms::get_room_status))
        .route("/reevaluate", post(handlers::rooms::reevaluate_rooms));

    // Rotas do livro de consumos e empenhos
    let consumption_routes = Router::new()
        .route("/", post(handlers::ledger::add_consumption))
        .route("/{consumption_id}/cancel", post(handlers::ledger::cancel_consumption));

    let pawn_routes = Router::new()
        .route("/", post(handlers::ledger::create_pawn))
        .route("/{pawn_id}/pay", post(handlers::ledger::pay_pawn))
        .route("/{pawn_id}/annul", post(handlers::ledger::annul_pawn));

    // Rotas de caixa
    let closure_routes = Router::new()
        .route("/", post(handlers::closures::open_closure))
        .route("/{closure_id}", get(handlers::closures::get_closure))
        .route("/{closure_id}/expenses", post(handlers::closures::add_expense))
        .route("/{closure_id}/close", post(handlers::closures::close_closure));

    // Tudo protegido pelo guard JWT, exceto health e o documento OpenAPI
    let protected = Router::new()
        .nest("/api/visits", visit_routes)
        .nest("/api/reservations", reservation_routes)
        .nest("/api/rooms", room_routes)
        .nest("/api/consumptions", consumption_routes)
        .nest("/api/pawns", pawn_routes)
        .nest("/api/closures", closure_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/docs/openapi.json",
            get(|| async { Json(docs::ApiDoc::openapi()) }),
        )
        .merge(protected)
        .with_state(app_state);

    // Inicia o servidor
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Sinal de encerramento recebido");
        })
        .await
        .expect("Erro no servidor Axum");

    // Encerra o monitor junto com o servidor
    let _ = shutdown_tx.send(true);
    let _ = monitor_handle.await;
}
