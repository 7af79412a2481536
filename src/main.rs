use axum::{
    routing::{get, post},
    Router,
};
use med_claim_reconciler::{api, AppConfig, ClaimReconciler, LearnedNameStore};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting server with config: {:?}", config.server);

    // the store backs both the learn endpoint and the engine's name lookup
    let store = Arc::new(LearnedNameStore::new());
    let reconciler = Arc::new(ClaimReconciler::new(
        Arc::new(config.engine.clone()),
        store.clone(),
    ));
    let state = api::AppState::new(reconciler, store);

    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/reconcile", post(api::reconcile))
        .route("/api/reconcile/batch", post(api::reconcile_batch))
        .route("/api/reconcile/csv", post(api::reconcile_csv))
        .route("/api/names/learn", post(api::learn_names))
        .with_state(state)
        .layer(ServiceBuilder::new());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/reconcile        - reconcile one claim");
    info!("  POST /api/reconcile/batch  - reconcile many claims in parallel");
    info!("  POST /api/reconcile/csv    - reconcile one claim, CSV rows");
    info!("  POST /api/names/learn      - record preferred item spellings");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
