use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use pallet_stacker::{MixedPalletResult, PackRequest};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

async fn optimize(
    Json(req): Json<PackRequest>,
) -> Result<Json<MixedPalletResult>, (StatusCode, String)> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize"
    );

    let solver = req
        .into_solver()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let result = tokio::task::spawn_blocking(move || solver.solve())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "packing task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "packing task failed".to_string(),
            )
        })?;

    tracing::info!(
        units = result.total_units,
        layers = result.layers.len(),
        valid = result.is_valid,
        "packing finished"
    );
    Ok(Json(result))
}

fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|d| !d.is_empty())?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[tokio::main]
async fn main() {
    let _sentry = init_sentry();

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .unwrap_or_else(|e| {
            eprintln!("Error: failed to open development.log: {e}");
            std::process::exit(1);
        });

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize", post(optimize))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error: cannot bind {addr}: {e}");
            std::process::exit(1);
        });
    eprintln!("Listening on {addr}");
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Error: server stopped: {e}");
        std::process::exit(1);
    }
}
