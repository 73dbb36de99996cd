use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

use crate::cli::ServeArgs;
use crate::error::IngestError;
use crate::ingest;
use crate::report;

const DASHBOARD_HTML: &str = include_str!("../assets/index.html");

#[derive(Clone)]
struct AppState {
    /// One upload is analyzed at a time; later uploads queue here.
    analyze_gate: Arc<Mutex<()>>,
    top: usize,
}

pub async fn run(opts: ServeArgs) -> anyhow::Result<()> {
    let state = AppState {
        analyze_gate: Arc::new(Mutex::new(())),
        top: opts.top,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(opts.max_upload_mb * 1024 * 1024));

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port)
        .parse()
        .context("parse host:port")?;

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/ping", get(api_ping))
        .route("/api/analyze", post(api_analyze))
        .with_state(state)
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn api_ping() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn api_analyze(State(st): State<AppState>, mut multipart: Multipart) -> Response {
    let _gate = st.analyze_gate.lock().await;

    let (name, bytes) = match read_upload(&mut multipart).await {
        Ok(part) => part,
        Err(msg) => return (StatusCode::BAD_REQUEST, msg).into_response(),
    };

    let t0 = std::time::Instant::now();
    let data = match ingest::load_and_normalize(&name, &bytes) {
        Ok(data) => data,
        Err(e) => return ingest_error_response(e),
    };
    tracing::info!(
        "Analyzed {} ({} claims, {} skipped) in {:.1}s",
        name,
        data.claims.len(),
        data.skipped_rows,
        t0.elapsed().as_secs_f64()
    );

    Json(report::build(&data, st.top)).into_response()
}

async fn read_upload(multipart: &mut Multipart) -> Result<(String, Vec<u8>), String> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err("missing file part in upload".to_string()),
            Err(e) => return Err(e.to_string()),
        };
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("claims.csv").to_string();
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;
        return Ok((name, bytes.to_vec()));
    }
}

fn ingest_error_response(err: IngestError) -> Response {
    // Everything in the taxonomy is a problem with the uploaded file.
    (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response()
}
