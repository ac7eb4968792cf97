//! Axum HTTP routes for the file tree API.

use crate::config::{TreeRequest, WalkConfig};
use crate::error::{ServerError, ServerResult};
use crate::server::chunks::{frames, CHUNK_SIZE};
use crate::server::response::ApiResponse;
use crate::service::FileTreeGenerator;
use crate::tree::FileTreeResult;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Shared application state
pub struct AppState {
    pub generator: FileTreeGenerator,
}

/// Query string of `GET /api/tree`
#[derive(Debug, serde::Deserialize)]
pub struct TreeQuery {
    pub token: Option<String>,
}

// ─── Route builder ───────────────────────────────────────────────

pub fn build_router(state: Arc<AppState>) -> Router {
    // Compression only wraps plain responses; the upgrade stays untouched
    let api = Router::new()
        .route("/health", get(health))
        .route("/tree", get(get_tree))
        .layer(CompressionLayer::new())
        .route("/tree/ws", get(tree_ws));

    Router::new()
        .route("/", get(banner))
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ─── Handlers ────────────────────────────────────────────────────

async fn banner() -> &'static str {
    "FileTree API"
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "filetree-walker",
    }))
}

async fn get_tree(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TreeQuery>,
) -> ServerResult<Json<ApiResponse<FileTreeResult>>> {
    let result = walk_token(state, query.token).await?;
    Ok(Json(ApiResponse::success("Get file tree success", result)))
}

async fn tree_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<TreeQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_tree(socket, state, query.token))
}

/// Walk, then send the serialized tree as chunk frames
async fn stream_tree(mut socket: WebSocket, state: Arc<AppState>, token: Option<String>) {
    let payload = match walk_token(state, token).await {
        Ok(result) => serde_json::to_vec(&result),
        Err(e) => {
            let body = serde_json::to_string(&ApiResponse::<()>::error(e.to_string()))
                .unwrap_or_default();
            if let Err(e) = socket.send(Message::Text(body)).await {
                debug!(error = %e, "WebSocket closed before error was sent");
            }
            return;
        }
    };

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Failed to encode file tree");
            return;
        }
    };

    for frame in frames(&payload, CHUNK_SIZE) {
        let text = match serde_json::to_string(&frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode chunk frame");
                return;
            }
        };
        if let Err(e) = socket.send(Message::Text(text)).await {
            debug!(error = %e, index = frame.index, "WebSocket closed mid-transfer");
            return;
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

/// Decode a token and walk it off the async workers
async fn walk_token(state: Arc<AppState>, token: Option<String>) -> ServerResult<FileTreeResult> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::InvalidParameter {
            name: "token".to_string(),
            reason: "missing".to_string(),
        })?;
    let request = TreeRequest::parse(&token);
    if request.path.is_empty() {
        return Err(ServerError::InvalidParameter {
            name: "token".to_string(),
            reason: "empty path".to_string(),
        });
    }

    // Directory listings block; keep them off the async workers
    let result = tokio::task::spawn_blocking(move || {
        state.generator.generate(&request.path, request.organize)
    })
    .await
    .map_err(|e| ServerError::Task(e.to_string()))??;

    Ok(result)
}

// ─── Server startup ──────────────────────────────────────────────

/// Start the file tree server
pub async fn serve(bind: &str, port: u16, config: WalkConfig) -> Result<(), ServerError> {
    let generator = FileTreeGenerator::new(config.clone())?;
    let state = Arc::new(AppState { generator });

    let router = build_router(state);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| ServerError::InvalidParameter {
            name: "bind".to_string(),
            reason: format!("{}", e),
        })?;

    info!(
        %addr,
        workers = config.concurrency,
        timeout_secs = config.timeout.map(|t| t.as_secs()),
        "File tree server listening"
    );
    eprintln!("File tree server listening on http://{}", addr);
    eprintln!("API endpoints:");
    eprintln!("  GET  /api/health");
    eprintln!("  GET  /api/tree?token=<path>[::org]");
    eprintln!("  GET  /api/tree/ws?token=<path>[::org]  (WebSocket, chunked)");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Io)?;

    eprintln!("\nServer shut down.");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler; run until the process is killed
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down gracefully...");
}
