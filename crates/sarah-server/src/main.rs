use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use sarah_api::{AppState, AppStateInner, StreamGate};
use sarah_api::{chat, conversations, corpus, extract, feedback, proxy};
use sarah_gateway::{GeminiClient, GeminiConfig};
use sarah_store::{BlobStore, ConversationStore, CorpusStore};
use sarah_types::models::Language;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sarah=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        eprintln!("FATAL: GEMINI_API_KEY is not set.");
        eprintln!("       The tutoring gateway cannot reach the model without it.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("SARAH_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SARAH_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("SARAH_DB_PATH")
        .unwrap_or_else(|_| "sarah.db".into())
        .into();
    let base_url = std::env::var("GEMINI_BASE_URL")
        .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".into());
    let model = std::env::var("SARAH_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".into());

    // Init stores and gateway
    let blob = Arc::new(BlobStore::open(&db_path)?);
    let history = Arc::new(ConversationStore::load(blob.clone(), Language::Fr));
    let corpus_store = Arc::new(CorpusStore::load(blob));
    let gateway = GeminiClient::new(GeminiConfig {
        api_key,
        base_url,
        model,
    });

    let state: AppState = Arc::new(AppStateInner {
        history,
        corpus: corpus_store,
        gateway,
        stream_gate: StreamGate::new(),
    });

    // Routes
    let app = Router::new()
        .route("/health", get(health))
        .route("/conversations", post(conversations::create_conversation))
        .route("/conversations", get(conversations::list_conversations))
        .route("/conversations/{id}", get(conversations::get_conversation))
        .route("/conversations/{id}", patch(conversations::rename_conversation))
        .route("/conversations/{id}", delete(conversations::delete_conversation))
        .route("/conversations/{id}/messages", post(chat::send_message))
        .route(
            "/conversations/{id}/messages/{message_id}/feedback",
            post(feedback::set_feedback),
        )
        .route("/conversations/{id}/quiz", post(chat::create_quiz))
        .route("/corpus", get(corpus::list_documents))
        .route("/corpus", post(corpus::add_document))
        .route("/corpus/{id}", delete(corpus::delete_document))
        .route("/extract", post(extract::extract_file))
        .route("/api/gemini", post(proxy::invoke))
        // Above the 4 MiB extraction ceiling so oversized uploads reach the
        // pipeline's own check and get the proper error body.
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Sarah server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Liveness plus the best-effort persistence health flags: a `false` here
/// means the stores are serving from memory only.
async fn health(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "historyPersistence": state.history.last_persist_succeeded(),
        "corpusPersistence": state.corpus.last_persist_succeeded(),
    }))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
