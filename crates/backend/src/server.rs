use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        routing::{get, post},
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    ragswitch_config::RagswitchConfig,
    ragswitch_embeddings::{FallbackEmbeddings, HttpEmbeddingProvider},
    ragswitch_index::{IndexError, StorageLayout},
    ragswitch_protocol::{ChatRequest, ChatResponse, ErrorResponse, HealthResponse, VersionSlot},
    ragswitch_providers::HttpChatProvider,
};

use crate::state::BackendState;

/// Number of nearest documents retrieved per query.
const TOP_K: usize = 5;

/// Fixed answer substituted when the chat-completion provider fails.
const APOLOGY: &str = "Sorry, I could not generate an answer right now.";

/// Build the backend router (shared between production startup and tests).
pub fn build_backend_app(state: Arc<BackendState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the backend HTTP server for one version slot.
pub async fn start_backend(config: RagswitchConfig, slot: VersionSlot) -> anyhow::Result<()> {
    let layout = StorageLayout::new(config.storage.data_dir.clone());
    let embedder = FallbackEmbeddings::new(
        HttpEmbeddingProvider::new(
            config.embedding.url.clone(),
            config.embedding.api_key.clone(),
            config.embedding.timeout(),
        ),
        config.embedding.fallback_dimensions,
    );
    let chat = HttpChatProvider::new(
        config.chat.url.clone(),
        config.chat.api_key.clone(),
        config.chat.max_tokens,
        config.chat.timeout(),
    );
    let state = Arc::new(BackendState::new(
        slot,
        layout.slot_dir(slot),
        Arc::new(embedder),
        Arc::new(chat),
    ));

    let app = build_backend_app(state);
    let addr: SocketAddr =
        format!("{}:{}", config.backend.bind, config.backend.port_for(slot)).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, slot = %slot, "backend listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn chat_handler(
    State(state): State<Arc<BackendState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let Some(store) = state.current_index().await else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "index not loaded".into(),
            }),
        )
            .into_response();
    };

    let embedding = match state.embedder.embed(&req.query).await {
        Ok(vector) => vector,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("embedding failed: {e}"),
                }),
            )
                .into_response();
        },
    };

    let retrieved: Vec<String> = match store.search(&embedding, TOP_K) {
        Ok(documents) => documents.iter().map(|d| d.text.clone()).collect(),
        Err(IndexError::DimensionMismatch { expected, got }) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!(
                        "embedding dimension mismatch: query has {got}, index has {expected}"
                    ),
                }),
            )
                .into_response();
        },
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("search failed: {e}"),
                }),
            )
                .into_response();
        },
    };

    let context = retrieved.join("\n\n");
    let answer = match state.chat.complete(&req.query, &context).await {
        Ok(text) => text,
        Err(e) => {
            warn!(slot = %state.slot, error = %e, "chat provider failed, returning apology");
            APOLOGY.to_string()
        },
    };

    Json(ChatResponse { answer, retrieved }).into_response()
}

async fn health_handler(State(state): State<Arc<BackendState>>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(state.index_loaded().await))
}
