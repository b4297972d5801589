use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::{StatusCode, header},
        response::{IntoResponse, Json, Response},
        routing::post,
    },
    tower_http::cors::{Any, CorsLayer},
    tracing::{info, warn},
};

use {
    ragswitch_config::{RagswitchConfig, schema::RouterConfig},
    ragswitch_index::StorageLayout,
    ragswitch_protocol::{
        ActivateRequest, ActivateResponse, ChatRequest, ErrorResponse, RouteErrorResponse,
        VersionSlot,
    },
};

pub struct RouterState {
    layout: StorageLayout,
    client: reqwest::Client,
    config: RouterConfig,
}

impl RouterState {
    pub fn new(layout: StorageLayout, config: RouterConfig) -> Self {
        Self {
            layout,
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// Build the router app (shared between production startup and tests).
pub fn build_router_app(state: Arc<RouterState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/chat", post(chat_handler))
        .route("/activate", post(activate_handler))
        .layer(cors)
        .with_state(state)
}

/// Start the router HTTP server.
pub async fn start_router(config: RagswitchConfig) -> anyhow::Result<()> {
    let layout = StorageLayout::new(config.storage.data_dir.clone());
    let state = Arc::new(RouterState::new(layout, config.router.clone()));

    let app = build_router_app(state);
    let addr: SocketAddr = format!("{}:{}", config.router.bind, config.router.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "router listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Forward the request to the active backend. A successful backend response
/// is relayed verbatim; a timeout, connection failure, or non-2xx status
/// becomes a structured error payload naming the active version, so callers
/// can tell "no backend reachable" apart from "no answer found".
///
/// The marker is read on every request (no caching) so an activation
/// propagates immediately. A marker that is missing, unreadable, or holds an
/// unknown label falls back to the primary slot.
async fn chat_handler(
    State(state): State<Arc<RouterState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let active = state.layout.active_or_primary();
    let url = format!("{}/chat", state.config.backend_url(active));

    let sent = state
        .client
        .post(&url)
        .timeout(state.config.timeout())
        .json(&req)
        .send()
        .await;

    let resp = match sent {
        Ok(resp) => resp,
        Err(e) => {
            warn!(slot = %active, error = %e, "could not reach active backend");
            return route_error(active, format!("backend unreachable: {e}"));
        },
    };

    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(body) => body,
        Err(e) => return route_error(active, format!("backend response unreadable: {e}")),
    };

    if status.is_success() {
        return (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body.to_vec(),
        )
            .into_response();
    }

    warn!(slot = %active, status = %status, "active backend answered with an error");
    route_error(
        active,
        format!("backend returned {status}: {}", error_detail(&body)),
    )
}

/// Pull the `error` field out of a backend error body, falling back to the
/// raw text for anything non-JSON.
fn error_detail(body: &[u8]) -> String {
    serde_json::from_slice::<ErrorResponse>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned())
}

fn route_error(active: VersionSlot, error: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        Json(RouteErrorResponse {
            error,
            active_version: active,
        }),
    )
        .into_response()
}

/// The only mutation entry point into the shared active-version marker.
///
/// Unknown labels are rejected outright; activating the already-active slot
/// is a no-op success.
async fn activate_handler(
    State(state): State<Arc<RouterState>>,
    Json(req): Json<ActivateRequest>,
) -> Response {
    let slot = match req.version.parse::<VersionSlot>() {
        Ok(slot) => slot,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response();
        },
    };

    match state.layout.write_marker(slot) {
        Ok(()) => {
            info!(slot = %slot, "activated index version");
            Json(ActivateResponse { activated: slot }).into_response()
        },
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("could not write active-version marker: {e}"),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use {
        axum::{body::Body, http::Request},
        tower::ServiceExt,
    };

    fn app_in(dir: &std::path::Path) -> (Router, StorageLayout) {
        let layout = StorageLayout::new(dir);
        let mut config = RouterConfig::default();
        // Dead local ports so forwarding fails fast instead of hanging.
        config.backend_v1 = "http://127.0.0.1:9".into();
        config.backend_v2 = "http://127.0.0.1:9".into();
        config.timeout_secs = 1;
        let state = Arc::new(RouterState::new(layout.clone(), config));
        (build_router_app(state), StorageLayout::new(dir))
    }

    async fn post_json(app: Router, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn activate_writes_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (app, layout) = app_in(dir.path());

        let (status, body) = post_json(app, "/activate", r#"{"version":"v2"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activated"], "v2");
        assert_eq!(layout.read_marker(), Some(VersionSlot::V2));
    }

    #[tokio::test]
    async fn activate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (app, layout) = app_in(dir.path());
        layout.write_marker(VersionSlot::V2).unwrap();

        let (status, body) =
            post_json(app, "/activate", r#"{"version":"v2"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["activated"], "v2");
        assert_eq!(layout.read_marker(), Some(VersionSlot::V2));
    }

    #[tokio::test]
    async fn activate_rejects_unknown_labels_and_keeps_the_marker() {
        let dir = tempfile::tempdir().unwrap();
        let (app, layout) = app_in(dir.path());
        layout.write_marker(VersionSlot::V1).unwrap();

        let (status, body) = post_json(app, "/activate", r#"{"version":"v9"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("v9"));
        assert_eq!(layout.read_marker(), Some(VersionSlot::V1));
    }

    /// Spin up a one-route stub backend and return its base URL.
    async fn spawn_stub_backend(status: StatusCode, body: &'static str) -> String {
        let app = Router::new().route(
            "/chat",
            post(move || async move {
                (status, [(header::CONTENT_TYPE, "application/json")], body)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn relays_a_successful_backend_response_verbatim() {
        let backend =
            spawn_stub_backend(StatusCode::OK, r#"{"answer":"A","retrieved":["A"]}"#).await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = RouterConfig::default();
        config.backend_v1 = backend;
        config.timeout_secs = 5;
        let state = Arc::new(RouterState::new(StorageLayout::new(dir.path()), config));

        let (status, body) = post_json(build_router_app(state), "/chat", r#"{"query":"hi"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "A");
        assert_eq!(body["retrieved"][0], "A");
    }

    #[tokio::test]
    async fn backend_error_status_becomes_a_route_error() {
        let backend = spawn_stub_backend(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"error":"index not loaded"}"#,
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = RouterConfig::default();
        config.backend_v1 = backend;
        config.timeout_secs = 5;
        let state = Arc::new(RouterState::new(StorageLayout::new(dir.path()), config));

        let (status, body) = post_json(build_router_app(state), "/chat", r#"{"query":"hi"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["active_version"], "v1");
        let error = body["error"].as_str().unwrap();
        assert!(error.contains("index not loaded"), "got: {error}");
    }

    #[tokio::test]
    async fn unreachable_backend_yields_structured_route_error() {
        let dir = tempfile::tempdir().unwrap();
        let (app, layout) = app_in(dir.path());
        layout.write_marker(VersionSlot::V2).unwrap();

        let (status, body) = post_json(app, "/chat", r#"{"query":"hi"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["active_version"], "v2");
        assert!(body["error"].as_str().unwrap().contains("unreachable"));
    }

    #[tokio::test]
    async fn corrupt_marker_routes_to_the_primary_slot() {
        let dir = tempfile::tempdir().unwrap();
        let (app, layout) = app_in(dir.path());
        std::fs::write(layout.marker_path(), "v9").unwrap();

        let (status, body) = post_json(app, "/chat", r#"{"query":"hi"}"#).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["active_version"], "v1");
    }
}
