use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::AuthGate;
use crate::error::ApiError;
use crate::handlers::{resource, rooms};
use crate::middleware::{authorization_gate, track_metrics, ApiResponse};
use crate::models::{Discipline, Equipment, Lesson, Record, Resource, Room};
use crate::observability::metrics_handle;
use crate::services::ResourceService;
use crate::store::DocumentStore;

/// Handles shared by every request. The store is opened once at startup and
/// closed by the caller after the server stops.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub gate: Arc<AuthGate>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, gate: AuthGate) -> Self {
        Self {
            store,
            gate: Arc::new(gate),
            metrics: metrics_handle(),
        }
    }

    pub fn service<R: Resource>(&self) -> ResourceService<R> {
        ResourceService::new(self.store.clone())
    }
}

pub fn app(state: AppState) -> Router {
    app_at(state, None)
}

/// Router mounted under `prefix` (e.g. `/api/erudite`), or at the root when `None`
pub fn app_at(state: AppState, prefix: Option<&str>) -> Router {
    // Every resource route sits behind the one gate
    let protected = Router::new()
        .merge(resource_routes::<Room>("/rooms"))
        .route("/rooms/:id/equipment", get(rooms::list_room_equipment))
        .merge(resource_routes::<Equipment>("/equipment"))
        .merge(resource_routes::<Discipline>("/disciplines"))
        .merge(resource_routes::<Lesson>("/lessons"))
        .merge(resource_routes::<Record>("/records"))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authorization_gate,
        ));

    let routes = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(protected)
        .route_layer(middleware::from_fn(track_metrics));

    let routes = match prefix {
        Some(prefix) => Router::new().nest(prefix, routes),
        None => routes,
    };

    routes
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn resource_routes<R: Resource>(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(resource::list::<R>).post(resource::create::<R>))
        .route(
            &format!("{}/:id", base),
            get(resource::show::<R>)
                .put(resource::update::<R>)
                .patch(resource::patch::<R>)
                .delete(resource::delete::<R>),
        )
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "status": 200,
        "data": {
            "name": "Erudite",
            "version": version,
            "description": "Registry of rooms, equipment, disciplines, lessons and records",
            "endpoints": {
                "rooms": "/rooms[/:id[/equipment]]",
                "equipment": "/equipment[/:id]",
                "disciplines": "/disciplines[/:id]",
                "lessons": "/lessons[/:id]",
                "records": "/records[/:id]",
                "health": "/health (public)",
                "metrics": "/metrics (public)",
            }
        },
        "message": "Welcome to Erudite!"
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(()) => ApiResponse::success(
            json!({ "status": "ok", "timestamp": now, "database": "ok" }),
            "Service is healthy",
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            ApiResponse::with_status(
                json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }),
                StatusCode::SERVICE_UNAVAILABLE,
                "database unavailable",
            )
        }
    }
}

/// Prometheus text exposition, outside the JSON envelope
async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => ApiError::service_unavailable("metrics recorder unavailable").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticKeyDirectory;
    use crate::store::MemoryStore;
    use crate::testing::ProbeStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    fn probe_app() -> (Arc<ProbeStore>, Router) {
        let probe = Arc::new(ProbeStore::new(Arc::new(MemoryStore::new())));
        let state = AppState::new(probe.clone(), AuthGate::disabled());
        (probe, app(state))
    }

    async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn malformed_ids_never_reach_the_store() {
        let requests = [
            (Method::GET, "/rooms/504", None),
            (Method::DELETE, "/equipment/xyz", None),
            (Method::PATCH, "/disciplines/123", Some(json!({"groups": []}))),
            (Method::PUT, "/lessons/zzzzzzzzzzzzzzzzzzzzzzzz", Some(json!({}))),
            (Method::GET, "/rooms/5f8f8c44b54764421b7156c/equipment", None),
        ];

        for (method, uri, body) in requests {
            let (probe, router) = probe_app();
            let (status, json) = send(router, method, uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(json["status"], json!(400));
            assert_eq!(json["data"], json!("ObjectId is written in the wrong format"));
            assert_eq!(probe.calls(), 0, "store touched for {}", uri);
        }
    }

    #[tokio::test]
    async fn missing_record_is_404_envelope() {
        let (_, router) = probe_app();
        let (status, json) = send(router, Method::GET, "/rooms/5f8f8c44b54764421b7156c3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["status"], json!(404));
        assert_eq!(json["message"], json!("Not Found"));
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (probe, router) = probe_app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/rooms")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn gate_blocks_before_dispatch() {
        let probe = Arc::new(ProbeStore::new(Arc::new(MemoryStore::new())));
        let gate = AuthGate::new("key", Arc::new(StaticKeyDirectory::new(["secret"])));
        let router = app(AppState::new(probe.clone(), gate));

        let (status, json) = send(router.clone(), Method::GET, "/rooms", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["data"], json!("unauthorized"));
        assert_eq!(probe.calls(), 0);

        let request = Request::builder()
            .uri("/rooms")
            .header("key", "secret")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn failing_directory_rejects_with_401() {
        let gate = AuthGate::new("key", Arc::new(crate::testing::BrokenDirectory));
        let router = app(AppState::new(Arc::new(MemoryStore::new()), gate));

        let request = Request::builder()
            .uri("/equipment")
            .header("key", "secret")
            .body(Body::empty())
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["data"], json!("invalid key"));
    }

    #[tokio::test]
    async fn metrics_count_routed_requests() {
        let gate = AuthGate::new("key", Arc::new(StaticKeyDirectory::new(["secret"])));
        let router = app(AppState::new(Arc::new(MemoryStore::new()), gate));

        let (status, _) = send(router.clone(), Method::GET, "/disciplines", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        let line = text
            .lines()
            .find(|l| {
                l.starts_with(crate::middleware::metrics::REQUESTS_TOTAL)
                    && l.contains("path=\"/disciplines\"")
                    && l.contains("status=\"401\"")
            })
            .unwrap_or_else(|| panic!("no request counter in:\n{}", text));
        assert!(line.contains("method=\"GET\""), "{}", line);
    }

    #[tokio::test]
    async fn prefix_mounts_every_route() {
        let state = AppState::new(Arc::new(MemoryStore::new()), AuthGate::disabled());
        let router = app_at(state, Some("/api/erudite"));

        let (status, json) = send(router.clone(), Method::GET, "/api/erudite/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], json!("ok"));

        let (status, json) = send(router.clone(), Method::GET, "/api/erudite/rooms", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"], json!([]));

        let request = Request::builder().uri("/rooms").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_public() {
        let gate = AuthGate::new("key", Arc::new(StaticKeyDirectory::new(["secret"])));
        let router = app(AppState::new(Arc::new(MemoryStore::new()), gate));
        let (status, json) = send(router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["database"], json!("ok"));
    }
}
