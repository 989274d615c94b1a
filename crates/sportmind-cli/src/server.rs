//! JSON API consumed by the web viewer.

use std::net::SocketAddr;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use sportmind_ai::RegulationPipeline;
use sportmind_core::parse_session_date;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, info};

use crate::source::SessionSource;

const INVALID_DATE: &str = "Formato de fecha inválido. Use YYYY-MM-DD";

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: RegulationPipeline,
    pub source: Arc<SessionSource>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(e: anyhow::Error) -> Self {
        let message = format!("{e:#}");
        error!(error = %message, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({"success": false, "error": self.message}));
        (self.status, body).into_response()
    }
}

/// API routes open to any origin, plus the viewer's static files when
/// `static_dir` is given (`/` serves its `index.html`).
pub fn router(state: AppState, static_dir: Option<&FsPath>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/dates", get(list_dates))
        .route("/api/sessions/{date}", get(sessions_by_date))
        .layer(cors)
        .with_state(state);
    match static_dir {
        Some(dir) => api.fallback_service(ServeDir::new(dir)),
        None => api,
    }
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    static_dir: Option<&FsPath>,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        source = state.source.name(),
        predictions = state.pipeline.is_enabled(),
        static_dir = static_dir.map(|d| d.display().to_string()),
        "serving session API"
    );
    axum::serve(listener, router(state, static_dir))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    info!("server stopped");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({"ok": true}))
}

async fn list_dates(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let page = state.source.dates().await.map_err(ApiError::internal)?;
    Ok(Json(json!({
        "dates": page.dates,
        "total": page.total,
        "source": state.source.name(),
        "success": true,
    })))
}

async fn sessions_by_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Value>, ApiError> {
    parse_session_date(&date).map_err(|_| ApiError::bad_request(INVALID_DATE))?;

    let mut page = state.source.sessions(&date).await.map_err(ApiError::internal)?;
    let annotated = state.pipeline.annotate_all(page.sessions.iter_mut());
    info!(
        date = %page.date,
        sessions = page.sessions.len(),
        annotated,
        "served sessions"
    );

    Ok(Json(json!({
        "date": page.date,
        "total_sessions": page.total_sessions,
        "sessions": page.sessions,
        "source": state.source.name(),
        "success": true,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sportmind_ai::ArtifactBundle;
    use sportmind_store::SessionStore;
    use tower::ServiceExt;

    fn bundle() -> ArtifactBundle {
        ArtifactBundle::from_json(json!({
            "modelo": {
                "type": "logistic_regression",
                "coef": [0.0],
                "intercept": (9.0f64).ln()
            },
            "encoders": {"le_emotionalState": {"classes": ["anxious", "calm"]}},
            "features": ["emotionalState_encoded"]
        }))
        .unwrap()
    }

    fn app(pipeline: RegulationPipeline) -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let day = dir.path().join("data/2025-11-03");
        std::fs::create_dir_all(&day).unwrap();
        std::fs::write(
            day.join("calm.json"),
            r#"{"timestamp": "2025-11-03T09:00:00", "data": {"emotionalState": "calm"}}"#,
        )
        .unwrap();
        std::fs::write(
            day.join("unseen.json"),
            r#"{"timestamp": "2025-11-03T10:00:00", "emotionalState": "euphoric"}"#,
        )
        .unwrap();
        std::fs::create_dir_all(dir.path().join("data/2025-11-01")).unwrap();

        let state = AppState {
            pipeline,
            source: Arc::new(SessionSource::Local(SessionStore::new(dir.path()))),
        };
        (dir, router(state, None))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_ok() {
        let (_dir, app) = app(RegulationPipeline::disabled());
        let (status, body) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn dates_listed_newest_first() {
        let (_dir, app) = app(RegulationPipeline::disabled());
        let (status, body) = get_json(app, "/api/dates").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dates"], json!(["2025-11-03", "2025-11-01"]));
        assert_eq!(body["total"], 2);
        assert_eq!(body["source"], "local");
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn invalid_date_is_400() {
        let (_dir, app) = app(RegulationPipeline::disabled());
        let (status, body) = get_json(app, "/api/sessions/2025-13-40").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], INVALID_DATE);
    }

    #[tokio::test]
    async fn sessions_are_annotated() {
        let (_dir, app) = app(RegulationPipeline::new(bundle()));
        let (status, body) = get_json(app, "/api/sessions/2025-11-03").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_sessions"], 2);
        assert_eq!(body["date"], "2025-11-03");

        let sessions = body["sessions"].as_array().unwrap();
        // newest first: the unseen-state record cannot be encoded
        assert_eq!(sessions[0]["_key"], "data/2025-11-03/unseen.json");
        assert!(sessions[0].get("emotional_regulation").is_none());

        let prediction = &sessions[1]["emotional_regulation"];
        assert_eq!(prediction["prediction"], 1);
        assert_eq!(prediction["label"], "Sí");
        assert!((prediction["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn sessions_without_model_are_not_annotated() {
        let (_dir, app) = app(RegulationPipeline::disabled());
        let (status, body) = get_json(app, "/api/sessions/2025-11-03").await;
        assert_eq!(status, StatusCode::OK);
        for session in body["sessions"].as_array().unwrap() {
            assert!(session.get("emotional_regulation").is_none());
        }
    }

    #[tokio::test]
    async fn source_failure_is_500() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the data directory should be
        std::fs::write(dir.path().join("data"), "").unwrap();
        let state = AppState {
            pipeline: RegulationPipeline::disabled(),
            source: Arc::new(SessionSource::Local(SessionStore::new(dir.path()))),
        };
        let (status, body) = get_json(router(state, None), "/api/dates").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn api_allows_cross_origin_requests() {
        let (_dir, app) = app(RegulationPipeline::disabled());
        let resp = app
            .oneshot(
                Request::get("/api/health")
                    .header("origin", "http://viewer.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn static_index_served_at_root() {
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join("index.html"), "<h1>SportMind</h1>").unwrap();
        let state = AppState {
            pipeline: RegulationPipeline::disabled(),
            source: Arc::new(SessionSource::Local(SessionStore::new(site.path()))),
        };
        let app = router(state, Some(site.path()));

        let resp = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<h1>SportMind</h1>");

        // API routes still win over the static fallback.
        let (status, body) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }
}
