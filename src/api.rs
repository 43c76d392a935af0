use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ScanError;
use crate::orchestrator::{ErrorBody, ScanOrchestrator, ScanReply, ScanRequest, VerifyReply, VerifyRequest};

// ==========================================
// 1. 应用状态 (Shared State)
// ==========================================
// 进程启动时构造一次，通过 Arc 注入到每个处理函数。
pub struct AppState {
    pub orchestrator: ScanOrchestrator,
}

// ==========================================
// 2. 路由
// ==========================================
pub fn app(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/scan", post(scan))
        .route("/api/verify", post(verify))
        .layer(CatchPanicLayer::custom(panic_to_error))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 未配置来源时放开所有跨域（开发模式）
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

// ==========================================
// 3. 处理函数 (Handlers)
// ==========================================

async fn root() -> Json<serde_json::Value> {
    Json(json!({"status": "EmpowerNet API is Online"}))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "healthy"}))
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "ledger": state.orchestrator.ledger().status(),
    }))
}

/// 接口：扫描并存证
async fn scan(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ScanRequest>, JsonRejection>,
) -> Json<ScanReply> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let err = ScanError::InvalidBody(rejection.body_text());
            warn!(error = %err, "scan request rejected");
            return Json(ScanReply::Error(ErrorBody::new(err.to_string())));
        }
    };
    Json(state.orchestrator.scan(req).await)
}

/// 接口：按证据哈希查询链上记录
async fn verify(
    State(state): State<Arc<AppState>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Json<VerifyReply> {
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            warn!(reason = %rejection.body_text(), "verify request body unreadable");
            VerifyRequest::default()
        }
    };
    Json(state.orchestrator.verify(req.evidence_hash.as_deref()).await)
}

// 处理函数 panic 时同样返回 `{"error": ...}`
fn panic_to_error(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };
    error!(%message, "request handler panicked");
    (StatusCode::OK, Json(ErrorBody::new(message))).into_response()
}
