use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::routes::AppState;

/// 健康检查，数据库不可用时返回 503
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, overall, database) = match state.health.check().await {
        Ok(()) => (StatusCode::OK, "ok", "ok".to_string()),
        Err(e) => {
            warn!("健康检查失败: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", e.to_string())
        }
    };

    (
        status,
        Json(json!({
            "status": overall,
            "database": database,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "emergency-dispatch",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
