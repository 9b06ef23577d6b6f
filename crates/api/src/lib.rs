//! # Dispatch API
//!
//! 急救调度服务的 REST API，基于 Axum 构建。
//!
//! ## API 端点
//!
//! ### 急救请求
//! - `POST /api/emergency/assistance` - 提交急救请求，返回救护车调度或社区卫生工作者指派
//!
//! ### 救护车调度
//! - `GET /api/dispatches` - 调度列表（`hospital_id`、`status`、`limit`、`offset`）
//! - `GET /api/dispatches/{incident_id}` - 调度详情
//! - `POST /api/dispatches/{incident_id}/events` - 执行状态事件
//!
//! ### 社区卫生工作者指派
//! - `GET /api/chw-assignments` - 指派列表（`chw_id`、`status`）
//! - `GET /api/chw-assignments/{id}` - 指派详情
//! - `POST /api/chw-assignments/{id}/start` - 开始处理
//! - `POST /api/chw-assignments/{id}/complete` - 完成
//! - `POST /api/chw-assignments/{id}/cancel` - 取消
//!
//! ### 资源查询
//! - `GET /api/chws/nearest` - 最近的可用社区卫生工作者
//! - `GET /api/ambulances` - 按状态查询救护车
//! - `GET /api/hospitals/{id}/capacity` - 医院车队容量
//!
//! ### 运维
//! - `GET /health` - 健康检查
//! - `GET /metrics` - Prometheus 指标
//!
//! ## 响应格式
//!
//! 成功响应统一包装为 `{"success": true, "data": ..., "message": null, "timestamp": ...}`，
//! 错误响应为 `{"error": {"message", "type", "code", "suggestions", "timestamp"}}`。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;

use std::time::Duration;

use axum::Router;
use dispatch_core::config::ApiConfig;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use crate::middleware::{cors_layer, request_logging, trace_layer};
pub use crate::routes::{create_routes, create_routes_with_metrics, AppState};

/// 创建带中间件的应用路由
pub fn create_app(state: AppState, config: &ApiConfig, metrics_endpoint: &str) -> Router {
    let router = create_routes_with_metrics(state, metrics_endpoint).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_seconds,
            )))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if config.cors_enabled {
        router.layer(cors_layer(&config.cors_origins))
    } else {
        router
    }
}
