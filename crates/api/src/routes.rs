use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use dispatch_allocator::{
    AllocationEngine, AssignmentLifecycleManager, ChwLocator, DispatchLifecycleManager,
    ResourceDirectory,
};
use dispatch_core::traits::HealthCheck;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    assignments::{
        cancel_assignment, complete_assignment, get_assignment, list_assignments,
        start_assignment,
    },
    assistance::request_assistance,
    dispatches::{apply_dispatch_event, get_dispatch, list_dispatches},
    health::health_check,
    metrics::render_metrics,
    resources::{find_nearest_chw, get_hospital_capacity, list_ambulances},
};

/// 默认的指标导出路径
pub const DEFAULT_METRICS_ENDPOINT: &str = "/metrics";

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AllocationEngine>,
    pub dispatches: Arc<DispatchLifecycleManager>,
    pub assignments: Arc<AssignmentLifecycleManager>,
    pub directory: ResourceDirectory,
    pub locator: ChwLocator,
    pub health: Arc<dyn HealthCheck>,
    /// 未启用指标导出时为 `None`
    pub metrics: Option<PrometheusHandle>,
}

/// 创建API路由
pub fn create_routes(state: AppState) -> Router {
    create_routes_with_metrics(state, DEFAULT_METRICS_ENDPOINT)
}

/// 创建API路由，指标导出挂载在 `metrics_endpoint`
pub fn create_routes_with_metrics(state: AppState, metrics_endpoint: &str) -> Router {
    Router::new()
        // 运维
        .route("/health", get(health_check))
        .route(metrics_endpoint, get(render_metrics))
        // 急救请求
        .route("/api/emergency/assistance", post(request_assistance))
        // 救护车调度
        .route("/api/dispatches", get(list_dispatches))
        .route("/api/dispatches/{incident_id}", get(get_dispatch))
        .route(
            "/api/dispatches/{incident_id}/events",
            post(apply_dispatch_event),
        )
        // 社区卫生工作者指派
        .route("/api/chw-assignments", get(list_assignments))
        .route("/api/chw-assignments/{id}", get(get_assignment))
        .route("/api/chw-assignments/{id}/start", post(start_assignment))
        .route(
            "/api/chw-assignments/{id}/complete",
            post(complete_assignment),
        )
        .route("/api/chw-assignments/{id}/cancel", post(cancel_assignment))
        // 资源查询
        .route("/api/chws/nearest", get(find_nearest_chw))
        .route("/api/ambulances", get(list_ambulances))
        .route("/api/hospitals/{id}/capacity", get(get_hospital_capacity))
        .with_state(state)
}
