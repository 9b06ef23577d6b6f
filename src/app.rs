use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use dispatch_allocator::{
    AllocationEngine, AssignmentLifecycleManager, ChwLocator, DispatchLifecycleManager,
    ResourceDirectory,
};
use dispatch_api::{create_app, AppState};
use dispatch_core::config::{AllocationConfig, AppConfig};
use dispatch_core::traits::HealthCheck;
use dispatch_infrastructure::DatabaseManager;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::{net::TcpListener, sync::broadcast};
use tracing::info;

/// 主应用程序
///
/// 持有数据库连接池和装配好的调度组件，负责启动 HTTP 服务。
pub struct Application {
    config: AppConfig,
    database: Arc<DatabaseManager>,
    state: AppState,
}

impl Application {
    /// 连接数据库、执行迁移并装配调度组件
    pub async fn new(config: AppConfig, metrics: Option<PrometheusHandle>) -> Result<Self> {
        info!("连接数据库: {}", mask_database_url(&config.database.url));

        let database = DatabaseManager::new(&config.database)
            .await
            .context("连接数据库失败")?
            .with_incident_id_attempts(config.allocation.incident_id_attempts);
        database.migrate().await.context("运行数据库迁移失败")?;
        info!("数据库连接成功");

        let database = Arc::new(database);
        let state = build_state(&database, &config.allocation, metrics);

        Ok(Self {
            config,
            database,
            state,
        })
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// 带中间件的完整路由
    pub fn router(&self) -> Router {
        create_app(
            self.state(),
            &self.config.api,
            &self.config.observability.metrics_endpoint,
        )
    }

    /// 运行API服务器直到收到关闭信号
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;

        info!("API服务器启动在 http://{}", bind_address);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        self.database.close().await;
        info!("API服务器已停止");
        Ok(())
    }
}

/// 基于 SQLite 仓储装配 API 状态
pub fn build_state(
    database: &Arc<DatabaseManager>,
    allocation: &AllocationConfig,
    metrics: Option<PrometheusHandle>,
) -> AppState {
    let ambulances = database.ambulance_repository();
    let dispatch_repo = database.dispatch_repository();

    let directory = ResourceDirectory::new(
        database.hospital_repository(),
        database.patient_repository(),
        ambulances.clone(),
        database.chw_repository(),
        dispatch_repo.clone(),
    );
    let locator = ChwLocator::new(directory.clone());
    let dispatches = Arc::new(DispatchLifecycleManager::new(
        dispatch_repo,
        ambulances,
        allocation.active_statuses.clone(),
    ));
    let assignments = Arc::new(AssignmentLifecycleManager::new(
        database.assignment_repository(),
    ));
    let engine = Arc::new(AllocationEngine::new(
        directory.clone(),
        locator.clone(),
        dispatches.clone(),
        assignments.clone(),
        allocation.clone(),
    ));
    let health: Arc<dyn HealthCheck> = database.clone();

    AppState {
        engine,
        dispatches,
        assignments,
        directory,
        locator,
        health,
        metrics,
    }
}

/// 屏蔽数据库URL中的敏感信息
fn mask_database_url(url: &str) -> String {
    if let Some(at_pos) = url.find('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            let mut masked = url.to_string();
            masked.replace_range(colon_pos + 1..at_pos, "***");
            return masked;
        }
    }
    url.to_string()
}
