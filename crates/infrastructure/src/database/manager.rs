use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dispatch_core::{
    config::DatabaseConfig,
    traits::{
        AmbulanceRepository, AssignmentRepository, CommunityHealthWorkerRepository,
        DispatchRepository, HealthCheck, HospitalRepository, PatientRepository,
    },
    DispatchError, DispatchResult,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use super::schema;
use super::sqlite::{
    SqliteAmbulanceRepository, SqliteAssignmentRepository, SqliteChwRepository,
    SqliteDispatchRepository, SqliteHospitalRepository, SqlitePatientRepository,
};

/// 写锁等待时间，并发写入时由 SQLite 自行排队
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite 数据库管理器
///
/// 持有连接池并作为各仓储实现的工厂。
pub struct DatabaseManager {
    pool: SqlitePool,
    incident_id_attempts: u32,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("创建SQLite数据库连接池: {}", config.url);

        let connect_options = SqliteConnectOptions::from_str(&config.url)
            .context("解析数据库URL失败")?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(connect_options)
            .await
            .context("创建数据库连接池失败")?;

        Ok(Self::from_pool(pool))
    }

    /// 使用已有连接池创建管理器
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            incident_id_attempts: SqliteDispatchRepository::DEFAULT_INCIDENT_ID_ATTEMPTS,
        }
    }

    /// 设置事件编号冲突时的最大生成次数
    pub fn with_incident_id_attempts(mut self, attempts: u32) -> Self {
        self.incident_id_attempts = attempts.max(1);
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<()> {
        schema::run_migrations(&self.pool).await
    }

    pub async fn health_check(&self) -> DispatchResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(DispatchError::Database)?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn hospital_repository(&self) -> Arc<dyn HospitalRepository> {
        Arc::new(SqliteHospitalRepository::new(self.pool.clone()))
    }

    pub fn patient_repository(&self) -> Arc<dyn PatientRepository> {
        Arc::new(SqlitePatientRepository::new(self.pool.clone()))
    }

    pub fn ambulance_repository(&self) -> Arc<dyn AmbulanceRepository> {
        Arc::new(SqliteAmbulanceRepository::new(self.pool.clone()))
    }

    pub fn chw_repository(&self) -> Arc<dyn CommunityHealthWorkerRepository> {
        Arc::new(SqliteChwRepository::new(self.pool.clone()))
    }

    pub fn dispatch_repository(&self) -> Arc<dyn DispatchRepository> {
        Arc::new(
            SqliteDispatchRepository::new(self.pool.clone())
                .with_incident_id_attempts(self.incident_id_attempts),
        )
    }

    pub fn assignment_repository(&self) -> Arc<dyn AssignmentRepository> {
        Arc::new(SqliteAssignmentRepository::new(self.pool.clone()))
    }
}

#[async_trait]
impl HealthCheck for DatabaseManager {
    async fn check(&self) -> DispatchResult<()> {
        self.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_config(dir: &tempfile::TempDir) -> DatabaseConfig {
        DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("dispatch.db").display()),
            max_connections: 2,
            ..DatabaseConfig::default()
        }
    }

    #[tokio::test]
    async fn test_sqlite_database_manager() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatabaseManager::new(&file_config(&dir)).await.unwrap();

        manager.migrate().await.unwrap();
        assert!(manager.health_check().await.is_ok());

        let hospitals = manager.hospital_repository();
        assert!(hospitals.get_by_id(1).await.unwrap().is_none());

        manager.close().await;
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let manager = DatabaseManager::new(&file_config(&dir)).await.unwrap();

        manager.migrate().await.unwrap();
        manager.migrate().await.unwrap();

        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'ambulance_dispatches'",
        )
        .fetch_one(manager.pool())
        .await
        .unwrap();
        assert_eq!(row.0, 1);
    }
}
