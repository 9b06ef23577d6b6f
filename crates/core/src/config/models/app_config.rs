use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    allocation::AllocationConfig,
    api_observability::{ApiConfig, ObservabilityConfig},
    database::DatabaseConfig,
};

/// 默认配置文件搜索路径
pub const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/dispatch.toml",
    "dispatch.toml",
    "/etc/emergency-dispatch/config.toml",
];

/// System configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub allocation: AllocationConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (prefix: DISPATCH_, nesting separator: __)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let defaults =
            ConfigBuilder::try_from(&AppConfig::default()).context("构建默认配置失败")?;
        let mut builder = ConfigBuilder::builder().add_source(defaults);

        if let Some(path) = config_path {
            if !Path::new(path).exists() {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        } else if let Some(path) = DEFAULT_CONFIG_PATHS
            .iter()
            .find(|path| Path::new(path).exists())
        {
            builder = builder.add_source(File::new(path, FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("DISPATCH")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("allocation.active_statuses")
                .with_list_parse_key("api.cors_origins")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    /// Validate configuration effectiveness
    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置验证失败")?;
        self.api.validate().context("API配置验证失败")?;
        self.allocation.validate().context("资源分配配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispatchStatus;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.allocation.active_statuses,
            DispatchStatus::default_active()
        );
        assert!(config.allocation.default_search_radius_km.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[database]
url = "sqlite://test.db?mode=rwc"
max_connections = 2
min_connections = 1
connection_timeout_seconds = 5
idle_timeout_seconds = 60

[allocation]
active_statuses = ["DISPATCHED", "EN_ROUTE"]
default_search_radius_km = 25.0
max_claim_attempts = 5
incident_id_attempts = 3
"#
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();

        assert_eq!(config.database.max_connections, 2);
        assert_eq!(
            config.allocation.active_statuses,
            vec![DispatchStatus::Dispatched, DispatchStatus::EnRoute]
        );
        assert_eq!(config.allocation.default_search_radius_km, Some(25.0));
        assert_eq!(config.api.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_config_file_is_error() {
        assert!(AppConfig::load(Some("/nonexistent/dispatch.toml")).is_err());
    }

    #[test]
    fn test_terminal_status_cannot_be_active() {
        let mut config = AppConfig::default();
        config.allocation.active_statuses.push(DispatchStatus::Completed);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_radius_is_rejected() {
        let mut config = AppConfig::default();
        config.allocation.default_search_radius_km = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed.database.url, config.database.url);
        assert_eq!(parsed.allocation.max_claim_attempts, 3);
    }
}
