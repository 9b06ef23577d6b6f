use serde::{Deserialize, Serialize};

use crate::models::DispatchStatus;

/// 资源分配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// 占用车队容量的调度状态
    pub active_statuses: Vec<DispatchStatus>,
    /// 社区卫生工作者默认搜索半径，为空表示不限
    #[serde(default)]
    pub default_search_radius_km: Option<f64>,
    /// 社区卫生工作者占用冲突时的最大尝试次数
    pub max_claim_attempts: u32,
    /// 事件编号冲突时的最大生成次数
    pub incident_id_attempts: u32,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            active_statuses: DispatchStatus::default_active(),
            default_search_radius_km: None,
            max_claim_attempts: 3,
            incident_id_attempts: 5,
        }
    }
}

impl AllocationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.active_statuses.is_empty() {
            return Err(anyhow::anyhow!("活跃调度状态集合不能为空"));
        }

        if let Some(status) = self.active_statuses.iter().find(|s| s.is_terminal()) {
            return Err(anyhow::anyhow!("终结状态 {status} 不能计入活跃调度"));
        }

        if let Some(radius) = self.default_search_radius_km {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(anyhow::anyhow!("搜索半径必须大于0"));
            }
        }

        if self.max_claim_attempts == 0 {
            return Err(anyhow::anyhow!("最大占用尝试次数必须大于0"));
        }

        if self.incident_id_attempts == 0 {
            return Err(anyhow::anyhow!("事件编号生成次数必须大于0"));
        }

        Ok(())
    }
}
