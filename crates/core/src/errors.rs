use thiserror::Error;

/// 调度系统错误类型定义
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库操作错误: {0}")]
    DatabaseOperation(String),

    #[error("请求参数无效: {0}")]
    Validation(String),

    #[error("患者未找到: {id}")]
    PatientNotFound { id: i64 },

    #[error("医院未找到: {id}")]
    HospitalNotFound { id: i64 },

    #[error("救护车未找到: {id}")]
    AmbulanceNotFound { id: i64 },

    #[error("社区卫生工作者未找到: {id}")]
    CommunityHealthWorkerNotFound { id: i64 },

    #[error("调度记录未找到: {incident_id}")]
    DispatchNotFound { incident_id: String },

    #[error("社区卫生工作者指派记录未找到: {id}")]
    AssignmentNotFound { id: i64 },

    #[error("没有可用的社区卫生工作者")]
    NoAvailableCommunityHealthWorker,

    #[error("{entity} 状态 {from} 不允许执行 {event} 操作")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        event: String,
    },

    #[error("资源不可用: {0}")]
    ResourceUnavailable(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl DispatchError {
    /// 是否为资源不存在类错误
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DispatchError::PatientNotFound { .. }
                | DispatchError::HospitalNotFound { .. }
                | DispatchError::AmbulanceNotFound { .. }
                | DispatchError::CommunityHealthWorkerNotFound { .. }
                | DispatchError::DispatchNotFound { .. }
                | DispatchError::AssignmentNotFound { .. }
                | DispatchError::NoAvailableCommunityHealthWorker
        )
    }

    /// 是否由调用方的请求引起
    pub fn is_client_error(&self) -> bool {
        self.is_not_found()
            || matches!(
                self,
                DispatchError::Validation(_)
                    | DispatchError::InvalidTransition { .. }
                    | DispatchError::ResourceUnavailable(_)
            )
    }
}

impl DispatchError {
    /// 错误类别标签，用于指标和 API 错误类型
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Database(_) | DispatchError::DatabaseOperation(_) => "database",
            DispatchError::Validation(_) => "validation",
            DispatchError::PatientNotFound { .. }
            | DispatchError::HospitalNotFound { .. }
            | DispatchError::AmbulanceNotFound { .. }
            | DispatchError::CommunityHealthWorkerNotFound { .. }
            | DispatchError::DispatchNotFound { .. }
            | DispatchError::AssignmentNotFound { .. } => "not_found",
            DispatchError::NoAvailableCommunityHealthWorker => "no_available_chw",
            DispatchError::InvalidTransition { .. } => "invalid_transition",
            DispatchError::ResourceUnavailable(_) => "resource_unavailable",
            DispatchError::Serialization(_) => "serialization",
            DispatchError::Configuration(_) => "configuration",
            DispatchError::Internal(_) => "internal",
        }
    }
}

/// 统一的Result类型
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(DispatchError::HospitalNotFound { id: 1 }.is_not_found());
        assert!(DispatchError::NoAvailableCommunityHealthWorker.is_not_found());
        assert!(!DispatchError::Validation("x".to_string()).is_not_found());
    }

    #[test]
    fn test_client_error_classification() {
        assert!(DispatchError::Validation("缺少 pickup_latitude".to_string()).is_client_error());
        assert!(DispatchError::InvalidTransition {
            entity: "调度",
            from: "COMPLETED".to_string(),
            event: "CANCEL".to_string(),
        }
        .is_client_error());
        assert!(!DispatchError::Internal("boom".to_string()).is_client_error());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(DispatchError::NoAvailableCommunityHealthWorker.kind(), "no_available_chw");
        assert_eq!(DispatchError::AssignmentNotFound { id: 3 }.kind(), "not_found");
        assert_eq!(DispatchError::ResourceUnavailable("x".into()).kind(), "resource_unavailable");
    }

    #[test]
    fn test_error_message_names_missing_entity() {
        let err = DispatchError::PatientNotFound { id: 42 };
        assert_eq!(err.to_string(), "患者未找到: 42");
    }
}
