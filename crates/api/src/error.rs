use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dispatch_core::DispatchError;
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("调度错误: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("请求参数错误: {0}")]
    BadRequest(String),

    #[error("未找到资源")]
    NotFound,

    #[error("内部服务器错误: {0}")]
    Internal(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Dispatch(err) => match err {
                DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
                DispatchError::InvalidTransition { .. } | DispatchError::ResourceUnavailable(_) => {
                    StatusCode::CONFLICT
                }
                e if e.is_not_found() => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Dispatch(err) => match err {
                DispatchError::PatientNotFound { .. } => "PATIENT_NOT_FOUND",
                DispatchError::HospitalNotFound { .. } => "HOSPITAL_NOT_FOUND",
                DispatchError::AmbulanceNotFound { .. } => "AMBULANCE_NOT_FOUND",
                DispatchError::CommunityHealthWorkerNotFound { .. } => "CHW_NOT_FOUND",
                DispatchError::DispatchNotFound { .. } => "DISPATCH_NOT_FOUND",
                DispatchError::AssignmentNotFound { .. } => "ASSIGNMENT_NOT_FOUND",
                DispatchError::NoAvailableCommunityHealthWorker => "NO_AVAILABLE_CHW",
                DispatchError::Validation(_) => "VALIDATION_ERROR",
                DispatchError::InvalidTransition { .. } => "INVALID_TRANSITION",
                DispatchError::ResourceUnavailable(_) => "RESOURCE_UNAVAILABLE",
                _ => "INTERNAL_ERROR",
            },
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn message_and_suggestions(&self) -> (String, Vec<String>) {
        match self {
            ApiError::Dispatch(err) => match err {
                DispatchError::Validation(msg) => (
                    format!("请求参数验证失败: {}", msg),
                    vec!["请检查请求参数是否完整且格式正确".to_string()],
                ),
                DispatchError::NoAvailableCommunityHealthWorker => (
                    err.to_string(),
                    vec![
                        "当前没有可指派的社区卫生工作者".to_string(),
                        "可扩大搜索半径或稍后重试".to_string(),
                    ],
                ),
                DispatchError::InvalidTransition { .. } => (
                    err.to_string(),
                    vec!["请先查询记录的当前状态再执行操作".to_string()],
                ),
                DispatchError::ResourceUnavailable(_) => (
                    err.to_string(),
                    vec![
                        "资源已被占用或不属于该医院".to_string(),
                        "使用 GET /api/ambulances 查看可用救护车".to_string(),
                    ],
                ),
                e if e.is_not_found() => (
                    e.to_string(),
                    vec!["请检查请求中的ID是否正确".to_string()],
                ),
                e => {
                    error!("请求处理出现内部错误: {}", e);
                    (
                        "系统内部错误".to_string(),
                        vec![
                            "系统遇到内部错误，请稍后重试".to_string(),
                            "查看 GET /health 检查系统状态".to_string(),
                        ],
                    )
                }
            },
            ApiError::BadRequest(msg) => (
                format!("请求参数错误: {}", msg),
                vec![
                    "请检查请求格式和参数".to_string(),
                    "确保Content-Type设置为application/json".to_string(),
                ],
            ),
            ApiError::NotFound => (
                "请求的资源不存在".to_string(),
                vec!["请检查请求URL是否正确".to_string()],
            ),
            ApiError::Internal(msg) => {
                error!("请求处理出现内部错误: {}", msg);
                (
                    "系统内部错误".to_string(),
                    vec!["系统遇到内部错误，请稍后重试".to_string()],
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (message, suggestions) = self.message_and_suggestions();

        let body = Json(json!({
            "error": {
                "message": message,
                "type": self.error_type(),
                "code": status.as_u16(),
                "suggestions": suggestions,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
