use axum::{extract::rejection::JsonRejection, extract::State, response::IntoResponse, Json};
use dispatch_core::{AssistanceMode, AssistanceRequest};
use tracing::info;

use crate::{error::ApiResult, response::created_with_message, routes::AppState};

/// 提交急救请求
///
/// 医院车队有空余时创建救护车调度，否则指派最近的可用社区卫生工作者。
pub async fn request_assistance(
    State(state): State<AppState>,
    payload: Result<Json<AssistanceRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let result = state.engine.request_assistance(&request).await?;

    let message = match result.mode {
        AssistanceMode::Ambulance => "已创建救护车调度",
        AssistanceMode::Chw => "已指派社区卫生工作者",
    };
    info!(
        "急救请求处理完成: mode={:?}, incident_id={:?}, assignment_id={:?}",
        result.mode, result.incident_id, result.assignment_id
    );

    Ok(created_with_message(result, message.to_string()))
}
