use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::IntoResponse,
    Json,
};
use dispatch_core::{DispatchEvent, DispatchFilter, DispatchStatus};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

/// 调度查询参数
#[derive(Debug, Deserialize)]
pub struct DispatchQueryParams {
    pub hospital_id: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 调度事件请求
#[derive(Debug, Deserialize)]
pub struct DispatchEventRequest {
    pub event: String,
    pub ambulance_id: Option<i64>,
}

pub(crate) fn check_paging(limit: Option<i64>, offset: Option<i64>) -> ApiResult<()> {
    if matches!(limit, Some(l) if l <= 0) {
        return Err(ApiError::BadRequest("limit 必须大于0".to_string()));
    }
    if matches!(offset, Some(o) if o < 0) {
        return Err(ApiError::BadRequest("offset 不能为负数".to_string()));
    }
    Ok(())
}

/// 获取调度列表
pub async fn list_dispatches(
    State(state): State<AppState>,
    query: Result<Query<DispatchQueryParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    check_paging(params.limit, params.offset)?;

    let status = params
        .status
        .as_deref()
        .map(str::parse::<DispatchStatus>)
        .transpose()?;
    let filter = DispatchFilter {
        hospital_id: params.hospital_id,
        status,
        limit: params.limit,
        offset: params.offset,
    };

    let dispatches = state.dispatches.list(&filter).await?;
    Ok(success(dispatches))
}

/// 获取单个调度
pub async fn get_dispatch(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let dispatch = state.dispatches.get(&incident_id).await?;
    Ok(success(dispatch))
}

/// 执行调度状态事件
pub async fn apply_dispatch_event(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
    payload: Result<Json<DispatchEventRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload?;
    let event: DispatchEvent = request.event.parse()?;

    let dispatch = state
        .dispatches
        .apply_event(&incident_id, event, request.ambulance_id)
        .await?;
    Ok(success(dispatch))
}
