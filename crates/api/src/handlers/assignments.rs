use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
};
use dispatch_core::{AssignmentFilter, AssignmentStatus};
use serde::Deserialize;

use crate::{error::ApiResult, handlers::dispatches::check_paging, response::success, routes::AppState};

/// 指派查询参数
#[derive(Debug, Deserialize)]
pub struct AssignmentQueryParams {
    pub chw_id: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// 获取指派列表
pub async fn list_assignments(
    State(state): State<AppState>,
    query: Result<Query<AssignmentQueryParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    check_paging(params.limit, params.offset)?;

    let status = params
        .status
        .as_deref()
        .map(str::parse::<AssignmentStatus>)
        .transpose()?;
    let filter = AssignmentFilter {
        chw_id: params.chw_id,
        status,
        limit: params.limit,
        offset: params.offset,
    };

    let assignments = state.assignments.list(&filter).await?;
    Ok(success(assignments))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state.assignments.get(id).await?;
    Ok(success(assignment))
}

pub async fn start_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state.assignments.start(id).await?;
    Ok(success(assignment))
}

/// 完成指派并释放社区卫生工作者
pub async fn complete_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state.assignments.complete(id).await?;
    Ok(success(assignment))
}

/// 取消指派并释放社区卫生工作者
pub async fn cancel_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let assignment = state.assignments.cancel(id).await?;
    Ok(success(assignment))
}
