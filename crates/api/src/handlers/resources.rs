use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::IntoResponse,
};
use dispatch_core::{AmbulanceStatus, GeoPoint};
use serde::Deserialize;

use crate::{
    error::{ApiError, ApiResult},
    response::success,
    routes::AppState,
};

/// 最近社区卫生工作者查询参数
#[derive(Debug, Deserialize)]
pub struct NearestChwParams {
    pub lat: f64,
    pub lon: f64,
    pub hospital_id: Option<i64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AmbulanceQueryParams {
    pub status: Option<String>,
}

/// 查询距离给定坐标最近的可用社区卫生工作者
///
/// 未指定 `radius_km` 时使用配置的默认搜索半径。
pub async fn find_nearest_chw(
    State(state): State<AppState>,
    query: Result<Query<NearestChwParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    if !params.lat.is_finite() || !params.lon.is_finite() {
        return Err(ApiError::BadRequest("lat 和 lon 必须是有效数值".to_string()));
    }
    if matches!(params.radius_km, Some(r) if !(r.is_finite() && r > 0.0)) {
        return Err(ApiError::BadRequest("radius_km 必须大于0".to_string()));
    }

    let radius_km = params
        .radius_km
        .or(state.engine.config().default_search_radius_km);
    let candidate = state
        .locator
        .find_nearest(
            GeoPoint::new(params.lat, params.lon),
            params.hospital_id,
            radius_km,
        )
        .await?;

    Ok(success(candidate))
}

/// 按状态查询救护车，默认 `AVAILABLE`
pub async fn list_ambulances(
    State(state): State<AppState>,
    query: Result<Query<AmbulanceQueryParams>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(params) = query?;
    let status = match params.status.as_deref() {
        Some(s) => s.parse::<AmbulanceStatus>()?,
        None => AmbulanceStatus::Available,
    };

    let ambulances = state.directory.find_ambulances_by_status(status).await?;
    Ok(success(ambulances))
}

/// 医院车队容量、活跃调度数与剩余名额
pub async fn get_hospital_capacity(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    let capacity = state
        .directory
        .hospital_capacity(id, state.dispatches.active_statuses())
        .await?;
    Ok(success(capacity))
}
