use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommunityHealthWorkerAssignment, Dispatch};
use crate::errors::{DispatchError, DispatchResult};
use crate::geo::GeoPoint;

/// 急救援助请求（不持久化）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistanceRequest {
    pub patient_id: Option<i64>,
    pub caller_name: Option<String>,
    pub caller_phone: Option<String>,
    pub incident_type: Option<String>,
    pub notes: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub pickup_address_line1: Option<String>,
    pub pickup_address_line2: Option<String>,
    pub pickup_city: Option<String>,
    pub pickup_state: Option<String>,
    pub pickup_postal_code: Option<String>,
    pub pickup_country: Option<String>,
    pub hospital_id: Option<i64>,
    pub priority: Option<String>,
    pub dropoff_hospital_id: Option<i64>,
    pub dropoff_address: Option<String>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
}

impl AssistanceRequest {
    /// 校验并返回接诊坐标
    pub fn pickup_point(&self) -> DispatchResult<GeoPoint> {
        let latitude = required_coordinate(self.pickup_latitude, "pickup_latitude")?;
        let longitude = required_coordinate(self.pickup_longitude, "pickup_longitude")?;
        Ok(GeoPoint::new(latitude, longitude))
    }
}

fn required_coordinate(value: Option<f64>, field: &str) -> DispatchResult<f64> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) => Err(DispatchError::Validation(format!("{field} 必须是有效数值"))),
        None => Err(DispatchError::Validation(format!("缺少必填字段 {field}"))),
    }
}

/// 资源分配结果类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssistanceMode {
    #[serde(rename = "AMBULANCE")]
    Ambulance,
    #[serde(rename = "CHW")]
    Chw,
}

/// 统一的急救援助响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistanceResult {
    pub mode: AssistanceMode,
    pub incident_id: Option<String>,
    pub assignment_id: Option<i64>,
    pub patient_id: Option<i64>,
    pub hospital_id: Option<i64>,
    pub chw_id: Option<i64>,
    pub priority: Option<String>,
    pub status: String,
    pub distance_km: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl AssistanceResult {
    pub fn from_dispatch(dispatch: &Dispatch) -> Self {
        Self {
            mode: AssistanceMode::Ambulance,
            incident_id: Some(dispatch.incident_id.clone()),
            assignment_id: None,
            patient_id: dispatch.patient_id,
            hospital_id: dispatch.hospital_id,
            chw_id: None,
            priority: Some(dispatch.priority.to_string()),
            status: dispatch.status.to_string(),
            distance_km: None,
            created_at: dispatch.request_time,
        }
    }

    pub fn from_assignment(assignment: &CommunityHealthWorkerAssignment) -> Self {
        Self {
            mode: AssistanceMode::Chw,
            incident_id: None,
            assignment_id: Some(assignment.id),
            patient_id: assignment.patient_id,
            hospital_id: assignment.hospital_id,
            chw_id: Some(assignment.chw_id),
            priority: assignment.priority.clone(),
            status: assignment.status.to_string(),
            distance_km: Some(assignment.distance_km),
            created_at: assignment.assigned_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_latitude_is_validation_error() {
        let request = AssistanceRequest {
            pickup_longitude: Some(36.8),
            ..Default::default()
        };
        let err = request.pickup_point().unwrap_err();
        assert!(matches!(err, DispatchError::Validation(ref msg) if msg.contains("pickup_latitude")));
    }

    #[test]
    fn test_non_finite_coordinate_is_rejected() {
        let request = AssistanceRequest {
            pickup_latitude: Some(f64::NAN),
            pickup_longitude: Some(36.8),
            ..Default::default()
        };
        assert!(request.pickup_point().is_err());
    }

    #[test]
    fn test_mode_serializes_as_tag() {
        assert_eq!(serde_json::to_string(&AssistanceMode::Chw).unwrap(), "\"CHW\"");
        assert_eq!(
            serde_json::to_string(&AssistanceMode::Ambulance).unwrap(),
            "\"AMBULANCE\""
        );
    }
}
