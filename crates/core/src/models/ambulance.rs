use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DispatchError;

/// 救护车状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmbulanceStatus {
    Available,
    OnCall,
    Maintenance,
    OutOfService,
}

impl AmbulanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbulanceStatus::Available => "AVAILABLE",
            AmbulanceStatus::OnCall => "ON_CALL",
            AmbulanceStatus::Maintenance => "MAINTENANCE",
            AmbulanceStatus::OutOfService => "OUT_OF_SERVICE",
        }
    }
}

impl FromStr for AmbulanceStatus {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AVAILABLE" => Ok(AmbulanceStatus::Available),
            "ON_CALL" => Ok(AmbulanceStatus::OnCall),
            "MAINTENANCE" => Ok(AmbulanceStatus::Maintenance),
            "OUT_OF_SERVICE" => Ok(AmbulanceStatus::OutOfService),
            _ => Err(DispatchError::Validation(format!("无效的救护车状态: {s}"))),
        }
    }
}

impl fmt::Display for AmbulanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

sqlite_text_enum!(AmbulanceStatus, "ambulance status");

/// 救护车
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ambulance {
    pub id: i64,
    pub hospital_id: i64,
    pub vehicle_number: String,
    pub status: AmbulanceStatus,
}
