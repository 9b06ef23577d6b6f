//! 地理距离计算
//!
//! 使用 haversine 公式在球面地球模型（半径 6371 km）上计算两点间的大圆距离。
//! 输入为十进制度数，不做范围校验，由调用方负责。

use serde::{Deserialize, Serialize};

/// 地球平均半径（公里）
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// 计算两个经纬度坐标之间的大圆距离（公里）
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // 浮点误差可能让 a 略微超出 [0, 1]
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// 经纬度坐标
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}
