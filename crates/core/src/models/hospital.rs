use serde::{Deserialize, Serialize};

/// 医院（外部实体，只读引用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    /// 车队容量
    pub number_of_ambulances: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Hospital {
    /// 是否拥有救护车车队
    pub fn has_fleet(&self) -> bool {
        self.number_of_ambulances > 0
    }

    /// 给定活跃调度数量时是否还有空余容量（严格小于）
    pub fn has_capacity(&self, active_count: i64) -> bool {
        self.has_fleet() && active_count < self.number_of_ambulances
    }
}

/// 患者（外部实体，只读引用）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
}

/// 医院车队容量快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HospitalCapacity {
    pub hospital_id: i64,
    pub number_of_ambulances: i64,
    pub active_dispatches: i64,
    pub available_slots: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hospital(capacity: i64) -> Hospital {
        Hospital {
            id: 1,
            name: "Kenyatta National Hospital".to_string(),
            number_of_ambulances: capacity,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_capacity_is_strict() {
        let h = hospital(2);
        assert!(h.has_capacity(0));
        assert!(h.has_capacity(1));
        assert!(!h.has_capacity(2));
        assert!(!h.has_capacity(3));
    }

    #[test]
    fn test_zero_fleet_never_has_capacity() {
        assert!(!hospital(0).has_capacity(0));
    }
}
