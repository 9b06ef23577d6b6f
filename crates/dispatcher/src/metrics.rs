//! 资源分配指标
//!
//! 计数器在未安装全局 recorder 时为空操作。

use dispatch_core::{AssistanceMode, DispatchError};
use metrics::counter;

pub fn record_assistance(mode: AssistanceMode) {
    let mode = match mode {
        AssistanceMode::Ambulance => "ambulance",
        AssistanceMode::Chw => "chw",
    };
    counter!("dispatch_assistance_requests_total", "mode" => mode).increment(1);
}

pub fn record_assistance_failure(error: &DispatchError) {
    counter!("dispatch_assistance_failures_total", "reason" => error.kind()).increment(1);
}

pub fn record_claim_conflict(resource: &'static str) {
    counter!("dispatch_claim_conflicts_total", "resource" => resource).increment(1);
}

pub fn record_transition(entity: &'static str, to: &'static str) {
    counter!("dispatch_status_transitions_total", "entity" => entity, "to" => to).increment(1);
}

/// 状态已被并发操作改变，条件写入未生效
pub fn record_stale_transition(entity: &'static str) {
    counter!("dispatch_stale_transitions_total", "entity" => entity).increment(1);
}
