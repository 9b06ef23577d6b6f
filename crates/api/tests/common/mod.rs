#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use chrono::Utc;
use dispatch_allocator::{
    AllocationEngine, AssignmentLifecycleManager, ChwLocator, DispatchLifecycleManager,
    ResourceDirectory,
};
use dispatch_api::{create_routes, AppState};
use dispatch_core::{
    config::AllocationConfig,
    traits::{
        AmbulanceRepository, AssignmentRepository, CommunityHealthWorkerRepository,
        DispatchRepository, HealthCheck, HospitalRepository, PatientRepository,
    },
    Ambulance, AmbulanceStatus, ChwStatus, CommunityHealthWorker, Hospital, Patient,
};
use dispatch_infrastructure::InMemoryStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::Value;
use tower::ServiceExt;

pub const NAIROBI: (f64, f64) = (-1.2921, 36.8219);

pub fn app_state(store: &InMemoryStore, metrics: Option<PrometheusHandle>) -> AppState {
    let config = AllocationConfig::default();
    let repo = Arc::new(store.clone());
    let hospitals: Arc<dyn HospitalRepository> = repo.clone();
    let patients: Arc<dyn PatientRepository> = repo.clone();
    let ambulances: Arc<dyn AmbulanceRepository> = repo.clone();
    let chws: Arc<dyn CommunityHealthWorkerRepository> = repo.clone();
    let dispatch_repo: Arc<dyn DispatchRepository> = repo.clone();
    let assignment_repo: Arc<dyn AssignmentRepository> = repo.clone();
    let health: Arc<dyn HealthCheck> = repo;

    let directory = ResourceDirectory::new(
        hospitals,
        patients,
        ambulances.clone(),
        chws,
        dispatch_repo.clone(),
    );
    let locator = ChwLocator::new(directory.clone());
    let dispatches = Arc::new(DispatchLifecycleManager::new(
        dispatch_repo,
        ambulances,
        config.active_statuses.clone(),
    ));
    let assignments = Arc::new(AssignmentLifecycleManager::new(assignment_repo));
    let engine = Arc::new(AllocationEngine::new(
        directory.clone(),
        locator.clone(),
        dispatches.clone(),
        assignments.clone(),
        config,
    ));

    AppState {
        engine,
        dispatches,
        assignments,
        directory,
        locator,
        health,
        metrics,
    }
}

pub fn app(store: &InMemoryStore) -> Router {
    create_routes(app_state(store, None))
}

/// 医院1（容量1）、患者1、救护车1、两名社区卫生工作者
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_hospital(Hospital {
        id: 1,
        name: "Kenyatta National Hospital".to_string(),
        number_of_ambulances: 1,
        latitude: Some(NAIROBI.0),
        longitude: Some(NAIROBI.1),
    });
    store.insert_patient(Patient {
        id: 1,
        first_name: "Amina".to_string(),
        last_name: "Otieno".to_string(),
    });
    store.insert_ambulance(Ambulance {
        id: 1,
        hospital_id: 1,
        vehicle_number: "KBA-001".to_string(),
        status: AmbulanceStatus::Available,
    });
    store.insert_chw(chw(1, Some(1), -1.30, 36.80));
    store.insert_chw(chw(2, Some(1), -1.00, 37.20));
    store
}

pub fn chw(id: i64, hospital_id: Option<i64>, latitude: f64, longitude: f64) -> CommunityHealthWorker {
    CommunityHealthWorker {
        id,
        name: format!("CHW {id}"),
        phone: None,
        hospital_id,
        status: ChwStatus::Available,
        latitude: Some(latitude),
        longitude: Some(longitude),
        updated_at: Utc::now(),
    }
}

pub fn assistance_body(hospital_id: Option<i64>) -> Value {
    serde_json::json!({
        "patient_id": 1,
        "caller_name": "Grace",
        "caller_phone": "+254700000001",
        "incident_type": "Road traffic accident",
        "pickup_latitude": NAIROBI.0,
        "pickup_longitude": NAIROBI.1,
        "hospital_id": hospital_id,
        "priority": "HIGH"
    })
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn post_empty(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
