#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use dispatch_allocator::{
    AllocationEngine, AssignmentLifecycleManager, ChwLocator, DispatchLifecycleManager,
    ResourceDirectory,
};
use dispatch_core::{
    config::{AllocationConfig, DatabaseConfig},
    traits::{
        AmbulanceRepository, AssignmentRepository, CommunityHealthWorkerRepository,
        DispatchRepository, HospitalRepository, PatientRepository,
    },
    Ambulance, AmbulanceStatus, AssistanceRequest, ChwStatus, CommunityHealthWorker, Hospital,
    Patient,
};
use dispatch_infrastructure::{DatabaseManager, InMemoryStore};
use tempfile::TempDir;

pub const NAIROBI: (f64, f64) = (-1.2921, 36.8219);

pub struct Fixture {
    pub store: InMemoryStore,
    pub directory: ResourceDirectory,
    pub dispatches: Arc<DispatchLifecycleManager>,
    pub assignments: Arc<AssignmentLifecycleManager>,
    pub engine: Arc<AllocationEngine>,
}

pub fn fixture(store: InMemoryStore) -> Fixture {
    fixture_with_config(store, AllocationConfig::default())
}

pub fn fixture_with_config(store: InMemoryStore, config: AllocationConfig) -> Fixture {
    let services = services(Repositories::in_memory(&store), config);
    Fixture {
        store,
        directory: services.directory,
        dispatches: services.dispatches,
        assignments: services.assignments,
        engine: services.engine,
    }
}

/// 一组仓储实现，内存和 SQLite 共用同一套装配
#[derive(Clone)]
pub struct Repositories {
    pub hospitals: Arc<dyn HospitalRepository>,
    pub patients: Arc<dyn PatientRepository>,
    pub ambulances: Arc<dyn AmbulanceRepository>,
    pub chws: Arc<dyn CommunityHealthWorkerRepository>,
    pub dispatches: Arc<dyn DispatchRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
}

impl Repositories {
    pub fn in_memory(store: &InMemoryStore) -> Self {
        let repo = Arc::new(store.clone());
        Self {
            hospitals: repo.clone(),
            patients: repo.clone(),
            ambulances: repo.clone(),
            chws: repo.clone(),
            dispatches: repo.clone(),
            assignments: repo,
        }
    }

    pub fn sqlite(manager: &DatabaseManager) -> Self {
        Self {
            hospitals: manager.hospital_repository(),
            patients: manager.patient_repository(),
            ambulances: manager.ambulance_repository(),
            chws: manager.chw_repository(),
            dispatches: manager.dispatch_repository(),
            assignments: manager.assignment_repository(),
        }
    }
}

pub struct Services {
    pub repos: Repositories,
    pub directory: ResourceDirectory,
    pub dispatches: Arc<DispatchLifecycleManager>,
    pub assignments: Arc<AssignmentLifecycleManager>,
    pub engine: Arc<AllocationEngine>,
}

pub fn services(repos: Repositories, config: AllocationConfig) -> Services {
    let directory = ResourceDirectory::new(
        repos.hospitals.clone(),
        repos.patients.clone(),
        repos.ambulances.clone(),
        repos.chws.clone(),
        repos.dispatches.clone(),
    );
    let dispatches = Arc::new(DispatchLifecycleManager::new(
        repos.dispatches.clone(),
        repos.ambulances.clone(),
        config.active_statuses.clone(),
    ));
    let assignments = Arc::new(AssignmentLifecycleManager::new(repos.assignments.clone()));
    let engine = Arc::new(AllocationEngine::new(
        directory.clone(),
        ChwLocator::new(directory.clone()),
        dispatches.clone(),
        assignments.clone(),
        config,
    ));

    Services {
        repos,
        directory,
        dispatches,
        assignments,
        engine,
    }
}

/// 医院 1（两辆救护车 10、11）和一名隶属医院 1 的工作者 1
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_hospital(hospital(1, 2));
    store.insert_ambulance(ambulance(10, 1));
    store.insert_ambulance(ambulance(11, 1));
    store.insert_chw(hospital_chw(1, 1, NAIROBI.0, NAIROBI.1));
    store
}

/// 与 [`seeded_store`] 相同的数据写入临时 SQLite 数据库
pub async fn seeded_sqlite() -> (TempDir, DatabaseManager) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("dispatch.db").display()),
        max_connections: 4,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let manager = DatabaseManager::new(&config).await.unwrap();
    manager.migrate().await.unwrap();

    let pool = manager.pool();
    sqlx::query(
        "INSERT INTO hospitals (id, name, number_of_ambulances, latitude, longitude) VALUES (1, 'Hospital 1', 2, -1.2921, 36.8219)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO ambulances (id, hospital_id, vehicle_number, status) VALUES (10, 1, 'KBA-010', 'AVAILABLE'), (11, 1, 'KBA-011', 'AVAILABLE')",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO community_health_workers (id, name, hospital_id, status, latitude, longitude) VALUES (1, 'CHW 1', 1, 'AVAILABLE', -1.2921, 36.8219)",
    )
    .execute(pool)
    .await
    .unwrap();

    (dir, manager)
}

pub fn hospital(id: i64, number_of_ambulances: i64) -> Hospital {
    Hospital {
        id,
        name: format!("Hospital {id}"),
        number_of_ambulances,
        latitude: Some(NAIROBI.0),
        longitude: Some(NAIROBI.1),
    }
}

pub fn patient(id: i64) -> Patient {
    Patient {
        id,
        first_name: "Amina".to_string(),
        last_name: "Otieno".to_string(),
    }
}

pub fn ambulance(id: i64, hospital_id: i64) -> Ambulance {
    Ambulance {
        id,
        hospital_id,
        vehicle_number: format!("KBA-{id:03}"),
        status: AmbulanceStatus::Available,
    }
}

pub fn chw_at(id: i64, latitude: f64, longitude: f64) -> CommunityHealthWorker {
    CommunityHealthWorker {
        id,
        name: format!("CHW {id}"),
        phone: Some("+254700000000".to_string()),
        hospital_id: None,
        status: ChwStatus::Available,
        latitude: Some(latitude),
        longitude: Some(longitude),
        updated_at: Utc::now(),
    }
}

pub fn hospital_chw(id: i64, hospital_id: i64, latitude: f64, longitude: f64) -> CommunityHealthWorker {
    CommunityHealthWorker {
        hospital_id: Some(hospital_id),
        ..chw_at(id, latitude, longitude)
    }
}

pub fn request_at(latitude: f64, longitude: f64, hospital_id: Option<i64>) -> AssistanceRequest {
    AssistanceRequest {
        caller_name: Some("Caller".to_string()),
        caller_phone: Some("+254711111111".to_string()),
        incident_type: Some("Cardiac".to_string()),
        pickup_latitude: Some(latitude),
        pickup_longitude: Some(longitude),
        hospital_id,
        priority: Some("high".to_string()),
        ..Default::default()
    }
}
