use std::sync::Arc;

use chrono::Utc;
use dispatch_core::{
    config::DatabaseConfig, AmbulanceStatus, AssignmentEvent, AssignmentFilter, AssignmentStatus,
    AssistanceRequest, ChwStatus, CommunityHealthWorkerAssignment, Dispatch, DispatchEvent,
    DispatchFilter, DispatchStatus, Priority,
};
use dispatch_infrastructure::DatabaseManager;
use tempfile::TempDir;

async fn setup(max_connections: u32) -> (TempDir, DatabaseManager) {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("dispatch.db").display()),
        max_connections,
        min_connections: 1,
        ..DatabaseConfig::default()
    };
    let manager = DatabaseManager::new(&config).await.unwrap();
    manager.migrate().await.unwrap();

    let pool = manager.pool();
    sqlx::query(
        "INSERT INTO hospitals (id, name, number_of_ambulances, latitude, longitude) VALUES (1, 'Kenyatta National Hospital', 2, -1.3009, 36.8066)",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO patients (id, first_name, last_name) VALUES (1, 'Amina', 'Otieno')")
        .execute(pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO ambulances (id, hospital_id, vehicle_number, status) VALUES (1, 1, 'KBA-001', 'AVAILABLE'), (2, 1, 'KBA-002', 'MAINTENANCE')",
    )
    .execute(pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO community_health_workers (id, name, hospital_id, status, latitude, longitude) VALUES \
         (1, 'Wanjiru', 1, 'AVAILABLE', 0.0, 0.0), \
         (2, 'Kamau', 1, 'AVAILABLE', 10.0, 10.0), \
         (3, 'Achieng', NULL, 'OFFLINE', 0.0, 0.0)",
    )
    .execute(pool)
    .await
    .unwrap();

    (dir, manager)
}

fn new_dispatch() -> Dispatch {
    let request = AssistanceRequest {
        patient_id: Some(1),
        pickup_latitude: Some(-1.2921),
        pickup_longitude: Some(36.8219),
        incident_type: Some("Trauma".to_string()),
        priority: Some("critical".to_string()),
        ..Default::default()
    };
    Dispatch::from_request(&request, -1.2921, 36.8219, Some(1))
}

fn new_assignment(chw_id: i64) -> CommunityHealthWorkerAssignment {
    let now = Utc::now();
    CommunityHealthWorkerAssignment {
        id: 0,
        chw_id,
        patient_id: Some(1),
        hospital_id: Some(1),
        status: AssignmentStatus::Assigned,
        priority: Some("HIGH".to_string()),
        incident_type: None,
        notes: None,
        pickup_latitude: 0.1,
        pickup_longitude: 0.1,
        distance_km: 15.72,
        assigned_at: now,
        started_at: None,
        completed_at: None,
        canceled_at: None,
        updated_at: now,
    }
}

#[tokio::test]
async fn test_reference_lookups() {
    let (_dir, manager) = setup(1).await;

    let hospital = manager.hospital_repository().get_by_id(1).await.unwrap().unwrap();
    assert_eq!(hospital.number_of_ambulances, 2);
    assert!(manager.patient_repository().get_by_id(1).await.unwrap().is_some());
    assert!(manager.patient_repository().get_by_id(99).await.unwrap().is_none());

    let available = manager
        .ambulance_repository()
        .find_by_status(AmbulanceStatus::Available)
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].vehicle_number, "KBA-001");

    let chws = manager
        .chw_repository()
        .find_by_status(ChwStatus::Available, Some(1))
        .await
        .unwrap();
    let ids: Vec<i64> = chws.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_dispatch_insert_respects_capacity() {
    let (_dir, manager) = setup(1).await;
    let repo = manager.dispatch_repository();
    let statuses = DispatchStatus::default_active();

    let first = repo.create_within_capacity(&new_dispatch(), 2, &statuses).await.unwrap();
    let second = repo.create_within_capacity(&new_dispatch(), 2, &statuses).await.unwrap();
    let third = repo.create_within_capacity(&new_dispatch(), 2, &statuses).await.unwrap();

    assert!(first.is_some());
    assert!(second.is_some());
    assert!(third.is_none());
    assert_eq!(repo.count_active(1, &statuses).await.unwrap(), 2);
}

#[tokio::test]
async fn test_dispatch_read_back_and_update() {
    let (_dir, manager) = setup(1).await;
    let repo = manager.dispatch_repository();
    let statuses = DispatchStatus::default_active();

    let created = repo
        .create_within_capacity(&new_dispatch(), 2, &statuses)
        .await
        .unwrap()
        .unwrap();
    assert!(created.id > 0);

    let mut loaded = repo.get_by_incident_id(&created.incident_id).await.unwrap().unwrap();
    assert_eq!(loaded.status, DispatchStatus::Requested);
    assert_eq!(loaded.priority, Priority::Critical);
    assert_eq!(loaded.incident_type.as_deref(), Some("Trauma"));

    loaded.ambulance_id = Some(1);
    loaded.apply_event(DispatchEvent::Dispatch, Utc::now()).unwrap();
    assert!(repo.update(&loaded, DispatchStatus::Requested).await.unwrap());

    let updated = repo.get_by_incident_id(&created.incident_id).await.unwrap().unwrap();
    assert_eq!(updated.status, DispatchStatus::Dispatched);
    assert_eq!(updated.ambulance_id, Some(1));
    assert!(updated.dispatch_time.is_some());

    let filtered = repo
        .list(&DispatchFilter {
            hospital_id: Some(1),
            status: Some(DispatchStatus::Dispatched),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
}

#[tokio::test]
async fn test_update_unknown_dispatch_is_not_found() {
    let (_dir, manager) = setup(1).await;
    let repo = manager.dispatch_repository();

    let err = repo
        .update(&new_dispatch(), DispatchStatus::Requested)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_claiming_worker_is_exclusive() {
    let (_dir, manager) = setup(1).await;
    let assignments = manager.assignment_repository();
    let chws = manager.chw_repository();

    let created = assignments.create_claiming_worker(&new_assignment(1)).await.unwrap();
    assert!(created.is_some());
    let again = assignments.create_claiming_worker(&new_assignment(1)).await.unwrap();
    assert!(again.is_none());

    let worker = chws.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(worker.status, ChwStatus::Busy);

    let stored = assignments
        .list(&AssignmentFilter {
            chw_id: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_offline_worker_cannot_be_claimed() {
    let (_dir, manager) = setup(1).await;
    let assignments = manager.assignment_repository();

    let result = assignments.create_claiming_worker(&new_assignment(3)).await.unwrap();
    assert!(result.is_none());
    assert!(assignments.list(&AssignmentFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_completing_assignment_releases_worker() {
    let (_dir, manager) = setup(1).await;
    let assignments = manager.assignment_repository();
    let chws = manager.chw_repository();

    let mut assignment = assignments
        .create_claiming_worker(&new_assignment(2))
        .await
        .unwrap()
        .unwrap();
    assignment.apply_event(AssignmentEvent::Start, Utc::now()).unwrap();
    assert!(assignments
        .update(&assignment, AssignmentStatus::Assigned)
        .await
        .unwrap());
    assert_eq!(chws.get_by_id(2).await.unwrap().unwrap().status, ChwStatus::Busy);

    assignment.apply_event(AssignmentEvent::Complete, Utc::now()).unwrap();
    assert!(assignments
        .update_releasing_worker(&assignment, AssignmentStatus::InProgress)
        .await
        .unwrap());

    let stored = assignments.get_by_id(assignment.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Completed);
    assert!(stored.started_at.is_some());
    assert!(stored.completed_at.is_some());
    assert_eq!(chws.get_by_id(2).await.unwrap().unwrap().status, ChwStatus::Available);
}

#[tokio::test]
async fn test_stale_assignment_write_is_rolled_back() {
    let (_dir, manager) = setup(1).await;
    let assignments = manager.assignment_repository();
    let chws = manager.chw_repository();

    let first = assignments
        .create_claiming_worker(&new_assignment(1))
        .await
        .unwrap()
        .unwrap();
    let mut stale_cancel = first.clone();
    stale_cancel.apply_event(AssignmentEvent::Cancel, Utc::now()).unwrap();

    let mut completed = first.clone();
    completed.apply_event(AssignmentEvent::Start, Utc::now()).unwrap();
    assert!(assignments
        .update(&completed, AssignmentStatus::Assigned)
        .await
        .unwrap());
    completed.apply_event(AssignmentEvent::Complete, Utc::now()).unwrap();
    assert!(assignments
        .update_releasing_worker(&completed, AssignmentStatus::InProgress)
        .await
        .unwrap());
    let second = assignments
        .create_claiming_worker(&new_assignment(1))
        .await
        .unwrap()
        .unwrap();

    let written = assignments
        .update_releasing_worker(&stale_cancel, AssignmentStatus::Assigned)
        .await
        .unwrap();

    assert!(!written);
    let stored = assignments.get_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, AssignmentStatus::Completed);
    assert!(stored.canceled_at.is_none());
    assert_eq!(chws.get_by_id(1).await.unwrap().unwrap().status, ChwStatus::Busy);
    let holder = assignments.get_by_id(second.id).await.unwrap().unwrap();
    assert_eq!(holder.status, AssignmentStatus::Assigned);
}

#[tokio::test]
async fn test_update_unknown_assignment_is_not_found() {
    let (_dir, manager) = setup(1).await;
    let assignments = manager.assignment_repository();

    let mut missing = new_assignment(1);
    missing.id = 99;
    let err = assignments
        .update(&missing, AssignmentStatus::Assigned)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_dispatch_update_requires_expected_status() {
    let (_dir, manager) = setup(1).await;
    let repo = manager.dispatch_repository();
    let statuses = DispatchStatus::default_active();

    let created = repo
        .create_within_capacity(&new_dispatch(), 2, &statuses)
        .await
        .unwrap()
        .unwrap();

    let mut first = created.clone();
    first.ambulance_id = Some(1);
    first.apply_event(DispatchEvent::Dispatch, Utc::now()).unwrap();
    assert!(repo.update(&first, DispatchStatus::Requested).await.unwrap());

    let mut second = created.clone();
    second.ambulance_id = Some(2);
    second.apply_event(DispatchEvent::Dispatch, Utc::now()).unwrap();
    let written = repo.update(&second, DispatchStatus::Requested).await.unwrap();

    assert!(!written);
    let stored = repo.get_by_incident_id(&created.incident_id).await.unwrap().unwrap();
    assert_eq!(stored.status, DispatchStatus::Dispatched);
    assert_eq!(stored.ambulance_id, Some(1));
}

#[tokio::test]
async fn test_ambulance_compare_and_set() {
    let (_dir, manager) = setup(1).await;
    let ambulances = manager.ambulance_repository();

    assert!(ambulances
        .compare_and_set_status(1, AmbulanceStatus::Available, AmbulanceStatus::OnCall)
        .await
        .unwrap());
    assert!(!ambulances
        .compare_and_set_status(1, AmbulanceStatus::Available, AmbulanceStatus::OnCall)
        .await
        .unwrap());
    assert!(!ambulances
        .compare_and_set_status(42, AmbulanceStatus::Available, AmbulanceStatus::OnCall)
        .await
        .unwrap());

    let ambulance = ambulances.get_by_id(1).await.unwrap().unwrap();
    assert_eq!(ambulance.status, AmbulanceStatus::OnCall);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_never_exceed_capacity() {
    let (_dir, manager) = setup(4).await;
    let repo = manager.dispatch_repository();
    let statuses = Arc::new(DispatchStatus::default_active());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        let statuses = Arc::clone(&statuses);
        handles.push(tokio::spawn(async move {
            repo.create_within_capacity(&new_dispatch(), 3, &statuses).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().is_some() {
            created += 1;
        }
    }

    assert_eq!(created, 3);
    assert_eq!(repo.count_active(1, &statuses).await.unwrap(), 3);
}
