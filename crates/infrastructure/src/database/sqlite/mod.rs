pub mod sqlite_ambulance_repository;
pub mod sqlite_assignment_repository;
pub mod sqlite_chw_repository;
pub mod sqlite_dispatch_repository;
pub mod sqlite_hospital_repository;

pub use sqlite_ambulance_repository::SqliteAmbulanceRepository;
pub use sqlite_assignment_repository::SqliteAssignmentRepository;
pub use sqlite_chw_repository::SqliteChwRepository;
pub use sqlite_dispatch_repository::SqliteDispatchRepository;
pub use sqlite_hospital_repository::{SqliteHospitalRepository, SqlitePatientRepository};
