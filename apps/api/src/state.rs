use campus_application::{AuditService, EntityRecordService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub entity_record_service: EntityRecordService,
    pub audit_service: AuditService,
    /// Storage backend name reported by the health endpoint.
    pub storage_backend: &'static str,
}
