mod database;

use std::sync::Arc;

use campus_application::{
    AuditLogRepository, AuditService, EntityRecordService, EntityRepository,
};
use campus_infrastructure::{
    InMemoryAuditLogRepository, InMemoryEntityRepository, PostgresAuditLogRepository,
    PostgresEntityRepository,
};
use sqlx::PgPool;
use tracing::warn;

use crate::state::AppState;

pub use database::connect_and_migrate;

/// Wires services over PostgreSQL when a pool is given, in-memory adapters otherwise.
pub fn build_app_state(pool: Option<PgPool>) -> AppState {
    let (entity_repository, audit_log_repository, storage_backend): (
        Arc<dyn EntityRepository>,
        Arc<dyn AuditLogRepository>,
        &'static str,
    ) = match pool {
        Some(pool) => (
            Arc::new(PostgresEntityRepository::new(pool.clone())),
            Arc::new(PostgresAuditLogRepository::new(pool)),
            "postgres",
        ),
        None => {
            warn!("DATABASE_URL is not set; documents and audit records are kept in memory");
            (
                Arc::new(InMemoryEntityRepository::new()),
                Arc::new(InMemoryAuditLogRepository::new()),
                "memory",
            )
        }
    };

    let audit_service = AuditService::new(entity_repository.clone(), audit_log_repository);
    let entity_record_service = EntityRecordService::new(entity_repository, audit_service.clone());

    AppState {
        entity_record_service,
        audit_service,
        storage_backend,
    }
}
