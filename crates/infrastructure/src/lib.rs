//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_audit_log_repository;
mod in_memory_entity_repository;
mod postgres_audit_log_repository;
mod postgres_entity_repository;

pub use in_memory_audit_log_repository::InMemoryAuditLogRepository;
pub use in_memory_entity_repository::InMemoryEntityRepository;
pub use postgres_audit_log_repository::PostgresAuditLogRepository;
pub use postgres_entity_repository::PostgresEntityRepository;
