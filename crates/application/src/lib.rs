//! Application services and ports.

#![forbid(unsafe_code)]

mod audit_ports;
mod audit_service;
mod entity_ports;
mod entity_record_service;

#[cfg(test)]
mod test_support;

pub use audit_ports::{AuditLogRepository, AuditRecordQuery};
pub use audit_service::{AuditService, WriteScope};
pub use entity_ports::{EntityPatch, EntityRepository, FieldMatch};
pub use entity_record_service::EntityRecordService;
