mod audit;
mod common;
mod records;

pub use audit::{AuditRecordResponse, ChangeEntryResponse, RequestContextResponse};
pub use common::HealthResponse;
pub use records::{EntityRecordRequest, EntityRecordResponse, UpdateMatchingRequest};
