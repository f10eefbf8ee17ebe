//! Domain entities and invariants for audited school records.

#![forbid(unsafe_code)]

mod audit;
mod change;
mod diff;
mod entity;

pub use audit::{AuditAction, AuditRecord, AuditRecordParts};
pub use change::{ChangeEntry, ChangeKind, PathSegment};
pub use diff::{apply_changes, compute_diff, values_equal};
pub use entity::{EntitySnapshot, TrackedEntityType};
