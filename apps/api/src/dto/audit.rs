use campus_core::RequestContext;
use campus_domain::{AuditRecord, ChangeEntry, PathSegment};
use serde::Serialize;
use serde_json::Value;
use ts_rs::TS;

/// API representation of one field-level change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-entry-response.ts"
)]
pub struct ChangeEntryResponse {
    #[ts(type = "Array<string | number>")]
    pub path: Value,
    /// Dotted rendering of `path`, for display.
    pub path_label: String,
    pub kind: String,
    #[ts(type = "unknown")]
    pub previous_value: Option<Value>,
    #[ts(type = "unknown")]
    pub new_value: Option<Value>,
}

impl From<&ChangeEntry> for ChangeEntryResponse {
    fn from(value: &ChangeEntry) -> Self {
        Self {
            path: Value::Array(value.path().iter().map(path_segment_value).collect()),
            path_label: value.path_label(),
            kind: value.kind().as_str().to_owned(),
            previous_value: value.previous_value().cloned(),
            new_value: value.new_value().cloned(),
        }
    }
}

fn path_segment_value(segment: &PathSegment) -> Value {
    match segment {
        PathSegment::Field(name) => Value::String(name.clone()),
        PathSegment::Index(index) => Value::from(*index),
    }
}

/// API representation of captured request metadata.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/request-context-response.ts"
)]
pub struct RequestContextResponse {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl From<&RequestContext> for RequestContextResponse {
    fn from(value: &RequestContext) -> Self {
        Self {
            ip: value.ip.clone(),
            user_agent: value.user_agent.clone(),
        }
    }
}

/// API representation of an audit record.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/audit-record-response.ts"
)]
pub struct AuditRecordResponse {
    pub audit_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub actor_id: String,
    pub actor_label: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    #[ts(type = "Record<string, unknown> | null")]
    pub before: Option<Value>,
    #[ts(type = "Record<string, unknown>")]
    pub after: Value,
    pub diff: Option<Vec<ChangeEntryResponse>>,
    pub context: Option<RequestContextResponse>,
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(value: AuditRecord) -> Self {
        Self {
            audit_id: value.audit_id().to_string(),
            action: value.action().as_str().to_owned(),
            entity_type: value.entity_type().to_owned(),
            entity_id: value.entity_id().to_owned(),
            actor_id: value.actor().id().to_owned(),
            actor_label: value.actor().label().to_owned(),
            timestamp: value.timestamp().to_rfc3339(),
            before: value.before().cloned(),
            after: value.after().clone(),
            diff: value
                .diff()
                .map(|changes| changes.iter().map(ChangeEntryResponse::from).collect()),
            context: value.context().map(RequestContextResponse::from),
        }
    }
}
