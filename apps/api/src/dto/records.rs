use std::collections::BTreeMap;

use campus_domain::EntitySnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Incoming document payload for create and replace.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/entity-record-request.ts"
)]
pub struct EntityRecordRequest {
    #[ts(type = "Record<string, unknown>")]
    pub data: Value,
}

/// Incoming update-by-query payload.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/update-matching-request.ts"
)]
pub struct UpdateMatchingRequest {
    /// Top-level field the filter compares.
    pub field: String,
    #[ts(type = "unknown")]
    pub equals: Value,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub set: BTreeMap<String, Value>,
    #[serde(default)]
    pub unset: Vec<String>,
}

/// API representation of one stored document.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/entity-record-response.ts"
)]
pub struct EntityRecordResponse {
    pub entity_id: String,
    pub entity_type: String,
    #[ts(type = "Record<string, unknown>")]
    pub data: Value,
}

impl From<EntitySnapshot> for EntityRecordResponse {
    fn from(value: EntitySnapshot) -> Self {
        Self {
            entity_id: value.entity_id().as_str().to_owned(),
            entity_type: value.entity_type().as_str().to_owned(),
            data: value.into_data(),
        }
    }
}
